// Copyright 2023 Remi Bernotavicius

//! Just enough of the user records for recipes to name their creators.

use crate::database;
use crate::database::models::{NewUserRow, User, UserChangeset, UserId};
use crate::error::{is_unique_violation, Error, Result};
use diesel::prelude::Connection as _;
use diesel::prelude::OptionalExtension as _;
use diesel::ExpressionMethods as _;
use diesel::QueryDsl as _;
use diesel::RunQueryDsl as _;
use diesel::SelectableHelper as _;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub full_name: String,
    pub email: String,
}

impl NewUser {
    pub fn new(full_name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            email: email.into(),
        }
    }
}

/// A partial update, `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserChanges {
    pub full_name: Option<String>,
    pub email: Option<String>,
}

pub fn add_user(conn: &mut database::Connection, user: &NewUser) -> Result<User> {
    use database::schema::users::dsl::*;
    use diesel::insert_into;

    let row = NewUserRow {
        full_name: &user.full_name,
        email: &user.email,
        created_at: chrono::Utc::now().naive_utc(),
    };

    let added: User = conn.transaction::<_, Error, _>(|conn| {
        insert_into(users).values(&row).execute(conn).map_err(|e| {
            if is_unique_violation(&e) {
                Error::DuplicateUser(user.email.clone())
            } else {
                e.into()
            }
        })?;
        Ok(users
            .filter(email.eq(&user.email))
            .select(User::as_select())
            .get_result(conn)?)
    })?;

    log::info!("added user {} ({})", added.full_name, added.id);
    Ok(added)
}

pub fn find_user_by_email(
    conn: &mut database::Connection,
    user_email: &str,
) -> Result<Option<User>> {
    use database::schema::users::dsl::*;

    Ok(users
        .filter(email.eq(user_email))
        .select(User::as_select())
        .first(conn)
        .optional()?)
}

/// Applies `changes` to the user. Returns `None` if there is no such user. Recipes show the new
/// name from then on.
pub fn update_user(
    conn: &mut database::Connection,
    user_id: UserId,
    changes: &UserChanges,
) -> Result<Option<User>> {
    use database::schema::users::dsl::*;
    use diesel::update;

    let updated = conn.transaction::<_, Error, _>(|conn| {
        if changes.full_name.is_some() || changes.email.is_some() {
            update(users.filter(id.eq(user_id)))
                .set(UserChangeset {
                    full_name: changes.full_name.as_deref(),
                    email: changes.email.as_deref(),
                })
                .execute(conn)
                .map_err(|e| match &changes.email {
                    Some(new_email) if is_unique_violation(&e) => {
                        Error::DuplicateUser(new_email.clone())
                    }
                    _ => e.into(),
                })?;
        }
        Ok(users
            .filter(id.eq(user_id))
            .select(User::as_select())
            .first(conn)
            .optional()?)
    })?;

    if updated.is_some() {
        log::info!("updated user {user_id}");
    }
    Ok(updated)
}

/// Removes the user. Recipes they created keep pointing at the now missing user.
pub fn delete_user(conn: &mut database::Connection, user_id: UserId) -> Result<bool> {
    use database::schema::users::dsl::*;
    use diesel::delete;

    let deleted = delete(users.filter(id.eq(user_id))).execute(conn)?;
    if deleted > 0 {
        log::info!("deleted user {user_id}");
    }
    Ok(deleted > 0)
}

#[test]
fn add_find_delete() {
    let mut conn = database::test_connection();
    let added = add_user(&mut conn, &NewUser::new("Julia Child", "julia@example.com")).unwrap();
    assert_eq!(added.full_name, "Julia Child");

    let found = find_user_by_email(&mut conn, "julia@example.com")
        .unwrap()
        .unwrap();
    assert_eq!(found.id, added.id);

    assert!(delete_user(&mut conn, added.id).unwrap());
    assert!(!delete_user(&mut conn, added.id).unwrap());
    assert!(find_user_by_email(&mut conn, "julia@example.com")
        .unwrap()
        .is_none());
}

#[test]
fn duplicate_email() {
    let mut conn = database::test_connection();
    add_user(&mut conn, &NewUser::new("Julia Child", "julia@example.com")).unwrap();
    let error =
        add_user(&mut conn, &NewUser::new("Someone Else", "julia@example.com")).unwrap_err();
    assert!(matches!(error, Error::DuplicateUser(_)));
}

#[test]
fn deleting_creator_keeps_recipes() {
    use crate::recipes::{create_recipe, find_recipe_by_name, NewRecipe};

    let mut conn = database::test_connection();
    let chef = add_user(&mut conn, &NewUser::new("Julia Child", "julia@example.com")).unwrap();
    let mut recipe = NewRecipe::new("crepes", 20);
    recipe.creator = Some(chef.id);
    create_recipe(&mut conn, &recipe).unwrap();

    delete_user(&mut conn, chef.id).unwrap();
    let kept = find_recipe_by_name(&mut conn, "crepes").unwrap().unwrap();
    assert_eq!(kept.creator, Some(chef.id));
}

#[test]
fn update_changes_only_given_fields() {
    let mut conn = database::test_connection();
    let added = add_user(&mut conn, &NewUser::new("Julia Child", "julia@example.com")).unwrap();

    let changes = UserChanges {
        full_name: Some("Julia McWilliams".into()),
        ..Default::default()
    };
    let updated = update_user(&mut conn, added.id, &changes).unwrap().unwrap();
    assert_eq!(updated.full_name, "Julia McWilliams");
    assert_eq!(updated.email, "julia@example.com");

    let unchanged = update_user(&mut conn, added.id, &UserChanges::default())
        .unwrap()
        .unwrap();
    assert_eq!(unchanged.full_name, "Julia McWilliams");

    delete_user(&mut conn, added.id).unwrap();
    assert!(update_user(&mut conn, added.id, &changes).unwrap().is_none());
}

#[test]
fn update_to_taken_email() {
    let mut conn = database::test_connection();
    add_user(&mut conn, &NewUser::new("Julia Child", "julia@example.com")).unwrap();
    let other = add_user(&mut conn, &NewUser::new("Jacques Pepin", "jacques@example.com")).unwrap();

    let changes = UserChanges {
        email: Some("julia@example.com".into()),
        ..Default::default()
    };
    let error = update_user(&mut conn, other.id, &changes).unwrap_err();
    assert!(matches!(error, Error::DuplicateUser(e) if e == "julia@example.com"));
}
