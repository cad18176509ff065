// Copyright 2023 Remi Bernotavicius

use crate::database;
use crate::database::models::{
    NewRecipeIngredientRow, NewRecipeRow, Recipe, RecipeChangeset, RecipeId, RecipeIngredient,
    UserId,
};
use crate::error::{is_unique_violation, Error, Result};
use chrono::NaiveDateTime;
use diesel::associations::GroupedBy as _;
use diesel::prelude::Connection as _;
use diesel::prelude::OptionalExtension as _;
use diesel::BelongingToDsl as _;
use diesel::ExpressionMethods as _;
use diesel::QueryDsl as _;
use diesel::RunQueryDsl as _;
use diesel::SelectableHelper as _;
use serde::Serialize;
use std::ops::RangeInclusive;

pub const DEFAULT_DIFFICULTY_LEVEL: &str = "unknown";
pub const COOKING_TIME_RANGE: RangeInclusive<i32> = 0..=480;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecipe {
    pub name: String,
    pub creator: Option<UserId>,
    pub ingredients: Vec<String>,
    pub cooking_time: i32,
    /// Falls back to [`DEFAULT_DIFFICULTY_LEVEL`].
    pub difficulty_level: Option<String>,
}

impl NewRecipe {
    pub fn new(name: impl Into<String>, cooking_time: i32) -> Self {
        Self {
            name: name.into(),
            creator: None,
            ingredients: vec![],
            cooking_time,
            difficulty_level: None,
        }
    }
}

/// A partial update, `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeChanges {
    /// `Some(None)` removes the creator.
    pub creator: Option<Option<UserId>>,
    /// Replaces the whole ingredient list.
    pub ingredients: Option<Vec<String>>,
    pub cooking_time: Option<i32>,
    pub difficulty_level: Option<String>,
}

/// A recipe with everything the store knows about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecipe {
    pub id: RecipeId,
    pub name: String,
    pub creator: Option<UserId>,
    pub ingredients: Vec<String>,
    pub cooking_time: i32,
    pub difficulty_level: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl StoredRecipe {
    fn new(recipe: Recipe, ingredients: Vec<String>) -> Self {
        Self {
            id: recipe.id,
            name: recipe.name,
            creator: recipe.creator,
            ingredients,
            cooking_time: recipe.cooking_time,
            difficulty_level: recipe.difficulty_level,
            created_at: recipe.created_at,
            updated_at: recipe.updated_at,
        }
    }
}

fn now() -> NaiveDateTime {
    chrono::Utc::now().naive_utc()
}

fn check_cooking_time(minutes: i32) -> Result<()> {
    if COOKING_TIME_RANGE.contains(&minutes) {
        Ok(())
    } else {
        Err(Error::CookingTimeOutOfRange(minutes))
    }
}

/// Ingredient names of each recipe, in the order they were given, one list per recipe.
pub fn load_ingredients(
    conn: &mut database::Connection,
    recipes: &[Recipe],
) -> Result<Vec<Vec<String>>> {
    use database::schema::recipe_ingredients::dsl::*;

    if recipes.is_empty() {
        return Ok(vec![]);
    }

    let mut grouped = Vec::with_capacity(recipes.len());
    for chunk in recipes.chunks(database::MAX_BOUND_IDS) {
        let ingredients: Vec<RecipeIngredient> = RecipeIngredient::belonging_to(chunk)
            .select(RecipeIngredient::as_select())
            .order(position.asc())
            .load(conn)?;
        grouped.extend(
            ingredients
                .grouped_by(chunk)
                .into_iter()
                .map(|group| group.into_iter().map(|i| i.name).collect()),
        );
    }
    Ok(grouped)
}

fn insert_ingredients(
    conn: &mut database::Connection,
    new_recipe_id: RecipeId,
    ingredients: &[String],
) -> Result<()> {
    use database::schema::recipe_ingredients::dsl::*;
    use diesel::insert_into;

    if ingredients.is_empty() {
        return Ok(());
    }

    let rows: Vec<_> = ingredients
        .iter()
        .enumerate()
        .map(|(i, ingredient)| NewRecipeIngredientRow {
            recipe_id: new_recipe_id,
            position: i as i32,
            name: ingredient,
        })
        .collect();
    insert_into(recipe_ingredients).values(&rows).execute(conn)?;
    Ok(())
}

fn find_row(conn: &mut database::Connection, recipe_name: &str) -> Result<Option<Recipe>> {
    use database::schema::recipes::dsl::*;

    Ok(recipes
        .filter(name.eq(recipe_name))
        .select(Recipe::as_select())
        .first(conn)
        .optional()?)
}

fn with_ingredients(conn: &mut database::Connection, recipe: Recipe) -> Result<StoredRecipe> {
    let ingredients = load_ingredients(conn, std::slice::from_ref(&recipe))?
        .pop()
        .unwrap_or_default();
    Ok(StoredRecipe::new(recipe, ingredients))
}

/// Adds a recipe. A name that is already taken fails with [`Error::DuplicateRecipe`] and leaves
/// the store untouched.
pub fn create_recipe(conn: &mut database::Connection, recipe: &NewRecipe) -> Result<StoredRecipe> {
    use database::schema::recipes::dsl::*;
    use diesel::insert_into;

    if recipe.name.trim().is_empty() {
        return Err(Error::EmptyName);
    }
    check_cooking_time(recipe.cooking_time)?;

    let created = now();
    let row = NewRecipeRow {
        name: &recipe.name,
        creator: recipe.creator,
        cooking_time: recipe.cooking_time,
        difficulty_level: recipe
            .difficulty_level
            .as_deref()
            .unwrap_or(DEFAULT_DIFFICULTY_LEVEL),
        created_at: created,
        updated_at: created,
    };

    let stored = conn.transaction::<_, Error, _>(|conn| {
        insert_into(recipes)
            .values(&row)
            .execute(conn)
            .map_err(|e| {
                if is_unique_violation(&e) {
                    Error::DuplicateRecipe(recipe.name.clone())
                } else {
                    e.into()
                }
            })?;
        let inserted: Recipe = recipes
            .filter(name.eq(&recipe.name))
            .select(Recipe::as_select())
            .get_result(conn)?;
        insert_ingredients(conn, inserted.id, &recipe.ingredients)?;
        Ok(StoredRecipe::new(inserted, recipe.ingredients.clone()))
    })?;

    log::info!("created recipe {:?} ({})", stored.name, stored.id);
    Ok(stored)
}

pub fn find_recipe_by_name(
    conn: &mut database::Connection,
    recipe_name: &str,
) -> Result<Option<StoredRecipe>> {
    find_row(conn, recipe_name)?
        .map(|recipe| with_ingredients(conn, recipe))
        .transpose()
}

/// Every recipe in storage order.
pub fn find_all_recipes(conn: &mut database::Connection) -> Result<Vec<StoredRecipe>> {
    use database::schema::recipes::dsl::*;

    conn.transaction::<_, Error, _>(|conn| {
        let rows: Vec<Recipe> = recipes
            .select(Recipe::as_select())
            .order(id.asc())
            .load(conn)?;
        let ingredients = load_ingredients(conn, &rows)?;
        Ok(rows
            .into_iter()
            .zip(ingredients)
            .map(|(recipe, ingredients)| StoredRecipe::new(recipe, ingredients))
            .collect())
    })
}

/// Applies `changes` to the recipe called `recipe_name`. Returns `None` if there is no such
/// recipe.
pub fn update_recipe(
    conn: &mut database::Connection,
    recipe_name: &str,
    changes: &RecipeChanges,
) -> Result<Option<StoredRecipe>> {
    use database::schema::recipes::dsl::*;
    use diesel::update;

    if let Some(minutes) = changes.cooking_time {
        check_cooking_time(minutes)?;
    }

    let updated = conn.transaction::<_, Error, _>(|conn| {
        let Some(existing) = find_row(conn, recipe_name)? else {
            return Ok(None);
        };

        update(recipes.filter(id.eq(existing.id)))
            .set(RecipeChangeset {
                creator: changes.creator,
                cooking_time: changes.cooking_time,
                difficulty_level: changes.difficulty_level.as_deref(),
                updated_at: now(),
            })
            .execute(conn)?;

        if let Some(new_ingredients) = &changes.ingredients {
            use database::schema::recipe_ingredients;
            diesel::delete(
                recipe_ingredients::table.filter(recipe_ingredients::recipe_id.eq(existing.id)),
            )
            .execute(conn)?;
            insert_ingredients(conn, existing.id, new_ingredients)?;
        }

        find_recipe_by_name(conn, recipe_name)
    })?;

    if updated.is_some() {
        log::info!("updated recipe {recipe_name:?}");
    }
    Ok(updated)
}

/// Removes the recipe and its ingredients. Returns whether anything was deleted.
pub fn delete_recipe(conn: &mut database::Connection, recipe_name: &str) -> Result<bool> {
    use database::schema::recipes::dsl::*;
    use diesel::delete;

    let deleted = delete(recipes.filter(name.eq(recipe_name))).execute(conn)?;
    if deleted > 0 {
        log::info!("deleted recipe {recipe_name:?}");
    }
    Ok(deleted > 0)
}

#[cfg(test)]
fn cheesy_bread() -> NewRecipe {
    NewRecipe {
        name: "cheesyBread".into(),
        creator: None,
        ingredients: ["salt", "pepper", "cheese", "ghee-butter", "bread"]
            .map(String::from)
            .into(),
        cooking_time: 20,
        difficulty_level: Some("easy".into()),
    }
}

#[test]
fn create_and_find() {
    let mut conn = database::test_connection();
    let created = create_recipe(&mut conn, &cheesy_bread()).unwrap();
    assert_eq!(created.name, "cheesyBread");
    assert_eq!(created.creator, None);
    assert_eq!(created.created_at, created.updated_at);

    let found = find_recipe_by_name(&mut conn, "cheesyBread")
        .unwrap()
        .unwrap();
    assert_eq!(found, created);
    assert_eq!(
        found.ingredients,
        ["salt", "pepper", "cheese", "ghee-butter", "bread"]
    );

    assert_eq!(find_recipe_by_name(&mut conn, "cheesybread").unwrap(), None);
}

#[test]
fn difficulty_level_defaults_to_unknown() {
    let mut conn = database::test_connection();
    let created = create_recipe(&mut conn, &NewRecipe::new("toast", 3)).unwrap();
    assert_eq!(created.difficulty_level, DEFAULT_DIFFICULTY_LEVEL);
}

#[test]
fn duplicate_name_leaves_store_untouched() {
    let mut conn = database::test_connection();
    create_recipe(&mut conn, &cheesy_bread()).unwrap();

    let mut duplicate = cheesy_bread();
    duplicate.ingredients = vec!["something else".into()];
    duplicate.cooking_time = 90;
    let error = create_recipe(&mut conn, &duplicate).unwrap_err();
    assert!(matches!(error, Error::DuplicateRecipe(ref n) if n == "cheesyBread"));

    let all = find_all_recipes(&mut conn).unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].cooking_time, 20);
    assert_eq!(all[0].ingredients.len(), 5);
}

#[test]
fn invalid_recipes_are_rejected() {
    let mut conn = database::test_connection();
    for minutes in [-1, 481] {
        let error = create_recipe(&mut conn, &NewRecipe::new("stew", minutes)).unwrap_err();
        assert!(matches!(error, Error::CookingTimeOutOfRange(m) if m == minutes));
    }
    assert!(matches!(
        create_recipe(&mut conn, &NewRecipe::new("  ", 10)).unwrap_err(),
        Error::EmptyName
    ));
    create_recipe(&mut conn, &NewRecipe::new("slow-roast", 480)).unwrap();
    create_recipe(&mut conn, &NewRecipe::new("raw", 0)).unwrap();
    assert_eq!(find_all_recipes(&mut conn).unwrap().len(), 2);
}

#[test]
fn find_all_in_storage_order() {
    let mut conn = database::test_connection();
    for name in ["b", "a", "c"] {
        create_recipe(&mut conn, &NewRecipe::new(name, 1)).unwrap();
    }
    let names: Vec<_> = find_all_recipes(&mut conn)
        .unwrap()
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert_eq!(names, ["b", "a", "c"]);
}

#[test]
fn update_changes_only_given_fields() {
    use crate::users::{add_user, NewUser};

    let mut conn = database::test_connection();
    let chef = add_user(&mut conn, &NewUser::new("Chef", "chef@example.com")).unwrap();
    let created = create_recipe(&mut conn, &cheesy_bread()).unwrap();

    let changes = RecipeChanges {
        creator: Some(Some(chef.id)),
        ingredients: Some(vec!["sweet-potato".into(), "canola-oil".into()]),
        cooking_time: Some(25),
        difficulty_level: None,
    };
    let updated = update_recipe(&mut conn, "cheesyBread", &changes)
        .unwrap()
        .unwrap();
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.creator, Some(chef.id));
    assert_eq!(updated.ingredients, ["sweet-potato", "canola-oil"]);
    assert_eq!(updated.cooking_time, 25);
    assert_eq!(updated.difficulty_level, "easy");
    assert_eq!(updated.created_at, created.created_at);
    assert!(updated.updated_at >= created.updated_at);

    let cleared = update_recipe(
        &mut conn,
        "cheesyBread",
        &RecipeChanges {
            creator: Some(None),
            ..Default::default()
        },
    )
    .unwrap()
    .unwrap();
    assert_eq!(cleared.creator, None);
    assert_eq!(cleared.ingredients, ["sweet-potato", "canola-oil"]);
}

#[test]
fn update_missing_or_invalid() {
    let mut conn = database::test_connection();
    assert_eq!(
        update_recipe(&mut conn, "nothing", &RecipeChanges::default()).unwrap(),
        None
    );

    create_recipe(&mut conn, &cheesy_bread()).unwrap();
    let error = update_recipe(
        &mut conn,
        "cheesyBread",
        &RecipeChanges {
            cooking_time: Some(500),
            ..Default::default()
        },
    )
    .unwrap_err();
    assert!(matches!(error, Error::CookingTimeOutOfRange(500)));
}

#[test]
fn delete_removes_recipe_and_ingredients() {
    use database::schema::recipe_ingredients::dsl::*;

    let mut conn = database::test_connection();
    create_recipe(&mut conn, &cheesy_bread()).unwrap();
    let mut other = NewRecipe::new("potato-chips", 30);
    other.ingredients = vec!["potato".into(), "salt".into()];
    create_recipe(&mut conn, &other).unwrap();

    assert!(delete_recipe(&mut conn, "cheesyBread").unwrap());
    assert!(!delete_recipe(&mut conn, "cheesyBread").unwrap());
    assert_eq!(find_recipe_by_name(&mut conn, "cheesyBread").unwrap(), None);

    let remaining: i64 = recipe_ingredients.count().get_result(&mut conn).unwrap();
    assert_eq!(remaining, 2);
}
