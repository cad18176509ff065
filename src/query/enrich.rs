// Copyright 2023 Remi Bernotavicius

use crate::database;
use crate::database::models::{Recipe, UserId};
use crate::error::Result;
use diesel::ExpressionMethods as _;
use diesel::QueryDsl as _;
use diesel::RunQueryDsl as _;
use std::collections::{BTreeSet, HashMap};

/// Display names of the users who created `recipes`, keyed by user id. Users that no longer exist
/// are simply absent.
pub fn creator_names(
    conn: &mut database::Connection,
    recipes: &[Recipe],
) -> Result<HashMap<UserId, String>> {
    use database::schema::users::dsl::*;

    let creator_ids: BTreeSet<UserId> = recipes.iter().filter_map(|r| r.creator).collect();
    let creator_ids: Vec<UserId> = creator_ids.into_iter().collect();

    let mut names = HashMap::new();
    for chunk in creator_ids.chunks(database::MAX_BOUND_IDS) {
        let found = users
            .filter(id.eq_any(chunk.to_vec()))
            .select((id, full_name))
            .load::<(UserId, String)>(conn)?;
        names.extend(found);
    }
    Ok(names)
}

/// A recipe without a creator and one whose creator has disappeared both come out as `None`.
pub fn creator_name(names: &HashMap<UserId, String>, creator: Option<UserId>) -> Option<String> {
    creator.and_then(|c| names.get(&c).cloned())
}

#[test]
fn creator_lookup() {
    use crate::recipes::{create_recipe, NewRecipe};
    use crate::users::{add_user, delete_user, NewUser};
    use diesel::SelectableHelper as _;
    use maplit::hashmap;

    let mut conn = database::test_connection();
    let chef = add_user(&mut conn, &NewUser::new("Julia Child", "julia@example.com")).unwrap();
    let gone = add_user(&mut conn, &NewUser::new("Gone Cook", "gone@example.com")).unwrap();

    for (name, creator) in [
        ("omelette", Some(chef.id)),
        ("crepes", Some(chef.id)),
        ("toast", None),
        ("soup", Some(gone.id)),
    ] {
        let mut recipe = NewRecipe::new(name, 10);
        recipe.creator = creator;
        create_recipe(&mut conn, &recipe).unwrap();
    }
    delete_user(&mut conn, gone.id).unwrap();

    let recipes: Vec<Recipe> = database::schema::recipes::table
        .select(Recipe::as_select())
        .load(&mut conn)
        .unwrap();

    let names = creator_names(&mut conn, &recipes).unwrap();
    assert_eq!(names, hashmap! { chef.id => "Julia Child".to_owned() });

    assert_eq!(
        creator_name(&names, Some(chef.id)).as_deref(),
        Some("Julia Child")
    );
    assert_eq!(creator_name(&names, Some(gone.id)), None);
    assert_eq!(creator_name(&names, None), None);
    assert!(creator_names(&mut conn, &[]).unwrap().is_empty());
}
