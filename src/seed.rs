// Copyright 2023 Remi Bernotavicius

use crate::database;
use crate::error::{Error, Result};
use crate::recipes::{create_recipe, NewRecipe};
use crate::users::{add_user, find_user_by_email, NewUser};

pub const ADMIN_FULL_NAME: &str = "afek-admin";
pub const ADMIN_EMAIL: &str = "adminafek@walla.co.il";

struct StarterRecipe {
    name: &'static str,
    ingredients: &'static [&'static str],
    cooking_time: i32,
    difficulty_level: &'static str,
}

const STARTER_RECIPES: &[StarterRecipe] = &[
    StarterRecipe {
        name: "roasted-salmon",
        ingredients: &["salmon", "kale", "olive-oil", "salt", "pepper"],
        cooking_time: 60,
        difficulty_level: "medium",
    },
    StarterRecipe {
        name: "chicken-burger",
        ingredients: &[
            "grinded-chicken-breast",
            "lattuce",
            "canola-oil",
            "salt",
            "chilli",
        ],
        cooking_time: 50,
        difficulty_level: "hard",
    },
    StarterRecipe {
        name: "simple-salad",
        ingredients: &[
            "cucumber",
            "tomato",
            "red-onion",
            "pepper",
            "salt",
            "olive-oil",
        ],
        cooking_time: 30,
        difficulty_level: "easy",
    },
    StarterRecipe {
        name: "vegan-hamburger",
        ingredients: &[
            "portabelo-mushrooms",
            "red-pepper",
            "olive-oil",
            "salt",
            "egg",
            "bread",
        ],
        cooking_time: 5,
        difficulty_level: "hard",
    },
    StarterRecipe {
        name: "omlette",
        ingredients: &["eggs", "black-pepper", "salt", "coconut-oil"],
        cooking_time: 120,
        difficulty_level: "medium",
    },
];

impl StarterRecipe {
    fn to_new_recipe(&self) -> NewRecipe {
        NewRecipe {
            name: self.name.into(),
            creator: None,
            ingredients: self.ingredients.iter().map(|&i| i.into()).collect(),
            cooking_time: self.cooking_time,
            difficulty_level: Some(self.difficulty_level.into()),
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub users_added: usize,
    pub recipes_added: usize,
}

/// Puts the admin user and the starter recipes in place. Rows that already exist are skipped, so
/// this can run against a database any number of times.
pub fn seed_defaults(conn: &mut database::Connection) -> Result<SeedReport> {
    let mut report = SeedReport::default();

    if find_user_by_email(conn, ADMIN_EMAIL)?.is_some() {
        log::warn!("user {ADMIN_EMAIL:?} already exists, skipping");
    } else {
        add_user(conn, &NewUser::new(ADMIN_FULL_NAME, ADMIN_EMAIL))?;
        report.users_added += 1;
    }

    for starter in STARTER_RECIPES {
        match create_recipe(conn, &starter.to_new_recipe()) {
            Ok(_) => report.recipes_added += 1,
            Err(Error::DuplicateRecipe(name)) => {
                log::warn!("recipe {name:?} already exists, skipping")
            }
            Err(e) => return Err(e),
        }
    }

    Ok(report)
}

#[test]
fn seed_is_idempotent() {
    use crate::recipes::find_all_recipes;

    let mut conn = database::test_connection();
    assert_eq!(
        seed_defaults(&mut conn).unwrap(),
        SeedReport {
            users_added: 1,
            recipes_added: 5,
        }
    );
    assert_eq!(seed_defaults(&mut conn).unwrap(), SeedReport::default());

    let all = find_all_recipes(&mut conn).unwrap();
    let names: Vec<_> = all.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(
        names,
        [
            "roasted-salmon",
            "chicken-burger",
            "simple-salad",
            "vegan-hamburger",
            "omlette"
        ]
    );
    assert!(all.iter().all(|r| r.creator.is_none()));

    let admin = crate::users::find_user_by_email(&mut conn, ADMIN_EMAIL)
        .unwrap()
        .unwrap();
    assert_eq!(admin.full_name, ADMIN_FULL_NAME);
    assert_eq!(all[4].ingredients, ["eggs", "black-pepper", "salt", "coconut-oil"]);
}
