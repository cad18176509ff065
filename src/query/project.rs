// Copyright 2023 Remi Bernotavicius

use super::paginate::Pagination;
use crate::database::models::Recipe;
use serde::Serialize;

/// What callers get to see of a recipe. Store identifiers and timestamps never leave the crate
/// through this type, and `creator` is the creator's display name rather than their id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicRecipe {
    pub name: String,
    pub ingredients: Vec<String>,
    pub cooking_time: i32,
    pub difficulty_level: String,
    pub creator: Option<String>,
}

impl PublicRecipe {
    pub fn new(recipe: Recipe, ingredients: Vec<String>, creator: Option<String>) -> Self {
        Self {
            name: recipe.name,
            ingredients,
            cooking_time: recipe.cooking_time,
            difficulty_level: recipe.difficulty_level,
            creator,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaginatedResult {
    pub pagination: Pagination,
    pub data: Vec<PublicRecipe>,
}

#[test]
fn public_shape() {
    let recipe = PublicRecipe {
        name: "simple-salad".into(),
        ingredients: vec!["cucumber".into(), "tomato".into()],
        cooking_time: 30,
        difficulty_level: "easy".into(),
        creator: None,
    };
    assert_eq!(
        serde_json::to_value(&recipe).unwrap(),
        serde_json::json!({
            "name": "simple-salad",
            "ingredients": ["cucumber", "tomato"],
            "cookingTime": 30,
            "difficultyLevel": "easy",
            "creator": null,
        })
    );
}
