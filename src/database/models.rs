// Copyright 2023 Remi Bernotavicius

use chrono::NaiveDateTime;
use derive_more::Display;
use diesel::associations::{Associations, Identifiable};
use diesel::deserialize::Queryable;
use diesel::expression::Selectable;
use diesel::prelude::{AsChangeset, Insertable};
use diesel_derive_newtype::DieselNewType;
use serde::Serialize;
use std::num::ParseIntError;
use std::str::FromStr;

#[derive(
    DieselNewType, Debug, Display, Hash, PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Serialize,
)]
pub struct UserId(i32);

impl FromStr for UserId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

#[derive(Queryable, Selectable, Identifiable, Clone, Debug, Serialize)]
#[diesel(table_name = crate::database::schema::users)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub full_name: String,
    pub email: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = crate::database::schema::users)]
pub struct NewUserRow<'a> {
    pub full_name: &'a str,
    pub email: &'a str,
    pub created_at: NaiveDateTime,
}

#[derive(AsChangeset)]
#[diesel(table_name = crate::database::schema::users)]
pub struct UserChangeset<'a> {
    pub full_name: Option<&'a str>,
    pub email: Option<&'a str>,
}

#[derive(DieselNewType, Debug, Display, Hash, PartialEq, Eq, Copy, Clone, Serialize)]
pub struct RecipeId(i32);

/// A row of the `recipes` table. `creator` is the raw user reference and may point at a user that
/// no longer exists.
#[derive(Queryable, Selectable, Identifiable, Clone, Debug)]
#[diesel(table_name = crate::database::schema::recipes)]
pub struct Recipe {
    pub id: RecipeId,
    pub name: String,
    pub creator: Option<UserId>,
    pub cooking_time: i32,
    pub difficulty_level: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = crate::database::schema::recipes)]
pub struct NewRecipeRow<'a> {
    pub name: &'a str,
    pub creator: Option<UserId>,
    pub cooking_time: i32,
    pub difficulty_level: &'a str,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// `None` leaves a column untouched. For `creator`, `Some(None)` clears it.
#[derive(AsChangeset)]
#[diesel(table_name = crate::database::schema::recipes)]
pub struct RecipeChangeset<'a> {
    pub creator: Option<Option<UserId>>,
    pub cooking_time: Option<i32>,
    pub difficulty_level: Option<&'a str>,
    pub updated_at: NaiveDateTime,
}

#[derive(DieselNewType, Debug, Hash, PartialEq, Eq, Copy, Clone)]
pub struct RecipeIngredientId(i32);

#[derive(Associations, Queryable, Selectable, Identifiable, Clone, Debug)]
#[diesel(belongs_to(Recipe))]
#[diesel(table_name = crate::database::schema::recipe_ingredients)]
pub struct RecipeIngredient {
    pub id: RecipeIngredientId,
    pub recipe_id: RecipeId,
    pub name: String,
}

#[derive(Insertable)]
#[diesel(table_name = crate::database::schema::recipe_ingredients)]
pub struct NewRecipeIngredientRow<'a> {
    pub recipe_id: RecipeId,
    pub position: i32,
    pub name: &'a str,
}
