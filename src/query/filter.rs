// Copyright 2023 Remi Bernotavicius

use crate::database::models::UserId;
use crate::database::unicode_lower;
use crate::database::schema::recipes;
use diesel::dsl::AsExprOf;
use diesel::expression::IntoSql as _;
use diesel::expression_methods::EscapeExpressionMethods as _;
use diesel::expression_methods::TextExpressionMethods as _;
use diesel::sql_types::Bool;
use diesel::sqlite::Sqlite;
use diesel::ExpressionMethods as _;
use diesel::QueryDsl as _;
use serde::Deserialize;

/// A recipe filter exactly as it arrives from a caller, every value still a string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeFilterQuery {
    pub name: Option<String>,
    pub creator: Option<String>,
    pub difficulty_level: Option<String>,
    pub min_cooking_time: Option<String>,
    pub max_cooking_time: Option<String>,
    pub page: Option<String>,
    pub items_per_page: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreatorMatch {
    User(UserId),
    /// Not a user identifier. Matches no recipe.
    Unresolvable(String),
}

impl CreatorMatch {
    fn parse(raw: &str) -> Self {
        raw.parse()
            .map(Self::User)
            .unwrap_or_else(|_| Self::Unresolvable(raw.into()))
    }
}

/// The conjunction of constraints a recipe has to satisfy. Every constraint is optional and an
/// absent one matches everything.
///
/// Cooking time bounds are inclusive and kept as `f64` so that a bound which failed to parse can
/// be carried as NaN. Like any comparison against NaN, such a bound is never satisfied.
#[derive(Debug, Clone, Default)]
pub struct RecipeFilter {
    pub name: Option<String>,
    pub creator: Option<CreatorMatch>,
    pub difficulty_level: Option<String>,
    pub min_cooking_time: Option<f64>,
    pub max_cooking_time: Option<f64>,
}

impl RecipeFilter {
    pub fn match_all() -> Self {
        Self::default()
    }

    pub fn from_query(query: &RecipeFilterQuery) -> Self {
        let mut filter = Self::match_all();
        if let Some(name) = &query.name {
            filter = filter.name(name);
        }
        if let Some(creator) = &query.creator {
            filter.creator = Some(CreatorMatch::parse(creator));
        }
        if let Some(level) = &query.difficulty_level {
            filter = filter.difficulty_level(level);
        }
        if let Some(min) = &query.min_cooking_time {
            filter = filter.min_cooking_time(coerce_number(min));
        }
        if let Some(max) = &query.max_cooking_time {
            filter = filter.max_cooking_time(coerce_number(max));
        }
        filter
    }

    /// Case-insensitive substring match on the recipe name. Case is folded for all of Unicode,
    /// not only ASCII.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn difficulty_level(mut self, level: impl Into<String>) -> Self {
        self.difficulty_level = Some(level.into());
        self
    }

    pub fn min_cooking_time(mut self, minutes: f64) -> Self {
        self.min_cooking_time = Some(minutes);
        self
    }

    pub fn max_cooking_time(mut self, minutes: f64) -> Self {
        self.max_cooking_time = Some(minutes);
        self
    }

    /// Narrows `query` down to the recipes this filter accepts.
    pub fn apply<'a>(
        &'a self,
        mut query: recipes::BoxedQuery<'a, Sqlite>,
    ) -> recipes::BoxedQuery<'a, Sqlite> {
        if let Some(name) = &self.name {
            let pattern = contains_pattern(&name.to_lowercase());
            query = query.filter(unicode_lower(recipes::name).like(pattern).escape('\\'));
        }

        match &self.creator {
            Some(CreatorMatch::User(id)) => query = query.filter(recipes::creator.eq(Some(*id))),
            Some(CreatorMatch::Unresolvable(raw)) => {
                log::debug!("creator {raw:?} is not a user id, nothing can match");
                query = query.filter(nothing());
            }
            None => {}
        }

        if let Some(level) = &self.difficulty_level {
            query = query.filter(recipes::difficulty_level.eq(level.as_str()));
        }

        if let Some(min) = self.min_cooking_time {
            query = match lower_bound(min) {
                Some(min) => query.filter(recipes::cooking_time.ge(min)),
                None => query.filter(nothing()),
            };
        }
        if let Some(max) = self.max_cooking_time {
            query = match upper_bound(max) {
                Some(max) => query.filter(recipes::cooking_time.le(max)),
                None => query.filter(nothing()),
            };
        }

        query
    }
}

fn nothing() -> AsExprOf<bool, Bool> {
    false.into_sql::<Bool>()
}

/// Cooking times are whole minutes, so `>= 50.5` and `>= 51` accept the same rows.
fn lower_bound(minutes: f64) -> Option<i32> {
    (!minutes.is_nan()).then(|| minutes.ceil() as i32)
}

fn upper_bound(minutes: f64) -> Option<i32> {
    (!minutes.is_nan()).then(|| minutes.floor() as i32)
}

/// `LIKE` pattern matching `needle` anywhere, with the pattern metacharacters taken literally.
fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Reads a decimal number the way a query string value is loosely coerced: surrounding
/// whitespace is ignored, an empty string is zero, `Infinity` is accepted and anything else that
/// isn't a plain decimal number becomes NaN.
pub fn coerce_number(raw: &str) -> f64 {
    let trimmed = raw.trim();
    match trimmed {
        "" => 0.0,
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        // Rust would also accept spellings like "inf" or "NaN" here
        s if s.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') => f64::NAN,
        s => s.parse().unwrap_or(f64::NAN),
    }
}

#[test]
fn coerce_number_decimal() {
    assert_eq!(coerce_number("50"), 50.0);
    assert_eq!(coerce_number("  12 "), 12.0);
    assert_eq!(coerce_number("-3.5"), -3.5);
    assert_eq!(coerce_number("1e2"), 100.0);
    assert_eq!(coerce_number(""), 0.0);
    assert_eq!(coerce_number("Infinity"), f64::INFINITY);
    assert_eq!(coerce_number("-Infinity"), f64::NEG_INFINITY);
}

#[test]
fn coerce_number_garbage_is_nan() {
    for raw in ["chilli", "inf", "NaN", "12abc", "1_000", "+-5", "5 5"] {
        assert!(coerce_number(raw).is_nan(), "{raw:?} should not be a number");
    }
}

#[test]
fn contains_pattern_escapes_metacharacters() {
    assert_eq!(contains_pattern("salmon"), "%salmon%");
    assert_eq!(contains_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
}

#[test]
fn cooking_time_bounds_round_inwards() {
    assert_eq!(lower_bound(50.5), Some(51));
    assert_eq!(upper_bound(50.5), Some(50));
    assert_eq!(lower_bound(f64::NEG_INFINITY), Some(i32::MIN));
    assert_eq!(upper_bound(f64::INFINITY), Some(i32::MAX));
    assert_eq!(lower_bound(f64::NAN), None);
    assert_eq!(upper_bound(f64::NAN), None);
}

#[test]
fn from_query_only_constrains_present_fields() {
    let filter = RecipeFilter::from_query(&RecipeFilterQuery::default());
    assert!(filter.name.is_none() && filter.creator.is_none());
    assert!(filter.difficulty_level.is_none());
    assert!(filter.min_cooking_time.is_none() && filter.max_cooking_time.is_none());

    let filter = RecipeFilter::from_query(&RecipeFilterQuery {
        name: Some("salmon".into()),
        creator: Some("7".into()),
        page: Some("2".into()),
        ..Default::default()
    });
    assert_eq!(filter.name.as_deref(), Some("salmon"));
    assert_eq!(filter.creator, Some(CreatorMatch::User("7".parse().unwrap())));
    assert_eq!(filter.difficulty_level, None);
    assert_eq!(filter.min_cooking_time, None);
    assert_eq!(filter.max_cooking_time, None);
}

#[test]
fn from_query_keeps_unparseable_values() {
    let filter = RecipeFilter::from_query(&RecipeFilterQuery {
        creator: Some("not-an-id".into()),
        min_cooking_time: Some("chilli".into()),
        ..Default::default()
    });
    assert_eq!(
        filter.creator,
        Some(CreatorMatch::Unresolvable("not-an-id".into()))
    );
    assert!(filter.min_cooking_time.unwrap().is_nan());
    assert_eq!(filter.max_cooking_time, None);
}

#[test]
fn query_deserializes_from_camel_case() {
    let query: RecipeFilterQuery =
        serde_json::from_str(r#"{"difficultyLevel": "hard", "itemsPerPage": "2"}"#).unwrap();
    assert_eq!(query.difficulty_level.as_deref(), Some("hard"));
    assert_eq!(query.items_per_page.as_deref(), Some("2"));
    assert_eq!(query.name, None);
}
