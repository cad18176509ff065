// Copyright 2023 Remi Bernotavicius

//! The filtered recipe listing: build a predicate from the caller's query, select the matching
//! recipes, attach their creators' names, shape them for display and cut out the requested page.

use crate::database;
use crate::database::models::Recipe;
use crate::database::schema::recipes;
use crate::error::{Error, Result};
use crate::recipes::load_ingredients;
use diesel::prelude::Connection as _;
use diesel::ExpressionMethods as _;
use diesel::QueryDsl as _;
use diesel::RunQueryDsl as _;
use diesel::SelectableHelper as _;

pub mod enrich;
pub mod filter;
pub mod paginate;
pub mod project;

pub use filter::{RecipeFilter, RecipeFilterQuery};
pub use paginate::PageRequest;
pub use project::{PaginatedResult, PublicRecipe};

/// Lists one page of the recipes matching `query`, along with how many match in total.
///
/// Pagination input is validated before the store is touched. Non-numeric cooking time bounds
/// are not an error, they match nothing.
pub fn filter_recipes(
    conn: &mut database::Connection,
    query: &RecipeFilterQuery,
) -> Result<PaginatedResult> {
    let window = PageRequest::from_query(query.page.as_deref(), query.items_per_page.as_deref())?;
    let filter = RecipeFilter::from_query(query);
    run_filter(conn, &filter, window)
}

/// Counts and fetches inside one read transaction so that `pagination` and `data` describe the
/// same snapshot.
pub fn run_filter(
    conn: &mut database::Connection,
    filter: &RecipeFilter,
    window: PageRequest,
) -> Result<PaginatedResult> {
    log::debug!("filtering recipes by {filter:?}, {window:?}");

    conn.transaction::<_, Error, _>(|conn| {
        let total_items: i64 = filter
            .apply(recipes::table.into_boxed())
            .count()
            .get_result(conn)?;

        let page = fetch_page(conn, filter, window)?;
        let ingredients = load_ingredients(conn, &page)?;
        let creators = enrich::creator_names(conn, &page)?;

        let data: Vec<_> = page
            .into_iter()
            .zip(ingredients)
            .map(|(recipe, ingredients)| {
                let creator = enrich::creator_name(&creators, recipe.creator);
                PublicRecipe::new(recipe, ingredients, creator)
            })
            .collect();

        log::debug!("{} of {total_items} matching recipes on this page", data.len());
        Ok(PaginatedResult {
            pagination: window.pagination(total_items),
            data,
        })
    })
}

/// The matching recipes in storage order, skipping the pages before `window`.
fn fetch_page(
    conn: &mut database::Connection,
    filter: &RecipeFilter,
    window: PageRequest,
) -> Result<Vec<Recipe>> {
    Ok(filter
        .apply(recipes::table.into_boxed())
        .select(Recipe::as_select())
        .order(recipes::id.asc())
        .offset(window.offset())
        .limit(window.limit())
        .load(conn)?)
}

#[cfg(test)]
mod tests {
    use super::paginate::Pagination;
    use super::*;
    use crate::recipes::{create_recipe, NewRecipe};
    use crate::seed::seed_defaults;
    use crate::users::{add_user, delete_user, update_user, NewUser, UserChanges};

    fn query() -> RecipeFilterQuery {
        RecipeFilterQuery::default()
    }

    fn names(result: &PaginatedResult) -> Vec<&str> {
        result.data.iter().map(|r| r.name.as_str()).collect()
    }

    fn add(conn: &mut database::Connection, name: &str, cooking_time: i32) {
        create_recipe(conn, &NewRecipe::new(name, cooking_time)).unwrap();
    }

    #[test]
    fn identity_filter_returns_first_page_of_everything() {
        let mut conn = database::test_connection();
        for i in 0..12 {
            add(&mut conn, &format!("recipe-{i}"), i);
        }

        let result = filter_recipes(&mut conn, &query()).unwrap();
        assert_eq!(
            result.pagination,
            Pagination {
                page: 1,
                items_per_page: 10,
                total_items: 12,
                total_pages: 2,
            }
        );
        let expected: Vec<String> = (0..10).map(|i| format!("recipe-{i}")).collect();
        assert_eq!(names(&result), expected);
    }

    #[test]
    fn name_is_case_insensitive_substring() {
        let mut conn = database::test_connection();
        add(&mut conn, "Roasted-Salmon", 60);
        add(&mut conn, "chicken-burger", 50);

        for needle in ["salmon", "SALMON", "ted-sal", "Roasted-Salmon"] {
            let result = filter_recipes(
                &mut conn,
                &RecipeFilterQuery {
                    name: Some(needle.into()),
                    ..query()
                },
            )
            .unwrap();
            assert_eq!(names(&result), ["Roasted-Salmon"], "{needle:?}");
            assert_eq!(result.pagination.total_items, 1);
        }
    }

    #[test]
    fn name_folds_non_ascii_case() {
        let mut conn = database::test_connection();
        add(&mut conn, "Crème-Brûlée", 40);
        add(&mut conn, "cream-pie", 30);

        for needle in ["CRÈME", "brûlée", "BRÛLÉE", "ème-b"] {
            let result = filter_recipes(
                &mut conn,
                &RecipeFilterQuery {
                    name: Some(needle.into()),
                    ..query()
                },
            )
            .unwrap();
            assert_eq!(names(&result), ["Crème-Brûlée"], "{needle:?}");
        }
    }

    #[test]
    fn name_pattern_characters_are_literal() {
        let mut conn = database::test_connection();
        add(&mut conn, "100%-rye", 60);
        add(&mut conn, "1000-rye", 60);
        add(&mut conn, "snake_case", 5);
        add(&mut conn, "snakes", 5);

        let by_name = |conn: &mut database::Connection, needle: &str| {
            let filter = RecipeFilter::match_all().name(needle);
            let result = run_filter(conn, &filter, PageRequest::default()).unwrap();
            result.data.into_iter().map(|r| r.name).collect::<Vec<_>>()
        };
        assert_eq!(by_name(&mut conn, "100%"), ["100%-rye"]);
        assert_eq!(by_name(&mut conn, "e_c"), ["snake_case"]);
        assert_eq!(by_name(&mut conn, "."), Vec::<String>::new());
    }

    #[test]
    fn cooking_time_range_is_inclusive() {
        let mut conn = database::test_connection();
        for (name, minutes) in [("a", 30), ("b", 50), ("c", 60), ("d", 120)] {
            add(&mut conn, name, minutes);
        }

        let cooking_times =
            |conn: &mut database::Connection, min: Option<&str>, max: Option<&str>| {
                let query = RecipeFilterQuery {
                    min_cooking_time: min.map(Into::into),
                    max_cooking_time: max.map(Into::into),
                    ..query()
                };
                let result = filter_recipes(conn, &query).unwrap();
                assert_eq!(result.pagination.total_items as usize, result.data.len());
                result.data.iter().map(|r| r.cooking_time).collect::<Vec<_>>()
            };

        assert_eq!(cooking_times(&mut conn, Some("50"), None), [50, 60, 120]);
        assert_eq!(cooking_times(&mut conn, None, Some("50")), [30, 50]);
        assert_eq!(cooking_times(&mut conn, Some("50"), Some("60")), [50, 60]);
        assert_eq!(cooking_times(&mut conn, Some("50.5"), Some("60")), [60]);
        assert_eq!(cooking_times(&mut conn, Some("61"), Some("60")), Vec::<i32>::new());
    }

    #[test]
    fn non_numeric_cooking_time_matches_nothing() {
        let mut conn = database::test_connection();
        seed_defaults(&mut conn).unwrap();

        for (min, max) in [
            (Some("chilli"), None),
            (None, Some("chilli")),
            (Some("5"), Some("x")),
        ] {
            let result = filter_recipes(
                &mut conn,
                &RecipeFilterQuery {
                    min_cooking_time: min.map(Into::into),
                    max_cooking_time: max.map(Into::into),
                    ..query()
                },
            )
            .unwrap();
            assert!(result.data.is_empty());
            assert_eq!(result.pagination.total_items, 0);
            assert_eq!(result.pagination.total_pages, 0);
        }
    }

    #[test]
    fn pagination_arithmetic() {
        let mut conn = database::test_connection();
        seed_defaults(&mut conn).unwrap();

        let page = |conn: &mut database::Connection, page: &str| {
            filter_recipes(
                conn,
                &RecipeFilterQuery {
                    page: Some(page.into()),
                    items_per_page: Some("2".into()),
                    ..query()
                },
            )
            .unwrap()
        };

        let first = page(&mut conn, "1");
        assert_eq!(names(&first), ["roasted-salmon", "chicken-burger"]);
        assert_eq!(first.pagination.total_pages, 3);

        let last = page(&mut conn, "3");
        assert_eq!(names(&last), ["omlette"]);
        assert_eq!(last.pagination.total_items, 5);

        let beyond = page(&mut conn, "4");
        assert!(beyond.data.is_empty());
        assert_eq!(
            beyond.pagination,
            Pagination {
                page: 4,
                items_per_page: 2,
                total_items: 5,
                total_pages: 3,
            }
        );
    }

    #[test]
    fn invalid_page_is_reported() {
        let mut conn = database::test_connection();
        seed_defaults(&mut conn).unwrap();

        let error = filter_recipes(
            &mut conn,
            &RecipeFilterQuery {
                page: Some("hello".into()),
                ..query()
            },
        )
        .unwrap_err();
        assert!(matches!(
            error,
            Error::InvalidPagination { field: "page", .. }
        ));

        let error = filter_recipes(
            &mut conn,
            &RecipeFilterQuery {
                items_per_page: Some("0".into()),
                ..query()
            },
        )
        .unwrap_err();
        assert!(matches!(
            error,
            Error::InvalidPagination {
                field: "itemsPerPage",
                ..
            }
        ));
    }

    #[test]
    fn creator_is_enriched_or_null() {
        let mut conn = database::test_connection();
        let chef = add_user(&mut conn, &NewUser::new("Julia Child", "julia@example.com")).unwrap();
        let gone = add_user(&mut conn, &NewUser::new("Gone Cook", "gone@example.com")).unwrap();

        let mut with_creator = NewRecipe::new("boeuf-bourguignon", 240);
        with_creator.creator = Some(chef.id);
        with_creator.ingredients = vec!["beef".into(), "wine".into(), "onion".into()];
        create_recipe(&mut conn, &with_creator).unwrap();

        add(&mut conn, "toast", 3);

        let mut orphan = NewRecipe::new("soup", 45);
        orphan.creator = Some(gone.id);
        create_recipe(&mut conn, &orphan).unwrap();
        delete_user(&mut conn, gone.id).unwrap();

        let result = filter_recipes(&mut conn, &query()).unwrap();
        assert_eq!(result.pagination.total_items, 3);
        assert_eq!(
            result.data,
            [
                PublicRecipe {
                    name: "boeuf-bourguignon".into(),
                    ingredients: vec!["beef".into(), "wine".into(), "onion".into()],
                    cooking_time: 240,
                    difficulty_level: "unknown".into(),
                    creator: Some("Julia Child".into()),
                },
                PublicRecipe {
                    name: "toast".into(),
                    ingredients: vec![],
                    cooking_time: 3,
                    difficulty_level: "unknown".into(),
                    creator: None,
                },
                PublicRecipe {
                    name: "soup".into(),
                    ingredients: vec![],
                    cooking_time: 45,
                    difficulty_level: "unknown".into(),
                    creator: None,
                },
            ]
        );

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["data"][1]["creator"], serde_json::Value::Null);
        assert!(json["data"][1].get("id").is_none());
    }

    #[test]
    fn creator_filter() {
        let mut conn = database::test_connection();
        let chef = add_user(&mut conn, &NewUser::new("Julia Child", "julia@example.com")).unwrap();
        let mut recipe = NewRecipe::new("crepes", 20);
        recipe.creator = Some(chef.id);
        create_recipe(&mut conn, &recipe).unwrap();
        add(&mut conn, "toast", 3);

        let by_creator = |conn: &mut database::Connection, creator: &str| {
            let query = RecipeFilterQuery {
                creator: Some(creator.into()),
                ..query()
            };
            filter_recipes(conn, &query).unwrap()
        };

        let result = by_creator(&mut conn, &chef.id.to_string());
        assert_eq!(names(&result), ["crepes"]);
        assert_eq!(result.data[0].creator.as_deref(), Some("Julia Child"));

        assert!(by_creator(&mut conn, "not-an-id").data.is_empty());
        assert!(by_creator(&mut conn, "999").data.is_empty());
    }

    #[test]
    fn difficulty_level_is_exact() {
        let mut conn = database::test_connection();
        seed_defaults(&mut conn).unwrap();

        let by_level = |conn: &mut database::Connection, level: &str| {
            let query = RecipeFilterQuery {
                difficulty_level: Some(level.into()),
                ..query()
            };
            filter_recipes(conn, &query).unwrap()
        };

        let hard = by_level(&mut conn, "hard");
        assert_eq!(names(&hard), ["chicken-burger", "vegan-hamburger"]);
        assert!(hard.data.iter().all(|r| r.difficulty_level == "hard"));

        assert!(by_level(&mut conn, "Hard").data.is_empty());
        assert!(by_level(&mut conn, "har").data.is_empty());
    }

    #[test]
    fn filters_combine() {
        let mut conn = database::test_connection();
        seed_defaults(&mut conn).unwrap();

        let query = RecipeFilterQuery {
            name: Some("burger".into()),
            difficulty_level: Some("hard".into()),
            max_cooking_time: Some("10".into()),
            ..query()
        };
        let result = filter_recipes(&mut conn, &query).unwrap();
        assert_eq!(names(&result), ["vegan-hamburger"]);
        assert_eq!(result.pagination.total_pages, 1);
    }

    #[test]
    fn page_larger_than_sqlite_parameter_limit() {
        const COUNT: usize = 33_000;

        let mut conn = database::test_connection();
        let chef = add_user(&mut conn, &NewUser::new("Julia Child", "julia@example.com")).unwrap();
        for i in 0..COUNT {
            let mut recipe = NewRecipe::new(format!("recipe-{i}"), (i % 480) as i32);
            recipe.creator = Some(if i == COUNT - 1 {
                chef.id
            } else {
                // nobody has these ids, each recipe still adds one to the lookup
                (1_000 + i).to_string().parse().unwrap()
            });
            if i == 0 || i == COUNT - 1 {
                recipe.ingredients = vec!["salt".into(), "pepper".into()];
            }
            create_recipe(&mut conn, &recipe).unwrap();
        }

        let result = filter_recipes(
            &mut conn,
            &RecipeFilterQuery {
                items_per_page: Some("40000".into()),
                ..query()
            },
        )
        .unwrap();
        assert_eq!(
            result.pagination,
            Pagination {
                page: 1,
                items_per_page: 40_000,
                total_items: COUNT as i64,
                total_pages: 1,
            }
        );
        assert_eq!(result.data.len(), COUNT);

        let (first, last) = (&result.data[0], &result.data[COUNT - 1]);
        assert_eq!((first.name.as_str(), first.creator.as_deref()), ("recipe-0", None));
        assert_eq!(first.ingredients, ["salt", "pepper"]);
        assert_eq!(last.creator.as_deref(), Some("Julia Child"));
        assert_eq!(last.ingredients, ["salt", "pepper"]);
        assert!(result.data[1..COUNT - 1]
            .iter()
            .all(|r| r.ingredients.is_empty() && r.creator.is_none()));
    }

    #[test]
    fn renamed_creator_shows_new_name() {
        let mut conn = database::test_connection();
        let chef = add_user(&mut conn, &NewUser::new("Julia Child", "julia@example.com")).unwrap();
        let mut recipe = NewRecipe::new("crepes", 20);
        recipe.creator = Some(chef.id);
        create_recipe(&mut conn, &recipe).unwrap();

        let changes = UserChanges {
            full_name: Some("Julia McWilliams".into()),
            ..Default::default()
        };
        update_user(&mut conn, chef.id, &changes).unwrap().unwrap();

        let result = filter_recipes(&mut conn, &query()).unwrap();
        assert_eq!(result.data[0].creator.as_deref(), Some("Julia McWilliams"));
    }

    #[test]
    fn empty_store() {
        let mut conn = database::test_connection();
        let result = filter_recipes(&mut conn, &query()).unwrap();
        assert!(result.data.is_empty());
        assert_eq!(result.pagination.total_items, 0);
        assert_eq!(result.pagination.total_pages, 0);
        assert_eq!(result.pagination.page, 1);
    }
}
