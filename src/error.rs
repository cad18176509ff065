// Copyright 2023 Remi Bernotavicius

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("store error: {0}")]
    Store(#[from] diesel::result::Error),

    #[error("failed to open database: {0}")]
    Connection(#[from] diesel::ConnectionError),

    #[error("failed to run migrations: {0}")]
    Migration(String),

    #[error("invalid {field} {value:?}: expected a whole number of at least 1")]
    InvalidPagination { field: &'static str, value: String },

    #[error("cooking time {0} is outside of 0..=480 minutes")]
    CookingTimeOutOfRange(i32),

    #[error("recipe name must not be empty")]
    EmptyName,

    #[error("a recipe named {0:?} already exists")]
    DuplicateRecipe(String),

    #[error("a user with email {0:?} already exists")]
    DuplicateUser(String),
}

pub type Result<T> = std::result::Result<T, Error>;

pub(crate) fn is_unique_violation(error: &diesel::result::Error) -> bool {
    matches!(
        error,
        diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            _
        )
    )
}
