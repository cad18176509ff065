// Copyright 2023 Remi Bernotavicius

use clap::Parser;
use clap::Subcommand;
use std::path::PathBuf;
use std::process::ExitCode;

mod database;
mod error;
mod query;
mod recipes;
mod seed;
mod users;

use database::models::UserId;
use query::RecipeFilterQuery;
use recipes::{NewRecipe, RecipeChanges};
use users::{NewUser, UserChanges};

type Error = Box<dyn std::error::Error + Send + Sync + 'static>;
type Result<T> = std::result::Result<T, Error>;

#[derive(Parser, Debug)]
struct Args {
    /// SQLite database to use, created if missing
    #[arg(long, global = true, env = "RECIPE_SHARE_DATABASE")]
    database: Option<PathBuf>,

    #[arg(long, global = true, env = "RECIPE_SHARE_LOG", default_value = "warn")]
    log_level: log::LevelFilter,

    #[command(subcommand)]
    commands: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Add the admin user and the starter recipes
    Seed,
    /// Print one page of the recipes matching the given filters
    List(ListArgs),
    /// Print every recipe with its store metadata
    All,
    Show {
        name: String,
    },
    Add(AddArgs),
    Update(UpdateArgs),
    Delete {
        name: String,
    },
    AddUser {
        full_name: String,
        email: String,
    },
    UpdateUser {
        id: UserId,
        #[arg(long)]
        full_name: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    DeleteUser {
        id: UserId,
    },
}

/// Values are taken as typed, the same way they would arrive in a query string.
#[derive(Debug, clap::Args)]
struct ListArgs {
    /// Case-insensitive part of the recipe name
    #[arg(long)]
    name: Option<String>,
    /// Id of the user who created the recipe
    #[arg(long)]
    creator: Option<String>,
    #[arg(long)]
    difficulty_level: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    min_cooking_time: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    max_cooking_time: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    page: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    items_per_page: Option<String>,
}

impl From<ListArgs> for RecipeFilterQuery {
    fn from(args: ListArgs) -> Self {
        Self {
            name: args.name,
            creator: args.creator,
            difficulty_level: args.difficulty_level,
            min_cooking_time: args.min_cooking_time,
            max_cooking_time: args.max_cooking_time,
            page: args.page,
            items_per_page: args.items_per_page,
        }
    }
}

#[derive(Debug, clap::Args)]
struct AddArgs {
    name: String,
    /// In minutes, from 0 to 480
    #[arg(long)]
    cooking_time: i32,
    /// May be given more than once, order is kept
    #[arg(long = "ingredient")]
    ingredients: Vec<String>,
    #[arg(long)]
    creator: Option<UserId>,
    #[arg(long)]
    difficulty_level: Option<String>,
}

impl From<AddArgs> for NewRecipe {
    fn from(args: AddArgs) -> Self {
        Self {
            name: args.name,
            creator: args.creator,
            ingredients: args.ingredients,
            cooking_time: args.cooking_time,
            difficulty_level: args.difficulty_level,
        }
    }
}

#[derive(Debug, clap::Args)]
struct UpdateArgs {
    name: String,
    #[arg(long)]
    cooking_time: Option<i32>,
    /// Replaces all of the ingredients, may be given more than once
    #[arg(long = "ingredient")]
    ingredients: Vec<String>,
    #[arg(long)]
    creator: Option<UserId>,
    /// Detach the recipe from its creator
    #[arg(long, conflicts_with = "creator")]
    no_creator: bool,
    #[arg(long)]
    difficulty_level: Option<String>,
}

impl From<UpdateArgs> for RecipeChanges {
    fn from(args: UpdateArgs) -> Self {
        let creator = if args.no_creator {
            Some(None)
        } else {
            args.creator.map(Some)
        };
        Self {
            creator,
            ingredients: (!args.ingredients.is_empty()).then_some(args.ingredients),
            cooking_time: args.cooking_time,
            difficulty_level: args.difficulty_level,
        }
    }
}

/// This is where the database lives on-disk by default. On Linux it should be like:
/// `~/.local/share/recipe_share/`
fn data_path() -> Result<PathBuf> {
    let dirs = directories::BaseDirs::new().ok_or("failed to get user home directory")?;
    let path = dirs.data_dir().join("recipe_share");
    std::fs::create_dir_all(&path)?;
    Ok(path)
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(conn: &mut database::Connection, command: Commands) -> Result<()> {
    match command {
        Commands::Seed => {
            let report = seed::seed_defaults(conn)?;
            println!(
                "added {} user(s) and {} recipe(s)",
                report.users_added, report.recipes_added
            );
        }
        Commands::List(args) => print_json(&query::filter_recipes(conn, &args.into())?)?,
        Commands::All => print_json(&recipes::find_all_recipes(conn)?)?,
        Commands::Show { name } => match recipes::find_recipe_by_name(conn, &name)? {
            Some(recipe) => print_json(&recipe)?,
            None => return Err(format!("no recipe named {name:?}").into()),
        },
        Commands::Add(args) => print_json(&recipes::create_recipe(conn, &args.into())?)?,
        Commands::Update(args) => {
            let name = args.name.clone();
            match recipes::update_recipe(conn, &name, &args.into())? {
                Some(recipe) => print_json(&recipe)?,
                None => return Err(format!("no recipe named {name:?}").into()),
            }
        }
        Commands::Delete { name } => {
            if !recipes::delete_recipe(conn, &name)? {
                return Err(format!("no recipe named {name:?}").into());
            }
        }
        Commands::AddUser { full_name, email } => {
            print_json(&users::add_user(conn, &NewUser::new(full_name, email))?)?
        }
        Commands::UpdateUser {
            id,
            full_name,
            email,
        } => {
            let changes = UserChanges { full_name, email };
            match users::update_user(conn, id, &changes)? {
                Some(user) => print_json(&user)?,
                None => return Err(format!("no user with id {id}").into()),
            }
        }
        Commands::DeleteUser { id } => {
            if !users::delete_user(conn, id)? {
                return Err(format!("no user with id {id}").into());
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    let result = simple_logger::SimpleLogger::new()
        .with_level(args.log_level)
        .init()
        .map_err(Error::from)
        .and_then(|()| {
            let path = match args.database {
                Some(path) => path,
                None => data_path()?.join("data.sqlite"),
            };
            let mut conn = database::establish_connection(path)?;
            run(&mut conn, args.commands)
        });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[test]
fn cli_definition() {
    use clap::CommandFactory as _;
    Args::command().debug_assert();
}

#[test]
fn update_args_to_changes() {
    let args = Args::parse_from([
        "recipe-share",
        "update",
        "toast",
        "--no-creator",
        "--ingredient",
        "bread",
        "--ingredient",
        "butter",
    ]);
    let Commands::Update(update) = args.commands else {
        panic!("expected the update command");
    };
    assert_eq!(
        RecipeChanges::from(update),
        RecipeChanges {
            creator: Some(None),
            ingredients: Some(vec!["bread".into(), "butter".into()]),
            cooking_time: None,
            difficulty_level: None,
        }
    );
}

#[test]
fn list_args_keep_raw_values() {
    let args = Args::parse_from([
        "recipe-share",
        "list",
        "--min-cooking-time",
        "chilli",
        "--page",
        "-1",
    ]);
    let Commands::List(list) = args.commands else {
        panic!("expected the list command");
    };
    let query = RecipeFilterQuery::from(list);
    assert_eq!(query.min_cooking_time.as_deref(), Some("chilli"));
    assert_eq!(query.page.as_deref(), Some("-1"));
    assert_eq!(query.name, None);
}
