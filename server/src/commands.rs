use std::path::PathBuf;

use clap::{Args, Subcommand};
use color_eyre::eyre::Context;
use db::PgStore;
use pantry::{
    catalog,
    models::{NewIngredient, NewTag, NewUser},
    users, Error,
};

use crate::{http_server, AppState, Result};

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run the HTTP API.
    Serve {
        /// Keep everything in process memory instead of Postgres.
        #[arg(long)]
        in_memory: bool,
    },
    /// Apply pending database migrations and exit.
    Migrate,
    /// Create a user and print their API token.
    CreateUser(CreateUser),
    CreateTag(CreateTag),
    /// Load ingredients from a JSON array of `{name, measurement_unit}`.
    ImportIngredients { file: PathBuf },
}

impl Default for Command {
    fn default() -> Self {
        Self::Serve { in_memory: false }
    }
}

#[derive(Args)]
pub(crate) struct CreateUser {
    #[arg(long)]
    email: String,
    #[arg(long)]
    username: String,
    #[arg(long)]
    first_name: String,
    #[arg(long)]
    last_name: String,
    #[arg(long)]
    staff: bool,
}

#[derive(Args)]
pub(crate) struct CreateTag {
    #[arg(long)]
    name: String,
    /// `#RRGGBB`
    #[arg(long)]
    color: String,
    #[arg(long)]
    slug: String,
}

async fn pg_store() -> Result<PgStore> {
    Ok(PgStore::new(db::setup_db_pool().await?))
}

impl Command {
    pub(crate) async fn run(self) -> Result<()> {
        match self {
            Command::Serve { in_memory } => {
                let state = AppState::from_env(in_memory).await?;
                http_server::run_server(state).await
            }
            Command::Migrate => {
                let pool = db::connect().await?;
                db::migrate(&pool).await
            }
            Command::CreateUser(args) => args.run().await,
            Command::CreateTag(args) => args.run().await,
            Command::ImportIngredients { file } => import_ingredients(file).await,
        }
    }
}

impl CreateUser {
    async fn run(self) -> Result<()> {
        let store = pg_store().await?;
        let (user, token) = users::register(
            &store,
            NewUser {
                email: self.email,
                username: self.username,
                first_name: self.first_name,
                last_name: self.last_name,
                is_staff: self.staff,
            },
        )
        .await?;

        println!("Created {} ({})", user.username, user.user_id);
        println!("Token: {token}");

        Ok(())
    }
}

impl CreateTag {
    async fn run(self) -> Result<()> {
        let store = pg_store().await?;
        let tag = catalog::create_tag(
            &store,
            NewTag {
                name: self.name,
                color: self.color,
                slug: self.slug,
            },
        )
        .await?;

        println!("Created tag {} ({})", tag.slug, tag.tag_id);

        Ok(())
    }
}

/// Existing `(name, unit)` pairs are skipped, so the import can be re-run.
#[tracing::instrument(err)]
async fn import_ingredients(file: PathBuf) -> Result<()> {
    let raw = tokio::fs::read_to_string(&file)
        .await
        .wrap_err_with(|| format!("Couldn't read {}", file.display()))?;
    let ingredients: Vec<NewIngredient> =
        serde_json::from_str(&raw).wrap_err("Expected a JSON array of ingredients")?;

    let store = pg_store().await?;
    let (mut created, mut skipped) = (0usize, 0usize);
    for ingredient in ingredients {
        match catalog::create_ingredient(&store, ingredient).await {
            Ok(_) => created += 1,
            Err(Error::Conflict(_)) => skipped += 1,
            Err(err) => return Err(err.into()),
        }
    }

    tracing::info!(created, skipped, "Imported ingredients");
    println!("Imported {created} ingredients, skipped {skipped} existing");

    Ok(())
}
