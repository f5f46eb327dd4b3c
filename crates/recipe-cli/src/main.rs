use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use recipe_api::{init_tracing, AppState, Server};
use recipe_core::{ConfigManager, Database, Ingredient, NewUser, Settings, Tag};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "recipe")]
#[command(about = "Recipe API server and management commands", long_about = None)]
#[command(version)]
struct Cli {
    /// Directory holding default.toml / {env}.toml / local.toml
    #[arg(long, global = true, env = "RECIPE_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Environment name used to pick {env}.toml
    #[arg(long, global = true)]
    env: Option<String>,

    /// Override database.url
    #[arg(long, global = true, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Apply pending database migrations
    Migrate,

    /// Create a staff + superuser account
    CreateSuperuser {
        #[arg(short, long)]
        email: String,
        #[arg(short, long, env = "RECIPE_SUPERUSER_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create a regular user account
    CreateUser {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
        #[arg(short, long, default_value = "")]
        name: String,
    },

    /// Delete a user together with their tags, ingredients and token
    DeleteUser {
        #[arg(short, long)]
        email: String,
    },

    /// Print (creating if needed) the auth token of a user
    Token {
        #[arg(short, long)]
        email: String,
    },

    /// Show a user's account and owned resource counts
    Show {
        #[arg(short, long)]
        email: String,
    },
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let manager = ConfigManager::load(cli.config_dir.clone(), cli.env.clone())?;
    let mut settings = Settings::clone(manager.settings());
    if let Some(url) = &cli.database_url {
        settings.database.url = url.clone();
    }
    settings.validate()?;
    Ok(settings)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(&cli)?;

    let level = if cli.verbose {
        "debug"
    } else {
        settings.logging.level.as_str()
    };
    init_tracing(level);

    match cli.command {
        Commands::Serve { host, port } => {
            let mut settings = settings;
            if let Some(host) = host {
                settings.server.host = host;
            }
            if let Some(port) = port {
                settings.server.port = port;
            }
            settings.validate()?;

            let config = Arc::new(ConfigManager::from_settings(settings));
            let state = AppState::new(config).await.context("opening database")?;
            Server::from_state(state).run().await?;
        }
        Commands::Migrate => {
            let db = Database::open(&settings.database).await?;
            db.close().await;
            println!("{} {}", "✓".green(), "Migrations applied".bold());
        }
        Commands::CreateSuperuser { email, password } => {
            let db = Database::open(&settings.database).await?;
            let user = db.create_superuser(&email, &password).await?;
            println!(
                "{} Superuser {} created (id {})",
                "✓".green(),
                user.email.bold(),
                user.id
            );
        }
        Commands::CreateUser {
            email,
            password,
            name,
        } => {
            let db = Database::open(&settings.database).await?;
            let user = db
                .create_user(NewUser::new(email, password).with_name(name))
                .await?;
            println!(
                "{} User {} created (id {})",
                "✓".green(),
                user.email.bold(),
                user.id
            );
        }
        Commands::DeleteUser { email } => {
            let db = Database::open(&settings.database).await?;
            let user = db
                .find_user_by_email(&email)
                .await?
                .with_context(|| format!("no user with email {}", email))?;
            db.delete_user(user.id).await?;
            println!("{} Deleted {}", "✓".green(), user.email.bold());
        }
        Commands::Token { email } => {
            let db = Database::open(&settings.database).await?;
            let user = db
                .find_user_by_email(&email)
                .await?
                .with_context(|| format!("no user with email {}", email))?;
            let token = db.get_or_create_token(user.id).await?;
            println!("{}", token.key);
        }
        Commands::Show { email } => {
            let db = Database::open(&settings.database).await?;
            let user = db
                .find_user_by_email(&email)
                .await?
                .with_context(|| format!("no user with email {}", email))?;
            let tags = db.count_owned::<Tag>(user.id).await?;
            let ingredients = db.count_owned::<Ingredient>(user.id).await?;

            println!("{}", user.email.bold().blue());
            println!("  {:<12} {}", "id:".dimmed(), user.id);
            println!("  {:<12} {}", "name:".dimmed(), user.name);
            println!("  {:<12} {}", "active:".dimmed(), flag(user.is_active));
            println!("  {:<12} {}", "staff:".dimmed(), flag(user.is_staff));
            println!("  {:<12} {}", "superuser:".dimmed(), flag(user.is_superuser));
            println!("  {:<12} {}", "joined:".dimmed(), user.date_joined.to_rfc3339());
            println!("  {:<12} {}", "tags:".dimmed(), tags);
            println!("  {:<12} {}", "ingredients:".dimmed(), ingredients);
        }
    }

    Ok(())
}

fn flag(value: bool) -> colored::ColoredString {
    if value {
        "yes".green()
    } else {
        "no".red()
    }
}
