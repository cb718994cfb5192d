use std::{process::ExitCode, sync::Arc};

use anyhow::Context;
use clap::{Parser, Subcommand};
use weather_core::{Config, Flash, User, WeatherApp, WeatherStore, provider_from_config};

use crate::output;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Weather lookups and saved locations")]
pub struct Cli {
    /// Act as this user.
    #[arg(long, short, global = true, env = "WEATHER_USER")]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key.
    Configure,

    #[command(flatten)]
    App(AppCommand),
}

/// Commands that run against the store and the weather client.
#[derive(Debug, Subcommand)]
pub enum AppCommand {
    /// Show current weather for a location name.
    Search {
        /// City or place name, e.g. "Paris" or "Paris,FR".
        location: String,
    },

    /// Show current weather at a coordinate pair.
    At {
        #[arg(long, allow_hyphen_values = true)]
        lat: Option<String>,
        #[arg(long, allow_hyphen_values = true)]
        lon: Option<String>,
    },

    /// Weather for your default location and your saved locations.
    Home,

    /// Create an account.
    Register {
        username: String,
        #[arg(long)]
        email: Option<String>,
    },

    /// Show or update your profile.
    Profile {
        #[command(subcommand)]
        action: Option<ProfileAction>,
    },

    /// Manage saved locations.
    #[command(subcommand)]
    Favorites(FavoritesAction),
}

#[derive(Debug, Subcommand)]
pub enum ProfileAction {
    Show,
    /// Blank values clear the field.
    Update {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        default_location: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum FavoritesAction {
    List,
    Save {
        name: String,
        #[arg(long, allow_hyphen_values = true)]
        lat: String,
        #[arg(long, allow_hyphen_values = true)]
        lon: String,
    },
    Delete {
        id: i64,
    },
    /// Make a saved location your default.
    Default {
        id: i64,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<ExitCode> {
        let command = match self.command {
            Command::Configure => {
                configure()?;
                return Ok(ExitCode::SUCCESS);
            }
            Command::App(command) => command,
        };

        let config = Config::load()?;
        let provider = provider_from_config(&config)?;
        let db_path = config.database_path()?;
        tracing::debug!(
            path = %db_path.display(),
            configured = config.is_configured(),
            "Opening database"
        );
        let store = WeatherStore::open(&db_path)
            .with_context(|| format!("Failed to open database: {}", db_path.display()))?;
        let app = WeatherApp::new(Arc::from(provider), store);

        let outcome = dispatch(&app, self.user.as_deref(), command).await;
        Ok(match outcome {
            Ok(()) => ExitCode::SUCCESS,
            Err(flash) => {
                output::flash(&flash);
                ExitCode::FAILURE
            }
        })
    }
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let api_key = inquire::Password::new("OpenWeather API key:")
        .without_confirmation()
        .with_display_toggle_enabled()
        .prompt()
        .context("Failed to read API key")?;

    config.set_api_key(api_key.trim().to_string());
    config.save()?;

    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

fn signed_in(app: &WeatherApp, user: Option<&str>) -> Result<User, Flash> {
    match user {
        Some(name) => app.sign_in(name),
        None => Err(Flash::error("Please sign in with --user or WEATHER_USER.")),
    }
}

fn optional_user(app: &WeatherApp, user: Option<&str>) -> Result<Option<User>, Flash> {
    user.map(|name| app.sign_in(name)).transpose()
}

/// Errors come back as a flash to print; successes print themselves.
async fn dispatch(app: &WeatherApp, user: Option<&str>, command: AppCommand) -> Result<(), Flash> {
    match command {
        AppCommand::Search { location } => {
            let user = optional_user(app, user)?;
            let view = app.search(user.as_ref(), &location).await?;
            output::weather(&view);
        }
        AppCommand::At { lat, lon } => {
            let user = optional_user(app, user)?;
            let view = app
                .weather_at(user.as_ref(), lat.as_deref(), lon.as_deref())
                .await?;
            output::weather(&view);
        }
        AppCommand::Home => {
            let user = optional_user(app, user)?;
            match &user {
                Some(user) => match app.default_weather(user).await {
                    Ok(view) => output::weather(&view),
                    Err(flash) if !flash.is_error() => {
                        output::flash(&flash);
                        output::favorites(&app.home(Some(user))?);
                    }
                    Err(flash) => return Err(flash),
                },
                None => println!("Search for a location with `weather search <location>`."),
            }
        }
        AppCommand::Register { username, email } => {
            let (_, flash) = app.register(&username, email.as_deref())?;
            output::flash(&flash);
        }
        AppCommand::Profile { action } => {
            let user = signed_in(app, user)?;
            match action.unwrap_or(ProfileAction::Show) {
                ProfileAction::Show => output::profile(&app.profile(&user)?),
                ProfileAction::Update {
                    email,
                    default_location,
                } => {
                    let current = app.profile(&user)?;
                    let email = email.or(current.user.email);
                    let default_location = default_location.or(current.profile.default_location);
                    report(app.update_profile(
                        &user,
                        email.as_deref(),
                        default_location.as_deref(),
                    ))?;
                }
            }
        }
        AppCommand::Favorites(action) => {
            let user = signed_in(app, user)?;
            match action {
                FavoritesAction::List => output::favorites(&app.home(Some(&user))?),
                FavoritesAction::Save { name, lat, lon } => {
                    let (lat, lon) = (Some(lat.as_str()), Some(lon.as_str()));
                    report(app.save_location(&user, Some(name.as_str()), lat, lon))?;
                }
                FavoritesAction::Delete { id } => report(app.delete_location(&user, id))?,
                FavoritesAction::Default { id } => report(app.set_default_location(&user, id))?,
            }
        }
    }
    Ok(())
}

fn report(flash: Flash) -> Result<(), Flash> {
    if flash.is_error() {
        return Err(flash);
    }
    output::flash(&flash);
    Ok(())
}
