pub mod application;
pub mod domain;
pub mod infrastructure;

use application::calendar_service::CalendarService;
use application::commands::{
    AppState, add_event_impl, availability_impl, commit_hours_impl, delete_event_impl,
    hours_summary_impl, load_oauth_config_from_env, login_impl, required_access_token, today_impl,
};
use application::oauth::OAuthManager;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use infrastructure::credential_store::KeyringCredentialStore;
use infrastructure::error::InfraError;
use infrastructure::google_calendar_client::ReqwestGoogleCalendarClient;
use infrastructure::logging::init_logging;
use infrastructure::oauth_client::ReqwestOAuthClient;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "dayplanner", version, about = "Google Calendar day planner")]
pub struct Cli {
    /// Directory holding config/, state/ and logs/.
    #[arg(long, global = true, env = "DAYPLANNER_HOME")]
    pub workspace: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Commands {
    /// Greeting and today's events
    Today,
    /// Authorize Google Calendar access
    Login {
        /// Authorization code returned by the consent page
        #[arg(long)]
        code: Option<String>,
        #[arg(long, conflicts_with = "code")]
        logout: bool,
    },
    /// Add an event today, e.g. `add 3:00PM 4:30PM "Practice"`
    Add {
        start: String,
        end: String,
        description: String,
    },
    /// Delete the next upcoming event with this description
    Delete { description: String },
    /// Free slots left today and the longest one
    Availability,
    /// Record hours worked
    Commit {
        hours: f64,
        category: Option<String>,
    },
    /// Totals per category over a date range
    Hours {
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Login { .. } => "login",
            Self::Add { .. } => "add",
            Self::Delete { .. } => "delete",
            Self::Availability => "availability",
            Self::Commit { .. } => "commit",
            Self::Hours { .. } => "hours",
        }
    }
}

fn oauth_manager() -> Result<OAuthManager<KeyringCredentialStore, ReqwestOAuthClient>, InfraError> {
    Ok(OAuthManager::new(
        load_oauth_config_from_env()?,
        Arc::new(KeyringCredentialStore::default()),
        Arc::new(ReqwestOAuthClient::new()),
    ))
}

async fn connect_calendar(
    state: &AppState,
) -> Result<(CalendarService<ReqwestGoogleCalendarClient>, String), InfraError> {
    let access_token = required_access_token(&oauth_manager()?).await?;
    let config = state.config();
    let service = CalendarService::new(
        Arc::new(ReqwestGoogleCalendarClient::new()),
        config.calendar_id.clone(),
        state.timezone(),
        config.upcoming_limit,
    );
    Ok((service, access_token))
}

async fn dispatch(state: &AppState, command: Commands) -> Result<String, InfraError> {
    let now = Utc::now();
    match command {
        Commands::Commit { hours, category } => {
            commit_hours_impl(state, &state.hours_ledger(), now, hours, category)
        }
        Commands::Hours { from, to } => hours_summary_impl(state, &state.hours_ledger(), now, from, to),
        Commands::Login { code, logout } => login_impl(&oauth_manager()?, code, logout).await,
        Commands::Today => {
            let (service, token) = connect_calendar(state).await?;
            today_impl(state, &service, &token, now).await
        }
        Commands::Availability => {
            let (service, token) = connect_calendar(state).await?;
            availability_impl(state, &service, &token, now).await
        }
        Commands::Add {
            start,
            end,
            description,
        } => {
            let (service, token) = connect_calendar(state).await?;
            add_event_impl(state, &service, &token, now, &start, &end, &description).await
        }
        Commands::Delete { description } => {
            let (service, token) = connect_calendar(state).await?;
            delete_event_impl(&service, &token, now, &description).await
        }
    }
}

pub async fn run(cli: Cli) -> Result<(), String> {
    let workspace_root = match cli.workspace {
        Some(path) => path,
        None => std::env::current_dir().map_err(|error| error.to_string())?,
    };
    let state = AppState::new(workspace_root).map_err(|error| error.to_string())?;
    init_logging(state.logs_dir(), cli.verbose).map_err(|error| error.to_string())?;

    let command = cli.command.unwrap_or(Commands::Today);
    let name = command.name();
    info!(command = name, "running command");

    let output = dispatch(&state, command)
        .await
        .map_err(|error| state.command_error(name, &error))?;
    println!("{output}");
    Ok(())
}
