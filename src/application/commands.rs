use crate::application::bootstrap::{WorkspacePaths, bootstrap_workspace};
use crate::application::calendar_service::{CalendarService, DeleteOutcome};
use crate::application::oauth::{
    CALENDAR_SCOPE, DEFAULT_REDIRECT_URI, EnsureTokenResult, OAuthConfig, OAuthManager,
};
use crate::domain::agenda::{format_agenda, greeting_line};
use crate::domain::free_time::analyze_day;
use crate::domain::interval::DayBounds;
use crate::domain::report::format_report;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::credential_store::CredentialStore;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::event_mapper::{agenda_item, busy_period};
use crate::infrastructure::google_calendar_client::GoogleCalendarClient;
use crate::infrastructure::hours_ledger::{HoursLedger, SqliteHoursLedger};
use crate::infrastructure::oauth_client::OAuthHttpClient;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, error, info};

static NEXT_STATE: AtomicU64 = AtomicU64::new(1);

fn next_oauth_state() -> String {
    let sequence = NEXT_STATE.fetch_add(1, Ordering::Relaxed);
    format!("dayplanner-{}-{sequence}", Utc::now().timestamp_micros())
}

pub struct AppState {
    paths: WorkspacePaths,
    config: AppConfig,
    timezone: Tz,
}

impl AppState {
    pub fn new(workspace_root: PathBuf) -> Result<Self, InfraError> {
        let bootstrap = bootstrap_workspace(&workspace_root)?;
        let timezone = bootstrap.config.time_zone()?;
        Ok(Self {
            paths: bootstrap.paths,
            config: bootstrap.config,
            timezone,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn logs_dir(&self) -> &Path {
        &self.paths.logs_dir
    }

    pub fn database_path(&self) -> &Path {
        &self.paths.database_path
    }

    pub fn hours_ledger(&self) -> SqliteHoursLedger {
        SqliteHoursLedger::new(self.database_path())
    }

    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.timezone).date_naive()
    }

    pub fn command_error(&self, command: &str, error: &InfraError) -> String {
        error!(command, %error, "command failed");
        error.to_string()
    }
}

pub async fn today_impl<C>(
    state: &AppState,
    service: &CalendarService<C>,
    access_token: &str,
    now: DateTime<Utc>,
) -> Result<String, InfraError>
where
    C: GoogleCalendarClient,
{
    let timezone = state.timezone();
    let bounds = DayBounds::for_date(state.today(now), timezone)?;
    let events = service.events_for_day(access_token, &bounds).await?;
    let items = events
        .iter()
        .filter_map(|event| agenda_item(event, timezone))
        .collect::<Vec<_>>();

    Ok(format!(
        "{}\n{}",
        greeting_line(now, timezone, &state.config().user_name),
        format_agenda(&items, timezone)
    ))
}

pub async fn availability_impl<C>(
    state: &AppState,
    service: &CalendarService<C>,
    access_token: &str,
    now: DateTime<Utc>,
) -> Result<String, InfraError>
where
    C: GoogleCalendarClient,
{
    let timezone = state.timezone();
    let bounds = DayBounds::for_date(state.today(now), timezone)?;
    let events = service.events_for_day(access_token, &bounds).await?;
    let busy = events
        .iter()
        .filter_map(|event| busy_period(event, timezone))
        .collect::<Vec<_>>();

    let analysis = analyze_day(bounds, &busy);
    info!(
        events = events.len(),
        busy = analysis.busy.len(),
        gaps = analysis.gaps.len(),
        skipped = analysis.skipped.len(),
        "computed availability"
    );
    Ok(format_report(&analysis, timezone))
}

pub async fn add_event_impl<C>(
    state: &AppState,
    service: &CalendarService<C>,
    access_token: &str,
    now: DateTime<Utc>,
    start: &str,
    end: &str,
    description: &str,
) -> Result<String, InfraError>
where
    C: GoogleCalendarClient,
{
    let created = service
        .add_event(access_token, state.today(now), start, end, description)
        .await?;
    let link = created
        .html_link
        .or(created.id)
        .unwrap_or_else(|| "(no link returned)".to_string());
    Ok(format!("Event created: {link}"))
}

pub async fn delete_event_impl<C>(
    service: &CalendarService<C>,
    access_token: &str,
    now: DateTime<Utc>,
    description: &str,
) -> Result<String, InfraError>
where
    C: GoogleCalendarClient,
{
    let description = description.trim();
    match service
        .delete_by_description(access_token, now, description)
        .await?
    {
        DeleteOutcome::Deleted { .. } => Ok(format!("Event '{description}' deleted successfully.")),
        DeleteOutcome::NotFound => Ok(format!("Event '{description}' not found.")),
    }
}

pub fn commit_hours_impl<L>(
    state: &AppState,
    ledger: &L,
    now: DateTime<Utc>,
    hours: f64,
    category: Option<String>,
) -> Result<String, InfraError>
where
    L: HoursLedger,
{
    let category = category
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| state.config().default_category.clone());
    let entry = ledger.record(state.today(now), &category, hours, now)?;
    info!(id = entry.id, category = %entry.category, hours = entry.hours, "committed hours");
    Ok(format!(
        "{} hours committed to {} successfully.",
        entry.hours, entry.category
    ))
}

pub fn hours_summary_impl<L>(
    state: &AppState,
    ledger: &L,
    now: DateTime<Utc>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<String, InfraError>
where
    L: HoursLedger,
{
    let today = state.today(now);
    let to = to.unwrap_or(today);
    let from = from.unwrap_or(to);
    let totals = ledger.totals_by_category(from, to)?;
    if totals.is_empty() {
        return Ok(format!("No hours committed between {from} and {to}."));
    }

    let mut lines = vec![format!("Hours committed from {from} to {to}:")];
    lines.extend(
        totals
            .iter()
            .map(|total| format!("  {}: {}", total.category, total.hours)),
    );
    Ok(lines.join("\n"))
}

pub async fn login_impl<S, C>(
    manager: &OAuthManager<S, C>,
    authorization_code: Option<String>,
    logout: bool,
) -> Result<String, InfraError>
where
    S: CredentialStore,
    C: OAuthHttpClient,
{
    if logout {
        manager.clear_stored_token()?;
        info!("cleared stored oauth token");
        return Ok("Signed out of Google Calendar.".to_string());
    }

    if let Some(code) = authorization_code {
        let token = manager.authenticate_with_code(&code).await?;
        return Ok(format!(
            "Authenticated. Token valid until {}.",
            token.expires_at.to_rfc3339()
        ));
    }

    match manager.ensure_access_token().await? {
        EnsureTokenResult::Existing(token) => Ok(format!(
            "Already authenticated. Token valid until {}.",
            token.expires_at.to_rfc3339()
        )),
        EnsureTokenResult::Refreshed(token) => Ok(format!(
            "Token refreshed. Valid until {}.",
            token.expires_at.to_rfc3339()
        )),
        EnsureTokenResult::ReauthenticationRequired => {
            let authorization_url = manager.build_authorization_url(&next_oauth_state())?;
            Ok(format!(
                "Open this URL to authorize access:\n{authorization_url}\nThen run `dayplanner login --code <CODE>`."
            ))
        }
    }
}

pub async fn required_access_token<S, C>(manager: &OAuthManager<S, C>) -> Result<String, InfraError>
where
    S: CredentialStore,
    C: OAuthHttpClient,
{
    match manager.ensure_access_token().await? {
        EnsureTokenResult::Existing(token) | EnsureTokenResult::Refreshed(token) => {
            debug!(expires_at = %token.expires_at, "using oauth access token");
            Ok(token.access_token)
        }
        EnsureTokenResult::ReauthenticationRequired => Err(InfraError::OAuth(
            "not authenticated with Google Calendar; run `dayplanner login`".to_string(),
        )),
    }
}

pub fn load_oauth_config_from_env() -> Result<OAuthConfig, InfraError> {
    load_oauth_config_from_lookup(|key| std::env::var(key).ok())
}

fn load_oauth_config_from_lookup<F>(lookup: F) -> Result<OAuthConfig, InfraError>
where
    F: Fn(&str) -> Option<String>,
{
    let client_id = required_lookup_value(
        &lookup,
        &["DAYPLANNER_GOOGLE_CLIENT_ID", "GOOGLE_CLIENT_ID"],
        "google client id",
    )?;
    let client_secret = required_lookup_value(
        &lookup,
        &["DAYPLANNER_GOOGLE_CLIENT_SECRET", "GOOGLE_CLIENT_SECRET"],
        "google client secret",
    )?;
    let redirect_uri = optional_lookup_value(
        &lookup,
        &["DAYPLANNER_GOOGLE_REDIRECT_URI", "GOOGLE_REDIRECT_URI"],
    )
    .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string());
    let scopes = optional_lookup_value(&lookup, &["DAYPLANNER_GOOGLE_SCOPES", "GOOGLE_SCOPES"])
        .map(|raw| parse_scope_list(&raw))
        .filter(|scopes| !scopes.is_empty())
        .unwrap_or_else(|| vec![CALENDAR_SCOPE.to_string()]);

    Ok(OAuthConfig::new(client_id, client_secret, redirect_uri, scopes))
}

fn required_lookup_value<F>(lookup: &F, keys: &[&str], field_name: &str) -> Result<String, InfraError>
where
    F: Fn(&str) -> Option<String>,
{
    optional_lookup_value(lookup, keys).ok_or_else(|| {
        InfraError::InvalidConfig(format!(
            "missing {field_name} (set one of: {})",
            keys.join(", ")
        ))
    })
}

fn optional_lookup_value<F>(lookup: &F, keys: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    keys.iter()
        .filter_map(|key| lookup(key))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

fn parse_scope_list(raw: &str) -> Vec<String> {
    raw.split([',', ' ', '\n', '\t'])
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::calendar_service::RetryPolicy;
    use crate::domain::models::OAuthToken;
    use crate::infrastructure::credential_store::InMemoryCredentialStore;
    use crate::infrastructure::event_mapper::{CalendarEventDateTime, GoogleCalendarEvent};
    use crate::infrastructure::google_calendar_client::ListEventsRequest;
    use crate::infrastructure::hours_ledger::InMemoryHoursLedger;
    use crate::infrastructure::oauth_client::{OAuthClientCredentials, OAuthTokenResponse, TokenGrant};
    use async_trait::async_trait;
    use std::fs;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Mutex};

    static NEXT_TEMP_WORKSPACE: AtomicUsize = AtomicUsize::new(0);

    struct TempWorkspace {
        path: PathBuf,
    }

    impl TempWorkspace {
        fn new() -> Self {
            let sequence = NEXT_TEMP_WORKSPACE.fetch_add(1, Ordering::Relaxed);
            let path = std::env::temp_dir().join(format!(
                "dayplanner-command-tests-{}-{}",
                std::process::id(),
                sequence
            ));
            fs::create_dir_all(&path).expect("create temp workspace");
            Self { path }
        }

        fn app_state(&self) -> AppState {
            AppState::new(self.path.clone()).expect("initialize app state")
        }
    }

    impl Drop for TempWorkspace {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.path);
        }
    }

    #[derive(Debug, Default)]
    struct FakeCalendarClient {
        events: Vec<GoogleCalendarEvent>,
        deleted: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl GoogleCalendarClient for FakeCalendarClient {
        async fn list_events(
            &self,
            _access_token: &str,
            _calendar_id: &str,
            _request: ListEventsRequest,
        ) -> Result<Vec<GoogleCalendarEvent>, InfraError> {
            Ok(self.events.clone())
        }

        async fn insert_event(
            &self,
            _access_token: &str,
            _calendar_id: &str,
            event: &GoogleCalendarEvent,
        ) -> Result<GoogleCalendarEvent, InfraError> {
            let mut created = event.clone();
            created.id = Some("new-event".to_string());
            created.html_link = Some("https://www.google.com/calendar/event?eid=new-event".to_string());
            Ok(created)
        }

        async fn delete_event(
            &self,
            _access_token: &str,
            _calendar_id: &str,
            event_id: &str,
        ) -> Result<(), InfraError> {
            self.deleted.lock().expect("delete mutex").push(event_id.to_string());
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    struct FakeOAuthHttpClient;

    #[async_trait]
    impl OAuthHttpClient for FakeOAuthHttpClient {
        async fn request_token(
            &self,
            _credentials: &OAuthClientCredentials,
            _grant: TokenGrant,
        ) -> Result<OAuthTokenResponse, InfraError> {
            Ok(OAuthTokenResponse {
                access_token: "exchanged-access".to_string(),
                refresh_token: Some("exchanged-refresh".to_string()),
                expires_in: 3600,
                token_type: Some("Bearer".to_string()),
                scope: None,
            })
        }
    }

    fn at(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    fn timed(id: &str, summary: &str, start: &str, end: &str) -> GoogleCalendarEvent {
        GoogleCalendarEvent {
            id: Some(id.to_string()),
            summary: Some(summary.to_string()),
            status: Some("confirmed".to_string()),
            transparency: None,
            html_link: None,
            start: CalendarEventDateTime {
                date_time: Some(start.to_string()),
                ..CalendarEventDateTime::default()
            },
            end: CalendarEventDateTime {
                date_time: Some(end.to_string()),
                ..CalendarEventDateTime::default()
            },
        }
    }

    fn service_with(events: Vec<GoogleCalendarEvent>) -> CalendarService<FakeCalendarClient> {
        let client = Arc::new(FakeCalendarClient {
            events,
            deleted: Mutex::new(Vec::new()),
        });
        CalendarService::new(client, "primary", chrono_tz::America::New_York, 10).with_retry_policy(
            RetryPolicy {
                max_attempts: 1,
                base_delay_ms: 1,
            },
        )
    }

    fn manager(
        store: &Arc<InMemoryCredentialStore>,
    ) -> OAuthManager<InMemoryCredentialStore, FakeOAuthHttpClient> {
        OAuthManager::new(
            OAuthConfig::new("client-id", "client-secret", DEFAULT_REDIRECT_URI, vec![CALENDAR_SCOPE.to_string()]),
            Arc::clone(store),
            Arc::new(FakeOAuthHttpClient),
        )
    }

    #[test]
    fn oauth_config_validation_reports_missing_client_id() {
        let result = load_oauth_config_from_lookup(|key| match key {
            "DAYPLANNER_GOOGLE_CLIENT_SECRET" => Some("secret".to_string()),
            _ => None,
        });
        match result {
            Err(InfraError::InvalidConfig(message)) => {
                assert!(message.contains("google client id"));
                assert!(message.contains("DAYPLANNER_GOOGLE_CLIENT_ID"));
            }
            other => panic!("expected invalid config error, got {other:?}"),
        }
    }

    #[test]
    fn oauth_config_falls_back_to_generic_keys_and_default_scope() {
        let config = load_oauth_config_from_lookup(|key| match key {
            "GOOGLE_CLIENT_ID" => Some(" id ".to_string()),
            "DAYPLANNER_GOOGLE_CLIENT_SECRET" => Some("secret".to_string()),
            "GOOGLE_SCOPES" => Some("  ".to_string()),
            _ => None,
        })
        .expect("config");
        assert_eq!(config.client_id, "id");
        assert_eq!(config.redirect_uri, DEFAULT_REDIRECT_URI);
        assert_eq!(config.scopes, vec![CALENDAR_SCOPE.to_string()]);
    }

    #[test]
    fn scope_list_splits_on_commas_and_whitespace() {
        assert_eq!(
            parse_scope_list("a, b\tc\n"),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
    }

    #[tokio::test]
    async fn availability_reports_free_slots_for_today() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();
        let service = service_with(vec![
            timed("e1", "Standup", "2026-02-16T09:00:00-05:00", "2026-02-16T10:00:00-05:00"),
            timed("e2", "Lunch", "2026-02-16T12:00:00-05:00", "2026-02-16T14:00:00-05:00"),
        ]);

        let report = availability_impl(&state, &service, "token", at("2026-02-16T13:00:00Z"))
            .await
            .expect("availability");

        assert_eq!(
            report,
            "Free Slots\n\
             ----------------\n\
             12:00AM - 9:00AM\n\
             10:00AM - 12:00PM\n\
             2:00PM - 12:00AM\n\
             ----------------\n\
             The most optimal time slot you have is from 2:00PM to 12:00AM for 10 hours."
        );
    }

    #[tokio::test]
    async fn today_prints_greeting_and_agenda() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();
        let service = service_with(vec![timed(
            "e1",
            "Standup",
            "2026-02-16T09:00:00-05:00",
            "2026-02-16T09:30:00-05:00",
        )]);

        let output = today_impl(&state, &service, "token", at("2026-02-16T13:05:00Z"))
            .await
            .expect("today");

        let lines = output.lines().collect::<Vec<_>>();
        assert_eq!(
            lines[0],
            "Good morning there! The time is 08:05 AM and the date is 2026-02-16."
        );
        assert_eq!(lines[1], "Today's events:");
        assert_eq!(lines[2], "9:00AM - 9:30AM -> Standup");
    }

    #[tokio::test]
    async fn add_event_prints_link() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();
        let service = service_with(Vec::new());

        let output = add_event_impl(
            &state,
            &service,
            "token",
            at("2026-02-16T13:00:00Z"),
            "3:00PM",
            "4:00PM",
            "Practice",
        )
        .await
        .expect("add event");

        assert_eq!(
            output,
            "Event created: https://www.google.com/calendar/event?eid=new-event"
        );
    }

    #[tokio::test]
    async fn delete_event_reports_both_outcomes() {
        let service = service_with(vec![timed(
            "e1",
            "Practice",
            "2026-02-16T15:00:00-05:00",
            "2026-02-16T16:00:00-05:00",
        )]);
        let now = at("2026-02-16T13:00:00Z");

        let deleted = delete_event_impl(&service, "token", now, " Practice ")
            .await
            .expect("delete");
        let missing = delete_event_impl(&service, "token", now, "Gym")
            .await
            .expect("delete");

        assert_eq!(deleted, "Event 'Practice' deleted successfully.");
        assert_eq!(missing, "Event 'Gym' not found.");
    }

    #[test]
    fn commit_hours_uses_default_category_and_reports_totals() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();
        let ledger = InMemoryHoursLedger::default();
        let now = at("2026-02-16T20:00:00Z");

        let committed = commit_hours_impl(&state, &ledger, now, 2.5, None).expect("commit");
        commit_hours_impl(&state, &ledger, now, 1.0, Some("reading".to_string())).expect("commit");

        assert_eq!(committed, "2.5 hours committed to CODING successfully.");
        let summary = hours_summary_impl(&state, &ledger, now, None, None).expect("summary");
        assert_eq!(
            summary,
            "Hours committed from 2026-02-16 to 2026-02-16:\n  CODING: 2.5\n  READING: 1"
        );
    }

    #[test]
    fn commit_hours_persists_to_workspace_database() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();
        let ledger = state.hours_ledger();
        let now = at("2026-02-16T20:00:00Z");

        commit_hours_impl(&state, &ledger, now, 3.0, Some("design".to_string())).expect("commit");

        let reopened = state.hours_ledger();
        let entries = reopened
            .entries_between(state.today(now), state.today(now))
            .expect("entries");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].category, "DESIGN");
    }

    #[test]
    fn hours_summary_reports_empty_range() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();
        let ledger = InMemoryHoursLedger::default();
        let summary = hours_summary_impl(
            &state,
            &ledger,
            at("2026-02-16T20:00:00Z"),
            NaiveDate::from_ymd_opt(2026, 2, 1),
            None,
        )
        .expect("summary");
        assert_eq!(summary, "No hours committed between 2026-02-01 and 2026-02-16.");
    }

    #[tokio::test]
    async fn login_without_token_prints_authorization_url() {
        let store = Arc::new(InMemoryCredentialStore::default());
        let output = login_impl(&manager(&store), None, false).await.expect("login");
        assert!(output.starts_with("Open this URL to authorize access:\nhttps://accounts.google.com/"));
        assert!(matches!(
            required_access_token(&manager(&store)).await,
            Err(InfraError::OAuth(_))
        ));
    }

    #[tokio::test]
    async fn login_with_code_stores_token_and_logout_clears_it() {
        let store = Arc::new(InMemoryCredentialStore::default());
        let output = login_impl(&manager(&store), Some("auth-code".to_string()), false)
            .await
            .expect("login");
        assert!(output.starts_with("Authenticated."));
        assert_eq!(
            required_access_token(&manager(&store)).await.expect("token"),
            "exchanged-access"
        );

        login_impl(&manager(&store), None, true).await.expect("logout");
        assert_eq!(store.load_token().expect("load"), None::<OAuthToken>);
    }
}
