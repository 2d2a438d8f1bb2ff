use crate::infrastructure::error::InfraError;
use crate::infrastructure::event_mapper::GoogleCalendarEvent;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, StatusCode};
use tracing::debug;
use url::Url;

const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3/";
const MAX_PAGE_SIZE: u32 = 250;

#[derive(Debug, Clone, Default)]
pub struct ListEventsRequest {
    pub time_min: Option<DateTime<Utc>>,
    pub time_max: Option<DateTime<Utc>>,
    pub max_results: Option<u32>,
    pub time_zone: Option<String>,
}

#[async_trait]
pub trait GoogleCalendarClient: Send + Sync {
    /// Single (recurrence-expanded) events ordered by start time.
    async fn list_events(
        &self,
        access_token: &str,
        calendar_id: &str,
        request: ListEventsRequest,
    ) -> Result<Vec<GoogleCalendarEvent>, InfraError>;

    async fn insert_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event: &GoogleCalendarEvent,
    ) -> Result<GoogleCalendarEvent, InfraError>;

    async fn delete_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
    ) -> Result<(), InfraError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestGoogleCalendarClient {
    client: Client,
    api_base: String,
}

impl Default for ReqwestGoogleCalendarClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ReqwestGoogleCalendarClient {
    pub fn new() -> Self {
        Self::with_api_base(CALENDAR_API_BASE)
    }

    pub fn with_api_base(api_base: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.into(),
        }
    }

    fn ensure_non_empty(value: &str, field: &str) -> Result<(), InfraError> {
        if value.trim().is_empty() {
            return Err(InfraError::InvalidInput(format!("{field} must not be empty")));
        }
        Ok(())
    }

    fn http_error(status: StatusCode, body: &str) -> InfraError {
        if body.trim().is_empty() {
            InfraError::Calendar(format!("google calendar api error: http {}", status.as_u16()))
        } else {
            InfraError::Calendar(format!(
                "google calendar api error: http {}; body={body}",
                status.as_u16()
            ))
        }
    }

    fn events_endpoint(&self, calendar_id: &str, event_id: Option<&str>) -> Result<Url, InfraError> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|error| InfraError::InvalidConfig(format!("invalid calendar api base url: {error}")))?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                InfraError::InvalidConfig("calendar api base URL cannot be a base".to_string())
            })?;
            segments.pop_if_empty();
            segments.push("calendars");
            segments.push(calendar_id);
            segments.push("events");
            if let Some(event_id) = event_id {
                segments.push(event_id);
            }
        }
        Ok(url)
    }

    /// Sends the request and returns the body of a 2xx response.
    async fn send(request: RequestBuilder, action: &str) -> Result<String, InfraError> {
        let response = request.send().await.map_err(|error| {
            InfraError::Calendar(format!("network error while {action}: {error}"))
        })?;
        let status = response.status();
        let body = response.text().await.map_err(|error| {
            InfraError::Calendar(format!("failed reading response while {action}: {error}"))
        })?;
        if !status.is_success() {
            return Err(Self::http_error(status, &body));
        }
        Ok(body)
    }
}

#[derive(Debug, serde::Deserialize)]
struct EventsPageResponse {
    items: Option<Vec<GoogleCalendarEvent>>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[async_trait]
impl GoogleCalendarClient for ReqwestGoogleCalendarClient {
    async fn list_events(
        &self,
        access_token: &str,
        calendar_id: &str,
        request: ListEventsRequest,
    ) -> Result<Vec<GoogleCalendarEvent>, InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        Self::ensure_non_empty(calendar_id, "calendar id")?;

        let endpoint = self.events_endpoint(calendar_id, None)?;
        let limit = request.max_results.map(|value| value as usize);
        let mut page_token: Option<String> = None;
        let mut events = Vec::new();

        loop {
            let remaining = limit.map(|limit| limit.saturating_sub(events.len()));
            let page_size = remaining
                .map(|value| value.min(MAX_PAGE_SIZE as usize) as u32)
                .unwrap_or(MAX_PAGE_SIZE);

            let mut req = self
                .client
                .get(endpoint.clone())
                .bearer_auth(access_token)
                .query(&[("singleEvents", "true"), ("orderBy", "startTime")])
                .query(&[("maxResults", page_size)]);
            if let Some(time_min) = request.time_min {
                req = req.query(&[("timeMin", time_min.to_rfc3339())]);
            }
            if let Some(time_max) = request.time_max {
                req = req.query(&[("timeMax", time_max.to_rfc3339())]);
            }
            if let Some(time_zone) = request.time_zone.as_deref() {
                req = req.query(&[("timeZone", time_zone)]);
            }
            if let Some(page_token) = page_token.as_deref() {
                req = req.query(&[("pageToken", page_token)]);
            }

            let body = Self::send(req, "listing calendar events").await?;
            let page: EventsPageResponse = serde_json::from_str(&body).map_err(|error| {
                InfraError::Calendar(format!("invalid events list payload: {error}; body={body}"))
            })?;
            events.extend(page.items.unwrap_or_default());

            let reached_limit = limit.is_some_and(|limit| events.len() >= limit);
            match page.next_page_token {
                Some(next) if !reached_limit => page_token = Some(next),
                _ => break,
            }
        }

        if let Some(limit) = limit {
            events.truncate(limit);
        }
        debug!(calendar_id, count = events.len(), "listed calendar events");
        Ok(events)
    }

    async fn insert_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event: &GoogleCalendarEvent,
    ) -> Result<GoogleCalendarEvent, InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        Self::ensure_non_empty(calendar_id, "calendar id")?;

        let endpoint = self.events_endpoint(calendar_id, None)?;
        let req = self.client.post(endpoint).bearer_auth(access_token).json(event);
        let body = Self::send(req, "creating event").await?;

        let created: GoogleCalendarEvent = serde_json::from_str(&body).map_err(|error| {
            InfraError::Calendar(format!("invalid event create payload: {error}; body={body}"))
        })?;
        if created.id.as_deref().map(str::trim).unwrap_or_default().is_empty() {
            return Err(InfraError::Calendar(
                "event create response did not include id".to_string(),
            ));
        }
        Ok(created)
    }

    async fn delete_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
    ) -> Result<(), InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        Self::ensure_non_empty(calendar_id, "calendar id")?;
        Self::ensure_non_empty(event_id, "event id")?;

        let endpoint = self.events_endpoint(calendar_id, Some(event_id))?;
        let req = self.client.delete(endpoint).bearer_auth(access_token);
        Self::send(req, "deleting event").await?;
        Ok(())
    }
}
