//! Google Calendar client
//!
//! Lists events and creates events with an attached Google Meet conference.

use std::sync::Arc;

use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::google::PRIMARY_CALENDAR;
use crate::error::{GatewayError, GoogleApiError, Result, ValidationError};
use crate::google::auth::OAuthClient;
use crate::google::query::parse_utc;
use crate::google::types::{
    ConferenceData, ConferenceSolutionKey, CreateConferenceRequest, Event, EventAttendee,
    EventDateTime, EventList, EventReminders,
};

const DEFAULT_LIST_RESULTS: u32 = 10;
const MAX_LIST_RESULTS: u32 = 250;

/// Convert a caller-supplied date to RFC 3339 UTC with millisecond precision
pub fn to_rfc3339(input: &str) -> Result<String> {
    parse_utc(input.trim())
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .ok_or_else(|| {
            GatewayError::Validation(ValidationError::InvalidDate {
                input: input.to_string(),
            })
        })
}

/// Parameters for listing events
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEventsParams {
    pub time_min: Option<String>,
    pub time_max: Option<String>,
    pub max_results: Option<u32>,
    pub single_events: Option<bool>,
    pub order_by: Option<String>,

    /// Free-text search
    pub q: Option<String>,

    pub calendar_id: Option<String>,
}

/// Who receives invitations for a new event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SendUpdates {
    #[default]
    All,
    ExternalOnly,
    None,
}

impl SendUpdates {
    pub fn as_str(&self) -> &'static str {
        match self {
            SendUpdates::All => "all",
            SendUpdates::ExternalOnly => "externalOnly",
            SendUpdates::None => "none",
        }
    }
}

/// Parameters for creating an event
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventParams {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub time_zone: Option<String>,

    /// Attendee email addresses; null and empty entries are ignored
    #[serde(default)]
    pub attendees: Vec<Option<String>>,

    #[serde(default)]
    pub send_updates: SendUpdates,

    pub reminders: Option<EventReminders>,
}

/// Attendee in a listed event
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttendeeSummary {
    pub email: String,
    pub display_name: String,
    pub response_status: String,
}

/// Organizer of a listed event
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrganizerSummary {
    pub email: String,
    pub display_name: String,
}

/// A listed event, reshaped for callers
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub summary: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<EventDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<EventDateTime>,
    pub location: String,
    pub attendees: Vec<AttendeeSummary>,
    pub organizer: Option<OrganizerSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_link: Option<String>,
    pub meet_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
}

impl From<Event> for EventSummary {
    fn from(event: Event) -> Self {
        let meet_link = event.meet_link();
        Self {
            id: event.id,
            summary: event
                .summary
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "No title".to_string()),
            description: event.description.unwrap_or_default(),
            start: event.start,
            end: event.end,
            location: event.location.unwrap_or_default(),
            attendees: event
                .attendees
                .into_iter()
                .map(|a| AttendeeSummary {
                    email: a.email,
                    display_name: a.display_name.unwrap_or_default(),
                    response_status: a
                        .response_status
                        .unwrap_or_else(|| "needsAction".to_string()),
                })
                .collect(),
            organizer: event.organizer.map(|o| OrganizerSummary {
                email: o.email,
                display_name: o.display_name.unwrap_or_default(),
            }),
            status: event.status,
            html_link: event.html_link,
            meet_link,
            created: event.created,
            updated: event.updated,
        }
    }
}

/// Result of listing events
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEventsResult {
    pub total: usize,
    pub events: Vec<EventSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

/// Result of creating an event
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub meet_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<EventDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<EventDateTime>,
    pub attendees: Vec<EventAttendee>,
}

impl From<Event> for CreatedEvent {
    fn from(event: Event) -> Self {
        Self {
            meet_link: event.meet_link(),
            id: event.id,
            html_link: event.html_link,
            status: event.status,
            start: event.start,
            end: event.end,
            attendees: event.attendees,
        }
    }
}

/// Build the event resource for a Meet-enabled event
pub fn build_meet_event(params: &CreateEventParams) -> Result<Event> {
    let (title, start, end) = match (
        non_empty(&params.title),
        non_empty(&params.start),
        non_empty(&params.end),
    ) {
        (Some(title), Some(start), Some(end)) => (title, start, end),
        _ => {
            return Err(GatewayError::Validation(ValidationError::MissingFields {
                fields: "title, start, end".to_string(),
            }))
        }
    };

    let time_zone = non_empty(&params.time_zone).unwrap_or("UTC").to_string();
    let at = |input: &str| -> Result<EventDateTime> {
        Ok(EventDateTime {
            date: None,
            date_time: Some(to_rfc3339(input)?),
            time_zone: Some(time_zone.clone()),
        })
    };

    Ok(Event {
        summary: Some(title.to_string()),
        description: Some(params.description.clone().unwrap_or_default()),
        start: Some(at(start)?),
        end: Some(at(end)?),
        attendees: params
            .attendees
            .iter()
            .filter_map(|a| non_empty(a))
            .map(|email| EventAttendee {
                email: email.to_string(),
                ..Default::default()
            })
            .collect(),
        reminders: Some(params.reminders.clone().unwrap_or_default()),
        conference_data: Some(ConferenceData {
            entry_points: Vec::new(),
            create_request: Some(CreateConferenceRequest {
                request_id: uuid::Uuid::new_v4().to_string(),
                conference_solution_key: ConferenceSolutionKey {
                    solution_type: "hangoutsMeet".to_string(),
                },
            }),
        }),
        ..Default::default()
    })
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Google Calendar API client
pub struct CalendarClient {
    http_client: reqwest::Client,
    auth: Arc<OAuthClient>,
    api_base: String,
}

impl CalendarClient {
    /// Create a new calendar client
    pub fn new(auth: Arc<OAuthClient>, api_base: impl Into<String>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            auth,
            api_base: api_base.into(),
        }
    }

    fn events_url(&self, calendar_id: &str) -> String {
        format!(
            "{}/calendars/{}/events",
            self.api_base,
            urlencoding::encode(calendar_id)
        )
    }

    /// List events
    pub async fn list_events(&self, params: &ListEventsParams) -> Result<ListEventsResult> {
        let calendar_id = non_empty(&params.calendar_id).unwrap_or(PRIMARY_CALENDAR);
        info!(calendar_id, "Listing events");

        let max_results = params
            .max_results
            .unwrap_or(DEFAULT_LIST_RESULTS)
            .min(MAX_LIST_RESULTS);

        let mut query: Vec<(&str, String)> = vec![
            ("maxResults", max_results.to_string()),
            ("singleEvents", params.single_events.unwrap_or(true).to_string()),
            (
                "orderBy",
                non_empty(&params.order_by).unwrap_or("startTime").to_string(),
            ),
        ];
        if let Some(time_min) = non_empty(&params.time_min) {
            query.push(("timeMin", to_rfc3339(time_min)?));
        }
        if let Some(time_max) = non_empty(&params.time_max) {
            query.push(("timeMax", to_rfc3339(time_max)?));
        }
        if let Some(q) = non_empty(&params.q) {
            query.push(("q", q.to_string()));
        }

        let token = self.auth.access_token().await?;
        let response = self
            .http_client
            .get(self.events_url(calendar_id))
            .bearer_auth(&token)
            .query(&query)
            .send()
            .await?;

        if response.status().as_u16() == 404 {
            return Err(GatewayError::Google(GoogleApiError::CalendarNotFound {
                calendar_id: calendar_id.to_string(),
            }));
        }
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(GatewayError::Google(GoogleApiError::RequestFailed {
                message: format!("Failed to list events ({}): {}", status, text),
            }));
        }

        let list: EventList = response.json().await?;
        let events: Vec<EventSummary> = list.items.into_iter().map(EventSummary::from).collect();

        Ok(ListEventsResult {
            total: events.len(),
            events,
            time_zone: list.time_zone,
        })
    }

    /// Create an event on the primary calendar with a Google Meet link
    pub async fn create_meet_event(&self, params: &CreateEventParams) -> Result<CreatedEvent> {
        let event = build_meet_event(params)?;
        info!(
            title = event.summary.as_deref().unwrap_or_default(),
            attendees = event.attendees.len(),
            "Creating event"
        );

        let token = self.auth.access_token().await?;
        let response = self
            .http_client
            .post(self.events_url(PRIMARY_CALENDAR))
            .bearer_auth(&token)
            .query(&[
                ("conferenceDataVersion", "1"),
                ("sendUpdates", params.send_updates.as_str()),
            ])
            .json(&event)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(GatewayError::Google(GoogleApiError::RequestFailed {
                message: format!("Failed to create event ({}): {}", status, text),
            }));
        }

        let created: Event = response.json().await?;
        info!(event_id = created.id.as_deref().unwrap_or_default(), "Event created");
        Ok(CreatedEvent::from(created))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meeting() -> CreateEventParams {
        CreateEventParams {
            title: Some("Planning".to_string()),
            start: Some("2024-05-01T10:00:00Z".to_string()),
            end: Some("2024-05-01T11:00:00Z".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_to_rfc3339() {
        assert_eq!(
            to_rfc3339("2024-05-01T12:00:00+02:00").unwrap(),
            "2024-05-01T10:00:00.000Z"
        );
        assert_eq!(to_rfc3339("2024-05-01").unwrap(), "2024-05-01T00:00:00.000Z");
        assert!(matches!(
            to_rfc3339("tomorrow"),
            Err(GatewayError::Validation(ValidationError::InvalidDate { .. }))
        ));
    }

    #[test]
    fn test_build_meet_event_requires_fields() {
        let params = CreateEventParams {
            end: None,
            ..meeting()
        };
        let err = build_meet_event(&params).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation error: Missing required fields: title, start, end"
        );
    }

    #[test]
    fn test_build_meet_event_whitespace_title_is_present() {
        let params = CreateEventParams {
            title: Some("  ".to_string()),
            ..meeting()
        };
        let event = build_meet_event(&params).unwrap();
        assert_eq!(event.summary.as_deref(), Some("  "));

        let params = CreateEventParams {
            title: Some(String::new()),
            ..meeting()
        };
        assert!(build_meet_event(&params).is_err());
    }

    #[test]
    fn test_build_meet_event_keeps_caller_reminders() {
        let params: CreateEventParams = serde_json::from_value(serde_json::json!({
            "title": "t",
            "start": "2024-05-01",
            "end": "2024-05-02",
            "reminders": {"overrides": [{"method": "popup", "minutes": 10}]}
        }))
        .unwrap();
        let event = build_meet_event(&params).unwrap();

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["reminders"]["useDefault"], false);
        assert_eq!(json["reminders"]["overrides"][0]["minutes"], 10);
    }

    #[test]
    fn test_build_meet_event_defaults() {
        let params = CreateEventParams {
            attendees: vec![
                Some("a@example.com".to_string()),
                None,
                Some(String::new()),
                Some("b@example.com".to_string()),
            ],
            ..meeting()
        };
        let event = build_meet_event(&params).unwrap();
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["summary"], "Planning");
        assert_eq!(json["description"], "");
        assert_eq!(json["start"]["dateTime"], "2024-05-01T10:00:00.000Z");
        assert_eq!(json["start"]["timeZone"], "UTC");
        assert_eq!(json["attendees"].as_array().unwrap().len(), 2);
        assert_eq!(json["attendees"][1]["email"], "b@example.com");
        assert_eq!(json["reminders"]["useDefault"], true);
        assert_eq!(
            json["conferenceData"]["createRequest"]["conferenceSolutionKey"]["type"],
            "hangoutsMeet"
        );
        assert!(json["conferenceData"]["createRequest"]["requestId"].is_string());
    }

    #[test]
    fn test_build_meet_event_rejects_bad_date() {
        let params = CreateEventParams {
            start: Some("soon".to_string()),
            ..meeting()
        };
        assert!(matches!(
            build_meet_event(&params),
            Err(GatewayError::Validation(ValidationError::InvalidDate { .. }))
        ));
    }

    #[test]
    fn test_send_updates_deserialize() {
        let params: CreateEventParams =
            serde_json::from_str(r#"{"sendUpdates":"externalOnly"}"#).unwrap();
        assert_eq!(params.send_updates, SendUpdates::ExternalOnly);
        assert_eq!(CreateEventParams::default().send_updates.as_str(), "all");
        assert!(serde_json::from_str::<CreateEventParams>(r#"{"sendUpdates":"everyone"}"#).is_err());
    }

    #[test]
    fn test_event_summary_defaults() {
        let event: Event = serde_json::from_str(
            r#"{
                "id": "e1",
                "attendees": [{"email": "a@example.com"}],
                "organizer": {"email": "o@example.com"},
                "conferenceData": {"entryPoints": [{"entryPointType": "video", "uri": "https://meet.google.com/x"}]}
            }"#,
        )
        .unwrap();

        let summary = EventSummary::from(event);
        assert_eq!(summary.summary, "No title");
        assert_eq!(summary.location, "");
        assert_eq!(summary.attendees[0].response_status, "needsAction");
        assert_eq!(summary.attendees[0].display_name, "");
        assert_eq!(summary.organizer.as_ref().unwrap().email, "o@example.com");
        assert_eq!(summary.meet_link.as_deref(), Some("https://meet.google.com/x"));
    }

    #[test]
    fn test_event_summary_null_fields() {
        let summary = EventSummary::from(Event::default());
        let json = serde_json::to_value(&summary).unwrap();
        assert!(json["organizer"].is_null());
        assert!(json["meetLink"].is_null());
        assert!(json.get("htmlLink").is_none());
    }
}
