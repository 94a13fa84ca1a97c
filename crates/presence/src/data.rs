//! Data structures exchanged between the presence backend and its clients.
//!
//! All JSON field names are camelCase. Timestamps are RFC 3339 strings carrying
//! the offset of the backend's configured time zone, elapsed times are whole
//! seconds.

use chrono::{DateTime, FixedOffset, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::id::SessionId;

/// One logged-in client, as held by the session registry.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub session_id: SessionId,
    pub email: String,
    pub nickname: String,
    /// Set at login and never changed afterwards.
    pub mac_address: String,
    pub client_ip: Option<String>,
    pub server_ip: Option<String>,
    pub server_mac: Option<String>,
    pub date_created: DateTime<FixedOffset>,
    pub last_accessed: DateTime<FixedOffset>,
    #[serde(with = "elapsed_seconds")]
    pub duration: TimeDelta,
    #[serde(with = "elapsed_seconds")]
    pub inactivity_time: TimeDelta,
    pub status: bool,
}

impl SessionRecord {
    /// Records an access at `now`.
    ///
    /// `duration` is measured from creation and `inactivity_time` from the
    /// previous access, both clamped at zero. `last_accessed` only moves forward.
    pub fn touch(&mut self, now: DateTime<FixedOffset>) {
        self.duration = elapsed(self.date_created, now);
        self.inactivity_time = elapsed(self.last_accessed, now);
        if now > self.last_accessed {
            self.last_accessed = now;
        }
    }
}

fn elapsed(from: DateTime<FixedOffset>, to: DateTime<FixedOffset>) -> TimeDelta {
    (to - from).max(TimeDelta::zero())
}

/// Body of `POST /login`. Fields are optional so that a missing one is a
/// validation failure rather than a body rejection.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub mac_address: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub message: String,
    pub session_id: SessionId,
}

/// Body of `POST /logout`.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Body of `PUT /update`. Omitted or empty `email`/`nickname` keep their value.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
}

/// Query string of `GET /status`.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct StatusQuery {
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Plain `{ message }` body, used for logout and for every error response.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SessionResponse {
    pub message: String,
    pub session: SessionRecord,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSession {
    pub session_id: SessionId,
    pub session_data: SessionRecord,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSessionsResponse {
    pub message: String,
    pub active_sessions: Vec<ActiveSession>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct WelcomeResponse {
    pub message: String,
    pub author: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UptimeInfo {
    pub seconds: i64,
    pub human: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInfo {
    pub sessions: String,
    pub active_sessions: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub timestamp: String,
    pub started_at: String,
    pub uptime: UptimeInfo,
    pub services: ServiceInfo,
}

mod elapsed_seconds {
    use chrono::TimeDelta;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S>(value: &TimeDelta, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(value.num_seconds())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<TimeDelta, D::Error>
    where
        D: Deserializer<'de>,
    {
        let seconds = i64::deserialize(deserializer)?;
        TimeDelta::try_seconds(seconds).ok_or_else(|| D::Error::custom("elapsed time out of range"))
    }
}
