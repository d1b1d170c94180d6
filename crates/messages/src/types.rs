//! Input and output message model.
//!
//! Input types (`*Input`, `*InputMessage`) mirror what the upstream publisher
//! sends and are only ever deserialized. Output types are the client-facing
//! notifications: they serialize to the websocket and every one of them
//! implements [`Validate`](crate::Validate).
//!
//! Input and output shapes are deliberately separate even where they look
//! alike; transformers own the mapping and its normalization rules.
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Source platform of a crawl job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Platform {
    Tiktok,
    Youtube,
    Instagram,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Tiktok, Platform::Youtube, Platform::Instagram];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Tiktok => "TIKTOK",
            Platform::Youtube => "YOUTUBE",
            Platform::Instagram => "INSTAGRAM",
        }
    }

    /// Case-sensitive parse of the wire representation.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == value)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a project in the legacy message format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    Initializing,
    Crawling,
    Processing,
    Completed,
    Failed,
    Paused,
}

impl ProjectStatus {
    pub const ALL: [ProjectStatus; 6] = [
        ProjectStatus::Initializing,
        ProjectStatus::Crawling,
        ProjectStatus::Processing,
        ProjectStatus::Completed,
        ProjectStatus::Failed,
        ProjectStatus::Paused,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Initializing => "INITIALIZING",
            ProjectStatus::Crawling => "CRAWLING",
            ProjectStatus::Processing => "PROCESSING",
            ProjectStatus::Completed => "COMPLETED",
            ProjectStatus::Failed => "FAILED",
            ProjectStatus::Paused => "PAUSED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }
}

/// Status carried by phase-based project messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PhaseStatus {
    Initializing,
    Processing,
    Done,
    Failed,
}

impl PhaseStatus {
    pub const ALL: [PhaseStatus; 4] = [
        PhaseStatus::Initializing,
        PhaseStatus::Processing,
        PhaseStatus::Done,
        PhaseStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseStatus::Initializing => "INITIALIZING",
            PhaseStatus::Processing => "PROCESSING",
            PhaseStatus::Done => "DONE",
            PhaseStatus::Failed => "FAILED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }
}

/// Status of a single crawl job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Processing,
    Completed,
    Failed,
    Paused,
}

impl JobStatus {
    pub const ALL: [JobStatus; 4] = [
        JobStatus::Processing,
        JobStatus::Completed,
        JobStatus::Failed,
        JobStatus::Paused,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Processing => "PROCESSING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
            JobStatus::Paused => "PAUSED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }
}

/// Envelope `type` of a phase-based project message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseMessageType {
    ProjectProgress,
    ProjectCompleted,
}

impl PhaseMessageType {
    pub const ALL: [PhaseMessageType; 2] = [
        PhaseMessageType::ProjectProgress,
        PhaseMessageType::ProjectCompleted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseMessageType::ProjectProgress => "project_progress",
            PhaseMessageType::ProjectCompleted => "project_completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == value)
    }
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Missing and `null` both decode to the field's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Progress block as published upstream. Percentages and ETA are unchecked.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ProgressInput {
    #[serde(default, deserialize_with = "null_as_default")]
    pub current: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub percentage: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub eta: f64,
    #[serde(default)]
    pub errors: Option<Vec<String>>,
}

/// Legacy project message: a status plus an optional single progress block.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ProjectInputMessage {
    #[serde(default)]
    pub status: Option<ProjectStatus>,
    #[serde(default)]
    pub progress: Option<ProgressInput>,
}

/// Sub-progress of one phase (crawl or analyze).
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct PhaseProgressInput {
    #[serde(default, deserialize_with = "null_as_default")]
    pub total: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub done: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub errors: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub progress_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProjectPhasePayloadInput {
    pub project_id: String,
    pub status: PhaseStatus,
    #[serde(default)]
    pub crawl: Option<PhaseProgressInput>,
    #[serde(default)]
    pub analyze: Option<PhaseProgressInput>,
    pub overall_progress_percent: f64,
}

/// Phase-based project message: `{type, payload}` envelope.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProjectPhaseInputMessage {
    #[serde(rename = "type")]
    pub message_type: PhaseMessageType,
    pub payload: ProjectPhasePayloadInput,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct AuthorInput {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub username: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub followers: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_verified: bool,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct MetricsInput {
    #[serde(default, deserialize_with = "null_as_default")]
    pub views: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub likes: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub comments: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub shares: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MediaInput {
    #[serde(rename = "type")]
    pub media_type: String,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// One crawled post.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ContentInput {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub text: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub author: AuthorInput,
    #[serde(default, deserialize_with = "null_as_default")]
    pub metrics: MetricsInput,
    #[serde(default)]
    pub media: Option<MediaInput>,
    pub published_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub permalink: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BatchInput {
    pub keyword: String,
    #[serde(default)]
    pub content_list: Option<Vec<ContentInput>>,
    pub crawled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JobInputMessage {
    pub platform: Platform,
    #[serde(default)]
    pub status: Option<JobStatus>,
    #[serde(default)]
    pub progress: Option<ProgressInput>,
    #[serde(default)]
    pub batch: Option<BatchInput>,
}

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

/// Normalized progress: `percentage` in `[0, 100]`, `eta >= 0`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Progress {
    pub current: u64,
    pub total: u64,
    pub percentage: f64,
    pub eta: f64,
    pub errors: Vec<String>,
}

/// Legacy project notification sent to clients.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProjectNotificationMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ProjectStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<Progress>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PhaseProgress {
    pub total: u64,
    pub done: u64,
    pub errors: u64,
    pub progress_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectPhasePayload {
    pub project_id: String,
    pub status: PhaseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crawl: Option<PhaseProgress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyze: Option<PhaseProgress>,
    pub overall_progress_percent: f64,
}

/// Phase-based project notification sent to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectPhaseNotificationMessage {
    #[serde(rename = "type")]
    pub message_type: PhaseMessageType,
    pub payload: ProjectPhasePayload,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    pub username: String,
    pub name: String,
    pub followers: u64,
    pub is_verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContentMetrics {
    pub views: u64,
    pub likes: u64,
    pub comments: u64,
    pub shares: u64,
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Media {
    #[serde(rename = "type")]
    pub media_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: String,
    pub text: String,
    pub author: Author,
    pub metrics: ContentMetrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<Media>,
    pub published_at: DateTime<Utc>,
    pub permalink: String,
}

/// A crawled batch with content de-duplicated by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchData {
    pub keyword: String,
    pub content_list: Vec<ContentItem>,
    pub crawled_at: DateTime<Utc>,
}

/// Job notification sent to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobNotificationMessage {
    pub platform: Platform,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<Progress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch: Option<BatchData>,
}
