use std::collections::BTreeMap;
use std::collections::HashMap;

use chrono::DateTime;
use chrono::NaiveDateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use super::reshape::RawStoryRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoryId(pub u64);

impl std::fmt::Display for StoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoryStatus {
    Draft,
    Pending,
    Publish,
    Future,
    Private,
}

impl Default for StoryStatus {
    fn default() -> Self {
        Self::Draft
    }
}

impl StoryStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Pending => "Pending",
            Self::Publish => "Published",
            Self::Future => "Scheduled",
            Self::Private => "Private",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Publish => "publish",
            Self::Future => "future",
            Self::Private => "private",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "pending" => Some(Self::Pending),
            "publish" | "published" => Some(Self::Publish),
            "future" | "scheduled" => Some(Self::Future),
            "private" => Some(Self::Private),
            _ => None,
        }
    }
}

/// Keys of the per-status counts shown in the dashboard filter bar. The
/// server reports raw statuses; trash arithmetic collapses everything that
/// is not a draft into the `published-and-future` bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TotalsKey {
    All,
    Draft,
    Pending,
    Publish,
    Future,
    Private,
    PublishedAndFuture,
}

impl TotalsKey {
    pub fn for_status(status: StoryStatus) -> Self {
        match status {
            StoryStatus::Draft => Self::Draft,
            StoryStatus::Pending => Self::Pending,
            StoryStatus::Publish => Self::Publish,
            StoryStatus::Future => Self::Future,
            StoryStatus::Private => Self::Private,
        }
    }

    pub fn trash_bucket(status: StoryStatus) -> Self {
        match status {
            StoryStatus::Draft => Self::Draft,
            _ => Self::PublishedAndFuture,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Publish => "publish",
            Self::Future => "future",
            Self::Private => "private",
            Self::PublishedAndFuture => "published-and-future",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "all" => Some(Self::All),
            "draft" => Some(Self::Draft),
            "pending" => Some(Self::Pending),
            "publish" => Some(Self::Publish),
            "future" => Some(Self::Future),
            "private" => Some(Self::Private),
            "published-and-future" => Some(Self::PublishedAndFuture),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusTotals(pub BTreeMap<TotalsKey, u64>);

impl StatusTotals {
    pub fn get(&self, key: TotalsKey) -> u64 {
        self.0.get(&key).copied().unwrap_or(0)
    }

    pub fn set(&mut self, key: TotalsKey, count: u64) {
        self.0.insert(key, count);
    }

    pub fn increment(&mut self, key: TotalsKey) {
        *self.0.entry(key).or_insert(0) += 1;
    }

    pub fn decrement(&mut self, key: TotalsKey) {
        let entry = self.0.entry(key).or_insert(0);
        *entry = entry.saturating_sub(1);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorMessage {
    pub title: String,
    pub body: String,
}

impl ErrorMessage {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

/// Failure payload as produced by the API layer: what went wrong, in a
/// title/body pair views can render directly, plus the server error code
/// when one was given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailurePayload {
    pub message: ErrorMessage,
    pub code: Option<String>,
}

/// Freshness token stamped onto every recorded failure. The sequence is a
/// state-held counter, so two identical consecutive failures still compare
/// unequal; the timestamp is informational.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorToken {
    pub seq: u64,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryError {
    pub message: ErrorMessage,
    pub code: Option<String>,
    pub id: ErrorToken,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LockUser {
    pub id: u64,
    pub name: String,
    pub avatar: Option<String>,
}

/// Client-side story shape. Produced exclusively by
/// [`crate::reshape::reshape_story`]; `pages` always holds the migrated
/// document, never a mix of schema versions. The raw server record is
/// retained in `original` for write-back on update and duplicate.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedStory {
    pub id: StoryId,
    pub status: StoryStatus,
    pub title: String,
    pub created: Option<NaiveDateTime>,
    pub created_gmt: Option<NaiveDateTime>,
    pub modified: Option<NaiveDateTime>,
    pub modified_gmt: Option<NaiveDateTime>,
    pub pages: Vec<serde_json::Value>,
    pub author: String,
    pub locked: bool,
    pub lock_user: LockUser,
    pub preview_link: Option<String>,
    pub link: Option<String>,
    pub edit_story_link: String,
    pub original: RawStoryRecord,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoryListState {
    pub stories: HashMap<StoryId, NormalizedStory>,
    /// Display order, independent from map iteration order.
    pub stories_order: Vec<StoryId>,
    pub totals_by_status: StatusTotals,
    /// Total server-side pages for the current query; `None` until the
    /// first fetch lands.
    pub total_pages: Option<u32>,
    pub all_pages_fetched: bool,
    pub is_loading: bool,
    pub error: Option<StoryError>,
    pub preview_markup: String,
    /// Highest fetch request id seen; stale responses are dropped.
    pub latest_fetch_id: u64,
    pub error_seq: u64,
}

impl StoryListState {
    pub fn new() -> Self {
        Self {
            stories: HashMap::new(),
            stories_order: Vec::new(),
            totals_by_status: StatusTotals::default(),
            total_pages: None,
            all_pages_fetched: false,
            is_loading: false,
            error: None,
            preview_markup: String::new(),
            latest_fetch_id: 0,
            error_seq: 0,
        }
    }

    /// Stories in display order. Ids without a backing record are skipped.
    pub fn ordered_stories(&self) -> Vec<&NormalizedStory> {
        self.stories_order
            .iter()
            .filter_map(|id| self.stories.get(id))
            .collect()
    }
}

impl Default for StoryListState {
    fn default() -> Self {
        Self::new()
    }
}
