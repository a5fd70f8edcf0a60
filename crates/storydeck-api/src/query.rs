use std::collections::BTreeMap;

use serde::Deserialize;

use storydeck_core::RawStoryRecord;
use storydeck_core::StatusTotals;
use storydeck_core::StoryStatus;
use storydeck_core::TotalsKey;

use super::adapter::AdapterError;
use super::adapter::AdapterResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorySort {
    Date,
    Modified,
    Title,
    Author,
}

impl StorySort {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Modified => "modified",
            Self::Title => "title",
            Self::Author => "author",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Server query for the story listing. Two wire shapes exist for the two
/// embedding contexts; see [`StoryQuery::dashboard_path`] and
/// [`StoryQuery::widget_path`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryQuery {
    pub status: Vec<StoryStatus>,
    pub sort_option: StorySort,
    pub sort_direction: SortDirection,
    pub search_term: Option<String>,
    pub page: u32,
    pub per_page: u32,
    pub author: Option<u64>,
}

impl Default for StoryQuery {
    fn default() -> Self {
        Self {
            status: vec![
                StoryStatus::Publish,
                StoryStatus::Draft,
                StoryStatus::Future,
                StoryStatus::Private,
            ],
            sort_option: StorySort::Modified,
            sort_direction: SortDirection::Desc,
            search_term: None,
            page: 1,
            per_page: 24,
            author: None,
        }
    }
}

impl StoryQuery {
    fn base_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("context", "edit".to_string())];
        if let Some(search) = &self.search_term {
            if !search.is_empty() {
                params.push(("search", search.clone()));
            }
        }
        params.push(("orderby", self.sort_option.as_str().to_string()));
        params.push(("page", self.page.to_string()));
        params.push(("per_page", self.per_page.to_string()));
        params.push(("order", self.sort_direction.as_str().to_string()));
        if !self.status.is_empty() {
            let statuses: Vec<&str> = self.status.iter().map(|s| s.as_str()).collect();
            params.push(("status", statuses.join(",")));
        }
        params
    }

    /// Dashboard shape: the adapter answers with a `{data, totals}` body.
    pub fn dashboard_path(&self, story_api: &str) -> String {
        join_query(story_api, &self.base_params())
    }

    /// Widget/editor shape: author embedding plus the response envelope
    /// that tunnels the pagination headers through the body.
    pub fn widget_path(&self, story_api: &str) -> String {
        let mut params = self.base_params();
        params.push(("_embed", "author".to_string()));
        params.push(("_web_stories_envelope", "true".to_string()));
        if let Some(author) = self.author {
            params.push(("author", author.to_string()));
        }
        join_query(story_api, &params)
    }
}

fn join_query(base: &str, params: &[(&'static str, String)]) -> String {
    let mut url = String::from(base);
    let mut separator = if base.contains('?') { '&' } else { '?' };
    for (key, value) in params {
        url.push(separator);
        url.push_str(key);
        url.push('=');
        url.push_str(&encode_component(value));
        separator = '&';
    }
    url
}

fn encode_component(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b',' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// One fetched listing page, normalized from either envelope variant.
#[derive(Debug, Clone, Default)]
pub struct FetchedPage {
    pub stories: Vec<RawStoryRecord>,
    pub total_pages: u32,
    pub totals_by_status: StatusTotals,
}

#[derive(Debug, Deserialize)]
struct DashboardEnvelope {
    #[serde(default)]
    data: Vec<serde_json::Value>,
    #[serde(default)]
    totals: DashboardTotals,
}

#[derive(Debug, Default, Deserialize)]
struct DashboardTotals {
    #[serde(default)]
    total_pages: u32,
    #[serde(default)]
    total_by_status: BTreeMap<String, u64>,
}

#[derive(Debug, Deserialize)]
struct WidgetEnvelope {
    #[serde(default)]
    body: Vec<serde_json::Value>,
    #[serde(default)]
    headers: BTreeMap<String, serde_json::Value>,
}

/// Per-record decode. One malformed record (say, a status this client
/// does not track) drops that record, not the whole page.
fn decode_records(values: Vec<serde_json::Value>) -> Vec<RawStoryRecord> {
    values
        .into_iter()
        .filter_map(|value| match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(err) => {
                tracing::debug!(%err, "dropping undecodable story record");
                None
            }
        })
        .collect()
}

const TOTAL_PAGES_HEADER: &str = "x-wp-totalpages";
const TOTAL_BY_STATUS_HEADER: &str = "x-wp-totalbystatus";

fn parse_error(err: serde_json::Error) -> AdapterError {
    AdapterError::new(
        format!("unexpected response body: {err}"),
        Some("invalid_json".to_string()),
    )
}

/// Server-reported counts keyed by status name. Keys this client does not
/// track are skipped rather than rejected.
fn totals_from_map(map: &BTreeMap<String, u64>) -> StatusTotals {
    let mut totals = StatusTotals::default();
    for (key, count) in map {
        match TotalsKey::parse(key) {
            Some(key) => totals.set(key, *count),
            None => tracing::debug!(key, "skipping untracked status count"),
        }
    }
    totals
}

pub fn parse_dashboard_response(response: &AdapterResponse) -> Result<FetchedPage, AdapterError> {
    let envelope: DashboardEnvelope =
        serde_json::from_str(&response.body).map_err(parse_error)?;
    Ok(FetchedPage {
        stories: decode_records(envelope.data),
        total_pages: envelope.totals.total_pages,
        totals_by_status: totals_from_map(&envelope.totals.total_by_status),
    })
}

pub fn parse_widget_response(response: &AdapterResponse) -> Result<FetchedPage, AdapterError> {
    let envelope: WidgetEnvelope = serde_json::from_str(&response.body).map_err(parse_error)?;

    // Envelope headers win; transport headers are the fallback when the
    // server answered without the envelope wrapper.
    let mut envelope_headers = BTreeMap::new();
    for (name, value) in &envelope.headers {
        envelope_headers.insert(name.to_ascii_lowercase(), value.clone());
    }
    let header = |name: &str| -> Option<serde_json::Value> {
        envelope_headers
            .get(name)
            .cloned()
            .or_else(|| response.headers.get(name).map(|v| v.clone().into()))
    };

    let total_pages = match header(TOTAL_PAGES_HEADER) {
        Some(serde_json::Value::Number(n)) => n.as_u64().unwrap_or(0) as u32,
        Some(serde_json::Value::String(s)) => s.parse().unwrap_or(0),
        _ => 0,
    };

    let totals_by_status = match header(TOTAL_BY_STATUS_HEADER) {
        // Some servers emit the map inline, others as a JSON string.
        Some(serde_json::Value::Object(map)) => {
            let map: BTreeMap<String, u64> = map
                .into_iter()
                .filter_map(|(k, v)| v.as_u64().map(|count| (k, count)))
                .collect();
            totals_from_map(&map)
        }
        Some(serde_json::Value::String(s)) => serde_json::from_str::<BTreeMap<String, u64>>(&s)
            .map(|map| totals_from_map(&map))
            .unwrap_or_default(),
        _ => StatusTotals::default(),
    };

    Ok(FetchedPage {
        stories: decode_records(envelope.body),
        total_pages,
        totals_by_status,
    })
}
