use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use serde::Deserialize;
use serde_json::json;

use storydeck_core::reduce;
use storydeck_core::reshape_story;
use storydeck_core::Config;
use storydeck_core::ErrorMessage;
use storydeck_core::FailurePayload;
use storydeck_core::NormalizedStory;
use storydeck_core::RawStoryRecord;
use storydeck_core::StoryAction;
use storydeck_core::StoryEffect;
use storydeck_core::StoryId;
use storydeck_core::StoryListState;
use storydeck_core::StoryMigration;
use storydeck_core::CURRENT_STORY_VERSION;

use super::adapter::AdapterError;
use super::adapter::DataAdapter;
use super::query::parse_dashboard_response;
use super::query::parse_widget_response;
use super::query::StoryQuery;

const LOAD_STORIES_TITLE: &str = "Unable to load stories";
const UPDATE_STORY_TITLE: &str = "Unable to update story";
const TRASH_STORY_TITLE: &str = "Unable to trash story";
const DUPLICATE_STORY_TITLE: &str = "Unable to duplicate story";
const CREATE_STORY_TITLE: &str = "Unable to create story from template";
const PREVIEW_STORY_TITLE: &str = "Unable to render story preview";

/// Where the caller should go after a story was created from a template.
/// The API layer never navigates; it hands this back as a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationIntent {
    pub url: String,
}

/// Template a new story is created from: the page documents plus the
/// schema version they were authored under.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoryTemplate {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub pages: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchVariant {
    Dashboard,
    Widget,
}

/// Front door of the story dashboard: performs the network operations and
/// funnels every outcome through the core reducer. Views read snapshots
/// via [`StoryApi::state`]; failures surface only through the error slot.
pub struct StoryApi<A: DataAdapter> {
    adapter: A,
    config: Config,
    migration: Arc<dyn StoryMigration>,
    state: Mutex<StoryListState>,
    next_request_id: AtomicU64,
}

impl<A: DataAdapter> StoryApi<A> {
    pub fn new(adapter: A, config: Config, migration: Arc<dyn StoryMigration>) -> Self {
        Self {
            adapter,
            config,
            migration,
            state: Mutex::new(StoryListState::new()),
            next_request_id: AtomicU64::new(0),
        }
    }

    /// Snapshot of the current list state.
    pub fn state(&self) -> StoryListState {
        self.lock_state().clone()
    }

    fn lock_state(&self) -> MutexGuard<'_, StoryListState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn dispatch(&self, action: StoryAction) -> Vec<StoryEffect> {
        let mut state = self.lock_state();
        reduce(&mut state, action, self.migration.as_ref())
    }

    fn next_request_id(&self) -> u64 {
        self.next_request_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn story_path(&self, id: StoryId) -> String {
        format!("{}/{}", self.config.api.story_api.trim_end_matches('/'), id)
    }

    pub async fn fetch_stories(&self, query: &StoryQuery) {
        self.fetch_with(query, FetchVariant::Dashboard).await;
    }

    /// Second wire shape, used where the listing is embedded next to the
    /// editor and totals arrive through tunneled headers.
    pub async fn fetch_stories_for_widget(&self, query: &StoryQuery) {
        self.fetch_with(query, FetchVariant::Widget).await;
    }

    async fn fetch_with(&self, query: &StoryQuery, variant: FetchVariant) {
        // Missing configuration is not a transient error; fail before any I/O.
        if self.config.api.story_api.is_empty() {
            self.dispatch(StoryAction::FetchStoriesFailure {
                payload: cannot_connect(),
                request_id: self.next_request_id(),
            });
            return;
        }

        let request_id = self.next_request_id();
        self.dispatch(StoryAction::LoadingStories {
            active: true,
            request_id,
        });

        let path = match variant {
            FetchVariant::Dashboard => query.dashboard_path(&self.config.api.story_api),
            FetchVariant::Widget => query.widget_path(&self.config.api.story_api),
        };
        tracing::debug!(request_id, page = query.page, "fetching stories");

        let outcome = match self.adapter.get(&path).await {
            Ok(response) => match variant {
                FetchVariant::Dashboard => parse_dashboard_response(&response),
                FetchVariant::Widget => parse_widget_response(&response),
            },
            Err(err) => Err(err),
        };

        match outcome {
            Ok(fetched) => {
                self.dispatch(StoryAction::FetchStoriesSuccess {
                    stories: fetched.stories,
                    total_pages: fetched.total_pages,
                    totals_by_status: fetched.totals_by_status,
                    page: query.page,
                    edit_story_url: self.config.api.edit_story_url.clone(),
                    request_id,
                });
            }
            Err(err) => {
                self.dispatch(StoryAction::FetchStoriesFailure {
                    payload: failure_payload(LOAD_STORIES_TITLE, &err),
                    request_id,
                });
            }
        }

        // Loading settles on every exit path of the request.
        self.dispatch(StoryAction::LoadingStories {
            active: false,
            request_id,
        });
    }

    /// Writes the story back and upserts the server's answer. The payload
    /// is the retained raw record with the editable fields overridden, so
    /// fields this client does not model survive the round trip.
    pub async fn update_story(&self, story: &NormalizedStory) {
        let mut body = match serde_json::to_value(&story.original) {
            Ok(value) => value,
            Err(err) => {
                self.dispatch(StoryAction::UpdateStoryFailure(FailurePayload {
                    message: ErrorMessage::new(UPDATE_STORY_TITLE, err.to_string()),
                    code: None,
                }));
                return;
            }
        };
        if let serde_json::Value::Object(map) = &mut body {
            map.insert("id".to_string(), json!(story.id.0));
            map.insert("title".to_string(), json!({ "raw": story.title }));
            map.insert("status".to_string(), json!(story.status.as_str()));
        }

        let result = self.adapter.post(&self.story_path(story.id), &body).await;
        match result.and_then(|response| self.reshape_response(&response.body)) {
            Ok(updated) => {
                self.dispatch(StoryAction::UpdateStory(updated));
            }
            Err(err) => {
                self.dispatch(StoryAction::UpdateStoryFailure(failure_payload(
                    UPDATE_STORY_TITLE,
                    &err,
                )));
            }
        }
    }

    pub async fn trash_story(&self, story: &NormalizedStory) {
        let result = self
            .adapter
            .delete_request(&self.story_path(story.id), &json!({}))
            .await;
        match result {
            Ok(_) => {
                // The pre-trash status drives the bucket decrement.
                self.dispatch(StoryAction::TrashStory {
                    id: story.id,
                    story_status: story.status,
                });
            }
            Err(err) => {
                self.dispatch(StoryAction::TrashStoryFailure(failure_payload(
                    TRASH_STORY_TITLE,
                    &err,
                )));
            }
        }
    }

    /// Re-posts a copy of the original record's content, document, media
    /// and style fields as a fresh draft titled `"<title> (Copy)"`.
    pub async fn duplicate_story(&self, story: &NormalizedStory) {
        let source = match serde_json::to_value(&story.original) {
            Ok(value) => value,
            Err(err) => {
                self.dispatch(StoryAction::DuplicateStoryFailure(FailurePayload {
                    message: ErrorMessage::new(DUPLICATE_STORY_TITLE, err.to_string()),
                    code: None,
                }));
                return;
            }
        };

        let mut body = json!({
            "title": { "raw": format!("{} (Copy)", story.title) },
            "status": "draft",
        });
        for field in ["content", "story_data", "featured_media", "style_presets", "meta"] {
            if let Some(value) = source.get(field) {
                body[field] = value.clone();
            }
        }

        let result = self.adapter.post(&self.config.api.story_api, &body).await;
        match result.and_then(|response| self.reshape_response(&response.body)) {
            Ok(copy) => {
                self.dispatch(StoryAction::DuplicateStory(copy));
            }
            Err(err) => {
                self.dispatch(StoryAction::DuplicateStoryFailure(failure_payload(
                    DUPLICATE_STORY_TITLE,
                    &err,
                )));
            }
        }
    }

    /// Creates a draft from the template and returns where the caller
    /// should navigate to keep editing it. `None` means the failure was
    /// recorded in state.
    pub async fn create_story_from_template(
        &self,
        template: &StoryTemplate,
    ) -> Option<NavigationIntent> {
        self.dispatch(StoryAction::CreatingStoryFromTemplate(true));

        let version = if template.version == 0 {
            CURRENT_STORY_VERSION
        } else {
            template.version
        };
        let body = json!({
            "title": { "raw": template.title },
            "status": "draft",
            "story_data": { "version": version, "pages": template.pages },
        });

        let result = self.adapter.post(&self.config.api.story_api, &body).await;
        let intent = match result.and_then(|response| parse_story_record(&response.body)) {
            Ok(raw) if raw.id != 0 => {
                let edit_story_link =
                    format!("{}&post={}", self.config.api.edit_story_url, raw.id);
                self.dispatch(StoryAction::CreateStoryFromTemplateSuccess { edit_story_link })
                    .into_iter()
                    .map(|StoryEffect::NavigateTo(url)| NavigationIntent { url })
                    .next()
            }
            Ok(_) => {
                self.dispatch(StoryAction::CreateStoryFromTemplateFailure(
                    invalid_record_payload(CREATE_STORY_TITLE),
                ));
                None
            }
            Err(err) => {
                self.dispatch(StoryAction::CreateStoryFromTemplateFailure(
                    failure_payload(CREATE_STORY_TITLE, &err),
                ));
                None
            }
        };

        self.dispatch(StoryAction::CreatingStoryFromTemplate(false));
        intent
    }

    /// Fetches the rendered markup behind the story's preview link.
    pub async fn create_story_preview(&self, story: &NormalizedStory) {
        let Some(preview_link) = &story.preview_link else {
            self.dispatch(StoryAction::CreateStoryPreviewFailure(FailurePayload {
                message: ErrorMessage::new(PREVIEW_STORY_TITLE, "The story has no preview link."),
                code: None,
            }));
            return;
        };

        self.dispatch(StoryAction::CreatingStoryPreview(true));
        match self.adapter.get(preview_link).await {
            Ok(response) => {
                self.dispatch(StoryAction::CreateStoryPreviewSuccess(response.body));
            }
            Err(err) => {
                self.dispatch(StoryAction::CreateStoryPreviewFailure(failure_payload(
                    PREVIEW_STORY_TITLE,
                    &err,
                )));
            }
        }
        self.dispatch(StoryAction::CreatingStoryPreview(false));
    }

    pub fn clear_story_preview(&self) {
        self.dispatch(StoryAction::ClearStoryPreview);
    }

    fn reshape_response(&self, body: &str) -> Result<NormalizedStory, AdapterError> {
        let raw = parse_story_record(body)?;
        reshape_story(
            &self.config.api.edit_story_url,
            self.migration.as_ref(),
            raw,
        )
        .ok_or_else(|| {
            AdapterError::new(
                "the server returned a story without pages",
                Some("invalid_story".to_string()),
            )
        })
    }
}

fn parse_story_record(body: &str) -> Result<RawStoryRecord, AdapterError> {
    serde_json::from_str(body).map_err(|err| {
        AdapterError::new(
            format!("unexpected response body: {err}"),
            Some("invalid_json".to_string()),
        )
    })
}

fn failure_payload(title: &str, err: &AdapterError) -> FailurePayload {
    FailurePayload {
        message: ErrorMessage::new(title, err.message.clone()),
        code: err.code.clone(),
    }
}

fn invalid_record_payload(title: &str) -> FailurePayload {
    FailurePayload {
        message: ErrorMessage::new(title, "the server returned an invalid story record"),
        code: Some("invalid_story".to_string()),
    }
}

fn cannot_connect() -> FailurePayload {
    FailurePayload {
        message: ErrorMessage::new(
            "Cannot connect",
            "The stories endpoint is not configured.",
        ),
        code: Some("no_endpoint".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::collections::VecDeque;

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use storydeck_core::ApiConfig;
    use storydeck_core::PassthroughMigration;
    use storydeck_core::StoryStatus;
    use storydeck_core::TotalsKey;

    use super::super::adapter::AdapterResponse;
    use super::*;

    const STORY_API: &str = "http://wp.local/wp-json/web-stories/v1/web-story";
    const EDIT_URL: &str = "http://wp.local/wp-admin/post.php?action=edit";

    #[derive(Debug, Clone, PartialEq)]
    struct RecordedCall {
        method: &'static str,
        path: String,
        body: serde_json::Value,
    }

    struct MockAdapter {
        responses: Mutex<VecDeque<Result<AdapterResponse, AdapterError>>>,
        calls: Mutex<Vec<RecordedCall>>,
    }

    impl MockAdapter {
        fn new(responses: Vec<Result<AdapterResponse, AdapterError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn record(&self, method: &'static str, path: &str, body: serde_json::Value) {
            self.calls.lock().unwrap().push(RecordedCall {
                method,
                path: path.to_string(),
                body,
            });
        }

        fn next(&self) -> Result<AdapterResponse, AdapterError> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(AdapterError::new("no scripted response", None)))
        }
    }

    #[async_trait::async_trait]
    impl DataAdapter for MockAdapter {
        async fn get(&self, path: &str) -> Result<AdapterResponse, AdapterError> {
            self.record("GET", path, serde_json::Value::Null);
            self.next()
        }

        async fn post(
            &self,
            path: &str,
            data: &serde_json::Value,
        ) -> Result<AdapterResponse, AdapterError> {
            self.record("POST", path, data.clone());
            self.next()
        }

        async fn delete_request(
            &self,
            path: &str,
            data: &serde_json::Value,
        ) -> Result<AdapterResponse, AdapterError> {
            self.record("DELETE", path, data.clone());
            self.next()
        }
    }

    fn config() -> Config {
        Config {
            api: ApiConfig {
                story_api: STORY_API.to_string(),
                edit_story_url: EDIT_URL.to_string(),
            },
            ..Config::default()
        }
    }

    fn api(responses: Vec<Result<AdapterResponse, AdapterError>>) -> StoryApi<MockAdapter> {
        StoryApi::new(
            MockAdapter::new(responses),
            config(),
            Arc::new(PassthroughMigration),
        )
    }

    fn ok_json(value: serde_json::Value) -> Result<AdapterResponse, AdapterError> {
        Ok(AdapterResponse {
            body: value.to_string(),
            headers: BTreeMap::new(),
        })
    }

    fn record(id: u64, status: &str) -> serde_json::Value {
        json!({
            "id": id,
            "title": { "raw": format!("Story {id}") },
            "status": status,
            "preview_link": format!("http://wp.local/?p={id}&preview=true"),
            "story_data": { "version": 35, "pages": [{ "elements": [] }] },
            "featured_media": 42
        })
    }

    fn listing(ids: &[u64]) -> serde_json::Value {
        json!({
            "data": ids.iter().map(|id| record(*id, "draft")).collect::<Vec<_>>(),
            "totals": {
                "total_pages": 1,
                "total_by_status": { "all": ids.len(), "draft": ids.len() }
            }
        })
    }

    fn normalized(id: u64, status: StoryStatus) -> NormalizedStory {
        let raw: RawStoryRecord =
            serde_json::from_value(record(id, status.as_str())).expect("raw record");
        reshape_story(EDIT_URL, &PassthroughMigration, raw).expect("valid record")
    }

    #[tokio::test]
    async fn fetch_populates_state_and_settles_loading() {
        let api = api(vec![ok_json(listing(&[5, 6]))]);
        api.fetch_stories(&StoryQuery::default()).await;

        let state = api.state();
        assert!(!state.is_loading);
        assert_eq!(state.error, None);
        assert_eq!(
            state.stories_order,
            vec![StoryId(5), StoryId(6)]
        );
        assert_eq!(state.totals_by_status.get(TotalsKey::All), 2);

        let calls = api.adapter.calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, "GET");
        assert!(calls[0].path.starts_with(STORY_API));
        assert!(calls[0].path.contains("context=edit"));
    }

    #[tokio::test]
    async fn fetch_failure_records_the_error_and_settles_loading() {
        let api = api(vec![Err(AdapterError::new(
            "boom",
            Some("internal_error".to_string()),
        ))]);
        api.fetch_stories(&StoryQuery::default()).await;

        let state = api.state();
        assert!(!state.is_loading);
        let error = state.error.expect("error recorded");
        assert_eq!(error.message.title, LOAD_STORIES_TITLE);
        assert_eq!(error.message.body, "boom");
        assert_eq!(error.code.as_deref(), Some("internal_error"));
    }

    #[tokio::test]
    async fn unconfigured_endpoint_fails_fast_without_io() {
        let story_api = StoryApi::new(
            MockAdapter::new(Vec::new()),
            Config::default(),
            Arc::new(PassthroughMigration),
        );
        story_api.fetch_stories(&StoryQuery::default()).await;

        let state = story_api.state();
        assert!(!state.is_loading);
        let error = state.error.expect("error recorded");
        assert_eq!(error.code.as_deref(), Some("no_endpoint"));
        assert!(story_api.adapter.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn widget_fetch_uses_the_envelope_query_shape() {
        let api = api(vec![ok_json(json!({
            "body": [record(9, "publish")],
            "headers": { "X-WP-TotalPages": "1", "X-WP-TotalByStatus": "{\"all\":1}" }
        }))]);
        api.fetch_stories_for_widget(&StoryQuery::default()).await;

        let calls = api.adapter.calls.lock().unwrap().clone();
        assert!(calls[0].path.contains("_web_stories_envelope=true"));
        assert_eq!(api.state().stories_order, vec![StoryId(9)]);
    }

    #[tokio::test]
    async fn update_posts_write_back_payload_and_upserts_the_answer() {
        let api = api(vec![ok_json(listing(&[12])), ok_json(record(12, "draft"))]);
        api.fetch_stories(&StoryQuery::default()).await;

        let mut story = api.state().stories[&StoryId(12)].clone();
        story.title = "Renamed".to_string();
        api.update_story(&story).await;

        let calls = api.adapter.calls.lock().unwrap().clone();
        let update = &calls[1];
        assert_eq!(update.method, "POST");
        assert_eq!(update.path, format!("{STORY_API}/12"));
        assert_eq!(update.body["title"]["raw"], json!("Renamed"));
        // Unmodeled server fields ride along on write-back.
        assert_eq!(update.body["featured_media"], json!(42));
        assert_eq!(api.state().error, None);
    }

    #[tokio::test]
    async fn trash_issues_a_delete_and_updates_the_buckets() {
        let api = api(vec![ok_json(listing(&[12])), ok_json(json!({"deleted": true}))]);
        api.fetch_stories(&StoryQuery::default()).await;
        let story = api.state().stories[&StoryId(12)].clone();

        api.trash_story(&story).await;

        let state = api.state();
        assert!(state.stories_order.is_empty());
        assert_eq!(state.totals_by_status.get(TotalsKey::All), 0);
        assert_eq!(state.totals_by_status.get(TotalsKey::Draft), 0);

        let calls = api.adapter.calls.lock().unwrap().clone();
        assert_eq!(calls[1].method, "DELETE");
        assert_eq!(calls[1].path, format!("{STORY_API}/12"));
    }

    #[tokio::test]
    async fn duplicate_posts_a_draft_copy_and_prepends_it() {
        let api = api(vec![ok_json(listing(&[12])), ok_json(record(90, "draft"))]);
        api.fetch_stories(&StoryQuery::default()).await;
        let story = api.state().stories[&StoryId(12)].clone();

        api.duplicate_story(&story).await;

        let calls = api.adapter.calls.lock().unwrap().clone();
        let create = &calls[1];
        assert_eq!(create.method, "POST");
        assert_eq!(create.path, STORY_API);
        assert_eq!(create.body["title"]["raw"], json!("Story 12 (Copy)"));
        assert_eq!(create.body["status"], json!("draft"));
        assert_eq!(create.body["featured_media"], json!(42));
        assert!(create.body["story_data"]["pages"].is_array());

        let state = api.state();
        assert_eq!(state.stories_order[0], StoryId(90));
        assert_eq!(state.totals_by_status.get(TotalsKey::All), 2);
    }

    #[tokio::test]
    async fn template_creation_returns_a_navigation_intent() {
        let api = api(vec![ok_json(record(41, "draft"))]);
        let template = StoryTemplate {
            title: "Cooking 101".to_string(),
            version: 0,
            pages: vec![json!({ "elements": [] })],
        };

        let intent = api.create_story_from_template(&template).await;
        assert_eq!(
            intent,
            Some(NavigationIntent {
                url: format!("{EDIT_URL}&post=41"),
            })
        );

        let state = api.state();
        assert!(!state.is_loading);
        assert_eq!(state.error, None);
        // The new story lives behind the navigation target, not in this list.
        assert!(state.stories.is_empty());

        let calls = api.adapter.calls.lock().unwrap().clone();
        assert_eq!(
            calls[0].body["story_data"]["version"],
            json!(CURRENT_STORY_VERSION)
        );
    }

    #[tokio::test]
    async fn template_creation_failure_is_recorded_and_returns_none() {
        let api = api(vec![Err(AdapterError::new("denied", None))]);
        let intent = api
            .create_story_from_template(&StoryTemplate::default())
            .await;

        assert_eq!(intent, None);
        let state = api.state();
        assert!(!state.is_loading);
        assert_eq!(
            state.error.expect("error recorded").message.title,
            CREATE_STORY_TITLE
        );
    }

    #[tokio::test]
    async fn preview_fetches_markup_through_the_preview_link() {
        let api = api(vec![Ok(AdapterResponse {
            body: "<html>preview</html>".to_string(),
            headers: BTreeMap::new(),
        })]);
        let story = normalized(12, StoryStatus::Draft);

        api.create_story_preview(&story).await;

        let state = api.state();
        assert_eq!(state.preview_markup, "<html>preview</html>");
        assert!(!state.is_loading);

        api.clear_story_preview();
        assert_eq!(api.state().preview_markup, "");

        let calls = api.adapter.calls.lock().unwrap().clone();
        assert_eq!(calls[0].path, "http://wp.local/?p=12&preview=true");
    }
}
