pub(super) use super::reduce;
pub(super) use super::StoryEffect;
pub(super) use crate::actions::StoryAction;
pub(super) use crate::reshape::reshape_story;
pub(super) use crate::reshape::PassthroughMigration;
pub(super) use crate::reshape::RawStoryRecord;
pub(super) use crate::reshape::RawTitle;
pub(super) use crate::reshape::StoryDocument;
pub(super) use crate::state::ErrorMessage;
pub(super) use crate::state::FailurePayload;
pub(super) use crate::state::NormalizedStory;
pub(super) use crate::state::StatusTotals;
pub(super) use crate::state::StoryId;
pub(super) use crate::state::StoryListState;
pub(super) use crate::state::StoryStatus;
pub(super) use crate::state::TotalsKey;

mod failures;

pub(super) const EDIT_URL: &str = "http://wp.local/wp-admin/edit.php?action=edit";

fn state() -> StoryListState {
    StoryListState::new()
}

fn raw_story(id: u64) -> RawStoryRecord {
    RawStoryRecord {
        id,
        title: RawTitle {
            raw: format!("Story {id}"),
        },
        story_data: StoryDocument {
            version: 30,
            pages: vec![serde_json::json!({ "elements": [] })],
        },
        ..RawStoryRecord::default()
    }
}

fn normalized(id: u64, status: StoryStatus) -> NormalizedStory {
    let mut raw = raw_story(id);
    raw.status = status;
    reshape_story(EDIT_URL, &PassthroughMigration, raw).expect("valid test record")
}

fn failure(title: &str) -> FailurePayload {
    FailurePayload {
        message: ErrorMessage::new(title, "request failed"),
        code: Some("internal_error".to_string()),
    }
}

fn totals(entries: &[(TotalsKey, u64)]) -> StatusTotals {
    let mut totals = StatusTotals::default();
    for (key, count) in entries {
        totals.set(*key, *count);
    }
    totals
}

fn fetch_success(
    ids: &[u64],
    page: u32,
    total_pages: u32,
    request_id: u64,
) -> StoryAction {
    StoryAction::FetchStoriesSuccess {
        stories: ids.iter().map(|id| raw_story(*id)).collect(),
        total_pages,
        totals_by_status: totals(&[(TotalsKey::All, ids.len() as u64)]),
        page,
        edit_story_url: EDIT_URL.to_string(),
        request_id,
    }
}

fn dispatch(state: &mut StoryListState, action: StoryAction) -> Vec<StoryEffect> {
    reduce(state, action, &PassthroughMigration)
}

fn order_ids(state: &StoryListState) -> Vec<u64> {
    state.stories_order.iter().map(|id| id.0).collect()
}
