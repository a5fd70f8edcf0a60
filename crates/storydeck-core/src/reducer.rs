use std::collections::HashSet;

use chrono::Utc;

use super::actions::StoryAction;
use super::reshape::reshape_story;
use super::reshape::StoryMigration;
use super::state::ErrorToken;
use super::state::FailurePayload;
use super::state::StoryError;
use super::state::StoryId;
use super::state::StoryListState;
use super::state::TotalsKey;

/// Side effects the reducer asks its caller to perform. Navigation is a
/// value here, not a direct jump: the outermost caller decides how to
/// follow the link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoryEffect {
    NavigateTo(String),
}

/// Applies one action to the story list state. Total over the action set;
/// failures are recorded as data, never raised.
pub fn reduce(
    state: &mut StoryListState,
    action: StoryAction,
    migration: &dyn StoryMigration,
) -> Vec<StoryEffect> {
    match action {
        StoryAction::LoadingStories { active, request_id } => {
            if active {
                if request_id > state.latest_fetch_id {
                    state.latest_fetch_id = request_id;
                }
                state.is_loading = true;
            } else if request_id >= state.latest_fetch_id {
                // A superseded fetch must not clear the flag the newer one set.
                state.is_loading = false;
            }
            Vec::new()
        }
        StoryAction::CreatingStoryFromTemplate(active) => {
            state.is_loading = active;
            Vec::new()
        }
        StoryAction::CreatingStoryPreview(active) => {
            state.is_loading = active;
            Vec::new()
        }
        StoryAction::FetchStoriesSuccess {
            stories,
            total_pages,
            totals_by_status,
            page,
            edit_story_url,
            request_id,
        } => {
            if request_id < state.latest_fetch_id {
                tracing::debug!(request_id, latest = state.latest_fetch_id, "stale fetch result ignored");
                return Vec::new();
            }

            let mut fetched_ids = Vec::new();
            for raw in stories {
                // Invalid records are dropped here, not surfaced as errors.
                if let Some(story) = reshape_story(&edit_story_url, migration, raw) {
                    fetched_ids.push(story.id);
                    state.stories.insert(story.id, story);
                }
            }

            state.stories_order = if page <= 1 {
                // A page-1 fetch restarts the listing (new search or filter).
                fetched_ids
            } else {
                let mut seen: HashSet<StoryId> = HashSet::new();
                state
                    .stories_order
                    .iter()
                    .copied()
                    .chain(fetched_ids)
                    .filter(|id| seen.insert(*id))
                    .collect()
            };

            state.total_pages = Some(total_pages);
            state.totals_by_status = totals_by_status;
            state.all_pages_fetched = page >= total_pages;
            state.error = None;
            Vec::new()
        }
        StoryAction::FetchStoriesFailure {
            payload,
            request_id,
        } => {
            if request_id >= state.latest_fetch_id {
                record_failure(state, payload);
            }
            Vec::new()
        }
        StoryAction::UpdateStory(story) => {
            state.stories.insert(story.id, story);
            state.error = None;
            Vec::new()
        }
        StoryAction::UpdateStoryFailure(payload) => {
            record_failure(state, payload);
            Vec::new()
        }
        StoryAction::TrashStory { id, story_status } => {
            state.stories_order.retain(|entry| *entry != id);
            state.stories.remove(&id);
            state.totals_by_status.decrement(TotalsKey::All);
            state
                .totals_by_status
                .decrement(TotalsKey::trash_bucket(story_status));
            Vec::new()
        }
        StoryAction::TrashStoryFailure(payload) => {
            record_failure(state, payload);
            Vec::new()
        }
        StoryAction::DuplicateStory(story) => {
            // The copy always lands at the front of the listing, regardless
            // of the sort settings held elsewhere.
            state.stories_order.insert(0, story.id);
            state.totals_by_status.increment(TotalsKey::All);
            state
                .totals_by_status
                .increment(TotalsKey::for_status(story.status));
            state.stories.insert(story.id, story);
            Vec::new()
        }
        StoryAction::DuplicateStoryFailure(payload) => {
            record_failure(state, payload);
            Vec::new()
        }
        StoryAction::CreateStoryFromTemplateSuccess { edit_story_link } => {
            state.error = None;
            vec![StoryEffect::NavigateTo(edit_story_link)]
        }
        StoryAction::CreateStoryFromTemplateFailure(payload) => {
            record_failure(state, payload);
            Vec::new()
        }
        StoryAction::CreateStoryPreviewSuccess(markup) => {
            state.preview_markup = markup;
            state.is_loading = false;
            state.error = None;
            Vec::new()
        }
        StoryAction::CreateStoryPreviewFailure(payload) => {
            record_failure(state, payload);
            Vec::new()
        }
        StoryAction::ClearStoryPreview => {
            state.preview_markup.clear();
            Vec::new()
        }
    }
}

fn record_failure(state: &mut StoryListState, payload: FailurePayload) {
    state.error_seq += 1;
    state.error = Some(StoryError {
        message: payload.message,
        code: payload.code,
        id: ErrorToken {
            seq: state.error_seq,
            at: Utc::now(),
        },
    });
}

#[cfg(test)]
mod tests;
