use super::reshape::RawStoryRecord;
use super::state::FailurePayload;
use super::state::NormalizedStory;
use super::state::StatusTotals;
use super::state::StoryId;
use super::state::StoryStatus;

/// State transitions of the story list. Loading and failure variants for
/// the fetch flow carry the request id that issued them so the reducer can
/// drop responses that lost the race against a newer fetch.
#[derive(Debug, Clone)]
pub enum StoryAction {
    LoadingStories {
        active: bool,
        request_id: u64,
    },
    CreatingStoryFromTemplate(bool),
    CreatingStoryPreview(bool),

    FetchStoriesSuccess {
        stories: Vec<RawStoryRecord>,
        total_pages: u32,
        totals_by_status: StatusTotals,
        page: u32,
        edit_story_url: String,
        request_id: u64,
    },
    FetchStoriesFailure {
        payload: FailurePayload,
        request_id: u64,
    },

    UpdateStory(NormalizedStory),
    UpdateStoryFailure(FailurePayload),

    TrashStory {
        id: StoryId,
        story_status: StoryStatus,
    },
    TrashStoryFailure(FailurePayload),

    DuplicateStory(NormalizedStory),
    DuplicateStoryFailure(FailurePayload),

    CreateStoryFromTemplateSuccess {
        edit_story_link: String,
    },
    CreateStoryFromTemplateFailure(FailurePayload),

    CreateStoryPreviewSuccess(String),
    CreateStoryPreviewFailure(FailurePayload),
    ClearStoryPreview,
}
