use pretty_assertions::assert_eq;

use super::*;

#[test]
fn repeated_identical_failures_get_distinct_increasing_tokens() {
    let mut state = state();

    dispatch(
        &mut state,
        StoryAction::TrashStoryFailure(failure("Unable to trash story")),
    );
    let first = state.error.clone().expect("error recorded");

    dispatch(
        &mut state,
        StoryAction::TrashStoryFailure(failure("Unable to trash story")),
    );
    let second = state.error.clone().expect("error recorded");

    assert_eq!(first.message, second.message);
    assert_eq!(first.code, second.code);
    assert!(second.id.seq > first.id.seq);
    assert!(second.id.at >= first.id.at);
}

#[test]
fn every_failure_variant_records_the_payload() {
    let payload = failure("something failed");
    let variants = [
        StoryAction::UpdateStoryFailure(payload.clone()),
        StoryAction::TrashStoryFailure(payload.clone()),
        StoryAction::DuplicateStoryFailure(payload.clone()),
        StoryAction::CreateStoryFromTemplateFailure(payload.clone()),
        StoryAction::CreateStoryPreviewFailure(payload.clone()),
        StoryAction::FetchStoriesFailure {
            payload: payload.clone(),
            request_id: 0,
        },
    ];

    for action in variants {
        let mut state = state();
        let effects = dispatch(&mut state, action);
        assert!(effects.is_empty());
        let error = state.error.expect("error recorded");
        assert_eq!(error.message, payload.message);
        assert_eq!(error.code, payload.code);
    }
}

#[test]
fn template_success_clears_the_error_and_yields_a_navigation_intent() {
    let mut state = state();
    dispatch(
        &mut state,
        StoryAction::CreateStoryFromTemplateFailure(failure("Unable to create story")),
    );
    assert!(state.error.is_some());

    let effects = dispatch(
        &mut state,
        StoryAction::CreateStoryFromTemplateSuccess {
            edit_story_link: format!("{EDIT_URL}&post=41"),
        },
    );

    assert_eq!(state.error, None);
    assert_eq!(
        effects,
        vec![StoryEffect::NavigateTo(format!("{EDIT_URL}&post=41"))]
    );
    // Template creation never touches the story collection.
    assert!(state.stories.is_empty());
    assert!(state.stories_order.is_empty());
}
