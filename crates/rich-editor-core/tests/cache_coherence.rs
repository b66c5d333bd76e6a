use pretty_assertions::assert_eq;
use rich_editor_core::headless::{HeadlessLogs, HeadlessSurface, headless_editor};
use rich_editor_core::{
    ContentModelBlock, ContentModelCopyMode, ContentModelParagraph, DomPosition, DomSelection,
    DomToModelOptions, Editor, EditorOptions, SelectionOverride, SurfaceMutation,
    create_content_model, format_content_model,
};
use std::rc::Rc;

fn editor_with(paragraphs: &[&str]) -> (Editor<HeadlessSurface>, HeadlessLogs) {
    headless_editor(
        HeadlessSurface::from_paragraphs(paragraphs.iter().copied()),
        &EditorOptions::default(),
    )
}

#[test]
fn test_repeated_acquisition_reuses_cached_model() {
    let (mut editor, logs) = editor_with(&["hello", "world"]);

    let first = editor
        .get_content_model_copy(ContentModelCopyMode::Connected)
        .unwrap();
    let second = editor
        .get_content_model_copy(ContentModelCopyMode::Connected)
        .unwrap();

    assert!(Rc::ptr_eq(&first, &second));
    assert_eq!(logs.conversions.dom_to_model_calls(), 1);
    assert_eq!(logs.conversions.stats().last_indexing_allowed, Some(true));
}

#[test]
fn test_acquisition_after_commit_returns_committed_model() {
    let (mut editor, logs) = editor_with(&["hello"]);
    let before = editor
        .get_content_model_copy(ContentModelCopyMode::Connected)
        .unwrap();

    editor
        .format_content_model(
            |model, _| {
                model.add_block(ContentModelBlock::Paragraph(
                    ContentModelParagraph::from_text("world"),
                ));
                true
            },
            None,
        )
        .unwrap();

    let after = editor
        .get_content_model_copy(ContentModelCopyMode::Connected)
        .unwrap();
    let again = editor
        .get_content_model_copy(ContentModelCopyMode::Connected)
        .unwrap();

    assert!(!Rc::ptr_eq(&before, &after));
    assert!(Rc::ptr_eq(&after, &again));
    assert_eq!(after.plain_text(), "hello\nworld");
    assert_eq!(before.plain_text(), "hello");
    assert_eq!(logs.conversions.dom_to_model_calls(), 1);
    assert_eq!(editor.surface().to_html(), "<p>hello</p><p>world</p>");
}

#[test]
fn test_external_text_change_forces_rederivation() {
    let (mut editor, logs) = editor_with(&["hello"]);
    let cached = editor
        .get_content_model_copy(ContentModelCopyMode::Connected)
        .unwrap();

    let text = editor.surface().inline_id(0, 0).unwrap();
    assert!(editor.surface_mut().type_text(text, 5, "!"));

    let fresh = editor
        .get_content_model_copy(ContentModelCopyMode::Connected)
        .unwrap();
    assert!(!Rc::ptr_eq(&cached, &fresh));
    assert_eq!(fresh.plain_text(), "hello!");
    assert_eq!(logs.conversions.dom_to_model_calls(), 2);
}

#[test]
fn test_attribute_change_keeps_cache() {
    let (mut editor, logs) = editor_with(&["hello"]);
    let cached = editor
        .get_content_model_copy(ContentModelCopyMode::Connected)
        .unwrap();

    editor
        .surface_mut()
        .record_mutation(SurfaceMutation::Attribute("class".to_string()));

    let again = editor
        .get_content_model_copy(ContentModelCopyMode::Connected)
        .unwrap();
    assert!(Rc::ptr_eq(&cached, &again));
    assert_eq!(logs.conversions.dom_to_model_calls(), 1);
}

#[test]
fn test_no_selection_override_is_never_cached() {
    let (mut editor, logs) = editor_with(&["hello"]);
    let text = editor.surface().inline_id(0, 0).unwrap();
    editor.surface_mut().focus();
    editor.surface_mut().place_caret(text, 2);

    let model = create_content_model(editor.core_mut(), None, Some(&SelectionOverride::None))
        .unwrap();

    let stats = logs.conversions.stats();
    assert_eq!(stats.last_bound_selection, None);
    assert_eq!(stats.last_indexing_allowed, Some(false));
    assert!(!model.has_selection());
    assert!(editor.core().state.cache.model.is_none());
    assert!(editor.core().state.cache.dom_indexer.is_empty());
}

#[test]
fn test_conversion_options_bypass_cache() {
    let (mut editor, logs) = editor_with(&["hello"]);
    let cached = editor
        .get_content_model_copy(ContentModelCopyMode::Connected)
        .unwrap();

    let options = DomToModelOptions {
        disable_cache_element: true,
        ..Default::default()
    };
    let uncached = create_content_model(editor.core_mut(), Some(&options), None).unwrap();

    assert_eq!(logs.conversions.dom_to_model_calls(), 2);
    assert_eq!(uncached.blocks[0].cached_element(), None);
    let still_cached = editor.core().state.cache.model.clone().unwrap();
    assert!(Rc::ptr_eq(&cached, &still_cached));
}

#[test]
fn test_selection_change_invalidates_cache() {
    let (mut editor, logs) = editor_with(&["hello"]);
    editor
        .get_content_model_copy(ContentModelCopyMode::Connected)
        .unwrap();
    assert!(editor.core().state.cache.model.is_some());

    let text = editor.surface().inline_id(0, 0).unwrap();
    editor.surface_mut().focus();
    editor.surface_mut().place_caret(text, 3);
    editor.notify_selection_changed();
    assert!(editor.core().state.cache.model.is_none());

    let model = editor
        .get_content_model_copy(ContentModelCopyMode::Connected)
        .unwrap();
    assert!(model.has_selection());
    assert_eq!(
        logs.conversions.stats().last_bound_selection,
        Some(DomSelection::caret(DomPosition::new(text, 3)))
    );
}

#[test]
fn test_unchanged_selection_keeps_cache() {
    let (mut editor, _logs) = editor_with(&["hello"]);
    let text = editor.surface().inline_id(0, 0).unwrap();
    editor.surface_mut().focus();
    editor.surface_mut().place_caret(text, 3);

    let cached = editor
        .get_content_model_copy(ContentModelCopyMode::Connected)
        .unwrap();
    editor.notify_selection_changed();

    let again = editor
        .get_content_model_copy(ContentModelCopyMode::Connected)
        .unwrap();
    assert!(Rc::ptr_eq(&cached, &again));
}

#[test]
fn test_clean_and_disconnected_copies() {
    let (mut editor, logs) = editor_with(&["hello"]);
    let text = editor.surface().inline_id(0, 0).unwrap();
    editor.surface_mut().place_caret(text, 1);

    let connected = editor
        .get_content_model_copy(ContentModelCopyMode::Connected)
        .unwrap();
    let disconnected = editor
        .get_content_model_copy(ContentModelCopyMode::Disconnected)
        .unwrap();
    let clean = editor
        .get_content_model_copy(ContentModelCopyMode::Clean)
        .unwrap();

    assert!(connected.has_selection());
    assert!(disconnected.has_selection());
    assert!(!Rc::ptr_eq(&connected, &disconnected));
    assert!(disconnected.blocks.iter().all(|block| block.cached_element().is_none()));
    assert!(!clean.has_selection());
    assert_eq!(clean.plain_text(), "hello");
    assert_eq!(logs.conversions.dom_to_model_calls(), 2);

    let cached = editor.core().state.cache.model.clone().unwrap();
    assert!(Rc::ptr_eq(&connected, &cached));
}

#[test]
fn test_clear_model_cache_request_is_honored_without_change() {
    let (mut editor, logs) = editor_with(&["hello"]);
    editor
        .get_content_model_copy(ContentModelCopyMode::Connected)
        .unwrap();

    format_content_model(
        editor.core_mut(),
        |_, context| {
            context.clear_model_cache = true;
            false
        },
        None,
    )
    .unwrap();

    assert!(editor.core().state.cache.model.is_none());
    assert_eq!(logs.conversions.model_to_dom_calls(), 0);
    assert!(logs.snapshots.is_empty());
    assert!(logs.events.content_changes().is_empty());
}
