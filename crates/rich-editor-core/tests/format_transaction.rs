use pretty_assertions::assert_eq;
use rich_editor_core::headless::{HeadlessLogs, HeadlessSurface, headless_editor};
use rich_editor_core::{
    AnnounceData, ChangeSource, ChangedEntity, ContentModelBlock, ContentModelCopyMode,
    ContentModelEntity, ContentModelImage, ContentModelParagraph, ContentModelSegment,
    DeletedEntity, DomPosition, DomSelection, Editor, EditorError, EditorOptions, EntityOperation,
    EntityState, FormatContentModelOptions, ImageFormat, ModelElement, NodeId,
    PERSISTED_SELECTION_MARKER,
    PendingFormatUpdate, PersistedSelectionMode, RawEvent, SegmentFormat, SegmentLocation,
    SetContentModelOptions, SurfaceCapabilities, set_content_model,
};
use serde_json::json;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

fn editor_over(surface: HeadlessSurface) -> (Editor<HeadlessSurface>, HeadlessLogs) {
    headless_editor(surface, &EditorOptions::default())
}

fn editor_with(paragraphs: &[&str]) -> (Editor<HeadlessSurface>, HeadlessLogs) {
    editor_over(HeadlessSurface::from_paragraphs(paragraphs.iter().copied()))
}

fn paragraph(text: &str) -> ContentModelBlock {
    ContentModelBlock::Paragraph(ContentModelParagraph::from_text(text))
}

fn bold() -> SegmentFormat {
    SegmentFormat {
        bold: Some(true),
        ..Default::default()
    }
}

#[derive(Debug, thiserror::Error)]
enum PluginError {
    #[error(transparent)]
    Editor(#[from] EditorError),
    #[error("edit rejected")]
    Rejected,
}

#[test]
fn test_unchanged_transaction_writes_nothing() {
    let (mut editor, logs) = editor_with(&["hello"]);

    editor
        .format_content_model(
            |model, _| {
                assert_eq!(model.plain_text(), "hello");
                false
            },
            None,
        )
        .unwrap();

    assert_eq!(logs.conversions.dom_to_model_calls(), 1);
    assert_eq!(logs.conversions.model_to_dom_calls(), 0);
    assert!(logs.snapshots.is_empty());
    assert!(logs.events.events().is_empty());
    assert_eq!(editor.surface().to_html(), "<p>hello</p>");
}

#[test]
fn test_changed_transaction_snapshots_then_commits() {
    let (mut editor, logs) = editor_with(&["hello"]);

    editor
        .format_content_model(
            |model, _| {
                model.add_block(paragraph("world"));
                true
            },
            None,
        )
        .unwrap();

    assert_eq!(editor.surface().to_html(), "<p>hello</p><p>world</p>");

    let snapshots = logs.snapshots.records();
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].html, "<p>hello</p>");
    assert!(!snapshots[0].can_undo_by_backspace);
    assert!(!editor.core().state.undo.has_new_content);
    assert!(!editor.core().state.undo.is_nested);

    let changes = logs.events.content_changes();
    assert_eq!(changes.len(), 1);
    assert!(changes[0].broadcast);
    assert_eq!(changes[0].source, Some(ChangeSource::Format));
    assert_eq!(changes[0].model_text.as_deref(), Some("hello\nworld"));
}

#[test]
fn test_reacquire_after_commit_returns_committed_model() {
    let (mut editor, logs) = editor_with(&["hello"]);

    editor
        .format_content_model(
            |model, _| {
                model.add_block(paragraph("more"));
                true
            },
            None,
        )
        .unwrap();

    let committed = editor.core().state.cache.model.clone().unwrap();
    let reacquired = editor
        .get_content_model_copy(ContentModelCopyMode::Connected)
        .unwrap();

    assert!(Rc::ptr_eq(&committed, &reacquired));
    assert_eq!(reacquired.plain_text(), "hello\nmore");
    assert_eq!(logs.conversions.dom_to_model_calls(), 1);
}

#[test]
fn test_nested_transaction_keeps_both_edits() {
    let (mut editor, logs) = editor_with(&["hello"]);

    editor
        .format_content_model(
            |model, context| {
                model.add_block(paragraph("outer"));
                assert!(context.editor().state.undo.is_nested);

                let changed = context.format_nested(model, |inner, nested| {
                    // The nested mutator sees the outer edit.
                    assert_eq!(inner.plain_text(), "hello\nouter");
                    assert!(nested.editor().state.undo.is_nested);
                    inner.add_block(paragraph("inner"));
                    true
                });
                assert!(changed);
                assert!(context.editor().state.undo.has_new_content);
                true
            },
            None,
        )
        .unwrap();

    assert_eq!(
        editor.surface().to_html(),
        "<p>hello</p><p>outer</p><p>inner</p>"
    );
    let snapshots = logs.snapshots.records();
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].html, "<p>hello</p>");
    assert_eq!(logs.events.content_changes().len(), 1);
    assert!(!editor.core().state.undo.has_new_content);
    assert!(!editor.core().state.undo.is_nested);
}

#[test]
fn test_format_nested_merges_into_outer_commit() {
    let (mut editor, logs) = editor_with(&["hello"]);

    editor
        .format_content_model(
            |model, context| {
                let changed = context.format_nested(model, |model, nested| {
                    model.add_block(paragraph("nested"));
                    nested.change_source = Some(ChangeSource::Keyboard);
                    nested.announce_data = Some(AnnounceData {
                        text: "Paragraph added".to_string(),
                    });
                    true
                });
                assert!(changed);
                assert!(context.change_source.is_some());

                model.add_block(paragraph("outer"));
                true
            },
            None,
        )
        .unwrap();

    assert_eq!(
        editor.surface().to_html(),
        "<p>hello</p><p>nested</p><p>outer</p>"
    );
    assert_eq!(logs.snapshots.len(), 1);
    assert_eq!(logs.conversions.model_to_dom_calls(), 1);

    let changes = logs.events.content_changes();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].source, Some(ChangeSource::Keyboard));
    assert_eq!(
        logs.events.announcements(),
        vec!["Paragraph added".to_string()]
    );
    assert!(!editor.core().state.undo.has_new_content);
}

#[test]
fn test_unchanged_nested_mutator_reports_nothing() {
    let (mut editor, logs) = editor_with(&["hello"]);

    editor
        .format_content_model(
            |model, context| {
                let changed = context.format_nested(model, |_, nested| {
                    nested.change_source = Some(ChangeSource::Paste);
                    false
                });
                assert!(!changed);
                assert_eq!(context.change_source, None);
                false
            },
            None,
        )
        .unwrap();

    assert!(!editor.core().state.undo.has_new_content);
    assert!(logs.events.events().is_empty());
}

#[test]
fn test_skipped_snapshot_is_covered_by_next_transaction() {
    let (mut editor, logs) = editor_with(&["hello"]);

    editor
        .format_content_model(
            |model, context| {
                context.skip_undo_snapshot = true;
                model.add_block(paragraph("one"));
                true
            },
            None,
        )
        .unwrap();
    assert!(logs.snapshots.is_empty());
    assert!(editor.core().state.undo.has_new_content);

    editor
        .format_content_model(
            |model, _| {
                model.add_block(paragraph("two"));
                true
            },
            None,
        )
        .unwrap();

    let snapshots = logs.snapshots.records();
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].html, "<p>hello</p><p>one</p>");
    assert!(!editor.core().state.undo.has_new_content);
    assert_eq!(
        editor.surface().to_html(),
        "<p>hello</p><p>one</p><p>two</p>"
    );
}

#[test]
fn test_snapshot_carries_entity_states() {
    let (mut editor, logs) = editor_with(&["hello"]);
    let state = EntityState {
        entity_type: "chart".to_string(),
        id: "c1".to_string(),
        state: "{\"zoom\":2}".to_string(),
    };

    editor
        .format_content_model(
            |model, context| {
                context.entity_states.push(state.clone());
                model.add_block(paragraph("x"));
                true
            },
            None,
        )
        .unwrap();

    assert_eq!(logs.snapshots.records()[0].entity_states, vec![state]);
}

#[test]
fn test_mutator_error_leaves_editor_untouched() {
    let (mut editor, logs) = editor_with(&["hello"]);

    let result = editor.try_format_content_model(
        |model, _| {
            model.add_block(paragraph("half done"));
            Err(PluginError::Rejected)
        },
        None,
    );

    assert!(matches!(result, Err(PluginError::Rejected)));
    assert!(!editor.core().state.undo.is_nested);
    assert_eq!(editor.surface().to_html(), "<p>hello</p>");
    assert_eq!(logs.conversions.model_to_dom_calls(), 0);
    assert!(logs.snapshots.is_empty());
    assert!(logs.events.events().is_empty());

    let cached = editor.core().state.cache.model.clone().unwrap();
    assert_eq!(cached.plain_text(), "hello");
}

#[test]
fn test_panicking_mutator_resets_nesting() {
    let (mut editor, logs) = editor_with(&["hello"]);

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        editor
            .format_content_model(|_, _| panic!("mutator failed"), None)
            .unwrap();
    }));
    assert!(outcome.is_err());
    assert!(!editor.core().state.undo.is_nested);

    editor
        .format_content_model(
            |model, _| {
                model.add_block(paragraph("after"));
                true
            },
            None,
        )
        .unwrap();

    assert_eq!(logs.snapshots.len(), 1);
    assert_eq!(editor.surface().to_html(), "<p>hello</p><p>after</p>");
}

#[test]
fn test_converter_failure_propagates_and_keeps_cache() {
    let (mut editor, logs) = editor_with(&["hello"]);
    let cached = editor
        .get_content_model_copy(ContentModelCopyMode::Connected)
        .unwrap();

    logs.conversions.fail_next_write();
    let result: Result<(), PluginError> = editor.try_format_content_model(
        |model, _| {
            model.add_block(paragraph("lost"));
            Ok(true)
        },
        None,
    );

    assert!(matches!(
        result,
        Err(PluginError::Editor(EditorError::Converter(_)))
    ));
    assert!(!editor.core().state.undo.is_nested);
    assert_eq!(editor.surface().to_html(), "<p>hello</p>");
    assert!(logs.events.content_changes().is_empty());

    let still_cached = editor.core().state.cache.model.clone().unwrap();
    assert!(Rc::ptr_eq(&cached, &still_cached));
}

#[test]
fn test_change_event_carries_options_and_entities() {
    let (mut editor, logs) = editor_with(&["hello"]);
    let chart = ContentModelEntity {
        entity_type: "chart".to_string(),
        id: "c1".to_string(),
        is_readonly: true,
        ..Default::default()
    };
    let removed = ContentModelEntity {
        entity_type: "mention".to_string(),
        id: "m7".to_string(),
        ..Default::default()
    };

    editor
        .format_content_model(
            |model, context| {
                model.add_block(ContentModelBlock::Entity(chart.clone()));
                context.new_entities.push(chart.clone());
                context.deleted_entities.push(DeletedEntity {
                    entity: removed.clone(),
                    operation: EntityOperation::RemoveFromEnd,
                });
                true
            },
            Some(FormatContentModelOptions {
                change_source: Some(ChangeSource::Paste),
                api_name: Some("pasteChart"),
                raw_event: Some(RawEvent::new("paste")),
                change_data: Some(json!({ "format": "html" })),
                ..Default::default()
            }),
        )
        .unwrap();

    let change = &logs.events.content_changes()[0];
    assert_eq!(change.source, Some(ChangeSource::Paste));
    assert_eq!(change.api_name.as_deref(), Some("pasteChart"));
    assert_eq!(change.data, Some(json!({ "format": "html" })));
    assert_eq!(
        change.changed_entities,
        vec![
            ChangedEntity {
                entity: chart,
                operation: EntityOperation::NewEntity,
                raw_event: Some(RawEvent::new("paste")),
            },
            ChangedEntity {
                entity: removed,
                operation: EntityOperation::RemoveFromEnd,
                raw_event: Some(RawEvent::new("paste")),
            },
        ]
    );
    assert!(
        editor
            .surface()
            .to_html()
            .ends_with("<div class=\"_Entity _EType_chart _EId_c1\" contenteditable=\"false\"></div>")
    );
}

#[test]
fn test_mutator_change_source_overrides_options() {
    let (mut editor, logs) = editor_with(&["hello"]);

    editor
        .format_content_model(
            |model, context| {
                context.change_source = Some(ChangeSource::Keyboard);
                model.add_block(paragraph("typed"));
                true
            },
            Some(FormatContentModelOptions {
                change_source: Some(ChangeSource::Paste),
                ..Default::default()
            }),
        )
        .unwrap();

    assert_eq!(
        logs.events.content_changes()[0].source,
        Some(ChangeSource::Keyboard)
    );
}

#[test]
fn test_clear_model_cache_drops_model_from_event() {
    let (mut editor, logs) = editor_with(&["hello"]);

    editor
        .format_content_model(
            |model, context| {
                context.clear_model_cache = true;
                model.add_block(paragraph("volatile"));
                true
            },
            None,
        )
        .unwrap();

    assert!(editor.core().state.cache.model.is_none());
    let change = &logs.events.content_changes()[0];
    assert_eq!(change.model_text, None);
    assert_eq!(editor.surface().to_html(), "<p>hello</p><p>volatile</p>");
}

fn insert_image(surface: HeadlessSurface) -> String {
    let (mut editor, _logs) = editor_over(surface);
    editor
        .format_content_model(
            |model, context| {
                model.add_block(ContentModelBlock::Paragraph(ContentModelParagraph {
                    segments: vec![ContentModelSegment::Image(ContentModelImage {
                        src: "cat.png".to_string(),
                        format: ImageFormat::default(),
                        is_selected: false,
                    })],
                    cached_element: None,
                }));
                context.new_images.push(SegmentLocation {
                    block: model.blocks.len() - 1,
                    segment: 0,
                });
                true
            },
            None,
        )
        .unwrap();
    editor.surface().to_html()
}

#[test]
fn test_new_images_are_clamped_to_visible_width() {
    assert_eq!(
        insert_image(HeadlessSurface::from_paragraphs(["a"]).with_visible_width(320.0)),
        "<p>a</p><p><img src=\"cat.png\" style=\"max-width:320px\"></p>"
    );
    // Never below the configured minimum.
    assert_eq!(
        insert_image(HeadlessSurface::from_paragraphs(["a"]).with_visible_width(4.0)),
        "<p>a</p><p><img src=\"cat.png\" style=\"max-width:10px\"></p>"
    );
    // Unknown width leaves the image alone.
    assert_eq!(
        insert_image(HeadlessSurface::from_paragraphs(["a"])),
        "<p>a</p><p><img src=\"cat.png\"></p>"
    );
}

#[test]
fn test_pending_format_follows_caret() {
    let (mut editor, _logs) = editor_with(&["hello"]);
    let text = editor.surface().inline_id(0, 0).unwrap();
    editor.surface_mut().focus();
    editor.surface_mut().place_caret(text, 5);

    editor
        .format_content_model(
            |_, context| {
                context.new_pending_format = Some(PendingFormatUpdate::Format(bold()));
                false
            },
            None,
        )
        .unwrap();
    let pending = editor.pending_format().cloned().unwrap();
    assert_eq!(pending.format, bold());
    assert_eq!(pending.anchor, DomPosition::new(text, 5));

    // The commit rewrites the split paragraph; the pending format moves to the new caret node.
    editor
        .format_content_model(
            |model, context| {
                context.new_pending_format = Some(PendingFormatUpdate::Preserve);
                model.add_block(paragraph("next"));
                true
            },
            None,
        )
        .unwrap();
    let rewritten = editor.surface().inline_id(0, 0).unwrap();
    assert_ne!(rewritten, text);
    let pending = editor.pending_format().cloned().unwrap();
    assert_eq!(pending.format, bold());
    assert_eq!(pending.anchor, DomPosition::new(rewritten, 5));

    // A non-collapsed selection drops it.
    editor.set_dom_selection(Some(DomSelection::range(
        DomPosition::new(rewritten, 0),
        DomPosition::new(rewritten, 2),
    )));
    editor.format_content_model(|_, _| false, None).unwrap();
    assert!(editor.pending_format().is_none());
}

#[test]
fn test_backspace_undo_point_is_recorded_at_caret() {
    let (mut editor, _logs) = editor_with(&["hello"]);
    let text = editor.surface().inline_id(0, 0).unwrap();
    editor.surface_mut().focus();
    editor.surface_mut().place_caret(text, 3);

    editor
        .format_content_model(
            |model, context| {
                context.can_undo_by_backspace = true;
                model.add_block(paragraph("auto"));
                true
            },
            None,
        )
        .unwrap();

    // The caret splits "hello" into "hel" + "lo"; the caret ends up after "hel".
    let first_half = editor.surface().inline_id(0, 0).unwrap();
    assert_eq!(
        editor.core().state.undo.backspace_undo_point,
        Some(DomPosition::new(first_half, 3))
    );
    assert_eq!(
        editor.get_dom_selection(),
        Some(DomSelection::caret(DomPosition::new(first_half, 3)))
    );
}

#[test]
fn test_announce_only_after_change() {
    let (mut editor, logs) = editor_with(&["hello"]);
    let announce = || AnnounceData {
        text: "Bold on".to_string(),
    };

    editor
        .format_content_model(
            |_, context| {
                context.announce_data = Some(announce());
                false
            },
            None,
        )
        .unwrap();
    assert!(logs.events.announcements().is_empty());

    editor
        .format_content_model(
            |model, context| {
                context.announce_data = Some(announce());
                model.add_block(paragraph("x"));
                true
            },
            None,
        )
        .unwrap();
    assert_eq!(logs.events.announcements(), vec!["Bold on".to_string()]);
}

#[test]
fn test_maintained_selection_installs_style_rule() {
    let (mut editor, logs) = editor_with(&["hello"]);
    let model = editor
        .get_content_model_copy(ContentModelCopyMode::Connected)
        .unwrap();

    set_content_model(
        editor.core_mut(),
        Rc::clone(&model),
        Some(SetContentModelOptions {
            should_maintain_selection: true,
            ..Default::default()
        }),
        None,
    )
    .unwrap();
    assert_eq!(
        logs.conversions.stats().last_maintain_selection,
        Some(PersistedSelectionMode::Class)
    );
    let rule = editor.surface().style_rule(PERSISTED_SELECTION_MARKER).unwrap();
    assert!(rule.starts_with(".__persistedSelection"));

    set_content_model(editor.core_mut(), model, None, None).unwrap();
    assert_eq!(logs.conversions.stats().last_maintain_selection, None);
    assert_eq!(editor.surface().style_rule(PERSISTED_SELECTION_MARKER), None);
}

#[test]
fn test_maintained_selection_prefers_highlight() {
    let surface = HeadlessSurface::from_paragraphs(["hello"]).with_capabilities(SurfaceCapabilities {
        supports_highlight: true,
    });
    let (mut editor, logs) = editor_over(surface);
    let model = editor
        .get_content_model_copy(ContentModelCopyMode::Connected)
        .unwrap();

    set_content_model(
        editor.core_mut(),
        model,
        Some(SetContentModelOptions {
            should_maintain_selection: true,
            ..Default::default()
        }),
        None,
    )
    .unwrap();

    assert_eq!(
        logs.conversions.stats().last_maintain_selection,
        Some(PersistedSelectionMode::Highlight)
    );
    assert!(
        editor
            .surface()
            .style_rule(PERSISTED_SELECTION_MARKER)
            .unwrap()
            .starts_with("::highlight(__persistedSelection)")
    );
}

#[test]
fn test_on_node_created_sees_new_nodes_only() {
    let (mut editor, _logs) = editor_with(&["hello"]);
    editor
        .get_content_model_copy(ContentModelCopyMode::Connected)
        .unwrap();

    let mut created = 0;
    let mut count = |_: ModelElement<'_>, _: NodeId| {
        created += 1;
    };
    editor
        .format_content_model(
            |model, _| {
                model.add_block(paragraph("fresh"));
                true
            },
            Some(FormatContentModelOptions {
                on_node_created: Some(&mut count),
                ..Default::default()
            }),
        )
        .unwrap();

    // One paragraph plus its text node; "hello" kept its nodes.
    assert_eq!(created, 2);
}

#[test]
fn test_dark_mode_switch_invalidates_and_notifies() {
    let (mut editor, logs) = editor_with(&["hello"]);
    editor
        .get_content_model_copy(ContentModelCopyMode::Connected)
        .unwrap();

    editor.set_dark_mode_state(true);
    assert!(editor.is_dark_mode());
    assert!(editor.core().state.cache.model.is_none());

    editor.set_dark_mode_state(true);
    let changes = logs.events.content_changes();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].source, Some(ChangeSource::SwitchToDarkMode));
    assert_eq!(changes[0].model_text, None);

    editor
        .get_content_model_copy(ContentModelCopyMode::Connected)
        .unwrap();
    assert_eq!(logs.conversions.stats().last_dark_mode, Some(true));

    editor.set_dark_mode_state(false);
    assert_eq!(
        logs.events.content_changes()[1].source,
        Some(ChangeSource::SwitchToLightMode)
    );
}

#[test]
fn test_take_snapshot_outside_transaction() {
    let (mut editor, logs) = editor_with(&["hello"]);
    editor.core_mut().state.undo.has_new_content = true;

    editor.take_snapshot(true);

    let snapshots = logs.snapshots.records();
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].html, "<p>hello</p>");
    assert!(snapshots[0].can_undo_by_backspace);
    assert!(!editor.core().state.undo.has_new_content);
}
