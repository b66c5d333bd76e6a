//! Format transactions: the read-modify-write cycle every edit goes through.
//!
//! # Overview
//!
//! ```text
//! create_content_model ──▶ mutate(model, context) ──false──▶ pending format only
//!                                   │
//!                                 true
//!                                   ▼
//!        snapshot (outermost only) ──▶ commit ──▶ pending format ──▶ ContentChanged
//! ```
//!
//! The mutator works on a private copy of the model. Nothing reaches the surface or the cache
//! until it returns `true`, so a mutator that bails out (or returns an error) leaves the editor
//! exactly as it was.
//!
//! Transactions nest through [`FormatContentModelContext::format_nested`], which runs the inner
//! mutator on the outer transaction's model. The mutator holds the only mutable reference to that
//! model, so the editor itself is exposed read-only while a transaction is in flight. Only the
//! outermost transaction captures an undo snapshot; inner ones record that new content is pending
//! instead.

use crate::cache::invalidate_cache;
use crate::context::DomToModelOptions;
use crate::core::EditorCore;
use crate::create_model::create_content_model;
use crate::dom_selection::get_dom_selection;
use crate::error::EditorError;
use crate::events::{
    AnnounceData, ChangeSource, ChangedEntity, ContentChangedEvent, DeletedEntity, EditorEvent,
    EntityOperation, EntityState, RawEvent,
};
use crate::model::{ContentModelDocument, ContentModelEntity, ModelHandle, SegmentLocation};
use crate::pending_format::{PendingFormatUpdate, handle_pending_format};
use crate::selection::SelectionOverride;
use crate::set_model::{SetContentModelOptions, commit_model};
use crate::surface::{OnNodeCreated, SnapshotRequest, Surface};
use std::mem;
use std::rc::Rc;
use tracing::debug;

/// Options for [`format_content_model`].
#[derive(Default)]
pub struct FormatContentModelOptions<'a> {
    /// Change source reported when the mutator does not set one.
    pub change_source: Option<ChangeSource>,
    /// Name of the API running the transaction, forwarded in the change event.
    pub api_name: Option<&'a str>,
    /// The platform event that triggered the transaction.
    pub raw_event: Option<RawEvent>,
    /// Selection to bind instead of the current one. Bypasses the model cache.
    pub selection_override: Option<SelectionOverride>,
    /// Conversion options. Bypasses the model cache.
    pub dom_to_model_options: Option<DomToModelOptions>,
    /// Opaque data forwarded in the change event.
    pub change_data: Option<serde_json::Value>,
    /// Called for every node the commit creates.
    pub on_node_created: Option<&'a mut OnNodeCreated<'a>>,
}

/// What a mutator sees besides the model, and what it reports back.
pub struct FormatContentModelContext<'a, S: Surface> {
    editor: &'a mut EditorCore<S>,
    /// The triggering platform event, if any.
    pub raw_event: Option<RawEvent>,
    /// Entities the mutator inserted.
    pub new_entities: Vec<ContentModelEntity>,
    /// Entities the mutator removed.
    pub deleted_entities: Vec<DeletedEntity>,
    /// Images the mutator inserted; clamped to the visible width before commit.
    pub new_images: Vec<SegmentLocation>,
    /// Do not capture an undo snapshot for this change.
    pub skip_undo_snapshot: bool,
    /// Overrides the change source given in the options.
    pub change_source: Option<ChangeSource>,
    /// Accessibility announcement to make after the change.
    pub announce_data: Option<AnnounceData>,
    /// The resulting model must not stay cached.
    pub clear_model_cache: bool,
    /// Pending-format update to apply after the change.
    pub new_pending_format: Option<PendingFormatUpdate>,
    /// The next Backspace may undo this change.
    pub can_undo_by_backspace: bool,
    /// Entity states stored with the undo snapshot.
    pub entity_states: Vec<EntityState>,
}

impl<'a, S: Surface> FormatContentModelContext<'a, S> {
    fn new(editor: &'a mut EditorCore<S>, raw_event: Option<RawEvent>) -> Self {
        Self {
            editor,
            raw_event,
            new_entities: Vec::new(),
            deleted_entities: Vec::new(),
            new_images: Vec::new(),
            skip_undo_snapshot: false,
            change_source: None,
            announce_data: None,
            clear_model_cache: false,
            new_pending_format: None,
            can_undo_by_backspace: false,
            entity_states: Vec::new(),
        }
    }

    /// The editor, for queries. Nested edits go through [`Self::format_nested`].
    pub fn editor(&self) -> &EditorCore<S> {
        &*self.editor
    }

    /// Run `mutate` as a nested transaction on this transaction's `model`.
    ///
    /// The nested mutator neither captures a snapshot nor commits. If it reports a change, the
    /// editor records that new content is pending and its outputs are merged into this context,
    /// so the outer commit and its single snapshot cover both edits. Returns what `mutate`
    /// returned.
    pub fn format_nested<F>(&mut self, model: &mut ContentModelDocument, mutate: F) -> bool
    where
        F: FnOnce(&mut ContentModelDocument, &mut FormatContentModelContext<'_, S>) -> bool,
    {
        let mut nested = FormatContentModelContext::new(&mut *self.editor, self.raw_event.clone());
        let changed = mutate(model, &mut nested);
        let outputs = nested.into_outputs();

        if changed {
            self.editor.state.undo.has_new_content = true;
            self.absorb(outputs);
        } else {
            self.clear_model_cache |= outputs.clear_model_cache;
        }
        changed
    }

    fn absorb(&mut self, outputs: MutatorOutputs) {
        self.new_entities.extend(outputs.new_entities);
        self.deleted_entities.extend(outputs.deleted_entities);
        self.new_images.extend(outputs.new_images);
        self.entity_states.extend(outputs.entity_states);
        self.change_source = self.change_source.take().or(outputs.change_source);
        self.announce_data = self.announce_data.take().or(outputs.announce_data);
        self.new_pending_format = self.new_pending_format.take().or(outputs.new_pending_format);
        self.clear_model_cache |= outputs.clear_model_cache;
        self.can_undo_by_backspace |= outputs.can_undo_by_backspace;
    }

    fn into_outputs(self) -> MutatorOutputs {
        MutatorOutputs {
            raw_event: self.raw_event,
            new_entities: self.new_entities,
            deleted_entities: self.deleted_entities,
            new_images: self.new_images,
            skip_undo_snapshot: self.skip_undo_snapshot,
            change_source: self.change_source,
            announce_data: self.announce_data,
            clear_model_cache: self.clear_model_cache,
            new_pending_format: self.new_pending_format,
            can_undo_by_backspace: self.can_undo_by_backspace,
            entity_states: self.entity_states,
        }
    }
}

/// Mutator outputs, detached from the editor borrow.
struct MutatorOutputs {
    raw_event: Option<RawEvent>,
    new_entities: Vec<ContentModelEntity>,
    deleted_entities: Vec<DeletedEntity>,
    new_images: Vec<SegmentLocation>,
    skip_undo_snapshot: bool,
    change_source: Option<ChangeSource>,
    announce_data: Option<AnnounceData>,
    clear_model_cache: bool,
    new_pending_format: Option<PendingFormatUpdate>,
    can_undo_by_backspace: bool,
    entity_states: Vec<EntityState>,
}

impl MutatorOutputs {
    fn changed_entities(&self) -> Vec<ChangedEntity> {
        let created = self.new_entities.iter().map(|entity| ChangedEntity {
            entity: entity.clone(),
            operation: EntityOperation::NewEntity,
            raw_event: self.raw_event.clone(),
        });
        let deleted = self.deleted_entities.iter().map(|deleted| ChangedEntity {
            entity: deleted.entity.clone(),
            operation: deleted.operation,
            raw_event: self.raw_event.clone(),
        });
        created.chain(deleted).collect()
    }
}

/// Run one transaction.
///
/// `mutate` returns `true` if it changed the model. Converter failures are returned as errors.
pub fn format_content_model<S, F>(
    core: &mut EditorCore<S>,
    mutate: F,
    options: Option<FormatContentModelOptions<'_>>,
) -> Result<(), EditorError>
where
    S: Surface,
    F: FnOnce(&mut ContentModelDocument, &mut FormatContentModelContext<'_, S>) -> bool,
{
    try_format_content_model(
        core,
        |model, context| Ok::<_, EditorError>(mutate(model, context)),
        options,
    )
}

/// Run one transaction with a fallible mutator.
///
/// A mutator error aborts the transaction before anything is written and is returned unchanged.
/// The nesting marker is restored on every path.
pub fn try_format_content_model<S, E, F>(
    core: &mut EditorCore<S>,
    mutate: F,
    options: Option<FormatContentModelOptions<'_>>,
) -> Result<(), E>
where
    S: Surface,
    E: From<EditorError>,
    F: FnOnce(&mut ContentModelDocument, &mut FormatContentModelContext<'_, S>) -> Result<bool, E>,
{
    let mut guard = NestingGuard::enter(core);
    let was_nested = guard.was_nested;
    run_transaction(&mut *guard.core, mutate, options.unwrap_or_default(), was_nested)
}

/// Marks a transaction in flight and restores the previous marker when dropped, also when the
/// mutator unwinds.
struct NestingGuard<'a, S: Surface> {
    core: &'a mut EditorCore<S>,
    was_nested: bool,
}

impl<'a, S: Surface> NestingGuard<'a, S> {
    fn enter(core: &'a mut EditorCore<S>) -> Self {
        let was_nested = mem::replace(&mut core.state.undo.is_nested, true);
        Self { core, was_nested }
    }
}

impl<S: Surface> Drop for NestingGuard<'_, S> {
    fn drop(&mut self) {
        self.core.state.undo.is_nested = self.was_nested;
    }
}

fn run_transaction<S, E, F>(
    core: &mut EditorCore<S>,
    mutate: F,
    options: FormatContentModelOptions<'_>,
    is_nested: bool,
) -> Result<(), E>
where
    S: Surface,
    E: From<EditorError>,
    F: FnOnce(&mut ContentModelDocument, &mut FormatContentModelContext<'_, S>) -> Result<bool, E>,
{
    let mut model = create_content_model(
        core,
        options.dom_to_model_options.as_ref(),
        options.selection_override.as_ref(),
    )?;
    let had_focus = core.surface.has_focus();

    let mut context = FormatContentModelContext::new(core, options.raw_event.clone());
    let changed = mutate(Rc::make_mut(&mut model), &mut context)?;
    let report = context.into_outputs();

    if !changed {
        if report.clear_model_cache && !core.is_in_shadow_edit() {
            invalidate_cache(&mut core.state);
        }
        let selection = get_dom_selection(core);
        handle_pending_format(
            &mut core.state,
            report.new_pending_format.as_ref(),
            selection.as_ref(),
        );
        debug!(api = options.api_name, "format transaction made no change");
        return Ok(());
    }

    let snapshot_taken = capture_snapshot(core, &report, is_nested);
    clamp_new_images(core, &mut model, &report.new_images);

    let selection = commit_model(
        core,
        &mut model,
        Some(SetContentModelOptions {
            ignore_selection: !had_focus,
            ..Default::default()
        }),
        options.on_node_created,
    )?;

    handle_pending_format(
        &mut core.state,
        report.new_pending_format.as_ref(),
        selection.as_ref(),
    );

    if report.can_undo_by_backspace {
        if let Some(position) = selection.as_ref().and_then(|s| s.collapsed_position()) {
            core.state.undo.backspace_undo_point = Some(position);
        }
    }

    if report.clear_model_cache && !core.is_in_shadow_edit() {
        invalidate_cache(&mut core.state);
    }

    let changed_entities = report.changed_entities();
    let source = report
        .change_source
        .or(options.change_source)
        .unwrap_or_default();
    debug!(
        api = options.api_name,
        ?source,
        snapshot_taken,
        nested = is_nested,
        "format transaction committed"
    );

    let event = EditorEvent::ContentChanged(ContentChangedEvent {
        content_model: (!report.clear_model_cache).then_some(&*model),
        selection: selection.as_ref(),
        source,
        data: options.change_data.as_ref(),
        api_name: options.api_name,
        changed_entities: &changed_entities,
    });
    core.events.trigger(&event, true);

    if let Some(announce) = &report.announce_data {
        core.events.announce(announce);
    }

    Ok(())
}

/// Snapshot the surface before the commit when this transaction owns snapshot capture.
///
/// Shadow commits never touch undo history.
fn capture_snapshot<S: Surface>(
    core: &mut EditorCore<S>,
    report: &MutatorOutputs,
    is_nested: bool,
) -> bool {
    if core.is_in_shadow_edit() {
        return false;
    }
    if is_nested || report.skip_undo_snapshot {
        core.state.undo.has_new_content = true;
        return false;
    }

    let selection = get_dom_selection(core);
    core.snapshots.add_snapshot(
        &core.surface,
        SnapshotRequest {
            selection: selection.as_ref(),
            can_undo_by_backspace: false,
            entity_states: &report.entity_states,
        },
    );
    core.state.undo.has_new_content = false;
    true
}

fn clamp_new_images<S: Surface>(
    core: &EditorCore<S>,
    model: &mut ModelHandle,
    new_images: &[SegmentLocation],
) {
    if new_images.is_empty() {
        return;
    }
    let Some(visible_width) = core.surface.visible_width() else {
        return;
    };

    let max_width = visible_width.max(core.environment.min_image_max_width);
    let document = Rc::make_mut(model);
    for location in new_images {
        if let Some(image) = document.image_mut(*location) {
            image.format.max_width = Some(max_width);
        }
    }
}
