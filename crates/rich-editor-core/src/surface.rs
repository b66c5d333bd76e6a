//! Interfaces to the collaborators the core drives but does not implement.
//!
//! - [`Surface`]: the live editable region (plus its low-level mutation flusher)
//! - [`ContentConverter`]: the structural converters between a surface and a Content Model
//! - [`SnapshotManager`]: undo snapshot storage
//! - [`EventSink`]: change and lifecycle notifications
//!
//! The [`headless`](crate::headless) module provides in-memory implementations of all of them.

use crate::context::{DomToModelContext, ModelToDomContext};
use crate::error::ConverterError;
use crate::events::{AnnounceData, EditorEvent, EntityState};
use crate::model::{ContentModelBlock, ContentModelDocument, ContentModelSegment};
use crate::selection::{DomSelection, NodeId, PlatformSelection};

/// Platform features probed once when the editor is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SurfaceCapabilities {
    /// The platform can paint a named highlight over arbitrary ranges
    /// (used to keep the selection visible while the surface is not focused).
    pub supports_highlight: bool,
}

/// A low-level change observed on the surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceMutation {
    /// Children were added or removed.
    ChildList,
    /// Text content changed.
    CharacterData,
    /// The identity of `node` changed (e.g. a table or image got a new id).
    ElementId(NodeId),
    /// A presentational attribute changed.
    Attribute(String),
}

/// The live editable region.
///
/// A detached copy of the surface (shadow edit) is another value of the same type, so
/// converters can write into either one.
pub trait Surface {
    /// Whether the surface currently has input focus.
    fn has_focus(&self) -> bool;

    /// The platform's current selection, if any. May point outside this surface.
    fn platform_selection(&self) -> Option<PlatformSelection>;

    /// Whether `node` is inside this surface.
    fn contains(&self, node: NodeId) -> bool;

    /// Make `selection` the live selection.
    fn select(&mut self, selection: &DomSelection);

    /// Page zoom scale (1.0 = no zoom).
    fn zoom_scale(&self) -> f64;

    /// Whether the computed layout direction of the root is right to left.
    fn is_right_to_left(&self) -> bool;

    /// Width of the visible part of the surface in pixels, if known.
    fn visible_width(&self) -> Option<f64>;

    /// Install (`Some`) or remove (`None`) a style rule identified by `key`.
    fn set_style_rule(&mut self, key: &str, rule: Option<String>);

    /// Platform capabilities. Called once, at editor construction.
    fn capabilities(&self) -> SurfaceCapabilities;

    /// Move all children into a new detached surface, leaving this one empty.
    fn detach_children(&mut self) -> Self
    where
        Self: Sized;

    /// Copy all children into a new detached surface, leaving this one untouched.
    fn clone_children(&self) -> Self
    where
        Self: Sized;

    /// Move all children of `detached` back into this surface, replacing current content.
    fn restore_children(&mut self, detached: Self)
    where
        Self: Sized;

    /// Deliver and clear the mutation records observed since the last flush.
    fn flush_mutations(&mut self) -> Vec<SurfaceMutation> {
        Vec::new()
    }
}

/// A model element passed to [`OnNodeCreated`] callbacks.
#[derive(Debug, Clone, Copy)]
pub enum ModelElement<'a> {
    /// A block was materialized.
    Block(&'a ContentModelBlock),
    /// A segment was materialized.
    Segment(&'a ContentModelSegment),
}

/// Post-processing hook for nodes created by [`ContentConverter::model_to_dom`].
pub type OnNodeCreated<'a> = dyn FnMut(ModelElement<'_>, NodeId) + 'a;

/// Structural converters between a surface and a Content Model.
pub trait ContentConverter<S> {
    /// Build a model from `root`.
    ///
    /// Must not mutate the surface. When `context.dom_indexer` is present, the converter may
    /// record node positions into it. `context.selection` is the selection to bind into the model.
    fn dom_to_model(
        &mut self,
        root: &S,
        context: &mut DomToModelContext,
    ) -> Result<ContentModelDocument, ConverterError>;

    /// Materialize `model` into `root`, replacing its content.
    ///
    /// May update rendering handles inside `model`. Returns the selection described by the
    /// model's selection markers, or `None` if none can be determined.
    fn model_to_dom(
        &mut self,
        root: &mut S,
        model: &mut ContentModelDocument,
        context: &ModelToDomContext,
        on_node_created: Option<&mut OnNodeCreated<'_>>,
    ) -> Result<Option<DomSelection>, ConverterError>;
}

/// What a snapshot should capture.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotRequest<'a> {
    /// Selection at capture time.
    pub selection: Option<&'a DomSelection>,
    /// Whether the next Backspace may undo back to this snapshot.
    pub can_undo_by_backspace: bool,
    /// Entity states to restore together with the snapshot.
    pub entity_states: &'a [EntityState],
}

/// Undo snapshot storage.
pub trait SnapshotManager<S> {
    /// Capture the current state of `surface`.
    fn add_snapshot(&mut self, surface: &S, request: SnapshotRequest<'_>);
}

/// Receiver of change and lifecycle notifications.
pub trait EventSink {
    /// Deliver `event`. `broadcast` asks the sink to forward it to every listener, including
    /// ones that only listen to their own changes.
    fn trigger(&mut self, event: &EditorEvent<'_>, broadcast: bool);

    /// Pass-through accessibility announcement.
    fn announce(&mut self, data: &AnnounceData) {
        let _ = data;
    }
}
