//! Recording collaborators.
//!
//! Each recorder is a cheap handle around shared storage: keep one clone, give the other to the
//! editor, and inspect what happened afterwards.

use super::surface::HeadlessSurface;
use crate::config::PersistedSelectionMode;
use crate::context::{DomToModelContext, ModelToDomContext};
use crate::events::{AnnounceData, ChangeSource, ChangedEntity, EditorEvent, EntityState};
use crate::selection::DomSelection;
use crate::surface::{EventSink, SnapshotManager, SnapshotRequest};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::debug;

/// What the converter has been asked to do so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversionStats {
    /// Number of surface→model conversions.
    pub dom_to_model_calls: usize,
    /// Number of model→surface conversions (failed ones included).
    pub model_to_dom_calls: usize,
    /// Selection bound by the last surface→model conversion.
    pub last_bound_selection: Option<DomSelection>,
    /// Whether the last surface→model conversion was allowed to index.
    pub last_indexing_allowed: Option<bool>,
    /// Persisted-selection mode of the last model→surface conversion.
    pub last_maintain_selection: Option<PersistedSelectionMode>,
    /// Dark mode flag of the last conversion in either direction.
    pub last_dark_mode: Option<bool>,
}

/// Shared record of converter calls, with failure injection.
#[derive(Debug, Clone, Default)]
pub struct ConversionLog {
    stats: Rc<RefCell<ConversionStats>>,
    fail_next_write: Rc<Cell<bool>>,
}

impl ConversionLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of the current statistics.
    pub fn stats(&self) -> ConversionStats {
        self.stats.borrow().clone()
    }

    /// Number of surface→model conversions.
    pub fn dom_to_model_calls(&self) -> usize {
        self.stats.borrow().dom_to_model_calls
    }

    /// Number of model→surface conversions.
    pub fn model_to_dom_calls(&self) -> usize {
        self.stats.borrow().model_to_dom_calls
    }

    /// Make the next model→surface conversion fail without touching the surface.
    pub fn fail_next_write(&self) {
        self.fail_next_write.set(true);
    }

    pub(crate) fn record_read(&self, context: &DomToModelContext) {
        let mut stats = self.stats.borrow_mut();
        stats.dom_to_model_calls += 1;
        stats.last_bound_selection = context.selection.clone();
        stats.last_indexing_allowed = Some(context.dom_indexer.is_some());
        stats.last_dark_mode = Some(context.is_dark_mode);
    }

    /// Returns `true` if this write must fail.
    pub(crate) fn record_write(&self, context: &ModelToDomContext) -> bool {
        let mut stats = self.stats.borrow_mut();
        stats.model_to_dom_calls += 1;
        stats.last_maintain_selection = context.maintain_selection;
        stats.last_dark_mode = Some(context.is_dark_mode);
        self.fail_next_write.replace(false)
    }
}

/// One captured undo snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotRecord {
    /// Surface content at capture time.
    pub html: String,
    /// Selection at capture time.
    pub selection: Option<DomSelection>,
    /// Whether Backspace may undo to this snapshot.
    pub can_undo_by_backspace: bool,
    /// Entity states captured with the snapshot.
    pub entity_states: Vec<EntityState>,
}

/// [`SnapshotManager`] that keeps every snapshot in memory.
#[derive(Debug, Clone, Default)]
pub struct SnapshotLog {
    records: Rc<RefCell<Vec<SnapshotRecord>>>,
}

impl SnapshotLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of snapshots taken.
    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    /// Returns `true` if no snapshot was taken.
    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }

    /// All snapshots, oldest first.
    pub fn records(&self) -> Vec<SnapshotRecord> {
        self.records.borrow().clone()
    }
}

impl SnapshotManager<HeadlessSurface> for SnapshotLog {
    fn add_snapshot(&mut self, surface: &HeadlessSurface, request: SnapshotRequest<'_>) {
        self.records.borrow_mut().push(SnapshotRecord {
            html: surface.to_html(),
            selection: request.selection.cloned(),
            can_undo_by_backspace: request.can_undo_by_backspace,
            entity_states: request.entity_states.to_vec(),
        });
    }
}

/// An event as delivered to an [`EventLog`], detached from the borrowed payload.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    /// Event name (see [`EditorEvent::name`]).
    pub name: &'static str,
    /// Whether the event was broadcast.
    pub broadcast: bool,
    /// Change source of a content change.
    pub source: Option<ChangeSource>,
    /// API name of a content change.
    pub api_name: Option<String>,
    /// Plain text of the model carried by a content change, if it carried one.
    pub model_text: Option<String>,
    /// Selection carried by the event.
    pub selection: Option<DomSelection>,
    /// Opaque change data.
    pub data: Option<serde_json::Value>,
    /// Entity change records.
    pub changed_entities: Vec<ChangedEntity>,
}

impl RecordedEvent {
    fn from_event(event: &EditorEvent<'_>, broadcast: bool) -> Self {
        let mut recorded = Self {
            name: event.name(),
            broadcast,
            source: None,
            api_name: None,
            model_text: None,
            selection: None,
            data: None,
            changed_entities: Vec::new(),
        };
        match event {
            EditorEvent::ContentChanged(change) => {
                recorded.source = Some(change.source.clone());
                recorded.api_name = change.api_name.map(str::to_string);
                recorded.model_text = change.content_model.map(|model| model.plain_text());
                recorded.selection = change.selection.cloned();
                recorded.data = change.data.cloned();
                recorded.changed_entities = change.changed_entities.to_vec();
            }
            EditorEvent::EnteredShadowEdit { selection } => {
                recorded.selection = selection.cloned();
            }
            EditorEvent::LeavingShadowEdit => {}
        }
        recorded
    }
}

/// [`EventSink`] that keeps every event and announcement in memory.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Rc<RefCell<Vec<RecordedEvent>>>,
    announcements: Rc<RefCell<Vec<String>>>,
}

impl EventLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// All events, oldest first.
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.borrow().clone()
    }

    /// Names of all events, oldest first.
    pub fn names(&self) -> Vec<&'static str> {
        self.events.borrow().iter().map(|event| event.name).collect()
    }

    /// Only the content-changed events.
    pub fn content_changes(&self) -> Vec<RecordedEvent> {
        self.events
            .borrow()
            .iter()
            .filter(|event| event.name == "contentChanged")
            .cloned()
            .collect()
    }

    /// Announced texts.
    pub fn announcements(&self) -> Vec<String> {
        self.announcements.borrow().clone()
    }
}

impl EventSink for EventLog {
    fn trigger(&mut self, event: &EditorEvent<'_>, broadcast: bool) {
        debug!(event = event.name(), broadcast, "event");
        self.events
            .borrow_mut()
            .push(RecordedEvent::from_event(event, broadcast));
    }

    fn announce(&mut self, data: &AnnounceData) {
        self.announcements.borrow_mut().push(data.text.clone());
    }
}
