//! Change and lifecycle notifications.
//!
//! Every successful transaction emits exactly one [`EditorEvent::ContentChanged`]; shadow edit
//! emits [`EditorEvent::EnteredShadowEdit`] and [`EditorEvent::LeavingShadowEdit`].

use crate::model::{ContentModelDocument, ContentModelEntity};
use crate::selection::DomSelection;
use serde::{Deserialize, Serialize};

/// Where a content change came from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeSource {
    /// A formatting API.
    #[default]
    Format,
    /// Keyboard input.
    Keyboard,
    /// Paste.
    Paste,
    /// Drag and drop.
    Drop,
    /// Cut.
    Cut,
    /// Whole content replaced.
    SetContent,
    /// An entity was inserted.
    InsertEntity,
    /// Dark mode was switched on.
    SwitchToDarkMode,
    /// Dark mode was switched off.
    SwitchToLightMode,
    /// Host-defined source.
    Other(String),
}

/// The platform event that triggered a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    /// Platform event type (`"keydown"`, `"paste"`, ...).
    pub event_type: String,
    /// Key value for keyboard events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl RawEvent {
    /// Create a raw event without key information.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            key: None,
        }
    }
}

/// What happened to an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityOperation {
    /// Inserted.
    NewEntity,
    /// Overwritten by other content.
    Overwrite,
    /// Deleted from its start (Delete key before it).
    RemoveFromStart,
    /// Deleted from its end (Backspace after it).
    RemoveFromEnd,
    /// Temporary content replaced by its final form.
    ReplaceTemporaryContent,
}

/// An entity removed by a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletedEntity {
    /// The removed entity.
    pub entity: ContentModelEntity,
    /// Why it was removed.
    pub operation: EntityOperation,
}

/// Entity change record carried by [`ContentChangedEvent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedEntity {
    /// The entity.
    pub entity: ContentModelEntity,
    /// What happened to it.
    pub operation: EntityOperation,
    /// The event that caused the change.
    pub raw_event: Option<RawEvent>,
}

/// Host-owned state of an entity, stored with an undo snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityState {
    /// Entity type name.
    pub entity_type: String,
    /// Entity id.
    pub id: String,
    /// Opaque state.
    pub state: String,
}

/// Accessibility announcement requested by a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnounceData {
    /// Text to announce.
    pub text: String,
}

/// Payload of [`EditorEvent::ContentChanged`].
#[derive(Debug, Clone)]
pub struct ContentChangedEvent<'a> {
    /// The committed model, unless the transaction asked for the cache to be cleared.
    pub content_model: Option<&'a ContentModelDocument>,
    /// Selection after the commit.
    pub selection: Option<&'a DomSelection>,
    /// Effective change source.
    pub source: ChangeSource,
    /// Caller-supplied opaque data.
    pub data: Option<&'a serde_json::Value>,
    /// Name of the API that ran the transaction.
    pub api_name: Option<&'a str>,
    /// Entity change records.
    pub changed_entities: &'a [ChangedEntity],
}

/// A notification delivered to an [`EventSink`](crate::EventSink).
#[derive(Debug, Clone)]
pub enum EditorEvent<'a> {
    /// Content was committed to the surface.
    ContentChanged(ContentChangedEvent<'a>),
    /// Shadow edit was entered; the surface content now lives in a detached copy.
    EnteredShadowEdit {
        /// Selection at the moment of entry.
        selection: Option<&'a DomSelection>,
    },
    /// Shadow edit is about to end.
    LeavingShadowEdit,
}

impl EditorEvent<'_> {
    /// Short name of the event, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            EditorEvent::ContentChanged(_) => "contentChanged",
            EditorEvent::EnteredShadowEdit { .. } => "enteredShadowEdit",
            EditorEvent::LeavingShadowEdit => "leavingShadowEdit",
        }
    }
}
