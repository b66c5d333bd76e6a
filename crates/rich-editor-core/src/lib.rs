#![warn(missing_docs)]
//! Rich Editor Core - Headless Synchronization Core for Content Model Editors
//!
//! # Overview
//!
//! `rich-editor-core` keeps a structured, serializable document (the Content Model) in sync with
//! a live editable surface. It does not parse or render anything itself: the structural
//! converters, the surface, undo storage and notification delivery are collaborators behind
//! traits. What it owns is the transactional cycle around them.
//!
//! # Core Features
//!
//! - **Model Cache**: the last committed model is reused until the surface changes under it
//! - **Commit Pipeline**: write a model back, restore or record the selection, refresh the cache
//! - **Format Transactions**: acquire, mutate, snapshot, commit and notify as one unit, with nesting
//! - **Shadow Edit**: preview edits against a detached copy of the surface
//! - **Pending Format**: format for the next typed character at a remembered caret
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Editor facade                              │  ← Public API
//! ├─────────────────────────────────────────────┤
//! │  Format transactions · Shadow edit          │  ← Orchestration
//! ├─────────────────────────────────────────────┤
//! │  Model acquisition · Commit pipeline        │  ← Read / write
//! ├─────────────────────────────────────────────┤
//! │  Cache coherence · Selection · Context      │  ← Bookkeeping
//! ├─────────────────────────────────────────────┤
//! │  EditorState · Content Model                │  ← Data
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use rich_editor_core::headless::{HeadlessSurface, headless_editor};
//! use rich_editor_core::{ContentModelCopyMode, EditorOptions};
//! use std::rc::Rc;
//!
//! let (mut editor, logs) =
//!     headless_editor(HeadlessSurface::from_paragraphs(["a", "b"]), &EditorOptions::default());
//!
//! let first = editor.get_content_model_copy(ContentModelCopyMode::Connected).unwrap();
//! let second = editor.get_content_model_copy(ContentModelCopyMode::Connected).unwrap();
//!
//! // Nothing changed in between: the cached model is reused.
//! assert!(Rc::ptr_eq(&first, &second));
//! assert_eq!(logs.conversions.dom_to_model_calls(), 1);
//! ```
//!
//! # Module Description
//!
//! - [`state`] - Editor state container
//! - [`model`] - Content Model
//! - [`selection`] - Live and cached selection shapes
//! - [`surface`] - Collaborator traits
//! - [`format_content_model`] - Format transactions
//! - [`shadow_edit`] - Shadow edit state machine
//! - [`headless`] - In-memory collaborators

pub mod cache;
pub mod config;
pub mod context;
mod core;
pub mod create_model;
pub mod dom_selection;
pub mod editor;
pub mod error;
pub mod events;
pub mod format_content_model;
pub mod headless;
pub mod model;
pub mod pending_format;
pub mod selection;
pub mod set_model;
pub mod shadow_edit;
pub mod state;
pub mod surface;

pub use cache::{
    flush_mutations, handle_mutations, invalidate_cache, on_selection_changed, update_cache,
    update_cached_selection,
};
pub use config::{EditorEnvironment, EditorOptions, PERSISTED_SELECTION_MARKER, PersistedSelectionMode};
pub use context::{
    DomToModelContext, DomToModelOptions, ModelToDomContext, create_dom_to_model_context,
    create_model_to_dom_context,
};
pub use crate::core::EditorCore;
pub use create_model::create_content_model;
pub use dom_selection::{get_dom_selection, set_dom_selection};
pub use editor::{ContentModelCopyMode, Editor, set_dark_mode_state, take_snapshot};
pub use error::{ConverterError, EditorError};
pub use events::{
    AnnounceData, ChangeSource, ChangedEntity, ContentChangedEvent, DeletedEntity, EditorEvent,
    EntityOperation, EntityState, RawEvent,
};
pub use format_content_model::{
    FormatContentModelContext, FormatContentModelOptions, format_content_model,
    try_format_content_model,
};
pub use model::{
    ContentModelBlock, ContentModelDivider, ContentModelDocument, ContentModelEntity,
    ContentModelImage, ContentModelParagraph, ContentModelSegment, ContentModelTable,
    ContentModelTableCell, ContentModelTableRow, ContentModelText, ImageFormat, ModelHandle,
    SegmentFormat, SegmentLocation,
};
pub use pending_format::{PendingFormatUpdate, handle_pending_format};
pub use selection::{
    CachedSelection, DomPosition, DomRange, DomSelection, NodeId, PlatformSelection,
    SelectionOverride,
};
pub use set_model::{SetContentModelOptions, set_content_model};
pub use shadow_edit::switch_shadow_edit;
pub use state::{
    CacheState, DomIndexer, EditorState, FormatState, LifecycleState, PendingFormat,
    SelectionState, UndoState,
};
pub use surface::{
    ContentConverter, EventSink, ModelElement, OnNodeCreated, SnapshotManager, SnapshotRequest,
    Surface, SurfaceCapabilities, SurfaceMutation,
};
