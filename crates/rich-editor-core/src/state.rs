//! Editor State
//!
//! The mutable state container owned by one editor for its whole lifetime.
//!
//! # Overview
//!
//! [`EditorState`] is pure data. Every operation of the core is a free function that takes the
//! [`EditorCore`](crate::EditorCore) (which owns this state next to the collaborators) by
//! reference, so tests can build and inspect states directly.
//!
//! - **Cache**: the last known-good model and its frozen selection, plus the position index
//! - **Selection**: the last recorded selection, used while the surface cannot be trusted
//! - **Lifecycle**: the detached surface while shadow edit is active, dark mode
//! - **Undo**: nesting depth marker and pending-content bookkeeping
//! - **Format**: pending format and the editor's default format

use crate::model::{ModelHandle, SegmentFormat, SegmentLocation};
use crate::selection::{CachedSelection, DomPosition, DomSelection, NodeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Position index shared between the editor and the converters.
///
/// Cloning yields another handle to the same index. The converter receives a handle only when it
/// is allowed to write (see [`create_dom_to_model_context`](crate::create_dom_to_model_context)).
#[derive(Debug, Clone, Default)]
pub struct DomIndexer {
    entries: Rc<RefCell<HashMap<NodeId, SegmentLocation>>>,
}

impl DomIndexer {
    /// Record that `node` renders the segment at `location`.
    pub fn index_node(&self, node: NodeId, location: SegmentLocation) {
        self.entries.borrow_mut().insert(node, location);
    }

    /// Forget every entry.
    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    /// Number of indexed nodes.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Returns `true` if nothing is indexed.
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Returns `true` if both handles share the same index.
    pub fn same_index(&self, other: &DomIndexer) -> bool {
        Rc::ptr_eq(&self.entries, &other.entries)
    }
}

/// Cached derived data.
#[derive(Debug, Clone, Default)]
pub struct CacheState {
    /// Last known-good model.
    pub model: Option<ModelHandle>,
    /// Selection belonging to `model`, in frozen form.
    pub selection: Option<CachedSelection>,
    /// Position index written by converters.
    pub dom_indexer: DomIndexer,
}

/// Last recorded selection.
#[derive(Debug, Clone, Default)]
pub struct SelectionState {
    /// Selection recorded by the last commit or `set_dom_selection`.
    ///
    /// Authoritative for table/image selections and whenever the surface has no focus.
    pub selection: Option<DomSelection>,
}

/// Lifecycle state. `F` is the detached surface type.
#[derive(Debug, Clone)]
pub struct LifecycleState<F> {
    /// The detached surface; present exactly while shadow edit is active.
    pub shadow_surface: Option<F>,
    /// Copy of the children as they were when shadow edit started. Shadow commits write into
    /// `shadow_surface`, never into this copy.
    pub shadow_baseline: Option<F>,
    /// Whether the editor renders in dark mode.
    pub is_dark_mode: bool,
}

/// Undo bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UndoState {
    /// A transaction is running; inner transactions must not capture snapshots.
    pub is_nested: bool,
    /// Content changed since the last snapshot.
    pub has_new_content: bool,
    /// Caret position right after a change that Backspace may undo.
    pub backspace_undo_point: Option<DomPosition>,
}

/// A format waiting for the next typed character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFormat {
    /// The format to apply.
    pub format: SegmentFormat,
    /// Caret the format is bound to.
    pub anchor: DomPosition,
}

/// Format state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatState {
    /// Pending format, if any.
    pub pending_format: Option<PendingFormat>,
    /// Editor-wide default format.
    pub default_format: SegmentFormat,
}

/// The editor state container.
#[derive(Debug, Clone)]
pub struct EditorState<F> {
    /// Model cache.
    pub cache: CacheState,
    /// Recorded selection.
    pub selection: SelectionState,
    /// Shadow edit and dark mode.
    pub lifecycle: LifecycleState<F>,
    /// Undo bookkeeping.
    pub undo: UndoState,
    /// Pending and default format.
    pub format: FormatState,
}

impl<F> EditorState<F> {
    /// Create an empty state.
    pub fn new(default_format: SegmentFormat, is_dark_mode: bool) -> Self {
        Self {
            cache: CacheState::default(),
            selection: SelectionState::default(),
            lifecycle: LifecycleState {
                shadow_surface: None,
                shadow_baseline: None,
                is_dark_mode,
            },
            undo: UndoState::default(),
            format: FormatState {
                pending_format: None,
                default_format,
            },
        }
    }

    /// Whether shadow edit is active.
    pub fn is_in_shadow_edit(&self) -> bool {
        self.lifecycle.shadow_surface.is_some()
    }
}
