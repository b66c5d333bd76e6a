//! The editor core: state plus the collaborators it drives.

use crate::config::{EditorEnvironment, EditorOptions};
use crate::state::EditorState;
use crate::surface::{ContentConverter, EventSink, SnapshotManager, Surface};

/// Everything a core operation needs.
///
/// Core operations are free functions taking `&mut EditorCore<S>`; fields are public so hosts and
/// tests can construct and inspect cores directly.
pub struct EditorCore<S: Surface> {
    /// Mutable editor state.
    pub state: EditorState<S>,
    /// The live editable surface.
    pub surface: S,
    /// Structural converters.
    pub converter: Box<dyn ContentConverter<S>>,
    /// Undo snapshot storage.
    pub snapshots: Box<dyn SnapshotManager<S>>,
    /// Notification sink.
    pub events: Box<dyn EventSink>,
    /// Platform facts resolved at construction.
    pub environment: EditorEnvironment,
}

impl<S: Surface> EditorCore<S> {
    /// Create a core with an empty cache.
    ///
    /// Surface capabilities are probed here, once.
    pub fn new(
        surface: S,
        converter: Box<dyn ContentConverter<S>>,
        snapshots: Box<dyn SnapshotManager<S>>,
        events: Box<dyn EventSink>,
        options: &EditorOptions,
    ) -> Self {
        let environment = EditorEnvironment::new(options, surface.capabilities());
        Self {
            state: EditorState::new(
                options.default_segment_format.clone(),
                options.in_dark_mode,
            ),
            surface,
            converter,
            snapshots,
            events,
            environment,
        }
    }

    /// Whether shadow edit is active.
    pub fn is_in_shadow_edit(&self) -> bool {
        self.state.is_in_shadow_edit()
    }

    /// The surface conversions currently read from and write to: the detached copy while shadow
    /// edit is active, the live surface otherwise.
    pub fn content_root(&self) -> &S {
        self.state
            .lifecycle
            .shadow_surface
            .as_ref()
            .unwrap_or(&self.surface)
    }
}
