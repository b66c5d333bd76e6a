//! The editor facade.
//!
//! [`Editor`] owns an [`EditorCore`] and exposes the operations a host calls. Everything here is
//! a thin wrapper over the free functions of the core modules, plus the few lifecycle operations
//! that only make sense on a whole editor (dark mode, explicit snapshots, model copies).

use crate::cache::{invalidate_cache, on_selection_changed};
use crate::config::EditorOptions;
use crate::core::EditorCore;
use crate::create_model::create_content_model;
use crate::dom_selection::{get_dom_selection, set_dom_selection};
use crate::error::EditorError;
use crate::events::{ChangeSource, ContentChangedEvent, EditorEvent};
use crate::format_content_model::{
    FormatContentModelContext, FormatContentModelOptions, format_content_model,
    try_format_content_model,
};
use crate::model::{ContentModelDocument, ModelHandle};
use crate::selection::{DomSelection, SelectionOverride};
use crate::shadow_edit::switch_shadow_edit;
use crate::state::PendingFormat;
use crate::surface::{ContentConverter, EventSink, SnapshotManager, SnapshotRequest, Surface};
use std::rc::Rc;
use tracing::debug;

/// How [`Editor::get_content_model_copy`] produces its model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentModelCopyMode {
    /// The shared cached model (rendering handles included). Populates the cache on a miss.
    Connected,
    /// A deep copy without rendering handles.
    Disconnected,
    /// A fresh conversion with no selection bound. Never cached.
    Clean,
}

/// Capture an undo snapshot outside a transaction.
///
/// Ignored during shadow edit.
pub fn take_snapshot<S: Surface>(core: &mut EditorCore<S>, can_undo_by_backspace: bool) {
    if core.is_in_shadow_edit() {
        return;
    }

    let selection = get_dom_selection(core);
    core.snapshots.add_snapshot(
        &core.surface,
        SnapshotRequest {
            selection: selection.as_ref(),
            can_undo_by_backspace,
            entity_states: &[],
        },
    );
    core.state.undo.has_new_content = false;
    debug!("snapshot taken");
}

/// Switch dark mode on or off.
///
/// Colors in the cached model were derived under the previous mode, so the cache is dropped and
/// a content change is reported. Requests for the current mode are ignored.
pub fn set_dark_mode_state<S: Surface>(core: &mut EditorCore<S>, is_dark_mode: bool) {
    if core.state.lifecycle.is_dark_mode == is_dark_mode {
        return;
    }

    core.state.lifecycle.is_dark_mode = is_dark_mode;
    if !core.is_in_shadow_edit() {
        invalidate_cache(&mut core.state);
    }

    let source = if is_dark_mode {
        ChangeSource::SwitchToDarkMode
    } else {
        ChangeSource::SwitchToLightMode
    };
    debug!(?source, "color mode switched");
    core.events.trigger(
        &EditorEvent::ContentChanged(ContentChangedEvent {
            content_model: None,
            selection: None,
            source,
            data: None,
            api_name: None,
            changed_entities: &[],
        }),
        true,
    );
}

/// A rich-text editor over a surface of type `S`.
pub struct Editor<S: Surface> {
    core: EditorCore<S>,
}

impl<S: Surface> Editor<S> {
    /// Create an editor.
    pub fn new(
        surface: S,
        converter: Box<dyn ContentConverter<S>>,
        snapshots: Box<dyn SnapshotManager<S>>,
        events: Box<dyn EventSink>,
        options: &EditorOptions,
    ) -> Self {
        Self {
            core: EditorCore::new(surface, converter, snapshots, events, options),
        }
    }

    /// The underlying core.
    pub fn core(&self) -> &EditorCore<S> {
        &self.core
    }

    /// Mutable access to the underlying core.
    pub fn core_mut(&mut self) -> &mut EditorCore<S> {
        &mut self.core
    }

    /// The live surface.
    pub fn surface(&self) -> &S {
        &self.core.surface
    }

    /// Mutable access to the live surface (host input, focus changes).
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.core.surface
    }

    /// Run a transaction. See [`format_content_model`].
    pub fn format_content_model<F>(
        &mut self,
        mutate: F,
        options: Option<FormatContentModelOptions<'_>>,
    ) -> Result<(), EditorError>
    where
        F: FnOnce(&mut ContentModelDocument, &mut FormatContentModelContext<'_, S>) -> bool,
    {
        format_content_model(&mut self.core, mutate, options)
    }

    /// Run a transaction with a fallible mutator. See [`try_format_content_model`].
    pub fn try_format_content_model<E, F>(
        &mut self,
        mutate: F,
        options: Option<FormatContentModelOptions<'_>>,
    ) -> Result<(), E>
    where
        E: From<EditorError>,
        F: FnOnce(&mut ContentModelDocument, &mut FormatContentModelContext<'_, S>) -> Result<bool, E>,
    {
        try_format_content_model(&mut self.core, mutate, options)
    }

    /// Get a model of the current content.
    pub fn get_content_model_copy(
        &mut self,
        mode: ContentModelCopyMode,
    ) -> Result<ModelHandle, EditorError> {
        match mode {
            ContentModelCopyMode::Connected => create_content_model(&mut self.core, None, None),
            ContentModelCopyMode::Disconnected => {
                let model = create_content_model(&mut self.core, None, None)?;
                Ok(Rc::new(model.clone_disconnected()))
            }
            ContentModelCopyMode::Clean => {
                create_content_model(&mut self.core, None, Some(&SelectionOverride::None))
            }
        }
    }

    /// The current selection. See [`get_dom_selection`].
    pub fn get_dom_selection(&self) -> Option<DomSelection> {
        get_dom_selection(&self.core)
    }

    /// Push a selection to the surface. See [`set_dom_selection`].
    pub fn set_dom_selection(&mut self, selection: Option<DomSelection>) {
        set_dom_selection(&mut self.core, selection);
    }

    /// Whether shadow edit is active.
    pub fn is_in_shadow_edit(&self) -> bool {
        self.core.is_in_shadow_edit()
    }

    /// Enter shadow edit.
    pub fn start_shadow_edit(&mut self) -> Result<(), EditorError> {
        switch_shadow_edit(&mut self.core, true)
    }

    /// Leave shadow edit, restoring the committed content.
    pub fn stop_shadow_edit(&mut self) -> Result<(), EditorError> {
        switch_shadow_edit(&mut self.core, false)
    }

    /// Whether dark mode is on.
    pub fn is_dark_mode(&self) -> bool {
        self.core.state.lifecycle.is_dark_mode
    }

    /// Switch dark mode. See [`set_dark_mode_state`].
    pub fn set_dark_mode_state(&mut self, is_dark_mode: bool) {
        set_dark_mode_state(&mut self.core, is_dark_mode);
    }

    /// The format the next typed character gets, if one is pending.
    pub fn pending_format(&self) -> Option<&PendingFormat> {
        self.core.state.format.pending_format.as_ref()
    }

    /// Capture an undo snapshot now.
    pub fn take_snapshot(&mut self, can_undo_by_backspace: bool) {
        take_snapshot(&mut self.core, can_undo_by_backspace);
    }

    /// Tell the editor the platform selection changed.
    pub fn notify_selection_changed(&mut self) {
        on_selection_changed(&mut self.core);
    }
}
