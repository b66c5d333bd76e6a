//! Conversion contexts handed to the structural converters.

use crate::config::PersistedSelectionMode;
use crate::core::EditorCore;
use crate::model::SegmentFormat;
use crate::selection::DomSelection;
use crate::state::{DomIndexer, PendingFormat};
use crate::surface::Surface;

/// Caller options for surface→model conversion.
///
/// Supplying any options makes the acquisition bypass (and never populate) the model cache.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomToModelOptions {
    /// Do not record rendering handles in the produced model.
    pub disable_cache_element: bool,
    /// Recompute table cell sizes from the surface.
    pub recalculate_table_size: bool,
}

/// Context for [`ContentConverter::dom_to_model`](crate::ContentConverter::dom_to_model).
#[derive(Debug, Clone)]
pub struct DomToModelContext {
    /// Dark mode flag.
    pub is_dark_mode: bool,
    /// Editor default format.
    pub default_format: SegmentFormat,
    /// Pending format, forwarded only when one exists.
    pub pending_format: Option<PendingFormat>,
    /// Page zoom scale.
    pub zoom_scale: f64,
    /// Root layout direction is right to left.
    pub is_root_rtl: bool,
    /// Position index write-handle; present only when the result may be cached.
    pub dom_indexer: Option<DomIndexer>,
    /// Caller options.
    pub options: DomToModelOptions,
    /// Selection to bind into the model.
    pub selection: Option<DomSelection>,
}

/// Context for [`ContentConverter::model_to_dom`](crate::ContentConverter::model_to_dom).
#[derive(Debug, Clone)]
pub struct ModelToDomContext {
    /// Dark mode flag.
    pub is_dark_mode: bool,
    /// Editor default format.
    pub default_format: SegmentFormat,
    /// Page zoom scale.
    pub zoom_scale: f64,
    /// Root layout direction is right to left.
    pub is_root_rtl: bool,
    /// Position index write-handle; absent during shadow edit.
    pub dom_indexer: Option<DomIndexer>,
    /// When set, the converter marks the selected content so it stays visible.
    pub maintain_selection: Option<PersistedSelectionMode>,
}

fn indexer_for<S: Surface>(core: &EditorCore<S>, allow_indexing: bool) -> Option<DomIndexer> {
    (allow_indexing && !core.is_in_shadow_edit()).then(|| core.state.cache.dom_indexer.clone())
}

/// Build the surface→model context.
///
/// `allow_indexing = false` whenever the resulting model must not be eligible for caching.
pub fn create_dom_to_model_context<S: Surface>(
    core: &EditorCore<S>,
    allow_indexing: bool,
    options: Option<&DomToModelOptions>,
) -> DomToModelContext {
    DomToModelContext {
        is_dark_mode: core.state.lifecycle.is_dark_mode,
        default_format: core.state.format.default_format.clone(),
        pending_format: core.state.format.pending_format.clone(),
        zoom_scale: core.surface.zoom_scale(),
        is_root_rtl: core.surface.is_right_to_left(),
        dom_indexer: indexer_for(core, allow_indexing),
        options: options.cloned().unwrap_or_default(),
        selection: None,
    }
}

/// Build the model→surface context.
pub fn create_model_to_dom_context<S: Surface>(
    core: &EditorCore<S>,
    allow_indexing: bool,
) -> ModelToDomContext {
    ModelToDomContext {
        is_dark_mode: core.state.lifecycle.is_dark_mode,
        default_format: core.state.format.default_format.clone(),
        zoom_scale: core.surface.zoom_scale(),
        is_root_rtl: core.surface.is_right_to_left(),
        dom_indexer: indexer_for(core, allow_indexing),
        maintain_selection: None,
    }
}
