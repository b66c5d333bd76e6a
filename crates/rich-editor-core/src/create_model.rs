//! Model acquisition: reuse the cached model or derive a fresh one from the surface.

use crate::cache::{flush_mutations, update_cache};
use crate::context::{DomToModelOptions, create_dom_to_model_context};
use crate::core::EditorCore;
use crate::dom_selection::get_dom_selection;
use crate::error::EditorError;
use crate::model::ModelHandle;
use crate::selection::{DomSelection, SelectionOverride};
use crate::surface::Surface;
use std::rc::Rc;
use tracing::debug;

/// Produce a Content Model.
///
/// The cache is used only for the default request (no `options`, no `selection_override`).
/// During shadow edit a cache hit returns a deep clone, so preview edits cannot reach the shared
/// cached model. Only a default request that received the position index populates the cache.
pub fn create_content_model<S: Surface>(
    core: &mut EditorCore<S>,
    options: Option<&DomToModelOptions>,
    selection_override: Option<&SelectionOverride>,
) -> Result<ModelHandle, EditorError> {
    flush_mutations(core);

    let is_default_request = options.is_none() && selection_override.is_none();
    if is_default_request {
        if let Some(cached) = &core.state.cache.model {
            return Ok(if core.is_in_shadow_edit() {
                debug!("model cache hit (shadow clone)");
                Rc::new(cached.as_ref().clone())
            } else {
                debug!("model cache hit");
                Rc::clone(cached)
            });
        }
    }

    let derived = derive_model(core, is_default_request, options, selection_override)?;
    if derived.cacheable {
        update_cache(
            &mut core.state,
            Rc::clone(&derived.model),
            derived.selection.as_ref(),
        );
    }
    Ok(derived.model)
}

/// A model converted from the surface.
pub(crate) struct DerivedModel {
    pub model: ModelHandle,
    /// Selection bound into `model`.
    pub selection: Option<DomSelection>,
    /// The converter was allowed to index, so the result may be cached.
    pub cacheable: bool,
}

/// Run the surface→model converter without touching the cache.
pub(crate) fn derive_model<S: Surface>(
    core: &mut EditorCore<S>,
    allow_indexing: bool,
    options: Option<&DomToModelOptions>,
    selection_override: Option<&SelectionOverride>,
) -> Result<DerivedModel, EditorError> {
    let selection = match selection_override {
        Some(SelectionOverride::None) => None,
        Some(SelectionOverride::Selection(selection)) => Some(selection.clone()),
        None => get_dom_selection(core),
    };

    let mut context = create_dom_to_model_context(core, allow_indexing, options);
    context.selection = selection;
    let cacheable = context.dom_indexer.is_some();

    debug!(
        cacheable,
        has_selection = context.selection.is_some(),
        "model cache miss, converting surface"
    );
    let root = core
        .state
        .lifecycle
        .shadow_surface
        .as_ref()
        .unwrap_or(&core.surface);
    let model = core.converter.dom_to_model(root, &mut context)?;

    Ok(DerivedModel {
        model: Rc::new(model),
        selection: context.selection,
        cacheable,
    })
}
