//! Commit pipeline: write a model back to the surface.

use crate::cache::{discard_mutations, update_cache};
use crate::config::PERSISTED_SELECTION_MARKER;
use crate::context::create_model_to_dom_context;
use crate::core::EditorCore;
use crate::dom_selection::set_dom_selection;
use crate::error::EditorError;
use crate::model::ModelHandle;
use crate::selection::DomSelection;
use crate::surface::{OnNodeCreated, Surface};
use std::rc::Rc;
use tracing::debug;

/// Options for [`set_content_model`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetContentModelOptions {
    /// Record the resulting selection without pushing it to the surface (does not take focus).
    pub ignore_selection: bool,
    /// Keep the selected region visibly highlighted across the structural rewrite.
    pub should_maintain_selection: bool,
}

/// Materialize `model` into the surface and return the resulting selection.
///
/// Outside shadow edit the model becomes the cached model and the selection is pushed to the
/// surface (or only recorded, with `ignore_selection`). During shadow edit the model is written
/// into the detached surface only; the cache and the live selection are left alone.
///
/// The converter call is the single write point: if it fails, the error is returned and nothing
/// of the cache has been touched.
pub fn set_content_model<S: Surface>(
    core: &mut EditorCore<S>,
    mut model: ModelHandle,
    options: Option<SetContentModelOptions>,
    on_node_created: Option<&mut OnNodeCreated<'_>>,
) -> Result<Option<DomSelection>, EditorError> {
    commit_model(core, &mut model, options, on_node_created)
}

/// [`set_content_model`] without giving up the caller's handle.
///
/// The cache ends up sharing `model`, so a uniquely owned handle is written in place.
pub(crate) fn commit_model<S: Surface>(
    core: &mut EditorCore<S>,
    model: &mut ModelHandle,
    options: Option<SetContentModelOptions>,
    on_node_created: Option<&mut OnNodeCreated<'_>>,
) -> Result<Option<DomSelection>, EditorError> {
    let options = options.unwrap_or_default();
    let is_shadow = core.is_in_shadow_edit();
    let mut context = create_model_to_dom_context(core, !is_shadow);

    if options.should_maintain_selection {
        context.maintain_selection = Some(core.environment.persisted_selection_mode());
        let rule = core.environment.persisted_selection_rule();
        core.surface
            .set_style_rule(PERSISTED_SELECTION_MARKER, Some(rule));
    } else {
        core.surface.set_style_rule(PERSISTED_SELECTION_MARKER, None);
    }

    let root = match core.state.lifecycle.shadow_surface.as_mut() {
        Some(shadow) => shadow,
        None => &mut core.surface,
    };
    let selection = core.converter.model_to_dom(
        root,
        Rc::make_mut(model),
        &context,
        on_node_created,
    )?;

    if is_shadow {
        debug!("committed model into shadow surface");
        core.state.selection.selection = selection.clone();
        return Ok(selection);
    }

    discard_mutations(core);
    update_cache(&mut core.state, Rc::clone(model), selection.as_ref());
    if options.ignore_selection {
        core.state.selection.selection = selection.clone();
    } else if selection.is_some() {
        set_dom_selection(core, selection.clone());
    } else {
        core.state.selection.selection = None;
    }
    debug!(
        ignore_selection = options.ignore_selection,
        has_selection = selection.is_some(),
        "committed model"
    );

    Ok(selection)
}
