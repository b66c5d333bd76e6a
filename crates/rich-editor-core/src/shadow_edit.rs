//! Shadow edit: an isolated preview mode over a detached copy of the surface.
//!
//! While shadow edit is on, speculative rendering (dark-mode preview, export transforms) runs
//! against the detached surface. Commits never reach the live surface or the committed cache,
//! and no undo snapshot is involved.
//!
//! ```text
//!        switch_shadow_edit(true)
//!   Off ───────────────────────────▶ On
//!    ▲                               │
//!    └───────────────────────────────┘
//!        switch_shadow_edit(false)
//! ```

use crate::cache::{discard_mutations, invalidate_cache, update_cache};
use crate::core::EditorCore;
use crate::create_model::{DerivedModel, derive_model};
use crate::dom_selection::get_dom_selection;
use crate::error::EditorError;
use crate::events::EditorEvent;
use crate::set_model::{SetContentModelOptions, set_content_model};
use crate::surface::Surface;
use std::rc::Rc;
use tracing::debug;

/// Turn shadow edit on or off. Requests for the current state are ignored.
pub fn switch_shadow_edit<S: Surface>(
    core: &mut EditorCore<S>,
    is_on: bool,
) -> Result<(), EditorError> {
    if is_on == core.is_in_shadow_edit() {
        return Ok(());
    }

    if is_on {
        enter_shadow_edit(core)
    } else {
        leave_shadow_edit(core)
    }
}

fn enter_shadow_edit<S: Surface>(core: &mut EditorCore<S>) -> Result<(), EditorError> {
    // A snapshot of current truth must exist before the surface goes away.
    let derived = if core.state.cache.model.is_none() {
        Some(derive_model(core, true, None, None)?)
    } else {
        None
    };
    let selection = get_dom_selection(core);

    let detached = core.surface.detach_children();
    let baseline = detached.clone_children();
    discard_mutations(core);

    core.events.trigger(
        &EditorEvent::EnteredShadowEdit {
            selection: selection.as_ref(),
        },
        false,
    );

    // Populated only after the notification: a listener may read selection-dependent state
    // that must still reflect the pre-entry cache.
    if let Some(DerivedModel {
        model,
        selection,
        cacheable: true,
    }) = derived
    {
        if core.state.cache.model.is_none() {
            update_cache(&mut core.state, model, selection.as_ref());
        }
    }

    core.state.lifecycle.shadow_surface = Some(detached);
    core.state.lifecycle.shadow_baseline = Some(baseline);
    debug!("entered shadow edit");
    Ok(())
}

fn leave_shadow_edit<S: Surface>(core: &mut EditorCore<S>) -> Result<(), EditorError> {
    // The detached surface holds the preview and is dropped here.
    core.state.lifecycle.shadow_surface = None;
    let baseline = core.state.lifecycle.shadow_baseline.take();
    core.events.trigger(&EditorEvent::LeavingShadowEdit, false);

    let Some(mut model) = core.state.cache.model.take() else {
        if let Some(baseline) = baseline {
            core.surface.restore_children(baseline);
        }
        debug!("left shadow edit, restored content from before the preview");
        return Ok(());
    };

    // Visiting the selections drops the rendering handles of selected blocks; those handles
    // point into the detached surface.
    Rc::make_mut(&mut model).iterate_selections(|_| {});
    let committed = set_content_model(
        core,
        model,
        Some(SetContentModelOptions {
            ignore_selection: true,
            ..Default::default()
        }),
        None,
    );

    if let Err(error) = committed {
        if let Some(baseline) = baseline {
            core.surface.restore_children(baseline);
        }
        invalidate_cache(&mut core.state);
        return Err(error);
    }

    debug!("left shadow edit");
    Ok(())
}
