//! Reading and writing the authoritative selection.

use crate::cache::selection_changed;
use crate::core::EditorCore;
use crate::selection::DomSelection;
use crate::surface::Surface;
use tracing::warn;

/// The authoritative current selection.
///
/// - `None` while shadow edit is active: a selection means nothing against a detached surface.
/// - The recorded selection when it is a table/image selection (re-deriving those from a
///   primitive range loses information) or when the surface has no focus.
/// - Otherwise a fresh platform query, accepted only if it lies inside the surface.
pub fn get_dom_selection<S: Surface>(core: &EditorCore<S>) -> Option<DomSelection> {
    if core.is_in_shadow_edit() {
        return None;
    }

    match &core.state.selection.selection {
        Some(recorded) if recorded.is_extended() || !core.surface.has_focus() => {
            Some(recorded.clone())
        }
        _ => query_platform_selection(&core.surface),
    }
}

fn query_platform_selection<S: Surface>(surface: &S) -> Option<DomSelection> {
    let platform = surface.platform_selection()?;
    if !surface.contains(platform.common_ancestor) || !surface.contains(platform.anchor.node) {
        warn!(
            anchor = ?platform.anchor.node,
            "ignoring platform selection outside the editor"
        );
        return None;
    }

    Some(DomSelection::Range {
        range: platform.range,
        is_reverted: platform.focus != platform.range.end,
    })
}

/// Record `selection` and push it to the surface.
///
/// A selection different from the cached one invalidates the cached model, since its selection
/// markers no longer match.
pub fn set_dom_selection<S: Surface>(core: &mut EditorCore<S>, selection: Option<DomSelection>) {
    if core.is_in_shadow_edit() {
        core.state.selection.selection = selection;
        return;
    }

    if let Some(selection) = &selection {
        core.surface.select(selection);
    }
    selection_changed(&mut core.state, selection.as_ref());
    core.state.selection.selection = selection;
}
