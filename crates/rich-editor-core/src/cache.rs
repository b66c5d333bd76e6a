//! Model cache coherence.
//!
//! The cached model may stand in for "derive fresh from the surface" only while:
//!
//! 1. it was produced (or last updated) by the most recent successful commit or cache-eligible
//!    acquisition,
//! 2. no external mutation of the surface happened since, and
//! 3. shadow edit has not toggled since.
//!
//! Every path that can break one of these conditions goes through [`invalidate_cache`].

use crate::core::EditorCore;
use crate::dom_selection::get_dom_selection;
use crate::model::ModelHandle;
use crate::selection::{CachedSelection, DomSelection};
use crate::state::EditorState;
use crate::surface::{Surface, SurfaceMutation};
use tracing::{debug, trace};

/// Store `model` and its selection as the new known-good state.
pub fn update_cache<F>(
    state: &mut EditorState<F>,
    model: ModelHandle,
    selection: Option<&DomSelection>,
) {
    state.cache.model = Some(model);
    update_cached_selection(state, selection);
}

/// Replace only the cached selection.
pub fn update_cached_selection<F>(state: &mut EditorState<F>, selection: Option<&DomSelection>) {
    state.cache.selection = selection.map(CachedSelection::from);
}

/// Drop the cached model, its selection and the position index.
pub fn invalidate_cache<F>(state: &mut EditorState<F>) {
    if state.cache.model.is_some() {
        debug!("model cache invalidated");
    }
    state.cache.model = None;
    state.cache.selection = None;
    state.cache.dom_indexer.clear();
}

/// Apply mutation records to the cache. Returns `true` if the cache was invalidated.
pub fn handle_mutations<F>(state: &mut EditorState<F>, mutations: &[SurfaceMutation]) -> bool {
    let stale = mutations.iter().any(|mutation| match mutation {
        SurfaceMutation::ChildList | SurfaceMutation::CharacterData => true,
        SurfaceMutation::ElementId(node) => state
            .cache
            .selection
            .as_ref()
            .is_some_and(|selection| selection.references(*node)),
        SurfaceMutation::Attribute(_) => false,
    });

    if stale {
        invalidate_cache(state);
    }
    stale
}

/// Flush pending surface mutations into the invalidation path.
///
/// While shadow edit is active the live surface is a placeholder; its records are dropped
/// without touching the committed cache.
pub fn flush_mutations<S: Surface>(core: &mut EditorCore<S>) {
    let mutations = core.surface.flush_mutations();
    if mutations.is_empty() {
        return;
    }
    trace!(count = mutations.len(), "flushed surface mutations");
    if !core.is_in_shadow_edit() {
        handle_mutations(&mut core.state, &mutations);
    }
}

/// Drop pending mutation records caused by the core's own writes.
pub(crate) fn discard_mutations<S: Surface>(core: &mut EditorCore<S>) {
    let discarded = core.surface.flush_mutations();
    if !discarded.is_empty() {
        trace!(count = discarded.len(), "discarded self-caused mutations");
    }
}

/// React to a platform selection change.
///
/// The cached model carries selection markers, so a different selection makes it stale.
pub fn on_selection_changed<S: Surface>(core: &mut EditorCore<S>) {
    if core.is_in_shadow_edit() || !core.surface.has_focus() {
        return;
    }
    let selection = get_dom_selection(core);
    selection_changed(&mut core.state, selection.as_ref());
}

pub(crate) fn selection_changed<F>(state: &mut EditorState<F>, selection: Option<&DomSelection>) {
    let unchanged = match (&state.cache.selection, selection) {
        (Some(cached), Some(selection)) => cached.matches(selection),
        (None, None) => true,
        _ => false,
    };
    if unchanged {
        return;
    }

    if state.cache.model.is_some() {
        invalidate_cache(state);
    } else {
        update_cached_selection(state, selection);
    }
}
