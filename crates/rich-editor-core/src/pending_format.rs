//! Pending-format bookkeeping.

use crate::model::SegmentFormat;
use crate::selection::DomSelection;
use crate::state::{EditorState, PendingFormat};

/// How a transaction wants the pending format updated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingFormatUpdate {
    /// Keep the existing pending format, rebound to the new caret.
    Preserve,
    /// Replace the pending format.
    Format(SegmentFormat),
}

/// Update the pending format after a transaction.
///
/// Only a collapsed range keeps pending-format tracking; any other or absent selection drops it.
/// With a caret and no `update`, the current pending format is left as is.
pub fn handle_pending_format<F>(
    state: &mut EditorState<F>,
    update: Option<&PendingFormatUpdate>,
    selection: Option<&DomSelection>,
) {
    let Some(anchor) = selection.and_then(DomSelection::collapsed_position) else {
        state.format.pending_format = None;
        return;
    };

    let format = match update {
        Some(PendingFormatUpdate::Preserve) => state
            .format
            .pending_format
            .as_ref()
            .map(|pending| pending.format.clone()),
        Some(PendingFormatUpdate::Format(format)) => Some(format.clone()),
        None => return,
    };

    state.format.pending_format = format.map(|format| PendingFormat { format, anchor });
}
