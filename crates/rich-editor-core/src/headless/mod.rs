//! In-memory implementations of the collaborator traits.
//!
//! Used by the tests, benches and demos; also a reference for hosts writing their own surface.
//!
//! ```
//! use rich_editor_core::EditorOptions;
//! use rich_editor_core::headless::{HeadlessSurface, headless_editor};
//!
//! let surface = HeadlessSurface::from_paragraphs(["Hello"]);
//! let (mut editor, logs) = headless_editor(surface, &EditorOptions::default());
//!
//! editor
//!     .format_content_model(
//!         |model, _| {
//!             model.add_block(rich_editor_core::ContentModelBlock::Paragraph(
//!                 rich_editor_core::ContentModelParagraph::from_text("World"),
//!             ));
//!             true
//!         },
//!         None,
//!     )
//!     .unwrap();
//!
//! assert_eq!(editor.surface().to_html(), "<p>Hello</p><p>World</p>");
//! assert_eq!(logs.snapshots.len(), 1);
//! ```

mod converter;
mod recorders;
mod surface;

pub use converter::HeadlessConverter;
pub use recorders::{
    ConversionLog, ConversionStats, EventLog, RecordedEvent, SnapshotLog, SnapshotRecord,
};
pub use surface::{
    HeadlessSurface, NodeIdAllocator, NodeLocation, SurfaceBlock, SurfaceCell, SurfaceInline,
};

use crate::config::EditorOptions;
use crate::editor::Editor;

/// Handles to the recorders wired into a headless editor.
#[derive(Debug, Clone, Default)]
pub struct HeadlessLogs {
    /// Converter calls.
    pub conversions: ConversionLog,
    /// Undo snapshots.
    pub snapshots: SnapshotLog,
    /// Notifications.
    pub events: EventLog,
}

/// Build an editor over `surface` with recording collaborators.
pub fn headless_editor(
    surface: HeadlessSurface,
    options: &EditorOptions,
) -> (Editor<HeadlessSurface>, HeadlessLogs) {
    let logs = HeadlessLogs::default();
    let editor = Editor::new(
        surface,
        Box::new(HeadlessConverter::new(logs.conversions.clone())),
        Box::new(logs.snapshots.clone()),
        Box::new(logs.events.clone()),
        options,
    );
    (editor, logs)
}
