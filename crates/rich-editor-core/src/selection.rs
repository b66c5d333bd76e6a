//! Selection shapes exchanged with the platform surface.
//!
//! There are two forms of the same data:
//!
//! - [`DomSelection`]: the **live** form, as read from or pushed to the surface.
//! - [`CachedSelection`]: the **frozen** form stored next to the cached model. A range is kept as
//!   plain `(node, offset)` pairs so it stays meaningful after later structural rewrites reorder
//!   live nodes. The node handles themselves are still owned by the surface.
//!
//! New selection shapes must extend these unions, never replace an existing variant.

use serde::{Deserialize, Serialize};

/// Opaque handle to a node owned by a [`Surface`](crate::Surface).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

/// A `(node, offset)` position inside the surface.
///
/// For text nodes `offset` counts characters; for container nodes it counts child nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DomPosition {
    /// Node containing the position.
    pub node: NodeId,
    /// Offset inside `node`.
    pub offset: usize,
}

impl DomPosition {
    /// Create a new position.
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// A range in document order (`start` never follows `end`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomRange {
    /// Range start.
    pub start: DomPosition,
    /// Range end.
    pub end: DomPosition,
}

impl DomRange {
    /// Create a range from two ordered positions.
    pub fn new(start: DomPosition, end: DomPosition) -> Self {
        Self { start, end }
    }

    /// Create a collapsed range (a caret).
    pub fn collapsed_at(position: DomPosition) -> Self {
        Self {
            start: position,
            end: position,
        }
    }

    /// Returns `true` if the range is a caret.
    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

/// Live selection as exchanged with the surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DomSelection {
    /// A text range or caret.
    Range {
        /// The selected range.
        range: DomRange,
        /// `true` when the user's drag anchor sits after the visual end.
        #[serde(rename = "isReverted")]
        is_reverted: bool,
    },
    /// A rectangular region of table cells (inclusive bounds).
    Table {
        /// The table node.
        table: NodeId,
        /// First selected row.
        #[serde(rename = "firstRow")]
        first_row: usize,
        /// Last selected row.
        #[serde(rename = "lastRow")]
        last_row: usize,
        /// First selected column.
        #[serde(rename = "firstColumn")]
        first_column: usize,
        /// Last selected column.
        #[serde(rename = "lastColumn")]
        last_column: usize,
    },
    /// A single selected image.
    Image {
        /// The image node.
        image: NodeId,
    },
}

impl DomSelection {
    /// Create a caret selection.
    pub fn caret(position: DomPosition) -> Self {
        DomSelection::Range {
            range: DomRange::collapsed_at(position),
            is_reverted: false,
        }
    }

    /// Create a forward range selection.
    pub fn range(start: DomPosition, end: DomPosition) -> Self {
        DomSelection::Range {
            range: DomRange::new(start, end),
            is_reverted: false,
        }
    }

    /// Returns the caret position if this is a collapsed range selection.
    pub fn collapsed_position(&self) -> Option<DomPosition> {
        match self {
            DomSelection::Range { range, .. } if range.is_collapsed() => Some(range.start),
            _ => None,
        }
    }

    /// Returns `true` for table and image selections.
    ///
    /// These cannot be re-derived from primitive range APIs without loss, so a recorded one is
    /// trusted over a fresh platform query.
    pub fn is_extended(&self) -> bool {
        !matches!(self, DomSelection::Range { .. })
    }

    /// Returns `true` if this selection refers to `node` as its table or image.
    pub fn references(&self, node: NodeId) -> bool {
        match self {
            DomSelection::Range { range, .. } => range.start.node == node || range.end.node == node,
            DomSelection::Table { table, .. } => *table == node,
            DomSelection::Image { image } => *image == node,
        }
    }
}

/// Frozen selection stored by the model cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CachedSelection {
    /// Denormalized range.
    Range {
        /// Range start.
        start: DomPosition,
        /// Range end.
        end: DomPosition,
        /// Whether the user's anchor is after the visual end.
        is_reverted: bool,
    },
    /// Table and image selections are stored verbatim.
    Verbatim(DomSelection),
}

impl From<&DomSelection> for CachedSelection {
    fn from(selection: &DomSelection) -> Self {
        match selection {
            DomSelection::Range { range, is_reverted } => CachedSelection::Range {
                start: range.start,
                end: range.end,
                is_reverted: *is_reverted,
            },
            other => CachedSelection::Verbatim(other.clone()),
        }
    }
}

impl CachedSelection {
    /// Rebuild the live form.
    pub fn to_dom_selection(&self) -> DomSelection {
        match self {
            CachedSelection::Range {
                start,
                end,
                is_reverted,
            } => DomSelection::Range {
                range: DomRange::new(*start, *end),
                is_reverted: *is_reverted,
            },
            CachedSelection::Verbatim(selection) => selection.clone(),
        }
    }

    /// Returns `true` if `selection` describes the same selection as this cached one.
    pub fn matches(&self, selection: &DomSelection) -> bool {
        *self == CachedSelection::from(selection)
    }

    /// Returns `true` if the cached selection refers to `node`.
    pub fn references(&self, node: NodeId) -> bool {
        match self {
            CachedSelection::Range { start, end, .. } => start.node == node || end.node == node,
            CachedSelection::Verbatim(selection) => selection.references(node),
        }
    }
}

/// Raw selection as reported by the platform, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformSelection {
    /// First range of the selection, in document order.
    pub range: DomRange,
    /// Deepest node containing both ends of `range`.
    pub common_ancestor: NodeId,
    /// Where the user started the selection.
    pub anchor: DomPosition,
    /// Where the user ended the selection (the caret side).
    pub focus: DomPosition,
}

/// Selection to bind when acquiring a model, overriding the surface selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionOverride {
    /// Explicitly no selection.
    None,
    /// Bind this selection instead of the current one.
    Selection(DomSelection),
}
