//! Content Model
//!
//! The structured, serializable document tree the core synchronizes against the surface.
//!
//! # Overview
//!
//! A [`ContentModelDocument`] is a plain value: it can be deep-cloned, compared and serialized.
//! Blocks that were materialized on a surface remember the node they were rendered into
//! (`cached_element`). Those rendering handles are never serialized, and must be dropped whenever
//! the block's content changes so a converter does not trust a stale node. The `*_mut` accessors
//! on blocks do that automatically.
//!
//! Selection lives inside the model as well:
//!
//! - a caret is a [`ContentModelSegment::SelectionMarker`] inside a paragraph
//! - a text range marks segments with `is_selected`
//! - a table region marks cells with `is_selected`
//! - an image selection marks the image segment

use crate::selection::NodeId;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// Shared handle to a model.
///
/// The cache and callers share one allocation; writers go through [`Rc::make_mut`], so a model
/// held by the cache is never mutated behind its back.
pub type ModelHandle = Rc<ContentModelDocument>;

/// Character-level format.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SegmentFormat {
    /// Font family.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    /// Font size, with unit (e.g. `"12pt"`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<String>,
    /// Text colour.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
    /// Background colour.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    /// Bold.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    /// Italic.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    /// Underline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub underline: Option<bool>,
}

impl SegmentFormat {
    /// Returns `true` if no property is set.
    pub fn is_empty(&self) -> bool {
        *self == SegmentFormat::default()
    }

    /// Fill unset properties from `base`.
    pub fn inherit(&mut self, base: &SegmentFormat) {
        fn fill<T: Clone>(target: &mut Option<T>, source: &Option<T>) {
            if target.is_none() {
                target.clone_from(source);
            }
        }

        fill(&mut self.font_family, &base.font_family);
        fill(&mut self.font_size, &base.font_size);
        fill(&mut self.text_color, &base.text_color);
        fill(&mut self.background_color, &base.background_color);
        fill(&mut self.bold, &base.bold);
        fill(&mut self.italic, &base.italic);
        fill(&mut self.underline, &base.underline);
    }
}

/// Image sizing format.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ImageFormat {
    /// Rendered width in pixels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    /// Rendered height in pixels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    /// Maximum width in pixels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_width: Option<f64>,
}

/// A text run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentModelText {
    /// The text.
    pub text: String,
    /// Format of the run.
    #[serde(default)]
    pub format: SegmentFormat,
    /// Whether the run is inside the selection.
    #[serde(default)]
    pub is_selected: bool,
}

impl ContentModelText {
    /// Create an unselected, unformatted text run.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// An inline image.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentModelImage {
    /// Image source.
    pub src: String,
    /// Sizing.
    #[serde(default)]
    pub format: ImageFormat,
    /// Whether the image is selected.
    #[serde(default)]
    pub is_selected: bool,
}

/// Inline content of a paragraph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "segmentType")]
pub enum ContentModelSegment {
    /// Text run.
    Text(ContentModelText),
    /// Image.
    Image(ContentModelImage),
    /// Line break.
    Br {
        /// Format applied at the break.
        #[serde(default)]
        format: SegmentFormat,
    },
    /// A caret.
    SelectionMarker {
        /// Format that would apply to text typed at the caret.
        #[serde(default)]
        format: SegmentFormat,
    },
}

impl ContentModelSegment {
    /// Returns `true` if the segment is part of the selection.
    pub fn is_selected(&self) -> bool {
        match self {
            ContentModelSegment::Text(text) => text.is_selected,
            ContentModelSegment::Image(image) => image.is_selected,
            ContentModelSegment::Br { .. } => false,
            ContentModelSegment::SelectionMarker { .. } => true,
        }
    }
}

/// A paragraph.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContentModelParagraph {
    /// Inline content.
    pub segments: Vec<ContentModelSegment>,
    /// Node this paragraph was last rendered into.
    #[serde(skip)]
    pub cached_element: Option<NodeId>,
}

impl ContentModelParagraph {
    /// Create a paragraph holding one text run.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            segments: vec![ContentModelSegment::Text(ContentModelText::new(text))],
            cached_element: None,
        }
    }

    /// Mutable access to the segments; drops the rendering handle.
    pub fn segments_mut(&mut self) -> &mut Vec<ContentModelSegment> {
        self.cached_element = None;
        &mut self.segments
    }

    /// Concatenated text of all text segments.
    pub fn text(&self) -> String {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                ContentModelSegment::Text(text) => Some(text.text.as_str()),
                _ => None,
            })
            .collect()
    }

    fn has_selection(&self) -> bool {
        self.segments.iter().any(ContentModelSegment::is_selected)
    }
}

/// A table cell.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentModelTableCell {
    /// Cell content.
    pub blocks: Vec<ContentModelBlock>,
    /// Whether the whole cell is part of a table selection.
    #[serde(default)]
    pub is_selected: bool,
}

/// A table row.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContentModelTableRow {
    /// Cells, left to right.
    pub cells: Vec<ContentModelTableCell>,
}

/// A table.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContentModelTable {
    /// Rows, top to bottom.
    pub rows: Vec<ContentModelTableRow>,
    /// Node this table was last rendered into.
    #[serde(skip)]
    pub cached_element: Option<NodeId>,
}

impl ContentModelTable {
    /// Mutable access to the rows; drops the rendering handle.
    pub fn rows_mut(&mut self) -> &mut Vec<ContentModelTableRow> {
        self.cached_element = None;
        &mut self.rows
    }

    /// Inclusive `(first_row, last_row, first_column, last_column)` bounds of selected cells.
    pub fn selected_region(&self) -> Option<(usize, usize, usize, usize)> {
        let mut region: Option<(usize, usize, usize, usize)> = None;
        for (row_index, row) in self.rows.iter().enumerate() {
            for (column_index, cell) in row.cells.iter().enumerate() {
                if !cell.is_selected {
                    continue;
                }
                region = Some(match region {
                    None => (row_index, row_index, column_index, column_index),
                    Some((r0, r1, c0, c1)) => (
                        r0.min(row_index),
                        r1.max(row_index),
                        c0.min(column_index),
                        c1.max(column_index),
                    ),
                });
            }
        }
        region
    }
}

/// An embedded object whose content is owned by the host, not the model.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentModelEntity {
    /// Entity type name.
    pub entity_type: String,
    /// Unique id within the document.
    pub id: String,
    /// Whether the entity content is read-only.
    #[serde(default)]
    pub is_readonly: bool,
    /// Wrapper node on the surface.
    #[serde(skip)]
    pub wrapper: Option<NodeId>,
}

/// A horizontal divider.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContentModelDivider {
    /// Node this divider was last rendered into.
    #[serde(skip)]
    pub cached_element: Option<NodeId>,
}

/// A block-level element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "blockType")]
pub enum ContentModelBlock {
    /// Paragraph.
    Paragraph(ContentModelParagraph),
    /// Table.
    Table(ContentModelTable),
    /// Embedded object.
    Entity(ContentModelEntity),
    /// Divider.
    Divider(ContentModelDivider),
}

impl ContentModelBlock {
    /// Rendering handle of this block, if any.
    pub fn cached_element(&self) -> Option<NodeId> {
        match self {
            ContentModelBlock::Paragraph(paragraph) => paragraph.cached_element,
            ContentModelBlock::Table(table) => table.cached_element,
            ContentModelBlock::Entity(entity) => entity.wrapper,
            ContentModelBlock::Divider(divider) => divider.cached_element,
        }
    }

    /// Record the node this block was rendered into.
    pub fn set_cached_element(&mut self, node: NodeId) {
        match self {
            ContentModelBlock::Paragraph(paragraph) => paragraph.cached_element = Some(node),
            ContentModelBlock::Table(table) => table.cached_element = Some(node),
            ContentModelBlock::Entity(entity) => entity.wrapper = Some(node),
            ContentModelBlock::Divider(divider) => divider.cached_element = Some(node),
        }
    }

    /// Drop the rendering handle of this block.
    ///
    /// Entity wrappers are kept: entities own their nodes.
    pub fn clear_cached_element(&mut self) {
        match self {
            ContentModelBlock::Paragraph(paragraph) => paragraph.cached_element = None,
            ContentModelBlock::Table(table) => table.cached_element = None,
            ContentModelBlock::Entity(_) => {}
            ContentModelBlock::Divider(divider) => divider.cached_element = None,
        }
    }

    fn has_selection(&self) -> bool {
        match self {
            ContentModelBlock::Paragraph(paragraph) => paragraph.has_selection(),
            ContentModelBlock::Table(table) => table.rows.iter().any(|row| {
                row.cells
                    .iter()
                    .any(|cell| cell.is_selected || cell.blocks.iter().any(Self::has_selection))
            }),
            ContentModelBlock::Entity(_) | ContentModelBlock::Divider(_) => false,
        }
    }

    fn strip_cached_elements(&mut self) {
        self.clear_cached_element();
        if let ContentModelBlock::Table(table) = self {
            for cell in table.rows.iter_mut().flat_map(|row| row.cells.iter_mut()) {
                cell.blocks.iter_mut().for_each(Self::strip_cached_elements);
            }
        }
    }
}

/// Location of a segment in a top-level paragraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SegmentLocation {
    /// Index of the paragraph in [`ContentModelDocument::blocks`].
    pub block: usize,
    /// Index of the segment in the paragraph.
    pub segment: usize,
}

/// The document root.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentModelDocument {
    /// Top-level blocks.
    pub blocks: Vec<ContentModelBlock>,
    /// Whether the range selection in this model was made right to left.
    #[serde(default)]
    pub has_reverted_range_selection: bool,
}

impl ContentModelDocument {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a block.
    pub fn add_block(&mut self, block: ContentModelBlock) {
        self.blocks.push(block);
    }

    /// Returns `true` if any block holds selection.
    pub fn has_selection(&self) -> bool {
        self.blocks.iter().any(ContentModelBlock::has_selection)
    }

    /// Visit every block that holds selection, depth first.
    ///
    /// The rendering handle of every visited block is dropped before `callback` runs: once a
    /// block's selection is inspected for change, its previous rendering cannot be reused.
    /// A table holding selection is visited before the selected blocks inside its cells.
    ///
    /// Returns the number of visited blocks.
    pub fn iterate_selections<F>(&mut self, mut callback: F) -> usize
    where
        F: FnMut(&mut ContentModelBlock),
    {
        fn visit<F: FnMut(&mut ContentModelBlock)>(
            blocks: &mut [ContentModelBlock],
            callback: &mut F,
        ) -> usize {
            let mut visited = 0;
            for block in blocks.iter_mut().filter(|block| block.has_selection()) {
                block.clear_cached_element();
                callback(block);
                visited += 1;
                if let ContentModelBlock::Table(table) = block {
                    for cell in table.rows.iter_mut().flat_map(|row| row.cells.iter_mut()) {
                        visited += visit(&mut cell.blocks, callback);
                    }
                }
            }
            visited
        }

        visit(&mut self.blocks, &mut callback)
    }

    /// Clone without any rendering handles.
    pub fn clone_disconnected(&self) -> Self {
        let mut clone = self.clone();
        clone
            .blocks
            .iter_mut()
            .for_each(ContentModelBlock::strip_cached_elements);
        clone
    }

    /// Remove every selection marker and selection flag.
    pub fn clear_selection(&mut self) {
        fn clear(blocks: &mut [ContentModelBlock]) {
            for block in blocks.iter_mut().filter(|block| block.has_selection()) {
                block.clear_cached_element();
                match block {
                    ContentModelBlock::Paragraph(paragraph) => {
                        paragraph.segments.retain(|segment| {
                            !matches!(segment, ContentModelSegment::SelectionMarker { .. })
                        });
                        for segment in paragraph.segments.iter_mut() {
                            match segment {
                                ContentModelSegment::Text(text) => text.is_selected = false,
                                ContentModelSegment::Image(image) => image.is_selected = false,
                                _ => {}
                            }
                        }
                    }
                    ContentModelBlock::Table(table) => {
                        for cell in table.rows.iter_mut().flat_map(|row| row.cells.iter_mut()) {
                            cell.is_selected = false;
                            clear(&mut cell.blocks);
                        }
                    }
                    ContentModelBlock::Entity(_) | ContentModelBlock::Divider(_) => {}
                }
            }
        }

        clear(&mut self.blocks);
        self.has_reverted_range_selection = false;
    }

    /// Top-level paragraph at `index`.
    pub fn paragraph_mut(&mut self, index: usize) -> Option<&mut ContentModelParagraph> {
        match self.blocks.get_mut(index)? {
            ContentModelBlock::Paragraph(paragraph) => Some(paragraph),
            _ => None,
        }
    }

    /// Image segment at `location`. Drops the paragraph's rendering handle.
    pub fn image_mut(&mut self, location: SegmentLocation) -> Option<&mut ContentModelImage> {
        let paragraph = self.paragraph_mut(location.block)?;
        match paragraph.segments_mut().get_mut(location.segment)? {
            ContentModelSegment::Image(image) => Some(image),
            _ => None,
        }
    }

    /// Plain text of all top-level paragraphs, one line each.
    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .filter_map(|block| match block {
                ContentModelBlock::Paragraph(paragraph) => Some(paragraph.text()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selected_text(text: &str) -> ContentModelSegment {
        ContentModelSegment::Text(ContentModelText {
            text: text.to_string(),
            format: SegmentFormat::default(),
            is_selected: true,
        })
    }

    #[test]
    fn test_segments_mut_drops_cached_element() {
        let mut paragraph = ContentModelParagraph::from_text("abc");
        paragraph.cached_element = Some(NodeId(1));

        paragraph
            .segments_mut()
            .push(ContentModelSegment::Br {
                format: SegmentFormat::default(),
            });

        assert_eq!(paragraph.cached_element, None);
        assert_eq!(paragraph.segments.len(), 2);
    }

    #[test]
    fn test_iterate_selections_only_visits_selected_blocks() {
        let mut doc = ContentModelDocument::new();
        let mut unselected = ContentModelParagraph::from_text("one");
        unselected.cached_element = Some(NodeId(1));
        let selected = ContentModelParagraph {
            segments: vec![selected_text("two")],
            cached_element: Some(NodeId(2)),
        };
        doc.add_block(ContentModelBlock::Paragraph(unselected));
        doc.add_block(ContentModelBlock::Paragraph(selected));

        let visited = doc.iterate_selections(|_| {});

        assert_eq!(visited, 1);
        assert_eq!(doc.blocks[0].cached_element(), Some(NodeId(1)));
        assert_eq!(doc.blocks[1].cached_element(), None);
    }

    #[test]
    fn test_table_selected_region() {
        let cell = |selected| ContentModelTableCell {
            blocks: Vec::new(),
            is_selected: selected,
        };
        let table = ContentModelTable {
            rows: vec![
                ContentModelTableRow {
                    cells: vec![cell(false), cell(true), cell(false)],
                },
                ContentModelTableRow {
                    cells: vec![cell(false), cell(true), cell(true)],
                },
            ],
            cached_element: None,
        };

        assert_eq!(table.selected_region(), Some((0, 1, 1, 2)));
    }

    #[test]
    fn test_serialization_skips_rendering_handles() {
        let mut doc = ContentModelDocument::new();
        let mut paragraph = ContentModelParagraph::from_text("hi");
        paragraph.cached_element = Some(NodeId(7));
        doc.add_block(ContentModelBlock::Paragraph(paragraph));

        let json = serde_json::to_string(&doc).unwrap();
        assert!(!json.contains("cached"));

        let restored: ContentModelDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, doc.clone_disconnected());
    }

    #[test]
    fn test_clear_selection_removes_markers() {
        let mut doc = ContentModelDocument::new();
        doc.add_block(ContentModelBlock::Paragraph(ContentModelParagraph {
            segments: vec![
                ContentModelSegment::Text(ContentModelText::new("a")),
                ContentModelSegment::SelectionMarker {
                    format: SegmentFormat::default(),
                },
                selected_text("b"),
            ],
            cached_element: None,
        }));
        doc.has_reverted_range_selection = true;

        doc.clear_selection();

        assert!(!doc.has_selection());
        assert!(!doc.has_reverted_range_selection);
        assert_eq!(doc.plain_text(), "ab");
    }

    #[test]
    fn test_inherit_fills_missing_properties() {
        let mut format = SegmentFormat {
            bold: Some(true),
            ..Default::default()
        };
        let base = SegmentFormat {
            bold: Some(false),
            font_size: Some("12pt".to_string()),
            ..Default::default()
        };
        format.inherit(&base);

        assert_eq!(format.bold, Some(true));
        assert_eq!(format.font_size.as_deref(), Some("12pt"));
    }
}
