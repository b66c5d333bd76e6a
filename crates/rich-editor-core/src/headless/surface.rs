//! An in-memory editable surface.

use crate::model::{ImageFormat, SegmentFormat};
use crate::selection::{DomPosition, DomRange, DomSelection, NodeId, PlatformSelection};
use crate::surface::{Surface, SurfaceCapabilities, SurfaceMutation};
use std::cell::Cell;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::mem;
use std::rc::Rc;

/// Hands out unique node ids.
///
/// Clones share the counter, so a detached copy of a surface never reuses a live id.
#[derive(Debug, Clone)]
pub struct NodeIdAllocator {
    next: Rc<Cell<u64>>,
}

impl NodeIdAllocator {
    /// Create an allocator starting at 1.
    pub fn new() -> Self {
        Self {
            next: Rc::new(Cell::new(1)),
        }
    }

    /// Allocate a fresh id.
    pub fn allocate(&self) -> NodeId {
        let id = self.next.get();
        self.next.set(id + 1);
        NodeId(id)
    }
}

impl Default for NodeIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Inline node of a paragraph.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceInline {
    /// Text node.
    Text {
        /// Node id.
        id: NodeId,
        /// Content.
        text: String,
        /// Format.
        format: SegmentFormat,
    },
    /// Image.
    Image {
        /// Node id.
        id: NodeId,
        /// Source URL.
        src: String,
        /// Size constraints.
        format: ImageFormat,
    },
    /// Line break.
    Br {
        /// Node id.
        id: NodeId,
    },
}

impl SurfaceInline {
    /// Node id.
    pub fn id(&self) -> NodeId {
        match self {
            SurfaceInline::Text { id, .. }
            | SurfaceInline::Image { id, .. }
            | SurfaceInline::Br { id } => *id,
        }
    }
}

/// A table cell holding one text node.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceCell {
    /// Cell node id.
    pub id: NodeId,
    /// Id of the text node inside the cell.
    pub text_id: NodeId,
    /// Cell text.
    pub text: String,
}

/// Block node.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceBlock {
    /// Paragraph.
    Paragraph {
        /// Node id.
        id: NodeId,
        /// Children.
        inlines: Vec<SurfaceInline>,
    },
    /// Table.
    Table {
        /// Node id.
        id: NodeId,
        /// Cells, row by row.
        rows: Vec<Vec<SurfaceCell>>,
    },
    /// Entity wrapper.
    Entity {
        /// Wrapper node id.
        id: NodeId,
        /// Entity type.
        entity_type: String,
        /// Entity id.
        entity_id: String,
        /// Whether the entity is read-only.
        is_readonly: bool,
    },
    /// Horizontal rule.
    Divider {
        /// Node id.
        id: NodeId,
    },
}

impl SurfaceBlock {
    /// Node id of the block.
    pub fn id(&self) -> NodeId {
        match self {
            SurfaceBlock::Paragraph { id, .. }
            | SurfaceBlock::Table { id, .. }
            | SurfaceBlock::Entity { id, .. }
            | SurfaceBlock::Divider { id } => *id,
        }
    }

    fn contains(&self, node: NodeId) -> bool {
        if self.id() == node {
            return true;
        }
        match self {
            SurfaceBlock::Paragraph { inlines, .. } => inlines.iter().any(|inline| inline.id() == node),
            SurfaceBlock::Table { rows, .. } => rows
                .iter()
                .flatten()
                .any(|cell| cell.id == node || cell.text_id == node),
            SurfaceBlock::Entity { .. } | SurfaceBlock::Divider { .. } => false,
        }
    }
}

/// Where a node sits in a [`HeadlessSurface`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeLocation {
    /// The root.
    Root,
    /// A block, by index.
    Block(usize),
    /// An inline of the paragraph at `block`.
    Inline {
        /// Paragraph index.
        block: usize,
        /// Inline index.
        inline: usize,
    },
    /// A table cell or its text node.
    Cell {
        /// Table index.
        block: usize,
        /// Row.
        row: usize,
        /// Column.
        column: usize,
    },
}

/// In-memory [`Surface`].
///
/// Every structural or text change is recorded as a [`SurfaceMutation`] and delivered through
/// [`Surface::flush_mutations`], the way a platform mutation observer would.
#[derive(Debug)]
pub struct HeadlessSurface {
    ids: NodeIdAllocator,
    root: NodeId,
    blocks: Vec<SurfaceBlock>,
    focused: bool,
    platform_selection: Option<PlatformSelection>,
    zoom_scale: f64,
    right_to_left: bool,
    visible_width: Option<f64>,
    style_rules: BTreeMap<String, String>,
    mutations: Vec<SurfaceMutation>,
    capabilities: SurfaceCapabilities,
}

impl HeadlessSurface {
    /// Create an empty, unfocused surface.
    pub fn new() -> Self {
        Self::with_allocator(NodeIdAllocator::new())
    }

    fn with_allocator(ids: NodeIdAllocator) -> Self {
        let root = ids.allocate();
        Self {
            ids,
            root,
            blocks: Vec::new(),
            focused: false,
            platform_selection: None,
            zoom_scale: 1.0,
            right_to_left: false,
            visible_width: None,
            style_rules: BTreeMap::new(),
            mutations: Vec::new(),
            capabilities: SurfaceCapabilities::default(),
        }
    }

    /// A detached surface with this one's metrics and no children.
    fn empty_copy(&self) -> Self {
        let mut copy = Self::with_allocator(self.ids.clone());
        copy.zoom_scale = self.zoom_scale;
        copy.right_to_left = self.right_to_left;
        copy.visible_width = self.visible_width;
        copy.capabilities = self.capabilities;
        copy
    }

    /// Create a surface with one plain-text paragraph per item.
    pub fn from_paragraphs<I, T>(paragraphs: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let mut surface = Self::new();
        for text in paragraphs {
            surface.append_paragraph(text);
        }
        surface.mutations.clear();
        surface
    }

    /// Set the visible width.
    pub fn with_visible_width(mut self, width: f64) -> Self {
        self.visible_width = Some(width);
        self
    }

    /// Set the page zoom scale.
    pub fn with_zoom_scale(mut self, zoom_scale: f64) -> Self {
        self.zoom_scale = zoom_scale;
        self
    }

    /// Set the layout direction.
    pub fn with_right_to_left(mut self, right_to_left: bool) -> Self {
        self.right_to_left = right_to_left;
        self
    }

    /// Set the platform capabilities.
    pub fn with_capabilities(mut self, capabilities: SurfaceCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// The shared id allocator.
    pub fn ids(&self) -> &NodeIdAllocator {
        &self.ids
    }

    /// Root node id.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Block nodes.
    pub fn blocks(&self) -> &[SurfaceBlock] {
        &self.blocks
    }

    /// Returns `true` if the surface has no content.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Replace all content. Records a child-list mutation.
    pub fn replace_blocks(&mut self, blocks: Vec<SurfaceBlock>) -> Vec<SurfaceBlock> {
        self.mutations.push(SurfaceMutation::ChildList);
        mem::replace(&mut self.blocks, blocks)
    }

    /// Append a paragraph holding one text node. Returns the text node id.
    pub fn append_paragraph(&mut self, text: impl Into<String>) -> NodeId {
        let text_id = self.ids.allocate();
        let paragraph = SurfaceBlock::Paragraph {
            id: self.ids.allocate(),
            inlines: vec![SurfaceInline::Text {
                id: text_id,
                text: text.into(),
                format: SegmentFormat::default(),
            }],
        };
        self.blocks.push(paragraph);
        self.mutations.push(SurfaceMutation::ChildList);
        text_id
    }

    /// Append a paragraph holding one image. Returns the image node id.
    pub fn append_image(&mut self, src: impl Into<String>) -> NodeId {
        let image_id = self.ids.allocate();
        self.blocks.push(SurfaceBlock::Paragraph {
            id: self.ids.allocate(),
            inlines: vec![SurfaceInline::Image {
                id: image_id,
                src: src.into(),
                format: ImageFormat::default(),
            }],
        });
        self.mutations.push(SurfaceMutation::ChildList);
        image_id
    }

    /// Append a table with the given cell texts. Returns the table node id.
    pub fn append_table(&mut self, rows: &[&[&str]]) -> NodeId {
        let id = self.ids.allocate();
        let rows = rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|text| SurfaceCell {
                        id: self.ids.allocate(),
                        text_id: self.ids.allocate(),
                        text: (*text).to_string(),
                    })
                    .collect()
            })
            .collect();
        self.blocks.push(SurfaceBlock::Table { id, rows });
        self.mutations.push(SurfaceMutation::ChildList);
        id
    }

    /// Append an entity wrapper. Returns its node id.
    pub fn append_entity(&mut self, entity_type: &str, entity_id: &str) -> NodeId {
        let id = self.ids.allocate();
        self.blocks.push(SurfaceBlock::Entity {
            id,
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            is_readonly: true,
        });
        self.mutations.push(SurfaceMutation::ChildList);
        id
    }

    /// Append a divider. Returns its node id.
    pub fn append_divider(&mut self) -> NodeId {
        let id = self.ids.allocate();
        self.blocks.push(SurfaceBlock::Divider { id });
        self.mutations.push(SurfaceMutation::ChildList);
        id
    }

    /// Id of the inline at `inline` in the paragraph at `block`.
    pub fn inline_id(&self, block: usize, inline: usize) -> Option<NodeId> {
        match self.blocks.get(block)? {
            SurfaceBlock::Paragraph { inlines, .. } => inlines.get(inline).map(SurfaceInline::id),
            _ => None,
        }
    }

    /// Find a node.
    pub fn locate(&self, node: NodeId) -> Option<NodeLocation> {
        if node == self.root {
            return Some(NodeLocation::Root);
        }
        self.blocks
            .iter()
            .enumerate()
            .find_map(|(index, block)| match block {
                _ if block.id() == node => Some(NodeLocation::Block(index)),
                SurfaceBlock::Paragraph { inlines, .. } => inlines
                    .iter()
                    .position(|inline| inline.id() == node)
                    .map(|inline| NodeLocation::Inline {
                        block: index,
                        inline,
                    }),
                SurfaceBlock::Table { rows, .. } => {
                    rows.iter().enumerate().find_map(|(row, cells)| {
                        cells
                            .iter()
                            .position(|cell| cell.id == node || cell.text_id == node)
                            .map(|column| NodeLocation::Cell {
                                block: index,
                                row,
                                column,
                            })
                    })
                }
                SurfaceBlock::Entity { .. } | SurfaceBlock::Divider { .. } => None,
            })
    }

    /// Simulate the user typing `text` into the text node `node` at `offset` (in characters).
    ///
    /// The platform caret moves after the inserted text. Returns `false` if `node` is not a text
    /// node of this surface.
    pub fn type_text(&mut self, node: NodeId, offset: usize, text: &str) -> bool {
        let Some(NodeLocation::Inline { block, inline }) = self.locate(node) else {
            return false;
        };
        let SurfaceBlock::Paragraph { inlines, .. } = &mut self.blocks[block] else {
            return false;
        };
        let SurfaceInline::Text { text: content, .. } = &mut inlines[inline] else {
            return false;
        };

        let byte = byte_offset(content, offset);
        content.insert_str(byte, text);
        self.mutations.push(SurfaceMutation::CharacterData);
        self.place_caret(node, offset + text.chars().count());
        true
    }

    /// Record an arbitrary mutation, as if another script touched the surface.
    pub fn record_mutation(&mut self, mutation: SurfaceMutation) {
        self.mutations.push(mutation);
    }

    /// Give the surface focus.
    pub fn focus(&mut self) {
        self.focused = true;
    }

    /// Take focus away from the surface.
    pub fn blur(&mut self) {
        self.focused = false;
    }

    /// Put the platform caret at `node`/`offset`.
    pub fn place_caret(&mut self, node: NodeId, offset: usize) {
        let position = DomPosition::new(node, offset);
        self.platform_selection = Some(PlatformSelection {
            range: DomRange::collapsed_at(position),
            common_ancestor: node,
            anchor: position,
            focus: position,
        });
    }

    /// Set the raw platform selection, which may point outside this surface.
    pub fn set_platform_selection(&mut self, selection: Option<PlatformSelection>) {
        self.platform_selection = selection;
    }

    /// Installed style rule for `key`.
    pub fn style_rule(&self, key: &str) -> Option<&str> {
        self.style_rules.get(key).map(String::as_str)
    }

    /// Serialize the content as HTML.
    pub fn to_html(&self) -> String {
        let mut html = String::new();
        for block in &self.blocks {
            write_block(&mut html, block);
        }
        html
    }
}

impl Default for HeadlessSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl Surface for HeadlessSurface {
    fn has_focus(&self) -> bool {
        self.focused
    }

    fn platform_selection(&self) -> Option<PlatformSelection> {
        self.platform_selection.clone()
    }

    fn contains(&self, node: NodeId) -> bool {
        node == self.root || self.blocks.iter().any(|block| block.contains(node))
    }

    fn select(&mut self, selection: &DomSelection) {
        self.platform_selection = match selection {
            DomSelection::Range { range, is_reverted } => {
                let (anchor, focus) = if *is_reverted {
                    (range.end, range.start)
                } else {
                    (range.start, range.end)
                };
                Some(PlatformSelection {
                    range: *range,
                    common_ancestor: self.root,
                    anchor,
                    focus,
                })
            }
            DomSelection::Table { .. } | DomSelection::Image { .. } => None,
        };
    }

    fn zoom_scale(&self) -> f64 {
        self.zoom_scale
    }

    fn is_right_to_left(&self) -> bool {
        self.right_to_left
    }

    fn visible_width(&self) -> Option<f64> {
        self.visible_width
    }

    fn set_style_rule(&mut self, key: &str, rule: Option<String>) {
        match rule {
            Some(rule) => {
                self.style_rules.insert(key.to_string(), rule);
            }
            None => {
                self.style_rules.remove(key);
            }
        }
    }

    fn capabilities(&self) -> SurfaceCapabilities {
        self.capabilities
    }

    fn detach_children(&mut self) -> Self {
        let mut detached = self.empty_copy();
        detached.blocks = mem::take(&mut self.blocks);

        self.platform_selection = None;
        self.mutations.push(SurfaceMutation::ChildList);
        detached
    }

    fn clone_children(&self) -> Self {
        let mut copy = self.empty_copy();
        copy.blocks = self.blocks.clone();
        copy
    }

    fn restore_children(&mut self, detached: Self) {
        self.blocks = detached.blocks;
        self.mutations.push(SurfaceMutation::ChildList);
    }

    fn flush_mutations(&mut self) -> Vec<SurfaceMutation> {
        mem::take(&mut self.mutations)
    }
}

/// Byte index of the `chars`-th character of `text`, clamped to its length.
pub(crate) fn byte_offset(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map_or(text.len(), |(index, _)| index)
}

fn write_block(html: &mut String, block: &SurfaceBlock) {
    match block {
        SurfaceBlock::Paragraph { inlines, .. } => {
            html.push_str("<p>");
            for inline in inlines {
                write_inline(html, inline);
            }
            html.push_str("</p>");
        }
        SurfaceBlock::Table { rows, .. } => {
            html.push_str("<table>");
            for row in rows {
                html.push_str("<tr>");
                for cell in row {
                    html.push_str("<td>");
                    escape_into(html, &cell.text);
                    html.push_str("</td>");
                }
                html.push_str("</tr>");
            }
            html.push_str("</table>");
        }
        SurfaceBlock::Entity {
            entity_type,
            entity_id,
            ..
        } => {
            html.push_str("<div class=\"_Entity _EType_");
            escape_into(html, entity_type);
            html.push_str(" _EId_");
            escape_into(html, entity_id);
            html.push_str("\" contenteditable=\"false\"></div>");
        }
        SurfaceBlock::Divider { .. } => html.push_str("<hr>"),
    }
}

fn write_inline(html: &mut String, inline: &SurfaceInline) {
    match inline {
        SurfaceInline::Text { text, format, .. } => {
            let style = inline_style(format);
            if !style.is_empty() {
                let _ = write!(html, "<span style=\"{style}\">");
            }
            let tags: Vec<&str> = [
                (format.bold == Some(true), "b"),
                (format.italic == Some(true), "i"),
                (format.underline == Some(true), "u"),
            ]
            .into_iter()
            .filter_map(|(on, tag)| on.then_some(tag))
            .collect();
            for tag in &tags {
                let _ = write!(html, "<{tag}>");
            }
            escape_into(html, text);
            for tag in tags.iter().rev() {
                let _ = write!(html, "</{tag}>");
            }
            if !style.is_empty() {
                html.push_str("</span>");
            }
        }
        SurfaceInline::Image { src, format, .. } => {
            html.push_str("<img src=\"");
            escape_into(html, src);
            html.push('"');
            if let Some(max_width) = format.max_width {
                let _ = write!(html, " style=\"max-width:{max_width}px\"");
            }
            html.push('>');
        }
        SurfaceInline::Br { .. } => html.push_str("<br>"),
    }
}

fn inline_style(format: &SegmentFormat) -> String {
    [
        ("font-family", &format.font_family),
        ("font-size", &format.font_size),
        ("color", &format.text_color),
        ("background-color", &format.background_color),
    ]
    .into_iter()
    .filter_map(|(name, value)| value.as_ref().map(|value| format!("{name}:{value}")))
    .collect::<Vec<_>>()
    .join(";")
}

fn escape_into(html: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => html.push_str("&amp;"),
            '<' => html.push_str("&lt;"),
            '>' => html.push_str("&gt;"),
            '"' => html.push_str("&quot;"),
            _ => html.push(ch),
        }
    }
}
