//! Structural converters for [`HeadlessSurface`].
//!
//! # Reading
//!
//! Every inline node becomes one segment. A bound selection splits text nodes at its
//! boundaries (a caret becomes a selection marker), and a paragraph that had to be split is
//! not given a rendering handle, since its segments no longer map one to one onto its nodes.
//!
//! # Writing
//!
//! A block whose rendering handle still names a compatible node of the target surface keeps
//! that node; any other block gets fresh nodes and is reported through `on_node_created`. The
//! resulting selection is read back from the selection markers of the written model.

use super::recorders::ConversionLog;
use super::surface::{
    HeadlessSurface, NodeIdAllocator, NodeLocation, SurfaceBlock, SurfaceCell, SurfaceInline,
    byte_offset,
};
use crate::context::{DomToModelContext, ModelToDomContext};
use crate::error::ConverterError;
use crate::model::{
    ContentModelBlock, ContentModelDivider, ContentModelDocument, ContentModelEntity,
    ContentModelImage, ContentModelParagraph, ContentModelSegment, ContentModelTable,
    ContentModelTableCell, ContentModelTableRow, ContentModelText, SegmentFormat, SegmentLocation,
};
use crate::selection::{DomPosition, DomRange, DomSelection, NodeId};
use crate::state::DomIndexer;
use crate::surface::{ContentConverter, ModelElement, OnNodeCreated};
use std::collections::HashMap;
use tracing::trace;

/// [`ContentConverter`] for [`HeadlessSurface`].
#[derive(Debug, Default)]
pub struct HeadlessConverter {
    log: ConversionLog,
}

impl HeadlessConverter {
    /// Create a converter reporting into `log`.
    pub fn new(log: ConversionLog) -> Self {
        Self { log }
    }
}

impl ContentConverter<HeadlessSurface> for HeadlessConverter {
    fn dom_to_model(
        &mut self,
        root: &HeadlessSurface,
        context: &mut DomToModelContext,
    ) -> Result<ContentModelDocument, ConverterError> {
        self.log.record_read(context);
        let model = read_surface(root, context);
        trace!(blocks = model.blocks.len(), "surface read");
        Ok(model)
    }

    fn model_to_dom(
        &mut self,
        root: &mut HeadlessSurface,
        model: &mut ContentModelDocument,
        context: &ModelToDomContext,
        on_node_created: Option<&mut OnNodeCreated<'_>>,
    ) -> Result<Option<DomSelection>, ConverterError> {
        if self.log.record_write(context) {
            return Err(ConverterError::Other("injected write failure".to_string()));
        }
        let selection = write_surface(root, model, context, on_node_created);
        trace!(blocks = model.blocks.len(), "surface written");
        Ok(selection)
    }
}

/// Document-order key of a position: `(block, child, character offset)`.
type PositionKey = (usize, usize, usize);

/// A selection resolved against the surface being read.
enum Binding {
    None,
    Caret {
        position: DomPosition,
    },
    Range {
        start: PositionKey,
        end: PositionKey,
    },
    Table {
        table: NodeId,
        rows: (usize, usize),
        columns: (usize, usize),
    },
    Image(NodeId),
}

impl Binding {
    fn resolve(root: &HeadlessSurface, selection: Option<&DomSelection>) -> Self {
        match selection {
            None => Binding::None,
            Some(DomSelection::Range { range, .. }) if range.is_collapsed() => Binding::Caret {
                position: range.start,
            },
            Some(DomSelection::Range { range, .. }) => {
                match (position_key(root, range.start), position_key(root, range.end)) {
                    (Some(start), Some(end)) => Binding::Range { start, end },
                    _ => Binding::None,
                }
            }
            Some(DomSelection::Table {
                table,
                first_row,
                last_row,
                first_column,
                last_column,
            }) => Binding::Table {
                table: *table,
                rows: (*first_row, *last_row),
                columns: (*first_column, *last_column),
            },
            Some(DomSelection::Image { image }) => Binding::Image(*image),
        }
    }

    /// Selected character span `[from, to)` of the text inline at `(block, inline)`.
    fn text_span(&self, block: usize, inline: usize, len: usize) -> Option<(usize, usize)> {
        let Binding::Range { start, end } = self else {
            return None;
        };
        let (low, high) = ((block, inline, 0), (block, inline, len));
        if *end <= low || *start >= high {
            return None;
        }
        let from = if *start > low { start.2 } else { 0 };
        let to = if *end < high { end.2 } else { len };
        (from < to).then_some((from, to))
    }

    fn covers_inline(&self, block: usize, inline: usize) -> bool {
        match self {
            Binding::Range { start, end } => *start <= (block, inline, 0) && *end >= (block, inline + 1, 0),
            _ => false,
        }
    }
}

fn position_key(root: &HeadlessSurface, position: DomPosition) -> Option<PositionKey> {
    match root.locate(position.node)? {
        NodeLocation::Root => Some((position.offset, 0, 0)),
        NodeLocation::Block(block) => Some((block, position.offset, 0)),
        NodeLocation::Inline { block, inline } => Some((block, inline, position.offset)),
        NodeLocation::Cell { .. } => None,
    }
}

fn read_surface(root: &HeadlessSurface, context: &DomToModelContext) -> ContentModelDocument {
    let binding = Binding::resolve(root, context.selection.as_ref());
    let keep_handles = !context.options.disable_cache_element;
    let mut document = ContentModelDocument::new();

    for (index, block) in root.blocks().iter().enumerate() {
        let model_block = match block {
            SurfaceBlock::Paragraph { id, inlines } => {
                let reader = ParagraphReader {
                    block: index,
                    paragraph: *id,
                    binding: &binding,
                    context,
                };
                let (mut paragraph, split) = reader.read(inlines);
                if keep_handles && !split {
                    paragraph.cached_element = Some(*id);
                }
                ContentModelBlock::Paragraph(paragraph)
            }
            SurfaceBlock::Table { id, rows } => ContentModelBlock::Table(ContentModelTable {
                rows: read_rows(*id, rows, &binding),
                cached_element: keep_handles.then_some(*id),
            }),
            SurfaceBlock::Entity {
                id,
                entity_type,
                entity_id,
                is_readonly,
            } => ContentModelBlock::Entity(ContentModelEntity {
                entity_type: entity_type.clone(),
                id: entity_id.clone(),
                is_readonly: *is_readonly,
                wrapper: Some(*id),
            }),
            SurfaceBlock::Divider { id } => ContentModelBlock::Divider(ContentModelDivider {
                cached_element: keep_handles.then_some(*id),
            }),
        };
        document.add_block(model_block);
    }

    document.has_reverted_range_selection = matches!(
        context.selection,
        Some(DomSelection::Range {
            is_reverted: true,
            ..
        })
    );
    document
}

struct ParagraphReader<'a> {
    block: usize,
    paragraph: NodeId,
    binding: &'a Binding,
    context: &'a DomToModelContext,
}

impl ParagraphReader<'_> {
    /// Returns the paragraph and whether the selection split it.
    fn read(&self, inlines: &[SurfaceInline]) -> (ContentModelParagraph, bool) {
        let mut segments = Vec::with_capacity(inlines.len());
        let mut split = false;

        for (index, inline) in inlines.iter().enumerate() {
            if self.caret_at(self.paragraph, index) {
                segments.push(self.marker(DomPosition::new(self.paragraph, index), None));
                split = true;
            }
            match inline {
                SurfaceInline::Text { id, text, format } => {
                    self.index(*id, segments.len());
                    split |= self.read_text(&mut segments, index, *id, text, format);
                }
                SurfaceInline::Image { id, src, format } => {
                    let is_selected = matches!(self.binding, Binding::Image(image) if image == id)
                        || self.binding.covers_inline(self.block, index);
                    segments.push(ContentModelSegment::Image(ContentModelImage {
                        src: src.clone(),
                        format: format.clone(),
                        is_selected,
                    }));
                }
                SurfaceInline::Br { .. } => segments.push(ContentModelSegment::Br {
                    format: SegmentFormat::default(),
                }),
            }
        }
        if self.caret_at(self.paragraph, inlines.len()) {
            segments.push(self.marker(DomPosition::new(self.paragraph, inlines.len()), None));
            split = true;
        }

        (
            ContentModelParagraph {
                segments,
                cached_element: None,
            },
            split,
        )
    }

    /// Push the segments of one text node. Returns `true` if the node was split.
    fn read_text(
        &self,
        segments: &mut Vec<ContentModelSegment>,
        index: usize,
        id: NodeId,
        text: &str,
        format: &SegmentFormat,
    ) -> bool {
        let len = text.chars().count();
        let piece = |from: usize, to: usize, is_selected: bool| {
            ContentModelSegment::Text(ContentModelText {
                text: text[byte_offset(text, from)..byte_offset(text, to)].to_string(),
                format: format.clone(),
                is_selected,
            })
        };

        if let Binding::Caret { position } = self.binding {
            if position.node == id {
                let offset = position.offset.min(len);
                if offset > 0 {
                    segments.push(piece(0, offset, false));
                }
                segments.push(self.marker(*position, Some(format)));
                if offset < len {
                    segments.push(piece(offset, len, false));
                }
                return true;
            }
        }

        match self.binding.text_span(self.block, index, len) {
            Some((0, to)) if to == len => {
                segments.push(piece(0, len, true));
                false
            }
            Some((from, to)) => {
                if from > 0 {
                    segments.push(piece(0, from, false));
                }
                segments.push(piece(from, to, true));
                if to < len {
                    segments.push(piece(to, len, false));
                }
                true
            }
            None => {
                segments.push(piece(0, len, false));
                false
            }
        }
    }

    fn caret_at(&self, node: NodeId, offset: usize) -> bool {
        matches!(self.binding, Binding::Caret { position } if position.node == node && position.offset == offset)
    }

    /// A caret picks up the pending format when it sits at the pending anchor.
    fn marker(&self, position: DomPosition, text_format: Option<&SegmentFormat>) -> ContentModelSegment {
        let format = match &self.context.pending_format {
            Some(pending) if pending.anchor == position => pending.format.clone(),
            _ => text_format.cloned().unwrap_or_default(),
        };
        ContentModelSegment::SelectionMarker { format }
    }

    fn index(&self, node: NodeId, segment: usize) {
        if let Some(indexer) = &self.context.dom_indexer {
            indexer.index_node(
                node,
                SegmentLocation {
                    block: self.block,
                    segment,
                },
            );
        }
    }
}

fn read_rows(table: NodeId, rows: &[Vec<SurfaceCell>], binding: &Binding) -> Vec<ContentModelTableRow> {
    let in_region = |row: usize, column: usize| match binding {
        Binding::Table {
            table: selected,
            rows: (r0, r1),
            columns: (c0, c1),
        } => *selected == table && (*r0..=*r1).contains(&row) && (*c0..=*c1).contains(&column),
        _ => false,
    };

    rows.iter()
        .enumerate()
        .map(|(row, cells)| ContentModelTableRow {
            cells: cells
                .iter()
                .enumerate()
                .map(|(column, cell)| ContentModelTableCell {
                    blocks: vec![ContentModelBlock::Paragraph(ContentModelParagraph::from_text(
                        cell.text.clone(),
                    ))],
                    is_selected: in_region(row, column),
                })
                .collect(),
        })
        .collect()
}

fn write_surface(
    root: &mut HeadlessSurface,
    model: &mut ContentModelDocument,
    context: &ModelToDomContext,
    mut on_node_created: Option<&mut OnNodeCreated<'_>>,
) -> Option<DomSelection> {
    let mut previous: HashMap<NodeId, SurfaceBlock> = root
        .replace_blocks(Vec::new())
        .into_iter()
        .map(|block| (block.id(), block))
        .collect();
    let mut blocks = Vec::with_capacity(model.blocks.len());
    let mut tracker = SelectionTracker::default();
    let mut writer = BlockWriter {
        ids: root.ids().clone(),
        indexer: context.dom_indexer.as_ref(),
        on_node_created: &mut on_node_created,
    };

    for (index, block) in model.blocks.iter_mut().enumerate() {
        let reused = block
            .cached_element()
            .and_then(|id| previous.remove(&id))
            .filter(|existing| fits(existing, &*block));
        let surface_block = match reused {
            Some(existing) => existing,
            None => {
                let created = writer.create_block(index, block);
                block.set_cached_element(created.id());
                created
            }
        };
        tracker.visit(block, &surface_block);
        blocks.push(surface_block);
    }

    root.replace_blocks(blocks);
    tracker.into_selection(model.has_reverted_range_selection)
}

/// Whether `existing` can keep rendering `block`.
fn fits(existing: &SurfaceBlock, block: &ContentModelBlock) -> bool {
    match (existing, block) {
        (SurfaceBlock::Paragraph { inlines, .. }, ContentModelBlock::Paragraph(paragraph)) => {
            let mut segments = paragraph
                .segments
                .iter()
                .filter(|segment| !matches!(segment, ContentModelSegment::SelectionMarker { .. }));
            inlines.iter().all(|inline| {
                matches!(
                    (inline, segments.next()),
                    (SurfaceInline::Text { .. }, Some(ContentModelSegment::Text(_)))
                        | (SurfaceInline::Image { .. }, Some(ContentModelSegment::Image(_)))
                        | (SurfaceInline::Br { .. }, Some(ContentModelSegment::Br { .. }))
                )
            }) && segments.next().is_none()
        }
        (SurfaceBlock::Table { rows, .. }, ContentModelBlock::Table(table)) => {
            rows.len() == table.rows.len()
                && rows
                    .iter()
                    .zip(&table.rows)
                    .all(|(cells, row)| cells.len() == row.cells.len())
        }
        (SurfaceBlock::Entity { .. }, ContentModelBlock::Entity(_))
        | (SurfaceBlock::Divider { .. }, ContentModelBlock::Divider(_)) => true,
        _ => false,
    }
}

struct BlockWriter<'a, 'b, 'c> {
    ids: NodeIdAllocator,
    indexer: Option<&'a DomIndexer>,
    on_node_created: &'a mut Option<&'b mut OnNodeCreated<'c>>,
}

impl BlockWriter<'_, '_, '_> {
    fn created(&mut self, element: ModelElement<'_>, node: NodeId) {
        if let Some(callback) = self.on_node_created.as_deref_mut() {
            callback(element, node);
        }
    }

    fn create_block(&mut self, index: usize, block: &ContentModelBlock) -> SurfaceBlock {
        let ids = self.ids.clone();
        let id = ids.allocate();
        let surface_block = match block {
            ContentModelBlock::Paragraph(paragraph) => {
                let mut inlines = Vec::with_capacity(paragraph.segments.len());
                for (position, segment) in paragraph.segments.iter().enumerate() {
                    let inline = match segment {
                        ContentModelSegment::Text(text) => SurfaceInline::Text {
                            id: ids.allocate(),
                            text: text.text.clone(),
                            format: text.format.clone(),
                        },
                        ContentModelSegment::Image(image) => SurfaceInline::Image {
                            id: ids.allocate(),
                            src: image.src.clone(),
                            format: image.format.clone(),
                        },
                        ContentModelSegment::Br { .. } => SurfaceInline::Br { id: ids.allocate() },
                        ContentModelSegment::SelectionMarker { .. } => continue,
                    };
                    if let (Some(indexer), SurfaceInline::Text { id, .. }) = (self.indexer, &inline) {
                        indexer.index_node(
                            *id,
                            SegmentLocation {
                                block: index,
                                segment: position,
                            },
                        );
                    }
                    self.created(ModelElement::Segment(segment), inline.id());
                    inlines.push(inline);
                }
                SurfaceBlock::Paragraph { id, inlines }
            }
            ContentModelBlock::Table(table) => SurfaceBlock::Table {
                id,
                rows: table
                    .rows
                    .iter()
                    .map(|row| {
                        row.cells
                            .iter()
                            .map(|cell| SurfaceCell {
                                id: ids.allocate(),
                                text_id: ids.allocate(),
                                text: cell_text(cell),
                            })
                            .collect()
                    })
                    .collect(),
            },
            ContentModelBlock::Entity(entity) => SurfaceBlock::Entity {
                id,
                entity_type: entity.entity_type.clone(),
                entity_id: entity.id.clone(),
                is_readonly: entity.is_readonly,
            },
            ContentModelBlock::Divider(_) => SurfaceBlock::Divider { id },
        };
        self.created(ModelElement::Block(block), id);
        surface_block
    }
}

fn cell_text(cell: &ContentModelTableCell) -> String {
    cell.blocks
        .iter()
        .filter_map(|block| match block {
            ContentModelBlock::Paragraph(paragraph) => Some(paragraph.text()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Collects the selection described by a model as it is written.
#[derive(Default)]
struct SelectionTracker {
    start: Option<DomPosition>,
    end: Option<DomPosition>,
    has_text_selection: bool,
    images: Vec<NodeId>,
    table: Option<DomSelection>,
}

impl SelectionTracker {
    fn mark(&mut self, start: DomPosition, end: DomPosition) {
        self.start.get_or_insert(start);
        self.end = Some(end);
    }

    fn visit(&mut self, block: &ContentModelBlock, surface_block: &SurfaceBlock) {
        match (block, surface_block) {
            (ContentModelBlock::Paragraph(paragraph), SurfaceBlock::Paragraph { id, inlines }) => {
                self.visit_paragraph(paragraph, *id, inlines);
            }
            (ContentModelBlock::Table(table), SurfaceBlock::Table { id, .. }) => {
                if let Some((first_row, last_row, first_column, last_column)) = table.selected_region() {
                    self.table.get_or_insert(DomSelection::Table {
                        table: *id,
                        first_row,
                        last_row,
                        first_column,
                        last_column,
                    });
                }
            }
            _ => {}
        }
    }

    fn visit_paragraph(&mut self, paragraph: &ContentModelParagraph, id: NodeId, inlines: &[SurfaceInline]) {
        let text_len = |inline: &SurfaceInline| match inline {
            SurfaceInline::Text { text, .. } => Some(text.chars().count()),
            _ => None,
        };

        let mut child: usize = 0;
        for segment in &paragraph.segments {
            match segment {
                ContentModelSegment::SelectionMarker { .. } => {
                    let before = child.checked_sub(1).and_then(|i| inlines.get(i));
                    let caret = match (before, inlines.get(child)) {
                        (Some(inline), _) if text_len(inline).is_some() => {
                            DomPosition::new(inline.id(), text_len(inline).unwrap_or_default())
                        }
                        (_, Some(inline)) if text_len(inline).is_some() => DomPosition::new(inline.id(), 0),
                        _ => DomPosition::new(id, child),
                    };
                    self.has_text_selection = true;
                    self.mark(caret, caret);
                    continue;
                }
                ContentModelSegment::Text(text) if text.is_selected => {
                    if let Some(inline) = inlines.get(child) {
                        let len = text_len(inline).unwrap_or_default();
                        self.has_text_selection = true;
                        self.mark(DomPosition::new(inline.id(), 0), DomPosition::new(inline.id(), len));
                    }
                }
                ContentModelSegment::Image(image) if image.is_selected => {
                    if let Some(inline) = inlines.get(child) {
                        self.images.push(inline.id());
                        self.mark(DomPosition::new(id, child), DomPosition::new(id, child + 1));
                    }
                }
                _ => {}
            }
            child += 1;
        }
    }

    fn into_selection(self, is_reverted: bool) -> Option<DomSelection> {
        if let Some(table) = self.table {
            if self.start.is_none() {
                return Some(table);
            }
        }
        if !self.has_text_selection {
            if let [image] = self.images.as_slice() {
                return Some(DomSelection::Image { image: *image });
            }
        }
        Some(DomSelection::Range {
            range: DomRange::new(self.start?, self.end?),
            is_reverted,
        })
    }
}
