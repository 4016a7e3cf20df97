use smallvec::SmallVec;

use doc_flow::{
    sanitize_extent, sanitize_offset, AlignV, DrawingBlock, DrawingKind, DrawingMeasure,
    FloatAlignment, FrameAttrs, FrameWrap, FrameXAlign, Line, ParagraphAttrs, ParagraphBlock,
    ParagraphMeasure, ParagraphShaper, VRelativeFrom,
};

use crate::float_objects::FloatingObjectManager;
use crate::page_ir::{DrawingFragment, Fragment, ImageFragment, ParaFragment};
use crate::paginator::{PageState, Paginator};

/// Width slack below which a band does not count as narrowed.
const WIDTH_EPSILON: f32 = 0.5;

/// Anchored drawings pending placement alongside a paragraph.
#[derive(Debug, Default)]
pub struct AnchoredDrawings {
    entries: SmallVec<[PendingDrawing; 2]>,
}

#[derive(Debug)]
struct PendingDrawing {
    block: DrawingBlock,
    measure: DrawingMeasure,
    placed: bool,
}

impl AnchoredDrawings {
    /// Queue a drawing for placement at the next paragraph.
    pub fn push(&mut self, block: DrawingBlock, measure: DrawingMeasure) {
        self.entries.push(PendingDrawing {
            block,
            measure,
            placed: false,
        });
    }

    /// Number of drawings already placed.
    pub fn placed_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.placed).count()
    }
}

/// Inputs for laying out one paragraph block.
pub struct FlowContext<'a> {
    pub block: &'a ParagraphBlock,
    pub measure: &'a ParagraphMeasure,
    pub paginator: &'a mut Paginator,
    pub floats: &'a mut FloatingObjectManager,
    /// External shaper used for bounded remeasurement; absent disables
    /// reflow.
    pub shaper: Option<&'a dyn ParagraphShaper>,
}

/// First-line indent consumed by the list marker and its gutter.
///
/// Hanging markers (no first-line indent mode) occupy no text-flow width.
/// Otherwise the marker width falls back from the measured value to the
/// declared box width, and both extents are sanitized.
pub fn first_line_marker_indent(attrs: &ParagraphAttrs, measure: &ParagraphMeasure) -> f32 {
    let Some(list_marker) = attrs.list_marker.as_ref() else {
        return 0.0;
    };
    if !list_marker.indent_first_line {
        return 0.0;
    }
    let marker_width = match measure.marker.as_ref() {
        Some(marker) => marker.marker_width,
        None => match list_marker.marker_box_width_px {
            Some(declared) => declared,
            None => return 0.0,
        },
    };
    let gutter_width = measure
        .marker
        .as_ref()
        .map_or(0.0, |marker| marker.gutter_width);
    sanitize_extent(marker_width) + sanitize_extent(gutter_width)
}

/// Place one paragraph block onto the current page(s).
///
/// Appends fragments and moves the page cursor; success is "some fragments
/// were appended". Drawings queued in `anchors` are positioned and
/// registered with the float manager before the paragraph text flows.
pub fn layout_paragraph_block(ctx: FlowContext<'_>, anchors: Option<&mut AnchoredDrawings>) {
    let FlowContext {
        block,
        measure,
        paginator,
        floats,
        shaper,
    } = ctx;

    if let Some(anchors) = anchors {
        place_anchored_drawings(paginator, floats, anchors, measure.first_line_height());
    }

    if let Some(frame) = block.attrs.frame.as_ref() {
        if frame.wrap == FrameWrap::None {
            place_framed_paragraph(paginator, block, measure, frame);
            return;
        }
    }

    let column_width = paginator.column_width();
    let marker_indent = first_line_marker_indent(&block.attrs, measure);

    // Remeasurement produces a fresh measure; the input is never mutated.
    // At most one reflow per cause: column width here, float narrowing
    // below.
    let mut remeasured: Option<ParagraphMeasure> = None;
    if let Some(shaper) = shaper {
        let shaped = measure.shaped_width();
        if shaped > column_width + WIDTH_EPSILON {
            log::debug!(
                "block {} reshaped from {:.1} to column width {:.1}",
                block.id,
                shaped,
                column_width
            );
            remeasured = Some(shaper.shape(block, column_width, marker_indent));
        }
    }

    // Pre-scan every line's band for float narrowing, starting at the cursor
    // adjusted for the still-pending spacing-before. One reflow at the
    // narrowest band keeps wrapping consistent between opposing floats.
    {
        let active = remeasured.as_ref().unwrap_or(measure);
        let state = paginator.ensure_page();
        let spacing_before = pending_spacing_before(state, &block.attrs);
        let page_number = state.page.number;
        let column_index = state.column_index;
        let mut band_y = state.cursor_y + spacing_before;
        let mut narrowest = column_width;
        for line in &active.lines {
            let band = floats.available_width(
                band_y,
                line.line_height,
                column_width,
                column_index,
                page_number,
            );
            narrowest = narrowest.min(band.width);
            band_y += line.line_height;
        }
        if narrowest + WIDTH_EPSILON < column_width {
            if let Some(shaper) = shaper {
                log::debug!(
                    "block {} reshaped to float-narrowed width {:.1}",
                    block.id,
                    narrowest
                );
                remeasured = Some(shaper.shape(block, narrowest, marker_indent));
            }
        }
    }
    let active = remeasured.as_ref().unwrap_or(measure);

    apply_spacing_before(paginator, &block.attrs);
    place_paragraph_lines(paginator, floats, block, active);
    apply_spacing_after(paginator, &block.attrs);
}

/// Spacing-before still owed at the cursor, after contextual suppression and
/// trailing-spacing collapse.
fn pending_spacing_before(state: &PageState, attrs: &ParagraphAttrs) -> f32 {
    if attrs.spacing.contextual
        && attrs.style_id.is_some()
        && state.last_paragraph_style_id == attrs.style_id
    {
        return 0.0;
    }
    (sanitize_extent(attrs.spacing.before_px) - state.trailing_spacing).max(0.0)
}

fn apply_spacing_before(paginator: &mut Paginator, attrs: &ParagraphAttrs) {
    let mut advanced = false;
    loop {
        let state = paginator.ensure_page();
        let spacing = pending_spacing_before(state, attrs);
        if spacing <= 0.0 {
            return;
        }
        // Spacing never splits across columns: move whole, then retry
        // against the fresh column's trailing state.
        if state.cursor_y + spacing > state.content_bottom {
            if advanced {
                // Spacing taller than an entire column; drop it rather than
                // loop forever.
                return;
            }
            paginator.advance_column();
            advanced = true;
            continue;
        }
        state.cursor_y += spacing;
        return;
    }
}

fn apply_spacing_after(paginator: &mut Paginator, attrs: &ParagraphAttrs) {
    let after = sanitize_extent(attrs.spacing.after_px);
    let state = paginator.ensure_page();
    if after > 0.0 && state.cursor_y + after > state.content_bottom {
        // The spacing does not fit: advance and leave zero trailing, so it
        // collapses into the next block's spacing-before. The style id stays
        // cleared; contextual spacing never crosses a break.
        paginator.advance_column();
        return;
    }
    state.cursor_y += after;
    state.trailing_spacing = after;
    state.last_paragraph_style_id = attrs.style_id.clone();
}

fn place_paragraph_lines(
    paginator: &mut Paginator,
    floats: &FloatingObjectManager,
    block: &ParagraphBlock,
    measure: &ParagraphMeasure,
) {
    let lines = &measure.lines;
    let total = lines.len();
    if total == 0 {
        return;
    }
    let column_width = paginator.column_width();
    let marker = measure.marker.as_ref();
    let mut line_idx = 0;

    while line_idx < total {
        let (page_number, column_index, cursor_y, content_bottom, page_has_fragments) = {
            let state = paginator.ensure_page();
            (
                state.page.number,
                state.column_index,
                state.cursor_y,
                state.content_bottom,
                !state.page.fragments.is_empty(),
            )
        };

        let next_height = lines[line_idx].line_height;
        let at_bottom = cursor_y >= content_bottom;
        let would_overflow = cursor_y + next_height > content_bottom;
        if at_bottom || (would_overflow && page_has_fragments) {
            paginator.advance_column();
            continue;
        }

        // Slice as many consecutive fitting lines as possible into one
        // fragment; a column that fits nothing still takes one line so the
        // pass always makes progress.
        let mut end = line_idx;
        let mut slice_height = 0.0f32;
        while end < total && cursor_y + slice_height + lines[end].line_height <= content_bottom {
            slice_height += lines[end].line_height;
            end += 1;
        }
        if end == line_idx {
            slice_height = lines[line_idx].line_height;
            end = line_idx + 1;
        }

        let band = floats.available_width(
            cursor_y,
            slice_height,
            column_width,
            column_index,
            page_number,
        );
        let column_left = paginator.column_x(column_index);
        let mut x = column_left + band.offset_x;
        match block.attrs.float_alignment {
            Some(FloatAlignment::Right) => {
                let max_line_width = max_line_width(&lines[line_idx..end]);
                x += (band.width - max_line_width).max(0.0);
            }
            Some(FloatAlignment::Center) => {
                let max_line_width = max_line_width(&lines[line_idx..end]);
                x += ((band.width - max_line_width) / 2.0).max(0.0);
            }
            Some(FloatAlignment::Left) | None => {}
        }

        // Emitted fragments never cross the content bottom; an oversize
        // forced line is clamped to the box.
        let height = slice_height.min(content_bottom - cursor_y);
        debug_assert!(cursor_y + height <= content_bottom + WIDTH_EPSILON);

        let fragment = ParaFragment {
            block_id: block.id,
            x,
            y: cursor_y,
            width: band.width,
            height,
            from_line: line_idx,
            to_line: end,
            continues_from_prev: line_idx > 0,
            continues_on_next: end < total,
            marker_width: (line_idx == 0)
                .then(|| marker.map(|m| sanitize_extent(m.marker_width)))
                .flatten(),
            marker_gutter: (line_idx == 0)
                .then(|| marker.map(|m| sanitize_extent(m.gutter_width)))
                .flatten(),
            source_start: block.source_start,
            source_end: block.source_end,
        };

        let state = paginator.ensure_page();
        state.page.push_fragment(Fragment::Paragraph(fragment));
        state.cursor_y = cursor_y + slice_height;
        line_idx = end;
    }
}

fn max_line_width(lines: &[Line]) -> f32 {
    lines.iter().map(|line| line.width).fold(0.0, f32::max)
}

/// Place a positioned frame as one fragment, bypassing the flow algorithm.
///
/// Frames with no wrap overlay the text flow and do not move the cursor.
fn place_framed_paragraph(
    paginator: &mut Paginator,
    block: &ParagraphBlock,
    measure: &ParagraphMeasure,
    frame: &FrameAttrs,
) {
    let column_width = paginator.column_width();
    let frame_width = frame
        .width_px
        .map(sanitize_extent)
        .filter(|width| *width > 0.0)
        .unwrap_or_else(|| measure.shaped_width());
    let (column_index, top_margin) = {
        let state = paginator.ensure_page();
        (state.column_index, state.top_margin)
    };
    let column_left = paginator.column_x(column_index);
    let x_offset = frame.x_px.map(sanitize_offset).unwrap_or(0.0);
    let x = match frame.x_align {
        Some(FrameXAlign::Right) => column_left + column_width - frame_width + x_offset,
        Some(FrameXAlign::Center) => column_left + (column_width - frame_width) / 2.0 + x_offset,
        Some(FrameXAlign::Left) => column_left + x_offset,
        None => column_left + x_offset,
    };
    let y = top_margin + frame.y_px.map(sanitize_offset).unwrap_or(0.0);

    let marker = measure.marker.as_ref();
    let fragment = ParaFragment {
        block_id: block.id,
        x,
        y,
        width: frame_width,
        height: measure.total_height,
        from_line: 0,
        to_line: measure.lines.len(),
        continues_from_prev: false,
        continues_on_next: false,
        marker_width: marker.map(|m| sanitize_extent(m.marker_width)),
        marker_gutter: marker.map(|m| sanitize_extent(m.gutter_width)),
        source_start: block.source_start,
        source_end: block.source_end,
    };
    let state = paginator.ensure_page();
    state.page.push_fragment(Fragment::Paragraph(fragment));
}

/// Position each not-yet-placed anchored drawing relative to the current
/// cursor, register it with the float manager, and emit its fragment.
fn place_anchored_drawings(
    paginator: &mut Paginator,
    floats: &mut FloatingObjectManager,
    anchors: &mut AnchoredDrawings,
    first_line_height: f32,
) {
    for pending in anchors.entries.iter_mut().filter(|entry| !entry.placed) {
        let (page_number, column_index, cursor_y, top_margin, content_bottom) = {
            let state = paginator.ensure_page();
            (
                state.page.number,
                state.column_index,
                state.cursor_y,
                state.top_margin,
                state.content_bottom,
            )
        };
        let margin_bottom = paginator.settings().margins.bottom_px;
        let height = sanitize_extent(pending.measure.height_px);
        let anchor = &pending.block.anchor;
        let offset_y = sanitize_offset(anchor.offset_y_px);

        let y = match anchor.v_relative_from {
            Some(VRelativeFrom::Margin) => match anchor.align_v {
                Some(AlignV::Bottom) => content_bottom - height + offset_y,
                Some(AlignV::Center) => {
                    top_margin + (content_bottom - top_margin - height) / 2.0 + offset_y
                }
                Some(AlignV::Top) | None => top_margin + offset_y,
            },
            Some(VRelativeFrom::Page) => {
                // Physical bottom/center approximated from the content
                // bottom plus the bottom margin.
                let page_bottom = content_bottom + margin_bottom;
                match anchor.align_v {
                    Some(AlignV::Bottom) => page_bottom - height + offset_y,
                    Some(AlignV::Center) => (page_bottom - height) / 2.0 + offset_y,
                    Some(AlignV::Top) | None => offset_y,
                }
            }
            // Word anchors paragraph-relative objects to the text baseline,
            // not the paragraph box top.
            Some(VRelativeFrom::Paragraph) => cursor_y + offset_y + first_line_height / 2.0,
            None => cursor_y + offset_y,
        };

        let placed = floats.register_drawing(
            &pending.block,
            &pending.measure,
            y,
            column_index,
            page_number,
        );
        let fragment = match pending.block.kind {
            DrawingKind::Image => Fragment::Image(ImageFragment {
                block_id: pending.block.id,
                x: placed.x,
                y: placed.y,
                width: placed.width,
                height: placed.height,
            }),
            DrawingKind::Drawing => Fragment::Drawing(DrawingFragment {
                block_id: pending.block.id,
                x: placed.x,
                y: placed.y,
                width: placed.width,
                height: placed.height,
            }),
        };
        paginator.ensure_page().page.push_fragment(fragment);
        pending.placed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_flow::{ListMarkerLayout, MarkerMeasure};

    fn marker_measure(marker_width: f32, gutter_width: f32) -> ParagraphMeasure {
        ParagraphMeasure {
            lines: Vec::new(),
            total_height: 0.0,
            marker: Some(MarkerMeasure {
                marker_width,
                marker_text_width: 0.0,
                gutter_width,
            }),
        }
    }

    fn indenting_attrs() -> ParagraphAttrs {
        ParagraphAttrs {
            list_marker: Some(ListMarkerLayout {
                indent_first_line: true,
                marker_box_width_px: None,
            }),
            ..ParagraphAttrs::default()
        }
    }

    #[test]
    fn hanging_markers_reserve_no_indent() {
        let attrs = ParagraphAttrs {
            list_marker: Some(ListMarkerLayout {
                indent_first_line: false,
                marker_box_width_px: Some(24.0),
            }),
            ..ParagraphAttrs::default()
        };
        assert_eq!(
            first_line_marker_indent(&attrs, &marker_measure(18.0, 6.0)),
            0.0
        );
        assert_eq!(
            first_line_marker_indent(&ParagraphAttrs::default(), &marker_measure(18.0, 6.0)),
            0.0
        );
    }

    #[test]
    fn indent_sums_marker_and_gutter() {
        assert_eq!(
            first_line_marker_indent(&indenting_attrs(), &marker_measure(18.0, 6.0)),
            24.0
        );
    }

    #[test]
    fn non_finite_marker_extents_sanitize_to_zero() {
        assert_eq!(
            first_line_marker_indent(&indenting_attrs(), &marker_measure(f32::NAN, 6.0)),
            6.0
        );
        assert_eq!(
            first_line_marker_indent(&indenting_attrs(), &marker_measure(-10.0, 6.0)),
            6.0
        );
        assert_eq!(
            first_line_marker_indent(&indenting_attrs(), &marker_measure(18.0, f32::INFINITY)),
            18.0
        );
    }

    #[test]
    fn declared_box_width_backs_a_missing_marker_measure() {
        let attrs = ParagraphAttrs {
            list_marker: Some(ListMarkerLayout {
                indent_first_line: true,
                marker_box_width_px: Some(20.0),
            }),
            ..ParagraphAttrs::default()
        };
        let measure = ParagraphMeasure::default();
        assert_eq!(first_line_marker_indent(&attrs, &measure), 20.0);
    }

    #[test]
    fn absent_marker_data_yields_zero() {
        let attrs = ParagraphAttrs {
            list_marker: Some(ListMarkerLayout {
                indent_first_line: true,
                marker_box_width_px: None,
            }),
            ..ParagraphAttrs::default()
        };
        assert_eq!(first_line_marker_indent(&attrs, &ParagraphMeasure::default()), 0.0);
    }
}
