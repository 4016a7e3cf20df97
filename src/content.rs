use serde::{Deserialize, Serialize};

/// Stable identifier for a content block.
pub type BlockId = u64;

/// Clamp a style-provided extent: non-finite or negative values become 0.
///
/// Malformed per-document styling must never abort pagination, so widths and
/// spacings are sanitized at the point of use instead of rejected.
pub fn sanitize_extent(value: f32) -> f32 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        log::debug!("extent {value} sanitized to 0");
        0.0
    }
}

/// Clamp a style-provided offset: non-finite values become 0.
///
/// Offsets may legitimately be negative (objects nudged above their anchor),
/// so only non-finite inputs are dropped.
pub fn sanitize_offset(value: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        log::debug!("offset {value} sanitized to 0");
        0.0
    }
}

/// One styled text run inside a paragraph block.
///
/// Run internals are opaque to layout; only the external shaper reads them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    /// Raw run text.
    pub text: String,
    /// Character-style identifier understood by the shaper.
    pub style_id: Option<String>,
}

/// Vertical spacing requested around a paragraph, px.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ParagraphSpacing {
    pub before_px: f32,
    pub after_px: f32,
    /// Suppress inter-paragraph spacing between same-style neighbors.
    pub contextual: bool,
}

/// Horizontal indents consumed by the shaper, px.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ParagraphIndent {
    pub left_px: f32,
    pub right_px: f32,
    pub first_line_px: f32,
}

/// Alignment override applied to float-narrowed fragments.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FloatAlignment {
    Left,
    Right,
    Center,
}

/// Horizontal placement of a positioned frame within its column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameXAlign {
    Left,
    Right,
    Center,
}

/// Text-wrap mode for a positioned frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameWrap {
    /// Frame floats over the text flow; placement bypasses the flow layouter.
    None,
    /// Text wraps around the frame.
    Around,
}

/// Positioned-paragraph ("frame") descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameAttrs {
    pub wrap: FrameWrap,
    pub x_align: Option<FrameXAlign>,
    /// Raw horizontal offset from the alignment base, px.
    pub x_px: Option<f32>,
    /// Raw vertical offset from the content-area top, px.
    pub y_px: Option<f32>,
    /// Explicit frame width; the shaped width is used when absent.
    pub width_px: Option<f32>,
}

/// List-marker layout mode for a paragraph's first line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ListMarkerLayout {
    /// Marker and gutter consume first-line flow width when set; hanging
    /// markers reserve none.
    pub indent_first_line: bool,
    /// Declared marker box width, used when the shaper reports no marker
    /// width, px.
    pub marker_box_width_px: Option<f32>,
}

/// Paragraph-level attributes carried on a block.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ParagraphAttrs {
    /// Paragraph style identifier; drives contextual-spacing collapse.
    pub style_id: Option<String>,
    pub spacing: ParagraphSpacing,
    pub indent: ParagraphIndent,
    /// Alignment override for float-narrowed fragments.
    pub float_alignment: Option<FloatAlignment>,
    /// Positioned-paragraph descriptor.
    pub frame: Option<FrameAttrs>,
    /// List-marker layout mode.
    pub list_marker: Option<ListMarkerLayout>,
}

/// Immutable paragraph content descriptor.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ParagraphBlock {
    pub id: BlockId,
    pub runs: Vec<TextRun>,
    pub attrs: ParagraphAttrs,
    /// Absolute source-document range this block covers, for the editing
    /// layer's back-references.
    pub source_start: Option<usize>,
    pub source_end: Option<usize>,
}

/// Kind of an anchored object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrawingKind {
    Image,
    Drawing,
}

/// Horizontal anchor base for a floating object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HRelativeFrom {
    Page,
    Margin,
    Column,
}

/// Vertical anchor base for a floating object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VRelativeFrom {
    Page,
    Margin,
    /// Relative to the anchoring paragraph's text baseline, not its box top.
    Paragraph,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlignH {
    Left,
    Right,
    Center,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlignV {
    Top,
    Bottom,
    Center,
}

/// Anchor placement for a floating image or drawing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AnchorSpec {
    pub h_relative_from: Option<HRelativeFrom>,
    pub align_h: Option<AlignH>,
    pub offset_x_px: f32,
    pub v_relative_from: Option<VRelativeFrom>,
    pub align_v: Option<AlignV>,
    pub offset_y_px: f32,
    /// Clearance kept between the object and wrapped text, px.
    pub wrap_distance_px: f32,
}

impl Default for DrawingKind {
    fn default() -> Self {
        Self::Image
    }
}

/// Immutable anchored-object descriptor.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DrawingBlock {
    pub id: BlockId,
    pub kind: DrawingKind,
    pub anchor: AnchorSpec,
}

/// Intrinsic extent of an anchored object, px.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DrawingMeasure {
    pub width_px: f32,
    pub height_px: f32,
}

/// One shaped text line; immutable once produced by the shaper.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Line {
    /// First run index covered by this line.
    pub from_run: usize,
    /// Offset of the first character within `from_run`.
    pub from_char: usize,
    /// Last run index covered by this line.
    pub to_run: usize,
    /// Offset one past the last character within `to_run`.
    pub to_char: usize,
    /// Advance width of the shaped content, px.
    pub width: f32,
    pub ascent: f32,
    pub descent: f32,
    /// Full vertical extent the line occupies, px.
    pub line_height: f32,
    /// Width the line was shaped against, px.
    pub max_width: f32,
}

/// Marker extents reported by the shaper for a list paragraph.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkerMeasure {
    /// Full marker box width, px.
    pub marker_width: f32,
    /// Width of the marker text alone, px.
    pub marker_text_width: f32,
    /// Gap between the marker box and the first text glyph, px.
    pub gutter_width: f32,
}

/// Output of shaping a paragraph at a given width.
///
/// Re-created by the shaper whenever remeasurement is required; never
/// mutated in place. Lines are in reading order and do not overlap.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ParagraphMeasure {
    pub lines: Vec<Line>,
    /// Sum of the line heights, px.
    pub total_height: f32,
    pub marker: Option<MarkerMeasure>,
}

impl ParagraphMeasure {
    /// Width this measure was shaped against: the widest per-line target.
    pub fn shaped_width(&self) -> f32 {
        self.lines
            .iter()
            .map(|line| line.max_width)
            .fold(0.0, f32::max)
    }

    /// Height of the first shaped line, 0 for an empty measure.
    pub fn first_line_height(&self) -> f32 {
        self.lines.first().map_or(0.0, |line| line.line_height)
    }
}

/// External shaping callback.
///
/// Internals (font metrics, line breaking) are opaque to layout. The flow
/// layouter invokes this at most twice per paragraph per pass: once for a
/// column-width change and once for float narrowing.
pub trait ParagraphShaper {
    /// Shape `block` at `max_width`, reserving `first_line_indent` on the
    /// first line.
    fn shape(
        &self,
        block: &ParagraphBlock,
        max_width: f32,
        first_line_indent: f32,
    ) -> ParagraphMeasure;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_extent_drops_non_finite_and_negative() {
        assert_eq!(sanitize_extent(18.0), 18.0);
        assert_eq!(sanitize_extent(0.0), 0.0);
        assert_eq!(sanitize_extent(-10.0), 0.0);
        assert_eq!(sanitize_extent(f32::NAN), 0.0);
        assert_eq!(sanitize_extent(f32::INFINITY), 0.0);
    }

    #[test]
    fn sanitize_offset_keeps_negative_values() {
        assert_eq!(sanitize_offset(-24.0), -24.0);
        assert_eq!(sanitize_offset(12.5), 12.5);
        assert_eq!(sanitize_offset(f32::NAN), 0.0);
        assert_eq!(sanitize_offset(f32::NEG_INFINITY), 0.0);
    }

    #[test]
    fn shaped_width_is_widest_line_target() {
        let measure = ParagraphMeasure {
            lines: vec![
                Line {
                    max_width: 150.0,
                    line_height: 18.0,
                    ..Line::default()
                },
                Line {
                    max_width: 120.0,
                    line_height: 18.0,
                    ..Line::default()
                },
            ],
            total_height: 36.0,
            marker: None,
        };
        assert_eq!(measure.shaped_width(), 150.0);
        assert_eq!(measure.first_line_height(), 18.0);
    }

    #[test]
    fn empty_measure_reports_zero_extents() {
        let measure = ParagraphMeasure::default();
        assert_eq!(measure.shaped_width(), 0.0);
        assert_eq!(measure.first_line_height(), 0.0);
    }
}
