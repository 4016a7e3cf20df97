use doc_flow::{
    sanitize_extent, sanitize_offset, AlignH, AnchorSpec, BlockId, DrawingBlock, DrawingKind,
    DrawingMeasure, HRelativeFrom, PageSettings,
};

/// Which side of the column an anchored object occupies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FloatSide {
    Left,
    Right,
}

#[derive(Clone, Debug)]
struct FloatEntry {
    block_id: BlockId,
    kind: DrawingKind,
    page_number: usize,
    column_index: usize,
    side: FloatSide,
    /// Left edge relative to the column's left edge, px.
    x_in_column: f32,
    anchor_y: f32,
    width: f32,
    height: f32,
    wrap_distance: f32,
}

/// Resolved placement returned by [`FloatingObjectManager::register_drawing`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacedObject {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Usable width and left offset for text flowing through a band.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BandAvailability {
    pub width: f32,
    pub offset_x: f32,
}

/// Registered-drawing summary exposed for inspection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RegisteredDrawing {
    pub block_id: BlockId,
    pub kind: DrawingKind,
    pub page_number: usize,
    pub column_index: usize,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Per-page registry of anchored drawings and the widths they leave for text.
///
/// Callers never iterate the registry during layout; they ask what width and
/// left offset a vertical band has on a given page/column.
#[derive(Debug)]
pub struct FloatingObjectManager {
    settings: PageSettings,
    entries: Vec<FloatEntry>,
}

impl FloatingObjectManager {
    /// Create an empty registry over the given page geometry.
    pub fn new(settings: PageSettings) -> Self {
        Self {
            settings,
            entries: Vec::new(),
        }
    }

    /// Record an anchored object's occupied band and resolve its position.
    pub fn register_drawing(
        &mut self,
        block: &DrawingBlock,
        measure: &DrawingMeasure,
        anchor_y: f32,
        column_index: usize,
        page_number: usize,
    ) -> PlacedObject {
        let width = sanitize_extent(measure.width_px);
        let height = sanitize_extent(measure.height_px);
        let x = self.compute_anchor_x(&block.anchor, column_index, width);
        let column_left = self.settings.column_x(column_index);
        let column_width = self.settings.column_width();
        let x_in_column = x - column_left;
        // An object whose center sits in the right half of the column pushes
        // text leftward; everything else narrows from the left.
        let side = if x_in_column + width / 2.0 > column_width / 2.0 {
            FloatSide::Right
        } else {
            FloatSide::Left
        };
        log::debug!(
            "drawing {} registered on page {} column {} at ({:.1}, {:.1}) side {:?}",
            block.id,
            page_number,
            column_index,
            x,
            anchor_y,
            side
        );
        self.entries.push(FloatEntry {
            block_id: block.id,
            kind: block.kind,
            page_number,
            column_index,
            side,
            x_in_column,
            anchor_y,
            width,
            height,
            wrap_distance: sanitize_extent(block.anchor.wrap_distance_px),
        });
        PlacedObject {
            x,
            y: anchor_y,
            width,
            height,
        }
    }

    /// Usable width and left offset for text flowing through
    /// `[band_y, band_y + band_height)` on the given page/column.
    pub fn available_width(
        &self,
        band_y: f32,
        band_height: f32,
        column_width: f32,
        column_index: usize,
        page_number: usize,
    ) -> BandAvailability {
        let mut left_edge = 0.0f32;
        let mut right_edge = column_width;
        for entry in &self.entries {
            if entry.page_number != page_number || entry.column_index != column_index {
                continue;
            }
            if entry.anchor_y >= band_y + band_height || entry.anchor_y + entry.height <= band_y {
                continue;
            }
            match entry.side {
                FloatSide::Left => {
                    left_edge =
                        left_edge.max(entry.x_in_column + entry.width + entry.wrap_distance);
                }
                FloatSide::Right => {
                    right_edge = right_edge.min(entry.x_in_column - entry.wrap_distance);
                }
            }
        }
        BandAvailability {
            width: (right_edge - left_edge).max(0.0),
            offset_x: left_edge.min(column_width),
        }
    }

    /// Resolve an anchor's horizontal position against page/margin/column
    /// geometry.
    pub fn compute_anchor_x(
        &self,
        anchor: &AnchorSpec,
        column_index: usize,
        object_width: f32,
    ) -> f32 {
        let settings = &self.settings;
        let (base_left, base_width) = match anchor.h_relative_from {
            Some(HRelativeFrom::Page) => (0.0, settings.page_width_px),
            Some(HRelativeFrom::Margin) => (settings.margins.left_px, settings.content_width()),
            Some(HRelativeFrom::Column) | None => (
                settings.column_x(column_index),
                settings.column_width(),
            ),
        };
        let offset = sanitize_offset(anchor.offset_x_px);
        match anchor.align_h {
            Some(AlignH::Right) => base_left + base_width - object_width + offset,
            Some(AlignH::Center) => base_left + (base_width - object_width) / 2.0 + offset,
            Some(AlignH::Left) | None => base_left + offset,
        }
    }

    /// Drop all registered objects for a document rebuild.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Inspection surface: registered drawings on one page, in registration
    /// order.
    pub fn drawings_for_page(&self, page_number: usize) -> Vec<RegisteredDrawing> {
        self.entries
            .iter()
            .filter(|entry| entry.page_number == page_number)
            .map(|entry| RegisteredDrawing {
                block_id: entry.block_id,
                kind: entry.kind,
                page_number: entry.page_number,
                column_index: entry.column_index,
                x: self.settings.column_x(entry.column_index) + entry.x_in_column,
                y: entry.anchor_y,
                width: entry.width,
                height: entry.height,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_flow::{ColumnSettings, PageMargins};

    fn settings() -> PageSettings {
        PageSettings {
            page_width_px: 400.0,
            page_height_px: 600.0,
            margins: PageMargins::uniform(50.0),
            columns: ColumnSettings {
                count: 1,
                gap_px: 0.0,
            },
            ..PageSettings::default()
        }
    }

    fn drawing(id: BlockId, anchor: AnchorSpec) -> DrawingBlock {
        DrawingBlock {
            id,
            kind: DrawingKind::Image,
            anchor,
        }
    }

    fn left_anchor() -> AnchorSpec {
        AnchorSpec {
            h_relative_from: Some(HRelativeFrom::Column),
            align_h: Some(AlignH::Left),
            ..AnchorSpec::default()
        }
    }

    fn right_anchor() -> AnchorSpec {
        AnchorSpec {
            h_relative_from: Some(HRelativeFrom::Column),
            align_h: Some(AlignH::Right),
            ..AnchorSpec::default()
        }
    }

    #[test]
    fn left_float_narrows_from_the_left_with_offset() {
        let mut floats = FloatingObjectManager::new(settings());
        floats.register_drawing(
            &drawing(1, left_anchor()),
            &DrawingMeasure {
                width_px: 80.0,
                height_px: 100.0,
            },
            100.0,
            0,
            1,
        );
        let band = floats.available_width(120.0, 20.0, 300.0, 0, 1);
        assert_eq!(band.offset_x, 80.0);
        assert_eq!(band.width, 220.0);
    }

    #[test]
    fn right_float_narrows_from_the_right() {
        let mut floats = FloatingObjectManager::new(settings());
        floats.register_drawing(
            &drawing(1, right_anchor()),
            &DrawingMeasure {
                width_px: 60.0,
                height_px: 100.0,
            },
            100.0,
            0,
            1,
        );
        let band = floats.available_width(100.0, 50.0, 300.0, 0, 1);
        assert_eq!(band.offset_x, 0.0);
        assert_eq!(band.width, 240.0);
    }

    #[test]
    fn opposing_floats_narrow_both_sides() {
        let mut floats = FloatingObjectManager::new(settings());
        floats.register_drawing(
            &drawing(1, left_anchor()),
            &DrawingMeasure {
                width_px: 100.0,
                height_px: 80.0,
            },
            0.0,
            0,
            1,
        );
        floats.register_drawing(
            &drawing(2, right_anchor()),
            &DrawingMeasure {
                width_px: 80.0,
                height_px: 80.0,
            },
            0.0,
            0,
            1,
        );
        let band = floats.available_width(10.0, 20.0, 300.0, 0, 1);
        assert_eq!(band.offset_x, 100.0);
        assert_eq!(band.width, 120.0);
    }

    #[test]
    fn wrap_distance_pads_the_text_side() {
        let mut floats = FloatingObjectManager::new(settings());
        let mut anchor = left_anchor();
        anchor.wrap_distance_px = 12.0;
        floats.register_drawing(
            &drawing(1, anchor),
            &DrawingMeasure {
                width_px: 50.0,
                height_px: 40.0,
            },
            0.0,
            0,
            1,
        );
        let band = floats.available_width(0.0, 40.0, 300.0, 0, 1);
        assert_eq!(band.offset_x, 62.0);
        assert_eq!(band.width, 238.0);
    }

    #[test]
    fn bands_outside_the_float_are_untouched() {
        let mut floats = FloatingObjectManager::new(settings());
        floats.register_drawing(
            &drawing(1, left_anchor()),
            &DrawingMeasure {
                width_px: 80.0,
                height_px: 50.0,
            },
            100.0,
            0,
            1,
        );
        let above = floats.available_width(0.0, 100.0, 300.0, 0, 1);
        assert_eq!(above.width, 300.0);
        let below = floats.available_width(150.0, 40.0, 300.0, 0, 1);
        assert_eq!(below.width, 300.0);
        let other_page = floats.available_width(100.0, 40.0, 300.0, 0, 2);
        assert_eq!(other_page.width, 300.0);
        let other_column = floats.available_width(100.0, 40.0, 300.0, 1, 1);
        assert_eq!(other_column.width, 300.0);
    }

    #[test]
    fn anchor_x_resolves_against_each_base() {
        let floats = FloatingObjectManager::new(settings());
        let page_right = AnchorSpec {
            h_relative_from: Some(HRelativeFrom::Page),
            align_h: Some(AlignH::Right),
            ..AnchorSpec::default()
        };
        assert_eq!(floats.compute_anchor_x(&page_right, 0, 40.0), 360.0);
        let margin_center = AnchorSpec {
            h_relative_from: Some(HRelativeFrom::Margin),
            align_h: Some(AlignH::Center),
            ..AnchorSpec::default()
        };
        assert_eq!(floats.compute_anchor_x(&margin_center, 0, 100.0), 150.0);
        let column_offset = AnchorSpec {
            h_relative_from: Some(HRelativeFrom::Column),
            align_h: None,
            offset_x_px: 25.0,
            ..AnchorSpec::default()
        };
        assert_eq!(floats.compute_anchor_x(&column_offset, 0, 40.0), 75.0);
    }

    #[test]
    fn non_finite_geometry_is_sanitized() {
        let mut floats = FloatingObjectManager::new(settings());
        let mut anchor = left_anchor();
        anchor.offset_x_px = f32::NAN;
        anchor.wrap_distance_px = f32::NEG_INFINITY;
        let placed = floats.register_drawing(
            &drawing(1, anchor),
            &DrawingMeasure {
                width_px: f32::NAN,
                height_px: -5.0,
            },
            0.0,
            0,
            1,
        );
        assert_eq!(placed.x, 50.0);
        assert_eq!(placed.width, 0.0);
        assert_eq!(placed.height, 0.0);
    }

    #[test]
    fn clear_and_inspection_roundtrip() {
        let mut floats = FloatingObjectManager::new(settings());
        floats.register_drawing(
            &drawing(9, left_anchor()),
            &DrawingMeasure {
                width_px: 30.0,
                height_px: 30.0,
            },
            75.0,
            0,
            2,
        );
        let drawings = floats.drawings_for_page(2);
        assert_eq!(drawings.len(), 1);
        assert_eq!(drawings[0].block_id, 9);
        assert_eq!(drawings[0].y, 75.0);
        assert!(floats.drawings_for_page(1).is_empty());
        floats.clear();
        assert!(floats.drawings_for_page(2).is_empty());
    }
}
