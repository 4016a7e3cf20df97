use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::content::sanitize_extent;

/// Role of a header/footer section record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SectionRole {
    Header,
    Footer,
}

/// One header or footer section owned by the external repository.
///
/// Read-only to this core; the repository decides identity and variant
/// membership, the measurement engine only derives heights from it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeaderFooterRecord {
    /// Stable record identifier.
    pub id: String,
    pub role: SectionRole,
    /// Section content as the editor's JSON document.
    pub content: Value,
    /// Variant names this record serves (`first`, `even`, `default`, ...).
    pub variants: Vec<String>,
}

/// Read-only source of header/footer records.
pub trait HeaderFooterSource {
    /// List records of one role, in document order.
    fn list(&self, role: SectionRole) -> Vec<HeaderFooterRecord>;
}

/// Page margins, px.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PageMargins {
    pub left_px: f32,
    pub right_px: f32,
    pub top_px: f32,
    pub bottom_px: f32,
}

impl PageMargins {
    /// Uniform margins on all four sides.
    pub fn uniform(px: f32) -> Self {
        Self {
            left_px: px,
            right_px: px,
            top_px: px,
            bottom_px: px,
        }
    }
}

impl Default for PageMargins {
    fn default() -> Self {
        Self::uniform(96.0)
    }
}

/// Column arrangement for body text.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnSettings {
    pub count: usize,
    /// Gap between adjacent columns, px.
    pub gap_px: f32,
}

impl Default for ColumnSettings {
    fn default() -> Self {
        Self {
            count: 1,
            gap_px: 48.0,
        }
    }
}

/// Default font metrics used for text-based height estimates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DefaultFontMetrics {
    pub font_size_px: f32,
    /// Line-height multiplier.
    pub line_height: f32,
    /// Average glyph advance as a fraction of the font size.
    pub avg_char_width_ratio: f32,
}

impl Default for DefaultFontMetrics {
    fn default() -> Self {
        Self {
            font_size_px: 16.0,
            line_height: 1.2,
            avg_char_width_ratio: 0.5,
        }
    }
}

/// Physical page description shared by pagination and section measurement.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PageSettings {
    pub page_width_px: f32,
    pub page_height_px: f32,
    pub margins: PageMargins,
    pub columns: ColumnSettings,
    /// Header-to-content distance from document page settings, px.
    pub header_distance_px: Option<f32>,
    /// Footer-to-content distance from document page settings, px.
    pub footer_distance_px: Option<f32>,
    pub default_font: DefaultFontMetrics,
}

impl PageSettings {
    /// Width of the content area between the side margins.
    pub fn content_width(&self) -> f32 {
        (self.page_width_px - self.margins.left_px - self.margins.right_px).max(1.0)
    }

    /// Width of one body-text column.
    pub fn column_width(&self) -> f32 {
        let count = self.columns.count.max(1);
        let gaps = sanitize_extent(self.columns.gap_px) * (count - 1) as f32;
        ((self.content_width() - gaps) / count as f32).max(1.0)
    }

    /// Left edge of the column at `index`.
    pub fn column_x(&self, index: usize) -> f32 {
        let step = self.column_width() + sanitize_extent(self.columns.gap_px);
        self.margins.left_px + step * index as f32
    }

    /// Top of the content area before header reservation.
    pub fn content_top(&self) -> f32 {
        self.margins.top_px
    }

    /// Bottom of the content area before footer reservation.
    pub fn content_bottom(&self) -> f32 {
        self.page_height_px - self.margins.bottom_px
    }
}

impl Default for PageSettings {
    fn default() -> Self {
        // US Letter at 96 dpi.
        Self {
            page_width_px: 816.0,
            page_height_px: 1056.0,
            margins: PageMargins::default(),
            columns: ColumnSettings::default(),
            header_distance_px: None,
            footer_distance_px: None,
            default_font: DefaultFontMetrics::default(),
        }
    }
}
