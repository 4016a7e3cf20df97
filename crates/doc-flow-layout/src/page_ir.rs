use doc_flow::BlockId;

/// One placed, renderable piece of a content block.
///
/// The three shapes are the sole contract with the renderer; consumers
/// dispatch on the variant, never on field presence.
#[derive(Clone, Debug, PartialEq)]
pub enum Fragment {
    /// Placed slice of a paragraph's shaped lines.
    Paragraph(ParaFragment),
    /// Placed anchored image.
    Image(ImageFragment),
    /// Placed anchored vector drawing.
    Drawing(DrawingFragment),
}

impl Fragment {
    /// Source block this fragment renders.
    pub fn block_id(&self) -> BlockId {
        match self {
            Self::Paragraph(frag) => frag.block_id,
            Self::Image(frag) => frag.block_id,
            Self::Drawing(frag) => frag.block_id,
        }
    }

    /// Top-left position on the page.
    pub fn position(&self) -> (f32, f32) {
        match self {
            Self::Paragraph(frag) => (frag.x, frag.y),
            Self::Image(frag) => (frag.x, frag.y),
            Self::Drawing(frag) => (frag.x, frag.y),
        }
    }

    /// Vertical extent, px.
    pub fn height(&self) -> f32 {
        match self {
            Self::Paragraph(frag) => frag.height,
            Self::Image(frag) => frag.height,
            Self::Drawing(frag) => frag.height,
        }
    }
}

/// Placed slice of a paragraph.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParaFragment {
    pub block_id: BlockId,
    pub x: f32,
    pub y: f32,
    /// Effective text width: column width minus any float narrowing, px.
    pub width: f32,
    pub height: f32,
    /// First shaped line included (inclusive).
    pub from_line: usize,
    /// One past the last shaped line included.
    pub to_line: usize,
    /// Earlier lines of this paragraph were placed on a previous page/column.
    pub continues_from_prev: bool,
    /// Later lines of this paragraph continue on a following page/column.
    pub continues_on_next: bool,
    /// Marker box width, carried on the paragraph's first fragment only, px.
    pub marker_width: Option<f32>,
    /// Marker gutter width, carried on the paragraph's first fragment only, px.
    pub marker_gutter: Option<f32>,
    /// Source-range back-references for the editing layer.
    pub source_start: Option<usize>,
    pub source_end: Option<usize>,
}

/// Placed anchored image.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ImageFragment {
    pub block_id: BlockId,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Placed anchored vector drawing.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DrawingFragment {
    pub block_id: BlockId,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Per-page summary for navigation/progress consumers.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PageMetrics {
    pub fragment_count: usize,
    /// Lowest fragment bottom edge on the page, px.
    pub content_extent_px: f32,
}

/// One laid-out page.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Page {
    /// 1-based page number.
    pub number: usize,
    pub fragments: Vec<Fragment>,
}

impl Page {
    const INITIAL_FRAGMENT_CAPACITY: usize = 8;

    /// Create an empty page.
    pub fn new(number: usize) -> Self {
        Self {
            number,
            // Keep the fragment vector lazy so advanced-past empty pages
            // avoid baseline heap traffic.
            fragments: Vec::with_capacity(0),
        }
    }

    /// Append a placed fragment.
    pub fn push_fragment(&mut self, fragment: Fragment) {
        if self.fragments.capacity() == 0 {
            self.fragments.reserve(Self::INITIAL_FRAGMENT_CAPACITY);
        }
        self.fragments.push(fragment);
    }

    /// Summarize the page for progress consumers.
    pub fn metrics(&self) -> PageMetrics {
        let content_extent_px = self
            .fragments
            .iter()
            .map(|fragment| {
                let (_, y) = fragment.position();
                y + fragment.height()
            })
            .fold(0.0, f32::max);
        PageMetrics {
            fragment_count: self.fragments.len(),
            content_extent_px,
        }
    }
}
