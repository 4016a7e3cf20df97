//! Content model and boundary traits for the `doc-flow` pagination engine.
//!
//! This crate owns the immutable inputs the layout engine consumes: paragraph
//! and drawing blocks with their attributes, shaped line measures produced by
//! an external shaper, header/footer section records, and the physical page
//! description shared by pagination and section measurement. The engine
//! itself lives in `doc-flow-layout`.

#![cfg_attr(
    not(test),
    deny(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::panic_in_result_fn,
        clippy::todo,
        clippy::unimplemented
    )
)]

mod content;
mod sections;

pub use content::{
    sanitize_extent, sanitize_offset, AlignH, AlignV, AnchorSpec, BlockId, DrawingBlock,
    DrawingKind, DrawingMeasure, FloatAlignment, FrameAttrs, FrameWrap, FrameXAlign,
    HRelativeFrom, Line, ListMarkerLayout, MarkerMeasure, ParagraphAttrs, ParagraphBlock,
    ParagraphIndent, ParagraphMeasure, ParagraphShaper, ParagraphSpacing, TextRun, VRelativeFrom,
};
pub use sections::{
    ColumnSettings, DefaultFontMetrics, HeaderFooterRecord, HeaderFooterSource, PageMargins,
    PageSettings, SectionRole,
};
