//! Fragment IR, pagination, and header/footer measurement for `doc-flow`.

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

mod float_objects;
mod flow_layout;
mod measure_engine;
mod page_ir;
mod paginator;
mod variant_resolver;

pub use float_objects::{
    BandAvailability, FloatingObjectManager, PlacedObject, RegisteredDrawing,
};
pub use flow_layout::{
    first_line_marker_indent, layout_paragraph_block, AnchoredDrawings, FlowContext,
};
pub use measure_engine::{
    estimate_section_height, measure_header_footer_sections, measure_section,
    MeasurementHost, MeasurementSummary, ProbeTeardownError, SectionMeasureCache,
    SectionMetrics, SectionProbe, VariantLookup, MAX_MEASURE_ATTEMPTS,
};
pub use page_ir::{
    DrawingFragment, Fragment, ImageFragment, Page, PageMetrics, ParaFragment,
};
pub use paginator::{PageReserveResolver, PageState, Paginator};
pub use variant_resolver::{
    resolve_header_footer_for_page, MeasuredPageReserve, PageChromeResolution, ResolvedSection,
};
