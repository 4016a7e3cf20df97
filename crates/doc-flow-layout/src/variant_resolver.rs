use std::collections::HashMap;

use smallvec::SmallVec;

use doc_flow::SectionRole;

use crate::measure_engine::{MeasurementSummary, SectionMetrics, VariantLookup};
use crate::paginator::PageReserveResolver;

/// One side of a page's resolved chrome.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedSection {
    pub record_id: String,
    /// Cached metrics for the record; absent when the record was never
    /// measured.
    pub metrics: Option<SectionMetrics>,
}

impl ResolvedSection {
    /// Height the page reserves for this section, px.
    pub fn height_px(&self) -> f32 {
        self.metrics.map_or(0.0, |metrics| metrics.effective_height_px)
    }
}

/// Header/footer resolution for one page.
///
/// Either side may be absent: the page then reserves no space for that role.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PageChromeResolution {
    pub header: Option<ResolvedSection>,
    pub footer: Option<ResolvedSection>,
}

/// Candidate variant names for a page, in strict precedence order.
///
/// Parity is checked before `last`, matching observed product behavior: a
/// page that is both odd and last resolves to `odd` when both variants
/// exist.
fn candidate_variants(page_index: usize, is_last_page: bool) -> SmallVec<[&'static str; 5]> {
    let mut candidates = SmallVec::new();
    if page_index == 0 {
        candidates.push("first");
        candidates.push("titlePg");
    }
    candidates.push(if (page_index + 1) % 2 == 0 { "even" } else { "odd" });
    if is_last_page {
        candidates.push("last");
    }
    candidates.push("default");
    candidates
}

fn resolve_side(
    lookup: &VariantLookup,
    metrics_by_id: &HashMap<String, SectionMetrics>,
    role: SectionRole,
    candidates: &[&str],
) -> Option<ResolvedSection> {
    for candidate in candidates {
        if let Some(record_id) = lookup.record_for(role, candidate) {
            return Some(ResolvedSection {
                record_id: record_id.to_string(),
                metrics: metrics_by_id.get(record_id).copied(),
            });
        }
    }
    None
}

/// Resolve which header and footer sections apply to one page.
///
/// Each side resolves independently; a page may use a `first` header with a
/// `default` footer.
pub fn resolve_header_footer_for_page(
    lookup: &VariantLookup,
    metrics_by_id: &HashMap<String, SectionMetrics>,
    page_index: usize,
    is_last_page: bool,
) -> PageChromeResolution {
    let candidates = candidate_variants(page_index, is_last_page);
    PageChromeResolution {
        header: resolve_side(lookup, metrics_by_id, SectionRole::Header, &candidates),
        footer: resolve_side(lookup, metrics_by_id, SectionRole::Footer, &candidates),
    }
}

/// Adapts a measurement pass into the paginator's per-page reserve hook.
///
/// Incremental layout cannot know the final page count, so reserves resolve
/// with `is_last_page = false`; callers re-resolve final chrome per page
/// once the pass has finished.
#[derive(Clone, Debug)]
pub struct MeasuredPageReserve {
    summary: MeasurementSummary,
}

impl MeasuredPageReserve {
    pub fn new(summary: MeasurementSummary) -> Self {
        Self { summary }
    }

    /// The underlying measurement pass.
    pub fn summary(&self) -> &MeasurementSummary {
        &self.summary
    }

    fn side_height(&self, role: SectionRole, page_index: usize) -> f32 {
        let candidates = candidate_variants(page_index, false);
        resolve_side(
            &self.summary.variants,
            &self.summary.metrics_by_id,
            role,
            &candidates,
        )
        .map_or(0.0, |section| section.height_px())
    }
}

impl PageReserveResolver for MeasuredPageReserve {
    fn header_reserve_px(&self, page_index: usize) -> f32 {
        self.side_height(SectionRole::Header, page_index)
    }

    fn footer_reserve_px(&self, page_index: usize) -> f32 {
        self.side_height(SectionRole::Footer, page_index)
    }
}
