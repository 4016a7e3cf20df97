use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::OnceCell;

use doc_flow::{
    sanitize_extent, DefaultFontMetrics, HeaderFooterRecord, HeaderFooterSource, PageSettings,
    SectionRole,
};

/// Bounded number of frame polls before falling back to the text estimate.
pub const MAX_MEASURE_ATTEMPTS: usize = 20;

/// Teardown failure reported by a probe; always swallowed by the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProbeTeardownError {
    pub reason: String,
}

impl core::fmt::Display for ProbeTeardownError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "section probe teardown failed: {}", self.reason)
    }
}

impl std::error::Error for ProbeTeardownError {}

/// Off-screen probe holding a mounted section during measurement.
pub trait SectionProbe {
    /// Current measured content height; zero until the host converges.
    fn content_height_px(&self) -> f32;

    /// True while images, media, or fonts inside the section are still
    /// loading.
    fn resources_pending(&self) -> bool;

    /// Release the off-screen container and its editor instance.
    ///
    /// Invoked exactly once per measurement, on every exit path.
    fn teardown(&mut self) -> Result<(), ProbeTeardownError>;
}

/// Host environment able to mount section content off-screen.
pub trait MeasurementHost {
    type Probe: SectionProbe;

    /// Mount `content` in a non-interactive container at `width_px`.
    ///
    /// `None` means the environment cannot render at all; the measurement
    /// resolves to nothing rather than erroring.
    fn mount(&self, content: &Value, width_px: f32) -> Option<Self::Probe>;

    /// Wait for the host's next redraw/animation frame.
    fn next_frame(&self) -> impl Future<Output = ()> + Send;
}

/// Guarantees teardown runs exactly once across all exit paths.
struct ProbeGuard<P: SectionProbe> {
    probe: P,
    torn_down: bool,
}

impl<P: SectionProbe> ProbeGuard<P> {
    fn new(probe: P) -> Self {
        Self {
            probe,
            torn_down: false,
        }
    }

    fn probe(&self) -> &P {
        &self.probe
    }

    fn finish(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        if let Err(err) = self.probe.teardown() {
            log::warn!("{err}");
        }
    }
}

impl<P: SectionProbe> Drop for ProbeGuard<P> {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Measure one section record's rendered height at `width_px`.
///
/// Polls the probe across host frames until a non-zero height is observed
/// with no resources pending, bounded at [`MAX_MEASURE_ATTEMPTS`]; an
/// exhausted budget falls back to the text estimate so a stalled host never
/// hangs page layout. Resolves `None` when the content or environment is
/// unusable.
pub async fn measure_section<H: MeasurementHost>(
    host: &H,
    record: &HeaderFooterRecord,
    width_px: f32,
    font: &DefaultFontMetrics,
) -> Option<f32> {
    if record.content.is_null() {
        return None;
    }
    let probe = host.mount(&record.content, width_px)?;
    let mut guard = ProbeGuard::new(probe);
    for _ in 0..MAX_MEASURE_ATTEMPTS {
        let height = guard.probe().content_height_px();
        if height > 0.0 && !guard.probe().resources_pending() {
            guard.finish();
            return Some(height);
        }
        host.next_frame().await;
    }
    guard.finish();
    log::debug!(
        "section {} never converged; using text estimate",
        record.id
    );
    estimate_section_height(&record.content, width_px, font)
}

/// Text-based height estimate used when off-screen measurement never
/// settles.
///
/// Counts wrapped lines per paragraph/heading from character totals at the
/// document's average glyph width, plus one line per hard break.
pub fn estimate_section_height(
    content: &Value,
    width_px: f32,
    font: &DefaultFontMetrics,
) -> Option<f32> {
    let char_width = (font.font_size_px * font.avg_char_width_ratio).max(1.0);
    let chars_per_line = (width_px / char_width).floor().max(1.0) as usize;
    let mut total_lines = 0usize;
    collect_block_lines(content, chars_per_line, &mut total_lines);
    if total_lines == 0 {
        return None;
    }
    Some(total_lines as f32 * font.font_size_px * font.line_height)
}

fn collect_block_lines(node: &Value, chars_per_line: usize, total_lines: &mut usize) {
    let Some(object) = node.as_object() else {
        if let Some(items) = node.as_array() {
            for item in items {
                collect_block_lines(item, chars_per_line, total_lines);
            }
        }
        return;
    };
    let node_type = object.get("type").and_then(Value::as_str).unwrap_or("");
    if node_type == "paragraph" || node_type == "heading" {
        let (chars, hard_breaks) = text_stats(node);
        *total_lines += chars.div_ceil(chars_per_line).max(1) + hard_breaks;
        return;
    }
    if let Some(children) = object.get("content") {
        collect_block_lines(children, chars_per_line, total_lines);
    }
}

fn text_stats(node: &Value) -> (usize, usize) {
    let mut chars = 0usize;
    let mut hard_breaks = 0usize;
    walk_text(node, &mut chars, &mut hard_breaks);
    (chars, hard_breaks)
}

fn walk_text(node: &Value, chars: &mut usize, hard_breaks: &mut usize) {
    match node {
        Value::Object(object) => {
            if object.get("type").and_then(Value::as_str) == Some("hardBreak") {
                *hard_breaks += 1;
            }
            if let Some(text) = object.get("text").and_then(Value::as_str) {
                *chars += text.chars().count();
            }
            if let Some(children) = object.get("content") {
                walk_text(children, chars, hard_breaks);
            }
        }
        Value::Array(items) => {
            for item in items {
                walk_text(item, chars, hard_breaks);
            }
        }
        _ => {}
    }
}

/// Coalesces concurrent measurements of one section id.
///
/// Concurrent callers for the same id await a single in-flight measurement;
/// completed results are reused for the document's lifetime until the
/// repository invalidates them.
#[derive(Debug, Default)]
pub struct SectionMeasureCache {
    cells: Mutex<HashMap<String, Arc<OnceCell<Option<f32>>>>>,
}

impl SectionMeasureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached height for `id`, measuring at most once.
    pub async fn ensure_measured<F, Fut>(&self, id: &str, measure: F) -> Option<f32>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Option<f32>>,
    {
        let cell = {
            let mut cells = self
                .cells
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            Arc::clone(
                cells
                    .entry(id.to_string())
                    .or_insert_with(|| Arc::new(OnceCell::new())),
            )
        };
        *cell.get_or_init(measure).await
    }

    /// Drop one cached measurement (repository content changed).
    pub fn invalidate(&self, id: &str) {
        self.cells
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(id);
    }

    /// Drop every cached measurement.
    pub fn clear(&self) {
        self.cells
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}

/// Cached metrics for one measured record.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SectionMetrics {
    pub content_height_px: f32,
    /// Header/footer-to-margin distance from document page settings, px.
    pub distance_px: f32,
    /// `content_height_px + distance_px`; what a page actually reserves.
    pub effective_height_px: f32,
}

/// Variant-name index built once per measurement pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VariantLookup {
    header: HashMap<String, String>,
    footer: HashMap<String, String>,
}

impl VariantLookup {
    /// Record id serving `variant` for `role`, if any.
    pub fn record_for(&self, role: SectionRole, variant: &str) -> Option<&str> {
        self.map(role).get(variant).map(String::as_str)
    }

    fn map(&self, role: SectionRole) -> &HashMap<String, String> {
        match role {
            SectionRole::Header => &self.header,
            SectionRole::Footer => &self.footer,
        }
    }

    /// First registrant wins on duplicate variant names.
    fn register(&mut self, role: SectionRole, variant: &str, record_id: &str) {
        let map = match role {
            SectionRole::Header => &mut self.header,
            SectionRole::Footer => &mut self.footer,
        };
        map.entry(variant.to_string())
            .or_insert_with(|| record_id.to_string());
    }
}

/// Output of a full header/footer measurement pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeasurementSummary {
    pub metrics_by_id: HashMap<String, SectionMetrics>,
    pub variants: VariantLookup,
}

/// Measure every header/footer record once and index variant membership.
///
/// Repeated invocations reuse in-flight or completed measurements through
/// `cache`. A role with no explicit `default` variant gets its first record
/// as the implicit default.
pub async fn measure_header_footer_sections<H, S>(
    host: &H,
    source: &S,
    settings: &PageSettings,
    cache: &SectionMeasureCache,
) -> MeasurementSummary
where
    H: MeasurementHost,
    S: HeaderFooterSource,
{
    let width_px = settings.content_width();
    let mut summary = MeasurementSummary::default();
    for role in [SectionRole::Header, SectionRole::Footer] {
        let distance = match role {
            SectionRole::Header => settings.header_distance_px,
            SectionRole::Footer => settings.footer_distance_px,
        }
        .map(sanitize_extent)
        .unwrap_or(0.0);
        let records = source.list(role);
        for record in &records {
            let measured = cache
                .ensure_measured(&record.id, || {
                    measure_section(host, record, width_px, &settings.default_font)
                })
                .await;
            let content_height_px = measured.unwrap_or(0.0);
            summary.metrics_by_id.insert(
                record.id.clone(),
                SectionMetrics {
                    content_height_px,
                    distance_px: distance,
                    effective_height_px: content_height_px + distance,
                },
            );
            for variant in &record.variants {
                summary.variants.register(role, variant, &record.id);
            }
        }
        if summary.variants.record_for(role, "default").is_none() {
            if let Some(first) = records.first() {
                summary.variants.register(role, "default", &first.id);
            }
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn font() -> DefaultFontMetrics {
        DefaultFontMetrics {
            font_size_px: 16.0,
            line_height: 1.25,
            avg_char_width_ratio: 0.5,
        }
    }

    #[test]
    fn estimate_counts_wrapped_lines() {
        // 400px / 8px per char = 50 chars per line; 120 chars -> 3 lines.
        let content = json!({
            "type": "doc",
            "content": [
                { "type": "paragraph", "content": [ { "type": "text", "text": "x".repeat(120) } ] }
            ]
        });
        let height = estimate_section_height(&content, 400.0, &font());
        assert_eq!(height, Some(3.0 * 16.0 * 1.25));
    }

    #[test]
    fn estimate_adds_hard_breaks_and_headings() {
        let content = json!({
            "type": "doc",
            "content": [
                { "type": "heading", "content": [ { "type": "text", "text": "Title" } ] },
                { "type": "paragraph", "content": [
                    { "type": "text", "text": "ab" },
                    { "type": "hardBreak" },
                    { "type": "text", "text": "cd" }
                ] }
            ]
        });
        // One heading line, one paragraph line, one hard break.
        let height = estimate_section_height(&content, 400.0, &font());
        assert_eq!(height, Some(3.0 * 16.0 * 1.25));
    }

    #[test]
    fn estimate_without_blocks_is_none() {
        assert_eq!(
            estimate_section_height(&json!({"type": "doc"}), 400.0, &font()),
            None
        );
        assert_eq!(estimate_section_height(&Value::Null, 400.0, &font()), None);
    }

    #[test]
    fn empty_paragraph_still_occupies_one_line() {
        let content = json!({
            "type": "doc",
            "content": [ { "type": "paragraph" } ]
        });
        let height = estimate_section_height(&content, 400.0, &font());
        assert_eq!(height, Some(16.0 * 1.25));
    }

    #[test]
    fn variant_registration_first_wins() {
        let mut lookup = VariantLookup::default();
        lookup.register(SectionRole::Header, "first", "hdr-1");
        lookup.register(SectionRole::Header, "first", "hdr-2");
        lookup.register(SectionRole::Footer, "first", "ftr-1");
        assert_eq!(lookup.record_for(SectionRole::Header, "first"), Some("hdr-1"));
        assert_eq!(lookup.record_for(SectionRole::Footer, "first"), Some("ftr-1"));
        assert_eq!(lookup.record_for(SectionRole::Header, "even"), None);
    }
}
