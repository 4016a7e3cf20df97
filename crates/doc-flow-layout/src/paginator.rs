use std::sync::Arc;

use doc_flow::PageSettings;

use crate::page_ir::Page;

/// Per-page vertical reserves derived from measured header/footer sections.
pub trait PageReserveResolver: Send + Sync {
    /// Height reserved at the top of the page at `page_index` (0-based), px.
    fn header_reserve_px(&self, page_index: usize) -> f32;

    /// Height reserved at the bottom of the page at `page_index`, px.
    fn footer_reserve_px(&self, page_index: usize) -> f32;
}

/// Mutable per-page/column cursor.
///
/// Owned exclusively by one layout pass; a fresh instance replaces it on
/// every page transition rather than mutating aliased copies.
#[derive(Clone, Debug)]
pub struct PageState {
    pub page: Page,
    pub column_index: usize,
    /// Monotonically non-decreasing within a column until a column advance
    /// resets it.
    pub cursor_y: f32,
    /// Top of the content box for this page, px.
    pub top_margin: f32,
    /// Bottom of the content box for this page, px.
    pub content_bottom: f32,
    /// Spacing-after already applied at the cursor, available to collapse
    /// against the next block's spacing-before.
    pub trailing_spacing: f32,
    /// Style of the previously placed paragraph in this column.
    pub last_paragraph_style_id: Option<String>,
}

impl PageState {
    /// Vertical space left in the current column, px.
    pub fn remaining(&self) -> f32 {
        (self.content_bottom - self.cursor_y).max(0.0)
    }
}

/// Owns page creation and the page/column cursor.
///
/// Completed pages are emitted in order; the layout pass drives the cursor
/// through `ensure_page`/`advance_column` and appends fragments to the
/// current page's fragment list.
pub struct Paginator {
    settings: PageSettings,
    reserves: Option<Arc<dyn PageReserveResolver>>,
    current: Option<PageState>,
    emitted: Vec<Page>,
    next_page_number: usize,
}

impl core::fmt::Debug for Paginator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Paginator")
            .field("settings", &self.settings)
            .field("has_reserves", &self.reserves.is_some())
            .field("current", &self.current)
            .field("emitted_pages", &self.emitted.len())
            .finish()
    }
}

impl Paginator {
    /// Create a paginator over the given page geometry.
    pub fn new(settings: PageSettings) -> Self {
        Self {
            settings,
            reserves: None,
            current: None,
            emitted: Vec::with_capacity(2),
            next_page_number: 1,
        }
    }

    /// Install per-page header/footer reserves.
    pub fn with_reserves(mut self, reserves: Arc<dyn PageReserveResolver>) -> Self {
        self.reserves = Some(reserves);
        self
    }

    /// Page geometry this paginator lays out against.
    pub fn settings(&self) -> &PageSettings {
        &self.settings
    }

    /// Width of one body-text column.
    pub fn column_width(&self) -> f32 {
        self.settings.column_width()
    }

    /// Left edge of the column at `index`.
    pub fn column_x(&self, index: usize) -> f32 {
        self.settings.column_x(index)
    }

    /// Current page/column state, creating the first page lazily.
    pub fn ensure_page(&mut self) -> &mut PageState {
        let state = match self.current.take() {
            Some(state) => state,
            None => self.open_page(),
        };
        self.current.insert(state)
    }

    /// Move to the next column, or the next page when columns are exhausted.
    ///
    /// Resets the cursor and trailing spacing and clears the last paragraph
    /// style: contextual spacing never crosses a column break.
    pub fn advance_column(&mut self) {
        let column_count = self.settings.columns.count.max(1);
        let Some(state) = self.current.as_mut() else {
            self.ensure_page();
            return;
        };
        if state.column_index + 1 < column_count {
            state.column_index += 1;
            state.cursor_y = state.top_margin;
            state.trailing_spacing = 0.0;
            state.last_paragraph_style_id = None;
            log::debug!(
                "page {} advanced to column {}",
                state.page.number,
                state.column_index
            );
        } else {
            let finished = match self.current.take() {
                Some(state) => state,
                None => return,
            };
            log::debug!("page {} closed", finished.page.number);
            self.emitted.push(finished.page);
            let state = self.open_page();
            self.current = Some(state);
        }
    }

    /// Emit pages completed so far, keeping the current page open.
    pub fn drain_emitted(&mut self) -> Vec<Page> {
        core::mem::take(&mut self.emitted)
    }

    /// Finish the pass and return all pages in order.
    ///
    /// A trailing page that never received fragments is dropped.
    pub fn into_pages(mut self) -> Vec<Page> {
        if let Some(state) = self.current.take() {
            if !state.page.fragments.is_empty() {
                self.emitted.push(state.page);
            }
        }
        self.emitted
    }

    fn open_page(&mut self) -> PageState {
        let page_number = self.next_page_number;
        self.next_page_number += 1;
        let page_index = page_number - 1;
        let (header_reserve, footer_reserve) = match self.reserves.as_deref() {
            Some(reserves) => (
                reserves.header_reserve_px(page_index).max(0.0),
                reserves.footer_reserve_px(page_index).max(0.0),
            ),
            None => (0.0, 0.0),
        };
        let top_margin = self.settings.content_top() + header_reserve;
        let content_bottom = self.settings.content_bottom() - footer_reserve;
        log::debug!(
            "page {} opened: content [{:.1}, {:.1}]",
            page_number,
            top_margin,
            content_bottom
        );
        PageState {
            page: Page::new(page_number),
            column_index: 0,
            cursor_y: top_margin,
            top_margin,
            content_bottom,
            trailing_spacing: 0.0,
            last_paragraph_style_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page_ir::{Fragment, ImageFragment};
    use doc_flow::{ColumnSettings, PageMargins};

    fn settings(columns: usize) -> PageSettings {
        PageSettings {
            page_width_px: 500.0,
            page_height_px: 700.0,
            margins: PageMargins::uniform(50.0),
            columns: ColumnSettings {
                count: columns,
                gap_px: 20.0,
            },
            ..PageSettings::default()
        }
    }

    fn image(block_id: u64) -> Fragment {
        Fragment::Image(ImageFragment {
            block_id,
            x: 0.0,
            y: 0.0,
            width: 10.0,
            height: 10.0,
        })
    }

    #[test]
    fn ensure_page_creates_page_one_lazily() {
        let mut paginator = Paginator::new(settings(1));
        let state = paginator.ensure_page();
        assert_eq!(state.page.number, 1);
        assert_eq!(state.cursor_y, 50.0);
        assert_eq!(state.content_bottom, 650.0);
    }

    #[test]
    fn advance_column_moves_within_the_page_first() {
        let mut paginator = Paginator::new(settings(2));
        {
            let state = paginator.ensure_page();
            state.cursor_y = 300.0;
            state.trailing_spacing = 12.0;
            state.last_paragraph_style_id = Some("Body".to_string());
        }
        paginator.advance_column();
        let state = paginator.ensure_page();
        assert_eq!(state.page.number, 1);
        assert_eq!(state.column_index, 1);
        assert_eq!(state.cursor_y, state.top_margin);
        assert_eq!(state.trailing_spacing, 0.0);
        assert_eq!(state.last_paragraph_style_id, None);
    }

    #[test]
    fn advancing_past_the_last_column_opens_a_new_page() {
        let mut paginator = Paginator::new(settings(1));
        paginator.ensure_page().page.push_fragment(image(1));
        paginator.advance_column();
        let state = paginator.ensure_page();
        assert_eq!(state.page.number, 2);
        assert_eq!(state.column_index, 0);
        let pages = paginator.drain_emitted();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].number, 1);
    }

    #[test]
    fn into_pages_drops_a_trailing_empty_page() {
        let mut paginator = Paginator::new(settings(1));
        paginator.ensure_page().page.push_fragment(image(1));
        paginator.advance_column();
        let pages = paginator.into_pages();
        assert_eq!(pages.len(), 1);
    }

    #[test]
    fn reserves_shrink_the_content_box() {
        struct Fixed;
        impl PageReserveResolver for Fixed {
            fn header_reserve_px(&self, _page_index: usize) -> f32 {
                30.0
            }
            fn footer_reserve_px(&self, _page_index: usize) -> f32 {
                20.0
            }
        }
        let mut paginator = Paginator::new(settings(1)).with_reserves(Arc::new(Fixed));
        let state = paginator.ensure_page();
        assert_eq!(state.top_margin, 80.0);
        assert_eq!(state.content_bottom, 630.0);
    }

    #[test]
    fn column_geometry_delegates_to_settings() {
        let paginator = Paginator::new(settings(2));
        let expected = (400.0 - 20.0) / 2.0;
        assert!((paginator.column_width() - expected).abs() < f32::EPSILON);
        assert_eq!(paginator.column_x(0), 50.0);
        assert!((paginator.column_x(1) - (50.0 + expected + 20.0)).abs() < f32::EPSILON);
    }
}
