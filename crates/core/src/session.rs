use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageViewport {
    pub pixel_width: u32,
    pub pixel_height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSession {
    current_page: u32,
    page_count: u32,
    viewports: BTreeMap<u32, PageViewport>,
}

impl Default for PageSession {
    fn default() -> Self {
        Self { current_page: 1, page_count: 0, viewports: BTreeMap::new() }
    }
}

impl PageSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn reset(&mut self, page_count: u32) {
        self.page_count = page_count;
        self.current_page = 1;
        self.viewports.clear();
    }

    pub fn set_page_count(&mut self, page_count: u32) {
        self.page_count = page_count;
        self.current_page = self.current_page.min(page_count.max(1));
    }

    pub fn record_rendered(&mut self, page: u32, pixel_width: u32, pixel_height: u32, page_count: u32) {
        if page == 0 {
            return;
        }

        self.set_page_count(page_count);
        self.viewports.insert(page, PageViewport { pixel_width, pixel_height });
    }

    pub fn go_to(&mut self, page: u32) {
        if self.page_count == 0 {
            return;
        }

        self.current_page = page.max(1).min(self.page_count);
    }

    pub fn next_page(&mut self) {
        if self.page_count == 0 {
            return;
        }

        self.current_page = (self.current_page + 1).min(self.page_count);
    }

    pub fn prev_page(&mut self) {
        self.current_page = self.current_page.saturating_sub(1).max(1);
    }

    pub fn viewport(&self, page: u32) -> Option<PageViewport> {
        self.viewports.get(&page).copied()
    }

    /// Pages render at one pixel per point, so a page's rendered pixel
    /// height is also its height in points.
    pub fn page_height_pt(&self, page: u32) -> Option<f32> {
        self.viewport(page).map(|viewport| viewport.pixel_height as f32)
    }
}
