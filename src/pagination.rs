use crate::models::Station;

pub const PAGE_SIZE: usize = 10;

/// One visible page of the displayed set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageView {
    pub entries: Vec<Station>,
    /// 1-based.
    pub page: usize,
    /// Never below 1, even for an empty set.
    pub total_pages: usize,
}

impl Default for PageView {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            page: 1,
            total_pages: 1,
        }
    }
}

impl PageView {
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

pub fn total_pages(len: usize) -> usize {
    len.div_ceil(PAGE_SIZE).max(1)
}

/// Slices page `page` out of `displayed`. Indices past either end are pulled
/// back into range.
pub fn page_view(displayed: &[Station], page: usize) -> PageView {
    let total_pages = total_pages(displayed.len());
    let page = page.clamp(1, total_pages);
    let start = (page - 1) * PAGE_SIZE;
    let end = (start + PAGE_SIZE).min(displayed.len());
    PageView {
        entries: displayed.get(start..end).unwrap_or_default().to_vec(),
        page,
        total_pages,
    }
}
