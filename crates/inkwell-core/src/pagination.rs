//! Page-number pagination for post listings.

/// Posts shown on one listing page.
pub const POSTS_PER_PAGE: u64 = 10;

/// A requested page, as parsed from `?page=`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageRequest {
    number: Option<i64>,
}

impl PageRequest {
    /// Parse the raw query value. Anything that is not an integer means
    /// the first page.
    pub fn parse(raw: Option<&str>) -> Self {
        Self {
            number: raw.and_then(|s| s.trim().parse().ok()),
        }
    }

    pub fn first() -> Self {
        Self::parse(None)
    }

    /// Resolve against the total item count.
    ///
    /// A missing number gives page 1; a number outside `1..=num_pages`
    /// gives the last page. An empty listing still has one (empty) page.
    pub fn resolve(&self, count: u64) -> PageWindow {
        let num_pages = count.div_ceil(POSTS_PER_PAGE).max(1);
        let number = match self.number {
            None => 1,
            Some(n) if n < 1 || n as u64 > num_pages => num_pages,
            Some(n) => n as u64,
        };

        PageWindow {
            number,
            num_pages,
            count,
            offset: (number - 1) * POSTS_PER_PAGE,
            limit: POSTS_PER_PAGE,
        }
    }
}

/// The slice of a listing a page covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: u64,
    pub num_pages: u64,
    pub count: u64,
    pub offset: u64,
    pub limit: u64,
}

impl PageWindow {
    pub fn into_page<T>(self, items: Vec<T>) -> Page<T> {
        Page {
            items,
            number: self.number,
            num_pages: self.num_pages,
            count: self.count,
        }
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u64,
    pub num_pages: u64,
    pub count: u64,
}

impl<T> Page<T> {
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn next_page_number(&self) -> Option<u64> {
        self.has_next().then_some(self.number + 1)
    }

    pub fn previous_page_number(&self) -> Option<u64> {
        self.has_previous().then_some(self.number - 1)
    }
}
