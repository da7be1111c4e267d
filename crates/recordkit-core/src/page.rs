use serde::Serialize;

/// One page of a paginated fetch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number.
    pub page: u64,
    pub per_page: u64,
    /// Rows matched across all pages.
    pub total: u64,
    pub total_pages: u64,
    pub has_next: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, page: u64, per_page: u64, total: u64) -> Self {
        let total_pages = total.div_ceil(per_page.max(1));
        Self {
            items,
            page,
            per_page,
            total,
            total_pages,
            has_next: page < total_pages,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total: self.total,
            total_pages: self.total_pages,
            has_next: self.has_next,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_counts() {
        let page = Page::new(vec![1, 2], 2, 2, 5);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_next);

        let last = Page::new(vec![5], 3, 2, 5);
        assert!(!last.has_next);

        let empty = Page::<i32>::new(vec![], 1, 20, 0);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next);
    }

    #[test]
    fn test_serializes() {
        let page = Page::new(vec!["a"], 1, 1, 1).map(str::to_uppercase);
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["items"][0], "A");
        assert_eq!(json["has_next"], false);
    }
}
