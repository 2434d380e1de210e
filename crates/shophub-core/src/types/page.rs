//! Paginated payloads

use serde::{Deserialize, Serialize};

/// Page cursor: the next page index
pub type Cursor = u32;

/// One page of a paginated listing
///
/// `next_page` is `None` once the page reaches the end of the dataset; that is
/// the only end-of-pagination signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(rename = "nextPage")]
    pub next_page: Option<Cursor>,
}

impl<T> Page<T> {
    pub fn is_last(&self) -> bool {
        self.next_page.is_none()
    }
}

/// Accumulated pages of an infinite query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfiniteData<P> {
    /// Pages in fetch order
    pub pages: Vec<P>,
    /// Cursor each page was fetched with, parallel to `pages`
    pub page_params: Vec<Cursor>,
    /// Cursor for the next page; `None` when the end was reached
    pub next_cursor: Option<Cursor>,
}

impl<P> InfiniteData<P> {
    /// Data holding only the first page
    pub fn first(page: P, param: Cursor, next_cursor: Option<Cursor>) -> Self {
        Self {
            pages: vec![page],
            page_params: vec![param],
            next_cursor,
        }
    }

    /// Append a page and advance the cursor
    pub fn push(&mut self, page: P, param: Cursor, next_cursor: Option<Cursor>) {
        self.pages.push(page);
        self.page_params.push(param);
        self.next_cursor = next_cursor;
    }

    pub fn has_next_page(&self) -> bool {
        self.next_cursor.is_some()
    }
}

impl<T: Clone> InfiniteData<Page<T>> {
    /// All items across pages, in page order
    pub fn items(&self) -> Vec<T> {
        self.pages
            .iter()
            .flat_map(|page| page.items.iter().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_advances_cursor() {
        let mut data = InfiniteData::first(
            Page {
                items: vec![1, 2],
                next_page: Some(1),
            },
            0,
            Some(1),
        );
        assert!(data.has_next_page());

        data.push(
            Page {
                items: vec![3],
                next_page: None,
            },
            1,
            None,
        );
        assert!(!data.has_next_page());
        assert_eq!(data.items(), vec![1, 2, 3]);
        assert_eq!(data.page_params, vec![0, 1]);
    }

    #[test]
    fn test_page_json_uses_next_page_field() {
        let page = Page {
            items: vec!["a"],
            next_page: None,
        };
        let json = serde_json::to_value(&page).unwrap();
        assert!(json["nextPage"].is_null());
        assert!(page.is_last());
    }
}
