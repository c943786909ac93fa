use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use super::{Cursor, PageRequestError};

/// Request for one page of results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    page_size: Option<NonZeroU32>,
    cursor: Option<Cursor>,
}

impl PageRequest {
    /// First page, store-default size.
    pub fn first() -> Self {
        Self::default()
    }

    /// First page with at most `page_size` items, validating that it is positive.
    pub fn of_size(page_size: u32) -> Result<Self, PageRequestError> {
        let page_size = NonZeroU32::new(page_size).ok_or(PageRequestError::ZeroPageSize)?;
        Ok(Self {
            page_size: Some(page_size),
            cursor: None,
        })
    }

    /// Same request, resuming after `cursor`.
    pub fn with_cursor(self, cursor: Option<Cursor>) -> Self {
        Self { cursor, ..self }
    }

    /// Requested page size; `None` means store default.
    pub fn page_size(&self) -> Option<NonZeroU32> {
        self.page_size
    }

    /// Position to resume from; `None` means the first page.
    pub fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }
}

/// One page of results, as returned by a single fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    content: Vec<T>,
    next_cursor: Option<Cursor>,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, next_cursor: Option<Cursor>) -> Self {
        Self {
            content,
            next_cursor,
        }
    }

    /// Items of this page, in store order. May be empty even when more pages follow.
    pub fn content(&self) -> &[T] {
        &self.content
    }

    /// Cursor for the next page; `None` on the last page.
    pub fn next_cursor(&self) -> Option<&Cursor> {
        self.next_cursor.as_ref()
    }

    pub fn has_next(&self) -> bool {
        self.next_cursor.is_some()
    }

    /// Request for the page following this one, keeping the page size of `previous`.
    pub fn next_request(&self, previous: &PageRequest) -> Option<PageRequest> {
        self.next_cursor
            .clone()
            .map(|cursor| previous.clone().with_cursor(Some(cursor)))
    }

    pub fn into_content(self) -> Vec<T> {
        self.content
    }

    pub fn into_parts(self) -> (Vec<T>, Option<Cursor>) {
        (self.content, self.next_cursor)
    }

    /// Converts every item, keeping the cursor.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            next_cursor: self.next_cursor,
        }
    }

    /// Fallible version of [`Page::map`].
    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<Page<U>, E> {
        Ok(Page {
            content: self.content.into_iter().map(f).collect::<Result<_, _>>()?,
            next_cursor: self.next_cursor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_of_size_rejects_zero() {
        assert_eq!(
            PageRequest::of_size(0),
            Err(PageRequestError::ZeroPageSize)
        );
    }

    #[test]
    fn test_first_has_no_size_and_no_cursor() {
        let request = PageRequest::first();
        assert!(request.page_size().is_none());
        assert!(request.cursor().is_none());
    }

    #[test]
    fn test_structural_equality() {
        let a = PageRequest::of_size(10)
            .unwrap()
            .with_cursor(Some(Cursor::from("abc")));
        let b = PageRequest::of_size(10)
            .unwrap()
            .with_cursor(Some(Cursor::from("abc")));
        assert_eq!(a, b);
        assert_ne!(a, b.with_cursor(None));
    }

    #[test]
    fn test_into_parts_hands_back_cursor() {
        let page = Page::new(vec!["a", "b"], Some(Cursor::from("after-b")));
        let (content, cursor) = page.into_parts();
        assert_eq!(content, vec!["a", "b"]);
        assert_eq!(cursor, Some(Cursor::from("after-b")));

        let (content, cursor) = Page::<u8>::new(vec![], None).into_parts();
        assert!(content.is_empty());
        assert!(cursor.is_none());
    }

    #[test]
    fn test_next_request_keeps_size() {
        let request = PageRequest::of_size(3).unwrap();
        let page = Page::new(vec![1, 2, 3], Some(Cursor::from("after-3")));

        let next = page.next_request(&request).unwrap();
        assert_eq!(next.page_size(), NonZeroU32::new(3));
        assert_eq!(next.cursor(), Some(&Cursor::from("after-3")));
    }

    #[test]
    fn test_last_page_has_no_next_request() {
        let page = Page::new(vec![1], None);
        assert!(!page.has_next());
        assert!(page.next_request(&PageRequest::first()).is_none());
    }

    #[test]
    fn test_map_keeps_cursor() {
        let page = Page::new(vec![1, 2], Some(Cursor::from("c")));
        let mapped = page.map(|n| n * 10);
        assert_eq!(mapped.content(), &[10, 20]);
        assert_eq!(mapped.next_cursor(), Some(&Cursor::from("c")));
    }

    #[test]
    fn test_try_map_propagates_error() {
        let page = Page::new(vec!["1", "x"], None);
        let result: Result<Page<i32>, _> = page.try_map(|s| s.parse::<i32>());
        assert!(result.is_err());
    }
}
