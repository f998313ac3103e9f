// src/query/page.rs
//
// Page requests and page results

use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::query::sort::Sort;

/// Zero-based page number plus page size, optionally sorted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    page: u64,
    size: u64,
    sort: Sort,
}

impl PageRequest {
    pub fn of(page: u64, size: u64) -> Self {
        Self {
            page,
            size,
            sort: Sort::unsorted(),
        }
    }

    pub fn sorted(page: u64, size: u64, sort: Sort) -> Self {
        Self { page, size, sort }
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn sort(&self) -> &Sort {
        &self.sort
    }

    pub fn offset(&self) -> u64 {
        self.page.saturating_mul(self.size)
    }

    pub fn next(&self) -> Self {
        Self {
            page: self.page.saturating_add(1),
            ..self.clone()
        }
    }

    /// LIMIT and OFFSET as SQLite integers.
    /// SQLite reads a negative OFFSET as 0, so anything past `i64::MAX` is refused.
    pub fn window(&self) -> AppResult<(i64, i64)> {
        if self.size == 0 {
            return Err(AppError::query_syntax("page size must be at least 1"));
        }
        let limit = i64::try_from(self.size)
            .map_err(|_| AppError::query_syntax(format!("page size {} is out of range", self.size)))?;
        let offset = self
            .page
            .checked_mul(self.size)
            .and_then(|offset| i64::try_from(offset).ok())
            .ok_or_else(|| {
                AppError::query_syntax(format!(
                    "page {} of size {} is out of range",
                    self.page, self.size
                ))
            })?;
        Ok((limit, offset))
    }

    pub fn validate(&self) -> AppResult<()> {
        self.window().map(|_| ())
    }
}

/// One page of results plus the total match count
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    content: Vec<T>,
    number: u64,
    size: u64,
    total_elements: u64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, request: &PageRequest, total_elements: u64) -> Self {
        Self {
            content,
            number: request.page(),
            size: request.size(),
            total_elements,
        }
    }

    pub fn content(&self) -> &[T] {
        &self.content
    }

    pub fn into_content(self) -> Vec<T> {
        self.content
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn number_of_elements(&self) -> usize {
        self.content.len()
    }

    pub fn total_elements(&self) -> u64 {
        self.total_elements
    }

    pub fn total_pages(&self) -> u64 {
        if self.size == 0 {
            return 0;
        }
        self.total_elements.div_ceil(self.size)
    }

    pub fn is_first(&self) -> bool {
        self.number == 0
    }

    pub fn is_last(&self) -> bool {
        !self.has_next()
    }

    pub fn has_next(&self) -> bool {
        self.number.saturating_add(1) < self.total_pages()
    }

    pub fn has_previous(&self) -> bool {
        self.number > 0
    }

    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            content: self.content.into_iter().map(f).collect(),
            number: self.number,
            size: self.size,
            total_elements: self.total_elements,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_flags() {
        let request = PageRequest::of(0, 3);
        let first = Page::new(vec![1, 2, 3], &request, 5);

        assert_eq!(first.total_pages(), 2);
        assert!(first.is_first());
        assert!(first.has_next());
        assert!(!first.is_last());
        assert!(!first.has_previous());

        let second = Page::new(vec![4, 5], &request.next(), 5);
        assert_eq!(second.number(), 1);
        assert!(!second.has_next());
        assert!(second.is_last());
        assert!(second.has_previous());
    }

    #[test]
    fn test_empty_result_has_no_pages() {
        let page: Page<i32> = Page::new(vec![], &PageRequest::of(0, 10), 0);
        assert_eq!(page.total_pages(), 0);
        assert!(page.is_first());
        assert!(page.is_last());
    }

    #[test]
    fn test_zero_size_rejected() {
        assert!(matches!(PageRequest::of(0, 0).validate(), Err(AppError::QuerySyntax(_))));
        assert_eq!(PageRequest::of(2, 3).offset(), 6);
    }

    #[test]
    fn test_out_of_range_window_rejected() {
        assert!(matches!(PageRequest::of(1 << 62, 4).validate(), Err(AppError::QuerySyntax(_))));
        assert!(matches!(PageRequest::of(u64::MAX, 1).validate(), Err(AppError::QuerySyntax(_))));
        assert!(matches!(PageRequest::of(0, u64::MAX).validate(), Err(AppError::QuerySyntax(_))));
        assert_eq!(PageRequest::of(3, 4).window().unwrap(), (4, 12));
        assert_eq!(PageRequest::of(0, i64::MAX as u64).window().unwrap(), (i64::MAX, 0));
    }

    #[test]
    fn test_last_representable_page_does_not_overflow() {
        let request = PageRequest::of(u64::MAX, 1);
        let page: Page<i32> = Page::new(vec![], &request, 3);
        assert!(!page.has_next());
        assert!(page.is_last());
        assert_eq!(request.next().page(), u64::MAX);
    }

    #[test]
    fn test_map_keeps_paging_metadata() {
        let page = Page::new(vec!["a", "b"], &PageRequest::of(1, 2), 4).map(str::len);
        assert_eq!(page.content(), &[1, 1]);
        assert_eq!(page.total_elements(), 4);
        assert_eq!(page.number(), 1);
    }
}
