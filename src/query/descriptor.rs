// src/query/descriptor.rs
//
// Structured query request: filter + sort + optional page + hints

use crate::domain::Entity;
use crate::error::AppResult;
use crate::query::page::PageRequest;
use crate::query::predicate::Filter;
use crate::query::sort::Sort;

/// Execution hints attached to a query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryHints {
    /// Results are handed out detached: not served from nor registered in
    /// the session identity map
    pub read_only: bool,
}

impl QueryHints {
    pub fn read_only() -> Self {
        Self { read_only: true }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryDescriptor {
    filter: Filter,
    sort: Sort,
    page: Option<PageRequest>,
    hints: QueryHints,
}

impl QueryDescriptor {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn filtered(filter: Filter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    pub fn sorted(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    pub fn paged(mut self, page: PageRequest) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_hints(mut self, hints: QueryHints) -> Self {
        self.hints = hints;
        self
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn page(&self) -> Option<&PageRequest> {
        self.page.as_ref()
    }

    pub fn hints(&self) -> QueryHints {
        self.hints
    }

    /// A sorted page request takes precedence over the descriptor's sort
    pub fn effective_sort(&self) -> &Sort {
        match &self.page {
            Some(page) if !page.sort().is_unsorted() => page.sort(),
            _ => &self.sort,
        }
    }

    pub fn validate<E: Entity>(&self) -> AppResult<()> {
        self.filter.validate::<E>()?;
        self.effective_sort().validate::<E>()?;
        if let Some(page) = &self.page {
            page.validate()?;
        }
        Ok(())
    }
}
