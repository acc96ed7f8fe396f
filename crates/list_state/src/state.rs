use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

use crate::client_sort::sort_by_field;

pub const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListStatus {
    #[default]
    Idle,
    Loading,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortConfig {
    pub field: String,
    pub direction: SortDirection,
}

impl SortConfig {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }

    /// Sort that results from selecting `field` while `current` is active:
    /// the same field flips direction, any other field starts ascending.
    pub fn toggled(current: Option<&SortConfig>, field: &str) -> Self {
        match current {
            Some(active) if active.field == field => Self {
                field: active.field.clone(),
                direction: active.direction.flipped(),
            },
            _ => Self::asc(field),
        }
    }
}

/// Where ordering is applied for a list view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    /// The data source orders results; sort changes refetch.
    #[default]
    Server,
    /// Only the loaded page is ordered, locally.
    Client,
}

/// Filter shape of a list view.
pub trait ListFilters: Clone + fmt::Debug + Send + Sync + 'static {
    /// Partial update accepted by [`ListFilters::merge_patch`].
    type Patch: Send + 'static;

    /// Shallow merge; fields absent from `patch` keep their value.
    fn merge_patch(&mut self, patch: Self::Patch);

    /// Flattened key/value pairs sent to the data source.
    fn query_pairs(&self) -> Vec<(String, String)>;
}

pub type FilterMap = BTreeMap<String, String>;

impl ListFilters for FilterMap {
    type Patch = FilterMap;

    fn merge_patch(&mut self, patch: Self::Patch) {
        self.extend(patch);
    }

    fn query_pairs(&self) -> Vec<(String, String)> {
        self.iter()
            .filter(|(_, value)| !value.trim().is_empty())
            .map(|(key, value)| (key.clone(), value.trim().to_string()))
            .collect()
    }
}

impl ListFilters for () {
    type Patch = ();

    fn merge_patch(&mut self, _patch: Self::Patch) {}

    fn query_pairs(&self) -> Vec<(String, String)> {
        Vec::new()
    }
}

/// Parameters handed to the fetch collaborator for one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
    pub sort_field: Option<String>,
    pub sort_direction: Option<SortDirection>,
    pub filters: Vec<(String, String)>,
}

impl PageRequest {
    /// Query-string form: `page`, `limit`, `sortField`, `sortDirection`, then filters.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("page".to_string(), self.page.to_string()),
            ("limit".to_string(), self.limit.to_string()),
        ];
        if let Some(field) = &self.sort_field {
            pairs.push(("sortField".to_string(), field.clone()));
        }
        if let Some(direction) = self.sort_direction {
            pairs.push(("sortDirection".to_string(), direction.as_str().to_string()));
        }
        pairs.extend(self.filters.iter().cloned());
        pairs
    }
}

/// Construction-time values of a list view; `reset` returns here.
#[derive(Debug, Clone)]
pub struct ListInit<F> {
    pub page: u32,
    pub limit: u32,
    pub filters: F,
    pub sort: Option<SortConfig>,
    pub sort_mode: SortMode,
}

impl<F> ListInit<F> {
    pub fn new(filters: F) -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
            filters,
            sort: None,
            sort_mode: SortMode::Server,
        }
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_sort(mut self, sort: SortConfig) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn with_sort_mode(mut self, sort_mode: SortMode) -> Self {
        self.sort_mode = sort_mode;
        self
    }
}

impl<F: Default> Default for ListInit<F> {
    fn default() -> Self {
        Self::new(F::default())
    }
}

/// Snapshot of one list view.
#[derive(Debug, Clone)]
pub struct ListState<T, F> {
    pub(crate) items: Vec<T>,
    pub(crate) page: u32,
    pub(crate) limit: u32,
    pub(crate) total: u64,
    pub(crate) filters: F,
    pub(crate) sort: Option<SortConfig>,
    pub(crate) sort_mode: SortMode,
    pub(crate) status: ListStatus,
    pub(crate) error: Option<String>,
}

impl<T, F: Clone> ListState<T, F> {
    pub(crate) fn from_init(init: &ListInit<F>) -> Self {
        Self {
            items: Vec::new(),
            page: init.page,
            limit: init.limit,
            total: 0,
            filters: init.filters.clone(),
            sort: init.sort.clone(),
            sort_mode: init.sort_mode,
            status: ListStatus::Idle,
            error: None,
        }
    }
}

impl<T, F> ListState<T, F> {
    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn filters(&self) -> &F {
        &self.filters
    }

    pub fn sort(&self) -> Option<&SortConfig> {
        self.sort.as_ref()
    }

    pub fn sort_mode(&self) -> SortMode {
        self.sort_mode
    }

    pub fn status(&self) -> ListStatus {
        self.status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.status == ListStatus::Loading
    }

    pub fn total_pages(&self) -> u64 {
        self.total.div_ceil(u64::from(self.limit.max(1)))
    }

    pub fn has_next_page(&self) -> bool {
        u64::from(self.page) < self.total_pages()
    }

    pub fn has_previous_page(&self) -> bool {
        self.page > 1
    }
}

impl<T, F: ListFilters> ListState<T, F> {
    pub(crate) fn page_request(&self) -> PageRequest {
        let server_sort = match self.sort_mode {
            SortMode::Server => self.sort.as_ref().filter(|sort| !sort.field.is_empty()),
            SortMode::Client => None,
        };
        PageRequest {
            page: self.page,
            limit: self.limit,
            sort_field: server_sort.map(|sort| sort.field.clone()),
            sort_direction: server_sort.map(|sort| sort.direction),
            filters: self.filters.query_pairs(),
        }
    }
}

impl<T: Serialize + Clone, F> ListState<T, F> {
    /// Items in display order: client-sorted in [`SortMode::Client`], as loaded otherwise.
    pub fn visible_items(&self) -> Vec<T> {
        match (self.sort_mode, &self.sort) {
            (SortMode::Client, Some(sort)) => sort_by_field(&self.items, sort),
            _ => self.items.clone(),
        }
    }
}

#[cfg(test)]
#[path = "tests/state_tests.rs"]
mod tests;
