pub mod client_sort;
mod controller;
pub mod debounce;
pub mod error;
pub mod fetcher;
pub mod state;

pub use controller::{FetchOutcome, ListStateController, PendingFetch, FETCH_PANICKED};
pub use debounce::{DebouncedSearch, Debouncer, DEFAULT_DEBOUNCE};
pub use error::ListError;
pub use fetcher::{failure_message, fetcher_fn, PageFetcher};
pub use state::{
    FilterMap, ListFilters, ListInit, ListState, ListStatus, PageRequest, SortConfig,
    SortDirection, SortMode, DEFAULT_PAGE_SIZE,
};
