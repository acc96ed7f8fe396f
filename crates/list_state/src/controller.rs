use std::{
    panic::AssertUnwindSafe,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use futures::FutureExt;
use tokio::{
    sync::{watch, Mutex, MutexGuard},
    task::JoinHandle,
};
use tracing::{debug, warn};

use crate::{
    error::ListError,
    fetcher::{failure_message, PageFetcher},
    state::{ListFilters, ListInit, ListState, ListStatus, PageRequest, SortConfig, SortMode},
};

/// Error recorded when the fetcher panics instead of returning.
pub const FETCH_PANICKED: &str = "fetch task panicked";

/// How a fetch issued by the controller ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The page replaced `items`/`total`.
    Applied,
    /// The collaborator failed and the error was recorded.
    Failed,
    /// A newer request, `reset`, or drop superseded this one; nothing changed.
    Stale,
    /// The operation did not need a fetch.
    Skipped,
    /// The fetch task was torn down with the runtime before it finished.
    Abandoned,
}

/// Handle to the fetch an operation triggered.
///
/// Dropping it does not cancel anything; the fetch keeps running in the
/// background and applies its result if still current.
#[must_use = "await `settled` to observe the fetch, or drop to let it run in the background"]
pub struct PendingFetch {
    request_id: Option<u64>,
    handle: Option<JoinHandle<FetchOutcome>>,
}

impl PendingFetch {
    fn skipped() -> Self {
        Self {
            request_id: None,
            handle: None,
        }
    }

    pub fn request_id(&self) -> Option<u64> {
        self.request_id
    }

    pub async fn settled(self) -> FetchOutcome {
        let Some(handle) = self.handle else {
            return FetchOutcome::Skipped;
        };
        match handle.await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(request_id = ?self.request_id, "list fetch task ended abnormally: {err}");
                FetchOutcome::Abandoned
            }
        }
    }
}

struct ControllerInner<T, F> {
    fetcher: Arc<dyn PageFetcher<T>>,
    init: ListInit<F>,
    state: Mutex<ListState<T, F>>,
    latest_request: AtomicU64,
    snapshots: watch::Sender<ListState<T, F>>,
}

impl<T, F> ControllerInner<T, F>
where
    T: Clone + Send + Sync + 'static,
    F: ListFilters,
{
    fn publish(&self, state: &ListState<T, F>) {
        self.snapshots.send_replace(state.clone());
    }

    fn invalidate_in_flight(&self) -> u64 {
        self.latest_request.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, request_id: u64) -> bool {
        self.latest_request.load(Ordering::SeqCst) == request_id
    }

    async fn run_fetch(self: Arc<Self>, request_id: u64, request: PageRequest) -> FetchOutcome {
        let limit = request.limit;
        let result = AssertUnwindSafe(self.fetcher.fetch_page(request))
            .catch_unwind()
            .await;

        // Compared under the state lock so `reset` cannot slip in between.
        let mut state = self.state.lock().await;
        if !self.is_current(request_id) {
            debug!(request_id, "discarding stale list response");
            return FetchOutcome::Stale;
        }

        let outcome = match result {
            Ok(Ok(page)) => {
                debug!(
                    request_id,
                    items = page.items.len(),
                    total = page.total,
                    limit,
                    "list page loaded"
                );
                state.items = page.items;
                state.total = page.total;
                state.status = ListStatus::Succeeded;
                state.error = None;
                FetchOutcome::Applied
            }
            Ok(Err(err)) => {
                let message = failure_message(&err);
                warn!(request_id, "list fetch failed: {err:#}");
                state.status = ListStatus::Failed;
                state.error = Some(message);
                FetchOutcome::Failed
            }
            Err(_panic) => {
                warn!(request_id, "list fetcher panicked");
                state.status = ListStatus::Failed;
                state.error = Some(FETCH_PANICKED.to_string());
                FetchOutcome::Failed
            }
        };
        self.publish(&state);
        outcome
    }
}

/// Owns the state of one paginated, filterable, sortable list view.
///
/// Every operation mutates the state, publishes a snapshot and, where the
/// visible page changes, issues a fetch through the [`PageFetcher`]. Only the
/// most recently issued fetch may write its result back. Dropping the
/// controller invalidates any fetch still in flight.
///
/// Operations spawn onto the ambient tokio runtime.
pub struct ListStateController<T, F> {
    inner: Arc<ControllerInner<T, F>>,
}

impl<T, F> ListStateController<T, F>
where
    T: Clone + Send + Sync + 'static,
    F: ListFilters,
{
    pub fn new(fetcher: Arc<dyn PageFetcher<T>>, init: ListInit<F>) -> Result<Self, ListError> {
        if init.page == 0 {
            return Err(ListError::invalid("page", "must be at least 1"));
        }
        if init.limit == 0 {
            return Err(ListError::invalid("limit", "must be greater than 0"));
        }

        let state = ListState::from_init(&init);
        let (snapshots, _) = watch::channel(state.clone());
        Ok(Self {
            inner: Arc::new(ControllerInner {
                fetcher,
                init,
                state: Mutex::new(state),
                latest_request: AtomicU64::new(0),
                snapshots,
            }),
        })
    }

    pub fn snapshot(&self) -> ListState<T, F> {
        self.inner.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ListState<T, F>> {
        self.inner.snapshots.subscribe()
    }

    /// Initial fetch for a freshly mounted view.
    pub async fn load(&self) -> PendingFetch {
        self.refresh().await
    }

    pub async fn go_to_page(&self, page: i64) -> PendingFetch {
        let mut state = self.inner.state.lock().await;
        let total_pages = i64::try_from(state.total_pages()).unwrap_or(i64::MAX);
        let mut target = page.max(1);
        if total_pages > 0 {
            target = target.min(total_pages);
        }
        state.page = u32::try_from(target).unwrap_or(u32::MAX);
        self.begin_fetch(&mut state)
    }

    pub async fn next_page(&self) -> PendingFetch {
        let page = self.inner.state.lock().await.page;
        self.go_to_page(i64::from(page) + 1).await
    }

    pub async fn previous_page(&self) -> PendingFetch {
        let page = self.inner.state.lock().await.page;
        self.go_to_page(i64::from(page) - 1).await
    }

    pub async fn set_limit(&self, limit: i64) -> Result<PendingFetch, ListError> {
        if limit <= 0 {
            return Err(ListError::invalid(
                "limit",
                format!("must be greater than 0, got {limit}"),
            ));
        }
        let limit = u32::try_from(limit)
            .map_err(|_| ListError::invalid("limit", format!("{limit} is too large")))?;

        let mut state = self.inner.state.lock().await;
        state.limit = limit;
        state.page = 1;
        Ok(self.begin_fetch(&mut state))
    }

    pub async fn merge_filters(&self, patch: F::Patch) -> PendingFetch {
        let mut state = self.inner.state.lock().await;
        state.filters.merge_patch(patch);
        state.page = 1;
        self.begin_fetch(&mut state)
    }

    pub async fn reset_filters(&self) -> PendingFetch {
        let mut state = self.inner.state.lock().await;
        state.filters = self.inner.init.filters.clone();
        state.page = 1;
        self.begin_fetch(&mut state)
    }

    /// Selects `field` as the sort column, flipping direction when it already is.
    ///
    /// In [`SortMode::Client`] the loaded page is re-ordered locally; a fetch
    /// is only issued when the view has to move back to page 1.
    pub async fn set_sort(&self, field: &str) -> PendingFetch {
        let mut state = self.inner.state.lock().await;
        let sort = SortConfig::toggled(state.sort.as_ref(), field);
        state.sort = Some(sort);
        let page_moved = state.page != 1;
        state.page = 1;

        match state.sort_mode {
            SortMode::Server => self.begin_fetch(&mut state),
            SortMode::Client if page_moved => self.begin_fetch(&mut state),
            SortMode::Client => {
                self.inner.publish(&state);
                PendingFetch::skipped()
            }
        }
    }

    pub async fn refresh(&self) -> PendingFetch {
        let mut state = self.inner.state.lock().await;
        self.begin_fetch(&mut state)
    }

    /// Restores the construction-time state; in-flight fetches can no longer land.
    pub async fn reset(&self) {
        let mut state = self.inner.state.lock().await;
        let request_id = self.inner.invalidate_in_flight();
        *state = ListState::from_init(&self.inner.init);
        debug!(request_id, "list state reset");
        self.inner.publish(&state);
    }

    /// Applies an optimistic local edit to every item matching `predicate`.
    ///
    /// Returns how many items were patched. The next successful fetch
    /// replaces the page as usual.
    pub async fn patch_items<P, E>(&self, predicate: P, mut edit: E) -> usize
    where
        P: Fn(&T) -> bool,
        E: FnMut(&mut T),
    {
        let mut state = self.inner.state.lock().await;
        let mut patched = 0;
        for item in state.items.iter_mut() {
            if predicate(item) {
                edit(item);
                patched += 1;
            }
        }
        if patched > 0 {
            self.inner.publish(&state);
        }
        patched
    }

    fn begin_fetch(&self, state: &mut MutexGuard<'_, ListState<T, F>>) -> PendingFetch {
        let request_id = self.inner.invalidate_in_flight();
        state.status = ListStatus::Loading;
        state.error = None;
        let request = state.page_request();
        debug!(
            request_id,
            page = request.page,
            limit = request.limit,
            sort_field = ?request.sort_field,
            "issuing list fetch"
        );
        self.inner.publish(state);

        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(inner.run_fetch(request_id, request));
        PendingFetch {
            request_id: Some(request_id),
            handle: Some(handle),
        }
    }
}

impl<T, F> Drop for ListStateController<T, F> {
    fn drop(&mut self) {
        self.inner.latest_request.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
