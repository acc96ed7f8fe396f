use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use futures::future::BoxFuture;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::{controller::ListStateController, state::ListFilters};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

type DebouncedCallback<A> = Arc<dyn Fn(A) -> BoxFuture<'static, ()> + Send + Sync>;

/// Trailing-edge debouncer.
///
/// Each `update` restarts the quiet period; only the last argument reaches
/// the callback once `delay` passes without a new update.
pub struct Debouncer<A> {
    delay: Duration,
    callback: DebouncedCallback<A>,
    pending: Option<JoinHandle<()>>,
}

impl<A: Send + 'static> Debouncer<A> {
    pub fn new<C>(delay: Duration, callback: C) -> Self
    where
        C: Fn(A) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        Self {
            delay,
            callback: Arc::new(callback),
            pending: None,
        }
    }

    pub fn with_default_delay<C>(callback: C) -> Self
    where
        C: Fn(A) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        Self::new(DEFAULT_DEBOUNCE, callback)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn update(&mut self, arg: A) {
        self.cancel();
        let delay = self.delay;
        let callback = Arc::clone(&self.callback);
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Detached so a later `cancel` cannot interrupt a running callback.
            tokio::spawn(callback(arg));
        }));
    }

    /// Drops the scheduled invocation, if any. A later `update` schedules again.
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|pending| !pending.is_finished())
    }
}

impl<A> Drop for Debouncer<A> {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }
}

/// Search box bound to a list view: keystrokes become a filter patch after
/// the quiet period.
///
/// Holds the controller weakly, so an unmounted view is never refetched.
pub struct DebouncedSearch {
    debouncer: Debouncer<String>,
}

impl DebouncedSearch {
    pub fn new<T, F, P>(
        controller: &Arc<ListStateController<T, F>>,
        delay: Duration,
        to_patch: P,
    ) -> Self
    where
        T: Clone + Send + Sync + 'static,
        F: ListFilters,
        P: Fn(String) -> F::Patch + Send + Sync + 'static,
    {
        let controller: Weak<ListStateController<T, F>> = Arc::downgrade(controller);
        let to_patch = Arc::new(to_patch);
        let debouncer = Debouncer::new(delay, move |query: String| {
            let controller = controller.clone();
            let to_patch = Arc::clone(&to_patch);
            Box::pin(async move {
                let Some(controller) = controller.upgrade() else {
                    debug!("search settled after list view was dropped");
                    return;
                };
                let _background = controller.merge_filters(to_patch(query)).await;
            }) as BoxFuture<'static, ()>
        });
        Self { debouncer }
    }

    pub fn update(&mut self, query: impl Into<String>) {
        self.debouncer.update(query.into());
    }

    pub fn cancel(&mut self) {
        self.debouncer.cancel();
    }

    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }
}

#[cfg(test)]
#[path = "tests/debounce_tests.rs"]
mod tests;
