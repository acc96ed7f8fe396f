use std::{future::Future, marker::PhantomData, sync::Arc};

use anyhow::Result;
use async_trait::async_trait;
use shared::{error::ApiException, protocol::PageResponse};

use crate::state::PageRequest;

/// Data source behind a list view.
///
/// Implementations own transport concerns (timeouts, auth, retries); the
/// controller only sees a page or an error.
#[async_trait]
pub trait PageFetcher<T>: Send + Sync {
    async fn fetch_page(&self, request: PageRequest) -> Result<PageResponse<T>>;
}

pub struct FnPageFetcher<T, Func> {
    func: Func,
    _item: PhantomData<fn() -> T>,
}

#[async_trait]
impl<T, Func, Fut> PageFetcher<T> for FnPageFetcher<T, Func>
where
    T: Send + 'static,
    Func: Fn(PageRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<PageResponse<T>>> + Send,
{
    async fn fetch_page(&self, request: PageRequest) -> Result<PageResponse<T>> {
        (self.func)(request).await
    }
}

/// Wraps an async closure as a [`PageFetcher`].
pub fn fetcher_fn<T, Func, Fut>(func: Func) -> Arc<dyn PageFetcher<T>>
where
    T: Send + 'static,
    Func: Fn(PageRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<PageResponse<T>>> + Send + 'static,
{
    Arc::new(FnPageFetcher {
        func,
        _item: PhantomData,
    })
}

/// Human-readable message for a failed fetch.
///
/// A structured API message anywhere in the chain wins over the error's own
/// display text.
pub fn failure_message(err: &anyhow::Error) -> String {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<ApiException>())
        .map(|api| api.message.clone())
        .unwrap_or_else(|| err.to_string())
}

#[cfg(test)]
#[path = "tests/fetcher_tests.rs"]
mod tests;
