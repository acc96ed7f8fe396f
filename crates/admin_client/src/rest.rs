use std::{marker::PhantomData, sync::Arc};

use anyhow::{Context, Result};
use async_trait::async_trait;
use list_state::{PageFetcher, PageRequest};
use serde::de::DeserializeOwned;
use shared::{
    domain::Resource,
    error::{ApiException, ErrorCode},
    protocol::PageResponse,
};
use tracing::debug;

use crate::session::{ensure_success, AdminSession};

/// Fetches pages of one admin API collection.
pub struct RestPageFetcher<T> {
    session: Arc<AdminSession>,
    resource: Resource,
    _item: PhantomData<fn() -> T>,
}

impl<T> RestPageFetcher<T> {
    pub fn new(session: Arc<AdminSession>, resource: Resource) -> Self {
        Self {
            session,
            resource,
            _item: PhantomData,
        }
    }

    pub fn resource(&self) -> Resource {
        self.resource
    }
}

#[async_trait]
impl<T> PageFetcher<T> for RestPageFetcher<T>
where
    T: DeserializeOwned + Send + 'static,
{
    async fn fetch_page(&self, request: PageRequest) -> Result<PageResponse<T>> {
        let url = format!("{}/{}", self.session.server_url(), self.resource.path());
        let limit = request.limit;
        debug!(url = %url, page = request.page, limit, "GET list page");

        let builder = self.session.http().get(&url).query(&request.query_pairs());
        let response = self
            .session
            .authorized(builder)
            .await
            .send()
            .await
            .with_context(|| format!("failed to reach {url}"))?;
        let page: PageResponse<T> = ensure_success(response)
            .await?
            .json()
            .await
            .with_context(|| format!("malformed page from {url}"))?;

        if page.items.len() > limit as usize {
            return Err(ApiException::new(
                ErrorCode::Validation,
                format!(
                    "server returned {} items for a page of {limit}",
                    page.items.len()
                ),
            )
            .into());
        }
        Ok(page)
    }
}

#[cfg(test)]
#[path = "tests/rest_tests.rs"]
mod tests;
