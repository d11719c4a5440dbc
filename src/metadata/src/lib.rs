//! Metadata backend contract for SeriesQL
//!
//! This crate holds the value objects the query compiler produces
//! ([`requests`], [`filter::Filter`], [`series::Series`]) and the
//! [`MetadataBackend`] trait an external metadata store implements. The
//! [`backend::memory`] module provides an in-process implementation.

use async_trait::async_trait;

pub mod backend;
pub mod error;
pub mod filter;
pub mod requests;
pub mod series;
pub mod statistics;

pub use error::MetadataError;
pub use filter::Filter;
pub use requests::*;
pub use series::{DateRange, Series};
pub use statistics::Statistics;

// Metadata backend trait
#[async_trait]
pub trait MetadataBackend: Send + Sync {
    /// Backend-wide statistics, empty unless the backend tracks any
    fn statistics(&self) -> Statistics {
        Statistics::empty()
    }

    /// Buffer a write for the specified series
    async fn write(
        &self,
        request: WriteMetadataRequest,
    ) -> Result<WriteMetadataResponse, MetadataError>;

    async fn find_tags(&self, request: FindTagsRequest)
        -> Result<FindTagsResponse, MetadataError>;

    async fn find_series(
        &self,
        request: FindSeriesRequest,
    ) -> Result<FindSeriesResponse, MetadataError>;

    async fn find_series_ids(
        &self,
        request: FindSeriesIdsRequest,
    ) -> Result<FindSeriesIdsResponse, MetadataError>;

    async fn count_series(
        &self,
        request: CountSeriesRequest,
    ) -> Result<CountSeriesResponse, MetadataError>;

    async fn delete_series(
        &self,
        request: DeleteSeriesRequest,
    ) -> Result<DeleteSeriesResponse, MetadataError>;

    async fn find_keys(&self, request: FindKeysRequest)
        -> Result<FindKeysResponse, MetadataError>;
}

/// Routes [`MetadataRequest`]s to the matching backend operation
pub struct MetadataDispatcher<B> {
    backend: B,
}

impl<B: MetadataBackend> MetadataDispatcher<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub async fn dispatch(
        &self,
        request: MetadataRequest,
    ) -> Result<MetadataResponse, MetadataError> {
        log::debug!("Dispatching {} request", request.kind());

        let response = match request {
            MetadataRequest::Write(r) => MetadataResponse::Write(self.backend.write(r).await?),
            MetadataRequest::FindTags(r) => {
                MetadataResponse::FindTags(self.backend.find_tags(r).await?)
            }
            MetadataRequest::FindSeries(r) => {
                MetadataResponse::FindSeries(self.backend.find_series(r).await?)
            }
            MetadataRequest::FindSeriesIds(r) => {
                MetadataResponse::FindSeriesIds(self.backend.find_series_ids(r).await?)
            }
            MetadataRequest::CountSeries(r) => {
                MetadataResponse::CountSeries(self.backend.count_series(r).await?)
            }
            MetadataRequest::DeleteSeries(r) => {
                MetadataResponse::DeleteSeries(self.backend.delete_series(r).await?)
            }
            MetadataRequest::FindKeys(r) => {
                MetadataResponse::FindKeys(self.backend.find_keys(r).await?)
            }
        };

        Ok(response)
    }
}

// Shared backends, e.g. `Arc<dyn MetadataBackend>`
#[async_trait]
impl<T: MetadataBackend + ?Sized> MetadataBackend for std::sync::Arc<T> {
    fn statistics(&self) -> Statistics {
        (**self).statistics()
    }

    async fn write(
        &self,
        request: WriteMetadataRequest,
    ) -> Result<WriteMetadataResponse, MetadataError> {
        (**self).write(request).await
    }

    async fn find_tags(
        &self,
        request: FindTagsRequest,
    ) -> Result<FindTagsResponse, MetadataError> {
        (**self).find_tags(request).await
    }

    async fn find_series(
        &self,
        request: FindSeriesRequest,
    ) -> Result<FindSeriesResponse, MetadataError> {
        (**self).find_series(request).await
    }

    async fn find_series_ids(
        &self,
        request: FindSeriesIdsRequest,
    ) -> Result<FindSeriesIdsResponse, MetadataError> {
        (**self).find_series_ids(request).await
    }

    async fn count_series(
        &self,
        request: CountSeriesRequest,
    ) -> Result<CountSeriesResponse, MetadataError> {
        (**self).count_series(request).await
    }

    async fn delete_series(
        &self,
        request: DeleteSeriesRequest,
    ) -> Result<DeleteSeriesResponse, MetadataError> {
        (**self).delete_series(request).await
    }

    async fn find_keys(
        &self,
        request: FindKeysRequest,
    ) -> Result<FindKeysResponse, MetadataError> {
        (**self).find_keys(request).await
    }
}
