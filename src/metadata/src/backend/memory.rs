use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::{
    CountSeriesRequest, CountSeriesResponse, DateRange, DeleteSeriesRequest,
    DeleteSeriesResponse, Filter, FindKeysRequest, FindKeysResponse, FindSeriesIdsRequest,
    FindSeriesIdsResponse, FindSeriesRequest, FindSeriesResponse, FindTagsRequest,
    FindTagsResponse, MetadataBackend, MetadataError, Series, Statistics, WriteMetadataRequest,
    WriteMetadataResponse,
};

#[derive(Debug, Clone)]
struct Entry {
    series: Series,
    range: DateRange,
}

/// Metadata backend keeping every series in process memory
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    // Matching series ordered by id, together with their ids
    async fn select(&self, filter: &Filter, range: &DateRange) -> Vec<(String, Series)> {
        let entries = self.entries.read().await;

        let mut matches: Vec<(String, Series)> = entries
            .iter()
            .filter(|(_, entry)| entry.range.overlaps(range) && filter.apply(&entry.series))
            .map(|(id, entry)| (id.clone(), entry.series.clone()))
            .collect();

        matches.sort_by(|a, b| a.0.cmp(&b.0));
        matches
    }
}

// Truncate to the limit, reporting whether anything was cut off
fn apply_limit<T>(mut items: Vec<T>, limit: Option<usize>) -> (Vec<T>, bool) {
    match limit {
        Some(limit) if items.len() > limit => {
            items.truncate(limit);
            (items, true)
        }
        _ => (items, false),
    }
}

#[async_trait]
impl MetadataBackend for MemoryBackend {
    fn statistics(&self) -> Statistics {
        match self.entries.try_read() {
            Ok(entries) => Statistics::of("series", entries.len() as u64),
            Err(_) => Statistics::empty(),
        }
    }

    async fn write(
        &self,
        request: WriteMetadataRequest,
    ) -> Result<WriteMetadataResponse, MetadataError> {
        request.series.validate()?;

        let id = request.series.id();
        let mut entries = self.entries.write().await;

        let written = match entries.get(&id) {
            Some(existing) => existing.range.join(&request.range),
            None => request.range,
        };

        log::debug!("Writing series {} ({id})", request.series);
        entries.insert(
            id.clone(),
            Entry {
                series: request.series,
                range: written,
            },
        );

        Ok(WriteMetadataResponse {
            id,
            statistics: Statistics::of("written", 1),
        })
    }

    async fn find_tags(
        &self,
        request: FindTagsRequest,
    ) -> Result<FindTagsResponse, MetadataError> {
        let (matches, _) = apply_limit(
            self.select(&request.filter, &request.range).await,
            request.limit,
        );

        let mut tags: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (_, series) in &matches {
            for (name, value) in &series.tags {
                tags.entry(name.clone()).or_default().insert(value.clone());
            }
        }

        Ok(FindTagsResponse {
            tags,
            size: matches.len(),
            statistics: Statistics::empty(),
        })
    }

    async fn find_series(
        &self,
        request: FindSeriesRequest,
    ) -> Result<FindSeriesResponse, MetadataError> {
        let matches = self.select(&request.filter, &request.range).await;
        let (series, limited) = apply_limit(
            matches.into_iter().map(|(_, series)| series).collect(),
            request.limit,
        );

        Ok(FindSeriesResponse {
            series,
            limited,
            statistics: Statistics::empty(),
        })
    }

    async fn find_series_ids(
        &self,
        request: FindSeriesIdsRequest,
    ) -> Result<FindSeriesIdsResponse, MetadataError> {
        let matches = self.select(&request.filter, &request.range).await;
        let (ids, limited) = apply_limit(
            matches.into_iter().map(|(id, _)| id).collect(),
            request.limit,
        );

        Ok(FindSeriesIdsResponse {
            ids: ids.into_iter().collect(),
            limited,
            statistics: Statistics::empty(),
        })
    }

    async fn count_series(
        &self,
        request: CountSeriesRequest,
    ) -> Result<CountSeriesResponse, MetadataError> {
        let (matches, limited) = apply_limit(
            self.select(&request.filter, &request.range).await,
            request.limit,
        );

        Ok(CountSeriesResponse {
            count: matches.len() as u64,
            limited,
            statistics: Statistics::empty(),
        })
    }

    async fn delete_series(
        &self,
        request: DeleteSeriesRequest,
    ) -> Result<DeleteSeriesResponse, MetadataError> {
        let (matches, _) = apply_limit(
            self.select(&request.filter, &request.range).await,
            request.limit,
        );

        let mut entries = self.entries.write().await;
        let mut deleted = 0;
        let mut failed = 0;

        for (id, _) in matches {
            // A concurrent delete may have removed it since selection
            if entries.remove(&id).is_some() {
                deleted += 1;
            } else {
                failed += 1;
            }
        }

        log::debug!("Deleted {deleted} series ({failed} already gone)");

        Ok(DeleteSeriesResponse {
            deleted,
            failed,
            statistics: Statistics::empty(),
        })
    }

    async fn find_keys(
        &self,
        request: FindKeysRequest,
    ) -> Result<FindKeysResponse, MetadataError> {
        let (matches, _) = apply_limit(
            self.select(&request.filter, &request.range).await,
            request.limit,
        );

        let mut keys = BTreeSet::new();
        let mut duplicates = 0;
        for (_, series) in &matches {
            if !keys.insert(series.key.clone()) {
                duplicates += 1;
            }
        }

        Ok(FindKeysResponse {
            keys,
            size: matches.len(),
            duplicates,
            statistics: Statistics::empty(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MetadataDispatcher, MetadataRequest, MetadataResponse};

    fn range() -> DateRange {
        DateRange::new(0, 1_000).unwrap()
    }

    async fn seeded() -> MemoryBackend {
        let backend = MemoryBackend::new();
        for series in [
            Series::new("cpu").with_tag("host", "a").with_tag("dc", "eu"),
            Series::new("cpu").with_tag("host", "b").with_tag("dc", "us"),
            Series::new("mem").with_tag("host", "a"),
        ] {
            backend
                .write(WriteMetadataRequest {
                    series,
                    range: range(),
                })
                .await
                .unwrap();
        }
        backend
    }

    #[tokio::test]
    async fn test_write_and_find_series() {
        let backend = seeded().await;

        let response = backend
            .find_series(FindSeriesRequest::new(
                Filter::match_tag("host", "a"),
                range(),
                None,
            ))
            .await
            .unwrap();

        assert_eq!(response.series.len(), 2);
        assert!(!response.limited);
        assert_eq!(backend.statistics().get("series"), Some(3));
    }

    #[tokio::test]
    async fn test_write_rejects_invalid_series() {
        let backend = MemoryBackend::new();
        let result = backend
            .write(WriteMetadataRequest {
                series: Series::new(""),
                range: range(),
            })
            .await;

        assert!(matches!(result, Err(MetadataError::InvalidSeries(_))));
    }

    #[tokio::test]
    async fn test_range_must_overlap() {
        let backend = seeded().await;

        let response = backend
            .count_series(CountSeriesRequest::new(
                Filter::True,
                DateRange::new(5_000, 6_000).unwrap(),
                None,
            ))
            .await
            .unwrap();

        assert_eq!(response.count, 0);
    }

    #[tokio::test]
    async fn test_limit_sets_limited_flag() {
        let backend = seeded().await;

        let response = backend
            .find_series_ids(FindSeriesIdsRequest::new(Filter::True, range(), Some(2)))
            .await
            .unwrap();

        assert_eq!(response.ids.len(), 2);
        assert!(response.limited);
    }

    #[tokio::test]
    async fn test_find_tags_and_keys() {
        let backend = seeded().await;

        let tags = backend
            .find_tags(FindTagsRequest::new(Filter::match_key("cpu"), range(), None))
            .await
            .unwrap();
        assert_eq!(tags.size, 2);
        assert_eq!(tags.tags["dc"].len(), 2);
        assert!(!tags.tags.contains_key("role"));

        let keys = backend
            .find_keys(FindKeysRequest::new(Filter::True, range(), None))
            .await
            .unwrap();
        assert_eq!(keys.keys.len(), 2);
        assert_eq!(keys.duplicates, 1);
        assert_eq!(keys.size, 3);
    }

    #[tokio::test]
    async fn test_delete_through_dispatcher() {
        let dispatcher = MetadataDispatcher::new(seeded().await);

        let response = dispatcher
            .dispatch(MetadataRequest::DeleteSeries(DeleteSeriesRequest::new(
                Filter::match_key("cpu"),
                range(),
                None,
            )))
            .await
            .unwrap();

        match response {
            MetadataResponse::DeleteSeries(r) => assert_eq!(r.deleted, 2),
            other => panic!("Unexpected response: {other:?}"),
        }
        assert_eq!(dispatcher.backend().statistics().get("series"), Some(1));
    }
}
