//! Fetching and caching of search indices.
//!
//! A collection lives in two kinds of remote resources: one JSON metadata
//! document and one or more raw int8 embedding chunks (large collections are
//! split to stay under deployment size limits). The registry fetches all
//! resources for a collection concurrently, assembles them into a
//! [`SearchIndex`], and caches the result for the life of the registry.
//!
//! Concurrent loads of the same collection share a single in-flight
//! fetch-and-assemble: the first caller registers a shared future, later
//! callers await it, and every waiter sees the same outcome. A failed load
//! clears its pending entry without touching the cache, so the next call
//! retries from scratch. The registry itself never retries.

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared, try_join_all};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use url::Url;

use crate::index::SearchIndex;
use crate::{Result, SemquoteError};

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

// Embedding chunks run to ~20MB each; ureq's default body limit is 10MB.
const MAX_RESOURCE_BYTES: u64 = 64 * 1024 * 1024;

/// Where a collection's resources live and how wide its vectors are.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSource {
    pub metadata_url: Url,
    /// Embedding chunk URLs in producer split order. Order is semantically
    /// load-bearing; this is a list, never a set.
    pub embedding_urls: Vec<Url>,
    pub embedding_dim: usize,
}

impl CollectionSource {
    /// Cache key for this collection, derived from the metadata resource
    /// identity.
    #[inline]
    #[must_use]
    pub fn cache_key(&self) -> String {
        self.metadata_url.as_str().to_string()
    }
}

type SharedLoad<T> = Shared<BoxFuture<'static, Result<Arc<SearchIndex<T>>>>>;

struct RegistryInner<T> {
    loaded: HashMap<String, Arc<SearchIndex<T>>>,
    pending: HashMap<String, SharedLoad<T>>,
}

/// Process-wide index cache and in-flight load registry.
///
/// Injectable rather than global: the host application owns one registry per
/// composition root, and tests construct a fresh one each.
pub struct IndexRegistry<T> {
    inner: Arc<Mutex<RegistryInner<T>>>,
    agent: ureq::Agent,
}

impl<T> Default for IndexRegistry<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T> IndexRegistry<T> {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();

        Self {
            inner: Arc::new(Mutex::new(RegistryInner {
                loaded: HashMap::new(),
                pending: HashMap::new(),
            })),
            agent,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        self
    }

    /// Number of fully-loaded collections currently cached.
    #[inline]
    #[must_use]
    pub fn cached_count(&self) -> usize {
        self.lock_inner().loaded.len()
    }

    fn lock_inner(&self) -> std::sync::MutexGuard<'_, RegistryInner<T>> {
        self.inner.lock().expect("registry lock poisoned")
    }
}

impl<T> IndexRegistry<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    /// Returns the index for `source`, fetching and assembling it on first
    /// use.
    ///
    /// Cached stores are returned immediately. While a load for the same
    /// collection is in flight, all callers await the same operation; on
    /// failure every waiter receives the error and the cache stays
    /// unpopulated.
    #[inline]
    pub async fn load(&self, source: &CollectionSource) -> Result<Arc<SearchIndex<T>>> {
        let key = source.cache_key();

        let load = {
            let mut inner = self.lock_inner();
            if let Some(store) = inner.loaded.get(&key) {
                debug!("Index cache hit for {key}");
                return Ok(Arc::clone(store));
            }
            if let Some(pending) = inner.pending.get(&key) {
                debug!("Joining in-flight load for {key}");
                pending.clone()
            } else {
                info!(
                    "Loading collection {key}: {} embedding chunk(s), dim {}",
                    source.embedding_urls.len(),
                    source.embedding_dim
                );
                let load = Self::start_load(
                    Arc::clone(&self.inner),
                    self.agent.clone(),
                    key.clone(),
                    source.clone(),
                );
                inner.pending.insert(key, load.clone());
                load
            }
        };

        load.await
    }

    /// Builds the shared fetch-and-assemble future. The future itself
    /// performs the registry bookkeeping on completion so that every path
    /// (first caller, joined waiters) observes a consistent cache.
    fn start_load(
        inner: Arc<Mutex<RegistryInner<T>>>,
        agent: ureq::Agent,
        key: String,
        source: CollectionSource,
    ) -> SharedLoad<T> {
        async move {
            let result = fetch_and_assemble(&agent, &source).await.map(Arc::new);

            let mut inner = inner.lock().expect("registry lock poisoned");
            match &result {
                Ok(store) => {
                    info!("Collection {key} loaded: {} items", store.len());
                    inner.loaded.insert(key.clone(), Arc::clone(store));
                }
                Err(error) => {
                    warn!("Load failed for {key}: {error}");
                }
            }
            inner.pending.remove(&key);

            result
        }
        .boxed()
        .shared()
    }
}

/// Fetches the metadata document and every embedding chunk concurrently,
/// then assembles the index. All resources must succeed.
async fn fetch_and_assemble<T>(
    agent: &ureq::Agent,
    source: &CollectionSource,
) -> Result<SearchIndex<T>>
where
    T: DeserializeOwned + Send + 'static,
{
    let metadata_task = tokio::task::spawn_blocking({
        let agent = agent.clone();
        let url = source.metadata_url.clone();
        move || fetch_metadata::<T>(&agent, &url)
    });

    let chunk_tasks: Vec<_> = source
        .embedding_urls
        .iter()
        .map(|url| {
            tokio::task::spawn_blocking({
                let agent = agent.clone();
                let url = url.clone();
                move || fetch_bytes(&agent, &url)
            })
        })
        .collect();

    let metadata = metadata_task
        .await
        .map_err(|e| SemquoteError::Task(e.to_string()))??;

    let chunk_results = try_join_all(chunk_tasks)
        .await
        .map_err(|e| SemquoteError::Task(e.to_string()))?;
    let mut chunks = Vec::with_capacity(chunk_results.len());
    for chunk in chunk_results {
        chunks.push(chunk?);
    }

    SearchIndex::assemble(metadata, chunks, source.embedding_dim)
}

fn fetch_metadata<T: DeserializeOwned>(agent: &ureq::Agent, url: &Url) -> Result<Vec<T>> {
    debug!("Fetching metadata from {url}");
    let body = agent
        .get(url.as_str())
        .call()
        .map_err(|e| fetch_error(url, &e))?
        .body_mut()
        .with_config()
        .limit(MAX_RESOURCE_BYTES)
        .read_to_string()
        .map_err(|e| fetch_error(url, &e))?;

    serde_json::from_str(&body).map_err(|e| SemquoteError::MetadataParse {
        url: url.as_str().to_string(),
        reason: e.to_string(),
    })
}

fn fetch_bytes(agent: &ureq::Agent, url: &Url) -> Result<Vec<u8>> {
    debug!("Fetching embedding chunk from {url}");
    let bytes = agent
        .get(url.as_str())
        .call()
        .map_err(|e| fetch_error(url, &e))?
        .body_mut()
        .with_config()
        .limit(MAX_RESOURCE_BYTES)
        .read_to_vec()
        .map_err(|e| fetch_error(url, &e))?;

    debug!("Fetched {} bytes from {url}", bytes.len());
    Ok(bytes)
}

fn fetch_error(url: &Url, error: &ureq::Error) -> SemquoteError {
    match error {
        ureq::Error::StatusCode(status) => SemquoteError::FetchStatus {
            url: url.as_str().to_string(),
            status: *status,
        },
        other => SemquoteError::Fetch {
            url: url.as_str().to_string(),
            reason: other.to_string(),
        },
    }
}
