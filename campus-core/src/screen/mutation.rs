use crate::api::ResourceBackend;
use crate::error::Result;
use crate::query::QueryClient;
use crate::resource::RecordId;
use serde_json::Value;
use std::future::Future;
use tracing::{info, warn};

/// Runs writes against the backend and invalidates the affected queries.
///
/// Cached data is never patched locally: on success the roots are marked
/// stale and the next read re-fetches. On failure nothing is invalidated and
/// the caller gets the user-facing message.
pub struct MutationDispatcher<'a, B: ?Sized> {
    backend: &'a B,
    cache: &'a QueryClient,
}

impl<'a, B> MutationDispatcher<'a, B>
where
    B: ResourceBackend + ?Sized,
{
    pub fn new(backend: &'a B, cache: &'a QueryClient) -> Self {
        Self { backend, cache }
    }

    pub fn backend(&self) -> &'a B {
        self.backend
    }

    pub fn cache(&self) -> &'a QueryClient {
        self.cache
    }

    /// Awaits one write. Invalidates `invalidates` on success only.
    pub async fn run<T, Fut>(&self, label: &str, invalidates: &[&str], call: Fut) -> Result<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        match call.await {
            Ok(value) => {
                for root in invalidates {
                    self.cache.invalidate(root);
                }
                info!("✅ {} succeeded", label);
                Ok(value)
            }
            Err(e) => {
                warn!("❌ {} failed: {}", label, e);
                Err(e)
            }
        }
    }

    /// Like [`Self::run`], with the error reduced to its user-facing text.
    pub async fn dispatch<T, Fut>(&self, label: &str, invalidates: &[&str], call: Fut) -> std::result::Result<T, String>
    where
        Fut: Future<Output = Result<T>>,
    {
        self.run(label, invalidates, call)
            .await
            .map_err(|e| e.user_message())
    }

    pub async fn create(&self, endpoint: &str, data: &Value) -> std::result::Result<Value, String> {
        let label = format!("POST {}", endpoint);
        self.dispatch(&label, &[endpoint], self.backend.create(endpoint, data))
            .await
    }

    pub async fn update(&self, endpoint: &str, id: RecordId, data: &Value) -> std::result::Result<Value, String> {
        let label = format!("PUT {}/{}", endpoint, id);
        self.dispatch(&label, &[endpoint], self.backend.update(endpoint, id, data))
            .await
    }

    pub async fn delete(&self, endpoint: &str, id: RecordId) -> std::result::Result<(), String> {
        let label = format!("DELETE {}/{}", endpoint, id);
        self.dispatch(&label, &[endpoint], self.backend.delete(endpoint, id))
            .await
    }
}
