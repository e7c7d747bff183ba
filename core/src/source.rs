//! Where a `FetchCoordinator` gets its collection from.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::transport::Transport;

/// Loads one collection for an endpoint.
#[async_trait]
pub trait DataSource<T>: Send + Sync {
    async fn load(&self, endpoint: &str) -> Result<Vec<T>, ApiError>;
}

/// A `204 No Content` reply counts as an empty collection.
#[async_trait]
impl<T, X> DataSource<T> for ApiClient<X>
where
    T: DeserializeOwned + Send + 'static,
    X: Transport + 'static,
{
    async fn load(&self, endpoint: &str) -> Result<Vec<T>, ApiError> {
        Ok(self.get::<Vec<T>>(endpoint).await?.unwrap_or_default())
    }
}

/// Offline source serving a pre-supplied dataset, whatever the endpoint.
#[derive(Debug, Clone)]
pub struct StaticSource<T> {
    items: Vec<T>,
    latency: Option<Duration>,
}

impl<T> StaticSource<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            latency: None,
        }
    }

    /// Delay every load, imitating a network round-trip.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }
}

#[async_trait]
impl<T> DataSource<T> for StaticSource<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn load(&self, _endpoint: &str) -> Result<Vec<T>, ApiError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        Ok(self.items.clone())
    }
}
