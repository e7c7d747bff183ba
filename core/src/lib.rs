//! Async API client core for the catalog service.
//!
//! # Overview
//! Two pieces work together:
//! - [`ApiClient`], a stateless request executor. It turns an endpoint and
//!   [`RequestOptions`] into an [`HttpRequest`], sends it through a
//!   [`Transport`], and classifies the [`HttpResponse`] into a parsed JSON
//!   payload or an [`ApiError`].
//! - [`FetchCoordinator`], which owns one consumer's [`FetchState`]
//!   (`data`/`loading`/`error`), runs fetches through a [`DataSource`], and
//!   discards results from fetches superseded by a later `refetch`.
//!
//! # Design
//! - Configuration is an explicit [`ApiConfig`]; only the process entry
//!   point reads the environment.
//! - Building and parsing are pure, so the I/O boundary is explicit and
//!   the classification rules are testable without a server.
//! - The coordinator is the only recovery boundary: every executor failure
//!   becomes a static user-facing message in its state.

pub mod client;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod http;
pub mod source;
pub mod transport;
pub mod types;

pub use client::ApiClient;
pub use config::{ApiConfig, BASE_URL_ENV, DEFAULT_BASE_URL};
pub use coordinator::{FetchCoordinator, FetchState};
pub use error::{
    ApiError, ConfigError, FetchError, TransportError, CLIENT_ERROR_STATUS, EMPTY_RESULT_MESSAGE,
    FETCH_FAILED_MESSAGE,
};
pub use http::{HttpMethod, HttpRequest, HttpResponse, RequestOptions};
pub use source::{DataSource, StaticSource};
pub use transport::{ReqwestTransport, Transport};
pub use types::{CatalogItem, CatalogItemPatch, NewCatalogItem};
