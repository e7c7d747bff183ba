//! Stateless request executor for the catalog API.
//!
//! # Design
//! `ApiClient` holds only its configuration and a transport handle and
//! carries no mutable state between calls. A call is split into
//! `build_request`, which turns an endpoint and options into an
//! `HttpRequest`, the transport round-trip, and `parse_response`, which
//! classifies the `HttpResponse` into a payload or an `ApiError`. The two
//! pure halves are public so they can be exercised without any I/O.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, RequestOptions};
use crate::transport::{ReqwestTransport, Transport};

const CONTENT_TYPE: &str = "content-type";
const JSON_CONTENT_TYPE: &str = "application/json";

/// Typed JSON client for endpoints relative to a configured base URL.
///
/// Successful calls yield `Ok(Some(value))`, or `Ok(None)` for a
/// `204 No Content` response.
#[derive(Debug)]
pub struct ApiClient<T = ReqwestTransport> {
    config: ApiConfig,
    transport: Arc<T>,
}

impl<T> Clone for ApiClient<T> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            transport: Arc::clone(&self.transport),
        }
    }
}

impl ApiClient<ReqwestTransport> {
    pub fn from_config(config: ApiConfig) -> Self {
        Self::new(config, ReqwestTransport::new())
    }
}

impl<T: Transport> ApiClient<T> {
    pub fn new(config: ApiConfig, transport: T) -> Self {
        Self {
            config,
            transport: Arc::new(transport),
        }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn build_request(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<HttpRequest, ApiError> {
        if endpoint.is_empty() {
            return Err(ApiError::InvalidRequest("endpoint must not be empty".to_string()));
        }
        if options.method == HttpMethod::Get && options.data.is_some() {
            return Err(ApiError::InvalidRequest(
                "a GET request cannot have a body".to_string(),
            ));
        }

        let path = endpoint.strip_prefix('/').unwrap_or(endpoint);
        let url = format!("{}/{path}", self.config.base_url());

        let body = options
            .data
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| ApiError::Serialization(e.to_string()))?;

        let mut headers: Vec<(String, Option<String>)> = self
            .config
            .default_headers()
            .iter()
            .map(|(name, value)| (name.clone(), Some(value.clone())))
            .collect();
        if body.is_some() {
            merge_header(
                &mut headers,
                CONTENT_TYPE.to_string(),
                Some(JSON_CONTENT_TYPE.to_string()),
            );
        }
        for (name, value) in options.headers {
            merge_header(&mut headers, name, value);
        }

        Ok(HttpRequest {
            method: options.method,
            url,
            headers: headers
                .into_iter()
                .filter_map(|(name, value)| value.map(|value| (name, value)))
                .collect(),
            body,
            timeout: options.timeout,
        })
    }

    pub fn parse_response<R: DeserializeOwned>(
        &self,
        response: HttpResponse,
    ) -> Result<Option<R>, ApiError> {
        if !response.is_success() {
            let payload = error_payload(&response);
            return Err(ApiError::Status {
                status: response.status,
                payload,
            });
        }
        if response.status == 204 {
            return Ok(None);
        }
        let body = response
            .body
            .ok_or_else(|| ApiError::Network("response body could not be read".to_string()))?;
        serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| ApiError::MalformedBody(e.to_string()))
    }

    pub async fn execute<R: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<Option<R>, ApiError> {
        let result = self.round_trip(endpoint, options).await;
        if let Err(err) = &result {
            warn!(endpoint, status = err.status(), error = %err, "Request failed");
        }
        result
    }

    async fn round_trip<R: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<Option<R>, ApiError> {
        let request = self.build_request(endpoint, options)?;
        debug!(method = %request.method, url = %request.url, "Sending request");
        let response = self.transport.send(request).await?;
        debug!(status = response.status, "Received response");
        self.parse_response(response)
    }

    pub async fn get<R: DeserializeOwned>(&self, endpoint: &str) -> Result<Option<R>, ApiError> {
        self.get_with(endpoint, RequestOptions::default()).await
    }

    /// GET with caller headers and timeout; `method` is forced and `data`
    /// is dropped.
    pub async fn get_with<R: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<Option<R>, ApiError> {
        self.execute(endpoint, fixed_method(HttpMethod::Get, options, None))
            .await
    }

    pub async fn post<B, R>(&self, endpoint: &str, body: &B) -> Result<Option<R>, ApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.post_with(endpoint, body, RequestOptions::default()).await
    }

    pub async fn post_with<B, R>(
        &self,
        endpoint: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<Option<R>, ApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.send_with_body(HttpMethod::Post, endpoint, body, options)
            .await
    }

    pub async fn put<B, R>(&self, endpoint: &str, body: &B) -> Result<Option<R>, ApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.put_with(endpoint, body, RequestOptions::default()).await
    }

    pub async fn put_with<B, R>(
        &self,
        endpoint: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<Option<R>, ApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.send_with_body(HttpMethod::Put, endpoint, body, options)
            .await
    }

    pub async fn patch<B, R>(&self, endpoint: &str, body: &B) -> Result<Option<R>, ApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.patch_with(endpoint, body, RequestOptions::default()).await
    }

    pub async fn patch_with<B, R>(
        &self,
        endpoint: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<Option<R>, ApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.send_with_body(HttpMethod::Patch, endpoint, body, options)
            .await
    }

    pub async fn delete<R: DeserializeOwned>(
        &self,
        endpoint: &str,
    ) -> Result<Option<R>, ApiError> {
        self.delete_with(endpoint, RequestOptions::default()).await
    }

    pub async fn delete_with<R: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<Option<R>, ApiError> {
        self.execute(endpoint, fixed_method(HttpMethod::Delete, options, None))
            .await
    }

    async fn send_with_body<B, R>(
        &self,
        method: HttpMethod,
        endpoint: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<Option<R>, ApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let data = serde_json::to_value(body).map_err(|e| ApiError::Serialization(e.to_string()))?;
        self.execute(endpoint, fixed_method(method, options, Some(data)))
            .await
    }
}

/// Keep the caller's headers and timeout, overriding method and body.
fn fixed_method(method: HttpMethod, options: RequestOptions, data: Option<Value>) -> RequestOptions {
    RequestOptions {
        method,
        data,
        ..options
    }
}

/// Replace an existing header of the same name (ignoring case) or append.
fn merge_header(headers: &mut Vec<(String, Option<String>)>, name: String, value: Option<String>) {
    match headers
        .iter()
        .position(|(existing, _)| existing.eq_ignore_ascii_case(&name))
    {
        Some(index) => headers[index] = (name, value),
        None => headers.push((name, value)),
    }
}

/// Best-effort body of a failed response: parsed JSON when declared as
/// JSON, raw text otherwise, nothing when unreadable or unparseable.
fn error_payload(response: &HttpResponse) -> Option<Value> {
    let body = response.body.as_deref()?;
    if response.is_json() {
        serde_json::from_str(body).ok()
    } else {
        Some(Value::String(body.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::error::{TransportError, CLIENT_ERROR_STATUS};

    /// Records every request and replies with a fixed outcome.
    struct ScriptedTransport {
        reply: Result<HttpResponse, TransportError>,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedTransport {
        fn replying(reply: Result<HttpResponse, TransportError>) -> Self {
            Self {
                reply,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.seen.lock().unwrap().push(request);
            self.reply.clone()
        }
    }

    fn json_response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Some(body.to_string()),
        }
    }

    fn client() -> ApiClient<ScriptedTransport> {
        client_replying(Ok(json_response(200, "[]")))
    }

    fn client_replying(reply: Result<HttpResponse, TransportError>) -> ApiClient<ScriptedTransport> {
        ApiClient::new(
            ApiConfig::new("http://localhost:3000/api/v1").unwrap(),
            ScriptedTransport::replying(reply),
        )
    }

    fn last_request(client: &ApiClient<ScriptedTransport>) -> HttpRequest {
        client.transport.seen.lock().unwrap().last().cloned().unwrap()
    }

    #[test]
    fn get_without_body_has_no_content_type() {
        let req = client()
            .build_request("catalog", RequestOptions::default())
            .unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://localhost:3000/api/v1/catalog");
        assert!(req.body.is_none());
        assert!(req.header("content-type").is_none());
        assert!(req.headers.is_empty());
    }

    #[test]
    fn leading_slash_is_stripped_from_endpoint() {
        let req = client()
            .build_request("/catalog/7", RequestOptions::default())
            .unwrap();
        assert_eq!(req.url, "http://localhost:3000/api/v1/catalog/7");
    }

    #[test]
    fn empty_endpoint_is_rejected() {
        let err = client()
            .build_request("", RequestOptions::default())
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidRequest(_)));
        assert_eq!(err.status(), CLIENT_ERROR_STATUS);
    }

    #[test]
    fn get_with_body_is_rejected() {
        let options = RequestOptions::default().with_data(json!({"q": 1}));
        let err = client().build_request("catalog", options).unwrap_err();
        assert!(matches!(err, ApiError::InvalidRequest(_)));
    }

    #[test]
    fn body_sets_json_content_type() {
        let options = RequestOptions::new(HttpMethod::Post).with_data(json!({"title": "Heat"}));
        let req = client().build_request("catalog", options).unwrap();
        assert_eq!(
            req.headers,
            vec![("content-type".to_string(), "application/json".to_string())]
        );
        let body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"title": "Heat"}));
    }

    #[test]
    fn caller_headers_override_defaults_ignoring_case() {
        let options = RequestOptions::new(HttpMethod::Put)
            .with_data(json!({}))
            .with_header("Content-Type", "application/merge-patch+json")
            .with_header("x-trace", "abc");
        let req = client().build_request("catalog/1", options).unwrap();
        assert_eq!(
            req.headers,
            vec![
                ("Content-Type".to_string(), "application/merge-patch+json".to_string()),
                ("x-trace".to_string(), "abc".to_string()),
            ]
        );
    }

    #[test]
    fn undefined_override_removes_header() {
        let options = RequestOptions::new(HttpMethod::Post)
            .with_data(json!([1, 2]))
            .without_header("content-type");
        let req = client().build_request("catalog", options).unwrap();
        assert!(req.header("content-type").is_none());
        assert!(req.body.is_some());
    }

    #[test]
    fn configured_default_headers_are_sent() {
        let config = ApiConfig::new("http://localhost:3000/api/v1")
            .unwrap()
            .with_default_header("accept", "application/json");
        let client = ApiClient::new(config, ScriptedTransport::replying(Ok(json_response(200, "[]"))));
        let req = client
            .build_request("catalog", RequestOptions::default().without_header("x-missing"))
            .unwrap();
        assert_eq!(req.headers, vec![("accept".to_string(), "application/json".to_string())]);
    }

    #[test]
    fn parse_success_returns_payload() {
        let items: Option<Vec<u32>> = client()
            .parse_response(json_response(200, "[1,2,3]"))
            .unwrap();
        assert_eq!(items, Some(vec![1, 2, 3]));
    }

    #[test]
    fn parse_no_content_skips_body() {
        let response = HttpResponse {
            status: 204,
            headers: Vec::new(),
            body: Some("not json at all".to_string()),
        };
        let parsed: Option<Value> = client().parse_response(response).unwrap();
        assert!(parsed.is_none());
    }

    #[test]
    fn parse_not_found_captures_json_payload() {
        let err = client()
            .parse_response::<Value>(json_response(404, r#"{"reason":"not found"}"#))
            .unwrap_err();
        assert_eq!(err.status(), 404);
        assert_eq!(err.message(), "Request failed with status 404");
        assert_eq!(err.payload(), Some(&json!({"reason": "not found"})));
    }

    #[test]
    fn parse_error_with_text_body_keeps_raw_text() {
        let response = HttpResponse {
            status: 503,
            headers: vec![("content-type".to_string(), "text/plain".to_string())],
            body: Some("down for maintenance".to_string()),
        };
        let err = client().parse_response::<Value>(response).unwrap_err();
        assert_eq!(err.status(), 503);
        assert_eq!(err.payload(), Some(&json!("down for maintenance")));
    }

    #[test]
    fn parse_error_with_broken_json_has_no_payload() {
        let err = client()
            .parse_response::<Value>(json_response(500, "{oops"))
            .unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 500, payload: None }));
    }

    #[test]
    fn parse_error_with_unreadable_body_has_no_payload() {
        let response = HttpResponse {
            status: 502,
            headers: Vec::new(),
            body: None,
        };
        let err = client().parse_response::<Value>(response).unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 502, payload: None }));
    }

    #[test]
    fn parse_unreadable_success_body_is_network_error() {
        let response = HttpResponse {
            status: 200,
            headers: Vec::new(),
            body: None,
        };
        let err = client().parse_response::<Vec<String>>(response).unwrap_err();
        assert!(matches!(err, ApiError::Network(_)));
        assert_eq!(err.status(), CLIENT_ERROR_STATUS);
    }

    #[test]
    fn parse_malformed_success_body() {
        let err = client()
            .parse_response::<Vec<u32>>(json_response(200, "not json"))
            .unwrap_err();
        assert!(matches!(err, ApiError::MalformedBody(_)));
        assert_eq!(err.status(), CLIENT_ERROR_STATUS);
    }

    #[tokio::test]
    async fn post_sends_json_body() {
        let client = client_replying(Ok(json_response(201, r#"{"id":1}"#)));
        let input = json!({"title": "Heat", "releaseYear": 1995, "tags": ["crime"]});
        let created: Option<Value> = client.post("/catalog", &input).await.unwrap();
        assert_eq!(created, Some(json!({"id": 1})));

        let req = last_request(&client);
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.header("content-type"), Some("application/json"));
        let sent: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(sent, input);
    }

    #[tokio::test]
    async fn convenience_methods_use_fixed_verbs() {
        let client = client_replying(Ok(HttpResponse {
            status: 204,
            headers: Vec::new(),
            body: None,
        }));
        let body = json!({"rating": 4.5});

        client.get::<Value>("catalog/1").await.unwrap();
        assert_eq!(last_request(&client).method, HttpMethod::Get);
        client.put::<_, Value>("catalog/1", &body).await.unwrap();
        assert_eq!(last_request(&client).method, HttpMethod::Put);
        client.patch::<_, Value>("catalog/1", &body).await.unwrap();
        assert_eq!(last_request(&client).method, HttpMethod::Patch);
        let deleted = client.delete::<Value>("catalog/1").await.unwrap();
        assert_eq!(last_request(&client).method, HttpMethod::Delete);
        assert!(deleted.is_none());
        assert!(last_request(&client).body.is_none());
    }

    #[tokio::test]
    async fn post_with_carries_caller_headers() {
        let client = client_replying(Ok(json_response(201, r#"{"id":2}"#)));
        let options = RequestOptions::new(HttpMethod::Delete)
            .with_data(json!("ignored"))
            .with_header("x-request-id", "r-42")
            .with_timeout(std::time::Duration::from_secs(5));
        let _: Option<Value> = client
            .post_with("catalog", &json!({"title": "Heat"}), options)
            .await
            .unwrap();

        let req = last_request(&client);
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.header("x-request-id"), Some("r-42"));
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.timeout, Some(std::time::Duration::from_secs(5)));
        let sent: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(sent, json!({"title": "Heat"}));
    }

    #[tokio::test]
    async fn get_with_drops_body_and_keeps_headers() {
        let client = client();
        let options = RequestOptions::new(HttpMethod::Post)
            .with_data(json!({"q": 1}))
            .with_header("accept-language", "ar");
        let _: Option<Value> = client.get_with("catalog", options).await.unwrap();

        let req = last_request(&client);
        assert_eq!(req.method, HttpMethod::Get);
        assert!(req.body.is_none());
        assert!(req.header("content-type").is_none());
        assert_eq!(req.header("accept-language"), Some("ar"));
    }

    #[tokio::test]
    async fn body_verbs_with_options_can_drop_content_type() {
        let client = client();
        let patch = json!({"rating": 4.0});
        let _: Option<Value> = client
            .patch_with("catalog/1", &patch, RequestOptions::default().without_header("content-type"))
            .await
            .unwrap();
        assert_eq!(last_request(&client).method, HttpMethod::Patch);
        assert!(last_request(&client).header("content-type").is_none());

        let _: Option<Value> = client
            .put_with("catalog/1", &patch, RequestOptions::default().with_header("if-match", "v1"))
            .await
            .unwrap();
        assert_eq!(last_request(&client).header("if-match"), Some("v1"));

        let _: Option<Value> = client
            .delete_with("catalog/1", RequestOptions::default().with_header("x-reason", "dup"))
            .await
            .unwrap();
        let req = last_request(&client);
        assert_eq!(req.method, HttpMethod::Delete);
        assert_eq!(req.header("x-reason"), Some("dup"));
    }

    #[tokio::test]
    async fn transport_failure_is_network_error() {
        let client = client_replying(Err(TransportError::new("connection refused")));
        let err = client.get::<Value>("catalog").await.unwrap_err();
        assert_eq!(err.status(), 500);
        assert!(err.message().starts_with("Network or Client Error:"));
        assert!(err.message().ends_with("connection refused"));
        assert!(err.payload().is_none());
    }

    #[tokio::test]
    async fn timeout_is_passed_through() {
        let client = client();
        let options = RequestOptions::default().with_timeout(std::time::Duration::from_secs(2));
        client.execute::<Value>("catalog", options).await.unwrap();
        assert_eq!(
            last_request(&client).timeout,
            Some(std::time::Duration::from_secs(2))
        );
    }
}
