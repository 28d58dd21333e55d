//! REST implementation of [`ObjectStore`] for Supabase Storage.
//!
//! `SupabaseStorageClient` wraps a `reqwest::Client` and maps each trait
//! method onto one HTTP call.  There is no retry engine: every call is
//! a single attempt bounded by the configured timeout.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use sr_domain::config::{StorageConfig, StorageCredentials};
use sr_domain::error::{Error, Result};
use sr_domain::trace::TraceEvent;
use uuid::Uuid;

use crate::provider::ObjectStore;
use crate::types::{ListRequest, ObjectInfo, RemoveRequest};

const LIST_LIMIT: u32 = 100;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A bucket-scoped client for the Supabase Storage API.
///
/// Created once at startup.  The underlying `reqwest::Client` keeps a
/// connection pool.
#[derive(Clone)]
pub struct SupabaseStorageClient {
    http: Client,
    base_url: String,
    key: String,
    bucket: String,
    timeout: Duration,
}

impl std::fmt::Debug for SupabaseStorageClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseStorageClient")
            .field("base_url", &self.base_url)
            .field("bucket", &self.bucket)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl SupabaseStorageClient {
    pub fn new(cfg: &StorageConfig, creds: &StorageCredentials) -> Result<Self> {
        let timeout = Duration::from_millis(cfg.timeout_ms);
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(Self {
            http,
            base_url: creds.url.trim_end_matches('/').to_owned(),
            key: creds.key.clone(),
            bucket: cfg.bucket.clone(),
            timeout,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    // ── request helpers ──────────────────────────────────────────────

    /// Attach auth and tracing headers.
    fn decorate(&self, rb: RequestBuilder) -> RequestBuilder {
        rb.header("Authorization", format!("Bearer {}", self.key))
            .header("apikey", &self.key)
            .header("X-Client-Info", "sessionrelay")
            .header("X-Trace-Id", Uuid::new_v4().to_string())
    }

    fn url(&self, path: &str) -> String {
        format!("{}/storage/v1{}", self.base_url, path)
    }

    /// Send once, record a `StoreCall` trace event, and return the raw
    /// response regardless of status.
    async fn send(&self, operation: &str, object: &str, rb: RequestBuilder) -> Result<Response> {
        let start = Instant::now();
        let result = self.decorate(rb).send().await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let status = match &result {
            Ok(resp) => resp.status().as_u16(),
            Err(e) => e.status().map(|s| s.as_u16()).unwrap_or(0),
        };
        TraceEvent::StoreCall {
            operation: operation.to_owned(),
            object: object.to_owned(),
            status,
            duration_ms,
        }
        .emit();

        result.map_err(from_reqwest)
    }
}

/// Turn a non-success response into a domain error.
async fn error_for_status(operation: &str, resp: Response) -> Error {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        Error::Auth(format!("{operation} rejected ({status}): {body}"))
    } else {
        Error::Storage(format!("{operation} returned {status}: {body}"))
    }
}

/// Supabase reports a missing object either as a plain 404 or as a 400
/// whose JSON body carries `"statusCode": "404"` / `"error": "not_found"`.
fn is_not_found(status: StatusCode, body: &str) -> bool {
    if status == StatusCode::NOT_FOUND {
        return true;
    }
    if status != StatusCode::BAD_REQUEST {
        return false;
    }
    let lower = body.to_ascii_lowercase();
    lower.contains("not_found") || lower.contains("not found") || lower.contains("\"404\"")
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait]
impl ObjectStore for SupabaseStorageClient {
    async fn list(&self, prefix: &str, search: &str) -> Result<Vec<ObjectInfo>> {
        let url = self.url(&format!("/object/list/{}", self.bucket));
        let req = ListRequest {
            prefix: prefix.to_owned(),
            search: search.to_owned(),
            limit: LIST_LIMIT,
            offset: 0,
        };
        let resp = self.send("list", search, self.http.post(&url).json(&req)).await?;
        if !resp.status().is_success() {
            return Err(error_for_status("list", resp).await);
        }

        let body = resp.text().await.map_err(from_reqwest)?;
        serde_json::from_str(&body)
            .map_err(|e| Error::Storage(format!("failed to parse list response: {e}: {body}")))
    }

    async fn download(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let url = self.url(&format!(
            "/object/{}/{}",
            urlencoding::encode(&self.bucket),
            urlencoding::encode(name)
        ));
        let resp = self.send("download", name, self.http.get(&url)).await?;

        let status = resp.status();
        if status.is_success() {
            let bytes = resp.bytes().await.map_err(from_reqwest)?;
            return Ok(Some(bytes.to_vec()));
        }

        let body = resp.text().await.unwrap_or_default();
        if is_not_found(status, &body) {
            return Ok(None);
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(Error::Auth(format!("download rejected ({status}): {body}")));
        }
        Err(Error::Storage(format!("download returned {status}: {body}")))
    }

    async fn remove(&self, names: &[String]) -> Result<()> {
        let url = self.url(&format!("/object/{}", self.bucket));
        let req = RemoveRequest {
            prefixes: names.to_vec(),
        };
        let object = names.join(",");
        let resp = self
            .send("remove", &object, self.http.delete(&url).json(&req))
            .await?;
        if !resp.status().is_success() {
            return Err(error_for_status("remove", resp).await);
        }
        Ok(())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Error conversion helper
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Convert a `reqwest::Error` into a domain `Error`.
///
/// Timeout errors become `Error::Timeout`; everything else becomes
/// `Error::Http`.
pub fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::net::SocketAddr;
    use std::sync::Arc;

    use axum::body::Bytes;
    use axum::extract::{Path, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::{IntoResponse, Response};
    use axum::routing::{delete, get, post};
    use axum::{Json, Router};
    use parking_lot::Mutex;

    use super::*;

    const KEY: &str = "test-service-key";

    /// In-process stand-in for the storage API, keyed by object name.
    #[derive(Clone, Default)]
    struct FakeBucket {
        objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    fn authorized(headers: &HeaderMap) -> bool {
        let bearer = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        let apikey = headers.get("apikey").and_then(|v| v.to_str().ok()).unwrap_or("");
        bearer == format!("Bearer {KEY}") && apikey == KEY
    }

    async fn list(
        State(bucket): State<FakeBucket>,
        headers: HeaderMap,
        Json(body): Json<serde_json::Value>,
    ) -> Response {
        if !authorized(&headers) {
            return StatusCode::UNAUTHORIZED.into_response();
        }
        let search = body["search"].as_str().unwrap_or("").to_owned();
        let names: Vec<serde_json::Value> = bucket
            .objects
            .lock()
            .keys()
            .filter(|n| n.contains(&search))
            .map(|n| serde_json::json!({ "name": n, "id": "x" }))
            .collect();
        Json(names).into_response()
    }

    async fn download(
        State(bucket): State<FakeBucket>,
        Path((_bucket, name)): Path<(String, String)>,
    ) -> Response {
        if name == "boom.zip" {
            return (StatusCode::INTERNAL_SERVER_ERROR, "storage exploded").into_response();
        }
        match bucket.objects.lock().get(&name) {
            Some(bytes) => Bytes::from(bytes.clone()).into_response(),
            None => (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({
                    "statusCode": "404",
                    "error": "not_found",
                    "message": "Object not found"
                })),
            )
                .into_response(),
        }
    }

    async fn remove(
        State(bucket): State<FakeBucket>,
        Json(body): Json<serde_json::Value>,
    ) -> Response {
        let names: Vec<String> = body["prefixes"]
            .as_array()
            .map(|a| a.iter().filter_map(|v| v.as_str().map(String::from)).collect())
            .unwrap_or_default();
        if names.iter().any(|n| n == "locked.zip") {
            return (StatusCode::FORBIDDEN, "row-level security").into_response();
        }
        let mut objects = bucket.objects.lock();
        for n in &names {
            objects.remove(n);
        }
        Json(serde_json::json!([])).into_response()
    }

    async fn start_fake_storage(bucket: FakeBucket) -> SocketAddr {
        let app = Router::new()
            .route("/storage/v1/object/list/:bucket", post(list))
            .route("/storage/v1/object/:bucket/:name", get(download))
            .route("/storage/v1/object/:bucket", delete(remove))
            .with_state(bucket);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn client_for(addr: SocketAddr, key: &str) -> SupabaseStorageClient {
        let cfg = StorageConfig {
            bucket: "whatsapp-sessions".into(),
            timeout_ms: 2000,
            ..Default::default()
        };
        let creds = StorageCredentials {
            url: format!("http://{addr}/"),
            key: key.into(),
        };
        SupabaseStorageClient::new(&cfg, &creds).unwrap()
    }

    #[tokio::test]
    async fn list_filters_by_search() {
        let bucket = FakeBucket::default();
        bucket.objects.lock().insert("bot-1.zip".into(), vec![1]);
        bucket.objects.lock().insert("bot-2.zip".into(), vec![2]);
        let client = client_for(start_fake_storage(bucket).await, KEY);

        let hits = client.list("", "bot-1.zip").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "bot-1.zip");
    }

    #[tokio::test]
    async fn list_with_bad_key_is_auth_error() {
        let client = client_for(start_fake_storage(FakeBucket::default()).await, "wrong");
        let err = client.list("", "x.zip").await.unwrap_err();
        assert!(matches!(err, Error::Auth(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn download_returns_bytes() {
        let bucket = FakeBucket::default();
        bucket.objects.lock().insert("bot.zip".into(), b"PK\x03\x04".to_vec());
        let client = client_for(start_fake_storage(bucket).await, KEY);

        let bytes = client.download("bot.zip").await.unwrap();
        assert_eq!(bytes.as_deref(), Some(&b"PK\x03\x04"[..]));
    }

    #[tokio::test]
    async fn download_encodes_reserved_characters_in_the_name() {
        let bucket = FakeBucket::default();
        bucket.objects.lock().insert("bot?v=1#a b.zip".into(), b"right".to_vec());
        bucket.objects.lock().insert("bot".into(), b"wrong".to_vec());
        let client = client_for(start_fake_storage(bucket).await, KEY);

        let bytes = client.download("bot?v=1#a b.zip").await.unwrap();
        assert_eq!(bytes.as_deref(), Some(&b"right"[..]));
    }

    #[tokio::test]
    async fn download_missing_object_is_none() {
        let client = client_for(start_fake_storage(FakeBucket::default()).await, KEY);
        assert!(client.download("nope.zip").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn download_server_error_is_storage_error() {
        let client = client_for(start_fake_storage(FakeBucket::default()).await, KEY);
        let err = client.download("boom.zip").await.unwrap_err();
        assert!(matches!(err, Error::Storage(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn remove_deletes_and_reports_rejection() {
        let bucket = FakeBucket::default();
        bucket.objects.lock().insert("bot.zip".into(), vec![1]);
        let objects = bucket.objects.clone();
        let client = client_for(start_fake_storage(bucket).await, KEY);

        client.remove(&["bot.zip".into()]).await.unwrap();
        assert!(objects.lock().is_empty());

        let err = client.remove(&["locked.zip".into()]).await.unwrap_err();
        assert!(matches!(err, Error::Auth(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn unreachable_host_is_http_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let client = client_for(addr, KEY);
        let err = client.list("", "x").await.unwrap_err();
        assert!(matches!(err, Error::Http(_) | Error::Timeout(_)), "got {err:?}");
    }

    #[test]
    fn not_found_detection() {
        assert!(is_not_found(StatusCode::NOT_FOUND, ""));
        assert!(is_not_found(
            StatusCode::BAD_REQUEST,
            r#"{"statusCode":"404","error":"not_found"}"#
        ));
        assert!(!is_not_found(StatusCode::BAD_REQUEST, r#"{"error":"invalid_jwt"}"#));
        assert!(!is_not_found(StatusCode::INTERNAL_SERVER_ERROR, "not found"));
    }
}
