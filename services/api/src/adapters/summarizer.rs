//! services/api/src/adapters/summarizer.rs
//!
//! This module contains the adapter for the external summarization service.
//! It implements the `SummarizationService` port from the `core` crate.
//!
//! The service exposes `GET /health` and `POST /summarize_pdf/` (multipart field
//! `file`) answering `{"summary": "..."}`.

use async_trait::async_trait;
use docsum_core::domain::StorageHandle;
use docsum_core::ports::{SummarizationService, SummarizeError};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `SummarizationService` over HTTP. Never retries.
#[derive(Clone)]
pub struct HttpSummarizer {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    health_check: bool,
    health_timeout: Duration,
}

impl HttpSummarizer {
    /// Creates a new `HttpSummarizer`. `timeout` bounds the whole summarize call.
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        health_check: bool,
        health_timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            health_check,
            health_timeout,
        })
    }

    /// Checks `/health`. Any failure means the service is unavailable.
    async fn check_health(&self) -> Result<(), SummarizeError> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .timeout(self.health_timeout)
            .send()
            .await
            .map_err(|e| {
                warn!("Summarization health check failed: {}", e);
                SummarizeError::ServiceUnavailable(format!(
                    "health check of {} failed: {}",
                    self.base_url, e
                ))
            })?;

        if !response.status().is_success() {
            warn!("Summarization health check returned {}", response.status());
            return Err(SummarizeError::ServiceUnavailable(format!(
                "health check of {} returned {}",
                self.base_url,
                response.status()
            )));
        }
        Ok(())
    }

    fn transport_error(&self, e: reqwest::Error) -> SummarizeError {
        if e.is_timeout() {
            SummarizeError::Timeout(self.timeout)
        } else if e.is_connect() {
            SummarizeError::ServiceUnavailable(format!("{} is not reachable: {}", self.base_url, e))
        } else {
            SummarizeError::TransportError(e.to_string())
        }
    }
}

/// Picks the most useful message out of an error body.
fn upstream_message(body: &str, status: reqwest::StatusCode) -> String {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|json| {
        ["detail", "message"]
            .iter()
            .find_map(|key| json.get(key).and_then(Value::as_str).map(str::to_string))
    });
    match from_json {
        Some(message) => message,
        None if !body.trim().is_empty() => body.trim().to_string(),
        None => status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string(),
    }
}

fn mime_for(file_name: &str) -> &'static str {
    match file_name.rsplit_once('.').map(|(_, ext)| ext) {
        Some("pdf") => "application/pdf",
        Some("doc") => "application/msword",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

//=========================================================================================
// `SummarizationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl SummarizationService for HttpSummarizer {
    async fn summarize(&self, handle: &StorageHandle) -> Result<String, SummarizeError> {
        let bytes = match tokio::fs::read(&handle.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SummarizeError::FileMissing(handle.path.display().to_string()));
            }
            Err(e) => {
                return Err(SummarizeError::TransportError(format!(
                    "failed to read {}: {}",
                    handle.path.display(),
                    e
                )));
            }
        };

        if self.health_check {
            self.check_health().await?;
        }

        let file_name = handle.file_name();
        let part = Part::bytes(bytes)
            .file_name(file_name.clone())
            .mime_str(mime_for(&file_name))
            .map_err(|e| SummarizeError::TransportError(e.to_string()))?;
        let form = Form::new().part("file", part);

        let url = format!("{}/summarize_pdf/", self.base_url);
        info!("Sending {} to {}", file_name, url);
        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizeError::UpstreamError {
                status: status.as_u16(),
                message: upstream_message(&body, status),
            });
        }

        let body = response.text().await.map_err(|e| self.transport_error(e))?;
        let json: Value = serde_json::from_str(&body)
            .map_err(|e| SummarizeError::MalformedResponse(format!("invalid JSON: {}", e)))?;
        let summary = json
            .get("summary")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                SummarizeError::MalformedResponse(
                    "response has no string `summary` field".to_string(),
                )
            })?;

        info!("Received a summary of {} characters for {}", summary.chars().count(), file_name);
        Ok(summary.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::Multipart,
        http::StatusCode,
        routing::{get, post},
        Json, Router,
    };
    use serde_json::json;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Serves `router` on an ephemeral port and returns its base URL.
    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client(base_url: &str, timeout: Duration) -> HttpSummarizer {
        HttpSummarizer::new(base_url, timeout, true, Duration::from_secs(2)).unwrap()
    }

    fn staged_file(dir: &TempDir) -> StorageHandle {
        let path = dir.path().join("document-1-abc.pdf");
        std::fs::write(&path, b"%PDF-1.4 body").unwrap();
        StorageHandle {
            path,
            size_bytes: 13,
        }
    }

    async fn echo_upload(mut multipart: Multipart) -> Json<Value> {
        let mut described = String::new();
        while let Some(field) = multipart.next_field().await.unwrap() {
            if field.name() == Some("file") {
                let name = field.file_name().unwrap_or_default().to_string();
                let len = field.bytes().await.unwrap().len();
                described = format!("{} {}", name, len);
            }
        }
        Json(json!({ "summary": described }))
    }

    fn healthy() -> Router {
        Router::new().route("/health", get(|| async { Json(json!({ "status": "ok" })) }))
    }

    #[tokio::test]
    async fn uploads_file_and_returns_summary() {
        let dir = TempDir::new().unwrap();
        let handle = staged_file(&dir);
        let base = serve(healthy().route("/summarize_pdf/", post(echo_upload))).await;

        let summary = client(&base, Duration::from_secs(5))
            .summarize(&handle)
            .await
            .unwrap();
        assert_eq!(summary, "document-1-abc.pdf 13");
    }

    #[tokio::test]
    async fn missing_summary_field_is_malformed() {
        let dir = TempDir::new().unwrap();
        let handle = staged_file(&dir);
        let base = serve(healthy().route(
            "/summarize_pdf/",
            post(|| async { Json(json!({ "text": "wrong field" })) }),
        ))
        .await;

        let err = client(&base, Duration::from_secs(5))
            .summarize(&handle)
            .await
            .unwrap_err();
        assert!(matches!(err, SummarizeError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn non_success_status_carries_upstream_detail() {
        let dir = TempDir::new().unwrap();
        let handle = staged_file(&dir);
        let base = serve(healthy().route(
            "/summarize_pdf/",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "detail": "Le fichier doit être un PDF (.pdf)" })),
                )
            }),
        ))
        .await;

        let err = client(&base, Duration::from_secs(5))
            .summarize(&handle)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            SummarizeError::UpstreamError {
                status: 400,
                message: "Le fichier doit être un PDF (.pdf)".to_string(),
            }
        );
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn slow_service_times_out() {
        let dir = TempDir::new().unwrap();
        let handle = staged_file(&dir);
        let base = serve(healthy().route(
            "/summarize_pdf/",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                Json(json!({ "summary": "too late" }))
            }),
        ))
        .await;

        let err = client(&base, Duration::from_millis(300))
            .summarize(&handle)
            .await
            .unwrap_err();
        assert_eq!(err, SummarizeError::Timeout(Duration::from_millis(300)));
    }

    #[tokio::test]
    async fn connection_refused_is_service_unavailable() {
        let dir = TempDir::new().unwrap();
        let handle = staged_file(&dir);
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        for health_check in [true, false] {
            let summarizer = HttpSummarizer::new(
                base.as_str(),
                Duration::from_secs(5),
                health_check,
                Duration::from_secs(2),
            )
            .unwrap();
            let err = summarizer.summarize(&handle).await.unwrap_err();
            assert!(
                matches!(err, SummarizeError::ServiceUnavailable(_)),
                "unexpected error: {:?}",
                err
            );
        }
    }

    #[tokio::test]
    async fn failed_health_check_skips_main_call() {
        let dir = TempDir::new().unwrap();
        let handle = staged_file(&dir);
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let router = Router::new()
            .route("/health", get(|| async { StatusCode::SERVICE_UNAVAILABLE }))
            .route(
                "/summarize_pdf/",
                post(move || {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Json(json!({ "summary": "unreachable" }))
                    }
                }),
            );
        let base = serve(router).await;

        let err = client(&base, Duration::from_secs(5))
            .summarize(&handle)
            .await
            .unwrap_err();
        assert!(matches!(err, SummarizeError::ServiceUnavailable(_)));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn health_check_can_be_disabled() {
        let dir = TempDir::new().unwrap();
        let handle = staged_file(&dir);
        let base = serve(Router::new().route("/summarize_pdf/", post(echo_upload))).await;

        let summarizer =
            HttpSummarizer::new(base.as_str(), Duration::from_secs(5), false, Duration::from_secs(2))
                .unwrap();
        assert!(summarizer.summarize(&handle).await.is_ok());
    }

    #[tokio::test]
    async fn missing_file_is_reported_before_any_request() {
        let handle = StorageHandle {
            path: PathBuf::from("/definitely/not/here.pdf"),
            size_bytes: 0,
        };
        let err = client("http://127.0.0.1:9", Duration::from_secs(1))
            .summarize(&handle)
            .await
            .unwrap_err();
        assert!(matches!(err, SummarizeError::FileMissing(_)));
    }

    #[test]
    fn upstream_message_prefers_detail_then_body() {
        let status = reqwest::StatusCode::INTERNAL_SERVER_ERROR;
        assert_eq!(upstream_message(r#"{"detail":"boom"}"#, status), "boom");
        assert_eq!(upstream_message(r#"{"message":"bang"}"#, status), "bang");
        assert_eq!(upstream_message("plain text", status), "plain text");
        assert_eq!(upstream_message("", status), "Internal Server Error");
    }
}
