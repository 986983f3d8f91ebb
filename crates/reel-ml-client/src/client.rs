//! Model gateway HTTP client.

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use reel_models::Modality;
use reel_storage::S3Client;

use crate::error::{MlError, MlResult};
use crate::types::{
    object_key_from_uri, parse_embedding_payload, parse_jsonl_embeddings, CompleteRequest,
    CompleteResponse, EmbedRequest, EmbeddingPayload, InvocationHandle, InvocationStatus,
    MediaSource, StartInvocationResponse,
};

/// Configuration for the gateway client.
#[derive(Debug, Clone)]
pub struct MlClientConfig {
    /// Base URL of the model gateway
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Max retries for idempotent reads
    pub max_retries: u32,
}

impl Default for MlClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8200".to_string(),
            timeout: Duration::from_secs(300),
            max_retries: 3,
        }
    }
}

impl MlClientConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("ML_GATEWAY_URL")
                .unwrap_or_else(|_| "http://localhost:8200".to_string()),
            timeout: Duration::from_secs(
                std::env::var("ML_GATEWAY_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
            ),
            max_retries: std::env::var("ML_GATEWAY_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
        }
    }
}

/// Client for the model gateway.
pub struct MlClient {
    http: Client,
    config: MlClientConfig,
    /// Storage handle for reading JSONL result objects referenced by
    /// manifest payloads. Optional: sync-only callers never need it.
    result_storage: Option<S3Client>,
}

impl MlClient {
    /// Create a new gateway client.
    pub fn new(config: MlClientConfig) -> MlResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(MlError::Network)?;

        Ok(Self {
            http,
            config,
            result_storage: None,
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> MlResult<Self> {
        Self::new(MlClientConfig::from_env())
    }

    /// Attach a storage client for manifest-style invocation results.
    pub fn with_result_storage(mut self, storage: S3Client) -> Self {
        self.result_storage = Some(storage);
        self
    }

    /// Embed a piece of text.
    pub async fn embed_text(&self, text: &str, dimension: usize) -> MlResult<Vec<f32>> {
        let request = EmbedRequest {
            modality: Modality::Text,
            dimension,
            text: Some(text.to_string()),
            media: None,
            segment_duration: None,
        };
        self.single_embedding(&request).await
    }

    /// Embed media content (image, short video or audio), optionally with
    /// companion text.
    pub async fn embed_media(
        &self,
        modality: Modality,
        media: MediaSource,
        text: Option<&str>,
        dimension: usize,
    ) -> MlResult<Vec<f32>> {
        let request = EmbedRequest {
            modality,
            dimension,
            text: text.map(str::to_string),
            media: Some(media),
            segment_duration: None,
        };
        self.single_embedding(&request).await
    }

    /// Synchronous segmented embedding: one vector per fixed-duration
    /// window, for content under the inline size ceiling.
    pub async fn segment_embed(
        &self,
        modality: Modality,
        media: MediaSource,
        dimension: usize,
        segment_duration: u32,
    ) -> MlResult<Vec<Vec<f32>>> {
        let request = EmbedRequest {
            modality,
            dimension,
            text: None,
            media: Some(media),
            segment_duration: Some(segment_duration),
        };

        let response = self.post_json("/v1/embeddings", &request).await?;
        let value: Value = response.json().await?;
        self.resolve_payload(parse_embedding_payload(&value)?).await
    }

    /// Dispatch an asynchronous segmented embedding invocation.
    pub async fn start_async_embedding(
        &self,
        modality: Modality,
        object_uri: &str,
        text: Option<&str>,
        dimension: usize,
        segment_duration: u32,
    ) -> MlResult<InvocationHandle> {
        let request = EmbedRequest {
            modality,
            dimension,
            text: text.map(str::to_string),
            media: Some(MediaSource::ObjectUri {
                uri: object_uri.to_string(),
            }),
            segment_duration: Some(segment_duration),
        };

        let response = self.post_json("/v1/async/embeddings", &request).await?;
        let started: StartInvocationResponse = response.json().await?;

        debug!("Async invocation started: {}", started.invocation_id);
        Ok(InvocationHandle(started.invocation_id))
    }

    /// Poll the status of an async invocation.
    pub async fn poll_status(&self, handle: &InvocationHandle) -> MlResult<InvocationStatus> {
        let url = format!(
            "{}/v1/async/invocations/{}",
            self.config.base_url,
            handle.as_str()
        );

        let response = self
            .with_retry(|| async { self.http.get(&url).send().await.map_err(MlError::Network) })
            .await?;

        let response = Self::check_status(response).await?;
        Ok(response.json().await?)
    }

    /// Fetch the result of a completed async invocation, resolving
    /// manifest indirection when present.
    pub async fn fetch_result(&self, handle: &InvocationHandle) -> MlResult<Vec<Vec<f32>>> {
        let url = format!(
            "{}/v1/async/invocations/{}/result",
            self.config.base_url,
            handle.as_str()
        );

        let response = self
            .with_retry(|| async { self.http.get(&url).send().await.map_err(MlError::Network) })
            .await?;

        let response = Self::check_status(response).await?;
        let value: Value = response.json().await?;
        self.resolve_payload(parse_embedding_payload(&value)?).await
    }

    /// Generative completion with optional media context.
    pub async fn complete(&self, prompt: &str, media: Option<MediaSource>) -> MlResult<String> {
        let request = CompleteRequest {
            prompt: prompt.to_string(),
            media,
        };

        let response = self.post_json("/v1/complete", &request).await?;
        let completion: CompleteResponse = response.json().await?;
        Ok(completion.text)
    }

    /// POST a JSON body and fail on non-success statuses.
    async fn post_json<B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> MlResult<reqwest::Response> {
        let url = format!("{}{}", self.config.base_url, path);
        let response = self.http.post(&url).json(body).send().await?;
        Self::check_status(response).await
    }

    async fn check_status(response: reqwest::Response) -> MlResult<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(MlError::request_failed(format!(
                "gateway returned {}: {}",
                status, body
            )))
        }
    }

    /// Single-embedding helper: expects exactly one vector back.
    async fn single_embedding(&self, request: &EmbedRequest) -> MlResult<Vec<f32>> {
        let response = self.post_json("/v1/embeddings", request).await?;
        let value: Value = response.json().await?;
        let mut vectors = self
            .resolve_payload(parse_embedding_payload(&value)?)
            .await?;

        if vectors.is_empty() {
            return Err(MlError::invalid_payload("embedding result is empty"));
        }
        Ok(vectors.swap_remove(0))
    }

    /// Turn a validated payload into concrete vectors, reading the JSONL
    /// object when the payload is a manifest.
    async fn resolve_payload(&self, payload: EmbeddingPayload) -> MlResult<Vec<Vec<f32>>> {
        match payload {
            EmbeddingPayload::Embeddings(vectors) => Ok(vectors),
            EmbeddingPayload::Manifest { output_file_uri } => {
                self.read_manifest_object(&output_file_uri).await
            }
        }
    }

    /// Read and parse a JSONL result object, with bounded retries.
    async fn read_manifest_object(&self, uri: &str) -> MlResult<Vec<Vec<f32>>> {
        let storage = self.result_storage.as_ref().ok_or_else(|| {
            MlError::ResultStorage("no storage configured for manifest results".to_string())
        })?;

        let key = object_key_from_uri(uri, storage.bucket())?;
        debug!("Reading invocation result from {}", uri);

        let mut delay = Duration::from_secs(2);
        let mut last_error = None;

        for attempt in 0..self.config.max_retries {
            match storage.download_bytes(&key).await {
                Ok(bytes) => {
                    let text = String::from_utf8_lossy(&bytes);
                    return Ok(parse_jsonl_embeddings(&text));
                }
                Err(e) => {
                    warn!(
                        "Result read failed (attempt {}/{}): {}",
                        attempt + 1,
                        self.config.max_retries,
                        e
                    );
                    last_error = Some(e);
                    if attempt + 1 < self.config.max_retries {
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                    }
                }
            }
        }

        Err(MlError::ResultStorage(format!(
            "failed to read result object after {} attempts: {}",
            self.config.max_retries,
            last_error.map(|e| e.to_string()).unwrap_or_default()
        )))
    }

    /// Execute with retry logic for transient failures.
    async fn with_retry<F, Fut, T>(&self, operation: F) -> MlResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = MlResult<T>>,
    {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = Duration::from_millis(500 * 2u64.pow(attempt));
                    warn!(
                        "Gateway request failed (attempt {}), retrying in {:?}: {}",
                        attempt + 1,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| MlError::request_failed("unknown error")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> MlClient {
        MlClient::new(MlClientConfig {
            base_url: server.uri(),
            timeout: Duration::from_secs(5),
            max_retries: 1,
        })
        .unwrap()
    }

    #[test]
    fn test_config_defaults() {
        let config = MlClientConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(300));
        assert_eq!(config.max_retries, 3);
    }

    #[tokio::test]
    async fn test_embed_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "embeddings": [{"embedding": [0.1, 0.2, 0.3]}]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let vector = client.embed_text("highlight point", 1024).await.unwrap();
        assert_eq!(vector, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn test_segment_embed_returns_all_windows() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "embeddings": [
                    {"embedding": [1.0]},
                    {"embedding": [2.0]},
                    {"embedding": [3.0]}
                ]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let vectors = client
            .segment_embed(
                Modality::Video,
                MediaSource::Inline { data: "AAAA".to_string() },
                1024,
                3,
            )
            .await
            .unwrap();
        assert_eq!(vectors.len(), 3);
    }

    #[tokio::test]
    async fn test_start_poll_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/async/embeddings"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"invocationId": "inv-1"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/async/invocations/inv-1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"status": "Completed"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/async/invocations/inv-1/result"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "segments": [{"embedding": [0.5, 0.5]}]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let handle = client
            .start_async_embedding(Modality::Video, "s3://bucket/videos/x.mp4", None, 1024, 5)
            .await
            .unwrap();
        assert_eq!(handle.as_str(), "inv-1");

        let status = client.poll_status(&handle).await.unwrap();
        assert_eq!(status.status, crate::types::RemoteStatus::Completed);

        let vectors = client.fetch_result(&handle).await.unwrap();
        assert_eq!(vectors, vec![vec![0.5, 0.5]]);
    }

    #[tokio::test]
    async fn test_complete() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/complete"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"text": "## Criteria"})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let text = client.complete("rewrite the criteria", None).await.unwrap();
        assert_eq!(text, "## Criteria");
    }

    #[tokio::test]
    async fn test_gateway_error_is_preserved() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/complete"))
            .respond_with(ResponseTemplate::new(503).set_body_string("model overloaded"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.complete("prompt", None).await.unwrap_err();
        match err {
            MlError::RequestFailed(message) => assert!(message.contains("model overloaded")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unexpected_shape_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"weird": true})))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.embed_text("text", 1024).await.unwrap_err();
        assert!(matches!(err, MlError::InvalidPayload(_)));
    }
}
