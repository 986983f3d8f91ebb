//! Gateway wire types and the tagged result-payload parser.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use reel_models::Modality;

use crate::error::{MlError, MlResult};

/// Opaque reference to a dispatched long-running invocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvocationHandle(pub String);

impl InvocationHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvocationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Remote status of an async invocation, as reported by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteStatus {
    Submitted,
    Completed,
    Failed,
}

/// Status response for an async invocation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationStatus {
    pub status: RemoteStatus,
    /// Remote failure message, present when `status` is `Failed`
    #[serde(default)]
    pub failure_message: Option<String>,
}

/// How media content reaches the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MediaSource {
    /// Base64-encoded bytes, for content under the inline size ceiling
    Inline { data: String },
    /// Object storage URI, for larger content
    ObjectUri { uri: String },
}

/// Request body for embedding calls (single and segmented).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedRequest {
    pub modality: Modality,
    pub dimension: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaSource>,
    /// Segment window in seconds; present only for segmented embedding
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment_duration: Option<u32>,
}

/// Request body for generative completion.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteRequest {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaSource>,
}

/// Response body for generative completion.
#[derive(Debug, Clone, Deserialize)]
pub struct CompleteResponse {
    pub text: String,
}

/// Response for starting an async invocation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartInvocationResponse {
    pub invocation_id: String,
}

/// A validated embedding result payload.
///
/// The gateway has produced three shapes over time; everything is funneled
/// through [`parse_embedding_payload`] so the rest of the system only sees
/// these two variants.
#[derive(Debug, Clone, PartialEq)]
pub enum EmbeddingPayload {
    /// The payload is a manifest; the actual vectors live in a JSONL
    /// object at this URI.
    Manifest { output_file_uri: String },
    /// The vectors themselves, one per segment.
    Embeddings(Vec<Vec<f32>>),
}

/// Parse a raw result payload into a validated [`EmbeddingPayload`].
///
/// Accepted shapes:
/// - `{"embeddingResults": [{"status": "SUCCESS", "outputFileUri": ...}]}`
/// - `{"embeddings": [{"embedding": [...]}, ...]}`
/// - `{"segments": [{"embedding": [...]}, ...]}`
///
/// Anything else is rejected here rather than handled ad hoc downstream.
pub fn parse_embedding_payload(value: &Value) -> MlResult<EmbeddingPayload> {
    if let Some(results) = value.get("embeddingResults").and_then(Value::as_array) {
        let first = results
            .first()
            .ok_or_else(|| MlError::invalid_payload("embeddingResults is empty"))?;

        let status = first.get("status").and_then(Value::as_str).unwrap_or("");
        if status != "SUCCESS" {
            return Err(MlError::request_failed(format!(
                "embedding generation failed: {}",
                first
            )));
        }

        let uri = first
            .get("outputFileUri")
            .and_then(Value::as_str)
            .ok_or_else(|| MlError::invalid_payload("embeddingResults missing outputFileUri"))?;

        return Ok(EmbeddingPayload::Manifest {
            output_file_uri: uri.to_string(),
        });
    }

    if let Some(items) = value.get("embeddings").and_then(Value::as_array) {
        return Ok(EmbeddingPayload::Embeddings(collect_embeddings(items)));
    }

    if let Some(items) = value.get("segments").and_then(Value::as_array) {
        return Ok(EmbeddingPayload::Embeddings(collect_embeddings(items)));
    }

    Err(MlError::invalid_payload(
        "result has none of the expected embedding containers",
    ))
}

/// Pull `embedding` arrays out of a list of result items.
fn collect_embeddings(items: &[Value]) -> Vec<Vec<f32>> {
    items
        .iter()
        .filter_map(|item| item.get("embedding"))
        .filter_map(|embedding| {
            serde_json::from_value::<Vec<f32>>(embedding.clone()).ok()
        })
        .collect()
}

/// Parse a JSONL result object: one `{"embedding": [...]}` per line.
pub fn parse_jsonl_embeddings(text: &str) -> Vec<Vec<f32>> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| serde_json::from_str::<Value>(line).ok())
        .filter_map(|value| {
            value
                .get("embedding")
                .and_then(|e| serde_json::from_value::<Vec<f32>>(e.clone()).ok())
        })
        .collect()
}

/// Extract the object key from an `s3://bucket/key` URI, checking that it
/// points at the expected bucket.
pub fn object_key_from_uri(uri: &str, expected_bucket: &str) -> MlResult<String> {
    let stripped = uri
        .strip_prefix("s3://")
        .ok_or_else(|| MlError::invalid_payload(format!("not an object URI: {}", uri)))?;

    let (bucket, key) = stripped
        .split_once('/')
        .ok_or_else(|| MlError::invalid_payload(format!("object URI has no key: {}", uri)))?;

    if bucket != expected_bucket {
        return Err(MlError::invalid_payload(format!(
            "result URI points at unexpected bucket {} (expected {})",
            bucket, expected_bucket
        )));
    }

    Ok(key.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_manifest_payload() {
        let value = json!({
            "embeddingResults": [
                {"status": "SUCCESS", "outputFileUri": "s3://bucket/async-results/x/out.jsonl"}
            ]
        });
        let payload = parse_embedding_payload(&value).unwrap();
        assert_eq!(
            payload,
            EmbeddingPayload::Manifest {
                output_file_uri: "s3://bucket/async-results/x/out.jsonl".to_string()
            }
        );
    }

    #[test]
    fn test_parse_manifest_failure_status() {
        let value = json!({
            "embeddingResults": [{"status": "FAILED"}]
        });
        assert!(matches!(
            parse_embedding_payload(&value),
            Err(MlError::RequestFailed(_))
        ));
    }

    #[test]
    fn test_parse_embeddings_payload() {
        let value = json!({
            "embeddings": [
                {"embedding": [0.1, 0.2]},
                {"embedding": [0.3, 0.4]}
            ]
        });
        match parse_embedding_payload(&value).unwrap() {
            EmbeddingPayload::Embeddings(vecs) => {
                assert_eq!(vecs.len(), 2);
                assert_eq!(vecs[0], vec![0.1, 0.2]);
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[test]
    fn test_parse_segments_payload() {
        let value = json!({
            "segments": [{"embedding": [1.0]}, {"notanembedding": true}]
        });
        match parse_embedding_payload(&value).unwrap() {
            EmbeddingPayload::Embeddings(vecs) => assert_eq!(vecs.len(), 1),
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[test]
    fn test_parse_unknown_shape_rejected() {
        let value = json!({"something": "else"});
        assert!(matches!(
            parse_embedding_payload(&value),
            Err(MlError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_parse_jsonl() {
        let text = "{\"embedding\": [0.1, 0.2]}\n\n{\"embedding\": [0.3]}\nnot json\n";
        let vecs = parse_jsonl_embeddings(text);
        assert_eq!(vecs.len(), 2);
        assert_eq!(vecs[1], vec![0.3]);
    }

    #[test]
    fn test_object_key_from_uri() {
        let key = object_key_from_uri("s3://bucket/a/b/c.jsonl", "bucket").unwrap();
        assert_eq!(key, "a/b/c.jsonl");

        assert!(object_key_from_uri("s3://other/a.jsonl", "bucket").is_err());
        assert!(object_key_from_uri("http://bucket/a", "bucket").is_err());
    }

    #[test]
    fn test_status_deserialization() {
        let status: InvocationStatus =
            serde_json::from_str(r#"{"status": "Failed", "failureMessage": "boom"}"#).unwrap();
        assert_eq!(status.status, RemoteStatus::Failed);
        assert_eq!(status.failure_message.as_deref(), Some("boom"));
    }
}
