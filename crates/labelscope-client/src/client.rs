use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use labelscope_core::AppConfig;
use labelscope_core::models::{SegmentDescriptor, SegmentationMask, ServerInfo};

use crate::error::{ClientError, Result};
use crate::http::{HttpClient, RawResponse};
use crate::multipart;
use crate::nrrd::{self, NrrdVolume};

// ─── LabelServerClient ────────────────────────────────────────────────────────

/// Stateless client for one annotation server. Every method issues exactly
/// one request; failures surface to the caller, who decides whether to
/// re-trigger the action.
pub struct LabelServerClient {
    http: HttpClient,
}

impl LabelServerClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_params(base_url, Duration::from_secs(30))
    }

    pub fn with_params(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new(base_url, timeout)?,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::with_params(
            &config.server.url,
            Duration::from_secs(config.server.timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        self.http.base_url()
    }

    /// Server capability metadata: models, strategies, trainers.
    pub async fn info(&self) -> Result<ServerInfo> {
        self.http.get_json("/info/").await
    }

    /// Full-volume inference with a non-interactive model.
    pub async fn infer(&self, model: &str, image: &str, params: &Value) -> Result<InferenceResult> {
        let selector = format!(
            "/infer/{}?image={}",
            urlencoding::encode(model),
            urlencoding::encode(image)
        );
        let raw = self
            .http
            .post_form(&selector, &[("params", params.to_string())])
            .await?;
        Self::decode_inference(raw)
    }

    /// Point-guided inference: foreground/background voxel triplets are
    /// merged into the parameter bag before submission.
    pub async fn infer_with_points(
        &self,
        model: &str,
        image: &str,
        foreground: &[[i32; 3]],
        background: &[[i32; 3]],
        params: &Value,
    ) -> Result<InferenceResult> {
        let mut merged = match params {
            Value::Object(map) => map.clone(),
            Value::Null => serde_json::Map::new(),
            other => {
                return Err(ClientError::Parse(format!(
                    "model params must be a JSON object, got {other}"
                )));
            }
        };
        merged.insert("foreground".to_string(), json!(foreground));
        merged.insert("background".to_string(), json!(background));
        self.infer(model, image, &Value::Object(merged)).await
    }

    /// Ask the server's active-learning strategy for the next image to
    /// annotate.
    pub async fn next_sample(&self, params: &Value) -> Result<SampleResult> {
        self.http
            .post_json("/activelearning/sample", params)
            .await?
            .json()
    }

    /// Upload a finished label for an image.
    pub async fn save_label(&self, image: &str, filename: &str, label: Vec<u8>) -> Result<Value> {
        let selector = format!("/activelearning/label?image={}", urlencoding::encode(image));
        self.http
            .put_file(&selector, "label", filename, label)
            .await?
            .json()
    }

    pub async fn train_status(&self) -> Result<Value> {
        self.http.get_json("/train/").await
    }

    pub async fn train_start(&self, params: &Value) -> Result<Value> {
        self.http.post_json("/train/", params).await?.json()
    }

    pub async fn train_stop(&self) -> Result<Value> {
        self.http.delete_raw("/train/").await?.json()
    }

    fn decode_inference(raw: RawResponse) -> Result<InferenceResult> {
        if !multipart::is_multipart(&raw.content_type) {
            return Err(ClientError::Parse(format!(
                "expected multipart inference response, got {}",
                raw.content_type
            )));
        }

        let body = multipart::parse(&raw.content_type, &raw.body)?;
        let params = body
            .fields
            .get("params")
            .map(|text| {
                serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.clone()))
            })
            .unwrap_or(Value::Null);

        let file = body.files.into_iter().next().ok_or_else(|| {
            ClientError::Multipart("inference response carried no mask file".to_string())
        })?;

        tracing::debug!(filename = %file.filename, size = file.bytes.len(), "decoding mask");
        let volume = nrrd::decode(&file.bytes)?;

        Ok(InferenceResult {
            params,
            file_name: file.filename,
            file_bytes: file.bytes,
            volume,
        })
    }
}

// ─── Results ──────────────────────────────────────────────────────────────────

/// Envelope from the inference endpoints: the params part the server echoes
/// back plus the mask file, raw and decoded.
#[derive(Debug)]
pub struct InferenceResult {
    pub params: Value,
    pub file_name: String,
    pub file_bytes: Vec<u8>,
    pub volume: NrrdVolume,
}

impl InferenceResult {
    /// Hand the volume to the host as a segmentation mask.
    pub fn into_mask(self, segments: Vec<SegmentDescriptor>) -> SegmentationMask {
        SegmentationMask {
            buffer: self.volume.buffer,
            shape: self.volume.shape,
            spacing: self.volume.spacing,
            origin: self.volume.origin,
            segments,
        }
    }
}

/// Next-sample answer from the active-learning endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleResult {
    #[serde(default)]
    pub id: String,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    const BOUNDARY: &str = "93acd2b871";

    fn nrrd_bytes(shape: [usize; 3], voxels: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"NRRD0004\n");
        out.extend_from_slice(b"type: uint8\n");
        out.extend_from_slice(b"dimension: 3\n");
        out.extend_from_slice(format!("sizes: {} {} {}\n", shape[0], shape[1], shape[2]).as_bytes());
        out.extend_from_slice(b"encoding: raw\n");
        out.extend_from_slice(b"\n");
        out.extend_from_slice(voxels);
        out
    }

    fn inference_body(params: &str, mask: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            b"Content-Disposition: form-data; name=\"params\"\r\n\r\n",
        );
        body.extend_from_slice(params.as_bytes());
        body.extend_from_slice(format!("\r\n--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            b"Content-Disposition: form-data; name=\"file\"; filename=\"mask.nrrd\"\r\n\
              Content-Type: application/octet-stream\r\n\r\n",
        );
        body.extend_from_slice(mask);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    #[tokio::test]
    async fn test_info_parses_models() {
        let mut server = Server::new_async().await;

        let _m = server
            .mock("GET", "/info/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "name": "Segmentation - Spleen",
                    "version": "0.1.0",
                    "models": {
                        "deepgrow_3d": { "type": "deepgrow", "labels": ["spleen"] }
                    }
                }"#,
            )
            .create_async()
            .await;

        let client = LabelServerClient::new(&server.url()).unwrap();
        let info = client.info().await.unwrap();
        assert_eq!(info.name, "Segmentation - Spleen");
        assert_eq!(info.interactive_models(), vec!["deepgrow_3d"]);
    }

    #[tokio::test]
    async fn test_info_failure_is_api_error() {
        let mut server = Server::new_async().await;

        let _m = server
            .mock("GET", "/info/")
            .with_status(500)
            .with_body("internal error")
            .create_async()
            .await;

        let client = LabelServerClient::new(&server.url()).unwrap();
        let err = client.info().await.unwrap_err();
        match err {
            ClientError::Api { status, body, .. } => {
                assert_eq!(status, 500);
                assert_eq!(body, "internal error");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_infer_decodes_multipart_mask() {
        let mut server = Server::new_async().await;
        let voxels: Vec<u8> = vec![0, 1, 1, 0, 1, 0, 0, 0];

        let _m = server
            .mock("POST", "/infer/segmentation_spleen?image=la_003")
            .with_status(200)
            .with_header(
                "content-type",
                &format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .with_body(inference_body(
                r#"{"label_names":{"spleen":1}}"#,
                &nrrd_bytes([2, 2, 2], &voxels),
            ))
            .create_async()
            .await;

        let client = LabelServerClient::new(&server.url()).unwrap();
        let result = client
            .infer("segmentation_spleen", "la_003", &json!({}))
            .await
            .unwrap();

        assert_eq!(result.file_name, "mask.nrrd");
        assert_eq!(result.volume.shape, [2, 2, 2]);
        assert_eq!(result.params["label_names"]["spleen"], 1);

        let mask = result.into_mask(Vec::new());
        assert_eq!(mask.buffer.len(), 8);
        assert!(mask.is_consistent());
    }

    #[tokio::test]
    async fn test_infer_with_points_sends_point_sets() {
        let mut server = Server::new_async().await;

        let _m = server
            .mock("POST", "/infer/deepgrow_3d?image=la_003")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex("foreground".to_string()),
                Matcher::Regex("background".to_string()),
                Matcher::Regex("153".to_string()),
            ]))
            .with_status(200)
            .with_header(
                "content-type",
                &format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .with_body(inference_body("{}", &nrrd_bytes([1, 1, 1], &[1])))
            .create_async()
            .await;

        let client = LabelServerClient::new(&server.url()).unwrap();
        let result = client
            .infer_with_points("deepgrow_3d", "la_003", &[[153, 175, 60]], &[], &json!({}))
            .await
            .unwrap();
        assert_eq!(result.volume.shape, [1, 1, 1]);
    }

    #[tokio::test]
    async fn test_inference_without_mask_file_is_an_error() {
        let mut server = Server::new_async().await;

        let mut body = Vec::new();
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(b"Content-Disposition: form-data; name=\"params\"\r\n\r\n{}");
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        let _m = server
            .mock("POST", "/infer/deepgrow_3d?image=x")
            .with_status(200)
            .with_header(
                "content-type",
                &format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .with_body(body)
            .create_async()
            .await;

        let client = LabelServerClient::new(&server.url()).unwrap();
        let err = client.infer("deepgrow_3d", "x", &json!({})).await.unwrap_err();
        assert!(matches!(err, ClientError::Multipart(_)));
    }

    #[tokio::test]
    async fn test_next_sample() {
        let mut server = Server::new_async().await;

        let _m = server
            .mock("POST", "/activelearning/sample")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": "la_004", "ts": 1629000000}"#)
            .create_async()
            .await;

        let client = LabelServerClient::new(&server.url()).unwrap();
        let sample = client
            .next_sample(&json!({"strategy": "random"}))
            .await
            .unwrap();
        assert_eq!(sample.id, "la_004");
        assert!(sample.extra.contains_key("ts"));
    }

    #[tokio::test]
    async fn test_save_label_uploads_multipart() {
        let mut server = Server::new_async().await;

        let _m = server
            .mock("PUT", "/activelearning/label?image=la_003")
            .match_header(
                "content-type",
                Matcher::Regex("multipart/form-data".to_string()),
            )
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"label": "la_003"}"#)
            .create_async()
            .await;

        let client = LabelServerClient::new(&server.url()).unwrap();
        let response = client
            .save_label("la_003", "la_003.nrrd", vec![0u8; 16])
            .await
            .unwrap();
        assert_eq!(response["label"], "la_003");
    }

    #[tokio::test]
    async fn test_train_status() {
        let mut server = Server::new_async().await;

        let _m = server
            .mock("GET", "/train/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status": "RUNNING"}"#)
            .create_async()
            .await;

        let client = LabelServerClient::new(&server.url()).unwrap();
        let status = client.train_status().await.unwrap();
        assert_eq!(status["status"], "RUNNING");
    }
}
