//! Flow JSON composition and persistence.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument};

use crate::config::DriveConfig;

/// Errors composing, loading, or validating flow documents.
#[derive(Debug, Error)]
pub enum FlowError {
    /// Filesystem failure reading or writing a flow file.
    #[error("IO error at {path}: {source}")]
    Io {
        /// The flow file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The requested flow file does not exist.
    #[error("flow not found: {path}")]
    NotFound {
        /// The missing path.
        path: PathBuf,
    },

    /// The flow file is not valid JSON of the expected shape.
    #[error("invalid flow document {path}: {source}")]
    Parse {
        /// The flow file path.
        path: PathBuf,
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// The document lacks required node types.
    #[error("missing required node types: {missing:?}")]
    MissingNodes {
        /// The node types that were required but absent.
        missing: Vec<String>,
    },
}

/// Caller-supplied parameters for a composition.
///
/// No validation occurs; any values are embedded verbatim.
#[derive(Debug, Clone)]
pub struct FlowRequest {
    /// Prompt text.
    pub prompt: String,
    /// Optional model key.
    pub model: Option<String>,
    /// Sampler name.
    pub sampler: String,
    /// Sampler step count.
    pub steps: u32,
    /// Seed; -1 means random.
    pub seed: i64,
    /// Optional LoRA key.
    pub lora: Option<String>,
    /// Optional upscaler key.
    pub upscaler: Option<String>,
    /// Target flow format label.
    pub format: String,
}

impl FlowRequest {
    /// Creates a request with the default sampler/steps/seed/format.
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: None,
            sampler: "DDIM".to_string(),
            steps: 20,
            seed: -1,
            lora: None,
            upscaler: None,
            format: "comfyui".to_string(),
        }
    }
}

/// Metadata block of a flow document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowMeta {
    /// Prompt text the flow was composed for.
    pub prompt: String,
    /// Unix timestamp of composition; also names the output file.
    pub created_at: u64,
    /// Target flow format label.
    pub format: String,
    /// Model key, when one was selected.
    pub model: Option<String>,
}

/// Node parameters embedded verbatim from the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowParams {
    /// Prompt text.
    pub prompt: String,
    /// Sampler name.
    pub sampler: String,
    /// Sampler step count.
    pub steps: u32,
    /// Seed; -1 means random.
    pub seed: i64,
    /// Model key.
    pub model: Option<String>,
    /// LoRA key.
    pub lora: Option<String>,
    /// Upscaler key.
    pub upscaler: Option<String>,
}

/// A single processing node descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowNode {
    /// Node identifier within the document.
    pub id: String,
    /// Node type label.
    #[serde(rename = "type")]
    pub node_type: String,
    /// Node parameters.
    pub params: FlowParams,
}

/// A complete flow document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowDocument {
    /// Metadata block.
    pub meta: FlowMeta,
    /// Processing nodes in order.
    pub nodes: Vec<FlowNode>,
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Composes a minimal single-node flow document and persists it.
///
/// The wall-clock timestamp is used both in the metadata block and as the
/// output filename (`flows/flow_<timestamp>.json`).
///
/// # Errors
///
/// Returns [`FlowError::Io`] if the flows directory cannot be created or
/// the document cannot be written.
#[instrument(skip(request, config), fields(prompt = %request.prompt))]
pub async fn compose_flow(
    request: &FlowRequest,
    config: &DriveConfig,
) -> Result<(PathBuf, FlowDocument), FlowError> {
    let flow_dir = config.flows_dir();
    tokio::fs::create_dir_all(&flow_dir)
        .await
        .map_err(|e| FlowError::Io {
            path: flow_dir.clone(),
            source: e,
        })?;

    let timestamp = unix_timestamp();
    let flow = FlowDocument {
        meta: FlowMeta {
            prompt: request.prompt.clone(),
            created_at: timestamp,
            format: request.format.clone(),
            model: request.model.clone(),
        },
        nodes: vec![FlowNode {
            id: "txt2img".to_string(),
            node_type: "StableDiffusion".to_string(),
            params: FlowParams {
                prompt: request.prompt.clone(),
                sampler: request.sampler.clone(),
                steps: request.steps,
                seed: request.seed,
                model: request.model.clone(),
                lora: request.lora.clone(),
                upscaler: request.upscaler.clone(),
            },
        }],
    };

    let path = flow_dir.join(format!("flow_{timestamp}.json"));
    let rendered = serde_json::to_vec_pretty(&flow).map_err(|e| FlowError::Io {
        path: path.clone(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
    })?;
    tokio::fs::write(&path, rendered)
        .await
        .map_err(|e| FlowError::Io {
            path: path.clone(),
            source: e,
        })?;

    info!(path = %path.display(), "composed flow");
    Ok((path, flow))
}

/// Loads a flow document by its filename under the flows directory.
///
/// # Errors
///
/// Returns [`FlowError::NotFound`] when no such file exists,
/// [`FlowError::Io`] on read failure, and [`FlowError::Parse`] when the
/// file does not match the flow shape.
#[instrument(skip(config))]
pub async fn load_flow(identifier: &str, config: &DriveConfig) -> Result<FlowDocument, FlowError> {
    let path = config.flows_dir().join(identifier);
    if !path.exists() {
        return Err(FlowError::NotFound { path });
    }
    let raw = tokio::fs::read(&path).await.map_err(|e| FlowError::Io {
        path: path.clone(),
        source: e,
    })?;
    serde_json::from_slice(&raw).map_err(|source| FlowError::Parse { path, source })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_request_defaults() {
        let request = FlowRequest::new("a cat");
        assert_eq!(request.prompt, "a cat");
        assert_eq!(request.sampler, "DDIM");
        assert_eq!(request.steps, 20);
        assert_eq!(request.seed, -1);
        assert_eq!(request.format, "comfyui");
        assert!(request.model.is_none());
    }

    #[test]
    fn test_flow_document_json_shape() {
        let flow = FlowDocument {
            meta: FlowMeta {
                prompt: "x".to_string(),
                created_at: 1_700_000_000,
                format: "comfyui".to_string(),
                model: None,
            },
            nodes: vec![FlowNode {
                id: "txt2img".to_string(),
                node_type: "StableDiffusion".to_string(),
                params: FlowParams {
                    prompt: "x".to_string(),
                    sampler: "DDIM".to_string(),
                    steps: 5,
                    seed: -1,
                    model: None,
                    lora: None,
                    upscaler: None,
                },
            }],
        };

        let value = serde_json::to_value(&flow).unwrap();
        assert_eq!(value["meta"]["prompt"], "x");
        assert_eq!(value["nodes"][0]["type"], "StableDiffusion");
        assert_eq!(value["nodes"][0]["params"]["steps"], 5);
    }

    #[tokio::test]
    async fn test_compose_then_load_roundtrip() {
        let temp = tempfile::tempdir().unwrap();
        let config = DriveConfig::new(temp.path());

        let mut request = FlowRequest::new("x");
        request.steps = 5;
        let (path, composed) = compose_flow(&request, &config).await.unwrap();

        let identifier = path.file_name().unwrap().to_str().unwrap();
        let loaded = load_flow(identifier, &config).await.unwrap();
        assert_eq!(loaded, composed);
        assert_eq!(loaded.meta.prompt, "x");
        assert_eq!(loaded.nodes.len(), 1);
        assert_eq!(loaded.nodes[0].params.steps, 5);
    }

    #[tokio::test]
    async fn test_load_flow_missing_is_not_found() {
        let temp = tempfile::tempdir().unwrap();
        let config = DriveConfig::new(temp.path());

        let result = load_flow("flow_0.json", &config).await;
        assert!(matches!(result, Err(FlowError::NotFound { .. })));
    }
}
