//! Job record types and status definitions.

use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::QueueError;

/// Status of a job record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting to be processed.
    Pending,
    /// Claimed by a worker.
    Processing,
    /// Finished successfully.
    Done,
    /// Finished with an error reported by the caller.
    Failed,
}

impl JobStatus {
    /// Returns the database string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    /// Returns true for statuses from which no further processing is
    /// expected without an explicit retry.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "done" => Ok(Self::Done),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("invalid job status: {s}")),
        }
    }
}

/// Typed job payload, one variant per job kind.
///
/// Payloads are schema-checked at enqueue time by construction: the queue
/// only accepts this enum, and rows read back are parsed through it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobPayload {
    /// Compose and run a generation flow.
    Generate {
        /// Prompt text embedded verbatim.
        prompt: String,
        /// Optional model key.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        model: Option<String>,
        /// Sampler step count.
        steps: u32,
    },
    /// Fetch a model asset into the Drive layout.
    Fetch {
        /// Source URL.
        url: String,
        /// Destination path relative to the Drive root.
        destination: String,
        /// Expected SHA-256 of the final file, when known.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sha256: Option<String>,
    },
}

impl JobPayload {
    /// Serializes the payload for storage.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Payload`] if serialization fails.
    pub fn to_stored(&self) -> Result<String, QueueError> {
        serde_json::to_string(self).map_err(|e| QueueError::Payload {
            message: e.to_string(),
        })
    }
}

/// A single record in the job queue.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct JobRecord {
    /// Unique identifier, monotonic by insertion order.
    pub id: i64,
    /// Stored payload JSON (parsed via `payload()`).
    pub payload: String,
    /// Current processing status (stored as text, parsed via `status()`).
    #[sqlx(rename = "status")]
    #[serde(rename = "status")]
    pub status_str: String,
    /// When the record was created.
    pub created_at: String,
    /// When the record was last updated; unset until a status change.
    pub updated_at: Option<String>,
}

impl JobRecord {
    /// Returns the parsed status enum.
    ///
    /// Falls back to `Pending` if the status string is invalid.
    #[must_use]
    pub fn status(&self) -> JobStatus {
        self.status_str.parse().unwrap_or(JobStatus::Pending)
    }

    /// Parses the stored payload back into its typed form.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Payload`] if the stored text does not match
    /// any known job kind.
    pub fn payload(&self) -> Result<JobPayload, QueueError> {
        serde_json::from_str(&self.payload).map_err(|e| QueueError::Payload {
            message: e.to_string(),
        })
    }

    /// Returns a JSON value suitable for listings and diagnostics, with
    /// the payload embedded as structured JSON rather than escaped text.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let payload = serde_json::from_str::<serde_json::Value>(&self.payload)
            .unwrap_or_else(|_| serde_json::Value::String(self.payload.clone()));
        serde_json::json!({
            "id": self.id,
            "payload": payload,
            "status": self.status_str,
            "created_at": self.created_at,
            "updated_at": self.updated_at,
        })
    }
}

impl fmt::Display for JobRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "JobRecord {{ id: {}, status: {} }}",
            self.id,
            self.status()
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn record(status: &str, payload: &str) -> JobRecord {
        JobRecord {
            id: 1,
            payload: payload.to_string(),
            status_str: status.to_string(),
            created_at: "2026-01-01 00:00:00".to_string(),
            updated_at: None,
        }
    }

    #[test]
    fn test_job_status_as_str() {
        assert_eq!(JobStatus::Pending.as_str(), "pending");
        assert_eq!(JobStatus::Processing.as_str(), "processing");
        assert_eq!(JobStatus::Done.as_str(), "done");
        assert_eq!(JobStatus::Failed.as_str(), "failed");
    }

    #[test]
    fn test_job_status_from_str_roundtrip() {
        for status in [
            JobStatus::Pending,
            JobStatus::Processing,
            JobStatus::Done,
            JobStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<JobStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_job_status_from_str_invalid() {
        let result = "unknown".parse::<JobStatus>();
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("invalid job status"));
    }

    #[test]
    fn test_job_status_terminal() {
        assert!(JobStatus::Done.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
    }

    #[test]
    fn test_job_payload_tagged_serialization() {
        let payload = JobPayload::Generate {
            prompt: "a cat".to_string(),
            model: Some("sd-1".to_string()),
            steps: 20,
        };
        let json = payload.to_stored().unwrap();
        assert!(json.contains(r#""kind":"generate""#));

        let parsed: JobPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, payload);
    }

    #[test]
    fn test_job_payload_fetch_optional_fields() {
        let json = r#"{"kind":"fetch","url":"https://example.com/model.safetensors","destination":"models/model.safetensors"}"#;
        let parsed: JobPayload = serde_json::from_str(json).unwrap();
        assert_eq!(
            parsed,
            JobPayload::Fetch {
                url: "https://example.com/model.safetensors".to_string(),
                destination: "models/model.safetensors".to_string(),
                sha256: None,
            }
        );
    }

    #[test]
    fn test_job_payload_unknown_kind_rejected() {
        let json = r#"{"kind":"transmogrify","value":1}"#;
        assert!(serde_json::from_str::<JobPayload>(json).is_err());
    }

    #[test]
    fn test_job_record_status_fallback_on_invalid() {
        let item = record("garbage", "{}");
        assert_eq!(item.status(), JobStatus::Pending);
    }

    #[test]
    fn test_job_record_payload_parse_error() {
        let item = record("pending", "not json");
        assert!(matches!(
            item.payload(),
            Err(QueueError::Payload { .. })
        ));
    }

    #[test]
    fn test_job_record_to_json_embeds_structured_payload() {
        let item = record("pending", r#"{"kind":"generate","prompt":"x","steps":5}"#);
        let value = item.to_json();
        assert_eq!(value["payload"]["prompt"], "x");
        assert_eq!(value["status"], "pending");
    }

    #[test]
    fn test_job_record_display() {
        let item = record("processing", "{}");
        let display = item.to_string();
        assert!(display.contains('1'));
        assert!(display.contains("processing"));
    }
}
