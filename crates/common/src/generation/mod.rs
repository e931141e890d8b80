//! Generation provider abstraction
//!
//! Submits asynchronous LoRA training and image generation jobs to a
//! queue-based inference provider. Submissions return immediately with a
//! correlation handle; completion is observed only through the provider's
//! webhook callbacks. There is no cancellation and submissions are not
//! retried; a failed submission surfaces as an error to the caller.

use crate::config::ProviderConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Correlation handle for an asynchronously executing provider job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSubmission {
    /// Opaque identifier the provider echoes back in its webhook
    pub request_id: String,

    /// Status-polling URL for the queued job
    pub response_url: String,
}

/// Trait for queue-based generation providers
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Enqueue a LoRA training job over an uploaded image archive
    async fn submit_training(&self, zip_url: &str, trigger_word: &str) -> Result<JobSubmission>;

    /// Enqueue an image generation job against trained weights
    async fn submit_generation(&self, prompt: &str, tensor_path: &str) -> Result<JobSubmission>;

    /// Get the provider name
    fn provider_name(&self) -> &str;
}

#[derive(Serialize)]
struct TrainingInput<'a> {
    images_data_url: &'a str,
    trigger_word: &'a str,
}

#[derive(Serialize)]
struct GenerationInput<'a> {
    prompt: &'a str,
    loras: Vec<LoraRef<'a>>,
}

#[derive(Serialize)]
struct LoraRef<'a> {
    path: &'a str,
    scale: f64,
}

/// Raw queue-submit response; validated before leaving this module
#[derive(Debug, Deserialize)]
struct QueueSubmitResponse {
    #[serde(default)]
    request_id: String,
    #[serde(default)]
    response_url: String,
}

/// fal.ai queue client
pub struct FalQueueClient {
    client: reqwest::Client,
    api_key: String,
    queue_base_url: String,
    training_model: String,
    generation_model: String,
    training_webhook_url: String,
    image_webhook_url: String,
}

impl FalQueueClient {
    /// Create a new client from provider configuration
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| AppError::Configuration {
                message: "provider.api_key is required for the fal backend".to_string(),
            })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(AppError::HttpClient)?;

        Ok(Self {
            client,
            api_key,
            queue_base_url: config.queue_base_url.trim_end_matches('/').to_string(),
            training_model: config.training_model.clone(),
            generation_model: config.generation_model.clone(),
            training_webhook_url: config.webhook_url("train"),
            image_webhook_url: config.webhook_url("image"),
        })
    }

    async fn submit<T: Serialize>(
        &self,
        model: &str,
        webhook_url: &str,
        input: &T,
    ) -> Result<JobSubmission> {
        let url = format!("{}/{}", self.queue_base_url, model);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Key {}", self.api_key))
            .query(&[("fal_webhook", webhook_url)])
            .json(input)
            .send()
            .await
            .map_err(|e| AppError::Submission {
                provider: "fal".to_string(),
                message: format!("Request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Submission {
                provider: "fal".to_string(),
                message: format!("Queue rejected job ({}): {}", status, body),
            });
        }

        let submit: QueueSubmitResponse =
            response.json().await.map_err(|e| AppError::ProviderResponse {
                message: format!("Failed to parse queue response: {}", e),
            })?;

        // The request id is the only correlation handle; an empty one would
        // strand the persisted row forever, so fail the submission instead.
        if submit.request_id.is_empty() {
            return Err(AppError::ProviderResponse {
                message: "Queue response missing request_id".to_string(),
            });
        }

        tracing::debug!(
            request_id = %submit.request_id,
            model = %model,
            "Job submitted to provider queue"
        );

        Ok(JobSubmission {
            request_id: submit.request_id,
            response_url: submit.response_url,
        })
    }
}

#[async_trait]
impl GenerationBackend for FalQueueClient {
    async fn submit_training(&self, zip_url: &str, trigger_word: &str) -> Result<JobSubmission> {
        let input = TrainingInput {
            images_data_url: zip_url,
            trigger_word,
        };

        self.submit(&self.training_model, &self.training_webhook_url, &input)
            .await
    }

    async fn submit_generation(&self, prompt: &str, tensor_path: &str) -> Result<JobSubmission> {
        let input = GenerationInput {
            prompt,
            loras: vec![LoraRef {
                path: tensor_path,
                scale: 1.0,
            }],
        };

        self.submit(&self.generation_model, &self.image_webhook_url, &input)
            .await
    }

    fn provider_name(&self) -> &str {
        "fal"
    }
}

/// Mock backend for testing
///
/// Hands out deterministic sequential request ids and records every
/// submission; `failing()` simulates a provider that rejects all jobs.
pub struct MockBackend {
    counter: AtomicUsize,
    fail: bool,
    submissions: Mutex<Vec<(String, String)>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            counter: AtomicUsize::new(0),
            fail: false,
            submissions: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            counter: AtomicUsize::new(0),
            fail: true,
            submissions: Mutex::new(Vec::new()),
        }
    }

    /// Submissions recorded so far as (kind, payload) pairs
    pub fn submissions(&self) -> Vec<(String, String)> {
        self.submissions.lock().unwrap().clone()
    }

    fn next_submission(&self, kind: &str, payload: &str) -> Result<JobSubmission> {
        if self.fail {
            return Err(AppError::Submission {
                provider: "mock".to_string(),
                message: "simulated submission failure".to_string(),
            });
        }

        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        self.submissions
            .lock()
            .unwrap()
            .push((kind.to_string(), payload.to_string()));

        Ok(JobSubmission {
            request_id: format!("mock-{}-{}", kind, n),
            response_url: format!("https://mock.local/requests/mock-{}-{}", kind, n),
        })
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationBackend for MockBackend {
    async fn submit_training(&self, zip_url: &str, _trigger_word: &str) -> Result<JobSubmission> {
        self.next_submission("train", zip_url)
    }

    async fn submit_generation(&self, prompt: &str, _tensor_path: &str) -> Result<JobSubmission> {
        self.next_submission("gen", prompt)
    }

    fn provider_name(&self) -> &str {
        "mock"
    }
}

/// Create a generation backend based on configuration
pub fn create_backend(config: &ProviderConfig) -> Result<Arc<dyn GenerationBackend>> {
    match config.backend.as_str() {
        "fal" => Ok(Arc::new(FalQueueClient::new(config)?)),
        "mock" => Ok(Arc::new(MockBackend::new())),
        other => Err(AppError::Configuration {
            message: format!("Unknown provider backend: {}", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_training_input_shape() {
        let input = TrainingInput {
            images_data_url: "https://bucket/models/a.zip",
            trigger_word: "jane",
        };
        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json["images_data_url"], "https://bucket/models/a.zip");
        assert_eq!(json["trigger_word"], "jane");
    }

    #[test]
    fn test_generation_input_shape() {
        let input = GenerationInput {
            prompt: "portrait in the rain",
            loras: vec![LoraRef {
                path: "weights/x.safetensors",
                scale: 1.0,
            }],
        };
        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json["prompt"], "portrait in the rain");
        assert_eq!(json["loras"][0]["path"], "weights/x.safetensors");
        assert_eq!(json["loras"][0]["scale"], 1.0);
    }

    #[test]
    fn test_queue_response_parse() {
        let parsed: QueueSubmitResponse = serde_json::from_str(
            r#"{"request_id":"req-1","response_url":"https://queue.fal.run/requests/req-1","status_url":"ignored"}"#,
        )
        .unwrap();
        assert_eq!(parsed.request_id, "req-1");
        assert_eq!(parsed.response_url, "https://queue.fal.run/requests/req-1");
    }

    #[tokio::test]
    async fn test_mock_sequential_ids() {
        let backend = MockBackend::new();

        let a = backend.submit_training("zip", "word").await.unwrap();
        let b = backend.submit_generation("p1", "path").await.unwrap();
        let c = backend.submit_generation("p2", "path").await.unwrap();

        assert_eq!(a.request_id, "mock-train-0");
        assert_eq!(b.request_id, "mock-gen-1");
        assert_eq!(c.request_id, "mock-gen-2");
        assert_eq!(backend.submissions().len(), 3);
    }

    #[tokio::test]
    async fn test_mock_failure_surfaces() {
        let backend = MockBackend::failing();

        let err = backend.submit_generation("p", "path").await.unwrap_err();
        assert!(matches!(err, AppError::Submission { .. }));
        assert!(backend.submissions().is_empty());
    }
}
