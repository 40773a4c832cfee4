use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::{key_prefix, MediaConfig};
use crate::error::{MediaError, MediaResult};
use crate::media::{timestamped_path, MediaAsset, MediaStrategy, Modality};

/// Prompts shared by the remote strategies, picked at random per request.
struct PromptPool {
    prompts: Vec<String>,
    rng: Mutex<StdRng>,
}

impl PromptPool {
    fn new(prompts: Vec<String>, rng: StdRng) -> Self {
        Self { prompts, rng: Mutex::new(rng) }
    }

    fn pick(&self) -> MediaResult<String> {
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        self.prompts.choose(&mut *rng).cloned().ok_or_else(|| MediaError::Remote("no prompts configured".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct Prediction {
    id: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    output: Value,
    #[serde(default)]
    error: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictionStatus {
    Pending,
    Succeeded,
    Failed,
}

impl PredictionStatus {
    pub fn parse(status: &str) -> Self {
        match status {
            "succeeded" => PredictionStatus::Succeeded,
            "failed" | "canceled" => PredictionStatus::Failed,
            _ => PredictionStatus::Pending,
        }
    }
}

/// A prediction output is either a URL or a list whose first entry is one.
pub fn output_url(output: &Value) -> Option<&str> {
    match output {
        Value::String(url) => Some(url.as_str()),
        Value::Array(items) => items.first().and_then(Value::as_str),
        _ => None,
    }
}

/// Text-to-video through a prediction API: submit, poll until the job
/// settles, download the result.
pub struct RemoteVideoStrategy {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
    model_version: String,
    prompts: PromptPool,
    output_folder: PathBuf,
    poll_interval: Duration,
    max_polls: u32,
}

impl RemoteVideoStrategy {
    pub fn new(http: reqwest::Client, api_key: String, config: &MediaConfig, rng: StdRng) -> Self {
        tracing::info!("Remote video generation enabled with key {}", key_prefix(&api_key));
        Self {
            http,
            api_key,
            endpoint: config.video_endpoint.trim_end_matches('/').to_string(),
            model_version: config.video_model_version.clone(),
            prompts: PromptPool::new(config.prompts.clone(), rng),
            output_folder: config.video_folder.clone(),
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            max_polls: config.max_polls,
        }
    }

    async fn submit(&self, prompt: &str) -> MediaResult<String> {
        let body = json!({
            "version": self.model_version,
            "input": {
                "prompt": prompt,
                "width": 576,
                "height": 1024,
                "num_frames": 120,
                "num_inference_steps": 20
            }
        });
        let response = self
            .http
            .post(&self.endpoint)
            .header("Authorization", format!("Token {}", self.api_key))
            .json(&body)
            .timeout(Duration::from_secs(30))
            .send()
            .await?;

        if response.status() != StatusCode::CREATED {
            return Err(MediaError::Remote(format!("prediction request returned {}", response.status())));
        }
        let prediction: Prediction = response.json().await?;
        tracing::info!("Video prediction started: {}", prediction.id);
        Ok(prediction.id)
    }

    async fn poll_once(&self, id: &str) -> MediaResult<Option<Prediction>> {
        let response = self
            .http
            .get(format!("{}/{}", self.endpoint, id))
            .header("Authorization", format!("Token {}", self.api_key))
            .timeout(Duration::from_secs(15))
            .send()
            .await?;
        if response.status() != StatusCode::OK {
            tracing::warn!("Prediction status check returned {}", response.status());
            return Ok(None);
        }
        Ok(Some(response.json().await?))
    }

    async fn wait_for_output(&self, id: &str) -> MediaResult<String> {
        for attempt in 1..=self.max_polls {
            match self.poll_once(id).await {
                Ok(Some(prediction)) => match PredictionStatus::parse(&prediction.status) {
                    PredictionStatus::Succeeded => {
                        return output_url(&prediction.output)
                            .map(str::to_string)
                            .ok_or_else(|| MediaError::Remote("prediction succeeded without an output URL".to_string()));
                    }
                    PredictionStatus::Failed => {
                        return Err(MediaError::Remote(format!("prediction {} ended as {}: {}", id, prediction.status, prediction.error)));
                    }
                    PredictionStatus::Pending => {
                        tracing::info!("Prediction status: {} ({}/{})", prediction.status, attempt, self.max_polls);
                    }
                },
                Ok(None) => {}
                Err(e) => tracing::warn!("Error checking prediction status: {}", e),
            }
            tokio::time::sleep(self.poll_interval).await;
        }
        Err(MediaError::PollTimeout(self.max_polls))
    }
}

#[async_trait]
impl MediaStrategy for RemoteVideoStrategy {
    fn name(&self) -> &'static str {
        "remote video generation"
    }

    async fn produce(&self) -> MediaResult<MediaAsset> {
        let prompt = self.prompts.pick()?;
        tracing::info!("Requesting video for prompt: {}", prompt);

        let id = self.submit(&prompt).await?;
        let url = self.wait_for_output(&id).await?;

        tokio::fs::create_dir_all(&self.output_folder).await?;
        let path = timestamped_path(&self.output_folder, "generated", "mp4");
        let bytes = self.http.get(url).timeout(Duration::from_secs(60)).send().await?.error_for_status()?.bytes().await?;
        tokio::fs::write(&path, &bytes).await?;
        tracing::info!("Video downloaded to {}", path.display());

        Ok(MediaAsset { path, modality: Modality::Video, duration: None, delete_on_completion: true })
    }
}

/// Text-to-image over a plain GET, the prompt being the last path segment.
pub struct RemoteImageStrategy {
    http: reqwest::Client,
    endpoint: String,
    prompts: PromptPool,
    output_folder: PathBuf,
}

impl RemoteImageStrategy {
    pub fn new(http: reqwest::Client, config: &MediaConfig, rng: StdRng) -> Self {
        Self {
            http,
            endpoint: config.image_endpoint.clone(),
            prompts: PromptPool::new(config.prompts.clone(), rng),
            output_folder: config.generated_image_folder.clone(),
        }
    }
}

pub fn image_url(endpoint: &str, prompt: &str) -> MediaResult<Url> {
    let mut url = Url::parse(endpoint).map_err(|e| MediaError::Remote(format!("bad image endpoint {endpoint}: {e}")))?;
    url.path_segments_mut().map_err(|_| MediaError::Remote(format!("image endpoint {endpoint} cannot take a path")))?.pop_if_empty().push(prompt);
    url.query_pairs_mut().append_pair("model", "flux").append_pair("nologo", "true");
    Ok(url)
}

#[async_trait]
impl MediaStrategy for RemoteImageStrategy {
    fn name(&self) -> &'static str {
        "remote image generation"
    }

    async fn produce(&self) -> MediaResult<MediaAsset> {
        let prompt = self.prompts.pick()?;
        tracing::info!("Requesting image for prompt: {}", prompt);

        let response = self.http.get(image_url(&self.endpoint, &prompt)?).timeout(Duration::from_secs(120)).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;
        let image = image::load_from_memory(&bytes)?;

        tokio::fs::create_dir_all(&self.output_folder).await?;
        let path = timestamped_path(&self.output_folder, "generated", "jpeg");
        let target = path.clone();
        tokio::task::spawn_blocking(move || image.to_rgb8().save(target))
            .await
            .map_err(|e| MediaError::Encoder(format!("image writer panicked: {e}")))??;
        tracing::info!("Image saved to {}", path.display());

        Ok(MediaAsset::image(path, true))
    }
}
