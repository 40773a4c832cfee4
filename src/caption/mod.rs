use std::sync::Mutex;

use async_trait::async_trait;
use rand::prelude::SliceRandom;
use rand::rngs::{OsRng, StdRng};
use rand::SeedableRng;

use crate::caption::sanitize::{sanitize, SanitizeStyle};
use crate::config::CaptionConfig;
use crate::error::GenerationError;

pub mod chat;
pub mod sanitize;

/// Used when the configured pool has nothing that survives sanitizing.
const LAST_RESORT_CAPTION: &str = "New post! #Instagram #Reels";

/// Text produced for one posting attempt, immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caption {
    raw: String,
    sanitized: String,
}

impl Caption {
    pub fn new(raw: impl Into<String>, style: SanitizeStyle) -> Self {
        let raw = raw.into();
        let sanitized = sanitize(&raw, style);
        Self { raw, sanitized }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn sanitized(&self) -> &str {
        &self.sanitized
    }
}

/// A role-tagged chat completion backend.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String, GenerationError>;
}

pub struct CaptionProvider {
    generator: Option<Box<dyn TextGenerator>>,
    system_prompt: String,
    user_prompt: String,
    fallbacks: Vec<String>,
    style: SanitizeStyle,
    rng: Mutex<StdRng>,
}

impl CaptionProvider {
    pub fn new(generator: Option<Box<dyn TextGenerator>>, config: &CaptionConfig, seed: Option<u64>) -> Self {
        let style = config.sanitize_style();
        let mut fallbacks: Vec<String> = config.fallbacks.iter().filter(|fallback| !sanitize(fallback, style).is_empty()).cloned().collect();
        if fallbacks.is_empty() {
            fallbacks.push(LAST_RESORT_CAPTION.to_string());
        }

        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(OsRng).unwrap_or_else(|_| StdRng::from_entropy()),
        };

        Self {
            generator,
            system_prompt: config.system_prompt.clone(),
            user_prompt: config.user_prompt.clone(),
            fallbacks,
            style,
            rng: Mutex::new(rng),
        }
    }

    /// Never fails: any backend problem ends in the fallback pool.
    #[tracing::instrument(skip(self))]
    pub async fn obtain(&self, topic: &str) -> Caption {
        tracing::info!("Generating caption");

        if let Some(generator) = &self.generator {
            let prompt = self.user_prompt.replace("{topic}", topic);
            match generator.complete(&self.system_prompt, &prompt).await {
                Ok(text) => {
                    let caption = Caption::new(text, self.style);
                    if !caption.sanitized().is_empty() {
                        tracing::info!("Generated caption: {}", caption.raw());
                        return caption;
                    }
                    tracing::warn!("Generated caption was empty after sanitizing, using fallback");
                }
                Err(e) => {
                    tracing::warn!("Caption generation failed: {}", e);
                }
            }
        }

        let caption = Caption::new(self.pick_fallback(), self.style);
        tracing::info!("Using fallback caption: {}", caption.raw());
        caption
    }

    fn pick_fallback(&self) -> String {
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        self.fallbacks.choose(&mut *rng).cloned().unwrap_or_else(|| LAST_RESORT_CAPTION.to_string())
    }
}
