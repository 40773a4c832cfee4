use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveTime;
use serde::Deserialize;

use crate::caption::sanitize::{sanitize, SanitizeStyle};
use crate::error::ConfigError;

pub const DEFAULT_CONFIG_PATH: &str = "config/config.yaml";

/// Everything the bot needs at runtime. Built once in `main` and passed down
/// explicitly, nothing reads process-wide state.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    #[serde(with = "hhmm")]
    pub post_time: NaiveTime,
    #[serde(default = "default_lead_minutes")]
    pub lead_minutes: u32,
    /// Run one attempt right away, then keep the daily schedule
    #[serde(default)]
    pub run_on_start: bool,
    pub credentials: Credentials,
    #[serde(default)]
    pub api_keys: ApiKeys,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub caption: CaptionConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub timing: TimingConfig,
}

fn default_lead_minutes() -> u32 {
    10
}

#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials").field("username", &self.username).field("password", &"*".repeat(self.password.chars().count())).finish()
    }
}

#[derive(Clone, Default, Deserialize)]
pub struct ApiKeys {
    #[serde(default)]
    pub text_gen: Option<String>,
    #[serde(default)]
    pub image_gen: Option<String>,
}

impl fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeys").field("text_gen", &self.text_gen.as_deref().map(key_prefix)).field("image_gen", &self.image_gen.as_deref().map(key_prefix)).finish()
    }
}

/// First eight characters of a secret followed by an ellipsis, for logs.
pub fn key_prefix(key: &str) -> String {
    format!("{}...", key.chars().take(8).collect::<String>())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaMode {
    LocalImages,
    GeneratedVideo,
    GeneratedImage,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub mode: MediaMode,
    pub image_folder: PathBuf,
    pub video_folder: PathBuf,
    pub generated_image_folder: PathBuf,
    pub image_video_secs: u32,
    pub image_video_fps: u32,
    pub synthetic_secs: u32,
    pub seed: Option<u64>,
    pub prompts: Vec<String>,
    pub video_endpoint: String,
    pub video_model_version: String,
    pub image_endpoint: String,
    pub poll_interval_secs: u64,
    pub max_polls: u32,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            mode: MediaMode::LocalImages,
            image_folder: PathBuf::from("imgs"),
            video_folder: PathBuf::from("generated_videos"),
            generated_image_folder: PathBuf::from("images"),
            image_video_secs: 5,
            image_video_fps: 30,
            synthetic_secs: 45,
            seed: None,
            prompts: vec![
                "Abstract flowing liquid colors in motion, vibrant neon colors, smooth transitions, vertical format 9:16, modern aesthetic".to_string(),
                "Geometric shapes morphing and flowing, bright colors, dynamic movement, vertical video format, contemporary design".to_string(),
                "Particle systems creating beautiful patterns, colorful explosions of light, smooth animations, portrait orientation".to_string(),
                "Fluid art in motion, rainbow colors mixing and flowing, mesmerizing patterns, vertical format for social media".to_string(),
                "Digital wave patterns, electric blue and purple colors, smooth flowing motion, modern abstract art style".to_string(),
            ],
            video_endpoint: "https://api.replicate.com/v1/predictions".to_string(),
            video_model_version: "anotherjesse/zeroscope-v2-xl:9f747673945c62801b13b84701c783929c0ee784e4748ec062204894dda1a351".to_string(),
            image_endpoint: "https://image.pollinations.ai/prompt".to_string(),
            poll_interval_secs: 15,
            max_polls: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmojiHandling {
    Passthrough,
    Tokenize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CaptionConfig {
    pub topic: String,
    pub endpoint: String,
    pub model: String,
    pub system_prompt: String,
    /// `{topic}` is replaced with the topic
    pub user_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub request_timeout_secs: u64,
    pub emoji: EmojiHandling,
    pub bmp_only: bool,
    pub fallbacks: Vec<String>,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            topic: "an artistic, creative video with vibrant colors".to_string(),
            endpoint: "https://api.groq.com/openai/v1/chat/completions".to_string(),
            model: "llama3-8b-8192".to_string(),
            system_prompt: "You are a content creator specialised in Instagram Reels. Write short, engaging and creative descriptions for reels.".to_string(),
            user_prompt: "Write a short, engaging Instagram Reel description (at most 150 characters) for a video showing: {topic}. Include relevant hashtags and fitting emojis.".to_string(),
            max_tokens: 200,
            temperature: 0.8,
            request_timeout_secs: 15,
            emoji: EmojiHandling::Passthrough,
            bmp_only: true,
            fallbacks: vec![
                "Amazing content waiting for you! #VideoArt #Creative #Instagram #Viral".to_string(),
                "Art in motion that hypnotizes! #ArtisticVideo #VisualArt #CreativeContent".to_string(),
                "When creativity meets technology! #Innovation #DigitalArt #Amazing".to_string(),
                "A video that stirs emotions! #EmotionalContent #ArtLovers #InstagramReel".to_string(),
                "Visual magic in every frame! #MagicMoments #VisualMagic #ContentCreator".to_string(),
            ],
        }
    }
}

impl CaptionConfig {
    pub fn sanitize_style(&self) -> SanitizeStyle {
        SanitizeStyle { emoji: self.emoji, bmp_only: self.bmp_only }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub webdriver_url: String,
    pub site_url: String,
    pub headless: bool,
    pub args: Vec<String>,
    pub debug_dir: PathBuf,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".to_string(),
            site_url: "https://www.instagram.com/".to_string(),
            headless: false,
            args: vec!["--no-sandbox".to_string(), "--disable-dev-shm-usage".to_string(), "--disable-gpu".to_string()],
            debug_dir: PathBuf::from("debug"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub post_wait_threshold_secs: u64,
    pub post_wait_quantum_ms: u64,
    pub poll_interval_secs: u64,
    pub human_pacing: bool,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            post_wait_threshold_secs: 300,
            post_wait_quantum_ms: 1000,
            poll_interval_secs: 60,
            human_pacing: true,
        }
    }
}

impl TimingConfig {
    pub fn post_wait_threshold(&self) -> Duration {
        Duration::from_secs(self.post_wait_threshold_secs)
    }

    pub fn post_wait_quantum(&self) -> Duration {
        Duration::from_millis(self.post_wait_quantum_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

impl BotConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: BotConfig = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.lead_minutes >= 24 * 60 {
            return Err(ConfigError::Invalid(format!("lead_minutes must be under a day, got {}", self.lead_minutes)));
        }
        if self.media.image_video_fps == 0 {
            return Err(ConfigError::Invalid("media.image_video_fps must be positive".to_string()));
        }
        if self.media.max_polls == 0 {
            return Err(ConfigError::Invalid("media.max_polls must be positive".to_string()));
        }
        if self.timing.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid("timing.poll_interval_secs must be positive".to_string()));
        }
        if self.timing.post_wait_quantum_ms == 0 {
            return Err(ConfigError::Invalid("timing.post_wait_quantum_ms must be positive".to_string()));
        }
        let style = self.caption.sanitize_style();
        if !self.caption.fallbacks.iter().any(|fallback| !sanitize(fallback, style).is_empty()) {
            return Err(ConfigError::Invalid("caption.fallbacks needs at least one caption that survives sanitizing".to_string()));
        }
        if self.credentials.username.is_empty() {
            return Err(ConfigError::Invalid("credentials.username is empty".to_string()));
        }
        Ok(())
    }

    pub fn log_summary(&self) {
        tracing::info!("Username configured: {}", self.credentials.username);
        tracing::info!("Password configured: {}", "*".repeat(self.credentials.password.chars().count()));
        match &self.api_keys.text_gen {
            Some(key) => tracing::info!("Text generation key configured: {}", key_prefix(key)),
            None => tracing::warn!("No text generation key, captions will come from the fallback pool"),
        }
        if let Some(key) = &self.api_keys.image_gen {
            tracing::info!("Image generation key configured: {}", key_prefix(key));
        }
    }
}

mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(raw.trim(), "%H:%M").map_err(|e| serde::de::Error::custom(format!("expected HH:MM, got '{raw}': {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
post_time: "17:50"
credentials:
  username: someone
  password: hunter22
"#;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = BotConfig::from_yaml(MINIMAL).unwrap();
        assert_eq!(config.post_time, NaiveTime::from_hms_opt(17, 50, 0).unwrap());
        assert_eq!(config.lead_minutes, 10);
        assert!(!config.run_on_start);
        assert_eq!(config.media.mode, MediaMode::LocalImages);
        assert_eq!(config.media.image_folder, PathBuf::from("imgs"));
        assert_eq!(config.caption.emoji, EmojiHandling::Passthrough);
        assert_eq!(config.timing.post_wait_threshold_secs, 300);
        assert!(config.api_keys.text_gen.is_none());
    }

    #[test]
    fn full_config_parses() {
        let yaml = r#"
post_time: "08:05"
lead_minutes: 15
run_on_start: true
credentials:
  username: someone
  password: hunter22
api_keys:
  text_gen: gsk_abcdefghijkl
media:
  mode: generated_video
  seed: 7
caption:
  emoji: tokenize
  fallbacks: ["Only one"]
timing:
  human_pacing: false
"#;
        let config = BotConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.lead_minutes, 15);
        assert_eq!(config.media.mode, MediaMode::GeneratedVideo);
        assert_eq!(config.media.seed, Some(7));
        assert_eq!(config.caption.emoji, EmojiHandling::Tokenize);
        assert_eq!(config.caption.fallbacks, vec!["Only one".to_string()]);
        assert!(!config.timing.human_pacing);
    }

    #[test]
    fn example_config_is_valid() {
        let config = BotConfig::from_yaml(include_str!("../config/config.example.yaml")).unwrap();
        assert_eq!(config.lead_minutes, 10);
        assert_eq!(config.caption.fallbacks.len(), 2);
        assert_eq!(config.timing.poll_interval(), Duration::from_secs(60));
    }

    #[test]
    fn rejects_bad_post_time() {
        let yaml = MINIMAL.replace("17:50", "25:99");
        assert!(matches!(BotConfig::from_yaml(&yaml), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn rejects_fallbacks_that_sanitize_to_nothing() {
        let yaml = format!("{MINIMAL}caption:\n  fallbacks: [\"\\u0007\\u0007\"]\n");
        assert!(matches!(BotConfig::from_yaml(&yaml), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_zero_poll_interval_and_wait_quantum() {
        let yaml = format!("{MINIMAL}timing:\n  poll_interval_secs: 0\n");
        assert!(matches!(BotConfig::from_yaml(&yaml), Err(ConfigError::Invalid(_))));

        let yaml = format!("{MINIMAL}timing:\n  post_wait_quantum_ms: 0\n");
        assert!(matches!(BotConfig::from_yaml(&yaml), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn debug_output_masks_secrets() {
        let mut config = BotConfig::from_yaml(MINIMAL).unwrap();
        config.api_keys.text_gen = Some("gsk_0123456789abcdef".to_string());
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("hunter22"));
        assert!(!rendered.contains("0123456789abcdef"));
        assert!(rendered.contains("gsk_0123..."));
    }
}
