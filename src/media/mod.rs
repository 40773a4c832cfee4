use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::{OsRng, StdRng};
use rand::{RngCore, SeedableRng};

use crate::config::{BotConfig, MediaMode};
use crate::error::{MediaResult, PosterError, PosterResult};

pub mod encoder;
pub mod local_folder;
pub mod remote;
pub mod synthetic;

use encoder::FfmpegEncoder;
use local_folder::{LocalFolderStrategy, StillToVideo};
use remote::{RemoteImageStrategy, RemoteVideoStrategy};
use synthetic::{ColourSlideshow, FrameSequence, SyntheticAnimation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modality {
    Image,
    Video,
}

/// A file ready for upload. Owned by one posting attempt.
#[derive(Debug, Clone)]
pub struct MediaAsset {
    pub path: PathBuf,
    pub modality: Modality,
    pub duration: Option<Duration>,
    /// Set when the file was produced for this attempt and must not outlive it
    pub delete_on_completion: bool,
}

impl MediaAsset {
    pub fn image(path: PathBuf, delete_on_completion: bool) -> Self {
        Self { path, modality: Modality::Image, duration: None, delete_on_completion }
    }

    pub fn video(path: PathBuf, duration: Duration, delete_on_completion: bool) -> Self {
        Self { path, modality: Modality::Video, duration: Some(duration), delete_on_completion }
    }
}

/// One way of producing media. Failures are reported, never retried here.
#[async_trait]
pub trait MediaStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn produce(&self) -> MediaResult<MediaAsset>;
}

/// Ordered fallback over media strategies.
pub struct MediaProvider {
    strategies: Vec<Box<dyn MediaStrategy>>,
}

impl MediaProvider {
    pub fn new(strategies: Vec<Box<dyn MediaStrategy>>) -> Self {
        Self { strategies }
    }

    /// Chooses strategies for the configured mode. Capabilities that are
    /// missing (no ffmpeg, no image-gen key) are left out here rather than
    /// failing later.
    pub fn from_config(config: &BotConfig, http: reqwest::Client) -> Self {
        let media = &config.media;
        let encoder = FfmpegEncoder::probe();
        let mut seeds = SeedSource::new(media.seed);
        let mut strategies: Vec<Box<dyn MediaStrategy>> = Vec::new();

        let local_folder = |seeds: &mut SeedSource| {
            let video = encoder.clone().map(|encoder| StillToVideo {
                encoder,
                output_folder: media.video_folder.clone(),
                fps: media.image_video_fps,
                secs: media.image_video_secs,
            });
            Box::new(LocalFolderStrategy::new(media.image_folder.clone(), seeds.next_rng(), video)) as Box<dyn MediaStrategy>
        };

        match media.mode {
            MediaMode::LocalImages => strategies.push(local_folder(&mut seeds)),
            MediaMode::GeneratedImage => {
                strategies.push(Box::new(RemoteImageStrategy::new(http, media, seeds.next_rng())));
                strategies.push(local_folder(&mut seeds));
            }
            MediaMode::GeneratedVideo => {
                match &config.api_keys.image_gen {
                    Some(key) if !key.trim().is_empty() => {
                        strategies.push(Box::new(RemoteVideoStrategy::new(http, key.clone(), media, seeds.next_rng())));
                    }
                    _ => tracing::info!("No image generation key configured, skipping remote video generation"),
                }
                if let Some(encoder) = &encoder {
                    strategies.push(Box::new(SyntheticAnimation::new(encoder.clone(), media.video_folder.clone(), media.synthetic_secs)));
                    strategies.push(Box::new(ColourSlideshow::new(encoder.clone(), media.video_folder.clone(), media.synthetic_secs, seeds.next_rng())));
                    strategies.push(Box::new(FrameSequence::new(encoder.clone(), media.video_folder.clone(), media.synthetic_secs)));
                }
            }
        }

        let provider = Self::new(strategies);
        tracing::info!("Media strategies in order: {:?}", provider.strategy_names());
        provider
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|strategy| strategy.name()).collect()
    }

    /// First strategy that succeeds wins. With none left the attempt has
    /// nothing to post.
    pub async fn obtain(&self) -> PosterResult<MediaAsset> {
        for strategy in &self.strategies {
            tracing::info!("Trying media strategy: {}", strategy.name());
            match strategy.produce().await {
                Ok(asset) => {
                    tracing::info!("Media ready from {}: {}", strategy.name(), asset.path.display());
                    return Ok(asset);
                }
                Err(e) => tracing::warn!("Media strategy {} failed: {}", strategy.name(), e),
            }
        }
        tracing::error!("Every media strategy failed");
        Err(PosterError::NoMediaAvailable)
    }
}

/// Hands out independent rngs, reproducible when a seed is configured.
struct SeedSource {
    seeded: Option<StdRng>,
}

impl SeedSource {
    fn new(seed: Option<u64>) -> Self {
        Self { seeded: seed.map(StdRng::seed_from_u64) }
    }

    fn next_rng(&mut self) -> StdRng {
        match &mut self.seeded {
            Some(rng) => StdRng::seed_from_u64(rng.next_u64()),
            None => StdRng::from_rng(OsRng).unwrap_or_else(|_| StdRng::from_entropy()),
        }
    }
}

pub(crate) fn timestamped_path(folder: &Path, prefix: &str, extension: &str) -> PathBuf {
    folder.join(format!("{}_{}.{}", prefix, chrono::Local::now().format("%Y%m%d_%H%M%S"), extension))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::error::MediaError;

    struct Scripted {
        name: &'static str,
        result: Option<&'static str>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl MediaStrategy for Scripted {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn produce(&self) -> MediaResult<MediaAsset> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.result {
                Some(path) => Ok(MediaAsset::image(PathBuf::from(path), false)),
                None => Err(MediaError::Remote(format!("{} unavailable", self.name))),
            }
        }
    }

    fn scripted(name: &'static str, result: Option<&'static str>) -> (Box<dyn MediaStrategy>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (Box::new(Scripted { name, result, calls: Arc::clone(&calls) }), calls)
    }

    #[tokio::test]
    async fn no_strategies_means_no_media() {
        let provider = MediaProvider::new(Vec::new());
        assert!(matches!(provider.obtain().await, Err(PosterError::NoMediaAvailable)));
    }

    #[tokio::test]
    async fn all_failing_strategies_are_each_tried_once() {
        let (first, first_calls) = scripted("first", None);
        let (second, second_calls) = scripted("second", None);
        let provider = MediaProvider::new(vec![first, second]);

        assert!(matches!(provider.obtain().await, Err(PosterError::NoMediaAvailable)));
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn falls_through_to_first_success() {
        let (broken, _) = scripted("broken", None);
        let (working, _) = scripted("working", Some("media/ok.png"));
        let (unused, unused_calls) = scripted("unused", Some("media/other.png"));
        let provider = MediaProvider::new(vec![broken, working, unused]);

        let asset = provider.obtain().await.unwrap();

        assert_eq!(asset.path, PathBuf::from("media/ok.png"));
        assert_eq!(unused_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_image_folder_reports_no_media() {
        let dir = tempfile::tempdir().unwrap();
        let strategy = LocalFolderStrategy::new(dir.path().join("imgs"), StdRng::seed_from_u64(7), None);
        let provider = MediaProvider::new(vec![Box::new(strategy)]);

        assert!(matches!(provider.obtain().await, Err(PosterError::NoMediaAvailable)));
    }

    #[test]
    fn remote_video_needs_an_api_key() {
        let config = BotConfig::from_yaml("post_time: \"17:50\"\ncredentials: {username: u, password: p}\nmedia: {mode: generated_video}\n").unwrap();
        let provider = MediaProvider::from_config(&config, reqwest::Client::new());
        assert!(!provider.strategy_names().contains(&"remote video generation"));
    }

    #[test]
    fn seeded_sources_repeat() {
        let mut a = SeedSource::new(Some(9));
        let mut b = SeedSource::new(Some(9));
        assert_eq!(a.next_rng().next_u64(), b.next_rng().next_u64());
    }
}
