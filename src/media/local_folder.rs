use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::error::{MediaError, MediaResult};
use crate::media::encoder::{pad_to_even, FfmpegEncoder, RawVideo};
use crate::media::{timestamped_path, MediaAsset, MediaStrategy};

pub const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

/// Files directly inside `folder` with an allowed image extension, sorted by
/// name. A missing or empty folder is `NoCandidates`.
pub async fn list_candidates(folder: &Path) -> MediaResult<Vec<PathBuf>> {
    let mut entries = match tokio::fs::read_dir(folder).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(MediaError::NoCandidates(folder.to_path_buf())),
        Err(e) => return Err(e.into()),
    };

    let mut candidates = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !has_image_extension(&path) {
            continue;
        }
        // metadata follows symlinks, unlike DirEntry::file_type
        if tokio::fs::metadata(&path).await.map(|meta| meta.is_file()).unwrap_or(false) {
            candidates.push(path);
        }
    }
    candidates.sort();

    if candidates.is_empty() {
        return Err(MediaError::NoCandidates(folder.to_path_buf()));
    }
    Ok(candidates)
}

fn has_image_extension(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()).map(|ext| IMAGE_EXTENSIONS.iter().any(|allowed| ext.eq_ignore_ascii_case(allowed))).unwrap_or(false)
}

/// Settings for turning the picked still into a short video.
#[derive(Debug, Clone)]
pub struct StillToVideo {
    pub encoder: FfmpegEncoder,
    pub output_folder: PathBuf,
    pub fps: u32,
    pub secs: u32,
}

/// Picks one image at random from a folder. With an encoder it is converted
/// into a video by repeating the frame; without one the image is posted as is.
pub struct LocalFolderStrategy {
    folder: PathBuf,
    rng: Mutex<StdRng>,
    video: Option<StillToVideo>,
}

impl LocalFolderStrategy {
    pub fn new(folder: PathBuf, rng: StdRng, video: Option<StillToVideo>) -> Self {
        Self { folder, rng: Mutex::new(rng), video }
    }

    pub async fn pick(&self) -> MediaResult<PathBuf> {
        let candidates = list_candidates(&self.folder).await?;
        tracing::info!("Found {} candidate images in {}", candidates.len(), self.folder.display());

        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        candidates.choose(&mut *rng).cloned().ok_or_else(|| MediaError::NoCandidates(self.folder.clone()))
    }

    async fn to_video(&self, image_path: &Path, settings: &StillToVideo) -> MediaResult<MediaAsset> {
        let source = image_path.to_path_buf();
        let still = tokio::task::spawn_blocking(move || image::open(source).map(|image| pad_to_even(image.to_rgb8())))
            .await
            .map_err(|e| MediaError::Encoder(format!("image decoder panicked: {e}")))??;

        tokio::fs::create_dir_all(&settings.output_folder).await?;
        let output = timestamped_path(&settings.output_folder, "reel", "mp4");
        let spec = RawVideo { width: still.width(), height: still.height(), fps: settings.fps, frames: settings.fps * settings.secs };
        tracing::info!("Converting {} into a {}s video ({}x{})", image_path.display(), settings.secs, spec.width, spec.height);

        settings.encoder.encode_raw(spec, output.clone(), move |_| still.clone()).await?;
        Ok(MediaAsset::video(output, Duration::from_secs(settings.secs as u64), true))
    }
}

#[async_trait]
impl MediaStrategy for LocalFolderStrategy {
    fn name(&self) -> &'static str {
        "local image folder"
    }

    async fn produce(&self) -> MediaResult<MediaAsset> {
        let picked = self.pick().await?;
        tracing::info!("Selected image: {}", picked.display());

        match &self.video {
            Some(settings) => self.to_video(&picked, settings).await,
            None => Ok(MediaAsset::image(picked, false)),
        }
    }
}
