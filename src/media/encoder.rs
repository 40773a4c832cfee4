use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use image::{Rgb, RgbImage};

use crate::error::{MediaError, MediaResult};

/// Frame geometry and rate for a raw RGB stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawVideo {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub frames: u32,
}

impl RawVideo {
    pub fn duration_secs(&self) -> f64 {
        self.frames as f64 / self.fps.max(1) as f64
    }
}

/// Thin wrapper over the `ffmpeg` binary found on `PATH`.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    program: PathBuf,
}

impl FfmpegEncoder {
    /// `None` when ffmpeg is not installed. Strategies that need it are left
    /// out of the provider in that case.
    pub fn probe() -> Option<Self> {
        match which::which("ffmpeg") {
            Ok(program) => {
                tracing::info!("Using ffmpeg at {}", program.display());
                Some(Self { program })
            }
            Err(e) => {
                tracing::warn!("ffmpeg not found, encoder-backed media strategies disabled: {}", e);
                None
            }
        }
    }

    /// Streams `spec.frames` frames produced by `render` into an H.264 file.
    /// Runs on the blocking pool.
    pub async fn encode_raw<F>(&self, spec: RawVideo, output: PathBuf, render: F) -> MediaResult<()>
    where
        F: FnMut(u32) -> RgbImage + Send + 'static,
    {
        let program = self.program.clone();
        tokio::task::spawn_blocking(move || encode_raw_blocking(&program, spec, &output, render))
            .await
            .map_err(|e| MediaError::Encoder(format!("encoder task panicked: {e}")))?
    }

    /// Encodes `frame_%06d.png` files from `frames_dir`.
    pub async fn encode_sequence(&self, frames_dir: &Path, fps: u32, output: &Path) -> MediaResult<()> {
        let program = self.program.clone();
        let args = sequence_args(frames_dir, fps, output);
        tokio::task::spawn_blocking(move || {
            let result = Command::new(program).args(args).stdout(Stdio::null()).stderr(Stdio::piped()).output()?;
            if result.status.success() {
                Ok(())
            } else {
                Err(MediaError::Encoder(String::from_utf8_lossy(&result.stderr).trim().to_string()))
            }
        })
        .await
        .map_err(|e| MediaError::Encoder(format!("encoder task panicked: {e}")))?
    }
}

fn encode_raw_blocking<F>(program: &Path, spec: RawVideo, output: &Path, mut render: F) -> MediaResult<()>
where
    F: FnMut(u32) -> RgbImage,
{
    let mut child = Command::new(program).args(raw_input_args(spec, output)).stdin(Stdio::piped()).stdout(Stdio::null()).stderr(Stdio::piped()).spawn()?;

    let mut stdin = child.stdin.take().ok_or_else(|| MediaError::Encoder("ffmpeg stdin unavailable".to_string()))?;
    let log_every = (spec.fps * 5).max(1);
    let mut write_result = Ok(());
    for index in 0..spec.frames {
        let frame = render(index);
        if frame.width() != spec.width || frame.height() != spec.height {
            write_result = Err(MediaError::Encoder(format!(
                "frame {} is {}x{}, expected {}x{}",
                index,
                frame.width(),
                frame.height(),
                spec.width,
                spec.height
            )));
            break;
        }
        if let Err(e) = stdin.write_all(frame.as_raw()) {
            write_result = Err(e.into());
            break;
        }
        if index % log_every == 0 {
            tracing::info!("Encoding frames: {}s/{}s", index / spec.fps.max(1), spec.frames / spec.fps.max(1));
        }
    }
    drop(stdin);

    let result = child.wait_with_output()?;
    write_result?;
    if result.status.success() {
        Ok(())
    } else {
        Err(MediaError::Encoder(String::from_utf8_lossy(&result.stderr).trim().to_string()))
    }
}

pub fn raw_input_args(spec: RawVideo, output: &Path) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-f".to_string(),
        "rawvideo".to_string(),
        "-pix_fmt".to_string(),
        "rgb24".to_string(),
        "-s".to_string(),
        format!("{}x{}", spec.width, spec.height),
        "-r".to_string(),
        spec.fps.to_string(),
        "-i".to_string(),
        "-".to_string(),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        output.display().to_string(),
    ]
}

pub fn sequence_args(frames_dir: &Path, fps: u32, output: &Path) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-r".to_string(),
        fps.to_string(),
        "-i".to_string(),
        frames_dir.join("frame_%06d.png").display().to_string(),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        output.display().to_string(),
    ]
}

/// yuv420p needs even dimensions; odd edges get a black row or column.
pub fn pad_to_even(image: RgbImage) -> RgbImage {
    let (width, height) = image.dimensions();
    let (even_w, even_h) = (width + width % 2, height + height % 2);
    if (even_w, even_h) == (width, height) {
        return image;
    }
    let mut canvas = RgbImage::from_pixel(even_w, even_h, Rgb([0, 0, 0]));
    image::imageops::replace(&mut canvas, &image, 0, 0);
    canvas
}
