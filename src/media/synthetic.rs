use std::f64::consts::PI;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use image::{Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::error::{MediaError, MediaResult};
use crate::media::encoder::{FfmpegEncoder, RawVideo};
use crate::media::{timestamped_path, MediaAsset, MediaStrategy};

pub const WIDTH: u32 = 720;
pub const HEIGHT: u32 = 1280;

const PALETTES: [[[u8; 3]; 3]; 3] = [
    [[255, 100, 150], [100, 255, 200], [200, 150, 255]],
    [[255, 150, 100], [100, 200, 255], [255, 255, 100]],
    [[200, 100, 255], [100, 255, 150], [255, 200, 100]],
];

const SLIDESHOW_COLOURS: [[u8; 3]; 7] = [
    [0xFF, 0x6B, 0x6B],
    [0x4E, 0xCD, 0xC4],
    [0x45, 0xB7, 0xD1],
    [0x96, 0xCE, 0xB4],
    [0xFE, 0xCA, 0x57],
    [0xFF, 0x9F, 0xF3],
    [0x54, 0xA0, 0xFF],
];

const SEQUENCE_COLOURS: [[u8; 3]; 6] = [[255, 100, 150], [100, 255, 200], [200, 150, 255], [255, 150, 100], [100, 200, 255], [255, 255, 100]];

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Draws frame `index` of a `total`-frame animation.
pub fn render_frame(index: u32, total: u32, width: u32, height: u32) -> RgbImage {
    let progress = index as f64 / total.max(1) as f64;
    let palette = &PALETTES[(progress * 3.0) as usize % PALETTES.len()];
    let t = index as f64;
    let (w, h) = (width as f64, height as f64);

    let mut frame = RgbImage::new(width, height);
    for y in 0..height {
        let colour = gradient_row(palette, (y as f64 / h + progress) % 1.0);
        for x in 0..width {
            frame.put_pixel(x, y, colour);
        }
    }

    for i in 0..5 {
        let fi = i as f64;
        let angle = t * 0.05 + fi * (2.0 * PI / 5.0);
        let cx = w / 2.0 + (150.0 + fi * 20.0) * angle.cos();
        let cy = h / 2.0 + (100.0 + fi * 15.0) * angle.sin();
        let radius = 30.0 + 20.0 * (t * 0.08 + fi).sin();
        ring(&mut frame, cx, cy, radius, 3.0, WHITE);
        fill_circle(&mut frame, cx, cy, radius - 8.0, Rgb(palette[i % palette.len()]));
    }

    let mut x = 0.0;
    while x < w {
        let wave_y = h / 2.0 + 50.0 * (x * 0.02 + t * 0.1).sin();
        fill_circle(&mut frame, x, wave_y, 8.0, WHITE);
        x += 10.0;
    }

    for p in 0..15 {
        let fp = p as f64;
        let px = (t * 3.0 + fp * 50.0) % (w + 100.0);
        let py = h * 0.3 + 200.0 * ((t + fp * 20.0) * 0.05).sin();
        let size = (3.0 + 5.0 * (t * 0.1 + fp).sin()).trunc().abs();
        if px < w && (0.0..h).contains(&py) {
            fill_circle(&mut frame, px, py, size, WHITE);
        }
    }

    frame
}

fn gradient_row(palette: &[[u8; 3]; 3], position: f64) -> Rgb<u8> {
    let scaled = position * palette.len() as f64;
    let from = palette[scaled as usize % palette.len()];
    let to = palette[(scaled as usize + 1) % palette.len()];
    let blend = scaled.fract();
    let mix = |a: u8, b: u8| (a as f64 * (1.0 - blend) + b as f64 * blend) as u8;
    Rgb([mix(from[0], to[0]), mix(from[1], to[1]), mix(from[2], to[2])])
}

pub fn fill_circle(frame: &mut RgbImage, cx: f64, cy: f64, radius: f64, colour: Rgb<u8>) {
    paint_where(frame, cx, cy, radius, colour, |d| d <= radius);
}

/// Outline of `thickness` pixels centred on `radius`.
pub fn ring(frame: &mut RgbImage, cx: f64, cy: f64, radius: f64, thickness: f64, colour: Rgb<u8>) {
    let half = thickness / 2.0;
    paint_where(frame, cx, cy, radius + half, colour, |d| (d - radius).abs() <= half);
}

fn paint_where(frame: &mut RgbImage, cx: f64, cy: f64, reach: f64, colour: Rgb<u8>, inside: impl Fn(f64) -> bool) {
    if reach <= 0.0 {
        return;
    }
    let (width, height) = (frame.width() as f64, frame.height() as f64);
    let x0 = (cx - reach).floor().max(0.0) as u32;
    let y0 = (cy - reach).floor().max(0.0) as u32;
    let x1 = (cx + reach).ceil().min(width - 1.0);
    let y1 = (cy + reach).ceil().min(height - 1.0);
    if x1 < 0.0 || y1 < 0.0 {
        return;
    }
    for y in y0..=y1 as u32 {
        for x in x0..=x1 as u32 {
            let d = ((x as f64 - cx).powi(2) + (y as f64 - cy).powi(2)).sqrt();
            if inside(d) {
                frame.put_pixel(x, y, colour);
            }
        }
    }
}

/// Gradient, orbiting circles, a dot wave and drifting particles, streamed
/// straight into ffmpeg.
pub struct SyntheticAnimation {
    encoder: FfmpegEncoder,
    output_folder: PathBuf,
    secs: u32,
}

impl SyntheticAnimation {
    pub fn new(encoder: FfmpegEncoder, output_folder: PathBuf, secs: u32) -> Self {
        Self { encoder, output_folder, secs }
    }
}

#[async_trait]
impl MediaStrategy for SyntheticAnimation {
    fn name(&self) -> &'static str {
        "synthetic animation"
    }

    async fn produce(&self) -> MediaResult<MediaAsset> {
        tokio::fs::create_dir_all(&self.output_folder).await?;
        let path = timestamped_path(&self.output_folder, "synthetic", "mp4");
        let spec = RawVideo { width: WIDTH, height: HEIGHT, fps: 30, frames: 30 * self.secs };

        self.encoder.encode_raw(spec, path.clone(), move |index| render_frame(index, spec.frames, WIDTH, HEIGHT)).await?;
        Ok(MediaAsset::video(path, Duration::from_secs_f64(spec.duration_secs()), true))
    }
}

/// Five solid colour segments drawn from a fixed pool.
pub struct ColourSlideshow {
    encoder: FfmpegEncoder,
    output_folder: PathBuf,
    secs: u32,
    rng: Mutex<StdRng>,
}

impl ColourSlideshow {
    pub fn new(encoder: FfmpegEncoder, output_folder: PathBuf, secs: u32, rng: StdRng) -> Self {
        Self { encoder, output_folder, secs, rng: Mutex::new(rng) }
    }

    fn pick_colours(&self) -> Vec<[u8; 3]> {
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        SLIDESHOW_COLOURS.choose_multiple(&mut *rng, 5).copied().collect()
    }
}

pub fn segment_colour(colours: &[[u8; 3]], index: u32, total: u32) -> [u8; 3] {
    let segment = (index as usize * colours.len()) / total.max(1) as usize;
    colours[segment.min(colours.len() - 1)]
}

#[async_trait]
impl MediaStrategy for ColourSlideshow {
    fn name(&self) -> &'static str {
        "colour slideshow"
    }

    async fn produce(&self) -> MediaResult<MediaAsset> {
        tokio::fs::create_dir_all(&self.output_folder).await?;
        let path = timestamped_path(&self.output_folder, "slideshow", "mp4");
        let colours = self.pick_colours();
        let spec = RawVideo { width: WIDTH, height: HEIGHT, fps: 24, frames: 24 * self.secs };

        self.encoder
            .encode_raw(spec, path.clone(), move |index| RgbImage::from_pixel(WIDTH, HEIGHT, Rgb(segment_colour(&colours, index, spec.frames))))
            .await?;
        Ok(MediaAsset::video(path, Duration::from_secs_f64(spec.duration_secs()), true))
    }
}

/// Writes numbered PNG frames to a scratch directory and encodes them in one
/// ffmpeg pass.
pub struct FrameSequence {
    encoder: FfmpegEncoder,
    output_folder: PathBuf,
    secs: u32,
}

impl FrameSequence {
    const FPS: u32 = 24;

    pub fn new(encoder: FfmpegEncoder, output_folder: PathBuf, secs: u32) -> Self {
        Self { encoder, output_folder, secs }
    }

    async fn write_frames(&self, scratch: PathBuf) -> MediaResult<()> {
        let total = Self::FPS * self.secs;
        tokio::task::spawn_blocking(move || -> MediaResult<()> {
            std::fs::create_dir_all(&scratch)?;
            for index in 0..total {
                let colour = SEQUENCE_COLOURS[index as usize % SEQUENCE_COLOURS.len()];
                RgbImage::from_pixel(WIDTH, HEIGHT, Rgb(colour)).save(scratch.join(format!("frame_{index:06}.png")))?;
            }
            Ok(())
        })
        .await
        .map_err(|e| MediaError::Encoder(format!("frame writer panicked: {e}")))?
    }
}

#[async_trait]
impl MediaStrategy for FrameSequence {
    fn name(&self) -> &'static str {
        "frame sequence"
    }

    async fn produce(&self) -> MediaResult<MediaAsset> {
        tokio::fs::create_dir_all(&self.output_folder).await?;
        let path = timestamped_path(&self.output_folder, "frames", "mp4");
        let scratch = self.output_folder.join("temp_frames");

        let result = match self.write_frames(scratch.clone()).await {
            Ok(()) => self.encoder.encode_sequence(&scratch, Self::FPS, &path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = tokio::fs::remove_dir_all(&scratch).await {
            tracing::warn!("Could not remove scratch frames {}: {}", scratch.display(), e);
        }
        result?;

        Ok(MediaAsset::video(path, Duration::from_secs(self.secs as u64), true))
    }
}
