use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};
use tracing::Instrument;

use crate::browser::catalog::SelectorCatalog;
use crate::browser::clipboard::ClipboardWriter;
use crate::browser::{Browser, BrowserLauncher, Readiness, SelectorSet};
use crate::caption::{Caption, CaptionProvider};
use crate::config::{BotConfig, Credentials};
use crate::error::{PosterResult, UiError};
use crate::media::{MediaAsset, MediaProvider};
use crate::poster::wait::wait_for_post_time;
use crate::scheduler::{ScheduleEntry, ScheduledJob};
use crate::ui::{CaptionInjector, Pacing, UiActionRunner};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostState {
    Init,
    LoggedIn,
    ComposerOpen,
    MediaUploaded,
    FormatAdjusted,
    Advanced1,
    Advanced2,
    CaptionHandled,
    AwaitingSchedule,
    Shared,
    Verified,
}

impl PostState {
    pub fn next(self) -> Option<PostState> {
        use PostState::*;
        match self {
            Init => Some(LoggedIn),
            LoggedIn => Some(ComposerOpen),
            ComposerOpen => Some(MediaUploaded),
            MediaUploaded => Some(FormatAdjusted),
            FormatAdjusted => Some(Advanced1),
            Advanced1 => Some(Advanced2),
            Advanced2 => Some(CaptionHandled),
            CaptionHandled => Some(AwaitingSchedule),
            AwaitingSchedule => Some(Shared),
            Shared => Some(Verified),
            Verified => None,
        }
    }
}

impl fmt::Display for PostState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Something that went wrong without sinking the attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Degradation {
    CaptionMissing,
    DefaultAspect,
    VerificationUncertain,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success { degradations: Vec<Degradation> },
    Failure { at: PostState, reason: String, screenshot: Option<PathBuf> },
}

/// Runs one end-to-end post: media, caption, then the composer flow in a
/// fresh browser session.
pub struct PostingOrchestrator<L: BrowserLauncher> {
    launcher: L,
    media: MediaProvider,
    captions: CaptionProvider,
    catalog: SelectorCatalog,
    clipboard: Box<dyn ClipboardWriter>,
    pacing: Pacing,
    credentials: Credentials,
    site_url: String,
    topic: String,
    debug_dir: PathBuf,
    post_wait_threshold: Duration,
    post_wait_quantum: Duration,
}

/// Progress of one attempt through the composer.
struct Progress {
    reached: PostState,
    degradations: Vec<Degradation>,
}

impl Progress {
    fn advance(&mut self, state: PostState) {
        tracing::info!("Reached state {}", state);
        self.reached = state;
    }
}

impl<L: BrowserLauncher> PostingOrchestrator<L> {
    pub fn new(config: &BotConfig, launcher: L, media: MediaProvider, captions: CaptionProvider, clipboard: Box<dyn ClipboardWriter>) -> Self {
        Self {
            launcher,
            media,
            captions,
            catalog: SelectorCatalog::instagram(&config.browser.site_url),
            clipboard,
            pacing: Pacing::from_config(config.timing.human_pacing),
            credentials: config.credentials.clone(),
            site_url: config.browser.site_url.clone(),
            topic: config.caption.topic.clone(),
            debug_dir: config.browser.debug_dir.clone(),
            post_wait_threshold: config.timing.post_wait_threshold(),
            post_wait_quantum: config.timing.post_wait_quantum(),
        }
    }

    /// One attempt. Never returns an error; every failure is folded into the
    /// outcome after the session and media file have been released.
    pub async fn run_attempt(&self, schedule: Option<ScheduleEntry>) -> AttemptOutcome {
        let post_at = schedule.map(|entry| entry.post_target(Local::now().naive_local()));
        let span = tracing::span!(tracing::Level::INFO, "attempt");
        async move {
            tracing::info!("Starting posting attempt");

            let asset = match self.media.obtain().await {
                Ok(asset) => asset,
                Err(e) => return self.report(AttemptOutcome::Failure { at: PostState::Init, reason: e.to_string(), screenshot: None }),
            };
            let caption = self.captions.obtain(&self.topic).await;

            let browser = match self.launcher.launch().await {
                Ok(browser) => browser,
                Err(e) => {
                    remove_media(&asset).await;
                    return self.report(AttemptOutcome::Failure { at: PostState::Init, reason: format!("could not start browser: {e}"), screenshot: None });
                }
            };

            let mut progress = Progress { reached: PostState::Init, degradations: Vec::new() };
            let outcome = match self.drive(&browser, &asset, &caption, post_at, &mut progress).await {
                Ok(()) => AttemptOutcome::Success { degradations: progress.degradations },
                Err(e) => {
                    let at = progress.reached.next().unwrap_or(progress.reached);
                    tracing::error!("Attempt failed moving to {}: {}", at, e);
                    let screenshot = self.capture_screenshot(&browser).await;
                    AttemptOutcome::Failure { at, reason: e.to_string(), screenshot }
                }
            };

            if let Err(e) = browser.quit().await {
                tracing::warn!("Error closing browser: {}", e);
            }
            remove_media(&asset).await;
            self.report(outcome)
        }
        .instrument(span)
        .await
    }

    fn report(&self, outcome: AttemptOutcome) -> AttemptOutcome {
        match &outcome {
            AttemptOutcome::Success { degradations } if degradations.is_empty() => tracing::info!("Post published"),
            AttemptOutcome::Success { degradations } => tracing::warn!("Post published with degradations: {:?}", degradations),
            AttemptOutcome::Failure { at, reason, screenshot } => {
                tracing::error!("Posting failed at {}: {} (screenshot: {:?})", at, reason, screenshot)
            }
        }
        outcome
    }

    async fn drive(&self, browser: &L::Session, asset: &MediaAsset, caption: &Caption, post_at: Option<NaiveDateTime>, progress: &mut Progress) -> PosterResult<()> {
        let runner = UiActionRunner::new(browser, &self.pacing);
        let pacing = &self.pacing;
        let catalog = &self.catalog;

        self.login(browser, &runner).await?;
        progress.advance(PostState::LoggedIn);

        if !runner.activate_optional(&catalog.create_button, pacing.wait_timeout).await {
            tracing::warn!("Create control not found, opening {} directly", catalog.create_url);
            browser.goto(&catalog.create_url).await?;
            pacing.pause(pacing.after_navigation).await;
        }
        runner.activate_optional(&catalog.post_option, pacing.optional_timeout).await;
        progress.advance(PostState::ComposerOpen);

        let absolute = tokio::fs::canonicalize(&asset.path).await?;
        let input = find(browser, &catalog.file_input, Readiness::Present, pacing.wait_timeout).await?;
        tracing::info!("Uploading {:?} file {} (duration {:?})", asset.modality, absolute.display(), asset.duration);
        browser.upload_file(&input, &absolute).await?;
        pacing.pause(pacing.after_upload).await;
        runner.activate_optional(&catalog.reels_notice_ok, pacing.notice_timeout).await;
        progress.advance(PostState::MediaUploaded);

        let cropped = runner.activate_optional(&catalog.crop_button, pacing.optional_timeout).await && runner.activate_optional(&catalog.crop_nine_sixteen, pacing.optional_timeout).await;
        if !cropped {
            tracing::warn!("Could not switch to 9:16, keeping the default aspect");
            progress.degradations.push(Degradation::DefaultAspect);
        }
        progress.advance(PostState::FormatAdjusted);

        runner.activate(&catalog.next_button, pacing.advance_timeout).await?;
        pacing.pause(pacing.after_advance).await;
        progress.advance(PostState::Advanced1);

        runner.activate(&catalog.next_button, pacing.advance_timeout).await?;
        pacing.pause(pacing.after_advance).await;
        progress.advance(PostState::Advanced2);

        let injector = CaptionInjector::new(browser, self.clipboard.as_ref(), pacing);
        if !injector.inject(&catalog.caption_field, caption.sanitized()).await {
            tracing::warn!("Continuing without a caption");
            progress.degradations.push(Degradation::CaptionMissing);
        }
        progress.advance(PostState::CaptionHandled);

        pacing.pause(pacing.before_share).await;
        if let Some(target) = post_at {
            wait_for_post_time(target, self.post_wait_threshold, self.post_wait_quantum).await;
        }
        progress.advance(PostState::AwaitingSchedule);

        runner.activate(&catalog.share_button, pacing.advance_timeout).await?;
        progress.advance(PostState::Shared);

        match find(browser, &catalog.share_confirmation, Readiness::Present, pacing.wait_timeout).await {
            Ok(_) => tracing::info!("Share confirmation seen"),
            Err(e) => {
                tracing::warn!("No share confirmation ({}), assuming the post went through", e);
                progress.degradations.push(Degradation::VerificationUncertain);
            }
        }
        pacing.pause(pacing.after_share).await;
        progress.advance(PostState::Verified);
        Ok(())
    }

    async fn login(&self, browser: &L::Session, runner: &UiActionRunner<'_, L::Session>) -> PosterResult<()> {
        let pacing = &self.pacing;
        tracing::info!("Logging in as {}", self.credentials.username);
        browser.goto(&self.site_url).await?;
        pacing.pause(pacing.after_navigation).await;

        let username = find(browser, &self.catalog.username_field, Readiness::Present, pacing.wait_timeout).await?;
        browser.send_text(&username, &self.credentials.username).await?;
        pacing.pause(pacing.between_fields).await;

        let password = find(browser, &self.catalog.password_field, Readiness::Present, pacing.wait_timeout).await?;
        browser.send_text(&password, &self.credentials.password).await?;
        pacing.pause(pacing.between_fields).await;

        runner.activate(&self.catalog.login_submit, pacing.wait_timeout).await?;
        pacing.pause(pacing.after_login).await;
        runner.activate_optional(&self.catalog.not_now, pacing.optional_timeout).await;
        Ok(())
    }

    async fn capture_screenshot(&self, browser: &L::Session) -> Option<PathBuf> {
        if let Err(e) = tokio::fs::create_dir_all(&self.debug_dir).await {
            tracing::warn!("Could not create {}: {}", self.debug_dir.display(), e);
            return None;
        }
        let path = screenshot_path(&self.debug_dir);
        match browser.screenshot(&path).await {
            Ok(()) => {
                tracing::info!("Debug screenshot saved to {}", path.display());
                Some(path)
            }
            Err(e) => {
                tracing::warn!("Could not take debug screenshot: {}", e);
                None
            }
        }
    }
}

fn screenshot_path(debug_dir: &Path) -> PathBuf {
    debug_dir.join(format!("debug_{}.png", chrono::Local::now().format("%Y%m%d_%H%M%S")))
}

/// First element matched by any selector of the set.
async fn find<B: Browser>(browser: &B, set: &SelectorSet, readiness: Readiness, timeout: Duration) -> Result<B::Element, UiError> {
    for selector in set.iter() {
        match browser.wait_for(selector, readiness, timeout).await {
            Ok(element) => return Ok(element),
            Err(e) => tracing::debug!("{} not matched by {}: {}", set.label(), selector, e),
        }
    }
    Err(UiError::Timeout(set.label().to_string()))
}

async fn remove_media(asset: &MediaAsset) {
    if !asset.delete_on_completion {
        return;
    }
    match tokio::fs::remove_file(&asset.path).await {
        Ok(()) => tracing::info!("Removed {}", asset.path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Could not remove {}: {}", asset.path.display(), e),
    }
}

/// Daily job that runs one attempt aimed at the entry's post time.
pub struct PostingJob<L: BrowserLauncher> {
    orchestrator: PostingOrchestrator<L>,
    entry: ScheduleEntry,
}

impl<L: BrowserLauncher> PostingJob<L> {
    pub fn new(orchestrator: PostingOrchestrator<L>, entry: ScheduleEntry) -> Self {
        Self { orchestrator, entry }
    }
}

#[async_trait]
impl<L: BrowserLauncher> ScheduledJob for PostingJob<L> {
    fn name(&self) -> &str {
        "daily post"
    }

    async fn run(&self) -> anyhow::Result<()> {
        match self.orchestrator.run_attempt(Some(self.entry)).await {
            AttemptOutcome::Success { .. } => Ok(()),
            AttemptOutcome::Failure { at, reason, .. } => Err(anyhow::anyhow!("failed at {at}: {reason}")),
        }
    }
}
