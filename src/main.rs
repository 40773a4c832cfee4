use std::env;

use chrono::Local;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{layer::SubscriberExt, Layer, Registry};

use crate::browser::clipboard::SystemClipboard;
use crate::browser::webdriver::WebDriverLauncher;
use crate::caption::chat::ChatCompletionClient;
use crate::caption::{CaptionProvider, TextGenerator};
use crate::config::{BotConfig, DEFAULT_CONFIG_PATH};
use crate::media::MediaProvider;
use crate::poster::{PostingJob, PostingOrchestrator};
use crate::scheduler::{ScheduleEntry, Scheduler};

mod browser;
mod caption;
mod config;
mod error;
mod media;
mod poster;
mod scheduler;
#[cfg(test)]
mod stub_http;
mod ui;

fn main() -> anyhow::Result<()> {
    let (_file_guard, _stdout_guard) = init_logging();

    let config_path = env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = BotConfig::load(&config_path)?;
    tracing::info!("Loaded configuration from {}", config_path);
    config.log_summary();

    let scheduler = build_scheduler(&config)?;
    let run_on_start = config.run_on_start;
    let poll_interval = config.timing.poll_interval();

    let rt_scheduler = tokio::runtime::Runtime::new()?;
    let _scheduler_thread = std::thread::Builder::new().name("scheduler".to_string()).spawn(move || {
        rt_scheduler.block_on(async move {
            if run_on_start {
                tracing::info!("Running one attempt now before the daily schedule");
                scheduler.run_now().await;
            }
            scheduler.run_forever(poll_interval).await
        })
    })?;

    let rt_main = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    rt_main.block_on(tokio::signal::ctrl_c())?;
    tracing::info!("Interrupted, shutting down");
    Ok(())
}

fn build_scheduler(config: &BotConfig) -> anyhow::Result<Scheduler> {
    let http = reqwest::Client::builder().build()?;

    let generator: Option<Box<dyn TextGenerator>> = config
        .api_keys
        .text_gen
        .as_ref()
        .filter(|key| !key.trim().is_empty())
        .map(|key| Box::new(ChatCompletionClient::new(http.clone(), key.as_str(), &config.caption)) as Box<dyn TextGenerator>);
    let captions = CaptionProvider::new(generator, &config.caption, config.media.seed);
    let media = MediaProvider::from_config(config, http);
    let launcher = WebDriverLauncher::new(config.browser.clone());

    let orchestrator = PostingOrchestrator::new(config, launcher, media, captions, Box::new(SystemClipboard));
    let entry = ScheduleEntry::new(config.post_time, config.lead_minutes);
    let job = PostingJob::new(orchestrator, entry);

    Ok(Scheduler::new(entry, Box::new(job), Local::now().naive_local()))
}

fn init_logging() -> (tracing_appender::non_blocking::WorkerGuard, tracing_appender::non_blocking::WorkerGuard) {
    let file_appender = tracing_appender::rolling::daily("logs/", "autopost.log");
    let (non_blocking, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::Layer::new()
        .compact()
        .with_file(true)
        .with_line_number(true)
        .with_target(false)
        .with_ansi(false)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(non_blocking)
        .with_filter(env_filter());

    let (non_blocking, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());
    let stdout_layer = tracing_subscriber::fmt::Layer::new()
        .compact()
        .with_file(true)
        .with_line_number(true)
        .with_thread_names(true)
        .with_target(false)
        .with_writer(non_blocking)
        .with_filter(env_filter());

    Registry::default().with(file_layer).with(stdout_layer).init();

    (file_guard, stdout_guard)
}

fn env_filter() -> EnvFilter {
    EnvFilter::builder().with_default_directive(LevelFilter::INFO.into()).from_env_lossy()
}
