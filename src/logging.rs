use crate::utils::truncate_display;
use crate::ResolutionOutcome;
use std::path::PathBuf;
use tracing::{debug, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt as subscriber_fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

#[derive(Debug)]
pub struct LogConfig {
    pub log_dir: PathBuf,
    pub log_level: String,
    pub console_output: bool,
    pub file_output: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: "logs".into(),
            log_level: "info".into(),
            console_output: true,
            file_output: false,
        }
    }
}

/// One-line structured summary of a resolution outcome, logged at a level
/// matching how it ended.
pub fn log_outcome_card(url: &str, outcome: &ResolutionOutcome) {
    const WIDTH: usize = 60;
    match outcome {
        ResolutionOutcome::Success(preview) => {
            info!(
                url = %truncate_display(url, WIDTH),
                platform = %preview.platform,
                title = %truncate_display(&preview.title, WIDTH),
                "Link resolved"
            );
        }
        ResolutionOutcome::Unsupported(platform) => {
            debug!(
                url = %truncate_display(url, WIDTH),
                platform = %platform,
                "Link not supported"
            );
        }
        ResolutionOutcome::Failed { kind, message } => {
            warn!(
                url = %truncate_display(url, WIDTH),
                kind = %kind,
                error = %truncate_display(message, WIDTH),
                "Link resolution failed"
            );
        }
        ResolutionOutcome::TimedOut => {
            warn!(url = %truncate_display(url, WIDTH), "Link resolution timed out");
        }
    }
}

pub fn setup_logging(config: LogConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let mut layers = Vec::new();

    if config.console_output {
        let console_layer = subscriber_fmt::layer()
            .with_target(true)
            .with_line_number(true)
            .with_file(true);
        layers.push(console_layer.boxed());
    }

    if config.file_output {
        std::fs::create_dir_all(&config.log_dir).expect("Failed to create log directory");

        let file_appender =
            RollingFileAppender::new(Rotation::DAILY, &config.log_dir, "link-resolver.log");

        let file_layer = subscriber_fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_line_number(true)
            .with_file(true)
            .with_writer(file_appender);

        layers.push(file_layer.boxed());
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()
        .expect("Failed to set global default subscriber");

    debug!("Logging initialized: {:?}", config);
}
