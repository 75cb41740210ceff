use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;

/// Wire shape used for `POST /analyze-meal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisVariant {
    /// `file` + `profile` multipart fields.
    Multipart,
    /// `{"image": "<base64>"}` JSON body.
    Json,
}

impl FromStr for AnalysisVariant {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "multipart" => Ok(Self::Multipart),
            "json" => Ok(Self::Json),
            other => anyhow::bail!("unknown analysis variant {other:?}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

#[derive(Debug, Clone)]
pub struct ImageConfig {
    pub max_edge: u32,
    pub jpeg_quality: u8,
    pub max_bytes: usize,
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    /// Single deadline applied to every analysis and logging call.
    pub request_timeout: Duration,
    pub retry: RetryConfig,
    pub variant: AnalysisVariant,
    pub image: ImageConfig,
    pub single_flight: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".into(),
            request_timeout: Duration::from_secs(120),
            retry: RetryConfig {
                max_retries: 2,
                initial_backoff: Duration::from_millis(1000),
            },
            variant: AnalysisVariant::Multipart,
            image: ImageConfig {
                max_edge: 800,
                jpeg_quality: 70,
                max_bytes: 5 * 1024 * 1024,
                output_dir: std::env::temp_dir(),
            },
            single_flight: true,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let api_url = std::env::var("API_URL")
            .unwrap_or(defaults.api_url)
            .trim_end_matches('/')
            .to_string();
        let request_timeout = Duration::from_secs(
            env_parse("API_TIMEOUT_SECS")?.unwrap_or(defaults.request_timeout.as_secs()),
        );
        let retry = RetryConfig {
            max_retries: env_parse("ANALYSIS_MAX_RETRIES")?
                .unwrap_or(defaults.retry.max_retries),
            initial_backoff: env_parse::<u64>("ANALYSIS_INITIAL_BACKOFF_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry.initial_backoff),
        };
        let variant = env_parse("ANALYSIS_VARIANT")?.unwrap_or(defaults.variant);
        let image = ImageConfig {
            max_edge: env_parse("IMAGE_MAX_EDGE")?.unwrap_or(defaults.image.max_edge),
            jpeg_quality: env_parse("IMAGE_JPEG_QUALITY")?.unwrap_or(defaults.image.jpeg_quality),
            max_bytes: env_parse("MAX_IMAGE_SIZE")?.unwrap_or(defaults.image.max_bytes),
            output_dir: std::env::var("IMAGE_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.image.output_dir),
        };
        let single_flight =
            env_parse("ANALYSIS_SINGLE_FLIGHT")?.unwrap_or(defaults.single_flight);

        let cfg = Self {
            api_url,
            request_timeout,
            retry,
            variant,
            image,
            single_flight,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.request_timeout.is_zero(),
            "API_TIMEOUT_SECS must be positive"
        );
        anyhow::ensure!(self.image.max_edge > 0, "IMAGE_MAX_EDGE must be positive");
        anyhow::ensure!(
            (1..=100).contains(&self.image.jpeg_quality),
            "IMAGE_JPEG_QUALITY must be within 1..=100"
        );
        Ok(())
    }
}

fn env_parse<T>(key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{e}"))
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        Err(_) => Ok(None),
    }
}
