//! Pipeline settings schemas

use std::time::Duration;

use metforge_core::{ConfigValue, OptionalKind, Result, Schema, TypeDescriptor, ValueType};

/// Workers used when `workers` is omitted
pub const DEFAULT_WORKERS: usize = 4;

/// Input file extension used when `extension` is omitted
pub const DEFAULT_EXTENSION: &str = "txt";

/// Top-level `settings` block of a pipeline document
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Directory scanned for bulletin files
    pub input_directory: String,
    /// Directory actions write into
    pub output_directory: String,
    /// Files processed concurrently
    pub workers: Option<i32>,
    /// Extension of input files
    pub extension: Option<String>,
    /// Retry policy for post actions
    pub retry: Option<RetrySettings>,
}

impl PipelineSettings {
    /// Effective worker count, at least one
    pub fn worker_count(&self) -> usize {
        self.workers
            .and_then(|w| usize::try_from(w).ok())
            .filter(|w| *w > 0)
            .unwrap_or(DEFAULT_WORKERS)
    }

    /// Effective input extension
    pub fn input_extension(&self) -> &str {
        self.extension.as_deref().unwrap_or(DEFAULT_EXTENSION)
    }
}

impl Schema for PipelineSettings {
    const NAME: &'static str = "PipelineSettings";

    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::schema(Self::NAME)
            .accessor("getInputDirectory", ValueType::String)
            .accessor("getOutputDirectory", ValueType::String)
            .accessor("workers", OptionalKind::Int.into())
            .accessor("extension", OptionalKind::of(ValueType::String).into())
            .accessor(
                "getRetry",
                OptionalKind::of(ValueType::schema::<RetrySettings>()).into(),
            )
    }

    fn from_config(config: ConfigValue) -> Result<Self> {
        let retry: Option<ConfigValue> = config.get("retry")?;
        Ok(Self {
            input_directory: config.get("inputDirectory")?,
            output_directory: config.get("outputDirectory")?,
            workers: config.get("workers")?,
            extension: config.get("extension")?,
            retry: retry.map(RetrySettings::from_config).transpose()?,
        })
    }
}

/// Retry policy for post actions
#[derive(Debug, Clone, Copy)]
pub struct RetrySettings {
    /// Total attempts, including the first
    pub max_attempts: i32,
    /// Pause between attempts
    pub delay_millis: Option<i64>,
}

impl RetrySettings {
    /// Pause between attempts
    pub fn delay(&self) -> Duration {
        let millis = self.delay_millis.unwrap_or(0).max(0);
        Duration::from_millis(millis.unsigned_abs())
    }

    /// Attempts to make, at least one
    pub fn attempts(&self) -> u32 {
        u32::try_from(self.max_attempts).unwrap_or(1).max(1)
    }
}

impl Schema for RetrySettings {
    const NAME: &'static str = "RetrySettings";

    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::schema(Self::NAME)
            .accessor("getMaxAttempts", ValueType::Int)
            .accessor("delayMillis", OptionalKind::Long.into())
    }

    fn from_config(config: ConfigValue) -> Result<Self> {
        Ok(Self {
            max_attempts: config.get("maxAttempts")?,
            delay_millis: config.get("delayMillis")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metforge_core::{ConfigMaterializer, ErrorKind, ValueMap};

    fn settings(source: &str) -> Result<PipelineSettings> {
        let raw: ValueMap = serde_yaml::from_str(source).unwrap();
        ConfigMaterializer::new().materialize_as(&raw)
    }

    #[test]
    fn test_defaults() {
        let settings = settings("{inputDirectory: in, outputDirectory: out}").unwrap();
        assert_eq!(settings.worker_count(), DEFAULT_WORKERS);
        assert_eq!(settings.input_extension(), "txt");
        assert!(settings.retry.is_none());
    }

    #[test]
    fn test_nested_retry() {
        let settings = settings(
            r#"
inputDirectory: in
outputDirectory: out
workers: 2
extension: tac
retry:
  maxAttempts: 3
  delayMillis: 10
"#,
        )
        .unwrap();
        assert_eq!(settings.worker_count(), 2);
        assert_eq!(settings.input_extension(), "tac");
        let retry = settings.retry.unwrap();
        assert_eq!(retry.attempts(), 3);
        assert_eq!(retry.delay(), Duration::from_millis(10));
    }

    #[test]
    fn test_retry_requires_attempts() {
        let err = settings("{inputDirectory: in, outputDirectory: out, retry: {delayMillis: 5}}")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredOption);
        assert!(err.to_string().contains("maxAttempts"));
    }
}
