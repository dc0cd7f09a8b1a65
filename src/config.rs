use crate::error::{Error, Result};

/// Worker-pool configuration.
///
/// The pool size is fixed at construction; it cannot be changed while the
/// runtime is live.
#[derive(Debug, Clone)]
pub struct Config {
    pub num_threads: Option<usize>,
    pub stack_size: Option<usize>,
    pub thread_name_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            num_threads: None,
            stack_size: Some(2 * 1024 * 1024),
            thread_name_prefix: "tine-worker".to_string(),
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(n) = self.num_threads {
            if n == 0 {
                return Err(Error::config("num_threads must be > 0"));
            }
            if n > 1024 {
                return Err(Error::config("num_threads too large (max 1024)"));
            }
        }

        Ok(())
    }

    /// Effective worker count: configured value, or the hardware parallelism.
    pub fn worker_threads(&self) -> usize {
        self.num_threads.unwrap_or_else(num_cpus::get)
    }
}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn num_threads(mut self, n: usize) -> Self {
        self.config.num_threads = Some(n);
        self
    }

    pub fn stack_size(mut self, size: usize) -> Self {
        self.config.stack_size = Some(size);
        self
    }

    pub fn thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.config.thread_name_prefix = prefix.into();
        self
    }

    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(Config::default().validate().is_ok());
        assert!(Config::default().worker_threads() >= 1);
    }

    #[test]
    fn test_zero_threads_rejected() {
        let result = Config::builder().num_threads(0).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder() {
        let config = Config::builder()
            .num_threads(4)
            .thread_name_prefix("sorter")
            .build()
            .unwrap();

        assert_eq!(config.worker_threads(), 4);
        assert_eq!(config.thread_name_prefix, "sorter");
    }
}
