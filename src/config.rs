//! Configuration management for driving resumable sorts

use crate::error::{SortError, SortResult};
use std::str::FromStr;

/// Main configuration structure for drive operations
#[derive(Debug, Clone)]
pub struct SortConfig {
    /// How value files are compared
    pub mode: CompareMode,
    /// Reverse the result of comparisons
    pub reverse: bool,
    /// Seed for pivot selection; entropy when unset
    pub seed: Option<u64>,
    /// Checkpoint file to resume from and persist to
    pub checkpoint: Option<String>,
    /// Persist every this many steps (0 = only when the drive ends)
    pub checkpoint_interval: u64,
    /// Abort a drive after this many steps
    pub max_steps: Option<u64>,
    /// Number of sorts driven concurrently
    pub parallel_threads: Option<usize>,
    /// Value files to sort (`-` is stdin)
    pub input_files: Vec<String>,
    /// Output file path
    pub output_file: Option<String>,
}

/// Comparison mode for value files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareMode {
    /// Byte-wise comparison of whole lines
    Lexicographic,
    /// Floating point value of each line
    Numeric,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            mode: CompareMode::Lexicographic,
            reverse: false,
            seed: None,
            checkpoint: None,
            checkpoint_interval: 0,
            max_steps: None,
            parallel_threads: None,
            input_files: Vec::new(),
            output_file: None,
        }
    }
}

impl SortConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the comparison mode
    pub fn with_mode(mut self, mode: CompareMode) -> Self {
        self.mode = mode;
        self
    }

    /// Enable reverse ordering
    pub fn with_reverse(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }

    /// Fix the pivot seed
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Set checkpoint file
    pub fn with_checkpoint(mut self, checkpoint: Option<String>) -> Self {
        self.checkpoint = checkpoint;
        self
    }

    /// Set checkpoint interval in steps
    pub fn with_checkpoint_interval(mut self, interval: u64) -> Self {
        self.checkpoint_interval = interval;
        self
    }

    /// Set step limit
    pub fn with_max_steps(mut self, max_steps: Option<u64>) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Set parallel threads
    pub fn with_parallel_threads(mut self, threads: Option<usize>) -> Self {
        self.parallel_threads = threads;
        self
    }

    /// Validate configuration for consistency
    pub fn validate(&self) -> SortResult<()> {
        if self.checkpoint.is_some() && self.input_files.len() > 1 {
            return Err(SortError::conflicting_options(
                "a checkpoint can only track a single input",
            ));
        }

        if self.checkpoint_interval > 0 && self.checkpoint.is_none() {
            return Err(SortError::conflicting_options(
                "--checkpoint-every requires --checkpoint",
            ));
        }

        if self.max_steps == Some(0) {
            return Err(SortError::parse_error("step limit must be positive"));
        }

        // Validate thread count
        if let Some(threads) = self.parallel_threads {
            if threads == 0 {
                return Err(SortError::thread_pool_error(
                    "thread count must be positive",
                ));
            }
            if threads > 1024 {
                return Err(SortError::thread_pool_error(
                    "too many threads (maximum 1024)",
                ));
            }
        }

        Ok(())
    }

    /// Inputs to read; stdin (`-`) when none were named
    pub fn inputs(&self) -> Vec<String> {
        if self.input_files.is_empty() {
            vec!["-".to_string()]
        } else {
            self.input_files.clone()
        }
    }

    /// Get effective thread count
    pub fn effective_thread_count(&self) -> usize {
        self.parallel_threads.unwrap_or_else(num_cpus::get)
    }

    /// Configuration for one job of a parallel run: no shared checkpoint, own seed
    pub fn for_job(&self, index: usize) -> Self {
        let mut config = self.clone();
        config.checkpoint = None;
        config.checkpoint_interval = 0;
        config.seed = self.seed.map(|seed| seed.wrapping_add(index as u64));
        config
    }
}

impl FromStr for CompareMode {
    type Err = SortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lexicographic" | "text" | "default" => Ok(CompareMode::Lexicographic),
            "numeric" | "n" | "general-numeric" | "g" => Ok(CompareMode::Numeric),
            _ => Err(SortError::parse_error(&format!("unknown compare mode: {s}"))),
        }
    }
}

impl std::fmt::Display for CompareMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CompareMode::Lexicographic => "lexicographic",
            CompareMode::Numeric => "numeric",
        };
        write!(f, "{name}")
    }
}

/// Builder pattern for creating configurations
pub struct SortConfigBuilder {
    config: SortConfig,
}

impl SortConfigBuilder {
    /// Start building a new configuration
    pub fn new() -> Self {
        Self {
            config: SortConfig::default(),
        }
    }

    /// Set comparison mode
    pub fn mode(mut self, mode: CompareMode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Enable reverse ordering
    pub fn reverse(mut self) -> Self {
        self.config.reverse = true;
        self
    }

    /// Fix the pivot seed
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Set checkpoint file
    pub fn checkpoint(mut self, path: String) -> Self {
        self.config.checkpoint = Some(path);
        self
    }

    /// Set checkpoint interval
    pub fn checkpoint_interval(mut self, steps: u64) -> Self {
        self.config.checkpoint_interval = steps;
        self
    }

    /// Set step limit
    pub fn max_steps(mut self, steps: u64) -> Self {
        self.config.max_steps = Some(steps);
        self
    }

    /// Set parallel threads
    pub fn parallel_threads(mut self, threads: usize) -> Self {
        self.config.parallel_threads = Some(threads);
        self
    }

    /// Add an input file
    pub fn input_file(mut self, file: String) -> Self {
        self.config.input_files.push(file);
        self
    }

    /// Set output file
    pub fn output_file(mut self, file: String) -> Self {
        self.config.output_file = Some(file);
        self
    }

    /// Build the final configuration
    pub fn build(self) -> SortResult<SortConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for SortConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Preset configurations for common use cases
pub mod presets {
    use super::*;

    /// Configuration for numeric value files
    pub fn numeric() -> SortConfig {
        SortConfig::new().with_mode(CompareMode::Numeric)
    }

    /// Configuration for descending order
    pub fn reverse() -> SortConfig {
        SortConfig::new().with_reverse(true)
    }

    /// Configuration with fixed pivots, for replays
    pub fn reproducible(seed: u64) -> SortConfig {
        SortConfig::new().with_seed(Some(seed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SortConfig::default();
        assert_eq!(config.mode, CompareMode::Lexicographic);
        assert!(!config.reverse);
        assert!(config.seed.is_none());
        assert!(config.checkpoint.is_none());
        assert_eq!(config.checkpoint_interval, 0);
    }

    #[test]
    fn test_config_builder() {
        let config = SortConfigBuilder::new()
            .mode(CompareMode::Numeric)
            .reverse()
            .seed(17)
            .checkpoint("state.bin".to_string())
            .checkpoint_interval(10)
            .build()
            .expect("Failed to build test config");

        assert_eq!(config.mode, CompareMode::Numeric);
        assert!(config.reverse);
        assert_eq!(config.seed, Some(17));
        assert_eq!(config.checkpoint_interval, 10);
    }

    #[test]
    fn test_compare_mode_from_str() {
        assert_eq!(
            "numeric"
                .parse::<CompareMode>()
                .expect("Failed to parse numeric mode"),
            CompareMode::Numeric
        );
        assert_eq!(
            "TEXT"
                .parse::<CompareMode>()
                .expect("Failed to parse text mode"),
            CompareMode::Lexicographic
        );
        assert!("version".parse::<CompareMode>().is_err());
        assert_eq!(CompareMode::Numeric.to_string(), "numeric");
    }

    #[test]
    fn test_validate_conflicting_options() {
        let config = SortConfig {
            checkpoint: Some("state.bin".to_string()),
            input_files: vec!["a".to_string(), "b".to_string()],
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = SortConfig::default().with_checkpoint_interval(5);
        assert!(config.validate().is_err());

        let config = SortConfig::default().with_max_steps(Some(0));
        assert!(config.validate().is_err());

        let config = SortConfig::default().with_parallel_threads(Some(0));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_for_job_derives_seed() {
        let config = presets::reproducible(100)
            .with_checkpoint(Some("state.bin".to_string()))
            .with_checkpoint_interval(3);
        let job = config.for_job(4);
        assert_eq!(job.seed, Some(104));
        assert!(job.checkpoint.is_none());
        assert_eq!(job.checkpoint_interval, 0);
        assert!(job.validate().is_ok());
    }

    #[test]
    fn test_inputs_default_to_stdin() -> SortResult<()> {
        assert_eq!(SortConfig::default().inputs(), vec!["-".to_string()]);

        let config = SortConfigBuilder::new()
            .input_file("a.txt".to_string())
            .input_file("b.txt".to_string())
            .build()?;
        assert_eq!(config.inputs(), vec!["a.txt".to_string(), "b.txt".to_string()]);
        Ok(())
    }

    #[test]
    fn test_presets() {
        assert_eq!(presets::numeric().mode, CompareMode::Numeric);
        assert!(presets::reverse().reverse);
        assert_eq!(presets::reproducible(3).seed, Some(3));
    }
}
