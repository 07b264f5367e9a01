//! Configuration management for the token generator

use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::chains::{default_chains, ChainConfig};
use crate::editor::{MarkerMatching, DEFAULT_MARKER_PATTERNS};

/// Prefix of every environment override
pub const ENV_PREFIX: &str = "TOKEN_GENERATOR_";

/// Environment types for configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
    Test,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Staging => write!(f, "staging"),
            Environment::Production => write!(f, "production"),
            Environment::Test => write!(f, "test"),
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            "test" => Ok(Environment::Test),
            _ => Err(anyhow::anyhow!(
                "Invalid environment: {}. Use development, staging, production, or test",
                s
            )),
        }
    }
}

/// Contract directory layout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Project root; relative directories below resolve against it
    pub root: PathBuf,

    /// Original templates, `<original>/<type>/<TYPE>Generator.sol`
    pub original: PathBuf,

    /// Generated contracts, `<generated>/<type>/<name>.sol`
    pub generated: PathBuf,

    /// Hardhat artifacts and cache
    pub compiled: PathBuf,

    /// Constructor argument modules for verification
    pub args: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            original: PathBuf::from("contracts/original"),
            generated: PathBuf::from("contracts/generated"),
            compiled: PathBuf::from("contracts/compiled"),
            args: PathBuf::from("contracts/args"),
        }
    }
}

impl PathsConfig {
    /// Layout rooted at `root` with the default sub-directories
    pub fn rooted_at<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    pub fn original_dir(&self) -> PathBuf {
        self.resolve(&self.original)
    }

    pub fn generated_dir(&self) -> PathBuf {
        self.resolve(&self.generated)
    }

    pub fn compiled_dir(&self) -> PathBuf {
        self.resolve(&self.compiled)
    }

    pub fn args_dir(&self) -> PathBuf {
        self.resolve(&self.args)
    }
}

/// Hardhat invocation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HardhatConfig {
    /// Program to launch
    pub program: String,

    /// Arguments placed before the hardhat task
    pub base_args: Vec<String>,

    /// Working directory; defaults to `paths.root`
    pub working_dir: Option<PathBuf>,

    /// Timeout for a single hardhat task in seconds
    pub timeout_secs: u64,
}

impl Default for HardhatConfig {
    fn default() -> Self {
        Self {
            program: "npx".to_string(),
            base_args: vec!["hardhat".to_string()],
            working_dir: None,
            timeout_secs: 600,
        }
    }
}

/// In-process job queue settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Number of completed jobs kept for status queries
    pub remove_on_complete: usize,

    /// Number of failed jobs kept for status queries
    pub remove_on_fail: usize,

    /// Timeout for a single job in seconds
    pub timeout_secs: u64,

    /// Process the most recently added job first
    pub lifo: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            remove_on_complete: 60,
            remove_on_fail: 60,
            timeout_secs: 3600,
            lifo: true,
        }
    }
}

/// Template editing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Marker matching rule
    pub matching: MarkerMatching,

    /// Strip leftover marker comments from generated contracts
    pub clean_markers: bool,

    /// Patterns whose markers `clean_markers` removes
    pub marker_patterns: Vec<String>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            matching: MarkerMatching::default(),
            clean_markers: false,
            marker_patterns: DEFAULT_MARKER_PATTERNS.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (json, pretty, compact)
    pub format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Environment (development, staging, production, test)
    pub environment: Environment,

    pub paths: PathsConfig,

    pub hardhat: HardhatConfig,

    pub queue: QueueConfig,

    pub editor: EditorConfig,

    pub logging: LogConfig,

    /// Verification networks keyed by symbol
    pub chains: BTreeMap<String, ChainConfig>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            paths: PathsConfig::default(),
            hardhat: HardhatConfig::default(),
            queue: QueueConfig::default(),
            editor: EditorConfig::default(),
            logging: LogConfig::default(),
            chains: default_chains(),
        }
    }
}

impl GeneratorConfig {
    /// Defaults adjusted for `environment`
    pub fn for_environment(environment: Environment) -> Self {
        let mut config = GeneratorConfig {
            environment,
            ..Default::default()
        };

        match environment {
            Environment::Development => {
                config.logging.level = "debug".to_string();
            }
            Environment::Test => {
                config.logging.level = "warn".to_string();
                config.hardhat.timeout_secs = 60;
                config.queue.timeout_secs = 60;
            }
            Environment::Staging => {
                config.logging.level = "info".to_string();
                config.editor.clean_markers = true;
            }
            Environment::Production => {
                config.logging.level = "warn".to_string();
                config.logging.format = "json".to_string();
                config.editor.clean_markers = true;
            }
        }

        config
    }

    /// Working directory hardhat runs in
    pub fn hardhat_working_dir(&self) -> PathBuf {
        self.hardhat
            .working_dir
            .clone()
            .unwrap_or_else(|| self.paths.root.clone())
    }
}

/// Configuration validation error
#[derive(Debug)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validation error in field '{}': {}", self.field, self.message)
    }
}

/// Configuration validation result
pub type ValidationResult = std::result::Result<(), Vec<ValidationError>>;

/// Configuration validator trait
pub trait ConfigValidator {
    /// Validate the configuration
    fn validate(&self) -> ValidationResult;
}

fn finish(errors: Vec<ValidationError>) -> ValidationResult {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

impl ConfigValidator for GeneratorConfig {
    fn validate(&self) -> ValidationResult {
        let mut errors = Vec::new();

        for result in [
            self.paths.validate(),
            self.hardhat.validate(),
            self.queue.validate(),
            self.editor.validate(),
            self.logging.validate(),
        ] {
            if let Err(mut section_errors) = result {
                errors.append(&mut section_errors);
            }
        }

        if self.chains.is_empty() {
            errors.push(ValidationError::new(
                "chains",
                "At least one chain configuration is required",
            ));
        }
        for (key, chain) in &self.chains {
            if let Err(e) = chain.validate() {
                errors.push(ValidationError::new(format!("chains.{}", key), e.to_string()));
            }
        }

        finish(errors)
    }
}

impl ConfigValidator for PathsConfig {
    fn validate(&self) -> ValidationResult {
        let mut errors = Vec::new();

        for (field, path) in [
            ("paths.original", &self.original),
            ("paths.generated", &self.generated),
            ("paths.compiled", &self.compiled),
            ("paths.args", &self.args),
        ] {
            if path.as_os_str().is_empty() {
                errors.push(ValidationError::new(field, "Path cannot be empty"));
            }
        }

        if self.original_dir() == self.generated_dir() {
            errors.push(ValidationError::new(
                "paths.generated",
                "Generated contracts must not share the original template directory",
            ));
        }

        finish(errors)
    }
}

impl ConfigValidator for HardhatConfig {
    fn validate(&self) -> ValidationResult {
        let mut errors = Vec::new();

        if self.program.trim().is_empty() {
            errors.push(ValidationError::new("hardhat.program", "Program cannot be empty"));
        }
        if self.timeout_secs == 0 {
            errors.push(ValidationError::new(
                "hardhat.timeout_secs",
                "Timeout must be greater than 0",
            ));
        }

        finish(errors)
    }
}

impl ConfigValidator for QueueConfig {
    fn validate(&self) -> ValidationResult {
        let mut errors = Vec::new();

        if self.timeout_secs == 0 {
            errors.push(ValidationError::new(
                "queue.timeout_secs",
                "Job timeout must be greater than 0",
            ));
        }

        finish(errors)
    }
}

impl ConfigValidator for EditorConfig {
    fn validate(&self) -> ValidationResult {
        let mut errors = Vec::new();

        if self.clean_markers && self.marker_patterns.is_empty() {
            errors.push(ValidationError::new(
                "editor.marker_patterns",
                "Marker cleanup needs at least one pattern",
            ));
        }
        if self.marker_patterns.iter().any(|p| p.trim().is_empty()) {
            errors.push(ValidationError::new(
                "editor.marker_patterns",
                "Marker patterns cannot be empty",
            ));
        }

        finish(errors)
    }
}

impl ConfigValidator for LogConfig {
    fn validate(&self) -> ValidationResult {
        let mut errors = Vec::new();

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.level.as_str()) {
            errors.push(ValidationError::new(
                "logging.level",
                format!(
                    "Invalid log level '{}'. Valid levels: {}",
                    self.level,
                    valid_levels.join(", ")
                ),
            ));
        }

        let valid_formats = ["json", "pretty", "compact"];
        if !valid_formats.contains(&self.format.as_str()) {
            errors.push(ValidationError::new(
                "logging.format",
                format!(
                    "Invalid log format '{}'. Valid formats: {}",
                    self.format,
                    valid_formats.join(", ")
                ),
            ));
        }

        finish(errors)
    }
}

/// Configuration manager for loading, validating, and managing configurations
pub struct ConfigManager {
    config: GeneratorConfig,
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new configuration manager with the default configuration
    pub fn new() -> Self {
        Self {
            config: GeneratorConfig::default(),
            config_path: PathBuf::from("token-generator.toml"),
        }
    }

    /// Wrap an existing configuration
    pub fn from_config(config: GeneratorConfig) -> Self {
        Self {
            config,
            config_path: PathBuf::from("token-generator.toml"),
        }
    }

    /// Load configuration from a file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;

        let config = match path.extension().and_then(|s| s.to_str()) {
            Some("toml") => toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML configuration file: {}", path.display()))?,
            Some("json") => serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON configuration file: {}", path.display()))?,
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML configuration file: {}", path.display()))?,
            _ => return Err(anyhow::anyhow!("Unsupported configuration file format. Supported formats: .toml, .json, .yaml, .yml")),
        };

        let mut manager = Self {
            config,
            config_path: path.to_path_buf(),
        };

        manager.apply_environment_overrides()?;

        Ok(manager)
    }

    /// Load configuration for a specific environment
    ///
    /// Prefers `token-generator.<env>.toml` next to `base_path`, then
    /// `base_path` itself, then the environment defaults.
    pub fn load_for_environment<P: AsRef<Path>>(base_path: P, environment: Environment) -> Result<Self> {
        let base_path = base_path.as_ref();

        let env_file = base_path.with_file_name(format!("token-generator.{}.toml", environment));
        if env_file.exists() {
            return Self::load_from_file(env_file);
        }
        if base_path.exists() {
            return Self::load_from_file(base_path);
        }

        let mut manager = Self {
            config: GeneratorConfig::for_environment(environment),
            config_path: base_path.to_path_buf(),
        };

        manager.apply_environment_overrides()?;

        Ok(manager)
    }

    /// Apply `TOKEN_GENERATOR_*` environment variable overrides
    pub fn apply_environment_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| env::var(key).ok())
    }

    /// Apply overrides using `lookup` to read variables
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

        if let Some(root) = var("ROOT") {
            self.config.paths.root = PathBuf::from(root);
        }
        if let Some(program) = var("HARDHAT_PROGRAM") {
            self.config.hardhat.program = program;
        }
        if let Some(timeout) = var("HARDHAT_TIMEOUT") {
            self.config.hardhat.timeout_secs = timeout
                .parse()
                .with_context(|| "Invalid TOKEN_GENERATOR_HARDHAT_TIMEOUT value")?;
        }
        if let Some(level) = var("LOG_LEVEL") {
            self.config.logging.level = level;
        }
        if let Some(format) = var("LOG_FORMAT") {
            self.config.logging.format = format;
        }
        if let Some(matching) = var("MARKER_MATCHING") {
            self.config.editor.matching = matching
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid TOKEN_GENERATOR_MARKER_MATCHING value: {}", e))?;
        }
        if let Some(environment) = var("ENVIRONMENT") {
            self.config.environment = environment.parse()?;
        }

        Ok(())
    }

    /// Validate the current configuration
    pub fn validate(&self) -> ValidationResult {
        self.config.validate()
    }

    /// Get the configuration
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Get a mutable reference to the configuration
    pub fn config_mut(&mut self) -> &mut GeneratorConfig {
        &mut self.config
    }

    /// Path the configuration was loaded from
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn into_config(self) -> GeneratorConfig {
        self.config
    }

    /// Save the current configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        let content = match path.extension().and_then(|s| s.to_str()) {
            Some("toml") => toml::to_string_pretty(&self.config)
                .with_context(|| "Failed to serialize configuration to TOML")?,
            Some("json") => serde_json::to_string_pretty(&self.config)
                .with_context(|| "Failed to serialize configuration to JSON")?,
            Some("yaml") | Some("yml") => serde_yaml::to_string(&self.config)
                .with_context(|| "Failed to serialize configuration to YAML")?,
            _ => return Err(anyhow::anyhow!("Unsupported configuration file format. Supported formats: .toml, .json, .yaml, .yml")),
        };

        fs::write(path, content)
            .with_context(|| format!("Failed to write configuration file: {}", path.display()))?;

        Ok(())
    }

    /// Generate a default configuration file
    pub fn generate_default_config<P: AsRef<Path>>(path: P, environment: Environment) -> Result<()> {
        let manager = ConfigManager {
            config: GeneratorConfig::for_environment(environment),
            config_path: path.as_ref().to_path_buf(),
        };

        manager.save_to_file(path)?;
        Ok(())
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests;
