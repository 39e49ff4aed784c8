//! Configuration loading with multi-layer merge

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level stylefit configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StylefitConfig {
    /// Formatter program settings
    #[serde(default)]
    pub formatter: FormatterConfig,

    /// Diff program settings
    #[serde(default)]
    pub diff: DiffConfig,

    /// Search and cache settings
    #[serde(default)]
    pub search: SearchConfig,
}

/// How to invoke the formatter
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FormatterConfig {
    /// Formatter executable
    #[serde(default = "default_formatter")]
    pub command: String,

    /// Extra arguments placed before the generated ones
    #[serde(default)]
    pub args: Vec<String>,
}

fn default_formatter() -> String {
    "clang-format".into()
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            command: default_formatter(),
            args: Vec::new(),
        }
    }
}

/// How to invoke the line-diff program
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DiffConfig {
    /// Diff executable; must understand `-u` and `--label`
    #[serde(default = "default_diff")]
    pub command: String,
}

fn default_diff() -> String {
    "diff".into()
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            command: default_diff(),
        }
    }
}

/// Search inputs, outputs and limits
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SearchConfig {
    /// Directory holding the canonical sample and the artifact cache
    #[serde(default = "default_dump_dir")]
    pub dump_dir: PathBuf,

    /// Option list to search
    #[serde(default = "default_options")]
    pub options: PathBuf,

    /// Where the resulting style is written
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Max concurrent formatter/diff processes
    pub max_concurrent: Option<usize>,
}

fn default_dump_dir() -> PathBuf {
    PathBuf::from("./tmp")
}

fn default_options() -> PathBuf {
    PathBuf::from("formatting-options.yml")
}

fn default_output() -> PathBuf {
    PathBuf::from(".clang-format")
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            dump_dir: default_dump_dir(),
            options: default_options(),
            output: default_output(),
            max_concurrent: None,
        }
    }
}

impl SearchConfig {
    /// Concurrency limit, falling back to the available parallelism
    pub fn concurrency(&self) -> usize {
        self.max_concurrent
            .filter(|n| *n > 0)
            .or_else(|| std::thread::available_parallelism().ok().map(|n| n.get()))
            .unwrap_or(4)
    }
}

impl StylefitConfig {
    /// Load configuration from the standard hierarchy
    ///
    /// Load order (later overrides earlier):
    /// 1. Built-in defaults
    /// 2. ~/.config/stylefit/config.toml
    /// 3. .stylefit/config.toml (project)
    pub fn load(project_dir: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(user_config_path) = Self::user_config_path() {
            if user_config_path.exists() {
                let user_config = Self::load_file(&user_config_path)
                    .with_context(|| format!("loading {}", user_config_path.display()))?;
                config.merge(user_config);
            }
        }

        let project_config_path = project_dir
            .map(|p| p.join(".stylefit/config.toml"))
            .unwrap_or_else(|| PathBuf::from(".stylefit/config.toml"));

        if project_config_path.exists() {
            let project_config = Self::load_file(&project_config_path)
                .with_context(|| format!("loading {}", project_config_path.display()))?;
            config.merge(project_config);
        }

        Ok(config.expand_paths())
    }

    /// Load configuration from a specific file
    pub fn load_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Get the user config path (~/.config/stylefit/config.toml)
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("stylefit/config.toml"))
    }

    /// Merge another config into this one (other wins where it differs from the defaults)
    pub fn merge(&mut self, other: Self) {
        if other.formatter.command != default_formatter() {
            self.formatter.command = other.formatter.command;
        }
        if !other.formatter.args.is_empty() {
            self.formatter.args = other.formatter.args;
        }

        if other.diff.command != default_diff() {
            self.diff.command = other.diff.command;
        }

        if other.search.dump_dir != default_dump_dir() {
            self.search.dump_dir = other.search.dump_dir;
        }
        if other.search.options != default_options() {
            self.search.options = other.search.options;
        }
        if other.search.output != default_output() {
            self.search.output = other.search.output;
        }
        if other.search.max_concurrent.is_some() {
            self.search.max_concurrent = other.search.max_concurrent;
        }
    }

    /// Expand `~` in program and path settings
    pub fn expand_paths(mut self) -> Self {
        self.formatter.command = expand(&self.formatter.command);
        self.diff.command = expand(&self.diff.command);
        self.search.dump_dir = expand_path(&self.search.dump_dir);
        self.search.options = expand_path(&self.search.options);
        self.search.output = expand_path(&self.search.output);
        self
    }
}

fn expand(value: &str) -> String {
    shellexpand::tilde(value).into_owned()
}

fn expand_path(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(s) => PathBuf::from(expand(s)),
        None => path.to_path_buf(),
    }
}
