use rescue_core::game::config::{DEFAULT_PRIORS, SessionConfig, SessionConfigError};
use rescue_core::model::geometry::{AreaGeometry, CAPE_PYTHON_CORNERS};
use rescue_core::search::EffectivenessRange;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::Level;

const DEFAULT_RUN_ID: &str = "cape_python";
const DEFAULT_SESSIONS: usize = 100;
const DEFAULT_MAX_ROUNDS: u32 = 50;
const RUN_ID_ALLOWED: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789._-";

/// Root simulation configuration loaded from YAML.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SimulationConfig {
    pub run_id: String,
    #[serde(default)]
    pub seed: Option<u64>,
    /// Search area boxes on the chart as `[left, top, right, bottom]`.
    #[serde(default = "default_areas")]
    pub areas: [[u32; 4]; 3],
    #[serde(default = "default_priors")]
    pub priors: [f64; 3],
    #[serde(default)]
    pub effectiveness: EffectivenessRange,
    #[serde(default)]
    pub placement: PlacementConfig,
    #[serde(default)]
    pub autoplay: AutoplayConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            run_id: DEFAULT_RUN_ID.to_string(),
            seed: None,
            areas: default_areas(),
            priors: default_priors(),
            effectiveness: EffectivenessRange::default(),
            placement: PlacementConfig::default(),
            autoplay: AutoplayConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Load configuration from a YAML file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let path_buf = path.to_path_buf();
        let file = File::open(path).map_err(|source| ConfigError::Read {
            source,
            path: path_buf.clone(),
        })?;
        let reader = BufReader::new(file);
        let mut cfg: SimulationConfig =
            serde_yaml::from_reader(reader).map_err(|source| ConfigError::Parse {
                source,
                path: path_buf.clone(),
            })?;
        cfg.validate().map_err(|source| ConfigError::Invalid {
            path: path_buf,
            source,
        })?;
        Ok(cfg)
    }

    /// Validate the configuration without performing I/O.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        validate_run_id(&self.run_id)?;
        self.session_config()?;
        self.autoplay.validate(&self.run_id)?;
        self.logging.normalize();
        Ok(())
    }

    /// Builds the core session configuration, mapping failures onto config fields.
    pub fn session_config(&self) -> Result<SessionConfig, ValidationError> {
        let mut geometries = AreaGeometry::cape_python();
        for (index, (slot, corners)) in geometries.iter_mut().zip(self.areas).enumerate() {
            *slot = AreaGeometry::from_corners(corners).map_err(|err| {
                ValidationError::InvalidField {
                    field: format!("areas[{index}]"),
                    message: err.to_string(),
                }
            })?;
        }

        let session = SessionConfig {
            geometries,
            priors: self.priors,
            effectiveness: self.effectiveness,
            placement_mode: self.placement.mode,
        };
        session.validate().map_err(|err| {
            let field = match &err {
                SessionConfigError::EmptyArea { .. } | SessionConfigError::TargetOutOfBounds { .. } => {
                    "areas"
                }
                SessionConfigError::Prior(_) => "priors",
                SessionConfigError::Effectiveness(_) => "effectiveness",
                SessionConfigError::Placement(_) => "placement.mode",
            };
            ValidationError::InvalidField {
                field: field.to_string(),
                message: err.to_string(),
            }
        })?;
        Ok(session)
    }

    /// Resolve output templates (e.g., `{run_id}` placeholders) into concrete paths.
    pub fn resolved_outputs(&self) -> ResolvedOutputs {
        ResolvedOutputs {
            jsonl: resolve_template(&self.run_id, &self.autoplay.jsonl),
            summary_md: resolve_template(&self.run_id, &self.autoplay.summary_md),
        }
    }
}

fn default_areas() -> [[u32; 4]; 3] {
    CAPE_PYTHON_CORNERS
}

fn default_priors() -> [f64; 3] {
    DEFAULT_PRIORS
}

/// Target placement block.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct PlacementConfig {
    /// Mode of the triangular area draw over `[1, 4]`; midpoint when absent.
    #[serde(default)]
    pub mode: Option<f64>,
}

/// Unattended batch runs.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AutoplayConfig {
    #[serde(default = "default_sessions")]
    pub sessions: usize,
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,
    #[serde(default = "default_jsonl")]
    pub jsonl: String,
    #[serde(default = "default_summary_md")]
    pub summary_md: String,
}

impl Default for AutoplayConfig {
    fn default() -> Self {
        Self {
            sessions: default_sessions(),
            max_rounds: default_max_rounds(),
            jsonl: default_jsonl(),
            summary_md: default_summary_md(),
        }
    }
}

impl AutoplayConfig {
    fn validate(&self, run_id: &str) -> Result<(), ValidationError> {
        if self.sessions == 0 {
            return Err(ValidationError::InvalidField {
                field: "autoplay.sessions".to_string(),
                message: "number of sessions must be greater than zero".to_string(),
            });
        }

        if self.max_rounds == 0 {
            return Err(ValidationError::InvalidField {
                field: "autoplay.max_rounds".to_string(),
                message: "max_rounds must be at least 1".to_string(),
            });
        }

        for (label, value) in [
            ("autoplay.jsonl", &self.jsonl),
            ("autoplay.summary_md", &self.summary_md),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "path must not be empty".to_string(),
                });
            }

            let resolved = resolve_template(run_id, value);
            if resolved.components().count() == 0 {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "resolved path is invalid".to_string(),
                });
            }
        }
        Ok(())
    }
}

fn default_sessions() -> usize {
    DEFAULT_SESSIONS
}

fn default_max_rounds() -> u32 {
    DEFAULT_MAX_ROUNDS
}

fn default_jsonl() -> String {
    "out/{run_id}/rounds.jsonl".to_string()
}

fn default_summary_md() -> String {
    "out/{run_id}/summary.md".to_string()
}

/// Logging configuration defaults to disabled structured logs.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default)]
    pub enable_structured: bool,
    #[serde(default = "default_tracing_level")]
    pub tracing_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enable_structured: false,
            tracing_level: default_tracing_level(),
        }
    }
}

impl LoggingConfig {
    fn normalize(&mut self) {
        if self.tracing_level.trim().is_empty() {
            self.tracing_level = default_tracing_level();
        }
    }

    pub fn level(&self) -> Option<Level> {
        match self.tracing_level.to_ascii_lowercase().as_str() {
            "trace" => Some(Level::TRACE),
            "debug" => Some(Level::DEBUG),
            "info" => Some(Level::INFO),
            "warn" | "warning" => Some(Level::WARN),
            "error" => Some(Level::ERROR),
            _ => None,
        }
    }
}

fn default_tracing_level() -> String {
    "info".to_string()
}

fn validate_run_id(run_id: &str) -> Result<(), ValidationError> {
    if run_id.trim().is_empty() {
        return Err(ValidationError::InvalidField {
            field: "run_id".to_string(),
            message: "run_id must not be empty".to_string(),
        });
    }

    if !run_id.chars().all(|c| RUN_ID_ALLOWED.contains(c)) {
        return Err(ValidationError::InvalidField {
            field: "run_id".to_string(),
            message: "run_id may only contain alphanumeric characters, '.', '_' or '-'".to_string(),
        });
    }

    Ok(())
}

fn resolve_template(run_id: &str, template: &str) -> PathBuf {
    let replaced = template.replace("{run_id}", run_id);
    PathBuf::from(replaced)
}

/// Fully resolved output paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutputs {
    pub jsonl: PathBuf,
    pub summary_md: PathBuf,
}

impl ResolvedOutputs {
    /// Directory that receives the telemetry log.
    pub fn telemetry_dir(&self) -> PathBuf {
        self.summary_md
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Errors surfaced when loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        #[source]
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("invalid configuration in {path:?}: {source}")]
    Invalid {
        path: PathBuf,
        source: ValidationError,
    },
}

impl ConfigError {
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. }
            | ConfigError::Parse { path, .. }
            | ConfigError::Invalid { path, .. } => path.as_path(),
        }
    }
}

/// Validation failures captured with contextual metadata.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },
}
