//! Component configuration – reads/writes `~/.kobuki/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use kobuki_middleware::port::DEFAULT_CAPACITY;
use kobuki_types::KobukiError;
use serde::{Deserialize, Serialize};

/// Configuration of one Kobuki component instance.
///
/// Every field has a default, so an empty file (or no file) is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentConfig {
    /// Accepted for compatibility; the component itself does not read it.
    #[serde(default)]
    pub debug: bool,

    /// Connection target handed to the driver (serial device or port name).
    #[serde(default = "default_port")]
    pub port: String,

    /// Execution rate of the periodic context, in Hz.
    #[serde(default = "default_rate_hz")]
    pub rate_hz: f64,

    /// Buffer depth of every data port.
    #[serde(default = "default_port_capacity")]
    pub port_capacity: usize,
}

fn default_port() -> String {
    if cfg!(windows) {
        "COM1".to_string()
    } else {
        "/dev/ttyUSB0".to_string()
    }
}
fn default_rate_hz() -> f64 {
    10.0
}
fn default_port_capacity() -> usize {
    DEFAULT_CAPACITY
}

/// Largest accepted `port_capacity`.
pub const MAX_PORT_CAPACITY: usize = 65_536;

/// Length of one execute cycle at `rate_hz`.
///
/// # Errors
///
/// Returns [`KobukiError::Config`] unless `rate_hz` is positive and finite
/// and its period is representable and non-zero.
pub fn period_for_rate(rate_hz: f64) -> Result<Duration, KobukiError> {
    if !(rate_hz.is_finite() && rate_hz > 0.0) {
        return Err(KobukiError::Config(format!(
            "rate_hz must be a positive number, got {rate_hz}"
        )));
    }
    match Duration::try_from_secs_f64(1.0 / rate_hz) {
        Ok(period) if !period.is_zero() => Ok(period),
        _ => Err(KobukiError::Config(format!(
            "rate_hz {rate_hz} has no usable period"
        ))),
    }
}

impl Default for ComponentConfig {
    fn default() -> Self {
        Self {
            debug: false,
            port: default_port(),
            rate_hz: default_rate_hz(),
            port_capacity: default_port_capacity(),
        }
    }
}

impl ComponentConfig {
    /// Reject values the component cannot run with.
    pub fn validate(&self) -> Result<(), KobukiError> {
        period_for_rate(self.rate_hz)?;
        if self.port_capacity == 0 || self.port_capacity > MAX_PORT_CAPACITY {
            return Err(KobukiError::Config(format!(
                "port_capacity must be between 1 and {MAX_PORT_CAPACITY}, got {}",
                self.port_capacity
            )));
        }
        if self.port.trim().is_empty() {
            return Err(KobukiError::Config("port must not be empty".to_string()));
        }
        Ok(())
    }

    /// Length of one execute cycle at `rate_hz`.
    pub fn period(&self) -> Result<Duration, KobukiError> {
        period_for_rate(self.rate_hz)
    }
}

/// Return the path to `~/.kobuki/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".kobuki").join("config.toml")
}

/// Load the config from `path` and apply `KOBUKI_*` overrides.
///
/// Returns `None` if the file does not exist.
pub fn load(path: &Path) -> Result<Option<ComponentConfig>, KobukiError> {
    let Some(mut cfg) = load_from(path)? else {
        return Ok(None);
    };
    apply_env_overrides(&mut cfg);
    cfg.validate()?;
    Ok(Some(cfg))
}

/// Load the config from a specific path, without environment overrides.
pub fn load_from(path: &Path) -> Result<Option<ComponentConfig>, KobukiError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|e| {
        KobukiError::Config(format!("failed to read {}: {}", path.display(), e))
    })?;
    let cfg: ComponentConfig = toml::from_str(&raw)
        .map_err(|e| KobukiError::Config(format!("failed to parse {}: {}", path.display(), e)))?;
    Ok(Some(cfg))
}

/// Apply `KOBUKI_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `KOBUKI_PORT` | `port` |
/// | `KOBUKI_DEBUG` | `debug` (`1`/`true`/`0`/`false`) |
/// | `KOBUKI_RATE_HZ` | `rate_hz` |
///
/// Unparseable values are ignored.
pub fn apply_env_overrides(cfg: &mut ComponentConfig) {
    if let Ok(v) = std::env::var("KOBUKI_PORT")
        && !v.trim().is_empty()
    {
        cfg.port = v;
    }
    if let Ok(v) = std::env::var("KOBUKI_DEBUG")
        && let Some(flag) = parse_flag(&v)
    {
        cfg.debug = flag;
    }
    if let Ok(v) = std::env::var("KOBUKI_RATE_HZ")
        && let Ok(rate) = v.parse::<f64>()
        && rate.is_finite()
        && rate > 0.0
    {
        cfg.rate_hz = rate;
    }
}

fn parse_flag(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

/// Save the config to `path`, creating the parent directory if necessary.
pub fn save_to(cfg: &ComponentConfig, path: &Path) -> Result<(), KobukiError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            KobukiError::Config(format!("failed to create {}: {}", parent.display(), e))
        })?;
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| KobukiError::Config(format!("failed to serialize config: {}", e)))?;
    fs::write(path, raw)
        .map_err(|e| KobukiError::Config(format!("failed to write {}: {}", path.display(), e)))
}
