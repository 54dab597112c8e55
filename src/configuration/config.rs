use super::types::*;
use crate::error_handling::types::ConfigError;
use clap::Parser;
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_TABLE: &str = "timelapse_frames";
pub const DEFAULT_FFMPEG_BIN: &str = "ffmpeg";
pub const DEFAULT_STREAMS_FILE: &str = "links.json";
pub const DEFAULT_LOCK_FILE: &str = ".timelapse.lock";
pub const DEFAULT_MYSQL_PORT: u16 = 3306;
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_WIDTH: u32 = 1280;
pub const DEFAULT_AVIF_SPEED: u8 = 6;
pub const MAX_AVIF_SPEED: u8 = 8;

/// Command-line and environment configuration of a capture run.
///
/// Every setting can be given as a long flag or through the environment
/// variable named next to it, which is how scheduled runs are normally
/// configured. Settings left unset fall back to the optional TOML file given
/// by `--config-file`, then to built-in defaults.
///
/// # Examples
///
/// ```no_run
/// use timelapse::configuration::Configuration;
///
/// let config = Configuration::from_args().resolve().expect("invalid configuration");
/// println!("Capturing into table {}", config.database.table);
/// ```
///
/// # Fields Overview
///
/// - `config_file`: optional TOML file with `[database]`, `[capture]` and `[catalog]` sections
/// - `mysql_*`: connection parameters, host/user/password/database are required
/// - `ffmpeg_bin`: encoder binary, looked up through `PATH` when not absolute
/// - `capture_timeout_seconds`: limit applied to each encoder stage
/// - `capture_width`: output width, aspect ratio is preserved
/// - `avif_speed`: libaom speed/quality trade-off
/// - `streams_file`: stream catalog
/// - `max_streams`: cap on targets per run, `0` means unlimited
/// - `lock_file`: file guarding against overlapping runs
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "timelapse-capture")]
#[command(version)]
#[command(about = "Captures one still frame per live slope camera and stores it")]
pub struct Configuration {
    /// Optional TOML configuration file
    ///
    /// # Command Line
    /// Use `--config-file <PATH>` or `TIMELAPSE_CONFIG_FILE`
    #[arg(long, env = "TIMELAPSE_CONFIG_FILE")]
    pub config_file: Option<PathBuf>,

    /// Database server host name
    #[arg(long, env = "MYSQL_HOST")]
    pub mysql_host: Option<String>,

    /// Database server port, 3306 when unset
    #[arg(long, env = "MYSQL_PORT")]
    pub mysql_port: Option<u16>,

    #[arg(long, env = "MYSQL_USER")]
    pub mysql_user: Option<String>,

    #[arg(long, env = "MYSQL_PASSWORD", hide_env_values = true)]
    pub mysql_password: Option<String>,

    #[arg(long, env = "MYSQL_DATABASE")]
    pub mysql_database: Option<String>,

    /// Table receiving captured frames
    ///
    /// Created on first use, defaults to `timelapse_frames`
    #[arg(long, env = "MYSQL_TABLE")]
    pub mysql_table: Option<String>,

    /// Encoder binary name or path
    #[arg(long, env = "FFMPEG_BIN")]
    pub ffmpeg_bin: Option<String>,

    /// Wall-clock limit in seconds for each encoder stage
    #[arg(long, env = "CAPTURE_TIMEOUT_SECONDS")]
    pub capture_timeout_seconds: Option<u64>,

    /// Output frame width in pixels
    #[arg(long, env = "CAPTURE_WIDTH")]
    pub capture_width: Option<u32>,

    /// AVIF encoder speed (libaom `cpu-used`), 0 to 8
    #[arg(long, env = "AVIF_SPEED")]
    pub avif_speed: Option<u8>,

    /// Stream catalog, resolved against the working directory when relative
    ///
    /// Without it, `streams_file` from the config file or `links.json` is
    /// used, relative to the config file's directory.
    #[arg(long, env = "STREAMS_FILE")]
    pub streams_file: Option<PathBuf>,

    /// Maximum number of streams captured per run
    ///
    /// The first N streams in catalog order are kept. `0` means unlimited.
    #[arg(long, env = "MAX_STREAMS_PER_RUN")]
    pub max_streams: Option<usize>,

    /// Lock file preventing overlapping runs
    #[arg(long, env = "TIMELAPSE_LOCK_FILE")]
    pub lock_file: Option<PathBuf>,
}

impl Configuration {
    /// Parses the process arguments and environment.
    ///
    /// # Panics
    /// Exits the process with a usage message if an argument cannot be parsed,
    /// as `clap` does for any malformed command line.
    pub fn from_args() -> Self {
        Configuration::parse()
    }

    /// Layers flags/environment over the optional configuration file and
    /// defaults, then validates the result.
    ///
    /// Fails when a required database setting is missing, a numeric setting
    /// is out of range, or the encoder binary cannot be found.
    pub fn resolve(self) -> Result<RunConfig, ConfigError> {
        let file = match &self.config_file {
            Some(path) => load_file_config(path)?,
            None => FileConfig::default(),
        };
        self.merge(file)
    }

    fn merge(self, file: FileConfig) -> Result<RunConfig, ConfigError> {
        let FileConfig {
            database,
            capture,
            catalog,
            base_dir,
        } = file;

        let host = non_empty(self.mysql_host).or(non_empty(database.host));
        let user = non_empty(self.mysql_user).or(non_empty(database.user));
        let password = non_empty(self.mysql_password).or(non_empty(database.password));
        let name = non_empty(self.mysql_database).or(non_empty(database.name));

        let (host, user, password, name) = match (host, user, password, name) {
            (Some(host), Some(user), Some(password), Some(name)) => (host, user, password, name),
            (host, user, password, name) => {
                let missing = [
                    ("MYSQL_HOST", host.is_none()),
                    ("MYSQL_USER", user.is_none()),
                    ("MYSQL_PASSWORD", password.is_none()),
                    ("MYSQL_DATABASE", name.is_none()),
                ]
                .iter()
                .filter(|(_, absent)| *absent)
                .map(|(key, _)| key.to_string())
                .collect();
                return Err(ConfigError::MissingSettings(missing));
            }
        };

        let timeout_secs = self
            .capture_timeout_seconds
            .or(capture.timeout_seconds)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ConfigError::NotInRange(
                "capture timeout must be at least one second".to_string(),
            ));
        }

        let scale_width = self.capture_width.or(capture.width).unwrap_or(DEFAULT_WIDTH);
        if scale_width == 0 {
            return Err(ConfigError::NotInRange(
                "capture width must be positive".to_string(),
            ));
        }

        let avif_speed = self
            .avif_speed
            .or(capture.avif_speed)
            .unwrap_or(DEFAULT_AVIF_SPEED);
        if avif_speed > MAX_AVIF_SPEED {
            return Err(ConfigError::NotInRange(format!(
                "AVIF speed {} is above {}",
                avif_speed, MAX_AVIF_SPEED
            )));
        }

        let ffmpeg_name = non_empty(self.ffmpeg_bin)
            .or(non_empty(capture.ffmpeg_bin))
            .unwrap_or_else(|| DEFAULT_FFMPEG_BIN.to_string());
        let ffmpeg_bin = which::which(&ffmpeg_name)
            .map_err(|_| ConfigError::EncoderNotFound(ffmpeg_name.clone()))?;
        debug!("Resolved encoder binary {} to {}", ffmpeg_name, ffmpeg_bin.display());

        let streams_file = match self.streams_file {
            Some(path) => absolute(path)?,
            None => {
                let path = catalog
                    .streams_file
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_STREAMS_FILE));
                match &base_dir {
                    Some(dir) if path.is_relative() => dir.join(path),
                    _ => absolute(path)?,
                }
            }
        };

        let max_streams = match self.max_streams.or(catalog.max_streams) {
            Some(0) | None => None,
            Some(n) => Some(n),
        };

        let lock_file = self
            .lock_file
            .or(capture.lock_file)
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_LOCK_FILE));

        Ok(RunConfig {
            database: DatabaseSettings {
                host,
                port: self
                    .mysql_port
                    .or(database.port)
                    .unwrap_or(DEFAULT_MYSQL_PORT),
                user,
                password,
                database: name,
                table: non_empty(self.mysql_table)
                    .or(non_empty(database.table))
                    .unwrap_or_else(|| DEFAULT_TABLE.to_string()),
            },
            capture: CaptureSettings {
                ffmpeg_bin,
                timeout: Duration::from_secs(timeout_secs),
                scale_width,
                avif_speed,
            },
            streams_file,
            max_streams,
            lock_file,
        })
    }
}

/// Reads the TOML configuration file. A missing file is not an error, the
/// run then relies on flags and environment only.
pub fn load_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    if !path.exists() {
        info!(
            "Config file not found at {} (using flags and environment only)",
            path.display()
        );
        return Ok(FileConfig::default());
    }
    let text = std::fs::read_to_string(path)?;
    let mut config: FileConfig =
        toml::from_str(&text).map_err(|e| ConfigError::TomlError(e.to_string()))?;
    config.base_dir = absolute(path.to_path_buf())?
        .parent()
        .map(Path::to_path_buf);
    Ok(config)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn absolute(path: PathBuf) -> Result<PathBuf, ConfigError> {
    if path.is_absolute() {
        Ok(path)
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
