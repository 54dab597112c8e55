use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Resolved settings for one capture run. Built once at startup and only
/// ever passed around by reference.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub database: DatabaseSettings,
    pub capture: CaptureSettings,
    /// Absolute path of the stream catalog
    pub streams_file: PathBuf,
    /// Upper bound on targets per run, `None` when unlimited
    pub max_streams: Option<usize>,
    pub lock_file: PathBuf,
}

#[derive(Clone, PartialEq)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub table: String,
}

impl fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("table", &self.table)
            .finish()
    }
}

/// Knobs handed to every encoder invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSettings {
    /// Encoder binary, resolved to an absolute path
    pub ffmpeg_bin: PathBuf,
    /// Wall-clock limit applied to each stage independently
    pub timeout: Duration,
    /// Output width in pixels, height follows the source aspect ratio
    pub scale_width: u32,
    /// libaom `cpu-used` value, 0 (slowest) to 8 (fastest)
    pub avif_speed: u8,
}

/// Optional TOML configuration file. Every key mirrors a command-line flag
/// and is only consulted when that flag and its environment variable are unset.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub database: DatabaseSection,
    pub capture: CaptureSection,
    pub catalog: CatalogSection,
    /// Directory of the file once loaded; relative paths in the file and the
    /// default catalog name resolve against it
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseSection {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub table: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptureSection {
    pub ffmpeg_bin: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub width: Option<u32>,
    pub avif_speed: Option<u8>,
    pub lock_file: Option<PathBuf>,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogSection {
    pub streams_file: Option<PathBuf>,
    pub max_streams: Option<usize>,
}
