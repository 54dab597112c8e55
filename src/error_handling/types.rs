use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    MissingSettings(Vec<String>),
    EncoderNotFound(String),
    NotInRange(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::MissingSettings(keys) => {
                write!(f, "Missing required settings: {}", keys.join(", "))
            }
            ConfigError::EncoderNotFound(bin) => {
                write!(f, "ffmpeg not found at '{}'. Set FFMPEG_BIN.", bin)
            }
            ConfigError::NotInRange(e) => write!(f, "Value out of range: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

#[derive(Debug)]
pub enum LockError {
    OpenFailed(PathBuf, std::io::Error),
    LockFailed(PathBuf, String),
}

impl fmt::Display for LockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockError::OpenFailed(path, e) => {
                write!(f, "Unable to open lock file {}: {}", path.display(), e)
            }
            LockError::LockFailed(path, e) => {
                write!(f, "Unable to lock {}: {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for LockError {}

#[derive(Debug)]
pub enum CatalogError {
    NotFound(PathBuf),
    IoError(std::io::Error),
    Malformed(String),
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::NotFound(path) => write!(f, "Streams file not found: {}", path.display()),
            CatalogError::IoError(e) => write!(f, "Streams file IO error: {}", e),
            CatalogError::Malformed(e) => write!(f, "Streams file is malformed: {}", e),
        }
    }
}

impl std::error::Error for CatalogError {}

impl From<std::io::Error> for CatalogError {
    fn from(err: std::io::Error) -> Self {
        CatalogError::IoError(err)
    }
}

/// Reason a single encoder invocation did not yield a usable image.
#[derive(Debug)]
pub enum EncodeError {
    Spawn(std::io::Error),
    Timeout(Duration),
    NonZeroExit { code: Option<i32>, stderr: String },
    EmptyOutput,
    IoError(std::io::Error),
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::Spawn(e) => write!(f, "unable to start encoder: {}", e),
            EncodeError::Timeout(d) => write!(f, "timed out after {}s", d.as_secs_f32()),
            EncodeError::NonZeroExit { code, stderr } => match code {
                Some(code) => write!(f, "exited with status {}: {}", code, stderr),
                None => write!(f, "terminated by signal: {}", stderr),
            },
            EncodeError::EmptyOutput => write!(f, "produced empty output"),
            EncodeError::IoError(e) => write!(f, "encoder pipe error: {}", e),
        }
    }
}

impl std::error::Error for EncodeError {}

/// Every stage of the fallback chain that was reached has failed.
#[derive(Debug)]
pub enum CaptureError {
    /// The direct capture and the intermediate capture both failed.
    FallbackFailed {
        primary: EncodeError,
        fallback: EncodeError,
    },
    /// A frame was grabbed but could not be transcoded to the final format.
    ReencodeFailed {
        primary: EncodeError,
        reencode: EncodeError,
    },
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::FallbackFailed { primary, fallback } => write!(
                f,
                "direct capture failed ({}), fallback capture failed ({})",
                primary, fallback
            ),
            CaptureError::ReencodeFailed { primary, reencode } => write!(
                f,
                "direct capture failed ({}), re-encoding fallback frame failed ({})",
                primary, reencode
            ),
        }
    }
}

impl std::error::Error for CaptureError {}

#[derive(Debug)]
pub enum StorageError {
    ConnectionFailed(String),
    SchemaFailed(String),
    WriteFailed(String),
    ReadFailed(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::ConnectionFailed(e) => write!(f, "Storage connection failed: {}", e),
            StorageError::SchemaFailed(e) => write!(f, "Storage schema setup failed: {}", e),
            StorageError::WriteFailed(e) => write!(f, "Storage write failed: {}", e),
            StorageError::ReadFailed(e) => write!(f, "Storage read failed: {}", e),
        }
    }
}

impl std::error::Error for StorageError {}

/// Errors that abort a whole capture run.
#[derive(Debug)]
pub enum ControllerError {
    ConfigurationError(ConfigError),
    LockError(LockError),
    CatalogError(CatalogError),
    StorageError(StorageError),
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::ConfigurationError(e) => write!(f, "Configuration error: {}", e),
            ControllerError::LockError(e) => write!(f, "Lock error: {}", e),
            ControllerError::CatalogError(e) => write!(f, "Catalog error: {}", e),
            ControllerError::StorageError(e) => write!(f, "Storage error: {}", e),
        }
    }
}

impl std::error::Error for ControllerError {}

impl From<ConfigError> for ControllerError {
    fn from(err: ConfigError) -> Self {
        ControllerError::ConfigurationError(err)
    }
}

impl From<LockError> for ControllerError {
    fn from(err: LockError) -> Self {
        ControllerError::LockError(err)
    }
}

impl From<CatalogError> for ControllerError {
    fn from(err: CatalogError) -> Self {
        ControllerError::CatalogError(err)
    }
}

impl From<StorageError> for ControllerError {
    fn from(err: StorageError) -> Self {
        ControllerError::StorageError(err)
    }
}
