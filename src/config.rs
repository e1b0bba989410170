//! Configuration of the enrollment client and its logging.
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{env, fmt, fs, io};

use log::{error, info, LevelFilter};
use serde::de;
use serde::{Deserialize, Deserializer};
#[cfg(unix)]
use syslog::Facility;

use crate::commons::crypto::cms::EnvelopeCipher;
use crate::commons::util::ext_serde;
use crate::constants::*;

//------------ ConfigDefaults ------------------------------------------------

pub struct ConfigDefaults;

impl ConfigDefaults {
    fn server() -> String {
        "https://localhost".to_string()
    }
    fn enrollment_path() -> String {
        SCEP_DEFAULT_ENROLLMENT_PATH.to_string()
    }
    fn timeout_secs() -> u64 {
        HTTP_CLIENT_TIMEOUT_SECS
    }
    fn ca_cert_index() -> usize {
        CA_RA_CERT_DEFAULT_INDEX
    }
    fn envelope_cipher() -> EnvelopeCipher {
        EnvelopeCipher::default()
    }
    fn key_size() -> u32 {
        MIN_RSA_KEY_BITS
    }
    fn bootstrap_validity_days() -> u32 {
        BOOTSTRAP_VALIDITY_DAYS
    }
    fn strict_message_type() -> bool {
        false
    }
    fn log_level() -> LevelFilter {
        match env::var(SCEPC_ENV_LOG_LEVEL) {
            Ok(level) => match LevelFilter::from_str(&level) {
                Ok(level) => level,
                Err(_) => {
                    eprintln!(
                        "Unrecognized value for log level in env var {}, using 'info'",
                        SCEPC_ENV_LOG_LEVEL
                    );
                    LevelFilter::Info
                }
            },
            _ => LevelFilter::Info,
        }
    }
    fn log_type() -> LogType {
        LogType::Stderr
    }
    fn log_file() -> PathBuf {
        PathBuf::from("./scepc.log")
    }
    fn syslog_facility() -> String {
        "user".to_string()
    }
}

//------------ Config --------------------------------------------------------

/// Global configuration for an enrollment run.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// The base URL of the CA.
    #[serde(default = "ConfigDefaults::server")]
    pub server: String,

    /// Where below `server` the SCEP service lives.
    #[serde(default = "ConfigDefaults::enrollment_path")]
    pub enrollment_path: String,

    #[serde(default = "ConfigDefaults::timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "ConfigDefaults::ca_cert_index")]
    pub ca_cert_index: usize,

    #[serde(default = "ConfigDefaults::envelope_cipher")]
    pub envelope_cipher: EnvelopeCipher,

    #[serde(default = "ConfigDefaults::key_size")]
    pub key_size: u32,

    #[serde(default = "ConfigDefaults::bootstrap_validity_days")]
    pub bootstrap_validity_days: u32,

    #[serde(default = "ConfigDefaults::strict_message_type")]
    pub strict_message_type: bool,

    #[serde(
        default = "ConfigDefaults::log_level",
        deserialize_with = "ext_serde::de_level_filter"
    )]
    pub log_level: LevelFilter,

    #[serde(default = "ConfigDefaults::log_type")]
    pub log_type: LogType,

    #[serde(default = "ConfigDefaults::log_file")]
    pub log_file: PathBuf,

    #[serde(default = "ConfigDefaults::syslog_facility")]
    pub syslog_facility: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ConfigDefaults::server(),
            enrollment_path: ConfigDefaults::enrollment_path(),
            timeout_secs: ConfigDefaults::timeout_secs(),
            ca_cert_index: ConfigDefaults::ca_cert_index(),
            envelope_cipher: ConfigDefaults::envelope_cipher(),
            key_size: ConfigDefaults::key_size(),
            bootstrap_validity_days: ConfigDefaults::bootstrap_validity_days(),
            strict_message_type: ConfigDefaults::strict_message_type(),
            log_level: ConfigDefaults::log_level(),
            log_type: ConfigDefaults::log_type(),
            log_file: ConfigDefaults::log_file(),
            syslog_facility: ConfigDefaults::syslog_facility(),
        }
    }
}

/// # Create and verify
///
impl Config {
    /// Reads and verifies the config file, or uses the defaults if no file
    /// is given.
    pub fn create(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match config_file {
            None => Config::default(),
            Some(file) => Self::read_config(file).map_err(|e| {
                ConfigError::Other(format!("Error parsing config file: {}, error: {}", file.display(), e))
            })?,
        };
        config.verify()?;
        Ok(config)
    }

    pub fn read_config(file: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(file)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let c: Config = toml::from_str(content)?;
        Ok(c)
    }

    pub fn verify(&self) -> Result<(), ConfigError> {
        if self.server.is_empty() {
            return Err(ConfigError::other("server must be set"));
        }

        if self.timeout_secs == 0 {
            return Err(ConfigError::other("timeout_secs must be at least 1"));
        }

        if self.key_size < MIN_RSA_KEY_BITS {
            return Err(ConfigError::Other(format!(
                "key_size must be at least {}",
                MIN_RSA_KEY_BITS
            )));
        }

        if self.bootstrap_validity_days == 0 || self.bootstrap_validity_days > BOOTSTRAP_MAX_VALIDITY_DAYS {
            return Err(ConfigError::Other(format!(
                "bootstrap_validity_days must be between 1 and {}",
                BOOTSTRAP_MAX_VALIDITY_DAYS
            )));
        }

        Ok(())
    }
}

/// # Logging
///
impl Config {
    pub fn init_logging(&self) -> Result<(), ConfigError> {
        match self.log_type {
            LogType::File => self.file_logger(&self.log_file),
            LogType::Stderr => self.stderr_logger(),
            LogType::Syslog => self.syslog_logger(),
        }
    }

    /// Creates a stderr logger.
    fn stderr_logger(&self) -> Result<(), ConfigError> {
        self.fern_logger()
            .chain(io::stderr())
            .apply()
            .map_err(|e| ConfigError::Other(format!("Failed to init stderr logging: {}", e)))
    }

    /// Creates a file logger using the file provided by `path`.
    fn file_logger(&self, path: &Path) -> Result<(), ConfigError> {
        let file = match fern::log_file(path) {
            Ok(file) => file,
            Err(err) => {
                let error_string = format!("Failed to open log file '{}': {}", path.display(), err);
                error!("{}", error_string.as_str());
                return Err(ConfigError::Other(error_string));
            }
        };
        self.fern_logger()
            .chain(file)
            .apply()
            .map_err(|e| ConfigError::Other(format!("Failed to init file logging: {}", e)))
    }

    /// Creates a syslog logger for the configured facility.
    #[cfg(unix)]
    fn syslog_logger(&self) -> Result<(), ConfigError> {
        let facility =
            Facility::from_str(&self.syslog_facility).map_err(|_| ConfigError::other("Invalid syslog_facility"))?;

        let process = env::current_exe()
            .ok()
            .and_then(|path| {
                path.file_name()
                    .and_then(std::ffi::OsStr::to_str)
                    .map(ToString::to_string)
            })
            .unwrap_or_else(|| String::from("scepc"));
        let formatter = syslog::Formatter3164 {
            facility,
            hostname: None,
            process,
            pid: std::process::id(),
        };
        let logger = syslog::unix(formatter.clone())
            .or_else(|_| syslog::tcp(formatter.clone(), ("127.0.0.1", 601)))
            .or_else(|_| syslog::udp(formatter, ("127.0.0.1", 0), ("127.0.0.1", 514)));
        match logger {
            Ok(logger) => self
                .fern_logger()
                .chain(logger)
                .apply()
                .map_err(|e| ConfigError::Other(format!("Failed to init syslog: {}", e))),
            Err(err) => Err(ConfigError::Other(format!("Cannot connect to syslog: {}", err))),
        }
    }

    #[cfg(not(unix))]
    fn syslog_logger(&self) -> Result<(), ConfigError> {
        Err(ConfigError::other("syslog is only supported on unix"))
    }

    /// Creates and returns a fern logger with log level tweaks
    fn fern_logger(&self) -> fern::Dispatch {
        // suppress overly noisy logging
        let framework_level = self.log_level.min(LevelFilter::Warn);

        let show_target = self.log_level == LevelFilter::Trace || self.log_level == LevelFilter::Debug;
        fern::Dispatch::new()
            .format(move |out, message, record| {
                if show_target {
                    out.finish(format_args!(
                        "{} [{}] [{}] {}",
                        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                        record.level(),
                        record.target(),
                        message
                    ))
                } else {
                    out.finish(format_args!(
                        "{} [{}] {}",
                        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                        record.level(),
                        message
                    ))
                }
            })
            .level(self.log_level)
            .level_for("rustls", framework_level)
            .level_for("hyper", framework_level)
            .level_for("hyper_util", framework_level)
            .level_for("mio", framework_level)
            .level_for("reqwest", framework_level)
            .level_for("want", framework_level)
            .level_for("h2", framework_level)
    }

    /// Logs the effective settings, once logging is up.
    pub fn log_summary(&self) {
        info!(
            "{} {} enrolling at {} (path '{}'), key size {}, cipher {}",
            SCEPC_CLIENT_APP,
            SCEPC_VERSION,
            self.server,
            self.enrollment_path,
            self.key_size,
            self.envelope_cipher
        );
    }
}

//------------ ConfigError ---------------------------------------------------

#[derive(Debug)]
pub enum ConfigError {
    IoError(io::Error),
    TomlError(toml::de::Error),
    Other(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "{}", e),
            ConfigError::TomlError(e) => write!(f, "{}", e),
            ConfigError::Other(s) => write!(f, "{}", s),
        }
    }
}

impl std::error::Error for ConfigError {}

impl ConfigError {
    pub fn other(s: &str) -> ConfigError {
        ConfigError::Other(s.to_string())
    }
}

impl From<io::Error> for ConfigError {
    fn from(e: io::Error) -> Self {
        ConfigError::IoError(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::TomlError(e)
    }
}

//------------ LogType -------------------------------------------------------

/// The target to log to.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LogType {
    Stderr,
    File,
    Syslog,
}

impl<'de> Deserialize<'de> for LogType {
    fn deserialize<D>(d: D) -> Result<LogType, D::Error>
    where
        D: Deserializer<'de>,
    {
        let string = String::deserialize(d)?;
        match string.as_str() {
            "stderr" => Ok(LogType::Stderr),
            "file" => Ok(LogType::File),
            "syslog" => Ok(LogType::Syslog),
            _ => Err(de::Error::custom(format!(
                "expected \"stderr\", \"file\" or \"syslog\", found: \"{}\"",
                string
            ))),
        }
    }
}

//------------ Tests ---------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_parse_default_config_file() {
        let config = Config::parse(include_str!("../defaults/scepc.conf")).unwrap();
        config.verify().unwrap();

        assert_eq!(config.enrollment_path, SCEP_DEFAULT_ENROLLMENT_PATH);
        assert_eq!(config.ca_cert_index, 1);
        assert_eq!(config.envelope_cipher, EnvelopeCipher::Aes128);
        assert_eq!(config.log_type, LogType::Stderr);
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.server, "https://localhost");
        assert_eq!(config.timeout_secs, HTTP_CLIENT_TIMEOUT_SECS);
        assert_eq!(config.key_size, 2048);
        assert_eq!(config.bootstrap_validity_days, 1);
        assert!(!config.strict_message_type);
        assert!(config.verify().is_ok());
    }

    #[test]
    fn parse_all_settings() {
        let config = Config::parse(
            r#"
            server = "http://ca.testcorp.com:8080"
            enrollment_path = "cgi-bin/pkiclient.exe"
            timeout_secs = 5
            ca_cert_index = 0
            envelope_cipher = "des3"
            key_size = 3072
            bootstrap_validity_days = 7
            strict_message_type = true
            log_level = "debug"
            log_type = "file"
            log_file = "/tmp/scepc.log"
            syslog_facility = "daemon"
            "#,
        )
        .unwrap();

        assert_eq!(config.server, "http://ca.testcorp.com:8080");
        assert_eq!(config.enrollment_path, "cgi-bin/pkiclient.exe");
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.ca_cert_index, 0);
        assert_eq!(config.envelope_cipher, EnvelopeCipher::Des3);
        assert_eq!(config.key_size, 3072);
        assert_eq!(config.bootstrap_validity_days, 7);
        assert!(config.strict_message_type);
        assert_eq!(config.log_level, LevelFilter::Debug);
        assert_eq!(config.log_type, LogType::File);
        assert_eq!(config.log_file, PathBuf::from("/tmp/scepc.log"));
        assert_eq!(config.syslog_facility, "daemon");
    }

    #[test]
    fn reject_unknown_values() {
        assert!(Config::parse("envelope_cipher = \"rc2\"").is_err());
        assert!(Config::parse("log_type = \"journal\"").is_err());
        assert!(Config::parse("log_level = \"loud\"").is_err());
    }

    #[test]
    fn verify_limits() {
        let config = Config {
            key_size: 1024,
            ..Config::default()
        };
        assert!(config.verify().is_err());

        let config = Config {
            bootstrap_validity_days: 0,
            ..Config::default()
        };
        assert!(config.verify().is_err());

        let config = Config {
            bootstrap_validity_days: BOOTSTRAP_MAX_VALIDITY_DAYS + 1,
            ..Config::default()
        };
        assert!(config.verify().is_err());

        let config = Config {
            timeout_secs: 0,
            ..Config::default()
        };
        assert!(config.verify().is_err());
    }

    #[test]
    fn create_reports_file_problems() {
        let d = tempfile::tempdir().unwrap();
        let missing = d.path().join("missing.conf");
        assert!(Config::create(Some(&missing)).is_err());

        let file = d.path().join("scepc.conf");
        fs::write(&file, "key_size = 4096\n").unwrap();
        let config = Config::create(Some(&file)).unwrap();
        assert_eq!(config.key_size, 4096);

        fs::write(&file, "key_size = 512\n").unwrap();
        assert!(Config::create(Some(&file)).is_err());
    }
}
