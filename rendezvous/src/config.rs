//! Key-value configuration file.
//!
//! One `key = value` per line; a line whose first character is `#` is a
//! comment; blank lines are skipped; a value containing commas is a
//! list. A `config_version` key gates files written by older versions
//! of the program, and a missing file is replaced by a freshly written
//! default one rather than treated as an error.

use log::{debug, info};
use rendezvous_core::RendezvousConfig;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Minimum `config_version` this build accepts.
pub const CONFIG_VERSION: f64 = 0.1;

/// Contents written to the configured path when no file exists there.
pub const DEFAULT_CONFIG: &str = "\
# rendezvous configuration file.
# use # to mark comments. Note # has to be first character in line.

config_version = 0.1

maximum_num_of_iterations = 1000
port = 11999
buffer_size = 1024
";

#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading or writing the file failed.
    #[error("can not access file {path} (it might be opened by another application)")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A non-comment line without a `key = value` shape.
    #[error("line {line} is not a `key = value` pair")]
    Malformed { line: usize },

    /// A parameter the run needs is not in the file.
    #[error("parameter `{key}` missing from the configuration")]
    Missing { key: &'static str },

    /// A parameter is present but does not parse as the expected type.
    #[error("parameter `{key}` has invalid value `{value}`")]
    Invalid { key: &'static str, value: String },

    /// A parameter parses but violates its range constraint.
    #[error("parameter `{key}` = {value} is out of range: {constraint}")]
    OutOfRange {
        key: &'static str,
        value: String,
        constraint: &'static str,
    },

    /// The file predates [`CONFIG_VERSION`]. Deleting it and running
    /// again writes a fresh default file at the current version.
    #[error(
        "configuration version ({found}) is older than {expected}; \
         delete the file and run again to regenerate it"
    )]
    Version { found: String, expected: f64 },
}

/// One configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Scalar(String),
    /// A comma separated value, split and trimmed.
    List(Vec<String>),
}

/// A parsed configuration file.
#[derive(Debug)]
pub struct Config {
    values: HashMap<String, Value>,
}

impl Config {
    /// Read `path`, writing [`DEFAULT_CONFIG`] there first when the
    /// file does not exist. The version gate runs before any value is
    /// handed out.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if path.is_file() {
            debug!("configuration file found at {}", path.display());
        } else {
            info!(
                "configuration file {} does not exist, writing the default one",
                path.display()
            );
            fs::write(path, DEFAULT_CONFIG).map_err(|source| ConfigError::Io {
                path: path.to_owned(),
                source,
            })?;
        }

        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        let config = Self::parse(&text)?;
        info!("configuration file {} read", path.display());

        config.check_version()?;
        Ok(config)
    }

    fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut values = HashMap::new();
        for (index, line) in text.lines().enumerate() {
            if line.starts_with('#') || line.trim().is_empty() {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(ConfigError::Malformed { line: index + 1 });
            };
            let key = key.trim().to_owned();
            let value = value.trim();
            let value = if value.contains(',') {
                Value::List(value.split(',').map(|item| item.trim().to_owned()).collect())
            } else {
                Value::Scalar(value.to_owned())
            };
            debug!("config[{key}] = {value:?}");
            values.insert(key, value);
        }
        Ok(Self { values })
    }

    /// Look up `key`. A scalar spelled `none` (any casing) reads as
    /// absent; that is how the file format spells "unset".
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self.values.get(key) {
            Some(Value::Scalar(scalar)) if scalar.eq_ignore_ascii_case("none") => None,
            other => other,
        }
    }

    pub fn get_str(&self, key: &'static str) -> Result<&str, ConfigError> {
        match self.get(key) {
            Some(Value::Scalar(scalar)) => Ok(scalar),
            Some(Value::List(_)) => Err(ConfigError::Invalid {
                key,
                value: "<list>".to_owned(),
            }),
            None => Err(ConfigError::Missing { key }),
        }
    }

    pub fn get_u64(&self, key: &'static str) -> Result<u64, ConfigError> {
        let raw = self.get_str(key)?;
        raw.parse().map_err(|_| ConfigError::Invalid {
            key,
            value: raw.to_owned(),
        })
    }

    pub fn get_f64(&self, key: &'static str) -> Result<f64, ConfigError> {
        let raw = self.get_str(key)?;
        raw.parse().map_err(|_| ConfigError::Invalid {
            key,
            value: raw.to_owned(),
        })
    }

    fn check_version(&self) -> Result<(), ConfigError> {
        match self.get_f64("config_version") {
            Ok(version) if version >= CONFIG_VERSION => Ok(()),
            Ok(version) => Err(ConfigError::Version {
                found: version.to_string(),
                expected: CONFIG_VERSION,
            }),
            Err(_) => Err(ConfigError::Version {
                found: "missing".to_owned(),
                expected: CONFIG_VERSION,
            }),
        }
    }

    /// Resolve the values one run consumes, applying their range
    /// constraints: more than one iteration, a port above the
    /// low reserved range, a buffer bigger than one byte.
    pub fn resolve(&self) -> Result<RendezvousConfig, ConfigError> {
        let max_iterations = self.get_u64("maximum_num_of_iterations")?;
        if max_iterations <= 1 {
            return Err(ConfigError::OutOfRange {
                key: "maximum_num_of_iterations",
                value: max_iterations.to_string(),
                constraint: "must be greater than 1",
            });
        }

        let port = self.get_u64("port")?;
        if port <= 1000 || port > u64::from(u16::MAX) {
            return Err(ConfigError::OutOfRange {
                key: "port",
                value: port.to_string(),
                constraint: "must be greater than 1000 and fit a UDP port",
            });
        }

        let buffer_size = self.get_u64("buffer_size")?;
        if buffer_size <= 1 {
            return Err(ConfigError::OutOfRange {
                key: "buffer_size",
                value: buffer_size.to_string(),
                constraint: "must be greater than 1",
            });
        }
        let buffer_size = usize::try_from(buffer_size).map_err(|_| ConfigError::OutOfRange {
            key: "buffer_size",
            value: buffer_size.to_string(),
            constraint: "does not fit this platform",
        })?;

        Ok(RendezvousConfig {
            port: port as u16,
            buffer_size,
            max_iterations,
            ..RendezvousConfig::default()
        })
    }
}
