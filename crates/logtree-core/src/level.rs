//! Severity levels and compression tags.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ConfigError, ConfigResult};

/// A named severity from the fixed level table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Level {
    Trace,
    Debug,
    #[default]
    Info,
    Success,
    Warning,
    Error,
    Critical,
}

impl Level {
    /// Every level, lowest severity first.
    pub const ALL: [Level; 7] = [
        Level::Trace,
        Level::Debug,
        Level::Info,
        Level::Success,
        Level::Warning,
        Level::Error,
        Level::Critical,
    ];

    /// Canonical upper-case name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Success => "SUCCESS",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        }
    }

    /// Numeric severity.
    pub fn severity(self) -> u8 {
        match self {
            Self::Trace => 5,
            Self::Debug => 10,
            Self::Info => 20,
            Self::Success => 25,
            Self::Warning => 30,
            Self::Error => 40,
            Self::Critical => 50,
        }
    }

    /// Closest `tracing` level. SUCCESS folds into INFO and CRITICAL into ERROR.
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info | Self::Success => tracing::Level::INFO,
            Self::Warning => tracing::Level::WARN,
            Self::Error | Self::Critical => tracing::Level::ERROR,
        }
    }

    /// Comma-separated list of all names, used in error messages.
    pub fn allowed() -> String {
        Self::ALL.map(Level::as_str).join(", ")
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|level| level.as_str() == upper)
            .ok_or_else(|| ConfigError::InvalidLevel {
                level: s.to_string(),
                allowed: Self::allowed(),
            })
    }
}

impl Serialize for Level {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Level {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Validates a case-insensitive level name and returns the canonical level.
pub fn validate_level(level: &str) -> ConfigResult<Level> {
    level.parse()
}

/// Archive format applied to rotated log files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compression {
    Gz,
    Bz2,
    Xz,
    Lzma,
    Tar,
    TarGz,
    TarBz2,
    TarXz,
    Zip,
}

impl Compression {
    pub const ALL: [Compression; 9] = [
        Compression::Gz,
        Compression::Bz2,
        Compression::Xz,
        Compression::Lzma,
        Compression::Tar,
        Compression::TarGz,
        Compression::TarBz2,
        Compression::TarXz,
        Compression::Zip,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gz => "gz",
            Self::Bz2 => "bz2",
            Self::Xz => "xz",
            Self::Lzma => "lzma",
            Self::Tar => "tar",
            Self::TarGz => "tar.gz",
            Self::TarBz2 => "tar.bz2",
            Self::TarXz => "tar.xz",
            Self::Zip => "zip",
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Compression {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Compression {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        validate_compression(&raw).map_err(serde::de::Error::custom)
    }
}

/// Validates a compression tag (leading dot and case are ignored).
pub fn validate_compression(tag: &str) -> ConfigResult<Compression> {
    let normalized = tag.trim().trim_start_matches('.').to_ascii_lowercase();
    Compression::ALL
        .into_iter()
        .find(|c| c.as_str() == normalized)
        .ok_or_else(|| {
            ConfigError::validation(
                "compression",
                format!(
                    "'{tag}' is not supported, expected one of: {}",
                    Compression::ALL.map(Compression::as_str).join(", ")
                ),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_level_canonicalizes() {
        assert_eq!(validate_level("debug").unwrap().as_str(), "DEBUG");
        assert_eq!(validate_level(" Warning ").unwrap(), Level::Warning);
        assert_eq!(validate_level("SUCCESS").unwrap().severity(), 25);
    }

    #[test]
    fn test_validate_level_rejects_unknown() {
        let err = validate_level("bogus").unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("CRITICAL"));
        // `warn` is not an alias for WARNING.
        assert!(validate_level("warn").is_err());
    }

    #[test]
    fn test_severity_order_matches_table() {
        let severities: Vec<u8> = Level::ALL.iter().map(|l| l.severity()).collect();
        assert_eq!(severities, vec![5, 10, 20, 25, 30, 40, 50]);
    }

    #[test]
    fn test_level_serde() {
        let level: Level = serde_json::from_str("\"critical\"").unwrap();
        assert_eq!(level, Level::Critical);
        assert_eq!(serde_json::to_string(&Level::Trace).unwrap(), "\"TRACE\"");
    }

    #[test]
    fn test_validate_compression() {
        assert_eq!(validate_compression("gz").unwrap(), Compression::Gz);
        assert_eq!(validate_compression(".TAR.GZ").unwrap(), Compression::TarGz);
        let err = validate_compression("rar").unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "compression"));
    }
}
