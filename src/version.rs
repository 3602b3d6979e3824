use serde::{Deserialize, Serialize};
use std::fmt;

/// Oldest engine release the installer supports.
pub const MINIMUM_ENGINE_VERSION: &str = "4.3.9.4";

/// A dotted engine release: `major.minor.maintenance.build`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineVersion {
    pub major: u64,
    pub minor: u64,
    pub maintenance: u64,
    pub build: u64,
}

impl fmt::Display for EngineVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.maintenance, self.build
        )
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("failed to parse release {version:?}: segment {segment:?} is not a non-negative integer")]
    InvalidSegment { version: String, segment: String },

    #[error("failed to parse release {version:?}: more than four segments")]
    TooManySegments { version: String },

    #[error("MAJOR version {current} is lower than the required {required}")]
    Major { current: u64, required: u64 },

    #[error("MINOR version {current} is lower than the required {required}")]
    Minor { current: u64, required: u64 },

    #[error("MAINTENANCE version {current} is lower than the required {required}")]
    Maintenance { current: u64, required: u64 },

    #[error("BUILD version {current} is lower than the required {required}")]
    Build { current: u64, required: u64 },
}

/// Parse an engine release such as `4.3.9.4` or `4.3.9.4-el7`.
///
/// Everything from the first `-` is dropped. Missing trailing segments are 0.
pub fn parse_release(version: &str) -> Result<EngineVersion, VersionError> {
    let release = version.split('-').next().unwrap_or_default();

    let segments: Vec<&str> = release.split('.').collect();
    if segments.len() > 4 {
        return Err(VersionError::TooManySegments {
            version: version.to_string(),
        });
    }

    let mut parsed = EngineVersion::default();
    for (position, segment) in segments.iter().enumerate() {
        let value = segment
            .parse::<u64>()
            .map_err(|_| VersionError::InvalidSegment {
                version: version.to_string(),
                segment: segment.to_string(),
            })?;

        match position {
            0 => parsed.major = value,
            1 => parsed.minor = value,
            2 => parsed.maintenance = value,
            _ => parsed.build = value,
        }
    }

    Ok(parsed)
}

/// Check `current` against `required`, one component at a time.
///
/// Components are checked major, minor, maintenance, build; the first one
/// lower than required is reported.
pub fn check_release_support(
    current: &EngineVersion,
    required: &EngineVersion,
) -> Result<(), VersionError> {
    if current.major < required.major {
        return Err(VersionError::Major {
            current: current.major,
            required: required.major,
        });
    }
    if current.minor < required.minor {
        return Err(VersionError::Minor {
            current: current.minor,
            required: required.minor,
        });
    }
    if current.maintenance < required.maintenance {
        return Err(VersionError::Maintenance {
            current: current.maintenance,
            required: required.maintenance,
        });
    }
    if current.build < required.build {
        return Err(VersionError::Build {
            current: current.build,
            required: required.build,
        });
    }

    Ok(())
}
