//! Version ranges in interval notation.
//!
//! | Notation     | Meaning          |
//! |--------------|------------------|
//! | `1.0`        | `1.0 <= x`       |
//! | `[1.0]`      | `x == 1.0`       |
//! | `(1.0,)`     | `1.0 < x`        |
//! | `(,1.0]`     | `x <= 1.0`       |
//! | `[1.0,2.0)`  | `1.0 <= x < 2.0` |

use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::{PackageVersion, VersionParseError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionRangeParseError {
    #[error("Version range is empty")]
    Empty,

    #[error("Invalid version range '{0}': unbalanced brackets")]
    Brackets(String),

    #[error("Invalid version range '{0}': expected at most two bounds")]
    TooManyBounds(String),

    #[error("Invalid version range '{0}': no bounds given")]
    Unbounded(String),

    #[error("Invalid version range '{0}': lower bound is greater than upper bound")]
    Inverted(String),

    #[error(transparent)]
    Version(#[from] VersionParseError),
}

/// Lower and upper version bounds with independent inclusivity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    min: Option<PackageVersion>,
    include_min: bool,
    max: Option<PackageVersion>,
    include_max: bool,
}

impl VersionRange {
    pub fn new(
        min: Option<PackageVersion>,
        include_min: bool,
        max: Option<PackageVersion>,
        include_max: bool,
    ) -> Self {
        Self {
            min,
            include_min,
            max,
            include_max,
        }
    }

    /// A range matching exactly one version.
    pub fn exact(version: PackageVersion) -> Self {
        Self::new(Some(version.clone()), true, Some(version), true)
    }

    /// A range matching `version` and anything above it.
    pub fn at_least(version: PackageVersion) -> Self {
        Self::new(Some(version), true, None, false)
    }

    pub fn min(&self) -> Option<&PackageVersion> {
        self.min.as_ref()
    }

    pub fn max(&self) -> Option<&PackageVersion> {
        self.max.as_ref()
    }

    pub fn is_min_inclusive(&self) -> bool {
        self.include_min
    }

    pub fn is_max_inclusive(&self) -> bool {
        self.include_max
    }

    /// Returns true if `version` lies within both bounds.
    pub fn satisfies(&self, version: &PackageVersion) -> bool {
        let above_min = match &self.min {
            Some(min) if self.include_min => version >= min,
            Some(min) => version > min,
            None => true,
        };
        let below_max = match &self.max {
            Some(max) if self.include_max => version <= max,
            Some(max) => version < max,
            None => true,
        };
        above_min && below_max
    }

    /// Parses interval notation. A bare version is a minimum-inclusive range.
    pub fn parse(input: &str) -> Result<Self, VersionRangeParseError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(VersionRangeParseError::Empty);
        }

        let first = s.as_bytes()[0];
        if first != b'[' && first != b'(' {
            return Ok(Self::at_least(PackageVersion::parse(s)?));
        }

        let last = s.as_bytes()[s.len() - 1];
        if s.len() < 2 || (last != b']' && last != b')') {
            return Err(VersionRangeParseError::Brackets(input.to_string()));
        }

        let include_min = first == b'[';
        let include_max = last == b']';
        let inner = &s[1..s.len() - 1];
        let bounds: Vec<&str> = inner.split(',').map(str::trim).collect();

        let parse_bound = |text: &str| -> Result<Option<PackageVersion>, VersionRangeParseError> {
            if text.is_empty() {
                Ok(None)
            } else {
                Ok(Some(PackageVersion::parse(text)?))
            }
        };

        let range = match bounds.as_slice() {
            [single] => {
                // "[1.0]" is the only legal single-bound form.
                if !(include_min && include_max) || single.is_empty() {
                    return Err(VersionRangeParseError::Brackets(input.to_string()));
                }
                Self::exact(PackageVersion::parse(single)?)
            }
            [lower, upper] => {
                let min = parse_bound(lower)?;
                let max = parse_bound(upper)?;
                if min.is_none() && max.is_none() {
                    return Err(VersionRangeParseError::Unbounded(input.to_string()));
                }
                Self::new(min, include_min, max, include_max)
            }
            _ => return Err(VersionRangeParseError::TooManyBounds(input.to_string())),
        };

        if let (Some(min), Some(max)) = (&range.min, &range.max) {
            let empty = min > max || (min == max && !(range.include_min && range.include_max));
            if empty {
                return Err(VersionRangeParseError::Inverted(input.to_string()));
            }
        }

        Ok(range)
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let (Some(min), Some(max)) = (&self.min, &self.max) {
            if min == max && self.include_min && self.include_max {
                return write!(f, "[{}]", min);
            }
        }

        let open = if self.include_min { '[' } else { '(' };
        let close = if self.include_max { ']' } else { ')' };
        let min = self.min.as_ref().map(ToString::to_string).unwrap_or_default();
        let max = self.max.as_ref().map(ToString::to_string).unwrap_or_default();
        write!(f, "{}{}, {}{}", open, min, max, close)
    }
}

impl FromStr for VersionRange {
    type Err = VersionRangeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for VersionRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
