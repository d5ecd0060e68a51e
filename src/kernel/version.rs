//! Kernel version parsing and ordering.
//!
//! Handles the version formats seen in kernel banners and release tags:
//! - "2.6.32.68" → release (2, 6, 32, 68)
//! - "3.14" → release (3, 14)
//! - "4.14-rc2" / "v4.14rc2" → release (4, 14), pre-release rc2
//!
//! Missing trailing components compare as zero, so `3.0 == 3.0.0`.
//! A pre-release sorts before its base release: `4.14-rc2 < 4.14`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a version string cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseVersionError {
    #[error("empty version string")]
    Empty,

    #[error("invalid release component '{component}' in '{version}'")]
    InvalidComponent { version: String, component: String },

    #[error("unrecognized version suffix '{suffix}' in '{version}'")]
    InvalidSuffix { version: String, suffix: String },
}

/// Pre-release marker. Variant order is the precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PreRelease {
    Alpha(u32),
    Beta(u32),
    Rc(u32),
}

/// A parsed kernel version, immutable once constructed
#[derive(Debug, Clone)]
pub struct KernelVersion {
    raw: String,
    release: Vec<u32>,
    pre: Option<PreRelease>,
}

impl KernelVersion {
    /// Parse a version string such as "4.14-rc2"
    pub fn parse(input: &str) -> Result<Self, ParseVersionError> {
        let raw = input.trim();
        let body = raw.strip_prefix('v').unwrap_or(raw);
        if body.is_empty() {
            return Err(ParseVersionError::Empty);
        }

        let split = body
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .unwrap_or(body.len());
        let (release_part, suffix) = body.split_at(split);

        let release = release_part
            .split('.')
            .map(|component| {
                component
                    .parse::<u32>()
                    .map_err(|_| ParseVersionError::InvalidComponent {
                        version: raw.to_string(),
                        component: component.to_string(),
                    })
            })
            .collect::<Result<Vec<u32>, _>>()?;

        let pre = parse_pre_release(raw, suffix)?;

        Ok(KernelVersion {
            raw: raw.to_string(),
            release,
            pre,
        })
    }

    /// The version exactly as it was written (used for tree directory names)
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Numeric release components
    pub fn release(&self) -> &[u32] {
        &self.release
    }

    /// Pre-release marker, if any
    pub fn pre_release(&self) -> Option<PreRelease> {
        self.pre
    }

    fn significant_release(&self) -> &[u32] {
        let end = self
            .release
            .iter()
            .rposition(|&component| component != 0)
            .map_or(0, |idx| idx + 1);
        &self.release[..end]
    }
}

fn parse_pre_release(raw: &str, suffix: &str) -> Result<Option<PreRelease>, ParseVersionError> {
    let suffix = suffix.trim_start_matches(['-', '.', '_']);
    if suffix.is_empty() {
        return Ok(None);
    }

    let invalid = || ParseVersionError::InvalidSuffix {
        version: raw.to_string(),
        suffix: suffix.to_string(),
    };

    let lower = suffix.to_ascii_lowercase();
    let (kind, number): (fn(u32) -> PreRelease, &str) = if let Some(n) = lower.strip_prefix("rc") {
        (PreRelease::Rc, n)
    } else if let Some(n) = lower.strip_prefix("alpha") {
        (PreRelease::Alpha, n)
    } else if let Some(n) = lower.strip_prefix("beta") {
        (PreRelease::Beta, n)
    } else {
        return Err(invalid());
    };

    let number = if number.is_empty() {
        0
    } else {
        number.parse::<u32>().map_err(|_| invalid())?
    };
    Ok(Some(kind(number)))
}

impl Ord for KernelVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.significant_release()
            .cmp(other.significant_release())
            .then_with(|| match (self.pre, other.pre) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(&b),
            })
    }
}

impl PartialOrd for KernelVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for KernelVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for KernelVersion {}

impl FromStr for KernelVersion {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KernelVersion::parse(s)
    }
}

impl fmt::Display for KernelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
