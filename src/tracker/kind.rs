use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Supported single-object tracker algorithms.
///
/// The set is closed: names are resolved once, at configuration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TrackerKind {
    /// Discriminative correlation filter with channel and spatial reliability
    #[default]
    Csrt,
    /// Kernelized correlation filter
    Kcf,
    /// Online AdaBoost
    Boosting,
    /// Multiple instance learning
    Mil,
    /// Tracking, learning and detection
    Tld,
    /// Forward-backward median flow
    MedianFlow,
    /// Minimum output sum of squared error filter
    Mosse,
}

impl TrackerKind {
    pub const ALL: [TrackerKind; 7] = [
        TrackerKind::Csrt,
        TrackerKind::Kcf,
        TrackerKind::Boosting,
        TrackerKind::Mil,
        TrackerKind::Tld,
        TrackerKind::MedianFlow,
        TrackerKind::Mosse,
    ];

    /// Canonical lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            TrackerKind::Csrt => "csrt",
            TrackerKind::Kcf => "kcf",
            TrackerKind::Boosting => "boosting",
            TrackerKind::Mil => "mil",
            TrackerKind::Tld => "tld",
            TrackerKind::MedianFlow => "medianflow",
            TrackerKind::Mosse => "mosse",
        }
    }
}

impl fmt::Display for TrackerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TrackerKind {
    type Err = Error;

    /// Case-sensitive. `"CSRT"` is the only upper-case spelling accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "csrt" | "CSRT" => Ok(TrackerKind::Csrt),
            "kcf" => Ok(TrackerKind::Kcf),
            "boosting" => Ok(TrackerKind::Boosting),
            "mil" => Ok(TrackerKind::Mil),
            "tld" => Ok(TrackerKind::Tld),
            "medianflow" => Ok(TrackerKind::MedianFlow),
            "mosse" => Ok(TrackerKind::Mosse),
            other => Err(Error::UnsupportedTrackerKind(other.to_string())),
        }
    }
}
