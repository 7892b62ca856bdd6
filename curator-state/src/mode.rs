//! Display modes.

use curator_core::Error;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Governs which regions are drawn into the label images and which layers
/// are visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Mode {
    /// Manual curation over every region.
    #[default]
    All,
    /// Only the selected regions are drawn.
    Focus,
    /// Labels hidden; SNR heat-mask shown.
    SnrThreshold,
}

impl Mode {
    /// All modes, in control-panel order.
    pub const ALL: [Mode; 3] = [Mode::All, Mode::Focus, Mode::SnrThreshold];

    /// Whether label images are restricted to the selection.
    #[must_use]
    pub fn restricts_to_selection(self) -> bool {
        self == Mode::Focus
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::All => write!(f, "all"),
            Mode::Focus => write!(f, "focus"),
            Mode::SnrThreshold => write!(f, "snr"),
        }
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" | "manual" => Ok(Mode::All),
            "focus" => Ok(Mode::Focus),
            "snr" | "snr_threshold" | "snr threshold" => Ok(Mode::SnrThreshold),
            _ => Err(Error::InvalidMode(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_button_names() {
        assert_eq!("manual".parse::<Mode>().unwrap(), Mode::All);
        assert_eq!("Focus".parse::<Mode>().unwrap(), Mode::Focus);
        assert_eq!("snr threshold".parse::<Mode>().unwrap(), Mode::SnrThreshold);
        assert_eq!(
            "zoom".parse::<Mode>().unwrap_err(),
            Error::InvalidMode("zoom".to_string())
        );
    }

    #[test]
    fn test_display_roundtrips() {
        for mode in Mode::ALL {
            assert_eq!(mode.to_string().parse::<Mode>().unwrap(), mode);
        }
    }
}
