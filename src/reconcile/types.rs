//! Classification type definitions

use crate::indicators::{Indicator, IndicatorKind};

/// How a persistent indicator relates to what was already in effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorStatus {
    /// Supplied by score-template configuration.
    Default,
    /// Newly specified and different from what was in effect.
    Explicit,
    /// Carried forward from the previous segment with no explicit signal.
    Reapplied,
    /// Specified, but equal to what was already in effect.
    Redundant,
}

impl IndicatorStatus {
    pub fn name(&self) -> &'static str {
        match self {
            IndicatorStatus::Default => "DEFAULT",
            IndicatorStatus::Explicit => "EXPLICIT",
            IndicatorStatus::Reapplied => "REAPPLIED",
            IndicatorStatus::Redundant => "REDUNDANT",
        }
    }

    /// `EXPLICIT_CLEF`, `REAPPLIED_DYNAMIC`, ...
    pub fn tag_word(&self, kind: IndicatorKind) -> String {
        format!("{}_{}", self.name(), kind.stem())
    }

    pub fn color(&self) -> &'static str {
        match self {
            IndicatorStatus::Default => "DarkViolet",
            IndicatorStatus::Explicit => "blue",
            IndicatorStatus::Reapplied => "green4",
            IndicatorStatus::Redundant => "DeepPink1",
        }
    }
}

/// Result of classifying one attachment.
///
/// For `Reapplied` and `Default` the indicator is synthesized from the
/// momento or the template; otherwise it is the explicit indicator.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub status: IndicatorStatus,
    pub indicator: Indicator,
}
