//! # Spanner Specifiers
//!
//! A [`Specifier`] describes what one piece of a piecewise distribution
//! attaches: an optional plain indicator, a spanner start, a spanner stop
//! and a *bookended* start variant carrying a right-side label.
//!
//! ## Slot rules
//! ```text
//! Family    indicator              spanner_start / bookended   spanner_stop
//! Hairpin   Dynamic | StopHairpin  StartHairpin                StopHairpin
//! TextSpan  (none)                 StartTextSpan               StopTextSpan
//! Trill     (none)                 StartTrillSpan              StopTrillSpan
//! ```
//!
//! Every setter validates its slot, so a constructed specifier is always
//! well formed. Specifiers are values: the `without_*` methods return
//! modified copies.

use crate::error::SostenutoError;
use crate::indicators::Indicator;
use std::fmt;

/// The spanner family a specifier belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpannerFamily {
    Hairpin,
    TextSpan,
    Trill,
}

impl fmt::Display for SpannerFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpannerFamily::Hairpin => f.write_str("hairpin"),
            SpannerFamily::TextSpan => f.write_str("text span"),
            SpannerFamily::Trill => f.write_str("trill"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Indicator,
    Start,
    Stop,
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Indicator => f.write_str("indicator"),
            Slot::Start => f.write_str("spanner start"),
            Slot::Stop => f.write_str("spanner stop"),
        }
    }
}

impl SpannerFamily {
    fn accepts(&self, slot: Slot, indicator: &Indicator) -> bool {
        use Indicator::*;
        match (self, slot) {
            (SpannerFamily::Hairpin, Slot::Indicator) => {
                matches!(indicator, Dynamic(_) | StopHairpin(_))
            }
            (SpannerFamily::Hairpin, Slot::Start) => matches!(indicator, StartHairpin(_)),
            (SpannerFamily::Hairpin, Slot::Stop) => matches!(indicator, StopHairpin(_)),
            (SpannerFamily::TextSpan, Slot::Start) => matches!(indicator, StartTextSpan(_)),
            (SpannerFamily::TextSpan, Slot::Stop) => matches!(indicator, StopTextSpan(_)),
            (SpannerFamily::Trill, Slot::Start) => matches!(indicator, StartTrillSpan(_)),
            (SpannerFamily::Trill, Slot::Stop) => matches!(indicator, StopTrillSpan(_)),
            (_, Slot::Indicator) => false,
        }
    }

    fn check(&self, slot: Slot, indicator: &Indicator) -> Result<(), SostenutoError> {
        if self.accepts(slot, indicator) {
            Ok(())
        } else {
            Err(SostenutoError::SpecifierError(format!(
                "{} specifier cannot hold {} as its {}",
                self,
                indicator.type_name(),
                slot
            )))
        }
    }
}

/// One piece's worth of spanner indicators.
#[derive(Debug, Clone, PartialEq)]
pub struct Specifier {
    family: SpannerFamily,
    indicator: Option<Indicator>,
    spanner_start: Option<Indicator>,
    spanner_stop: Option<Indicator>,
    bookended_spanner_start: Option<Indicator>,
}

impl Specifier {
    /// An empty specifier of `family`.
    pub fn new(family: SpannerFamily) -> Self {
        Self {
            family,
            indicator: None,
            spanner_start: None,
            spanner_stop: None,
            bookended_spanner_start: None,
        }
    }

    pub fn with_indicator(mut self, indicator: Indicator) -> Result<Self, SostenutoError> {
        self.family.check(Slot::Indicator, &indicator)?;
        self.indicator = Some(indicator);
        Ok(self)
    }

    pub fn with_spanner_start(mut self, start: Indicator) -> Result<Self, SostenutoError> {
        self.family.check(Slot::Start, &start)?;
        self.spanner_start = Some(start);
        Ok(self)
    }

    pub fn with_spanner_stop(mut self, stop: Indicator) -> Result<Self, SostenutoError> {
        self.family.check(Slot::Stop, &stop)?;
        self.spanner_stop = Some(stop);
        Ok(self)
    }

    pub fn with_bookended_spanner_start(
        mut self,
        start: Indicator,
    ) -> Result<Self, SostenutoError> {
        self.family.check(Slot::Start, &start)?;
        self.bookended_spanner_start = Some(start);
        Ok(self)
    }

    pub fn family(&self) -> SpannerFamily {
        self.family
    }

    pub fn indicator(&self) -> Option<&Indicator> {
        self.indicator.as_ref()
    }

    pub fn spanner_start(&self) -> Option<&Indicator> {
        self.spanner_start.as_ref()
    }

    pub fn spanner_stop(&self) -> Option<&Indicator> {
        self.spanner_stop.as_ref()
    }

    pub fn bookended_spanner_start(&self) -> Option<&Indicator> {
        self.bookended_spanner_start.as_ref()
    }

    /// Both a plain indicator and a spanner start.
    pub fn is_compound(&self) -> bool {
        self.indicator.is_some() && self.spanner_start.is_some()
    }

    pub fn starts_text_span(&self) -> bool {
        self.spanner_start
            .as_ref()
            .map_or(false, Indicator::is_start_text_span)
    }

    pub fn without_spanner_start(&self) -> Self {
        Self {
            spanner_start: None,
            ..self.clone()
        }
    }

    pub fn without_spanner_stop(&self) -> Self {
        Self {
            spanner_stop: None,
            ..self.clone()
        }
    }

    /// Copy with the bookended start promoted to the spanner start.
    ///
    /// The plain start is dropped when no bookended start is defined.
    pub fn with_bookended_start_promoted(&self) -> Self {
        Self {
            spanner_start: self.bookended_spanner_start.clone(),
            ..self.clone()
        }
    }

    /// Indicators in attachment order: stop, indicator, start.
    pub fn indicators(&self) -> Vec<&Indicator> {
        [&self.spanner_stop, &self.indicator, &self.spanner_start]
            .into_iter()
            .flatten()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.indicators().is_empty()
    }
}
