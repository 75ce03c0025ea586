//! # Indicator Types
//!
//! This module defines every indicator the engines attach to leaves.
//!
//! ## Type Hierarchy
//! ```text
//! Indicator (enum)
//!   ├── Persistent (tracked across segments)
//!   │     ├── Clef             → IndicatorKind::Clef
//!   │     ├── Dynamic          → IndicatorKind::Dynamic
//!   │     ├── Instrument       → IndicatorKind::Instrument
//!   │     ├── MarginMarkup     → IndicatorKind::MarginMarkup
//!   │     ├── MetronomeMark    ┐
//!   │     ├── Accelerando      ├ IndicatorKind::MetronomeMark (tempo family)
//!   │     ├── Ritardando       ┘
//!   │     ├── StaffLines       → IndicatorKind::StaffLines
//!   │     └── PersistentOverride → IndicatorKind::PersistentOverride
//!   └── Spanner events
//!         ├── StartHairpin / StopHairpin
//!         ├── StartTextSpan / StopTextSpan
//!         └── StartTrillSpan / StopTrillSpan
//! ```
//!
//! ## Key Concepts
//!
//! ### Kinds
//! [`IndicatorKind`] is the closed set of persistent indicator families.
//! [`Indicator::kind()`] is the single grouping function: the three tempo
//! indicators share one kind, and every instrument type shares one kind, so
//! a metronome mark followed by an accelerando is compared as one family.
//!
//! ### Persistent values
//! Classification compares indicators by [`Indicator::persistent_value()`],
//! a canonical string that ignores tweaks and presentation flags. The same
//! string is what a [`Momento`](crate::metadata::Momento) stores.
//!
//! ### Trends
//! Spanner starts are *trends*: on a leaf that already received a bookend,
//! only trend indicators are attached again.

use crate::score::ContextLevel;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Persistent indicator family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorKind {
    Clef,
    Dynamic,
    Instrument,
    MarginMarkup,
    /// Metronome marks, accelerando and ritardando.
    MetronomeMark,
    PersistentOverride,
    StaffLines,
}

impl IndicatorKind {
    pub const ALL: [IndicatorKind; 7] = [
        IndicatorKind::Clef,
        IndicatorKind::Dynamic,
        IndicatorKind::Instrument,
        IndicatorKind::MarginMarkup,
        IndicatorKind::MetronomeMark,
        IndicatorKind::PersistentOverride,
        IndicatorKind::StaffLines,
    ];

    /// Upper-case stem used in status tags (`EXPLICIT_CLEF`, ...).
    pub fn stem(&self) -> &'static str {
        match self {
            IndicatorKind::Clef => "CLEF",
            IndicatorKind::Dynamic => "DYNAMIC",
            IndicatorKind::Instrument => "INSTRUMENT",
            IndicatorKind::MarginMarkup => "MARGIN_MARKUP",
            IndicatorKind::MetronomeMark => "METRONOME_MARK",
            IndicatorKind::PersistentOverride => "PERSISTENT_OVERRIDE",
            IndicatorKind::StaffLines => "STAFF_LINES",
        }
    }

    /// The context level that owns indicators of this kind.
    pub fn level(&self) -> ContextLevel {
        match self {
            IndicatorKind::Dynamic => ContextLevel::Voice,
            IndicatorKind::MetronomeMark => ContextLevel::Score,
            IndicatorKind::Clef
            | IndicatorKind::Instrument
            | IndicatorKind::MarginMarkup
            | IndicatorKind::PersistentOverride
            | IndicatorKind::StaffLines => ContextLevel::Staff,
        }
    }

    /// Parse a configuration key such as `clef` or `metronome_mark`.
    pub fn from_key(key: &str) -> Option<Self> {
        match key.trim() {
            "clef" => Some(IndicatorKind::Clef),
            "dynamic" => Some(IndicatorKind::Dynamic),
            "instrument" => Some(IndicatorKind::Instrument),
            "margin_markup" => Some(IndicatorKind::MarginMarkup),
            "metronome_mark" => Some(IndicatorKind::MetronomeMark),
            "persistent_override" => Some(IndicatorKind::PersistentOverride),
            "staff_lines" => Some(IndicatorKind::StaffLines),
            _ => None,
        }
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.stem())
    }
}

/// A LilyPond `\tweak` carried by an indicator.
#[derive(Debug, Clone, PartialEq)]
pub struct Tweak {
    pub attribute: String,
    pub value: String,
}

impl Tweak {
    pub fn new(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Tweak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "- \\tweak {} {}", self.attribute, self.value)
    }
}

/// Markup used for text-spanner labels and margin markup.
#[derive(Debug, Clone, PartialEq)]
pub enum Markup {
    /// Upright literal text.
    Text(String),
    /// Reference to a predefined markup (`\harmonics-markup`).
    Reference(String),
    Boxed(Box<Markup>),
    Concat(Vec<Markup>),
    Hspace(f64),
    DrawLine { x: f64, y: f64 },
}

impl Markup {
    /// Build a label from a descriptor word: `\name` is a reference, anything
    /// else is upright text.
    pub fn label(word: &str) -> Self {
        match word.strip_prefix('\\') {
            Some(name) => Markup::Reference(name.to_string()),
            None => Markup::Text(word.to_string()),
        }
    }

    pub fn boxed(self) -> Self {
        Markup::Boxed(Box::new(self))
    }
}

impl fmt::Display for Markup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Markup::Text(text) => write!(f, "\\upright {:?}", text),
            Markup::Reference(name) => write!(f, "\\{}", name),
            Markup::Boxed(inner) => write!(f, "\\box {}", inner),
            Markup::Concat(items) => {
                f.write_str("\\concat {")?;
                for item in items {
                    write!(f, " {}", item)?;
                }
                f.write_str(" }")
            }
            Markup::Hspace(amount) => write!(f, "\\hspace #{}", amount),
            Markup::DrawLine { x, y } => write!(f, "\\draw-line #'({} . {})", x, y),
        }
    }
}

const DYNAMIC_NAMES: &[&str] = &[
    "niente", "ppppp", "pppp", "ppp", "pp", "p", "mp", "mf", "f", "ff", "fff", "ffff", "fffff",
    "fp", "sf", "sff", "sfp", "sfpp", "sffp", "sffz", "sfz", "rfz", "rf", "fz",
];

const SFORZANDO_NAMES: &[&str] = &[
    "fp", "sf", "sff", "sfp", "sfpp", "sffp", "sffz", "sfz", "rfz", "rf", "fz",
];

/// Dynamic mark such as `p` or `sfz`, or a textual dynamic such as
/// `\appena-udibile` or `sub.p`.
#[derive(Debug, Clone, PartialEq)]
pub struct Dynamic {
    /// The dynamic as written; also its persistent value.
    pub name: String,
    /// Set for textual dynamics.
    pub markup: Option<Markup>,
    pub hide: bool,
    pub leak: bool,
    pub tweaks: Vec<Tweak>,
}

impl Dynamic {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            markup: None,
            hide: false,
            leak: false,
            tweaks: Vec::new(),
        }
    }

    /// Parse a known dynamic name.
    pub fn parse(name: &str) -> Option<Self> {
        if DYNAMIC_NAMES.contains(&name) {
            Some(Self::new(name))
        } else {
            None
        }
    }

    /// Textual dynamic: `\name` references predefined markup, any other
    /// word is upright text.
    pub fn textual(word: &str) -> Self {
        Self {
            markup: Some(Markup::label(word)),
            ..Self::new(word)
        }
    }

    /// A known dynamic name, else a textual dynamic. `None` for empty or
    /// multi-word input.
    pub fn from_token(token: &str) -> Option<Self> {
        if token.is_empty() || token.contains(char::is_whitespace) {
            return None;
        }
        Some(Self::parse(token).unwrap_or_else(|| Self::textual(token)))
    }

    pub fn is_textual(&self) -> bool {
        self.markup.is_some()
    }

    /// Sforzando dynamics are accents, not levels; they are never redundant.
    pub fn is_sforzando(&self) -> bool {
        SFORZANDO_NAMES.contains(&self.name.as_str())
    }
}

/// Hairpin shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HairpinShape {
    Crescendo,
    CrescendoFromNiente,
    CrescendoToBarLine,
    CrescendoFromNienteToBarLine,
    Decrescendo,
    DecrescendoToNiente,
    DecrescendoToBarLine,
    DecrescendoToBarLineToNiente,
    Constante,
}

impl HairpinShape {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "<" => Some(HairpinShape::Crescendo),
            "o<" => Some(HairpinShape::CrescendoFromNiente),
            "<|" => Some(HairpinShape::CrescendoToBarLine),
            "o<|" => Some(HairpinShape::CrescendoFromNienteToBarLine),
            ">" => Some(HairpinShape::Decrescendo),
            ">o" => Some(HairpinShape::DecrescendoToNiente),
            "|>" => Some(HairpinShape::DecrescendoToBarLine),
            "|>o" => Some(HairpinShape::DecrescendoToBarLineToNiente),
            "--" => Some(HairpinShape::Constante),
            _ => None,
        }
    }

    pub fn token(&self) -> &'static str {
        match self {
            HairpinShape::Crescendo => "<",
            HairpinShape::CrescendoFromNiente => "o<",
            HairpinShape::CrescendoToBarLine => "<|",
            HairpinShape::CrescendoFromNienteToBarLine => "o<|",
            HairpinShape::Decrescendo => ">",
            HairpinShape::DecrescendoToNiente => ">o",
            HairpinShape::DecrescendoToBarLine => "|>",
            HairpinShape::DecrescendoToBarLineToNiente => "|>o",
            HairpinShape::Constante => "--",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StartHairpin {
    pub shape: HairpinShape,
    pub tweaks: Vec<Tweak>,
}

impl StartHairpin {
    pub fn new(shape: HairpinShape) -> Self {
        Self {
            shape,
            tweaks: Vec::new(),
        }
    }
}

/// Line styles available to text spanners, keyed by descriptor shape token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSpanStyle {
    DashedLineWithArrow,
    DashedLineWithHook,
    InvisibleLine,
    SolidLineWithArrow,
    SolidLineWithHook,
}

impl TextSpanStyle {
    /// `=>`, `=|`, `||`, `->`, `-|`
    pub fn from_shape(token: &str) -> Option<Self> {
        match token {
            "=>" => Some(TextSpanStyle::DashedLineWithArrow),
            "=|" => Some(TextSpanStyle::DashedLineWithHook),
            "||" => Some(TextSpanStyle::InvisibleLine),
            "->" => Some(TextSpanStyle::SolidLineWithArrow),
            "-|" => Some(TextSpanStyle::SolidLineWithHook),
            _ => None,
        }
    }

    pub fn is_hook(&self) -> bool {
        matches!(
            self,
            TextSpanStyle::DashedLineWithHook | TextSpanStyle::SolidLineWithHook
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            TextSpanStyle::DashedLineWithArrow => "dashed-line-with-arrow",
            TextSpanStyle::DashedLineWithHook => "dashed-line-with-hook",
            TextSpanStyle::InvisibleLine => "invisible-line",
            TextSpanStyle::SolidLineWithArrow => "solid-line-with-arrow",
            TextSpanStyle::SolidLineWithHook => "solid-line-with-hook",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StartTextSpan {
    pub command: String,
    pub left_text: Option<Markup>,
    pub right_text: Option<Markup>,
    pub style: TextSpanStyle,
    pub tweaks: Vec<Tweak>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StopTextSpan {
    pub command: String,
    pub leak: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StartTrillSpan {
    /// Auxiliary pitch for pitched trills.
    pub pitch: Option<String>,
    pub tweaks: Vec<Tweak>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StopTrillSpan {
    pub leak: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StopHairpin {
    pub leak: bool,
}

const CLEF_NAMES: &[&str] = &[
    "treble", "bass", "alto", "tenor", "percussion", "soprano", "mezzosoprano", "baritone",
    "varbaritone", "french", "tab", "treble^8", "treble_8", "bass_8", "bass^8",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clef {
    pub name: String,
}

impl Clef {
    pub fn parse(name: &str) -> Option<Self> {
        if CLEF_NAMES.contains(&name) {
            Some(Self {
                name: name.to_string(),
            })
        } else {
            None
        }
    }
}

/// Concrete instrument types. All of them belong to one indicator kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentType {
    Violin,
    Viola,
    Cello,
    Contrabass,
    Flute,
    Oboe,
    Clarinet,
    Bassoon,
    Horn,
    Trumpet,
    Trombone,
    Tuba,
    Piano,
    Harp,
    Percussion,
    Voice,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub name: String,
    #[serde(default)]
    pub short_name: Option<String>,
    #[serde(rename = "type", default = "default_instrument_type")]
    pub instrument_type: InstrumentType,
}

fn default_instrument_type() -> InstrumentType {
    InstrumentType::Other
}

/// Staff-margin instrument label, identified by its manifest key.
#[derive(Debug, Clone, PartialEq)]
pub struct MarginMarkup {
    pub key: String,
    pub markup: Markup,
}

/// Metronome mark such as `4=60`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetronomeMark {
    /// LilyPond duration of the beat unit: `4`, `8.`, ...
    pub reference: String,
    pub units_per_minute: u32,
}

impl MetronomeMark {
    pub fn new(reference: impl Into<String>, units_per_minute: u32) -> Self {
        Self {
            reference: reference.into(),
            units_per_minute,
        }
    }

    /// Parse `reference=units`, e.g. `4=60` or `8.=72`.
    pub fn parse(s: &str) -> Option<Self> {
        let (reference, units) = s.trim().split_once('=')?;
        let reference = reference.trim();
        let valid_reference = !reference.is_empty()
            && reference
                .trim_end_matches('.')
                .chars()
                .all(|c| c.is_ascii_digit());
        if !valid_reference {
            return None;
        }
        let units_per_minute = units.trim().parse().ok()?;
        Some(Self::new(reference, units_per_minute))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaffLines {
    pub line_count: u8,
}

/// A `\override` that stays in effect until countermanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistentOverride {
    pub grob: String,
    pub attribute: String,
    pub value: String,
}

impl PersistentOverride {
    /// Parse `Grob.attribute=value`.
    pub fn parse(s: &str) -> Option<Self> {
        let (path, value) = s.split_once('=')?;
        let (grob, attribute) = path.trim().split_once('.')?;
        if grob.is_empty() || attribute.is_empty() {
            return None;
        }
        Some(Self {
            grob: grob.to_string(),
            attribute: attribute.to_string(),
            value: value.trim().to_string(),
        })
    }
}

/// Everything that can be attached to a leaf.
#[derive(Debug, Clone, PartialEq)]
pub enum Indicator {
    Dynamic(Dynamic),
    StartHairpin(StartHairpin),
    StopHairpin(StopHairpin),
    StartTextSpan(StartTextSpan),
    StopTextSpan(StopTextSpan),
    StartTrillSpan(StartTrillSpan),
    StopTrillSpan(StopTrillSpan),
    Clef(Clef),
    Instrument(Instrument),
    MarginMarkup(MarginMarkup),
    MetronomeMark(MetronomeMark),
    Accelerando,
    Ritardando,
    StaffLines(StaffLines),
    PersistentOverride(PersistentOverride),
}

impl Indicator {
    /// Persistent kind of this indicator, grouping tempo and instrument families.
    pub fn kind(&self) -> Option<IndicatorKind> {
        match self {
            Indicator::Clef(_) => Some(IndicatorKind::Clef),
            Indicator::Dynamic(_) => Some(IndicatorKind::Dynamic),
            Indicator::Instrument(_) => Some(IndicatorKind::Instrument),
            Indicator::MarginMarkup(_) => Some(IndicatorKind::MarginMarkup),
            Indicator::MetronomeMark(_) | Indicator::Accelerando | Indicator::Ritardando => {
                Some(IndicatorKind::MetronomeMark)
            }
            Indicator::StaffLines(_) => Some(IndicatorKind::StaffLines),
            Indicator::PersistentOverride(_) => Some(IndicatorKind::PersistentOverride),
            Indicator::StartHairpin(_)
            | Indicator::StopHairpin(_)
            | Indicator::StartTextSpan(_)
            | Indicator::StopTextSpan(_)
            | Indicator::StartTrillSpan(_)
            | Indicator::StopTrillSpan(_) => None,
        }
    }

    pub fn is_persistent(&self) -> bool {
        self.kind().is_some()
    }

    /// Spanner starts.
    pub fn is_trend(&self) -> bool {
        matches!(
            self,
            Indicator::StartHairpin(_) | Indicator::StartTextSpan(_) | Indicator::StartTrillSpan(_)
        )
    }

    pub fn is_start_text_span(&self) -> bool {
        matches!(self, Indicator::StartTextSpan(_))
    }

    /// Canonical value compared during classification and stored in momentos.
    pub fn persistent_value(&self) -> Option<String> {
        match self {
            Indicator::Clef(clef) => Some(clef.name.clone()),
            Indicator::Dynamic(dynamic) => Some(dynamic.name.clone()),
            Indicator::Instrument(instrument) => Some(instrument.name.clone()),
            Indicator::MarginMarkup(markup) => Some(markup.key.clone()),
            Indicator::MetronomeMark(mark) => {
                Some(format!("{}={}", mark.reference, mark.units_per_minute))
            }
            Indicator::Accelerando => Some("accelerando".to_string()),
            Indicator::Ritardando => Some("ritardando".to_string()),
            Indicator::StaffLines(lines) => Some(lines.line_count.to_string()),
            Indicator::PersistentOverride(o) => {
                Some(format!("{}.{}={}", o.grob, o.attribute, o.value))
            }
            _ => None,
        }
    }

    /// True when both indicators are persistent with the same value.
    pub fn same_value(&self, other: &Indicator) -> bool {
        match (self.persistent_value(), other.persistent_value()) {
            (Some(left), Some(right)) => self.kind() == other.kind() && left == right,
            _ => false,
        }
    }

    pub fn tweaks_mut(&mut self) -> Option<&mut Vec<Tweak>> {
        match self {
            Indicator::Dynamic(d) => Some(&mut d.tweaks),
            Indicator::StartHairpin(h) => Some(&mut h.tweaks),
            Indicator::StartTextSpan(s) => Some(&mut s.tweaks),
            Indicator::StartTrillSpan(s) => Some(&mut s.tweaks),
            _ => None,
        }
    }

    pub fn tweaks(&self) -> &[Tweak] {
        match self {
            Indicator::Dynamic(d) => &d.tweaks,
            Indicator::StartHairpin(h) => &h.tweaks,
            Indicator::StartTextSpan(s) => &s.tweaks,
            Indicator::StartTrillSpan(s) => &s.tweaks,
            _ => &[],
        }
    }

    /// Mark a stop indicator so it is emitted after the leaf's bar line.
    pub fn leaked(self) -> Self {
        match self {
            Indicator::StopHairpin(_) => Indicator::StopHairpin(StopHairpin { leak: true }),
            Indicator::StopTextSpan(stop) => {
                Indicator::StopTextSpan(StopTextSpan { leak: true, ..stop })
            }
            Indicator::StopTrillSpan(_) => Indicator::StopTrillSpan(StopTrillSpan { leak: true }),
            Indicator::Dynamic(dynamic) => Indicator::Dynamic(Dynamic { leak: true, ..dynamic }),
            other => other,
        }
    }

    /// Type name used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Indicator::Dynamic(_) => "Dynamic",
            Indicator::StartHairpin(_) => "StartHairpin",
            Indicator::StopHairpin(_) => "StopHairpin",
            Indicator::StartTextSpan(_) => "StartTextSpan",
            Indicator::StopTextSpan(_) => "StopTextSpan",
            Indicator::StartTrillSpan(_) => "StartTrillSpan",
            Indicator::StopTrillSpan(_) => "StopTrillSpan",
            Indicator::Clef(_) => "Clef",
            Indicator::Instrument(_) => "Instrument",
            Indicator::MarginMarkup(_) => "MarginMarkup",
            Indicator::MetronomeMark(_) => "MetronomeMark",
            Indicator::Accelerando => "Accelerando",
            Indicator::Ritardando => "Ritardando",
            Indicator::StaffLines(_) => "StaffLines",
            Indicator::PersistentOverride(_) => "PersistentOverride",
        }
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for tweak in self.tweaks() {
            write!(f, "{} ", tweak)?;
        }
        match self {
            Indicator::Dynamic(d) => match &d.markup {
                Some(Markup::Reference(name)) => write!(f, "\\{}", name),
                Some(markup) => write!(f, "_ \\markup {}", markup),
                None => write!(f, "\\{}", d.name),
            },
            Indicator::StartHairpin(h) => match h.shape {
                HairpinShape::Crescendo
                | HairpinShape::CrescendoFromNiente
                | HairpinShape::CrescendoToBarLine
                | HairpinShape::CrescendoFromNienteToBarLine
                | HairpinShape::Constante => write!(f, "\\< %{}", h.shape.token()),
                _ => write!(f, "\\> %{}", h.shape.token()),
            },
            Indicator::StopHairpin(_) => f.write_str("\\!"),
            Indicator::StartTextSpan(s) => {
                if let Some(left) = &s.left_text {
                    write!(f, "- \\tweak bound-details.left.text \\markup {} ", left)?;
                }
                if let Some(right) = &s.right_text {
                    write!(f, "- \\tweak bound-details.right.text \\markup {} ", right)?;
                }
                write!(f, "- \\tweak style #'{} {}", s.style.name(), s.command)
            }
            Indicator::StopTextSpan(s) => f.write_str(&s.command),
            Indicator::StartTrillSpan(s) => match &s.pitch {
                Some(pitch) => write!(f, "\\pitchedTrill \\startTrillSpan {}", pitch),
                None => f.write_str("\\startTrillSpan"),
            },
            Indicator::StopTrillSpan(_) => f.write_str("\\stopTrillSpan"),
            Indicator::Clef(c) => write!(f, "\\clef {:?}", c.name),
            Indicator::Instrument(i) => write!(f, "%%% instrument {} %%%", i.name),
            Indicator::MarginMarkup(m) => {
                write!(f, "\\set Staff.shortInstrumentName = \\markup {}", m.markup)
            }
            Indicator::MetronomeMark(m) => {
                write!(f, "\\tempo {}={}", m.reference, m.units_per_minute)
            }
            Indicator::Accelerando => f.write_str("\\markup \\upright \"accel.\""),
            Indicator::Ritardando => f.write_str("\\markup \\upright \"rit.\""),
            Indicator::StaffLines(l) => write!(
                f,
                "\\stopStaff \\once \\override Staff.StaffSymbol.line-count = {} \\startStaff",
                l.line_count
            ),
            Indicator::PersistentOverride(o) => {
                write!(f, "\\override {}.{} = {}", o.grob, o.attribute, o.value)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tempo_family_shares_kind() {
        let mark = Indicator::MetronomeMark(MetronomeMark::new("4", 60));
        assert_eq!(mark.kind(), Some(IndicatorKind::MetronomeMark));
        assert_eq!(Indicator::Accelerando.kind(), Some(IndicatorKind::MetronomeMark));
        assert_eq!(Indicator::Ritardando.kind(), Some(IndicatorKind::MetronomeMark));
        assert!(!mark.same_value(&Indicator::Accelerando));
    }

    #[test]
    fn test_instrument_types_share_kind() {
        let violin = Indicator::Instrument(Instrument {
            name: "Violin".to_string(),
            short_name: None,
            instrument_type: InstrumentType::Violin,
        });
        let flute = Indicator::Instrument(Instrument {
            name: "Flute".to_string(),
            short_name: Some("Fl.".to_string()),
            instrument_type: InstrumentType::Flute,
        });
        assert_eq!(violin.kind(), flute.kind());
        assert!(!violin.same_value(&flute));
    }

    #[test]
    fn test_spanner_events_are_not_persistent() {
        assert!(Indicator::StopHairpin(StopHairpin::default()).kind().is_none());
        assert!(Indicator::StartHairpin(StartHairpin::new(HairpinShape::Crescendo)).is_trend());
        assert!(!Indicator::Dynamic(Dynamic::new("p")).is_trend());
    }

    #[test]
    fn test_same_value_ignores_tweaks() {
        let mut tweaked = Dynamic::new("f");
        tweaked.tweaks.push(Tweak::new("self-alignment-X", "#left"));
        assert!(Indicator::Dynamic(tweaked).same_value(&Indicator::Dynamic(Dynamic::new("f"))));
    }

    #[test]
    fn test_sforzando_detection() {
        assert!(Dynamic::new("sfz").is_sforzando());
        assert!(Dynamic::new("fp").is_sforzando());
        assert!(Dynamic::new("sffp").is_sforzando());
        assert!(!Dynamic::new("mf").is_sforzando());
    }

    #[test]
    fn test_textual_dynamics() {
        let reference = Dynamic::from_token("\\appena-udibile").unwrap();
        assert!(reference.is_textual());
        assert_eq!(reference.name, "\\appena-udibile");
        assert_eq!(Indicator::Dynamic(reference).to_string(), "\\appena-udibile");

        let word = Dynamic::from_token("sub.p").unwrap();
        assert_eq!(word.markup, Some(Markup::Text("sub.p".to_string())));
        assert_eq!(Indicator::Dynamic(word).to_string(), "_ \\markup \\upright \"sub.p\"");

        assert!(!Dynamic::from_token("mf").unwrap().is_textual());
        assert!(Dynamic::from_token("").is_none());
    }

    #[test]
    fn test_metronome_mark_parse() {
        assert_eq!(MetronomeMark::parse("4=60"), Some(MetronomeMark::new("4", 60)));
        assert_eq!(MetronomeMark::parse("8.=72"), Some(MetronomeMark::new("8.", 72)));
        assert_eq!(MetronomeMark::parse("fast"), None);
        assert_eq!(MetronomeMark::parse("q=60"), None);
    }

    #[test]
    fn test_persistent_override_parse() {
        let o = PersistentOverride::parse("BarLine.transparent=##t").unwrap();
        assert_eq!(o.grob, "BarLine");
        assert_eq!(o.attribute, "transparent");
        assert_eq!(o.value, "##t");
        assert!(PersistentOverride::parse("transparent=##t").is_none());
    }

    #[test]
    fn test_markup_label() {
        assert_eq!(Markup::label("\\damp-markup"), Markup::Reference("damp-markup".to_string()));
        assert_eq!(Markup::label("pont."), Markup::Text("pont.".to_string()));
    }
}
