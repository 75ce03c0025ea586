//! # Segment Metadata and Configuration
//!
//! Cross-segment state and score-template configuration, read from YAML.
//!
//! ## Momentos
//! A [`Momento`] records one persistent indicator in effect at the end of a
//! segment: its owning context, kind and canonical value. The next segment
//! receives them in [`SegmentMetadata::persistent_indicators`], keyed by
//! context name, and the classifier reapplies them on each context's first
//! leaf.
//!
//! ## Configuration
//! ```yaml
//! defaults:
//!   Violin_Staff:
//!     clef: treble
//!     instrument: violin
//!   Score:
//!     metronome_mark: "4=60"
//! instruments:
//!   violin: { name: Violin, short_name: Vn., type: violin }
//! margin_markups:
//!   Vn: "Vn."
//! ```
//!
//! Raw YAML is deserialized into `Raw*` structs first and then converted into
//! typed indicators, so a bad clef name or metronome mark is reported as a
//! `MetadataError` naming the offending context.

use crate::error::SostenutoError;
use crate::indicators::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A persistent indicator carried from one segment into the next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Momento {
    pub context: String,
    pub kind: IndicatorKind,
    pub value: String,
    /// Manifest the value is looked up in (`instruments`, `margin_markups`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edition: Option<String>,
}

/// Metadata exported at the end of a segment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SegmentMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_measure_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measure_count: Option<usize>,
    #[serde(default)]
    pub persistent_indicators: BTreeMap<String, Vec<Momento>>,
}

impl SegmentMetadata {
    pub fn from_yaml(content: &str) -> Result<Self, SostenutoError> {
        serde_yaml::from_str(content).map_err(|e| SostenutoError::MetadataError(e.to_string()))
    }

    pub fn to_yaml(&self) -> Result<String, SostenutoError> {
        serde_yaml::to_string(self).map_err(|e| SostenutoError::MetadataError(e.to_string()))
    }

    /// Most recent momento of `kind` owned by `context`.
    pub fn latest(&self, context: &str, kind: IndicatorKind) -> Option<&Momento> {
        self.persistent_indicators
            .get(context)?
            .iter()
            .rev()
            .find(|momento| momento.kind == kind)
    }

    pub fn contexts(&self) -> impl Iterator<Item = &String> {
        self.persistent_indicators.keys()
    }
}

/// Named instruments and margin markups.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifests {
    pub instruments: BTreeMap<String, Instrument>,
    pub margin_markups: BTreeMap<String, MarginMarkup>,
}

impl Manifests {
    /// Look up an instrument by manifest key or by display name.
    pub fn instrument(&self, value: &str) -> Option<&Instrument> {
        self.instruments
            .get(value)
            .or_else(|| self.instruments.values().find(|i| i.name == value))
    }

    pub fn margin_markup(&self, key: &str) -> Option<&MarginMarkup> {
        self.margin_markups.get(key)
    }

    /// Name of the manifest holding indicators of `kind`, if any.
    pub fn manifest_name(kind: IndicatorKind) -> Option<&'static str> {
        match kind {
            IndicatorKind::Instrument => Some("instruments"),
            IndicatorKind::MarginMarkup => Some("margin_markups"),
            _ => None,
        }
    }
}

/// Score-template default indicators per (context, kind).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateDefaults {
    entries: BTreeMap<String, BTreeMap<IndicatorKind, Indicator>>,
}

impl TemplateDefaults {
    pub fn insert(&mut self, context: &str, indicator: Indicator) -> Result<(), SostenutoError> {
        let kind = indicator.kind().ok_or_else(|| {
            SostenutoError::MetadataError(format!(
                "Default for {} must be a persistent indicator, got {}",
                context,
                indicator.type_name()
            ))
        })?;
        self.entries
            .entry(context.to_string())
            .or_default()
            .insert(kind, indicator);
        Ok(())
    }

    pub fn get(&self, context: &str, kind: IndicatorKind) -> Option<&Indicator> {
        self.entries.get(context)?.get(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Score-template configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub defaults: TemplateDefaults,
    pub manifests: Manifests,
}

/// Raw configuration for YAML deserialization
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "snake_case")]
struct RawConfig {
    #[serde(default)]
    defaults: BTreeMap<String, BTreeMap<String, serde_yaml::Value>>,
    #[serde(default)]
    instruments: BTreeMap<String, Instrument>,
    #[serde(default)]
    margin_markups: BTreeMap<String, String>,
}

impl Config {
    pub fn from_yaml(content: &str) -> Result<Self, SostenutoError> {
        let raw: RawConfig = serde_yaml::from_str(content)
            .map_err(|e| SostenutoError::MetadataError(e.to_string()))?;

        let mut manifests = Manifests {
            instruments: raw.instruments,
            ..Manifests::default()
        };
        for (key, text) in raw.margin_markups {
            let markup = MarginMarkup {
                key: key.clone(),
                markup: Markup::label(&text),
            };
            manifests.margin_markups.insert(key, markup);
        }

        let mut defaults = TemplateDefaults::default();
        for (context, entries) in &raw.defaults {
            for (key, value) in entries {
                let kind = IndicatorKind::from_key(key).ok_or_else(|| {
                    SostenutoError::MetadataError(format!(
                        "Unknown indicator kind {:?} in defaults for {}",
                        key, context
                    ))
                })?;
                let value = scalar_to_string(value).ok_or_else(|| {
                    SostenutoError::MetadataError(format!(
                        "Default {} for {} must be a scalar",
                        key, context
                    ))
                })?;
                let indicator = indicator_from_value(kind, &value, &manifests)?;
                defaults.insert(context, indicator)?;
            }
        }

        Ok(Config {
            defaults,
            manifests,
        })
    }
}

fn scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Rebuild an indicator from its canonical persistent value.
pub fn indicator_from_value(
    kind: IndicatorKind,
    value: &str,
    manifests: &Manifests,
) -> Result<Indicator, SostenutoError> {
    let invalid = || SostenutoError::MetadataError(format!("Invalid {} value: {:?}", kind, value));
    let indicator = match kind {
        IndicatorKind::Clef => Indicator::Clef(Clef::parse(value).ok_or_else(invalid)?),
        IndicatorKind::Dynamic => {
            Indicator::Dynamic(Dynamic::from_token(value).ok_or_else(invalid)?)
        }
        IndicatorKind::Instrument => {
            Indicator::Instrument(manifests.instrument(value).cloned().ok_or_else(invalid)?)
        }
        IndicatorKind::MarginMarkup => {
            Indicator::MarginMarkup(manifests.margin_markup(value).cloned().ok_or_else(invalid)?)
        }
        IndicatorKind::MetronomeMark => match value {
            "accelerando" => Indicator::Accelerando,
            "ritardando" => Indicator::Ritardando,
            _ => Indicator::MetronomeMark(MetronomeMark::parse(value).ok_or_else(invalid)?),
        },
        IndicatorKind::StaffLines => {
            let line_count = value.trim().parse().map_err(|_| invalid())?;
            Indicator::StaffLines(StaffLines { line_count })
        }
        IndicatorKind::PersistentOverride => {
            Indicator::PersistentOverride(PersistentOverride::parse(value).ok_or_else(invalid)?)
        }
    };
    Ok(indicator)
}

impl Momento {
    pub fn to_indicator(&self, manifests: &Manifests) -> Result<Indicator, SostenutoError> {
        indicator_from_value(self.kind, &self.value, manifests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
defaults:
  Violin_Staff:
    clef: treble
    instrument: violin
    staff_lines: 5
  Score:
    metronome_mark: "4=60"
instruments:
  violin: { name: Violin, short_name: Vn., type: violin }
margin_markups:
  Vn: "Vn."
"#;

    #[test]
    fn test_config_from_yaml() {
        let config = Config::from_yaml(CONFIG).unwrap();
        assert_eq!(
            config.defaults.get("Violin_Staff", IndicatorKind::Clef),
            Some(&Indicator::Clef(Clef::parse("treble").unwrap()))
        );
        assert_eq!(
            config.defaults.get("Violin_Staff", IndicatorKind::StaffLines),
            Some(&Indicator::StaffLines(StaffLines { line_count: 5 }))
        );
        assert_eq!(
            config.defaults.get("Score", IndicatorKind::MetronomeMark),
            Some(&Indicator::MetronomeMark(MetronomeMark::new("4", 60)))
        );
        let instrument = config.manifests.instrument("Violin").unwrap();
        assert_eq!(instrument.instrument_type, InstrumentType::Violin);
        assert!(config.manifests.margin_markup("Vn").is_some());
    }

    #[test]
    fn test_config_rejects_bad_clef() {
        let result = Config::from_yaml("defaults:\n  Staff:\n    clef: sideways\n");
        assert!(matches!(result, Err(SostenutoError::MetadataError(_))));
    }

    #[test]
    fn test_config_rejects_unknown_kind() {
        let result = Config::from_yaml("defaults:\n  Staff:\n    key: G\n");
        match result {
            Err(SostenutoError::MetadataError(message)) => {
                assert!(message.contains("Unknown indicator kind"))
            }
            other => panic!("Expected MetadataError but got: {:?}", other),
        }
    }

    #[test]
    fn test_segment_metadata_yaml_round_trip() {
        let mut metadata = SegmentMetadata {
            segment_name: Some("A".to_string()),
            ..SegmentMetadata::default()
        };
        metadata.persistent_indicators.insert(
            "Violin_Staff".to_string(),
            vec![Momento {
                context: "Violin_Staff".to_string(),
                kind: IndicatorKind::Clef,
                value: "alto".to_string(),
                manifest: None,
                edition: None,
            }],
        );
        let yaml = metadata.to_yaml().unwrap();
        assert!(yaml.contains("persistent-indicators"));
        let back = SegmentMetadata::from_yaml(&yaml).unwrap();
        assert_eq!(back, metadata);
    }

    #[test]
    fn test_latest_momento_wins() {
        let yaml = r#"
persistent-indicators:
  Score:
    - { context: Score, kind: metronome_mark, value: "4=60" }
    - { context: Score, kind: metronome_mark, value: accelerando }
"#;
        let metadata = SegmentMetadata::from_yaml(yaml).unwrap();
        let momento = metadata.latest("Score", IndicatorKind::MetronomeMark).unwrap();
        assert_eq!(momento.value, "accelerando");
        assert_eq!(
            momento.to_indicator(&Manifests::default()).unwrap(),
            Indicator::Accelerando
        );
        assert!(metadata.latest("Score", IndicatorKind::Clef).is_none());
    }
}
