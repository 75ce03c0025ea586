//! # Descriptor Parser
//!
//! Turns compact textual descriptors into ordered [`Specifier`] lists.
//!
//! ## Hairpin descriptors
//! Whitespace-separated tokens: hairpin shapes (`<`, `o<`, `<|`, `o<|`,
//! `>`, `>o`, `|>`, `|>o`, `--`), `!` for a hairpin stop, `-` as a
//! placeholder between two hairpin endpoints, and content tokens. A content
//! token is a dynamic name (`p`, `mf`, `sfz`, ...), a bare word (`sub.p`) or
//! a `\name` markup reference; the last two become textual dynamics.
//!
//! ```text
//! "f"        → [indicator=f]
//! "f > p"    → [indicator=f start=>] [indicator=p]
//! "- > -"    → [start=>]
//! "o< f > p" → [start=o<] [indicator=f start=>] [indicator=p]
//! "\appena-udibile < f" → [indicator=\appena-udibile start=<] [indicator=f]
//! ```
//!
//! ## Text-spanner descriptors
//! Shape tokens (`=>`, `=|`, `||`, `->`, `-|`) separate labels; the words
//! between two shapes form one label. `-` as a label means "no text".
//!
//! ```text
//! "pont. => ord."   → [left=pont. style=dashed-line-with-arrow, bookended right=ord.]
//! "T =| U"          → [left=T style=dashed-line-with-hook, bookended right=U]
//! ```

use crate::error::SostenutoError;
use crate::indicators::*;
use crate::specifier::{SpannerFamily, Specifier};
use log::trace;

/// One classified hairpin-descriptor token.
#[derive(Debug, Clone, PartialEq)]
enum HairpinToken {
    Dynamic(Dynamic),
    Start(HairpinShape),
    Stop,
    Placeholder,
}

impl HairpinToken {
    fn to_indicator(&self) -> Option<Indicator> {
        match self {
            HairpinToken::Dynamic(dynamic) => Some(Indicator::Dynamic(dynamic.clone())),
            HairpinToken::Start(shape) => Some(Indicator::StartHairpin(StartHairpin::new(*shape))),
            HairpinToken::Stop => Some(Indicator::StopHairpin(StopHairpin::default())),
            HairpinToken::Placeholder => None,
        }
    }
}

fn parse_error(descriptor: &str, message: impl Into<String>) -> SostenutoError {
    SostenutoError::ParseError {
        descriptor: descriptor.to_string(),
        message: message.into(),
    }
}

fn tokenize_hairpin(descriptor: &str) -> Result<Vec<HairpinToken>, SostenutoError> {
    descriptor
        .split_whitespace()
        .map(|word| {
            let token = if word == "!" {
                HairpinToken::Stop
            } else if word == "-" {
                HairpinToken::Placeholder
            } else if let Some(shape) = HairpinShape::from_token(word) {
                HairpinToken::Start(shape)
            } else if word.contains(['<', '>']) {
                return Err(parse_error(descriptor, format!("unknown hairpin shape {:?}", word)));
            } else if let Some(dynamic) = Dynamic::from_token(word) {
                HairpinToken::Dynamic(dynamic)
            } else {
                return Err(parse_error(descriptor, format!("unknown token {:?}", word)));
            };
            trace!("hairpin token {:?} -> {:?}", word, token);
            Ok(token)
        })
        .collect()
}

fn hairpin() -> Specifier {
    Specifier::new(SpannerFamily::Hairpin)
}

/// Parse a hairpin descriptor such as `"p < f"` or `"o< mf >o !"`.
///
/// # Errors
/// - empty descriptor, unknown hairpin shape or a lone `-` placeholder
/// - two consecutive start-hairpin shapes
pub fn parse_hairpin_descriptor(descriptor: &str) -> Result<Vec<Specifier>, SostenutoError> {
    let mut tokens = tokenize_hairpin(descriptor)?;
    if tokens.is_empty() {
        return Err(parse_error(descriptor, "empty hairpin descriptor"));
    }

    if tokens.len() == 1 {
        let specifier = match &tokens[0] {
            HairpinToken::Placeholder => {
                return Err(parse_error(descriptor, "placeholder without hairpin"))
            }
            HairpinToken::Start(shape) => {
                hairpin().with_spanner_start(Indicator::StartHairpin(StartHairpin::new(*shape)))?
            }
            HairpinToken::Stop => {
                hairpin().with_spanner_stop(Indicator::StopHairpin(StopHairpin::default()))?
            }
            HairpinToken::Dynamic(dynamic) => {
                hairpin().with_indicator(Indicator::Dynamic(dynamic.clone()))?
            }
        };
        return Ok(vec![specifier]);
    }

    let mut specifiers = Vec::new();
    if let HairpinToken::Start(shape) = tokens[0] {
        tokens.remove(0);
        let start = Indicator::StartHairpin(StartHairpin::new(shape));
        specifiers.push(hairpin().with_spanner_start(start)?);
        if tokens.len() == 1 {
            let specifier = match &tokens[0] {
                HairpinToken::Start(_) => {
                    return Err(parse_error(descriptor, "consecutive start hairpin commands"))
                }
                HairpinToken::Placeholder => return Ok(specifiers),
                token => match token.to_indicator() {
                    Some(indicator) => hairpin().with_indicator(indicator)?,
                    None => return Ok(specifiers),
                },
            };
            specifiers.push(specifier);
            return Ok(specifiers);
        }
    }

    for pair in tokens.windows(2) {
        let (left, right) = (&pair[0], &pair[1]);
        let specifier = match (left, right) {
            (HairpinToken::Start(_), HairpinToken::Start(_)) => {
                return Err(parse_error(descriptor, "consecutive start hairpin commands"));
            }
            (HairpinToken::Dynamic(_), HairpinToken::Dynamic(_) | HairpinToken::Placeholder) => {
                left.to_indicator().map(|i| hairpin().with_indicator(i)).transpose()?
            }
            (HairpinToken::Placeholder, HairpinToken::Start(_)) => {
                right.to_indicator().map(|i| hairpin().with_spanner_start(i)).transpose()?
            }
            (HairpinToken::Placeholder, HairpinToken::Stop) => {
                right.to_indicator().map(|i| hairpin().with_spanner_stop(i)).transpose()?
            }
            (HairpinToken::Dynamic(_) | HairpinToken::Stop, HairpinToken::Start(_)) => {
                match (left.to_indicator(), right.to_indicator()) {
                    (Some(indicator), Some(start)) => Some(
                        hairpin()
                            .with_indicator(indicator)?
                            .with_spanner_start(start)?,
                    ),
                    _ => None,
                }
            }
            _ => None,
        };
        specifiers.extend(specifier);
    }

    // A trailing stop lands in `indicator`, not `spanner_stop`.
    if let Some(last) = tokens.last() {
        if matches!(last, HairpinToken::Dynamic(_) | HairpinToken::Stop) {
            if let Some(indicator) = last.to_indicator() {
                specifiers.push(hairpin().with_indicator(indicator)?);
            }
        }
    }
    Ok(specifiers)
}

/// Presentation options for text-spanner descriptors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextSpannerOptions {
    /// Selects `\startTextSpanOne` (1), `...Two` (2) or `...Three` (3) so
    /// several text spanners can overlap on one voice.
    pub lilypond_id: Option<u8>,
    /// Draw every label inside a box.
    pub boxed: bool,
}

impl TextSpannerOptions {
    fn commands(&self) -> Result<(String, String), SostenutoError> {
        let suffix = match self.lilypond_id {
            None => "",
            Some(1) => "One",
            Some(2) => "Two",
            Some(3) => "Three",
            Some(other) => {
                return Err(SostenutoError::SpecifierError(format!(
                    "lilypond_id must be 1, 2 or 3, not {}",
                    other
                )))
            }
        };
        Ok((
            format!("\\startTextSpan{}", suffix),
            format!("\\stopTextSpan{}", suffix),
        ))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum TextItem {
    Label(String),
    Shape(TextSpanStyle),
}

fn tokenize_text(descriptor: &str) -> Vec<TextItem> {
    let mut items = Vec::new();
    let mut words: Vec<&str> = Vec::new();
    for word in descriptor.split_whitespace() {
        match TextSpanStyle::from_shape(word) {
            Some(style) => {
                if !words.is_empty() {
                    items.push(TextItem::Label(words.join(" ")));
                    words.clear();
                }
                trace!("text shape {:?} -> {}", word, style.name());
                items.push(TextItem::Shape(style));
            }
            None => words.push(word),
        }
    }
    if !words.is_empty() {
        items.push(TextItem::Label(words.join(" ")));
    }
    items
}

fn label_markup(label: &str, options: &TextSpannerOptions) -> Option<Markup> {
    if label == "-" {
        return None;
    }
    let markup = Markup::label(label);
    Some(if options.boxed { markup.boxed() } else { markup })
}

/// Parse a text-spanner descriptor such as `"pont. => ord."` or `"T =| -"`.
///
/// Each label followed by another item yields one specifier whose start
/// carries the label as left text, styled by the following shape (an
/// invisible line when two labels are adjacent). The bookended start also
/// carries the next label as right text; when the descriptor ends with a
/// shape, the right text wraps around to the first label. Every specifier
/// shares one stop.
///
/// # Errors
/// - [`SostenutoError::NotImplemented`] when the descriptor holds exactly
///   one label
/// - [`SostenutoError::ParseError`] for an empty descriptor, one without
///   labels, or two adjacent shapes
pub fn parse_text_spanner_descriptor(
    descriptor: &str,
    options: &TextSpannerOptions,
) -> Result<Vec<Specifier>, SostenutoError> {
    let items = tokenize_text(descriptor);
    if items.is_empty() {
        return Err(parse_error(descriptor, "empty text spanner descriptor"));
    }
    let label_count = items
        .iter()
        .filter(|item| matches!(item, TextItem::Label(_)))
        .count();
    match label_count {
        0 => return Err(parse_error(descriptor, "text spanner descriptor has no labels")),
        1 => {
            return Err(SostenutoError::NotImplemented(format!(
                "text spanner with a single label: {:?}",
                descriptor
            )))
        }
        _ => {}
    }
    if items
        .windows(2)
        .any(|pair| matches!(pair, [TextItem::Shape(_), TextItem::Shape(_)]))
    {
        return Err(parse_error(descriptor, "consecutive shape tokens"));
    }

    let (start_command, stop_command) = options.commands()?;
    let stop = Indicator::StopTextSpan(StopTextSpan {
        command: stop_command,
        leak: false,
    });

    let mut specifiers = Vec::new();
    for (i, item) in items.iter().enumerate() {
        let TextItem::Label(left) = item else {
            continue;
        };
        let Some(next) = items.get(i + 1) else {
            continue;
        };
        let (style, right) = match next {
            TextItem::Shape(style) => (*style, next_label(&items, i + 2)),
            TextItem::Label(right) => (TextSpanStyle::InvisibleLine, Some(right.as_str())),
        };
        let start = StartTextSpan {
            command: start_command.clone(),
            left_text: label_markup(left, options),
            right_text: None,
            style,
            tweaks: Vec::new(),
        };
        let bookended = bookend_right_text(start.clone(), right, options);
        specifiers.push(
            Specifier::new(SpannerFamily::TextSpan)
                .with_spanner_start(Indicator::StartTextSpan(start))?
                .with_bookended_spanner_start(Indicator::StartTextSpan(bookended))?
                .with_spanner_stop(stop.clone())?,
        );
    }
    Ok(specifiers)
}

/// First label at or after `from`, wrapping around the item list.
fn next_label(items: &[TextItem], from: usize) -> Option<&str> {
    (0..items.len())
        .map(|offset| &items[(from + offset) % items.len()])
        .find_map(|item| match item {
            TextItem::Label(label) => Some(label.as_str()),
            TextItem::Shape(_) => None,
        })
}

fn bookend_right_text(
    mut start: StartTextSpan,
    right: Option<&str>,
    options: &TextSpannerOptions,
) -> StartTextSpan {
    let Some(label) = right.and_then(|label| label_markup(label, options)) else {
        return start;
    };
    if start.style.is_hook() {
        start.right_text = Some(Markup::Concat(vec![
            Markup::DrawLine { x: 0.0, y: -1.0 },
            Markup::Hspace(0.75),
            label,
        ]));
        start
            .tweaks
            .push(Tweak::new("bound-details.right.stencil-align-dir-y", "#center"));
    } else {
        start.right_text = Some(label);
        start.tweaks.push(Tweak::new("bound-details.right.padding", "1.25"));
    }
    start
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dynamic(name: &str) -> Indicator {
        Indicator::Dynamic(Dynamic::new(name))
    }

    fn start(shape: HairpinShape) -> Indicator {
        Indicator::StartHairpin(StartHairpin::new(shape))
    }

    #[test]
    fn test_single_dynamic() {
        let specifiers = parse_hairpin_descriptor("f").unwrap();
        assert_eq!(specifiers.len(), 1);
        assert_eq!(specifiers[0].indicator(), Some(&dynamic("f")));
        assert!(specifiers[0].spanner_start().is_none());
    }

    #[test]
    fn test_single_shape_and_stop() {
        let specifiers = parse_hairpin_descriptor("<").unwrap();
        assert_eq!(specifiers[0].spanner_start(), Some(&start(HairpinShape::Crescendo)));
        let specifiers = parse_hairpin_descriptor("!").unwrap();
        assert!(specifiers[0].spanner_stop().is_some());
        assert!(specifiers[0].indicator().is_none());
    }

    #[test]
    fn test_dynamic_shape_dynamic() {
        let specifiers = parse_hairpin_descriptor("f > p").unwrap();
        assert_eq!(specifiers.len(), 2);
        assert_eq!(specifiers[0].indicator(), Some(&dynamic("f")));
        assert_eq!(specifiers[0].spanner_start(), Some(&start(HairpinShape::Decrescendo)));
        assert_eq!(specifiers[1].indicator(), Some(&dynamic("p")));
        assert!(specifiers[1].spanner_start().is_none());
    }

    #[test]
    fn test_placeholders_around_shape() {
        let specifiers = parse_hairpin_descriptor("- > -").unwrap();
        assert_eq!(specifiers.len(), 1);
        assert!(specifiers[0].indicator().is_none());
        assert_eq!(specifiers[0].spanner_start(), Some(&start(HairpinShape::Decrescendo)));
    }

    #[test]
    fn test_leading_shape_is_popped() {
        let specifiers = parse_hairpin_descriptor("o< mf >o !").unwrap();
        assert_eq!(specifiers.len(), 3);
        assert_eq!(
            specifiers[0].spanner_start(),
            Some(&start(HairpinShape::CrescendoFromNiente))
        );
        assert!(specifiers[0].indicator().is_none());
        assert_eq!(specifiers[1].indicator(), Some(&dynamic("mf")));
        assert_eq!(
            specifiers[1].spanner_start(),
            Some(&start(HairpinShape::DecrescendoToNiente))
        );
        // trailing stop folds into the indicator slot
        assert_eq!(
            specifiers[2].indicator(),
            Some(&Indicator::StopHairpin(StopHairpin::default()))
        );
    }

    #[test]
    fn test_leading_shape_with_one_remaining_token() {
        let specifiers = parse_hairpin_descriptor("< f").unwrap();
        assert_eq!(specifiers.len(), 2);
        assert_eq!(specifiers[1].indicator(), Some(&dynamic("f")));
    }

    #[test]
    fn test_consecutive_dynamics() {
        let specifiers = parse_hairpin_descriptor("p f").unwrap();
        assert_eq!(specifiers.len(), 2);
        assert_eq!(specifiers[0].indicator(), Some(&dynamic("p")));
        assert_eq!(specifiers[1].indicator(), Some(&dynamic("f")));
    }

    #[test]
    fn test_placeholder_then_stop() {
        let specifiers = parse_hairpin_descriptor("p < - !").unwrap();
        assert_eq!(specifiers.len(), 3);
        assert!(specifiers[1].spanner_stop().is_some());
        assert!(specifiers[2].indicator().is_some());
    }

    #[test]
    fn test_consecutive_starts_rejected() {
        match parse_hairpin_descriptor("p < <") {
            Err(SostenutoError::ParseError { message, .. }) => {
                assert_eq!(message, "consecutive start hairpin commands");
            }
            other => panic!("Expected ParseError but got: {:?}", other),
        }
    }

    #[test]
    fn test_bad_hairpin_descriptors() {
        assert!(parse_hairpin_descriptor("").is_err());
        assert!(parse_hairpin_descriptor("-").is_err());
        assert!(parse_hairpin_descriptor("p <> f").is_err());
    }

    #[test]
    fn test_textual_dynamics_in_hairpins() {
        let specifiers = parse_hairpin_descriptor("\\appena-udibile < f").unwrap();
        assert_eq!(specifiers.len(), 2);
        match specifiers[0].indicator() {
            Some(Indicator::Dynamic(dynamic)) => {
                assert_eq!(
                    dynamic.markup,
                    Some(Markup::Reference("appena-udibile".to_string()))
                );
            }
            other => panic!("Expected Dynamic but got: {:?}", other),
        }
        assert!(specifiers[0].is_compound());
        assert_eq!(specifiers[1].indicator(), Some(&dynamic("f")));

        let specifiers = parse_hairpin_descriptor("sub.p > niente").unwrap();
        match specifiers[0].indicator() {
            Some(Indicator::Dynamic(dynamic)) => assert!(dynamic.is_textual()),
            other => panic!("Expected Dynamic but got: {:?}", other),
        }
    }

    fn text_start(specifier: &Specifier) -> &StartTextSpan {
        match specifier.spanner_start() {
            Some(Indicator::StartTextSpan(start)) => start,
            other => panic!("Expected StartTextSpan but got: {:?}", other),
        }
    }

    fn bookended(specifier: &Specifier) -> &StartTextSpan {
        match specifier.bookended_spanner_start() {
            Some(Indicator::StartTextSpan(start)) => start,
            other => panic!("Expected StartTextSpan but got: {:?}", other),
        }
    }

    #[test]
    fn test_text_hook_with_right_label() {
        let specifiers =
            parse_text_spanner_descriptor("T =| U", &TextSpannerOptions::default()).unwrap();
        assert_eq!(specifiers.len(), 1);
        let start = text_start(&specifiers[0]);
        assert_eq!(start.style, TextSpanStyle::DashedLineWithHook);
        assert_eq!(start.left_text, Some(Markup::Text("T".to_string())));
        assert!(start.right_text.is_none());
        let bookended = bookended(&specifiers[0]);
        match &bookended.right_text {
            Some(Markup::Concat(items)) => {
                assert_eq!(items.last(), Some(&Markup::Text("U".to_string())));
            }
            other => panic!("Expected kerned right text but got: {:?}", other),
        }
        assert_eq!(bookended.tweaks.len(), 1);
    }

    #[test]
    fn test_text_single_label_not_implemented() {
        let options = TextSpannerOptions::default();
        assert!(matches!(
            parse_text_spanner_descriptor("T", &options),
            Err(SostenutoError::NotImplemented(_))
        ));
        assert!(matches!(
            parse_text_spanner_descriptor("T =|", &options),
            Err(SostenutoError::NotImplemented(_))
        ));
    }

    #[test]
    fn test_text_dash_right_label_means_no_text() {
        let specifiers =
            parse_text_spanner_descriptor("T =| -", &TextSpannerOptions::default()).unwrap();
        assert_eq!(specifiers.len(), 1);
        assert!(bookended(&specifiers[0]).right_text.is_none());
    }

    #[test]
    fn test_text_chain_wraps_right_label() {
        let specifiers =
            parse_text_spanner_descriptor("pont. => ord. -|", &TextSpannerOptions::default())
                .unwrap();
        assert_eq!(specifiers.len(), 2);
        assert_eq!(text_start(&specifiers[0]).style, TextSpanStyle::DashedLineWithArrow);
        assert_eq!(
            bookended(&specifiers[0]).right_text,
            Some(Markup::Text("ord.".to_string()))
        );
        assert_eq!(text_start(&specifiers[1]).style, TextSpanStyle::SolidLineWithHook);
        match &bookended(&specifiers[1]).right_text {
            Some(Markup::Concat(items)) => {
                assert_eq!(items.last(), Some(&Markup::Text("pont.".to_string())));
            }
            other => panic!("Expected wrapped right text but got: {:?}", other),
        }
        assert_eq!(specifiers[0].spanner_stop(), specifiers[1].spanner_stop());
    }

    #[test]
    fn test_text_words_join_into_one_label() {
        let specifiers =
            parse_text_spanner_descriptor("A B => C", &TextSpannerOptions::default()).unwrap();
        assert_eq!(specifiers.len(), 1);
        assert_eq!(text_start(&specifiers[0]).left_text, Some(Markup::Text("A B".to_string())));
    }

    #[test]
    fn test_text_options() {
        let options = TextSpannerOptions {
            lilypond_id: Some(2),
            boxed: true,
        };
        let specifiers = parse_text_spanner_descriptor("\\damp-markup => ord.", &options).unwrap();
        let start = text_start(&specifiers[0]);
        assert_eq!(start.command, "\\startTextSpanTwo");
        assert_eq!(
            start.left_text,
            Some(Markup::Reference("damp-markup".to_string()).boxed())
        );
        match specifiers[0].spanner_stop() {
            Some(Indicator::StopTextSpan(stop)) => assert_eq!(stop.command, "\\stopTextSpanTwo"),
            other => panic!("Expected StopTextSpan but got: {:?}", other),
        }
        let bad = TextSpannerOptions {
            lilypond_id: Some(4),
            boxed: false,
        };
        assert!(parse_text_spanner_descriptor("A => B", &bad).is_err());
    }

    #[test]
    fn test_text_consecutive_shapes_rejected() {
        let result = parse_text_spanner_descriptor("A => =| B", &TextSpannerOptions::default());
        assert!(matches!(result, Err(SostenutoError::ParseError { .. })));
    }
}
