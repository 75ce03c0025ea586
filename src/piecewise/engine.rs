//! Piecewise distribution of spanner specifiers over pieces

use super::types::PiecewiseOptions;
use crate::command::Runtime;
use crate::error::SostenutoError;
use crate::reconcile::attach_indicator;
use crate::score::{LeafId, Piece, Score, Tag, Wrapper, LEFT_BROKEN, RIGHT_BROKEN};
use crate::specifier::{SpannerFamily, Specifier};
use log::debug;

/// `specifiers[index % len]`. Callers guarantee `specifiers` is non-empty.
fn cyclic(specifiers: &[Specifier], index: usize) -> &Specifier {
    &specifiers[index % specifiers.len()]
}

/// Attaches one specifier's indicators to one leaf.
struct Attacher<'a> {
    options: &'a PiecewiseOptions,
    runtime: &'a Runtime,
    total: usize,
}

impl<'a> Attacher<'a> {
    fn site_tag(&self, site: u8) -> Result<Tag, SostenutoError> {
        Tag::new(&format!("{}({})", self.options.provenance, site))
    }

    /// Attach stop, indicator and start, in that order.
    ///
    /// With `only_trends` set, non-start indicators are skipped: the leaf
    /// already received them from a bookend.
    fn attach(
        &self,
        score: &mut Score,
        specifier: &Specifier,
        leaf: LeafId,
        index: usize,
        tag: &Tag,
        only_trends: bool,
    ) -> Result<Vec<Wrapper>, SostenutoError> {
        let mut wrappers = Vec::new();
        for indicator in specifier.indicators() {
            if only_trends && !indicator.is_trend() {
                continue;
            }
            let mut indicator = indicator.clone();
            if let Some(tweaks) = indicator.tweaks_mut() {
                for indexed in &self.options.tweaks {
                    if indexed.applies_to(index, self.total) {
                        tweaks.push(indexed.tweak.clone());
                    }
                }
            }
            wrappers.push(attach_indicator(
                score,
                leaf,
                indicator,
                tag.clone(),
                self.runtime,
            )?);
        }
        Ok(wrappers)
    }
}

fn validate_pieces(score: &Score, pieces: &[Piece]) -> Result<(), SostenutoError> {
    if pieces.is_empty() {
        return Err(SostenutoError::SelectionError(
            "piecewise iteration needs at least one piece".to_string(),
        ));
    }
    let mut previous = None;
    for (i, piece) in pieces.iter().enumerate() {
        if piece.is_empty() {
            return Err(SostenutoError::SelectionError(format!("piece {} is empty", i)));
        }
        let leaves = piece.leaves();
        if let Some(missing) = leaves.iter().find(|leaf| !score.contains_leaf(**leaf)) {
            return Err(SostenutoError::SelectionError(format!(
                "piece {} names unknown leaf {}",
                i, missing
            )));
        }
        let voice = &score.leaf(leaves[0]).voice;
        if leaves.iter().any(|leaf| &score.leaf(*leaf).voice != voice) {
            return Err(SostenutoError::SelectionError(format!("piece {} mixes voices", i)));
        }
        let offset = piece.first().map(|leaf| score.leaf(leaf).start_offset);
        if previous.is_some() && offset < previous {
            return Err(SostenutoError::SelectionError(format!(
                "piece {} starts before piece {}",
                i,
                i - 1
            )));
        }
        previous = offset;
    }
    Ok(())
}

/// Distribute `specifiers` cyclically over `pieces`, attaching indicators to
/// each piece's first leaf and, when bookending, its last leaf.
///
/// # Per-piece steps
/// 1. Take `specifiers[i % len]`.
/// 2. Decide whether to bookend: the bookend option matches `i` and the
///    piece is a run of more than one leaf. Never on a right-broken final
///    piece unless it starts a text span, never on the final piece with
///    `do_not_start_spanner_on_final_piece`.
/// 3. After backstealing, the final piece starts nothing.
/// 4. A bookended piece starts with the bookended start.
/// 5. The penultimate piece backsteals the bookended start when the final
///    piece is a single leaf (or may not start a spanner) and the next
///    specifier starts a text span.
/// 6. `do_not_start_spanner_on_final_piece` strips the final start.
/// 7. The first piece, and for text spans and trills any piece after a
///    bookend, closes nothing. LEFT_BROKEN / RIGHT_BROKEN mark the
///    boundary pieces.
/// 8. Attach stop, indicator and start to the first leaf.
/// 9. Bookend: attach the next specifier to the last leaf, without its
///    start when this one had a bookended start, when it is compound, or
///    on the final piece.
/// 10. Otherwise the final piece closes the span on its last leaf.
///
/// # Errors
/// - [`SostenutoError::SelectionError`] when there are no pieces, a piece is
///   empty, names an unknown leaf or mixes voices, or pieces are out of
///   time order
/// - any error from attaching or tagging, unmodified
pub fn iterate_pieces(
    score: &mut Score,
    pieces: &[Piece],
    specifiers: &[Specifier],
    options: &PiecewiseOptions,
    runtime: &Runtime,
) -> Result<Vec<Wrapper>, SostenutoError> {
    validate_pieces(score, pieces)?;
    if specifiers.is_empty() {
        return Ok(Vec::new());
    }
    let total = pieces.len();
    let hairpin_family = specifiers[0].family() == SpannerFamily::Hairpin;
    let attacher = Attacher {
        options,
        runtime,
        total,
    };

    let mut just_backstole_right_text = false;
    let mut just_bookended_leaf: Option<LeafId> = None;
    let mut previous_had_bookend = false;
    let mut wrappers = Vec::new();

    for (i, piece) in pieces.iter().enumerate() {
        let (Some(start_leaf), Some(stop_leaf)) = (piece.first(), piece.last()) else {
            continue;
        };
        let is_first_piece = i == 0;
        let is_penultimate_piece = i + 2 == total;
        let is_final_piece = i + 1 == total;

        let mut specifier = cyclic(specifiers, i).clone();
        let next_specifier = cyclic(specifiers, i + 1);

        let mut should_bookend =
            options.bookend.matches(i, total) && !piece.is_single_leaf() && piece.len() > 1;
        if is_final_piece && options.right_broken && !specifier.starts_text_span() {
            should_bookend = false;
        }
        if is_final_piece && options.do_not_start_spanner_on_final_piece {
            should_bookend = false;
        }

        if is_final_piece && just_backstole_right_text {
            specifier = specifier.without_spanner_start();
        }

        let has_bookended_start = specifier.bookended_spanner_start().is_some();
        if should_bookend && has_bookended_start {
            specifier = specifier.with_bookended_start_promoted();
        }

        if is_penultimate_piece && has_bookended_start && next_specifier.starts_text_span() {
            let final_piece = &pieces[total - 1];
            if final_piece.len() == 1 || options.do_not_start_spanner_on_final_piece {
                specifier = specifier.with_bookended_start_promoted();
                just_backstole_right_text = true;
            }
        }

        if piece.len() == 1 && specifier.is_compound() && options.remove_length_1_spanner_start {
            specifier = specifier.without_spanner_start();
        }

        if is_final_piece
            && specifier.spanner_start().is_some()
            && options.do_not_start_spanner_on_final_piece
        {
            specifier = specifier.without_spanner_start();
        }

        let mut tag = attacher.site_tag(1)?;
        if is_first_piece || (!hairpin_family && previous_had_bookend) {
            specifier = specifier.without_spanner_stop();
        }
        if is_first_piece && options.left_broken {
            tag = tag.append(LEFT_BROKEN)?;
        }
        if is_final_piece && options.right_broken {
            tag = tag.append(RIGHT_BROKEN)?;
        }

        debug!(
            "piece {}/{}: leaves {}..{} bookend={} backstole={}",
            i + 1,
            total,
            start_leaf,
            stop_leaf,
            should_bookend,
            just_backstole_right_text
        );

        let only_trends = hairpin_family && just_bookended_leaf == Some(start_leaf);
        wrappers.extend(attacher.attach(score, &specifier, start_leaf, i, &tag, only_trends)?);

        if should_bookend {
            let mut bookend = next_specifier.clone();
            if has_bookended_start || bookend.is_compound() || is_final_piece {
                bookend = bookend.without_spanner_start();
            }
            let tag = attacher.site_tag(2)?;
            wrappers.extend(attacher.attach(score, &bookend, stop_leaf, i, &tag, false)?);
            just_bookended_leaf = Some(stop_leaf);
        } else if is_final_piece && !just_backstole_right_text {
            if let Some(stop) = next_specifier.spanner_stop() {
                if start_leaf != stop_leaf || options.leak_spanner_stop {
                    let stop = if options.leak_spanner_stop {
                        stop.clone().leaked()
                    } else {
                        stop.clone()
                    };
                    let mut tag = attacher.site_tag(3)?;
                    if options.right_broken {
                        tag = tag.append(RIGHT_BROKEN)?;
                    }
                    wrappers.push(attach_indicator(score, stop_leaf, stop, tag, runtime)?);
                }
            }
        }
        previous_had_bookend = should_bookend;
    }
    Ok(wrappers)
}
