//! This module contains a crossword-specific implementation of the AC-3 algorithm for establishing
//! and maintaining arc consistency. An arc `(x, y)` is a directed pair of crossing slots, and it's
//! consistent when every word still available for `x` has at least one word available for `y`
//! that agrees on the shared cell. For example, if 1D doesn't have any options starting with the
//! letter A, we want to remove any options for 1A that start with the letter A.
//!
//! Instead of comparing words pairwise, we look at the glyph counts the domain store keeps for
//! each cell: a word for `x` is supported exactly when `y` has a non-zero count for the word's
//! glyph in the crossing cell.

use log::trace;
use std::collections::{HashSet, VecDeque};

use crate::domains::DomainStore;
use crate::grid_config::{GridConfig, SlotId};
use crate::types::WordId;

/// A directed constraint between two crossing slots: `(x, y)` is revised by pruning `x`.
pub type Arc = (SlotId, SlotId);

/// Result from a successful call to `enforce_arc_consistency`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArcConsistencySuccess {
    /// How many arcs were revised before the worklist emptied.
    pub revisions: usize,

    /// How many words were eliminated across all slots.
    pub eliminations: usize,
}

/// Result from a failed call to `enforce_arc_consistency`, identifying the slot whose domain was
/// wiped out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArcConsistencyFailure {
    pub wiped_out_slot_id: SlotId,
}

/// Result from a call to `enforce_arc_consistency`.
pub type ArcConsistencyResult = Result<ArcConsistencySuccess, ArcConsistencyFailure>;

/// Make `x` arc consistent with `y` by eliminating every word for `x` that has no compatible word
/// left for `y`, blaming the given slot's commitment for the eliminations. Returns whether
/// anything was removed. Slots that don't cross are trivially consistent.
pub fn revise(
    config: &GridConfig,
    domains: &mut DomainStore,
    x: SlotId,
    y: SlotId,
    blamed_slot_id: Option<SlotId>,
) -> bool {
    let Some((x_cell, y_cell)) = config.overlap(x, y) else {
        return false;
    };

    let unsupported: Vec<WordId> = domains
        .live_options(x)
        .filter(|&word_id| {
            let glyph = config.word_list.words[word_id].glyphs[x_cell];
            domains.glyph_count(y, y_cell, glyph) == 0
        })
        .collect();

    for &word_id in &unsupported {
        domains.eliminate(config, x, word_id, blamed_slot_id);
    }

    !unsupported.is_empty()
}

/// Run AC-3 until the worklist is empty. If `initial_arcs` is `None` we start from every arc in
/// the grid; otherwise only from the given ones, which is enough when the grid was previously
/// consistent and only the slots those arcs point at have changed since.
///
/// Every elimination is blamed on `blamed_slot_id` so the search can undo it later; `None` makes
/// the eliminations permanent.
pub fn enforce_arc_consistency(
    config: &GridConfig,
    domains: &mut DomainStore,
    initial_arcs: Option<Vec<Arc>>,
    blamed_slot_id: Option<SlotId>,
) -> ArcConsistencyResult {
    let mut queue: VecDeque<Arc> = match initial_arcs {
        Some(arcs) => arcs.into(),
        None => {
            let mut arcs = VecDeque::new();
            for x in 0..config.slot_count() {
                for y in config.neighbors(x) {
                    arcs.push_back((x, y));
                }
            }
            arcs
        }
    };

    // Track what's queued so the same arc isn't waiting in line twice.
    let mut queued: HashSet<Arc> = queue.iter().copied().collect();
    let mut success = ArcConsistencySuccess::default();

    while let Some((x, y)) = queue.pop_front() {
        queued.remove(&(x, y));
        success.revisions += 1;

        let before = domains.option_count(x);
        if !revise(config, domains, x, y, blamed_slot_id) {
            continue;
        }
        success.eliminations += before - domains.option_count(x);

        if domains.option_count(x) == 0 {
            trace!("domain wipeout in slot {} while revising against {}", x, y);
            return Err(ArcConsistencyFailure {
                wiped_out_slot_id: x,
            });
        }

        for neighbor in config.neighbors(x) {
            if neighbor != y && queued.insert((neighbor, x)) {
                queue.push_back((neighbor, x));
            }
        }
    }

    Ok(success)
}

#[cfg(test)]
mod tests {
    use crate::arc_consistency::{enforce_arc_consistency, revise, ArcConsistencyFailure};
    use crate::domains::DomainStore;
    use crate::grid_config::tests::structure0;
    use crate::grid_config::{generate_grid_config, Direction, OwnedGridConfig, SlotSpec};
    use crate::word_list::WordList;

    /// A 3-letter across slot whose last cell is the first cell of a 3-letter down slot.
    fn corner_config(words: &[&str]) -> OwnedGridConfig {
        generate_grid_config(
            WordList::from_words(words),
            &[
                SlotSpec {
                    start_cell: (0, 0),
                    direction: Direction::Across,
                    length: 3,
                },
                SlotSpec {
                    start_cell: (0, 2),
                    direction: Direction::Down,
                    length: 3,
                },
            ],
            3,
            3,
        )
        .unwrap()
    }

    fn node_consistent_domains(grid_config: &OwnedGridConfig) -> DomainStore {
        let config = grid_config.to_config_ref();
        let mut domains = DomainStore::new(&config);
        domains.enforce_node_consistency(&config);
        domains
    }

    #[test]
    fn test_revise_removes_unsupported_words() {
        let grid_config = corner_config(&["CAT", "CAR", "ART", "ARM", "RAT"]);
        let config = grid_config.to_config_ref();
        let mut domains = node_consistent_domains(&grid_config);

        // Down words start with C, A or R, so only CAR can go across.
        assert!(revise(&config, &mut domains, 0, 1, None));
        assert_eq!(domains.words(&config, 0), vec!["CAR"]);

        // Nothing left to remove the second time around.
        assert!(!revise(&config, &mut domains, 0, 1, None));

        assert!(revise(&config, &mut domains, 1, 0, None));
        assert_eq!(domains.words(&config, 1), vec!["RAT"]);
    }

    #[test]
    fn test_revise_ignores_slots_that_dont_cross() {
        let grid_config = structure0();
        let config = grid_config.to_config_ref();
        let mut domains = node_consistent_domains(&grid_config);

        // The two across slots never meet.
        assert_eq!(config.overlap(0, 1), None);
        assert!(!revise(&config, &mut domains, 0, 1, None));
        assert_eq!(domains.option_count(0), 4);
    }

    #[test]
    fn test_enforce_arc_consistency_for_structure() {
        let grid_config = structure0();
        let config = grid_config.to_config_ref();
        let mut domains = node_consistent_domains(&grid_config);

        let success = enforce_arc_consistency(&config, &mut domains, None, None)
            .expect("Failed to establish consistency");

        assert_eq!(domains.words(&config, 0), vec!["SIX"]);
        assert_eq!(domains.words(&config, 1), vec!["NINE"]);
        assert_eq!(domains.words(&config, 2), vec!["SEVEN"]);
        // Arc consistency alone says nothing about reusing NINE.
        assert_eq!(domains.words(&config, 3), vec!["FIVE", "NINE"]);
        assert_eq!(success.eliminations, 13 - 5);

        // Every remaining word has support across each of its crossings.
        for x in 0..config.slot_count() {
            for y in config.neighbors(x) {
                let (x_cell, y_cell) = config.overlap(x, y).unwrap();
                for word_id in domains.live_options(x) {
                    let glyph = config.word_list.words[word_id].glyphs[x_cell];
                    assert!(domains
                        .live_options(y)
                        .any(|other| config.word_list.words[other].glyphs[y_cell] == glyph));
                }
            }
        }
    }

    #[test]
    fn test_enforce_arc_consistency_reports_wipeout() {
        let grid_config = corner_config(&["CAT", "CAR", "ART", "ARM"]);
        let config = grid_config.to_config_ref();
        let mut domains = node_consistent_domains(&grid_config);

        assert_eq!(
            enforce_arc_consistency(&config, &mut domains, None, None),
            Err(ArcConsistencyFailure {
                wiped_out_slot_id: 0
            })
        );
    }

    #[test]
    fn test_blamed_eliminations_can_be_undone() {
        let grid_config = corner_config(&["CAT", "CAR", "ART", "ARM", "RAT"]);
        let config = grid_config.to_config_ref();
        let mut domains = node_consistent_domains(&grid_config);

        enforce_arc_consistency(&config, &mut domains, Some(vec![(0, 1), (1, 0)]), Some(1))
            .unwrap();
        assert_eq!(domains.option_count(0), 1);
        assert_eq!(domains.option_count(1), 1);

        domains.clear_eliminations(&config, 1);
        assert_eq!(domains.option_count(0), 5);
        assert_eq!(domains.option_count(1), 5);
    }

    #[test]
    fn test_empty_worklist_is_a_no_op() {
        let grid_config = structure0();
        let config = grid_config.to_config_ref();
        let mut domains = node_consistent_domains(&grid_config);

        let success = enforce_arc_consistency(&config, &mut domains, Some(vec![]), None).unwrap();
        assert_eq!(success.revisions, 0);
        assert_eq!(success.eliminations, 0);
        assert_eq!(domains.option_count(0), 4);
    }
}
