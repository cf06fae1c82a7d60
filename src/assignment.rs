//! Assignments of words to slots, and the checks that decide whether an assignment is a valid
//! (partial) fill: words pairwise distinct, lengths matching, and letters agreeing at every
//! crossing between two assigned slots.

use std::collections::HashSet;

use crate::grid_config::{Choice, GridConfig, SlotId, SlotSpec};
use crate::types::WordId;

/// A partial or complete mapping from slots to chosen words, indexed by `SlotId`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    words: Vec<Option<WordId>>,
}

impl Assignment {
    #[must_use]
    pub fn new(slot_count: usize) -> Assignment {
        Assignment {
            words: vec![None; slot_count],
        }
    }

    #[must_use]
    pub fn get(&self, slot_id: SlotId) -> Option<WordId> {
        self.words[slot_id]
    }

    pub fn assign(&mut self, slot_id: SlotId, word_id: WordId) {
        self.words[slot_id] = Some(word_id);
    }

    pub fn unassign(&mut self, slot_id: SlotId) -> Option<WordId> {
        self.words[slot_id].take()
    }

    #[must_use]
    pub fn is_assigned(&self, slot_id: SlotId) -> bool {
        self.words[slot_id].is_some()
    }

    #[must_use]
    pub fn assigned_count(&self) -> usize {
        self.words.iter().flatten().count()
    }

    /// Iterate over `(slot, word)` pairs for the assigned slots.
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, WordId)> + '_ {
        self.words
            .iter()
            .enumerate()
            .filter_map(|(slot_id, word_id)| word_id.map(|word_id| (slot_id, word_id)))
    }

    #[must_use]
    pub fn choices(&self) -> Vec<Choice> {
        self.iter()
            .map(|(slot_id, word_id)| Choice { slot_id, word_id })
            .collect()
    }

    /// Resolve the assignment into slot specs and normalized word strings.
    #[must_use]
    pub fn to_strings(&self, config: &GridConfig) -> Vec<(SlotSpec, String)> {
        self.iter()
            .map(|(slot_id, word_id)| {
                (
                    config.slot_configs[slot_id].slot_spec(),
                    config.word_list.words[word_id].normalized_string.clone(),
                )
            })
            .collect()
    }
}

/// Check the whole assignment: every word fits its slot, no word is used twice, and every pair of
/// assigned crossing slots agrees on the shared letter.
#[must_use]
pub fn is_consistent(config: &GridConfig, assignment: &Assignment) -> bool {
    let mut seen_words: HashSet<WordId> = HashSet::new();

    for (slot_id, word_id) in assignment.iter() {
        if !seen_words.insert(word_id) {
            return false;
        }

        let word = &config.word_list.words[word_id];
        if word.len() != config.slot_configs[slot_id].length {
            return false;
        }

        for other_slot_id in config.neighbors(slot_id) {
            let Some(other_word_id) = assignment.get(other_slot_id) else {
                continue;
            };
            let Some((cell, other_cell)) = config.overlap(slot_id, other_slot_id) else {
                continue;
            };
            let other_word = &config.word_list.words[other_word_id];
            if other_word.glyphs.get(other_cell) != word.glyphs.get(cell) {
                return false;
            }
        }
    }

    true
}

/// Would the assignment stay consistent if `slot_id` were set to `word_id`? Assumes the existing
/// assignment is consistent, so only the new slot is checked against the others.
#[must_use]
pub fn is_consistent_with(
    config: &GridConfig,
    assignment: &Assignment,
    slot_id: SlotId,
    word_id: WordId,
) -> bool {
    let word = &config.word_list.words[word_id];
    if word.len() != config.slot_configs[slot_id].length {
        return false;
    }

    if assignment
        .iter()
        .any(|(other_slot_id, other_word_id)| other_slot_id != slot_id && other_word_id == word_id)
    {
        return false;
    }

    config.slot_configs[slot_id]
        .crossings
        .iter()
        .enumerate()
        .all(|(cell_idx, crossing)| {
            let Some(crossing) = crossing else {
                return true;
            };
            assignment
                .get(crossing.other_slot_id)
                .map_or(true, |other_word_id| {
                    config.word_list.words[other_word_id].glyphs[crossing.other_slot_cell]
                        == word.glyphs[cell_idx]
                })
        })
}

/// Is every slot assigned a non-empty word?
#[must_use]
pub fn is_complete(config: &GridConfig, assignment: &Assignment) -> bool {
    (0..config.slot_count()).all(|slot_id| {
        assignment
            .get(slot_id)
            .map_or(false, |word_id| !config.word_list.words[word_id].is_empty())
    })
}

#[cfg(test)]
mod tests {
    use crate::assignment::{is_complete, is_consistent, is_consistent_with, Assignment};
    use crate::grid_config::tests::structure0;

    #[test]
    fn test_consistency_checks() {
        let grid_config = structure0();
        let config = grid_config.to_config_ref();
        let word = |word: &str| config.word_list.word_id(word).unwrap();

        let mut assignment = Assignment::new(config.slot_count());
        assert!(is_consistent(&config, &assignment));
        assert!(!is_complete(&config, &assignment));

        // Slot 2 is the 5-letter down entry whose first letter is shared with slot 0.
        assert!(is_consistent_with(&config, &assignment, 2, word("SEVEN")));
        assignment.assign(2, word("SEVEN"));

        assert!(is_consistent_with(&config, &assignment, 0, word("SIX")));
        assert!(!is_consistent_with(&config, &assignment, 0, word("TEN")));
        assert!(!is_consistent_with(&config, &assignment, 0, word("NINE")));

        assignment.assign(0, word("TEN"));
        assert!(!is_consistent(&config, &assignment));
        assignment.assign(0, word("SIX"));
        assert!(is_consistent(&config, &assignment));

        assignment.assign(1, word("NINE"));
        assert!(!is_consistent_with(&config, &assignment, 3, word("NINE")));
        assert!(is_consistent_with(&config, &assignment, 3, word("FIVE")));
        assignment.assign(3, word("FIVE"));

        assert!(is_consistent(&config, &assignment));
        assert!(is_complete(&config, &assignment));
        assert_eq!(assignment.assigned_count(), 4);

        assignment.unassign(3);
        assert!(!is_complete(&config, &assignment));
    }

    #[test]
    fn test_rejects_duplicate_words() {
        let grid_config = structure0();
        let config = grid_config.to_config_ref();
        let five = config.word_list.word_id("FIVE").unwrap();

        // Slots 1 and 3 both take 4-letter words, and FIVE even agrees with itself at the crossing.
        let mut assignment = Assignment::new(config.slot_count());
        assignment.assign(3, five);
        assert!(!is_consistent_with(&config, &assignment, 1, five));

        assignment.assign(1, five);
        assert!(!is_consistent(&config, &assignment));
    }
}
