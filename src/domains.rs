//! The domain store: the live set of candidate words for every slot.
//!
//! Each slot keeps its candidate list in a fixed order and records removals as eliminations
//! rather than deleting entries. An elimination remembers which slot's commitment caused it, so
//! when the search retracts that commitment it can restore exactly the candidates it pruned.
//! Node consistency is the one exception: words of the wrong length are dropped outright, since
//! they can never fit no matter what else is assigned.

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashMap;
use std::fmt;
use std::fmt::{Debug, Formatter};

use crate::grid_config::{GridConfig, SlotId};
use crate::types::{GlyphId, WordId};
use crate::util::{build_glyph_counts_by_cell, GlyphCountsByCell};
use crate::CHECK_INVARIANTS;

/// A struct tracking the live state of a single slot's domain.
#[derive(Clone)]
pub struct SlotDomain {
    /// Properties duplicated from `SlotConfig` for convenience.
    id: SlotId,
    length: usize,

    /// Every candidate this slot started with (after node consistency), in the order values
    /// should be tried when nothing else distinguishes them.
    options: Vec<WordId>,

    /// The inverse of `options`.
    option_idx_by_word: HashMap<WordId, usize>,

    /// Record of which options have been eliminated, indexed like `options`:
    /// * `Some(Some(id))` means "this option has been eliminated because of the commitment in
    ///   slot `id`"
    /// * `Some(None)` means "this option has been eliminated regardless of any commitments"
    /// * `None` means "this option is still live"
    eliminations: Vec<Option<Option<SlotId>>>,

    /// Count of each glyph in each cell over the live options, so that crossing slots can be
    /// checked for support in constant time.
    glyph_counts_by_cell: GlyphCountsByCell,

    /// How many options are still live.
    remaining_option_count: usize,
}

impl Debug for SlotDomain {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotDomain")
            .field("id", &self.id)
            .field("length", &self.length)
            .field("options", &self.options.len())
            .field("remaining_option_count", &self.remaining_option_count)
            .finish()
    }
}

impl SlotDomain {
    fn new(config: &GridConfig, id: SlotId, options: Vec<WordId>) -> SlotDomain {
        let length = config.slot_configs[id].length;
        let mut domain = SlotDomain {
            id,
            length,
            glyph_counts_by_cell: build_glyph_counts_by_cell(config.word_list, length, &options),
            option_idx_by_word: HashMap::new(),
            eliminations: vec![None; options.len()],
            remaining_option_count: options.len(),
            options,
        };
        domain.reindex();
        domain
    }

    fn reindex(&mut self) {
        self.option_idx_by_word = self
            .options
            .iter()
            .enumerate()
            .map(|(option_idx, &word_id)| (word_id, option_idx))
            .collect();
    }

    fn adjust_glyph_counts(&mut self, config: &GridConfig, word_id: WordId, added: bool) {
        let word = &config.word_list.words[word_id];
        // Words of the wrong length were never counted.
        if word.len() != self.length {
            return;
        }
        for (cell_idx, &glyph) in word.glyphs.iter().enumerate() {
            if added {
                self.glyph_counts_by_cell[cell_idx][glyph] += 1;
            } else {
                self.glyph_counts_by_cell[cell_idx][glyph] -= 1;
            }
        }
    }

    /// Record that an option is unavailable, along with the slot responsible so that we can roll
    /// it back if that commitment is retracted.
    fn add_elimination(
        &mut self,
        config: &GridConfig,
        option_idx: usize,
        blamed_slot_id: Option<SlotId>,
    ) {
        if CHECK_INVARIANTS && self.eliminations[option_idx].is_some() {
            panic!("Eliminating an option twice in slot {}?", self.id);
        }

        self.eliminations[option_idx] = Some(blamed_slot_id);
        self.remaining_option_count -= 1;
        self.adjust_glyph_counts(config, self.options[option_idx], false);
    }

    /// Record that an option is live again.
    fn remove_elimination(&mut self, config: &GridConfig, option_idx: usize) {
        if CHECK_INVARIANTS && self.eliminations[option_idx].is_none() {
            panic!("Restoring a live option in slot {}?", self.id);
        }

        self.eliminations[option_idx] = None;
        self.remaining_option_count += 1;
        self.adjust_glyph_counts(config, self.options[option_idx], true);
    }

    /// Restore every option eliminated because of the commitment in the given slot.
    fn clear_eliminations(&mut self, config: &GridConfig, slot_id: SlotId) {
        for option_idx in 0..self.options.len() {
            if self.eliminations[option_idx] == Some(Some(slot_id)) {
                self.remove_elimination(config, option_idx);
            }
        }
    }
}

/// Mutable mapping from each slot to its current candidate set.
#[derive(Debug, Clone)]
pub struct DomainStore {
    slots: Vec<SlotDomain>,
}

impl DomainStore {
    /// Seed every slot's domain with the whole vocabulary.
    #[must_use]
    pub fn new(config: &GridConfig) -> DomainStore {
        let vocabulary: Vec<WordId> = (0..config.word_list.len()).collect();

        DomainStore {
            slots: (0..config.slot_count())
                .map(|slot_id| SlotDomain::new(config, slot_id, vocabulary.clone()))
                .collect(),
        }
    }

    /// Permanently remove every candidate whose length differs from its slot's length. Returns
    /// the number of candidates removed across all slots.
    pub fn enforce_node_consistency(&mut self, config: &GridConfig) -> usize {
        let mut removed = 0;

        for slot in &mut self.slots {
            let before = slot.options.len();
            let length = slot.length;

            let (options, eliminations): (Vec<WordId>, Vec<Option<Option<SlotId>>>) = slot
                .options
                .iter()
                .copied()
                .zip(slot.eliminations.iter().copied())
                .filter(|&(word_id, _)| config.word_list.words[word_id].len() == length)
                .unzip();

            slot.remaining_option_count = eliminations.iter().filter(|e| e.is_none()).count();
            slot.options = options;
            slot.eliminations = eliminations;
            slot.reindex();

            removed += before - slot.options.len();
        }

        removed
    }

    /// Shuffle the order each slot's options are offered in, which changes how the search breaks
    /// ties between equally-constraining values.
    pub fn shuffle_options<R: Rng>(&mut self, rng: &mut R) {
        for slot in &mut self.slots {
            let mut pairs: Vec<(WordId, Option<Option<SlotId>>)> = slot
                .options
                .iter()
                .copied()
                .zip(slot.eliminations.iter().copied())
                .collect();
            pairs.shuffle(rng);

            let (options, eliminations): (Vec<WordId>, Vec<Option<Option<SlotId>>>) =
                pairs.into_iter().unzip();
            slot.options = options;
            slot.eliminations = eliminations;
            slot.reindex();
        }
    }

    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// How many candidates are still live for this slot?
    #[must_use]
    pub fn option_count(&self, slot_id: SlotId) -> usize {
        self.slots[slot_id].remaining_option_count
    }

    /// Is this word still a candidate for this slot?
    #[must_use]
    pub fn is_live(&self, slot_id: SlotId, word_id: WordId) -> bool {
        let slot = &self.slots[slot_id];
        slot.option_idx_by_word
            .get(&word_id)
            .map_or(false, |&option_idx| slot.eliminations[option_idx].is_none())
    }

    /// The live candidates for this slot, in option order.
    pub fn live_options(&self, slot_id: SlotId) -> impl Iterator<Item = WordId> + '_ {
        let slot = &self.slots[slot_id];
        slot.options
            .iter()
            .zip(&slot.eliminations)
            .filter(|(_, elimination)| elimination.is_none())
            .map(|(&word_id, _)| word_id)
    }

    /// How many live candidates for this slot have the given glyph in the given cell?
    #[must_use]
    pub fn glyph_count(&self, slot_id: SlotId, cell_idx: usize, glyph: GlyphId) -> u32 {
        self.slots[slot_id].glyph_counts_by_cell[cell_idx][glyph]
    }

    /// Remove a word from a slot's domain, blaming the given slot's commitment (or nothing, for a
    /// permanent removal). Returns false if the word wasn't live to begin with.
    pub fn eliminate(
        &mut self,
        config: &GridConfig,
        slot_id: SlotId,
        word_id: WordId,
        blamed_slot_id: Option<SlotId>,
    ) -> bool {
        let slot = &mut self.slots[slot_id];
        match slot.option_idx_by_word.get(&word_id) {
            Some(&option_idx) if slot.eliminations[option_idx].is_none() => {
                slot.add_elimination(config, option_idx, blamed_slot_id);
                true
            }
            _ => false,
        }
    }

    /// Undo every elimination that was blamed on the given slot's commitment.
    pub fn clear_eliminations(&mut self, config: &GridConfig, blamed_slot_id: SlotId) {
        for slot in &mut self.slots {
            slot.clear_eliminations(config, blamed_slot_id);
        }
    }

    /// The first slot whose domain is empty, if any.
    #[must_use]
    pub fn empty_slot(&self) -> Option<SlotId> {
        self.slots
            .iter()
            .find(|slot| slot.remaining_option_count == 0)
            .map(|slot| slot.id)
    }

    /// The live candidates for this slot as normalized strings.
    #[must_use]
    pub fn words<'a>(&self, config: &GridConfig<'a>, slot_id: SlotId) -> Vec<&'a str> {
        self.live_options(slot_id)
            .map(|word_id| config.word_list.words[word_id].normalized_string.as_str())
            .collect()
    }
}
