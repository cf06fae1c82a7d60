//! This module implements grid-filling using a recursive backtracking search that maintains arc
//! consistency as it goes. Slots are chosen with the minimum-remaining-values heuristic (ties
//! broken by degree, then by slot id) and words are tried in least-constraining-value order.
//!
//! Every pruning made while a slot is committed is blamed on that slot in the domain store, so
//! retracting the commitment restores the domains exactly. When a word fails for a slot we also
//! record that it's unavailable (blamed on the parent commitment, since the failure was proven
//! under it) and propagate that before trying the next word.

use log::{debug, trace};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::cmp::Reverse;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::arc_consistency::{enforce_arc_consistency, Arc, ArcConsistencyResult};
use crate::assignment::{is_complete, is_consistent, is_consistent_with, Assignment};
use crate::domains::DomainStore;
use crate::grid_config::{Choice, GridConfig, SlotId};
use crate::types::WordId;
use crate::CHECK_INVARIANTS;

/// How many states should we visit between checks of the deadline and the abort flag?
pub const INTERRUPT_FREQUENCY: usize = 10;

/// A struct tracking stats about the filling process.
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    /// Number of calls to the recursive search, including the root.
    pub states: usize,
    /// Number of commitments that had to be retracted.
    pub backtracks: usize,
    /// Number of arcs revised, including the initial pass.
    pub revisions: usize,
    /// Number of words eliminated by arc consistency, including the initial pass.
    pub eliminations: usize,
    pub total_time: Duration,
    pub initial_arc_consistency_time: Duration,
    pub search_time: Duration,
}

/// Limits and knobs for a fill attempt.
#[derive(Debug, Clone, Default)]
pub struct FillOptions {
    /// Give up once this much time has passed.
    pub timeout: Option<Duration>,

    /// Give up after visiting more than this many search states.
    pub max_states: Option<usize>,

    /// If given, shuffle each slot's options with this seed before searching, so that ties
    /// between equally-constraining words are broken differently.
    pub rng_seed: Option<u64>,
}

/// A struct representing the results of a fill operation.
#[derive(Debug)]
pub struct FillSuccess {
    pub statistics: Statistics,
    pub assignment: Assignment,
}

impl FillSuccess {
    #[must_use]
    pub fn choices(&self) -> Vec<Choice> {
        self.assignment.choices()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FillFailure {
    #[error("No solution.")]
    NoSolution,
    #[error("Timed out before finding a fill")]
    Timeout,
    #[error("Gave up after {0} states")]
    ExceededStateLimit(usize),
    #[error("Fill was aborted")]
    Abort,
}

/// The mutable state of a single search, threaded through the recursion.
struct Search<'a> {
    config: &'a GridConfig<'a>,
    domains: DomainStore,
    assignment: Assignment,
    statistics: &'a mut Statistics,
    deadline: Option<Instant>,
    max_states: Option<usize>,
}

impl<'a> Search<'a> {
    /// Bail out if we've used up our state budget, passed the deadline, or been asked to stop.
    fn check_interrupts(&self) -> Result<(), FillFailure> {
        let states = self.statistics.states;

        if let Some(max_states) = self.max_states {
            if states > max_states {
                return Err(FillFailure::ExceededStateLimit(states));
            }
        }

        if (states - 1) % INTERRUPT_FREQUENCY == 0 {
            if let Some(deadline) = self.deadline {
                if Instant::now() >= deadline {
                    return Err(FillFailure::Timeout);
                }
            }
            if let Some(abort) = self.config.abort {
                if abort.load(Ordering::Relaxed) {
                    return Err(FillFailure::Abort);
                }
            }
        }

        Ok(())
    }

    /// Choose the unassigned slot with the fewest live options, preferring slots that cross more
    /// others, then lower ids.
    fn select_unassigned_slot(&self) -> Option<SlotId> {
        (0..self.config.slot_count())
            .filter(|&slot_id| !self.assignment.is_assigned(slot_id))
            .min_by_key(|&slot_id| {
                (
                    self.domains.option_count(slot_id),
                    Reverse(self.config.degree(slot_id)),
                    slot_id,
                )
            })
    }

    /// How many options would choosing this word rule out in the crossing slots?
    fn count_ruled_out(&self, slot_id: SlotId, word_id: WordId) -> usize {
        let word = &self.config.word_list.words[word_id];

        self.config.slot_configs[slot_id]
            .crossings
            .iter()
            .enumerate()
            .filter_map(|(cell_idx, crossing)| crossing.as_ref().map(|c| (cell_idx, c)))
            .map(|(cell_idx, crossing)| {
                let other_slot_id = crossing.other_slot_id;
                let compatible = self.domains.glyph_count(
                    other_slot_id,
                    crossing.other_slot_cell,
                    word.glyphs[cell_idx],
                ) as usize;
                self.domains.option_count(other_slot_id) - compatible
            })
            .sum()
    }

    /// The live options for a slot, least constraining first. The sort is stable, so words that
    /// rule out the same number of options keep their domain order.
    fn order_domain_values(&self, slot_id: SlotId) -> Vec<WordId> {
        let mut candidates: Vec<WordId> = self.domains.live_options(slot_id).collect();
        candidates.sort_by_cached_key(|&word_id| self.count_ruled_out(slot_id, word_id));
        candidates
    }

    fn record_arc_consistency(&mut self, result: &ArcConsistencyResult) {
        if let Ok(success) = result {
            self.statistics.revisions += success.revisions;
            self.statistics.eliminations += success.eliminations;
        }
    }

    /// Arcs pointing at the given slot from each of its neighbors.
    fn incoming_arcs(&self, slot_id: SlotId) -> Vec<Arc> {
        self.config
            .neighbors(slot_id)
            .map(|neighbor| (neighbor, slot_id))
            .collect()
    }

    /// Narrow the domains to reflect `slot_id = word_id`: fix the slot's own domain, take the word
    /// away from every other unassigned slot, and restore arc consistency. All of it is blamed on
    /// `slot_id`. Returns false if some domain was wiped out.
    fn propagate_choice(&mut self, slot_id: SlotId, word_id: WordId) -> bool {
        let config = self.config;

        let others: Vec<WordId> = self
            .domains
            .live_options(slot_id)
            .filter(|&other| other != word_id)
            .collect();
        for other in others {
            self.domains.eliminate(config, slot_id, other, Some(slot_id));
        }

        let mut arcs = self.incoming_arcs(slot_id);

        // No word may appear twice in a fill.
        for other_slot_id in 0..config.slot_count() {
            if other_slot_id == slot_id || self.assignment.is_assigned(other_slot_id) {
                continue;
            }
            if self
                .domains
                .eliminate(config, other_slot_id, word_id, Some(slot_id))
            {
                if self.domains.option_count(other_slot_id) == 0 {
                    trace!("{} is the last option for slot {}", word_id, other_slot_id);
                    return false;
                }
                arcs.extend(self.incoming_arcs(other_slot_id));
            }
        }

        let result = enforce_arc_consistency(config, &mut self.domains, Some(arcs), Some(slot_id));
        self.record_arc_consistency(&result);
        result.is_ok()
    }

    /// Record that `slot_id = word_id` is impossible under the parent's commitment and propagate
    /// that. Returns false if doing so wipes out a domain, meaning the parent's commitment is
    /// itself impossible.
    fn propagate_elimination(
        &mut self,
        slot_id: SlotId,
        word_id: WordId,
        parent_slot_id: Option<SlotId>,
    ) -> bool {
        let config = self.config;

        self.domains
            .eliminate(config, slot_id, word_id, parent_slot_id);
        if self.domains.option_count(slot_id) == 0 {
            return false;
        }

        let arcs = self.incoming_arcs(slot_id);
        let result = enforce_arc_consistency(config, &mut self.domains, Some(arcs), parent_slot_id);
        self.record_arc_consistency(&result);
        result.is_ok()
    }

    /// Try to extend the current assignment into a complete one. Returns `Ok(true)` once the
    /// assignment is complete, `Ok(false)` if no extension exists under the current commitments,
    /// and an error if we ran out of budget along the way.
    fn backtrack(&mut self, parent_slot_id: Option<SlotId>) -> Result<bool, FillFailure> {
        self.statistics.states += 1;
        self.check_interrupts()?;

        if is_complete(self.config, &self.assignment) {
            return Ok(true);
        }

        let Some(slot_id) = self.select_unassigned_slot() else {
            return Ok(false);
        };

        for word_id in self.order_domain_values(slot_id) {
            // An earlier failed candidate may have pruned this one since we ordered the list.
            if !self.domains.is_live(slot_id, word_id) {
                continue;
            }
            if !is_consistent_with(self.config, &self.assignment, slot_id, word_id) {
                continue;
            }

            trace!(
                "trying {} for slot {} ({} options)",
                self.config.word_list.words[word_id].normalized_string,
                self.config.slot_configs[slot_id].slot_key(),
                self.domains.option_count(slot_id),
            );

            self.assignment.assign(slot_id, word_id);

            if self.propagate_choice(slot_id, word_id) && self.backtrack(Some(slot_id))? {
                return Ok(true);
            }

            self.assignment.unassign(slot_id);
            self.domains.clear_eliminations(self.config, slot_id);
            self.statistics.backtracks += 1;

            if !self.propagate_elimination(slot_id, word_id, parent_slot_id) {
                return Ok(false);
            }
        }

        Ok(false)
    }
}

/// Search for a valid fill for the given grid, recording what happened in `statistics` whether or
/// not we succeed.
pub fn find_fill_with_statistics(
    config: &GridConfig,
    options: &FillOptions,
    statistics: &mut Statistics,
) -> Result<Assignment, FillFailure> {
    let start = Instant::now();
    let deadline = options.timeout.map(|timeout| start + timeout);

    let mut domains = DomainStore::new(config);
    let removed = domains.enforce_node_consistency(config);
    debug!("node consistency removed {} options", removed);

    if let Some(seed) = options.rng_seed {
        domains.shuffle_options(&mut SmallRng::seed_from_u64(seed));
    }

    if let Some(slot_id) = domains.empty_slot() {
        debug!(
            "no words fit slot {}",
            config.slot_configs[slot_id].slot_key()
        );
        statistics.total_time = start.elapsed();
        return Err(FillFailure::NoSolution);
    }

    let arc_consistency_start = Instant::now();
    let result = enforce_arc_consistency(config, &mut domains, None, None);
    statistics.initial_arc_consistency_time = arc_consistency_start.elapsed();

    match result {
        Ok(success) => {
            debug!(
                "initial arc consistency: {} revisions, {} eliminations",
                success.revisions, success.eliminations
            );
            statistics.revisions += success.revisions;
            statistics.eliminations += success.eliminations;
        }
        Err(failure) => {
            debug!(
                "initial arc consistency wiped out slot {}",
                config.slot_configs[failure.wiped_out_slot_id].slot_key()
            );
            statistics.total_time = start.elapsed();
            return Err(FillFailure::NoSolution);
        }
    }

    let search_start = Instant::now();
    let mut search = Search {
        config,
        domains,
        assignment: Assignment::new(config.slot_count()),
        statistics: &mut *statistics,
        deadline,
        max_states: options.max_states,
    };
    let outcome = search.backtrack(None);
    let assignment = search.assignment;

    statistics.search_time = search_start.elapsed();
    statistics.total_time = start.elapsed();
    debug!("search finished: {:?}", statistics);

    match outcome {
        Ok(true) => {
            if CHECK_INVARIANTS
                && !(is_complete(config, &assignment) && is_consistent(config, &assignment))
            {
                panic!("Search produced an invalid fill: {:?}", assignment);
            }
            Ok(assignment)
        }
        Ok(false) => Err(FillFailure::NoSolution),
        Err(failure) => Err(failure),
    }
}

/// Search for a valid fill for the given grid within the given limits.
pub fn find_fill(config: &GridConfig, options: &FillOptions) -> Result<FillSuccess, FillFailure> {
    let mut statistics = Statistics::default();
    let assignment = find_fill_with_statistics(config, options, &mut statistics)?;

    Ok(FillSuccess {
        statistics,
        assignment,
    })
}

/// Search without limits, returning a complete assignment if the grid can be filled at all.
#[must_use]
pub fn solve(config: &GridConfig) -> Option<Assignment> {
    find_fill(config, &FillOptions::default())
        .ok()
        .map(|success| success.assignment)
}
