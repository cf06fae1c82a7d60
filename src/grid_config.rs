//! This module implements the structural model of a puzzle: the slots, their geometry, and the
//! crossings between them. It's built once per solve and is read-only afterwards.

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use thiserror::Error;

#[cfg(feature = "serde")]
use serde_derive::{Deserialize, Serialize};

#[cfg(feature = "serde")]
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::assignment::Assignment;
use crate::types::WordId;
use crate::word_list::WordList;

/// An identifier for the intersection between two slots; these correspond one-to-one with checked
/// squares in the grid.
pub type CrossingId = usize;

/// An identifier for a given slot, based on its index in the `GridConfig`'s `slot_configs` field.
pub type SlotId = usize;

/// Zero-indexed row and column for a cell in the grid, where row 0 is the top row.
pub type GridCoord = (usize, usize);

/// The direction that a slot is facing.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Direction {
    Across,
    Down,
}

/// A struct representing a crossing between one slot and another, referencing the other slot's id
/// and the location of the intersection within the other slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crossing {
    pub other_slot_id: SlotId,
    pub other_slot_cell: usize,
    pub crossing_id: CrossingId,
}

/// A violation of the structural model's contract. These are fatal for a solve: the search
/// assumes every slot is in bounds and that crossings are one cell between two slots.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridConfigError {
    #[error("slot {0} has zero length")]
    ZeroLengthSlot(String),

    #[error("slot {slot} extends outside the {width}x{height} grid")]
    OutOfBounds {
        slot: String,
        width: usize,
        height: usize,
    },

    #[error("more than two slots share cell ({0}, {1})")]
    TooManySlotsInCell(usize, usize),

    #[error("slots {0} and {1} run in the same direction but share a cell")]
    ParallelOverlap(String, String),

    #[error("grid template is empty")]
    EmptyTemplate,
}

/// A struct representing the aspects of a slot in the grid that are static during filling.
#[derive(Debug, Clone)]
pub struct SlotConfig {
    pub id: SlotId,
    pub start_cell: GridCoord,
    pub direction: Direction,
    pub length: usize,

    /// For each cell of the slot, the crossing slot (if any) and the cell's offset within it.
    /// This is the overlap table: every neighbor pair appears here exactly once per side.
    pub crossings: Vec<Option<Crossing>>,
}

impl SlotConfig {
    /// Generate the coords for each cell of this slot.
    #[must_use]
    pub fn cell_coords(&self) -> Vec<GridCoord> {
        self.slot_spec().cell_coords()
    }

    /// Generate a `SlotSpec` identifying this slot.
    #[must_use]
    pub fn slot_spec(&self) -> SlotSpec {
        SlotSpec {
            start_cell: self.start_cell,
            direction: self.direction,
            length: self.length,
        }
    }

    /// Generate a string key identifying this slot.
    #[must_use]
    pub fn slot_key(&self) -> String {
        self.slot_spec().to_key()
    }
}

/// A struct holding references to all of the information needed as input to a solve.
#[derive(Clone)]
pub struct GridConfig<'a> {
    /// The vocabulary used to seed every slot's domain; see `word_list.rs`.
    pub word_list: &'a WordList,

    /// Config representing all of the slots in the grid and their crossings.
    pub slot_configs: &'a [SlotConfig],

    /// The width and height of the grid.
    pub width: usize,
    pub height: usize,

    /// The number of distinct crossings represented in all of the `slot_configs`.
    pub crossing_count: usize,

    /// An optional atomic flag that can be set to signal that the fill operation should be canceled.
    pub abort: Option<&'a AtomicBool>,
}

impl<'a> GridConfig<'a> {
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slot_configs.len()
    }

    /// The pair of offsets `(i, j)` where slot `a`'s letter `i` must equal slot `b`'s letter `j`,
    /// or `None` if the slots don't cross.
    #[must_use]
    pub fn overlap(&self, a: SlotId, b: SlotId) -> Option<(usize, usize)> {
        self.slot_configs[a]
            .crossings
            .iter()
            .enumerate()
            .find_map(|(cell_idx, crossing)| match crossing {
                Some(crossing) if crossing.other_slot_id == b => {
                    Some((cell_idx, crossing.other_slot_cell))
                }
                _ => None,
            })
    }

    /// The slots crossing slot `a`, in cell order.
    pub fn neighbors(&self, a: SlotId) -> impl Iterator<Item = SlotId> + '_ {
        self.slot_configs[a]
            .crossings
            .iter()
            .flatten()
            .map(|crossing| crossing.other_slot_id)
    }

    /// How many slots cross slot `a`.
    #[must_use]
    pub fn degree(&self, a: SlotId) -> usize {
        self.slot_configs[a].crossings.iter().flatten().count()
    }
}

/// A struct that owns a copy of each piece of information needed by `GridConfig`.
pub struct OwnedGridConfig {
    pub word_list: WordList,
    pub slot_configs: Vec<SlotConfig>,
    pub width: usize,
    pub height: usize,
    pub crossing_count: usize,
    pub abort: Option<Arc<AtomicBool>>,
}

impl OwnedGridConfig {
    #[must_use]
    pub fn to_config_ref(&self) -> GridConfig {
        GridConfig {
            word_list: &self.word_list,
            slot_configs: &self.slot_configs,
            width: self.width,
            height: self.height,
            crossing_count: self.crossing_count,
            abort: self.abort.as_deref(),
        }
    }
}

/// A struct identifying a specific slot in the grid.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct SlotSpec {
    pub start_cell: GridCoord,
    pub direction: Direction,
    pub length: usize,
}

impl SlotSpec {
    /// Parse a string like "1,2,down,5" into a `SlotSpec` struct.
    pub fn from_key(key: &str) -> Result<SlotSpec, String> {
        let key_parts: Vec<&str> = key.split(',').collect();
        if key_parts.len() != 4 {
            return Err(format!("invalid slot key: {key}"));
        }

        let row: Result<usize, _> = key_parts[0].parse();
        let col: Result<usize, _> = key_parts[1].parse();
        let direction: Option<Direction> = match key_parts[2] {
            "across" => Some(Direction::Across),
            "down" => Some(Direction::Down),
            _ => None,
        };
        let length: Result<usize, _> = key_parts[3].parse();

        if let (Ok(row), Ok(col), Some(direction), Ok(length)) = (row, col, direction, length) {
            Ok(SlotSpec {
                start_cell: (row, col),
                direction,
                length,
            })
        } else {
            Err(format!("invalid slot key: {key:?}"))
        }
    }

    /// Represent this slot as a string like "1,2,down,5".
    #[must_use]
    pub fn to_key(&self) -> String {
        let direction = match self.direction {
            Direction::Across => "across",
            Direction::Down => "down",
        };
        format!(
            "{},{},{},{}",
            self.start_cell.0, self.start_cell.1, direction, self.length,
        )
    }

    /// Generate the coords for each cell of this entry.
    #[must_use]
    pub fn cell_coords(&self) -> Vec<GridCoord> {
        (0..self.length)
            .map(|cell_idx| match self.direction {
                Direction::Across => (self.start_cell.0, self.start_cell.1 + cell_idx),
                Direction::Down => (self.start_cell.0 + cell_idx, self.start_cell.1),
            })
            .collect()
    }
}

/// Serialize a `SlotSpec` into a string key.
#[cfg(feature = "serde")]
impl Serialize for SlotSpec {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_key())
    }
}

/// Deserialize a `SlotSpec` from a string key.
#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for SlotSpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw_string = String::deserialize(deserializer)?;
        SlotSpec::from_key(&raw_string).map_err(serde::de::Error::custom)
    }
}

/// Given `SlotSpec`s specifying the positions of the slots in a grid, validate the geometry and
/// generate `SlotConfig`s containing derived information about crossings. Also returns the number
/// of distinct crossings.
pub fn generate_slot_configs(
    entries: &[SlotSpec],
    width: usize,
    height: usize,
) -> Result<(Vec<SlotConfig>, usize), GridConfigError> {
    // Build a map from cell location to (entry index, cell index within entry), which we can then
    // use to calculate crossings.
    let mut entries_by_loc: HashMap<GridCoord, Vec<(usize, usize)>> = HashMap::new();

    for (entry_idx, entry) in entries.iter().enumerate() {
        if entry.length == 0 {
            return Err(GridConfigError::ZeroLengthSlot(entry.to_key()));
        }

        for (cell_idx, loc) in entry.cell_coords().into_iter().enumerate() {
            if loc.0 >= height || loc.1 >= width {
                return Err(GridConfigError::OutOfBounds {
                    slot: entry.to_key(),
                    width,
                    height,
                });
            }
            entries_by_loc
                .entry(loc)
                .or_default()
                .push((entry_idx, cell_idx));
        }
    }

    let mut ordered_coords: Vec<GridCoord> = entries_by_loc.keys().copied().collect();
    ordered_coords.sort_unstable();

    for loc in &ordered_coords {
        let loc_entries = &entries_by_loc[loc];
        if loc_entries.len() > 2 {
            return Err(GridConfigError::TooManySlotsInCell(loc.0, loc.1));
        }
        if loc_entries.len() == 2 {
            let (first, second) = (&entries[loc_entries[0].0], &entries[loc_entries[1].0]);
            if first.direction == second.direction {
                return Err(GridConfigError::ParallelOverlap(
                    first.to_key(),
                    second.to_key(),
                ));
            }
        }
    }

    // Since a crossing is always seen from exactly two slots, we hand out its id the first time we
    // see it and look it up the second time.
    let mut crossing_ids: HashMap<(SlotId, SlotId), CrossingId> = HashMap::new();

    let slot_configs = entries
        .iter()
        .enumerate()
        .map(|(entry_idx, entry)| {
            let crossings: Vec<Option<Crossing>> = entry
                .cell_coords()
                .iter()
                .map(|loc| {
                    entries_by_loc[loc]
                        .iter()
                        .find(|&&(other_idx, _)| other_idx != entry_idx)
                        .map(|&(other_slot_id, other_slot_cell)| {
                            let key = (entry_idx.min(other_slot_id), entry_idx.max(other_slot_id));
                            let next_id = crossing_ids.len();
                            let crossing_id = *crossing_ids.entry(key).or_insert(next_id);

                            Crossing {
                                other_slot_id,
                                other_slot_cell,
                                crossing_id,
                            }
                        })
                })
                .collect();

            SlotConfig {
                id: entry_idx,
                start_cell: entry.start_cell,
                direction: entry.direction,
                length: entry.length,
                crossings,
            }
        })
        .collect();

    Ok((slot_configs, crossing_ids.len()))
}

/// Generate an `OwnedGridConfig` representing a grid with specified entries.
pub fn generate_grid_config(
    word_list: WordList,
    entries: &[SlotSpec],
    width: usize,
    height: usize,
) -> Result<OwnedGridConfig, GridConfigError> {
    let (slot_configs, crossing_count) = generate_slot_configs(entries, width, height)?;

    log::debug!(
        "built {}x{} grid with {} slots and {} crossings",
        width,
        height,
        slot_configs.len(),
        crossing_count
    );

    Ok(OwnedGridConfig {
        word_list,
        slot_configs,
        width,
        height,
        crossing_count,
        abort: None,
    })
}

fn is_open_cell(cell: char) -> bool {
    cell == '_' || cell == '.'
}

/// Split a template into rows of cells, padding short rows with blocks.
fn template_rows(template: &str) -> Vec<Vec<char>> {
    let mut rows: Vec<Vec<char>> = template
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() {
                None
            } else {
                Some(line.chars().collect())
            }
        })
        .collect();

    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    for row in &mut rows {
        row.resize(width, '#');
    }

    rows
}

/// Generate a list of `SlotSpec`s from a template string with `_` or `.` representing open cells
/// and anything else representing blocks. Every run of two or more open cells is a slot.
#[must_use]
pub fn generate_slots_from_template_string(template: &str) -> Vec<SlotSpec> {
    fn build_runs(rows: &[Vec<char>]) -> Vec<Vec<GridCoord>> {
        let mut result: Vec<Vec<GridCoord>> = vec![];

        for (row_idx, line) in rows.iter().enumerate() {
            let mut current_run: Vec<GridCoord> = vec![];

            for (col_idx, &cell) in line.iter().enumerate() {
                if is_open_cell(cell) {
                    current_run.push((row_idx, col_idx));
                } else {
                    if current_run.len() > 1 {
                        result.push(current_run);
                    }
                    current_run = vec![];
                }
            }

            if current_run.len() > 1 {
                result.push(current_run);
            }
        }

        result
    }

    let rows = template_rows(template);
    if rows.is_empty() {
        return vec![];
    }

    let mut slot_specs: Vec<SlotSpec> = build_runs(&rows)
        .into_iter()
        .map(|coords| SlotSpec {
            start_cell: coords[0],
            length: coords.len(),
            direction: Direction::Across,
        })
        .collect();

    let transposed_rows: Vec<Vec<char>> = (0..rows[0].len())
        .map(|col_idx| rows.iter().map(|row| row[col_idx]).collect())
        .collect();

    for coords in build_runs(&transposed_rows) {
        let (col_idx, row_idx) = coords[0];
        slot_specs.push(SlotSpec {
            start_cell: (row_idx, col_idx),
            length: coords.len(),
            direction: Direction::Down,
        });
    }

    slot_specs
}

/// Generate an `OwnedGridConfig` from a template string with `_` or `.` representing open cells
/// and anything else (usually `#`) representing blocks.
pub fn generate_grid_config_from_template_string(
    word_list: WordList,
    template: &str,
) -> Result<OwnedGridConfig, GridConfigError> {
    let rows = template_rows(template);
    if rows.is_empty() {
        return Err(GridConfigError::EmptyTemplate);
    }

    let slot_specs = generate_slots_from_template_string(template);

    generate_grid_config(word_list, &slot_specs, rows[0].len(), rows.len())
}

/// A struct recording a slot assignment made during a fill process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub slot_id: SlotId,
    pub word_id: WordId,
}

/// Turn the given grid config and (possibly partial) assignment into a rendered string: assigned
/// letters, `.` for open cells nobody has filled yet, and `#` for cells outside every slot.
#[must_use]
pub fn render_grid(config: &GridConfig, assignment: &Assignment) -> String {
    let mut grid: Vec<char> = vec!['#'; config.width * config.height];

    for slot_config in config.slot_configs {
        let word = assignment
            .get(slot_config.id)
            .map(|word_id| &config.word_list.words[word_id]);

        for (cell_idx, (row, col)) in slot_config.cell_coords().into_iter().enumerate() {
            let cell = &mut grid[row * config.width + col];
            match word.and_then(|word| word.glyphs.get(cell_idx)) {
                Some(&glyph) => *cell = config.word_list.glyphs[glyph],
                None if *cell == '#' => *cell = '.',
                None => {}
            }
        }
    }

    grid.chunks(config.width)
        .map(|line| line.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
pub mod tests {
    use crate::assignment::Assignment;
    use crate::grid_config::{
        generate_grid_config, generate_grid_config_from_template_string,
        generate_slots_from_template_string, render_grid, Direction, GridConfigError,
        OwnedGridConfig, SlotSpec,
    };
    use crate::word_list::tests::{resource_path, word_list_source_config};
    use crate::word_list::WordList;
    use std::fs;

    #[must_use]
    pub fn structure0() -> OwnedGridConfig {
        let template = fs::read_to_string(resource_path("structure0.txt")).unwrap();
        let word_list = WordList::new(word_list_source_config(), None);
        generate_grid_config_from_template_string(word_list, &template).unwrap()
    }

    fn spec(row: usize, col: usize, direction: Direction, length: usize) -> SlotSpec {
        SlotSpec {
            start_cell: (row, col),
            direction,
            length,
        }
    }

    #[test]
    fn test_slots_from_template() {
        let slot_specs = generate_slots_from_template_string(
            "
            #___#
            #_##_
            #_##_
            #_##_
            #____
            ",
        );

        assert_eq!(
            slot_specs,
            vec![
                spec(0, 1, Direction::Across, 3),
                spec(4, 1, Direction::Across, 4),
                spec(0, 1, Direction::Down, 5),
                spec(1, 4, Direction::Down, 4),
            ]
        );
    }

    #[test]
    fn test_short_rows_are_padded_with_blocks() {
        let grid_config =
            generate_grid_config_from_template_string(WordList::from_words(&["AB"]), "___\n_")
                .unwrap();

        assert_eq!(grid_config.width, 3);
        assert_eq!(grid_config.height, 2);
        assert_eq!(grid_config.slot_configs.len(), 2);
    }

    #[test]
    fn test_overlaps_are_symmetric() {
        let grid_config = structure0();
        let config = grid_config.to_config_ref();

        assert_eq!(config.slot_count(), 4);
        assert_eq!(config.crossing_count, 3);

        // 0 = 3 across at (0, 1), 1 = 4 across at (4, 1), 2 = 5 down at (0, 1), 3 = 4 down at (1, 4)
        assert_eq!(config.overlap(0, 2), Some((0, 0)));
        assert_eq!(config.overlap(2, 1), Some((4, 0)));
        assert_eq!(config.overlap(1, 3), Some((3, 3)));
        assert_eq!(config.overlap(0, 1), None);
        assert_eq!(config.overlap(0, 3), None);

        for a in 0..config.slot_count() {
            for b in 0..config.slot_count() {
                assert_eq!(
                    config.overlap(a, b),
                    config.overlap(b, a).map(|(i, j)| (j, i))
                );
            }
        }

        assert_eq!(config.neighbors(2).collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(config.degree(2), 2);
        assert_eq!(config.degree(3), 1);
    }

    #[test]
    fn test_rejects_out_of_bounds_slot() {
        let result = generate_grid_config(
            WordList::from_words(&["ABC"]),
            &[spec(0, 1, Direction::Across, 3)],
            3,
            3,
        );

        assert!(matches!(result, Err(GridConfigError::OutOfBounds { .. })));
    }

    #[test]
    fn test_rejects_malformed_geometry() {
        let word_list = || WordList::from_words(&["ABC"]);

        assert_eq!(
            generate_grid_config(word_list(), &[spec(0, 0, Direction::Down, 0)], 3, 3).err(),
            Some(GridConfigError::ZeroLengthSlot("0,0,down,0".into()))
        );

        assert_eq!(
            generate_grid_config(
                word_list(),
                &[
                    spec(0, 0, Direction::Across, 3),
                    spec(0, 1, Direction::Down, 3),
                    spec(0, 1, Direction::Down, 2),
                ],
                3,
                3,
            )
            .err(),
            Some(GridConfigError::TooManySlotsInCell(0, 1))
        );

        assert!(matches!(
            generate_grid_config(
                word_list(),
                &[
                    spec(0, 0, Direction::Across, 2),
                    spec(0, 1, Direction::Across, 2),
                ],
                3,
                3,
            ),
            Err(GridConfigError::ParallelOverlap(..))
        ));

        assert!(matches!(
            generate_grid_config_from_template_string(word_list(), "\n   \n"),
            Err(GridConfigError::EmptyTemplate)
        ));
    }

    #[test]
    fn test_slot_key_round_trip() {
        let slot_spec = SlotSpec::from_key("3,4,down,12").unwrap();

        assert_eq!(slot_spec, spec(3, 4, Direction::Down, 12));
        assert_eq!(slot_spec.to_key(), "3,4,down,12");
        assert!(SlotSpec::from_key("3,4,sideways,12").is_err());
        assert!(SlotSpec::from_key("3,4,down").is_err());
    }

    #[test]
    fn test_render_partial_assignment() {
        let grid_config = structure0();
        let config = grid_config.to_config_ref();

        let mut assignment = Assignment::new(config.slot_count());
        assignment.assign(0, config.word_list.word_id("SIX").unwrap());
        assignment.assign(1, config.word_list.word_id("NINE").unwrap());

        assert_eq!(
            render_grid(&config, &assignment),
            "#SIX#\n#.##.\n#.##.\n#.##.\n#NINE"
        );
    }
}

#[cfg(all(test, feature = "serde"))]
mod serde_tests {
    use crate::grid_config::{Direction, SlotSpec};

    #[test]
    fn test_slot_spec_serialization() {
        let slot_spec = SlotSpec {
            start_cell: (1, 2),
            direction: Direction::Across,
            length: 5,
        };

        let slot_key = serde_json::to_string(&slot_spec).unwrap();

        assert_eq!(slot_key, "\"1,2,across,5\"");
    }

    #[test]
    fn test_slot_spec_deserialization() {
        let slot_spec: SlotSpec = serde_json::from_str("\"3,4,down,12\"").unwrap();

        assert_eq!(
            slot_spec,
            SlotSpec {
                start_cell: (3, 4),
                direction: Direction::Down,
                length: 12,
            }
        );
    }
}
