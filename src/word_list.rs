use smallvec::SmallVec;
use std::collections::{HashMap, HashSet};
use std::ffi::OsString;
use std::fmt::Debug;
use std::{fmt, fs};
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;

use crate::types::{GlyphId, WordId};
use crate::{MAX_GLYPH_COUNT, MAX_SLOT_LENGTH};

/// A struct representing a word in the vocabulary.
#[derive(Debug, Clone)]
pub struct Word {
    /// The word as it would appear in a grid -- uppercase, NFC-normalized, no whitespace.
    pub normalized_string: String,

    /// The word as it appears in the user's word list.
    pub canonical_string: String,

    /// The glyph ids making up `normalized_string`.
    pub glyphs: SmallVec<[GlyphId; MAX_SLOT_LENGTH]>,

    /// The index of the source this word was first loaded from.
    pub source_index: u16,
}

impl Word {
    /// The number of cells this word occupies in a grid.
    #[must_use]
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }
}

/// Given a canonical word string from a word list, turn it into the normalized form we'll use in
/// the solver.
#[must_use]
pub fn normalize_word(canonical: &str) -> String {
    canonical
        .to_uppercase()
        .nfc() // Normalize Unicode combining forms
        .filter(|c| !c.is_whitespace())
        .collect()
}

#[derive(Debug, Clone, Error)]
pub enum WordListError {
    #[error("Can’t read file: “{0}”")]
    InvalidPath(String),

    #[error("Word list contains invalid word: “{0}”")]
    InvalidWord(String),
}

/// Configuration describing a source of vocabulary entries.
pub enum WordListSourceConfig {
    Memory { id: String, words: Vec<String> },
    File { id: String, path: OsString },
    FileContents { id: String, contents: &'static str },
}

impl WordListSourceConfig {
    /// The unique id of this source.
    #[must_use]
    pub fn id(&self) -> String {
        match self {
            WordListSourceConfig::Memory { id, .. }
            | WordListSourceConfig::FileContents { id, .. }
            | WordListSourceConfig::File { id, .. } => id.clone(),
        }
    }
}

#[derive(Debug)]
pub struct WordListSourceState {
    pub id: String,
    pub errors: Vec<WordListError>,
}

struct RawWordListEntry {
    normalized: String,
    canonical: String,
    source_index: u16,
}

impl RawWordListEntry {
    fn parse(
        canonical: &str,
        source_index: u16,
        errors: &mut Vec<WordListError>,
    ) -> Option<RawWordListEntry> {
        let normalized = normalize_word(canonical);
        if normalized.is_empty() {
            errors.push(WordListError::InvalidWord(canonical.into()));
            return None;
        }

        Some(RawWordListEntry {
            normalized,
            canonical: canonical.to_string(),
            source_index,
        })
    }
}

/// Parse a word file with one word per line. Anything after a `;` is ignored, so scored lists
/// in `word;score` form can be used unchanged.
fn parse_word_list_file_contents(
    file_contents: &str,
    source_index: u16,
    errors: &mut Vec<WordListError>,
) -> Vec<RawWordListEntry> {
    file_contents
        .lines()
        .filter_map(|line| {
            let canonical = line.split(';').next().unwrap_or("").trim();
            if canonical.is_empty() {
                return None;
            }
            RawWordListEntry::parse(canonical, source_index, errors)
        })
        .collect()
}

fn load_words_from_source(
    source: &WordListSourceConfig,
    source_index: u16,
) -> (Vec<RawWordListEntry>, WordListSourceState) {
    let id = source.id();
    let mut errors = vec![];

    let entries = match source {
        WordListSourceConfig::Memory { words, .. } => words
            .iter()
            .filter_map(|canonical| RawWordListEntry::parse(canonical, source_index, &mut errors))
            .collect(),

        WordListSourceConfig::File { path, .. } => {
            if let Ok(contents) = fs::read_to_string(path) {
                parse_word_list_file_contents(&contents, source_index, &mut errors)
            } else {
                errors.push(WordListError::InvalidPath(path.to_string_lossy().into()));
                vec![]
            }
        }

        WordListSourceConfig::FileContents { contents, .. } => {
            parse_word_list_file_contents(contents, source_index, &mut errors)
        }
    };

    (entries, WordListSourceState { id, errors })
}

/// Load every source in order, dropping entries whose normalized form was already seen.
fn load_words_from_sources(
    sources: &[WordListSourceConfig],
) -> (Vec<RawWordListEntry>, HashMap<String, WordListSourceState>) {
    assert!(sources.len() < 2usize.pow(16), "Too many word list sources");

    let mut seen_words: HashSet<String> = HashSet::new();
    let mut result = vec![];
    let mut states = HashMap::new();

    for (source_index, source) in sources.iter().enumerate() {
        let (words, source_state) = load_words_from_source(source, source_index as u16);
        for word in words {
            if seen_words.insert(word.normalized.clone()) {
                result.push(word);
            }
        }
        states.insert(source_state.id.clone(), source_state);
    }

    (result, states)
}

/// The vocabulary available to a solve. Words are interned as glyph ids so that the solver only
/// ever compares integers; `WordId`s are stable indices into `words`.
pub struct WordList {
    /// A list of all characters that occur in any (normalized) word. `GlyphId`s used everywhere
    /// else are indices into this list.
    pub glyphs: SmallVec<[char; MAX_GLYPH_COUNT]>,

    /// The inverse of `glyphs`: a map from a character to the `GlyphId` representing it.
    pub glyph_id_by_char: HashMap<char, GlyphId>,

    /// All loaded words, unique by normalized string.
    pub words: Vec<Word>,

    /// A map from a normalized string to the id of the Word representing it.
    pub word_id_by_string: HashMap<String, WordId>,

    /// The maximum word length provided when configuring the WordList, if any.
    pub max_length: Option<usize>,

    /// The state of each word list source after loading, keyed by source id.
    pub source_states: HashMap<String, WordListSourceState>,
}

impl WordList {
    /// Construct a new `WordList` using the given sources (omitting any entries that are longer than
    /// `max_length`).
    #[must_use]
    pub fn new(source_configs: Vec<WordListSourceConfig>, max_length: Option<usize>) -> WordList {
        let mut instance = WordList {
            glyphs: SmallVec::new(),
            glyph_id_by_char: HashMap::new(),
            words: vec![],
            word_id_by_string: HashMap::new(),
            max_length,
            source_states: HashMap::new(),
        };

        let (raw_entries, source_states) = load_words_from_sources(&source_configs);
        instance.source_states = source_states;

        for raw_entry in raw_entries {
            if let Some(max_length) = max_length {
                if raw_entry.normalized.chars().count() > max_length {
                    continue;
                }
            }
            instance.add_word(raw_entry);
        }

        log::debug!(
            "loaded {} words over {} glyphs",
            instance.words.len(),
            instance.glyphs.len()
        );

        instance
    }

    /// Convenience constructor for an in-memory vocabulary.
    #[must_use]
    pub fn from_words<S: AsRef<str>>(words: &[S]) -> WordList {
        WordList::new(
            vec![WordListSourceConfig::Memory {
                id: "0".into(),
                words: words.iter().map(|word| word.as_ref().to_string()).collect(),
            }],
            None,
        )
    }

    fn add_word(&mut self, raw_entry: RawWordListEntry) -> WordId {
        let glyphs: SmallVec<[GlyphId; MAX_SLOT_LENGTH]> = raw_entry
            .normalized
            .chars()
            .map(|c| self.glyph_id_for_char(c))
            .collect();

        let word_id = self.words.len();
        self.word_id_by_string
            .insert(raw_entry.normalized.clone(), word_id);
        self.words.push(Word {
            normalized_string: raw_entry.normalized,
            canonical_string: raw_entry.canonical,
            glyphs,
            source_index: raw_entry.source_index,
        });

        word_id
    }

    /// What's the unique glyph id for the given char? We do this lazily, instead of just mapping
    /// every letter up front, because entries may also contain digits, non-English letters, or
    /// punctuation.
    pub fn glyph_id_for_char(&mut self, ch: char) -> GlyphId {
        self.glyph_id_by_char.get(&ch).copied().unwrap_or_else(|| {
            self.glyphs.push(ch);
            let id = self.glyphs.len() - 1;
            self.glyph_id_by_char.insert(ch, id);
            id
        })
    }

    /// Look up a word by any spelling that normalizes to it.
    #[must_use]
    pub fn word_id(&self, word: &str) -> Option<WordId> {
        self.word_id_by_string.get(&normalize_word(word)).copied()
    }

    #[must_use]
    pub fn get_word(&self, word_id: WordId) -> &Word {
        &self.words[word_id]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// For each source provided when loading, return any errors it emitted.
    #[must_use]
    pub fn get_source_errors(&self) -> HashMap<String, Vec<WordListError>> {
        self.source_states
            .iter()
            .map(|(source_id, source_state)| (source_id.clone(), source_state.errors.clone()))
            .collect()
    }
}

impl Debug for WordList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WordList")
            .field("glyphs", &self.glyphs)
            .field("words", &self.words.len())
            .field("max_length", &self.max_length)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub mod tests {
    use crate::word_list::{WordList, WordListError, WordListSourceConfig};
    use std::path;
    use std::path::PathBuf;

    #[must_use]
    pub fn resource_path(name: &str) -> PathBuf {
        let mut path = path::PathBuf::from(file!());
        path.pop();
        path.pop();
        path.push("resources");
        path.push(name);
        path
    }

    #[must_use]
    pub fn word_list_source_config() -> Vec<WordListSourceConfig> {
        vec![WordListSourceConfig::File {
            id: "0".into(),
            path: resource_path("words0.txt").into(),
        }]
    }

    #[test]
    fn test_loads_words_from_file() {
        let word_list = WordList::new(word_list_source_config(), None);

        assert!(word_list.get_source_errors()["0"].is_empty());
        assert_eq!(word_list.len(), 10);

        let word_id = word_list.word_id("seven").expect("word list should include 'seven'");
        let word = word_list.get_word(word_id);
        assert_eq!(word.normalized_string, "SEVEN");
        assert_eq!(word.len(), 5);
        assert_eq!(word.glyphs[1], word.glyphs[3]);
    }

    #[test]
    fn test_max_length_skips_long_words() {
        let word_list = WordList::new(word_list_source_config(), Some(4));

        assert!(word_list.word_id("NINE").is_some());
        assert!(word_list.word_id("THREE").is_none());
        assert!(word_list.words.iter().all(|word| word.len() <= 4));
    }

    #[test]
    fn test_dedupes_across_sources() {
        let word_list = WordList::new(
            vec![
                WordListSourceConfig::Memory {
                    id: "0".into(),
                    words: vec!["Ice Cream".into(), "cat".into()],
                },
                WordListSourceConfig::FileContents {
                    id: "1".into(),
                    contents: "CAT;50\nicecream\n\ndog\n",
                },
            ],
            None,
        );

        assert_eq!(word_list.len(), 3);

        let ice_cream = word_list.get_word(word_list.word_id("ICECREAM").unwrap());
        assert_eq!(ice_cream.canonical_string, "Ice Cream");
        assert_eq!(ice_cream.source_index, 0);

        let dog = word_list.get_word(word_list.word_id("dog").unwrap());
        assert_eq!(dog.source_index, 1);
    }

    #[test]
    #[allow(clippy::unicode_not_nfc)]
    fn test_unusual_characters() {
        let word_list = WordList::from_words(&[
            // Non-English character expressed as one two-byte `char`
            "monsutâ",
            // Non-English character expressed as two chars w/ combining form
            "hélen",
        ]);

        let lengths: Vec<usize> = word_list.words.iter().map(|word| word.len()).collect();
        assert_eq!(lengths, vec![7, 5]);
        assert!(word_list.word_id("HÉLEN").is_some());
    }

    #[test]
    fn test_reports_unreadable_source() {
        let word_list = WordList::new(
            vec![WordListSourceConfig::File {
                id: "missing".into(),
                path: resource_path("no_such_file.txt").into(),
            }],
            None,
        );

        assert!(word_list.is_empty());
        let errors = &word_list.get_source_errors()["missing"];
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], WordListError::InvalidPath(_)));
    }

    #[test]
    fn test_reports_empty_memory_entries() {
        let word_list = WordList::from_words(&["ok", "  "]);

        assert_eq!(word_list.len(), 1);
        assert!(matches!(
            word_list.get_source_errors()["0"][0],
            WordListError::InvalidWord(_)
        ));
    }
}
