//! Where word pairs come from.
//!
//! A session draws exactly one pair, at game start. The source is a trait
//! so the server can load its own list and tests can pin a single pair.

use impostor_protocol::WordPair;
use rand::RngCore;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

use crate::WordListError;

/// Supplies `(innocent, impostor)` word pairs.
///
/// Takes `&mut dyn RngCore` rather than a generic so the source can be
/// shared as `Arc<dyn WordSource>` across sessions.
pub trait WordSource: Send + Sync + 'static {
    /// Draws one pair.
    fn draw(&self, rng: &mut dyn RngCore) -> WordPair;
}

/// Bundled pairs used when no list is configured.
const BUILTIN_PAIRS: &[(&str, &str)] = &[
    ("Coffee", "Tea"),
    ("Cat", "Dog"),
    ("Beach", "Pool"),
    ("Guitar", "Violin"),
    ("Pizza", "Burger"),
    ("Train", "Bus"),
    ("Sun", "Moon"),
    ("Doctor", "Nurse"),
    ("Football", "Rugby"),
    ("Winter", "Autumn"),
    ("Apple", "Pear"),
    ("Castle", "Palace"),
    ("River", "Lake"),
    ("Lion", "Tiger"),
    ("Book", "Magazine"),
    ("Rain", "Snow"),
    ("Bicycle", "Scooter"),
    ("Pencil", "Pen"),
    ("Shark", "Dolphin"),
    ("Cinema", "Theater"),
    ("Honey", "Syrup"),
    ("Mountain", "Volcano"),
    ("Wedding", "Birthday"),
    ("Pirate", "Viking"),
];

/// A fixed list of word pairs, drawn uniformly.
///
/// Deserializes from a JSON array and is validated on the way in:
///
/// ```json
/// [ { "innocent": "Coffee", "impostor": "Tea" } ]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Vec<WordPair>", into = "Vec<WordPair>")]
pub struct WordList {
    pairs: Vec<WordPair>,
}

impl WordList {
    /// Builds a list, rejecting an empty list and unusable pairs.
    ///
    /// # Errors
    /// - [`WordListError::Empty`] if `pairs` is empty.
    /// - [`WordListError::InvalidPair`] if a word is blank or both words
    ///   are equal ignoring case.
    pub fn new(pairs: Vec<WordPair>) -> Result<Self, WordListError> {
        if pairs.is_empty() {
            return Err(WordListError::Empty);
        }
        for (index, pair) in pairs.iter().enumerate() {
            let innocent = pair.innocent.trim();
            let impostor = pair.impostor.trim();
            if innocent.is_empty() || impostor.is_empty() {
                return Err(WordListError::InvalidPair {
                    index,
                    reason: "blank word".into(),
                });
            }
            if innocent.to_uppercase() == impostor.to_uppercase() {
                return Err(WordListError::InvalidPair {
                    index,
                    reason: "both words are the same".into(),
                });
            }
        }
        Ok(Self { pairs })
    }

    /// The bundled English list.
    pub fn builtin() -> Self {
        Self {
            pairs: BUILTIN_PAIRS
                .iter()
                .map(|(innocent, impostor)| WordPair::new(*innocent, *impostor))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pairs(&self) -> &[WordPair] {
        &self.pairs
    }
}

impl Default for WordList {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TryFrom<Vec<WordPair>> for WordList {
    type Error = WordListError;

    fn try_from(pairs: Vec<WordPair>) -> Result<Self, Self::Error> {
        Self::new(pairs)
    }
}

impl From<WordList> for Vec<WordPair> {
    fn from(list: WordList) -> Self {
        list.pairs
    }
}

impl WordSource for WordList {
    fn draw(&self, rng: &mut dyn RngCore) -> WordPair {
        // `new` and `builtin` never produce an empty list.
        self.pairs.choose(rng).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_builtin_list_is_valid() {
        let list = WordList::builtin();
        assert!(!list.is_empty());
        assert!(WordList::new(list.pairs().to_vec()).is_ok());
    }

    #[test]
    fn test_empty_list_rejected() {
        assert_eq!(WordList::new(Vec::new()).unwrap_err(), WordListError::Empty);
    }

    #[test]
    fn test_identical_words_rejected() {
        let err = WordList::new(vec![
            WordPair::new("Cat", "Dog"),
            WordPair::new("tea", "TEA"),
        ])
        .unwrap_err();
        assert!(matches!(err, WordListError::InvalidPair { index: 1, .. }));
    }

    #[test]
    fn test_blank_word_rejected() {
        let err = WordList::new(vec![WordPair::new("  ", "Dog")]).unwrap_err();
        assert!(matches!(err, WordListError::InvalidPair { index: 0, .. }));
    }

    #[test]
    fn test_single_pair_always_drawn() {
        let list = WordList::new(vec![WordPair::new("Cat", "Dog")]).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..10 {
            assert_eq!(list.draw(&mut rng), WordPair::new("Cat", "Dog"));
        }
    }

    #[test]
    fn test_draw_comes_from_list() {
        let list = WordList::builtin();
        let mut rng = StdRng::seed_from_u64(1);
        let pair = list.draw(&mut rng);
        assert!(list.pairs().contains(&pair));
    }

    #[test]
    fn test_deserialize_validates() {
        let list: WordList =
            serde_json::from_str(r#"[{"innocent":"Sun","impostor":"Moon"}]"#).unwrap();
        assert_eq!(list.len(), 1);

        let empty: Result<WordList, _> = serde_json::from_str("[]");
        assert!(empty.is_err());
    }
}
