//! Named reference ("golden") patterns.

use serde::{Deserialize, Serialize};

use crate::features::{FeatureError, FeatureSequence};

// ---------------------------------------------------------------------------
// ReferencePattern
// ---------------------------------------------------------------------------

/// A known-category exemplar: reference name plus its feature sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferencePattern {
    pub name: String,
    pub features: FeatureSequence,
}

impl ReferencePattern {
    pub fn new(name: impl Into<String>, features: FeatureSequence) -> Self {
        Self {
            name: name.into(),
            features,
        }
    }
}

// ---------------------------------------------------------------------------
// ReferenceLibrary
// ---------------------------------------------------------------------------

/// Ordered collection of uniquely named reference patterns.
///
/// Built once, then shared read-only (typically behind an `Arc`) by every
/// comparison.  Insertion order is the library order used for tie-breaking.
///
/// ```
/// use televoice::features::FeatureSequence;
/// use televoice::library::ReferenceLibrary;
///
/// let mut library = ReferenceLibrary::new();
/// library.insert("busy_a", FeatureSequence::new(2, vec![0.0; 4]).unwrap()).unwrap();
/// assert!(library.insert("busy_a", FeatureSequence::new(2, vec![1.0; 4]).unwrap()).is_err());
/// assert_eq!(library.names().collect::<Vec<_>>(), vec!["busy_a"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ReferencePattern>", into = "Vec<ReferencePattern>")]
pub struct ReferenceLibrary {
    patterns: Vec<ReferencePattern>,
}

impl ReferenceLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pattern.
    ///
    /// # Errors
    ///
    /// - [`FeatureError::DuplicateReference`] if `name` is already present.
    /// - [`FeatureError::EmptyReference`] if `features` has no frames.
    /// - [`FeatureError::DimensionMismatch`] if the frame dimension differs
    ///   from the patterns already in the library.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        features: FeatureSequence,
    ) -> Result<(), FeatureError> {
        let name = name.into();
        if self.get(&name).is_some() {
            return Err(FeatureError::DuplicateReference(name));
        }
        if features.is_empty() {
            return Err(FeatureError::EmptyReference(name));
        }
        if let Some(dim) = self.dim() {
            if features.dim() != dim {
                return Err(FeatureError::DimensionMismatch {
                    expected: dim,
                    found: features.dim(),
                });
            }
        }
        self.patterns.push(ReferencePattern { name, features });
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&FeatureSequence> {
        self.patterns
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.features)
    }

    /// Patterns in library order.
    pub fn iter(&self) -> std::slice::Iter<'_, ReferencePattern> {
        self.patterns.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|p| p.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Shared frame dimension, `None` while empty.
    pub fn dim(&self) -> Option<usize> {
        self.patterns.first().map(|p| p.features.dim())
    }
}

impl TryFrom<Vec<ReferencePattern>> for ReferenceLibrary {
    type Error = FeatureError;

    fn try_from(patterns: Vec<ReferencePattern>) -> Result<Self, Self::Error> {
        let mut library = ReferenceLibrary::new();
        for p in patterns {
            library.insert(p.name, p.features)?;
        }
        Ok(library)
    }
}

impl From<ReferenceLibrary> for Vec<ReferencePattern> {
    fn from(library: ReferenceLibrary) -> Self {
        library.patterns
    }
}

impl<'a> IntoIterator for &'a ReferenceLibrary {
    type Item = &'a ReferencePattern;
    type IntoIter = std::slice::Iter<'a, ReferencePattern>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(dim: usize, frames: usize, value: f64) -> FeatureSequence {
        FeatureSequence::new(dim, vec![value; dim * frames]).unwrap()
    }

    #[test]
    fn keeps_insertion_order() {
        let mut library = ReferenceLibrary::new();
        library.insert("no_answer_b", seq(3, 2, 0.0)).unwrap();
        library.insert("busy_a", seq(3, 4, 1.0)).unwrap();
        library.insert("voice_mail_c", seq(3, 1, 2.0)).unwrap();

        let names: Vec<&str> = library.names().collect();
        assert_eq!(names, vec!["no_answer_b", "busy_a", "voice_mail_c"]);
        assert_eq!(library.len(), 3);
        assert_eq!(library.dim(), Some(3));
        assert_eq!(library.get("busy_a").map(FeatureSequence::len), Some(4));
    }

    #[test]
    fn rejects_duplicates() {
        let mut library = ReferenceLibrary::new();
        library.insert("busy_a", seq(2, 2, 0.0)).unwrap();
        assert_eq!(
            library.insert("busy_a", seq(2, 3, 0.0)),
            Err(FeatureError::DuplicateReference("busy_a".into()))
        );
        assert_eq!(library.len(), 1);
    }

    #[test]
    fn rejects_empty_pattern() {
        let mut library = ReferenceLibrary::new();
        assert_eq!(
            library.insert("silence", FeatureSequence::empty(2).unwrap()),
            Err(FeatureError::EmptyReference("silence".into()))
        );
        assert!(library.is_empty());
    }

    #[test]
    fn rejects_mixed_dimensions() {
        let mut library = ReferenceLibrary::new();
        library.insert("a", seq(13, 2, 0.0)).unwrap();
        assert_eq!(
            library.insert("b", seq(12, 2, 0.0)),
            Err(FeatureError::DimensionMismatch {
                expected: 13,
                found: 12
            })
        );
    }

    #[test]
    fn json_round_trip_preserves_order() {
        let mut library = ReferenceLibrary::new();
        library.insert("z", seq(2, 1, 0.5)).unwrap();
        library.insert("a", seq(2, 2, 1.5)).unwrap();

        let json = serde_json::to_string(&library).unwrap();
        let back: ReferenceLibrary = serde_json::from_str(&json).unwrap();
        assert_eq!(back, library);
        assert_eq!(back.names().collect::<Vec<_>>(), vec!["z", "a"]);
    }

    #[test]
    fn deserialising_duplicates_fails() {
        let json = r#"[
            {"name":"a","features":{"dim":1,"data":[0.0]}},
            {"name":"a","features":{"dim":1,"data":[1.0]}}
        ]"#;
        assert!(serde_json::from_str::<ReferenceLibrary>(json).is_err());
    }
}
