//! Classification — Distance Map → verdict.
//!
//! ```text
//! DistanceMap ─▶ best match (min finite, first wins ties)
//!             ─▶ MRD = max − min over finite values
//!             ─▶ category:  MRD < band && best > band  ⇒ "typical"
//!                           otherwise normalised best-match name
//! ```
//!
//! A genuine match stands out with a small best value and a wide gap to the
//! rest.  A narrow spread combined with a large best value means the target
//! resembles nothing in the library, hence `"typical"`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::matcher::DistanceMap;

/// Category label for targets that match no reference confidently.
pub const TYPICAL_LABEL: &str = "typical";

// ---------------------------------------------------------------------------
// Error & config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifyError {
    /// No references were compared.
    #[error("distance map is empty")]
    EmptyDistanceMap,

    /// Every reference was unbounded.
    #[error("no reference produced a finite distance")]
    NoFiniteDistance,
}

/// Classifier tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Spread/best-value band of the "typical" rule.
    pub typical_band: f64,
    /// Leading name segments (split on `_`, `-`, whitespace) kept as the
    /// category.
    pub category_segments: usize,
    /// Characters compared by [`Classification::is_correct`].
    pub match_prefix_len: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            typical_band: 2000.0,
            category_segments: 2,
            match_prefix_len: 2,
        }
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Read-only verdict derived from one Distance Map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub best_match: String,
    pub best_value: f64,
    /// Max − min over finite distances.
    pub mrd: f64,
    pub category: String,
    #[serde(skip)]
    match_prefix_len: usize,
}

impl Classification {
    pub fn is_typical(&self) -> bool {
        self.category == TYPICAL_LABEL
    }

    /// Compare the leading `match_prefix_len` characters of the category with
    /// those of the expected label.  Case matters: categories are always
    /// lowercase, so an upper-case file name never counts as correct.
    ///
    /// ```
    /// use televoice::classify::{classify, ClassifierConfig};
    /// use televoice::matcher::{Distance, DistanceMap};
    ///
    /// let map: DistanceMap = [("voice_mail_c", Distance::Finite(0.0))].into_iter().collect();
    /// let verdict = classify(&map, &ClassifierConfig::default()).unwrap();
    /// assert!(verdict.is_correct("vo_2019_0001.mp3"));
    /// assert!(!verdict.is_correct("busy_0001.mp3"));
    /// ```
    pub fn is_correct(&self, expected: &str) -> bool {
        prefix(&self.category, self.match_prefix_len) == prefix(expected, self.match_prefix_len)
    }
}

fn prefix(s: &str, n: usize) -> &str {
    s.char_indices().nth(n).map_or(s, |(end, _)| &s[..end])
}

/// Derive the verdict for `distances`.
///
/// # Errors
///
/// [`ClassifyError::EmptyDistanceMap`] or, when every entry is unbounded,
/// [`ClassifyError::NoFiniteDistance`].
pub fn classify(
    distances: &DistanceMap,
    config: &ClassifierConfig,
) -> Result<Classification, ClassifyError> {
    if distances.is_empty() {
        return Err(ClassifyError::EmptyDistanceMap);
    }

    let mut best: Option<(&str, f64)> = None;
    let mut max = f64::NEG_INFINITY;
    for (name, value) in distances.finite() {
        // Strict `<` keeps the first of equal minima.
        if best.map_or(true, |(_, b)| value < b) {
            best = Some((name, value));
        }
        max = max.max(value);
    }
    let (best_match, best_value) = best.ok_or(ClassifyError::NoFiniteDistance)?;
    let mrd = max - best_value;

    let category = if mrd < config.typical_band && best_value > config.typical_band {
        TYPICAL_LABEL.to_string()
    } else {
        normalize_category(best_match, config.category_segments)
    };

    Ok(Classification {
        best_match: best_match.to_string(),
        best_value,
        mrd,
        category,
        match_prefix_len: config.match_prefix_len,
    })
}

/// Category from a reference name: the first `segments` parts between
/// separators, joined and lowercased.
///
/// ```
/// use televoice::classify::normalize_category;
///
/// assert_eq!(normalize_category("voice_mail_c", 2), "voicemail");
/// assert_eq!(normalize_category("Busy-Tone 3", 2), "busytone");
/// assert_eq!(normalize_category("ringback", 2), "ringback");
/// ```
pub fn normalize_category(name: &str, segments: usize) -> String {
    name.split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .take(segments)
        .collect::<String>()
        .to_lowercase()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::Distance::{self, Finite, Unbounded};

    fn map(entries: &[(&str, Distance)]) -> DistanceMap {
        entries.iter().map(|(n, d)| (*n, *d)).collect()
    }

    #[test]
    fn narrow_spread_with_high_best_is_typical() {
        let m = map(&[
            ("A", Finite(2500.0)),
            ("B", Finite(2600.0)),
            ("C", Finite(2550.0)),
        ]);
        let c = classify(&m, &ClassifierConfig::default()).unwrap();
        assert_eq!(c.best_match, "A");
        assert_eq!(c.best_value, 2500.0);
        assert_eq!(c.mrd, 100.0);
        assert_eq!(c.category, TYPICAL_LABEL);
        assert!(c.is_typical());
    }

    #[test]
    fn clear_winner_gets_its_category() {
        let m = map(&[
            ("busy_a", Finite(3100.0)),
            ("voice_mail_c", Finite(0.0)),
            ("no_answer_b", Finite(2900.0)),
        ]);
        let c = classify(&m, &ClassifierConfig::default()).unwrap();
        assert_eq!(c.best_match, "voice_mail_c");
        assert_eq!(c.category, "voicemail");
        assert_eq!(c.mrd, 3100.0);
        assert!(!c.is_typical());
    }

    #[test]
    fn low_best_with_narrow_spread_is_not_typical() {
        let m = map(&[("busy_a", Finite(100.0)), ("no_answer_b", Finite(150.0))]);
        let c = classify(&m, &ClassifierConfig::default()).unwrap();
        assert_eq!(c.category, "busya");
    }

    #[test]
    fn ties_go_to_first_entry() {
        let m = map(&[
            ("no_answer_b", Finite(7.0)),
            ("busy_a", Finite(5.0)),
            ("busy_b", Finite(5.0)),
        ]);
        let c = classify(&m, &ClassifierConfig::default()).unwrap();
        assert_eq!(c.best_match, "busy_a");
    }

    #[test]
    fn unbounded_entries_are_ignored() {
        let m = map(&[
            ("long_tone", Unbounded),
            ("busy_a", Finite(10.0)),
            ("no_answer_b", Finite(40.0)),
        ]);
        let c = classify(&m, &ClassifierConfig::default()).unwrap();
        assert_eq!(c.best_match, "busy_a");
        assert_eq!(c.mrd, 30.0);
    }

    #[test]
    fn empty_map_fails() {
        assert_eq!(
            classify(&DistanceMap::new(), &ClassifierConfig::default()),
            Err(ClassifyError::EmptyDistanceMap)
        );
    }

    #[test]
    fn all_unbounded_fails() {
        let m = map(&[("a", Unbounded), ("b", Unbounded)]);
        assert_eq!(
            classify(&m, &ClassifierConfig::default()),
            Err(ClassifyError::NoFiniteDistance)
        );
    }

    #[test]
    fn correctness_compares_prefixes_exactly() {
        let m = map(&[("No_Answer_B", Finite(1.0)), ("busy_a", Finite(9000.0))]);
        let c = classify(&m, &ClassifierConfig::default()).unwrap();
        assert_eq!(c.category, "noanswer");
        assert!(c.is_correct("no_0042.mp3"));
        assert!(!c.is_correct("NO_0042.mp3"));
        assert!(!c.is_correct("bu_0042.mp3"));
    }

    #[test]
    fn short_labels_compare_whole() {
        let m = map(&[("no_answer_b", Finite(1.0))]);
        let c = classify(&m, &ClassifierConfig::default()).unwrap();
        assert!(!c.is_correct("n"));
        assert!(!c.is_correct(""));
    }

    #[test]
    fn custom_band_and_segments() {
        let config = ClassifierConfig {
            typical_band: 50.0,
            category_segments: 1,
            match_prefix_len: 3,
        };
        let m = map(&[("voice_mail_c", Finite(60.0)), ("busy_a", Finite(70.0))]);
        let c = classify(&m, &config).unwrap();
        assert_eq!(c.category, TYPICAL_LABEL);

        let m = map(&[("voice_mail_c", Finite(10.0)), ("busy_a", Finite(70.0))]);
        let c = classify(&m, &config).unwrap();
        assert_eq!(c.category, "voice");
        assert!(c.is_correct("voi.wav"));
        assert!(!c.is_correct("vox.wav"));
    }
}
