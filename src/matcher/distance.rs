//! Distance values and the per-reference distance map.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Distance
// ---------------------------------------------------------------------------

/// Normalised minimum window distance between a target and one reference.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Distance {
    /// Best window distance divided by the reference length.
    Finite(f64),
    /// No window was evaluated: the reference is longer than the target, or
    /// the scan was abandoned on a stop signal.
    Unbounded,
}

impl Distance {
    /// The value when finite.
    pub fn finite(self) -> Option<f64> {
        match self {
            Distance::Finite(v) => Some(v),
            Distance::Unbounded => None,
        }
    }

    pub fn is_unbounded(self) -> bool {
        matches!(self, Distance::Unbounded)
    }

    /// Unbounded becomes `f64::INFINITY`.
    pub fn as_f64(self) -> f64 {
        self.finite().unwrap_or(f64::INFINITY)
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Distance::Finite(v) => match f.precision() {
                Some(p) => write!(f, "{v:.p$}"),
                None => write!(f, "{v}"),
            },
            Distance::Unbounded => f.write_str("inf"),
        }
    }
}

// ---------------------------------------------------------------------------
// DistanceMap
// ---------------------------------------------------------------------------

/// Reference name → [`Distance`], kept in insertion (library) order so
/// tie-breaking is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DistanceMap {
    entries: Vec<(String, Distance)>,
}

impl DistanceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the distance for `name`.  A replaced entry keeps
    /// its original position.
    pub fn insert(&mut self, name: impl Into<String>, distance: Distance) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = distance,
            None => self.entries.push((name, distance)),
        }
    }

    pub fn get(&self, name: &str) -> Option<Distance> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, d)| *d)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Distance)> {
        self.entries.iter().map(|(n, d)| (n.as_str(), *d))
    }

    /// Finite entries only, in order.
    pub fn finite(&self) -> impl Iterator<Item = (&str, f64)> {
        self.iter().filter_map(|(n, d)| d.finite().map(|v| (n, v)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, Distance)> for DistanceMap {
    fn from_iter<I: IntoIterator<Item = (S, Distance)>>(iter: I) -> Self {
        let mut map = DistanceMap::new();
        for (name, d) in iter {
            map.insert(name, d);
        }
        map
    }
}

impl fmt::Display for DistanceMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, d) in self.iter() {
            let value = format!("{d:.2}");
            writeln!(f, "{name:30}{value:>12}")?;
        }
        Ok(())
    }
}
