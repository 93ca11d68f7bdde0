//! Dotted field paths (`seller.warehouses.0.city`) and wildcard patterns

use super::FormError;
use std::fmt;

/// One segment of a field path
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    Key(String),
    Index(usize),
    /// Matches every index of an array (patterns only)
    Any,
}

/// A parsed field path
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath {
    segments: Vec<Segment>,
}

impl FieldPath {
    /// Parse a dotted path. Numeric segments become indices, `*` becomes a wildcard.
    pub fn parse(raw: &str) -> Result<Self, FormError> {
        if raw.is_empty() {
            return Err(FormError::InvalidPath(raw.to_string()));
        }
        let mut segments = Vec::new();
        for part in raw.split('.') {
            if part.is_empty() {
                return Err(FormError::InvalidPath(raw.to_string()));
            }
            let segment = if part == "*" {
                Segment::Any
            } else if let Ok(index) = part.parse::<usize>() {
                Segment::Index(index)
            } else {
                Segment::Key(part.to_string())
            };
            segments.push(segment);
        }
        Ok(Self { segments })
    }

    /// The empty path, used as a starting point when building paths
    pub fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The first `len` segments
    pub fn prefix(&self, len: usize) -> Self {
        Self {
            segments: self.segments[..len.min(self.segments.len())].to_vec(),
        }
    }

    pub fn is_pattern(&self) -> bool {
        self.segments.iter().any(|s| matches!(s, Segment::Any))
    }

    /// Segments before the first wildcard, for row field patterns
    pub fn collection_root(&self) -> Option<Self> {
        let first = self.segments.iter().position(|s| matches!(s, Segment::Any))?;
        Some(Self {
            segments: self.segments[..first].to_vec(),
        })
    }

    /// Array holding the rows of the innermost wildcard
    /// (`businesses.*.products.*.price` -> `businesses.*.products`)
    pub fn row_collection(&self) -> Option<Self> {
        let last = self.segments.iter().rposition(|s| matches!(s, Segment::Any))?;
        Some(Self {
            segments: self.segments[..last].to_vec(),
        })
    }

    /// Append a key segment
    pub fn key(&self, key: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment::Key(key.to_string()));
        Self { segments }
    }

    /// Append an index segment
    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment::Index(index));
        Self { segments }
    }

    /// Join a relative path onto this one
    pub fn join(&self, relative: &FieldPath) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(relative.segments.iter().cloned());
        Self { segments }
    }

    pub fn parent(&self) -> Option<Self> {
        if self.segments.len() <= 1 {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    pub fn starts_with(&self, prefix: &FieldPath) -> bool {
        self.segments.len() >= prefix.segments.len()
            && self
                .segments
                .iter()
                .zip(prefix.segments.iter())
                .all(|(a, b)| segment_matches(b, a))
    }

    /// Whether a concrete path is matched by this pattern
    pub fn matches(&self, concrete: &FieldPath) -> bool {
        self.segments.len() == concrete.segments.len()
            && self
                .segments
                .iter()
                .zip(concrete.segments.iter())
                .all(|(p, c)| segment_matches(p, c))
    }

    /// The indices a concrete path binds to each wildcard of this pattern, in order
    pub fn bindings(&self, concrete: &FieldPath) -> Vec<usize> {
        self.segments
            .iter()
            .zip(concrete.segments.iter())
            .filter_map(|(p, c)| match (p, c) {
                (Segment::Any, Segment::Index(i)) => Some(*i),
                _ => None,
            })
            .collect()
    }

    /// Substitute wildcards left to right with the given indices.
    /// Wildcards without a binding are kept.
    pub fn bind(&self, indices: &[usize]) -> Self {
        let mut remaining = indices.iter();
        let segments = self
            .segments
            .iter()
            .map(|s| match s {
                Segment::Any => remaining
                    .next()
                    .map(|i| Segment::Index(*i))
                    .unwrap_or(Segment::Any),
                other => other.clone(),
            })
            .collect();
        Self { segments }
    }
}

fn segment_matches(pattern: &Segment, concrete: &Segment) -> bool {
    match (pattern, concrete) {
        (Segment::Any, Segment::Index(_)) => true,
        (a, b) => a == b,
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .segments
            .iter()
            .map(|s| match s {
                Segment::Key(k) => k.clone(),
                Segment::Index(i) => i.to_string(),
                Segment::Any => "*".to_string(),
            })
            .collect();
        write!(f, "{}", parts.join("."))
    }
}

impl std::str::FromStr for FieldPath {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
