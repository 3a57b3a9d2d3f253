use crate::qname::QName;
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};

///
/// SchemaPath
///
/// Ordered qualified names from a module root to a schema node.
/// Data-node paths include choice and case segments; grouping paths
/// start at the grouping name.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct SchemaPath {
    segments: Arc<[QName]>,
}

impl SchemaPath {
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn new(segments: impl Into<Arc<[QName]>>) -> Self {
        Self {
            segments: segments.into(),
        }
    }

    /// Extend this path by one segment.
    #[must_use]
    pub fn child(&self, qname: QName) -> Self {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend_from_slice(&self.segments);
        segments.push(qname);

        Self::new(segments)
    }

    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        match self.segments.split_last() {
            Some((_, parent)) => Some(Self::new(parent.to_vec())),
            None => None,
        }
    }

    #[must_use]
    pub fn last(&self) -> Option<&QName> {
        self.segments.last()
    }

    #[must_use]
    pub fn segments(&self) -> &[QName] {
        &self.segments
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    #[must_use]
    pub fn starts_with(&self, prefix: &Self) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// Re-root a path: replace `from` prefix with `to`.
    #[must_use]
    pub fn rebase(&self, from: &Self, to: &Self) -> Option<Self> {
        let suffix = self.segments.strip_prefix(&*from.segments)?;
        let mut segments = to.segments.to_vec();
        segments.extend_from_slice(suffix);

        Some(Self::new(segments))
    }
}

impl FromIterator<QName> for SchemaPath {
    fn from_iter<I: IntoIterator<Item = QName>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect::<Vec<_>>())
    }
}

impl From<Vec<QName>> for SchemaPath {
    fn from(segments: Vec<QName>) -> Self {
        Self::new(segments)
    }
}

impl fmt::Display for SchemaPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in self.segments.iter() {
            write!(f, "/{segment}")?;
        }

        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
