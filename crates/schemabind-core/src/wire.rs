//! Generic wire tree: schema-agnostic `(qname, value-or-children)` nodes
//! exchanged with whatever parses or renders the external format.

use derive_more::Display;
use schemabind_schema::qname::QName;
use serde::{Deserialize, Serialize};
use std::fmt;

///
/// WireValue
///
/// Scalar payload of a leaf.
///

#[derive(Clone, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
#[remain::sorted]
pub enum WireValue {
    #[display("{_0}")]
    Bool(bool),
    #[display("0x{}", hex(_0))]
    Bytes(Vec<u8>),
    #[display("[empty]")]
    Empty,
    #[display("{_0}")]
    Int(i64),
    #[display("{_0}")]
    QName(QName),
    #[display("{_0:?}")]
    Text(String),
    #[display("{_0}")]
    Uint(u64),
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

///
/// WireNode
///
/// Immutable tree node. Composite children keep document order.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[remain::sorted]
pub enum WireNode {
    Composite { qname: QName, children: Vec<Self> },
    Leaf { qname: QName, value: WireValue },
    LeafSet { qname: QName, values: Vec<WireValue> },
}

impl WireNode {
    #[must_use]
    pub const fn leaf(qname: QName, value: WireValue) -> Self {
        Self::Leaf { qname, value }
    }

    #[must_use]
    pub const fn leaf_set(qname: QName, values: Vec<WireValue>) -> Self {
        Self::LeafSet { qname, values }
    }

    #[must_use]
    pub const fn composite(qname: QName, children: Vec<Self>) -> Self {
        Self::Composite { qname, children }
    }

    #[must_use]
    pub const fn qname(&self) -> &QName {
        match self {
            Self::Composite { qname, .. }
            | Self::Leaf { qname, .. }
            | Self::LeafSet { qname, .. } => qname,
        }
    }

    /// Children of a composite; leaves have none.
    #[must_use]
    pub fn children(&self) -> &[Self] {
        match self {
            Self::Composite { children, .. } => children,
            Self::Leaf { .. } | Self::LeafSet { .. } => &[],
        }
    }

    #[must_use]
    pub fn child(&self, qname: &QName) -> Option<&Self> {
        self.children().iter().find(|child| child.qname() == qname)
    }

    pub fn children_named<'a>(&'a self, qname: &'a QName) -> impl Iterator<Item = &'a Self> + 'a {
        self.children().iter().filter(move |child| child.qname() == qname)
    }

    /// QNames of the direct children, in document order.
    pub fn child_qnames(&self) -> impl Iterator<Item = &QName> {
        self.children().iter().map(Self::qname)
    }

    #[must_use]
    pub const fn value(&self) -> Option<&WireValue> {
        match self {
            Self::Leaf { value, .. } => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_composite(&self) -> bool {
        matches!(self, Self::Composite { .. })
    }
}

impl fmt::Display for WireNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leaf { qname, value } => write!(f, "{}={value}", qname.local_name()),
            Self::LeafSet { qname, values } => {
                write!(f, "{}=[", qname.local_name())?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str("]")
            }
            Self::Composite { qname, children } => {
                write!(f, "{}{{", qname.local_name())?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{child}")?;
                }
                f.write_str("}")
            }
        }
    }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
