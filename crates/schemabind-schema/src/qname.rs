use crate::error::QNameError;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, sync::Arc};

///
/// Revision
///
/// Module revision date in `YYYY-MM-DD` form.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct Revision(Arc<str>);

impl Revision {
    /// Validate and construct a revision date.
    pub fn new(value: &str) -> Result<Self, QNameError> {
        let bytes = value.as_bytes();
        let well_formed = bytes.len() == 10
            && bytes[4] == b'-'
            && bytes[7] == b'-'
            && bytes
                .iter()
                .enumerate()
                .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());

        if !well_formed {
            return Err(QNameError::InvalidRevision(value.to_string()));
        }

        Ok(Self(Arc::from(value)))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compact `YYYYMMDD` form used when deriving package names.
    #[must_use]
    pub fn compact(&self) -> String {
        self.0.chars().filter(char::is_ascii_digit).collect()
    }
}

impl TryFrom<String> for Revision {
    type Error = QNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Revision> for String {
    fn from(value: Revision) -> Self {
        value.0.to_string()
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

///
/// QNameModule
///
/// The `(namespace, revision)` half of a qualified name.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct QNameModule {
    namespace: Arc<str>,
    revision: Option<Revision>,
}

impl QNameModule {
    pub fn new(namespace: &str, revision: Option<&str>) -> Result<Self, QNameError> {
        if namespace.is_empty() {
            return Err(QNameError::EmptyNamespace);
        }
        let revision = revision.map(Revision::new).transpose()?;

        Ok(Self {
            namespace: Arc::from(namespace),
            revision,
        })
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    #[must_use]
    pub const fn revision(&self) -> Option<&Revision> {
        self.revision.as_ref()
    }
}

impl fmt::Display for QNameModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.revision {
            Some(rev) => write!(f, "{}?revision={rev}", self.namespace),
            None => f.write_str(&self.namespace),
        }
    }
}

///
/// QName
///
/// Qualified name of a schema node or wire node instance.
/// Equality and hashing cover namespace, revision and local name.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct QName {
    module: QNameModule,
    local_name: Arc<str>,
}

impl QName {
    pub fn new(
        namespace: &str,
        revision: Option<&str>,
        local_name: &str,
    ) -> Result<Self, QNameError> {
        let module = QNameModule::new(namespace, revision)?;

        Self::create(&module, local_name)
    }

    /// Construct a qualified name inside an existing module.
    pub fn create(module: &QNameModule, local_name: &str) -> Result<Self, QNameError> {
        validate_local_name(local_name)?;

        Ok(Self {
            module: module.clone(),
            local_name: Arc::from(local_name),
        })
    }

    #[must_use]
    pub const fn module(&self) -> &QNameModule {
        &self.module
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        self.module.namespace()
    }

    #[must_use]
    pub const fn revision(&self) -> Option<&Revision> {
        self.module.revision()
    }

    #[must_use]
    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    /// True when both names share namespace and revision.
    #[must_use]
    pub fn same_module(&self, other: &Self) -> bool {
        self.module == other.module
    }

    /// Sibling name in the same module.
    pub fn with_local_name(&self, local_name: &str) -> Result<Self, QNameError> {
        Self::create(&self.module, local_name)
    }
}

// local names follow the identifier rules of the schema language
fn validate_local_name(local_name: &str) -> Result<(), QNameError> {
    let mut chars = local_name.chars();
    let Some(first) = chars.next() else {
        return Err(QNameError::EmptyLocalName);
    };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return Err(QNameError::InvalidLocalName(local_name.to_string()));
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')) {
        return Err(QNameError::InvalidLocalName(local_name.to_string()));
    }

    Ok(())
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}){}", self.module, self.local_name)
    }
}

impl FromStr for QName {
    type Err = QNameError;

    // parses the `Display` form: `(namespace?revision=YYYY-MM-DD)local`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || QNameError::InvalidFormat(s.to_string());

        let rest = s.strip_prefix('(').ok_or_else(invalid)?;
        let (module, local) = rest.split_once(')').ok_or_else(invalid)?;
        let (namespace, revision) = match module.split_once("?revision=") {
            Some((ns, rev)) => (ns, Some(rev)),
            None => (module, None),
        };

        Self::new(namespace, revision, local)
    }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
