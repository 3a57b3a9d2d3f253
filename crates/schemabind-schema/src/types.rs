use crate::error::DescriptorError;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, sync::Arc};

///
/// TypeDescriptor
///
/// Structural identity of a generated model type: `(package, name)`.
/// Two descriptors are equal iff they denote the same generated type,
/// independent of whichever loader eventually materializes it.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct TypeDescriptor {
    package: Arc<str>,
    name: Arc<str>,
}

impl TypeDescriptor {
    pub fn new(package: &str, name: &str) -> Result<Self, DescriptorError> {
        if name.is_empty() {
            return Err(DescriptorError::EmptyName);
        }
        if name.contains('.') {
            return Err(DescriptorError::QualifiedName(name.to_string()));
        }
        if package.starts_with('.') || package.ends_with('.') || package.contains("..") {
            return Err(DescriptorError::InvalidPackage(package.to_string()));
        }

        Ok(Self {
            package: Arc::from(package),
            name: Arc::from(name),
        })
    }

    #[must_use]
    pub fn package(&self) -> &str {
        &self.package
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `package.Name`, or just `Name` for the default package.
    #[must_use]
    pub fn fully_qualified_name(&self) -> String {
        if self.package.is_empty() {
            self.name.to_string()
        } else {
            format!("{}.{}", self.package, self.name)
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.package.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}.{}", self.package, self.name)
        }
    }
}

impl FromStr for TypeDescriptor {
    type Err = DescriptorError;

    fn from_str(fqn: &str) -> Result<Self, Self::Err> {
        match fqn.rsplit_once('.') {
            Some((package, name)) => Self::new(package, name),
            None => Self::new("", fqn),
        }
    }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
