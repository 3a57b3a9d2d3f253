use crate::{
    module::AugmentationId, path::SchemaPath, qname::QNameModule, validate::ValidationError,
};
use thiserror::Error as ThisError;

///
/// QNameError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum QNameError {
    #[error("namespace is empty")]
    EmptyNamespace,

    #[error("local name is empty")]
    EmptyLocalName,

    #[error("invalid local name '{0}'")]
    InvalidLocalName(String),

    #[error("invalid revision '{0}', expected YYYY-MM-DD")]
    InvalidRevision(String),

    #[error("invalid qualified name '{0}'")]
    InvalidFormat(String),
}

///
/// DescriptorError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum DescriptorError {
    #[error("type name is empty")]
    EmptyName,

    #[error("type name '{0}' must not be qualified")]
    QualifiedName(String),

    #[error("invalid package '{0}'")]
    InvalidPackage(String),
}

///
/// SchemaError
///
/// Lookup and assembly failures of the schema context.
///

#[derive(Debug, ThisError)]
pub enum SchemaError {
    #[error("schema path is empty")]
    EmptyPath,

    #[error("no module for {0}")]
    ModuleNotFound(QNameModule),

    #[error("module {0} is declared twice")]
    DuplicateModule(QNameModule),

    #[error("schema node not found: {path}")]
    NodeNotFound { path: SchemaPath },

    #[error("path tries to nest inside leaf node: {path}")]
    NestedInLeaf { path: SchemaPath },

    #[error("target {target} of {id} not found")]
    AugmentTargetNotFound {
        id: AugmentationId,
        target: SchemaPath,
    },

    #[error("grouping '{name}' not found in module {module}")]
    GroupingNotFound { module: QNameModule, name: String },

    #[error(transparent)]
    QName(#[from] QNameError),

    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}
