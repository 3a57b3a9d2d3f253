use crate::model::ModelType;
use thiserror::Error as ThisError;

///
/// TypeLoader
///
/// Materializes model types by fully-qualified name. Loading the same name
/// twice while the first type is alive should yield the same type.
///

pub trait TypeLoader: Send + Sync {
    fn load_type(&self, fully_qualified_name: &str) -> Result<ModelType, LoadError>;
}

///
/// LoadError
///

#[derive(Debug, ThisError)]
pub enum LoadError {
    #[error("type '{0}' is not known to the loader")]
    NotFound(String),

    #[error("loader returned '{found}' when asked for '{requested}'")]
    Mismatch { requested: String, found: String },

    #[error("failed to load type '{name}': {message}")]
    Failed { name: String, message: String },
}
