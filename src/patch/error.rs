use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PatchError {
    #[error("could not parse document: {0}")]
    Parse(String),

    #[error("could not serialise document: {0}")]
    Serialise(String),

    #[error("invalid path '{0}': paths must be empty or start with '/'")]
    InvalidPath(String),

    #[error("path '{0}' does not exist")]
    PathNotFound(String),

    #[error("path '{0}' goes through a value that is neither an object nor an array")]
    NotAContainer(String),

    #[error("invalid array index '{token}' in path '{path}'")]
    InvalidIndex { path: String, token: String },

    #[error("test failed: value at '{0}' differs from the expected value")]
    TestFailed(String),
}
