use crate::atom::AtomId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Atom not found: {0}")]
    NotFound(AtomId),

    #[error("Unknown atom: {0}")]
    UnknownAtom(AtomId),

    #[error("Invalid atom id: {0}")]
    InvalidAtomId(String),

    #[error("Atom {0} has no tensor")]
    TensorNotFound(AtomId),

    #[error("Invalid tensor: {0}")]
    InvalidTensor(String),

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Self-loop relationship on atom: {0}")]
    SelfLoop(AtomId),

    #[error("Invalid strength {0}: must be within [0, 1]")]
    InvalidStrength(f32),

    #[error("Invalid routine: {0}")]
    InvalidRoutine(String),

    #[error("Atom {atom} is still referenced by {edges} relationship(s)")]
    AtomInUse { atom: AtomId, edges: usize },

    #[error("Search query carries neither a tensor nor a semantic vector")]
    EmptyQuery,

    #[error("Invalid weighting: {0}")]
    InvalidWeighting(String),

    #[error("Invalid vector dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Invalid embedding: {0}")]
    InvalidEmbedding(String),

    #[error("Search backend unavailable: {0}")]
    SearchUnavailable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl Error {
    /// Validation failures are caller-fixable and never leave partial state behind.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::UnknownAtom(_)
                | Error::InvalidAtomId(_)
                | Error::InvalidTensor(_)
                | Error::InvalidRange(_)
                | Error::SelfLoop(_)
                | Error::InvalidStrength(_)
                | Error::InvalidRoutine(_)
                | Error::EmptyQuery
                | Error::InvalidWeighting(_)
                | Error::InvalidDimension { .. }
                | Error::InvalidEmbedding(_)
        )
    }
}
