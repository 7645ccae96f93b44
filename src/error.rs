use thiserror::Error;

#[derive(Debug, Error)]
pub enum CNNForgeError {
    #[error("Invalid shape: every dimension must be positive")]
    InvalidShape,

    #[error("Shape exceeds maximum axes (32)")]
    ExceedMaxAxes,

    #[error("Count mismatch: expected {expected} values, got {actual}")]
    CountMismatch { expected: usize, actual: usize },

    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch { expected: Vec<usize>, actual: Vec<usize> },

    #[error("Axis {axis} out of range for rank {rank}")]
    InvalidAxis { axis: isize, rank: usize },

    #[error("Missing parameter: {0}")]
    MissingParam(String),

    #[error("Invalid parameter: {0}")]
    InvalidParam(String),

    #[error("Unknown layer type: {0}")]
    UnknownLayerType(String),

    #[error("Layer type already registered: {0}")]
    DuplicateLayerType(String),

    #[error("Unsupported pooling method: {0}")]
    UnsupportedPool(String),

    #[error("Net description declares no input dimensions")]
    MissingInputDim,

    #[error("Input shape mismatch: net expects {expected:?}, got {actual:?}")]
    InputShapeMismatch { expected: Vec<usize>, actual: Vec<usize> },

    #[error("Layer '{layer}' ({type_tag}) forward failed: {source}")]
    LayerForward {
        layer: String,
        type_tag: String,
        #[source]
        source: Box<CNNForgeError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invariant violated: {0}")]
    Invariant(String),
}

impl CNNForgeError {
    /// Fatal errors are contract violations by the caller (bad index vector,
    /// legacy access on a high-rank blob), not recoverable configuration or
    /// shape problems. Hosts may choose to abort on them.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CNNForgeError::Invariant(_))
    }
}

pub type Result<T> = std::result::Result<T, CNNForgeError>;
