use thiserror::Error;

/// Errors raised while loading, segmenting or rendering an image.
///
/// Apart from [`SegmentError::Entropy`], every variant is a deterministic
/// validation failure. Nothing here is retried; the pipeline aborts at the
/// first stage that reports one.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SegmentError {
    /// The source image could not be read, was empty, too large, or in an
    /// unsupported format.
    #[error("unable to load image: {0}")]
    ImageLoad(String),

    /// A tuning parameter or intermediate shape is out of its valid range.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// Input data has no pixels or inconsistent dimensions.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// JSON configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Rendered panels could not be encoded.
    #[error("PNG encode error: {0}")]
    Encode(String),

    /// No seed was configured and the OS entropy source failed.
    #[error("unable to seed random generator: {0}")]
    Entropy(String),
}

impl SegmentError {
    pub(crate) fn parameter(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SegmentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failure() {
        assert_eq!(
            SegmentError::parameter("k", "must be at least 1").to_string(),
            "invalid parameter `k`: must be at least 1"
        );
        assert_eq!(
            SegmentError::Entropy("no device".into()).to_string(),
            "unable to seed random generator: no device"
        );
    }
}
