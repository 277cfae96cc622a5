//! Error types for dataset canonicalization and segmentation

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// No posts remain after filtering. Fatal to the whole pipeline, unlike a
    /// per-segment `InsufficientSample` placeholder.
    #[error("no posts remain after filtering")]
    InsufficientData,

    /// Subreddit segmentation over a dataset with a single subreddit; a
    /// two-group comparison is undefined with one group.
    #[error("dataset contains only one subreddit; comparison undefined")]
    SingleSubreddit,

    #[error("hour block width must divide 24, got {0}")]
    InvalidBlockWidth(u32),

    #[error("block width must be positive, got {0}")]
    EmptyBlock(u32),

    #[error("confidence level must be in (0, 1), got {0}")]
    InvalidConfidence(f32),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_data_message() {
        let err = Error::InsufficientData;
        assert_eq!(err.to_string(), "no posts remain after filtering");
    }

    #[test]
    fn test_single_subreddit_message() {
        let err = Error::SingleSubreddit;
        assert!(err.to_string().contains("one subreddit"));
    }

    #[test]
    fn test_invalid_block_width_message() {
        let err = Error::InvalidBlockWidth(5);
        assert!(err.to_string().contains('5'));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
