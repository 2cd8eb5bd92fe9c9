use thiserror::Error;

/// Errors produced while extracting, normalizing, matching or persisting features.
#[derive(Debug, Error)]
pub enum Error {
    /// The scale-space detector refused the image geometry or could not allocate its pyramid.
    #[error("failed to initialize the scale-space detector for a {width} x {height} image")]
    DetectorInit {
        /// Width of the (possibly down-scaled) image handed to the detector
        width: u32,
        /// Height of the (possibly down-scaled) image handed to the detector
        height: u32,
    },

    /// Two collections that must be row-aligned are not.
    #[error("mismatched lengths: {left_name} ({left_len}) != {right_name} ({right_len})")]
    ShapeMismatch {
        /// Label for the left-hand collection
        left_name: &'static str,
        /// Length of the left-hand collection
        left_len: usize,
        /// Label for the right-hand collection
        right_name: &'static str,
        /// Length of the right-hand collection
        right_len: usize,
    },

    /// A raw descriptor had a zero (or non-finite) norm and cannot be normalized.
    #[error("cannot normalize a descriptor with norm {norm}")]
    DegenerateDescriptor {
        /// The offending norm
        norm: f32,
    },

    /// An option record failed validation.
    #[error("invalid options: {0}")]
    InvalidOptions(&'static str),

    /// The persisted text format could not be parsed.
    #[error("malformed feature file at line {line}: {reason}")]
    Format {
        /// One-based line number
        line: usize,
        /// What was wrong with it
        reason: String,
    },

    /// Reading or writing a feature file failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The input image could not be opened or decoded.
    #[error(transparent)]
    Image(#[from] image::ImageError),
}

pub type Result<T> = core::result::Result<T, Error>;

impl Error {
    pub(crate) fn shape_mismatch(
        left_name: &'static str,
        left_len: usize,
        right_name: &'static str,
        right_len: usize,
    ) -> Self {
        Error::ShapeMismatch {
            left_name,
            left_len,
            right_name,
            right_len,
        }
    }
}
