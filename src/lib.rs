//! # SIFT extraction and matching
//!
//! This crate drives a scale-space detector over an image pyramid and turns its
//! raw output into oriented keypoints with fixed-point 128-byte descriptors, then
//! matches those descriptors between images with a ratio test and optional
//! cross checking.
//!
//! The detector itself is not part of this crate. Anything that implements
//! [`ScaleSpaceDetector`] can be plugged in, and images are read through the
//! [`Bitmap`] trait, which is implemented for the `image` crate's [`DynamicImage`](image::DynamicImage).
//!
//! ```no_run
//! # fn run<D: sift_match::ScaleSpaceDetector>() -> sift_match::Result<()> {
//! use sift_match::{MatchOptions, SiftOptions};
//!
//! let sift = SiftOptions::default();
//! let features1 = sift.extract_path::<D>("0000000000.png")?;
//! let features2 = sift.extract_path::<D>("0000000014.png")?;
//! let matches = MatchOptions::default().match_features(&features1, &features2)?;
//! for sift_match::FeatureMatch(ix1, ix2) in matches {
//!     let (a, b) = (features1.keypoints()[ix1], features2.keypoints()[ix2]);
//!     println!("({}, {}) <-> ({}, {})", a.x, a.y, b.x, b.y);
//! }
//! # Ok(())
//! # }
//! ```

mod bitmap;
mod detector;
mod distance;
mod error;
mod extract;
pub mod io;
mod keypoint;
mod matching;
pub mod normalize;
mod select;

pub use bitmap::{downscaled_dimensions, scale_bitmap, Bitmap, GrayFloatImage, ScaledSamples};
pub use detector::{DetectorParams, OctaveStatus, RawKeypoint, ScaleSpaceDetector, MAX_ORIENTATIONS};
pub use distance::{compute_distance_matrix, compute_guided_distance_matrix, DistanceMatrix};
pub use error::{Error, Result};
pub use extract::SiftOptions;
pub use keypoint::{keypoints_to_points, Features, Keypoint, DESCRIPTOR_SIZE};
pub use matching::{
    angular_distance, find_best_matches, find_best_matches_one_way, FeatureMatch, MatchOptions,
};
pub use normalize::Normalization;
pub use select::top_scale_features;

use ndarray::ArrayView2;

/// Extracts features from `bitmap` with the detector `D`.
///
/// Shorthand for [`SiftOptions::extract`].
pub fn extract<D, B>(bitmap: &B, options: &SiftOptions) -> Result<Features>
where
    D: ScaleSpaceDetector,
    B: Bitmap,
{
    options.extract::<D, B>(bitmap)
}

/// Matches two descriptor matrices, one descriptor per row.
///
/// Shorthand for [`MatchOptions::match_descriptors`].
pub fn match_descriptors(
    descriptors1: ArrayView2<u8>,
    descriptors2: ArrayView2<u8>,
    options: &MatchOptions,
) -> Result<Vec<FeatureMatch>> {
    options.match_descriptors(descriptors1, descriptors2)
}
