//! The scale-space detector consumed by the extractor.
//!
//! Any difference-of-Gaussian detector that walks its pyramid one octave at a
//! time can drive [`SiftOptions::extract`](crate::SiftOptions::extract), for example
//! a binding to VLFeat or a from-scratch implementation.

use crate::DESCRIPTOR_SIZE;

/// The detector never reports more candidate orientations than this per keypoint.
pub const MAX_ORIENTATIONS: usize = 4;

/// Pyramid geometry and detection thresholds handed to [`ScaleSpaceDetector::new`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorParams {
    pub width: u32,
    pub height: u32,
    pub num_octaves: u32,
    /// Number of DoG levels per octave.
    pub octave_resolution: u32,
    /// Index of the first octave, `-1` upsamples the image once before octave 0.
    pub first_octave: i32,
    /// Minimum DoG peak magnitude.
    pub peak_threshold: f64,
    /// Maximum ratio of principal curvatures, rejects edge responses.
    pub edge_threshold: f64,
}

/// Outcome of advancing the detector to an octave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OctaveStatus {
    /// The octave was built and can be searched for keypoints.
    Processed,
    /// No more octaves can be built from this image.
    Exhausted,
}

/// A keypoint as localized by the detector, in the coordinates of the image
/// it was given, with `(0, 0)` at the center of the upper left pixel.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RawKeypoint {
    pub x: f32,
    pub y: f32,
    pub sigma: f32,
    /// Index of the DoG level within the octave the keypoint was found on.
    pub level: i32,
}

pub trait ScaleSpaceDetector: Sized {
    /// Allocates a detector, `None` when the geometry cannot be handled.
    fn new(params: &DetectorParams) -> Option<Self>;

    /// Builds the first octave from grey samples in `[0, 1]`, row-major.
    fn process_first_octave(&mut self, samples: &[f32]) -> OctaveStatus;

    fn process_next_octave(&mut self) -> OctaveStatus;

    /// Searches the current octave for extrema.
    fn detect(&mut self);

    /// Keypoints found by the last call to [`ScaleSpaceDetector::detect`].
    ///
    /// Keypoints of the same DoG level are reported contiguously.
    fn keypoints(&self) -> &[RawKeypoint];

    /// Dominant orientations of a keypoint, in the order the local maxima of the
    /// orientation histogram were found. Only the first [`MAX_ORIENTATIONS`] are used.
    fn orientations(&mut self, keypoint: &RawKeypoint) -> Vec<f64>;

    /// The raw floating-point descriptor of a keypoint at the given orientation.
    fn descriptor(&mut self, keypoint: &RawKeypoint, angle: f64) -> [f32; DESCRIPTOR_SIZE];
}
