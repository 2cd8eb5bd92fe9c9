use crate::{Error, Result};
use cv_core::nalgebra::Point2;
use cv_core::ImagePoint;
use ndarray::{Array2, ArrayView1, ArrayView2};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of components of a SIFT descriptor.
pub const DESCRIPTOR_SIZE: usize = 128;

/// An oriented point of interest in an image.
///
/// The origin is the upper left image corner, so the center of the
/// upper left pixel sits at `(0.5, 0.5)`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Keypoint {
    /// Horizontal coordinate, +x faces right.
    pub x: f32,
    /// Vertical coordinate, +y faces toward the bottom of the image.
    pub y: f32,
    /// Scale (sigma) at which the keypoint was detected, in input image pixels.
    pub scale: f32,
    /// The orientation angle in radians.
    pub orientation: f32,
}

impl ImagePoint for Keypoint {
    fn image_point(&self) -> Point2<f64> {
        Point2::new(self.x as f64, self.y as f64)
    }
}

/// Keypoints together with their row-aligned fixed-point descriptors.
///
/// Row `i` of [`Features::descriptors`] always describes keypoint `i`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Features {
    keypoints: Vec<Keypoint>,
    descriptors: Array2<u8>,
}

impl Features {
    /// Pairs keypoints with a `(keypoints.len(), 128)` descriptor matrix.
    pub fn new(keypoints: Vec<Keypoint>, descriptors: Array2<u8>) -> Result<Self> {
        if descriptors.nrows() != keypoints.len() {
            return Err(Error::shape_mismatch(
                "descriptor rows",
                descriptors.nrows(),
                "keypoints",
                keypoints.len(),
            ));
        }
        if descriptors.ncols() != DESCRIPTOR_SIZE {
            return Err(Error::shape_mismatch(
                "descriptor columns",
                descriptors.ncols(),
                "descriptor size",
                DESCRIPTOR_SIZE,
            ));
        }
        Ok(Self {
            keypoints,
            descriptors,
        })
    }

    /// Builds a collection whose row alignment is guaranteed by construction.
    pub(crate) fn from_aligned(keypoints: Vec<Keypoint>, descriptors: Array2<u8>) -> Self {
        debug_assert_eq!(descriptors.nrows(), keypoints.len());
        debug_assert_eq!(descriptors.ncols(), DESCRIPTOR_SIZE);
        Self {
            keypoints,
            descriptors,
        }
    }

    pub fn empty() -> Self {
        Self {
            keypoints: vec![],
            descriptors: Array2::zeros((0, DESCRIPTOR_SIZE)),
        }
    }

    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    pub fn keypoints(&self) -> &[Keypoint] {
        &self.keypoints
    }

    pub fn descriptors(&self) -> ArrayView2<u8> {
        self.descriptors.view()
    }

    pub fn descriptor(&self, index: usize) -> ArrayView1<u8> {
        self.descriptors.row(index)
    }

    /// Iterates over `(keypoint, descriptor)` pairs in collection order.
    pub fn iter(&self) -> impl Iterator<Item = (&Keypoint, ArrayView1<u8>)> + '_ {
        self.keypoints.iter().zip(self.descriptors.rows())
    }

    pub fn into_parts(self) -> (Vec<Keypoint>, Array2<u8>) {
        (self.keypoints, self.descriptors)
    }
}

/// Extracts the image locations of the keypoints.
pub fn keypoints_to_points(keypoints: &[Keypoint]) -> Vec<Point2<f64>> {
    keypoints.iter().map(ImagePoint::image_point).collect()
}
