use crate::bitmap::{scale_bitmap, Bitmap, ScaledSamples};
use crate::detector::{
    DetectorParams, OctaveStatus, RawKeypoint, ScaleSpaceDetector, MAX_ORIENTATIONS,
};
use crate::normalize::{quantize_descriptor, Normalization};
use crate::{Error, Features, Keypoint, Result, DESCRIPTOR_SIZE};
use image::DynamicImage;
use log::*;
use ndarray::{Array2, ArrayView1};
use std::path::Path;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Contains the configuration parameters of SIFT extraction.
///
/// The most important parameters are `peak_threshold`, which gates weak
/// responses, and `max_num_features`, which bounds the output size.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SiftOptions {
    /// Maximum image size, otherwise the image will be down-scaled.
    pub max_image_size: u32,

    /// Maximum number of features to detect, keeping larger-scale features.
    ///
    /// Features are dropped one whole DoG level at a time, so the result
    /// may contain somewhat more features than this.
    pub max_num_features: usize,

    /// First octave in the pyramid, i.e. -1 upsamples the image by one level.
    pub first_octave: i32,

    /// Number of octaves.
    pub num_octaves: u32,

    /// Number of levels per octave.
    pub octave_resolution: u32,

    /// Peak threshold for detection.
    pub peak_threshold: f64,

    /// Edge threshold for detection.
    pub edge_threshold: f64,

    /// Maximum number of orientations per keypoint.
    pub max_num_orientations: usize,

    /// Fix the orientation to 0 for upright features.
    pub upright: bool,

    /// Descriptor normalization applied before quantization.
    pub normalization: Normalization,
}

impl Default for SiftOptions {
    fn default() -> SiftOptions {
        SiftOptions {
            max_image_size: 3200,
            max_num_features: 8192,
            first_octave: -1,
            num_octaves: 4,
            octave_resolution: 3,
            peak_threshold: 0.02 / 3.0,
            edge_threshold: 10.0,
            max_num_orientations: 2,
            upright: false,
            normalization: Normalization::L1Root,
        }
    }
}

impl SiftOptions {
    /// Default options with the orientation of every feature fixed to 0.
    pub fn upright() -> Self {
        Self {
            upright: true,
            ..Default::default()
        }
    }

    pub fn check(&self) -> Result<()> {
        if self.max_image_size == 0 {
            return Err(Error::InvalidOptions("max_image_size must be positive"));
        }
        if self.max_num_features == 0 {
            return Err(Error::InvalidOptions("max_num_features must be positive"));
        }
        if self.octave_resolution == 0 {
            return Err(Error::InvalidOptions("octave_resolution must be positive"));
        }
        if !(self.peak_threshold > 0.0) {
            return Err(Error::InvalidOptions("peak_threshold must be positive"));
        }
        if !(self.edge_threshold > 0.0) {
            return Err(Error::InvalidOptions("edge_threshold must be positive"));
        }
        if self.max_num_orientations == 0 {
            return Err(Error::InvalidOptions("max_num_orientations must be positive"));
        }
        Ok(())
    }
}

/// Features extracted from one DoG level of one octave.
#[derive(Debug)]
struct LevelGroup {
    /// Number of detector keypoints on the level, before orientation expansion.
    num_raw: usize,
    keypoints: Vec<Keypoint>,
    descriptors: Vec<u8>,
}

impl LevelGroup {
    fn new(capacity: usize) -> Self {
        Self {
            num_raw: 0,
            keypoints: Vec::with_capacity(capacity),
            descriptors: Vec::with_capacity(capacity * DESCRIPTOR_SIZE),
        }
    }

    fn push(&mut self, keypoint: Keypoint, descriptor: ArrayView1<u8>) {
        self.keypoints.push(keypoint);
        self.descriptors.extend(descriptor.iter().copied());
    }

    fn shrink_to_fit(&mut self) {
        self.keypoints.shrink_to_fit();
        self.descriptors.shrink_to_fit();
    }
}

/// Maps detector coordinates back onto the input image.
#[derive(Debug, Clone, Copy)]
struct InverseScale {
    x: f32,
    y: f32,
    xy: f32,
}

impl InverseScale {
    fn new(samples: &ScaledSamples) -> Self {
        let x = (1.0 / samples.scale_x) as f32;
        let y = (1.0 / samples.scale_y) as f32;
        Self {
            x,
            y,
            xy: (x + y) / 2.0,
        }
    }

    /// Moves the origin to the upper left image corner and undoes the down-scaling.
    fn keypoint(&self, raw: &RawKeypoint, orientation: f64) -> Keypoint {
        Keypoint {
            x: (raw.x + 0.5) * self.x,
            y: (raw.y + 0.5) * self.y,
            scale: raw.sigma * self.xy,
            orientation: orientation as f32,
        }
    }
}

/// Index of the first level group to keep so that the kept groups hold more
/// than `max_num_features` raw keypoints, counted from the coarsest level.
///
/// Returns 0 (keep everything) if all levels together stay within the limit.
fn first_group_to_keep(num_raw_per_group: &[usize], max_num_features: usize) -> usize {
    let mut num_features = 0;
    for (ix, &num_raw) in num_raw_per_group.iter().enumerate().rev() {
        num_features += num_raw;
        if num_features > max_num_features {
            return ix;
        }
    }
    0
}

impl SiftOptions {
    fn detector_params(&self, width: u32, height: u32) -> DetectorParams {
        DetectorParams {
            width,
            height,
            num_octaves: self.num_octaves,
            octave_resolution: self.octave_resolution,
            first_octave: self.first_octave,
            peak_threshold: self.peak_threshold,
            edge_threshold: self.edge_threshold,
        }
    }

    /// Upper bound on the features produced from one detector keypoint.
    fn orientations_per_keypoint(&self) -> usize {
        if self.upright {
            1
        } else {
            MAX_ORIENTATIONS.min(self.max_num_orientations)
        }
    }

    /// Orientations to describe a keypoint with.
    ///
    /// The detector reports the local maxima of the orientation histogram in
    /// the order it finds them, and the first ones are kept. This differs from
    /// picking the strongest maxima overall.
    fn keypoint_orientations<D: ScaleSpaceDetector>(
        &self,
        detector: &mut D,
        keypoint: &RawKeypoint,
    ) -> Vec<f64> {
        if self.upright {
            return vec![0.0];
        }
        let mut angles = detector.orientations(keypoint);
        angles.truncate(self.orientations_per_keypoint());
        angles
    }

    /// Turns the keypoints of the current octave into level groups.
    ///
    /// Orientation and descriptor batches never mix DoG levels, so every
    /// contiguous run of keypoints on the same level becomes its own group.
    fn extract_octave<D: ScaleSpaceDetector>(
        &self,
        detector: &mut D,
        inverse_scale: InverseScale,
        groups: &mut Vec<LevelGroup>,
    ) -> Result<()> {
        detector.detect();
        let raw_keypoints = detector.keypoints().to_vec();
        if raw_keypoints.is_empty() {
            trace!("Octave has no keypoints.");
            return Ok(());
        }
        for level_keypoints in raw_keypoints.chunk_by(|a, b| a.level == b.level) {
            let mut group =
                LevelGroup::new(self.orientations_per_keypoint() * level_keypoints.len());
            group.num_raw = level_keypoints.len();
            for raw in level_keypoints {
                for angle in self.keypoint_orientations(detector, raw) {
                    let keypoint = inverse_scale.keypoint(raw, angle);
                    let raw_descriptor = detector.descriptor(raw, angle);
                    let descriptor = quantize_descriptor(
                        ArrayView1::from(&raw_descriptor[..]),
                        self.normalization,
                    )?;
                    group.push(keypoint, descriptor.view());
                }
            }
            group.shrink_to_fit();
            trace!(
                "Level {} has {} keypoints and {} features.",
                level_keypoints[0].level,
                group.num_raw,
                group.keypoints.len()
            );
            groups.push(group);
        }
        Ok(())
    }

    /// Extract features using the scale-space detector `D`.
    ///
    /// This performs all operations end-to-end: down-scaling, octave traversal,
    /// orientation assignment, descriptor normalization and the feature cap.
    ///
    /// # Arguments
    /// * `bitmap` - The input image for which to extract features.
    ///
    /// Returns the keypoints in input image coordinates and their descriptors.
    pub fn extract<D, B>(&self, bitmap: &B) -> Result<Features>
    where
        D: ScaleSpaceDetector,
        B: Bitmap,
    {
        self.check()?;
        let scaled = scale_bitmap(bitmap, self.max_image_size);
        let inverse_scale = InverseScale::new(&scaled);

        let params = self.detector_params(scaled.width, scaled.height);
        let mut detector = D::new(&params).ok_or(Error::DetectorInit {
            width: scaled.width,
            height: scaled.height,
        })?;
        debug!(
            "Detector ready: {} x {}, {} octaves from {}, {} levels, peak {}, edge {}",
            params.width,
            params.height,
            params.num_octaves,
            params.first_octave,
            params.octave_resolution,
            params.peak_threshold,
            params.edge_threshold
        );

        let mut groups: Vec<LevelGroup> = vec![];
        let mut status = detector.process_first_octave(&scaled.samples);
        let mut octave = 0usize;
        while status == OctaveStatus::Processed {
            trace!("Processing octave {}.", octave);
            let num_groups = groups.len();
            self.extract_octave(&mut detector, inverse_scale, &mut groups)?;
            debug!(
                "Octave {} produced {} level groups",
                octave,
                groups.len() - num_groups
            );
            status = detector.process_next_octave();
            octave += 1;
        }

        let num_raw: Vec<usize> = groups.iter().map(|group| group.num_raw).collect();
        let first = first_group_to_keep(&num_raw, self.max_num_features);
        debug!(
            "Keeping level groups {}..{} of {} raw keypoints",
            first,
            groups.len(),
            num_raw.iter().sum::<usize>()
        );

        let kept = &groups[first..];
        let num_kept: usize = kept.iter().map(|group| group.keypoints.len()).sum();
        let mut keypoints = Vec::with_capacity(num_kept);
        let mut descriptors = Array2::zeros((num_kept, DESCRIPTOR_SIZE));
        let descriptor_values = kept
            .iter()
            .flat_map(|group| group.descriptors.chunks_exact(DESCRIPTOR_SIZE));
        for (mut row, values) in descriptors.rows_mut().into_iter().zip(descriptor_values) {
            row.assign(&ArrayView1::from(values));
        }
        for group in kept {
            keypoints.extend_from_slice(&group.keypoints);
        }
        info!("Extracted {} features", keypoints.len());
        Ok(Features::from_aligned(keypoints, descriptors))
    }

    /// Extract features from an image on disk.
    ///
    /// # Examples
    /// ```no_run
    /// # fn run<D: sift_match::ScaleSpaceDetector>() -> sift_match::Result<()> {
    /// let features = sift_match::SiftOptions::default().extract_path::<D>("image.png")?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn extract_path<D: ScaleSpaceDetector>(&self, path: impl AsRef<Path>) -> Result<Features> {
        let image: DynamicImage = ::image::open(path)?;
        self.extract::<D, _>(&image)
    }
}
