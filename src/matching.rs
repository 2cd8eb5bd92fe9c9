use crate::distance::{compute_distance_matrix, compute_guided_distance_matrix};
use crate::normalize::DESCRIPTOR_SCALE;
use crate::{Error, Features, Result};
use log::*;
use ndarray::ArrayView2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Converts an inner product of two fixed-point descriptors into the cosine of their angle.
const DISTANCE_NORM: f32 = 1.0 / (DESCRIPTOR_SCALE * DESCRIPTOR_SCALE);

/// A correspondence between feature `.0` of the first set and feature `.1` of the second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FeatureMatch(pub usize, pub usize);

/// Contains the configuration parameters of descriptor matching.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MatchOptions {
    /// Maximum distance ratio between first and second best match, in `(0, 1]`.
    pub max_ratio: f64,

    /// Maximum angular distance (radians) to the best match.
    pub max_distance: f64,

    /// Whether to require the match to also be best in the opposite direction.
    pub cross_check: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            max_ratio: 0.8,
            max_distance: 0.7,
            cross_check: true,
        }
    }
}

/// Angle between two descriptors given their fixed-point inner product.
#[inline]
pub fn angular_distance(dot: i32) -> f32 {
    f32::acos(f32::min(DISTANCE_NORM * dot as f32, 1.0))
}

/// For every row, the column of its best match, if it passes both tests.
///
/// The best column is the one with the largest inner product, the first one
/// wins on ties. It is rejected if no entry is positive, if its angular
/// distance exceeds `max_distance`, or if that distance is not strictly below
/// `max_ratio` times the distance of the second best column. A tie between best
/// and second best never matches, whatever the ratio.
pub fn find_best_matches_one_way(
    dists: ArrayView2<i32>,
    max_ratio: f32,
    max_distance: f32,
) -> Vec<Option<usize>> {
    dists
        .rows()
        .into_iter()
        .map(|row| {
            let mut best = None;
            let mut best_dist = 0;
            let mut second_best_dist = 0;
            for (i2, &dist) in row.iter().enumerate() {
                if dist > best_dist {
                    best = Some(i2);
                    second_best_dist = best_dist;
                    best_dist = dist;
                } else if dist > second_best_dist {
                    second_best_dist = dist;
                }
            }

            let best = best?;
            if best_dist == second_best_dist {
                return None;
            }
            let best_dist = angular_distance(best_dist);
            if best_dist > max_distance {
                return None;
            }
            let second_best_dist = angular_distance(second_best_dist);
            if best_dist >= max_ratio * second_best_dist {
                return None;
            }
            Some(best)
        })
        .collect()
}

fn one_way_pair(
    dists: ArrayView2<i32>,
    max_ratio: f32,
    max_distance: f32,
) -> (Vec<Option<usize>>, Vec<Option<usize>>) {
    #[cfg(not(feature = "rayon"))]
    {
        (
            find_best_matches_one_way(dists, max_ratio, max_distance),
            find_best_matches_one_way(dists.t(), max_ratio, max_distance),
        )
    }
    #[cfg(feature = "rayon")]
    {
        rayon::join(
            || find_best_matches_one_way(dists, max_ratio, max_distance),
            || find_best_matches_one_way(dists.t(), max_ratio, max_distance),
        )
    }
}

/// Selects matches from a distance matrix.
///
/// With cross checking, a match is only kept if the first feature is also the
/// best match of the second one when matching in the opposite direction.
pub fn find_best_matches(dists: ArrayView2<i32>, options: &MatchOptions) -> Vec<FeatureMatch> {
    let max_ratio = options.max_ratio as f32;
    let max_distance = options.max_distance as f32;

    let matches: Vec<FeatureMatch> = if options.cross_check {
        let (matches12, matches21) = one_way_pair(dists, max_ratio, max_distance);
        debug!(
            "One-way matches: {} forward, {} backward",
            matches12.iter().flatten().count(),
            matches21.iter().flatten().count()
        );
        matches12
            .iter()
            .enumerate()
            .filter_map(|(i1, &i2)| {
                let i2 = i2?;
                (matches21[i2] == Some(i1)).then_some(FeatureMatch(i1, i2))
            })
            .collect()
    } else {
        find_best_matches_one_way(dists, max_ratio, max_distance)
            .into_iter()
            .enumerate()
            .filter_map(|(i1, i2)| Some(FeatureMatch(i1, i2?)))
            .collect()
    };
    info!("Found {} matches", matches.len());
    matches
}

impl MatchOptions {
    pub fn check(&self) -> Result<()> {
        if !(self.max_ratio > 0.0 && self.max_ratio <= 1.0) {
            return Err(Error::InvalidOptions("max_ratio must be in (0, 1]"));
        }
        if !(self.max_distance > 0.0) {
            return Err(Error::InvalidOptions("max_distance must be positive"));
        }
        Ok(())
    }

    /// Matches two descriptor matrices, one descriptor per row.
    pub fn match_descriptors(
        &self,
        descriptors1: ArrayView2<u8>,
        descriptors2: ArrayView2<u8>,
    ) -> Result<Vec<FeatureMatch>> {
        self.check()?;
        let dists = compute_distance_matrix(descriptors1, descriptors2)?;
        Ok(find_best_matches(dists.view(), self))
    }

    /// Matches two feature sets.
    pub fn match_features(&self, features1: &Features, features2: &Features) -> Result<Vec<FeatureMatch>> {
        self.match_descriptors(features1.descriptors(), features2.descriptors())
    }

    /// Matches two feature sets, never pairing features the guide rejects.
    ///
    /// The guide is called as `guide(x1, y1, x2, y2)` with the keypoint locations,
    /// typically to reject pairs far from a known epipolar line or homography.
    pub fn match_guided<G>(
        &self,
        features1: &Features,
        features2: &Features,
        guide: G,
    ) -> Result<Vec<FeatureMatch>>
    where
        G: Fn(f32, f32, f32, f32) -> bool + Sync,
    {
        self.check()?;
        let dists = compute_guided_distance_matrix(
            features1.keypoints(),
            features2.keypoints(),
            features1.descriptors(),
            features2.descriptors(),
            guide,
        )?;
        Ok(find_best_matches(dists.view(), self))
    }
}
