use crate::{Error, Keypoint, Result, DESCRIPTOR_SIZE};
use log::*;
use ndarray::{Array2, ArrayView1, ArrayView2, ArrayViewMut1, Axis};

#[cfg(feature = "rayon")]
use ndarray::parallel::prelude::*;

/// Inner products between two sets of fixed-point descriptors.
///
/// Entry `(i1, i2)` compares row `i1` of the first set with row `i2` of the second.
/// Larger values mean more similar descriptors.
pub type DistanceMatrix = Array2<i32>;

#[inline]
fn dot(descriptor1: ArrayView1<u8>, descriptor2: ArrayView1<u8>) -> i32 {
    descriptor1
        .iter()
        .zip(descriptor2.iter())
        .map(|(&a, &b)| i32::from(a) * i32::from(b))
        .sum()
}

fn fill_row<F>(
    mut row: ArrayViewMut1<i32>,
    i1: usize,
    descriptors1: ArrayView2<u8>,
    descriptors2: ArrayView2<u8>,
    suppressed: &F,
) where
    F: Fn(usize, usize) -> bool,
{
    let descriptor1 = descriptors1.row(i1);
    for (i2, (out, descriptor2)) in row.iter_mut().zip(descriptors2.rows()).enumerate() {
        *out = if suppressed(i1, i2) {
            0
        } else {
            dot(descriptor1, descriptor2)
        };
    }
}

fn fill_distance_matrix<F>(
    descriptors1: ArrayView2<u8>,
    descriptors2: ArrayView2<u8>,
    suppressed: F,
) -> Result<DistanceMatrix>
where
    F: Fn(usize, usize) -> bool + Sync,
{
    // 128 saturated components keep the inner product well inside `i32`.
    for (name, descriptors) in [
        ("descriptor columns 1", descriptors1.view()),
        ("descriptor columns 2", descriptors2.view()),
    ] {
        if descriptors.ncols() != DESCRIPTOR_SIZE {
            return Err(Error::shape_mismatch(
                name,
                descriptors.ncols(),
                "descriptor size",
                DESCRIPTOR_SIZE,
            ));
        }
    }
    trace!(
        "Computing {} x {} distance matrix.",
        descriptors1.nrows(),
        descriptors2.nrows()
    );
    let mut dists = DistanceMatrix::zeros((descriptors1.nrows(), descriptors2.nrows()));
    #[cfg(not(feature = "rayon"))]
    {
        for (i1, row) in dists.axis_iter_mut(Axis(0)).enumerate() {
            fill_row(row, i1, descriptors1, descriptors2, &suppressed);
        }
    }
    #[cfg(feature = "rayon")]
    {
        dists
            .axis_iter_mut(Axis(0))
            .into_par_iter()
            .enumerate()
            .for_each(|(i1, row)| fill_row(row, i1, descriptors1, descriptors2, &suppressed));
    }
    Ok(dists)
}

/// Computes the inner product of every pair of descriptors.
///
/// Both matrices hold one descriptor per row, [`DESCRIPTOR_SIZE`] components wide.
pub fn compute_distance_matrix(
    descriptors1: ArrayView2<u8>,
    descriptors2: ArrayView2<u8>,
) -> Result<DistanceMatrix> {
    fill_distance_matrix(descriptors1, descriptors2, |_, _| false)
}

/// Computes the inner product of every pair of descriptors, except for pairs
/// whose keypoints the guide rejects, which get 0 and thus can never match.
///
/// The guide is called as `guide(x1, y1, x2, y2)` with the keypoint locations
/// and returns `true` for pairs that should be suppressed.
pub fn compute_guided_distance_matrix<G>(
    keypoints1: &[Keypoint],
    keypoints2: &[Keypoint],
    descriptors1: ArrayView2<u8>,
    descriptors2: ArrayView2<u8>,
    guide: G,
) -> Result<DistanceMatrix>
where
    G: Fn(f32, f32, f32, f32) -> bool + Sync,
{
    if keypoints1.len() != descriptors1.nrows() {
        return Err(Error::shape_mismatch(
            "keypoints 1",
            keypoints1.len(),
            "descriptors 1",
            descriptors1.nrows(),
        ));
    }
    if keypoints2.len() != descriptors2.nrows() {
        return Err(Error::shape_mismatch(
            "keypoints 2",
            keypoints2.len(),
            "descriptors 2",
            descriptors2.nrows(),
        ));
    }
    fill_distance_matrix(descriptors1, descriptors2, |i1, i2| {
        let kp1 = &keypoints1[i1];
        let kp2 = &keypoints2[i2];
        guide(kp1.x, kp1.y, kp2.x, kp2.y)
    })
}
