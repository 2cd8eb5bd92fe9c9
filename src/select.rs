use crate::{Features, Keypoint};
use core::cmp::Reverse;
use float_ord::FloatOrd;
use log::*;
use ndarray::Axis;

/// Keeps the `num_features` largest-scale features.
///
/// The kept features are ordered by descending scale, ties keep their original
/// relative order. Collections that are already small enough are returned unchanged.
pub fn top_scale_features(features: &Features, num_features: usize) -> Features {
    if features.len() <= num_features {
        return features.clone();
    }
    let keypoints = features.keypoints();
    let key = |&ix: &usize| (Reverse(FloatOrd(keypoints[ix].scale)), ix);

    // Only the leading `num_features` entries need to be ordered.
    let mut order: Vec<usize> = (0..keypoints.len()).collect();
    order.select_nth_unstable_by_key(num_features, key);
    order.truncate(num_features);
    order.sort_unstable_by_key(key);

    debug!(
        "Keeping {} of {} features, smallest kept scale {:?}",
        num_features,
        keypoints.len(),
        order.last().map(|&ix| keypoints[ix].scale)
    );

    let kept_keypoints: Vec<Keypoint> = order.iter().map(|&ix| keypoints[ix]).collect();
    let kept_descriptors = features.descriptors().select(Axis(0), &order);
    Features::from_aligned(kept_keypoints, kept_descriptors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DESCRIPTOR_SIZE;
    use ndarray::Array2;

    fn features_with_scales(scales: &[f32]) -> Features {
        let keypoints = scales
            .iter()
            .enumerate()
            .map(|(ix, &scale)| Keypoint {
                x: ix as f32,
                scale,
                ..Default::default()
            })
            .collect::<Vec<_>>();
        let descriptors =
            Array2::from_shape_fn((scales.len(), DESCRIPTOR_SIZE), |(row, _)| row as u8);
        Features::new(keypoints, descriptors).unwrap()
    }

    #[test]
    fn small_collections_are_unchanged() {
        let features = features_with_scales(&[1.0, 3.0, 2.0]);
        assert_eq!(top_scale_features(&features, 3), features);
        assert_eq!(top_scale_features(&features, 10), features);
    }

    #[test]
    fn keeps_largest_scales() {
        let features = features_with_scales(&[1.0, 5.0, 2.0, 4.0, 3.0]);
        let top = top_scale_features(&features, 2);
        assert_eq!(top.len(), 2);
        let scales: Vec<f32> = top.keypoints().iter().map(|kp| kp.scale).collect();
        assert_eq!(scales, vec![5.0, 4.0]);
        // Descriptors travel with their keypoints.
        assert_eq!(top.descriptor(0)[0], 1);
        assert_eq!(top.descriptor(1)[0], 3);
    }

    #[test]
    fn ties_keep_original_order() {
        let features = features_with_scales(&[2.0, 7.0, 2.0, 7.0, 2.0]);
        let top = top_scale_features(&features, 3);
        let xs: Vec<f32> = top.keypoints().iter().map(|kp| kp.x).collect();
        assert_eq!(xs, vec![1.0, 3.0, 0.0]);
    }

    #[test]
    fn zero_keeps_nothing() {
        let features = features_with_scales(&[2.0, 1.0]);
        assert!(top_scale_features(&features, 0).is_empty());
    }
}
