use crate::{Error, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, ArrayViewMut1, Axis};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Fixed-point scale applied to normalized descriptors.
///
/// Normalized components rarely exceed 0.5, so scaling by 512 maps the useful
/// range onto `[0, 255]`. A descriptor matched against itself then has an inner
/// product of `512 * 512`.
pub const DESCRIPTOR_SCALE: f32 = 512.0;

/// How raw floating-point descriptors are normalized before quantization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Normalization {
    /// L1-normalizes each descriptor followed by element-wise square rooting.
    ///
    /// This is usually better than plain L2 normalization, see
    /// "Three things everyone should know to improve object retrieval",
    /// Relja Arandjelovic and Andrew Zisserman, CVPR 2012.
    #[default]
    L1Root,
    /// Each descriptor is L2-normalized.
    L2,
}

fn check_norm(norm: f32) -> Result<f32> {
    if norm > 0.0 && norm.is_finite() {
        Ok(norm)
    } else {
        Err(Error::DegenerateDescriptor { norm })
    }
}

/// Normalizes one descriptor in place.
pub fn normalize_descriptor(
    mut descriptor: ArrayViewMut1<f32>,
    normalization: Normalization,
) -> Result<()> {
    match normalization {
        Normalization::L2 => {
            let norm = check_norm(descriptor.dot(&descriptor).sqrt())?;
            descriptor /= norm;
        }
        Normalization::L1Root => {
            let norm = check_norm(descriptor.fold(0.0, |acc, &v| acc + v.abs()))?;
            descriptor.mapv_inplace(|v| (v / norm).sqrt());
        }
    }
    Ok(())
}

/// Normalizes every row of a descriptor matrix.
pub fn normalize_descriptors(
    descriptors: ArrayView2<f32>,
    normalization: Normalization,
) -> Result<Array2<f32>> {
    let mut normalized = descriptors.to_owned();
    for row in normalized.axis_iter_mut(Axis(0)) {
        normalize_descriptor(row, normalization)?;
    }
    Ok(normalized)
}

pub fn l2_normalize_descriptors(descriptors: ArrayView2<f32>) -> Result<Array2<f32>> {
    normalize_descriptors(descriptors, Normalization::L2)
}

pub fn l1_root_normalize_descriptors(descriptors: ArrayView2<f32>) -> Result<Array2<f32>> {
    normalize_descriptors(descriptors, Normalization::L1Root)
}

/// Scales a normalized component by [`DESCRIPTOR_SCALE`], rounds it and saturates to a byte.
#[inline]
pub fn to_unsigned_byte(value: f32) -> u8 {
    (DESCRIPTOR_SCALE * value).round().clamp(0.0, 255.0) as u8
}

/// Converts normalized descriptors to their fixed-point representation.
pub fn descriptors_to_unsigned_byte(descriptors: ArrayView2<f32>) -> Array2<u8> {
    descriptors.mapv(to_unsigned_byte)
}

/// Normalizes a single raw descriptor and converts it to fixed point.
pub fn quantize_descriptor(raw: ArrayView1<f32>, normalization: Normalization) -> Result<Array1<u8>> {
    let mut descriptor = raw.to_owned();
    normalize_descriptor(descriptor.view_mut(), normalization)?;
    Ok(descriptor.mapv(to_unsigned_byte))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array};

    #[test]
    fn l2_rows_have_unit_length() {
        let raw = array![[3.0f32, 4.0, 0.0], [1.0, 1.0, 1.0]];
        let normalized = l2_normalize_descriptors(raw.view()).unwrap();
        for row in normalized.rows() {
            assert!((row.dot(&row) - 1.0).abs() < 1e-6);
        }
        assert!((normalized[(0, 0)] - 0.6).abs() < 1e-6);
        assert!((normalized[(0, 1)] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn l1_root_squares_sum_to_one() {
        let raw = array![[1.0f32, 3.0, 0.0, 4.0]];
        let normalized = l1_root_normalize_descriptors(raw.view()).unwrap();
        let row = normalized.row(0);
        assert!((row.dot(&row) - 1.0).abs() < 1e-6);
        assert!((normalized[(0, 1)] - (3.0f32 / 8.0).sqrt()).abs() < 1e-6);
    }

    #[test]
    fn zero_descriptor_is_rejected() {
        let raw = Array::zeros((1, 128));
        assert!(matches!(
            l2_normalize_descriptors(raw.view()),
            Err(Error::DegenerateDescriptor { .. })
        ));
        assert!(matches!(
            l1_root_normalize_descriptors(raw.view()),
            Err(Error::DegenerateDescriptor { .. })
        ));
    }

    #[test]
    fn unsigned_byte_saturates() {
        assert_eq!(to_unsigned_byte(0.0), 0);
        assert_eq!(to_unsigned_byte(0.25), 128);
        assert_eq!(to_unsigned_byte(0.4980), 255);
        assert_eq!(to_unsigned_byte(0.5), 255);
        assert_eq!(to_unsigned_byte(1.0), 255);
        assert_eq!(to_unsigned_byte(-0.1), 0);
        // 512 * 0.001 = 0.512 rounds up.
        assert_eq!(to_unsigned_byte(0.001), 1);
    }

    #[test]
    fn single_component_descriptor_saturates() {
        let mut raw = Array1::zeros(128);
        raw[7] = 2.0;
        for normalization in [Normalization::L2, Normalization::L1Root] {
            let quantized = quantize_descriptor(raw.view(), normalization).unwrap();
            assert_eq!(quantized[7], 255);
            assert_eq!(quantized.iter().filter(|&&v| v != 0).count(), 1);
        }
    }
}
