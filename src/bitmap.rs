use derive_more::{Deref, DerefMut};
use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, ImageBuffer, Luma};
use log::*;

type GrayImageBuffer = ImageBuffer<Luma<f32>, Vec<f32>>;

/// The pixel source the extractor reads from.
///
/// Decoding, color conversion and resampling stay with the implementor, the
/// extractor only asks for grey samples and, for large images, a smaller copy.
pub trait Bitmap: Sized {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Whether samples come straight from a single channel, without a color conversion.
    fn is_greyscale(&self) -> bool;

    /// Grey intensities in `[0, 1]`, row-major, `width * height` long.
    fn to_normalized_samples(&self) -> Vec<f32>;

    /// A resampled copy with exactly the given dimensions.
    fn rescale(&self, width: u32, height: u32) -> Self;
}

impl Bitmap for DynamicImage {
    fn width(&self) -> u32 {
        GenericImageView::width(self)
    }

    fn height(&self) -> u32 {
        GenericImageView::height(self)
    }

    fn is_greyscale(&self) -> bool {
        !self.color().has_color()
    }

    /// Intensities are quantized to 8 bits before normalization.
    fn to_normalized_samples(&self) -> Vec<f32> {
        self.to_luma8()
            .into_raw()
            .into_iter()
            .map(|v| f32::from(v) / 255.0)
            .collect()
    }

    fn rescale(&self, width: u32, height: u32) -> Self {
        self.resize_exact(width, height, FilterType::Triangle)
    }
}

/// A single channel float image with intensities in `[0, 1]`.
#[derive(Debug, Clone, Deref, DerefMut)]
pub struct GrayFloatImage(pub GrayImageBuffer);

impl GrayFloatImage {
    /// Create a unit float image from the image crate's DynamicImage type.
    ///
    /// 16-bit grey images keep their full precision, everything else goes
    /// through 8-bit luma.
    pub fn from_dynamic(input_image: &DynamicImage) -> Self {
        let width = GenericImageView::width(input_image);
        let height = GenericImageView::height(input_image);
        Self(match input_image.grayscale() {
            DynamicImage::ImageLuma16(gray_image) => {
                info!("Loaded a {} x {} 16-bit image", width, height);
                ImageBuffer::from_fn(width, height, |x, y| {
                    Luma([f32::from(gray_image[(x, y)][0]) / 65535f32])
                })
            }
            DynamicImage::ImageLumaA16(gray_image) => {
                info!("Loaded a {} x {} 16-bit image", width, height);
                ImageBuffer::from_fn(width, height, |x, y| {
                    Luma([f32::from(gray_image[(x, y)][0]) / 65535f32])
                })
            }
            other => {
                info!("Loaded a {} x {} 8-bit image", width, height);
                let gray_image = other.to_luma8();
                ImageBuffer::from_fn(width, height, |x, y| {
                    Luma([f32::from(gray_image[(x, y)][0]) / 255f32])
                })
            }
        })
    }

    /// Wraps row-major samples, `None` if there are not exactly `width * height` of them.
    pub fn from_samples(width: u32, height: u32, samples: Vec<f32>) -> Option<Self> {
        ImageBuffer::from_raw(width, height, samples).map(Self)
    }
}

impl Bitmap for GrayFloatImage {
    fn width(&self) -> u32 {
        self.0.width()
    }

    fn height(&self) -> u32 {
        self.0.height()
    }

    fn is_greyscale(&self) -> bool {
        true
    }

    fn to_normalized_samples(&self) -> Vec<f32> {
        self.0.as_raw().clone()
    }

    fn rescale(&self, width: u32, height: u32) -> Self {
        Self(imageops::resize(&self.0, width, height, FilterType::Triangle))
    }
}

/// Grey samples ready for the detector plus the factors that map the input
/// image onto them.
#[derive(Debug, Clone)]
pub struct ScaledSamples {
    pub width: u32,
    pub height: u32,
    pub samples: Vec<f32>,
    /// `new_width / old_width`, `1.0` if the image was not resized.
    pub scale_x: f64,
    /// `new_height / old_height`, `1.0` if the image was not resized.
    pub scale_y: f64,
}

/// Dimensions that fit an image into `max_image_size` while keeping its aspect,
/// or `None` if it already fits.
pub fn downscaled_dimensions(width: u32, height: u32, max_image_size: u32) -> Option<(u32, u32)> {
    if width <= max_image_size && height <= max_image_size {
        return None;
    }
    let scale = max_image_size as f64 / width.max(height) as f64;
    Some(((width as f64 * scale) as u32, (height as f64 * scale) as u32))
}

/// Down-samples the bitmap if either side exceeds `max_image_size`.
///
/// The x and y factors are computed from the rounded dimensions, so they may
/// differ slightly from each other.
pub fn scale_bitmap<B: Bitmap>(bitmap: &B, max_image_size: u32) -> ScaledSamples {
    let (width, height) = (bitmap.width(), bitmap.height());
    if !bitmap.is_greyscale() {
        trace!("Converting {} x {} color bitmap to grey.", width, height);
    }
    match downscaled_dimensions(width, height, max_image_size) {
        Some((new_width, new_height)) => {
            debug!(
                "Down-scaling {} x {} image to {} x {}",
                width, height, new_width, new_height
            );
            let scaled = bitmap.rescale(new_width, new_height);
            ScaledSamples {
                width: new_width,
                height: new_height,
                samples: scaled.to_normalized_samples(),
                scale_x: new_width as f64 / width as f64,
                scale_y: new_height as f64 / height as f64,
            }
        }
        None => ScaledSamples {
            width,
            height,
            samples: bitmap.to_normalized_samples(),
            scale_x: 1.0,
            scale_y: 1.0,
        },
    }
}
