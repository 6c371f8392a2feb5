//! Image preprocessing for vision models.

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, RgbImage};
use ndarray::Array4;
use onnxcpu_inference::{ElementType, Tensor};
use tracing::debug;

use crate::error::{OnnxCpuError, Result};
use crate::metadata::TensorInfo;

/// Scaling applied to float32 pixel values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Normalization {
    /// Raw 0-255 values.
    None,
    /// `x / 255`.
    #[default]
    Unit,
    /// `(x / 255 - mean) / std` with the ImageNet statistics.
    ImageNet,
}

/// Channel placement of an image tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// `[batch, 3, height, width]`
    Nchw,
    /// `[batch, height, width, 3]`
    Nhwc,
}

/// Turns an RGB image into the tensor a model input expects.
pub struct ImageTensorizer {
    normalization: Normalization,
    filter: FilterType,
}

impl ImageTensorizer {
    /// Create a new tensorizer with default settings.
    pub fn new() -> Self {
        Self {
            normalization: Normalization::default(),
            filter: FilterType::Triangle,
        }
    }

    /// Set float32 normalization.
    pub fn with_normalization(mut self, normalization: Normalization) -> Self {
        self.normalization = normalization;
        self
    }

    /// Set the resize filter.
    pub fn with_filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self
    }

    /// Build the tensor for `input` from `image`.
    ///
    /// Fixed height and width resize the image; dynamic ones keep its size.
    pub fn tensorize(&self, image: &DynamicImage, input: &TensorInfo) -> Result<Tensor> {
        let (layout, height, width) = image_dims(input)?;
        let dtype = ElementType::from_label(&input.data_type).ok_or_else(|| {
            OnnxCpuError::Preprocessing(format!(
                "input {:?} has unsupported type {}",
                input.name, input.data_type
            ))
        })?;

        let (orig_width, orig_height) = image.dimensions();
        let width = width.unwrap_or(orig_width);
        let height = height.unwrap_or(orig_height);

        let rgb = if (width, height) == (orig_width, orig_height) {
            image.to_rgb8()
        } else {
            image.resize_exact(width, height, self.filter).to_rgb8()
        };

        debug!(
            "Tensorizing {}x{} image as {:?} {} for input {:?}",
            width, height, layout, dtype, input.name
        );

        let tensor = match dtype {
            ElementType::Uint8 => Tensor::Uint8(fill(&rgb, layout, |_, v| v).into_dyn()),
            ElementType::Float32 => {
                let normalize = self.normalizer();
                Tensor::Float32(fill(&rgb, layout, normalize).into_dyn())
            }
        };

        Ok(tensor)
    }

    fn normalizer(&self) -> impl Fn(usize, u8) -> f32 {
        let mean = [0.485f32, 0.456, 0.406];
        let std = [0.229f32, 0.224, 0.225];
        let normalization = self.normalization;

        move |c, v| {
            let v = f32::from(v);
            match normalization {
                Normalization::None => v,
                Normalization::Unit => v / 255.0,
                Normalization::ImageNet => (v / 255.0 - mean[c]) / std[c],
            }
        }
    }
}

impl Default for ImageTensorizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Layout and fixed height / width of a rank-4 RGB input.
fn image_dims(input: &TensorInfo) -> Result<(Layout, Option<u32>, Option<u32>)> {
    let shape = &input.shape;
    let not_image = || {
        OnnxCpuError::Preprocessing(format!(
            "input {:?} with shape {:?} is not a single RGB image",
            input.name, shape
        ))
    };

    if shape.len() != 4 || !(shape[0] == 1 || shape[0] < 0) {
        return Err(not_image());
    }

    let fixed = |d: i64| u32::try_from(d).ok().filter(|&d| d > 0);

    if shape[1] == 3 {
        Ok((Layout::Nchw, fixed(shape[2]), fixed(shape[3])))
    } else if shape[3] == 3 {
        Ok((Layout::Nhwc, fixed(shape[1]), fixed(shape[2])))
    } else {
        Err(not_image())
    }
}

fn fill<T, F>(rgb: &RgbImage, layout: Layout, value: F) -> Array4<T>
where
    T: Clone + Default,
    F: Fn(usize, u8) -> T,
{
    let (width, height) = (rgb.width() as usize, rgb.height() as usize);
    let mut tensor = match layout {
        Layout::Nchw => Array4::from_elem((1, 3, height, width), T::default()),
        Layout::Nhwc => Array4::from_elem((1, height, width, 3), T::default()),
    };

    for (x, y, pixel) in rgb.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        for c in 0..3 {
            let v = value(c, pixel[c]);
            match layout {
                Layout::Nchw => tensor[[0, c, y, x]] = v,
                Layout::Nhwc => tensor[[0, y, x, c]] = v,
            }
        }
    }

    tensor
}
