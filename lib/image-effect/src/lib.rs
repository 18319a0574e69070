pub mod base_effect;
pub mod format;
pub mod pipeline;
pub mod transform;

use image::RgbaImage;

pub use format::OutputFormat;
pub use pipeline::{TransformParams, decode_rgba, process_file, process_image};

pub type ImageEffectResult<T> = Result<T, ImageEffectError>;

#[derive(thiserror::Error, Debug)]
pub enum ImageEffectError {
    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

pub trait Effect {
    fn apply(&self, image: &mut RgbaImage) -> ImageEffectResult<()>;
}

#[derive(Debug, Clone)]
pub enum ImageEffect {
    Modulate(base_effect::ModulateConfig),
    Rotate(transform::RotateConfig),
    Resize(transform::ResizeConfig),
}

impl Effect for ImageEffect {
    fn apply(&self, image: &mut RgbaImage) -> ImageEffectResult<()> {
        match self {
            ImageEffect::Modulate(config) => config.apply(image),
            ImageEffect::Rotate(config) => config.apply(image),
            ImageEffect::Resize(config) => config.apply(image),
        }
    }
}
