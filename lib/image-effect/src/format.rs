use crate::{ImageEffectError, ImageEffectResult};
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::{fmt, path::Path};

/// Encoders the effect pipeline can write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Jpeg,
    Png,
    WebP,
    Gif,
    Bmp,
    Tiff,
}

impl OutputFormat {
    /// Parse a format name or file extension, case insensitive.
    ///
    /// `jpg` and `jpeg` are the same encoder, so are `tif` and `tiff`.
    pub fn from_name(name: &str) -> ImageEffectResult<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            "webp" => Ok(Self::WebP),
            "gif" => Ok(Self::Gif),
            "bmp" => Ok(Self::Bmp),
            "tiff" | "tif" => Ok(Self::Tiff),
            _ => Err(ImageEffectError::UnsupportedFormat(name.to_string())),
        }
    }

    /// Guess the format from the extension of `path`.
    pub fn from_path(path: impl AsRef<Path>) -> ImageEffectResult<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_string())
            .ok_or_else(|| ImageEffectError::UnsupportedFormat(path.display().to_string()))?;
        Self::from_name(&ext)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::WebP => "webp",
            Self::Gif => "gif",
            Self::Bmp => "bmp",
            Self::Tiff => "tiff",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        self.image_format().to_mime_type()
    }

    pub fn image_format(&self) -> ImageFormat {
        match self {
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Png => ImageFormat::Png,
            Self::WebP => ImageFormat::WebP,
            Self::Gif => ImageFormat::Gif,
            Self::Bmp => ImageFormat::Bmp,
            Self::Tiff => ImageFormat::Tiff,
        }
    }

    pub fn supports_alpha(&self) -> bool {
        !matches!(self, Self::Jpeg)
    }

    /// Encode `image` into `path`, dropping the alpha channel for encoders
    /// without one.
    pub fn encode_to_file(&self, image: RgbaImage, path: impl AsRef<Path>) -> ImageEffectResult<()> {
        let image = if self.supports_alpha() {
            DynamicImage::ImageRgba8(image)
        } else {
            DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(image).to_rgb8())
        };

        image.save_with_format(path, self.image_format())?;
        Ok(())
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
