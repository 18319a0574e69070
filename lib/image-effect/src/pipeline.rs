//! The fixed rotate -> modulate -> resize -> encode chain used by the server.

use crate::{
    Effect, ImageEffect, ImageEffectResult, OutputFormat,
    base_effect::ModulateConfig,
    transform::{ResizeConfig, RotateConfig},
};
use derivative::Derivative;
use derive_setters::Setters;
use image::RgbaImage;
use std::{io::Cursor, path::Path};

#[derive(Debug, Clone, Derivative, Setters)]
#[derivative(Default)]
#[setters(prefix = "with_")]
#[non_exhaustive]
pub struct TransformParams {
    #[derivative(Default(value = "1.0"))]
    pub brightness: f32,

    #[derivative(Default(value = "0.0"))]
    pub hue: f32,

    #[derivative(Default(value = "1.0"))]
    pub saturation: f32,

    /// Clockwise, in degrees
    #[derivative(Default(value = "0.0"))]
    pub rotation: f32,

    #[derivative(Default(value = "OutputFormat::Jpeg"))]
    pub format: OutputFormat,

    /// Contain-fit box, `None` keeps the rotated size
    pub resize: Option<(u32, u32)>,
}

impl TransformParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn effects(&self) -> Vec<ImageEffect> {
        let mut effects = vec![ImageEffect::Rotate(
            RotateConfig::new().with_degrees(self.rotation),
        )];

        let modulate = ModulateConfig::new()
            .with_brightness(self.brightness)
            .with_saturation(self.saturation)
            .with_hue(self.hue);
        if !modulate.is_identity() {
            effects.push(ImageEffect::Modulate(modulate));
        }

        if let Some((width, height)) = self.resize {
            effects.push(ImageEffect::Resize(ResizeConfig::new(width, height)));
        }

        effects
    }

    /// Run every effect over `image`.
    pub fn apply(&self, mut image: RgbaImage) -> ImageEffectResult<RgbaImage> {
        for effect in self.effects() {
            effect.apply(&mut image)?;
        }
        Ok(image)
    }
}

pub fn open_rgba(path: impl AsRef<Path>) -> ImageEffectResult<RgbaImage> {
    let image = image::ImageReader::open(path)?
        .with_guessed_format()?
        .decode()?;
    Ok(image.to_rgba8())
}

/// Decode an in-memory encoded image, the format is sniffed from the bytes.
pub fn decode_rgba(bytes: &[u8]) -> ImageEffectResult<RgbaImage> {
    let image = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .decode()?;
    Ok(image.to_rgba8())
}

/// Transform an already decoded `image` and encode the result into `output`.
///
/// # Returns
/// The size of the written image.
pub fn process_image(
    image: RgbaImage,
    output: impl AsRef<Path>,
    params: &TransformParams,
) -> ImageEffectResult<(u32, u32)> {
    let output = output.as_ref();

    let image = params.apply(image)?;
    let dimensions = image.dimensions();

    log::debug!(
        "-> {} as {} {}x{} ({:?})",
        output.display(),
        params.format,
        dimensions.0,
        dimensions.1,
        params
    );

    params.format.encode_to_file(image, output)?;
    Ok(dimensions)
}

/// Decode `input`, transform it and encode the result into `output`.
///
/// Blocking, run it off the async executor.
pub fn process_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    params: &TransformParams,
) -> ImageEffectResult<(u32, u32)> {
    let input = input.as_ref();
    log::debug!("decode {}", input.display());
    process_image(open_rgba(input)?, output, params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn write_source(dir: &Path, name: &str, width: u32, height: u32) -> std::path::PathBuf {
        let path = dir.join(name);
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 90, 255])
        })
        .save(&path)
        .unwrap();
        path
    }

    #[test]
    fn test_default_effects_only_rotate() {
        let effects = TransformParams::new().effects();
        assert_eq!(effects.len(), 1);
        assert!(matches!(effects[0], ImageEffect::Rotate(_)));
    }

    #[test]
    fn test_effect_order() {
        let effects = TransformParams::new()
            .with_brightness(1.2)
            .with_resize(Some((400, 400)))
            .effects();

        assert!(matches!(
            effects.as_slice(),
            [
                ImageEffect::Rotate(_),
                ImageEffect::Modulate(_),
                ImageEffect::Resize(_)
            ]
        ));
    }

    #[test]
    fn test_process_file_without_resize_keeps_size() -> ImageEffectResult<()> {
        let dir = tempfile::tempdir()?;
        let input = write_source(dir.path(), "in.png", 640, 480);
        let output = dir.path().join("out.jpeg");

        let size = process_file(&input, &output, &TransformParams::new())?;
        assert_eq!(size, (640, 480));
        assert_eq!(open_rgba(&output)?.dimensions(), (640, 480));
        Ok(())
    }

    #[test]
    fn test_process_file_rotate_then_contain() -> ImageEffectResult<()> {
        let dir = tempfile::tempdir()?;
        let input = write_source(dir.path(), "in.png", 300, 100);
        let output = dir.path().join("out.png");

        let params = TransformParams::new()
            .with_rotation(90.0)
            .with_format(OutputFormat::Png)
            .with_resize(Some((400, 400)));
        assert_eq!(process_file(&input, &output, &params)?, (400, 400));

        let rotated = open_rgba(&output)?;
        // 100x300 scaled to 133x400, centered: left and right bands are black
        assert_eq!(rotated.get_pixel(10, 200), &crate::transform::BLACK);
        assert_ne!(rotated.get_pixel(200, 200), &crate::transform::BLACK);
        Ok(())
    }

    #[test]
    fn test_decode_rgba_sniffs_format() -> ImageEffectResult<()> {
        let dir = tempfile::tempdir()?;
        let input = write_source(dir.path(), "in.png", 12, 5);

        let image = decode_rgba(&std::fs::read(input)?)?;
        assert_eq!(image.dimensions(), (12, 5));
        assert!(decode_rgba(b"definitely not an image").is_err());
        Ok(())
    }

    #[test]
    fn test_process_image_contains_into_box() -> ImageEffectResult<()> {
        let dir = tempfile::tempdir()?;
        let output = dir.path().join("out.jpeg");

        let image = RgbaImage::from_pixel(30, 60, Rgba([200, 10, 10, 255]));
        let params = TransformParams::new().with_resize(Some((400, 400)));
        assert_eq!(process_image(image, &output, &params)?, (400, 400));
        assert_eq!(open_rgba(&output)?.dimensions(), (400, 400));
        Ok(())
    }

    #[test]
    fn test_process_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let result = process_file(
            dir.path().join("missing.png"),
            dir.path().join("out.png"),
            &TransformParams::new(),
        );
        assert!(result.is_err());
        assert!(!dir.path().join("out.png").exists());
    }
}
