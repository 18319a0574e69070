//! Geometric transformations (rotate, resize)

use crate::{Effect, ImageEffectError, ImageEffectResult};
use derivative::Derivative;
use derive_setters::Setters;
use image::{
    Rgba, RgbaImage,
    imageops::{self, FilterType},
};
use imageproc::geometric_transformations::{Interpolation, rotate_about_center};

pub const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Clockwise rotation
///
/// Right angles are lossless. Any other angle grows the canvas to the
/// bounding box of the rotated image and fills the corners with `background`.
#[derive(Debug, Clone, Derivative, Setters)]
#[derivative(Default)]
#[setters(prefix = "with_")]
#[non_exhaustive]
pub struct RotateConfig {
    #[derivative(Default(value = "0.0"))]
    pub degrees: f32,

    #[derivative(Default(value = "BLACK"))]
    pub background: Rgba<u8>,
}

impl RotateConfig {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Effect for RotateConfig {
    fn apply(&self, image: &mut RgbaImage) -> ImageEffectResult<()> {
        if !self.degrees.is_finite() {
            return Err(ImageEffectError::InvalidParameter(format!(
                "rotation must be a finite number, got {}",
                self.degrees
            )));
        }

        let degrees = self.degrees.rem_euclid(360.0);

        if degrees == 0.0 {
            return Ok(());
        } else if degrees == 90.0 {
            *image = imageops::rotate90(image);
        } else if degrees == 180.0 {
            *image = imageops::rotate180(image);
        } else if degrees == 270.0 {
            *image = imageops::rotate270(image);
        } else {
            *image = rotate_expanded(image, degrees, self.background);
        }

        Ok(())
    }
}

fn rotate_expanded(image: &RgbaImage, degrees: f32, background: Rgba<u8>) -> RgbaImage {
    let (width, height) = image.dimensions();
    let (dst_width, dst_height) = rotated_bounds(width, height, degrees);

    log::debug!("rotate {degrees}: {width}x{height} -> {dst_width}x{dst_height}");

    // The work canvas must hold both the source and the rotated result
    let (canvas_width, canvas_height) = (dst_width.max(width), dst_height.max(height));
    let mut canvas = RgbaImage::from_pixel(canvas_width, canvas_height, background);
    imageops::overlay(
        &mut canvas,
        image,
        ((canvas_width - width) / 2) as i64,
        ((canvas_height - height) / 2) as i64,
    );

    let rotated = rotate_about_center(
        &canvas,
        degrees.to_radians(),
        Interpolation::Bilinear,
        background,
    );

    if (canvas_width, canvas_height) == (dst_width, dst_height) {
        return rotated;
    }

    imageops::crop_imm(
        &rotated,
        (canvas_width - dst_width) / 2,
        (canvas_height - dst_height) / 2,
        dst_width,
        dst_height,
    )
    .to_image()
}

/// Size of the axis aligned box holding a `width` x `height` image rotated by `degrees`
pub fn rotated_bounds(width: u32, height: u32, degrees: f32) -> (u32, u32) {
    let theta = degrees.to_radians();
    let (sin, cos) = (theta.sin().abs(), theta.cos().abs());
    let (w, h) = (width as f32, height as f32);

    // Trim float noise so 45.0000001 does not add a pixel
    let fit = |v: f32| (v - 1e-3).ceil().max(1.0) as u32;

    (fit(w * cos + h * sin), fit(w * sin + h * cos))
}

/// Contain fit into a fixed box
///
/// The aspect ratio is kept and the rest of the box is letterboxed with
/// `background`. Smaller sources are enlarged.
#[derive(Debug, Clone, Derivative, Setters)]
#[derivative(Default)]
#[setters(prefix = "with_")]
#[non_exhaustive]
pub struct ResizeConfig {
    #[derivative(Default(value = "400"))]
    pub width: u32,

    #[derivative(Default(value = "400"))]
    pub height: u32,

    #[derivative(Default(value = "BLACK"))]
    pub background: Rgba<u8>,

    #[derivative(Default(value = "FilterType::Lanczos3"))]
    pub filter: FilterType,
}

impl ResizeConfig {
    pub fn new(width: u32, height: u32) -> Self {
        Self::default().with_width(width).with_height(height)
    }
}

impl Effect for ResizeConfig {
    fn apply(&self, image: &mut RgbaImage) -> ImageEffectResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ImageEffectError::InvalidParameter(format!(
                "resize target must not be empty, got {}x{}",
                self.width, self.height
            )));
        }

        let (src_width, src_height) = image.dimensions();
        if src_width == 0 || src_height == 0 {
            return Err(ImageEffectError::InvalidParameter(
                "cannot resize an empty image".to_string(),
            ));
        }

        let (dst_width, dst_height) =
            contain_dimensions(src_width, src_height, self.width, self.height);

        let scaled = if (dst_width, dst_height) == (src_width, src_height) {
            image.clone()
        } else {
            imageops::resize(image, dst_width, dst_height, self.filter)
        };

        let mut canvas = RgbaImage::from_pixel(self.width, self.height, self.background);
        imageops::overlay(
            &mut canvas,
            &scaled,
            ((self.width - dst_width) / 2) as i64,
            ((self.height - dst_height) / 2) as i64,
        );
        *image = canvas;

        Ok(())
    }
}

/// Largest size with the source aspect ratio that fits in the target box
pub fn contain_dimensions(
    src_width: u32,
    src_height: u32,
    max_width: u32,
    max_height: u32,
) -> (u32, u32) {
    let scale = (max_width as f64 / src_width as f64).min(max_height as f64 / src_height as f64);

    let width = ((src_width as f64 * scale).round() as u32).clamp(1, max_width);
    let height = ((src_height as f64 * scale).round() as u32).clamp(1, max_height);
    (width, height)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| Rgba([x as u8, y as u8, 128, 255]))
    }

    #[test]
    fn test_right_angle_rotation() -> ImageEffectResult<()> {
        let original = gradient(30, 10);

        let mut image = original.clone();
        RotateConfig::new().with_degrees(90.0).apply(&mut image)?;
        assert_eq!(image.dimensions(), (10, 30));
        // top-left moves to top-right when rotating clockwise
        assert_eq!(image.get_pixel(9, 0), original.get_pixel(0, 0));

        let mut image = original.clone();
        RotateConfig::new().with_degrees(-90.0).apply(&mut image)?;
        assert_eq!(image.dimensions(), (10, 30));

        let mut image = original.clone();
        RotateConfig::new().with_degrees(540.0).apply(&mut image)?;
        assert_eq!(image.dimensions(), (30, 10));
        assert_eq!(image.get_pixel(29, 9), original.get_pixel(0, 0));

        let mut image = original.clone();
        RotateConfig::new().with_degrees(0.0).apply(&mut image)?;
        assert_eq!(image, original);
        Ok(())
    }

    #[test]
    fn test_arbitrary_rotation_expands_canvas() -> ImageEffectResult<()> {
        let mut image = gradient(100, 100);
        RotateConfig::new().with_degrees(45.0).apply(&mut image)?;

        let (w, h) = image.dimensions();
        assert!((141..=142).contains(&w), "width {w}");
        assert!((141..=142).contains(&h), "height {h}");
        // corners are background
        assert_eq!(image.get_pixel(0, 0), &BLACK);
        Ok(())
    }

    #[test]
    fn test_small_rotation_of_wide_image() -> ImageEffectResult<()> {
        let mut image = gradient(200, 2);
        RotateConfig::new().with_degrees(10.0).apply(&mut image)?;
        assert_eq!(image.dimensions(), rotated_bounds(200, 2, 10.0));
        assert!(image.width() < 200);
        Ok(())
    }

    #[test]
    fn test_rotation_rejects_nan() {
        let mut image = gradient(2, 2);
        assert!(
            RotateConfig::new()
                .with_degrees(f32::NAN)
                .apply(&mut image)
                .is_err()
        );
    }

    #[test]
    fn test_contain_dimensions() {
        assert_eq!(contain_dimensions(800, 600, 400, 400), (400, 300));
        assert_eq!(contain_dimensions(600, 800, 400, 400), (300, 400));
        assert_eq!(contain_dimensions(50, 50, 400, 400), (400, 400));
        assert_eq!(contain_dimensions(4000, 1, 400, 400), (400, 1));
    }

    #[test]
    fn test_contain_letterboxes() -> ImageEffectResult<()> {
        let mut image = RgbaImage::from_pixel(800, 400, Rgba([255, 255, 255, 255]));
        ResizeConfig::new(400, 400).apply(&mut image)?;

        assert_eq!(image.dimensions(), (400, 400));
        assert_eq!(image.get_pixel(200, 10), &BLACK);
        assert!(image.get_pixel(200, 200).0[..3].iter().all(|&c| c > 250));
        Ok(())
    }

    #[test]
    fn test_contain_enlarges_small_source() -> ImageEffectResult<()> {
        let mut image = RgbaImage::from_pixel(10, 20, Rgba([255, 255, 255, 255]));
        ResizeConfig::new(400, 400).apply(&mut image)?;

        assert_eq!(image.dimensions(), (400, 400));
        assert_eq!(image.get_pixel(10, 200), &BLACK);
        assert!(image.get_pixel(200, 200).0[..3].iter().all(|&c| c > 250));
        Ok(())
    }

    #[test]
    fn test_resize_rejects_empty_target() {
        let mut image = gradient(10, 10);
        assert!(ResizeConfig::new(0, 10).apply(&mut image).is_err());
    }
}
