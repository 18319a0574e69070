use crate::{Effect, ImageEffectError, ImageEffectResult};
use derivative::Derivative;
use derive_setters::Setters;
use image::RgbaImage;

fn check_factor(name: &str, value: f32) -> ImageEffectResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(ImageEffectError::InvalidParameter(format!(
            "{name} must be a finite, non negative number, got {value}"
        )));
    }
    Ok(())
}

/// Brightness multiplier, `1.0` keeps the image unchanged
#[derive(Debug, Clone, Derivative, Setters)]
#[derivative(Default)]
#[setters(prefix = "with_")]
#[non_exhaustive]
pub struct BrightnessConfig {
    #[derivative(Default(value = "1.0"))]
    pub factor: f32,
}

impl BrightnessConfig {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Effect for BrightnessConfig {
    fn apply(&self, image: &mut RgbaImage) -> ImageEffectResult<()> {
        check_factor("brightness", self.factor)?;
        if self.factor == 1.0 {
            return Ok(());
        }

        for pixel in image.pixels_mut() {
            for i in 0..3 {
                let new_val = (pixel[i] as f32 * self.factor).round();
                pixel[i] = new_val.clamp(0.0, 255.0) as u8;
            }
        }

        Ok(())
    }
}

/// Saturation multiplier, `0.0` is grayscale and `1.0` keeps the image unchanged
#[derive(Debug, Clone, Derivative, Setters)]
#[derivative(Default)]
#[setters(prefix = "with_")]
#[non_exhaustive]
pub struct SaturationConfig {
    #[derivative(Default(value = "1.0"))]
    pub factor: f32,
}

impl SaturationConfig {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Effect for SaturationConfig {
    fn apply(&self, image: &mut RgbaImage) -> ImageEffectResult<()> {
        check_factor("saturation", self.factor)?;
        if self.factor == 1.0 {
            return Ok(());
        }

        for pixel in image.pixels_mut() {
            // Human perception: 0.299*R + 0.587*G + 0.114*B
            let gray =
                0.299 * pixel[0] as f32 + 0.587 * pixel[1] as f32 + 0.114 * pixel[2] as f32;

            // Move every channel away from (or towards) the luminance gray
            for i in 0..3 {
                let val = pixel[i] as f32;
                let new_val = (gray + (val - gray) * self.factor).round();
                pixel[i] = new_val.clamp(0.0, 255.0) as u8;
            }
        }

        Ok(())
    }
}

/// Hue rotation in degrees
#[derive(Debug, Clone, Derivative, Setters)]
#[derivative(Default)]
#[setters(prefix = "with_")]
#[non_exhaustive]
pub struct HueRotateConfig {
    #[derivative(Default(value = "0.0"))]
    pub degrees: f32,
}

impl HueRotateConfig {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Effect for HueRotateConfig {
    fn apply(&self, image: &mut RgbaImage) -> ImageEffectResult<()> {
        if !self.degrees.is_finite() {
            return Err(ImageEffectError::InvalidParameter(format!(
                "hue must be a finite number, got {}",
                self.degrees
            )));
        }

        let degrees = self.degrees.rem_euclid(360.0);
        if degrees == 0.0 {
            return Ok(());
        }

        for pixel in image.pixels_mut() {
            let (h, s, l) = rgb_to_hsl(pixel[0], pixel[1], pixel[2]);
            let (r, g, b) = hsl_to_rgb((h + degrees) % 360.0, s, l);
            pixel[0] = r;
            pixel[1] = g;
            pixel[2] = b;
        }

        Ok(())
    }
}

/// Brightness, saturation and hue in one pass, applied in that order
#[derive(Debug, Clone, Derivative, Setters)]
#[derivative(Default)]
#[setters(prefix = "with_")]
#[non_exhaustive]
pub struct ModulateConfig {
    #[derivative(Default(value = "1.0"))]
    pub brightness: f32,

    #[derivative(Default(value = "1.0"))]
    pub saturation: f32,

    #[derivative(Default(value = "0.0"))]
    pub hue: f32,
}

impl ModulateConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_identity(&self) -> bool {
        self.brightness == 1.0 && self.saturation == 1.0 && self.hue.rem_euclid(360.0) == 0.0
    }
}

impl Effect for ModulateConfig {
    fn apply(&self, image: &mut RgbaImage) -> ImageEffectResult<()> {
        BrightnessConfig::new()
            .with_factor(self.brightness)
            .apply(image)?;
        SaturationConfig::new()
            .with_factor(self.saturation)
            .apply(image)?;
        HueRotateConfig::new().with_degrees(self.hue).apply(image)
    }
}

fn rgb_to_hsl(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
    let r = r as f32 / 255.0;
    let g = g as f32 / 255.0;
    let b = b as f32 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let lightness = (max + min) / 2.0;
    let saturation = if delta == 0.0 {
        0.0
    } else {
        delta / (1.0 - (2.0 * lightness - 1.0).abs())
    };

    let mut hue = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (((g - b) / delta) % 6.0)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };

    if hue < 0.0 {
        hue += 360.0;
    }

    (hue, saturation, lightness)
}

fn hsl_to_rgb(hue: f32, saturation: f32, lightness: f32) -> (u8, u8, u8) {
    let c = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let x = c * (1.0 - ((hue / 60.0) % 2.0 - 1.0).abs());
    let m = lightness - c / 2.0;

    let (r, g, b) = if hue < 60.0 {
        (c, x, 0.0)
    } else if hue < 120.0 {
        (x, c, 0.0)
    } else if hue < 180.0 {
        (0.0, c, x)
    } else if hue < 240.0 {
        (0.0, x, c)
    } else if hue < 300.0 {
        (x, 0.0, c)
    } else {
        (c, 0.0, x)
    };

    let to_u8 = |v: f32| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    (to_u8(r), to_u8(g), to_u8(b))
}
