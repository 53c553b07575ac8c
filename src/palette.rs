//! Dominant-colour palettes from image bytes.

use std::collections::HashMap;
use std::io::Cursor;

use image::imageops::FilterType;
use image::{GenericImageView, ImageError, ImageReader, Limits};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Images are reduced to fit this square before counting
const SAMPLE_SIZE: u32 = 64;

/// Pixels with less alpha than this are ignored
const MIN_ALPHA: u8 = 128;

/// Largest encoded image accepted for a palette
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Largest width or height decoded
const MAX_DIMENSION: u32 = 8192;

#[derive(Debug, Error)]
pub enum PaletteError {
    #[error("could not decode image: {0}")]
    Decode(#[from] image::ImageError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }

    /// Parses `#rrggbb` or `rrggbb`
    pub fn from_hex(value: &str) -> Option<Rgb> {
        let hex = value.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    /// WCAG relative luminance in 0.0..=1.0
    pub fn relative_luminance(self) -> f64 {
        fn linear(c: u8) -> f64 {
            let c = f64::from(c) / 255.0;
            if c <= 0.03928 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        }
        0.2126 * linear(self.0) + 0.7152 * linear(self.1) + 0.0722 * linear(self.2)
    }

    /// Black or white, whichever contrasts more with this colour
    pub fn contrast_text(self) -> &'static str {
        // Luminance where contrast against black and white is equal
        if self.relative_luminance() > 0.179 {
            "#000000"
        } else {
            "#ffffff"
        }
    }
}

/// Black or white text for a `#rrggbb` background; `None` if the colour is malformed
pub fn contrast_text(colour: &str) -> Option<&'static str> {
    Rgb::from_hex(colour).map(Rgb::contrast_text)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Swatch {
    /// Mean colour of the bucket, `#rrggbb`
    pub colour: String,
    /// Fraction of the counted pixels in this bucket
    pub share: f64,
    /// Text colour readable on top of `colour`
    pub text: String,
}

#[derive(Default)]
struct Bucket {
    count: u64,
    r: u64,
    g: u64,
    b: u64,
}

/// The `count` most common colours of an image
///
/// Colours are grouped at 4 bits per channel. Buckets are ranked by pixel
/// count, ties broken by bucket key, and reported as their mean colour. A
/// fully transparent image yields an empty palette.
///
/// ### Errors
///
/// Returns `PaletteError::Decode` if the bytes are not a supported image or
/// its dimensions exceed the decoder limits.
pub fn extract_palette(bytes: &[u8], count: usize) -> Result<Vec<Swatch>, PaletteError> {
    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_DIMENSION);
    limits.max_image_height = Some(MAX_DIMENSION);

    let mut reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(ImageError::IoError)?;
    reader.limits(limits);
    let image = reader.decode()?;
    let sample = if image.width() > SAMPLE_SIZE || image.height() > SAMPLE_SIZE {
        image.resize(SAMPLE_SIZE, SAMPLE_SIZE, FilterType::Triangle)
    } else {
        image
    };
    let pixels = sample.to_rgba8();

    let mut buckets: HashMap<u16, Bucket> = HashMap::new();
    let mut counted = 0u64;
    for pixel in pixels.pixels() {
        let [r, g, b, a] = pixel.0;
        if a < MIN_ALPHA {
            continue;
        }
        let key = (u16::from(r >> 4) << 8) | (u16::from(g >> 4) << 4) | u16::from(b >> 4);
        let bucket = buckets.entry(key).or_default();
        bucket.count += 1;
        bucket.r += u64::from(r);
        bucket.g += u64::from(g);
        bucket.b += u64::from(b);
        counted += 1;
    }

    let mut ranked: Vec<(u16, Bucket)> = buckets.into_iter().collect();
    ranked.sort_by(|(ka, a), (kb, b)| b.count.cmp(&a.count).then(ka.cmp(kb)));

    let swatches: Vec<Swatch> = ranked
        .into_iter()
        .take(count)
        .map(|(_, bucket)| {
            let mean = |sum: u64| ((sum as f64 / bucket.count as f64).round()) as u8;
            let colour = Rgb(mean(bucket.r), mean(bucket.g), mean(bucket.b));
            Swatch {
                colour: colour.to_hex(),
                share: bucket.count as f64 / counted as f64,
                text: colour.contrast_text().to_string(),
            }
        })
        .collect();

    debug!(pixels = counted, swatches = swatches.len(), "Extracted palette");
    Ok(swatches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png(image: RgbaImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(image)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_hex_round_trip_and_contrast() {
        assert_eq!(Rgb(255, 0, 16).to_hex(), "#ff0010");
        assert_eq!(Rgb::from_hex("#FF0010"), Some(Rgb(255, 0, 16)));
        assert_eq!(Rgb::from_hex("#ff001"), None);
        assert_eq!(Rgb::from_hex("#gg0010"), None);

        assert_eq!(contrast_text("#ffffff"), Some("#000000"));
        assert_eq!(contrast_text("#000000"), Some("#ffffff"));
        assert_eq!(contrast_text("#ffff00"), Some("#000000"));
        assert_eq!(contrast_text("#0000aa"), Some("#ffffff"));
        assert_eq!(contrast_text("nope"), None);
    }

    #[test]
    fn test_extract_palette_ranks_by_count() {
        // Five red columns, two blue, one transparent
        let image = RgbaImage::from_fn(8, 8, |x, _| match x {
            0 => Rgba([0, 255, 0, 0]),
            1 | 2 => Rgba([0, 0, 250, 255]),
            _ => Rgba([250, 10, 10, 255]),
        });

        let palette = extract_palette(&png(image), 5).unwrap();

        assert_eq!(palette.len(), 2);
        assert_eq!(palette[0].colour, "#fa0a0a");
        assert_eq!(palette[1].colour, "#0000fa");
        assert!((palette[0].share - 5.0 / 7.0).abs() < 1e-9);
        assert!((palette[0].share + palette[1].share - 1.0).abs() < 1e-9);
        assert_eq!(palette[1].text, "#ffffff");
    }

    #[test]
    fn test_extract_palette_averages_within_bucket() {
        let image = RgbaImage::from_fn(2, 1, |x, _| if x == 0 { Rgba([16, 16, 16, 255]) } else { Rgba([30, 30, 30, 255]) });
        let palette = extract_palette(&png(image), 3).unwrap();

        assert_eq!(palette.len(), 1);
        assert_eq!(palette[0].colour, "#171717");
    }

    #[test]
    fn test_extract_palette_limits_and_downscales() {
        let image = RgbaImage::from_fn(300, 200, |x, y| Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255]));
        let palette = extract_palette(&png(image), 4).unwrap();
        assert_eq!(palette.len(), 4);

        let transparent = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 0]));
        assert!(extract_palette(&png(transparent), 4).unwrap().is_empty());
    }

    #[test]
    fn test_extract_palette_rejects_garbage() {
        assert!(matches!(extract_palette(b"not an image", 3), Err(PaletteError::Decode(_))));
    }

    #[test]
    fn test_extract_palette_refuses_oversized_dimensions() {
        let wide = RgbaImage::from_pixel(MAX_DIMENSION + 1, 1, Rgba([10, 20, 30, 255]));
        assert!(matches!(extract_palette(&png(wide), 3), Err(PaletteError::Decode(_))));
    }
}
