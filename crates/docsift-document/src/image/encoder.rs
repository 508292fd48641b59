// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image encoder: passes through embedded JPEG / JPEG 2000 streams and
// re-encodes uncompressed samples as PNG using the `image` crate.

use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use tracing::{debug, instrument};

use docsift_core::error::{DocsiftError, Result};
use docsift_core::traits::ImageDecoder;
use docsift_core::types::{EncodedImage, ImageEncoding, PixelLayout, RawImage};

/// Stateless encoder for images read out of a document.
#[derive(Debug, Clone, Copy, Default)]
pub struct PixelEncoder;

impl PixelEncoder {
    pub fn new() -> Self {
        Self
    }

    // -- Raw sample conversion ------------------------------------------------

    /// Normalise samples to 8 bits per component.
    fn to_eight_bit(raw: &RawImage, components: usize, bits: u8) -> Result<Vec<u8>> {
        let width = raw.width as usize;
        let height = raw.height as usize;
        let samples = width
            .checked_mul(height)
            .and_then(|pixels| pixels.checked_mul(components))
            .ok_or_else(|| oversized(raw))?;
        match bits {
            8 => {
                let expected = samples;
                if raw.data.len() < expected {
                    return Err(DocsiftError::Image(format!(
                        "sample data too short: {} bytes for {}x{}x{}",
                        raw.data.len(),
                        width,
                        height,
                        components
                    )));
                }
                Ok(raw.data[..expected].to_vec())
            }
            16 => {
                let expected = samples.checked_mul(2).ok_or_else(|| oversized(raw))?;
                if raw.data.len() < expected {
                    return Err(DocsiftError::Image(
                        "16-bit sample data too short".to_string(),
                    ));
                }
                // Keep the high byte of each big-endian sample.
                Ok(raw.data[..expected].iter().step_by(2).copied().collect())
            }
            1 if components == 1 => {
                let stride = width.div_ceil(8);
                let expected = stride.checked_mul(height).ok_or_else(|| oversized(raw))?;
                if raw.data.len() < expected {
                    return Err(DocsiftError::Image("bilevel data too short".to_string()));
                }
                let mut out = Vec::with_capacity(samples);
                for row in raw.data.chunks(stride).take(height) {
                    for x in 0..width {
                        let bit = (row[x / 8] >> (7 - (x % 8))) & 1;
                        out.push(if bit == 1 { 255 } else { 0 });
                    }
                }
                Ok(out)
            }
            other => Err(DocsiftError::Image(format!(
                "unsupported bit depth {} for {} components",
                other, components
            ))),
        }
    }

    fn encode_png(image: DynamicImage) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        image
            .write_to(&mut buffer, ImageFormat::Png)
            .map_err(|err| DocsiftError::Image(format!("PNG encoding failed: {}", err)))?;
        Ok(buffer.into_inner())
    }
}

impl ImageDecoder for PixelEncoder {
    #[instrument(skip_all, fields(width = image.width, height = image.height))]
    fn encode(&self, image: &RawImage) -> Result<EncodedImage> {
        match &image.encoding {
            ImageEncoding::Jpeg => {
                if !image.data.starts_with(&[0xFF, 0xD8]) {
                    return Err(DocsiftError::Image(
                        "JPEG stream lacks a start-of-image marker".to_string(),
                    ));
                }
                Ok(EncodedImage {
                    bytes: image.data.clone(),
                    extension: "jpg",
                })
            }
            ImageEncoding::Jpeg2000 => Ok(EncodedImage {
                bytes: image.data.clone(),
                extension: "jp2",
            }),
            ImageEncoding::Raw {
                layout,
                bits_per_component,
            } => {
                let dynamic = match layout {
                    PixelLayout::Gray => {
                        let samples = Self::to_eight_bit(image, 1, *bits_per_component)?;
                        GrayImage::from_raw(image.width, image.height, samples)
                            .map(DynamicImage::ImageLuma8)
                    }
                    PixelLayout::Rgb => {
                        let samples = Self::to_eight_bit(image, 3, *bits_per_component)?;
                        RgbImage::from_raw(image.width, image.height, samples)
                            .map(DynamicImage::ImageRgb8)
                    }
                    PixelLayout::Cmyk => {
                        let samples = Self::to_eight_bit(image, 4, *bits_per_component)?;
                        RgbImage::from_raw(image.width, image.height, cmyk_to_rgb(&samples))
                            .map(DynamicImage::ImageRgb8)
                    }
                    PixelLayout::Other(name) => {
                        return Err(DocsiftError::Image(format!(
                            "unsupported colour space {}",
                            name
                        )));
                    }
                };
                let dynamic = dynamic.ok_or_else(|| {
                    DocsiftError::Image("sample buffer does not match dimensions".to_string())
                })?;
                let bytes = Self::encode_png(dynamic)?;
                debug!(bytes = bytes.len(), "Raw image re-encoded as PNG");
                Ok(EncodedImage {
                    bytes,
                    extension: "png",
                })
            }
        }
    }
}

fn oversized(raw: &RawImage) -> DocsiftError {
    DocsiftError::Image(format!(
        "image dimensions {}x{} overflow the sample buffer size",
        raw.width, raw.height
    ))
}

/// Naive device CMYK to RGB.
fn cmyk_to_rgb(samples: &[u8]) -> Vec<u8> {
    samples
        .chunks_exact(4)
        .flat_map(|px| {
            let k = 255 - u16::from(px[3]);
            let channel = |c: u8| ((255 - u16::from(c)) * k / 255) as u8;
            [channel(px[0]), channel(px[1]), channel(px[2])]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(width: u32, height: u32, layout: PixelLayout, bits: u8, data: Vec<u8>) -> RawImage {
        RawImage {
            width,
            height,
            encoding: ImageEncoding::Raw {
                layout,
                bits_per_component: bits,
            },
            data,
        }
    }

    #[test]
    fn gray_samples_become_png() {
        let image = raw(4, 3, PixelLayout::Gray, 8, vec![200; 12]);
        let encoded = PixelEncoder::new().encode(&image).expect("encode");
        assert_eq!(encoded.extension, "png");

        let decoded = image::load_from_memory(&encoded.bytes).expect("decode png");
        assert_eq!((decoded.width(), decoded.height()), (4, 3));
    }

    #[test]
    fn rgb_and_cmyk_samples_become_png() {
        let rgb = raw(2, 2, PixelLayout::Rgb, 8, vec![10; 12]);
        assert_eq!(PixelEncoder.encode(&rgb).expect("rgb").extension, "png");

        let cmyk = raw(2, 2, PixelLayout::Cmyk, 8, vec![0, 0, 0, 255].repeat(4));
        let encoded = PixelEncoder.encode(&cmyk).expect("cmyk");
        let decoded = image::load_from_memory(&encoded.bytes).expect("decode");
        assert_eq!(decoded.to_rgb8().get_pixel(0, 0).0, [0, 0, 0]);
    }

    #[test]
    fn bilevel_rows_are_unpacked() {
        // 10 pixels wide: two bytes per row.
        let image = raw(10, 1, PixelLayout::Gray, 1, vec![0b1010_0000, 0b0100_0000]);
        let samples = PixelEncoder::to_eight_bit(&image, 1, 1).expect("unpack");
        assert_eq!(samples, vec![255, 0, 255, 0, 0, 0, 0, 0, 0, 255]);
    }

    #[test]
    fn jpeg_passes_through() {
        let image = RawImage {
            width: 1,
            height: 1,
            encoding: ImageEncoding::Jpeg,
            data: vec![0xFF, 0xD8, 0xFF, 0xE0],
        };
        let encoded = PixelEncoder.encode(&image).expect("jpeg");
        assert_eq!(encoded.extension, "jpg");
        assert_eq!(encoded.bytes, image.data);
    }

    #[test]
    fn short_buffers_and_unknown_spaces_fail() {
        let short = raw(10, 10, PixelLayout::Rgb, 8, vec![0; 5]);
        assert!(matches!(
            PixelEncoder.encode(&short),
            Err(DocsiftError::Image(_))
        ));

        let indexed = raw(2, 2, PixelLayout::Other("Indexed".into()), 8, vec![0; 4]);
        assert!(PixelEncoder.encode(&indexed).is_err());
    }

    #[test]
    fn absurd_dimensions_are_an_error() {
        for (layout, bits) in [
            (PixelLayout::Rgb, 8),
            (PixelLayout::Cmyk, 16),
            (PixelLayout::Gray, 1),
        ] {
            let image = raw(u32::MAX, u32::MAX, layout, bits, vec![0; 16]);
            assert!(matches!(
                PixelEncoder.encode(&image),
                Err(DocsiftError::Image(_))
            ));
        }
    }
}
