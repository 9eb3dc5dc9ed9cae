//! QR payload rendering.
//!
//! Pairing QR payloads are drawn as grayscale PNGs and embedded in the
//! status page as `data:` URLs.

// ============================================================================
// Imports
// ============================================================================

use std::io::Cursor;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as Base64Standard;
use image::{GrayImage, ImageFormat, Luma};
use qrcode::{Color, QrCode};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Prefix of every rendered image.
pub const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

const DARK: Luma<u8> = Luma([0]);
const LIGHT: Luma<u8> = Luma([255]);

// ============================================================================
// QrEncoder
// ============================================================================

/// Renders a QR payload into something an `<img src>` accepts.
pub trait QrEncoder: Send + Sync {
    /// Encodes `payload`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::QrRender`] if the payload cannot be drawn.
    fn encode(&self, payload: &str) -> Result<String>;
}

// ============================================================================
// PngDataUrlEncoder
// ============================================================================

/// Draws QR codes as PNG `data:` URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PngDataUrlEncoder {
    /// Pixels per module.
    pub scale: u32,
    /// Light border, in modules.
    pub margin: u32,
}

impl Default for PngDataUrlEncoder {
    fn default() -> Self {
        Self {
            scale: 4,
            margin: 4,
        }
    }
}

impl PngDataUrlEncoder {
    /// Draws `payload` into a grayscale image.
    fn draw(&self, payload: &str) -> Result<GrayImage> {
        let code = QrCode::new(payload.as_bytes())
            .map_err(|e| Error::qr_render(format!("Failed to encode QR payload: {e}")))?;

        let modules = code.width() as u32;
        let scale = self.scale.max(1);
        let side = (modules + 2 * self.margin) * scale;
        let mut image = GrayImage::from_pixel(side, side, LIGHT);

        for (index, color) in code.to_colors().into_iter().enumerate() {
            if color != Color::Dark {
                continue;
            }

            let column = index as u32 % modules + self.margin;
            let row = index as u32 / modules + self.margin;

            for dy in 0..scale {
                for dx in 0..scale {
                    image.put_pixel(column * scale + dx, row * scale + dy, DARK);
                }
            }
        }

        Ok(image)
    }
}

impl QrEncoder for PngDataUrlEncoder {
    fn encode(&self, payload: &str) -> Result<String> {
        let image = self.draw(payload)?;

        let mut output = Cursor::new(Vec::new());
        image
            .write_to(&mut output, ImageFormat::Png)
            .map_err(|e| Error::qr_render(format!("Failed to encode PNG: {e}")))?;

        Ok(format!(
            "{PNG_DATA_URL_PREFIX}{}",
            Base64Standard.encode(output.into_inner())
        ))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_produces_png_data_url() {
        let url = PngDataUrlEncoder::default()
            .encode("2@abcdef,ghijkl,mnopqr")
            .expect("encode");
        assert!(url.starts_with(PNG_DATA_URL_PREFIX));

        let bytes = Base64Standard
            .decode(&url[PNG_DATA_URL_PREFIX.len()..])
            .expect("base64");
        let decoded = image::load_from_memory(&bytes).expect("png");
        assert_eq!(decoded.width(), decoded.height());
    }

    #[test]
    fn test_draw_dimensions_and_quiet_zone() {
        let encoder = PngDataUrlEncoder { scale: 2, margin: 4 };
        let image = encoder.draw("hello").expect("draw");

        // "hello" fits a version 1 code: 21 modules.
        assert_eq!(image.width(), (21 + 8) * 2);
        assert_eq!(image.get_pixel(0, 0), &LIGHT);
        // Top-left finder pattern starts right after the margin.
        assert_eq!(image.get_pixel(8, 8), &DARK);
    }

    #[test]
    fn test_oversized_payload_fails() {
        let payload = "x".repeat(8000);
        let err = PngDataUrlEncoder::default().encode(&payload).unwrap_err();
        assert!(matches!(err, Error::QrRender { .. }));
    }
}
