//! Symbol encoder boundary and the default QR implementation.
//!
//! The pipeline only sees the [`Encoder`] trait: a payload plus options in,
//! a PNG data URI or SVG markup out. [`QrEncoder`] builds the module matrix
//! with `qrcode` and draws both outputs from it with identical geometry.

use std::fmt::Write as _;
use std::io::Cursor;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use qrcode::{EcLevel, QrCode};
use thiserror::Error;

use crate::options::{MARGIN_MODULES, RenderOptions, parse_hex_color};

/// Prefix of every raster data URI produced here.
pub const PNG_DATA_URI_PREFIX: &str = "data:image/png;base64,";

/// Error-correction level of every symbol.
pub const EC_LEVEL: EcLevel = EcLevel::M;

/// Module scale used when the requested width cannot fit the symbol.
const FALLBACK_SCALE: f64 = 4.0;

/// Parameters shared by the raster and vector encodes of one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodeOptions {
    pub width: u32,
    pub margin: u32,
    pub dark_color: String,
    pub light_color: String,
}

impl From<&RenderOptions> for EncodeOptions {
    fn from(opts: &RenderOptions) -> Self {
        Self {
            width: opts.size_px(),
            margin: MARGIN_MODULES,
            dark_color: opts.foreground.clone(),
            light_color: opts.background.clone(),
        }
    }
}

/// Reasons a payload/options pair cannot be rendered.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error("invalid color {0:?}")]
    InvalidColor(String),
    #[error("payload cannot be encoded: {0}")]
    Symbol(String),
    #[error("raster encoding failed: {0}")]
    Raster(String),
    #[error("encoder task failed: {0}")]
    Task(String),
}

/// External symbol encoder. Both calls may suspend.
#[async_trait]
pub trait Encoder: Send + Sync {
    /// Render a PNG and return it as a `data:` URI.
    async fn encode_raster(&self, payload: &str, opts: &EncodeOptions)
    -> Result<String, EncodeError>;

    /// Render SVG markup.
    async fn encode_vector(&self, payload: &str, opts: &EncodeOptions)
    -> Result<String, EncodeError>;
}

/// Default encoder backed by the `qrcode` and `image` crates.
#[derive(Clone, Copy, Debug, Default)]
pub struct QrEncoder;

#[async_trait]
impl Encoder for QrEncoder {
    async fn encode_raster(
        &self,
        payload: &str,
        opts: &EncodeOptions,
    ) -> Result<String, EncodeError> {
        let payload = payload.to_owned();
        let opts = opts.clone();
        tokio::task::spawn_blocking(move || render_png_data_uri(&payload, &opts))
            .await
            .map_err(|e| EncodeError::Task(e.to_string()))?
    }

    async fn encode_vector(
        &self,
        payload: &str,
        opts: &EncodeOptions,
    ) -> Result<String, EncodeError> {
        let payload = payload.to_owned();
        let opts = opts.clone();
        tokio::task::spawn_blocking(move || render_svg(&payload, &opts))
            .await
            .map_err(|e| EncodeError::Task(e.to_string()))?
    }
}

/// Square module matrix, row-major, `true` = dark.
struct Matrix {
    size: usize,
    dark: Vec<bool>,
}

impl Matrix {
    fn build(payload: &str) -> Result<Self, EncodeError> {
        let code = QrCode::with_error_correction_level(payload.as_bytes(), EC_LEVEL)
            .map_err(|e| EncodeError::Symbol(e.to_string()))?;
        let size = code.width();
        let dark = code
            .to_colors()
            .into_iter()
            .map(|c| c == qrcode::Color::Dark)
            .collect();
        Ok(Self { size, dark })
    }

    fn is_dark(&self, row: usize, col: usize) -> bool {
        self.dark[row * self.size + col]
    }
}

fn color(s: &str) -> Result<[u8; 4], EncodeError> {
    parse_hex_color(s).ok_or_else(|| EncodeError::InvalidColor(s.to_string()))
}

fn render_png_data_uri(payload: &str, opts: &EncodeOptions) -> Result<String, EncodeError> {
    let png = render_png(payload, opts)?;
    Ok(format!("{PNG_DATA_URI_PREFIX}{}", STANDARD.encode(png)))
}

/// Draw the symbol at `opts.width` pixels. Each pixel samples the module it
/// falls into, so non-integer scales stretch modules unevenly but the
/// quiet zone stays `margin` modules wide.
fn render_png(payload: &str, opts: &EncodeOptions) -> Result<Vec<u8>, EncodeError> {
    let dark = image::Rgba(color(&opts.dark_color)?);
    let light = image::Rgba(color(&opts.light_color)?);
    let matrix = Matrix::build(payload)?;

    let total_modules = matrix.size as u32 + opts.margin * 2;
    let (scale, image_size) = if opts.width >= total_modules {
        (f64::from(opts.width) / f64::from(total_modules), opts.width)
    } else {
        let size = (f64::from(total_modules) * FALLBACK_SCALE).floor() as u32;
        (FALLBACK_SCALE, size)
    };
    let scaled_margin = f64::from(opts.margin) * scale;
    let inner_end = f64::from(image_size) - scaled_margin;
    let last = matrix.size.saturating_sub(1);

    let img = image::RgbaImage::from_fn(image_size, image_size, |x, y| {
        let (fx, fy) = (f64::from(x), f64::from(y));
        if fx < scaled_margin || fy < scaled_margin || fx >= inner_end || fy >= inner_end {
            return light;
        }
        let row = (((fy - scaled_margin) / scale).floor() as usize).min(last);
        let col = (((fx - scaled_margin) / scale).floor() as usize).min(last);
        if matrix.is_dark(row, col) { dark } else { light }
    });

    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| EncodeError::Raster(e.to_string()))?;
    Ok(buf)
}

/// SVG with a `viewBox` in module units: one filled background path and one
/// stroked path made of horizontal runs of dark modules.
fn render_svg(payload: &str, opts: &EncodeOptions) -> Result<String, EncodeError> {
    let dark = color(&opts.dark_color)?;
    let light = color(&opts.light_color)?;
    let matrix = Matrix::build(payload)?;
    let total = matrix.size + opts.margin as usize * 2;

    let background = if light[3] == 0 {
        String::new()
    } else {
        format!(
            "<path {} d=\"M0 0h{total}v{total}H0z\"/>",
            color_attr(light, "fill")
        )
    };
    let foreground = format!(
        "<path {} d=\"{}\"/>",
        color_attr(dark, "stroke"),
        dark_runs_path(&matrix, opts.margin as usize)
    );

    Ok(format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{w}\" viewBox=\"0 0 {total} {total}\" shape-rendering=\"crispEdges\">{background}{foreground}</svg>\n",
        w = opts.width
    ))
}

fn color_attr(rgba: [u8; 4], attr: &str) -> String {
    let hex = format!("#{:02x}{:02x}{:02x}", rgba[0], rgba[1], rgba[2]);
    if rgba[3] == u8::MAX {
        format!("{attr}=\"{hex}\"")
    } else {
        let alpha = format!("{:.2}", f64::from(rgba[3]) / 255.0);
        let alpha = alpha.strip_prefix('0').unwrap_or(&alpha);
        format!("{attr}=\"{hex}\" {attr}-opacity=\"{alpha}\"")
    }
}

/// Each row's first run starts with an absolute `M`; later runs on the same
/// row move relative to the end of the previous run.
fn dark_runs_path(matrix: &Matrix, margin: usize) -> String {
    let mut path = String::new();
    for row in 0..matrix.size {
        let mut col = 0;
        let mut first_in_row = true;
        let mut gap = 0;
        while col < matrix.size {
            if !matrix.is_dark(row, col) {
                gap += 1;
                col += 1;
                continue;
            }
            let start = col;
            while col < matrix.size && matrix.is_dark(row, col) {
                col += 1;
            }
            if first_in_row {
                let _ = write!(path, "M{} {}.5", start + margin, row + margin);
                first_in_row = false;
            } else {
                let _ = write!(path, "m{gap} 0");
            }
            let _ = write!(path, "h{}", col - start);
            gap = 0;
        }
    }
    path
}

/// Decode the PNG bytes of a data URI produced by [`QrEncoder`].
pub fn decode_png_data_uri(uri: &str) -> Option<Vec<u8>> {
    let b64 = uri.strip_prefix(PNG_DATA_URI_PREFIX)?;
    STANDARD.decode(b64).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(width: u32, dark: &str, light: &str) -> EncodeOptions {
        EncodeOptions::from(&RenderOptions::new(width, dark, light))
    }

    #[test]
    fn options_carry_fixed_margin_and_level() {
        let o = opts(320, "#112233", "#ffffff");
        assert_eq!(o.width, 320);
        assert_eq!(o.margin, 2);
        assert_eq!(EC_LEVEL, EcLevel::M);
    }

    #[tokio::test]
    async fn raster_is_png_data_uri_of_requested_width() {
        let uri = QrEncoder
            .encode_raster("tel:123", &opts(256, "#000000", "#FFFFFF"))
            .await
            .unwrap();
        assert!(uri.starts_with(PNG_DATA_URI_PREFIX));

        let png = decode_png_data_uri(&uri).unwrap();
        let img = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (256, 256));
        // 25 modules over 256 px: the quiet zone ends at 20.48 px.
        assert_eq!(img.get_pixel(0, 0).0, [255, 255, 255, 255]);
        assert_eq!(img.get_pixel(20, 20).0, [255, 255, 255, 255]);
        assert_eq!(img.get_pixel(25, 25).0, [0, 0, 0, 255]);
    }

    #[tokio::test]
    async fn raster_uses_requested_colors() {
        let uri = QrEncoder
            .encode_raster("tel:123", &opts(128, "#ff0000", "#00ff00"))
            .await
            .unwrap();
        let png = decode_png_data_uri(&uri).unwrap();
        let img = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(img.get_pixel(0, 0).0, [0, 255, 0, 255]);
        assert!(img.pixels().any(|p| p.0 == [255, 0, 0, 255]));
    }

    #[tokio::test]
    async fn vector_has_viewbox_in_modules_and_both_paths() {
        let svg = QrEncoder
            .encode_vector("tel:123", &opts(256, "#000000", "#FFFFFF"))
            .await
            .unwrap();
        // Version 1 symbol: 21 modules + 2 * 2 margin.
        assert!(svg.starts_with(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"256\" height=\"256\" viewBox=\"0 0 25 25\""
        ));
        assert!(svg.contains("<path fill=\"#ffffff\" d=\"M0 0h25v25H0z\"/>"));
        // First row opens with the 7-module finder pattern.
        assert!(svg.contains("<path stroke=\"#000000\" d=\"M2 2.5h7"));
        assert!(svg.ends_with("</svg>\n"));
    }

    #[tokio::test]
    async fn translucent_colors_get_opacity_attributes() {
        let svg = QrEncoder
            .encode_vector("tel:123", &opts(128, "#00000080", "#ffffff00"))
            .await
            .unwrap();
        assert!(svg.contains("stroke-opacity=\".50\""));
        assert!(!svg.contains("fill="));
    }

    #[tokio::test]
    async fn invalid_color_is_rejected() {
        let err = QrEncoder
            .encode_raster("tel:123", &opts(256, "black", "#FFFFFF"))
            .await
            .unwrap_err();
        assert_eq!(err, EncodeError::InvalidColor("black".into()));
        let err = QrEncoder
            .encode_vector("tel:123", &opts(256, "#000", "#GGGGGG"))
            .await
            .unwrap_err();
        assert_eq!(err, EncodeError::InvalidColor("#GGGGGG".into()));
    }

    #[tokio::test]
    async fn oversized_payload_is_rejected() {
        let payload = "x".repeat(4000);
        let err = QrEncoder
            .encode_raster(&payload, &opts(256, "#000000", "#FFFFFF"))
            .await
            .unwrap_err();
        assert!(matches!(err, EncodeError::Symbol(_)));
    }

    #[tokio::test]
    async fn small_width_falls_back_to_fixed_scale() {
        // 2000 bytes needs a large version; 128 px cannot hold it at 1 px/module.
        let payload = "y".repeat(2000);
        let uri = QrEncoder
            .encode_raster(&payload, &opts(128, "#000000", "#FFFFFF"))
            .await
            .unwrap();
        let png = decode_png_data_uri(&uri).unwrap();
        let img = image::load_from_memory(&png).unwrap().to_rgba8();
        assert!(img.width() > 128);
        assert_eq!(img.width() % 4, 0);
    }

    #[test]
    fn decode_rejects_foreign_uris() {
        assert!(decode_png_data_uri("data:image/svg+xml;base64,AAAA").is_none());
        assert!(decode_png_data_uri("data:image/png;base64,***").is_none());
    }
}
