//! Raster images: loading, fitting, and conversion to `^GFA` graphic fields.
//!
//! Pipeline for an image element:
//!
//! 1. [`load_image_bytes`]: base64 (optionally a `data:` URI) or an opt-in
//!    HTTP(S) fetch.
//! 2. [`decode_image_bytes`]: any format the `image` crate reads, with
//!    transparency composited over white.
//! 3. [`prepare_image`]: scale into the element box per [`ImageFit`].
//! 4. [`to_luma`] + [`image_to_gfa`]: 1-bit conversion (threshold, Bayer, or
//!    Floyd-Steinberg) packed MSB-first into uppercase hex rows.
//!
//! Image-mode 2D codes skip steps 1-3 and draw their modules directly onto a
//! grayscale canvas with [`draw_module`].

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::imageops::{self, BiLevel, FilterType};
use image::{GrayImage, Luma, Rgb, RgbImage};

use crate::config::ImageFetchConfig;
use crate::error::CompilationError;
use crate::measure::luma_over_white;
use crate::model::{Dither, ImageFit, ImageSourceKind, ModuleShape};

/// 4x4 ordered-dither matrix.
const BAYER4: [[u8; 4]; 4] = [[0, 8, 2, 10], [12, 4, 14, 6], [3, 11, 1, 9], [15, 7, 13, 5]];

/// A packed 1-bit raster, ready for `^GFA,total,total,bytes_per_row,data`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphicField {
    /// Uppercase hex, row after row.
    pub data: String,
    /// Bytes per row (`ceil(width / 8)`).
    pub bytes_per_row: usize,
    /// Total byte count.
    pub total_bytes: usize,
}

/// Resolve an image source to raw file bytes.
pub fn load_image_bytes(
    kind: ImageSourceKind,
    data: &str,
    fetch: &ImageFetchConfig,
) -> Result<Vec<u8>, CompilationError> {
    let bytes = match kind {
        ImageSourceKind::Base64 => decode_base64(data)?,
        ImageSourceKind::Url => fetch_url(data.trim(), fetch)?,
    };
    if bytes.is_empty() {
        return Err(CompilationError::ImageSource("image source data is empty".into()));
    }
    Ok(bytes)
}

fn decode_base64(data: &str) -> Result<Vec<u8>, CompilationError> {
    let mut payload = data.trim();
    if payload.starts_with("data:") {
        payload = payload.split_once(',').map_or("", |(_, rest)| rest);
    }
    STANDARD
        .decode(payload)
        .map_err(|e| CompilationError::ImageSource(format!("failed to decode base64 image data: {e}")))
}

fn check_url(url: &str, fetch: &ImageFetchConfig) -> Result<(), CompilationError> {
    if !fetch.enabled {
        return Err(CompilationError::ImageSource(format!(
            "image url fetching is disabled (set {}=1 to enable)",
            crate::config::IMAGE_URL_ENABLE_ENV
        )));
    }
    let lower = url.to_ascii_lowercase();
    if !(lower.starts_with("http://") || lower.starts_with("https://")) {
        return Err(CompilationError::ImageSource(
            "image url must start with http:// or https://".into(),
        ));
    }
    Ok(())
}

#[cfg(feature = "url-images")]
fn fetch_url(url: &str, fetch: &ImageFetchConfig) -> Result<Vec<u8>, CompilationError> {
    check_url(url, fetch)?;
    let failed = |e: reqwest::Error| CompilationError::ImageSource(format!("failed to fetch image url: {e}"));

    tracing::debug!(url, timeout_ms = fetch.timeout.as_millis() as u64, "fetching image");
    let client = reqwest::blocking::Client::builder()
        .timeout(fetch.timeout)
        .build()
        .map_err(failed)?;
    let body = client
        .get(url)
        .send()
        .and_then(reqwest::blocking::Response::error_for_status)
        .and_then(reqwest::blocking::Response::bytes)
        .map_err(failed)?;

    if let Some(max) = fetch.max_bytes
        && body.len() as u64 > max
    {
        return Err(CompilationError::ImageSource(format!(
            "image exceeds max size ({} bytes > {max} bytes)",
            body.len()
        )));
    }
    Ok(body.to_vec())
}

#[cfg(not(feature = "url-images"))]
fn fetch_url(url: &str, fetch: &ImageFetchConfig) -> Result<Vec<u8>, CompilationError> {
    check_url(url, fetch)?;
    Err(CompilationError::ImageSource(
        "image url fetching requires the `url-images` feature".into(),
    ))
}

/// Decode image bytes to RGB, compositing any transparency over white.
pub fn decode_image_bytes(bytes: &[u8]) -> Result<RgbImage, CompilationError> {
    let img = image::load_from_memory(bytes)?;
    if !img.color().has_alpha() {
        return Ok(img.to_rgb8());
    }
    let rgba = img.to_rgba8();
    Ok(RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        Rgb([over_white(r, a), over_white(g, a), over_white(b, a)])
    }))
}

fn over_white(c: u8, a: u8) -> u8 {
    let (c, a) = (u32::from(c), u32::from(a));
    u8::try_from((c * a + 255 * (255 - a) + 127) / 255).unwrap_or(u8::MAX)
}

/// Scale `img` for a `rect_w` x `rect_h` box.
///
/// Returns `None` when the box or the image is empty. `Cover` results are
/// center-cropped to exactly the box; `None` fit keeps native size unless
/// `input_dpi` asks for a rescale to `target_dpi`.
pub fn prepare_image(
    img: RgbImage,
    rect_w: u32,
    rect_h: u32,
    fit: ImageFit,
    input_dpi: Option<u32>,
    target_dpi: u32,
) -> Option<RgbImage> {
    let (w, h) = img.dimensions();
    if rect_w == 0 || rect_h == 0 || w == 0 || h == 0 {
        return None;
    }

    let scaled = |img: RgbImage, tw: u32, th: u32| {
        if (tw, th) == img.dimensions() {
            img
        } else {
            imageops::resize(&img, tw, th, FilterType::Lanczos3)
        }
    };

    match fit {
        ImageFit::None => match input_dpi {
            Some(dpi) if dpi > 0 => {
                let scale = f64::from(target_dpi) / f64::from(dpi);
                Some(scaled(img, scale_dim(w, scale), scale_dim(h, scale)))
            }
            _ => Some(img),
        },
        ImageFit::Stretch => Some(scaled(img, rect_w, rect_h)),
        ImageFit::Contain | ImageFit::Cover => {
            let sx = f64::from(rect_w) / f64::from(w);
            let sy = f64::from(rect_h) / f64::from(h);
            let scale = if fit == ImageFit::Contain { sx.min(sy) } else { sx.max(sy) };
            let (tw, th) = (scale_dim(w, scale), scale_dim(h, scale));
            let img = scaled(img, tw, th);
            if fit == ImageFit::Contain {
                return Some(img);
            }
            let left = tw.saturating_sub(rect_w) / 2;
            let top = th.saturating_sub(rect_h) / 2;
            Some(imageops::crop_imm(&img, left, top, rect_w, rect_h).to_image())
        }
    }
}

fn scale_dim(n: u32, scale: f64) -> u32 {
    ((f64::from(n) * scale).round_ties_even() as u32).max(1)
}

/// ITU-R 601 grayscale.
pub fn to_luma(img: &RgbImage) -> GrayImage {
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        let [r, g, b] = img.get_pixel(x, y).0;
        Luma([luma_over_white(r, g, b, u8::MAX)])
    })
}

/// Convert a grayscale raster to a packed graphic field.
///
/// A pixel is black when its value is below `threshold` (Bayer shifts the
/// matrix by `threshold - 128`; Floyd-Steinberg always splits at mid-gray).
/// `invert` flips the result.
pub fn image_to_gfa(img: &GrayImage, threshold: u8, dither: Dither, invert: bool) -> GraphicField {
    let (w, h) = (img.width() as usize, img.height() as usize);
    let black = match dither {
        Dither::FloydSteinberg => floyd_steinberg(img),
        Dither::Bayer => {
            let offset = i32::from(threshold) - 128;
            img.enumerate_pixels()
                .map(|(x, y, px)| {
                    let m = f64::from(BAYER4[y as usize % 4][x as usize % 4]);
                    f64::from(i32::from(px.0[0]) + offset) < (m + 0.5) * 16.0
                })
                .collect()
        }
        Dither::None => img.pixels().map(|px| px.0[0] < threshold).collect::<Vec<_>>(),
    };

    let bytes_per_row = w.div_ceil(8);
    let mut packed = vec![0u8; bytes_per_row * h];
    for y in 0..h {
        for x in 0..w {
            if black[y * w + x] != invert {
                packed[y * bytes_per_row + x / 8] |= 0x80 >> (x % 8);
            }
        }
    }

    let data = packed.iter().map(|b| format!("{b:02X}")).collect();
    GraphicField {
        data,
        bytes_per_row,
        total_bytes: packed.len(),
    }
}

/// Error diffusion via the `image` crate's bi-level dither.
fn floyd_steinberg(img: &GrayImage) -> Vec<bool> {
    let mut out = img.clone();
    imageops::dither(&mut out, &BiLevel);
    out.pixels().map(|px| px.0[0] == 0).collect()
}

/// Paint one dark module with its top-left corner at `(x0, y0)`.
pub(crate) fn draw_module(canvas: &mut GrayImage, x0: u32, y0: u32, size: u32, shape: ModuleShape) {
    let size_f = f64::from(size);
    let radius = if shape == ModuleShape::Rounded && size >= 3 {
        f64::from((size / 3).max(1))
    } else {
        0.0
    };
    for dy in 0..size {
        for dx in 0..size {
            // pixel centre relative to the module's top-left corner
            let (px, py) = (f64::from(dx) + 0.5, f64::from(dy) + 0.5);
            let inside = match shape {
                ModuleShape::Square => true,
                ModuleShape::Circle => {
                    let r = size_f / 2.0;
                    let (nx, ny) = ((px - r) / r, (py - r) / r);
                    nx * nx + ny * ny <= 1.0
                }
                ModuleShape::Rounded => in_rounded_square(px, py, size_f, radius),
            };
            if inside {
                let (x, y) = (x0 + dx, y0 + dy);
                if x < canvas.width() && y < canvas.height() {
                    canvas.put_pixel(x, y, Luma([0]));
                }
            }
        }
    }
}

fn in_rounded_square(px: f64, py: f64, size: f64, radius: f64) -> bool {
    if radius <= 0.0 {
        return true;
    }
    let cx = px.clamp(radius, size - radius);
    let cy = py.clamp(radius, size - radius);
    let (dx, dy) = (px - cx, py - cy);
    dx * dx + dy * dy <= radius * radius
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes(img: &RgbaImage) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn solid(w: u32, h: u32, luma: u8) -> GrayImage {
        GrayImage::from_pixel(w, h, Luma([luma]))
    }

    #[test]
    fn black_square_packs_to_all_ones() {
        let gfa = image_to_gfa(&solid(8, 8, 0), 128, Dither::None, false);
        assert_eq!(gfa.data, "FF".repeat(8));
        assert_eq!(gfa.bytes_per_row, 1);
        assert_eq!(gfa.total_bytes, 8);
    }

    #[test]
    fn rows_are_padded_to_whole_bytes() {
        let gfa = image_to_gfa(&solid(10, 2, 0), 128, Dither::None, false);
        assert_eq!(gfa.bytes_per_row, 2);
        assert_eq!(gfa.data, "FFC0FFC0");
    }

    #[test]
    fn invert_flips_white_to_black() {
        let gfa = image_to_gfa(&solid(8, 1, 255), 128, Dither::None, true);
        assert_eq!(gfa.data, "FF");
        let gfa = image_to_gfa(&solid(8, 1, 255), 128, Dither::None, false);
        assert_eq!(gfa.data, "00");
    }

    #[test]
    fn threshold_is_strict() {
        assert_eq!(image_to_gfa(&solid(8, 1, 100), 100, Dither::None, false).data, "00");
        assert_eq!(image_to_gfa(&solid(8, 1, 100), 101, Dither::None, false).data, "FF");
    }

    #[test]
    fn bayer_half_gray_is_half_black() {
        let gfa = image_to_gfa(&solid(4, 4, 128), 128, Dither::Bayer, false);
        let ones: u32 = (0..gfa.total_bytes)
            .map(|i| u8::from_str_radix(&gfa.data[i * 2..i * 2 + 2], 16).unwrap().count_ones())
            .sum();
        assert_eq!(ones, 8);
    }

    #[test]
    fn floyd_steinberg_keeps_extremes() {
        assert_eq!(image_to_gfa(&solid(8, 2, 0), 128, Dither::FloydSteinberg, false).data, "FFFF");
        assert_eq!(image_to_gfa(&solid(8, 2, 255), 128, Dither::FloydSteinberg, false).data, "0000");
    }

    #[test]
    fn transparent_pixels_become_white() {
        let mut img = RgbaImage::from_pixel(2, 1, Rgba([0, 0, 0, 0]));
        img.put_pixel(1, 0, Rgba([0, 0, 0, 255]));
        let rgb = decode_image_bytes(&png_bytes(&img)).unwrap();
        assert_eq!(rgb.get_pixel(0, 0).0, [255, 255, 255]);
        assert_eq!(rgb.get_pixel(1, 0).0, [0, 0, 0]);
    }

    #[test]
    fn base64_and_data_uri_sources() {
        let img = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 255]));
        let bytes = png_bytes(&img);
        let b64 = STANDARD.encode(&bytes);
        let cfg = ImageFetchConfig::default();
        assert_eq!(load_image_bytes(ImageSourceKind::Base64, &b64, &cfg).unwrap(), bytes);
        let uri = format!(" data:image/png;base64,{b64} ");
        assert_eq!(load_image_bytes(ImageSourceKind::Base64, &uri, &cfg).unwrap(), bytes);
    }

    #[test]
    fn bad_sources_are_rejected() {
        let cfg = ImageFetchConfig::default();
        let err = load_image_bytes(ImageSourceKind::Base64, "not base64!", &cfg).unwrap_err();
        assert!(err.to_string().starts_with("failed to decode base64 image data"));
        let err = load_image_bytes(ImageSourceKind::Base64, "", &cfg).unwrap_err();
        assert_eq!(err.to_string(), "image source data is empty");
        let err = load_image_bytes(ImageSourceKind::Url, "https://example.com/a.png", &cfg).unwrap_err();
        assert!(err.to_string().starts_with("image url fetching is disabled"));
        let err = load_image_bytes(ImageSourceKind::Url, "ftp://example.com/a.png", &ImageFetchConfig::enabled())
            .unwrap_err();
        assert_eq!(err.to_string(), "image url must start with http:// or https://");
    }

    #[test]
    fn contain_preserves_aspect() {
        let img = RgbImage::new(100, 50);
        let out = prepare_image(img, 50, 50, ImageFit::Contain, None, 203).unwrap();
        assert_eq!(out.dimensions(), (50, 25));
    }

    #[test]
    fn cover_crops_to_box() {
        let img = RgbImage::new(100, 50);
        let out = prepare_image(img, 50, 50, ImageFit::Cover, None, 203).unwrap();
        assert_eq!(out.dimensions(), (50, 50));
    }

    #[test]
    fn stretch_and_none() {
        let out = prepare_image(RgbImage::new(10, 10), 30, 7, ImageFit::Stretch, None, 203).unwrap();
        assert_eq!(out.dimensions(), (30, 7));
        let out = prepare_image(RgbImage::new(40, 20), 5, 5, ImageFit::None, None, 203).unwrap();
        assert_eq!(out.dimensions(), (40, 20));
        let out = prepare_image(RgbImage::new(40, 20), 5, 5, ImageFit::None, Some(406), 203).unwrap();
        assert_eq!(out.dimensions(), (20, 10));
        assert!(prepare_image(RgbImage::new(4, 4), 0, 5, ImageFit::Contain, None, 203).is_none());
    }

    #[test]
    fn module_shapes() {
        let mut canvas = solid(6, 6, 255);
        draw_module(&mut canvas, 0, 0, 6, ModuleShape::Circle);
        assert_eq!(canvas.get_pixel(0, 0).0[0], 255);
        assert_eq!(canvas.get_pixel(3, 3).0[0], 0);

        let mut canvas = solid(6, 6, 255);
        draw_module(&mut canvas, 0, 0, 6, ModuleShape::Rounded);
        assert_eq!(canvas.get_pixel(0, 0).0[0], 255);
        assert_eq!(canvas.get_pixel(2, 0).0[0], 0);

        let mut canvas = solid(4, 4, 255);
        draw_module(&mut canvas, 2, 2, 2, ModuleShape::Rounded);
        assert_eq!(canvas.get_pixel(2, 2).0[0], 0);
        assert_eq!(canvas.get_pixel(1, 1).0[0], 255);
    }
}
