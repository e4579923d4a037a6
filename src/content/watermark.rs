//! Watermark compositing for product images
//!
//! The watermark is scaled to a share of the image width, faded and drawn at
//! a fixed offset from the top-left corner. The result is written next to the
//! source image as `<name>_wm.<ext>`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};

/// Appended to the file stem of watermarked copies
pub const WATERMARK_SUFFIX: &str = "_wm";

const JPEG_QUALITY: u8 = 95;

/// Errors while compositing a watermark
#[derive(Debug, thiserror::Error)]
pub enum WatermarkError {
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Placement and strength of the watermark
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatermarkStyle {
    /// Top-left corner of the watermark, in pixels
    pub offset: (i64, i64),
    /// 0 is invisible, 255 draws the watermark as is
    pub opacity: u8,
    /// Watermark width as a fraction of the image width
    pub scale: f32,
}

impl Default for WatermarkStyle {
    fn default() -> Self {
        Self {
            offset: (10, 10),
            opacity: 180,
            scale: 0.25,
        }
    }
}

/// `<dir>/<stem>_wm.<ext>` for `image`
pub fn watermarked_path(image: &Path) -> PathBuf {
    let stem = image
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match image.extension() {
        Some(ext) => format!("{stem}{WATERMARK_SUFFIX}.{}", ext.to_string_lossy()),
        None => format!("{stem}{WATERMARK_SUFFIX}"),
    };
    image.with_file_name(name)
}

/// Composite `watermark` onto `image` and write the result to `output`
pub fn apply_watermark(
    image: &Path,
    watermark: &Path,
    output: &Path,
    style: &WatermarkStyle,
) -> Result<(), WatermarkError> {
    let mut base = image::open(image)?.to_rgba8();
    let mark = image::open(watermark)?.to_rgba8();

    let width = ((base.width() as f32 * style.scale) as u32).max(1);
    let height = (u64::from(width) * u64::from(mark.height()) / u64::from(mark.width().max(1)))
        .max(1) as u32;

    let mut mark = imageops::resize(&mark, width, height, FilterType::Lanczos3);
    for pixel in mark.pixels_mut() {
        pixel.0[3] = (u16::from(pixel.0[3]) * u16::from(style.opacity) / 255) as u8;
    }

    imageops::overlay(&mut base, &mark, style.offset.0, style.offset.1);
    save(base, output)
}

fn is_jpeg(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("jpg") || e.eq_ignore_ascii_case("jpeg"))
}

fn save(image: RgbaImage, output: &Path) -> Result<(), WatermarkError> {
    if !is_jpeg(output) {
        image.save(output)?;
        return Ok(());
    }

    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgba8(image).to_rgb8();
    let mut writer = BufWriter::new(File::create(output)?);
    JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY).encode_image(&rgb)?;
    writer.flush()?;
    Ok(())
}

/// Watermarked copy of `image`, or `image` itself when no copy can be made
///
/// A missing watermark file or a compositing failure is logged and the
/// original image is used.
pub fn watermark_or_original(
    image: &Path,
    watermark: Option<&Path>,
    style: &WatermarkStyle,
) -> PathBuf {
    let Some(watermark) = watermark else {
        return image.to_path_buf();
    };
    if !watermark.is_file() {
        tracing::warn!(
            watermark = %watermark.display(),
            "Watermark file not found, using the original image"
        );
        return image.to_path_buf();
    }

    let output = watermarked_path(image);
    match apply_watermark(image, watermark, &output, style) {
        Ok(()) => {
            tracing::info!(image = %output.display(), "Watermark added");
            output
        }
        Err(e) => {
            tracing::warn!(
                image = %image.display(),
                error = %e,
                "Watermark failed, using the original image"
            );
            image.to_path_buf()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use tempfile::TempDir;

    fn solid(path: &Path, width: u32, height: u32, color: [u8; 4]) {
        RgbaImage::from_pixel(width, height, Rgba(color))
            .save(path)
            .unwrap();
    }

    #[test]
    fn test_watermarked_path() {
        assert_eq!(
            watermarked_path(Path::new("img/ABB/3AUA0000036521-itexport.jpg")),
            PathBuf::from("img/ABB/3AUA0000036521-itexport_wm.jpg")
        );
        assert_eq!(
            watermarked_path(Path::new("img/photo")),
            PathBuf::from("img/photo_wm")
        );
    }

    #[test]
    fn test_watermark_scaled_and_faded_at_offset() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("drive.png");
        let mark = dir.path().join("watermark.png");
        solid(&source, 80, 40, [255, 255, 255, 255]);
        solid(&mark, 8, 4, [255, 0, 0, 255]);

        let output = watermark_or_original(&source, Some(&mark), &WatermarkStyle::default());
        assert_eq!(output, dir.path().join("drive_wm.png"));

        let result = image::open(&output).unwrap().to_rgba8();
        assert_eq!(result.dimensions(), (80, 40));

        // 25% of 80 wide keeps the 2:1 ratio, so 20x10 from (10, 10)
        let inside = result.get_pixel(15, 15);
        assert!(inside.0[0] >= 250, "red {}", inside.0[0]);
        assert!(inside.0[1] > 40 && inside.0[1] < 120, "green {}", inside.0[1]);

        assert_eq!(result.get_pixel(5, 5).0, [255, 255, 255, 255]);
        assert_eq!(result.get_pixel(35, 15).0, [255, 255, 255, 255]);
        assert_eq!(result.get_pixel(15, 25).0, [255, 255, 255, 255]);
    }

    #[test]
    fn test_jpeg_output() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("valve.jpg");
        let mark = dir.path().join("watermark.png");
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(40, 40, Rgba([0, 0, 255, 255])))
            .to_rgb8()
            .save(&source)
            .unwrap();
        solid(&mark, 4, 4, [255, 255, 255, 255]);

        let output = watermark_or_original(&source, Some(&mark), &WatermarkStyle::default());
        assert_eq!(output, dir.path().join("valve_wm.jpg"));
        assert_eq!(image::open(&output).unwrap().width(), 40);
    }

    #[test]
    fn test_missing_watermark_keeps_original() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("drive.png");
        solid(&source, 10, 10, [0, 0, 0, 255]);

        let missing = dir.path().join("watermark.png");
        let output = watermark_or_original(&source, Some(&missing), &WatermarkStyle::default());
        assert_eq!(output, source);
        assert!(!dir.path().join("drive_wm.png").exists());

        assert_eq!(
            watermark_or_original(&source, None, &WatermarkStyle::default()),
            source
        );
    }

    #[test]
    fn test_unreadable_image_keeps_original() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("broken.png");
        std::fs::write(&source, b"not an image").unwrap();
        let mark = dir.path().join("watermark.png");
        solid(&mark, 4, 4, [255, 255, 255, 255]);

        let output = watermark_or_original(&source, Some(&mark), &WatermarkStyle::default());
        assert_eq!(output, source);
    }
}
