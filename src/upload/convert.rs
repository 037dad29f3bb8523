//! HEIC to JPEG conversion.
//!
//! Conversion runs on a blocking thread and never fails an upload: callers
//! keep the original file when [`PhotoConverter::to_jpeg`] errors.

use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;

use crate::{GalleryError, Result};

#[cfg(feature = "heif")]
use heif::decode as decode_heif;
#[cfg(not(feature = "heif"))]
use magick::decode as decode_heif;

pub const JPEG_QUALITY: u8 = 92;

pub trait PhotoConverter: Send + Sync {
    /// Re-encodes a photo as JPEG, returning the new bytes.
    fn to_jpeg(&self, data: &[u8]) -> Result<Vec<u8>>;
}

/// Converter backed by the `image` crate. Input format is sniffed from the
/// bytes. HEIF containers decode through libheif with the `heif` feature and
/// through the ImageMagick CLI without it.
pub struct ImageConverter {
    quality: u8,
}

impl Default for ImageConverter {
    fn default() -> Self {
        Self { quality: JPEG_QUALITY }
    }
}

impl ImageConverter {
    pub fn new(quality: u8) -> Self {
        Self { quality: quality.clamp(1, 100) }
    }

    fn decode(data: &[u8]) -> Result<DynamicImage> {
        if is_heif(data) {
            return decode_heif(data);
        }

        image::load_from_memory(data).map_err(conversion)
    }
}

pub(crate) fn is_heif(data: &[u8]) -> bool {
    infer::get(data).is_some_and(|kind| kind.mime_type() == "image/heif")
}

fn conversion<E: std::fmt::Display>(e: E) -> GalleryError {
    GalleryError::Conversion(e.to_string())
}

impl PhotoConverter for ImageConverter {
    fn to_jpeg(&self, data: &[u8]) -> Result<Vec<u8>> {
        let rgb = Self::decode(data)?.to_rgb8();

        let mut out = Vec::new();
        JpegEncoder::new_with_quality(&mut out, self.quality)
            .encode_image(&rgb)
            .map_err(conversion)?;
        Ok(out)
    }
}

/// Decoding through an installed ImageMagick: HEIC in on stdin, PNG out on
/// stdout.
#[cfg(not(feature = "heif"))]
mod magick {
    use std::io::{ErrorKind, Write};
    use std::process::{Child, Command, Stdio};

    use image::{DynamicImage, ImageFormat};

    use super::conversion;
    use crate::Result;

    /// ImageMagick 7 ships `magick`, 6 ships `convert`.
    const PROGRAMS: [&str; 2] = ["magick", "convert"];

    pub(super) fn decode(data: &[u8]) -> Result<DynamicImage> {
        let png = run(data)?;
        image::load_from_memory_with_format(&png, ImageFormat::Png).map_err(conversion)
    }

    fn run(data: &[u8]) -> Result<Vec<u8>> {
        for program in PROGRAMS {
            match spawn(program) {
                Ok(child) => return pipe(program, child, data),
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(conversion(format!("{}: {}", program, e))),
            }
        }
        Err(conversion("no HEIC decoder available: ImageMagick is not installed"))
    }

    fn spawn(program: &str) -> std::io::Result<Child> {
        Command::new(program)
            .args(["heic:-", "png:-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
    }

    fn pipe(program: &str, mut child: Child, data: &[u8]) -> Result<Vec<u8>> {
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| conversion(format!("{}: stdin unavailable", program)))?;

        // Feed stdin from its own thread so a full stdout pipe cannot stall us.
        let output = std::thread::scope(|scope| {
            scope.spawn(move || {
                // A decoder that exits early closes the pipe; its status reports why.
                let _ = stdin.write_all(data);
            });
            child.wait_with_output()
        })
        .map_err(conversion)?;

        if !output.status.success() {
            return Err(conversion(format!(
                "{} failed: {}",
                program,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(output.stdout)
    }
}

#[cfg(feature = "heif")]
mod heif {
    use image::{DynamicImage, RgbImage};
    use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};

    use super::conversion;
    use crate::Result;

    pub(super) fn decode(data: &[u8]) -> Result<DynamicImage> {
        let lib_heif = LibHeif::new();
        let ctx = HeifContext::read_from_bytes(data).map_err(conversion)?;
        let handle = ctx.primary_image_handle().map_err(conversion)?;
        let image = lib_heif
            .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgb), None)
            .map_err(conversion)?;

        let planes = image.planes();
        let plane = planes
            .interleaved
            .ok_or_else(|| conversion("decoded image has no interleaved plane"))?;

        // Rows are padded to `stride`; keep only the pixel bytes.
        let row_len = plane.width as usize * 3;
        let mut pixels = Vec::with_capacity(row_len * plane.height as usize);
        for row in plane.data.chunks(plane.stride).take(plane.height as usize) {
            pixels.extend_from_slice(&row[..row_len]);
        }

        RgbImage::from_raw(plane.width, plane.height, pixels)
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(|| conversion("pixel buffer does not match image dimensions"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        let img = RgbImage::from_fn(4, 3, |x, y| image::Rgb([x as u8 * 60, y as u8 * 80, 128]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn converts_decodable_photo_to_jpeg() {
        let jpeg = ImageConverter::default().to_jpeg(&png_bytes()).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (4, 3));
    }

    /// `ftyp` box of an iPhone HEIC, without any image data.
    const HEIC_HEADER: &[u8] = b"\x00\x00\x00\x18ftypheic\x00\x00\x00\x00mif1heic";

    #[test]
    fn heif_containers_are_recognised() {
        assert!(is_heif(HEIC_HEADER));
        assert!(!is_heif(&png_bytes()));
        assert!(!is_heif(b"not an image"));
    }

    #[test]
    fn truncated_heic_is_a_conversion_error() {
        let err = ImageConverter::default().to_jpeg(HEIC_HEADER).unwrap_err();
        assert!(matches!(err, GalleryError::Conversion(_)));
    }

    /// Encodes a solid HEIC with whichever ImageMagick binary is installed.
    fn heic_fixture(width: u32, height: u32) -> Vec<u8> {
        let size = format!("{}x{}", width, height);
        let output = ["magick", "convert"]
            .iter()
            .find_map(|program| {
                std::process::Command::new(program)
                    .args(["-size", &size, "xc:orange", "heic:-"])
                    .output()
                    .ok()
            })
            .expect("ImageMagick is not installed");
        assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
        output.stdout
    }

    #[test]
    #[ignore] // Requires ImageMagick with HEIC support
    fn converts_real_heic_to_jpeg() {
        let heic = heic_fixture(16, 12);
        assert!(is_heif(&heic));

        let jpeg = ImageConverter::default().to_jpeg(&heic).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 12));
    }

    #[test]
    fn garbage_is_a_conversion_error() {
        let err = ImageConverter::default().to_jpeg(b"not an image").unwrap_err();
        assert!(matches!(err, GalleryError::Conversion(_)));
    }
}
