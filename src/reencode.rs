//! Image re-encoding.
//!
//! Stripping metadata is a side effect of the decode → redraw → encode round
//! trip: nothing from the source container survives except pixels. The EXIF
//! orientation is applied before encoding so the output looks the same as the
//! source did in a viewer, and the orientation tag itself disappears with the
//! rest of the metadata.

use image::DynamicImage;
use std::io::{BufReader, Cursor};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Jpeg,
    WebP,
}

impl OutputFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(OutputFormat::Png),
            "jpg" | "jpeg" => Some(OutputFormat::Jpeg),
            "webp" => Some(OutputFormat::WebP),
            _ => None,
        }
    }

    fn from_image_format(format: image::ImageFormat) -> Option<Self> {
        match format {
            image::ImageFormat::Png => Some(OutputFormat::Png),
            image::ImageFormat::Jpeg => Some(OutputFormat::Jpeg),
            image::ImageFormat::WebP => Some(OutputFormat::WebP),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
            OutputFormat::WebP => "webp",
        }
    }

    pub fn media_type(&self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::WebP => "image/webp",
        }
    }
}

/// Decode/encode capability. The native backend sits on the `image` crate; a
/// different platform supplies its own.
pub trait ImageCodec: Send + Sync {
    /// Decode to a raster, reporting the detected source format when it is
    /// one the encoder could also write.
    fn decode(&self, bytes: &[u8]) -> Result<(DynamicImage, Option<OutputFormat>), AppError>;
    fn encode(&self, image: &DynamicImage, format: OutputFormat) -> Result<Vec<u8>, AppError>;
}

pub struct NativeCodec {
    pub jpeg_quality: u8,
}

impl Default for NativeCodec {
    fn default() -> Self {
        Self { jpeg_quality: 90 }
    }
}

impl ImageCodec for NativeCodec {
    fn decode(&self, bytes: &[u8]) -> Result<(DynamicImage, Option<OutputFormat>), AppError> {
        let reader = image::io::Reader::new(Cursor::new(bytes)).with_guessed_format()?;
        let source = reader.format().and_then(OutputFormat::from_image_format);
        let decoded = reader.decode()?;
        Ok((decoded, source))
    }

    fn encode(&self, image: &DynamicImage, format: OutputFormat) -> Result<Vec<u8>, AppError> {
        let mut buf = Cursor::new(Vec::new());
        match format {
            OutputFormat::Png => {
                image.write_to(&mut buf, image::ImageOutputFormat::Png)?;
            }
            OutputFormat::Jpeg => {
                // JPEG has no alpha channel; flatten first.
                let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
                rgb.write_to(&mut buf, image::ImageOutputFormat::Jpeg(self.jpeg_quality))?;
            }
            OutputFormat::WebP => {
                image.write_to(&mut buf, image::ImageOutputFormat::WebP)?;
            }
        }
        Ok(buf.into_inner())
    }
}

/// The 8 standard EXIF orientation cases. 5–8 swap width and height.
pub fn apply_orientation(image: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => image.fliph(),
        3 => image.rotate180(),
        4 => image.flipv(),
        5 => image.rotate90().fliph(),
        6 => image.rotate90(),
        7 => image.rotate270().fliph(),
        8 => image.rotate270(),
        _ => image,
    }
}

/// Orientation tag of the source, 1 when absent or unreadable.
pub fn read_orientation(bytes: &[u8]) -> u32 {
    let mut reader = BufReader::new(Cursor::new(bytes));
    let orientation = exif::Reader::new()
        .read_from_container(&mut reader)
        .ok()
        .and_then(|exif| {
            exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)
                .and_then(|f| f.value.get_uint(0))
        })
        .unwrap_or(1);
    if (1..=8).contains(&orientation) {
        orientation
    } else {
        1
    }
}

#[derive(Debug)]
pub struct StripOutcome {
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
    /// True when the preferred format failed and PNG took over.
    pub fell_back: bool,
}

/// Decode, normalize orientation, re-encode. The preferred output format is
/// the requested one, else the source format, else PNG; one PNG retry covers
/// a failing preferred encode before the error reaches the caller.
pub fn strip_image(
    codec: &dyn ImageCodec,
    bytes: &[u8],
    requested: Option<OutputFormat>,
) -> Result<StripOutcome, AppError> {
    let orientation = read_orientation(bytes);
    let (decoded, source_format) = codec.decode(bytes)?;
    log::debug!(
        "Decoded {}x{} image, orientation {}",
        decoded.width(),
        decoded.height(),
        orientation
    );

    let image = apply_orientation(decoded, orientation);
    let preferred = requested.or(source_format).unwrap_or(OutputFormat::Png);

    let (encoded, format, fell_back) = match codec.encode(&image, preferred) {
        Ok(encoded) => (encoded, preferred, false),
        Err(e) if preferred != OutputFormat::Png => {
            log::warn!(
                "Encoding to {} failed ({}); retrying as PNG",
                preferred.extension(),
                e
            );
            (codec.encode(&image, OutputFormat::Png)?, OutputFormat::Png, true)
        }
        Err(e) => return Err(e),
    };

    Ok(StripOutcome {
        bytes: encoded,
        format,
        width: image.width(),
        height: image.height(),
        fell_back,
    })
}

/// `photo.jpg` → `photo-clean.jpg` (with the output format's extension).
pub fn clean_file_name(input: &str, format: OutputFormat) -> String {
    let stem = match input.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => input,
    };
    format!("{}-clean.{}", stem, format.extension())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(image::RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x * 37 % 256) as u8, (y * 53 % 256) as u8, 77])
        }))
    }

    fn png_bytes(img: &DynamicImage) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageOutputFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn orientations_one_to_four_preserve_dimensions() {
        for orientation in 1..=4 {
            let out = apply_orientation(gradient(6, 4), orientation);
            assert_eq!((out.width(), out.height()), (6, 4), "orientation {}", orientation);
        }
    }

    #[test]
    fn orientations_five_to_eight_swap_dimensions() {
        for orientation in 5..=8 {
            let out = apply_orientation(gradient(6, 4), orientation);
            assert_eq!((out.width(), out.height()), (4, 6), "orientation {}", orientation);
        }
    }

    #[test]
    fn unknown_orientation_is_identity() {
        let out = apply_orientation(gradient(6, 4), 0);
        assert_eq!((out.width(), out.height()), (6, 4));
        let out = apply_orientation(gradient(6, 4), 9);
        assert_eq!((out.width(), out.height()), (6, 4));
    }

    #[test]
    fn strip_round_trip_preserves_pixels_without_orientation() {
        let source = gradient(8, 5);
        let outcome = strip_image(&NativeCodec::default(), &png_bytes(&source), None).unwrap();
        assert_eq!(outcome.format, OutputFormat::Png);
        assert!(!outcome.fell_back);
        assert_eq!((outcome.width, outcome.height), (8, 5));

        let decoded = image::load_from_memory(&outcome.bytes).unwrap();
        assert_eq!(decoded.to_rgb8().as_raw(), source.to_rgb8().as_raw());
    }

    #[test]
    fn strip_honors_requested_format() {
        let outcome = strip_image(
            &NativeCodec::default(),
            &png_bytes(&gradient(8, 5)),
            Some(OutputFormat::Jpeg),
        )
        .unwrap();
        assert_eq!(outcome.format, OutputFormat::Jpeg);
        // JPEG magic.
        assert_eq!(&outcome.bytes[..2], &[0xff, 0xd8]);
    }

    #[test]
    fn jpeg_encode_flattens_alpha() {
        let rgba = DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
            4,
            4,
            image::Rgba([10, 20, 30, 128]),
        ));
        let encoded = NativeCodec::default()
            .encode(&rgba, OutputFormat::Jpeg)
            .unwrap();
        assert_eq!(&encoded[..2], &[0xff, 0xd8]);
    }

    #[test]
    fn failing_preferred_format_falls_back_to_png() {
        struct FussyCodec;
        impl ImageCodec for FussyCodec {
            fn decode(
                &self,
                bytes: &[u8],
            ) -> Result<(DynamicImage, Option<OutputFormat>), AppError> {
                NativeCodec::default().decode(bytes)
            }
            fn encode(
                &self,
                image: &DynamicImage,
                format: OutputFormat,
            ) -> Result<Vec<u8>, AppError> {
                if format == OutputFormat::WebP {
                    return Err(AppError::Encode("no webp here".into()));
                }
                NativeCodec::default().encode(image, format)
            }
        }

        let outcome = strip_image(
            &FussyCodec,
            &png_bytes(&gradient(8, 5)),
            Some(OutputFormat::WebP),
        )
        .unwrap();
        assert_eq!(outcome.format, OutputFormat::Png);
        assert!(outcome.fell_back);
    }

    #[test]
    fn clean_names() {
        assert_eq!(clean_file_name("photo.jpeg", OutputFormat::Jpeg), "photo-clean.jpg");
        assert_eq!(clean_file_name("archive.tar.png", OutputFormat::Png), "archive.tar-clean.png");
        assert_eq!(clean_file_name("noext", OutputFormat::Png), "noext-clean.png");
        assert_eq!(clean_file_name(".hidden", OutputFormat::Png), ".hidden-clean.png");
    }
}
