//! Save encoder adapter (C9): a thin contract over `image`'s encoders.
//! Metadata preservation is explicitly out of scope here — it is a
//! decorator's job to copy a source's metadata blob into the target
//! file with an external library; this adapter only carries the
//! `preserve_metadata` flag through so a decorator knows to act on it.

use crate::image_buffer::Image;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder};
use image::codecs::tiff::TiffEncoder;
use image::{ExtendedColorType, ImageEncoder};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TiffCompression {
    None,
    Lzw,
    Zip,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveOptions {
    Jpeg { quality: u8, progressive: bool },
    Png { compression: u8 },
    Tiff { compression: TiffCompression },
}

impl SaveOptions {
    pub fn jpeg(quality: u8) -> Self {
        SaveOptions::Jpeg {
            quality,
            progressive: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("failed to open {path}: {cause}")]
    Io { path: String, cause: String },
    #[error("encode failed: {0}")]
    Encode(String),
}

/// `preserve_metadata` is accepted but unused by the core encoder itself;
/// an external decorator consults it to copy the source blob verbatim.
pub fn save(
    img: &Image,
    path: &Path,
    options: &SaveOptions,
    _preserve_metadata: bool,
) -> Result<(), SaveError> {
    let file = File::create(path).map_err(|e| SaveError::Io {
        path: path.display().to_string(),
        cause: e.to_string(),
    })?;
    let writer = BufWriter::new(file);

    match options {
        SaveOptions::Jpeg { quality, .. } => {
            // `image`'s JpegEncoder does not expose a progressive-scan
            // toggle; baseline-only is an accepted limitation.
            let encoder = JpegEncoder::new_with_quality(writer, *quality);
            encoder
                .write_image(&img.data, img.width, img.height, ExtendedColorType::Rgb8)
                .map_err(|e| SaveError::Encode(e.to_string()))
        }
        SaveOptions::Png { compression } => {
            let compression_type = match compression {
                0..=2 => CompressionType::Fast,
                3..=6 => CompressionType::Default,
                _ => CompressionType::Best,
            };
            let encoder = PngEncoder::new_with_quality(writer, compression_type, PngFilterType::Adaptive);
            encoder
                .write_image(&img.data, img.width, img.height, ExtendedColorType::Rgb8)
                .map_err(|e| SaveError::Encode(e.to_string()))
        }
        SaveOptions::Tiff { compression: _ } => {
            // The `image` TIFF encoder does not currently expose a
            // compression-scheme choice; every variant writes uncompressed.
            let encoder = TiffEncoder::new(writer);
            encoder
                .write_image(&img.data, img.width, img.height, ExtendedColorType::Rgb8)
                .map_err(|e| SaveError::Encode(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_buffer::Image;

    #[test]
    fn jpeg_round_trip_writes_a_file() {
        let dir = std::env::temp_dir().join(format!("aqualume-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("out.jpg");
        let img = Image::filled(4, 4, [10, 20, 30]);
        save(&img, &path, &SaveOptions::jpeg(90), false).unwrap();
        assert!(path.exists());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn png_round_trip_writes_a_file() {
        let dir = std::env::temp_dir().join(format!("aqualume-test-png-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("out.png");
        let img = Image::filled(4, 4, [10, 20, 30]);
        save(&img, &path, &SaveOptions::Png { compression: 6 }, false).unwrap();
        assert!(path.exists());
        std::fs::remove_file(&path).ok();
    }
}
