//! Hashing - SHA-256 over Decoded Pixels
//!
//! The digest covers RGBA8 pixel data only, so two files with the same
//! pixels hash identically regardless of compression or metadata.

use image::RgbaImage;
use sha2::{Digest, Sha256};
use std::path::Path;

use crate::exporter::ExportError;

/// Compute SHA-256 hash of bytes, return hex string
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Digest of an in-memory RGBA buffer
pub fn pixel_hash_image(image: &RgbaImage) -> String {
    sha256_hex(image.as_raw())
}

/// Re-open a raster file, normalize to RGBA8 and hash the flattened channels
pub fn pixel_hash(path: &Path) -> Result<String, ExportError> {
    let decoded = image::open(path).map_err(|source| ExportError::Hash {
        path: path.to_path_buf(),
        source,
    })?;
    let hash = pixel_hash_image(&decoded.to_rgba8());
    tracing::debug!(path = %path.display(), %hash, "hashed raster pixels");
    Ok(hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage, Rgba};

    #[test]
    fn test_hash_deterministic() {
        let data = b"test data";
        assert_eq!(sha256_hex(data), sha256_hex(data));
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_pixel_hash_matches_raw_rgba() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.png");
        let img = RgbaImage::from_pixel(3, 2, Rgba([10, 20, 30, 255]));
        img.save(&path).unwrap();

        assert_eq!(pixel_hash(&path).unwrap(), sha256_hex(img.as_raw()));
    }

    #[test]
    fn test_rgb_file_normalized_to_rgba() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rgb.png");
        RgbImage::from_pixel(2, 2, Rgb([1, 2, 3]))
            .save_with_format(&path, ImageFormat::Png)
            .unwrap();

        let expected = RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 255]));
        assert_eq!(pixel_hash(&path).unwrap(), pixel_hash_image(&expected));
    }

    #[test]
    fn test_garbage_file_is_hash_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not a png").unwrap();

        let err = pixel_hash(&path).unwrap_err();
        assert!(matches!(err, ExportError::Hash { .. }));
    }
}
