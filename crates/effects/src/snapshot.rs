//! PNG export of rendered frames and PNG decoding for image sources.
//!
//! Feature-gated behind `png` (default on) so embedders that supply their
//! own surfaces do not pull in the `image` crate.

use std::path::Path;

use particle_fx_core::error::EngineError;
use particle_fx_core::source::PixelMask;

/// Writes an RGBA mask as a PNG image.
///
/// Returns `EngineError::InvalidDimensions` if the mask dimensions overflow
/// `u32`, or `EngineError::Io` on write failure.
pub fn write_png(mask: &PixelMask, path: &Path) -> Result<(), EngineError> {
    let w = u32::try_from(mask.width()).map_err(|_| EngineError::InvalidDimensions)?;
    let h = u32::try_from(mask.height()).map_err(|_| EngineError::InvalidDimensions)?;
    let img = image::RgbaImage::from_raw(w, h, mask.data().to_vec())
        .ok_or_else(|| EngineError::Io("RGBA buffer size mismatch".into()))?;
    img.save(path).map_err(|e| EngineError::Io(e.to_string()))
}

/// Decodes an image file into an RGBA mask.
///
/// Any open or decode failure is `EngineError::SourceUnreadable`, naming
/// the path.
pub fn load_mask(path: &Path) -> Result<PixelMask, EngineError> {
    let img = image::open(path)
        .map_err(|e| EngineError::SourceUnreadable(format!("{}: {e}", path.display())))?
        .to_rgba8();
    let (w, h) = img.dimensions();
    PixelMask::from_rgba(w as usize, h as usize, img.into_raw())
}

#[cfg(test)]
mod tests {
    use super::*;
    use particle_fx_core::color::Rgba;

    #[test]
    fn write_png_round_trip() {
        let mut mask = PixelMask::new(16, 8).unwrap();
        mask.set_pixel(3, 4, Rgba::new(10, 20, 30, 255));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");

        write_png(&mask, &path).unwrap();

        let img = image::open(&path).unwrap().to_rgba8();
        assert_eq!(img.width(), 16);
        assert_eq!(img.height(), 8);
        assert_eq!(img.get_pixel(3, 4).0, [10, 20, 30, 255]);
    }

    #[test]
    fn load_mask_reads_written_png() {
        let mask = PixelMask::filled(5, 3, Rgba::new(200, 100, 0, 128)).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logo.png");
        write_png(&mask, &path).unwrap();

        let loaded = load_mask(&path).unwrap();
        assert_eq!(loaded, mask);
    }

    #[test]
    fn load_mask_missing_file_is_unreadable_source() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_mask(&dir.path().join("nope.png")).unwrap_err();
        assert!(matches!(err, EngineError::SourceUnreadable(msg) if msg.contains("nope.png")));
    }

    #[test]
    fn load_mask_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.png");
        std::fs::write(&path, b"not an image").unwrap();
        assert!(matches!(
            load_mask(&path),
            Err(EngineError::SourceUnreadable(_))
        ));
    }

    #[test]
    fn write_png_to_missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let mask = PixelMask::new(2, 2).unwrap();
        let err = write_png(&mask, &dir.path().join("no/such/dir.png")).unwrap_err();
        assert!(matches!(err, EngineError::Io(_)));
    }
}
