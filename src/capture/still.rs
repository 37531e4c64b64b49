//! A capture provider backed by a still image on disk
//!
//! Stands in for a live camera: the image is read once when the device is
//! opened, fitted inside the ideal frame size and handed out as PNG.

use std::{
    io::{self, Cursor},
    path::PathBuf,
};

use image::{imageops::FilterType, DynamicImage, ImageFormat};

use super::{CaptureConstraints, CaptureDevice, CaptureProvider, Facing};
use crate::{
    assets::{BinaryHandle, ContentKind},
    error::{Error, Result},
};

#[derive(Debug, Clone)]
pub struct StillImageProvider {
    path: PathBuf,
}

impl StillImageProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CaptureProvider for StillImageProvider {
    fn name(&self) -> &str {
        "still-image"
    }

    fn acquire(&self, constraints: &CaptureConstraints) -> Result<Box<dyn CaptureDevice>> {
        let display = self.path.display().to_string();
        let bytes = std::fs::read(&self.path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::DeviceNotFound(display.clone()),
            io::ErrorKind::PermissionDenied => Error::PermissionDenied(display.clone()),
            _ => Error::Io(e),
        })?;
        let image = image::load_from_memory(&bytes)
            .map_err(|e| Error::DeviceNotFound(format!("{display}: {e}")))?;

        if constraints.facing == Facing::User {
            log::debug!("Still image source ignores the facing preference");
        }

        let frame = fit_within(image, constraints.ideal_width, constraints.ideal_height);
        let png = encode_png(&frame)?;
        log::debug!(
            "Opened {} at {}x{} ({} bytes)",
            display,
            frame.width(),
            frame.height(),
            png.len()
        );

        Ok(Box::new(StillImageDevice {
            label: display,
            frame: Some(png),
        }))
    }
}

/// Downscales so the image fits `width` x `height`, keeping its aspect ratio
pub fn fit_within(image: DynamicImage, width: u32, height: u32) -> DynamicImage {
    if image.width() <= width && image.height() <= height {
        image
    } else {
        image.resize(width, height, FilterType::Triangle)
    }
}

pub fn encode_png(image: &DynamicImage) -> Result<BinaryHandle> {
    let mut buffer = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .map_err(|e| Error::Io(io::Error::other(e)))?;
    Ok(BinaryHandle::new(buffer, ContentKind::Png))
}

struct StillImageDevice {
    label: String,
    frame: Option<BinaryHandle>,
}

impl CaptureDevice for StillImageDevice {
    fn label(&self) -> &str {
        &self.label
    }

    fn grab_frame(&mut self) -> Result<BinaryHandle> {
        self.frame.clone().ok_or(Error::NoActiveDevice)
    }

    fn stop(&mut self) {
        self.frame = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_image(width: u32, height: u32) -> tempfile::NamedTempFile {
        let file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        image::RgbImage::new(width, height).save(file.path()).unwrap();
        file
    }

    #[test]
    fn test_large_image_is_fitted_to_ideal_size() {
        let file = temp_image(2000, 1000);
        let mut device = StillImageProvider::new(file.path())
            .acquire(&CaptureConstraints::default())
            .unwrap();

        let frame = device.grab_frame().unwrap();
        assert_eq!(frame.kind(), ContentKind::Png);
        let decoded = image::load_from_memory(frame.bytes()).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (1280, 640));
    }

    #[test]
    fn test_small_image_is_kept() {
        let image = DynamicImage::new_rgb8(64, 48);
        let fitted = fit_within(image, 1280, 720);
        assert_eq!((fitted.width(), fitted.height()), (64, 48));
    }

    #[test]
    fn test_missing_file_is_device_not_found() {
        let provider = StillImageProvider::new("/definitely/not/here.png");
        let result = provider.acquire(&CaptureConstraints::default());
        assert!(matches!(result, Err(Error::DeviceNotFound(_))));
    }

    #[test]
    fn test_stopped_device_yields_no_frames() {
        let file = temp_image(8, 8);
        let mut device = StillImageProvider::new(file.path())
            .acquire(&CaptureConstraints::default())
            .unwrap();
        device.stop();
        assert!(matches!(device.grab_frame(), Err(Error::NoActiveDevice)));
    }
}
