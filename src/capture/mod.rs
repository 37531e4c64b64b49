//! Camera device sessions
//!
//! A [`CaptureProvider`] opens a [`CaptureDevice`] honouring the
//! [`CaptureConstraints`]; a [`CaptureSession`] owns at most one open device
//! and the last frame grabbed from it.

pub mod still;

use serde::{Deserialize, Serialize};

use crate::{
    assets::BinaryHandle,
    error::{Error, Result},
};

pub use still::StillImageProvider;

/// Which way the camera should face when there is a choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    User,
    /// Rear-facing, pointed at the subject
    #[default]
    Environment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConstraints {
    pub ideal_width: u32,
    pub ideal_height: u32,
    pub facing: Facing,
    pub audio: bool,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            ideal_width: 1280,
            ideal_height: 720,
            facing: Facing::Environment,
            audio: false,
        }
    }
}

pub trait CaptureProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Opens a device. Fails with `PermissionDenied` or `DeviceNotFound`.
    fn acquire(&self, constraints: &CaptureConstraints) -> Result<Box<dyn CaptureDevice>>;
}

pub trait CaptureDevice: Send {
    fn label(&self) -> &str;

    /// Grabs the current frame as a PNG
    fn grab_frame(&mut self) -> Result<BinaryHandle>;

    /// Stops every track of the device
    fn stop(&mut self);
}

/// The single active device session
pub struct CaptureSession {
    constraints: CaptureConstraints,
    device: Option<Box<dyn CaptureDevice>>,
    last_frame: Option<BinaryHandle>,
}

impl CaptureSession {
    pub fn new(constraints: CaptureConstraints) -> Self {
        Self {
            constraints,
            device: None,
            last_frame: None,
        }
    }

    pub fn constraints(&self) -> &CaptureConstraints {
        &self.constraints
    }

    /// Starts a device session, releasing the previous one first
    pub fn start(&mut self, provider: &dyn CaptureProvider) -> Result<()> {
        self.release();
        let device = provider.acquire(&self.constraints)?;
        log::info!("Camera started: {} via {}", device.label(), provider.name());
        self.device = Some(device);
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.device.is_some()
    }

    pub fn capture_frame(&mut self) -> Result<BinaryHandle> {
        let device = self.device.as_mut().ok_or(Error::NoActiveDevice)?;
        let frame = device.grab_frame()?;
        self.last_frame = Some(frame.clone());
        Ok(frame)
    }

    pub fn last_frame(&self) -> Option<&BinaryHandle> {
        self.last_frame.as_ref()
    }

    /// Stops the device and forgets the session state; idempotent
    pub fn release(&mut self) {
        if let Some(mut device) = self.device.take() {
            device.stop();
            log::info!("Camera released: {}", device.label());
        }
        self.last_frame = None;
    }
}

impl Default for CaptureSession {
    fn default() -> Self {
        Self::new(CaptureConstraints::default())
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.release();
    }
}
