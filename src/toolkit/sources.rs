//! The two toolkit sources shipped with snapforge
//!
//! [`BundledToolkit`] asks wgpu for a hardware adapter on any backend and
//! exports the parts separately. [`PinnedToolkit`] is the fallback: a software
//! adapter restricted to an explicitly pinned backend set, exported as one
//! bundle.

use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use super::{NavigationSettings, Toolkit, ToolkitExports, ToolkitSource};
use crate::{
    error::{Error, Result},
    gfx::{
        loader::ModelLoader,
        rendering::render_engine::{AdapterRequest, WgpuEngine},
    },
};

/// Explicit backend pin for the fallback source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolkitPin {
    /// Backend names, e.g. `["vulkan", "gl"]`
    pub backends: Vec<String>,
    pub force_fallback_adapter: bool,
}

impl Default for ToolkitPin {
    fn default() -> Self {
        Self {
            backends: vec!["vulkan".into(), "metal".into(), "dx12".into(), "gl".into()],
            force_fallback_adapter: true,
        }
    }
}

impl ToolkitPin {
    pub fn adapter_request(&self) -> Result<AdapterRequest> {
        Ok(AdapterRequest {
            backends: parse_backends(&self.backends)?,
            force_fallback_adapter: self.force_fallback_adapter,
            power_preference: wgpu::PowerPreference::LowPower,
        })
    }
}

/// Maps backend names onto a wgpu backend set
pub fn parse_backends<S: AsRef<str>>(names: &[S]) -> Result<wgpu::Backends> {
    let mut backends = wgpu::Backends::empty();
    for name in names {
        let backend = match name.as_ref().trim().to_ascii_lowercase().as_str() {
            "vulkan" | "vk" => wgpu::Backends::VULKAN,
            "metal" | "mtl" => wgpu::Backends::METAL,
            "dx12" | "d3d12" => wgpu::Backends::DX12,
            "gl" | "gles" | "opengl" => wgpu::Backends::GL,
            "primary" => wgpu::Backends::PRIMARY,
            "all" => wgpu::Backends::all(),
            other => {
                return Err(Error::Config(format!("unknown graphics backend '{other}'")));
            }
        };
        backends |= backend;
    }

    if backends.is_empty() {
        return Err(Error::Config("toolkit pin names no backends".into()));
    }
    Ok(backends)
}

/// Hardware adapter on every backend
#[derive(Debug, Default, Clone)]
pub struct BundledToolkit {
    pub navigation: NavigationSettings,
}

impl ToolkitSource for BundledToolkit {
    fn name(&self) -> &str {
        "bundled"
    }

    fn acquire(&self) -> BoxFuture<'_, Result<ToolkitExports>> {
        Box::pin(async move {
            let engine = WgpuEngine::acquire(AdapterRequest::default()).await?;
            Ok(ToolkitExports::Named {
                engine: Some(Arc::new(engine)),
                asset_loader: Some(Arc::new(ModelLoader::new())),
                navigation: Some(self.navigation),
            })
        })
    }
}

/// Software fallback pinned to a fixed backend set
#[derive(Debug, Clone)]
pub struct PinnedToolkit {
    pin: ToolkitPin,
    navigation: NavigationSettings,
}

impl PinnedToolkit {
    pub fn new(pin: ToolkitPin) -> Self {
        Self {
            pin,
            navigation: NavigationSettings::default(),
        }
    }

    pub fn with_navigation(mut self, navigation: NavigationSettings) -> Self {
        self.navigation = navigation;
        self
    }

    pub fn pin(&self) -> &ToolkitPin {
        &self.pin
    }
}

impl ToolkitSource for PinnedToolkit {
    fn name(&self) -> &str {
        "pinned-fallback"
    }

    fn acquire(&self) -> BoxFuture<'_, Result<ToolkitExports>> {
        Box::pin(async move {
            let request = self.pin.adapter_request()?;
            let engine = WgpuEngine::acquire(request).await?;
            Ok(ToolkitExports::Bundle(Toolkit {
                engine: Arc::new(engine),
                asset_loader: Arc::new(ModelLoader::new()),
                navigation: self.navigation,
            }))
        })
    }
}
