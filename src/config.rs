//! Runtime configuration
//!
//! Read from an optional JSON file; every section falls back to its defaults
//! so an empty object is a valid configuration. Endpoints are checked with
//! [`Config::validate`] before any request is made.

use std::{net::IpAddr, path::Path, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    capture::{CaptureConstraints, Facing},
    error::{Error, Result},
    remote::enhance::DEFAULT_API_KEY_HEADER,
    toolkit::{NavigationSettings, ToolkitPin},
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub enhance: EnhanceConfig,
    pub generate: GenerateConfig,
    pub toolkit: ToolkitPin,
    pub capture: CaptureConfig,
    pub viewer: ViewerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhanceConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub api_key_header: String,
    /// Used when no instruction is given on the command line
    pub instruction: String,
}

impl Default for EnhanceConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8787/enhance".into(),
            api_key: None,
            api_key_header: DEFAULT_API_KEY_HEADER.into(),
            instruction: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    /// Seconds before an upload is abandoned
    pub timeout_secs: u64,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8787/generate".into(),
            api_key: None,
            timeout_secs: 300,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Still image standing in for the camera
    pub source: Option<PathBuf>,
    pub ideal_width: u32,
    pub ideal_height: u32,
    pub facing: Facing,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        let constraints = CaptureConstraints::default();
        Self {
            source: None,
            ideal_width: constraints.ideal_width,
            ideal_height: constraints.ideal_height,
            facing: constraints.facing,
        }
    }
}

impl CaptureConfig {
    pub fn constraints(&self) -> CaptureConstraints {
        CaptureConstraints {
            ideal_width: self.ideal_width,
            ideal_height: self.ideal_height,
            facing: self.facing,
            audio: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Container width in logical pixels
    pub width: u32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub damping_factor: f32,
    /// Directory downloads are written to
    pub download_dir: PathBuf,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        let navigation = NavigationSettings::default();
        Self {
            width: 960,
            rotate_speed: navigation.rotate_speed,
            zoom_speed: navigation.zoom_speed,
            damping_factor: navigation.damping_factor,
            download_dir: PathBuf::from("."),
        }
    }
}

impl ViewerConfig {
    pub fn navigation(&self) -> NavigationSettings {
        NavigationSettings {
            rotate_speed: self.rotate_speed,
            zoom_speed: self.zoom_speed,
            damping_factor: self.damping_factor,
        }
    }
}

impl Config {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    /// Reads `path`, or returns the defaults when it is `None`
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)?;
        log::info!("Loaded configuration from {}", path.display());
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<()> {
        check_endpoint("enhance", &self.enhance.endpoint)?;
        check_endpoint("generate", &self.generate.endpoint)?;
        if self.viewer.width == 0 {
            return Err(Error::Config("viewer.width must be positive".into()));
        }
        self.toolkit.adapter_request().map(|_| ())
    }
}

/// Plain `http` is only accepted for loopback hosts
pub fn check_endpoint(name: &str, endpoint: &str) -> Result<()> {
    let url = reqwest::Url::parse(endpoint)
        .map_err(|e| Error::Config(format!("{name} endpoint `{endpoint}`: {e}")))?;

    match url.scheme() {
        "https" => Ok(()),
        "http" if is_loopback(&url) => Ok(()),
        "http" => Err(Error::InsecureContext(format!(
            "{name} endpoint `{endpoint}` must use https"
        ))),
        other => Err(Error::Config(format!(
            "{name} endpoint `{endpoint}` has unsupported scheme `{other}`"
        ))),
    }
}

fn is_loopback(url: &reqwest::Url) -> bool {
    match url.host_str() {
        Some("localhost") => true,
        Some(host) => host
            .trim_start_matches('[')
            .trim_end_matches(']')
            .parse::<IpAddr>()
            .is_ok_and(|ip| ip.is_loopback()),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_is_default() {
        assert_eq!(Config::from_json("{}").unwrap(), Config::default());
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config = Config::from_json(
            r#"{
                "enhance": { "endpoint": "https://enhance.example/v1", "api_key": "k" },
                "capture": { "facing": "user" },
                "toolkit": { "backends": ["gl"] }
            }"#,
        )
        .unwrap();

        assert_eq!(config.enhance.endpoint, "https://enhance.example/v1");
        assert_eq!(config.enhance.api_key_header, DEFAULT_API_KEY_HEADER);
        assert_eq!(config.capture.constraints().facing, Facing::User);
        assert_eq!(config.capture.constraints().ideal_width, 1280);
        assert!(config.toolkit.force_fallback_adapter);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_plain_http_to_remote_host_is_insecure() {
        assert!(check_endpoint("enhance", "http://localhost:9000/x").is_ok());
        assert!(check_endpoint("enhance", "http://[::1]:9000/x").is_ok());
        assert!(matches!(
            check_endpoint("generate", "http://models.example/generate"),
            Err(Error::InsecureContext(_))
        ));
        assert!(matches!(
            check_endpoint("generate", "ftp://models.example/"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_malformed_json_is_config_error() {
        assert!(matches!(Config::from_json("{ nope"), Err(Error::Config(_))));
    }
}
