//! Clients for the two remote generation services
//!
//! Both services sit behind object-safe traits so the pipeline can be driven
//! by test doubles; the shipped implementations talk HTTP through `reqwest`.

pub mod content_disposition;
pub mod enhance;
pub mod generate;

use futures::future::BoxFuture;

use crate::{
    assets::BinaryHandle,
    error::{Error, Result},
};

pub use enhance::HttpEnhanceService;
pub use generate::HttpModelService;

/// Longest slice of an error body carried into `RemoteError`
const MAX_ERROR_BODY: usize = 512;

/// Image-to-image enhancement
pub trait EnhanceService: Send + Sync {
    fn enhance<'a>(
        &'a self,
        image: &'a BinaryHandle,
        instruction: &'a str,
    ) -> BoxFuture<'a, Result<BinaryHandle>>;
}

/// A model produced by the image-to-3D service
#[derive(Debug, Clone)]
pub struct GeneratedModel {
    pub handle: BinaryHandle,
    pub suggested_filename: String,
}

/// Image-to-3D generation
pub trait ModelService: Send + Sync {
    fn generate<'a>(&'a self, image: &'a BinaryHandle) -> BoxFuture<'a, Result<GeneratedModel>>;
}

/// Maps a non-2xx response onto `RemoteError`, keeping the head of the body
pub(crate) async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let mut message: String = body.trim().chars().take(MAX_ERROR_BODY).collect();
    if message.is_empty() {
        message = status.canonical_reason().unwrap_or("request failed").to_owned();
    }
    Err(Error::RemoteError {
        status: status.as_u16(),
        message,
    })
}
