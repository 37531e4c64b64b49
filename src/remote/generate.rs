//! Image-to-3D endpoint client
//!
//! Uploads the enhanced image as multipart field `image` and receives a GLB
//! body, optionally named by `Content-Disposition`.

use futures::future::BoxFuture;
use reqwest::{header::CONTENT_DISPOSITION, multipart};

use super::{content_disposition::suggested_filename, ensure_success, GeneratedModel, ModelService};
use crate::{
    assets::{BinaryHandle, ContentKind},
    error::Result,
};

/// Multipart field carrying the source image
pub const IMAGE_FIELD: &str = "image";

const UPLOAD_FILENAME: &str = "capture.png";

#[derive(Debug, Clone)]
pub struct HttpModelService {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpModelService {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key: None,
        }
    }

    pub fn with_bearer_token(mut self, token: Option<String>) -> Self {
        self.api_key = token;
        self
    }

    async fn upload(&self, image: &BinaryHandle) -> Result<GeneratedModel> {
        let part = multipart::Part::bytes(image.bytes().to_vec())
            .file_name(UPLOAD_FILENAME)
            .mime_str(image.kind().mime())?;
        let form = multipart::Form::new().part(IMAGE_FIELD, part);

        let mut request = self.client.post(&self.endpoint).multipart(form);
        if let Some(token) = &self.api_key {
            request = request.bearer_auth(token);
        }

        log::debug!("POST {} ({} byte image)", self.endpoint, image.len());
        let response = ensure_success(request.send().await?).await?;

        let disposition = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let filename = suggested_filename(disposition.as_deref());
        let bytes = response.bytes().await?;

        Ok(GeneratedModel {
            handle: BinaryHandle::new(bytes.to_vec(), model_kind(&filename)),
            suggested_filename: filename,
        })
    }
}

/// Kind of a generated model, GLB unless the filename says otherwise
fn model_kind(filename: &str) -> ContentKind {
    let extension = filename.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
    match ContentKind::from_extension(extension) {
        ContentKind::Obj => ContentKind::Obj,
        _ => ContentKind::GltfBinary,
    }
}

impl ModelService for HttpModelService {
    fn generate<'a>(&'a self, image: &'a BinaryHandle) -> BoxFuture<'a, Result<GeneratedModel>> {
        Box::pin(self.upload(image))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_kind_defaults_to_glb() {
        assert_eq!(model_kind("model.glb"), ContentKind::GltfBinary);
        assert_eq!(model_kind("statue"), ContentKind::GltfBinary);
        assert_eq!(model_kind("mesh.OBJ"), ContentKind::Obj);
    }
}
