//! Enhancement endpoint client
//!
//! Request: `{ contents: [{ parts: [{ text }, { inlineData: { mimeType, data } }] }] }`.
//! The first inline image among the response candidates is the result.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use super::{ensure_success, EnhanceService};
use crate::{
    assets::{BinaryHandle, ContentKind},
    error::{Error, Result},
};

pub const DEFAULT_API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Serialize)]
pub struct EnhanceRequest {
    pub contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", alias = "inline_data")]
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(alias = "mime_type")]
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct EnhanceResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize, Default)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
}

impl EnhanceRequest {
    pub fn new(instruction: &str, image: &BinaryHandle) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![
                    Part {
                        text: Some(instruction.to_owned()),
                        inline_data: None,
                    },
                    Part {
                        text: None,
                        inline_data: Some(InlineData {
                            mime_type: image.kind().mime().to_owned(),
                            data: STANDARD.encode(image.bytes()),
                        }),
                    },
                ],
            }],
        }
    }
}

impl EnhanceResponse {
    /// Decodes the first inline image, `NoImageReturned` when there is none
    pub fn into_image(self) -> Result<BinaryHandle> {
        let inline = self
            .candidates
            .into_iter()
            .filter_map(|candidate| candidate.content)
            .flat_map(|content| content.parts)
            .filter_map(|part| part.inline_data)
            .find(|data| data.mime_type.starts_with("image/") || data.mime_type.is_empty())
            .ok_or(Error::NoImageReturned)?;

        let bytes = STANDARD
            .decode(inline.data.trim())
            .map_err(|_| Error::NoImageReturned)?;
        if bytes.is_empty() {
            return Err(Error::NoImageReturned);
        }

        let kind = match ContentKind::from_mime(&inline.mime_type) {
            ContentKind::OctetStream => ContentKind::Png,
            kind => kind,
        };
        Ok(BinaryHandle::new(bytes, kind))
    }
}

/// Enhancement over HTTP
#[derive(Debug, Clone)]
pub struct HttpEnhanceService {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    api_key_header: String,
}

impl HttpEnhanceService {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key: None,
            api_key_header: DEFAULT_API_KEY_HEADER.to_owned(),
        }
    }

    pub fn with_api_key(mut self, header: impl Into<String>, key: Option<String>) -> Self {
        self.api_key_header = header.into();
        self.api_key = key;
        self
    }

    async fn post(&self, image: &BinaryHandle, instruction: &str) -> Result<BinaryHandle> {
        let body = EnhanceRequest::new(instruction, image);
        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.header(self.api_key_header.as_str(), key);
        }

        log::debug!("POST {} ({} byte image)", self.endpoint, image.len());
        let response = ensure_success(request.send().await?).await?;
        let parsed: EnhanceResponse = response.json().await?;
        parsed.into_image()
    }
}

impl EnhanceService for HttpEnhanceService {
    fn enhance<'a>(
        &'a self,
        image: &'a BinaryHandle,
        instruction: &'a str,
    ) -> BoxFuture<'a, Result<BinaryHandle>> {
        Box::pin(self.post(image, instruction))
    }
}
