//! Outgoing request descriptions.
//!
//! A `RequestEnvelope` is built per call by a service and consumed by the
//! gateway, which decorates and sends it.

use std::path::Path;

use anyhow::{Context, Result};
use reqwest::header::HeaderMap;
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

use super::ApiError;

/// Field name the backend expects for uploaded images
pub const IMAGE_FIELD: &str = "image";

/// An image file to upload alongside form fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Read an image from disk, guessing the content type from its extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read image file {}", path.display()))?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("image")
            .to_string();
        let content_type = Self::content_type_for(path);
        Ok(Self::new(file_name, content_type, bytes))
    }

    fn content_type_for(path: &Path) -> &'static str {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("png") => "image/png",
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("gif") => "image/gif",
            Some("webp") => "image/webp",
            Some("svg") => "image/svg+xml",
            _ => "application/octet-stream",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Empty,
    Json(Value),
    /// Text fields plus the `image` file part
    Multipart {
        fields: Vec<(String, String)>,
        image: ImageUpload,
    },
}

#[derive(Debug, Clone)]
pub struct RequestEnvelope {
    pub method: Method,
    pub segments: Vec<String>,
    pub query: Vec<(String, String)>,
    pub payload: Payload,
    pub headers: HeaderMap,
}

impl RequestEnvelope {
    pub fn new<S: AsRef<str>>(method: Method, segments: &[S]) -> Self {
        Self {
            method,
            segments: segments.iter().map(|s| s.as_ref().to_string()).collect(),
            query: Vec::new(),
            payload: Payload::Empty,
            headers: HeaderMap::new(),
        }
    }

    pub fn get<S: AsRef<str>>(segments: &[S]) -> Self {
        Self::new(Method::GET, segments)
    }

    pub fn post<S: AsRef<str>>(segments: &[S]) -> Self {
        Self::new(Method::POST, segments)
    }

    pub fn put<S: AsRef<str>>(segments: &[S]) -> Self {
        Self::new(Method::PUT, segments)
    }

    pub fn delete<S: AsRef<str>>(segments: &[S]) -> Self {
        Self::new(Method::DELETE, segments)
    }

    pub fn with_query<K: Into<String>, V: Into<String>>(
        mut self,
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        self.query
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn with_json<B: Serialize>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::Unexpected(format!("Failed to encode request body: {}", e)))?;
        self.payload = Payload::Json(value);
        Ok(self)
    }

    /// JSON body without an image, multipart with one.
    pub fn with_upload<B: Serialize>(self, body: &B, image: Option<ImageUpload>) -> Result<Self, ApiError> {
        match image {
            None => self.with_json(body),
            Some(image) => {
                let fields = form_fields(body)?;
                Ok(Self {
                    payload: Payload::Multipart { fields, image },
                    ..self
                })
            }
        }
    }

    /// Path relative to the API base, for logs and tests.
    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }
}

/// Every non-null top-level field of `body` as a text form field.
pub fn form_fields<B: Serialize>(body: &B) -> Result<Vec<(String, String)>, ApiError> {
    let value = serde_json::to_value(body)
        .map_err(|e| ApiError::Unexpected(format!("Failed to encode form fields: {}", e)))?;
    let Value::Object(map) = value else {
        return Err(ApiError::Unexpected(
            "Form payload must be a JSON object".to_string(),
        ));
    };
    Ok(map
        .into_iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| {
            let text = match v {
                Value::String(s) => s,
                other => other.to_string(),
            };
            (k, text)
        })
        .collect())
}

pub(crate) fn build_form(fields: Vec<(String, String)>, image: ImageUpload) -> Result<Form, ApiError> {
    let mut form = Form::new();
    for (key, value) in fields {
        form = form.text(key, value);
    }
    let part = Part::bytes(image.bytes)
        .file_name(image.file_name)
        .mime_str(&image.content_type)
        .map_err(|e| ApiError::Unexpected(format!("Invalid image content type: {}", e)))?;
    Ok(form.part(IMAGE_FIELD, part))
}
