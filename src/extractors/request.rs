//! Request metadata handed to access checks, and the delete-mode header.

use crate::config::DeleteMode;
use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, Method, Uri},
};

/// When present (any non-empty value), delete loads the document first so remove hooks run.
pub const REMO_MW_HEADER: &str = "x-remo-mw";

/// Method, URI and headers of the current request.
#[derive(Clone, Debug, Default)]
pub struct RequestMeta {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
}

impl RequestMeta {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Delete mode for this request: the header forces `Instance`, otherwise `default`.
    pub fn delete_mode(&self, default: DeleteMode) -> DeleteMode {
        if self.header(REMO_MW_HEADER).is_some() {
            DeleteMode::Instance
        } else {
            default
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestMeta
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(RequestMeta {
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            headers: parts.headers.clone(),
        })
    }
}
