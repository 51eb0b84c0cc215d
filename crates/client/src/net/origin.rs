//! Upstream origin parsing and path resolution.

use url::Url;

/// Error type for upstream origin handling.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OriginError {
    #[error("empty origin")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("origin must not carry a path, query, or fragment: {0}")]
    NotAnOrigin(String),

    #[error("invalid origin: {0}")]
    Invalid(String),
}

/// The scheme-and-host the gateway fronts.
///
/// Only the origin itself is configured; every request path is resolved
/// against it at fetch time.
#[derive(Debug, Clone)]
pub struct UpstreamOrigin {
    base: Url,
}

impl UpstreamOrigin {
    /// Parse a bare origin like `https://canemap-system.web.app`.
    ///
    /// Trailing slashes are tolerated; anything beyond the authority is not.
    pub fn parse(input: &str) -> Result<Self, OriginError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(OriginError::Empty);
        }

        let parsed = Url::parse(trimmed).map_err(|e| OriginError::Invalid(e.to_string()))?;

        match parsed.scheme() {
            "http" | "https" => {}
            scheme => return Err(OriginError::UnsupportedScheme(scheme.to_string())),
        }

        if parsed.path() != "/" || parsed.query().is_some() || parsed.fragment().is_some() {
            return Err(OriginError::NotAnOrigin(trimmed.to_string()));
        }

        Ok(Self { base: parsed })
    }

    /// Resolve an absolute gateway path (with optional query) against this
    /// origin.
    pub fn resolve(&self, path: &str) -> Result<Url, OriginError> {
        if !path.starts_with('/') {
            return Err(OriginError::Invalid(format!("path must be absolute: {path}")));
        }
        self.base.join(path).map_err(|e| OriginError::Invalid(e.to_string()))
    }

    pub fn as_str(&self) -> &str {
        self.base.as_str()
    }
}
