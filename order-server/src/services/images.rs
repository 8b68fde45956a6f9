//! Prefix-based image URL signer

use async_trait::async_trait;

use super::ImageSigner;

/// Joins image keys onto a public base URL
#[derive(Debug, Clone)]
pub struct StaticImageSigner {
    base_url: String,
}

impl StaticImageSigner {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ImageSigner for StaticImageSigner {
    async fn signed_url(&self, key: &str) -> Option<String> {
        let key = key.trim_start_matches('/');
        if key.is_empty() {
            return None;
        }
        Some(format!("{}/{}", self.base_url, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_signed_url_joins_base() {
        let signer = StaticImageSigner::new("https://cdn.example.com/");
        assert_eq!(
            signer.signed_url("/products/a.jpg").await.as_deref(),
            Some("https://cdn.example.com/products/a.jpg")
        );
        assert!(signer.signed_url("").await.is_none());
    }
}
