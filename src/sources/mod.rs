pub mod youtube;

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::MusicError;

pub use youtube::YtDlpResolver;

/// Turns a query (link or free text) into something the voice layer can play.
///
/// Implementations may be slow; callers never hold guild state while
/// awaiting them.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaResolver: Send + Sync {
    /// Resolves a query. On several matches the first one wins.
    async fn resolve(&self, query: &str) -> Result<ResolvedTrack, MusicError>;
}

/// Opaque reference the voice collaborator knows how to stream.
///
/// `headers` must accompany the request for `url`; CDNs such as
/// googlevideo reject bare requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamHandle {
    pub url: String,
    pub headers: HashMap<String, String>,
}

impl StreamHandle {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTrack {
    pub source_ref: String,
    pub title: String,
    pub stream: StreamHandle,
}

/// Un query es un link directo sólo si parsea como URL http/https.
pub fn is_direct_link(query: &str) -> bool {
    url::Url::parse(query.trim())
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_link_detection() {
        assert!(is_direct_link("https://www.youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(is_direct_link("http://example.com/song.mp3"));
        assert!(!is_direct_link("never gonna give you up"));
        assert!(!is_direct_link("ftp://example.com/song.mp3"));
        assert!(!is_direct_link("youtube.com/watch?v=abc"));
    }
}
