//! The parsed representation of one VOD asset.

use std::fmt;

use url::Url;

use crate::collections::OrderedSet;

/// Packaging format of a source asset, dispatched from the manifest URL's
/// path suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestKind {
    Hls,
    Dash,
}

impl ManifestKind {
    /// Determine the packaging format from the source manifest URL. `None`
    /// means the format is unsupported.
    pub fn from_source_url(url: &str) -> Option<Self> {
        let parsed = Url::parse(url).ok()?;
        let path = parsed.path();
        if path.ends_with(".m3u8") {
            Some(ManifestKind::Hls)
        } else if path.ends_with(".mpd") {
            Some(ManifestKind::Dash)
        } else {
            None
        }
    }

    /// Content type a well-behaved origin announces for this manifest kind.
    /// Used to correct origins that mislabel manifests as generic binary.
    pub fn expected_content_type(&self) -> &'static str {
        match self {
            ManifestKind::Hls => "application/x-mpegURL",
            ManifestKind::Dash => "application/dash+xml",
        }
    }
}

impl fmt::Display for ManifestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManifestKind::Hls => write!(f, "hls"),
            ManifestKind::Dash => write!(f, "dash"),
        }
    }
}

/// Everything one invocation needs to know about the source asset: the full
/// de-duplicated resource enumeration and the common prefix destination keys
/// are derived from.
///
/// Built once per invocation from the live manifests and discarded at the end;
/// never persisted. `common_prefix` is a strict prefix of every member of
/// `all_resources` and always ends immediately after a path separator.
#[derive(Debug, Clone)]
pub struct VodAsset {
    /// Normalized URL of the master manifest.
    pub source_manifest_url: String,
    /// Content type the master manifest was served with (after correction).
    pub master_content_type: Option<String>,
    /// Master manifest, every variant manifest, every segment and init file.
    pub all_resources: OrderedSet,
    pub common_prefix: String,
}

impl VodAsset {
    pub fn total_resources(&self) -> usize {
        self.all_resources.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatches_on_path_suffix() {
        assert_eq!(
            ManifestKind::from_source_url("https://o.example/out/v1/index.m3u8"),
            Some(ManifestKind::Hls)
        );
        assert_eq!(
            ManifestKind::from_source_url("https://o.example/out/v1/index.mpd"),
            Some(ManifestKind::Dash)
        );
        assert_eq!(
            ManifestKind::from_source_url("https://o.example/out/v1/index.ism"),
            None
        );
    }

    #[test]
    fn query_does_not_affect_dispatch() {
        assert_eq!(
            ManifestKind::from_source_url("https://o.example/index.m3u8?token=abc.mpd"),
            Some(ManifestKind::Hls)
        );
    }
}
