//! URL normalization, reference resolution, and destination-key derivation.
//!
//! Every resource a manifest names is carried internally as an absolute,
//! normalized URL. Destination object keys are derived by stripping the
//! asset's common prefix (and any query component) from that URL.

use url::Url;

use crate::error::MirrorError;

/// Canonicalize a URL, collapsing `.`/`..` path segments. The query component,
/// when present, is carried through untouched.
pub fn normalize(input: &str) -> Result<String, MirrorError> {
    let url = Url::parse(input)
        .map_err(|e| MirrorError::Format(format!("Invalid URL '{}': {}", input, e)))?;
    Ok(url.to_string())
}

/// Resolve a manifest reference against the manifest's own URL.
///
/// A reference that already carries a scheme is used as-is (normalized);
/// anything else resolves relative to the base URL's directory.
pub fn resolve(base: &str, reference: &str) -> Result<String, MirrorError> {
    if Url::parse(reference).is_ok() {
        return normalize(reference);
    }
    let base_url = Url::parse(base)
        .map_err(|e| MirrorError::Format(format!("Invalid base URL '{}': {}", base, e)))?;
    let resolved = base_url.join(reference).map_err(|e| {
        MirrorError::Format(format!(
            "Cannot resolve '{}' against '{}': {}",
            reference, base, e
        ))
    })?;
    Ok(resolved.to_string())
}

/// Longest common leading string across all URLs, trimmed back so it always
/// ends immediately after a path separator.
///
/// The trim is a plain string operation: when the raw common prefix stops
/// mid-filename, everything after the previous `/` is cut off. Returns the
/// empty string for an empty input.
pub fn common_prefix<'a>(urls: impl IntoIterator<Item = &'a str>) -> String {
    let mut iter = urls.into_iter();
    let Some(first) = iter.next() else {
        return String::new();
    };

    let mut prefix_len = first.len();
    for url in iter {
        prefix_len = prefix_len.min(shared_lead(first, url));
        if prefix_len == 0 {
            return String::new();
        }
    }

    let prefix = &first[..prefix_len];
    if prefix.ends_with('/') {
        return prefix.to_string();
    }
    match prefix.rfind('/') {
        Some(pos) => prefix[..=pos].to_string(),
        None => String::new(),
    }
}

/// Length in bytes of the shared leading run of two strings, never splitting a
/// character.
fn shared_lead(a: &str, b: &str) -> usize {
    let mut len = 0;
    for ((ia, ca), (_, cb)) in a.char_indices().zip(b.char_indices()) {
        if ca != cb {
            break;
        }
        len = ia + ca.len_utf8();
    }
    len
}

/// Destination object key for a resource URL: the query component is dropped,
/// then the asset's common prefix is stripped. Never starts with `/`.
pub fn destination_key(url: &str, common_prefix: &str) -> String {
    let without_query = url.split('?').next().unwrap_or(url);
    without_query
        .strip_prefix(common_prefix)
        .unwrap_or(without_query)
        .trim_start_matches('/')
        .to_string()
}

/// Full object key under the destination path for a derived resource key.
pub fn object_key(destination_path: &str, key: &str) -> String {
    format!("{}/{}", destination_path.trim_end_matches('/'), key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_dot_segments() {
        assert_eq!(
            normalize("http://origin.example/a/b/../../c/./seg.ts").unwrap(),
            "http://origin.example/c/seg.ts"
        );
    }

    #[test]
    fn normalize_keeps_query_untouched() {
        assert_eq!(
            normalize("http://origin.example/a/seg.ts?m=123&token=A..B").unwrap(),
            "http://origin.example/a/seg.ts?m=123&token=A..B"
        );
    }

    #[test]
    fn normalize_rejects_garbage() {
        assert!(normalize("not a url").is_err());
    }

    #[test]
    fn resolve_keeps_absolute_references() {
        assert_eq!(
            resolve("http://origin.example/v/index.m3u8", "http://cdn.example/seg.ts").unwrap(),
            "http://cdn.example/seg.ts"
        );
    }

    #[test]
    fn resolve_joins_relative_references_against_directory() {
        assert_eq!(
            resolve("http://origin.example/a/b/index.m3u8", "seg_1.ts").unwrap(),
            "http://origin.example/a/b/seg_1.ts"
        );
        assert_eq!(
            resolve("http://origin.example/a/b/index.m3u8", "../../c/seg_1.ts").unwrap(),
            "http://origin.example/c/seg_1.ts"
        );
    }

    #[test]
    fn common_prefix_always_ends_on_separator() {
        let urls = [
            "http://o.example/asset1/v1/seg1.ts",
            "http://o.example/asset1/v2/seg1.ts",
        ];
        let prefix = common_prefix(urls.iter().copied());
        assert_eq!(prefix, "http://o.example/asset1/");
        for url in urls {
            assert!(url.starts_with(&prefix));
        }
    }

    #[test]
    fn common_prefix_never_splits_a_filename() {
        // Raw common prefix would be ".../asset1/index_" — mid-filename.
        let urls = [
            "http://o.example/asset1/index_1.ts",
            "http://o.example/asset1/index_2.ts",
        ];
        assert_eq!(
            common_prefix(urls.iter().copied()),
            "http://o.example/asset1/"
        );
    }

    #[test]
    fn common_prefix_of_unrelated_urls_is_empty() {
        assert_eq!(
            common_prefix(["http://a.example/x", "gopher://b.example/y"].iter().copied()),
            ""
        );
        assert_eq!(common_prefix(std::iter::empty::<&str>()), "");
    }

    #[test]
    fn destination_key_strips_query_and_prefix() {
        assert_eq!(
            destination_key(
                "http://o.example/asset1/v1/seg1.ts?auth=abc",
                "http://o.example/asset1/"
            ),
            "v1/seg1.ts"
        );
    }

    #[test]
    fn object_key_joins_without_doubled_separator() {
        assert_eq!(object_key("assets/show1/", "v1/seg1.ts"), "assets/show1/v1/seg1.ts");
        assert_eq!(object_key("assets/show1", "v1/seg1.ts"), "assets/show1/v1/seg1.ts");
    }
}
