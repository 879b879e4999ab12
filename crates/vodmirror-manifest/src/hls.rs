//! HLS manifest parsing.
//!
//! Two-phase walk: the master playlist yields every variant/rendition
//! playlist, each variant yields its media and init segments. Every reference
//! is resolved to an absolute URL and accumulated in an insertion-ordered,
//! de-duplicated set.

use std::collections::HashMap;

use tracing::{debug, info};

use vodmirror_core::models::ManifestKind;
use vodmirror_core::{urls, MirrorError, OrderedSet, VodAsset};

use crate::fetch::{manifest_unavailable, RetryingFetcher};

const PLAYLIST_SIGNATURE: &str = "#EXTM3U";
/// Master-playlist tags whose attribute list may carry a child playlist URI.
const MASTER_URI_TAGS: [&str; 2] = ["#EXT-X-MEDIA:", "#EXT-X-I-FRAME-STREAM-INF:"];
/// Variant-playlist tag naming the initialization segment.
const INIT_SEGMENT_TAG: &str = "#EXT-X-MAP:";

/// Fetch and walk an HLS asset, producing its full resource enumeration.
pub async fn parse_hls_asset(
    fetcher: &RetryingFetcher,
    master_url: &str,
) -> Result<VodAsset, MirrorError> {
    let master_url = urls::normalize(master_url)?;
    let (master_body, master_content_type) = fetch_playlist(fetcher, &master_url).await?;

    let variants = parse_master_playlist(&master_url, &master_body)?;
    info!(variants = variants.len(), "Parsed master playlist");

    let mut segments = OrderedSet::new();
    for variant in variants.iter() {
        let (body, _content_type) = fetch_playlist(fetcher, variant).await?;
        let in_variant = parse_variant_playlist(variant, &body)?;
        debug!(variant = %variant, resources = in_variant.len(), "Parsed variant playlist");
        segments.extend_from(&in_variant);
    }

    // Union of master, variants, and segments; a byte-identical URL referenced
    // from two variants is carried once.
    let mut all_resources = OrderedSet::new();
    all_resources.insert(master_url.clone());
    all_resources.extend_from(&variants);
    all_resources.extend_from(&segments);

    let common_prefix = urls::common_prefix(all_resources.iter().map(String::as_str));

    Ok(VodAsset {
        source_manifest_url: master_url,
        master_content_type: Some(master_content_type),
        all_resources,
        common_prefix,
    })
}

/// Fetch one playlist and enforce the HLS signature line. A body that does
/// not open with `#EXTM3U` aborts the whole parse.
async fn fetch_playlist(
    fetcher: &RetryingFetcher,
    url: &str,
) -> Result<(String, String), MirrorError> {
    let (body, content_type) = fetcher
        .fetch_manifest(url, ManifestKind::Hls.expected_content_type())
        .await
        .map_err(|e| manifest_unavailable(url, e))?;
    if !body.starts_with(PLAYLIST_SIGNATURE) {
        return Err(MirrorError::Format(format!(
            "{} is not an HLS playlist (missing {} signature)",
            url, PLAYLIST_SIGNATURE
        )));
    }
    Ok((body, content_type))
}

/// Master phase: every child playlist reference, resolved and de-duplicated.
/// Iteration order of the result fixes variant processing order.
fn parse_master_playlist(master_url: &str, body: &str) -> Result<OrderedSet, MirrorError> {
    let mut variants = OrderedSet::new();
    for line in body.lines() {
        if let Some(reference) = playlist_reference(line, &MASTER_URI_TAGS) {
            variants.insert(urls::resolve(master_url, &reference)?);
        }
    }
    Ok(variants)
}

/// Variant phase: the init segment (if any) plus every media segment.
fn parse_variant_playlist(variant_url: &str, body: &str) -> Result<OrderedSet, MirrorError> {
    let mut resources = OrderedSet::new();
    for line in body.lines() {
        if let Some(reference) = playlist_reference(line, &[INIT_SEGMENT_TAG]) {
            resources.insert(urls::resolve(variant_url, &reference)?);
        }
    }
    Ok(resources)
}

/// The resource a playlist line refers to, if any: for the given tags the
/// quoted `URI` attribute, for a non-comment non-blank line the line itself.
fn playlist_reference(line: &str, uri_tags: &[&str]) -> Option<String> {
    if let Some(attributes) = uri_tags.iter().find_map(|tag| line.strip_prefix(tag)) {
        return parse_attribute_list(attributes).remove("URI");
    }
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    Some(line.to_string())
}

/// Parse a comma-separated key=value attribute list. Commas inside quoted
/// values do not split entries; quotes around values are stripped.
fn parse_attribute_list(input: &str) -> HashMap<String, String> {
    let mut attributes = HashMap::new();
    for entry in split_outside_quotes(input) {
        if let Some((key, value)) = entry.split_once('=') {
            attributes.insert(
                key.trim().to_string(),
                value.trim().trim_matches('"').to_string(),
            );
        }
    }
    attributes
}

fn split_outside_quotes(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    for (index, c) in input.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                parts.push(&input[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Client;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MASTER: &str = "#EXTM3U\n\
#EXT-X-VERSION:6\n\
#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID=\"audio_0\",NAME=\"eng, stereo\",DEFAULT=YES,URI=\"audio/index.m3u8\"\n\
#EXT-X-STREAM-INF:BANDWIDTH=2000000,RESOLUTION=1280x720\n\
v1/index.m3u8\n\
\n\
#EXT-X-STREAM-INF:BANDWIDTH=4000000,RESOLUTION=1920x1080\n\
v2/index.m3u8\n";

    #[test]
    fn master_playlist_yields_media_and_inline_references() {
        let variants =
            parse_master_playlist("http://o.example/asset/index.m3u8", MASTER).unwrap();
        let items: Vec<&str> = variants.iter().map(String::as_str).collect();
        assert_eq!(
            items,
            vec![
                "http://o.example/asset/audio/index.m3u8",
                "http://o.example/asset/v1/index.m3u8",
                "http://o.example/asset/v2/index.m3u8",
            ]
        );
    }

    #[test]
    fn quoted_commas_do_not_split_attributes() {
        let attributes = parse_attribute_list(
            "TYPE=AUDIO,NAME=\"eng, stereo\",URI=\"audio/index.m3u8\",DEFAULT=YES",
        );
        assert_eq!(attributes.get("NAME").unwrap(), "eng, stereo");
        assert_eq!(attributes.get("URI").unwrap(), "audio/index.m3u8");
        assert_eq!(attributes.get("DEFAULT").unwrap(), "YES");
    }

    #[test]
    fn media_tag_without_uri_is_ignored() {
        let body = "#EXTM3U\n#EXT-X-MEDIA:TYPE=CLOSED-CAPTIONS,GROUP-ID=\"cc\",INSTREAM-ID=\"CC1\"\nv1/index.m3u8\n";
        let variants = parse_master_playlist("http://o.example/asset/index.m3u8", body).unwrap();
        assert_eq!(variants.len(), 1);
    }

    #[test]
    fn variant_playlist_collects_init_and_segments() {
        let body = "#EXTM3U\n\
#EXT-X-TARGETDURATION:6\n\
#EXT-X-MAP:URI=\"../init/index_video_init.mp4\"\n\
#EXTINF:6.0,\n\
seg_1.m4s\n\
#EXTINF:6.0,\n\
seg_2.m4s\n\
#EXT-X-ENDLIST\n";
        let resources =
            parse_variant_playlist("http://o.example/asset/v1/index.m3u8", body).unwrap();
        let items: Vec<&str> = resources.iter().map(String::as_str).collect();
        assert_eq!(
            items,
            vec![
                "http://o.example/asset/init/index_video_init.mp4",
                "http://o.example/asset/v1/seg_1.m4s",
                "http://o.example/asset/v1/seg_2.m4s",
            ]
        );
    }

    #[test]
    fn absolute_segment_urls_pass_through() {
        let body = "#EXTM3U\nhttp://cdn.example/other/seg_1.ts\n";
        let resources =
            parse_variant_playlist("http://o.example/asset/v1/index.m3u8", body).unwrap();
        assert_eq!(
            resources.iter().next().unwrap(),
            "http://cdn.example/other/seg_1.ts"
        );
    }

    fn test_fetcher() -> RetryingFetcher {
        RetryingFetcher::new(Client::new(), None, 3, Duration::from_millis(5)).unwrap()
    }

    async fn mount_playlist(server: &MockServer, at: &str, body: &str) {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(body.as_bytes().to_vec())
                    .insert_header("Content-Type", "application/x-mpegURL"),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn hls_closure_resolves_every_reference_exactly_once() {
        let server = MockServer::start().await;
        let master = "#EXTM3U\nv1/index.m3u8\nv2/index.m3u8\n";
        // seg_shared.ts is referenced from both variants; it must appear once.
        let v1 = "#EXTM3U\n#EXT-X-MAP:URI=\"init_1.mp4\"\nseg_1_0.ts\n../shared/seg_shared.ts\n";
        let v2 = "#EXTM3U\n#EXT-X-MAP:URI=\"init_2.mp4\"\nseg_2_0.ts\n../shared/seg_shared.ts\n";
        mount_playlist(&server, "/asset/index.m3u8", master).await;
        mount_playlist(&server, "/asset/v1/index.m3u8", v1).await;
        mount_playlist(&server, "/asset/v2/index.m3u8", v2).await;

        let master_url = format!("{}/asset/index.m3u8", server.uri());
        let asset = parse_hls_asset(&test_fetcher(), &master_url).await.unwrap();

        // 1 master + 2 variants + 2 inits + 2 distinct segments + 1 shared.
        assert_eq!(asset.total_resources(), 8);
        assert!(asset.all_resources.contains(&master_url));
        assert!(asset
            .all_resources
            .contains(&format!("{}/asset/shared/seg_shared.ts", server.uri())));

        // The shared segment sits outside the variant directories, so the
        // common prefix ends at the asset directory.
        assert_eq!(asset.common_prefix, format!("{}/asset/", server.uri()));
        for resource in &asset.all_resources {
            assert!(resource.starts_with(&asset.common_prefix));
        }
    }

    #[tokio::test]
    async fn body_without_signature_is_a_format_error() {
        let server = MockServer::start().await;
        mount_playlist(&server, "/asset/index.m3u8", "<html>not a playlist</html>").await;

        let master_url = format!("{}/asset/index.m3u8", server.uri());
        let err = parse_hls_asset(&test_fetcher(), &master_url)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "FORMAT_ERROR");
    }

    #[tokio::test]
    async fn unreachable_variant_fails_the_parse() {
        let server = MockServer::start().await;
        mount_playlist(&server, "/asset/index.m3u8", "#EXTM3U\nv1/index.m3u8\n").await;
        // v1/index.m3u8 is not mounted: wiremock answers 404.

        let master_url = format!("{}/asset/index.m3u8", server.uri());
        let err = parse_hls_asset(&test_fetcher(), &master_url)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "MANIFEST_UNAVAILABLE");
    }
}
