//! DASH (MPD) manifest parsing.
//!
//! The MPD is deserialized into a minimal document model — periods,
//! adaptation sets, representations, segment templates and timelines — and
//! walked into one flat resource enumeration. Only what segment addressing
//! needs is modelled; everything else in the MPD is ignored.

use serde::Deserialize;
use tracing::{debug, info};

use vodmirror_core::models::ManifestKind;
use vodmirror_core::{urls, MirrorError, OrderedSet, VodAsset};

use crate::duration::parse_duration_secs;
use crate::fetch::{manifest_unavailable, RetryingFetcher};

const REPRESENTATION_ID_PLACEHOLDER: &str = "$RepresentationID$";
const TIME_PLACEHOLDER: &str = "$Time$";
const NUMBER_PLACEHOLDER: &str = "$Number$";
const DEFAULT_START_NUMBER: u64 = 1;
const DEFAULT_TIMESCALE: u64 = 1;

#[derive(Debug, Deserialize)]
struct Mpd {
    #[serde(rename = "@mediaPresentationDuration")]
    media_presentation_duration: Option<String>,
    #[serde(rename = "Period", default)]
    periods: Vec<Period>,
}

#[derive(Debug, Deserialize)]
struct Period {
    #[serde(rename = "@duration")]
    duration: Option<String>,
    #[serde(rename = "AdaptationSet", default)]
    adaptation_sets: Vec<AdaptationSet>,
}

#[derive(Debug, Deserialize)]
struct AdaptationSet {
    #[serde(rename = "@mimeType")]
    mime_type: Option<String>,
    #[serde(rename = "SegmentTemplate", default)]
    segment_templates: Vec<SegmentTemplate>,
    #[serde(rename = "Representation", default)]
    representations: Vec<Representation>,
}

#[derive(Debug, Deserialize)]
struct Representation {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "SegmentTemplate", default)]
    segment_templates: Vec<SegmentTemplate>,
}

#[derive(Debug, Clone, Deserialize)]
struct SegmentTemplate {
    #[serde(rename = "@media")]
    media: Option<String>,
    #[serde(rename = "@initialization")]
    initialization: Option<String>,
    #[serde(rename = "@startNumber")]
    start_number: Option<u64>,
    #[serde(rename = "@timescale")]
    timescale: Option<u64>,
    #[serde(rename = "@duration")]
    duration: Option<u64>,
    #[serde(rename = "SegmentTimeline")]
    segment_timeline: Option<SegmentTimeline>,
}

#[derive(Debug, Clone, Deserialize)]
struct SegmentTimeline {
    #[serde(rename = "S", default)]
    entries: Vec<TimelineEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct TimelineEntry {
    #[serde(rename = "@t")]
    t: Option<u64>,
    #[serde(rename = "@d")]
    d: u64,
    #[serde(rename = "@r")]
    r: Option<i64>,
}

/// Fetch and walk a DASH asset, producing its full resource enumeration.
pub async fn parse_dash_asset(
    fetcher: &RetryingFetcher,
    master_url: &str,
) -> Result<VodAsset, MirrorError> {
    let master_url = urls::normalize(master_url)?;
    let (body, content_type) = fetcher
        .fetch_manifest(&master_url, ManifestKind::Dash.expected_content_type())
        .await
        .map_err(|e| manifest_unavailable(&master_url, e))?;

    let all_resources = parse_mpd_resources(&master_url, &body)?;
    let common_prefix = urls::common_prefix(all_resources.iter().map(String::as_str));
    info!(resources = all_resources.len(), "Parsed DASH asset");

    Ok(VodAsset {
        source_manifest_url: master_url,
        master_content_type: Some(content_type),
        all_resources,
        common_prefix,
    })
}

/// Walk an MPD body into the de-duplicated resource set, led by the manifest
/// itself.
fn parse_mpd_resources(master_url: &str, body: &str) -> Result<OrderedSet, MirrorError> {
    let mpd: Mpd = quick_xml::de::from_str(body)
        .map_err(|e| MirrorError::Format(format!("Malformed MPD {}: {}", master_url, e)))?;

    let mut all_resources = OrderedSet::new();
    all_resources.insert(master_url.to_string());

    for (period_index, period) in mpd.periods.iter().enumerate() {
        debug!(period = period_index + 1, "Processing period");
        for (set_index, adaptation_set) in period.adaptation_sets.iter().enumerate() {
            debug!(
                period = period_index + 1,
                adaptation_set = set_index + 1,
                mime_type = adaptation_set.mime_type.as_deref().unwrap_or("unknown"),
                "Processing adaptation set"
            );
            collect_adaptation_set(
                master_url,
                mpd.media_presentation_duration.as_deref(),
                period,
                adaptation_set,
                &mut all_resources,
            )?;
        }
    }

    Ok(all_resources)
}

fn collect_adaptation_set(
    master_url: &str,
    mpd_duration: Option<&str>,
    period: &Period,
    adaptation_set: &AdaptationSet,
    out: &mut OrderedSet,
) -> Result<(), MirrorError> {
    for representation in &adaptation_set.representations {
        // Representation-level template wins over the adaptation-set level.
        let templates = if !representation.segment_templates.is_empty() {
            &representation.segment_templates
        } else {
            &adaptation_set.segment_templates
        };
        if templates.is_empty() {
            return Err(MirrorError::Format(format!(
                "No segment template found for representation '{}'",
                representation.id
            )));
        }
        if templates.len() > 1 {
            return Err(MirrorError::Format(
                "At most one segment template per adaptation set is supported".to_string(),
            ));
        }
        let template = &templates[0];

        let media_pattern = template.media.as_deref().ok_or_else(|| {
            MirrorError::Format(format!(
                "Segment template for representation '{}' has no media pattern",
                representation.id
            ))
        })?;
        // Adaptation-level patterns never carry the representation id baked
        // in, so substitution always runs.
        let media_pattern = media_pattern.replace(REPRESENTATION_ID_PLACEHOLDER, &representation.id);
        debug!(representation = %representation.id, pattern = %media_pattern, "Media segment pattern");

        let instants = match &template.segment_timeline {
            Some(timeline) => expand_timeline(timeline)?,
            None => infer_timeline(template, period.duration.as_deref().or(mpd_duration))?,
        };

        let mut number = template.start_number.unwrap_or(DEFAULT_START_NUMBER);
        for instant in &instants {
            let resource = if media_pattern.contains(TIME_PLACEHOLDER) {
                media_pattern.replace(TIME_PLACEHOLDER, &instant.to_string())
            } else {
                let substituted = media_pattern.replace(NUMBER_PLACEHOLDER, &number.to_string());
                number += 1;
                substituted
            };
            out.insert(urls::resolve(master_url, &resource)?);
        }

        match template.initialization.as_deref() {
            Some(init_pattern) => {
                let init = init_pattern.replace(REPRESENTATION_ID_PLACEHOLDER, &representation.id);
                out.insert(urls::resolve(master_url, &init)?);
            }
            None => {
                debug!(representation = %representation.id, "Representation has no init segment");
            }
        }
    }
    Ok(())
}

/// Expand explicit timeline entries: `(t, d, r)` becomes the `r + 1` instants
/// `t, t+d, …, t+r·d`.
fn expand_timeline(timeline: &SegmentTimeline) -> Result<Vec<u64>, MirrorError> {
    let mut instants = Vec::new();
    for entry in &timeline.entries {
        let t = entry.t.ok_or_else(|| {
            MirrorError::Format("Segment timeline entry is missing its start time".to_string())
        })?;
        // A negative repeat count ("until end of period") contributes only the
        // first instant, matching number-addressed generation.
        let repeats = entry.r.unwrap_or(0).max(0) as u64;
        for i in 0..=repeats {
            instants.push(t + i * entry.d);
        }
    }
    Ok(instants)
}

/// Infer segment numbers when no explicit timeline exists: floor-divide the
/// period duration by the template segment duration. A trailing partial
/// segment is dropped.
fn infer_timeline(
    template: &SegmentTemplate,
    period_duration: Option<&str>,
) -> Result<Vec<u64>, MirrorError> {
    let duration = template.duration.ok_or_else(|| {
        MirrorError::Format(
            "Segment template carries neither a timeline nor a duration".to_string(),
        )
    })?;
    let timescale = template.timescale.unwrap_or(DEFAULT_TIMESCALE);
    if duration == 0 || timescale == 0 {
        return Err(MirrorError::Format(
            "Segment template duration and timescale must be non-zero".to_string(),
        ));
    }

    let period_duration = period_duration.ok_or_else(|| {
        MirrorError::Format(
            "Cannot infer a segment timeline without a period duration".to_string(),
        )
    })?;
    let period_secs = parse_duration_secs(period_duration)?;

    let segment_secs = duration as f64 / timescale as f64;
    let count = (period_secs / segment_secs).floor() as u64;
    let start = template.start_number.unwrap_or(DEFAULT_START_NUMBER);
    Ok((start..start + count).collect())
}
