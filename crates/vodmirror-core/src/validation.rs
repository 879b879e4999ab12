//! Input validation for the entry operation.

use url::Url;

use crate::error::MirrorError;
use crate::models::MirrorRequest;

/// Check that every required request field is present and usable. Failures
/// are fatal and returned before any network or storage call is made.
pub fn validate_request(request: &MirrorRequest) -> Result<(), MirrorError> {
    let mandatory = [
        ("source_manifest_url", &request.source_manifest_url),
        ("destination_path", &request.destination_path),
    ];
    for (name, value) in mandatory {
        if value.trim().is_empty() {
            return Err(MirrorError::Validation(format!(
                "Parameter '{}' must be specified",
                name
            )));
        }
    }

    Url::parse(&request.source_manifest_url).map_err(|e| {
        MirrorError::Validation(format!(
            "Parameter 'source_manifest_url' is not a valid URL: {}",
            e
        ))
    })?;

    if request.worker_count == 0 {
        return Err(MirrorError::Validation(
            "Parameter 'worker_count' must be at least 1".to_string(),
        ));
    }

    if !request.origin_rate_limit.is_finite() || request.origin_rate_limit < 0.0 {
        return Err(MirrorError::Validation(
            "Parameter 'origin_rate_limit' must be a non-negative number".to_string(),
        ));
    }

    Ok(())
}
