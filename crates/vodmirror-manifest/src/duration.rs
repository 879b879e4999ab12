//! ISO-8601 duration parsing for MPD attributes.
//!
//! Covers the duration forms packagers emit (`PT30S`, `PT1H2M3.5S`, `P1DT12H`,
//! `P2W`). Calendar components (years, months) have no fixed length and are
//! rejected.

use vodmirror_core::MirrorError;

/// Parse an ISO-8601 duration into fractional seconds.
pub fn parse_duration_secs(input: &str) -> Result<f64, MirrorError> {
    let rest = input
        .strip_prefix('P')
        .ok_or_else(|| malformed(input))?;
    let (date_part, time_part) = match rest.split_once('T') {
        Some((date, time)) => (date, time),
        None => (rest, ""),
    };

    let mut seconds = 0.0;
    for (value, designator) in components(date_part).ok_or_else(|| malformed(input))? {
        seconds += match designator {
            'W' => value * 604_800.0,
            'D' => value * 86_400.0,
            _ => return Err(malformed(input)),
        };
    }
    for (value, designator) in components(time_part).ok_or_else(|| malformed(input))? {
        seconds += match designator {
            'H' => value * 3_600.0,
            'M' => value * 60.0,
            'S' => value,
            _ => return Err(malformed(input)),
        };
    }

    Ok(seconds)
}

/// Split a duration part into (number, designator) pairs. `None` on any
/// malformed run.
fn components(part: &str) -> Option<Vec<(f64, char)>> {
    let mut parsed = Vec::new();
    let mut number = String::new();
    for c in part.chars() {
        if c.is_ascii_digit() || c == '.' {
            number.push(c);
        } else {
            let value: f64 = number.parse().ok()?;
            number.clear();
            parsed.push((value, c));
        }
    }
    if !number.is_empty() {
        // Trailing digits without a designator.
        return None;
    }
    Some(parsed)
}

fn malformed(input: &str) -> MirrorError {
    MirrorError::Format(format!("Cannot parse ISO-8601 duration '{}'", input))
}
