//! Shared formatting helpers for readings and the insights view

use chrono::{DateTime, Local, Utc};

const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// Title-case a place name, keeping short all-caps words such as "USA" or "UK"
///
/// # Examples
///
/// ```
/// use air_quality_service::utils::title_case;
///
/// assert_eq!(title_case("new york"), "New York");
/// assert_eq!(title_case("los angeles"), "Los Angeles");
/// assert_eq!(title_case("SAN FRANCISCO"), "SAN Francisco");
/// assert_eq!(title_case("washington DC"), "Washington DC");
/// ```
pub fn title_case(value: &str) -> String {
    value
        .split_whitespace()
        .map(|word| {
            if word.chars().count() <= 3 && word == word.to_uppercase() {
                return word.to_string();
            }
            let lower = word.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// True for non-empty strings made only of ASCII characters
pub fn is_ascii_text(value: &str) -> bool {
    !value.is_empty() && value.is_ascii()
}

/// Human distance such as "850 m away", "2.4 km away" or "31 km away"
pub fn format_distance(meters: Option<f64>) -> Option<String> {
    let meters = meters.filter(|m| m.is_finite())?;
    if meters >= 1000.0 {
        let km = meters / 1000.0;
        if km >= 10.0 {
            Some(format!("{} km away", km.round() as i64))
        } else {
            Some(format!("{km:.1} km away"))
        }
    } else {
        Some(format!("{} m away", meters.round() as i64))
    }
}

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("1 {unit}")
    } else {
        format!("{count} {unit}s")
    }
}

/// Relative description of `at` as seen from `now` ("5 minutes ago", "in 2 hours", "yesterday")
pub fn relative_time(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff_ms = (at - now).num_milliseconds();
    let abs_ms = diff_ms.abs();

    let (amount, unit) = if abs_ms < 60_000 {
        ((diff_ms as f64 / 1_000.0).round() as i64, "second")
    } else if abs_ms < 3_600_000 {
        ((diff_ms as f64 / 60_000.0).round() as i64, "minute")
    } else if abs_ms < 86_400_000 {
        ((diff_ms as f64 / 3_600_000.0).round() as i64, "hour")
    } else {
        ((diff_ms as f64 / 86_400_000.0).round() as i64, "day")
    };

    match (amount, unit) {
        (0, _) => "now".to_string(),
        (-1, "day") => "yesterday".to_string(),
        (1, "day") => "tomorrow".to_string(),
        (n, unit) if n < 0 => format!("{} ago", plural(-n, unit)),
        (n, unit) => format!("in {}", plural(n, unit)),
    }
}

/// Local and relative rendering of an observation timestamp
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservationTime {
    pub local: String,
    pub relative: Option<String>,
}

/// Format an RFC 3339 observation time; unparseable input is echoed back
pub fn format_observation(raw: Option<&str>, now: DateTime<Utc>) -> ObservationTime {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return ObservationTime {
            local: "Unknown".to_string(),
            relative: None,
        };
    };

    match DateTime::parse_from_rfc3339(raw) {
        Ok(parsed) => {
            let utc = parsed.with_timezone(&Utc);
            ObservationTime {
                local: utc.with_timezone(&Local).format("%b %-d, %-I:%M %p").to_string(),
                relative: Some(relative_time(utc, now)),
            }
        }
        Err(_) => ObservationTime {
            local: raw.to_string(),
            relative: None,
        },
    }
}

/// Great-circle distance between two WGS84 points
pub fn haversine_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * a.sqrt().asin()
}
