use std::fmt;

use chrono::{DateTime, Utc};

use super::chart::ForecastChart;
use super::search::{SearchResult, SearchState};
use crate::bands::{pollutant_note, Band};
use crate::forecast::{extrapolate, ForecastPoint};
use crate::models::{AqiReading, StationRef, DEFAULT_PM25_UNIT};
use crate::utils::{format_distance, format_observation, is_ascii_text, title_case, ObservationTime};

pub const PROMPT_MESSAGE: &str = "Start with a city search to see live readings.";
pub const LOADING_MESSAGE: &str = "Checking the air around you...";
pub const NO_DATA_MESSAGE: &str = "No air quality data available.";

/// What the insights screen shows for the current search state
#[derive(Debug, Clone, PartialEq)]
pub enum InsightsView {
    Prompt,
    Loading,
    Failed(String),
    NoData(String),
    Report(Box<InsightsReport>),
}

/// Everything rendered for a reading with data
#[derive(Debug, Clone, PartialEq)]
pub struct InsightsReport {
    pub band: Band,
    pub display_city: String,
    pub country_code: Option<String>,
    pub aqi: i32,
    /// PM2.5 with one decimal
    pub pm25: String,
    pub unit: String,
    pub observed: ObservationTime,
    pub general_guidance: &'static str,
    pub sensitive_guidance: &'static str,
    pub advice: Vec<String>,
    pub station_label: Option<String>,
    pub health_note: Option<String>,
    pub forecast: Vec<ForecastPoint>,
}

impl InsightsView {
    pub fn build(state: &SearchState, has_searched: bool, now: DateTime<Utc>) -> Self {
        if !has_searched {
            return InsightsView::Prompt;
        }
        match state {
            SearchState::Idle => InsightsView::Prompt,
            SearchState::Loading { .. } => InsightsView::Loading,
            SearchState::Error { message, .. } => InsightsView::Failed(message.clone()),
            SearchState::Success(result) => Self::from_result(result, now),
        }
    }

    fn from_result(result: &SearchResult, now: DateTime<Utc>) -> Self {
        let reading = &result.reading;
        let (Some(aqi), Some(pm25)) = (reading.aqi, reading.pm25) else {
            let message = reading.message.as_deref().unwrap_or(NO_DATA_MESSAGE);
            return InsightsView::NoData(message.to_string());
        };

        let band = Band::from_aqi(aqi);
        let advice = match &result.advice {
            Some(advice) => {
                let second = if result.asthma {
                    advice.sensitive_advice.clone()
                } else {
                    advice.pollutant_note.clone()
                };
                vec![advice.public_advice.clone(), second]
            }
            None => reading
                .main_pollutant
                .as_deref()
                .map(|p| vec![pollutant_note(p).to_string()])
                .unwrap_or_default(),
        };

        InsightsView::Report(Box::new(InsightsReport {
            band,
            display_city: display_city(reading, &result.city),
            country_code: reading.country_code.clone().filter(|c| !c.trim().is_empty()),
            aqi,
            pm25: format!("{pm25:.1}"),
            unit: reading
                .unit
                .clone()
                .unwrap_or_else(|| DEFAULT_PM25_UNIT.to_string()),
            observed: format_observation(reading.observed_utc.as_deref(), now),
            general_guidance: band.general_guidance(),
            sensitive_guidance: band.sensitive_guidance(),
            advice,
            station_label: station_label(reading),
            health_note: reading.health_advice.clone(),
            forecast: extrapolate(aqi, &reading.history).to_vec(),
        }))
    }
}

/// First part of the resolved place name when it is plain ASCII,
/// otherwise what the user searched for
fn display_city(reading: &AqiReading, searched: &str) -> String {
    let primary = reading
        .resolved
        .as_deref()
        .and_then(|r| r.split(',').next())
        .map(str::trim)
        .unwrap_or_default();
    if is_ascii_text(primary) {
        return title_case(primary);
    }
    let fallback = reading.query.as_deref().unwrap_or(searched);
    title_case(fallback)
}

fn station_label(reading: &AqiReading) -> Option<String> {
    let station = match &reading.station {
        Some(StationRef::Name(name)) if !name.trim().is_empty() => Some(name.trim().to_string()),
        Some(StationRef::Coordinates(c)) => Some(format!("{:.4}, {:.4}", c.latitude, c.longitude)),
        _ => None,
    };

    let mut parts: Vec<String> = [station, reading.locality.clone(), reading.country.clone()]
        .into_iter()
        .flatten()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();
    parts.extend(format_distance(reading.station_distance_meters));

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" | "))
    }
}

impl fmt::Display for InsightsView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsightsView::Prompt => writeln!(f, "{PROMPT_MESSAGE}"),
            InsightsView::Loading => writeln!(f, "{LOADING_MESSAGE}"),
            InsightsView::Failed(message) | InsightsView::NoData(message) => writeln!(f, "{message}"),
            InsightsView::Report(report) => write!(f, "{report}"),
        }
    }
}

impl fmt::Display for InsightsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let band = self.band;
        writeln!(f, "{} air quality", band.label().to_uppercase())?;
        match &self.country_code {
            Some(code) => writeln!(f, "{} [{}]", self.display_city, code)?,
            None => writeln!(f, "{}", self.display_city)?,
        }
        writeln!(f, "{}", band.range())?;
        writeln!(f)?;

        writeln!(f, "  AQI       {}  {}", self.aqi, band.summary())?;
        writeln!(f, "  PM2.5     {} {}", self.pm25, self.unit)?;
        match &self.observed.relative {
            Some(relative) => writeln!(f, "  Observed  {} ({})", self.observed.local, relative)?,
            None => writeln!(f, "  Observed  {}", self.observed.local)?,
        }
        writeln!(f)?;

        writeln!(f, "General population: {}", self.general_guidance)?;
        writeln!(f, "Sensitive groups:   {}", self.sensitive_guidance)?;

        if !self.advice.is_empty() {
            writeln!(f)?;
            for line in &self.advice {
                writeln!(f, "> {line}")?;
            }
        }

        if let Some(label) = &self.station_label {
            writeln!(f)?;
            writeln!(f, "Data source: {label}")?;
        }
        if let Some(note) = &self.health_note {
            writeln!(f, "{note}")?;
        }

        if !self.forecast.is_empty() {
            writeln!(f)?;
            writeln!(f, "Next {} days", self.forecast.len())?;
            write!(f, "{}", ForecastChart::new(&self.forecast))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::models::{Advice, StationCoords};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 1, 15, 0, 0).unwrap()
    }

    fn reading() -> AqiReading {
        AqiReading {
            city: Some("sao paulo".to_string()),
            query: Some("sao paulo".to_string()),
            resolved: Some("São Paulo, Região Sudeste, Brasil".to_string()),
            aqi: Some(120),
            pm25: Some(43.14),
            main_pollutant: Some("PM2_5".to_string()),
            observed_utc: Some("2025-04-01T13:00:00Z".to_string()),
            station: Some(StationRef::Coordinates(StationCoords {
                latitude: -23.55052,
                longitude: -46.633308,
            })),
            locality: Some("Centro".to_string()),
            country: Some("Brazil".to_string()),
            country_code: Some("BR".to_string()),
            station_distance_meters: Some(2400.0),
            health_advice: Some("Sensitive groups should take care.".to_string()),
            ..Default::default()
        }
    }

    fn advice() -> Advice {
        Advice {
            city: "sao paulo".to_string(),
            aqi: 120,
            band: Band::UnhealthyForSensitiveGroups,
            public_advice: "public".to_string(),
            sensitive_advice: "sensitive".to_string(),
            pollutant_note: "note".to_string(),
        }
    }

    fn success(reading: AqiReading, asthma: bool) -> SearchState {
        SearchState::Success(SearchResult {
            city: "sao paulo".to_string(),
            asthma,
            advice: reading.has_data().then(advice),
            reading,
        })
    }

    fn report(state: &SearchState) -> InsightsReport {
        match InsightsView::build(state, true, now()) {
            InsightsView::Report(report) => *report,
            other => panic!("expected report, got {other:?}"),
        }
    }

    #[test]
    fn test_status_views() {
        assert_eq!(InsightsView::build(&SearchState::Idle, false, now()), InsightsView::Prompt);
        let loading = SearchState::Loading {
            city: "Paris".into(),
            asthma: false,
        };
        assert_eq!(InsightsView::build(&loading, false, now()), InsightsView::Prompt);
        assert_eq!(InsightsView::build(&loading, true, now()), InsightsView::Loading);
        assert_eq!(
            InsightsView::build(&loading, true, now()).to_string().trim(),
            LOADING_MESSAGE
        );

        let failed = SearchState::Error {
            city: "Paris".into(),
            message: "boom".into(),
        };
        assert_eq!(
            InsightsView::build(&failed, true, now()),
            InsightsView::Failed("boom".to_string())
        );
    }

    #[test]
    fn test_no_data_uses_reading_message() {
        let state = success(AqiReading::message("No PM2.5 data available for this city."), false);
        assert_eq!(
            InsightsView::build(&state, true, now()),
            InsightsView::NoData("No PM2.5 data available for this city.".to_string())
        );

        let missing_pm25 = AqiReading {
            aqi: Some(40),
            ..Default::default()
        };
        assert_eq!(
            InsightsView::build(&success(missing_pm25, false), true, now()),
            InsightsView::NoData(NO_DATA_MESSAGE.to_string())
        );
    }

    #[test]
    fn test_report_fields() {
        let report = report(&success(reading(), false));
        assert_eq!(report.band, Band::UnhealthyForSensitiveGroups);
        // Resolved name is not ASCII so the query is shown
        assert_eq!(report.display_city, "Sao Paulo");
        assert_eq!(report.country_code.as_deref(), Some("BR"));
        assert_eq!(report.pm25, "43.1");
        assert_eq!(report.unit, DEFAULT_PM25_UNIT);
        assert_eq!(report.observed.relative.as_deref(), Some("2 hours ago"));
        assert_eq!(
            report.station_label.as_deref(),
            Some("-23.5505, -46.6333 | Centro | Brazil | 2.4 km away")
        );
        assert_eq!(report.advice, vec!["public".to_string(), "note".to_string()]);
        assert_eq!(report.forecast.len(), 3);
    }

    #[test]
    fn test_asthma_shows_sensitive_advice() {
        let report = report(&success(reading(), true));
        assert_eq!(report.advice, vec!["public".to_string(), "sensitive".to_string()]);
    }

    #[test]
    fn test_ascii_resolved_name_wins() {
        let mut reading = reading();
        reading.resolved = Some("PARIS, Ile-de-France, France".to_string());
        reading.station = Some(StationRef::Name("Paris 13eme".to_string()));
        reading.locality = None;
        reading.country = None;
        reading.station_distance_meters = Some(850.0);

        let report = report(&success(reading, false));
        assert_eq!(report.display_city, "Paris");
        assert_eq!(report.station_label.as_deref(), Some("Paris 13eme | 850 m away"));
    }

    #[test]
    fn test_report_rendering() {
        let rendered = InsightsView::build(&success(reading(), false), true, now()).to_string();
        assert!(rendered.starts_with("UNHEALTHY FOR SENSITIVE GROUPS air quality\nSao Paulo [BR]\n"));
        assert!(rendered.contains("PM2.5     43.1 ug/m3"));
        assert!(rendered.contains("Data source: -23.5505, -46.6333"));
        assert!(rendered.contains("Day +3"));
    }
}
