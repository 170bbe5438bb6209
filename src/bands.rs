use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Health-risk category derived from a numeric AQI
///
/// Bands are ordered from cleanest to most dangerous, so `Ord` follows
/// severity. Every AQI maps to exactly one band; Hazardous catches
/// everything above 300.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
pub enum Band {
    #[serde(rename = "Good")]
    Good,
    #[serde(rename = "Moderate")]
    Moderate,
    #[serde(rename = "Unhealthy for Sensitive Groups")]
    UnhealthyForSensitiveGroups,
    #[serde(rename = "Unhealthy")]
    Unhealthy,
    #[serde(rename = "Very Unhealthy")]
    VeryUnhealthy,
    #[serde(rename = "Hazardous")]
    Hazardous,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BandError {
    #[error("AQI must be a finite number, got {0}")]
    NonFinite(f64),
    #[error("Unknown band: {0}")]
    UnknownLabel(String),
}

/// Texts and colours attached to a band
struct BandInfo {
    band: Band,
    min: i32,
    max: Option<i32>,
    label: &'static str,
    color: &'static str,
    accent: &'static str,
    range: &'static str,
    summary: &'static str,
    general_guidance: &'static str,
    sensitive_guidance: &'static str,
    public_advice: &'static str,
    sensitive_advice: &'static str,
    health_note: &'static str,
}

static BANDS: [BandInfo; 6] = [
    BandInfo {
        band: Band::Good,
        min: 0,
        max: Some(50),
        label: "Good",
        color: "#00B050",
        accent: "#4ade80",
        range: "AQI 0-50 | Minimal risk",
        summary: "Air quality is clean. Outdoor activities are encouraged for everyone.",
        general_guidance: "Enjoy the outdoors with no restrictions.",
        sensitive_guidance: "No extra precautions required today.",
        public_advice: "Air quality is satisfactory; outdoor activities are safe.",
        sensitive_advice: "Enjoy outdoor activities.",
        health_note: "Good - air quality is satisfactory.",
    },
    BandInfo {
        band: Band::Moderate,
        min: 51,
        max: Some(100),
        label: "Moderate",
        color: "#92D050",
        accent: "#facc15",
        range: "AQI 51-100 | Acceptable",
        summary: "Air quality is acceptable; some sensitive people might notice irritation.",
        general_guidance: "Keep outdoor plans but stay aware of any unusual symptoms.",
        sensitive_guidance: "Consider shorter outdoor sessions or lighter exertion if you are pollution sensitive.",
        public_advice: "Air quality is acceptable; watch for symptoms if unusually sensitive.",
        sensitive_advice: "Sensitive groups should limit prolonged outdoor exertion.",
        health_note: "Moderate - unusually sensitive people should consider limiting prolonged exertion.",
    },
    BandInfo {
        band: Band::UnhealthyForSensitiveGroups,
        min: 101,
        max: Some(150),
        label: "Unhealthy for Sensitive Groups",
        color: "#FFC000",
        accent: "#fb923c",
        range: "AQI 101-150 | Elevated",
        summary: "Sensitive groups may experience health effects. The general public is less likely to be affected.",
        general_guidance: "Most people can continue as usual but consider breaks during heavy activity.",
        sensitive_guidance: "Limit prolonged or intense outdoor exertion and aim for mornings or indoor spaces.",
        public_advice: "Members of sensitive groups should reduce prolonged outdoor exertion.",
        sensitive_advice: "Sensitive groups should avoid strenuous activities outdoors.",
        health_note: "USG - sensitive groups should reduce prolonged or heavy exertion.",
    },
    BandInfo {
        band: Band::Unhealthy,
        min: 151,
        max: Some(200),
        label: "Unhealthy",
        color: "#FF0000",
        accent: "#f87171",
        range: "AQI 151-200 | High",
        summary: "Everyone may begin to experience effects; sensitive groups could feel more serious symptoms.",
        general_guidance: "Cut back strenuous outdoor exercise and take frequent breaks indoors.",
        sensitive_guidance: "Avoid outdoor exertion; use a high-quality mask or stay in filtered spaces when outside.",
        public_advice: "Everyone should reduce prolonged outdoor exertion.",
        sensitive_advice: "Sensitive groups should stay indoors and keep activity light.",
        health_note: "Unhealthy - everyone should consider limiting outdoor activities.",
    },
    BandInfo {
        band: Band::VeryUnhealthy,
        min: 201,
        max: Some(300),
        label: "Very Unhealthy",
        color: "#7030A0",
        accent: "#c084fc",
        range: "AQI 201-300 | Very high",
        summary: "Health warnings of emergency conditions. The entire population is likely to be affected.",
        general_guidance: "Stay indoors with clean air if possible. Postpone outdoor plans and close windows.",
        sensitive_guidance: "Remain indoors, use purified air, and consult care providers if symptoms appear.",
        public_advice: "Everyone should avoid outdoor exertion.",
        sensitive_advice: "Sensitive groups should remain indoors with clean air.",
        health_note: "Very Unhealthy - avoid strenuous outdoor activities.",
    },
    BandInfo {
        band: Band::Hazardous,
        min: 301,
        max: None,
        label: "Hazardous",
        color: "#7F0000",
        accent: "#f472b6",
        range: "AQI 301-500 | Dangerous",
        summary: "Serious health effects expected for everyone. This is an emergency condition.",
        general_guidance: "Avoid all outdoor activity. Seal indoor spaces and use filtration if available.",
        sensitive_guidance: "Stay sheltered, follow medical plans, and seek guidance if breathing becomes difficult.",
        public_advice: "Health warning of emergency conditions; avoid all outdoor activity.",
        sensitive_advice: "Sensitive groups should seek shelter in cleaner air immediately.",
        health_note: "Hazardous - remain indoors and follow health guidance.",
    },
];

impl Band {
    /// All bands in ascending severity
    pub const ALL: [Band; 6] = [
        Band::Good,
        Band::Moderate,
        Band::UnhealthyForSensitiveGroups,
        Band::Unhealthy,
        Band::VeryUnhealthy,
        Band::Hazardous,
    ];

    /// Classify an integer AQI.
    ///
    /// Negative values are treated as 0 (Good).
    pub fn from_aqi(aqi: i32) -> Band {
        Self::classify(f64::from(aqi.max(0)))
    }

    /// Classify a possibly fractional AQI, rejecting NaN and infinities.
    ///
    /// Negative values are clamped to 0. A fractional value above a
    /// threshold (e.g. 50.5) lands in the next band.
    pub fn try_from_value(value: f64) -> Result<Band, BandError> {
        if !value.is_finite() {
            return Err(BandError::NonFinite(value));
        }
        Ok(Self::classify(value.max(0.0)))
    }

    fn classify(value: f64) -> Band {
        BANDS
            .iter()
            .find(|info| info.max.map_or(true, |max| value <= f64::from(max)))
            .map(|info| info.band)
            .unwrap_or(Band::Hazardous)
    }

    /// Case-insensitive lookup by label
    pub fn from_label(label: &str) -> Option<Band> {
        BANDS
            .iter()
            .find(|info| info.label.eq_ignore_ascii_case(label.trim()))
            .map(|info| info.band)
    }

    fn info(self) -> &'static BandInfo {
        &BANDS[self.index()]
    }

    fn index(self) -> usize {
        match self {
            Band::Good => 0,
            Band::Moderate => 1,
            Band::UnhealthyForSensitiveGroups => 2,
            Band::Unhealthy => 3,
            Band::VeryUnhealthy => 4,
            Band::Hazardous => 5,
        }
    }

    pub fn label(self) -> &'static str {
        self.info().label
    }

    /// EPA colour used in service responses
    pub fn color(self) -> &'static str {
        self.info().color
    }

    /// Lighter companion to [`Band::color`] for themed clients
    pub fn accent(self) -> &'static str {
        self.info().accent
    }

    pub fn range(self) -> &'static str {
        self.info().range
    }

    pub fn summary(self) -> &'static str {
        self.info().summary
    }

    pub fn general_guidance(self) -> &'static str {
        self.info().general_guidance
    }

    pub fn sensitive_guidance(self) -> &'static str {
        self.info().sensitive_guidance
    }

    pub fn public_advice(self) -> &'static str {
        self.info().public_advice
    }

    pub fn sensitive_advice(self) -> &'static str {
        self.info().sensitive_advice
    }

    /// One-line advice sent alongside a reading as `health_advice`
    pub fn health_note(self) -> &'static str {
        self.info().health_note
    }

    /// Lower bound of the band (inclusive)
    pub fn min(self) -> i32 {
        self.info().min
    }

    /// Upper bound of the band, `None` for Hazardous
    pub fn max(self) -> Option<i32> {
        self.info().max
    }

    /// The next band up, saturating at Hazardous
    ///
    /// Used to give asthma/sensitive users the advice of a worse band.
    pub fn stricter(self) -> Band {
        Band::ALL
            .get(self.index() + 1)
            .copied()
            .unwrap_or(Band::Hazardous)
    }

    /// Midpoint of the band; Hazardous has no upper bound so its minimum is used
    pub fn midpoint(self) -> i32 {
        let info = self.info();
        match info.max {
            Some(max) => (info.min + max) / 2,
            None => info.min,
        }
    }
}

impl std::fmt::Display for Band {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Band {
    type Err = BandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Band::from_label(s).ok_or_else(|| BandError::UnknownLabel(s.to_string()))
    }
}

/// Short note about the health impact of the dominant pollutant
pub fn pollutant_note(pollutant: &str) -> &'static str {
    match pollutant.trim().to_ascii_uppercase().as_str() {
        "NO2" => "Traffic-related irritant; can trigger asthma.",
        "O3" => "Often peaks in afternoon; irritates lungs during exercise.",
        "PM2_5" | "PM2.5" | "PM25" => "Fine particles; higher risk for heart/lung conditions.",
        "SO2" => "Industrial emissions; can cause breathing discomfort.",
        "CO" => "Reduces oxygen delivery; avoid heavy exertion.",
        _ => "Monitor local guidance for pollutant impacts.",
    }
}
