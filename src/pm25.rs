//! US EPA PM2.5 concentration to AQI conversion

/// (C low, C high, I low, I high) breakpoints in µg/m³ and index units
const BREAKPOINTS: [(f64, f64, i32, i32); 7] = [
    (0.0, 12.0, 0, 50),
    (12.1, 35.4, 51, 100),
    (35.5, 55.4, 101, 150),
    (55.5, 150.4, 151, 200),
    (150.5, 250.4, 201, 300),
    (250.5, 350.4, 301, 400),
    (350.5, 500.4, 401, 500),
];

const MAX_AQI: i32 = 500;

/// Convert a PM2.5 concentration to an AQI.
///
/// The concentration is truncated to one decimal before interpolation.
/// Values at or above 500.5 saturate at 500; negative or non-finite input
/// yields 0.
pub fn aqi_from_pm25(concentration: f64) -> i32 {
    if !concentration.is_finite() || concentration <= 0.0 {
        return 0;
    }

    let c = (concentration * 10.0).floor() / 10.0;
    if c >= 500.5 {
        return MAX_AQI;
    }

    for (c_low, c_high, i_low, i_high) in BREAKPOINTS {
        if c <= c_high {
            let (il, ih) = (f64::from(i_low), f64::from(i_high));
            let aqi = ((ih - il) / (c_high - c_low)) * (c - c_low) + il;
            return (aqi.round() as i32).clamp(0, MAX_AQI);
        }
    }

    // Between 500.4 and 500.5 after truncation
    MAX_AQI
}
