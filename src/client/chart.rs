use std::fmt;

use crate::forecast::ForecastPoint;

/// Upper end of the chart's AQI axis (the forecast ceiling)
pub const CHART_MAX_AQI: i32 = 350;
pub const CHART_WIDTH: usize = 30;

const FILLED: char = '█';
const EMPTY: char = '·';

/// Horizontal bar chart of the projected days
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastChart {
    points: Vec<ForecastPoint>,
}

impl ForecastChart {
    pub fn new(points: &[ForecastPoint]) -> Self {
        Self {
            points: points.to_vec(),
        }
    }

    /// Filled cells for an AQI, rounded; any positive value shows at least one
    pub fn bar_len(aqi: i32) -> usize {
        let clamped = aqi.clamp(0, CHART_MAX_AQI);
        let cells = (f64::from(clamped) / f64::from(CHART_MAX_AQI) * CHART_WIDTH as f64).round() as usize;
        if clamped > 0 {
            cells.max(1)
        } else {
            cells
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl fmt::Display for ForecastChart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for point in &self.points {
            let filled = Self::bar_len(point.aqi);
            let bar: String = std::iter::repeat(FILLED)
                .take(filled)
                .chain(std::iter::repeat(EMPTY).take(CHART_WIDTH - filled))
                .collect();
            writeln!(
                f,
                "Day +{} {} {:>3} {}",
                point.day_offset, bar, point.aqi, point.band
            )?;
        }
        Ok(())
    }
}
