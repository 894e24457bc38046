//! Direction and percent change between a scalar and its previous value.
use crate::types::{Trend, TrendDirection, TrendPoint};
use crate::util::format_signed_percent;

pub fn indicator(current: f64, previous: Option<f64>) -> Trend {
    let Some(previous) = previous else {
        return Trend {
            direction: TrendDirection::Unknown,
            percent: None,
        };
    };
    let diff = current - previous;
    // Growth from nothing reads as +100% rather than dividing by zero.
    let percent = if previous == 0.0 {
        if current == 0.0 {
            0.0
        } else {
            100.0
        }
    } else {
        diff / previous * 100.0
    };
    let direction = if diff > 0.0 {
        TrendDirection::Up
    } else if diff < 0.0 {
        TrendDirection::Down
    } else {
        TrendDirection::Flat
    };
    Trend {
        direction,
        percent: Some(percent),
    }
}

pub fn for_point(point: &TrendPoint) -> Trend {
    indicator(point.current, point.previous)
}

impl Trend {
    /// `+12.5%`, `-3.0%`, `0.0%`; `None` when there is no history.
    pub fn label(&self) -> Option<String> {
        let percent = self.percent?;
        Some(format_signed_percent(percent))
    }
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Up => "up",
            TrendDirection::Down => "down",
            TrendDirection::Flat => "flat",
            TrendDirection::Unknown => "unknown",
        }
    }
}
