// src/view.rs
//! Presentation values derived from a fetched dashboard.

use crate::models::{Dashboard, DashboardHolding};
use std::fmt;

/// Daily move, in percent, at which the heatmap saturates.
const HEATMAP_SATURATION_PCT: f64 = 5.0;
const NEUTRAL_COLOR: &str = "#9ca3af";

pub const ALLOCATION_PALETTE: [&str; 10] = [
    "#3b82f6", "#10b981", "#f59e0b", "#ef4444", "#8b5cf6", "#ec4899", "#06b6d4", "#84cc16",
    "#f97316", "#6366f1",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeatColor {
    Rgb(u8, u8, u8),
    Neutral,
}

impl fmt::Display for HeatColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeatColor::Rgb(r, g, b) => write!(f, "rgb({}, {}, {})", r, g, b),
            HeatColor::Neutral => f.write_str(NEUTRAL_COLOR),
        }
    }
}

fn channel(value: f64) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Green for gains, red for losses, fading toward pale as the move shrinks.
pub fn heatmap_color(daily_change_pct: f64) -> HeatColor {
    if daily_change_pct.is_nan() || daily_change_pct == 0.0 {
        return HeatColor::Neutral;
    }
    let intensity = (daily_change_pct.abs() / HEATMAP_SATURATION_PCT).min(1.0);
    let fade = 1.0 - intensity;
    if daily_change_pct > 0.0 {
        HeatColor::Rgb(
            channel(34.0 + fade * 180.0),
            channel(197.0 - fade * 40.0),
            channel(94.0 - fade * 60.0),
        )
    } else {
        HeatColor::Rgb(
            channel(239.0 - fade * 40.0),
            channel(68.0 + fade * 130.0),
            channel(68.0 + fade * 130.0),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapTile {
    pub symbol: String,
    /// Tile area weight; never below 1 so zero-value positions stay visible.
    pub size: f64,
    pub daily_change_pct: f64,
    pub market_value: f64,
    pub color: HeatColor,
}

pub fn heatmap_tiles(holdings: &[DashboardHolding]) -> Vec<HeatmapTile> {
    holdings
        .iter()
        .map(|h| HeatmapTile {
            symbol: h.symbol.clone(),
            size: h.market_value.max(1.0),
            daily_change_pct: h.daily_change_pct,
            market_value: h.market_value,
            color: heatmap_color(h.daily_change_pct),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct AllocationSlice {
    pub symbol: String,
    pub pct: f64,
    pub market_value: f64,
    pub color: &'static str,
}

pub fn allocation_slices(holdings: &[DashboardHolding]) -> Vec<AllocationSlice> {
    holdings
        .iter()
        .enumerate()
        .map(|(i, h)| AllocationSlice {
            symbol: h.symbol.clone(),
            pct: h.allocation_pct,
            market_value: h.market_value,
            color: ALLOCATION_PALETTE[i % ALLOCATION_PALETTE.len()],
        })
        .collect()
}

pub fn is_profit(dashboard: &Dashboard) -> bool {
    dashboard.total_pnl >= 0.0
}

/// US dollars with thousands separators, e.g. `-$1,234.56`.
pub fn format_usd(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}${}.{:02}", sign, grouped, cents % 100)
}

/// Signed percentage with two decimals, e.g. `+1.23%`.
pub fn format_percent(pct: f64) -> String {
    let rounded = (pct * 100.0).round() / 100.0;
    if rounded > 0.0 {
        format!("+{:.2}%", rounded)
    } else if rounded < 0.0 {
        format!("{:.2}%", rounded)
    } else {
        "0.00%".to_string()
    }
}
