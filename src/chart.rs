// =============================================================================
// SVG Chart — close, smoothed levels and signal markers
// =============================================================================
//
// Server-side rendering keeps the dashboard free of charting libraries. The
// x axis is the bar index rather than wall time, so overnight and weekend
// gaps do not leave empty stretches.
// =============================================================================

use crate::advisor::SignalRow;

pub const WIDTH: f64 = 1200.0;
pub const HEIGHT: f64 = 600.0;

const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 50.0;
const GRID_LINES: usize = 5;
const MARKER_SIZE: f64 = 7.0;

const COLOR_CLOSE: &str = "#1f77b4";
const COLOR_SUPPORT: &str = "#2ca02c";
const COLOR_RESISTANCE: &str = "#d62728";
const COLOR_MIDLINE: &str = "#ff7f0e";
const COLOR_BUY: &str = "#17becf";
const COLOR_SELL: &str = "#9467bd";

/// Escape text for inclusion in SVG/XML.
fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Maps bar index / price into plot coordinates.
struct Scale {
    n: usize,
    lo: f64,
    hi: f64,
}

impl Scale {
    fn x(&self, i: usize) -> f64 {
        let plot_w = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
        if self.n <= 1 {
            return MARGIN_LEFT + plot_w / 2.0;
        }
        MARGIN_LEFT + plot_w * i as f64 / (self.n - 1) as f64
    }

    fn y(&self, price: f64) -> f64 {
        let plot_h = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
        MARGIN_TOP + plot_h * (self.hi - price) / (self.hi - self.lo)
    }
}

fn polyline(scale: &Scale, values: impl Iterator<Item = f64>, color: &str, width: f64) -> String {
    let points: Vec<String> = values
        .enumerate()
        .map(|(i, v)| format!("{:.1},{:.1}", scale.x(i), scale.y(v)))
        .collect();
    format!(
        r#"<polyline fill="none" stroke="{color}" stroke-width="{width}" points="{}"/>"#,
        points.join(" ")
    )
}

fn triangle(x: f64, y: f64, up: bool, color: &str) -> String {
    let s = MARKER_SIZE;
    let (tip, base) = if up { (y - s, y + s) } else { (y + s, y - s) };
    format!(
        r#"<polygon fill="{color}" points="{:.1},{:.1} {:.1},{:.1} {:.1},{:.1}"/>"#,
        x,
        tip,
        x - s,
        base,
        x + s,
        base
    )
}

/// Render the level chart for `rows` (oldest first).
pub fn render_svg(ticker: &str, rows: &[SignalRow]) -> String {
    let mut svg = String::with_capacity(16 * 1024);
    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}" font-family="sans-serif" font-size="12">"#
    ));
    svg.push_str(r#"<rect width="100%" height="100%" fill="white"/>"#);
    svg.push_str(&format!(
        r#"<text x="{:.1}" y="28" text-anchor="middle" font-size="16">{} — RSI-Adjusted Support/Resistance</text>"#,
        WIDTH / 2.0,
        escape(ticker)
    ));

    if rows.is_empty() {
        svg.push_str(&format!(
            r#"<text x="{:.1}" y="{:.1}" text-anchor="middle">No data</text></svg>"#,
            WIDTH / 2.0,
            HEIGHT / 2.0
        ));
        return svg;
    }

    // ── Price range ─────────────────────────────────────────────────────
    let (mut lo, mut hi) = rows.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), r| {
        let vals = [
            r.row.close,
            r.row.smooth_support,
            r.row.smooth_resistance,
            r.row.smooth_midline,
        ];
        (
            vals.iter().copied().fold(lo, f64::min),
            vals.iter().copied().fold(hi, f64::max),
        )
    });
    let pad = if hi > lo { (hi - lo) * 0.05 } else { lo.abs().max(1.0) * 0.01 };
    lo -= pad;
    hi += pad;
    let scale = Scale { n: rows.len(), lo, hi };

    // ── Grid & axis labels ──────────────────────────────────────────────
    for g in 0..=GRID_LINES {
        let price = lo + (hi - lo) * g as f64 / GRID_LINES as f64;
        let y = scale.y(price);
        svg.push_str(&format!(
            r##"<line x1="{MARGIN_LEFT}" y1="{y:.1}" x2="{:.1}" y2="{y:.1}" stroke="#000" stroke-opacity="0.1"/>"##,
            WIDTH - MARGIN_RIGHT
        ));
        svg.push_str(&format!(
            r#"<text x="{:.1}" y="{:.1}" text-anchor="end">{price:.4}</text>"#,
            MARGIN_LEFT - 6.0,
            y + 4.0
        ));
    }
    for i in [0, rows.len() / 2, rows.len() - 1] {
        let label = chrono::DateTime::from_timestamp(rows[i].row.timestamp, 0)
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        svg.push_str(&format!(
            r#"<text x="{:.1}" y="{:.1}" text-anchor="middle">{label}</text>"#,
            scale.x(i),
            HEIGHT - MARGIN_BOTTOM + 20.0
        ));
    }
    svg.push_str(&format!(
        r#"<text x="18" y="{:.1}" transform="rotate(-90 18 {:.1})" text-anchor="middle">Price</text>"#,
        HEIGHT / 2.0,
        HEIGHT / 2.0
    ));

    // ── Series ──────────────────────────────────────────────────────────
    svg.push_str(&polyline(&scale, rows.iter().map(|r| r.row.close), COLOR_CLOSE, 1.5));
    svg.push_str(&polyline(&scale, rows.iter().map(|r| r.row.smooth_support), COLOR_SUPPORT, 1.2));
    svg.push_str(&polyline(&scale, rows.iter().map(|r| r.row.smooth_resistance), COLOR_RESISTANCE, 1.2));
    svg.push_str(&polyline(&scale, rows.iter().map(|r| r.row.smooth_midline), COLOR_MIDLINE, 1.0));

    // ── Markers ─────────────────────────────────────────────────────────
    for (i, r) in rows.iter().enumerate() {
        if r.buy_signal {
            svg.push_str(&triangle(scale.x(i), scale.y(r.row.close), true, COLOR_BUY));
        }
        if r.sell_signal {
            svg.push_str(&triangle(scale.x(i), scale.y(r.row.close), false, COLOR_SELL));
        }
    }

    // ── Legend ──────────────────────────────────────────────────────────
    let legend = [
        ("Close", COLOR_CLOSE),
        ("Smoothed Support", COLOR_SUPPORT),
        ("Smoothed Resistance", COLOR_RESISTANCE),
        ("Smoothed Midline", COLOR_MIDLINE),
        ("Buy Signal", COLOR_BUY),
        ("Sell Signal", COLOR_SELL),
    ];
    for (k, (label, color)) in legend.iter().enumerate() {
        let y = MARGIN_TOP + 12.0 + k as f64 * 16.0;
        let x = MARGIN_LEFT + 10.0;
        svg.push_str(&format!(
            r#"<rect x="{x:.1}" y="{:.1}" width="14" height="4" fill="{color}"/><text x="{:.1}" y="{:.1}">{label}</text>"#,
            y - 4.0,
            x + 20.0,
            y + 1.0
        ));
    }

    svg.push_str("</svg>");
    svg
}
