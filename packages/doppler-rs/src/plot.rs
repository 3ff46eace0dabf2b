//! Diagnostic plots rendered as standalone SVG documents.

use base64::Engine;
use std::fmt::Write;

use crate::spectral::Spectrogram;
use crate::types::{FrequencyTrack, PassGeometry};

pub const PLOT_FORMAT: &str = "svg";

const WIDTH: f64 = 1000.0;
const HEIGHT: f64 = 360.0;
const MARGIN_LEFT: f64 = 70.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 36.0;
const MARGIN_BOTTOM: f64 = 44.0;

/// Waveform envelope columns
const WAVEFORM_COLUMNS: usize = 1000;
/// Spectrogram time columns after decimation
const SPECTROGRAM_COLUMNS: usize = 240;
/// Colour levels of the spectrogram ramp
const COLOR_LEVELS: usize = 32;
/// Dynamic range shown in the spectrogram (dB below the maximum)
const DYNAMIC_RANGE_DB: f64 = 80.0;

/// Viridis anchor colours, dark to bright
const RAMP: [[u8; 3]; 5] = [
    [68, 1, 84],
    [59, 82, 139],
    [33, 145, 140],
    [94, 201, 98],
    [253, 231, 37],
];

pub fn encode_base64(svg: &str) -> String {
    base64::engine::general_purpose::STANDARD.encode(svg.as_bytes())
}

fn ramp_color(level: f64) -> String {
    let x = level.clamp(0.0, 1.0) * (RAMP.len() - 1) as f64;
    let i = (x.floor() as usize).min(RAMP.len() - 2);
    let frac = x - i as f64;
    let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * frac).round() as u8;
    let (a, b) = (RAMP[i], RAMP[i + 1]);
    format!("#{:02x}{:02x}{:02x}", mix(a[0], b[0]), mix(a[1], b[1]), mix(a[2], b[2]))
}

/// Linear mapping of a data range onto a pixel range
#[derive(Debug, Clone, Copy)]
struct Axis {
    min: f64,
    max: f64,
    from: f64,
    to: f64,
}

impl Axis {
    fn new(min: f64, max: f64, from: f64, to: f64) -> Self {
        let degenerate = !min.is_finite() || !max.is_finite() || (max - min).abs() < f64::EPSILON;
        let (min, max) = if degenerate {
            let centre = if min.is_finite() { min } else { 0.0 };
            (centre - 1.0, centre + 1.0)
        } else {
            (min, max)
        };
        Self { min, max, from, to }
    }

    fn map(&self, value: f64) -> f64 {
        self.from + (value - self.min) / (self.max - self.min) * (self.to - self.from)
    }

    fn ticks(&self, count: usize) -> Vec<f64> {
        (0..=count)
            .map(|i| self.min + (self.max - self.min) * i as f64 / count as f64)
            .collect()
    }
}

struct Panel {
    x: Axis,
    y: Axis,
    top: f64,
    bottom: f64,
}

impl Panel {
    fn new(x_range: (f64, f64), y_range: (f64, f64), top: f64, bottom: f64) -> Self {
        Self {
            x: Axis::new(x_range.0, x_range.1, MARGIN_LEFT, WIDTH - MARGIN_RIGHT),
            y: Axis::new(y_range.0, y_range.1, bottom, top),
            top,
            bottom,
        }
    }

    fn frame(&self, out: &mut String, title: &str, x_label: &str, y_label: &str) {
        let left = self.x.from;
        let right = self.x.to;
        let _ = write!(
            out,
            r##"<rect x="{left:.1}" y="{top:.1}" width="{w:.1}" height="{h:.1}" fill="none" stroke="#444"/>"##,
            top = self.top,
            w = right - left,
            h = self.bottom - self.top
        );
        for tick in self.x.ticks(6) {
            let x = self.x.map(tick);
            let _ = write!(
                out,
                r##"<line x1="{x:.1}" y1="{b:.1}" x2="{x:.1}" y2="{b2:.1}" stroke="#444"/><text x="{x:.1}" y="{ty:.1}" font-size="11" text-anchor="middle">{tick:.1}</text>"##,
                b = self.bottom,
                b2 = self.bottom + 4.0,
                ty = self.bottom + 16.0
            );
        }
        for tick in self.y.ticks(4) {
            let y = self.y.map(tick);
            let _ = write!(
                out,
                r##"<line x1="{l2:.1}" y1="{y:.1}" x2="{left:.1}" y2="{y:.1}" stroke="#444"/><text x="{tx:.1}" y="{ty:.1}" font-size="11" text-anchor="end">{tick:.1}</text>"##,
                l2 = left - 4.0,
                tx = left - 6.0,
                ty = y + 4.0
            );
        }
        let _ = write!(
            out,
            r#"<text x="{cx:.1}" y="{ty:.1}" font-size="14" text-anchor="middle">{title}</text><text x="{cx:.1}" y="{xl:.1}" font-size="12" text-anchor="middle">{x_label}</text><text x="14" y="{cy:.1}" font-size="12" text-anchor="middle" transform="rotate(-90 14 {cy:.1})">{y_label}</text>"#,
            cx = (left + right) / 2.0,
            ty = self.top - 10.0,
            xl = self.bottom + 32.0,
            cy = (self.top + self.bottom) / 2.0
        );
    }

    fn polyline(&self, out: &mut String, points: &[(f64, f64)], color: &str, dashed: bool) {
        if points.is_empty() {
            return;
        }
        let mut coords = String::with_capacity(points.len() * 14);
        for &(x, y) in points {
            let _ = write!(coords, "{:.1},{:.1} ", self.x.map(x), self.y.map(y));
        }
        let dash = if dashed { r#" stroke-dasharray="6 4""# } else { "" };
        let _ = write!(
            out,
            r#"<polyline points="{}" fill="none" stroke="{color}" stroke-width="1.5"{dash}/>"#,
            coords.trim_end()
        );
    }

    fn markers(&self, out: &mut String, points: &[(f64, f64)], color: &str) {
        for &(x, y) in points {
            let _ = write!(
                out,
                r#"<circle cx="{:.1}" cy="{:.1}" r="2" fill="{color}"/>"#,
                self.x.map(x),
                self.y.map(y)
            );
        }
    }
}

fn document(height: f64, body: &str) -> String {
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="sans-serif"><rect width="100%" height="100%" fill="white"/>{body}</svg>"#,
        w = WIDTH,
        h = height
    )
}

/// Min/max envelope of the waveform against time
pub fn waveform_svg(samples: &[f64], sample_rate: f64) -> String {
    let duration = if sample_rate > 0.0 && !samples.is_empty() {
        (samples.len() - 1) as f64 / sample_rate
    } else {
        0.0
    };
    let peak = samples.iter().fold(1.0f64, |m, s| m.max(s.abs()));
    let panel = Panel::new(
        (0.0, duration.max(f64::EPSILON)),
        (-peak, peak),
        MARGIN_TOP,
        HEIGHT - MARGIN_BOTTOM,
    );

    let mut body = String::new();
    panel.frame(&mut body, "Waveform", "Time (s)", "Amplitude");

    if !samples.is_empty() {
        let columns = WAVEFORM_COLUMNS.min(samples.len());
        let chunk = samples.len().div_ceil(columns);
        let mut path = String::new();
        for (i, block) in samples.chunks(chunk).enumerate() {
            let t = (i * chunk) as f64 / sample_rate;
            let lo = block.iter().copied().fold(f64::INFINITY, f64::min);
            let hi = block.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let x = panel.x.map(t);
            let _ = write!(
                path,
                "M{:.1} {:.1}V{:.1}",
                x,
                panel.y.map(hi),
                panel.y.map(lo)
            );
        }
        let _ = write!(
            body,
            r##"<path d="{path}" stroke="#1f77b4" stroke-width="1" fill="none"/>"##
        );
    }

    document(HEIGHT, &body)
}

/// Heat map of the spectrogram in dB, limited to `max_frequency`
pub fn spectrogram_svg(spec: &Spectrogram, max_frequency: f64) -> String {
    let end_time = spec.times.last().copied().unwrap_or(1.0);
    let top_bin = spec
        .frequencies
        .iter()
        .rposition(|&f| f <= max_frequency)
        .unwrap_or(0);
    let shown_max = spec
        .frequencies
        .get(top_bin)
        .copied()
        .unwrap_or(max_frequency)
        .max(f64::EPSILON);
    let panel = Panel::new(
        (0.0, end_time),
        (0.0, shown_max),
        MARGIN_TOP,
        HEIGHT - MARGIN_BOTTOM,
    );

    let mut body = String::new();

    if !spec.is_empty() && spec.frequencies.len() > 1 {
        let reference = spec
            .power
            .iter()
            .flat_map(|slice| slice[..=top_bin].iter())
            .fold(0.0f64, |m, &p| m.max(p));

        let columns = SPECTROGRAM_COLUMNS.min(spec.slice_count());
        let group = spec.slice_count().div_ceil(columns);
        let bin_height = (panel.y.map(0.0) - panel.y.map(spec.resolution())).abs();

        for (c, slices) in spec.power.chunks(group).enumerate() {
            let first = c * group;
            let last = (first + slices.len()).min(spec.slice_count()) - 1;
            let x0 = if first == 0 { panel.x.from } else { panel.x.map(spec.times[first]) };
            let x1 = panel.x.map(spec.times[last]).max(x0 + 1.0);

            let levels: Vec<usize> = (0..=top_bin)
                .map(|k| {
                    let p = slices.iter().map(|s| s[k]).fold(0.0f64, f64::max);
                    db_level(p, reference)
                })
                .collect();

            // Merge vertical runs of one colour into a single rectangle
            let mut k = 0;
            while k < levels.len() {
                let level = levels[k];
                let mut end = k;
                while end + 1 < levels.len() && levels[end + 1] == level {
                    end += 1;
                }
                let y_top = (panel.y.map(spec.frequencies[end]) - bin_height / 2.0).max(panel.top);
                let y_bottom =
                    (panel.y.map(spec.frequencies[k]) + bin_height / 2.0).min(panel.bottom);
                let _ = write!(
                    body,
                    r#"<rect x="{x0:.1}" y="{y_top:.1}" width="{w:.1}" height="{h:.1}" fill="{color}"/>"#,
                    w = x1 - x0,
                    h = (y_bottom - y_top).max(0.0),
                    color = ramp_color(level as f64 / (COLOR_LEVELS - 1) as f64)
                );
                k = end + 1;
            }
        }
    }

    panel.frame(&mut body, "Spectrogram", "Time (s)", "Frequency (Hz)");
    document(HEIGHT, &body)
}

fn db_level(power: f64, reference: f64) -> usize {
    if reference <= 0.0 || power <= 0.0 {
        return 0;
    }
    let db = (10.0 * (power / reference).log10()).clamp(-DYNAMIC_RANGE_DB, 0.0);
    (((db + DYNAMIC_RANGE_DB) / DYNAMIC_RANGE_DB) * (COLOR_LEVELS - 1) as f64).round() as usize
}

/// Inputs of the two-panel track/velocity plot
pub struct VelocityPlot<'a> {
    pub geometry: &'a PassGeometry,
    pub track: &'a FrequencyTrack,
    pub radial_velocities: &'a [f64],
    pub source_frequency: f64,
    pub car_speed: f64,
}

/// Extracted frequency track and radial velocities with the fitted model
pub fn velocity_svg(plot: &VelocityPlot<'_>) -> String {
    const CURVE_POINTS: usize = 100;
    let geometry = plot.geometry;
    let duration = geometry.duration;
    let panel_height = (HEIGHT - MARGIN_TOP - MARGIN_BOTTOM) * 0.8;
    let total_height = 2.0 * HEIGHT - MARGIN_TOP;

    let curve_times: Vec<f64> = (0..CURVE_POINTS)
        .map(|i| i as f64 * duration / (CURVE_POINTS - 1) as f64)
        .collect();
    let model_velocity: Vec<(f64, f64)> = curve_times
        .iter()
        .map(|&t| (t, geometry.radial_velocity(t, plot.car_speed)))
        .collect();
    let model_frequency: Vec<(f64, f64)> = model_velocity
        .iter()
        .map(|&(t, v)| (t, geometry.observed_frequency(plot.source_frequency, v)))
        .collect();

    let measured_frequency: Vec<(f64, f64)> = plot
        .track
        .points
        .iter()
        .map(|p| (p.time, p.frequency))
        .collect();
    let measured_velocity: Vec<(f64, f64)> = plot
        .track
        .points
        .iter()
        .zip(plot.radial_velocities)
        .map(|(p, &v)| (p.time, v))
        .collect();

    let range = |series: &[&[(f64, f64)]], extra: f64| {
        let (lo, hi) = series
            .iter()
            .flat_map(|s| s.iter().map(|p| p.1))
            .chain(std::iter::once(extra))
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });
        let pad = ((hi - lo) * 0.1).max(1.0);
        (lo - pad, hi + pad)
    };

    let top = Panel::new(
        (0.0, duration),
        range(
            &[measured_frequency.as_slice(), model_frequency.as_slice()],
            plot.source_frequency,
        ),
        MARGIN_TOP,
        MARGIN_TOP + panel_height,
    );
    let bottom_top = MARGIN_TOP + panel_height + MARGIN_BOTTOM + MARGIN_TOP;
    let bottom = Panel::new(
        (0.0, duration),
        range(
            &[measured_velocity.as_slice(), model_velocity.as_slice()],
            0.0,
        ),
        bottom_top,
        bottom_top + panel_height,
    );

    let mut body = String::new();
    top.frame(&mut body, "Frequency track", "Time (s)", "Frequency (Hz)");
    top.polyline(
        &mut body,
        &[(0.0, plot.source_frequency), (duration, plot.source_frequency)],
        "#888888",
        true,
    );
    top.polyline(&mut body, &model_frequency, "#d62728", false);
    top.markers(&mut body, &measured_frequency, "#1f77b4");

    bottom.frame(
        &mut body,
        &format!(
            "Radial velocity (fit: {:.1} m/s = {:.1} km/h)",
            plot.car_speed,
            plot.car_speed * 3.6
        ),
        "Time (s)",
        "Radial velocity (m/s)",
    );
    bottom.polyline(&mut body, &[(0.0, 0.0), (duration, 0.0)], "#888888", true);
    bottom.polyline(&mut body, &model_velocity, "#d62728", false);
    bottom.markers(&mut body, &measured_velocity, "#2ca02c");

    document(total_height, &body)
}

/// Placeholder shown when no velocity could be estimated
pub fn failure_svg(message: &str) -> String {
    let body = format!(
        r##"<text x="{x}" y="{y}" font-size="18" text-anchor="middle" fill="#b22222">{}</text>"##,
        escape(message),
        x = WIDTH / 2.0,
        y = HEIGHT / 2.0
    );
    document(HEIGHT, &body)
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
