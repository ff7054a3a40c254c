//! Chart kinds, requests and the rendering seam.
//!
//! [`PlotRenderer`] draws with the `plotters` bitmap backend into an RGB
//! buffer and encodes it as PNG with `image`. It draws marks and axes only;
//! titles and labels live in the report that embeds the chart.

use std::fmt;
use std::io::Cursor;
use std::str::FromStr;

use plotters::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{LabbookError, Result};
use crate::tabular::Table;

/// Number of bins drawn by a histogram.
pub const HISTOGRAM_BINS: usize = 30;

const MARGIN: i32 = 40;
const MARK: RGBColor = RGBColor(31, 119, 180);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Line,
    Scatter,
    Bar,
    /// Bins the y column; the x column is accepted but not drawn.
    Histogram,
}

impl ChartKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartKind::Line => "line",
            ChartKind::Scatter => "scatter",
            ChartKind::Bar => "bar",
            ChartKind::Histogram => "histogram",
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartKind {
    type Err = LabbookError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "line" => Ok(ChartKind::Line),
            "scatter" => Ok(ChartKind::Scatter),
            "bar" => Ok(ChartKind::Bar),
            "histogram" => Ok(ChartKind::Histogram),
            other => Err(LabbookError::Validation(format!(
                "Unsupported chart type '{}'. Allowed: line, scatter, bar, histogram",
                other
            ))),
        }
    }
}

/// What to plot.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartRequest {
    pub kind: ChartKind,
    pub x_column: String,
    pub y_column: String,
    pub title: Option<String>,
    pub config: serde_json::Value,
}

impl ChartRequest {
    pub fn new(kind: ChartKind, x_column: impl Into<String>, y_column: impl Into<String>) -> Self {
        Self {
            kind,
            x_column: x_column.into(),
            y_column: y_column.into(),
            title: None,
            config: serde_json::json!({}),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_config(mut self, config: serde_json::Value) -> Self {
        self.config = config;
        self
    }

    /// Supplied title, or `"<y> vs <x>"`.
    pub fn display_title(&self) -> String {
        match self.title {
            Some(ref title) if !title.trim().is_empty() => title.clone(),
            _ => format!("{} vs {}", self.y_column, self.x_column),
        }
    }

    /// Both columns must be among `columns`.
    ///
    /// # Errors
    ///
    /// Returns `LabbookError::Validation` naming the first missing column.
    pub fn check_columns(&self, columns: &[String]) -> Result<()> {
        for column in [&self.x_column, &self.y_column] {
            if !columns.iter().any(|c| c == column) {
                return Err(missing_column(column));
            }
        }
        Ok(())
    }
}

fn missing_column(name: &str) -> LabbookError {
    LabbookError::Validation(format!("Column '{}' not found", name))
}

fn render_error<E: fmt::Display>(err: E) -> LabbookError {
    LabbookError::Render(err.to_string())
}

/// Maps a table and a chart request to PNG bytes.
pub trait ChartRenderer: Send + Sync {
    fn render(&self, table: &Table, request: &ChartRequest) -> Result<Vec<u8>>;
}

/// Bitmap renderer backed by `plotters`.
#[derive(Debug, Clone, Copy)]
pub struct PlotRenderer {
    pub width: u32,
    pub height: u32,
}

impl Default for PlotRenderer {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 600,
        }
    }
}

impl PlotRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Data-to-pixel mapping for the plotting area.
struct Frame {
    left: i32,
    top: i32,
    right: i32,
    bottom: i32,
    x: (f64, f64),
    y: (f64, f64),
}

impl Frame {
    fn new(width: u32, height: u32, x: (f64, f64), y: (f64, f64)) -> Self {
        Self {
            left: MARGIN,
            top: MARGIN / 2,
            right: width as i32 - MARGIN / 2,
            bottom: height as i32 - MARGIN,
            x,
            y,
        }
    }

    fn px(&self, x: f64, y: f64) -> (i32, i32) {
        let fx = (x - self.x.0) / (self.x.1 - self.x.0);
        let fy = (y - self.y.0) / (self.y.1 - self.y.0);
        let px = self.left as f64 + fx * (self.right - self.left) as f64;
        let py = self.bottom as f64 - fy * (self.bottom - self.top) as f64;
        (px.round() as i32, py.round() as i32)
    }
}

fn bounds(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if lo > hi {
        return None;
    }
    if lo == hi {
        return Some((lo - 0.5, hi + 0.5));
    }
    Some((lo, hi))
}

fn with_zero((lo, hi): (f64, f64)) -> (f64, f64) {
    (lo.min(0.0), hi.max(0.0))
}

/// Counts of `values` in equal-width bins over their range.
pub fn histogram(values: &[f64], bins: usize) -> Option<(f64, f64, Vec<usize>)> {
    let (lo, hi) = bounds(values.iter().copied())?;
    let width = (hi - lo) / bins as f64;
    let mut counts = vec![0usize; bins];
    for v in values.iter().filter(|v| v.is_finite()) {
        let index = (((v - lo) / width).floor() as usize).min(bins - 1);
        counts[index] += 1;
    }
    Some((lo, hi, counts))
}

enum Mark {
    Path(Vec<(i32, i32)>),
    Dot((i32, i32)),
    Bar((i32, i32), (i32, i32)),
}

impl PlotRenderer {
    fn layout(&self, table: &Table, request: &ChartRequest) -> Result<Vec<Mark>> {
        let x_index = table
            .column_index(&request.x_column)
            .ok_or_else(|| missing_column(&request.x_column))?;
        let y_index = table
            .column_index(&request.y_column)
            .ok_or_else(|| missing_column(&request.y_column))?;

        let ys = table.numeric_column(y_index);
        let numeric_x = table.numeric_column(x_index);
        let xs: Vec<Option<f64>> = if numeric_x.iter().any(Option::is_some) {
            numeric_x
        } else {
            (0..table.row_count()).map(|i| Some(i as f64)).collect()
        };

        let mut marks = Vec::new();
        match request.kind {
            ChartKind::Line | ChartKind::Scatter => {
                let points: Vec<(f64, f64)> = xs
                    .iter()
                    .zip(ys.iter())
                    .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
                    .collect();
                let (Some(xr), Some(yr)) = (
                    bounds(points.iter().map(|p| p.0)),
                    bounds(points.iter().map(|p| p.1)),
                ) else {
                    return Ok(marks);
                };
                let frame = Frame::new(self.width, self.height, xr, yr);
                let pixels: Vec<(i32, i32)> =
                    points.iter().map(|(x, y)| frame.px(*x, *y)).collect();
                if request.kind == ChartKind::Line {
                    marks.push(Mark::Path(pixels.clone()));
                }
                marks.extend(pixels.into_iter().map(Mark::Dot));
            }
            ChartKind::Bar => {
                let heights: Vec<(f64, f64)> = ys
                    .iter()
                    .enumerate()
                    .filter_map(|(i, y)| Some((i as f64, (*y)?)))
                    .collect();
                let Some(yr) = bounds(heights.iter().map(|h| h.1)) else {
                    return Ok(marks);
                };
                let xr = (-0.5, ys.len() as f64 - 0.5);
                let frame = Frame::new(self.width, self.height, xr, with_zero(yr));
                for (i, y) in heights {
                    marks.push(Mark::Bar(frame.px(i - 0.4, y), frame.px(i + 0.4, 0.0)));
                }
            }
            ChartKind::Histogram => {
                let values: Vec<f64> = ys.iter().flatten().copied().collect();
                let Some((lo, hi, counts)) = histogram(&values, HISTOGRAM_BINS) else {
                    return Ok(marks);
                };
                let peak = counts.iter().copied().max().unwrap_or(0).max(1) as f64;
                let frame = Frame::new(self.width, self.height, (lo, hi), (0.0, peak));
                let width = (hi - lo) / HISTOGRAM_BINS as f64;
                for (i, count) in counts.iter().enumerate() {
                    if *count == 0 {
                        continue;
                    }
                    let x0 = lo + i as f64 * width;
                    marks.push(Mark::Bar(
                        frame.px(x0, *count as f64),
                        frame.px(x0 + width, 0.0),
                    ));
                }
            }
        }
        Ok(marks)
    }
}

impl ChartRenderer for PlotRenderer {
    fn render(&self, table: &Table, request: &ChartRequest) -> Result<Vec<u8>> {
        let marks = self.layout(table, request)?;
        let (width, height) = (self.width, self.height);
        let mut buffer = vec![255u8; width as usize * height as usize * 3];

        {
            let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
            root.fill(&WHITE).map_err(render_error)?;

            let frame = Frame::new(width, height, (0.0, 1.0), (0.0, 1.0));
            root.draw(&PathElement::new(
                vec![
                    (frame.left, frame.top),
                    (frame.left, frame.bottom),
                    (frame.right, frame.bottom),
                ],
                BLACK.stroke_width(2),
            ))
            .map_err(render_error)?;

            for mark in &marks {
                match mark {
                    Mark::Path(points) => root
                        .draw(&PathElement::new(points.clone(), MARK.stroke_width(2)))
                        .map_err(render_error)?,
                    Mark::Dot(center) => root
                        .draw(&Circle::new(*center, 4, MARK.filled()))
                        .map_err(render_error)?,
                    Mark::Bar(top_left, bottom_right) => root
                        .draw(&Rectangle::new([*top_left, *bottom_right], MARK.filled()))
                        .map_err(render_error)?,
                }
            }
            root.present().map_err(render_error)?;
        }

        tracing::debug!(
            kind = request.kind.as_str(),
            marks = marks.len(),
            "chart rendered"
        );
        encode_png(buffer, width, height)
    }
}

fn encode_png(buffer: Vec<u8>, width: u32, height: u32) -> Result<Vec<u8>> {
    let image = image::RgbImage::from_raw(width, height, buffer)
        .ok_or_else(|| LabbookError::Render("Pixel buffer size mismatch".to_string()))?;
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(image)
        .write_to(&mut out, image::ImageOutputFormat::Png)
        .map_err(render_error)?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        Table::from_csv(b"time,od\n0,0.1\n1,0.2\n2,0.4\n3,0.8\n").unwrap()
    }

    #[test]
    fn test_kind_parse_names_allowed_set() {
        assert_eq!("Histogram".parse::<ChartKind>().unwrap(), ChartKind::Histogram);
        let err = "pie".parse::<ChartKind>().unwrap_err();
        assert!(err.to_string().contains("line, scatter, bar, histogram"));
    }

    #[test]
    fn test_default_title() {
        let request = ChartRequest::new(ChartKind::Line, "time", "od");
        assert_eq!(request.display_title(), "od vs time");
        assert_eq!(request.with_title("Growth").display_title(), "Growth");
    }

    #[test]
    fn test_check_columns_names_missing_column() {
        let request = ChartRequest::new(ChartKind::Scatter, "nonexistent", "od");
        let columns = vec!["time".to_string(), "od".to_string()];
        let err = request.check_columns(&columns).unwrap_err();
        assert!(matches!(err, LabbookError::Validation(ref m) if m.contains("'nonexistent'")));
    }

    #[test]
    fn test_render_every_kind_produces_png() {
        let renderer = PlotRenderer::new(320, 200);
        for kind in [
            ChartKind::Line,
            ChartKind::Scatter,
            ChartKind::Bar,
            ChartKind::Histogram,
        ] {
            let png = renderer
                .render(&table(), &ChartRequest::new(kind, "time", "od"))
                .unwrap();
            let decoded = image::load_from_memory(&png).unwrap();
            assert_eq!((decoded.width(), decoded.height()), (320, 200));
        }
    }

    #[test]
    fn test_text_y_column_renders_empty_frame() {
        let table = Table::from_csv(b"x,label\n1,a\n2,b\n").unwrap();
        let png = PlotRenderer::new(120, 80)
            .render(&table, &ChartRequest::new(ChartKind::Line, "x", "label"))
            .unwrap();
        assert!(png.starts_with(&[0x89, b'P', b'N', b'G']));
    }

    #[test]
    fn test_histogram_bins_cover_range() {
        let values: Vec<f64> = (0..=30).map(|v| v as f64).collect();
        let (lo, hi, counts) = histogram(&values, HISTOGRAM_BINS).unwrap();
        assert_eq!((lo, hi), (0.0, 30.0));
        assert_eq!(counts.len(), HISTOGRAM_BINS);
        assert_eq!(counts.iter().sum::<usize>(), values.len());
        assert_eq!(counts[HISTOGRAM_BINS - 1], 2);
    }
}
