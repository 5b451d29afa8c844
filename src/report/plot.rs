use std::error::Error;
use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;
use serde::{Deserialize, Serialize};

use crate::coverage::CoverageState;
use crate::error::{CovError, Result};

type DrawResult<T> = std::result::Result<T, Box<dyn Error>>;

/// 覆盖度图的尺寸与配色（RGB）
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlotStyle {
    pub width: u32,
    pub height: u32,
    pub margin: u32,
    pub line_color: [u8; 3],
    pub low_color: [u8; 3],
    pub background: [u8; 3],
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 400,
            margin: 20,
            line_color: [0x00, 0x79, 0xa4],
            low_color: [0xff, 0xa5, 0x00],
            background: [0xff, 0xff, 0xff],
        }
    }
}

fn rgb(c: [u8; 3]) -> RGBColor {
    RGBColor(c[0], c[1], c[2])
}

/// 把位置按像素分箱，每箱记录 (起点, 最大深度, 最小深度)
fn bin_depths(depth: &[u32], bins: usize) -> Vec<(usize, u32, u32)> {
    if depth.is_empty() || bins == 0 {
        return Vec::new();
    }
    let per_bin = depth.len().div_ceil(bins).max(1);
    depth
        .chunks(per_bin)
        .enumerate()
        .map(|(bi, chunk)| {
            let max = chunk.iter().copied().max().unwrap_or(0);
            let min = chunk.iter().copied().min().unwrap_or(0);
            (bi * per_bin, max, min)
        })
        .collect()
}

/// y 轴上限取 1/2/5 × 10^k 中不小于 `max` 的最小值
fn nice_ceiling(max: u32) -> u32 {
    if max <= 5 {
        return 5;
    }
    let mut mag = 1u32;
    while mag.saturating_mul(10) <= max {
        mag *= 10;
    }
    [1u32, 2, 5, 10]
        .iter()
        .map(|&k| k.saturating_mul(mag))
        .find(|&v| v >= max)
        .unwrap_or(u32::MAX)
}

/// 在任意 plotters 后端上画深度-位置折线图：
/// 折线 + 半透明填充，深度低于 `low_depth` 的位置用橙色 × 标出，左上角写平均/最大深度。
fn draw_chart<DB>(
    root: &DrawingArea<DB, Shift>,
    state: &CoverageState,
    contig: &str,
    low_depth: u32,
    style: &PlotStyle,
) -> DrawResult<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let line = rgb(style.line_color);
    let low = rgb(style.low_color);
    root.fill(&rgb(style.background))?;

    let x_max = state.len().max(1);
    let y_max = nice_ceiling(state.max_coverage());

    let mut chart = ChartBuilder::on(root)
        .caption(
            format!("{} Coverage Map", contig),
            ("sans-serif", 20).into_font().style(FontStyle::Bold),
        )
        .margin(style.margin)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0usize..x_max, 0u32..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Position (bp)")
        .y_desc("Coverage (x)")
        .x_labels(6)
        .y_labels(6)
        .bold_line_style(BLACK.mix(0.15))
        .light_line_style(TRANSPARENT)
        .draw()?;

    // 每个像素列一箱，避免长 contig 画出上万个点
    let plot_w = chart.plotting_area().dim_in_pixel().0.max(1) as usize;
    let bins = bin_depths(&state.depth, plot_w);

    if !bins.is_empty() {
        let points: Vec<(usize, u32)> = bins.iter().map(|&(pos, max, _)| (pos, max)).collect();
        chart.draw_series(AreaSeries::new(points.iter().copied(), 0, line.mix(0.3)))?;
        chart.draw_series(LineSeries::new(points.iter().copied(), line.mix(0.7).stroke_width(1)))?;

        let lows: Vec<(usize, u32)> = bins
            .iter()
            .filter(|&&(_, _, min)| min < low_depth)
            .map(|&(pos, _, min)| (pos, min))
            .collect();
        if !lows.is_empty() {
            chart
                .draw_series(lows.iter().map(|&p| Cross::new(p, 4, low.mix(0.6).stroke_width(1))))?
                .label("Low confidence")
                .legend(move |(x, y)| Cross::new((x, y), 4, low.stroke_width(1)));
            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperRight)
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK.mix(0.3))
                .draw()?;
        }
    }

    let stats = format!("Avg: {:.1}x, Max: {}x", state.avg_coverage(), state.max_coverage());
    // 像素坐标，相对绘图区左上角
    let area = chart.plotting_area().strip_coord_spec();
    let box_w = stats.len() as i32 * 8 + 12;
    area.draw(&Rectangle::new(
        [(8, 8), (8 + box_w, 30)],
        RGBColor(0xf5, 0xde, 0xb3).mix(0.5).filled(),
    ))?;
    area.draw(&Text::new(stats, (14, 12), ("sans-serif", 14).into_font()))?;

    Ok(())
}

/// 写出 PNG；任何失败都包装为 `PlotRender`
pub fn write_plot(state: &CoverageState, contig: &str, low_depth: u32, style: &PlotStyle, path: &Path) -> Result<()> {
    let root = BitMapBackend::new(path, (style.width, style.height)).into_drawing_area();
    draw_chart(&root, state, contig, low_depth, style)
        .and_then(|()| Ok(root.present()?))
        .map_err(|e| CovError::PlotRender {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    /// 画到内存 RGB 缓冲区，返回像素
    fn render_pixels(state: &CoverageState, low_depth: u32, style: &PlotStyle) -> Vec<u8> {
        let mut buf = vec![0u8; (style.width * style.height * 3) as usize];
        {
            let root = BitMapBackend::with_buffer(&mut buf, (style.width, style.height)).into_drawing_area();
            draw_chart(&root, state, "c", low_depth, style).unwrap();
            root.present().unwrap();
        }
        buf
    }

    // 橙色（含与白底的半透明混合），蓝色折线和灰色文字都不满足
    fn orange_pixels(buf: &[u8]) -> usize {
        buf.chunks(3).filter(|p| p[0] > 200 && p[1] > 120 && p[1] < 230 && p[2] < 130).count()
    }

    #[test]
    fn png_file_has_signature_and_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("contig_1_coverage.png");
        let mut state = CoverageState::new(10);
        for d in state.depth.iter_mut().take(5) {
            *d = 4;
        }
        write_plot(&state, "contig_1", 3, &PlotStyle::default(), &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..8], &PNG_SIGNATURE);
        // IHDR: width / height big-endian at 16..24
        assert_eq!(u32::from_be_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]), 1200);
        assert_eq!(u32::from_be_bytes([bytes[20], bytes[21], bytes[22], bytes[23]]), 400);
    }

    #[test]
    fn low_depth_positions_are_marked() {
        let mut state = CoverageState::new(100);
        for d in state.depth.iter_mut().take(50) {
            *d = 10;
        }
        let buf = render_pixels(&state, 3, &PlotStyle::default());
        assert!(orange_pixels(&buf) > 0);
    }

    #[test]
    fn no_low_markers_when_well_covered() {
        let mut state = CoverageState::new(100);
        state.depth.iter_mut().for_each(|d| *d = 10);
        let buf = render_pixels(&state, 3, &PlotStyle::default());
        assert_eq!(orange_pixels(&buf), 0);
    }

    #[test]
    fn empty_state_still_renders() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty_coverage.png");
        write_plot(&CoverageState::default(), "empty", 3, &PlotStyle::default(), &path).unwrap();
        assert_eq!(&std::fs::read(&path).unwrap()[..8], &PNG_SIGNATURE);
    }

    #[test]
    fn binning_keeps_maximum() {
        let depth = vec![1, 5, 2, 0, 3, 3];
        let bins = bin_depths(&depth, 3);
        assert_eq!(bins, vec![(0, 5, 1), (2, 2, 0), (4, 3, 3)]);
        assert_eq!(bin_depths(&depth, 100).len(), 6);
    }

    #[test]
    fn y_axis_ceiling() {
        assert_eq!(nice_ceiling(0), 5);
        assert_eq!(nice_ceiling(7), 10);
        assert_eq!(nice_ceiling(42), 50);
        assert_eq!(nice_ceiling(100), 100);
        assert_eq!(nice_ceiling(101), 200);
    }

    #[test]
    fn write_to_missing_dir_is_plot_error() {
        let state = CoverageState::new(3);
        let path = Path::new("/nonexistent-dir-for-plot-test/x.png");
        let err = write_plot(&state, "c", 3, &PlotStyle::default(), path).unwrap_err();
        assert!(matches!(err, CovError::PlotRender { .. }));
    }
}
