use eframe::egui::{self, Align2, Color32, FontId, Pos2, Rect, Sense, Stroke, Ui, Vec2};
use egui_plot::{Bar, BarChart, Plot, PlotPoint, Text};

use music_dashboard::data::correlation::CorrelationMatrix;
use music_dashboard::data::stats::{GenreAggregate, Histogram};

use crate::color::{coolwarm, generate_palette, text_on};

// ---------------------------------------------------------------------------
// Popularity distribution
// ---------------------------------------------------------------------------

/// Bar chart of the popularity histogram for the visible tracks.
pub fn popularity_histogram(ui: &mut Ui, histogram: &Histogram) {
    if histogram.counts.is_empty() {
        ui.label("No tracks to plot.");
        return;
    }

    let bars: Vec<Bar> = histogram
        .counts
        .iter()
        .zip(histogram.edges.windows(2))
        .map(|(&count, edge)| {
            let width = edge[1] - edge[0];
            Bar::new(edge[0] + width / 2.0, count as f64)
                .width(width)
                .name(format!("{:.0}–{:.0}", edge[0], edge[1]))
        })
        .collect();

    Plot::new("popularity_histogram")
        .height(260.0)
        .x_axis_label("Popularity")
        .y_axis_label("Frequency")
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(
                BarChart::new(bars)
                    .color(Color32::from_rgb(90, 170, 110))
                    .name("tracks"),
            );
        });
}

// ---------------------------------------------------------------------------
// Genre ranking
// ---------------------------------------------------------------------------

/// Horizontal bars of mean popularity, best genre on top.
pub fn top_genres_chart(ui: &mut Ui, ranking: &[GenreAggregate]) {
    if ranking.is_empty() {
        ui.label("No genres to rank.");
        return;
    }

    let palette = generate_palette(ranking.len());
    let n = ranking.len();
    let bars: Vec<Bar> = ranking
        .iter()
        .zip(&palette)
        .enumerate()
        .map(|(rank, (g, &color))| {
            Bar::new((n - rank) as f64, g.mean_popularity)
                .width(0.7)
                .fill(color)
                .name(format!("{} ({} tracks)", g.genre, g.tracks))
        })
        .collect();

    Plot::new("top_genres")
        .height(30.0 * n as f32 + 60.0)
        .x_axis_label("Average Popularity")
        .show_y(false)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).horizontal());
            for (rank, g) in ranking.iter().enumerate() {
                plot_ui.text(
                    Text::new(PlotPoint::new(0.0, (n - rank) as f64), format!(" {}", g.genre))
                        .anchor(Align2::LEFT_CENTER)
                        .color(Color32::BLACK),
                );
            }
        });
}

// ---------------------------------------------------------------------------
// Correlation heatmap
// ---------------------------------------------------------------------------

const CELL: f32 = 58.0;
const LABEL_WIDTH: f32 = 120.0;
const LABEL_HEIGHT: f32 = 24.0;

/// Annotated heatmap of the correlation matrix. Undefined cells are drawn
/// grey and labelled "n/a".
pub fn correlation_heatmap(ui: &mut Ui, matrix: &CorrelationMatrix) {
    let k = matrix.size();
    let size = Vec2::new(LABEL_WIDTH + CELL * k as f32, LABEL_HEIGHT + CELL * k as f32);
    let (response, painter) = ui.allocate_painter(size, Sense::hover());
    let origin = response.rect.min;
    let label_font = FontId::proportional(11.0);
    let value_font = FontId::monospace(12.0);
    let text_color = ui.visuals().text_color();

    for (j, label) in matrix.labels.iter().enumerate() {
        let centre = Pos2::new(
            origin.x + LABEL_WIDTH + CELL * (j as f32 + 0.5),
            origin.y + LABEL_HEIGHT / 2.0,
        );
        painter.text(centre, Align2::CENTER_CENTER, abbreviate(label), label_font.clone(), text_color);
    }

    for (i, label) in matrix.labels.iter().enumerate() {
        let top = origin.y + LABEL_HEIGHT + CELL * i as f32;
        painter.text(
            Pos2::new(origin.x + LABEL_WIDTH - 6.0, top + CELL / 2.0),
            Align2::RIGHT_CENTER,
            label,
            label_font.clone(),
            text_color,
        );

        for j in 0..k {
            let value = matrix.get(i, j);
            let rect = Rect::from_min_size(
                Pos2::new(origin.x + LABEL_WIDTH + CELL * j as f32, top),
                Vec2::splat(CELL),
            );
            let fill = coolwarm(value);
            painter.rect_filled(rect, 0.0, fill);
            painter.rect_stroke(rect, 0.0, Stroke::new(1.0, Color32::WHITE), egui::StrokeKind::Inside);
            let text = if value.is_nan() {
                "n/a".to_string()
            } else {
                format!("{value:.2}")
            };
            painter.text(rect.center(), Align2::CENTER_CENTER, text, value_font.clone(), text_on(fill));
        }
    }

    if let Some(pos) = response.hover_pos() {
        let col = ((pos.x - origin.x - LABEL_WIDTH) / CELL).floor();
        let row = ((pos.y - origin.y - LABEL_HEIGHT) / CELL).floor();
        if col >= 0.0 && row >= 0.0 && (col as usize) < k && (row as usize) < k {
            let (i, j) = (row as usize, col as usize);
            response.on_hover_text(format!(
                "{} × {}: {:.4}",
                matrix.labels[i],
                matrix.labels[j],
                matrix.get(i, j)
            ));
        }
    }
}

/// Column headers have one cell of width; long names are shortened.
fn abbreviate(label: &str) -> String {
    const MAX: usize = 8;
    if label.chars().count() <= MAX {
        label.to_string()
    } else {
        let short: String = label.chars().take(MAX - 1).collect();
        format!("{short}.")
    }
}
