use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use music_dashboard::config::PipelineConfig;
use music_dashboard::data::correlation::CorrelationOutcome;

use crate::state::AppState;
use crate::ui::{panels, plot, tables};

const KEY_INSIGHTS: &str = "\
• Popularity distribution: popularity varies across genres, some genres have a higher average popularity.
• Top genres: pop, rock and dance-related genres consistently rank among the most popular.
• Feature correlations: loudness and energy track popularity, acousticness runs against it.
• Predictive power: audio features carry some signal, but they are not the only factors behind a song's success.";

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct MusicDashboardApp {
    pub state: AppState,
}

impl MusicDashboardApp {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            state: AppState::new(config),
        }
    }
}

impl eframe::App for MusicDashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Missing dataset: nothing but the error ----
        if let Some(msg) = &self.state.load_error {
            egui::CentralPanel::default().show(ctx, |ui| {
                panels::load_error_screen(ui, msg);
            });
            return;
        }

        // ---- Left side panel: options ----
        egui::SidePanel::left("options_panel")
            .default_width(220.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: analysis ----
        egui::CentralPanel::default().show(ctx, |ui| {
            ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui: &mut Ui| {
                    dashboard(ui, &self.state);
                });
        });
    }
}

fn dashboard(ui: &mut Ui, state: &AppState) {
    ui.heading("Music Popularity Analysis");
    ui.label("An interactive dashboard to explore the characteristics of popular music.");

    let (Some(table), Some(snapshot)) = (&state.table, &state.snapshot) else {
        return;
    };
    let preview_rows = state.config.dashboard.preview_rows;

    ui.separator();
    ui.heading("Raw Data Preview");
    let all_rows: Vec<usize> = (0..table.len().min(preview_rows)).collect();
    tables::preview_table(ui, "raw_preview", table, &all_rows, preview_rows);

    ui.separator();
    ui.heading("Exploratory Data Analysis");

    ui.strong("Distribution of Song Popularity");
    plot::popularity_histogram(ui, &snapshot.histogram);

    ui.add_space(8.0);
    ui.strong(format!("Top {} Most Popular Genres", state.params().top_n));
    plot::top_genres_chart(ui, &snapshot.top_genres);

    ui.add_space(8.0);
    ui.strong("Correlation Matrix of Audio Features");
    ScrollArea::horizontal()
        .id_salt("heatmap_scroll")
        .show(ui, |ui: &mut Ui| {
            match &snapshot.correlation {
                CorrelationOutcome::Computed(matrix) => plot::correlation_heatmap(ui, matrix),
                CorrelationOutcome::Unavailable { reason } => {
                    ui.label(
                        RichText::new(format!("Correlation matrix unavailable: {reason}."))
                            .color(Color32::from_rgb(230, 160, 40)),
                    );
                }
            }
        });

    ui.separator();
    ui.heading("Predictive Modeling");
    egui::CollapsingHeader::new("Train a Popularity Prediction Model")
        .default_open(false)
        .show(ui, |ui: &mut Ui| {
            panels::model_section(ui, &snapshot.model);
        });

    ui.separator();
    ui.heading("Data Preview");
    tables::preview_table(ui, "filtered_preview", table, &snapshot.visible_indices, preview_rows);

    ui.separator();
    ui.heading("Key Insights");
    ui.label(KEY_INSIGHTS);
}
