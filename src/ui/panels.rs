use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use music_dashboard::data::regression::ModelOutcome;

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – genre filter and top-N
// ---------------------------------------------------------------------------

/// Render the left options panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Options");
    ui.separator();

    if state.table.is_none() {
        ui.label("No dataset loaded.");
        return;
    }

    // ---- Top N ----
    ui.strong("Number of top genres");
    let range = state.config.dashboard.top_n_min..=state.config.dashboard.top_n_max;
    let mut top_n = state.top_n;
    ui.add(egui::Slider::new(&mut top_n, range));
    state.set_top_n(top_n);
    ui.separator();

    // ---- Genres ----
    let n_selected = state.selected.len();
    let n_total = state.all_genres.len();
    ui.strong(format!("Genres  ({n_selected}/{n_total})"));
    if n_selected == 0 {
        ui.label(RichText::new("none selected: showing all").italics());
    }
    ui.horizontal(|ui: &mut Ui| {
        if ui.small_button("All").clicked() {
            state.select_all();
        }
        if ui.small_button("None").clicked() {
            state.select_none();
        }
    });

    let genres = state.all_genres.clone();
    let mut toggled: Option<String> = None;
    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            for genre in &genres {
                let mut checked = state.selected.contains(genre);
                if ui.checkbox(&mut checked, genre).changed() {
                    toggled = Some(genre.clone());
                }
            }
        });

    // Recompute once, after the checkbox list has been drawn.
    if let Some(genre) = toggled {
        state.toggle_genre(&genre);
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open archive…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let (Some(table), Some(snapshot)) = (&state.table, &state.snapshot) {
            ui.label(format!(
                "{} tracks loaded, {} visible",
                table.len(),
                snapshot.visible_indices.len()
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// Model section
// ---------------------------------------------------------------------------

/// Metrics of the popularity model, or the warning when it was skipped.
pub fn model_section(ui: &mut Ui, model: &ModelOutcome) {
    match model {
        ModelOutcome::Fitted(m) => {
            ui.strong("Model Performance");
            ui.label(format!("Mean Squared Error: {:.2}", m.mse));
            ui.label(format!("R-squared: {:.2}", m.r2));
            ui.label(format!(
                "Trained on {} tracks, evaluated on {}.",
                m.train_rows, m.test_rows
            ));
            ui.label(
                RichText::new(
                    "This model predicts song popularity based on audio features for the selected genres.",
                )
                .color(Color32::LIGHT_BLUE),
            );
        }
        ModelOutcome::InsufficientData { rows, required } => {
            ui.label(
                RichText::new(format!(
                    "Not enough data to train a model for the selected genres \
                     ({rows} tracks, at least {required} needed)."
                ))
                .color(Color32::from_rgb(230, 160, 40)),
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Blocking load error
// ---------------------------------------------------------------------------

pub fn load_error_screen(ui: &mut Ui, message: &str) {
    ui.centered_and_justified(|ui: &mut Ui| {
        ui.label(
            RichText::new(format!(
                "{message}\n\nPlace the dataset archive next to the app or open one via File → Open archive…"
            ))
            .color(Color32::RED)
            .heading(),
        );
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open track dataset")
        .add_filter("Zip archive", &["zip"])
        .pick_file();

    if let Some(path) = file {
        log::info!("Opening {}", path.display());
        state.open_archive(path);
    }
}
