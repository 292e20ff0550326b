use eframe::egui::{ScrollArea, Ui};
use egui_extras::{Column, TableBuilder};

use music_dashboard::data::model::TrackTable;

/// Show the first `limit` of `rows` of `table` as a scrollable grid.
pub fn preview_table(ui: &mut Ui, id: &str, table: &TrackTable, rows: &[usize], limit: usize) {
    let shown = &rows[..rows.len().min(limit)];
    ui.label(format!("Showing {} of {} rows", shown.len(), rows.len()));

    let n_cols = table.column_names().len();
    ui.push_id(id, |ui: &mut Ui| {
        ScrollArea::horizontal().show(ui, |ui: &mut Ui| {
            TableBuilder::new(ui)
                .striped(true)
                .resizable(true)
                .max_scroll_height(320.0)
                .columns(Column::auto().at_least(60.0).clip(true), n_cols)
                .header(20.0, |mut header| {
                    for name in table.column_names() {
                        header.col(|ui: &mut Ui| {
                            ui.strong(name);
                        });
                    }
                })
                .body(|body| {
                    body.rows(18.0, shown.len(), |mut row| {
                        let index = shown[row.index()];
                        for col in 0..n_cols {
                            row.col(|ui: &mut Ui| {
                                ui.label(table.cell(index, col).to_string());
                            });
                        }
                    });
                });
        });
    });
}
