use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use music_dashboard::config::{ParsePolicy, PipelineConfig, TextEncoding};
use music_dashboard::data::clean::clean;
use music_dashboard::data::filter::{filter_by_genre, FilteredView, GenreSelection};
use music_dashboard::data::loader::load_archive;
use music_dashboard::data::model::{CellValue, TRACK_ID};
use music_dashboard::data::regression::{evaluate_model, ModelOutcome};
use music_dashboard::data::stats::top_genres;
use music_dashboard::pipeline::{load_clean, run_pipeline, DashboardParams, TableCache};
use music_dashboard::PipelineError;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

const HEADER: &str = ",track_id,artists,track_name,popularity,danceability,energy,loudness,\
speechiness,acousticness,instrumentalness,liveness,valence,tempo,track_genre";

fn write_zip(dir: &Path, entries: &[(&str, &[u8])]) -> PathBuf {
    let path = dir.join("dataset.zip");
    let mut zip = zip::ZipWriter::new(File::create(&path).unwrap());
    for (name, body) in entries {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(body).unwrap();
    }
    zip.finish().unwrap();
    path
}

fn write_dataset(dir: &Path, body: &[u8]) -> PathBuf {
    write_zip(dir, &[("dataset.csv", body)])
}

/// One CSV line. Features vary with `i` so correlations are defined.
fn line(i: usize, id: &str, genre: &str, popularity: f64) -> String {
    let f = |k: usize| ((i * (k + 3) + k * 7) % 23) as f64 / 23.0;
    format!(
        "{i},{id},artist {i},song {i},{popularity},{},{},{},{},{},{},{},{},{},{genre}",
        f(0),
        f(1),
        -20.0 + 10.0 * f(2),
        f(3),
        f(4),
        f(5),
        f(6),
        f(7),
        90.0 + 60.0 * f(8),
    )
}

fn csv(lines: &[String]) -> Vec<u8> {
    let mut text = String::from(HEADER);
    for l in lines {
        text.push('\n');
        text.push_str(l);
    }
    text.push('\n');
    text.into_bytes()
}

fn config_for(path: PathBuf) -> PipelineConfig {
    PipelineConfig {
        archive: path,
        ..PipelineConfig::default()
    }
}

/// Twelve tracks, six "pop" (mean 70) then six "jazz" (mean 30), interleaved.
fn twelve_rows() -> Vec<String> {
    (0..12)
        .map(|i| {
            let (genre, pop) = if i % 2 == 0 { ("pop", 70.0) } else { ("jazz", 30.0) };
            line(i, &format!("id{i}"), genre, pop + (i % 3) as f64)
        })
        .collect()
}

#[test]
fn missing_archive_is_resource_not_found() {
    let dir = TempDir::new().unwrap();
    let config = config_for(dir.path().join("nope.zip"));
    match load_clean(&config) {
        Err(PipelineError::ResourceNotFound(p)) => assert!(p.ends_with("nope.zip")),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn top_n_is_capped_by_available_genres() {
    let dir = TempDir::new().unwrap();
    let path = write_dataset(dir.path(), &csv(&twelve_rows()));
    let table = load_clean(&config_for(path)).unwrap();
    assert_eq!(table.len(), 12);

    let view = FilteredView::all(&table);
    let top1 = top_genres(&view, 1).unwrap();
    assert_eq!(top1.len(), 1);
    assert_eq!(top1[0].genre, "pop");

    let top5 = top_genres(&view, 5).unwrap();
    let names: Vec<_> = top5.iter().map(|g| g.genre.as_str()).collect();
    assert_eq!(names, ["pop", "jazz"]);
    assert!(top5[0].mean_popularity > top5[1].mean_popularity);
}

#[test]
fn duplicate_track_id_keeps_first_occurrence() {
    let mut lines = twelve_rows();
    lines.push(line(12, "id3", "pop", 99.0));
    lines.push(line(13, "id5", "pop", 98.0));
    let dir = TempDir::new().unwrap();
    let path = write_dataset(dir.path(), &csv(&lines));
    let config = config_for(path);

    let raw = load_archive(&config.archive, &config).unwrap();
    let cleaned = clean(&raw);
    assert_eq!(raw.len(), 14);
    assert_eq!(cleaned.len(), raw.len() - 2);
    assert!(cleaned.has_unique_track_ids());

    let ids = cleaned.column(TRACK_ID).unwrap();
    let pos = ids
        .iter()
        .position(|c| *c == CellValue::String("id3".into()))
        .unwrap();
    assert_eq!(cleaned.genre_of(pos).as_deref(), Some("jazz"));
    assert!(cleaned.column_names().iter().all(|c| c != "Unnamed: 0"));
}

#[test]
fn numeric_looking_ids_are_not_merged() {
    let mut lines = twelve_rows();
    for (i, id) in ["0042", "42", "1e3", "1000"].iter().enumerate() {
        lines.push(line(12 + i, id, "pop", 60.0));
    }
    let dir = TempDir::new().unwrap();
    let path = write_dataset(dir.path(), &csv(&lines));
    let config = config_for(path);

    let raw = load_archive(&config.archive, &config).unwrap();
    let cleaned = clean(&raw);
    assert_eq!(raw.len(), 16);
    assert_eq!(cleaned.len(), 16);
    let ids = cleaned.column(TRACK_ID).unwrap();
    assert!(ids.contains(&CellValue::String("0042".into())));
    assert!(ids.contains(&CellValue::String("1e3".into())));
}

#[test]
fn cleaning_is_idempotent_on_loaded_data() {
    let mut lines = twelve_rows();
    lines.push(line(12, "id0", "jazz", 10.0));
    lines.push("13,id13,artist,,50,0.1,0.2,-5,0.1,0.1,0.0,0.1,0.5,120,pop".to_string());
    let dir = TempDir::new().unwrap();
    let path = write_dataset(dir.path(), &csv(&lines));
    let config = config_for(path);

    let once = clean(&load_archive(&config.archive, &config).unwrap());
    assert_eq!(once.len(), 12);
    assert_eq!(clean(&once), once);
}

#[test]
fn malformed_lines_follow_parse_policy() {
    let mut lines = twelve_rows();
    lines.insert(4, "99,short,row".to_string());
    let dir = TempDir::new().unwrap();
    let path = write_dataset(dir.path(), &csv(&lines));

    let lenient = config_for(path.clone());
    assert_eq!(load_clean(&lenient).unwrap().len(), 12);

    let strict = PipelineConfig {
        parse_policy: ParsePolicy::Strict,
        ..config_for(path)
    };
    assert!(matches!(
        load_clean(&strict),
        Err(PipelineError::MalformedRow { line: 6, .. })
    ));
}

#[test]
fn latin1_names_survive_loading() {
    let mut bytes = csv(&twelve_rows());
    // "artist 0" -> "artist Ø" in ISO-8859-1.
    let pos = bytes.windows(8).position(|w| w == b"artist 0").unwrap();
    bytes[pos + 7] = 0xd8;
    let dir = TempDir::new().unwrap();
    let path = write_dataset(dir.path(), &bytes);
    let config = PipelineConfig {
        encoding: TextEncoding::Latin1,
        ..config_for(path)
    };
    let table = load_clean(&config).unwrap();
    assert_eq!(table.column("artists").unwrap()[0], CellValue::String("artist Ø".into()));
}

#[test]
fn archive_with_several_files_needs_an_entry_name() {
    let body = csv(&twelve_rows());
    let dir = TempDir::new().unwrap();
    let path = write_zip(
        dir.path(),
        &[("README.txt", b"not data".as_slice()), ("dataset.csv", body.as_slice())],
    );

    assert!(matches!(
        load_clean(&config_for(path.clone())),
        Err(PipelineError::Archive(_))
    ));

    let named = PipelineConfig {
        entry: Some("dataset.csv".into()),
        ..config_for(path)
    };
    assert_eq!(load_clean(&named).unwrap().len(), 12);
}

#[test]
fn filter_then_model_end_to_end() {
    let lines: Vec<String> = (0..40)
        .map(|i| {
            let genre = ["pop", "rock", "jazz", "metal"][i % 4];
            line(i, &format!("t{i}"), genre, 20.0 + (i * 13 % 60) as f64)
        })
        .collect();
    let dir = TempDir::new().unwrap();
    let path = write_dataset(dir.path(), &csv(&lines));
    let config = config_for(path);
    let table = load_clean(&config).unwrap();

    let unfiltered = filter_by_genre(&table, &GenreSelection::new());
    assert_eq!(unfiltered.materialize(), table);

    let two: GenreSelection = ["pop".to_string(), "rock".to_string()].into();
    let view = filter_by_genre(&table, &two);
    assert_eq!(view.len(), 20);
    assert!(view.indices().windows(2).all(|w| w[0] < w[1]));

    let first = evaluate_model(&view, &config.model).unwrap();
    let second = evaluate_model(&view, &config.model).unwrap();
    assert!(matches!(first, ModelOutcome::Fitted(_)));
    assert_eq!(first, second);

    let one: GenreSelection = ["jazz".to_string()].into();
    let params = DashboardParams::new(one, 10, &config.dashboard);
    let out = run_pipeline(&table, &params, &config).unwrap();
    assert_eq!(out.filtered.len(), 10);
    assert_eq!(
        out.model,
        ModelOutcome::InsufficientData { rows: 10, required: 11 }
    );
    let matrix = out.correlation.matrix().unwrap();
    for i in 0..matrix.size() {
        for j in 0..matrix.size() {
            let (a, b) = (matrix.get(i, j), matrix.get(j, i));
            assert!(a == b || (a.is_nan() && b.is_nan()));
        }
    }
}

#[test]
fn cache_loads_once_and_clears() {
    let dir = TempDir::new().unwrap();
    let path = write_dataset(dir.path(), &csv(&twelve_rows()));
    let config = config_for(path.clone());

    let mut cache = TableCache::new();
    let first = cache.get_or_load(&config).unwrap();

    // The archive is gone, but the cached table is still served.
    std::fs::remove_file(&path).unwrap();
    let second = cache.get_or_load(&config).unwrap();
    assert!(std::sync::Arc::ptr_eq(&first, &second));

    cache.clear();
    assert!(cache.get().is_none());
    assert!(matches!(
        cache.get_or_load(&config),
        Err(PipelineError::ResourceNotFound(_))
    ));
}
