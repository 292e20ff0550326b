use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use zip::write::SimpleFileOptions;

/// Write a synthetic track dataset archive for trying out the dashboard.
#[derive(Parser)]
#[command(name = "generate_sample")]
struct Args {
    /// Output archive
    #[arg(short, long, default_value = "dataset.zip")]
    output: PathBuf,

    /// Tracks generated per genre (before duplicates and broken rows)
    #[arg(short = 'n', long, default_value_t = 120)]
    tracks_per_genre: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// (genre, popularity offset, typical energy, typical acousticness)
const GENRES: [(&str, f64, f64, f64); 10] = [
    ("acoustic", 38.0, 0.35, 0.80),
    ("ambient", 30.0, 0.20, 0.85),
    ("blues", 33.0, 0.55, 0.40),
    ("classical", 25.0, 0.15, 0.95),
    ("dance", 55.0, 0.80, 0.10),
    ("hip-hop", 52.0, 0.70, 0.15),
    ("jazz", 34.0, 0.40, 0.60),
    ("metal", 40.0, 0.92, 0.02),
    ("pop", 60.0, 0.68, 0.20),
    ("rock", 48.0, 0.78, 0.12),
];

const HEADER: [&str; 21] = [
    "",
    "track_id",
    "artists",
    "album_name",
    "track_name",
    "popularity",
    "duration_ms",
    "explicit",
    "danceability",
    "energy",
    "key",
    "loudness",
    "mode",
    "speechiness",
    "acousticness",
    "instrumentalness",
    "liveness",
    "valence",
    "tempo",
    "time_signature",
    "track_genre",
];

/// Box-Muller transform for a normal sample.
fn gauss(rng: &mut StdRng, mean: f64, std_dev: f64) -> f64 {
    let u1: f64 = rng.random::<f64>().max(1e-15);
    let u2: f64 = rng.random();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    mean + std_dev * z
}

fn unit(rng: &mut StdRng, mean: f64, std_dev: f64) -> f64 {
    gauss(rng, mean, std_dev).clamp(0.0, 1.0)
}

fn track_id(rng: &mut StdRng) -> String {
    const ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
    (0..22)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect()
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut rng = StdRng::seed_from_u64(args.seed);

    let mut csv_writer = csv::Writer::from_writer(Vec::new());
    csv_writer.write_record(HEADER)?;

    let mut index = 0usize;
    let mut ids: Vec<String> = Vec::new();
    for &(genre, base, energy_mean, acoustic_mean) in &GENRES {
        for n in 0..args.tracks_per_genre {
            let danceability = unit(&mut rng, 0.55, 0.15);
            let energy = unit(&mut rng, energy_mean, 0.12);
            let loudness = -25.0 + 22.0 * energy + gauss(&mut rng, 0.0, 1.5);
            let speechiness = unit(&mut rng, 0.08, 0.06);
            let acousticness = unit(&mut rng, acoustic_mean, 0.15);
            let instrumentalness = if rng.random_bool(0.3) { unit(&mut rng, 0.6, 0.25) } else { 0.0 };
            let liveness = unit(&mut rng, 0.2, 0.1);
            let valence = unit(&mut rng, 0.5, 0.2);
            let tempo = gauss(&mut rng, 120.0, 25.0).max(40.0);
            let popularity = (base + 18.0 * danceability + 0.4 * loudness - 10.0 * acousticness
                + gauss(&mut rng, 0.0, 9.0))
            .round()
            .clamp(0.0, 100.0);

            // A small share of ids reappear, as the same song listed under
            // a second genre.
            let id = if n % 37 == 5 && !ids.is_empty() {
                ids[rng.random_range(0..ids.len())].clone()
            } else {
                let id = track_id(&mut rng);
                ids.push(id.clone());
                id
            };

            // Sporadic gaps in non-required columns.
            let album = if n % 53 == 7 {
                String::new()
            } else {
                format!("{genre} collection vol. {}", n / 12 + 1)
            };

            csv_writer.write_record([
                index.to_string(),
                id,
                format!("artist {}", rng.random_range(0..400)),
                album,
                format!("{genre} track {n}"),
                format!("{popularity:.0}"),
                rng.random_range(90_000..420_000).to_string(),
                (if rng.random_bool(0.1) { "True" } else { "False" }).to_string(),
                format!("{danceability:.3}"),
                format!("{energy:.3}"),
                rng.random_range(0..12).to_string(),
                format!("{loudness:.3}"),
                rng.random_range(0..2).to_string(),
                format!("{speechiness:.4}"),
                format!("{acousticness:.4}"),
                format!("{instrumentalness:.6}"),
                format!("{liveness:.4}"),
                format!("{valence:.3}"),
                format!("{tempo:.3}"),
                "4".to_string(),
                genre.to_string(),
            ])?;
            index += 1;
        }
    }

    let mut text = csv_writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("flushing CSV: {e}"))?;
    // Lines the loader has to skip.
    writeln!(text, "{index},broken_row,only,a,few,fields")?;
    writeln!(
        text,
        "{},bad_popularity,x,y,z,very popular,200000,False,0.5,0.5,1,-6.0,1,0.05,0.1,0.0,0.1,0.5,120.0,4,pop",
        index + 1
    )?;

    let file = File::create(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;
    let mut archive = zip::ZipWriter::new(file);
    archive.start_file(
        "dataset.csv",
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated),
    )?;
    archive.write_all(&text)?;
    archive.finish()?;

    println!(
        "Wrote {index} tracks across {} genres to {}",
        GENRES.len(),
        args.output.display()
    );
    Ok(())
}
