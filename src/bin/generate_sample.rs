use std::path::PathBuf;

use anyhow::{Context, Result};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use replay_traces::data::writer::{write_columnar, write_meta_csv, write_packed};
use replay_traces::{ColumnarFormat, Sequence, SequenceStore, Tick, TickField, TICK_FIELD_COUNT};

/// Box-Muller transform for a normal sample.
fn gauss<R: Rng>(rng: &mut R, mean: f64, std_dev: f64) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(1e-15);
    let u2: f64 = rng.gen();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    mean + std_dev * z
}

/// A random walk: the player runs left/right, jumps now and then, and aims
/// around its position.
fn generate_ticks(rng: &mut ChaCha8Rng, len: usize, spawn: (f64, f64)) -> Vec<Tick> {
    let (mut x, mut y) = spawn;
    let mut move_dir = 0i32;
    let mut ticks = Vec::with_capacity(len);

    for _ in 0..len {
        if rng.gen_bool(0.05) {
            move_dir = rng.gen_range(-1..=1);
        }
        let jump = rng.gen_bool(0.03);
        x += f64::from(move_dir) * 10.0 + gauss(rng, 0.0, 0.5);
        y += if jump { -64.0 } else { 4.0 };
        y = y.min(spawn.1);

        let mut values = [0.0f32; TICK_FIELD_COUNT];
        values[TickField::PosX.index()] = x.round() as f32;
        values[TickField::PosY.index()] = y.round() as f32;
        values[TickField::MoveDir.index()] = move_dir as f32;
        values[TickField::TargetX.index()] = gauss(rng, 0.0, 120.0).round() as f32;
        values[TickField::TargetY.index()] = gauss(rng, 0.0, 120.0).round() as f32;
        values[TickField::Jump.index()] = f32::from(u8::from(jump));
        values[TickField::Fire.index()] = f32::from(u8::from(rng.gen_bool(0.1)));
        values[TickField::Hook.index()] = f32::from(u8::from(rng.gen_bool(0.2)));
        ticks.push(Tick::new(values));
    }
    ticks
}

fn main() -> Result<()> {
    env_logger::init();

    let output_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data/out"));

    let mut rng = ChaCha8Rng::seed_from_u64(42);

    let maps = ["Kobra", "Multeasymap", "Gores", "Tutorial"];
    let players = ["nameless tee", "brainless tee", "Cookie", "Pulsar", "kaffeemaschine"];

    let mut sequences = Vec::new();
    let mut sequence_id: i64 = 0;
    for (map_idx, map) in maps.iter().enumerate() {
        // fewer sessions on later maps so the per-map counts differ
        let sessions = 12 - map_idx * 3;
        for _ in 0..sessions {
            let player = players[rng.gen_range(0..players.len())];
            let len = rng.gen_range(50..=600);
            let spawn = (rng.gen_range(100.0..3000.0), rng.gen_range(500.0..1500.0));
            let start_tick = rng.gen_range(0..50_000u64);

            let seq = Sequence::new(start_tick, generate_ticks(&mut rng, len, spawn), player)
                .context("generated an empty sequence")?
                .with_columnar_meta(sequence_id, *map);
            sequences.push(seq);
            sequence_id += 1;
        }
    }

    let store = SequenceStore::new(sequences);

    write_columnar(&store, &output_dir, ColumnarFormat::Arrow).context("writing arrow tables")?;
    write_packed(&store, &output_dir.join("all_sequences.msgpack"))
        .context("writing msgpack file")?;
    write_meta_csv(&store, &output_dir.join("meta.csv")).context("writing meta.csv")?;

    println!(
        "Wrote {} sequences ({} ticks) to {}",
        store.as_slice().len(),
        store.iter().map(Sequence::tick_count).sum::<usize>(),
        output_dir.display()
    );
    Ok(())
}
