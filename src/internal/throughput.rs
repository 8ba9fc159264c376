#![allow(clippy::missing_docs_in_private_items)]
#![allow(clippy::cast_precision_loss)]

//! Throughput driver: inserts a key sequence into both directories, looks
//! every key up again and reports the elapsed wall-clock time.

use std::{
    error::Error,
    fmt::Display,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use clap::{Parser, ValueEnum};
use dynhash::{BitKey, Config, DEFAULT_MAX_DEPTH, ExtendibleHashMap, HashIndex, LinearHashMap};
use plotters::prelude::*;
use rand::{Rng, SeedableRng, rngs::StdRng};

// workload 2 of the classic textbook exercise, 8-bit keys A..N
const REFERENCE_KEYS: [u8; 14] = [25, 7, 5, 6, 20, 8, 3, 30, 17, 13, 21, 28, 12, 31];

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Workload {
    /// `scale` uniformly random 64-bit keys
    Random,
    /// The fixed 14-key, 8-bit reference sequence
    Reference,
}

/// Insert/find throughput of extendible and linear hashing
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Number of keys of the random workload
    #[arg(default_value_t = 100)]
    scale: usize,

    /// Key sequence to run
    #[arg(long, value_enum, default_value_t = Workload::Random)]
    workload: Workload,

    /// Seed of the random workload
    #[arg(long, default_value_t = 99)]
    seed: u64,

    /// Initial global depth of the extendible directory
    #[arg(long, default_value_t = 3)]
    start_depth: u32,

    /// Largest global depth of the extendible directory
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: u32,

    /// Load factor threshold of the linear directory
    #[arg(long, default_value_t = 0.8)]
    threshold: f64,

    /// Records per bucket
    #[arg(long, default_value_t = 3)]
    bucket_capacity: usize,

    /// Print the directories after the insert phase
    #[arg(long)]
    dump: bool,

    /// Sweep the random workload and draw the throughput curves to this PNG
    #[arg(long)]
    plot: Option<PathBuf>,

    /// Number of sweep points for --plot
    #[arg(long, default_value_t = 8)]
    steps: usize,
}

#[derive(Debug, Clone, Copy)]
struct Timing {
    insert: Duration,
    find: Duration,
    misses: usize,
}

#[derive(Debug, Clone, Copy)]
struct Sample {
    keys: usize,
    extendible: Timing,
    linear: Timing,
}

fn mops(count: usize, elapsed: Duration) -> f64 {
    count as f64 / elapsed.as_secs_f64().max(1e-9) / 1e6
}

fn put_throughput<K, I>(index: &mut I, keys: &[K]) -> dynhash::Result<Duration>
where
    K: BitKey,
    I: HashIndex<K, K>,
{
    let start = Instant::now();
    for &key in keys {
        index.insert(key, key)?;
    }
    Ok(start.elapsed())
}

fn get_throughput<K, I>(index: &I, keys: &[K]) -> (Duration, usize)
where
    K: BitKey,
    I: HashIndex<K, K>,
{
    let start = Instant::now();
    let mut misses = 0usize;
    for key in keys {
        if index.get(key).is_none() {
            log::warn!("key {key} not found");
            misses = misses.saturating_add(1);
        }
    }
    (start.elapsed(), misses)
}

fn run<K, I>(name: &str, mut index: I, keys: &[K], dump: bool) -> dynhash::Result<Timing>
where
    K: BitKey,
    I: HashIndex<K, K> + Display,
{
    let insert = put_throughput(&mut index, keys)?;
    if dump {
        print!("{index}");
    }
    let (find, misses) = get_throughput(&index, keys);

    println!(
        "{name:<10} {:>8} keys  insert {insert:>12.3?} ({:>7.2} Mops/s)  find {find:>12.3?} ({:>7.2} Mops/s)  misses {misses}",
        keys.len(),
        mops(keys.len(), insert),
        mops(keys.len(), find),
    );
    Ok(Timing { insert, find, misses })
}

fn run_both<K: BitKey>(keys: &[K], config: Config, dump: bool) -> dynhash::Result<Sample> {
    let extendible = ExtendibleHashMap::<K, K>::with_config(config)?;
    let extendible = run("extendible", extendible, keys, dump)?;
    let linear = run("linear", LinearHashMap::<K, K>::with_config(config)?, keys, dump)?;
    Ok(Sample { keys: keys.len(), extendible, linear })
}

fn random_keys(scale: usize, seed: u64) -> Vec<u64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..scale).map(|_| rng.random::<u64>()).collect()
}

fn sweep(keys: &[u64], config: Config, steps: usize) -> dynhash::Result<Vec<Sample>> {
    let steps = steps.max(1);
    (1..=steps)
        .map(|step| {
            let count = keys.len().saturating_mul(step) / steps;
            run_both(keys.get(..count).unwrap_or(keys), config, false)
        })
        .collect()
}

fn plot(path: &Path, samples: &[Sample]) -> Result<(), Box<dyn Error>> {
    let curve = |timing: fn(&Sample) -> Duration| -> Vec<(usize, f64)> {
        samples.iter().map(|s| (s.keys, mops(s.keys, timing(s)))).collect()
    };
    let curves = [
        ("extendible insert", RGBColor(220, 50, 50), curve(|s| s.extendible.insert)),
        ("extendible find", RGBColor(180, 50, 180), curve(|s| s.extendible.find)),
        ("linear insert", RGBColor(50, 90, 220), curve(|s| s.linear.insert)),
        ("linear find", RGBColor(50, 180, 50), curve(|s| s.linear.find)),
    ];

    let max_keys = samples.iter().map(|s| s.keys).max().unwrap_or(1).max(1);
    let peak = curves
        .iter()
        .flat_map(|(_, _, points)| points.iter().map(|&(_, y)| y))
        .fold(0.0, f64::max);
    let max_mops = (peak * 1.1).max(f64::EPSILON); // Add 10% margin

    let font_family = "sans-serif";
    let root = BitMapBackend::new(path, (1200, 800)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Dynamic Hashing Throughput", (font_family, 35))
        .margin(15)
        .x_label_area_size(60)
        .y_label_area_size(60)
        .right_y_label_area_size(10)
        .build_cartesian_2d(0..max_keys, 0.0..max_mops)?;

    chart
        .configure_mesh()
        .x_desc("Number of Keys")
        .y_desc("Throughput (Mops/s)")
        .axis_desc_style((font_family, 16))
        .draw()?;

    for (name, color, points) in &curves {
        let line_style = ShapeStyle::from(color).stroke_width(2);
        chart
            .draw_series(LineSeries::new(points.iter().copied(), line_style))?
            .label(*name)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], line_style));
        chart.draw_series(points.iter().map(|&point| Circle::new(point, 4, color.filled())))?;
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .position(SeriesLabelPosition::UpperRight)
        .draw()?;

    root.present()?;
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_default_env().init();
    let args = Args::parse();

    let config = Config::new()
        .bucket_capacity(args.bucket_capacity)
        .initial_depth(args.start_depth)
        .max_depth(args.max_depth)
        .load_factor_threshold(args.threshold);
    config.validate()?;

    match args.workload {
        Workload::Reference => {
            let sample = run_both(&REFERENCE_KEYS, config, args.dump)?;
            if sample.extendible.misses > 0 || sample.linear.misses > 0 {
                return Err("reference workload lost keys".into());
            }
        }
        Workload::Random => {
            let keys = random_keys(args.scale, args.seed);
            run_both(&keys, config, args.dump)?;

            if let Some(path) = &args.plot {
                let samples = sweep(&keys, config, args.steps)?;
                plot(path, &samples)?;
                println!("Generated throughput plot: {}", path.display());
            }
        }
    }

    Ok(())
}
