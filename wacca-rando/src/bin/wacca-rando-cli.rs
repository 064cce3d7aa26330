use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use rand::{RngCore, SeedableRng};
use std::path::PathBuf;
use wacca_rando::randomize::Randomizer;
use wacca_rando::settings::{parse_randomizer_settings, validate_settings};
use wacca_rando_game::SongCatalog;

#[derive(Parser)]
struct Args {
    #[arg(long)]
    catalog: PathBuf,

    #[arg(long)]
    settings: Option<PathBuf>,

    #[arg(long)]
    random_seed: Option<usize>,

    #[arg(long)]
    output_summary: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = Args::parse();
    let catalog = SongCatalog::load(&args.catalog)?;
    info!("{} songs in catalog", catalog.songs.len());

    let settings_str = match &args.settings {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("unable to read settings at {}", path.display()))?,
        None => include_str!("../../../data/presets/default.json").to_string(),
    };
    let settings = parse_randomizer_settings(&settings_str)?;
    validate_settings(&settings, &catalog)?;

    let root_seed = match args.random_seed.or(settings.other_settings.random_seed) {
        Some(seed) => seed,
        None => (rand::rngs::StdRng::from_entropy().next_u64() & 0xFFFFFFFF) as usize,
    };
    info!("random seed: {root_seed}");
    let mut rng_seed = [0u8; 32];
    rng_seed[..8].copy_from_slice(&root_seed.to_le_bytes());
    let mut rng = rand::rngs::StdRng::from_seed(rng_seed);

    let randomizer = Randomizer::new(&catalog, &settings);
    let randomization = randomizer.randomize(&mut rng)?;
    info!(
        "goal song: {}; {} Wedges in pool, {} needed to win; {} items across {} locations",
        randomization.pool.victory_song,
        randomization.progression_count,
        randomization.win_condition.tokens_needed,
        randomization.item_pool.len(),
        randomization.root_region.locations.len()
    );

    let summary_str = serde_json::to_string_pretty(&randomization)?;
    match &args.output_summary {
        Some(path) => {
            println!("Writing slot summary to {}", path.display());
            std::fs::write(path, summary_str)
                .with_context(|| format!("unable to write summary to {}", path.display()))?;
        }
        None => println!("{summary_str}"),
    }
    Ok(())
}
