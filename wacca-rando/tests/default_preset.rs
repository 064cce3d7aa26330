use std::path::Path;

use anyhow::{Context, Result};
use rand::SeedableRng;
use rand::rngs::StdRng;
use wacca_rando::randomize::Randomizer;
use wacca_rando::settings::{GradeNeeded, parse_randomizer_settings, validate_settings};
use wacca_rando_game::SongCatalog;

/// The shipped default preset must parse, validate against the shipped
/// catalog, and generate without widening headroom problems.
#[test]
fn test_default_preset_generates() -> Result<()> {
    let catalog = SongCatalog::load(Path::new("../data/songs.json"))
        .context("unable to load shipped song catalog")?;
    let settings_str = std::fs::read_to_string("../data/presets/default.json")
        .context("unable to load default preset")?;
    let settings = parse_randomizer_settings(&settings_str)?;
    validate_settings(&settings, &catalog)?;

    assert_eq!(settings.item_progression_settings.starting_song_count, 5);
    assert_eq!(settings.item_progression_settings.additional_song_count, 40);
    assert_eq!(settings.other_settings.grade_needed, GradeNeeded::AnyClear);

    let mut rng = StdRng::seed_from_u64(2);
    let randomization = Randomizer::new(&catalog, &settings).randomize(&mut rng)?;
    assert_eq!(
        randomization.root_region.locations.len(),
        randomization.item_pool.len()
    );
    assert_eq!(randomization.summary.grade_needed, 0);
    assert!(!randomization.summary.death_link);
    Ok(())
}

#[test]
fn test_settings_parse_error_names_the_field() {
    let err = parse_randomizer_settings("{\"name\": null}").unwrap_err();
    assert!(err.to_string().contains("song_selection_settings"));
}
