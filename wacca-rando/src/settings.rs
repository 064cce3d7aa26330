use anyhow::{Result, bail};
use hashbrown::HashSet;
use serde::{Deserialize, Serialize};
use strum::VariantNames;
use wacca_rando_game::{DIFFICULTY_CEILING, DIFFICULTY_FLOOR, GameVersion, SongCatalog};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RandomizerSettings {
    pub name: Option<String>,
    pub song_selection_settings: SongSelectionSettings,
    pub item_progression_settings: ItemProgressionSettings,
    pub other_settings: OtherSettings,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SongSelectionSettings {
    pub game_versions: Vec<GameVersion>,
    pub difficulty_min: i32,
    pub difficulty_max: i32,
    pub max_include_plus: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ItemProgressionSettings {
    /// The number of songs unlocked from the start.
    pub starting_song_count: usize,
    /// The number of songs placed in the randomization pool, not counting
    /// starting songs or the goal song. The final count may be lower if not
    /// enough songs match the selection settings.
    pub additional_song_count: usize,
    /// Wedges added to the pool, as a percentage of the selected song count.
    pub progression_count_percentage: i32,
    /// Percentage of the Wedges in the pool needed to unlock the goal song.
    pub progression_win_count_percentage: i32,
    /// Songs the player already owns. These skip the candidate search and
    /// count toward the starting song target.
    #[serde(default)]
    pub start_inventory: Vec<String>,
    /// Songs forced into the randomization pool.
    #[serde(default)]
    pub include_songs: Vec<String>,
    /// A fixed goal song, if the player wants one.
    #[serde(default)]
    pub victory_song: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct OtherSettings {
    #[serde(default)]
    pub grade_needed: GradeNeeded,
    #[serde(default)]
    pub death_link: bool,
    #[serde(default)]
    pub random_seed: Option<usize>,
}

// Discriminants are the client's grade scale (SS sits at 9, not 2).
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub enum GradeNeeded {
    #[default]
    AnyClear = 0,
    S = 7,
    SPlus = 8,
    SS = 9,
    SSPlus = 10,
    SSS = 11,
    SSSPlus = 12,
}

impl GradeNeeded {
    pub fn value(&self) -> i32 {
        *self as i32
    }
}

pub fn parse_randomizer_settings(settings_json: &str) -> Result<RandomizerSettings> {
    let mut des = serde_json::Deserializer::from_str(settings_json);
    let settings = serde_path_to_error::deserialize(&mut des)?;
    Ok(settings)
}

/// Rejects settings that could never produce a sensible randomization. Plando
/// song names must refer to catalog songs and no song may be assigned more
/// than one role; `start_inventory` is exempt from the name check because the
/// host's start inventory can also carry non-song items.
pub fn validate_settings(settings: &RandomizerSettings, catalog: &SongCatalog) -> Result<()> {
    let sel = &settings.song_selection_settings;
    if sel.game_versions.is_empty() {
        bail!(
            "at least one game version must be selected ({})",
            GameVersion::VARIANTS.join(", ")
        );
    }
    for bound in [sel.difficulty_min, sel.difficulty_max] {
        if !(DIFFICULTY_FLOOR..=DIFFICULTY_CEILING).contains(&bound) {
            bail!(
                "difficulty bounds must be between {DIFFICULTY_FLOOR} and {DIFFICULTY_CEILING}, got {bound}"
            );
        }
    }
    if sel.difficulty_min > sel.difficulty_max {
        bail!(
            "difficulty_min ({}) must not exceed difficulty_max ({})",
            sel.difficulty_min,
            sel.difficulty_max
        );
    }

    let prog = &settings.item_progression_settings;
    if !(3..=10).contains(&prog.starting_song_count) {
        bail!(
            "starting_song_count must be between 3 and 10, got {}",
            prog.starting_song_count
        );
    }
    if !(15..=600).contains(&prog.additional_song_count) {
        bail!(
            "additional_song_count must be between 15 and 600, got {}",
            prog.additional_song_count
        );
    }
    if !(10..=40).contains(&prog.progression_count_percentage) {
        bail!(
            "progression_count_percentage must be between 10 and 40, got {}",
            prog.progression_count_percentage
        );
    }
    if !(50..=100).contains(&prog.progression_win_count_percentage) {
        bail!(
            "progression_win_count_percentage must be between 50 and 100, got {}",
            prog.progression_win_count_percentage
        );
    }

    for name in prog
        .include_songs
        .iter()
        .chain(prog.victory_song.iter())
    {
        if catalog.song_data(name).is_none() {
            bail!("unknown song in plando settings: {name}");
        }
    }
    let mut assigned: HashSet<&str> = HashSet::new();
    for name in prog
        .start_inventory
        .iter()
        .filter(|name| catalog.song_data(name.as_str()).is_some())
        .chain(prog.include_songs.iter())
        .chain(prog.victory_song.iter())
    {
        if !assigned.insert(name.as_str()) {
            bail!("song assigned more than one plando role: {name}");
        }
    }
    Ok(())
}
