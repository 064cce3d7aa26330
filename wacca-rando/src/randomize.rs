use anyhow::{Context, Result, bail};
use hashbrown::HashSet;
use log::info;
use rand::{Rng, seq::SliceRandom};
use serde::{Deserialize, Serialize};
use std::cmp::max;
use wacca_rando_game::{
    DifficultyWindow, GameVersion, ItemId, LocationId, PROGRESSION_ITEM_ID, PROGRESSION_ITEM_NAME,
    SongCatalog,
};
use wacca_rando_logic::{SongGate, WinCondition};

use crate::settings::RandomizerSettings;

// The minimum pool left over after starting songs are taken: ten interim
// songs plus the goal song.
pub const MIN_POOL_HEADROOM: usize = 11;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemClassification {
    /// A song unlock required to reach its two locations.
    Progression,
    /// A Wedge: progression currency the item balancer should not move early.
    ProgressionSkipBalancing,
    /// A duplicate song unlock padding out the pool; nice to have, never required.
    Useful,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PoolItem {
    pub name: String,
    pub item_id: ItemId,
    pub classification: ItemClassification,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SongLocation {
    pub name: String,
    pub location_id: LocationId,
    pub gate: SongGate,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub name: String,
    pub locations: Vec<SongLocation>,
}

/// The selected songs, split by role. `victory_song` belongs to neither list
/// and gets no locations; it exists only to anchor the win condition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SongPool {
    pub starting_songs: Vec<String>,
    pub included_songs: Vec<String>,
    pub victory_song: String,
    pub location_count: usize,
}

/// Echoed option values and computed goals, handed to the game client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotSummary {
    pub victory_location: String,
    pub death_link: bool,
    pub progression_win_count: usize,
    pub grade_needed: i32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Randomization {
    pub pool: SongPool,
    pub progression_count: usize,
    pub item_pool: Vec<PoolItem>,
    /// One unlock per starting song, pre-collected by the host rather than
    /// placed in the pool.
    pub starting_items: Vec<PoolItem>,
    pub root_region: Region,
    pub win_condition: WinCondition,
    pub summary: SlotSummary,
}

/// Songs whose roles were fixed by the player before randomization.
#[derive(Clone, Debug, Default)]
struct PlandoSongs {
    starting: Vec<String>,
    included: Vec<String>,
    victory: Option<String>,
}

pub fn get_progression_count(settings: &RandomizerSettings, pool: &SongPool) -> usize {
    let percentage = settings.item_progression_settings.progression_count_percentage as usize;
    let song_count = pool.starting_songs.len() + pool.included_songs.len();
    max(1, song_count * percentage / 100)
}

pub fn get_progression_win_count(
    settings: &RandomizerSettings,
    progression_count: usize,
) -> usize {
    let percentage = settings
        .item_progression_settings
        .progression_win_count_percentage as usize;
    max(1, progression_count * percentage / 100)
}

pub struct Randomizer<'r> {
    pub catalog: &'r SongCatalog,
    pub settings: &'r RandomizerSettings,
}

impl<'r> Randomizer<'r> {
    pub fn new(catalog: &'r SongCatalog, settings: &'r RandomizerSettings) -> Randomizer<'r> {
        Randomizer { catalog, settings }
    }

    /// Runs the full generation for one player: candidate search, pool
    /// partition, item pool construction, and location wiring, drawing all
    /// randomness from the supplied stream. The draw order is fixed, so a
    /// fixed seed and fixed inputs always produce the same output.
    pub fn randomize<R: Rng>(&self, rng: &mut R) -> Result<Randomization> {
        let plando = self.get_plando_songs();
        let candidates = self.select_songs(&plando)?;
        let pool = self.create_song_pool(candidates, plando, rng)?;
        info!(
            "selected {} starting songs, {} pool songs, goal song {:?}",
            pool.starting_songs.len(),
            pool.included_songs.len(),
            pool.victory_song
        );

        let progression_count = get_progression_count(self.settings, &pool);
        let item_pool = self.create_items(&pool, progression_count, rng);
        let starting_items: Vec<PoolItem> = pool
            .starting_songs
            .iter()
            .map(|song| self.create_song_item(song, ItemClassification::Progression))
            .collect();
        let root_region = self.create_locations(&pool, rng);

        let progression_win_count = get_progression_win_count(self.settings, progression_count);
        let win_condition = WinCondition {
            token_name: PROGRESSION_ITEM_NAME.to_string(),
            tokens_needed: progression_win_count,
        };
        let summary = SlotSummary {
            victory_location: pool.victory_song.clone(),
            death_link: self.settings.other_settings.death_link,
            progression_win_count,
            grade_needed: self.settings.other_settings.grade_needed.value(),
        };
        Ok(Randomization {
            pool,
            progression_count,
            item_pool,
            starting_items,
            root_region,
            win_condition,
            summary,
        })
    }

    fn get_plando_songs(&self) -> PlandoSongs {
        let prog = &self.settings.item_progression_settings;
        PlandoSongs {
            // The start inventory may carry items other than songs; only
            // songs participate in the partition.
            starting: prog
                .start_inventory
                .iter()
                .filter(|name| self.catalog.song_data(name.as_str()).is_some())
                .cloned()
                .collect(),
            included: prog.include_songs.clone(),
            victory: prog.victory_song.clone(),
        }
    }

    /// Widens the difficulty window until enough songs qualify to fill the
    /// starting slots plus the minimum pool, or fails once the window spans
    /// the whole difficulty domain.
    fn select_songs(&self, plando: &PlandoSongs) -> Result<Vec<String>> {
        let sel = &self.settings.song_selection_settings;
        let versions: HashSet<GameVersion> = sel.game_versions.iter().copied().collect();
        let mut window = DifficultyWindow {
            min: sel.difficulty_min,
            max: sel.difficulty_max,
            max_includes_plus: sel.max_include_plus,
        };
        let excluded: HashSet<&str> = plando
            .starting
            .iter()
            .chain(plando.included.iter())
            .chain(plando.victory.iter())
            .map(|name| name.as_str())
            .collect();
        let starting_song_count = self.settings.item_progression_settings.starting_song_count;
        let count_needed_for_start =
            starting_song_count.saturating_sub(plando.starting.len());

        loop {
            let mut available = self.catalog.filter_songs(&versions, &window);
            available.retain(|name| !excluded.contains(name.as_str()));

            if available.len() + plando.included.len()
                >= count_needed_for_start + MIN_POOL_HEADROOM
            {
                return Ok(available);
            }

            if !window.widen() {
                bail!("failed to find enough songs, even with max difficulty");
            }
            info!(
                "{} matching songs is not enough; widening difficulty window to [{}, {})",
                available.len(),
                window.min,
                window.upper_bound()
            );
        }
    }

    /// Splits the candidates and pre-assigned songs into starting songs, pool
    /// songs, and the goal song. Targets that cannot be met leave the lists
    /// short rather than failing.
    fn create_song_pool<R: Rng>(
        &self,
        mut available: Vec<String>,
        plando: PlandoSongs,
        rng: &mut R,
    ) -> Result<SongPool> {
        let starting_song_count = self.settings.item_progression_settings.starting_song_count;
        let additional_song_count = self.settings.item_progression_settings.additional_song_count;
        let PlandoSongs {
            mut starting,
            mut included,
            mut victory,
        } = plando;

        available.shuffle(rng);

        if included.len() > additional_song_count {
            // The player guaranteed more pool songs than fit; thin the list,
            // taking the goal song and any missing starting songs from it
            // before dropping the rest.
            included.shuffle(rng);
            if victory.is_none() {
                victory = included.pop();
            }
            while included.len() > additional_song_count {
                let next_song = included.pop().context("pool unexpectedly empty")?;
                if starting.len() < starting_song_count {
                    starting.push(next_song);
                }
            }
        } else if victory.is_none() {
            // Choose a goal song uniformly from the remaining pre-assigned
            // and discovered songs combined.
            let chosen_song = rng.gen_range(0..available.len() + included.len());
            if chosen_song < included.len() {
                victory = Some(included.remove(chosen_song));
            } else {
                victory = Some(available.remove(chosen_song - included.len()));
            }
        } else if let Some(victory_song) = &victory {
            // A pre-assigned goal song must never double as a pool song.
            if let Some(idx) = available.iter().position(|name| name == victory_song) {
                available.remove(idx);
            }
        }

        while starting.len() < starting_song_count {
            if let Some(song) = available.pop().or_else(|| included.pop()) {
                starting.push(song);
            } else {
                break;
            }
        }

        while included.len() < additional_song_count {
            if let Some(song) = available.pop() {
                included.push(song);
            } else {
                break;
            }
        }

        let location_count = 2 * (starting.len() + included.len());
        Ok(SongPool {
            starting_songs: starting,
            included_songs: included,
            victory_song: victory.context("no victory song could be chosen")?,
            location_count,
        })
    }

    fn create_song_item(&self, song_name: &str, classification: ItemClassification) -> PoolItem {
        PoolItem {
            name: song_name.to_string(),
            item_id: self.catalog.item_names_to_id[song_name],
            classification,
        }
    }

    /// Builds the item pool to exactly match the number of locations: Wedges,
    /// then one unlock per pool song, then duplicate unlocks as filler.
    fn create_items<R: Rng>(
        &self,
        pool: &SongPool,
        progression_count: usize,
        rng: &mut R,
    ) -> Vec<PoolItem> {
        let mut item_pool: Vec<PoolItem> = vec![];
        for _ in 0..progression_count {
            item_pool.push(PoolItem {
                name: PROGRESSION_ITEM_NAME.to_string(),
                item_id: PROGRESSION_ITEM_ID,
                classification: ItemClassification::ProgressionSkipBalancing,
            });
        }
        for song in &pool.included_songs {
            item_pool.push(self.create_song_item(song, ItemClassification::Progression));
        }

        let mut items_left = pool
            .location_count
            .saturating_sub(progression_count + pool.included_songs.len());
        if items_left == 0 || pool.included_songs.is_empty() {
            return item_pool;
        }

        let mut song_keys_in_pool = pool.included_songs.clone();
        song_keys_in_pool.shuffle(rng);
        let mut i = 0;
        while items_left > 0 {
            let song = &song_keys_in_pool[i % song_keys_in_pool.len()];
            item_pool.push(self.create_song_item(song, ItemClassification::Useful));
            i += 1;
            items_left -= 1;
        }
        item_pool
    }

    /// Attaches two locations per selected song to the root region, each
    /// gated on that song's own unlock. Starting songs come first so they are
    /// first in line to get their locations; the goal song gets none.
    fn create_locations<R: Rng>(&self, pool: &SongPool, rng: &mut R) -> Region {
        let mut all_selected_songs = pool.starting_songs.clone();
        let mut included_song_copy = pool.included_songs.clone();
        included_song_copy.shuffle(rng);
        all_selected_songs.extend(included_song_copy);

        let mut locations: Vec<SongLocation> = vec![];
        for song_name in &all_selected_songs {
            for suffix in 0..2 {
                let location_name = format!("{song_name}-{suffix}");
                locations.push(SongLocation {
                    location_id: self.catalog.location_names_to_id[&location_name],
                    name: location_name,
                    gate: SongGate {
                        song_name: song_name.clone(),
                    },
                });
            }
        }
        Region {
            name: "Menu".to_string(),
            locations,
        }
    }
}
