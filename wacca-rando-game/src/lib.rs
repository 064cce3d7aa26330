use anyhow::{Context, Result, bail};
use hashbrown::{HashMap, HashSet};
use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};
use std::borrow::ToOwned;
use std::fs::File;
use std::hash::Hash;
use std::path::Path;
use strum_macros::{EnumString, VariantNames};

pub type ItemId = usize; // Item code sent to the client (song id, or PROGRESSION_ITEM_ID)
pub type LocationId = usize; // Location code: two per song, assigned pairwise in catalog order

pub const PROGRESSION_ITEM_NAME: &str = "Wedge";
pub const PROGRESSION_ITEM_ID: ItemId = 1;

// Difficulty constants span 1 through 15; the window search may not widen past these.
pub const DIFFICULTY_FLOOR: i32 = 1;
pub const DIFFICULTY_CEILING: i32 = 15;

#[derive(Default, Clone)]
pub struct IndexedVec<T: Hash + Eq> {
    pub keys: Vec<T>,
    pub index_by_key: HashMap<T, usize>,
}

impl<T: Hash + Eq> IndexedVec<T> {
    pub fn add<U: ToOwned<Owned = T> + ?Sized>(&mut self, name: &U) -> usize {
        if !self.index_by_key.contains_key(&name.to_owned()) {
            let idx = self.keys.len();
            self.index_by_key.insert(name.to_owned(), self.keys.len());
            self.keys.push(name.to_owned());
            idx
        } else {
            self.index_by_key[&name.to_owned()]
        }
    }
}

// Note: the discriminants are significant; they match the hundreds digit of
// the raw song version (e.g. version 304 is a Reverse song).
#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumString,
    VariantNames,
    TryFromPrimitive,
    Serialize,
    Deserialize,
    PartialOrd,
    Ord,
)]
#[repr(usize)]
pub enum GameVersion {
    #[serde(rename = "WACCA")]
    #[strum(serialize = "WACCA")]
    Wacca = 1,
    Lily = 2,
    Reverse = 3,
    Plus = 4,
}

impl GameVersion {
    pub fn from_song_version(version: i32) -> Option<GameVersion> {
        GameVersion::try_from((version / 100) as usize).ok()
    }
}

/// A half-open difficulty interval `[min, upper_bound)`. The upper bound is
/// derived from the integer `max`: "+"-rated charts sit in the decimal range
/// x.6 to x.9, so including them pushes the bound to `max + 1.0` while
/// excluding them caps it at `max + 0.7`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DifficultyWindow {
    pub min: i32,
    pub max: i32,
    pub max_includes_plus: bool,
}

impl DifficultyWindow {
    pub fn upper_bound(&self) -> f32 {
        if self.max_includes_plus {
            self.max as f32 + 1.0
        } else {
            self.max as f32 + 0.7
        }
    }

    pub fn contains(&self, rating: f32) -> bool {
        rating >= self.min as f32 && rating < self.upper_bound()
    }

    /// Widens the window by one step, preferring to raise the ceiling before
    /// lowering the floor. Returns false when the window already spans the
    /// full difficulty domain.
    pub fn widen(&mut self) -> bool {
        if self.max < DIFFICULTY_CEILING {
            self.max += 1;
            true
        } else if self.min > DIFFICULTY_FLOOR {
            self.min -= 1;
            true
        } else {
            false
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SongData {
    pub name: String,
    pub song_id: ItemId,
    pub version: i32,
    pub normal: f32,
    pub hard: f32,
    pub expert: f32,
    pub inferno: Option<f32>,
}

impl SongData {
    fn difficulty_ratings(&self) -> [Option<f32>; 4] {
        [
            Some(self.normal),
            Some(self.hard),
            Some(self.expert),
            self.inferno,
        ]
    }
}

/// The immutable song table. Constructed once and passed by reference into
/// each generation call; generation never mutates it.
#[derive(Default, Clone)]
pub struct SongCatalog {
    pub songs: Vec<SongData>,
    pub song_isv: IndexedVec<String>,
    pub item_names_to_id: HashMap<String, ItemId>,
    pub location_names_to_id: HashMap<String, LocationId>,
}

impl SongCatalog {
    pub fn new(songs: Vec<SongData>) -> Result<SongCatalog> {
        let mut catalog = SongCatalog {
            songs,
            ..SongCatalog::default()
        };
        catalog
            .item_names_to_id
            .insert(PROGRESSION_ITEM_NAME.to_string(), PROGRESSION_ITEM_ID);

        let mut location_id_index = PROGRESSION_ITEM_ID;
        for song in &catalog.songs {
            if catalog.item_names_to_id.contains_key(&song.name) {
                bail!("duplicate song name in catalog: {}", song.name);
            }
            catalog.song_isv.add(&song.name);
            catalog
                .item_names_to_id
                .insert(song.name.clone(), song.song_id);
            catalog
                .location_names_to_id
                .insert(format!("{}-0", song.name), location_id_index);
            catalog
                .location_names_to_id
                .insert(format!("{}-1", song.name), location_id_index + 1);
            location_id_index += 2;
        }
        Ok(catalog)
    }

    pub fn load(path: &Path) -> Result<SongCatalog> {
        let file = File::open(path)
            .with_context(|| format!("unable to open song catalog at {}", path.display()))?;
        let songs: Vec<SongData> = serde_json::from_reader(file)
            .with_context(|| format!("unable to parse song catalog at {}", path.display()))?;
        SongCatalog::new(songs)
    }

    pub fn song_data(&self, name: &str) -> Option<&SongData> {
        self.song_isv
            .index_by_key
            .get(name)
            .map(|&idx| &self.songs[idx])
    }

    /// Returns the names of all songs matching the filter settings, in
    /// catalog order. A song qualifies if its version belongs to one of the
    /// opted-in game versions and at least one of its charts has a difficulty
    /// rating inside the window. Songs without an Inferno chart are only
    /// matched on their first three charts.
    pub fn filter_songs(
        &self,
        versions: &HashSet<GameVersion>,
        window: &DifficultyWindow,
    ) -> Vec<String> {
        let mut filtered_list: Vec<String> = vec![];
        for song in &self.songs {
            let in_version = GameVersion::from_song_version(song.version)
                .is_some_and(|v| versions.contains(&v));
            if !in_version {
                continue;
            }
            let in_window = song
                .difficulty_ratings()
                .into_iter()
                .flatten()
                .any(|rating| window.contains(rating));
            if in_window {
                filtered_list.push(song.name.clone());
            }
        }
        filtered_list
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(name: &str, song_id: ItemId, version: i32, charts: [f32; 3]) -> SongData {
        SongData {
            name: name.to_string(),
            song_id,
            version,
            normal: charts[0],
            hard: charts[1],
            expert: charts[2],
            inferno: None,
        }
    }

    #[test]
    fn test_window_bounds() {
        let plus = DifficultyWindow {
            min: 12,
            max: 13,
            max_includes_plus: true,
        };
        assert!(plus.contains(13.9));
        assert!(!plus.contains(14.0));
        assert!(plus.contains(12.0));
        assert!(!plus.contains(11.9));

        let no_plus = DifficultyWindow {
            min: 12,
            max: 13,
            max_includes_plus: false,
        };
        assert!(no_plus.contains(13.6));
        assert!(!no_plus.contains(13.7));
    }

    #[test]
    fn test_window_widens_ceiling_first() {
        let mut window = DifficultyWindow {
            min: 12,
            max: 13,
            max_includes_plus: true,
        };
        while window.max < DIFFICULTY_CEILING {
            assert!(window.widen());
            assert_eq!(window.min, 12);
        }
        assert!(window.widen());
        assert_eq!((window.min, window.max), (11, 15));
        while window.min > DIFFICULTY_FLOOR {
            assert!(window.widen());
        }
        assert!(!window.widen());
        assert_eq!((window.min, window.max), (1, 15));
    }

    #[test]
    fn test_filter_versions_and_window() {
        let catalog = SongCatalog::new(vec![
            song("a", 10, 104, [6.0, 9.0, 12.5]),
            song("b", 11, 205, [5.0, 8.0, 13.2]),
            song("c", 12, 301, [4.0, 7.0, 11.0]),
            SongData {
                inferno: Some(13.5),
                ..song("d", 13, 102, [3.0, 6.0, 9.0])
            },
        ])
        .unwrap();
        let versions: HashSet<GameVersion> =
            [GameVersion::Wacca, GameVersion::Lily].into_iter().collect();
        let window = DifficultyWindow {
            min: 12,
            max: 13,
            max_includes_plus: true,
        };
        // "c" is filtered by version, "d" matches only through its Inferno chart.
        assert_eq!(
            catalog.filter_songs(&versions, &window),
            vec!["a".to_string(), "b".to_string(), "d".to_string()]
        );
    }

    #[test]
    fn test_filter_skips_absent_inferno() {
        let catalog = SongCatalog::new(vec![song("a", 10, 101, [3.0, 6.0, 9.0])]).unwrap();
        let versions: HashSet<GameVersion> = [GameVersion::Wacca].into_iter().collect();
        let window = DifficultyWindow {
            min: 12,
            max: 13,
            max_includes_plus: true,
        };
        assert!(catalog.filter_songs(&versions, &window).is_empty());
    }

    #[test]
    fn test_location_ids_pairwise() {
        let catalog = SongCatalog::new(vec![
            song("a", 10, 101, [3.0, 6.0, 9.0]),
            song("b", 11, 101, [3.0, 6.0, 9.0]),
        ])
        .unwrap();
        assert_eq!(catalog.location_names_to_id["a-0"], 1);
        assert_eq!(catalog.location_names_to_id["a-1"], 2);
        assert_eq!(catalog.location_names_to_id["b-0"], 3);
        assert_eq!(catalog.location_names_to_id["b-1"], 4);
        assert_eq!(catalog.item_names_to_id[PROGRESSION_ITEM_NAME], 1);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        assert!(
            SongCatalog::new(vec![
                song("a", 10, 101, [3.0, 6.0, 9.0]),
                song("a", 11, 102, [3.0, 6.0, 9.0]),
            ])
            .is_err()
        );
    }
}
