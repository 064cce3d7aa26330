use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

/// Host-supplied view of which items a player currently holds. Unlock gates
/// and the win condition are evaluated against this capability; the
/// randomizer itself never tracks ownership state.
pub trait OwnershipQuery {
    fn item_count(&self, item_name: &str) -> usize;

    fn has(&self, item_name: &str) -> bool {
        self.item_count(item_name) > 0
    }
}

/// A counted bag of collected items. Duplicate song unlocks and progression
/// tokens stack, so this is a count per name rather than a flag set.
#[derive(Clone, Debug, Default)]
pub struct Inventory {
    pub counts: HashMap<String, usize>,
}

impl Inventory {
    pub fn new() -> Inventory {
        Inventory::default()
    }

    pub fn collect(&mut self, item_name: &str) {
        *self.counts.entry(item_name.to_string()).or_insert(0) += 1;
    }
}

impl OwnershipQuery for Inventory {
    fn item_count(&self, item_name: &str) -> usize {
        self.counts.get(item_name).copied().unwrap_or(0)
    }
}

/// Access gate for a song's two locations: the player must hold that song's
/// own unlock item. The song name is stored by value at creation time so
/// gates never alias across songs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongGate {
    pub song_name: String,
}

impl SongGate {
    pub fn is_open(&self, state: &impl OwnershipQuery) -> bool {
        state.has(&self.song_name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinCondition {
    pub token_name: String,
    pub tokens_needed: usize,
}

impl WinCondition {
    pub fn is_met(&self, state: &impl OwnershipQuery) -> bool {
        state.item_count(&self.token_name) >= self.tokens_needed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_requires_own_song() {
        let gate = SongGate {
            song_name: "Quon".to_string(),
        };
        let mut inventory = Inventory::new();
        inventory.collect("GENOCIDER");
        assert!(!gate.is_open(&inventory));
        inventory.collect("Quon");
        assert!(gate.is_open(&inventory));
    }

    #[test]
    fn test_win_condition_counts_copies() {
        let win = WinCondition {
            token_name: "Wedge".to_string(),
            tokens_needed: 3,
        };
        let mut inventory = Inventory::new();
        inventory.collect("Wedge");
        inventory.collect("Wedge");
        assert!(!win.is_met(&inventory));
        inventory.collect("Wedge");
        assert!(win.is_met(&inventory));
    }
}
