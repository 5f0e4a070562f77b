//! Level-of-detail chains
//!
//! A chain binds the assets of one collection to distinct detail levels. It
//! keeps two indices over the same entries: an ordered map from level to asset
//! (which gives ascending iteration and O(log n) lookup by level) and a hash
//! map from asset to level (O(1) lookup by asset). Every mutation checks both
//! uniqueness rules before touching either index, so a rejected mutation
//! leaves the chain exactly as it was.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::error::{RegistryError, Result};
use crate::types::{AssetId, CollectionId, Level};

/// One asset bound to one level
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LodEntry {
    /// Detail level
    pub level: Level,
    /// Asset registered at this level
    pub asset_id: AssetId,
}

impl LodEntry {
    /// Create a new entry
    pub fn new(level: Level, asset_id: AssetId) -> Self {
        Self { level, asset_id }
    }
}

impl fmt::Display for LodEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{},{}}}", self.level, self.asset_id)
    }
}

/// Coarse state of a chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainState {
    /// No entries
    Empty,
    /// At least one entry
    Populated,
}

/// Outcome of a chain mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainChange {
    /// The chain already matched the request
    Unchanged,
    /// A new entry was added
    Inserted(LodEntry),
    /// An entry was removed
    Removed(LodEntry),
    /// An asset moved from one level to another
    Moved {
        asset_id: AssetId,
        from: Level,
        to: Level,
    },
    /// All entries were dropped
    Cleared {
        /// Number of entries removed
        removed: usize,
    },
}

impl ChainChange {
    /// Check whether the mutation left the chain untouched
    pub fn is_noop(&self) -> bool {
        matches!(
            self,
            ChainChange::Unchanged | ChainChange::Cleared { removed: 0 }
        )
    }
}

/// Serialized form of a chain: entries ascending by level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainRecord {
    /// Owning collection
    pub collection_id: CollectionId,
    /// Entries ascending by level
    #[serde(default)]
    pub entries: Vec<LodEntry>,
}

/// Ordered chain of LOD entries for one collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "ChainRecord", try_from = "ChainRecord")]
pub struct LodChain {
    collection_id: CollectionId,
    by_level: BTreeMap<Level, AssetId>,
    by_asset: HashMap<AssetId, Level>,
}

impl LodChain {
    /// Create an empty chain for a collection
    pub fn new(collection_id: CollectionId) -> Self {
        Self {
            collection_id,
            by_level: BTreeMap::new(),
            by_asset: HashMap::new(),
        }
    }

    /// Build a chain from entries in any order, enforcing uniqueness
    pub fn from_entries(
        collection_id: CollectionId,
        entries: impl IntoIterator<Item = LodEntry>,
    ) -> Result<Self> {
        let mut chain = Self::new(collection_id);
        for entry in entries {
            if let Some(occupant) = chain.by_level.get(&entry.level) {
                return Err(RegistryError::CorruptRecord(format!(
                    "level {} appears twice ({} and {})",
                    entry.level, occupant, entry.asset_id
                )));
            }
            if let Some(level) = chain.by_asset.get(&entry.asset_id) {
                return Err(RegistryError::CorruptRecord(format!(
                    "asset {} appears at levels {} and {}",
                    entry.asset_id, level, entry.level
                )));
            }
            chain.put(entry.level, entry.asset_id);
        }
        Ok(chain)
    }

    /// Owning collection
    pub fn collection_id(&self) -> &CollectionId {
        &self.collection_id
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.by_level.len()
    }

    /// Whether the chain has no entries
    pub fn is_empty(&self) -> bool {
        self.by_level.is_empty()
    }

    /// Current state
    pub fn state(&self) -> ChainState {
        if self.is_empty() {
            ChainState::Empty
        } else {
            ChainState::Populated
        }
    }

    /// Iterate entries ascending by level
    pub fn iter(&self) -> impl Iterator<Item = (Level, &AssetId)> + '_ {
        self.by_level.iter().map(|(level, asset)| (*level, asset))
    }

    /// Owned entries ascending by level
    pub fn entries(&self) -> Vec<LodEntry> {
        self.iter()
            .map(|(level, asset)| LodEntry::new(level, asset.clone()))
            .collect()
    }

    /// Asset registered at a level
    pub fn asset_at(&self, level: Level) -> Option<&AssetId> {
        self.by_level.get(&level)
    }

    /// Level of a registered asset
    pub fn level_of(&self, asset_id: &AssetId) -> Option<Level> {
        self.by_asset.get(asset_id).copied()
    }

    /// Whether the asset is registered
    pub fn contains_asset(&self, asset_id: &AssetId) -> bool {
        self.by_asset.contains_key(asset_id)
    }

    /// Entry with the lowest level
    pub fn first(&self) -> Option<LodEntry> {
        self.by_level
            .first_key_value()
            .map(|(level, asset)| LodEntry::new(*level, asset.clone()))
    }

    /// Entry with the highest level
    pub fn last(&self) -> Option<LodEntry> {
        self.by_level
            .last_key_value()
            .map(|(level, asset)| LodEntry::new(*level, asset.clone()))
    }

    /// Check whether `{level, asset}` can be registered
    ///
    /// Returns `Ok(false)` when the exact pair is already present and
    /// `Ok(true)` when it would be inserted.
    pub fn check_insert(&self, level: Level, asset_id: &AssetId) -> Result<bool> {
        match (self.by_level.get(&level), self.by_asset.get(asset_id)) {
            (Some(occupant), _) if occupant == asset_id => Ok(false),
            (Some(occupant), _) => Err(RegistryError::LevelOccupied {
                collection_id: self.collection_id.clone(),
                level,
                occupant: occupant.clone(),
            }),
            (None, Some(existing)) => Err(RegistryError::AssetAlreadyRegistered {
                collection_id: self.collection_id.clone(),
                asset_id: asset_id.clone(),
                level: *existing,
            }),
            (None, None) => Ok(true),
        }
    }

    /// Register an asset at a level
    pub fn insert(&mut self, level: Level, asset_id: AssetId) -> Result<ChainChange> {
        if !self.check_insert(level, &asset_id)? {
            return Ok(ChainChange::Unchanged);
        }
        self.put(level, asset_id.clone());
        Ok(ChainChange::Inserted(LodEntry::new(level, asset_id)))
    }

    /// Remove an asset; absent assets are not an error
    pub fn remove(&mut self, asset_id: &AssetId) -> ChainChange {
        match self.by_asset.remove(asset_id) {
            Some(level) => {
                self.by_level.remove(&level);
                ChainChange::Removed(LodEntry::new(level, asset_id.clone()))
            }
            None => ChainChange::Unchanged,
        }
    }

    /// Move a registered asset to another level in one step
    pub fn relevel(&mut self, asset_id: &AssetId, to: Level) -> Result<ChainChange> {
        let from = self
            .level_of(asset_id)
            .ok_or_else(|| RegistryError::AssetNotInChain {
                collection_id: self.collection_id.clone(),
                asset_id: asset_id.clone(),
            })?;

        if from == to {
            return Ok(ChainChange::Unchanged);
        }

        if let Some(occupant) = self.by_level.get(&to) {
            return Err(RegistryError::LevelOccupied {
                collection_id: self.collection_id.clone(),
                level: to,
                occupant: occupant.clone(),
            });
        }

        self.by_level.remove(&from);
        self.put(to, asset_id.clone());
        Ok(ChainChange::Moved {
            asset_id: asset_id.clone(),
            from,
            to,
        })
    }

    /// Drop every entry
    pub fn clear(&mut self) -> ChainChange {
        let removed = self.len();
        self.by_level.clear();
        self.by_asset.clear();
        ChainChange::Cleared { removed }
    }

    /// Convert into the serialized record
    pub fn to_record(&self) -> ChainRecord {
        ChainRecord {
            collection_id: self.collection_id.clone(),
            entries: self.entries(),
        }
    }

    fn put(&mut self, level: Level, asset_id: AssetId) {
        self.by_asset.insert(asset_id.clone(), level);
        self.by_level.insert(level, asset_id);
    }

    #[cfg(test)]
    fn indices_agree(&self) -> bool {
        self.by_level.len() == self.by_asset.len()
            && self
                .by_level
                .iter()
                .all(|(level, asset)| self.by_asset.get(asset) == Some(level))
    }
}

impl fmt::Display for LodChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: [", self.collection_id)?;
        for (i, (level, asset)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{{{},{}}}", level, asset)?;
        }
        write!(f, "]")
    }
}

impl From<LodChain> for ChainRecord {
    fn from(chain: LodChain) -> Self {
        chain.to_record()
    }
}

impl TryFrom<ChainRecord> for LodChain {
    type Error = RegistryError;

    fn try_from(record: ChainRecord) -> Result<Self> {
        LodChain::from_entries(record.collection_id, record.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cid(id: &str) -> CollectionId {
        CollectionId::new(id).unwrap()
    }

    fn aid(id: &str) -> AssetId {
        AssetId::new(id).unwrap()
    }

    fn lvl(level: u32) -> Level {
        Level::from(level)
    }

    #[test]
    fn test_new_chain_is_empty() {
        let chain = LodChain::new(cid("c1"));
        assert!(chain.is_empty());
        assert_eq!(chain.state(), ChainState::Empty);
        assert!(chain.entries().is_empty());
        assert!(chain.first().is_none());
    }

    #[test]
    fn test_entries_ascending_regardless_of_insertion_order() {
        let mut chain = LodChain::new(cid("c1"));
        chain.insert(lvl(5), aid("a5")).unwrap();
        chain.insert(lvl(0), aid("a0")).unwrap();
        chain.insert(lvl(2), aid("a2")).unwrap();

        let levels: Vec<u32> = chain.iter().map(|(level, _)| level.get()).collect();
        assert_eq!(levels, vec![0, 2, 5]);
        assert_eq!(chain.first().unwrap().asset_id, aid("a0"));
        assert_eq!(chain.last().unwrap().asset_id, aid("a5"));
        assert_eq!(chain.state(), ChainState::Populated);
    }

    #[test]
    fn test_insert_same_pair_is_idempotent() {
        let mut chain = LodChain::new(cid("c1"));
        assert!(matches!(
            chain.insert(lvl(1), aid("a1")).unwrap(),
            ChainChange::Inserted(_)
        ));
        let before = chain.clone();
        assert_eq!(chain.insert(lvl(1), aid("a1")).unwrap(), ChainChange::Unchanged);
        assert_eq!(chain, before);
    }

    #[test]
    fn test_level_conflict_leaves_chain_unchanged() {
        let mut chain = LodChain::new(cid("c1"));
        chain.insert(lvl(0), aid("a1")).unwrap();
        let before = chain.clone();

        let err = chain.insert(lvl(0), aid("b1")).unwrap_err();
        assert!(matches!(err, RegistryError::LevelOccupied { ref occupant, .. } if occupant == &aid("a1")));
        assert_eq!(chain, before);
        assert!(chain.indices_agree());
    }

    #[test]
    fn test_asset_conflict_leaves_chain_unchanged() {
        let mut chain = LodChain::new(cid("c1"));
        chain.insert(lvl(0), aid("a1")).unwrap();
        let before = chain.clone();

        let err = chain.insert(lvl(3), aid("a1")).unwrap_err();
        assert!(matches!(err, RegistryError::AssetAlreadyRegistered { level, .. } if level == lvl(0)));
        assert_eq!(chain, before);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut chain = LodChain::new(cid("c1"));
        chain.insert(lvl(0), aid("a1")).unwrap();
        chain.insert(lvl(1), aid("a2")).unwrap();

        assert_eq!(
            chain.remove(&aid("a1")),
            ChainChange::Removed(LodEntry::new(lvl(0), aid("a1")))
        );
        assert_eq!(chain.remove(&aid("a1")), ChainChange::Unchanged);
        assert_eq!(chain.entries(), vec![LodEntry::new(lvl(1), aid("a2"))]);
        assert!(chain.indices_agree());
    }

    #[test]
    fn test_relevel() {
        let mut chain = LodChain::new(cid("c1"));
        chain.insert(lvl(0), aid("a1")).unwrap();
        chain.insert(lvl(1), aid("a2")).unwrap();

        assert!(chain.relevel(&aid("a1"), lvl(1)).is_err());
        assert!(matches!(
            chain.relevel(&aid("missing"), lvl(4)),
            Err(RegistryError::AssetNotInChain { .. })
        ));
        assert_eq!(chain.relevel(&aid("a1"), lvl(0)).unwrap(), ChainChange::Unchanged);

        let change = chain.relevel(&aid("a1"), lvl(7)).unwrap();
        assert_eq!(
            change,
            ChainChange::Moved {
                asset_id: aid("a1"),
                from: lvl(0),
                to: lvl(7)
            }
        );
        assert_eq!(chain.asset_at(lvl(0)), None);
        assert_eq!(chain.level_of(&aid("a1")), Some(lvl(7)));
        assert!(chain.indices_agree());
    }

    #[test]
    fn test_clear() {
        let mut chain = LodChain::new(cid("c1"));
        chain.insert(lvl(0), aid("a1")).unwrap();
        chain.insert(lvl(1), aid("a2")).unwrap();

        assert_eq!(chain.clear(), ChainChange::Cleared { removed: 2 });
        assert!(chain.is_empty());
        assert!(chain.clear().is_noop());
    }

    #[test]
    fn test_serialized_shape() {
        let mut chain = LodChain::new(cid("c1"));
        chain.insert(lvl(1), aid("a2")).unwrap();
        chain.insert(lvl(0), aid("a1")).unwrap();

        let json = serde_json::to_value(&chain).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "collection_id": "c1",
                "entries": [
                    {"level": 0, "asset_id": "a1"},
                    {"level": 1, "asset_id": "a2"}
                ]
            })
        );

        let restored: LodChain = serde_json::from_value(json).unwrap();
        assert_eq!(restored, chain);
    }

    #[test]
    fn test_deserialization_rejects_duplicates() {
        let duplicate_level = serde_json::json!({
            "collection_id": "c1",
            "entries": [
                {"level": 0, "asset_id": "a1"},
                {"level": 0, "asset_id": "a2"}
            ]
        });
        assert!(serde_json::from_value::<LodChain>(duplicate_level).is_err());

        let duplicate_asset = serde_json::json!({
            "collection_id": "c1",
            "entries": [
                {"level": 0, "asset_id": "a1"},
                {"level": 4, "asset_id": "a1"}
            ]
        });
        assert!(serde_json::from_value::<LodChain>(duplicate_asset).is_err());

        let negative = serde_json::json!({
            "collection_id": "c1",
            "entries": [{"level": -1, "asset_id": "a1"}]
        });
        assert!(serde_json::from_value::<LodChain>(negative).is_err());
    }

    #[test]
    fn test_display() {
        let mut chain = LodChain::new(cid("c1"));
        chain.insert(lvl(0), aid("a1")).unwrap();
        chain.insert(lvl(1), aid("a2")).unwrap();
        assert_eq!(chain.to_string(), "c1: [{0,a1},{1,a2}]");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Insert(u32, u8),
            Remove(u8),
            Relevel(u8, u32),
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                (0u32..16, 0u8..12).prop_map(|(l, a)| Op::Insert(l, a)),
                (0u8..12).prop_map(Op::Remove),
                (0u8..12, 0u32..16).prop_map(|(a, l)| Op::Relevel(a, l)),
            ]
        }

        proptest! {
            #[test]
            fn invariants_hold_after_any_sequence(ops in proptest::collection::vec(op(), 0..64)) {
                let mut chain = LodChain::new(cid("c1"));
                for op in ops {
                    let before = chain.clone();
                    let result = match op {
                        Op::Insert(level, asset) => chain.insert(lvl(level), aid(&format!("a{}", asset))).map(|_| ()),
                        Op::Remove(asset) => {
                            chain.remove(&aid(&format!("a{}", asset)));
                            Ok(())
                        }
                        Op::Relevel(asset, level) => chain.relevel(&aid(&format!("a{}", asset)), lvl(level)).map(|_| ()),
                    };
                    if result.is_err() {
                        prop_assert_eq!(&chain, &before);
                    }
                    prop_assert!(chain.indices_agree());

                    let levels: Vec<Level> = chain.iter().map(|(level, _)| level).collect();
                    prop_assert!(levels.windows(2).all(|w| w[0] < w[1]));
                }
            }
        }
    }
}
