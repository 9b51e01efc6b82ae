//! Branching block store with height-bounded pruning
//!
//! Blocks are indexed by their own hash (for parent lookup) and by a head
//! ordering of height descending then installation order ascending. Blocks
//! that sink more than `cut_off_age` below the head are forgotten, keeping
//! one extra layer so blocks can still be built at exactly the cut-off
//! height.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use crate::types::{Block, Digest};
use crate::utxo::UtxoPool;

/// A stored block with its chain height, its post-block UTXO snapshot, and
/// the installation stamp used to break head ties (earlier wins).
#[derive(Debug, Clone)]
pub struct BlockInfo {
    pub block: Block,
    pub height: u64,
    pub utxo_pool: UtxoPool,
    created_at: u64,
}

impl BlockInfo {
    pub fn created_at(&self) -> u64 {
        self.created_at
    }
}

/// Head-ordering key: height descending, then installation stamp ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
struct HeadKey {
    height: u64,
    stamp: u64,
    hash: Digest,
}

impl Ord for HeadKey {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .height
            .cmp(&self.height)
            .then(self.stamp.cmp(&other.stamp))
            .then(self.hash.cmp(&other.hash))
    }
}

impl PartialOrd for HeadKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug)]
pub struct BlockTree {
    cut_off_age: u64,
    known: HashMap<Digest, BlockInfo>,
    by_height: BTreeSet<HeadKey>,
    next_stamp: u64,
}

impl BlockTree {
    pub fn new(cut_off_age: u64) -> Self {
        Self {
            cut_off_age,
            known: HashMap::new(),
            by_height: BTreeSet::new(),
            next_stamp: 0,
        }
    }

    /// The current head: maximum height, earliest installation on ties.
    pub fn head(&self) -> Option<&BlockInfo> {
        self.by_height.first().and_then(|key| self.known.get(&key.hash))
    }

    pub fn max_height(&self) -> u64 {
        self.head().map(|info| info.height).unwrap_or(0)
    }

    pub fn get(&self, hash: &Digest) -> Option<&BlockInfo> {
        self.known.get(hash)
    }

    pub fn contains(&self, hash: &Digest) -> bool {
        self.known.contains_key(hash)
    }

    pub fn parent(&self, block: &Block) -> Option<&BlockInfo> {
        block
            .prev_block_hash
            .as_ref()
            .and_then(|hash| self.known.get(hash))
    }

    /// Height `block` would occupy: 1 for a prev-less block, parent height
    /// plus one otherwise. `None` when the parent is unknown.
    pub fn height_for(&self, block: &Block) -> Option<u64> {
        if block.is_genesis() {
            return Some(1);
        }
        self.parent(block).map(|parent| parent.height + 1)
    }

    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    /// Install `block` with its post-block pool. Rejects a block whose
    /// parent is unknown, whose hash is already present, or whose height
    /// falls at or below `max_height - cut_off_age`. When the installation
    /// raises the maximum height, the tail is pruned.
    pub fn add_block(&mut self, block: Block, pool: UtxoPool) -> bool {
        let Some(height) = self.height_for(&block) else {
            tracing::debug!(hash = %block.hash, "rejected block with unknown parent");
            return false;
        };
        if self.known.contains_key(&block.hash) {
            tracing::debug!(hash = %block.hash, "rejected duplicate block hash");
            return false;
        }

        let max_height = self.max_height();
        if height <= max_height.saturating_sub(self.cut_off_age) {
            tracing::debug!(hash = %block.hash, height, max_height, "rejected block below cut-off");
            return false;
        }

        let stamp = self.next_stamp;
        self.next_stamp += 1;

        let hash = block.hash;
        self.by_height.insert(HeadKey {
            height,
            stamp,
            hash,
        });
        self.known.insert(
            hash,
            BlockInfo {
                block,
                height,
                utxo_pool: pool,
                created_at: stamp,
            },
        );
        tracing::debug!(hash = %hash, height, "installed block");

        if height > max_height {
            self.prune();
        }
        true
    }

    /// Forget everything at or below `max_height - cut_off_age - 1`. The
    /// extra layer below the cut-off stays so a block can still be attached
    /// at exactly the cut-off height.
    fn prune(&mut self) {
        let cut_off_height = self.max_height().saturating_sub(self.cut_off_age + 1);
        while let Some(tail) = self.by_height.last().cloned() {
            if tail.height > cut_off_height {
                break;
            }
            self.by_height.remove(&tail);
            self.known.remove(&tail.hash);
            tracing::debug!(hash = %tail.hash, height = tail.height, "pruned block below cut-off");
        }
    }
}
