//! Blockchain facade: block admission, UTXO snapshots, and the mempool
//!
//! Wraps the [`BlockTree`] and derives each block's post-state with the
//! greedy epoch handler before installation. Admission is all-or-nothing: a
//! block either installs with every transaction applied and its coinbase
//! credited, or nothing changes.

use crate::blocktree::BlockTree;
use crate::constants::DEFAULT_CUT_OFF_AGE;
use crate::crypto::SignatureVerifier;
use crate::error::{ChainError, Result};
use crate::handler::handle_txs;
use crate::mempool::TransactionPool;
use crate::types::{Block, Digest, Transaction};
use crate::utxo::{Utxo, UtxoPool};

pub struct Blockchain {
    tree: BlockTree,
    mempool: TransactionPool,
    verifier: Box<dyn SignatureVerifier>,
}

impl Blockchain {
    /// Build a chain from its genesis block with the default cut-off age.
    pub fn new(genesis: Block, verifier: Box<dyn SignatureVerifier>) -> Result<Self> {
        Self::with_cut_off_age(genesis, verifier, DEFAULT_CUT_OFF_AGE)
    }

    pub fn with_cut_off_age(
        genesis: Block,
        verifier: Box<dyn SignatureVerifier>,
        cut_off_age: u64,
    ) -> Result<Self> {
        let mut tree = BlockTree::new(cut_off_age);
        let genesis_pool = resulting_pool(&UtxoPool::new(), &genesis, verifier.as_ref())
            .ok_or_else(|| {
                ChainError::InvalidGenesis("transactions or coinbase do not apply".to_string())
            })?;
        if !tree.add_block(genesis, genesis_pool) {
            return Err(ChainError::InvalidGenesis(
                "block was rejected by the tree".to_string(),
            ));
        }
        Ok(Self {
            tree,
            mempool: TransactionPool::new(),
            verifier,
        })
    }

    /// The block at maximum height (earliest-installed on ties).
    pub fn max_height_block(&self) -> &Block {
        match self.tree.head() {
            Some(info) => &info.block,
            None => unreachable!("tree holds at least the genesis"),
        }
    }

    /// UTXO snapshot for mining on top of the maximum-height block.
    pub fn max_height_utxo_pool(&self) -> &UtxoPool {
        match self.tree.head() {
            Some(info) => &info.utxo_pool,
            None => unreachable!("tree holds at least the genesis"),
        }
    }

    /// A copy of the pending-transaction pool.
    pub fn transaction_pool(&self) -> TransactionPool {
        self.mempool.clone()
    }

    pub fn tree(&self) -> &BlockTree {
        &self.tree
    }

    /// Validate and install `block`. Requires a known parent, every body
    /// transaction accepted against the parent's pool, a well-formed
    /// coinbase, and a height above the cut-off. On success the included
    /// transactions leave the mempool; on failure nothing changes.
    pub fn add_block(&mut self, block: Block) -> bool {
        if block.is_genesis() {
            return false;
        }

        let Some(pool) = self
            .tree
            .parent(&block)
            .and_then(|parent| resulting_pool(&parent.utxo_pool, &block, self.verifier.as_ref()))
        else {
            tracing::debug!(hash = %block.hash, "rejected block: unknown parent or invalid body");
            return false;
        };

        let included: Vec<Digest> = block.transactions.iter().map(|tx| tx.digest()).collect();
        let hash = block.hash;
        if !self.tree.add_block(block, pool) {
            return false;
        }

        for digest in &included {
            self.mempool.remove_transaction(digest);
        }
        tracing::debug!(hash = %hash, mempool = self.mempool.len(), "accepted block");
        true
    }

    /// Queue a transaction for future blocks. Duplicates by digest no-op.
    pub fn add_transaction(&mut self, tx: Transaction) {
        self.mempool.add_transaction(tx);
    }
}

/// Post-block pool: run the greedy handler over the body against the
/// parent's pool, require every transaction accepted, then credit the
/// coinbase outputs at the coinbase digest. `None` marks an invalid block.
fn resulting_pool(
    prev_pool: &UtxoPool,
    block: &Block,
    verifier: &dyn SignatureVerifier,
) -> Option<UtxoPool> {
    let epoch = handle_txs(prev_pool, &block.transactions, verifier);
    if epoch.applied.len() != block.transactions.len() {
        return None;
    }

    let coinbase = &block.coinbase;
    if !coinbase.is_coinbase() || coinbase.outputs.iter().any(|output| output.value < 0.0) {
        return None;
    }

    let mut pool = epoch.pool;
    let digest = coinbase.digest();
    for (index, output) in coinbase.outputs.iter().enumerate() {
        pool.add(Utxo::new(digest, index as u32), output.clone());
    }
    Some(pool)
}
