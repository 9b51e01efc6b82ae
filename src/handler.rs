//! Greedy epoch handler: apply any valid transaction until a fixed point

use std::collections::HashSet;

use crate::crypto::SignatureVerifier;
use crate::types::Transaction;
use crate::utxo::UtxoPool;
use crate::validation::is_valid_tx;

/// Result of one greedy epoch: the accepted transactions in application
/// order and the pool they produce.
#[derive(Debug)]
pub struct EpochResult {
    pub applied: Vec<Transaction>,
    pub pool: UtxoPool,
}

/// Repeatedly scan `proposals`, applying every transaction that is valid
/// against the working pool, until a full pass applies none. The accepted
/// set is mutually compatible but not guaranteed fee-maximal; see
/// [`crate::selector`] for the maximizing variant.
pub fn handle_txs(
    pool: &UtxoPool,
    proposals: &[Transaction],
    verifier: &dyn SignatureVerifier,
) -> EpochResult {
    let mut working = pool.clone();
    let mut applied = Vec::new();
    let mut applied_ids = HashSet::new();

    loop {
        let mut progressed = false;
        for tx in proposals {
            if applied_ids.contains(&tx.digest()) {
                continue;
            }
            if is_valid_tx(tx, &working, verifier) && working.apply(tx).is_some() {
                applied_ids.insert(tx.digest());
                applied.push(tx.clone());
                progressed = true;
            }
        }
        if !progressed {
            break;
        }
    }

    EpochResult {
        applied,
        pool: working,
    }
}
