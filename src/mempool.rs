//! Pending-transaction pool for block assembly

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{Digest, Transaction};

/// Transactions waiting for inclusion in a block, keyed and iterated by
/// digest. Adding is append-only: a digest already present is left as-is.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionPool {
    txs: BTreeMap<Digest, Transaction>,
}

impl TransactionPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_transaction(&mut self, tx: Transaction) {
        self.txs.entry(tx.digest()).or_insert(tx);
    }

    pub fn remove_transaction(&mut self, digest: &Digest) -> Option<Transaction> {
        self.txs.remove(digest)
    }

    pub fn transaction(&self, digest: &Digest) -> Option<&Transaction> {
        self.txs.get(digest)
    }

    pub fn contains(&self, digest: &Digest) -> bool {
        self.txs.contains_key(digest)
    }

    /// Pending transactions in digest order.
    pub fn transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.txs.values()
    }

    pub fn len(&self) -> usize {
        self.txs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.txs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tagged_tx(tag: &str) -> Transaction {
        let mut tx = Transaction::new();
        tx.add_output(1.0, tag.as_bytes().to_vec());
        tx.finalize();
        tx
    }

    #[test]
    fn test_add_and_remove() {
        let mut pool = TransactionPool::new();
        let tx = tagged_tx("a");

        pool.add_transaction(tx.clone());
        assert!(pool.contains(&tx.digest()));
        assert_eq!(pool.len(), 1);

        assert!(pool.remove_transaction(&tx.digest()).is_some());
        assert!(pool.is_empty());
        assert!(pool.remove_transaction(&tx.digest()).is_none());
    }

    #[test]
    fn test_duplicate_add_is_noop() {
        let mut pool = TransactionPool::new();
        let tx = tagged_tx("a");

        pool.add_transaction(tx.clone());
        pool.add_transaction(tx);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_iteration_is_digest_ordered() {
        let mut pool = TransactionPool::new();
        let a = tagged_tx("a");
        let b = tagged_tx("b");
        pool.add_transaction(a.clone());
        pool.add_transaction(b.clone());

        let digests: Vec<Digest> = pool.transactions().map(|tx| tx.digest()).collect();
        let mut sorted = digests.clone();
        sorted.sort();
        assert_eq!(digests, sorted);
        assert_eq!(digests.len(), 2);
    }
}
