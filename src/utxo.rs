//! UTXO identity and the unspent-output pool

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{Digest, Output, Transaction, Value};

/// Identity of an unspent output: the digest of the transaction that
/// produced it plus the output's position in that transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Utxo {
    pub prev_tx: Digest,
    pub output_index: u32,
}

impl Utxo {
    pub fn new(prev_tx: Digest, output_index: u32) -> Self {
        Self {
            prev_tx,
            output_index,
        }
    }
}

/// Undo record returned by [`UtxoPool::apply`]: the consumed output records,
/// the produced keys, and the transaction's fee.
#[derive(Debug)]
pub struct AppliedTx {
    pub fee: Value,
    consumed: Vec<(Utxo, Output)>,
    produced: Vec<Utxo>,
}

/// The set of unspent outputs, keyed by [`Utxo`]. Cloning produces a deep,
/// independent copy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UtxoPool {
    outputs: HashMap<Utxo, Output>,
}

impl UtxoPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, utxo: &Utxo) -> bool {
        self.outputs.contains_key(utxo)
    }

    pub fn output(&self, utxo: &Utxo) -> Option<&Output> {
        self.outputs.get(utxo)
    }

    pub fn add(&mut self, utxo: Utxo, output: Output) {
        self.outputs.insert(utxo, output);
    }

    pub fn remove(&mut self, utxo: &Utxo) -> Option<Output> {
        self.outputs.remove(utxo)
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    pub fn utxos(&self) -> impl Iterator<Item = &Utxo> {
        self.outputs.keys()
    }

    /// Apply `tx`: remove its claimed keys and insert its outputs keyed by
    /// its digest. Atomic: if any claimed key is absent (including a key
    /// claimed twice), already-removed entries are reinstated and `None` is
    /// returned. The undo record restores the pool exactly via
    /// [`UtxoPool::undo`].
    pub fn apply(&mut self, tx: &Transaction) -> Option<AppliedTx> {
        let mut consumed = Vec::with_capacity(tx.inputs.len());
        for input in &tx.inputs {
            let utxo = Utxo::new(input.prev_tx, input.output_index);
            match self.outputs.remove(&utxo) {
                Some(output) => consumed.push((utxo, output)),
                None => {
                    for (utxo, output) in consumed {
                        self.outputs.insert(utxo, output);
                    }
                    return None;
                }
            }
        }

        let mut fee: Value = consumed.iter().map(|(_, output)| output.value).sum();
        let digest = tx.digest();
        let mut produced = Vec::with_capacity(tx.outputs.len());
        for (index, output) in tx.outputs.iter().enumerate() {
            let utxo = Utxo::new(digest, index as u32);
            self.outputs.insert(utxo, output.clone());
            produced.push(utxo);
            fee -= output.value;
        }

        Some(AppliedTx {
            fee,
            consumed,
            produced,
        })
    }

    /// Reverse a prior [`UtxoPool::apply`]: drop the produced keys and
    /// reinstate the consumed records.
    pub fn undo(&mut self, applied: AppliedTx) {
        for utxo in &applied.produced {
            self.outputs.remove(utxo);
        }
        for (utxo, output) in applied.consumed {
            self.outputs.insert(utxo, output);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto;

    fn pool_with(entries: &[(&[u8], u32, Value)]) -> UtxoPool {
        let mut pool = UtxoPool::new();
        for (seed, index, value) in entries {
            pool.add(
                Utxo::new(crypto::hash(seed), *index),
                Output {
                    value: *value,
                    address: b"addr".to_vec(),
                },
            );
        }
        pool
    }

    fn spend(prev: Digest, index: u32, out_value: Value) -> Transaction {
        let mut tx = Transaction::new();
        tx.add_input(prev, index);
        tx.add_output(out_value, b"dest".to_vec());
        tx.finalize();
        tx
    }

    #[test]
    fn test_add_get_remove() {
        let mut pool = pool_with(&[(b"a", 0, 10.0)]);
        let key = Utxo::new(crypto::hash(b"a"), 0);

        assert!(pool.contains(&key));
        assert_eq!(pool.output(&key).map(|o| o.value), Some(10.0));
        assert!(pool.remove(&key).is_some());
        assert!(!pool.contains(&key));
        assert!(pool.remove(&key).is_none());
    }

    #[test]
    fn test_clone_is_deep() {
        let mut pool = pool_with(&[(b"a", 0, 10.0)]);
        let copy = pool.clone();
        pool.remove(&Utxo::new(crypto::hash(b"a"), 0));

        assert!(copy.contains(&Utxo::new(crypto::hash(b"a"), 0)));
        assert!(pool.is_empty());
    }

    #[test]
    fn test_apply_moves_value() {
        let mut pool = pool_with(&[(b"a", 0, 10.0), (b"b", 0, 4.0)]);
        let tx = spend(crypto::hash(b"a"), 0, 8.0);

        let applied = pool.apply(&tx).unwrap();
        assert_eq!(applied.fee, 2.0);
        assert_eq!(pool.len(), 2);
        assert!(!pool.contains(&Utxo::new(crypto::hash(b"a"), 0)));
        assert!(pool.contains(&Utxo::new(tx.digest(), 0)));
        // unrelated entry untouched
        assert_eq!(
            pool.output(&Utxo::new(crypto::hash(b"b"), 0)).map(|o| o.value),
            Some(4.0)
        );
    }

    #[test]
    fn test_apply_missing_input_rolls_back() {
        let mut pool = pool_with(&[(b"a", 0, 10.0)]);
        let mut tx = Transaction::new();
        tx.add_input(crypto::hash(b"a"), 0);
        tx.add_input(crypto::hash(b"missing"), 0);
        tx.add_output(1.0, b"dest".to_vec());
        tx.finalize();

        assert!(pool.apply(&tx).is_none());
        assert!(pool.contains(&Utxo::new(crypto::hash(b"a"), 0)));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_apply_rejects_double_claim() {
        let mut pool = pool_with(&[(b"a", 0, 10.0)]);
        let mut tx = Transaction::new();
        tx.add_input(crypto::hash(b"a"), 0);
        tx.add_input(crypto::hash(b"a"), 0);
        tx.add_output(1.0, b"dest".to_vec());
        tx.finalize();

        assert!(pool.apply(&tx).is_none());
        assert!(pool.contains(&Utxo::new(crypto::hash(b"a"), 0)));
    }

    #[test]
    fn test_apply_undo_roundtrip() {
        let mut pool = pool_with(&[(b"a", 0, 10.0), (b"b", 1, 3.5)]);
        let reference = pool.clone();
        let tx = spend(crypto::hash(b"a"), 0, 6.0);

        let applied = pool.apply(&tx).unwrap();
        pool.undo(applied);

        assert_eq!(pool.len(), reference.len());
        for utxo in reference.utxos() {
            assert_eq!(pool.output(utxo), reference.output(utxo));
        }
    }
}
