//! Shared fixtures for scenario tests
#![allow(dead_code)]

use minichain::{stub_sign, Digest, Output, Transaction, Utxo, UtxoPool, Value};

/// Address used by every fixture output.
pub const ADDR: &[u8] = b"test owner key";

/// A pool holding `values` at (hash("funding"), 0..n).
pub fn funding_pool(values: &[Value]) -> UtxoPool {
    let mut pool = UtxoPool::new();
    for (index, value) in values.iter().enumerate() {
        pool.add(
            funding_utxo(index as u32),
            Output {
                value: *value,
                address: ADDR.to_vec(),
            },
        );
    }
    pool
}

pub fn funding_utxo(index: u32) -> Utxo {
    Utxo::new(minichain::hash(b"funding"), index)
}

/// A finalized transaction spending `sources` into single-address outputs of
/// the given values, signed for [`ADDR`] under the stub scheme.
pub fn signed_spend(sources: &[(Digest, u32)], outputs: &[Value]) -> Transaction {
    let mut tx = Transaction::new();
    for (prev, index) in sources {
        tx.add_input(*prev, *index);
    }
    for value in outputs {
        tx.add_output(*value, ADDR.to_vec());
    }
    for index in 0..sources.len() {
        let signature = stub_sign(ADDR, &tx.raw_data_to_sign(index));
        tx.set_signature(index, signature);
    }
    tx.finalize();
    tx
}

/// A finalized zero-input transaction carrying only an identifying tag;
/// used as gossip payload where ledger validity is out of scope.
pub fn gossip_tx(tag: &str) -> Transaction {
    let mut tx = Transaction::new();
    tx.add_output(1.0, tag.as_bytes().to_vec());
    tx.finalize();
    tx
}
