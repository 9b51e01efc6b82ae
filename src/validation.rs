//! Transaction validation against a UTXO pool

use std::collections::HashSet;

use crate::crypto::SignatureVerifier;
use crate::types::{Transaction, Value};
use crate::utxo::{Utxo, UtxoPool};

/// Outcome of a validity check. Rejection is a value the caller inspects,
/// never an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Valid,
    Invalid(String),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }
}

/// Check `tx` against `pool`. Valid if and only if:
///
/// 1. every output claimed by an input is present in the pool,
/// 2. no UTXO is claimed more than once,
/// 3. every input signature verifies against the claimed output's address
///    and the transaction's pre-image at that input position,
/// 4. every output value is non-negative, and
/// 5. the sum of input values covers the sum of output values.
///
/// A transaction with no inputs is a coinbase and is rejected here; coinbase
/// outputs enter the pool only through block installation. The check is pure
/// and short-circuits on the first failure.
pub fn check_transaction(
    tx: &Transaction,
    pool: &UtxoPool,
    verifier: &dyn SignatureVerifier,
) -> ValidationResult {
    if tx.is_coinbase() {
        return ValidationResult::Invalid("coinbase outside block position".to_string());
    }

    let mut claimed = HashSet::new();
    let mut input_sum: Value = 0.0;
    for (index, input) in tx.inputs.iter().enumerate() {
        let utxo = Utxo::new(input.prev_tx, input.output_index);

        let Some(source) = pool.output(&utxo) else {
            return ValidationResult::Invalid(format!("input {} not in pool", index));
        };
        if !claimed.insert(utxo) {
            return ValidationResult::Invalid(format!("input {} claims a spent UTXO", index));
        }

        let message = tx.raw_data_to_sign(index);
        if !verifier.verify_signature(&source.address, &message, &input.signature) {
            return ValidationResult::Invalid(format!("bad signature at input {}", index));
        }

        input_sum += source.value;
    }

    let mut output_sum: Value = 0.0;
    for (index, output) in tx.outputs.iter().enumerate() {
        if output.value < 0.0 {
            return ValidationResult::Invalid(format!("negative value at output {}", index));
        }
        output_sum += output.value;
    }

    if output_sum > input_sum {
        return ValidationResult::Invalid("outputs exceed inputs".to_string());
    }

    ValidationResult::Valid
}

pub fn is_valid_tx(tx: &Transaction, pool: &UtxoPool, verifier: &dyn SignatureVerifier) -> bool {
    check_transaction(tx, pool, verifier).is_valid()
}

/// Fee of `tx` against `pool`: claimed input values minus output values.
/// `None` when a claimed output is absent from the pool.
pub fn transaction_fee(tx: &Transaction, pool: &UtxoPool) -> Option<Value> {
    let mut fee: Value = 0.0;
    for input in &tx.inputs {
        let utxo = Utxo::new(input.prev_tx, input.output_index);
        fee += pool.output(&utxo)?.value;
    }
    for output in &tx.outputs {
        fee -= output.value;
    }
    Some(fee)
}
