//! Core ledger types: digests, outputs, inputs, transactions, blocks

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::crypto;

/// Byte string type used for addresses and signatures.
pub type ByteString = Vec<u8>;

/// Monetary value. Non-negative for every valid output.
pub type Value = f64;

/// 256-bit content address with value equality and byte-lexicographic
/// ordering. Used as transaction-id and block-id, and as a map key wherever
/// either is looked up.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Digest(pub [u8; 32]);

impl Digest {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self)
    }
}

/// A spendable amount bound to an address (a verbatim public key).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Output {
    pub value: Value,
    pub address: ByteString,
}

/// Reference to a previous transaction output, plus the signature over the
/// containing transaction's pre-image at this input's position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Input {
    pub prev_tx: Digest,
    pub output_index: u32,
    pub signature: ByteString,
}

/// Transaction: ordered inputs, ordered outputs, content-addressed digest.
///
/// The digest is stamped by [`Transaction::finalize`] once all signatures
/// are in place; mutating a finalized transaction requires re-finalizing.
/// A transaction with zero inputs is a coinbase and is only valid as the
/// distinguished first transaction of a block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub inputs: Vec<Input>,
    pub outputs: Vec<Output>,
    hash: Digest,
}

impl Transaction {
    pub fn new() -> Self {
        Self {
            inputs: Vec::new(),
            outputs: Vec::new(),
            hash: Digest([0u8; 32]),
        }
    }

    /// Build a finalized single-output coinbase. Distinct coinbases must
    /// differ in value or address to receive distinct digests.
    pub fn coinbase(value: Value, address: ByteString) -> Self {
        let mut tx = Self::new();
        tx.add_output(value, address);
        tx.finalize();
        tx
    }

    pub fn add_input(&mut self, prev_tx: Digest, output_index: u32) {
        self.inputs.push(Input {
            prev_tx,
            output_index,
            signature: Vec::new(),
        });
    }

    pub fn add_output(&mut self, value: Value, address: ByteString) {
        self.outputs.push(Output { value, address });
    }

    /// Attach the signature for the input at `index`. No-op when the index
    /// is out of range.
    pub fn set_signature(&mut self, index: usize, signature: ByteString) {
        if let Some(input) = self.inputs.get_mut(index) {
            input.signature = signature;
        }
    }

    /// Canonical pre-image signed by the input at `index`: that input's
    /// outpoint followed by every output. Signatures are excluded so the
    /// pre-image is stable while the transaction is being signed.
    pub fn raw_data_to_sign(&self, index: usize) -> ByteString {
        let mut data = Vec::new();
        if let Some(input) = self.inputs.get(index) {
            data.extend_from_slice(input.prev_tx.as_bytes());
            data.extend_from_slice(&input.output_index.to_le_bytes());
        }
        for output in &self.outputs {
            encode_output(&mut data, output);
        }
        data
    }

    /// Canonical serialization of the fully-formed transaction, signatures
    /// included. The digest is the hash of these bytes.
    pub fn raw_bytes(&self) -> ByteString {
        let mut data = Vec::new();
        encode_varint(&mut data, self.inputs.len() as u64);
        for input in &self.inputs {
            data.extend_from_slice(input.prev_tx.as_bytes());
            data.extend_from_slice(&input.output_index.to_le_bytes());
            encode_varint(&mut data, input.signature.len() as u64);
            data.extend_from_slice(&input.signature);
        }
        encode_varint(&mut data, self.outputs.len() as u64);
        for output in &self.outputs {
            encode_output(&mut data, output);
        }
        data
    }

    /// Stamp the digest from the canonical serialization.
    pub fn finalize(&mut self) {
        self.hash = crypto::hash(&self.raw_bytes());
    }

    pub fn digest(&self) -> Digest {
        self.hash
    }

    pub fn is_coinbase(&self) -> bool {
        self.inputs.is_empty()
    }
}

/// Block: optional parent hash (absent for genesis), the coinbase, the body
/// transactions, and the content-addressed block hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub prev_block_hash: Option<Digest>,
    pub coinbase: Transaction,
    pub transactions: Vec<Transaction>,
    pub hash: Digest,
}

impl Block {
    pub fn new(
        prev_block_hash: Option<Digest>,
        coinbase: Transaction,
        transactions: Vec<Transaction>,
    ) -> Self {
        let mut data = Vec::new();
        match &prev_block_hash {
            Some(prev) => {
                data.push(1);
                data.extend_from_slice(prev.as_bytes());
            }
            None => data.push(0),
        }
        data.extend_from_slice(&coinbase.raw_bytes());
        encode_varint(&mut data, transactions.len() as u64);
        for tx in &transactions {
            data.extend_from_slice(&tx.raw_bytes());
        }

        Self {
            prev_block_hash,
            coinbase,
            transactions,
            hash: crypto::hash(&data),
        }
    }

    pub fn is_genesis(&self) -> bool {
        self.prev_block_hash.is_none()
    }
}

fn encode_output(data: &mut Vec<u8>, output: &Output) {
    data.extend_from_slice(&output.value.to_bits().to_le_bytes());
    encode_varint(data, output.address.len() as u64);
    data.extend_from_slice(&output.address);
}

/// Encode a length as a compact varint.
fn encode_varint(data: &mut Vec<u8>, value: u64) {
    if value < 0xfd {
        data.push(value as u8);
    } else if value <= 0xffff {
        data.push(0xfd);
        data.extend_from_slice(&(value as u16).to_le_bytes());
    } else if value <= 0xffff_ffff {
        data.push(0xfe);
        data.extend_from_slice(&(value as u32).to_le_bytes());
    } else {
        data.push(0xff);
        data.extend_from_slice(&value.to_le_bytes());
    }
}
