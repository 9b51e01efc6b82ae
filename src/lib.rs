//! # minichain
//!
//! Core mechanics of a small UTXO cryptocurrency: ledger validation, block
//! assembly, fork tracking, and gossip consensus.
//!
//! The crate is four loosely-coupled subsystems:
//!
//! - **Ledger**: [`utxo::UtxoPool`] plus the five-rule validator in
//!   [`validation`], with the greedy epoch handler in [`handler`].
//! - **Selection**: [`selector::select_max_fee_txs`], a backtracking search
//!   that picks the fee-maximizing mutually-valid subset of proposals.
//! - **Chain**: [`blocktree::BlockTree`] keeps the branching block store
//!   bounded by a cut-off age; [`chain::Blockchain`] fronts it with block
//!   admission and a mempool.
//! - **Consensus**: [`node::CompliantNode`] runs round-based gossip with
//!   heuristic detection of malicious peers.
//!
//! Cryptography is pluggable through [`crypto::SignatureVerifier`]; tests
//! and simulations use the deterministic [`crypto::StubVerifier`].
//!
//! ## Example
//!
//! ```
//! use minichain::{Blockchain, Block, StubVerifier, Transaction};
//!
//! let coinbase = Transaction::coinbase(25.0, b"miner".to_vec());
//! let genesis = Block::new(None, coinbase, vec![]);
//! let chain = Blockchain::new(genesis, Box::new(StubVerifier)).unwrap();
//!
//! assert_eq!(chain.max_height_utxo_pool().len(), 1);
//! ```

pub mod blocktree;
pub mod chain;
pub mod constants;
pub mod crypto;
pub mod error;
pub mod handler;
pub mod mempool;
pub mod node;
pub mod selector;
pub mod types;
pub mod utxo;
pub mod validation;

pub use blocktree::{BlockInfo, BlockTree};
pub use chain::Blockchain;
pub use crypto::{hash, stub_sign, Secp256k1Verifier, SignatureVerifier, StubVerifier};
pub use error::{ChainError, Result};
pub use handler::{handle_txs, EpochResult};
pub use mempool::TransactionPool;
pub use node::{Candidate, CompliantNode, GossipConfig, Node};
pub use selector::{select_max_fee_txs, Selection};
pub use types::{Block, ByteString, Digest, Input, Output, Transaction, Value};
pub use utxo::{Utxo, UtxoPool};
pub use validation::{check_transaction, is_valid_tx, transaction_fee, ValidationResult};
