//! Tunables for fork retention and gossip heuristics

/// Default depth below the current head beyond which old blocks are forgotten.
pub const DEFAULT_CUT_OFF_AGE: u64 = 10;

/// Transaction mass a simulation harness seeds the network with. The
/// propagation floor used by malicious detection is proportional to this.
pub const EXPECTED_INITIAL_TXS: f64 = 500.0;

/// Fraction of non-malicious followees that must vouch for a transaction in
/// the current round for it to appear in the final consensus reveal.
pub const REVEAL_BELIEVER_FRACTION: f64 = 0.85;

/// Fraction of non-malicious followees above which late-round holdouts that
/// never flagged a widely-believed transaction are classified malicious.
pub const DISTRUST_BELIEVER_FRACTION: f64 = 0.95;
