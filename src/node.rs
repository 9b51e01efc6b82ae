//! Gossip consensus node
//!
//! A node repeatedly broadcasts the transactions it believes in and listens
//! to its followees, growing a monotone pending set. Followees whose
//! behavior is inconsistent with honest relaying (shrinking output, going
//! silent, withholding, flip-flopping on a transaction) are classified
//! malicious and ignored from then on; both the pending set and the
//! malicious set only ever grow.
//!
//! The node is driven externally in lockstep rounds: the harness calls
//! [`Node::send_to_followers`] on every node, then delivers the gossip via
//! [`Node::receive_from_followees`]. No ledger state is involved.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::constants::{
    DISTRUST_BELIEVER_FRACTION, EXPECTED_INITIAL_TXS, REVEAL_BELIEVER_FRACTION,
};
use crate::types::{Digest, Transaction};

/// A single piece of gossip: a transaction and the followee relaying it.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub tx: Transaction,
    pub sender: usize,
}

impl Candidate {
    pub fn new(tx: Transaction, sender: usize) -> Self {
        Self { tx, sender }
    }
}

/// Network priors handed to every node at construction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GossipConfig {
    /// Probability that any directed follow edge exists.
    pub p_graph: f64,
    /// Probability that a peer is malicious.
    pub p_malicious: f64,
    /// Probability that a peer was seeded with any given initial transaction.
    pub p_tx_distribution: f64,
    /// Number of gossip rounds the harness will run.
    pub num_rounds: u32,
}

/// The harness-facing surface of a consensus participant.
pub trait Node {
    /// `followees[i]` is true iff this node listens to node `i`. Called once.
    fn set_followees(&mut self, followees: &[bool]);

    /// Seed the initial pending set. Called once, after `set_followees`.
    fn set_pending_transactions(&mut self, txs: Vec<Transaction>);

    /// Transactions to broadcast this round, in digest order. Advances the
    /// round counter.
    fn send_to_followers(&mut self) -> Vec<Transaction>;

    /// Deliver this round's gossip, at most one candidate per (tx, sender).
    fn receive_from_followees(&mut self, candidates: Vec<Candidate>);
}

/// Per-transaction believer tracking: for each peer, the round it last
/// flagged the transaction, plus the flag count for the current round.
/// Round numbers start at 1, so 0 marks a peer that never flagged.
#[derive(Debug)]
struct BelieverRecord {
    last_flagged_round: Vec<u32>,
    curr_round: u32,
    round_count: usize,
}

impl BelieverRecord {
    fn new(num_nodes: usize, round: u32) -> Self {
        assert!(round > 0, "believer rounds start at 1");
        Self {
            last_flagged_round: vec![0; num_nodes],
            curr_round: round,
            round_count: 0,
        }
    }

    fn bump_round(&mut self, round: u32) {
        assert!(round > 0, "believer rounds start at 1");
        self.curr_round = round;
        self.round_count = 0;
    }

    fn flag(&mut self, node: usize) {
        if self.last_flagged_round[node] != self.curr_round {
            self.last_flagged_round[node] = self.curr_round;
            self.round_count += 1;
        }
    }

    fn flagged_in_round(&self, node: usize) -> bool {
        self.last_flagged_round[node] == self.curr_round
    }

    fn ever_flagged(&self, node: usize) -> bool {
        self.last_flagged_round[node] > 0
    }

    fn round_count(&self) -> usize {
        self.round_count
    }
}

/// A rule-following consensus node.
pub struct CompliantNode {
    config: GossipConfig,
    curr_round: u32,
    num_nodes: usize,
    followees: BTreeSet<usize>,
    pending: BTreeMap<Digest, Transaction>,
    believers: BTreeMap<Digest, BelieverRecord>,
    malicious: BTreeSet<usize>,
    last_tx_count: Vec<u32>,
}

impl CompliantNode {
    pub fn new(config: GossipConfig) -> Self {
        Self {
            config,
            curr_round: 0,
            num_nodes: 0,
            followees: BTreeSet::new(),
            pending: BTreeMap::new(),
            believers: BTreeMap::new(),
            malicious: BTreeSet::new(),
            last_tx_count: Vec::new(),
        }
    }

    /// Followees currently classified malicious.
    pub fn malicious_nodes(&self) -> &BTreeSet<usize> {
        &self.malicious
    }

    /// Digests of every transaction believed so far.
    pub fn pending_digests(&self) -> impl Iterator<Item = &Digest> {
        self.pending.keys()
    }

    fn honest_followee_count(&self) -> usize {
        self.followees.len().saturating_sub(self.malicious.len())
    }

    /// Heuristic classification, applied in a fixed order because earlier
    /// classifications shrink the denominator used by later thresholds.
    fn detect_malicious(&mut self, next_tx_count: &[u32]) {
        if self.curr_round <= 1 {
            return;
        }

        for &followee in &self.followees {
            let shrinking = next_tx_count[followee] < self.last_tx_count[followee];
            let silent = self.curr_round >= 3 && next_tx_count[followee] == 0;
            let withholding = self.curr_round > self.config.num_rounds / 2
                && (next_tx_count[followee] as f64)
                    <= 2.0 * EXPECTED_INITIAL_TXS * self.config.p_tx_distribution;
            if shrinking || silent || withholding {
                classify(&mut self.malicious, followee, "inconsistent relay volume");
            }
        }

        let late_round = self.curr_round > 2 * self.config.num_rounds / 3;
        let tx_ids: Vec<Digest> = self.believers.keys().copied().collect();
        for id in tx_ids {
            let Some(record) = self.believers.get(&id) else {
                continue;
            };

            // a believer that stops vouching for a transaction it once
            // relayed is lying in one of the two rounds
            let mut peace_believers = 0;
            for &followee in &self.followees {
                if self.malicious.contains(&followee) || !record.ever_flagged(followee) {
                    continue;
                }
                if record.flagged_in_round(followee) {
                    peace_believers += 1;
                } else {
                    classify(&mut self.malicious, followee, "dropped a believed transaction");
                }
            }

            let distrust_threshold =
                (self.honest_followee_count() as f64 * DISTRUST_BELIEVER_FRACTION) as usize;
            if late_round && peace_believers > distrust_threshold {
                for &followee in &self.followees {
                    if self.malicious.contains(&followee) {
                        continue;
                    }
                    if !record.ever_flagged(followee) {
                        classify(&mut self.malicious, followee, "holdout on near-unanimous tx");
                    }
                }
            }
        }
    }
}

impl Node for CompliantNode {
    fn set_followees(&mut self, followees: &[bool]) {
        self.num_nodes = followees.len();
        self.followees.clear();
        for (index, follows) in followees.iter().enumerate() {
            if *follows {
                self.followees.insert(index);
            }
        }
        self.last_tx_count = vec![0; self.num_nodes];
    }

    fn set_pending_transactions(&mut self, txs: Vec<Transaction>) {
        for tx in txs {
            self.pending.entry(tx.digest()).or_insert(tx);
        }
    }

    fn send_to_followers(&mut self) -> Vec<Transaction> {
        let round = self.curr_round;
        self.curr_round += 1;

        if round < self.config.num_rounds {
            return self.pending.values().cloned().collect();
        }

        // rounds exhausted: reveal the consensus answer, the transactions a
        // high fraction of honest followees still vouched for last round
        let threshold =
            (self.honest_followee_count() as f64 * REVEAL_BELIEVER_FRACTION) as usize;
        self.believers
            .iter()
            .filter(|(_, record)| record.round_count() > threshold)
            .filter_map(|(id, _)| self.pending.get(id).cloned())
            .collect()
    }

    fn receive_from_followees(&mut self, candidates: Vec<Candidate>) {
        for record in self.believers.values_mut() {
            record.bump_round(self.curr_round);
        }

        let mut next_tx_count = vec![0u32; self.num_nodes];
        for candidate in candidates {
            if !self.followees.contains(&candidate.sender)
                || self.malicious.contains(&candidate.sender)
            {
                continue;
            }

            let id = candidate.tx.digest();
            self.believers
                .entry(id)
                .or_insert_with(|| BelieverRecord::new(self.num_nodes, self.curr_round))
                .flag(candidate.sender);
            next_tx_count[candidate.sender] += 1;
            self.pending.entry(id).or_insert(candidate.tx);
        }

        self.detect_malicious(&next_tx_count);
        self.last_tx_count = next_tx_count;
    }
}

fn classify(malicious: &mut BTreeSet<usize>, followee: usize, reason: &str) {
    if malicious.insert(followee) {
        tracing::warn!(followee, reason, "followee classified malicious");
    }
}
