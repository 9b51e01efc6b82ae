//! Round-driven gossip consensus scenarios
//!
//! The harness here mirrors the production driver: every round, all nodes
//! send, then every node receives the candidates from the peers it follows.

mod common;

use std::collections::BTreeSet;

use common::gossip_tx;
use minichain::{Candidate, CompliantNode, Digest, GossipConfig, Node, Transaction};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn config(num_rounds: u32, p_tx_distribution: f64) -> GossipConfig {
    GossipConfig {
        p_graph: 1.0,
        p_malicious: 0.2,
        p_tx_distribution,
        num_rounds,
    }
}

/// A peer that reveals its pending set in round 1 and nothing afterwards.
struct SilentNode {
    pending: Vec<Transaction>,
    rounds_sent: u32,
}

impl SilentNode {
    fn new(pending: Vec<Transaction>) -> Self {
        Self {
            pending,
            rounds_sent: 0,
        }
    }
}

impl Node for SilentNode {
    fn set_followees(&mut self, _followees: &[bool]) {}

    fn set_pending_transactions(&mut self, txs: Vec<Transaction>) {
        self.pending = txs;
    }

    fn send_to_followers(&mut self) -> Vec<Transaction> {
        self.rounds_sent += 1;
        if self.rounds_sent == 1 {
            self.pending.clone()
        } else {
            Vec::new()
        }
    }

    fn receive_from_followees(&mut self, _candidates: Vec<Candidate>) {}
}

/// One lockstep round: gather every node's broadcast, then deliver each
/// node the candidates from the peers it follows.
fn run_round(nodes: &mut [&mut dyn Node], follows: &[Vec<bool>]) {
    let sends: Vec<Vec<Transaction>> = nodes.iter_mut().map(|n| n.send_to_followers()).collect();
    for (receiver, followees) in follows.iter().enumerate() {
        let mut inbox = Vec::new();
        for (sender, sent) in sends.iter().enumerate() {
            if !followees[sender] {
                continue;
            }
            for tx in sent {
                inbox.push(Candidate::new(tx.clone(), sender));
            }
        }
        nodes[receiver].receive_from_followees(inbox);
    }
}

fn fully_connected(n: usize) -> Vec<Vec<bool>> {
    (0..n)
        .map(|i| (0..n).map(|j| i != j).collect())
        .collect()
}

#[test]
fn test_silent_peer_is_isolated() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();

    const NUM_ROUNDS: u32 = 6;
    let follows = fully_connected(5);

    let mut compliant: Vec<CompliantNode> = (0..4)
        .map(|_| CompliantNode::new(config(NUM_ROUNDS, 0.0001)))
        .collect();
    let silent_tx = gossip_tx("from the silent peer");
    let mut silent = SilentNode::new(vec![]);

    for (i, node) in compliant.iter_mut().enumerate() {
        node.set_followees(&follows[i]);
        node.set_pending_transactions(vec![gossip_tx(&format!("seed {}", i))]);
    }
    silent.set_pending_transactions(vec![silent_tx.clone()]);

    for _ in 0..NUM_ROUNDS {
        let mut nodes: Vec<&mut dyn Node> = Vec::new();
        for node in compliant.iter_mut() {
            nodes.push(node);
        }
        nodes.push(&mut silent);
        run_round(&mut nodes, &follows);
    }

    for node in &compliant {
        // the silent peer is caught well before the last round
        assert!(node.malicious_nodes().contains(&4));
        // no compliant peer is ever classified
        for compliant_index in 0..4 {
            assert!(!node.malicious_nodes().contains(&compliant_index));
        }
        // its round-1 gossip is still believed
        let pending: BTreeSet<Digest> = node.pending_digests().copied().collect();
        assert!(pending.contains(&silent_tx.digest()));
    }
}

#[test]
fn test_pending_and_malicious_grow_across_rounds() {
    const NUM_ROUNDS: u32 = 6;
    let follows = fully_connected(4);

    let mut compliant: Vec<CompliantNode> = (0..3)
        .map(|_| CompliantNode::new(config(NUM_ROUNDS, 0.0001)))
        .collect();
    let mut silent = SilentNode::new(vec![]);

    for (i, node) in compliant.iter_mut().enumerate() {
        node.set_followees(&follows[i]);
        node.set_pending_transactions(vec![gossip_tx(&format!("seed {}", i))]);
    }
    silent.set_pending_transactions(vec![gossip_tx("silent seed")]);

    let mut prev_pending: Vec<BTreeSet<Digest>> = vec![BTreeSet::new(); 3];
    let mut prev_malicious: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); 3];

    for _ in 0..NUM_ROUNDS {
        let mut nodes: Vec<&mut dyn Node> = Vec::new();
        for node in compliant.iter_mut() {
            nodes.push(node);
        }
        nodes.push(&mut silent);
        run_round(&mut nodes, &follows);

        for (i, node) in compliant.iter().enumerate() {
            let pending: BTreeSet<Digest> = node.pending_digests().copied().collect();
            assert!(pending.is_superset(&prev_pending[i]));
            assert!(node.malicious_nodes().is_superset(&prev_malicious[i]));
            prev_pending[i] = pending;
            prev_malicious[i] = node.malicious_nodes().clone();
        }
    }
}

#[test]
fn test_all_honest_network_reaches_agreement() {
    const NUM_NODES: usize = 8;
    const NUM_ROUNDS: u32 = 10;
    let follows = fully_connected(NUM_NODES);

    let mut nodes: Vec<CompliantNode> = (0..NUM_NODES)
        .map(|_| CompliantNode::new(config(NUM_ROUNDS, 0.001)))
        .collect();

    // seed a random distribution, guaranteeing every node holds something
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let all_txs: Vec<Transaction> = (0..2 * NUM_NODES)
        .map(|i| gossip_tx(&format!("tx {}", i)))
        .collect();
    let mut seeded: BTreeSet<Digest> = BTreeSet::new();
    for (i, node) in nodes.iter_mut().enumerate() {
        node.set_followees(&follows[i]);
        let mut initial = vec![all_txs[i].clone()];
        for tx in &all_txs {
            if rng.gen_bool(0.3) {
                initial.push(tx.clone());
            }
        }
        seeded.extend(initial.iter().map(|tx| tx.digest()));
        node.set_pending_transactions(initial);
    }

    for _ in 0..NUM_ROUNDS {
        let mut round_nodes: Vec<&mut dyn Node> = Vec::new();
        for node in nodes.iter_mut() {
            round_nodes.push(node);
        }
        run_round(&mut round_nodes, &follows);
    }

    // nobody was misclassified, and everyone settles on the seeded union
    let expected = seeded;
    let mut answers: Vec<BTreeSet<Digest>> = Vec::new();
    for node in nodes.iter_mut() {
        assert!(node.malicious_nodes().is_empty());
        let consensus: BTreeSet<Digest> = node
            .send_to_followers()
            .iter()
            .map(|tx| tx.digest())
            .collect();
        answers.push(consensus);
    }
    for answer in &answers {
        assert_eq!(answer, &expected);
    }
}
