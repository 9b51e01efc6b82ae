//! Fee-maximizing transaction selection
//!
//! Proposals are first closed into groups under three relations: spending an
//! output of another proposal (dependency), claiming the same UTXO
//! (conflict), and being spent by another proposal (descendant). Picks in
//! one group cannot affect validity in another, so each group is searched
//! independently by a backtracker that mutates one pool copy in place and
//! restores it exactly on unwind.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use crate::crypto::SignatureVerifier;
use crate::error::{ChainError, Result};
use crate::types::{Digest, Transaction, Value};
use crate::utxo::{Utxo, UtxoPool};
use crate::validation::check_transaction;

/// Result of a selection: the picked transactions (applicable in the given
/// order), their total fee, and the pool after applying them.
#[derive(Debug)]
pub struct Selection {
    pub picked: Vec<Transaction>,
    pub total_fee: Value,
    pub pool: UtxoPool,
}

/// Pick the subset of `proposals` that maximizes total fee over `pool`.
///
/// Every picked transaction is valid in pick order starting from `pool`;
/// the greedy epoch handler never beats this selection on fee.
pub fn select_max_fee_txs(
    pool: &UtxoPool,
    proposals: &[Transaction],
    verifier: &dyn SignatureVerifier,
) -> Result<Selection> {
    let mut picked = Vec::new();
    let mut total_fee: Value = 0.0;

    for mut group in build_groups(proposals) {
        let mut scratch = pool.clone();
        let (group_picks, group_fee) =
            search_group(&mut scratch, &mut group, &mut Vec::new(), 0.0, verifier);
        picked.extend(group_picks);
        total_fee += group_fee;
    }

    let mut result_pool = pool.clone();
    for tx in &picked {
        result_pool.apply(tx).ok_or_else(|| {
            ChainError::SelectionReplay(format!("picked transaction {} no longer applies", tx.digest()))
        })?;
    }

    Ok(Selection {
        picked,
        total_fee,
        pool: result_pool,
    })
}

/// One connected component of the proposal graph. Members are held in the
/// order the closure discovered them (dependencies before dependents); a
/// per-UTXO reference count over members' inputs answers the conflict probe
/// in O(inputs).
#[derive(Debug, Default)]
struct TxGroup {
    ids: HashSet<Digest>,
    members: VecDeque<Transaction>,
    input_refs: HashMap<Utxo, u32>,
}

impl TxGroup {
    fn contains(&self, id: &Digest) -> bool {
        self.ids.contains(id)
    }

    fn push_back(&mut self, tx: Transaction) {
        self.ids.insert(tx.digest());
        self.bump_refs(&tx, 1);
        self.members.push_back(tx);
    }

    fn push_front(&mut self, tx: Transaction) {
        self.ids.insert(tx.digest());
        self.bump_refs(&tx, 1);
        self.members.push_front(tx);
    }

    fn pop_front(&mut self) -> Option<Transaction> {
        self.members.pop_front()
    }

    /// Drop `tx` from the id and reference-count indexes (its entry has
    /// already been popped from the member list). Returns whether some
    /// remaining member still claims one of `tx`'s input UTXOs.
    fn detach(&mut self, tx: &Transaction) -> bool {
        self.ids.remove(&tx.digest());
        let mut max_left = 0;
        for input in &tx.inputs {
            let utxo = Utxo::new(input.prev_tx, input.output_index);
            if let Some(count) = self.input_refs.get_mut(&utxo) {
                *count -= 1;
                max_left = max_left.max(*count);
                if *count == 0 {
                    self.input_refs.remove(&utxo);
                }
            }
        }
        max_left > 0
    }

    fn bump_refs(&mut self, tx: &Transaction, by: u32) {
        for input in &tx.inputs {
            let utxo = Utxo::new(input.prev_tx, input.output_index);
            *self.input_refs.entry(utxo).or_insert(0) += by;
        }
    }
}

/// Worklist key: proposals are visited by descending input count, ties by
/// descending digest. `BTreeSet::pop_last` yields exactly that order.
fn sort_key(tx: &Transaction) -> (usize, Digest) {
    (tx.inputs.len(), tx.digest())
}

fn build_groups(proposals: &[Transaction]) -> Vec<TxGroup> {
    let mut by_id: HashMap<Digest, &Transaction> = HashMap::new();
    for tx in proposals {
        by_id.insert(tx.digest(), tx);
    }

    // every proposal claiming a given UTXO, whether from the pool or from
    // another proposal's outputs
    let mut spenders: HashMap<Utxo, HashSet<Digest>> = HashMap::new();
    for tx in proposals {
        for input in &tx.inputs {
            let utxo = Utxo::new(input.prev_tx, input.output_index);
            spenders.entry(utxo).or_default().insert(tx.digest());
        }
    }

    let mut seeds: Vec<&Transaction> = by_id.values().copied().collect();
    seeds.sort_unstable_by(|a, b| sort_key(b).cmp(&sort_key(a)));

    let mut groups = Vec::new();
    let mut processed: HashSet<Digest> = HashSet::new();
    for seed in seeds {
        if processed.contains(&seed.digest()) {
            continue;
        }
        let group = collect_group(seed, &by_id, &spenders);
        processed.extend(group.ids.iter().copied());
        groups.push(group);
    }
    groups
}

fn collect_group(
    seed: &Transaction,
    by_id: &HashMap<Digest, &Transaction>,
    spenders: &HashMap<Utxo, HashSet<Digest>>,
) -> TxGroup {
    let mut group = TxGroup::default();
    let mut related: BTreeSet<(usize, Digest)> = BTreeSet::new();
    related.insert(sort_key(seed));

    while let Some((_, id)) = related.pop_last() {
        if let Some(tx) = by_id.get(&id) {
            gather(&mut group, tx, &mut related, by_id, spenders);
        }
    }
    group
}

/// Depth-first closure step: pull in `tx`'s in-batch dependencies first so
/// they precede it in the member order, then enqueue its conflicts and
/// descendants for later visits.
fn gather(
    group: &mut TxGroup,
    tx: &Transaction,
    related: &mut BTreeSet<(usize, Digest)>,
    by_id: &HashMap<Digest, &Transaction>,
    spenders: &HashMap<Utxo, HashSet<Digest>>,
) {
    let own_id = tx.digest();
    if group.contains(&own_id) {
        return;
    }

    for input in &tx.inputs {
        if let Some(dep) = by_id.get(&input.prev_tx) {
            gather(group, dep, related, by_id, spenders);
        }
    }

    group.push_back(tx.clone());

    let mut enqueue = |claims: &HashSet<Digest>, group: &TxGroup| {
        for id in claims {
            if *id != own_id && !group.contains(id) {
                if let Some(other) = by_id.get(id) {
                    related.insert(sort_key(other));
                }
            }
        }
    };

    for input in &tx.inputs {
        let utxo = Utxo::new(input.prev_tx, input.output_index);
        if let Some(claims) = spenders.get(&utxo) {
            enqueue(claims, group);
        }
    }
    for index in 0..tx.outputs.len() {
        let utxo = Utxo::new(own_id, index as u32);
        if let Some(claims) = spenders.get(&utxo) {
            enqueue(claims, group);
        }
    }
}

/// Exhaustive search over one group. The front member is either taken (when
/// valid) or skipped (when invalid, or when taking it could shut out a
/// conflicting member); a valid, conflict-free member is committed without
/// exploring the skip branch, since dropping it can only lose fee. The pool
/// and the picked list are restored exactly before returning.
fn search_group(
    pool: &mut UtxoPool,
    group: &mut TxGroup,
    picked: &mut Vec<Transaction>,
    fee: Value,
    verifier: &dyn SignatureVerifier,
) -> (Vec<Transaction>, Value) {
    let Some(tx) = group.pop_front() else {
        return (picked.clone(), fee);
    };

    let has_conflict = group.detach(&tx);
    let is_valid = check_transaction(&tx, pool, verifier).is_valid();

    let mut best: Option<(Vec<Transaction>, Value)> = None;

    if is_valid {
        if let Some(applied) = pool.apply(&tx) {
            let gained = applied.fee;
            picked.push(tx.clone());
            let taken = search_group(pool, group, picked, fee + gained, verifier);
            picked.pop();
            pool.undo(applied);
            best = Some(taken);
        }
    }

    if !is_valid || has_conflict {
        let skipped = search_group(pool, group, picked, fee, verifier);
        best = match best {
            Some(taken) if taken.1 >= skipped.1 => Some(taken),
            _ => Some(skipped),
        };
    }

    group.push_front(tx);
    best.unwrap_or_else(|| (picked.clone(), fee))
}
