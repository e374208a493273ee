//! # Order Reconciler
//!
//! Converges a remote ordered collection onto a desired order using the
//! remote's three primitives: contiguous-range move, positional add, and
//! positional remove. Duplicate item ids are legal, so matching is by
//! (id, occurrence index), never by id alone.
//!
//! ## Planning
//!
//! The planner computes a minimal-ish operation script offline, against
//! a snapshot:
//!
//! 1. Match current occurrences against desired occurrences. Unmatched
//!    current occurrences become removes, emitted back-to-front so each
//!    index stays valid as the list shrinks.
//! 2. Rank each kept item by its matched desired index and find the
//!    longest increasing subsequence of ranks; those items never move.
//! 3. The rest move, in ascending rank order, batched into maximal
//!    blocks of consecutive ranks that are physically adjacent. Each
//!    block is inserted immediately after its predecessor rank. A block
//!    already in place is skipped, which makes replanning idempotent.
//! 4. Unmatched desired occurrences become adds, in ascending desired
//!    index.
//!
//! ## Applying
//!
//! Operations are applied strictly serially: the remote hands back a new
//! [`ConcurrencyToken`] on every write and the next write must present
//! it. A rejected token means someone else wrote concurrently; the run
//! stops with a conflict rather than guessing. After the script runs,
//! the order is re-fetched and verified index-for-index.
//!
//! Pushing a locally-edited order out ([`OrderReconciler::sync_to_remote`])
//! plans a membership diff instead: step 3 is skipped and the prior
//! snapshot's relative order is taken on trust, so only adds and removes
//! are emitted.
//!
//! Pinned items (the configured exclusion predicate, applied only when
//! syncing a locally-edited order out) are never removed or moved; they
//! shift as neighbors are rearranged but keep their relative order.

use crate::error::{Result, SyncError};
use crate::job::Job;
use core_library::store::CollectionStore;
use core_runtime::events::{EngineEvent, EventBus, ReorderEvent};
use core_runtime::state::{ObservableState, StateHub};
use core_runtime::EngineConfig;
use remote_traits::{
    CollectionGateway, CollectionSnapshot, ConcurrencyToken, MoveRange, RemoteError,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Published progress of one collection's reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ReorderProgress {
    #[default]
    Idle,
    /// Planning the operation script.
    Calculating,
    /// Applying the script.
    Reordering { completed: usize, total: usize },
    /// Script applied; re-fetching to verify.
    Verifying,
    /// The run ended without converging.
    Failed { message: String },
}

/// One step of a reconciliation script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReorderOp {
    Move(MoveRange),
    Add { item_id: String, index: usize },
    Remove { index: usize },
}

/// Reconciles remote collection order against a desired order.
pub struct OrderReconciler {
    config: Arc<EngineConfig>,
    gateway: Arc<dyn CollectionGateway>,
    store: Arc<dyn CollectionStore>,
    progress: StateHub<String, ReorderProgress>,
    events: EventBus,
}

impl OrderReconciler {
    pub fn new(
        config: Arc<EngineConfig>,
        gateway: Arc<dyn CollectionGateway>,
        store: Arc<dyn CollectionStore>,
        events: EventBus,
    ) -> Self {
        Self {
            config,
            gateway,
            store,
            progress: StateHub::new(),
            events,
        }
    }

    /// Persist a locally edited order, to be pushed later with
    /// [`Self::sync_to_remote`].
    pub async fn record_local_order(&self, collection_id: &str, order: &[String]) -> Result<()> {
        self.store.replace_order(collection_id, order).await?;
        Ok(())
    }

    /// The locally mirrored order, empty when the collection is unknown.
    pub async fn local_order(&self, collection_id: &str) -> Result<Vec<String>> {
        Ok(self.store.load_order(collection_id).await?)
    }

    /// Observable progress for one collection.
    pub fn progress_of(&self, collection_id: &str) -> ObservableState<ReorderProgress> {
        self.progress.cell(&collection_id.to_string()).observe()
    }

    /// Drive the remote collection to `desired`, fetching the current
    /// order first. Background form of [`Self::reconcile`].
    pub fn spawn_reconcile(self: &Arc<Self>, collection_id: &str, desired: Vec<String>) -> Job {
        let this = Arc::clone(self);
        let collection_id = collection_id.to_string();
        Job::spawn(move |token| async move {
            this.reconcile(&collection_id, &desired, &token)
                .await
                .map(|_| ())
        })
    }

    /// Drive the remote collection to `desired`.
    ///
    /// Returns the number of operations applied. Cancellation stops
    /// between operations and leaves the remote however far it got; the
    /// next run replans from the remote's actual state.
    #[instrument(skip(self, desired, token), fields(desired_len = desired.len()))]
    pub async fn reconcile(
        &self,
        collection_id: &str,
        desired: &[String],
        token: &CancellationToken,
    ) -> Result<usize> {
        self.progress
            .publish(&collection_id.to_string(), ReorderProgress::Calculating);
        self.events
            .emit(EngineEvent::Reorder(ReorderEvent::Started {
                collection_id: collection_id.to_string(),
            }))
            .ok();

        let snapshot = tokio::select! {
            _ = token.cancelled() => {
                self.progress.publish(&collection_id.to_string(), ReorderProgress::Idle);
                return Err(SyncError::Cancelled);
            }
            s = self.gateway.fetch_order(collection_id) => {
                s.map_err(|e| self.fail(collection_id, e.into()))?
            }
        };

        let no_pins = |_: &str| false;
        self.run(
            collection_id,
            desired,
            snapshot,
            &no_pins,
            PlanMode::Reorder,
            token,
        )
        .await
    }

    /// Push a locally-edited order out to the remote, starting from the
    /// snapshot the edit was made against.
    ///
    /// The plan is a pure membership diff against `prior`: adds and
    /// removes only, no moves, trading move-minimality for simplicity
    /// since the surviving items are trusted to already sit in the
    /// desired relative order. Items matching the configured exclusion
    /// predicate are pinned: never removed, dropped from `desired` so
    /// they are never re-added, and ignored when verifying.
    #[instrument(skip(self, desired, prior, token), fields(desired_len = desired.len()))]
    pub async fn sync_to_remote(
        &self,
        collection_id: &str,
        desired: &[String],
        prior: CollectionSnapshot,
        token: &CancellationToken,
    ) -> Result<usize> {
        self.progress
            .publish(&collection_id.to_string(), ReorderProgress::Calculating);
        self.events
            .emit(EngineEvent::Reorder(ReorderEvent::Started {
                collection_id: collection_id.to_string(),
            }))
            .ok();

        let pinned = Arc::clone(&self.config.reorder_exclusion);
        // A pinned id cannot be pushed; planning an add for one would
        // duplicate it remotely and then fail verification.
        let desired: Vec<String> = desired
            .iter()
            .filter(|id| !pinned(id.as_str()))
            .cloned()
            .collect();
        self.run(
            collection_id,
            &desired,
            prior,
            pinned.as_ref(),
            PlanMode::Membership,
            token,
        )
        .await
    }

    async fn run(
        &self,
        collection_id: &str,
        desired: &[String],
        snapshot: CollectionSnapshot,
        pinned: &(dyn Fn(&str) -> bool + Send + Sync),
        mode: PlanMode,
        token: &CancellationToken,
    ) -> Result<usize> {
        let key = collection_id.to_string();
        let current = snapshot.ordered_ids();
        let ops = plan(&current, desired, pinned, mode);
        let total = ops.len();
        debug!(total, "reconciliation planned");

        let mut chain = snapshot.token;
        for (i, op) in ops.iter().enumerate() {
            if token.is_cancelled() {
                self.progress.publish(&key, ReorderProgress::Idle);
                return Err(SyncError::Cancelled);
            }
            let applied = tokio::select! {
                _ = token.cancelled() => {
                    self.progress.publish(&key, ReorderProgress::Idle);
                    return Err(SyncError::Cancelled);
                }
                r = self.apply(collection_id, op, &chain) => r,
            };
            chain = applied.map_err(|e| self.fail(collection_id, e))?;
            self.progress.publish(
                &key,
                ReorderProgress::Reordering {
                    completed: i + 1,
                    total,
                },
            );
        }

        self.progress.publish(&key, ReorderProgress::Verifying);
        let after = tokio::select! {
            _ = token.cancelled() => {
                self.progress.publish(&key, ReorderProgress::Idle);
                return Err(SyncError::Cancelled);
            }
            s = self.gateway.fetch_order(collection_id) => {
                s.map_err(|e| self.fail(collection_id, e.into()))?
            }
        };

        let verified = after.ordered_ids();
        let remote_order: Vec<String> = verified
            .iter()
            .filter(|id| !pinned(id))
            .cloned()
            .collect();
        if remote_order != desired {
            warn!(
                remote_len = remote_order.len(),
                desired_len = desired.len(),
                "post-apply verification mismatch"
            );
            return Err(self.fail(
                collection_id,
                SyncError::Conflict {
                    collection_id: collection_id.to_string(),
                    reason: "remote order diverged during reconciliation".to_string(),
                },
            ));
        }

        // Mirror the verified order locally, pinned items included.
        self.store
            .replace_order(collection_id, &verified)
            .await
            .map_err(|e| self.fail(collection_id, e.into()))?;

        self.progress.publish(&key, ReorderProgress::Idle);
        info!(operations = total, "reconciliation converged");
        self.events
            .emit(EngineEvent::Reorder(ReorderEvent::Converged {
                collection_id: collection_id.to_string(),
                operations: total,
            }))
            .ok();
        Ok(total)
    }

    async fn apply(
        &self,
        collection_id: &str,
        op: &ReorderOp,
        token: &ConcurrencyToken,
    ) -> Result<ConcurrencyToken> {
        let result = match op {
            ReorderOp::Move(range) => self.gateway.apply_move(collection_id, *range, token).await,
            ReorderOp::Add { item_id, index } => {
                self.gateway
                    .apply_add(collection_id, item_id, *index, token)
                    .await
            }
            ReorderOp::Remove { index } => {
                self.gateway.apply_remove(collection_id, *index, token).await
            }
        };
        result.map_err(|e| match e {
            RemoteError::TokenRejected { collection_id } => SyncError::Conflict {
                collection_id,
                reason: "concurrency token rejected mid-script".to_string(),
            },
            other => SyncError::Remote(other),
        })
    }

    fn fail(&self, collection_id: &str, error: SyncError) -> SyncError {
        self.progress.publish(
            &collection_id.to_string(),
            ReorderProgress::Failed {
                message: error.to_string(),
            },
        );
        self.events
            .emit(EngineEvent::Reorder(ReorderEvent::Failed {
                collection_id: collection_id.to_string(),
                message: error.to_string(),
            }))
            .ok();
        error
    }
}

/// Which operations a plan may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlanMode {
    /// Removes, moves, and adds: full convergence onto the desired order.
    Reorder,
    /// Removes and adds only: a membership diff against a trusted prior
    /// snapshot whose surviving items already sit in the desired order.
    Membership,
}

/// Plan the operation script converging `current` onto `desired`.
///
/// Pure; safe to call against any snapshot. Replanning against an
/// already-converged order yields an empty script.
pub fn plan_reorder(current: &[String], desired: &[String]) -> Vec<ReorderOp> {
    plan(current, desired, &|_| false, PlanMode::Reorder)
}

/// Cell of the planner's simulated physical list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cell {
    /// Excluded from reconciliation; shifts but never targeted.
    Pinned,
    /// Matched or added item, labeled with its desired index.
    Logical(usize),
}

fn plan(
    current: &[String],
    desired: &[String],
    pinned: &dyn Fn(&str) -> bool,
    mode: PlanMode,
) -> Vec<ReorderOp> {
    let mut ops = Vec::new();

    // Desired positions per id, in occurrence order.
    let mut desired_positions: HashMap<&str, Vec<usize>> = HashMap::new();
    for (j, id) in desired.iter().enumerate() {
        desired_positions.entry(id.as_str()).or_default().push(j);
    }

    // Match current occurrences against desired occurrences; unmatched
    // current occurrences are removed, back-to-front.
    let mut seen: HashMap<&str, usize> = HashMap::new();
    let mut sim: Vec<Cell> = Vec::new();
    let mut matched_per_id: HashMap<&str, usize> = HashMap::new();
    let mut removals: Vec<usize> = Vec::new();
    for (i, id) in current.iter().enumerate() {
        if pinned(id) {
            sim.push(Cell::Pinned);
            continue;
        }
        let occurrence = {
            let counter = seen.entry(id.as_str()).or_insert(0);
            let k = *counter;
            *counter += 1;
            k
        };
        match desired_positions
            .get(id.as_str())
            .and_then(|v| v.get(occurrence))
        {
            Some(&rank) => {
                sim.push(Cell::Logical(rank));
                *matched_per_id.entry(id.as_str()).or_insert(0) += 1;
            }
            None => removals.push(i),
        }
    }
    for &i in removals.iter().rev() {
        ops.push(ReorderOp::Remove { index: i });
    }

    // Ranks of kept items, in physical order. The longest increasing
    // subsequence stays put; everything else moves. A membership diff
    // never moves anything.
    if mode == PlanMode::Reorder {
        let ranks: Vec<usize> = sim
            .iter()
            .filter_map(|c| match c {
                Cell::Logical(rank) => Some(*rank),
                Cell::Pinned => None,
            })
            .collect();
        let lis = longest_increasing_subsequence(&ranks);
        let in_lis: std::collections::HashSet<usize> = lis.iter().map(|&i| ranks[i]).collect();
        let mut movers: Vec<usize> = ranks
            .iter()
            .copied()
            .filter(|r| !in_lis.contains(r))
            .collect();
        movers.sort_unstable();

        let mut sorted_ranks = ranks.clone();
        sorted_ranks.sort_unstable();

        let mut idx = 0;
        while idx < movers.len() {
            let start_rank = movers[idx];
            let start_pos = position_of(&sim, start_rank);
            // Maximal block: consecutive ranks, physically adjacent.
            let mut len = 1;
            while idx + len < movers.len()
                && movers[idx + len] == start_rank + len
                && position_of(&sim, movers[idx + len]) == start_pos + len
            {
                len += 1;
            }

            // Insert immediately after the largest rank below the block;
            // ranks below are already in their final relative positions.
            let dest = match predecessor_rank(&sorted_ranks, start_rank) {
                Some(p) => position_of(&sim, p) + 1,
                None => 0,
            };

            if dest != start_pos {
                ops.push(ReorderOp::Move(MoveRange {
                    range_start: start_pos,
                    range_length: len,
                    insert_before: dest,
                }));
                let block: Vec<Cell> = sim.drain(start_pos..start_pos + len).collect();
                let adjusted = if dest > start_pos { dest - len } else { dest };
                for (offset, cell) in block.into_iter().enumerate() {
                    sim.insert(adjusted + offset, cell);
                }
            }
            idx += len;
        }
    }

    // Additions: unmatched desired occurrences, ascending. Every lower
    // desired index is already present, so each insertion lands right
    // after its logical predecessor.
    let mut additions: Vec<usize> = Vec::new();
    for (id, positions) in &desired_positions {
        let matched = matched_per_id.get(id).copied().unwrap_or(0);
        additions.extend(positions.iter().skip(matched).copied());
    }
    additions.sort_unstable();
    for j in additions {
        let dest = match sim
            .iter()
            .filter_map(|c| match c {
                Cell::Logical(rank) if *rank < j => Some(*rank),
                _ => None,
            })
            .max()
        {
            Some(p) => position_of(&sim, p) + 1,
            None => 0,
        };
        ops.push(ReorderOp::Add {
            item_id: desired[j].clone(),
            index: dest,
        });
        sim.insert(dest, Cell::Logical(j));
    }

    ops
}

fn position_of(sim: &[Cell], rank: usize) -> usize {
    sim.iter()
        .position(|c| *c == Cell::Logical(rank))
        .unwrap_or(0)
}

/// Largest rank strictly below `rank`, if any. `sorted` is ascending.
fn predecessor_rank(sorted: &[usize], rank: usize) -> Option<usize> {
    let idx = sorted.partition_point(|&r| r < rank);
    if idx == 0 {
        None
    } else {
        Some(sorted[idx - 1])
    }
}

/// Indices of one longest strictly-increasing subsequence of `values`.
///
/// Patience sorting with predecessor links, O(n log n). Values are
/// distinct here (desired indices), so strict and non-strict coincide.
fn longest_increasing_subsequence(values: &[usize]) -> Vec<usize> {
    let mut tails: Vec<usize> = Vec::new();
    let mut prev: Vec<Option<usize>> = vec![None; values.len()];
    for i in 0..values.len() {
        let pos = tails.partition_point(|&t| values[t] < values[i]);
        if pos > 0 {
            prev[i] = Some(tails[pos - 1]);
        }
        if pos == tails.len() {
            tails.push(i);
        } else {
            tails[pos] = i;
        }
    }
    let mut lis = Vec::new();
    let mut cursor = tails.last().copied();
    while let Some(i) = cursor {
        lis.push(i);
        cursor = prev[i];
    }
    lis.reverse();
    lis
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    /// Replay a script against a plain list, mirroring the remote's
    /// apply semantics.
    fn replay(order: &mut Vec<String>, ops: &[ReorderOp]) {
        for op in ops {
            match op {
                ReorderOp::Remove { index } => {
                    order.remove(*index);
                }
                ReorderOp::Add { item_id, index } => {
                    order.insert(*index, item_id.clone());
                }
                ReorderOp::Move(m) => {
                    let block: Vec<String> =
                        order.drain(m.range_start..m.range_start + m.range_length).collect();
                    let adjusted = if m.insert_before > m.range_start {
                        m.insert_before - m.range_length
                    } else {
                        m.insert_before
                    };
                    for (offset, id) in block.into_iter().enumerate() {
                        order.insert(adjusted + offset, id);
                    }
                }
            }
        }
    }

    fn assert_converges(current: &[&str], desired: &[&str]) -> Vec<ReorderOp> {
        let current = ids(current);
        let desired = ids(desired);
        let ops = plan_reorder(&current, &desired);
        let mut working = current;
        replay(&mut working, &ops);
        assert_eq!(working, desired, "script must converge");
        ops
    }

    #[test]
    fn already_converged_plans_nothing() {
        let ops = assert_converges(&["a", "b", "c"], &["a", "b", "c"]);
        assert!(ops.is_empty());
    }

    #[test]
    fn single_tail_move_uses_one_operation() {
        // Moving one out-of-place item must not shuffle everything else.
        let ops = assert_converges(&["c", "a", "b"], &["a", "b", "c"]);
        assert_eq!(
            ops,
            vec![ReorderOp::Move(MoveRange {
                range_start: 0,
                range_length: 1,
                insert_before: 3,
            })]
        );
    }

    #[test]
    fn adjacent_movers_batch_into_one_range() {
        // a, b, c is the longest kept run; d and e move as one block.
        let ops = assert_converges(&["d", "e", "a", "b", "c"], &["a", "b", "c", "d", "e"]);
        assert_eq!(
            ops,
            vec![ReorderOp::Move(MoveRange {
                range_start: 0,
                range_length: 2,
                insert_before: 5,
            })]
        );
    }

    #[test]
    fn removals_are_emitted_back_to_front() {
        let ops = assert_converges(&["a", "x", "b", "y", "c"], &["a", "b", "c"]);
        assert_eq!(
            ops,
            vec![
                ReorderOp::Remove { index: 3 },
                ReorderOp::Remove { index: 1 },
            ]
        );
    }

    #[test]
    fn additions_land_at_their_desired_index() {
        let ops = assert_converges(&["a", "c"], &["a", "b", "c", "d"]);
        assert_eq!(
            ops,
            vec![
                ReorderOp::Add {
                    item_id: "b".to_string(),
                    index: 1,
                },
                ReorderOp::Add {
                    item_id: "d".to_string(),
                    index: 3,
                },
            ]
        );
    }

    #[test]
    fn empty_desired_removes_everything() {
        let ops = assert_converges(&["a", "b", "a"], &[]);
        assert_eq!(ops.len(), 3);
        assert!(matches!(ops[0], ReorderOp::Remove { index: 2 }));
    }

    #[test]
    fn duplicates_match_by_occurrence() {
        // Second "a" is the surplus one, not the first.
        assert_converges(&["a", "b", "a"], &["a", "b"]);
        assert_converges(&["a", "b", "a"], &["b", "a", "a"]);
        assert_converges(&["a", "a", "b"], &["b", "a", "a", "b"]);
    }

    #[test]
    fn full_reversal_converges() {
        assert_converges(&["a", "b", "c", "d", "e"], &["e", "d", "c", "b", "a"]);
    }

    #[test]
    fn mixed_script_converges() {
        assert_converges(
            &["a", "b", "c", "d", "e"],
            &["f", "d", "b", "a", "g"],
        );
    }

    #[test]
    fn interleaved_shuffle_converges() {
        assert_converges(&["d", "a", "e", "b", "c"], &["a", "b", "c", "d", "e"]);
        assert_converges(&["b", "d", "a", "c"], &["a", "b", "c", "d"]);
    }

    #[test]
    fn replanning_a_converged_order_is_empty() {
        let current = ids(&["c", "a", "b"]);
        let desired = ids(&["a", "b", "c"]);
        let ops = plan_reorder(&current, &desired);
        let mut working = current;
        replay(&mut working, &ops);
        assert!(plan_reorder(&working, &desired).is_empty());
    }

    #[test]
    fn pinned_items_are_never_touched() {
        let current = ids(&["local:x", "b", "a"]);
        let desired = ids(&["a", "b"]);
        let pinned = |id: &str| id.starts_with("local:");
        let ops = plan(&current, &desired, &pinned, PlanMode::Reorder);
        for op in &ops {
            if let ReorderOp::Remove { index } = op {
                assert_ne!(*index, 0, "pinned item must not be removed");
            }
        }
        let mut working = current;
        replay(&mut working, &ops);
        let logical: Vec<String> = working
            .iter()
            .filter(|id| !pinned(id))
            .cloned()
            .collect();
        assert_eq!(logical, desired);
        assert!(working.contains(&"local:x".to_string()));
    }

    #[test]
    fn pinned_item_inside_a_run_splits_the_block() {
        let current = ids(&["c", "local:x", "a", "b"]);
        let desired = ids(&["a", "b", "c"]);
        let pinned = |id: &str| id.starts_with("local:");
        let ops = plan(&current, &desired, &pinned, PlanMode::Reorder);
        let mut working = current;
        replay(&mut working, &ops);
        let logical: Vec<String> = working
            .iter()
            .filter(|id| !pinned(id))
            .cloned()
            .collect();
        assert_eq!(logical, desired);
    }

    #[test]
    fn membership_diff_adds_and_removes_without_moving() {
        let current = ids(&["a", "x", "b"]);
        let desired = ids(&["a", "b", "c"]);
        let ops = plan(&current, &desired, &|_| false, PlanMode::Membership);
        assert_eq!(
            ops,
            vec![
                ReorderOp::Remove { index: 1 },
                ReorderOp::Add {
                    item_id: "c".to_string(),
                    index: 2,
                },
            ]
        );
        let mut working = current;
        replay(&mut working, &ops);
        assert_eq!(working, desired);
    }

    #[test]
    fn membership_diff_ignores_order_differences() {
        // Same membership, different order: nothing to push.
        let current = ids(&["b", "a"]);
        let desired = ids(&["a", "b"]);
        assert!(plan(&current, &desired, &|_| false, PlanMode::Membership).is_empty());
    }

    #[test]
    fn lis_keeps_the_longest_increasing_run() {
        let lis = longest_increasing_subsequence(&[3, 0, 4, 1, 2]);
        let values: Vec<usize> = lis.iter().map(|&i| [3, 0, 4, 1, 2][i]).collect();
        assert_eq!(values, vec![0, 1, 2]);
    }

    #[test]
    fn lis_of_sorted_input_is_everything() {
        assert_eq!(longest_increasing_subsequence(&[0, 1, 2, 3]).len(), 4);
    }

    #[test]
    fn convergence_over_permutations() {
        // Every permutation of five items must converge.
        let base = ["a", "b", "c", "d", "e"];
        let mut perm = base.to_vec();
        permute(&mut perm, 0, &mut |p| {
            assert_converges(p, &base);
        });

        fn permute<'a>(
            items: &mut Vec<&'a str>,
            k: usize,
            visit: &mut impl FnMut(&[&'a str]),
        ) {
            if k == items.len() {
                visit(items);
                return;
            }
            for i in k..items.len() {
                items.swap(k, i);
                permute(items, k + 1, visit);
                items.swap(k, i);
            }
        }
    }
}
