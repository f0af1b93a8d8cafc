//! Sequence renumbering
//!
//! Opening `row_count` free slots before a rule means moving that rule and
//! every rule that would collide with it up by `row_count`. The remote API
//! only offers single-rule writes and deletes, so each move is a write at
//! the new sequence followed by a delete of the old one. Moves run from the
//! highest sequence down, which keeps every destination free when it is
//! written.
//!
//! Three pieces:
//! - [`affected_block`] / [`RenumberPlan`]: pure planning over a fetched list
//! - [`execute_steps`]: runs steps one at a time, halting on the first failure
//! - [`RenumberEngine`]: fetch, plan, execute, re-fetch, guarded per ACL

use dashmap::DashSet;
use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;
use tnsr_acl_common::{AclError, AclResult, AclRule, AclRuleList, SequenceIndex, Transport};
use tracing::{debug, info, warn};

use crate::error::{AclMgrError, Result};
use crate::store::{RuleListing, RuleStore};

/// Positions in `sorted` of the rules that must move.
///
/// `sorted` must be ascending. The block starts at `start_sequence` and
/// grows while the next rule is within `row_count` of the block's current
/// last rule: once that rule moves up by `row_count` the next one would be
/// hit or overtaken. Returns `None` if `start_sequence` is not in the index.
pub fn affected_block(
    sorted: &[u32],
    start_sequence: u32,
    row_count: u32,
) -> Option<RangeInclusive<usize>> {
    let start = sorted.iter().position(|&s| s == start_sequence)?;
    let mut end = start;
    while end + 1 < sorted.len() && sorted[end + 1].abs_diff(sorted[end]) <= row_count {
        end += 1;
    }
    Some(start..=end)
}

/// One rule changing sequence number.
#[derive(Debug, Clone, PartialEq)]
pub struct Move {
    /// The rule as fetched, still at `from`.
    pub rule: AclRule,
    pub from: u32,
    pub to: u32,
}

impl Move {
    /// Write at the destination, then delete the source.
    pub fn steps(&self) -> [RenumberStep; 2] {
        [
            RenumberStep::Write {
                from: self.from,
                to: self.to,
                rule: self.rule.renumbered(self.to),
            },
            RenumberStep::Delete {
                sequence: self.from,
            },
        ]
    }
}

/// A single remote call of a renumbering chain.
#[derive(Debug, Clone, PartialEq)]
pub enum RenumberStep {
    /// Create-or-update `rule` (already renumbered to `to`).
    Write { from: u32, to: u32, rule: AclRule },
    /// Delete the rule at `sequence`.
    Delete { sequence: u32 },
}

impl fmt::Display for RenumberStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenumberStep::Write { from, to, .. } => write!(f, "write {} (from {})", to, from),
            RenumberStep::Delete { sequence } => write!(f, "delete {}", sequence),
        }
    }
}

/// Moves needed to open `row_count` slots at `start_sequence`, highest first.
#[derive(Debug, Clone, PartialEq)]
pub struct RenumberPlan {
    row_count: u32,
    start_sequence: u32,
    moves: Vec<Move>,
}

impl RenumberPlan {
    /// Plans against a fetched rule list.
    ///
    /// An empty plan means `start_sequence` is not in the list. A
    /// destination past `u32::MAX` is rejected before anything is sent.
    pub fn build(rules: &AclRuleList, row_count: u32, start_sequence: u32) -> AclResult<Self> {
        let index = SequenceIndex::from_rules(rules);
        if index.has_duplicates() {
            return Err(AclError::internal(
                "fetched rule list contains duplicate sequence numbers",
            ));
        }

        let sorted = index.ascending();
        let mut moves = Vec::new();

        if let Some(block) = affected_block(&sorted, start_sequence, row_count) {
            for &from in sorted[block].iter().rev() {
                let to = from.checked_add(row_count).ok_or_else(|| {
                    AclError::validation(
                        "sequence",
                        format!("{} + {} exceeds the largest sequence number", from, row_count),
                    )
                })?;
                let rule = rules.find(from).ok_or_else(|| {
                    AclError::internal(format!("sequence {} indexed but not listed", from))
                })?;
                moves.push(Move {
                    rule: rule.clone(),
                    from,
                    to,
                });
            }
        }

        Ok(Self {
            row_count,
            start_sequence,
            moves,
        })
    }

    pub fn row_count(&self) -> u32 {
        self.row_count
    }

    pub fn start_sequence(&self) -> u32 {
        self.start_sequence
    }

    /// Moves in execution order (descending source sequence).
    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// New sequence of the start rule, `None` for an empty plan.
    pub fn selected_sequence(&self) -> Option<u32> {
        self.moves.last().map(|m| m.to)
    }

    /// Flattened step chain, two steps per move.
    pub fn steps(&self) -> Vec<RenumberStep> {
        self.moves.iter().flat_map(Move::steps).collect()
    }
}

/// A renumbering chain that stopped part way.
///
/// The ACL is left with the completed steps applied and nothing after.
#[derive(Debug, Clone)]
pub struct PartialRenumberFailure {
    pub acl_name: String,
    /// Steps that succeeded, in execution order.
    pub completed: Vec<RenumberStep>,
    /// The step whose remote call failed.
    pub failed: RenumberStep,
    /// 1-based position of `failed` in the chain.
    pub position: usize,
    pub total: usize,
    /// Error returned for `failed`, unchanged.
    pub source: AclError,
}

impl fmt::Display for PartialRenumberFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Renumbering of ACL '{}' halted at step {} of {} ({}): {}; {} step(s) applied, re-fetch and inspect the ACL",
            self.acl_name,
            self.position,
            self.total,
            self.failed,
            self.source,
            self.completed.len()
        )
    }
}

impl std::error::Error for PartialRenumberFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Runs `steps` in order, awaiting each before starting the next.
///
/// The first failure stops the chain and marks the ACL's cache entry stale.
/// Returns the completed steps.
pub async fn execute_steps<T: Transport>(
    store: &RuleStore<T>,
    acl_name: &str,
    steps: Vec<RenumberStep>,
) -> std::result::Result<Vec<RenumberStep>, PartialRenumberFailure> {
    let total = steps.len();
    let mut completed = Vec::with_capacity(total);

    for (i, step) in steps.into_iter().enumerate() {
        debug!(acl = acl_name, step = %step, position = i + 1, total, "Renumber step");

        let result = match &step {
            RenumberStep::Write { rule, .. } => store.create_or_update_rule(acl_name, rule).await,
            RenumberStep::Delete { sequence } => {
                store.delete_sequence(acl_name, *sequence).await.map(|_| ())
            }
        };

        if let Err(source) = result {
            store.invalidate(acl_name);
            warn!(
                acl = acl_name,
                step = %step,
                position = i + 1,
                total,
                error = %source,
                "Renumbering halted, ACL left partially renumbered"
            );
            return Err(PartialRenumberFailure {
                acl_name: acl_name.to_string(),
                completed,
                failed: step,
                position: i + 1,
                total,
                source,
            });
        }
        completed.push(step);
    }

    Ok(completed)
}

/// Result of a shift.
#[derive(Debug, Clone, PartialEq)]
pub struct ShiftOutcome {
    pub acl_name: String,
    /// Rules as re-fetched after the shift.
    pub rules: AclRuleList,
    /// Where the start rule now lives; `None` if it was not found.
    pub selected_sequence: Option<u32>,
    /// `(from, to)` pairs in execution order.
    pub moves: Vec<(u32, u32)>,
}

impl ShiftOutcome {
    fn unchanged(listing: RuleListing, selected_sequence: Option<u32>) -> Self {
        Self {
            acl_name: listing.acl_name,
            rules: listing.rules,
            selected_sequence,
            moves: Vec::new(),
        }
    }
}

/// Holds an ACL name in the in-flight set until dropped.
struct ShiftGuard<'a> {
    in_flight: &'a DashSet<String>,
    acl_name: String,
}

impl<'a> ShiftGuard<'a> {
    fn acquire(in_flight: &'a DashSet<String>, acl_name: &str) -> Result<Self> {
        if !in_flight.insert(acl_name.to_string()) {
            warn!(acl = acl_name, "Shift rejected, another shift is in flight");
            return Err(AclMgrError::ShiftInProgress {
                acl_name: acl_name.to_string(),
            });
        }
        Ok(Self {
            in_flight,
            acl_name: acl_name.to_string(),
        })
    }
}

impl Drop for ShiftGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.remove(&self.acl_name);
    }
}

/// Shifts rules of an ACL through a shared [`RuleStore`].
///
/// At most one shift per ACL name runs at a time; shifts on different ACLs
/// are independent.
pub struct RenumberEngine<T> {
    store: Arc<RuleStore<T>>,
    in_flight: DashSet<String>,
}

impl<T: Transport> RenumberEngine<T> {
    pub fn new(store: Arc<RuleStore<T>>) -> Self {
        Self {
            store,
            in_flight: DashSet::new(),
        }
    }

    pub fn store(&self) -> &Arc<RuleStore<T>> {
        &self.store
    }

    /// Returns true while a shift on `acl_name` is running.
    pub fn is_shifting(&self, acl_name: &str) -> bool {
        self.in_flight.contains(acl_name)
    }

    /// Opens `row_count` free slots at `sequence`, moving colliding rules up.
    ///
    /// The rules are always re-fetched first. If `sequence` is not in the
    /// ACL, or `row_count` is zero, nothing is written.
    pub async fn shift_rows_from_sequence(
        &self,
        acl_name: &str,
        row_count: u32,
        sequence: u32,
    ) -> Result<ShiftOutcome> {
        let _guard = ShiftGuard::acquire(&self.in_flight, acl_name)?;

        let listing = self.store.fetch_rules(acl_name).await?;
        if row_count == 0 {
            debug!(acl = acl_name, sequence, "Zero-row shift, nothing to move");
            let selected = listing.rules.find(sequence).map(|_| sequence);
            return Ok(ShiftOutcome::unchanged(listing, selected));
        }

        let plan = RenumberPlan::build(&listing.rules, row_count, sequence)?;
        let Some(selected) = plan.selected_sequence() else {
            info!(acl = acl_name, sequence, "Sequence not in ACL, nothing to shift");
            return Ok(ShiftOutcome::unchanged(listing, None));
        };

        let moves: Vec<(u32, u32)> = plan.moves().iter().map(|m| (m.from, m.to)).collect();
        debug!(acl = acl_name, sequence, row_count, moves = ?moves, "Renumber plan");

        execute_steps(&self.store, acl_name, plan.steps()).await?;

        let listing = self.store.fetch_rules(acl_name).await?;
        info!(
            acl = acl_name,
            sequence,
            row_count,
            moved = moves.len(),
            selected,
            "Shifted ACL rules"
        );

        Ok(ShiftOutcome {
            acl_name: listing.acl_name,
            rules: listing.rules,
            selected_sequence: Some(selected),
            moves,
        })
    }
}
