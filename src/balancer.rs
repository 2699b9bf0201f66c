//! Pool member selection.
//!
//! Each cycle the balancer picks the server a pool currently delegates to.
//! Selection only considers reachable members; a pool with no reachable
//! member yields no selection and is reported as failed.

use std::collections::HashMap;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{PoolId, PoolStatus, ServerId};

/// Selection strategy for a pool. Closed set; unknown strings are
/// rejected at the deserialization boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceMethod {
    RoundRobin,
    Weighted,
    LeastOutstanding,
    ResponseTime,
    Random,
}

impl std::fmt::Display for BalanceMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BalanceMethod::RoundRobin => "round_robin",
            BalanceMethod::Weighted => "weighted",
            BalanceMethod::LeastOutstanding => "least_outstanding",
            BalanceMethod::ResponseTime => "response_time",
            BalanceMethod::Random => "random",
        };
        write!(f, "{name}")
    }
}

/// What the balancer needs to know about one pool member, in the pool's
/// configured member order.
#[derive(Debug, Clone)]
pub struct MemberView {
    pub id: ServerId,
    /// Reachable and enabled; only eligible members can be selected.
    pub eligible: bool,
    /// Reachable but inside the warning band. Degrades the pool when the
    /// selection lands on this member.
    pub warning: bool,
    pub weight: f64,
    pub avg_response_ms: Option<f64>,
    /// Tie-breaker for response-time selection.
    pub avg_abs_offset_ms: Option<f64>,
    /// In-window check count; load proxy for least-outstanding.
    pub outstanding: usize,
}

/// Stateful selector. Round-robin cursors persist across cycles so
/// consecutive selections rotate through the membership.
#[derive(Debug, Default)]
pub struct Balancer {
    cursors: HashMap<PoolId, ServerId>,
}

impl Balancer {
    /// Pick the member a pool delegates to this cycle.
    ///
    /// Returns `None` when no member is eligible.
    pub fn select(
        &mut self,
        pool_id: PoolId,
        method: BalanceMethod,
        members: &[MemberView],
    ) -> Option<ServerId> {
        if !members.iter().any(|m| m.eligible) {
            self.cursors.remove(&pool_id);
            return None;
        }

        let selected = match method {
            BalanceMethod::RoundRobin => self.round_robin(pool_id, members),
            BalanceMethod::Weighted => weighted(members),
            BalanceMethod::LeastOutstanding => least_outstanding(members),
            BalanceMethod::ResponseTime => fastest(members),
            BalanceMethod::Random => random(members),
        };

        if let Some(id) = selected {
            trace!("pool {pool_id} ({method}) selected server {id}");
        }
        selected
    }

    /// Advance past the previously selected member, skipping ineligible
    /// ones. A vanished cursor restarts at the front of the member list.
    fn round_robin(&mut self, pool_id: PoolId, members: &[MemberView]) -> Option<ServerId> {
        let start = self
            .cursors
            .get(&pool_id)
            .and_then(|last| members.iter().position(|m| m.id == *last))
            .map_or(0, |pos| pos + 1);

        let next = (0..members.len())
            .map(|i| &members[(start + i) % members.len()])
            .find(|m| m.eligible)?;

        self.cursors.insert(pool_id, next.id);
        Some(next.id)
    }
}

/// Weighted random draw over eligible members. Members with zero weight
/// are never drawn unless every eligible weight is zero, in which case
/// the draw degrades to uniform.
fn weighted(members: &[MemberView]) -> Option<ServerId> {
    let eligible: Vec<&MemberView> = members.iter().filter(|m| m.eligible).collect();
    let total: f64 = eligible.iter().map(|m| m.weight).sum();
    if total <= 0.0 {
        return random(members);
    }

    let mut point = rand::thread_rng().gen_range(0.0..total);
    for member in &eligible {
        if point < member.weight {
            return Some(member.id);
        }
        point -= member.weight;
    }
    eligible.last().map(|m| m.id)
}

fn least_outstanding(members: &[MemberView]) -> Option<ServerId> {
    members
        .iter()
        .filter(|m| m.eligible)
        .min_by_key(|m| m.outstanding)
        .map(|m| m.id)
}

/// Lowest average response time wins, ties broken by the smaller average
/// |offset|. Members without measurements sort last so fresh servers do
/// not preempt ones with a track record.
fn fastest(members: &[MemberView]) -> Option<ServerId> {
    members
        .iter()
        .filter(|m| m.eligible)
        .min_by(|a, b| {
            let a_key = (
                a.avg_response_ms.unwrap_or(f64::INFINITY),
                a.avg_abs_offset_ms.unwrap_or(f64::INFINITY),
            );
            let b_key = (
                b.avg_response_ms.unwrap_or(f64::INFINITY),
                b.avg_abs_offset_ms.unwrap_or(f64::INFINITY),
            );
            a_key
                .0
                .total_cmp(&b_key.0)
                .then(a_key.1.total_cmp(&b_key.1))
        })
        .map(|m| m.id)
}

fn random(members: &[MemberView]) -> Option<ServerId> {
    let eligible: Vec<&MemberView> = members.iter().filter(|m| m.eligible).collect();
    if eligible.is_empty() {
        return None;
    }
    let idx = rand::thread_rng().gen_range(0..eligible.len());
    Some(eligible[idx].id)
}

/// Derive a pool's health from its membership and the current selection.
/// A pool with a healthy selected member is active even when other
/// members are unreachable; it only degrades when the selection itself
/// lands on a member in the warning band.
pub fn pool_status(members: &[MemberView], selected: Option<ServerId>) -> PoolStatus {
    if !members.iter().any(|m| m.eligible) {
        return PoolStatus::Failed;
    }
    let selected_warning = selected
        .and_then(|id| members.iter().find(|m| m.id == id))
        .is_some_and(|m| m.warning);
    if selected_warning {
        PoolStatus::Degraded
    } else {
        PoolStatus::Active
    }
}
