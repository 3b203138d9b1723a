//! Brings the remote cart to a desired state.
//!
//! 1. Read the remote cart (retried).
//! 2. Diff it against the desired entries.
//! 3. Apply each change with a bounded retry budget.
//! 4. If anything failed or the read-back differs, escalate through bulk
//!    endpoints, verifying after each and stopping at the first that holds.
//! 5. Report. A remote that never converges is logged and reported, not
//!    raised; only a missing token aborts.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::cart::CartEntry;
use tracing::{info, warn};

use crate::cart::LocalCart;
use crate::error::Result;
use crate::retry::{with_retry, RetryPolicy};
use crate::traits::RemoteApi;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CartChange {
    Add(CartEntry),
    Update(CartEntry),
    Remove(String),
}

/// Bulk fallbacks tried when per-item changes do not converge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Escalation {
    DeleteAll,
    Reset,
    ReplaceAll,
}

impl Escalation {
    fn ladder(target_is_empty: bool) -> &'static [Escalation] {
        if target_is_empty {
            &[Escalation::DeleteAll, Escalation::Reset, Escalation::ReplaceAll]
        } else {
            &[Escalation::ReplaceAll]
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalationAttempt {
    pub strategy: Escalation,
    pub accepted: bool,
    pub verified: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub desired_items: usize,
    pub remote_reachable: bool,
    pub planned: Vec<CartChange>,
    pub failed: Vec<CartChange>,
    pub escalations: Vec<EscalationAttempt>,
    pub verified: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ReconcileReport {
    fn start(desired_items: usize) -> Self {
        let now = Utc::now();
        Self {
            desired_items,
            remote_reachable: true,
            planned: Vec::new(),
            failed: Vec::new(),
            escalations: Vec::new(),
            verified: false,
            started_at: now,
            finished_at: now,
        }
    }

    fn finish(mut self) -> Self {
        self.finished_at = Utc::now();
        self
    }

    pub fn applied(&self) -> usize {
        self.planned.len().saturating_sub(self.failed.len())
    }
}

/// Changes turning `remote` into `desired`. Removals come first, then
/// additions and quantity updates in the order of `desired`.
pub fn diff(remote: &[CartEntry], desired: &[CartEntry]) -> Vec<CartChange> {
    let remote = LocalCart::from_entries(remote.iter().cloned());
    let desired = LocalCart::from_entries(desired.iter().cloned());
    let wanted: HashMap<&str, u32> = desired
        .entries()
        .iter()
        .map(|e| (e.post_id.as_str(), e.quantity))
        .collect();

    let mut changes: Vec<CartChange> = remote
        .entries()
        .iter()
        .filter(|e| !wanted.contains_key(e.post_id.as_str()))
        .map(|e| CartChange::Remove(e.post_id.clone()))
        .collect();

    for entry in desired.entries() {
        match remote.quantity(&entry.post_id) {
            Some(q) if q == entry.quantity => {}
            Some(_) => changes.push(CartChange::Update(entry.clone())),
            None => changes.push(CartChange::Add(entry.clone())),
        }
    }
    changes
}

fn same_contents(a: &[CartEntry], b: &[CartEntry]) -> bool {
    let mut a = a.to_vec();
    let mut b = b.to_vec();
    a.sort_by(|x, y| x.post_id.cmp(&y.post_id));
    b.sort_by(|x, y| x.post_id.cmp(&y.post_id));
    a == b
}

#[derive(Clone)]
pub struct Reconciler {
    remote: Arc<dyn RemoteApi>,
    retry: RetryPolicy,
}

impl Reconciler {
    pub fn new(remote: Arc<dyn RemoteApi>, retry: RetryPolicy) -> Self {
        Self { remote, retry }
    }

    pub async fn reconcile(&self, desired: &[CartEntry]) -> Result<ReconcileReport> {
        let desired = LocalCart::from_entries(desired.iter().cloned()).into_entries();
        let mut report = ReconcileReport::start(desired.len());

        let current = match self.read_remote().await {
            Ok(current) => current,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("Remote cart unreachable, nothing reconciled: {}", e);
                report.remote_reachable = false;
                return Ok(report.finish());
            }
        };

        report.planned = diff(&current, &desired);
        if report.planned.is_empty() {
            info!("Remote cart already matches ({} items)", desired.len());
            report.verified = true;
            return Ok(report.finish());
        }

        info!("Reconciling remote cart: {} changes", report.planned.len());
        for change in &report.planned {
            match self.apply(change).await {
                Ok(()) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!("Cart change {:?} failed: {}", change, e);
                    report.failed.push(change.clone());
                }
            }
        }

        if report.failed.is_empty() {
            report.verified = self.verify(&desired).await?;
        }

        if !report.verified {
            for &strategy in Escalation::ladder(desired.is_empty()) {
                let accepted = match self.escalate(strategy, &desired).await {
                    Ok(()) => true,
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        warn!("Escalation {:?} failed: {}", strategy, e);
                        false
                    }
                };
                let verified = accepted && self.verify(&desired).await?;
                report.escalations.push(EscalationAttempt {
                    strategy,
                    accepted,
                    verified,
                });
                if verified {
                    info!("Remote cart converged after {:?}", strategy);
                    report.verified = true;
                    break;
                }
            }
        }

        if !report.verified {
            warn!(
                "Remote cart still differs from local state after {} escalations",
                report.escalations.len()
            );
        }
        Ok(report.finish())
    }

    async fn read_remote(&self) -> Result<Vec<CartEntry>> {
        let remote = &self.remote;
        with_retry("fetch remote cart", self.retry, move || remote.fetch_cart()).await
    }

    async fn verify(&self, desired: &[CartEntry]) -> Result<bool> {
        match self.read_remote().await {
            Ok(current) => Ok(same_contents(&current, desired)),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!("Could not read back remote cart: {}", e);
                Ok(false)
            }
        }
    }

    async fn apply(&self, change: &CartChange) -> Result<()> {
        let remote = &self.remote;
        match change {
            CartChange::Add(entry) => {
                let (id, quantity) = (entry.post_id.as_str(), entry.quantity);
                with_retry("add cart item", self.retry, move || remote.add_to_cart(id, quantity)).await
            }
            CartChange::Update(entry) => {
                let (id, quantity) = (entry.post_id.as_str(), entry.quantity);
                with_retry("update cart item", self.retry, move || {
                    remote.update_cart_quantity(id, quantity)
                })
                .await
            }
            CartChange::Remove(id) => {
                let id = id.as_str();
                with_retry("remove cart item", self.retry, move || remote.remove_from_cart(id)).await
            }
        }
    }

    async fn escalate(&self, strategy: Escalation, desired: &[CartEntry]) -> Result<()> {
        let remote = &self.remote;
        match strategy {
            Escalation::DeleteAll => {
                with_retry("delete cart", self.retry, move || remote.delete_cart()).await
            }
            Escalation::Reset => with_retry("reset cart", self.retry, move || remote.reset_cart()).await,
            Escalation::ReplaceAll => {
                with_retry("replace cart", self.retry, move || remote.replace_cart(desired)).await
            }
        }
    }
}
