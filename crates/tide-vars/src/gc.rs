//! Garbage collector — removes secret and config versions that the
//! current spec no longer references.
//!
//! Live items are listed by the stack label and compared against the
//! identities of the resolved variables:
//!
//! - an item missing any reserved label is foreign or corrupt and is removed
//! - an item whose `(stack, logical name, hash)` is not declared is a
//!   superseded version and is removed
//! - everything else is kept
//!
//! Any listed item older than the rotation threshold produces a warning,
//! whether it is kept or removed.
//!
//! Removal failures are returned, never skipped.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tide_core::{ControlPlane, Filter, InventoryItem, ResolvedSpec, Settings, VariableIdentity, VariableKind};
use tracing::{debug, info, warn};

use crate::error::VariableResult;

/// Age after which a referenced variable should be rotated.
pub const ROTATION_THRESHOLD_DAYS: i64 = 30;

/// Why an item was removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PruneReason {
    /// Missing one or more reserved labels.
    Unlabeled,
    /// Identity no longer declared.
    Superseded,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrunedItem {
    pub id: String,
    pub name: String,
    pub reason: PruneReason,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RotationNotice {
    pub name: String,
    pub age_days: i64,
}

/// Outcome of pruning one kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PruneReport {
    pub kind: VariableKind,
    pub removed: Vec<PrunedItem>,
    pub retained: usize,
    pub rotation_due: Vec<RotationNotice>,
}

/// Items split into removals and keepers.
#[derive(Debug, Default)]
pub struct PrunePlan {
    pub remove: Vec<(InventoryItem, PruneReason)>,
    pub retain: Vec<InventoryItem>,
}

/// Decide what to remove. Pure; performs no calls.
pub fn plan(items: Vec<InventoryItem>, current: &HashSet<VariableIdentity>) -> PrunePlan {
    let mut plan = PrunePlan::default();
    for item in items {
        match VariableIdentity::from_labels(&item.labels) {
            None => plan.remove.push((item, PruneReason::Unlabeled)),
            Some(identity) if !current.contains(&identity) => {
                plan.remove.push((item, PruneReason::Superseded))
            }
            Some(_) => plan.retain.push(item),
        }
    }
    plan
}

/// Identities of the managed variables of one kind.
pub fn identity_set(resolved: &ResolvedSpec, kind: VariableKind) -> HashSet<VariableIdentity> {
    resolved.variables_of(kind).map(|v| v.identity()).collect()
}

pub struct GarbageCollector<'a, C: ControlPlane + ?Sized> {
    client: &'a C,
    stack: &'a str,
    now: DateTime<Utc>,
    threshold: Duration,
}

impl<'a, C: ControlPlane + ?Sized> GarbageCollector<'a, C> {
    pub fn new(client: &'a C, stack: &'a str) -> Self {
        Self {
            client,
            stack,
            now: Utc::now(),
            threshold: Duration::days(ROTATION_THRESHOLD_DAYS),
        }
    }

    /// Evaluate item ages against a fixed instant.
    pub fn with_clock(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn with_threshold(mut self, threshold: Duration) -> Self {
        self.threshold = threshold;
        self
    }

    /// List, plan and remove. Stops at the first failed removal.
    pub async fn prune(
        &self,
        kind: VariableKind,
        current: &HashSet<VariableIdentity>,
    ) -> VariableResult<PruneReport> {
        let items = self
            .client
            .list_variables(kind, &[Filter::stack(self.stack)])
            .await?;
        debug!(stack = %self.stack, %kind, live = items.len(), declared = current.len(), "pruning");

        let rotation_due = self.rotation_due(&items);
        for notice in &rotation_due {
            warn!(
                stack = %self.stack,
                %kind,
                name = %notice.name,
                age_days = notice.age_days,
                "{kind} should be rotated"
            );
        }

        let plan = plan(items, current);
        let mut removed = Vec::with_capacity(plan.remove.len());
        for (item, reason) in plan.remove {
            if reason == PruneReason::Unlabeled {
                warn!(stack = %self.stack, %kind, name = %item.name, "removing item without identity labels");
            }
            self.client.remove_variable(kind, &item.id).await?;
            info!(stack = %self.stack, %kind, name = %item.name, ?reason, "removed");
            removed.push(PrunedItem {
                id: item.id,
                name: item.name,
                reason,
            });
        }

        Ok(PruneReport {
            kind,
            removed,
            retained: plan.retain.len(),
            rotation_due,
        })
    }

    fn rotation_due(&self, items: &[InventoryItem]) -> Vec<RotationNotice> {
        items
            .iter()
            .filter_map(|item| {
                let age = self.now.signed_duration_since(item.created_at);
                (age > self.threshold).then(|| RotationNotice {
                    name: item.name.clone(),
                    age_days: age.num_days(),
                })
            })
            .collect()
    }
}

/// Prune secrets, then configs, against a reconciled spec.
pub async fn prune<C: ControlPlane + ?Sized>(
    resolved: &ResolvedSpec,
    settings: &Settings,
    client: &C,
) -> VariableResult<Vec<PruneReport>> {
    let collector = GarbageCollector::new(client, &settings.stack);
    let mut reports = Vec::with_capacity(VariableKind::ALL.len());
    for kind in VariableKind::ALL {
        reports.push(collector.prune(kind, &identity_set(resolved, kind)).await?);
    }
    Ok(reports)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use tide_core::{InMemoryControlPlane, Labels, ReservedLabel};

    use super::*;
    use crate::error::VariableError;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    fn identity(name: &str, hash: &str) -> VariableIdentity {
        VariableIdentity {
            stack: "demo".into(),
            logical_name: name.into(),
            hash: hash.into(),
        }
    }

    fn item(id: &str, name: &str, hash: &str, age_days: i64) -> InventoryItem {
        let mut labels = Labels::new();
        labels.insert(ReservedLabel::Stack.key().into(), "demo".into());
        labels.insert(ReservedLabel::Name.key().into(), name.into());
        labels.insert(ReservedLabel::Hash.key().into(), hash.into());
        labels.insert(ReservedLabel::Version.key().into(), "v1".into());
        InventoryItem {
            id: id.into(),
            name: format!("demo-{name}-{}", &hash[..hash.len().min(7)]),
            created_at: now() - Duration::days(age_days),
            labels,
        }
    }

    #[test]
    fn plan_keeps_only_declared_identities() {
        let current: HashSet<_> = [identity("db_user", "aaaa")].into();
        let mut corrupt = item("s3", "db_user", "aaaa", 1);
        corrupt.labels.remove(ReservedLabel::Version.key());

        let plan = plan(
            vec![
                item("s1", "db_user", "aaaa", 1),
                item("s2", "db_user", "bbbb", 1),
                corrupt,
            ],
            &current,
        );
        assert_eq!(plan.retain.len(), 1);
        assert_eq!(plan.retain[0].id, "s1");
        let removed: Vec<_> = plan.remove.iter().map(|(i, r)| (i.id.as_str(), *r)).collect();
        assert_eq!(
            removed,
            vec![("s2", PruneReason::Superseded), ("s3", PruneReason::Unlabeled)]
        );
    }

    #[tokio::test]
    async fn removes_exactly_the_stale_item() {
        let cp = InMemoryControlPlane::new();
        cp.add_item(VariableKind::Secret, item("s1", "db_user", "aaaa", 1));
        cp.add_item(VariableKind::Secret, item("s2", "db_user", "bbbb", 1));

        let current: HashSet<_> = [identity("db_user", "aaaa")].into();
        let report = GarbageCollector::new(&cp, "demo")
            .with_clock(now())
            .prune(VariableKind::Secret, &current)
            .await
            .unwrap();

        assert_eq!(cp.removed(), vec![(VariableKind::Secret, "s2".to_string())]);
        assert_eq!(report.retained, 1);
        assert_eq!(report.removed[0].reason, PruneReason::Superseded);
    }

    #[tokio::test]
    async fn other_stacks_are_untouched() {
        let cp = InMemoryControlPlane::new();
        let mut foreign = item("c1", "app_conf", "cccc", 1);
        foreign
            .labels
            .insert(ReservedLabel::Stack.key().into(), "other".into());
        cp.add_item(VariableKind::Config, foreign);

        let report = GarbageCollector::new(&cp, "demo")
            .prune(VariableKind::Config, &HashSet::new())
            .await
            .unwrap();
        assert!(report.removed.is_empty());
        assert!(cp.removed().is_empty());
    }

    #[tokio::test]
    async fn old_referenced_items_are_flagged_for_rotation() {
        let cp = InMemoryControlPlane::new();
        cp.add_item(VariableKind::Secret, item("s1", "db_user", "aaaa", 45));
        cp.add_item(VariableKind::Secret, item("s2", "api_key", "dddd", 10));

        let current: HashSet<_> = [identity("db_user", "aaaa"), identity("api_key", "dddd")].into();
        let report = GarbageCollector::new(&cp, "demo")
            .with_clock(now())
            .prune(VariableKind::Secret, &current)
            .await
            .unwrap();

        assert!(report.removed.is_empty());
        assert_eq!(report.rotation_due.len(), 1);
        assert_eq!(report.rotation_due[0].age_days, 45);
    }

    #[tokio::test]
    async fn old_superseded_items_are_flagged_too() {
        let cp = InMemoryControlPlane::new();
        cp.add_item(VariableKind::Secret, item("s1", "db_user", "aaaa", 90));

        let report = GarbageCollector::new(&cp, "demo")
            .with_clock(now())
            .prune(VariableKind::Secret, &HashSet::new())
            .await
            .unwrap();

        assert_eq!(report.removed.len(), 1);
        assert_eq!(report.rotation_due.len(), 1);
        assert_eq!(report.rotation_due[0].name, "demo-db_user-aaaa");
        assert_eq!(report.rotation_due[0].age_days, 90);
    }

    #[tokio::test]
    async fn removal_failure_propagates() {
        let cp = InMemoryControlPlane::new();
        cp.add_item(VariableKind::Secret, item("s2", "db_user", "bbbb", 1));
        cp.fail("remove_secret", "secret is in use");

        let err = GarbageCollector::new(&cp, "demo")
            .prune(VariableKind::Secret, &HashSet::new())
            .await
            .unwrap_err();
        assert!(matches!(err, VariableError::Client(_)));
        assert!(err.to_string().contains("secret is in use"));
    }
}
