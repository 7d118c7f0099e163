//! Escalation Engine - time-based promotion of queued items
//!
//! Rules are an ordered table evaluated per active item; the first matching
//! rule wins and at most one rule fires per item per sweep. Repeated sweeps
//! may escalate further as time advances.

use chrono::{DateTime, Duration, Utc};
use rxledger_core::{RiskAssessment, Submission};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::ReviewConfig;
use crate::item::{EscalationEntry, ItemId, QueueItem, Tier};
use crate::queue::ReviewQueue;

/// When a rule matches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleCondition {
    /// Item has been in its current tier strictly longer than this
    InTierLongerThan(Duration),
    /// Current time is past the item's stored SLA deadline
    PastSlaDeadline,
}

/// What a matching rule does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    /// Notify again without changing the tier
    Realert,
    /// Move one tier up
    Promote,
}

/// One row of the escalation table
#[derive(Debug, Clone, PartialEq)]
pub struct EscalationRule {
    pub name: &'static str,
    /// Tier the rule applies to; `None` for any tier below Critical
    pub tier: Option<Tier>,
    pub pending_only: bool,
    pub condition: RuleCondition,
    pub action: RuleAction,
    /// Fire at most once per item
    pub once: bool,
    pub reason: String,
}

impl EscalationRule {
    /// The ordered rule table
    pub fn table(config: &ReviewConfig) -> Vec<EscalationRule> {
        vec![
            EscalationRule {
                name: "critical_realert",
                tier: Some(Tier::Critical),
                pending_only: true,
                condition: RuleCondition::InTierLongerThan(config.critical_realert()),
                action: RuleAction::Realert,
                once: config.realert_once,
                reason: format!(
                    "Critical item unassigned for over {} minutes",
                    config.critical_realert_minutes
                ),
            },
            EscalationRule {
                name: "high_overdue",
                tier: Some(Tier::High),
                pending_only: false,
                condition: RuleCondition::InTierLongerThan(config.high_escalation()),
                action: RuleAction::Promote,
                once: false,
                reason: format!(
                    "High item active for over {} minutes",
                    config.high_escalation_minutes
                ),
            },
            EscalationRule {
                name: "moderate_overdue",
                tier: Some(Tier::Moderate),
                pending_only: false,
                condition: RuleCondition::InTierLongerThan(config.moderate_escalation()),
                action: RuleAction::Promote,
                once: false,
                reason: format!(
                    "Moderate item active for over {} minutes",
                    config.moderate_escalation_minutes
                ),
            },
            EscalationRule {
                name: "sla_breach",
                tier: None,
                pending_only: true,
                condition: RuleCondition::PastSlaDeadline,
                action: RuleAction::Promote,
                once: false,
                reason: "SLA deadline passed while pending".to_string(),
            },
        ]
    }

    /// True if the rule fires for this item at `now`
    pub fn matches(&self, item: &QueueItem, now: DateTime<Utc>) -> bool {
        if !item.is_active() {
            return false;
        }
        match self.tier {
            Some(tier) if item.tier != tier => return false,
            _ => {}
        }
        // Promotion cannot move past Critical
        if self.action == RuleAction::Promote && item.tier == Tier::Critical {
            return false;
        }
        if self.pending_only && !item.is_pending() {
            return false;
        }
        if self.once && item.has_escalation(self.name) {
            return false;
        }
        match self.condition {
            RuleCondition::InTierLongerThan(limit) => item.time_in_tier(now) > limit,
            RuleCondition::PastSlaDeadline => item.is_overdue_at(now),
        }
    }
}

/// An escalation that fired, with what the notifier needs
#[derive(Debug, Clone, PartialEq)]
pub struct EscalationEvent {
    pub item_id: ItemId,
    pub rule: &'static str,
    pub action: RuleAction,
    pub from: Tier,
    pub to: Tier,
    pub reason: String,
    pub at: DateTime<Utc>,
    pub submission: Submission,
    pub assessment: RiskAssessment,
}

/// Applies the rule table to a review queue
#[derive(Debug, Clone)]
pub struct EscalationEngine {
    rules: Vec<EscalationRule>,
}

impl EscalationEngine {
    pub fn new(config: &ReviewConfig) -> Self {
        Self {
            rules: EscalationRule::table(config),
        }
    }

    pub fn rules(&self) -> &[EscalationRule] {
        &self.rules
    }

    /// Run one sweep at the current time
    pub fn check_escalations(&self, queue: &mut ReviewQueue) -> Vec<EscalationEvent> {
        self.check_escalations_at(queue, Utc::now())
    }

    /// Run one sweep at an explicit time
    ///
    /// Mutates tiers in place, appends escalation history and returns the
    /// events to notify. The queue is re-sorted if any tier changed.
    pub fn check_escalations_at(&self, queue: &mut ReviewQueue, now: DateTime<Utc>) -> Vec<EscalationEvent> {
        let mut events = Vec::new();
        let mut promoted = false;

        for item in queue.active_mut().iter_mut() {
            let rule = match self.rules.iter().find(|r| r.matches(item, now)) {
                Some(rule) => rule,
                None => continue,
            };

            let from = item.tier;
            let to = match rule.action {
                RuleAction::Realert => from,
                RuleAction::Promote => from.escalated(),
            };

            item.escalations.push(EscalationEntry {
                from,
                to,
                rule: rule.name.to_string(),
                reason: rule.reason.clone(),
                at: now,
            });
            if to != from {
                item.tier = to;
                item.tier_since = now;
                promoted = true;
            }

            match rule.action {
                RuleAction::Realert => warn!(
                    item_id = %item.id,
                    tier = %to,
                    rule = rule.name,
                    "Queue item re-alerted"
                ),
                RuleAction::Promote => info!(
                    item_id = %item.id,
                    from = %from,
                    to = %to,
                    rule = rule.name,
                    "Queue item escalated"
                ),
            }

            events.push(EscalationEvent {
                item_id: item.id,
                rule: rule.name,
                action: rule.action,
                from,
                to,
                reason: rule.reason.clone(),
                at: now,
                submission: item.submission.clone(),
                assessment: item.assessment.clone(),
            });
        }

        if promoted {
            queue.resort();
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{ReviewDecision, ReviewState};
    use chrono::TimeZone;
    use rxledger_core::{Prescription, RiskSignals};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, 9, 9, 0, 0).unwrap()
    }

    fn enqueue(queue: &mut ReviewQueue, tier: Tier) -> ItemId {
        let submission = Submission::at(Prescription::new("P001", "Oxycodone"), t0());
        let assessment = RiskAssessment::new(70.0, RiskSignals::default(), vec![], vec![], t0());
        queue.enqueue_at(submission, assessment, tier, t0())
    }

    fn minutes(m: i64) -> DateTime<Utc> {
        t0() + Duration::minutes(m)
    }

    #[test]
    fn test_table_order() {
        let engine = EscalationEngine::new(&ReviewConfig::default());
        let names: Vec<&str> = engine.rules().iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["critical_realert", "high_overdue", "moderate_overdue", "sla_breach"]);
    }

    #[test]
    fn test_nothing_fires_early() {
        let mut queue = ReviewQueue::default();
        enqueue(&mut queue, Tier::Critical);
        enqueue(&mut queue, Tier::High);
        enqueue(&mut queue, Tier::Moderate);

        let engine = EscalationEngine::new(queue.config());
        assert!(engine.check_escalations_at(&mut queue, minutes(15)).is_empty());
    }

    #[test]
    fn test_critical_realert_once() {
        let mut queue = ReviewQueue::default();
        let id = enqueue(&mut queue, Tier::Critical);
        let engine = EscalationEngine::new(queue.config());

        let events = engine.check_escalations_at(&mut queue, minutes(16));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, RuleAction::Realert);
        assert_eq!(events[0].to, Tier::Critical);

        let item = queue.get(id).unwrap();
        assert_eq!(item.tier, Tier::Critical);
        assert_eq!(item.escalations.len(), 1);

        assert!(engine.check_escalations_at(&mut queue, minutes(30)).is_empty());
    }

    #[test]
    fn test_critical_under_review_not_realerted() {
        let mut queue = ReviewQueue::default();
        let id = enqueue(&mut queue, Tier::Critical);
        queue.assign_at(id, "rph1", minutes(1)).unwrap();

        let engine = EscalationEngine::new(queue.config());
        assert!(engine.check_escalations_at(&mut queue, minutes(180)).is_empty());
    }

    #[test]
    fn test_high_becomes_critical_after_an_hour() {
        let mut queue = ReviewQueue::default();
        let id = enqueue(&mut queue, Tier::High);
        queue.assign_at(id, "rph1", minutes(5)).unwrap();
        let engine = EscalationEngine::new(queue.config());

        assert!(engine.check_escalations_at(&mut queue, minutes(60)).is_empty());
        let events = engine.check_escalations_at(&mut queue, minutes(61));
        assert_eq!(events.len(), 1);
        assert_eq!((events[0].from, events[0].to), (Tier::High, Tier::Critical));
        assert_eq!(queue.get(id).unwrap().state, ReviewState::UnderReview);
    }

    #[test]
    fn test_one_escalation_per_sweep() {
        let mut queue = ReviewQueue::default();
        let id = enqueue(&mut queue, Tier::Moderate);
        let engine = EscalationEngine::new(queue.config());

        // Moderate rule and SLA rule both match; only the first fires
        let events = engine.check_escalations_at(&mut queue, minutes(25 * 60));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].rule, "moderate_overdue");
        assert_eq!(queue.get(id).unwrap().tier, Tier::High);

        // Next sweep at the same instant: High has not been in tier for an hour,
        // so the SLA rule fires
        let events = engine.check_escalations_at(&mut queue, minutes(25 * 60));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].rule, "sla_breach");
        assert_eq!(queue.get(id).unwrap().tier, Tier::Critical);
    }

    #[test]
    fn test_moderate_never_beyond_critical() {
        let mut queue = ReviewQueue::default();
        let id = enqueue(&mut queue, Tier::Moderate);
        let engine = EscalationEngine::new(queue.config());

        engine.check_escalations_at(&mut queue, minutes(241));
        engine.check_escalations_at(&mut queue, minutes(25 * 60));
        for hour in 26..40 {
            engine.check_escalations_at(&mut queue, minutes(hour * 60));
        }

        let item = queue.get(id).unwrap();
        assert_eq!(item.tier, Tier::Critical);
        let promotions = item.escalations.iter().filter(|e| e.from != e.to).count();
        assert_eq!(promotions, 2);
        assert!(item.escalations.iter().all(|e| e.to <= e.from));
    }

    #[test]
    fn test_sla_rule_skips_critical() {
        let mut queue = ReviewQueue::default();
        let id = enqueue(&mut queue, Tier::Critical);
        let engine = EscalationEngine::new(queue.config());

        engine.check_escalations_at(&mut queue, minutes(16));
        // Past the 2h SLA; re-alert already used and Critical cannot be promoted
        assert!(engine.check_escalations_at(&mut queue, minutes(180)).is_empty());
        assert_eq!(queue.get(id).unwrap().escalations.len(), 1);
    }

    #[test]
    fn test_escalation_reorders_queue() {
        let mut queue = ReviewQueue::default();
        let high = enqueue(&mut queue, Tier::High);
        let moderate = enqueue(&mut queue, Tier::Moderate);
        queue.assign_at(high, "rph1", t0()).unwrap();
        let engine = EscalationEngine::new(queue.config());

        // High (under review) -> Critical, Moderate stays
        engine.check_escalations_at(&mut queue, minutes(90));
        assert_eq!(queue.active()[0].id, high);
        assert_eq!(queue.next_item().unwrap().id, moderate);
    }

    #[test]
    fn test_archived_items_ignored() {
        let mut queue = ReviewQueue::default();
        let id = enqueue(&mut queue, Tier::High);
        queue
            .complete_review_at(id, ReviewDecision::Approve, "ok", "rph1", minutes(1))
            .unwrap();

        let engine = EscalationEngine::new(queue.config());
        assert!(engine.check_escalations_at(&mut queue, minutes(600)).is_empty());
    }
}
