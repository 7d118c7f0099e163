//! Review Queue - active items sorted by (tier, enqueue time) plus archive

use chrono::{DateTime, Utc};
use rxledger_core::{RiskAssessment, Submission};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::ReviewConfig;
use crate::error::{ReviewError, ReviewResult};
use crate::item::{ItemId, QueueItem, ReviewDecision, ReviewNote, ReviewState, Tier};

/// Snapshot of queue counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatus {
    pub pending: usize,
    pub under_review: usize,
    pub total_active: usize,
    pub total_reviewed: usize,
    /// Active items past their SLA deadline, any state
    pub overdue: usize,
}

/// Priority review queue
#[derive(Debug, Clone)]
pub struct ReviewQueue {
    config: ReviewConfig,
    /// Always sorted by `QueueItem::sort_key`
    active: Vec<QueueItem>,
    archive: Vec<QueueItem>,
    next_id: u64,
}

impl Default for ReviewQueue {
    fn default() -> Self {
        Self::new(ReviewConfig::default())
    }
}

impl ReviewQueue {
    pub fn new(config: ReviewConfig) -> Self {
        Self {
            config,
            active: Vec::new(),
            archive: Vec::new(),
            next_id: 1,
        }
    }

    pub fn config(&self) -> &ReviewConfig {
        &self.config
    }

    /// Enqueue a flagged submission as Pending
    pub fn enqueue(&mut self, submission: Submission, assessment: RiskAssessment, tier: Tier) -> ItemId {
        self.enqueue_at(submission, assessment, tier, Utc::now())
    }

    /// Enqueue at an explicit time; the SLA deadline is derived from the tier
    pub fn enqueue_at(
        &mut self,
        submission: Submission,
        assessment: RiskAssessment,
        tier: Tier,
        now: DateTime<Utc>,
    ) -> ItemId {
        let id = ItemId(self.next_id);
        self.next_id += 1;

        let item = QueueItem::new(id, submission, assessment, tier, self.config.sla_for(tier), now);
        info!(
            item_id = %id,
            tier = %tier,
            submission_id = %item.submission.id,
            sla_deadline = %item.sla_deadline,
            "Queue item enqueued"
        );

        self.active.push(item);
        self.resort();
        id
    }

    /// Assign a Pending item to a reviewer
    pub fn assign(&mut self, id: ItemId, reviewer: &str) -> ReviewResult<&QueueItem> {
        self.assign_at(id, reviewer, Utc::now())
    }

    /// Assign at an explicit time: Pending -> UnderReview only
    pub fn assign_at(&mut self, id: ItemId, reviewer: &str, now: DateTime<Utc>) -> ReviewResult<&QueueItem> {
        let pos = self.active_position(id)?;
        let item = &mut self.active[pos];

        if item.state != ReviewState::Pending {
            return Err(ReviewError::InvalidTransition {
                id,
                from: item.state,
                action: "assign",
            });
        }

        item.state = ReviewState::UnderReview;
        item.reviewer = Some(reviewer.to_string());
        item.assigned_at = Some(now);
        info!(item_id = %id, reviewer = %reviewer, "Queue item assigned");

        Ok(&self.active[pos])
    }

    /// Record a terminal decision and archive the item
    pub fn complete_review(
        &mut self,
        id: ItemId,
        decision: ReviewDecision,
        notes: &str,
        reviewer: &str,
    ) -> ReviewResult<&QueueItem> {
        self.complete_review_at(id, decision, notes, reviewer, Utc::now())
    }

    /// Complete at an explicit time
    ///
    /// Accepted from any non-terminal state. The review duration runs from
    /// assignment, or from enqueue if the item was never assigned.
    pub fn complete_review_at(
        &mut self,
        id: ItemId,
        decision: ReviewDecision,
        notes: &str,
        reviewer: &str,
        now: DateTime<Utc>,
    ) -> ReviewResult<&QueueItem> {
        let pos = self.active_position(id)?;
        let mut item = self.active.remove(pos);

        let started = item.assigned_at.unwrap_or(item.enqueued_at);
        item.state = decision.resulting_state();
        if item.reviewer.is_none() {
            item.reviewer = Some(reviewer.to_string());
        }
        item.completed_at = Some(now);
        item.review_duration_secs = Some((now - started).num_seconds().max(0));
        item.notes.push(ReviewNote {
            author: reviewer.to_string(),
            text: notes.to_string(),
            at: now,
        });

        info!(
            item_id = %id,
            state = %item.state,
            reviewer = %reviewer,
            duration_secs = item.review_duration_secs.unwrap_or_default(),
            "Queue item reviewed"
        );

        self.archive.push(item);
        let last = self.archive.len() - 1;
        Ok(&self.archive[last])
    }

    /// Append a note to an active or archived item
    pub fn add_note(&mut self, id: ItemId, author: &str, text: &str) -> ReviewResult<()> {
        self.add_note_at(id, author, text, Utc::now())
    }

    pub fn add_note_at(&mut self, id: ItemId, author: &str, text: &str, now: DateTime<Utc>) -> ReviewResult<()> {
        let item = self
            .active
            .iter_mut()
            .chain(self.archive.iter_mut())
            .find(|i| i.id == id)
            .ok_or(ReviewError::UnknownQueueItem(id))?;

        item.notes.push(ReviewNote {
            author: author.to_string(),
            text: text.to_string(),
            at: now,
        });
        debug!(item_id = %id, author = %author, "Note added");
        Ok(())
    }

    /// The Pending item with the smallest (tier, enqueue time)
    pub fn next_item(&self) -> Option<&QueueItem> {
        self.active.iter().find(|i| i.is_pending())
    }

    pub fn status(&self) -> QueueStatus {
        self.status_at(Utc::now())
    }

    pub fn status_at(&self, now: DateTime<Utc>) -> QueueStatus {
        QueueStatus {
            pending: self.active.iter().filter(|i| i.state == ReviewState::Pending).count(),
            under_review: self
                .active
                .iter()
                .filter(|i| i.state == ReviewState::UnderReview)
                .count(),
            total_active: self.active.len(),
            total_reviewed: self.archive.len(),
            overdue: self.active.iter().filter(|i| i.is_overdue_at(now)).count(),
        }
    }

    /// Look up an item, active or archived
    pub fn get(&self, id: ItemId) -> Option<&QueueItem> {
        self.active
            .iter()
            .chain(self.archive.iter())
            .find(|i| i.id == id)
    }

    /// Active items in serving order
    pub fn active(&self) -> &[QueueItem] {
        &self.active
    }

    /// Reviewed items in completion order
    pub fn archived(&self) -> &[QueueItem] {
        &self.archive
    }

    pub(crate) fn active_mut(&mut self) -> &mut [QueueItem] {
        &mut self.active
    }

    /// Restore serving order after a tier change
    pub(crate) fn resort(&mut self) {
        self.active.sort_by_key(|i| i.sort_key());
    }

    fn active_position(&self, id: ItemId) -> ReviewResult<usize> {
        if let Some(pos) = self.active.iter().position(|i| i.id == id) {
            return Ok(pos);
        }
        match self.archive.iter().find(|i| i.id == id) {
            Some(item) => Err(ReviewError::AlreadyResolved { id, state: item.state }),
            None => Err(ReviewError::UnknownQueueItem(id)),
        }
    }
}
