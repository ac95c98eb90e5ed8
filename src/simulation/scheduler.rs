//! Event scheduler - priority queue of scheduled commands
//!
//! Ordered by (due tick, insertion sequence), so actions due on the same tick
//! run in the order they were scheduled and replays are reproducible.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};

use crate::core::types::{EntityId, Tick};
use crate::simulation::command::Command;

/// Identifies one scheduled action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScheduleHandle {
    pub due: Tick,
    pub sequence: u64,
}

/// A command waiting for its tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledAction {
    pub due: Tick,
    pub sequence: u64,
    pub owner: EntityId,
    pub command: Command,
}

impl ScheduledAction {
    fn key(&self) -> (Tick, u64) {
        (self.due, self.sequence)
    }
}

impl PartialEq for ScheduledAction {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for ScheduledAction {}

impl PartialOrd for ScheduledAction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledAction {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

#[derive(Debug, Default)]
pub struct Scheduler {
    queue: BinaryHeap<Reverse<ScheduledAction>>,
    next_sequence: u64,
    current_tick: Tick,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tick the scheduler last drained at
    pub fn current_tick(&self) -> Tick {
        self.current_tick
    }

    /// Schedule `command` for `due`
    ///
    /// Anything at or before the current tick is clamped to the next tick so
    /// it cannot be silently skipped.
    pub fn schedule(&mut self, due: Tick, owner: EntityId, command: Command) -> ScheduleHandle {
        let earliest = self.current_tick + 1;
        let due = if due < earliest {
            tracing::trace!(
                owner = %owner,
                requested = due,
                clamped = earliest,
                command = command.kind(),
                "clamped past-due schedule"
            );
            earliest
        } else {
            due
        };
        self.push(due, owner, command)
    }

    /// Schedule `command` to run later in the step currently being drained
    pub fn schedule_this_step(&mut self, owner: EntityId, command: Command) -> ScheduleHandle {
        self.push(self.current_tick, owner, command)
    }

    fn push(&mut self, due: Tick, owner: EntityId, command: Command) -> ScheduleHandle {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        tracing::trace!(owner = %owner, due, sequence, command = command.kind(), "scheduled");
        self.queue.push(Reverse(ScheduledAction {
            due,
            sequence,
            owner,
            command,
        }));
        ScheduleHandle { due, sequence }
    }

    /// Move the scheduler's notion of "now" forward (never backwards)
    pub fn advance_to(&mut self, tick: Tick) {
        self.current_tick = self.current_tick.max(tick);
    }

    /// Remove and return the earliest action due at or before `current_tick`
    ///
    /// Call repeatedly to drain a step; actions added while draining that are
    /// also due are returned by later calls in the same step.
    pub fn pop_due(&mut self, current_tick: Tick) -> Option<ScheduledAction> {
        self.advance_to(current_tick);
        if self.queue.peek().is_some_and(|Reverse(a)| a.due <= current_tick) {
            self.queue.pop().map(|Reverse(action)| action)
        } else {
            None
        }
    }

    /// Drop every pending action of `owner`; returns how many were removed
    pub fn cancel_all_for_owner(&mut self, owner: EntityId) -> usize {
        let before = self.queue.len();
        self.queue.retain(|Reverse(action)| action.owner != owner);
        let removed = before - self.queue.len();
        if removed > 0 {
            tracing::debug!(owner = %owner, removed, "cancelled scheduled actions");
        }
        removed
    }

    /// Pending actions in execution order
    pub fn pending(&self) -> Vec<&ScheduledAction> {
        let mut pending: Vec<&ScheduledAction> = self.queue.iter().map(|Reverse(a)| a).collect();
        pending.sort();
        pending
    }

    /// Pending actions of one owner in execution order
    pub fn pending_for(&self, owner: EntityId) -> Vec<&ScheduledAction> {
        self.pending()
            .into_iter()
            .filter(|action| action.owner == owner)
            .collect()
    }

    pub fn next_due(&self) -> Option<Tick> {
        self.queue.peek().map(|Reverse(a)| a.due)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(scheduler: &mut Scheduler, tick: Tick) -> Vec<(Tick, EntityId, &'static str)> {
        let mut out = Vec::new();
        while let Some(action) = scheduler.pop_due(tick) {
            out.push((action.due, action.owner, action.command.kind()));
        }
        out
    }

    #[test]
    fn test_drains_in_tick_then_insertion_order() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(5, EntityId(1), Command::ReactionTrigger);
        scheduler.schedule(3, EntityId(2), Command::Retarget);
        scheduler.schedule(5, EntityId(3), Command::MeleeRecover);

        let drained = drain(&mut scheduler, 10);
        assert_eq!(
            drained,
            vec![
                (3, EntityId(2), "retarget"),
                (5, EntityId(1), "reaction_trigger"),
                (5, EntityId(3), "melee_recover"),
            ]
        );
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_future_actions_stay_queued() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(4, EntityId(1), Command::Retarget);
        assert!(scheduler.pop_due(3).is_none());
        assert_eq!(scheduler.len(), 1);
        assert!(scheduler.pop_due(4).is_some());
    }

    #[test]
    fn test_past_due_schedules_are_clamped() {
        let mut scheduler = Scheduler::new();
        scheduler.advance_to(20);
        let handle = scheduler.schedule(12, EntityId(1), Command::Retarget);
        assert_eq!(handle.due, 21);
        let handle = scheduler.schedule(20, EntityId(1), Command::Retarget);
        assert_eq!(handle.due, 21);
    }

    #[test]
    fn test_schedule_this_step_runs_in_same_drain() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(2, EntityId(1), Command::Retarget);
        let first = scheduler.pop_due(2).expect("due");
        assert_eq!(first.due, 2);
        scheduler.schedule_this_step(EntityId(1), Command::MeleeRecover);
        let second = scheduler.pop_due(2).expect("added during drain");
        assert_eq!(second.command, Command::MeleeRecover);
    }

    #[test]
    fn test_cancel_all_for_owner_is_idempotent() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(5, EntityId(1), Command::Retarget);
        scheduler.schedule(6, EntityId(1), Command::ReactionTrigger);
        scheduler.schedule(6, EntityId(2), Command::ReactionTrigger);

        assert_eq!(scheduler.cancel_all_for_owner(EntityId(1)), 2);
        assert_eq!(scheduler.cancel_all_for_owner(EntityId(1)), 0);
        assert_eq!(scheduler.cancel_all_for_owner(EntityId(42)), 0);
        assert_eq!(scheduler.len(), 1);
        assert_eq!(scheduler.pending_for(EntityId(2)).len(), 1);
    }

    #[test]
    fn test_sequence_numbers_increase() {
        let mut scheduler = Scheduler::new();
        let a = scheduler.schedule(9, EntityId(1), Command::Retarget);
        let b = scheduler.schedule(1, EntityId(1), Command::Retarget);
        assert!(b.sequence > a.sequence);
        assert_eq!(scheduler.next_due(), Some(1));
    }

    #[test]
    fn test_clock_never_moves_backwards() {
        let mut scheduler = Scheduler::new();
        scheduler.advance_to(10);
        scheduler.advance_to(4);
        assert_eq!(scheduler.current_tick(), 10);
    }
}
