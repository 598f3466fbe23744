//! Background reevaluation of card states as the clock crosses unlock instants.

use std::collections::HashMap;
use std::time::Duration;

use advent_platform::{Scheduler, TaskHandle};
use chrono::{DateTime, Utc};
use tracing::info;

use crate::card::{Card, CardId};
use crate::config::UnlockConfig;
use crate::schedule::Task;
use crate::state::{awaits_unlock, derive_state, CardState};
use crate::store::OpenedSet;

/// A card whose derived state differs from what was last displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChange {
    pub id: CardId,
    pub from: Option<CardState>,
    pub to: CardState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// Some card (or the event countdown) is still waiting on the clock.
    Active,
    /// Nothing left to wait for; slow polling only catches external store edits.
    Idle,
    Stopped,
}

#[derive(Debug)]
pub struct UnlockTracker {
    active_interval: Duration,
    idle_interval: Option<Duration>,
    event_at: Option<DateTime<Utc>>,
    displayed: HashMap<CardId, CardState>,
    tick: Option<TaskHandle>,
    cadence: Cadence,
}

impl UnlockTracker {
    pub fn new(config: &UnlockConfig) -> Self {
        Self {
            active_interval: config.reevaluate_interval(),
            idle_interval: config.idle_interval(),
            event_at: None,
            displayed: HashMap::new(),
            tick: None,
            cadence: Cadence::Stopped,
        }
    }

    /// Keeps the tick active until `event_at` so a countdown can be refreshed.
    pub fn watch_event(&mut self, event_at: Option<DateTime<Utc>>) {
        self.event_at = event_at;
    }

    pub fn cadence(&self) -> Cadence {
        self.cadence
    }

    pub fn displayed(&self, id: &str) -> Option<CardState> {
        self.displayed.get(id).copied()
    }

    /// Records a state the presentation has already shown, e.g. right after an open.
    pub fn mark_displayed(&mut self, id: &CardId, state: CardState) {
        self.displayed.insert(id.clone(), state);
    }

    /// Takes a fresh snapshot of every card as displayed and arms the tick.
    pub fn start(
        &mut self,
        cards: &[Card],
        opened: &OpenedSet,
        now: DateTime<Utc>,
        scheduler: &mut dyn Scheduler<Task>,
    ) {
        self.displayed = cards
            .iter()
            .map(|card| (card.id.clone(), derive_state(card, opened, now)))
            .collect();
        let pending = self.is_pending(cards, opened, now);
        self.reschedule(pending, scheduler);
    }

    /// Re-derives every card and returns those whose state changed since it
    /// was last displayed. Slows or stops the tick once nothing is pending.
    pub fn reevaluate(
        &mut self,
        cards: &[Card],
        opened: &OpenedSet,
        now: DateTime<Utc>,
        scheduler: &mut dyn Scheduler<Task>,
    ) -> Vec<StateChange> {
        let mut changes = Vec::new();
        for card in cards {
            let state = derive_state(card, opened, now);
            let previous = self.displayed.insert(card.id.clone(), state);
            if previous != Some(state) {
                changes.push(StateChange {
                    id: card.id.clone(),
                    from: previous,
                    to: state,
                });
            }
        }
        if self.displayed.len() > cards.len() {
            self.displayed
                .retain(|id, _| cards.iter().any(|card| &card.id == id));
        }

        let pending = self.is_pending(cards, opened, now);
        self.reschedule(pending, scheduler);
        changes
    }

    pub fn stop(&mut self, scheduler: &mut dyn Scheduler<Task>) {
        if let Some(handle) = self.tick.take() {
            scheduler.cancel(handle);
        }
        self.cadence = Cadence::Stopped;
    }

    fn is_pending(&self, cards: &[Card], opened: &OpenedSet, now: DateTime<Utc>) -> bool {
        self.event_at.is_some_and(|at| now < at)
            || cards.iter().any(|card| awaits_unlock(card, opened, now))
    }

    fn reschedule(&mut self, pending: bool, scheduler: &mut dyn Scheduler<Task>) {
        let (wanted, interval) = match (pending, self.idle_interval) {
            (true, _) => (Cadence::Active, Some(self.active_interval)),
            (false, Some(idle)) => (Cadence::Idle, Some(idle)),
            (false, None) => (Cadence::Stopped, None),
        };
        if wanted == self.cadence && (self.tick.is_some() || interval.is_none()) {
            return;
        }
        if let Some(handle) = self.tick.take() {
            scheduler.cancel(handle);
        }
        self.tick = interval.map(|every| scheduler.schedule_repeating(every, Task::Reevaluate));
        info!(
            "unlock tick: {:?} -> {:?} ({} cards tracked)",
            self.cadence,
            wanted,
            self.displayed.len()
        );
        self.cadence = wanted;
    }
}
