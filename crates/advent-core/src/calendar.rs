//! The host-owned context tying content, persistence, the unlock tracker and
//! the confetti engine to one cooperative scheduler.

use std::time::Duration;

use advent_platform::{KeyValueStore, SurfaceHost, SurfaceRect};
use chrono::{DateTime, Utc};
use glam::Vec2;
use tracing::{info, warn};

use crate::card::{Card, CardId, ContentDocument};
use crate::config::{AdventConfig, UnlockConfig};
use crate::confetti::{ConfettiEngine, EngineState};
use crate::countdown::Countdown;
use crate::error::PersistenceError;
use crate::schedule::{CooperativeScheduler, Task};
use crate::state::{derive_state, sort_cards, CardState};
use crate::store::{CommitOutcome, OpenedSet, OpenedStore};
use crate::tracker::{StateChange, UnlockTracker};

/// Result of a user asking to open a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    /// Committed; `particles` confetti were launched.
    Opened { particles: usize },
    AlreadyOpen,
    /// Not yet unlockable; nothing changed.
    StillLocked,
    UnknownCard,
}

pub struct Calendar<S> {
    unlock: UnlockConfig,
    document: ContentDocument,
    store: OpenedStore<S>,
    tracker: UnlockTracker,
    confetti: ConfettiEngine,
    scheduler: CooperativeScheduler<Task>,
}

impl<S: KeyValueStore> Calendar<S> {
    pub fn new(
        config: &AdventConfig,
        document: ContentDocument,
        store: S,
        surfaces: &mut dyn SurfaceHost,
        area: SurfaceRect,
        now: DateTime<Utc>,
    ) -> Self {
        let confetti = ConfettiEngine::new(config.confetti.clone(), surfaces, area);
        Self::with_engine(&config.unlock, document, store, confetti, now)
    }

    pub fn with_engine(
        unlock: &UnlockConfig,
        document: ContentDocument,
        store: S,
        confetti: ConfettiEngine,
        now: DateTime<Utc>,
    ) -> Self {
        let mut calendar = Self {
            unlock: unlock.clone(),
            document: ContentDocument::default(),
            store: OpenedStore::new(store),
            tracker: UnlockTracker::new(unlock),
            confetti,
            scheduler: CooperativeScheduler::new(),
        };
        calendar.replace_document(document, now);
        calendar
    }

    pub fn document(&self) -> &ContentDocument {
        &self.document
    }

    pub fn store(&self) -> &OpenedStore<S> {
        &self.store
    }

    pub fn tracker(&self) -> &UnlockTracker {
        &self.tracker
    }

    pub fn confetti(&self) -> &ConfettiEngine {
        &self.confetti
    }

    /// Swaps in freshly fetched content and restarts state tracking.
    /// Returns `true` when the document's version differs from the last one seen.
    pub fn replace_document(&mut self, document: ContentDocument, now: DateTime<Utc>) -> bool {
        let changed = match document.version.as_deref() {
            Some(version) => self.store.record_version(version).unwrap_or_else(|err| {
                warn!("calendar: could not record content version: {err}");
                false
            }),
            None => false,
        };
        if changed {
            info!("calendar: content version is new since last visit");
        }
        self.document = document;
        self.tracker.stop(&mut self.scheduler);
        self.tracker.watch_event(self.document.site.event_instant());
        let opened = self.store.read();
        self.tracker
            .start(&self.document.cards, &opened, now, &mut self.scheduler);
        changed
    }

    /// Current state of card `id`, re-reading the store. `None` for unknown ids.
    pub fn derive_state(&self, id: &str, now: DateTime<Utc>) -> Option<CardState> {
        let card = self.document.card(id)?;
        Some(derive_state(card, &self.store.read(), now))
    }

    /// Cards in configured order with their current states.
    pub fn cards_in_order(&self, now: DateTime<Utc>) -> Vec<(Card, CardState)> {
        let opened = self.store.read();
        let mut cards = self.document.cards.clone();
        sort_cards(&mut cards, self.unlock.sort_order);
        cards
            .into_iter()
            .map(|card| {
                let state = derive_state(&card, &opened, now);
                (card, state)
            })
            .collect()
    }

    pub fn opened(&self) -> OpenedSet {
        self.store.read()
    }

    /// Persists `id` as opened. On failure nothing is marked displayed, so the
    /// card keeps showing what the store says.
    pub fn commit_open(&mut self, id: &CardId) -> Result<CommitOutcome, PersistenceError> {
        let outcome = self.store.commit_open(id)?;
        self.tracker.mark_displayed(id, CardState::Open);
        Ok(outcome)
    }

    pub fn burst(&mut self, x: f32, y: f32, count: usize) -> usize {
        self.confetti
            .burst(Vec2::new(x, y), count, &mut self.scheduler)
    }

    /// Presentation's "open" intent: commits when unlockable and bursts confetti at `origin`.
    pub fn open(
        &mut self,
        id: &str,
        now: DateTime<Utc>,
        origin: Vec2,
    ) -> Result<OpenOutcome, PersistenceError> {
        let Some(card) = self.document.card(id) else {
            return Ok(OpenOutcome::UnknownCard);
        };
        let card_id = card.id.clone();
        match derive_state(card, &self.store.read(), now) {
            CardState::Locked => Ok(OpenOutcome::StillLocked),
            CardState::Open => Ok(OpenOutcome::AlreadyOpen),
            CardState::Unlockable => match self.commit_open(&card_id)? {
                CommitOutcome::AlreadyOpen => Ok(OpenOutcome::AlreadyOpen),
                CommitOutcome::Opened => {
                    let count = self.confetti.preset().default_burst as usize;
                    let particles = self.burst(origin.x, origin.y, count);
                    Ok(OpenOutcome::Opened { particles })
                }
            },
        }
    }

    pub fn resize(&mut self, rect: SurfaceRect) {
        self.confetti.resize(rect);
    }

    pub fn countdown(&self, now: DateTime<Utc>) -> Option<Countdown> {
        self.document
            .site
            .event_instant()
            .map(|at| Countdown::until(at, now))
    }

    /// Runs everything due at monotonic time `elapsed`: reevaluation ticks
    /// first, then one display frame. Returns cards whose state changed.
    pub fn pump(&mut self, elapsed: Duration, now: DateTime<Utc>) -> Vec<StateChange> {
        let mut changes = Vec::new();
        for task in self.scheduler.advance(elapsed) {
            if task == Task::Reevaluate {
                let opened = self.store.read();
                changes.extend(self.tracker.reevaluate(
                    &self.document.cards,
                    &opened,
                    now,
                    &mut self.scheduler,
                ));
            }
        }
        for task in self.scheduler.take_frame() {
            if task == Task::ConfettiFrame {
                self.confetti.on_frame(elapsed, &mut self.scheduler);
            }
        }
        changes
    }

    /// True while the confetti loop wants another display frame.
    pub fn wants_frame(&self) -> bool {
        self.scheduler.has_frame_pending()
    }

    pub fn engine_state(&self) -> EngineState {
        self.confetti.state()
    }

    /// Monotonic time of the next reevaluation tick, if any.
    pub fn next_wakeup(&self) -> Option<Duration> {
        self.scheduler.next_deadline()
    }
}
