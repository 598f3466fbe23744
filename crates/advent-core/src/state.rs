//! Card lifecycle: `Locked -> Unlockable -> Open`, always derived, never stored.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::card::Card;
use crate::store::OpenedSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardState {
    Locked,
    Unlockable,
    Open,
}

impl CardState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Locked => "locked",
            Self::Unlockable => "unlockable",
            Self::Open => "open",
        }
    }
}

/// Derives the display state of `card` at `now`.
///
/// Membership in `opened` wins over the clock, so a card opened through an
/// external edit of the store shows as open even before its unlock instant.
/// A card whose schedule could not be parsed stays `Locked` until opened.
pub fn derive_state(card: &Card, opened: &OpenedSet, now: DateTime<Utc>) -> CardState {
    if opened.contains(card.id.as_str()) {
        return CardState::Open;
    }
    match card.unlock_at.instant() {
        Some(at) if now >= at => CardState::Unlockable,
        _ => CardState::Locked,
    }
}

/// True when advancing the clock alone can still change the card's state.
pub fn awaits_unlock(card: &Card, opened: &OpenedSet, now: DateTime<Utc>) -> bool {
    !opened.contains(card.id.as_str())
        && card
            .unlock_at
            .instant()
            .is_some_and(|at| now < at)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// Total order on cards: unlock instant, then id. Malformed schedules sort
/// after every well-formed one regardless of direction.
pub fn compare_cards(a: &Card, b: &Card, order: SortOrder) -> Ordering {
    let by_instant = match (a.unlock_at.instant(), b.unlock_at.instant()) {
        (Some(x), Some(y)) => match order {
            SortOrder::Ascending => x.cmp(&y),
            SortOrder::Descending => y.cmp(&x),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_instant.then_with(|| a.id.cmp(&b.id))
}

pub fn sort_cards(cards: &mut [Card], order: SortOrder) {
    cards.sort_by(|a, b| compare_cards(a, b, order));
}
