// src/filter/state.rs

use crate::catalog::{FetchError, FetchOutcome};
use crate::domain::Property;
use crate::taxonomy::{Category, Selection, SubType, Taxonomy};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("{sub_type} is not a subtype of {category}")]
    SubtypeOutsideCategory {
        sub_type: SubType,
        category: Category,
    },
    #[error("category {0} is not offered")]
    UnknownCategory(Category),
}

/// Whether the view still shows what it was constructed with, or the user
/// has changed the selection since. Only user changes fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Seeded,
    UserModified,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum LoadStatus {
    /// Seeded results, nothing fetched yet.
    Idle,
    Loading { selection: Selection },
    Loaded { fetched_at: DateTime<Utc> },
    Failed { message: String },
}

/// Issued for every accepted selection change. A fetch result is applied
/// only while its ticket is still the newest one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub selection: Selection,
    pub generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Applied,
    /// The selection moved on after this fetch was issued.
    Stale,
}

/// Single source of truth for the selection and the result set.
#[derive(Debug, Clone)]
pub struct FilterState {
    taxonomy: Arc<Taxonomy>,
    selected: Selection,
    results: Arc<Vec<Property>>,
    phase: Phase,
    generation: u64,
    status: LoadStatus,
    last_error: Option<FetchError>,
}

impl FilterState {
    /// Starts in the `Seeded` phase with the outcome of the initial (possibly
    /// server-side) fetch. No fetch is issued for the initial selection; a
    /// failed seed is shown as a failure, not as an empty result.
    pub fn seeded(
        taxonomy: Arc<Taxonomy>,
        selected: Selection,
        seed: FetchOutcome,
    ) -> Result<Self, FilterError> {
        if !taxonomy.contains(selected.category, selected.sub_type) {
            return Err(FilterError::SubtypeOutsideCategory {
                sub_type: selected.sub_type,
                category: selected.category,
            });
        }

        let status = match &seed.error {
            Some(e) => LoadStatus::Failed {
                message: e.user_message().to_string(),
            },
            None => LoadStatus::Idle,
        };

        Ok(Self {
            taxonomy,
            selected,
            results: Arc::new(seed.properties),
            phase: Phase::Seeded,
            generation: 0,
            status,
            last_error: seed.error,
        })
    }

    pub fn selected(&self) -> Selection {
        self.selected
    }

    pub fn results(&self) -> &Arc<Vec<Property>> {
        &self.results
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    pub fn last_error(&self) -> Option<&FetchError> {
        self.last_error.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    /// Switches category and resets the subtype to that category's default.
    /// Returns the fetch to issue, or `None` if nothing changed.
    pub fn select_category(&mut self, category: Category) -> Result<Option<FetchTicket>, FilterError> {
        let next = self
            .taxonomy
            .default_selection(category)
            .ok_or(FilterError::UnknownCategory(category))?;
        Ok(self.change_to(next))
    }

    /// Switches subtype within the current category.
    pub fn select_subtype(&mut self, sub_type: SubType) -> Result<Option<FetchTicket>, FilterError> {
        let category = self.selected.category;
        if !self.taxonomy.contains(category, sub_type) {
            return Err(FilterError::SubtypeOutsideCategory { sub_type, category });
        }
        Ok(self.change_to(Selection { category, sub_type }))
    }

    /// An unchanged selection fetches again only to retry a failure.
    fn change_to(&mut self, next: Selection) -> Option<FetchTicket> {
        if next == self.selected && !matches!(self.status, LoadStatus::Failed { .. }) {
            return None;
        }

        self.selected = next;
        self.phase = Phase::UserModified;
        self.generation += 1;
        self.status = LoadStatus::Loading { selection: next };

        Some(FetchTicket {
            selection: next,
            generation: self.generation,
        })
    }

    /// Replaces the result set with a completed fetch, unless a newer
    /// selection was made after `ticket` was issued.
    pub fn apply(&mut self, ticket: FetchTicket, outcome: FetchOutcome) -> Applied {
        if ticket.generation != self.generation || ticket.selection != self.selected {
            return Applied::Stale;
        }

        self.results = Arc::new(outcome.properties);
        self.status = match &outcome.error {
            Some(e) => LoadStatus::Failed {
                message: e.user_message().to_string(),
            },
            None => LoadStatus::Loaded {
                fetched_at: Utc::now(),
            },
        };
        self.last_error = outcome.error;
        Applied::Applied
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.status, LoadStatus::Loading { .. })
    }
}
