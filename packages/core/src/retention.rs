//! Per-item UI state owned by the feed controller, with a trailing-window
//! cleanup policy.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Transient UI flags for one feed position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemUiState {
    /// The save button was just pressed; drives the confirmation animation.
    pub just_saved: bool,
    /// The details panel is expanded.
    pub details_expanded: bool,
}

impl ItemUiState {
    fn is_default(&self) -> bool {
        !self.just_saved && !self.details_expanded
    }
}

/// UI state keyed by feed position.
///
/// Only positions inside the trailing window (or ahead of the current index)
/// hold state: [`RetainedUiState::cleanup`] drops older entries and
/// [`RetainedUiState::update`] refuses to create them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetainedUiState {
    window: usize,
    current: usize,
    entries: BTreeMap<usize, ItemUiState>,
}

impl RetainedUiState {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            current: 0,
            entries: BTreeMap::new(),
        }
    }

    /// Whether `position` is inside the trailing window of the current index.
    pub fn is_retained(&self, position: usize) -> bool {
        position + self.window >= self.current
    }

    pub fn get(&self, position: usize) -> ItemUiState {
        self.entries.get(&position).copied().unwrap_or_default()
    }

    /// Apply `f` to the state at `position`. Entries that end up all-default
    /// are dropped.
    ///
    /// Returns `false` without applying `f` when `position` is behind the
    /// trailing window.
    pub fn update(&mut self, position: usize, f: impl FnOnce(&mut ItemUiState)) -> bool {
        if !self.is_retained(position) {
            return false;
        }
        let mut state = self.get(position);
        f(&mut state);
        if state.is_default() {
            self.entries.remove(&position);
        } else {
            self.entries.insert(position, state);
        }
        true
    }

    /// Drop state for positions more than `window` behind `current`.
    ///
    /// Returns the number of discarded entries.
    pub fn cleanup(&mut self, current: usize) -> usize {
        self.current = current;
        if current <= self.window {
            return 0;
        }
        let keep_from = current - self.window;
        let kept = self.entries.split_off(&keep_from);
        let dropped = self.entries.len();
        self.entries = kept;
        dropped
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Positions that currently hold state, ascending.
    pub fn positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.keys().copied()
    }
}
