//! Solver events and observers.
//!
//! Collaborators (renderers, the tile offer, telemetry) subscribe with a
//! `SolverObserver`. An `async_channel::Sender<SolverEvent>` is an observer,
//! so the usual subscription is a channel whose receiver is drained by the
//! consumer.

use super::tile::TileKey;
use super::wave::CellCoord;
use serde::{Deserialize, Serialize};

/// How a cell got its tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollapseOrigin {
    /// Border, floor, ceiling or fixed tile during initialization.
    Forced,
    /// Picked by the scheduler.
    Selected,
    /// Only option left across two passes.
    SingleOption,
    /// Placed by the player.
    Placed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolverEvent {
    Collapsed {
        coord: CellCoord,
        index: usize,
        tile: TileKey,
        origin: CollapseOrigin,
    },
    Conflict {
        coord: CellCoord,
        attempt: u32,
    },
    RegenerationStarted {
        attempt: u32,
    },
    RegenerationFinished {
        attempt: u32,
    },
    Converged {
        attempt: u32,
        iterations: usize,
    },
}

/// Receives solver events. All methods default to doing nothing.
pub trait SolverObserver: Send + Sync {
    /// A cell was collapsed.
    fn on_collapse(&mut self, _event: &SolverEvent) {}

    /// A cell ran out of options.
    fn on_conflict(&mut self, _event: &SolverEvent) {}

    /// Regeneration started or finished, or the solve converged.
    fn on_regeneration(&mut self, _event: &SolverEvent) {}
}

/// Route an event to the matching observer method.
pub fn dispatch(observer: &mut dyn SolverObserver, event: &SolverEvent) {
    match event {
        SolverEvent::Collapsed { .. } => observer.on_collapse(event),
        SolverEvent::Conflict { .. } => observer.on_conflict(event),
        SolverEvent::RegenerationStarted { .. }
        | SolverEvent::RegenerationFinished { .. }
        | SolverEvent::Converged { .. } => observer.on_regeneration(event),
    }
}

impl SolverObserver for async_channel::Sender<SolverEvent> {
    fn on_collapse(&mut self, event: &SolverEvent) {
        // A closed channel means the subscriber is gone.
        let _ = self.try_send(event.clone());
    }

    fn on_conflict(&mut self, event: &SolverEvent) {
        let _ = self.try_send(event.clone());
    }

    fn on_regeneration(&mut self, event: &SolverEvent) {
        let _ = self.try_send(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wfc::tile::Rotation;

    #[derive(Default)]
    struct Counter {
        collapses: usize,
        conflicts: usize,
        regenerations: usize,
    }

    impl SolverObserver for Counter {
        fn on_collapse(&mut self, _event: &SolverEvent) {
            self.collapses += 1;
        }
        fn on_conflict(&mut self, _event: &SolverEvent) {
            self.conflicts += 1;
        }
        fn on_regeneration(&mut self, _event: &SolverEvent) {
            self.regenerations += 1;
        }
    }

    fn collapsed() -> SolverEvent {
        SolverEvent::Collapsed {
            coord: CellCoord::new(1, 0, 2),
            index: 7,
            tile: TileKey::new("grass", Rotation::R0),
            origin: CollapseOrigin::Selected,
        }
    }

    #[test]
    fn test_dispatch_routes_by_kind() {
        let mut counter = Counter::default();
        dispatch(&mut counter, &collapsed());
        dispatch(
            &mut counter,
            &SolverEvent::Conflict {
                coord: CellCoord::new(0, 0, 0),
                attempt: 1,
            },
        );
        dispatch(&mut counter, &SolverEvent::RegenerationStarted { attempt: 1 });
        dispatch(&mut counter, &SolverEvent::RegenerationFinished { attempt: 2 });
        assert_eq!(counter.collapses, 1);
        assert_eq!(counter.conflicts, 1);
        assert_eq!(counter.regenerations, 2);
    }

    #[test]
    fn test_channel_observer_forwards() {
        let (mut tx, rx) = async_channel::unbounded();
        dispatch(&mut tx, &collapsed());
        assert_eq!(rx.try_recv().unwrap(), collapsed());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_closed_channel_is_ignored() {
        let (mut tx, rx) = async_channel::unbounded::<SolverEvent>();
        drop(rx);
        dispatch(&mut tx, &collapsed());
    }
}
