//! Bevy plugin that runs the tile solver a few steps per frame.
//!
//! ## Usage
//!
//! ```ignore
//! use island_core::plugin::{IslandSolver, TileSolverPlugin};
//!
//! App::new()
//!     .add_plugins(TileSolverPlugin { steps_per_frame: 4 })
//!     .insert_resource(IslandSolver::new(solver))
//!     .run();
//! ```
//!
//! Other systems talk to the solver through messages: write
//! `PlaceTileRequest` or `RegenerateRequest`, read `SolverEventMessage`.

use crate::wfc::events::SolverEvent;
use crate::wfc::solver::{PlacementRequest, StepResult, TileSolver};
use bevy::prelude::*;

pub struct TileSolverPlugin {
    /// Scheduling steps run per `Update`.
    pub steps_per_frame: usize,
}

impl Default for TileSolverPlugin {
    fn default() -> Self {
        Self { steps_per_frame: 1 }
    }
}

impl Plugin for TileSolverPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(SolverSchedule {
            steps_per_frame: self.steps_per_frame.max(1),
        })
        .add_message::<PlaceTileRequest>()
        .add_message::<RegenerateRequest>()
        .add_message::<SolverEventMessage>()
        .add_systems(
            Update,
            (
                queue_placements,
                handle_regeneration,
                advance_solver,
                forward_solver_events,
            )
                .chain(),
        );
    }
}

#[derive(Resource, Debug, Clone, Copy)]
pub struct SolverSchedule {
    pub steps_per_frame: usize,
}

/// The solver plus the receiving end of its event channel.
#[derive(Resource)]
pub struct IslandSolver {
    solver: TileSolver,
    events: async_channel::Receiver<SolverEvent>,
    last_step: Option<StepResult>,
}

impl IslandSolver {
    pub fn new(mut solver: TileSolver) -> Self {
        let (tx, rx) = async_channel::unbounded();
        solver.subscribe(tx);
        Self {
            solver,
            events: rx,
            last_step: None,
        }
    }

    pub fn solver(&self) -> &TileSolver {
        &self.solver
    }

    pub fn solver_mut(&mut self) -> &mut TileSolver {
        &mut self.solver
    }

    /// Result of the most recent step.
    pub fn last_step(&self) -> Option<StepResult> {
        self.last_step
    }
}

/// A tile dropped by the player, applied before the next solver step.
#[derive(Message, Debug, Clone)]
pub struct PlaceTileRequest(pub PlacementRequest);

/// Throw the grid away and start again.
#[derive(Message, Debug, Clone, Copy, Default)]
pub struct RegenerateRequest;

#[derive(Message, Debug, Clone)]
pub struct SolverEventMessage(pub SolverEvent);

fn queue_placements(
    mut requests: MessageReader<PlaceTileRequest>,
    solver: Option<ResMut<IslandSolver>>,
) {
    let Some(mut island) = solver else {
        return;
    };
    for PlaceTileRequest(request) in requests.read() {
        island.solver.enqueue_placement(request.clone());
    }
}

fn handle_regeneration(
    mut requests: MessageReader<RegenerateRequest>,
    solver: Option<ResMut<IslandSolver>>,
) {
    let requested = requests.read().count() > 0;
    if let (true, Some(mut island)) = (requested, solver) {
        island.solver.regenerate();
    }
}

fn advance_solver(schedule: Res<SolverSchedule>, solver: Option<ResMut<IslandSolver>>) {
    let Some(mut island) = solver else {
        return;
    };
    for _ in 0..schedule.steps_per_frame {
        let step = island.solver.advance();
        island.last_step = Some(step);
        if step == StepResult::Converged {
            break;
        }
    }
}

fn forward_solver_events(
    solver: Option<Res<IslandSolver>>,
    mut writer: MessageWriter<SolverEventMessage>,
) {
    let Some(island) = solver else {
        return;
    };
    while let Ok(event) = island.events.try_recv() {
        writer.write(SolverEventMessage(event));
    }
}
