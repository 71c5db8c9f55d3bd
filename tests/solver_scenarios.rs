use island_core::config::{GridDims, SolverConfig};
use island_core::wfc::{
    CellCoord, CollapseOrigin, Face, Rotation, Socket, SolverEvent, SolverObserver, StepResult,
    TileArchetype, TileKey, TileSolver,
};
use island_core::{PlacementOutcome, SolverError};
use std::sync::{Arc, Mutex};

/// Observer that keeps every event behind a shared handle.
#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<SolverEvent>>>);

impl Recorder {
    fn events(&self) -> Vec<SolverEvent> {
        self.0.lock().map(|e| e.clone()).unwrap_or_default()
    }

    fn push(&self, event: &SolverEvent) {
        if let Ok(mut events) = self.0.lock() {
            events.push(event.clone());
        }
    }
}

impl SolverObserver for Recorder {
    fn on_collapse(&mut self, event: &SolverEvent) {
        self.push(event);
    }

    fn on_conflict(&mut self, event: &SolverEvent) {
        self.push(event);
    }

    fn on_regeneration(&mut self, event: &SolverEvent) {
        self.push(event);
    }
}

fn key(type_id: &str) -> TileKey {
    TileKey::new(type_id, Rotation::R0)
}

/// Solid floor, empty ceiling, border limit and two ground tiles.
fn layered_tiles() -> Vec<TileArchetype> {
    let ground = Socket::new("ground").invariant();
    let air = Socket::new("air").invariant();
    let side = Socket::new("side").symmetric();
    let land = |type_id: &str| {
        TileArchetype::uniform(type_id, side.clone())
            .with_socket(Face::Above, air.clone())
            .with_socket(Face::Below, ground.clone())
    };
    vec![
        TileArchetype::uniform("solid", side.clone())
            .with_socket(Face::Above, ground.clone())
            .with_socket(Face::Below, ground.clone()),
        TileArchetype::uniform("empty", side.clone())
            .with_socket(Face::Above, air.clone())
            .with_socket(Face::Below, air.clone()),
        land("limit"),
        land("grass").with_weight(4),
        land("sand"),
    ]
}

fn layered_solver(dims: GridDims, seed: u64) -> TileSolver {
    let config = SolverConfig {
        dims,
        fixed_tiles_constraint: false,
        ..SolverConfig::default()
    }
    .with_seed(seed);
    TileSolver::from_archetypes(layered_tiles(), config).unwrap()
}

#[test]
fn test_self_compatible_tile_wins_flat_grid() {
    let x = TileArchetype::uniform("x", Socket::new("x").symmetric().invariant());
    // plain horizontal sockets never fit each other
    let y = TileArchetype::uniform("y", Socket::new("y").invariant());
    let config = SolverConfig::unconstrained(GridDims::new(3, 1, 3)).with_seed(3);
    let mut solver = TileSolver::from_archetypes(vec![x, y], config).unwrap();

    let stats = solver.solve(1).unwrap();
    assert_eq!(stats.conflicts, 0);

    let snapshot = solver.snapshot();
    assert!(snapshot.is_complete());
    assert!(snapshot.cells.iter().all(|c| c.tile == Some(key("x"))));
}

#[test]
fn test_border_holds_limit_only_on_perimeter() {
    let mut solver = layered_solver(GridDims::new(5, 3, 5), 9);
    solver.advance();

    let limit = solver.catalog().find(&key("limit")).unwrap();
    for cell in solver.grid().cells() {
        let c = cell.coord;
        let perimeter = c.x == 0 || c.z == 0 || c.x == 4 || c.z == 4;
        if c.y == 1 && perimeter {
            assert_eq!(cell.tile(), Some(limit), "({}, {}, {})", c.x, c.y, c.z);
        } else if !cell.collapsed {
            assert!(!cell.domain.contains(&limit));
        }
    }

    solver.solve(10).unwrap();
    let limits = solver
        .grid()
        .cells()
        .iter()
        .filter(|c| c.tile() == Some(limit))
        .count();
    assert_eq!(limits, 16);
}

#[test]
fn test_placement_marks_surroundings_and_nothing_else() {
    let tile = TileArchetype::uniform("moss", Socket::new("m").symmetric().invariant());
    let config = SolverConfig::unconstrained(GridDims::new(5, 5, 5)).with_seed(5);
    let mut solver = TileSolver::from_archetypes(vec![tile], config).unwrap();
    solver.advance();
    assert!(solver.grid().cells().iter().all(|c| !c.collapsed && !c.visitable));

    let target = CellCoord::new(2, 2, 2);
    solver.place(&key("moss"), Some(target)).unwrap();

    let grid = solver.grid();
    assert_eq!(grid.get(target).unwrap().tile(), Some(0));
    let collapsed = grid.cells().iter().filter(|c| c.collapsed).count();
    assert_eq!(collapsed, 1);
    let visitable = grid.cells().iter().filter(|c| c.visitable).count();
    assert_eq!(visitable, 15);
    assert!(grid.get(CellCoord::new(2, 3, 1)).unwrap().visitable);
    assert!(grid.get(CellCoord::new(1, 2, 3)).unwrap().visitable);
    assert!(!grid.get(CellCoord::new(1, 3, 2)).unwrap().visitable);
}

#[test]
fn test_placement_on_candidate_keeps_other_cells() {
    let mut solver = layered_solver(GridDims::new(6, 3, 6), 21);
    solver.advance();

    let before: Vec<bool> = solver.grid().cells().iter().map(|c| c.collapsed).collect();
    let target = solver.candidate_cells(&key("sand")).unwrap()[0];
    let index = solver.grid().index_of(target).unwrap();
    solver.place(&key("sand"), Some(target)).unwrap();

    let sand = solver.catalog().find(&key("sand"));
    for (i, cell) in solver.grid().cells().iter().enumerate() {
        if i == index {
            assert_eq!(cell.tile(), sand);
        } else {
            assert_eq!(cell.collapsed, before[i]);
        }
    }
    assert_eq!(solver.stats().placements, 1);
}

#[test]
fn test_domains_shrink_and_collapses_stick_within_attempt() {
    let mut solver = layered_solver(GridDims::new(7, 3, 7), 44);
    solver.advance();

    loop {
        let attempt = solver.attempt();
        let before: Vec<(bool, Vec<usize>)> = solver
            .grid()
            .cells()
            .iter()
            .map(|c| (c.collapsed, c.domain.clone()))
            .collect();

        let step = solver.advance();
        if step == StepResult::Converged {
            break;
        }
        if solver.attempt() != attempt {
            continue;
        }

        for (cell, (was_collapsed, old)) in solver.grid().cells().iter().zip(&before) {
            assert!(cell.domain.iter().all(|t| old.contains(t)));
            if *was_collapsed {
                assert!(cell.collapsed);
                assert_eq!(&cell.domain, old);
            }
        }
    }
    assert!(solver.snapshot().is_complete());
}

#[test]
fn test_no_settled_single_option_left_after_step() {
    let mut solver = layered_solver(GridDims::new(8, 3, 8), 2);
    solver.advance();

    for _ in 0..500 {
        let attempt = solver.attempt();
        match solver.advance() {
            StepResult::Converged => break,
            StepResult::Conflict => continue,
            StepResult::Progressed if solver.attempt() == attempt => {
                let settled = solver.grid().cells().iter().any(|c| {
                    c.active
                        && !c.collapsed
                        && c.visitable
                        && c.entropy() == 1
                        && c.previous_entropy == 1
                });
                assert!(!settled);
            }
            StepResult::Progressed => {}
        }
    }
    assert!(solver.is_converged());
}

/// "open" fits itself on every face; "wall" fits nothing sideways.
fn open_and_wall() -> Vec<TileArchetype> {
    vec![
        TileArchetype::uniform("open", Socket::new("o").symmetric().invariant()),
        TileArchetype::uniform("wall", Socket::new("w").invariant()),
    ]
}

fn conflicts(recorder: &Recorder) -> Vec<SolverEvent> {
    recorder
        .events()
        .into_iter()
        .filter(|e| matches!(e, SolverEvent::Conflict { .. }))
        .collect()
}

#[test]
fn test_placement_that_empties_neighbor_regenerates() {
    let config = SolverConfig::unconstrained(GridDims::new(3, 1, 3)).with_seed(6);
    let mut solver = TileSolver::from_archetypes(open_and_wall(), config).unwrap();
    let recorder = Recorder::default();
    solver.subscribe(recorder.clone());
    solver.advance();

    let target = CellCoord::new(1, 0, 1);
    assert!(matches!(
        solver.place(&key("wall"), Some(target)),
        Ok(PlacementOutcome::Placed { .. })
    ));
    assert!(solver
        .grid()
        .cells()
        .iter()
        .any(|c| !c.collapsed && c.domain.is_empty()));

    assert_eq!(solver.advance(), StepResult::Conflict);
    assert_eq!(solver.attempt(), 2);
    assert_eq!(solver.stats().conflicts, 1);
    assert!(matches!(
        conflicts(&recorder).as_slice(),
        [SolverEvent::Conflict { attempt: 1, .. }]
    ));
    assert!(!solver.grid().get(target).unwrap().collapsed);

    solver.solve(5).unwrap();
    assert!(solver
        .snapshot()
        .cells
        .iter()
        .all(|c| c.tile == Some(key("open"))));
}

#[test]
fn test_placement_outside_converged_cube_regenerates() {
    let config = SolverConfig {
        generate_all: false,
        initial_cube_size: 1,
        ..SolverConfig::unconstrained(GridDims::new(5, 3, 5))
    }
    .with_seed(12);
    let mut solver = TileSolver::from_archetypes(open_and_wall(), config).unwrap();
    let recorder = Recorder::default();
    solver.subscribe(recorder.clone());

    for _ in 0..10 {
        if solver.advance() == StepResult::Converged {
            break;
        }
    }
    assert!(solver.is_converged());
    assert!(solver.grid().get(CellCoord::new(2, 1, 2)).unwrap().collapsed);

    // outside the cube, so the cell was never active
    let target = CellCoord::new(0, 1, 0);
    assert!(matches!(
        solver.place(&key("wall"), Some(target)),
        Ok(PlacementOutcome::Placed { .. })
    ));

    assert_eq!(solver.advance(), StepResult::Conflict);
    assert_eq!(solver.attempt(), 2);
    assert_eq!(solver.stats().conflicts, 1);
    assert!(matches!(
        conflicts(&recorder).as_slice(),
        [SolverEvent::Conflict { attempt: 1, .. }]
    ));
    assert!(!solver.is_converged());
    assert!(!solver.grid().get(target).unwrap().collapsed);

    for _ in 0..10 {
        if solver.advance() == StepResult::Converged {
            break;
        }
    }
    assert!(solver.is_converged());
    assert_eq!(solver.stats().conflicts, 1);
}

#[test]
fn test_unsolvable_grid_exhausts_attempts() {
    let lonely = TileArchetype::uniform("lonely", Socket::new("s").invariant());
    let config = SolverConfig::unconstrained(GridDims::new(2, 1, 1)).with_seed(1);
    let mut solver = TileSolver::from_archetypes(vec![lonely], config).unwrap();
    let recorder = Recorder::default();
    solver.subscribe(recorder.clone());

    assert_eq!(
        solver.solve(3),
        Err(SolverError::AttemptsExhausted { attempts: 3 })
    );

    let events = recorder.events();
    let conflicts = events
        .iter()
        .filter(|e| matches!(e, SolverEvent::Conflict { .. }))
        .count();
    assert_eq!(conflicts, 3);
    assert!(events
        .iter()
        .any(|e| matches!(e, SolverEvent::RegenerationFinished { attempt: 2 })));
    assert!(!events
        .iter()
        .any(|e| matches!(e, SolverEvent::Collapsed { .. })));
    assert_eq!(solver.stats().conflicts, 3);
}

#[test]
fn test_collapse_events_follow_solve() {
    let mut solver = layered_solver(GridDims::new(5, 3, 5), 13);
    let recorder = Recorder::default();
    solver.subscribe(recorder.clone());
    solver.solve(10).unwrap();

    let events = recorder.events();
    let last_attempt = solver.attempt();
    let mut selected = 0;
    let mut forced = 0;
    let mut collapsed_in_last = 0;
    let mut in_last = last_attempt == 1;
    for event in &events {
        match event {
            SolverEvent::RegenerationStarted { attempt } => in_last = attempt + 1 == last_attempt,
            SolverEvent::Collapsed { origin, .. } if in_last => {
                collapsed_in_last += 1;
                match origin {
                    CollapseOrigin::Forced => forced += 1,
                    CollapseOrigin::Selected => selected += 1,
                    _ => {}
                }
            }
            _ => {}
        }
    }
    // floor, ceiling and border
    assert_eq!(forced, 25 + 25 + 16);
    assert!(selected > 0);
    assert_eq!(collapsed_in_last, 75);
    assert!(matches!(
        events.last(),
        Some(SolverEvent::Converged { attempt, iterations: 75 }) if *attempt == last_attempt
    ));
}
