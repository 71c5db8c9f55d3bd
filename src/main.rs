//! Headless island builder.
//!
//! Loads a tileset and solver config, runs the solver through the Bevy
//! plugin and plays a few placements from the tile offer the way a player
//! would. Prints every layer once the island converges.
//!
//! Run with: `cargo run -- [tileset.xml] [config.json] [--placements N] [--snapshot out.json]`

use bevy::log::{info, warn, LogPlugin};
use bevy::prelude::*;
use island_core::config::SolverConfig;
use island_core::plugin::{IslandSolver, PlaceTileRequest, TileSolverPlugin};
use island_core::rng::{StdRandom, TileRng};
use island_core::wfc::{
    load_tileset, CellCoord, GridSnapshot, PlacementRequest, TileCatalog, TileSolver,
};
use island_core::TileOffer;
use std::error::Error;

const DEFAULT_TILESET: &str = "assets/tilesets/island.xml";
const DEFAULT_CONFIG: &str = "assets/island_config.json";
const MAX_FRAMES: usize = 10_000;

struct Args {
    tileset: String,
    config: String,
    placements: usize,
    snapshot: Option<String>,
}

fn parse_args() -> Result<Args, Box<dyn Error>> {
    let mut positional = Vec::new();
    let mut placements = 3;
    let mut snapshot = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--placements" => {
                let value = args.next().ok_or("--placements needs a value")?;
                placements = value.parse()?;
            }
            "--snapshot" => snapshot = Some(args.next().ok_or("--snapshot needs a path")?),
            _ => positional.push(arg),
        }
    }

    let mut positional = positional.into_iter();
    Ok(Args {
        tileset: positional.next().unwrap_or_else(|| DEFAULT_TILESET.to_string()),
        config: positional.next().unwrap_or_else(|| DEFAULT_CONFIG.to_string()),
        placements,
        snapshot,
    })
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = parse_args()?;

    let config = SolverConfig::load(&args.config)?;
    let archetypes = load_tileset(&args.tileset)?;
    let catalog = TileCatalog::new(archetypes, config.excluded_neighbor_constraint)?;
    let offer_config = config.offer.clone();
    let solver = TileSolver::new(catalog, config)?;

    let mut app = App::new();
    app.add_plugins(LogPlugin::default())
        .add_plugins(TileSolverPlugin { steps_per_frame: 8 })
        .insert_resource(IslandSolver::new(solver));

    // Player side: its own rng so the solver's draws stay reproducible.
    let mut rng = StdRandom::from_entropy();
    let mut offer = {
        let island = app.world().resource::<IslandSolver>();
        TileOffer::new(island.solver().catalog(), &offer_config, &mut rng)
    };
    let mut placements_left = args.placements;

    for _ in 0..MAX_FRAMES {
        app.update();

        let island = app.world().resource::<IslandSolver>();
        let solver = island.solver();
        if solver.is_converged() {
            break;
        }
        if placements_left == 0 {
            continue;
        }

        let Some(request) = next_placement(solver, &mut offer, &mut rng) else {
            continue;
        };
        placements_left -= 1;
        info!(
            "player drops {} on {:?}",
            request.tile,
            request.cell.map(|c| (c.x, c.y, c.z))
        );
        app.world_mut()
            .resource_mut::<Messages<PlaceTileRequest>>()
            .write(PlaceTileRequest(request));
    }

    let island = app.world().resource::<IslandSolver>();
    let solver = island.solver();
    if !solver.is_converged() {
        warn!("stopped after {} frames without converging", MAX_FRAMES);
    }

    let snapshot = solver.snapshot();
    print_layers(&snapshot);
    println!("{}", serde_json::to_string_pretty(&solver.stats())?);

    if let Some(path) = args.snapshot {
        std::fs::write(&path, serde_json::to_string_pretty(&snapshot)?)?;
        info!("snapshot written to {}", path);
    }
    Ok(())
}

/// Drop the offered tile on a random cell that can still hold it, or throw
/// it away when none can.
fn next_placement(
    solver: &TileSolver,
    offer: &mut TileOffer,
    rng: &mut dyn TileRng,
) -> Option<PlacementRequest> {
    let catalog = solver.catalog();
    let tile = catalog.key(offer.current()?);
    let cells: Vec<CellCoord> = solver.candidate_cells(&tile).ok()?;
    let cell = (!cells.is_empty()).then(|| cells[rng.next_usize_max(cells.len())]);

    offer.take(catalog, solver.valid_tile_set(), rng);
    Some(PlacementRequest { tile, cell })
}

fn glyph(type_id: &str) -> char {
    match type_id {
        "solid" => '#',
        "empty" => ' ',
        "limit" => '~',
        "grass" => '.',
        "pine" => 'T',
        "canopy" => '^',
        "house" => 'H',
        t if t.starts_with("path") => '+',
        t => t.chars().next().unwrap_or('?'),
    }
}

fn print_layers(snapshot: &GridSnapshot) {
    for y in 0..snapshot.dims.y {
        println!("layer {}", y);
        let rows = snapshot.layer_rows(y, |cell| match &cell.tile {
            Some(tile) => glyph(&tile.type_id),
            None if cell.entropy == 0 => '!',
            None => '?',
        });
        for row in rows {
            println!("  {}", row);
        }
    }
}
