//! Blockgrid - headless runner
//!
//! Loads a level, optionally holds some direction keys down, runs a number
//! of ticks and prints an ASCII snapshot of the board every so often.

use std::path::PathBuf;

use blockgrid::core::error::Result;
use blockgrid::core::input::InputKey;
use blockgrid::core::types::Cell;
use blockgrid::entity::template::EntityCatalog;
use blockgrid::entity::BehaviorKind;
use blockgrid::level::{LevelLoader, TerrainCatalog};
use blockgrid::{Simulation, SimulationConfig};
use clap::Parser;
use tracing_subscriber::EnvFilter;

const DEMO_LEVEL: &str = include_str!("../data/levels/demo.json");

/// Headless blockgrid runner
#[derive(Parser, Debug)]
#[command(name = "blockgrid")]
#[command(about = "Run a blockgrid level without a renderer")]
struct Args {
    /// Level file (.json or .toml); the bundled demo when omitted
    #[arg(long)]
    level: Option<PathBuf>,

    /// Simulation config (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Terrain catalog (TOML); built-in floor/wall/water when omitted
    #[arg(long)]
    terrain: Option<PathBuf>,

    /// Entity-type catalog (TOML); built-in types when omitted
    #[arg(long)]
    types: Option<PathBuf>,

    /// Number of ticks to run
    #[arg(long, default_value_t = 240)]
    ticks: u32,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Print a snapshot every N ticks (0 prints only the final board)
    #[arg(long, default_value_t = 60)]
    every: u32,

    /// Keys held for the whole run (up, down, left, right)
    #[arg(long, value_delimiter = ',')]
    hold: Vec<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("blockgrid=info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.rng_seed = Some(seed);
    }

    let terrain = match &args.terrain {
        Some(path) => TerrainCatalog::load(path)?,
        None => TerrainCatalog::builtin(),
    };
    let types = match &args.types {
        Some(path) => EntityCatalog::load(path)?,
        None => EntityCatalog::builtin(),
    };

    let loader = LevelLoader::new(&terrain, &types);
    let loaded = match &args.level {
        Some(path) => loader.load_from_file(path, config)?,
        None => loader.load_from_json(DEMO_LEVEL, config)?,
    };
    for err in &loaded.skipped {
        eprintln!("skipped: {}", err);
    }
    let mut sim = loaded.simulation;

    for name in &args.hold {
        match InputKey::from_code(name) {
            Some(key) => sim.input_mut().press(key),
            None => tracing::warn!(key = %name, "ignoring unknown key"),
        }
    }

    println!("=== {} ===", sim.level().name);
    println!("{}", render(&sim));

    let mut pushes = 0;
    let mut eliminated = 0;
    for n in 1..=args.ticks {
        let report = sim.step();
        pushes += report.pushes;
        eliminated += report.eliminated.len();
        if args.every > 0 && n % args.every == 0 {
            println!("--- tick {} ---", report.tick);
            println!("{}", render(&sim));
        }
    }

    if args.every == 0 || args.ticks % args.every != 0 {
        println!("--- tick {} ---", sim.current_tick());
        println!("{}", render(&sim));
    }
    println!("pushes: {}  eliminated: {}", pushes, eliminated);

    let mismatches = sim.index_mismatches();
    if !mismatches.is_empty() {
        for line in &mismatches {
            tracing::error!("{}", line);
        }
    }

    Ok(())
}

/// One character per cell: entities over terrain, solid terrain as `#`
fn render(sim: &Simulation) -> String {
    let level = sim.level();
    let mut out = String::new();
    for row in 0..level.height() as i32 {
        for col in 0..level.width() as i32 {
            let cell = Cell::new(row, col);
            out.push(glyph_at(sim, cell).unwrap_or(if level.is_passable(cell) { '.' } else { '#' }));
        }
        out.push('\n');
    }
    out
}

fn glyph_at(sim: &Simulation, cell: Cell) -> Option<char> {
    let mut glyph = None;
    for id in sim.entities_at(cell) {
        let Some(entity) = sim.entity(id) else { continue };
        // Anything solid sitting on a cell draws over a pit
        let ch = if entity.flags.is_player {
            '@'
        } else if entity.flags.is_pit {
            'O'
        } else if entity.flags.heavy {
            'X'
        } else if entity.has_behavior(BehaviorKind::RandomWalk) {
            'r'
        } else if entity.has_energy() == Some(true) {
            'E'
        } else {
            'b'
        };
        if glyph.is_none() || glyph == Some('O') {
            glyph = Some(ch);
        }
    }
    glyph
}
