//! Headless match
//! Plays a full seeded game between two oracle-driven factions and prints a summary

use attrition_grid::core::config::{DoctrineMode, EngineConfig};
use attrition_grid::core::types::FactionId;
use attrition_grid::map::MapType;
use attrition_grid::oracle::{ConfiguredOracle, HeuristicOracle, HoldOracle};
use attrition_grid::service::GameService;
use attrition_grid::state::GameState;
use clap::Parser;
use tokio::runtime::Runtime;

/// Headless match - run a whole game without a console
#[derive(Parser, Debug)]
#[command(name = "headless_match")]
#[command(about = "Play a seeded attrition-grid game between two AI factions")]
struct Args {
    /// Random seed for reproducible runs
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Map: VOLGOGRAD_CAULDRON, CLASSIC_LATTICE or TARTARUS_ANOMALY
    #[arg(long, default_value = "VOLGOGRAD_CAULDRON")]
    map: String,

    /// Turn limit before the game is called a draw
    #[arg(long, default_value_t = 60)]
    turns: u32,

    /// Reveal the whole board to both factions
    #[arg(long, default_value_t = false)]
    no_fog: bool,

    /// Open doctrine windows from turn 5 instead of turn 20
    #[arg(long, default_value_t = false)]
    anomalous: bool,

    /// Both factions only hold position
    #[arg(long, default_value_t = false)]
    passive: bool,

    /// Print every system log entry as it happens
    #[arg(long, default_value_t = false)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();
    let filter = if args.verbose { "attrition_grid=debug" } else { "attrition_grid=warn" };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let map: MapType = match args.map.parse() {
        Ok(map) => map,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };
    let settings = EngineConfig {
        fog_of_war: !args.no_fog,
        doctrine_mode: if args.anomalous { DoctrineMode::Anomalous } else { DoctrineMode::Standard },
        max_turns: args.turns,
        seed: args.seed,
        ..Default::default()
    };

    println!("=== ATTRITION GRID: HEADLESS MATCH ===");
    println!("Map: {}, seed {}, turn limit {}", map.display_name(), args.seed, args.turns);
    println!("Fog of war: {}", if settings.fog_of_war { "on" } else { "off" });
    println!();

    let oracle = if args.passive {
        ConfiguredOracle::Hold(HoldOracle)
    } else {
        ConfiguredOracle::Heuristic(HeuristicOracle)
    };
    let service = GameService::with_oracle(oracle);
    let rt = match Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };

    let result = rt.block_on(async {
        let mut state = service.new_game(&args.map, Some(settings)).await?;
        let mut printed = state.system_log.len();
        while !state.is_game_over() {
            state = service.next_phase(None).await?;
            if args.verbose {
                for entry in &state.system_log[printed..] {
                    let source = entry.source.map_or("SYSTEM", FactionId::as_str);
                    println!("[T{} {:?}] {}: {}", entry.turn, entry.phase, source, entry.message);
                }
            }
            printed = state.system_log.len();
        }
        Ok::<_, attrition_grid::service::ServiceError>(state)
    });

    match result {
        Ok(state) => print_summary(&state),
        Err(e) => {
            eprintln!("match aborted: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_summary(state: &GameState) {
    println!();
    println!("=== RESULT ===");
    match &state.outcome {
        Some(outcome) => match outcome.winner {
            Some(winner) => println!("{} wins on turn {} ({:?})", winner, outcome.turn, outcome.reason),
            None => println!("Draw on turn {} ({:?})", outcome.turn, outcome.reason),
        },
        None => println!("No result"),
    }
    println!("Battles fought: {}", state.battle_log.len());
    println!();
    println!(
        "{:<8} {:>8} {:>8} {:>6} {:>6} {:>6} {:>6} {:>9}",
        "FACTION", "QR", "MAT", "NODES", "UNITS", "WON", "LOST", "CAPTURES"
    );
    for faction in state.factions.values() {
        let s = &faction.stats;
        println!(
            "{:<8} {:>8.1} {:>8.1} {:>6} {:>6} {:>6} {:>6} {:>9}",
            faction.id.as_str(),
            faction.influence,
            faction.materiel,
            s.nodes_controlled,
            s.total_units,
            s.battles_won,
            s.battles_lost,
            s.nodes_captured
        );
        for doctrine in &faction.active_doctrines {
            println!("         doctrine: {} (turn {})", doctrine.name, doctrine.adopted_turn);
        }
    }
}
