//! Attrition Grid - Console
//!
//! Drives a single game through the service layer from stdin. Set
//! `LLM_API_KEY` and start a game with `new <MAP> llm` to let the LLM oracle
//! plan; otherwise the heuristic oracle plays both sides.

use attrition_grid::core::config::EngineConfig;
use attrition_grid::core::error::Result;
use attrition_grid::core::types::FactionId;
use attrition_grid::map::MapType;
use attrition_grid::service::{GameService, ServiceResult};
use attrition_grid::state::GameState;
use serde_json::json;

use std::io::{self, Write};
use tokio::runtime::Runtime;

/// System log lines echoed after each step
const RECENT_LOG_LINES: usize = 6;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "attrition_grid=info".into()),
        )
        .init();

    tracing::info!("Attrition Grid console starting...");

    let rt = Runtime::new()?;
    let service = GameService::new();

    println!("\n=== ATTRITION GRID ===");
    println!("Turn-based attrition wargame: AXIOM vs GEM-Q");
    println!();
    println!("Commands:");
    println!("  new [MAP] [llm]         - Start a game (maps: {})", map_names());
    println!("  next / n                - Advance one phase");
    println!("  run <n>                 - Advance n phases");
    println!("  state / s               - Show the board");
    println!("  directive [@FACTION] <text> - Send a command-console directive");
    println!("  doctrine <id> [FACTION] - Choose a pending doctrine");
    println!("  quit / q                - Exit");
    println!();

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        let (command, rest) = input.split_once(' ').unwrap_or((input, ""));
        let rest = rest.trim();
        match command {
            "quit" | "q" => break,
            "new" => {
                let mut words = rest.split_whitespace();
                let map = words.next().unwrap_or("VOLGOGRAD_CAULDRON");
                let mut settings = EngineConfig::default();
                settings.oracle.use_llm = words.next() == Some("llm");
                report(rt.block_on(service.new_game(map, Some(settings))));
            }
            "next" | "n" => report(rt.block_on(service.next_phase(None))),
            "run" => match rest.parse::<u32>() {
                Ok(n) => {
                    let mut last = None;
                    for _ in 0..n {
                        match rt.block_on(service.next_phase(None)) {
                            Ok(state) if state.is_game_over() => {
                                last = Some(Ok(state));
                                break;
                            }
                            Ok(state) => last = Some(Ok(state)),
                            Err(e) => {
                                last = Some(Err(e));
                                break;
                            }
                        }
                    }
                    if let Some(result) = last {
                        report(result);
                    }
                }
                Err(_) => println!("Usage: run <number>"),
            },
            "state" | "s" => match rt.block_on(service.state()) {
                Ok(state) => display_board(&state),
                Err(e) => println!("Error {}", e),
            },
            "directive" => {
                let (target, message) = match rest.strip_prefix('@') {
                    Some(targeted) => {
                        let (faction, text) = targeted.split_once(' ').unwrap_or((targeted, ""));
                        (json!(faction.to_ascii_uppercase()), text.trim())
                    }
                    None => (json!("BROADCAST"), rest),
                };
                let payload = json!({ "message": message, "target": target });
                report(rt.block_on(service.action("sendDirective", payload)));
            }
            "doctrine" => {
                let mut words = rest.split_whitespace();
                let payload = json!({
                    "doctrineId": words.next(),
                    "factionId": words.next(),
                });
                report(rt.block_on(service.action("chooseDoctrine", payload)));
            }
            _ => println!("Unknown command. Available: new, next, run <n>, state, directive, doctrine, quit"),
        }
    }

    println!("\nGoodbye!");
    Ok(())
}

fn map_names() -> String {
    MapType::ALL
        .iter()
        .map(|m| serde_json::to_value(m).ok().and_then(|v| v.as_str().map(String::from)).unwrap_or_default())
        .collect::<Vec<_>>()
        .join(", ")
}

fn report(result: ServiceResult<GameState>) {
    match result {
        Ok(state) => display_status(&state),
        Err(e) => println!("Error {}", e),
    }
}

fn display_status(state: &GameState) {
    println!("\n--- Turn {} | {:?} ---", state.turn, state.current_phase);
    for faction in state.factions.values() {
        println!(
            "  {:<8} {:>7.1} QR {:>7.1} MAT  nodes {:>2}  units {:>3}",
            faction.id.as_str(),
            faction.influence,
            faction.materiel,
            faction.stats.nodes_controlled,
            faction.stats.total_units
        );
    }
    let start = state.system_log.len().saturating_sub(RECENT_LOG_LINES);
    for entry in &state.system_log[start..] {
        let source = entry.source.map_or("SYSTEM", FactionId::as_str);
        println!("  [{:?}] {}: {}", entry.kind, source, entry.message);
    }
    if !state.doctrine_choices_pending.is_empty() {
        for (faction, offered) in &state.doctrine_choices_pending {
            println!("  Doctrine choice pending for {}: {}", faction, offered.join(" / "));
        }
    }
    if let Some(outcome) = &state.outcome {
        match outcome.winner {
            Some(winner) => println!("\n*** {} WINS ({:?}) ***", winner, outcome.reason),
            None => println!("\n*** DRAW ({:?}) ***", outcome.reason),
        }
    }
}

fn display_board(state: &GameState) {
    println!("\n=== {} - turn {} ===", state.map_type.display_name(), state.turn);
    println!("{:<6} {:<16} {:<8} {:>4} {:>4} {:>4} {:>4}", "ID", "TYPE", "OWNER", "STD", "VET", "FORT", "ART");
    for node in state.map_nodes.values() {
        println!(
            "{:<6} {:<16} {:<8} {:>4} {:>4} {:>4} {:>4}",
            node.id.as_str(),
            format!("{:?}", node.node_type),
            node.owner.as_str(),
            node.standard_units,
            node.veteran_units,
            node.fortification_level,
            node.artillery
        );
    }
    if let Some(last) = state.battle_log.last() {
        println!("\nLast battle: {:?}", last.outcome);
    }
    for entry in state.comm_log.iter().rev().take(3) {
        println!("  comm [{}] {}: {}", entry.turn, entry.sender, entry.message);
    }
}
