//! Game rule constants
//!
//! Costs are in materiel (MAT) unless the name says influence (QR).

// Starting pools
pub const STARTING_INFLUENCE: f64 = 100.0;
pub const STARTING_MATERIEL: f64 = 650.0;

// Deployment
pub const UNIT_DEPLOY_COST: f64 = 15.0;
pub const MAX_DEPLOY_PER_ACTION: u32 = 10;
pub const REINFORCEMENTS_PER_COMMAND_NODE: u32 = 2;

// Fortification
pub const FORT_HP_PER_LEVEL: u32 = 100;
pub const FORT_REPAIR_COST_PER_HP: f64 = 0.25;
pub const FORT_UPGRADE_COST: f64 = 25.0;
pub const MAX_FORTIFICATION_LEVEL: u32 = 5;
/// Added to each defender roll per effective fortification level
pub const FORT_DEFENSE_BONUS_PER_LEVEL: i32 = 2;
pub const BATTLE_FORT_HP_DAMAGE_PER_ROUND: u32 = 10;

// Artillery
pub const ARTILLERY_COST_INFLUENCE: f64 = 30.0;
pub const ARTILLERY_COST_MATERIEL: f64 = 100.0;
pub const ARTILLERY_MOVE_COST_PER_PIECE: f64 = 5.0;
pub const ARTILLERY_STRIKE_AMMO_COST: f64 = 15.0;
pub const ARTILLERY_STRIKE_KILLS_PER_GUN: u32 = 1;
pub const ARTILLERY_STRIKE_FORT_HP_DAMAGE_PER_GUN: u32 = 15;
pub const MAX_ARTILLERY_PER_NODE: u32 = 5;

// Reconnaissance
pub const RECON_ACTIVATION_COST_INFLUENCE: f64 = 75.0;
pub const RECON_ACTIVATION_COST_MATERIEL: f64 = 50.0;
pub const RECON_PULSE_COST_INFLUENCE: f64 = 40.0;
pub const RECON_PULSE_COST_MATERIEL: f64 = 20.0;
pub const RECON_ARRAY_UPKEEP: f64 = 10.0;

// Covert operations
pub const INFILTRATOR_COST: f64 = 75.0;
pub const MAX_INFILTRATORS_PER_FACTION_PER_NODE: u32 = 1;
pub const SABOTAGE_SUCCESS_CHANCE: f64 = 0.75;
pub const SABOTAGE_DETECTION_CHANCE: f64 = 0.5;
pub const SABOTAGE_MATERIEL_DRAIN: f64 = 75.0;
pub const SABOTAGE_INTERDICTION_TURNS: u32 = 2;
/// Output multiplier on an interdicted node
pub const INTERDICTED_OUTPUT_FACTOR: f64 = 0.5;
pub const SABOTAGE_FORT_DESTRUCTION_CHANCE: f64 = 0.10;
/// Success chance lost per point of suppression on the target node
pub const SUPPRESSION_SABOTAGE_PENALTY: f64 = 0.05;
pub const MAX_ALARM_LEVEL: u32 = 5;

// Upkeep
pub const UPKEEP_PER_STANDARD_UNIT: f64 = 0.25;
pub const VETERAN_UPKEEP_MULTIPLIER: f64 = 1.5;
pub const UPKEEP_PER_FORT_LEVEL: f64 = 5.0;

// Combat
pub const DIE_FACES: u32 = 6;
pub const HIT_THRESHOLD: i32 = 5;
pub const VETERAN_COMBAT_BONUS: i32 = 2;
/// One in this many surviving standard units is promoted after a battle
pub const BATTLE_PROMOTION_RATIO: u32 = 5;
/// An assault still undecided after this many rounds is repulsed
pub const MAX_BATTLE_ROUNDS: u32 = 100;

// Veteran training
pub const VETERAN_TRAINING_COST_PER_UNIT: f64 = 10.0;
pub const VETERAN_TRAINING_TURNS: u32 = 2;

// Economy
pub const INFLUENCE_PER_NODE_IN_LARGEST_NETWORK: f64 = 10.0;

// Doctrine
pub const DOCTRINE_PHASE_INTERVAL: u32 = 5;
pub const DOCTRINE_STANDARD_START_TURN: u32 = 20;
pub const DOCTRINE_ANOMALOUS_START_TURN: u32 = 5;
pub const DOCTRINE_CHOICES_OFFERED: usize = 2;

// Game length and logs
pub const MAX_TURNS: u32 = 60;
pub const COMM_LOG_LIMIT: usize = 50;
pub const PLAN_HISTORY_LIMIT: usize = 10;
