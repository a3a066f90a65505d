//! Reconnaissance and covert operations

pub mod recon;
pub mod sabotage;

pub use recon::{activate_recon_array, expire_pulses, perform_recon_pulse, refresh_recon_capability};
pub use sabotage::{sabotage, train_infiltrator};
