//! Attrition Grid - turn-based attrition wargame engine

pub mod actions;
pub mod combat;
pub mod core;
pub mod covert;
pub mod doctrine;
pub mod economy;
pub mod events;
pub mod fortification;
pub mod map;
pub mod oracle;
pub mod service;
pub mod state;
pub mod turn;
pub mod victory;
pub mod visibility;
