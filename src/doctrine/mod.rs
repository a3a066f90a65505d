//! Doctrines: periodic buff/nerf bundles and the engine that folds them into
//! faction modifiers

pub mod catalog;
pub mod effect;
pub mod engine;
pub mod modifiers;

pub use catalog::{DoctrineCatalog, DoctrineDefinition, DoctrineTheme, DoctrineTier};
pub use effect::{CombatCondition, DoctrineEffect, ResourceConversion};
pub use engine::{adopt_doctrine, apply_effect, expire_temporary_modifiers};
pub use modifiers::DoctrineModifiers;
