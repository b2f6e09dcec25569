//! Species names and reference information.

mod knowledge;
mod table;

pub use knowledge::{KnowledgeBase, SpeciesRecord};
pub use table::{SpeciesNames, SpeciesTable};
