//! Pipeline module - the five scoring stages and their orchestration

pub mod cleaner;
pub mod columns;
pub mod comparator;
pub mod loader;
pub mod normalizer;
pub mod position;
pub mod runner;
pub mod scorer;
pub mod valuation;
pub mod weights;

pub use cleaner::*;
pub use columns::*;
pub use comparator::*;
pub use loader::*;
pub use normalizer::*;
pub use position::*;
pub use runner::*;
pub use scorer::*;
pub use valuation::*;
pub use weights::*;
