pub mod advisory;
pub mod fertilizer;
pub mod nutrient;
pub mod plan;
pub mod production;
pub mod soil;

pub use advisory::*;
pub use fertilizer::*;
pub use nutrient::*;
pub use plan::*;
pub use production::*;
pub use soil::*;
