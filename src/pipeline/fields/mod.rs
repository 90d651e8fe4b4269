pub mod engine;
pub mod normalize;
pub mod rules;

pub use engine::*;
pub use rules::*;
