pub mod enums;
pub mod plan;

pub use enums::*;
pub use plan::*;
