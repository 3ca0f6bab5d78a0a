pub mod quote;
pub mod recompute;
pub mod sentiment;

pub use quote::*;
pub use recompute::*;
pub use sentiment::*;
