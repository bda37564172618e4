pub mod market;
pub mod position;
pub mod trade;

pub use market::*;
pub use position::*;
pub use trade::*;
