pub mod feature;
pub mod picking;
pub mod spatial;
pub mod store;
pub mod style;

pub use feature::*;
pub use store::*;
