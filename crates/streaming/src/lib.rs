pub mod cache;
pub mod config;
pub mod error;
pub mod grid;
pub mod io;
pub mod pipeline;
pub mod protocol;
pub mod request;
pub mod residency;
pub mod strategy;
pub mod toggle;

pub use cache::*;
pub use config::*;
pub use error::*;
pub use grid::*;
pub use io::*;
pub use pipeline::*;
pub use protocol::*;
pub use request::*;
pub use residency::*;
pub use strategy::*;
pub use toggle::*;
