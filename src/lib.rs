pub mod complexity;
pub mod error;
pub mod gbz;
pub mod gfa;
pub mod io;
pub mod node_table;
pub mod progress;
pub mod region;
pub mod walks;

pub use error::{PanctError, Result};
