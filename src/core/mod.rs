pub mod campaign;
pub mod config;
pub mod config_loader;
pub mod error;
pub mod retry;
pub mod state_machine;
pub mod traits;

pub use campaign::*;
pub use error::*;
pub use retry::*;
pub use state_machine::*;
pub use traits::*;
