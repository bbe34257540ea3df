mod compiler;
mod config;
mod mode;

pub use compiler::{FlipState, TimingCompiler};
pub use config::{FlipConfig, TimingConfig};
pub use mode::TimingMode;
