mod micro_op;
mod page;
mod program;

pub use micro_op::{Signals, TimingMicroOp, WaitCondition};
pub use page::Page;
pub use program::TimingProgram;
