#[cfg_attr(docsrs, doc(cfg(feature = "transport-audit")))]
#[cfg(feature = "transport-audit")]
#[doc(hidden)]
pub mod audit;
#[cfg_attr(docsrs, doc(cfg(feature = "transport-nop")))]
#[cfg(feature = "transport-nop")]
mod nop;

#[cfg(feature = "transport-audit")]
pub use audit::{Audit, AuditOption};
#[cfg(feature = "transport-nop")]
pub use nop::Nop;
