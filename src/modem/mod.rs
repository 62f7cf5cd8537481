//! Cellular module plumbing: typed AT commands, the non-blocking command
//! link, and the maintenance scripts that run over it.

pub mod at;
pub mod script;
pub mod transport;

pub use at::AtCommand;
pub use script::{ScriptKind, ScriptRunner};
pub use transport::{CommandLink, Transport};
