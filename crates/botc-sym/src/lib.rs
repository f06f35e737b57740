//! botc-sym — symbol tables (spec §3/§4.3, component C3).
//!
//! Four independent registries (commands, events, states, the string
//! pool) plus the `Variable` record the parser's scope frames hold.
//! Nothing here drives compilation — `botc-par` owns the scope stack and
//! decides when a variable is declared, shadowed, or torn down; this crate
//! just defines what a variable, command, event, and state *are*.

pub mod command;
pub mod event;
pub mod state;
pub mod strpool;
pub mod types;
pub mod variable;

pub use command::{CommandArg, CommandDef, CommandTable};
pub use event::{EventDef, EventTable};
pub use state::{StateEntry, StateTable};
pub use strpool::StringPool;
pub use types::{DataType, Writability};
pub use variable::{ConstValue, Variable};
