//! Enforced resource limits (spec §6). Every count-based limit here is
//! fatal to exceed; see `ErrorKind::Limit` in `botc-util` and the call
//! sites in `botc-sym` and `botc-par` that check against these constants.
//! `REACTION_TIME` isn't a count a source file can exceed — it's the fixed
//! engine reaction-time budget inherited from the runtime this bytecode
//! targets — so it's surfaced as build-stats info (`botc-drv`'s verbose
//! log) rather than a violation check.

pub const MAX_STATES: usize = 256;
pub const MAX_EVENTS_PER_STATE: usize = 32;
pub const MAX_GLOBAL_EVENTS: usize = 32;
pub const MAX_GLOBAL_VARS: usize = 128;
pub const MAX_STATE_LOCAL_VARS: usize = 16;
pub const MAX_GLOBAL_ARRAYS: usize = 16;
pub const MAX_ARRAY_ELEMENTS: usize = 65_536;
pub const MAX_STRING_POOL_ENTRIES: usize = 128;
pub const MAX_STRING_LEN: usize = 256;
/// Total `event` handler blocks across the whole program (spec §6: "64
/// stored events" — each compiled handler is one the runtime must store).
pub const MAX_STORED_EVENTS: usize = 64;
pub const REACTION_TIME: usize = 52;

/// The mandatory entry state (spec §4.3: "one state name, case-insensitively
/// `statespawn`, is mandatory").
pub const SPAWN_STATE_NAME: &str = "statespawn";
