//! The bytecode header enum (spec §6).
//!
//! Each variant is a 4-byte little-endian tag written at the start of a
//! logical unit of emitted code; `botc-buf` writes `Opcode as u32`,
//! `botc-obj` reads nothing back (the compiler never re-parses its own
//! output) but tests do, via [`Opcode::from_u32`].
//!
//! The discriminants are a dense `0..N` enumeration in the order spec §6
//! lists them: structural headers, control flow, the operator table from
//! §4.5 in priority order, the push family, the assign/increment family
//! (grouped global-scalar / local-scalar / global-array), then the
//! remaining misc headers.

macro_rules! dense_opcode_enum {
    ($($variant:ident),+ $(,)?) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        #[repr(u32)]
        pub enum Opcode {
            $($variant),+
        }

        impl Opcode {
            pub const COUNT: u32 = 0 $(+ { let _ = Self::$variant; 1 })+;

            #[inline]
            pub fn to_u32(self) -> u32 {
                self as u32
            }

            /// Used only by tests and `--verbose` dumps, which want to
            /// render an opcode back from raw bytes without re-running the
            /// parser.
            pub fn from_u32(v: u32) -> Option<Self> {
                let mut i = 0u32;
                $(
                    if v == i { return Some(Self::$variant); }
                    i += 1;
                )+
                let _ = i;
                None
            }
        }
    };
}

dense_opcode_enum! {
    Command,
    StateIndex,
    StateName,
    OnEnter,
    MainLoop,
    OnExit,
    Event,
    EndOnEnter,
    EndMainLoop,
    EndOnExit,
    EndEvent,

    IfGoto,
    IfNotGoto,
    Goto,

    // Unary (spec §4.5 priority 0)
    NegateLogical,
    UnaryMinus,
    // Priority 10
    Multiply,
    Divide,
    Modulus,
    // Priority 20
    Add,
    Subtract,
    // Priority 30
    LeftShift,
    RightShift,
    // Priority 40
    LessThan,
    GreaterThan,
    AtLeast,
    AtMost,
    // Priority 50
    Equals,
    NotEquals,
    // Priority 60
    AndBitwise,
    // Priority 70
    EorBitwise,
    // Priority 80
    OrBitwise,
    // Priority 90
    AndLogical,
    // Priority 100
    OrLogical,

    PushNumber,
    PushStringIndex,
    PushGlobalVar,
    PushLocalVar,
    PushGlobalArray,

    AssignGlobalVar,
    AddAssignGlobalVar,
    SubAssignGlobalVar,
    MulAssignGlobalVar,
    DivAssignGlobalVar,
    ModAssignGlobalVar,
    IncGlobalVar,
    DecGlobalVar,

    AssignLocalVar,
    AddAssignLocalVar,
    SubAssignLocalVar,
    MulAssignLocalVar,
    DivAssignLocalVar,
    ModAssignLocalVar,
    IncLocalVar,
    DecLocalVar,

    AssignGlobalArray,
    AddAssignGlobalArray,
    SubAssignGlobalArray,
    MulAssignGlobalArray,
    DivAssignGlobalArray,
    ModAssignGlobalArray,
    IncGlobalArray,
    DecGlobalArray,

    CaseGoto,
    Drop,
    StringList,
    ScriptVarList,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_u32() {
        for i in 0..Opcode::COUNT {
            let op = Opcode::from_u32(i).expect("dense range");
            assert_eq!(op.to_u32(), i);
        }
        assert!(Opcode::from_u32(Opcode::COUNT).is_none());
    }

    #[test]
    fn built_in_vs_user_command_ordering_is_stable() {
        assert_eq!(Opcode::Command.to_u32(), 0);
    }
}
