//! Build-time error taxonomy for the classification engine
//!
//! Query-path code has no error conditions; every variant here can only
//! surface while a configuration generation is being built.

use thiserror::Error;

use crate::attribute::AttributeKind;
use crate::types::RuleIndex;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Rule count or requested capacity exceeds the fixed bound.
    #[error("capacity exceeded: {requested} rules, limit {limit}")]
    CapacityExceeded { requested: usize, limit: usize },

    /// Prefix length does not fit the key width.
    #[error("invalid prefix: length {len} exceeds {width}-bit key")]
    InvalidPrefix { len: u8, width: u8 },

    /// Inclusive range with `from > to`.
    #[error("invalid range: from {from} > to {to}")]
    InvalidRange { from: u32, to: u32 },

    /// VLAN identifier outside the 12-bit domain.
    #[error("vlan id {id} out of range")]
    InvalidVlan { id: u16 },

    /// Rule carries the wrong number of attribute values for the signature.
    #[error("rule {rule}: {found} attribute values for {expected} dimensions")]
    DimensionMismatch {
        rule: RuleIndex,
        expected: usize,
        found: usize,
    },

    /// Rule value does not fit the attribute kind declared at its position.
    #[error("rule {rule}: value does not match declared attribute {kind:?}")]
    AttributeMismatch { kind: AttributeKind, rule: RuleIndex },

    /// The caller-supplied arena cannot cover an allocation.
    #[error("arena exhausted: {requested} bytes requested, {remaining} remaining")]
    ArenaExhausted { requested: usize, remaining: usize },
}
