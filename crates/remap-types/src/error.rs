//! Errors raised by the type model.
//!
//! All of these are configuration errors: they surface while types are being
//! declared or resolved, never while a value is being mapped.

use crate::types::{RawTypeId, TypeId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeError {
    #[error("unknown raw type id {0:?}")]
    UnknownRawType(RawTypeId),

    #[error("unknown type id {0:?}")]
    UnknownType(TypeId),

    #[error("raw type `{name}` is already declared")]
    DuplicateRawType { name: String },

    #[error("`{name}` declares {expected} type parameter(s) but {actual} argument(s) were supplied")]
    ArityMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("type variable `{var}` is not declared on `{owner}`")]
    UnknownTypeVariable { owner: String, var: String },

    #[error(
        "type variable `{var}` of `{owner}` has incomparable candidate bindings `{first}` and `{second}`"
    )]
    IncomparableBindings {
        owner: String,
        var: String,
        first: String,
        second: String,
    },

    #[error("type resolution exceeded the maximum depth while resolving `{0}`")]
    DepthExceeded(String),
}
