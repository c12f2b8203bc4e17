//! Mapping errors.
//!
//! Three families:
//! - **Configuration** errors describe a mapping that can never work (unknown
//!   property, non-coercible field pair, ambiguous destination). They are
//!   raised while a class map is registered or a plan is compiled.
//! - **Conversion** errors depend on the value being mapped (overflow, parse
//!   failure, unknown enum constant) and are raised while mapping.
//! - **Custom** errors come from user callbacks and are passed through
//!   unchanged.

use remap_types::TypeError;

#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    // -------------------------------------------------------------------------
    // Configuration
    // -------------------------------------------------------------------------
    #[error(transparent)]
    Type(#[from] TypeError),

    #[error("`{owner}` has no property `{path}`")]
    UnknownProperty { owner: String, path: String },

    #[error("invalid property expression `{expression}`: {reason}")]
    InvalidExpression { expression: String, reason: String },

    #[error("cannot map `{from}` ({from_type}) to `{to}` ({to_type}): {reason}")]
    IncompatibleField {
        from: String,
        from_type: String,
        to: String,
        to_type: String,
        reason: String,
    },

    #[error("no single most specific destination for `{requested}` among [{candidates}]")]
    AmbiguousDestination {
        requested: String,
        candidates: String,
    },

    #[error("cannot instantiate `{0}`")]
    NotInstantiable(String),

    #[error("no converter registered with id `{0}`")]
    UnknownConverter(String),

    #[error("unsupported multi-occurrence mapping `{from}` -> `{to}`: {reason}")]
    UnsupportedMultiOccurrence {
        from: String,
        to: String,
        reason: String,
    },

    #[error("no mapping strategy from `{from}` to `{to}`")]
    NoStrategy { from: String, to: String },

    #[error("property `{0}` is not writable")]
    NotWritable(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Conversion
    // -------------------------------------------------------------------------
    #[error("value {value} does not fit in `{target}`")]
    Overflow { value: String, target: String },

    #[error("cannot parse {value:?} as `{target}`")]
    Parse { value: String, target: String },

    #[error("`{enum_type}` has no constant named `{name}`")]
    UnknownEnumConstant { enum_type: String, name: String },

    #[error("expected a value of `{expected}`, found {found}")]
    ValueMismatch { expected: String, found: String },

    #[error("index {index} is out of bounds for `{property}` of length {len}")]
    IndexOutOfBounds {
        property: String,
        index: usize,
        len: usize,
    },

    #[error("object graph nesting exceeded {0} levels")]
    DepthExceeded(u32),

    // -------------------------------------------------------------------------
    // User code
    // -------------------------------------------------------------------------
    #[error(transparent)]
    Custom(#[from] anyhow::Error),
}

impl MappingError {
    /// Errors that describe a broken mapping rather than a bad value.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Type(_)
                | Self::UnknownProperty { .. }
                | Self::InvalidExpression { .. }
                | Self::IncompatibleField { .. }
                | Self::AmbiguousDestination { .. }
                | Self::NotInstantiable(_)
                | Self::UnknownConverter(_)
                | Self::UnsupportedMultiOccurrence { .. }
                | Self::NoStrategy { .. }
                | Self::NotWritable(_)
                | Self::Config(_)
        )
    }

    /// Errors caused by the value being mapped.
    pub fn is_conversion(&self) -> bool {
        matches!(
            self,
            Self::Overflow { .. }
                | Self::Parse { .. }
                | Self::UnknownEnumConstant { .. }
                | Self::ValueMismatch { .. }
                | Self::IndexOutOfBounds { .. }
        )
    }
}

pub type Result<T, E = MappingError> = std::result::Result<T, E>;
