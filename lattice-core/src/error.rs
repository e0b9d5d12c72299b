use crate::node::Position;

/// Error type for every lattice operation.
///
/// None of these are recoverable for the call that raised them: a failed
/// write leaves the output partially written and a failed read leaves the
/// input partially consumed.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An illegal request to the node layer.
    #[error("structural error: {0}")]
    Structural(String),
    /// A reference names a token that was never registered.
    #[error("invalid reference: token {0} is not registered")]
    UnknownToken(String),
    /// Two elements declare the same identity token.
    #[error("duplicate identity: token {0} is already registered")]
    DuplicateToken(String),
    /// No transform could be resolved for a leaf class.
    #[error("no transform for class {0}")]
    TransformNotFound(String),
    #[error("invalid value {text:?} for class {class}: {reason}")]
    InvalidValue {
        class: String,
        text: String,
        reason: String,
    },
    #[error("field {field} of class {class} requires a value")]
    ValueRequired { class: String, field: String },
    #[error("unknown class {0}")]
    UnknownClass(String),
    #[error("class {actual} is not compatible with {declared}")]
    IncompatibleClass { declared: String, actual: String },
    #[error("unexpected {kind} {name} at {position}")]
    Unexpected {
        kind: &'static str,
        name: String,
        position: Position,
    },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn structural(message: impl Into<String>) -> Self {
        Error::Structural(message.into())
    }

    /// A value that its class cannot read or write.
    pub fn invalid(
        class: impl Into<String>,
        text: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        Error::InvalidValue {
            class: class.into(),
            text: text.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns true for the two graph-protocol failures.
    pub fn is_cycle_error(&self) -> bool {
        matches!(self, Error::UnknownToken(_) | Error::DuplicateToken(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
