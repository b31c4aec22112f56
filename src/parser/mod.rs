//! Document parsers.
//!
//! Both documents are read in two steps: the bytes are materialized into an owned
//! event list ([`events::materialize`]), then a recursive-descent walk over a
//! [`events::Cursor`] builds the model. Each element function consumes its own
//! element through the closing tag and leaves the cursor on the next sibling.
//!
//! A parse either returns a complete model or a [`ParseError`]; there are no partial
//! results.

pub mod events;
pub mod snapshot;
pub mod topology;

pub use events::{materialize, Cursor, Element, XmlEvent};
pub use snapshot::parse_snapshot;
pub use topology::parse_topology;

use crate::fixed_point::NumericError;

/// The two failure families a parse can end in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or misplaced tags and attributes, or malformed XML.
    Structural,
    /// A numeral that does not decode exactly into its field.
    Numeric,
}

/// Error type for document parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The bytes are not well-formed XML.
    #[error("Malformed XML at byte {position}: {message}")]
    Xml {
        /// Byte offset reported by the reader.
        position: usize,
        /// Reader error message.
        message: String,
    },
    /// The document ended early.
    #[error("Document ended while expecting {expected}")]
    UnexpectedEnd {
        /// What the parser was looking for.
        expected: String,
    },
    /// An event other than the expected one.
    #[error("Expected {expected}, found {found}")]
    UnexpectedEvent {
        /// What the parser was looking for.
        expected: String,
        /// The event that was found instead.
        found: String,
    },
    /// A required attribute is absent.
    #[error("<{element}> is missing attribute `{attribute}`")]
    MissingAttribute {
        /// Element tag.
        element: String,
        /// Attribute name.
        attribute: String,
    },
    /// A signal element that is neither `downSignal` nor `upSignal`.
    #[error("Unknown signal element <{0}>")]
    UnknownSignal(String),
    /// A snapshot dish with no preceding station.
    #[error("Dish {0} appears before any station")]
    OrphanDish(String),
    /// A numeric attribute failed to decode.
    #[error("Invalid `{attribute}` on <{element}>: {source}")]
    Numeric {
        /// Element tag.
        element: String,
        /// Attribute name, or `#text` for element content.
        attribute: String,
        /// Decoder failure.
        #[source]
        source: NumericError,
    },
}

impl ParseError {
    /// Which failure family this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Numeric { .. } => ErrorKind::Numeric,
            _ => ErrorKind::Structural,
        }
    }

    /// Whether this is a structural failure.
    pub fn is_structural(&self) -> bool {
        self.kind() == ErrorKind::Structural
    }

    /// Whether this is a numeric failure.
    pub fn is_numeric(&self) -> bool {
        self.kind() == ErrorKind::Numeric
    }

    /// The underlying decoder failure, for numeric errors.
    pub fn numeric_error(&self) -> Option<&NumericError> {
        match self {
            Self::Numeric { source, .. } => Some(source),
            _ => None,
        }
    }
}
