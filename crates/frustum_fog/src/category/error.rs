use thiserror::Error;

use super::light::LightKind;

/// Category manager errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CategoryError {
    /// Object declares a different light kind than the manager handles
    #[error("{category}: cannot register a {actual:?} light")]
    KindMismatch {
        /// Manager label
        category: &'static str,
        /// Kind declared by the object
        actual: LightKind,
    },

    /// Object is already a member
    #[error("{0}: object already registered")]
    AlreadyRegistered(&'static str),

    /// Object produced a record for a different light kind
    #[error("{category}: received {actual:?} light parameters")]
    ParameterKindMismatch {
        /// Manager label
        category: &'static str,
        /// Kind of the produced record
        actual: LightKind,
    },
}
