use std::fmt;

use thiserror::Error;

use crate::transport::TransportError;

pub type Result<T, E = JdiError> = std::result::Result<T, E>;

/// JDWP `Error` constants (subset used for classification).
pub mod error_code {
    pub const NONE: u16 = 0;
    pub const INVALID_THREAD: u16 = 10;
    pub const INVALID_THREAD_GROUP: u16 = 11;
    pub const THREAD_NOT_SUSPENDED: u16 = 13;
    pub const INVALID_OBJECT: u16 = 20;
    pub const INVALID_CLASS: u16 = 21;
    pub const CLASS_NOT_PREPARED: u16 = 22;
    pub const INVALID_METHODID: u16 = 23;
    pub const INVALID_LOCATION: u16 = 24;
    pub const INVALID_FIELDID: u16 = 25;
    pub const INVALID_FRAMEID: u16 = 30;
    pub const TYPE_MISMATCH: u16 = 34;
    pub const INVALID_SLOT: u16 = 35;
    pub const ADD_METHOD_NOT_IMPLEMENTED: u16 = 63;
    pub const METHOD_MODIFIERS_CHANGE_NOT_IMPLEMENTED: u16 = 71;
    pub const NOT_IMPLEMENTED: u16 = 99;
    pub const NULL_POINTER: u16 = 100;
    pub const ABSENT_INFORMATION: u16 = 101;
    pub const ILLEGAL_ARGUMENT: u16 = 103;
    pub const VM_DEAD: u16 = 112;
    pub const INTERNAL: u16 = 113;
    pub const INVALID_TAG: u16 = 500;
    pub const INVALID_INDEX: u16 = 503;
    pub const INVALID_LENGTH: u16 = 504;
    pub const INVALID_STRING: u16 = 506;
    pub const INVALID_CLASS_LOADER: u16 = 507;
    pub const INVALID_ARRAY: u16 = 508;
    pub const INVALID_COUNT: u16 = 512;
}

/// Semantic grouping of nonzero reply error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    /// The id no longer names a live entity (collected, unloaded, wrong kind).
    InvalidObject,
    NotImplemented,
    AbsentInformation,
    IllegalArgument,
    VmDead,
    Internal,
}

impl RemoteErrorKind {
    /// Classifies a JDWP error code.
    ///
    /// `CLASS_NOT_PREPARED` is not a remote error kind; see
    /// [`JdiError::from_reply_code`].
    pub fn from_code(code: u16) -> Self {
        use error_code::*;
        match code {
            INVALID_THREAD | INVALID_THREAD_GROUP | INVALID_OBJECT | INVALID_CLASS
            | INVALID_METHODID | INVALID_FIELDID | INVALID_FRAMEID | INVALID_CLASS_LOADER
            | INVALID_ARRAY | INVALID_STRING => RemoteErrorKind::InvalidObject,
            ADD_METHOD_NOT_IMPLEMENTED..=METHOD_MODIFIERS_CHANGE_NOT_IMPLEMENTED
            | NOT_IMPLEMENTED => RemoteErrorKind::NotImplemented,
            ABSENT_INFORMATION => RemoteErrorKind::AbsentInformation,
            INVALID_LOCATION | TYPE_MISMATCH | INVALID_SLOT | NULL_POINTER | ILLEGAL_ARGUMENT
            | INVALID_TAG | INVALID_INDEX | INVALID_LENGTH | INVALID_COUNT => {
                RemoteErrorKind::IllegalArgument
            }
            VM_DEAD => RemoteErrorKind::VmDead,
            _ => RemoteErrorKind::Internal,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RemoteErrorKind::InvalidObject => "invalid object",
            RemoteErrorKind::NotImplemented => "not implemented",
            RemoteErrorKind::AbsentInformation => "absent information",
            RemoteErrorKind::IllegalArgument => "illegal argument",
            RemoteErrorKind::VmDead => "vm dead",
            RemoteErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum JdiError {
    #[error("JDWP protocol error: {0}")]
    Protocol(String),
    #[error("JDWP protocol error: unknown {context} tag {tag:#04x}")]
    UnknownTag { tag: u8, context: &'static str },
    #[error("JDWP command failed ({kind}) with error code {code}")]
    Remote { kind: RemoteErrorKind, code: u16 },
    #[error("reference type is not yet prepared (error code {code})")]
    ClassNotPrepared { code: u16 },
    #[error("internal error: JDWP transport failed: {0}")]
    TransportFailure(String),
    #[error("target VM is disconnected")]
    VmDisconnected,
}

impl JdiError {
    /// Maps a nonzero reply error code to the error taxonomy.
    pub fn from_reply_code(code: u16) -> Self {
        if code == error_code::CLASS_NOT_PREPARED {
            JdiError::ClassNotPrepared { code }
        } else {
            JdiError::Remote {
                kind: RemoteErrorKind::from_code(code),
                code,
            }
        }
    }

    /// The JDWP error code carried by remote failures.
    pub fn error_code(&self) -> Option<u16> {
        match self {
            JdiError::Remote { code, .. } | JdiError::ClassNotPrepared { code } => Some(*code),
            _ => None,
        }
    }

    pub fn is_class_not_prepared(&self) -> bool {
        matches!(self, JdiError::ClassNotPrepared { .. })
    }

    pub fn remote_kind(&self) -> Option<RemoteErrorKind> {
        match self {
            JdiError::Remote { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl From<TransportError> for JdiError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Disconnected => JdiError::VmDisconnected,
            other => JdiError::TransportFailure(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_not_prepared_is_distinct_from_remote_errors() {
        let err = JdiError::from_reply_code(error_code::CLASS_NOT_PREPARED);
        assert!(err.is_class_not_prepared());
        assert_eq!(err.remote_kind(), None);
        assert_eq!(err.error_code(), Some(22));
    }

    #[test]
    fn maps_error_codes_to_kinds() {
        let cases = [
            (error_code::INVALID_OBJECT, RemoteErrorKind::InvalidObject),
            (error_code::INVALID_CLASS_LOADER, RemoteErrorKind::InvalidObject),
            (error_code::NOT_IMPLEMENTED, RemoteErrorKind::NotImplemented),
            (64, RemoteErrorKind::NotImplemented),
            (error_code::ABSENT_INFORMATION, RemoteErrorKind::AbsentInformation),
            (error_code::INVALID_INDEX, RemoteErrorKind::IllegalArgument),
            (error_code::VM_DEAD, RemoteErrorKind::VmDead),
            (error_code::INTERNAL, RemoteErrorKind::Internal),
            (4242, RemoteErrorKind::Internal),
        ];
        for (code, kind) in cases {
            let err = JdiError::from_reply_code(code);
            assert_eq!(err.remote_kind(), Some(kind), "code {code}");
            assert_eq!(err.error_code(), Some(code));
        }
    }

    #[test]
    fn transport_failures_become_internal_errors() {
        let err: JdiError = TransportError::ConnectionClosed.into();
        assert!(matches!(err, JdiError::TransportFailure(_)));
        assert!(err.to_string().starts_with("internal error"));

        let err: JdiError = TransportError::Disconnected.into();
        assert!(matches!(err, JdiError::VmDisconnected));
    }
}
