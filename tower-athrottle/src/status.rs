use std::fmt;

/// Canonical RPC status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Code {
    Ok,
    Cancelled,
    Unknown,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    ResourceExhausted,
    FailedPrecondition,
    Aborted,
    OutOfRange,
    Unimplemented,
    Internal,
    Unavailable,
    DataLoss,
    Unauthenticated,
}

/// Codes indicating that the server itself shed or failed the load.
///
/// A call failing with one of these is not counted as accepted.
pub const OVERLOAD_CODES: [Code; 5] = [
    Code::Aborted,
    Code::FailedPrecondition,
    Code::Unavailable,
    Code::DeadlineExceeded,
    Code::ResourceExhausted,
];

impl Code {
    pub fn is_overload(&self) -> bool {
        OVERLOAD_CODES.contains(self)
    }

    /// Maps a numeric wire code. Out of range values map to [`Code::Unknown`].
    pub fn from_i32(value: i32) -> Self {
        match value {
            0 => Self::Ok,
            1 => Self::Cancelled,
            2 => Self::Unknown,
            3 => Self::InvalidArgument,
            4 => Self::DeadlineExceeded,
            5 => Self::NotFound,
            6 => Self::AlreadyExists,
            7 => Self::PermissionDenied,
            8 => Self::ResourceExhausted,
            9 => Self::FailedPrecondition,
            10 => Self::Aborted,
            11 => Self::OutOfRange,
            12 => Self::Unimplemented,
            13 => Self::Internal,
            14 => Self::Unavailable,
            15 => Self::DataLoss,
            16 => Self::Unauthenticated,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// An RPC failure carrying a status [`Code`].
///
/// Inner services report failures as a `Status` inside a [`tower::BoxError`] so that
/// the default classifier can tell overload from ordinary application errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct Status {
    code: Code,
    message: String,
}

impl Status {
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code(&self) -> Code {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_load_related_codes_are_overload() {
        let overload: Vec<Code> = (0..17)
            .map(Code::from_i32)
            .filter(Code::is_overload)
            .collect();
        assert_eq!(
            overload,
            vec![
                Code::DeadlineExceeded,
                Code::ResourceExhausted,
                Code::FailedPrecondition,
                Code::Aborted,
                Code::Unavailable,
            ]
        );
    }

    #[test]
    fn unmapped_wire_codes_are_unknown() {
        assert_eq!(Code::from_i32(17), Code::Unknown);
        assert_eq!(Code::from_i32(-1), Code::Unknown);
    }

    #[test]
    fn status_displays_code_and_message() {
        let status = Status::new(Code::Unavailable, "backend down");
        assert_eq!(status.to_string(), "Unavailable: backend down");
    }
}
