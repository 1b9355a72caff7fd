use std::io::{Error as IOError, ErrorKind};

/// Error kinds shared by every codec on the read side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ReadError {
    #[error("file could not be opened")]
    CantOpen,
    #[error("magic mismatch or structurally impossible header")]
    InvalidType,
    #[error("codec library internal failure")]
    Internal,
    #[error("stream ended in the middle of a structure")]
    UnexpectedEnd,
    #[error("file stored in non-native byte order")]
    InvalidEndianess,
    #[error("format or feature not implemented")]
    UnsupportedFormat,
    #[error("valid input that the provider model cannot express")]
    CantRepresent,
    #[error("zero-extent image")]
    Empty,
}

/// Error kinds shared by every codec on the write side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WriteError {
    #[error("file could not be opened")]
    CantOpen,
    #[error("writing to the output stream failed")]
    CantWrite,
    #[error("image provider failed reading or returned an unexpected size")]
    ReadError,
    #[error("unexpected or unsupported format")]
    UnsupportedFormat,
    #[error("internal failure")]
    Internal,
}

impl From<IOError> for ReadError {
    fn from(err: IOError) -> Self {
        match err.kind() {
            ErrorKind::UnexpectedEof => ReadError::UnexpectedEnd,
            ErrorKind::NotFound | ErrorKind::PermissionDenied => ReadError::CantOpen,
            _ => ReadError::Internal,
        }
    }
}

impl From<IOError> for WriteError {
    fn from(err: IOError) -> Self {
        match err.kind() {
            ErrorKind::NotFound | ErrorKind::PermissionDenied => WriteError::CantOpen,
            _ => WriteError::CantWrite,
        }
    }
}

impl From<ReadError> for WriteError {
    fn from(_: ReadError) -> Self {
        WriteError::ReadError
    }
}
