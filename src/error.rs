use std::collections::TryReserveError;
use std::{fmt, io, num, error, result};

use crate::equivalence::{Equivalence, Preorder};

#[derive(Debug)]
pub enum Error {
    /// Not enough memory to materialize a result.
    Allocation(TryReserveError),
    /// A transition or the initial state refers to a state or label that does not exist.
    InvalidTransitionSystem(String),
    /// The equivalence is known, but cannot be decided by this crate.
    UnsupportedEquivalence(Equivalence),
    /// The preorder is known, but cannot be decided by this crate.
    UnsupportedPreorder(Preorder),
    /// A name that does not denote any known equivalence.
    UnknownEquivalence(String),
    /// A name that does not denote any known preorder.
    UnknownPreorder(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Allocation(source) => write!(f, "could not allocate result: {source}"),
            Error::InvalidTransitionSystem(msg) => write!(f, "invalid transition system: {msg}"),
            Error::UnsupportedEquivalence(eq) => write!(f, "equivalence '{eq}' is not supported"),
            Error::UnsupportedPreorder(pre) => write!(f, "preorder '{pre}' is not supported"),
            Error::UnknownEquivalence(name) => write!(f, "unknown equivalence '{name}'"),
            Error::UnknownPreorder(name) => write!(f, "unknown preorder '{name}'"),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Allocation(source) => Some(source),
            _ => None,
        }
    }
}

impl From<TryReserveError> for Error {
    fn from(err: TryReserveError) -> Error {
        Error::Allocation(err)
    }
}

/// Type alias for `Result<T, simequiv::Error>`
pub type Result<T> = result::Result<T, Error>;


#[derive(Debug)]
pub enum CSVError {
    IOError(io::Error),
    MissingField,
    ParseError(num::ParseIntError),
}

impl fmt::Display for CSVError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CSVError::IOError(source) => source.fmt(f),
            CSVError::ParseError(source) => source.fmt(f),
            CSVError::MissingField => write!(f, "insufficient number of values in line"),
        }
    }
}

impl error::Error for CSVError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            CSVError::IOError(source) => Some(source),
            CSVError::ParseError(source) => Some(source),
            _ => None,
        }
    }
}

impl From<io::Error> for CSVError {
    fn from(e: io::Error) -> Self {
        CSVError::IOError(e)
    }
}

impl From<num::ParseIntError> for CSVError {
    fn from(e: num::ParseIntError) -> Self {
        CSVError::ParseError(e)
    }
}

impl From<CSVError> for io::Error {
    fn from(e: CSVError) -> io::Error {
        match e {
            CSVError::IOError(source) => source,
            CSVError::ParseError(_) | CSVError::MissingField => {
                io::Error::new(io::ErrorKind::InvalidData, e)
            }
        }
    }
}

impl From<Error> for io::Error {
    fn from(e: Error) -> io::Error {
        match e {
            Error::Allocation(_) => io::Error::new(io::ErrorKind::OutOfMemory, e),
            _ => io::Error::new(io::ErrorKind::InvalidInput, e),
        }
    }
}
