// Copyright (c) 2019-present Dmitry Stepanov and Fyrox Engine contributors.
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! Errors reported by the bridge and by the native engine behind it.

use std::fmt::{Display, Formatter};

/// Failure reported by the native engine itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeError {
    /// The engine does not know an object at the given address. Usually means the object
    /// was already released by the engine, or the address belongs to another engine instance.
    InvalidPointer {
        /// Type name of the object, for instance `"RigidActor"`.
        type_name: &'static str,
        /// Raw address value.
        address: u64,
    },
    /// The object exists, but does not support the requested query or command.
    Unsupported(&'static str),
}

impl std::error::Error for NativeError {}

impl Display for NativeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            NativeError::InvalidPointer { type_name, address } => {
                write!(f, "native {type_name} at {address:#x} does not exist")
            }
            NativeError::Unsupported(what) => write!(f, "unsupported native operation: {what}"),
        }
    }
}

/// Errors of the bridge layer. Argument and state checks fail with these before any native call
/// is issued, so the engine is never reached in an invalid configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeError {
    /// A required argument was not supplied.
    NullArgument(&'static str),
    /// The operation is not valid for the current state of the object, typically because the
    /// underlying native object was already released.
    InvalidOperation(String),
    /// An index was outside of `0..len`.
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of elements.
        len: usize,
    },
    /// The native engine returned no object. Never retried.
    NativeAllocationFailure(&'static str),
    /// An argument was supplied but its value is unusable (non-finite extents, malformed mesh
    /// data and so on).
    InvalidArgument(String),
    /// The native engine reported a failure.
    Native(NativeError),
}

impl BridgeError {
    pub(crate) fn released(type_name: &str) -> Self {
        Self::InvalidOperation(format!("{type_name} was already released"))
    }

    pub(crate) fn check_index(index: usize, len: usize) -> Result<(), Self> {
        if index < len {
            Ok(())
        } else {
            Err(Self::IndexOutOfRange { index, len })
        }
    }
}

impl std::error::Error for BridgeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BridgeError::Native(e) => Some(e),
            _ => None,
        }
    }
}

impl Display for BridgeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            BridgeError::NullArgument(name) => write!(f, "argument `{name}` is missing"),
            BridgeError::InvalidOperation(reason) => write!(f, "invalid operation: {reason}"),
            BridgeError::IndexOutOfRange { index, len } => {
                write!(f, "index {index} is out of range 0..{len}")
            }
            BridgeError::NativeAllocationFailure(what) => {
                write!(f, "native engine failed to allocate {what}")
            }
            BridgeError::InvalidArgument(reason) => write!(f, "invalid argument: {reason}"),
            BridgeError::Native(e) => write!(f, "native engine error: {e}"),
        }
    }
}

impl From<NativeError> for BridgeError {
    fn from(e: NativeError) -> Self {
        BridgeError::Native(e)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::error::Error;

    #[test]
    fn check_index_bounds() {
        assert!(BridgeError::check_index(0, 1).is_ok());
        assert_eq!(
            BridgeError::check_index(1, 1),
            Err(BridgeError::IndexOutOfRange { index: 1, len: 1 })
        );
    }

    #[test]
    fn native_error_is_source() {
        let error = BridgeError::from(NativeError::Unsupported("velocity"));
        assert!(error.source().is_some());
        assert_eq!(
            error.to_string(),
            "native engine error: unsupported native operation: velocity"
        );
    }
}
