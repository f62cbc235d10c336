//! Crate-level error types.  Trade lifecycle failures are NOT represented
//! here: they are `TradeErrorCode` values carried on the trade result and
//! delivered through callbacks.  This module covers the session store, the
//! crypto layer and I/O.
use std::num::{ParseFloatError, ParseIntError};
use std::{error, fmt, io};

use openssl::error::ErrorStack;

#[derive(Debug)]
pub enum OptionBridgeError {
    Io(io::Error),
    ParseFloat(ParseFloatError),
    ParseInt(ParseIntError),
    /// Underlying key-value store failure
    Persistence(sled::Error),
    /// OpenSSL failure outside of decryption (key schedule, RNG)
    Crypto(ErrorStack),
    /// Installed key does not match the key length of the configured AES mode
    KeyLengthMismatch { expected: usize, actual: usize },
    /// Ciphertext failed to decrypt (truncated, corrupted, or wrong key)
    DecryptError(String),
    /// Requested record does not exist
    NotFound(String),
}

impl fmt::Display for OptionBridgeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            // The wrapped errors already impl `Display`, so we defer to
            // their implementations.
            OptionBridgeError::Io(ref err) => write!(f, "IO error: {}", err),
            OptionBridgeError::ParseFloat(ref err) => write!(f, "Parse error: {}", err),
            OptionBridgeError::ParseInt(ref err) => write!(f, "Parse error: {}", err),
            OptionBridgeError::Persistence(ref err) => write!(f, "Persistence error: {}", err),
            OptionBridgeError::Crypto(ref err) => write!(f, "Crypto error: {}", err),
            OptionBridgeError::KeyLengthMismatch { expected, actual } => write!(
                f,
                "Key length mismatch: expected {} bytes, got {}",
                expected, actual
            ),
            OptionBridgeError::DecryptError(ref desc) => write!(f, "Decrypt error: {}", desc),
            OptionBridgeError::NotFound(ref key) => write!(f, "Record not found: {}", key),
        }
    }
}

impl error::Error for OptionBridgeError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            OptionBridgeError::Io(ref err) => Some(err),
            OptionBridgeError::ParseFloat(ref err) => Some(err),
            OptionBridgeError::ParseInt(ref err) => Some(err),
            OptionBridgeError::Persistence(ref err) => Some(err),
            OptionBridgeError::Crypto(ref err) => Some(err),
            OptionBridgeError::KeyLengthMismatch { .. } => None,
            OptionBridgeError::DecryptError(_) => None,
            OptionBridgeError::NotFound(_) => None,
        }
    }
}

impl From<io::Error> for OptionBridgeError {
    fn from(err: io::Error) -> OptionBridgeError {
        OptionBridgeError::Io(err)
    }
}

impl From<ParseIntError> for OptionBridgeError {
    fn from(err: ParseIntError) -> OptionBridgeError {
        OptionBridgeError::ParseInt(err)
    }
}

impl From<ParseFloatError> for OptionBridgeError {
    fn from(err: ParseFloatError) -> OptionBridgeError {
        OptionBridgeError::ParseFloat(err)
    }
}

impl From<sled::Error> for OptionBridgeError {
    fn from(err: sled::Error) -> OptionBridgeError {
        OptionBridgeError::Persistence(err)
    }
}

impl From<ErrorStack> for OptionBridgeError {
    fn from(err: ErrorStack) -> OptionBridgeError {
        OptionBridgeError::Crypto(err)
    }
}
