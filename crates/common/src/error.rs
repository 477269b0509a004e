//! Common error types for questline.

use thiserror::Error;

/// Common result type for questline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for questline.
#[derive(Error, Debug)]
pub enum Error {
    /// XDR encoding/decoding error.
    #[error("XDR error: {0}")]
    Xdr(#[from] stellar_xdr::curr::Error),

    /// An amount string could not be parsed into stroops.
    #[error("invalid amount '{0}'")]
    InvalidAmount(String),

    /// A price was zero, negative or not representable as an `i32` fraction.
    #[error("invalid price: {0}")]
    InvalidPrice(String),

    /// Asset code is empty, too long, or not alphanumeric.
    #[error("invalid asset code '{0}'")]
    InvalidAssetCode(String),

    /// Invalid data.
    #[error("Invalid data: {0}")]
    InvalidData(String),
}
