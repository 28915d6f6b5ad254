/*!
 * Error types for rtremote
 */

use rtremote_connect::ConnectError;
use rtremote_core_interface::InvocationError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RtRemoteError>;

#[derive(Error, Debug)]
pub enum RtRemoteError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Invocation(#[from] InvocationError),
}
