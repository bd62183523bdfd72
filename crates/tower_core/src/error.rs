use shared::domain::{Bell, TowerId, UserId};
use thiserror::Error;

use crate::transport::TransportError;

/// Everything that can go wrong in a tower session.
///
/// Resolution and compatibility errors are fatal at startup; connection
/// errors may be retried once connectivity is restored; outbound validation
/// errors are raised before anything touches the network. Protocol
/// anomalies never surface here, they are logged and absorbed.
#[derive(Debug, Error)]
pub enum TowerError {
    #[error("tower {} not found at '{url}'", .tower_id.0)]
    TowerNotFound { tower_id: TowerId, url: String },
    #[error("unable to make a connection to '{url}'")]
    Unreachable { url: String },
    #[error("remote version {remote} won't work with expected version {expected}")]
    IncompatibleVersion { remote: String, expected: String },
    #[error("session is not connected")]
    NotConnected,
    #[error("session is already connected")]
    AlreadyConnected,
    #[error("session has been closed")]
    SessionClosed,
    #[error("no bell state received from the tower before the timeout")]
    ReadyTimeout,
    #[error("bell {} exceeds the tower size of {size}", .bell.number())]
    BellOutOfRange { bell: Bell, size: usize },
    #[error("user #{} is not in the tower", .user.0)]
    UnknownUser { user: UserId },
    #[error(transparent)]
    Transport(#[from] TransportError),
}
