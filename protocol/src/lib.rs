// protocol holds the wire messages exchanged with game clients and a
// reference race session that drives the core physics at a fixed rate.

pub mod error;
pub mod models;
pub mod session;

pub use error::{ProtocolError, Result};
pub use models::{ClientMessage, PlayerId, PlayerState, ServerMessage, WireMessage};
pub use session::{RaceSession, SessionCommand, SessionConfig};
