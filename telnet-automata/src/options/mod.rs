//! # Subnegotiation Payload Handlers
//!
//! Once the stream classifier has captured and unescaped an
//! `IAC SB <option> ... IAC SE` payload, the session hands it to the handler
//! registered for that option. A handler may answer with a payload of its
//! own, which the session frames and queues for the transport.
//!
//! ## Implemented Handlers
//!
//! ### Terminal Type (RFC 1091)
//! Answers the server's `SEND` with `IS <name>`, walking through a list of
//! terminal names.

pub mod terminal_type;

pub use terminal_type::TerminalTypeHandler;

use thiserror::Error;

use crate::protocol::OptionIdentity;

/// Handler for one option's subnegotiation payloads
pub trait SubnegotiationHandler: Send {
    /// The option this handler owns
    fn option(&self) -> OptionIdentity;

    /// Process an unescaped payload, optionally returning a payload to send
    /// back (unframed and unescaped)
    fn handle_subnegotiation(&mut self, payload: &[u8]) -> Result<Option<Vec<u8>>, OptionError>;

    /// Return to the state of a fresh connection
    fn reset(&mut self);
}

/// Common subnegotiation verbs shared by several options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SubnegotiationVerb {
    /// Provide current value (0)
    Is = 0,
    /// Request current value (1)
    Send = 1,
}

impl SubnegotiationVerb {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(SubnegotiationVerb::Is),
            1 => Some(SubnegotiationVerb::Send),
            _ => None,
        }
    }
}

/// Errors raised while processing a payload; never fatal to the session
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionError {
    #[error("Invalid option data: {0}")]
    InvalidData(String),

    #[error("Unsupported command: {0}")]
    UnsupportedCommand(u8),
}
