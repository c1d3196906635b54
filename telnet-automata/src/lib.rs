//! # Telnet Automata
//!
//! Telnet protocol handling for MUD clients, built as a pair of table
//! driven state machines:
//! - RFC 854: Telnet Protocol Specification (https://tools.ietf.org/html/rfc854)
//! - RFC 855: Telnet Option Specifications
//! - RFC 1143: The Q Method of Implementing TELNET Option Negotiation
//! - RFC 1091: Telnet Terminal-Type Option
//!
//! ## Architecture Overview
//!
//! - `automaton`: generic engine stepping any [`TransitionTable`]
//! - `classifier`: octet classifier separating data, commands and
//!   subnegotiations
//! - `negotiation`: Q method automaton, one per option per side
//! - `registry`: which options are negotiated and how offers are answered
//! - `buffer`: growable receive buffer
//! - `session`: per-connection orchestrator gluing the above together
//! - `options`: subnegotiation payload handlers
//!
//! The crate performs no I/O. Feed it bytes from the transport, write the
//! replies it returns back to the peer.

pub mod automaton;
pub mod buffer;
pub mod classifier;
pub mod negotiation;
pub mod options;
pub mod protocol;
pub mod registry;
pub mod session;

pub use automaton::{Automaton, Step, TransitionTable};
pub use buffer::{BufferError, ReceiveBuffer};
pub use classifier::{ClassifierEvent, ClassifierState, StreamClassifier};
pub use negotiation::{
    Decision, NegotiationPair, NegotiationReply, NegotiationSymbol, OptionAutomaton, OptionState,
};
pub use options::{OptionError, SubnegotiationHandler, TerminalTypeHandler};
pub use protocol::{IAC, OptionIdentity, Side, TelnetCommand};
pub use registry::{OptionEntry, OptionPolicy, OptionRegistry, RegistryError};
pub use session::{ProtocolSession, SessionError, SessionOutput, Subnegotiation};

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Supported Telnet RFCs
pub const SUPPORTED_RFCS: &[&str] = &[
    "RFC 854 - Telnet Protocol Specification",
    "RFC 855 - Telnet Option Specifications",
    "RFC 1091 - Telnet Terminal-Type Option",
    "RFC 1143 - The Q Method of Implementing TELNET Option Negotiation",
];
