//! # ProtocolSession - Per-Connection Telnet Engine
//!
//! `ProtocolSession` ties the pieces together for one connection: a
//! [`StreamClassifier`] walking the inbound octets, a [`NegotiationPair`]
//! for every option in the [`OptionRegistry`], optional subnegotiation
//! handlers, and the [`ReceiveBuffer`] holding bytes not yet classified.
//!
//! ## No I/O
//!
//! The session never touches a socket. The transport hands it chunks with
//! [`ProtocolSession::feed`] and writes back whatever ends up in
//! [`SessionOutput::replies`]; the terminal gets [`SessionOutput::data`].
//!
//! ```
//! use telnet_automata::{OptionRegistry, ProtocolSession};
//!
//! let mut session = ProtocolSession::new(OptionRegistry::default());
//!
//! // Server offers to echo, then sends a prompt
//! let output = session.feed(&[255, 251, 1, b'>', b' ']).unwrap();
//! assert_eq!(output.replies, vec![255, 253, 1]); // IAC DO ECHO
//! assert_eq!(output.data, b"> ");
//! ```
//!
//! ## Chunking
//!
//! Commands and subnegotiations may be split across `feed` calls at any
//! byte. All in-flight state lives in the classifier and the option
//! automatons, so splitting a stream anywhere produces the same output as
//! feeding it whole.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::buffer::{BufferError, ReceiveBuffer};
use crate::classifier::{ClassifierEvent, StreamClassifier};
use crate::negotiation::{NegotiationPair, NegotiationSymbol, OptionState};
use crate::options::SubnegotiationHandler;
use crate::protocol::{OptionIdentity, Side, escape_data, negotiation_bytes, subnegotiation_bytes};
use crate::registry::OptionRegistry;

/// The only failure `feed` reports; protocol violations are logged instead
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Buffer(#[from] BufferError),
}

/// A completed `IAC SB ... IAC SE` block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subnegotiation {
    pub option: OptionIdentity,
    /// Payload with doubled IACs already collapsed
    pub payload: Vec<u8>,
}

/// Everything one `feed` call produced, in arrival order per field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionOutput {
    /// Literal data for the terminal
    pub data: Vec<u8>,
    /// Bytes the transport must send back to the peer
    pub replies: Vec<u8>,
    /// One-octet commands (NOP, GA, ...) seen in the stream
    pub commands: Vec<u8>,
    pub subnegotiations: Vec<Subnegotiation>,
}

impl SessionOutput {
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
            && self.replies.is_empty()
            && self.commands.is_empty()
            && self.subnegotiations.is_empty()
    }

    /// Move everything from `other` onto the end of `self`
    pub fn append(&mut self, other: SessionOutput) {
        self.data.extend(other.data);
        self.replies.extend(other.replies);
        self.commands.extend(other.commands);
        self.subnegotiations.extend(other.subnegotiations);
    }
}

pub struct ProtocolSession {
    classifier: StreamClassifier,
    registry: OptionRegistry,
    /// One pair per registry entry, created up front
    pairs: BTreeMap<u8, NegotiationPair>,
    handlers: HashMap<u8, Box<dyn SubnegotiationHandler>>,
    buffer: ReceiveBuffer,
}

impl fmt::Debug for ProtocolSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtocolSession")
            .field("classifier", &self.classifier)
            .field("pairs", &self.pairs)
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .field("buffer", &self.buffer)
            .finish_non_exhaustive()
    }
}

impl ProtocolSession {
    /// Create a session negotiating the options in `registry`
    ///
    /// Every option starts in `No` on both sides.
    pub fn new(registry: OptionRegistry) -> Self {
        let pairs = registry
            .iter()
            .map(|policy| {
                (
                    policy.identity.code,
                    NegotiationPair::new(policy.identity, policy.remote, policy.local),
                )
            })
            .collect();

        Self {
            classifier: StreamClassifier::new(),
            registry,
            pairs,
            handlers: HashMap::new(),
            buffer: ReceiveBuffer::new(),
        }
    }

    /// Cap the bytes a single `feed` call may hand over
    pub fn with_receive_limit(mut self, limit: usize) -> Self {
        self.buffer = ReceiveBuffer::with_limit(limit);
        self
    }

    /// Builder form of [`register_handler`](Self::register_handler)
    pub fn with_handler(mut self, handler: impl SubnegotiationHandler + 'static) -> Self {
        self.register_handler(Box::new(handler));
        self
    }

    /// Route subnegotiations for the handler's option to it, returning any
    /// handler it replaces
    pub fn register_handler(
        &mut self,
        handler: Box<dyn SubnegotiationHandler>,
    ) -> Option<Box<dyn SubnegotiationHandler>> {
        let option = handler.option();
        if !self.registry.contains(option.code) {
            warn!(option = %option, "handler registered for option outside the registry");
        }
        self.handlers.insert(option.code, handler)
    }

    /// Whether a subnegotiation handler is registered for `code`
    pub fn has_handler(&self, code: u8) -> bool {
        self.handlers.contains_key(&code)
    }

    /// Process a chunk of inbound bytes
    ///
    /// Only a buffer failure is an error. On error nothing from `input` has
    /// been classified and the session is unchanged.
    pub fn feed(&mut self, input: &[u8]) -> Result<SessionOutput, SessionError> {
        trace!(bytes = input.len(), "feeding chunk");
        self.buffer.append(input)?;

        let mut output = SessionOutput::default();
        while let Some(octet) = self.buffer.next_octet() {
            if let Some(event) = self.classifier.push(octet) {
                self.dispatch(event, &mut output);
            }
        }

        if self.classifier.is_mid_sequence() {
            trace!(state = ?self.classifier.state(), "chunk ended mid sequence");
        }
        Ok(output)
    }

    fn dispatch(&mut self, event: ClassifierEvent, output: &mut SessionOutput) {
        match event {
            ClassifierEvent::Data(byte) => output.data.push(byte),
            ClassifierEvent::Command(command) => {
                debug!(command, "one-octet command");
                output.commands.push(command);
            }
            ClassifierEvent::Offer {
                side,
                positive,
                code,
            } => self.handle_offer(side, positive, code, output),
            ClassifierEvent::Subnegotiation { code, payload } => {
                self.handle_subnegotiation(code, payload, output)
            }
            ClassifierEvent::Violation(reason) => {
                warn!(state = ?self.classifier.state(), "stream violation: {}", reason);
            }
        }
    }

    fn handle_offer(&mut self, side: Side, positive: bool, code: u8, output: &mut SessionOutput) {
        let Some(pair) = self.pairs.get_mut(&code) else {
            let option = OptionIdentity::from_code(code);
            if positive {
                warn!(option = %option, %side, "refusing unknown option");
                output
                    .replies
                    .extend_from_slice(&negotiation_bytes(side.outbound_command(false), code));
            } else {
                debug!(option = %option, %side, "ignoring negative offer for unknown option");
            }
            return;
        };

        let transition = pair.handle(side, NegotiationSymbol::offer(positive));
        if let Some(reply) = transition.reply {
            output.replies.extend_from_slice(&reply.to_bytes(side, code));
        }
    }

    fn handle_subnegotiation(&mut self, code: u8, payload: Vec<u8>, output: &mut SessionOutput) {
        let option = OptionIdentity::from_code(code);
        debug!(option = %option, bytes = payload.len(), "subnegotiation received");

        if let Some(handler) = self.handlers.get_mut(&code) {
            let negotiated = self
                .pairs
                .get(&code)
                .is_some_and(|pair| pair.remote.is_enabled() || pair.local.is_enabled());

            if !negotiated {
                warn!(option = %option, "subnegotiation for option that is not enabled");
            } else {
                match handler.handle_subnegotiation(&payload) {
                    Ok(Some(response)) => {
                        debug!(option = %option, bytes = response.len(), "subnegotiation reply");
                        output
                            .replies
                            .extend(subnegotiation_bytes(code, &response));
                    }
                    Ok(None) => {}
                    Err(error) => {
                        warn!(option = %option, %error, "subnegotiation handler failed");
                    }
                }
            }
        }

        output.subnegotiations.push(Subnegotiation { option, payload });
    }

    /// Ask for an option to be enabled on `side`
    ///
    /// Returns the bytes to send, empty when the automaton decides nothing
    /// needs to go out (already enabled, or a request already in flight).
    /// Codes outside the registry are never negotiated.
    ///
    /// ```
    /// use telnet_automata::{OptionIdentity, OptionRegistry, ProtocolSession, Side};
    ///
    /// let mut session = ProtocolSession::new(OptionRegistry::default());
    /// let bytes = session.request_enable(Side::Local, OptionIdentity::TERMINAL_TYPE.code);
    /// assert_eq!(bytes, vec![255, 251, 24]); // IAC WILL TERMINAL-TYPE
    /// ```
    pub fn request_enable(&mut self, side: Side, code: u8) -> Vec<u8> {
        self.request(side, code, true)
    }

    /// Ask for an option to be disabled on `side`
    pub fn request_disable(&mut self, side: Side, code: u8) -> Vec<u8> {
        self.request(side, code, false)
    }

    fn request(&mut self, side: Side, code: u8, positive: bool) -> Vec<u8> {
        let Some(pair) = self.pairs.get_mut(&code) else {
            warn!(
                option = %OptionIdentity::from_code(code),
                %side,
                "request for option outside the registry ignored"
            );
            return Vec::new();
        };

        let transition = pair.handle(side, NegotiationSymbol::request(positive));
        transition
            .reply
            .map(|reply| reply.to_bytes(side, code).to_vec())
            .unwrap_or_default()
    }

    /// Current state of one side of an option, `None` outside the registry
    pub fn state(&self, side: Side, code: u8) -> Option<OptionState> {
        self.pairs.get(&code).map(|pair| pair.side(side).state())
    }

    pub fn is_enabled(&self, side: Side, code: u8) -> bool {
        self.state(side, code) == Some(OptionState::Yes)
    }

    pub fn registry(&self) -> &OptionRegistry {
        &self.registry
    }

    /// Negotiation pairs in option code order
    pub fn pairs(&self) -> impl Iterator<Item = &NegotiationPair> {
        self.pairs.values()
    }

    pub fn is_mid_sequence(&self) -> bool {
        self.classifier.is_mid_sequence()
    }

    /// Back to the state of a fresh connection
    pub fn reset(&mut self) {
        debug!("resetting session");
        self.classifier.reset();
        self.buffer.clear();
        for pair in self.pairs.values_mut() {
            pair.reset();
        }
        for handler in self.handlers.values_mut() {
            handler.reset();
        }
    }

    /// Escape outbound literal data (keystrokes) for the transport
    pub fn encode_data(&self, data: &[u8]) -> Vec<u8> {
        escape_data(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::negotiation::Decision;
    use crate::options::TerminalTypeHandler;
    use crate::registry::OptionPolicy;

    const IAC: u8 = 255;
    const WILL: u8 = 251;
    const WONT: u8 = 252;
    const DO: u8 = 253;
    const DONT: u8 = 254;
    const SB: u8 = 250;
    const SE: u8 = 240;

    fn session() -> ProtocolSession {
        ProtocolSession::new(OptionRegistry::default())
    }

    #[test]
    fn test_plain_data_passes_through() {
        let mut session = session();
        let output = session.feed(b"HI").unwrap();
        assert_eq!(output.data, vec![0x48, 0x49]);
        assert!(output.replies.is_empty());
        assert!(output.commands.is_empty());
    }

    #[test]
    fn test_do_binary_is_accepted() {
        let mut session = session();
        let output = session.feed(&[IAC, DO, 0]).unwrap();
        assert_eq!(output.replies, vec![IAC, WILL, 0]);
        assert_eq!(session.state(Side::Local, 0), Some(OptionState::Yes));
        assert_eq!(session.state(Side::Remote, 0), Some(OptionState::No));
    }

    #[test]
    fn test_policy_refusal() {
        let mut session = session();
        // Default registry refuses to echo locally
        let output = session.feed(&[IAC, DO, 1]).unwrap();
        assert_eq!(output.replies, vec![IAC, WONT, 1]);
        assert!(!session.is_enabled(Side::Local, 1));
    }

    #[test]
    fn test_unknown_option_is_refused() {
        let mut session = session();
        let output = session.feed(&[IAC, WILL, 201, IAC, DO, 201]).unwrap();
        assert_eq!(output.replies, vec![IAC, DONT, 201, IAC, WONT, 201]);
        assert_eq!(session.state(Side::Remote, 201), None);

        // Negative offers for unknown options get no answer
        let output = session.feed(&[IAC, WONT, 201, IAC, DONT, 201]).unwrap();
        assert!(output.is_empty());
    }

    #[test]
    fn test_request_then_peer_refuses() {
        let mut session = session();
        let sent = session.request_enable(Side::Remote, 3);
        assert_eq!(sent, vec![IAC, DO, 3]);
        assert_eq!(session.state(Side::Remote, 3), Some(OptionState::WantYes));

        let output = session.feed(&[IAC, WONT, 3]).unwrap();
        assert!(output.replies.is_empty());
        assert_eq!(session.state(Side::Remote, 3), Some(OptionState::No));
    }

    #[test]
    fn test_repeated_request_sends_nothing() {
        let mut session = session();
        assert_eq!(session.request_enable(Side::Local, 24).len(), 3);
        assert!(session.request_enable(Side::Local, 24).is_empty());
        assert!(session.request_disable(Side::Local, 99).is_empty());
    }

    #[test]
    fn test_commands_are_collected() {
        let mut session = session();
        let output = session.feed(&[b'a', IAC, 241, b'b', IAC, 249]).unwrap();
        assert_eq!(output.data, b"ab");
        assert_eq!(output.commands, vec![241, 249]);
    }

    #[test]
    fn test_split_negotiation() {
        let mut session = session();
        assert!(session.feed(&[IAC]).unwrap().is_empty());
        assert!(session.is_mid_sequence());
        assert!(session.feed(&[WILL]).unwrap().is_empty());
        let output = session.feed(&[3]).unwrap();
        assert_eq!(output.replies, vec![IAC, DO, 3]);
    }

    #[test]
    fn test_terminal_type_subnegotiation() {
        let mut session = session().with_handler(TerminalTypeHandler::new(vec!["mudlink".into()]));

        let output = session.feed(&[IAC, DO, 24]).unwrap();
        assert_eq!(output.replies, vec![IAC, WILL, 24]);

        let output = session.feed(&[IAC, SB, 24, 1, IAC, SE]).unwrap();
        let mut expected = vec![IAC, SB, 24, 0];
        expected.extend_from_slice(b"MUDLINK");
        expected.extend_from_slice(&[IAC, SE]);
        assert_eq!(output.replies, expected);
        assert_eq!(
            output.subnegotiations,
            vec![Subnegotiation {
                option: OptionIdentity::TERMINAL_TYPE,
                payload: vec![1]
            }]
        );
    }

    #[test]
    fn test_handler_skipped_until_enabled() {
        let mut session = session();
        assert!(!session.has_handler(24));
        let mut session = session.with_handler(TerminalTypeHandler::default());
        assert!(session.has_handler(24));
        let output = session.feed(&[IAC, SB, 24, 1, IAC, SE]).unwrap();
        assert!(output.replies.is_empty());
        assert_eq!(output.subnegotiations.len(), 1);
    }

    #[test]
    fn test_receive_limit() {
        let mut session = session().with_receive_limit(4);
        assert!(session.feed(b"abcd").is_ok());
        let err = session.feed(b"abcde").unwrap_err();
        assert!(matches!(
            err,
            SessionError::Buffer(BufferError::LimitExceeded { limit: 4, .. })
        ));
        // Session keeps working afterwards
        assert_eq!(session.feed(b"ok").unwrap().data, b"ok");
    }

    #[test]
    fn test_reset_returns_to_initial_state() {
        let registry = OptionRegistry::from_policies([OptionPolicy::new(
            OptionIdentity::GMCP,
            Decision::Accept,
            Decision::Refuse,
        )])
        .unwrap();
        let mut session = ProtocolSession::new(registry);
        session.feed(&[IAC, WILL, 201, IAC, SB, 201]).unwrap();
        assert!(session.is_enabled(Side::Remote, 201));
        assert!(session.is_mid_sequence());

        session.reset();
        assert!(!session.is_enabled(Side::Remote, 201));
        assert!(!session.is_mid_sequence());
        assert_eq!(session.feed(b"x").unwrap().data, b"x");
    }

    #[test]
    fn test_encode_data_escapes_iac() {
        let session = session();
        assert_eq!(session.encode_data(&[1, IAC, 2]), vec![1, IAC, IAC, 2]);
    }

    #[test]
    fn test_output_append() {
        let mut first = SessionOutput {
            data: vec![1],
            ..SessionOutput::default()
        };
        first.append(SessionOutput {
            data: vec![2],
            replies: vec![3],
            ..SessionOutput::default()
        });
        assert_eq!(first.data, vec![1, 2]);
        assert_eq!(first.replies, vec![3]);
    }
}
