//! # Terminal Type Option, Client Side (RFC 1091)
//!
//! After the server has been told `WILL TERMINAL-TYPE`, it asks for the
//! terminal name with
//!
//! ```text
//! IAC SB TERMINAL-TYPE SEND IAC SE
//! ```
//!
//! and the client answers
//!
//! ```text
//! IAC SB TERMINAL-TYPE IS <name> IAC SE
//! ```
//!
//! Each further `SEND` moves to the next name in the client's list. Once the
//! list is exhausted the last name is repeated, which tells the server it
//! has seen every type the client offers.

use tracing::debug;

use super::{OptionError, SubnegotiationHandler, SubnegotiationVerb};
use crate::protocol::OptionIdentity;

#[derive(Debug, Clone)]
pub struct TerminalTypeHandler {
    names: Vec<String>,
    next: usize,
}

impl Default for TerminalTypeHandler {
    fn default() -> Self {
        Self::new(vec!["XTERM-256COLOR".to_string(), "ANSI".to_string()])
    }
}

impl TerminalTypeHandler {
    /// Handler offering `names` in order; an empty list offers "UNKNOWN"
    pub fn new(names: Vec<String>) -> Self {
        let names = if names.is_empty() {
            vec!["UNKNOWN".to_string()]
        } else {
            names
        };
        Self { names, next: 0 }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Name the next `SEND` will be answered with
    pub fn current(&self) -> &str {
        let index = self.next.min(self.names.len() - 1);
        &self.names[index]
    }

    fn answer(&mut self) -> Vec<u8> {
        let name = self.current().to_ascii_uppercase();
        if self.next < self.names.len() {
            self.next += 1;
        }

        let mut payload = Vec::with_capacity(name.len() + 1);
        payload.push(SubnegotiationVerb::Is as u8);
        payload.extend_from_slice(name.as_bytes());
        payload
    }
}

impl SubnegotiationHandler for TerminalTypeHandler {
    fn option(&self) -> OptionIdentity {
        OptionIdentity::TERMINAL_TYPE
    }

    fn handle_subnegotiation(&mut self, payload: &[u8]) -> Result<Option<Vec<u8>>, OptionError> {
        let Some(&verb) = payload.first() else {
            return Err(OptionError::InvalidData(
                "empty terminal type subnegotiation".to_string(),
            ));
        };

        match SubnegotiationVerb::from_byte(verb) {
            Some(SubnegotiationVerb::Send) => {
                debug!(terminal = self.current(), "answering terminal type request");
                Ok(Some(self.answer()))
            }
            // A server has no business telling us our own terminal type
            Some(SubnegotiationVerb::Is) => Err(OptionError::UnsupportedCommand(verb)),
            None => Err(OptionError::UnsupportedCommand(verb)),
        }
    }

    fn reset(&mut self) {
        self.next = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler() -> TerminalTypeHandler {
        TerminalTypeHandler::new(vec!["xterm".to_string(), "vt100".to_string()])
    }

    #[test]
    fn test_send_is_answered_with_is() {
        let mut handler = handler();
        let response = handler.handle_subnegotiation(&[1]).unwrap();
        assert_eq!(response, Some(b"\x00XTERM".to_vec()));
    }

    #[test]
    fn test_cycles_then_repeats_last_name() {
        let mut handler = handler();
        let answers: Vec<Vec<u8>> = (0..4)
            .map(|_| handler.handle_subnegotiation(&[1]).unwrap().unwrap())
            .collect();
        assert_eq!(answers[0], b"\x00XTERM");
        assert_eq!(answers[1], b"\x00VT100");
        assert_eq!(answers[2], b"\x00VT100");
        assert_eq!(answers[3], b"\x00VT100");

        handler.reset();
        assert_eq!(handler.current(), "xterm");
    }

    #[test]
    fn test_rejects_malformed_payloads() {
        let mut handler = handler();
        assert!(matches!(
            handler.handle_subnegotiation(&[]),
            Err(OptionError::InvalidData(_))
        ));
        assert_eq!(
            handler.handle_subnegotiation(&[0, b'X']),
            Err(OptionError::UnsupportedCommand(0))
        );
        assert_eq!(
            handler.handle_subnegotiation(&[9]),
            Err(OptionError::UnsupportedCommand(9))
        );
    }

    #[test]
    fn test_empty_name_list_falls_back() {
        let handler = TerminalTypeHandler::new(Vec::new());
        assert_eq!(handler.names(), &["UNKNOWN".to_string()]);
        assert_eq!(handler.option(), OptionIdentity::TERMINAL_TYPE);
    }
}
