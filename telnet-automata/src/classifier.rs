//! # Telnet Stream Classifier
//!
//! Walks the raw octet stream one byte at a time and decides whether each
//! byte is literal data, part of a command, part of an option offer, or part
//! of a subnegotiation payload.
//!
//! ## States (RFC 854 / RFC 855)
//! - **Data**: literal bytes, `IAC` starts a command
//! - **InterpretingCommand**: the octet after `IAC`
//! - **OfferPositive / OfferNegative**: after WILL/DO or WONT/DONT, waiting
//!   for the option code
//! - **SubnegotiationBegin**: capturing `IAC SB` payload bytes
//! - **SubnegotiationEnd**: saw `IAC` inside a payload; `SE` closes the
//!   payload, a second `IAC` is an escaped literal 255
//!
//! There is no reject state. Whatever the peer sends, the classifier falls
//! back to `Data` and keeps going.

use tracing::trace;

use crate::automaton::{Automaton, TransitionTable};
use crate::protocol::{IAC, Side, TelnetCommand};

const SE: u8 = TelnetCommand::SE as u8;
const SB: u8 = TelnetCommand::SB as u8;
const WILL: u8 = TelnetCommand::WILL as u8;
const WONT: u8 = TelnetCommand::WONT as u8;
const DO: u8 = TelnetCommand::DO as u8;
const DONT: u8 = TelnetCommand::DONT as u8;

/// Classifier state
///
/// The offer states remember which side the pending offer concerns, so the
/// session can route the option code to the right automaton.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassifierState {
    Data,
    InterpretingCommand,
    OfferPositive(Side),
    OfferNegative(Side),
    SubnegotiationBegin,
    SubnegotiationEnd,
}

impl ClassifierState {
    pub const ALL: [ClassifierState; 8] = [
        ClassifierState::Data,
        ClassifierState::InterpretingCommand,
        ClassifierState::OfferPositive(Side::Remote),
        ClassifierState::OfferPositive(Side::Local),
        ClassifierState::OfferNegative(Side::Remote),
        ClassifierState::OfferNegative(Side::Local),
        ClassifierState::SubnegotiationBegin,
        ClassifierState::SubnegotiationEnd,
    ];
}

/// Pure octet transition table for the classifier
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassifierTable;

impl TransitionTable for ClassifierTable {
    type State = ClassifierState;
    type Symbol = u8;

    fn transition(&self, state: ClassifierState, octet: u8) -> Option<ClassifierState> {
        use ClassifierState::*;

        let next = match state {
            Data => match octet {
                IAC => InterpretingCommand,
                _ => Data,
            },
            InterpretingCommand => match octet {
                WILL => OfferPositive(Side::Remote),
                WONT => OfferNegative(Side::Remote),
                DO => OfferPositive(Side::Local),
                DONT => OfferNegative(Side::Local),
                SB => SubnegotiationBegin,
                // IAC IAC is the escaped literal 255; anything else is a
                // one-octet command
                _ => Data,
            },
            OfferPositive(_) | OfferNegative(_) => match octet {
                IAC => InterpretingCommand,
                _ => Data,
            },
            SubnegotiationBegin => match octet {
                IAC => SubnegotiationEnd,
                _ => SubnegotiationBegin,
            },
            SubnegotiationEnd => match octet {
                SE => Data,
                _ => SubnegotiationBegin,
            },
        };

        Some(next)
    }
}

/// What one octet amounted to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifierEvent {
    /// Literal data byte for the terminal
    Data(u8),
    /// One-octet command such as NOP or GA (the octet after `IAC`)
    Command(u8),
    /// Complete `IAC WILL|WONT|DO|DONT <code>`
    Offer { side: Side, positive: bool, code: u8 },
    /// Complete `IAC SB <code> <payload> IAC SE`, payload unescaped
    Subnegotiation { code: u8, payload: Vec<u8> },
    /// The peer broke framing; logged and otherwise ignored
    Violation(&'static str),
}

/// Per-connection stream classifier
#[derive(Debug, Clone)]
pub struct StreamClassifier {
    machine: Automaton<ClassifierTable>,
    /// Subnegotiation capture; present only between `IAC SB` and `IAC SE`
    capture: Option<Vec<u8>>,
}

impl Default for StreamClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamClassifier {
    pub fn new() -> Self {
        Self {
            machine: Automaton::unbounded(ClassifierTable, ClassifierState::Data),
            capture: None,
        }
    }

    pub fn state(&self) -> ClassifierState {
        self.machine.current()
    }

    /// True while a command or subnegotiation spans the end of the input
    pub fn is_mid_sequence(&self) -> bool {
        self.state() != ClassifierState::Data
    }

    /// Return to `Data`, discarding any partial subnegotiation
    pub fn reset(&mut self) {
        if let Some(capture) = self.capture.take() {
            trace!(bytes = capture.len(), "discarding partial subnegotiation");
        }
        self.machine.reset();
    }

    /// Advance by one octet
    ///
    /// # Example
    /// ```
    /// use telnet_automata::classifier::{ClassifierEvent, StreamClassifier};
    /// use telnet_automata::protocol::Side;
    ///
    /// let mut classifier = StreamClassifier::new();
    /// let events: Vec<_> = [255, 251, 1].iter().filter_map(|&b| classifier.push(b)).collect();
    /// assert_eq!(
    ///     events,
    ///     vec![ClassifierEvent::Offer { side: Side::Remote, positive: true, code: 1 }]
    /// );
    /// ```
    pub fn push(&mut self, octet: u8) -> Option<ClassifierEvent> {
        use ClassifierState::*;

        let step = self.machine.step(octet);
        if step.reset {
            self.capture = None;
            return Some(ClassifierEvent::Violation("classifier reset after lookup miss"));
        }

        match (step.from, step.to) {
            (Data, Data) => Some(ClassifierEvent::Data(octet)),
            (Data, _) => None,

            (InterpretingCommand, Data) if octet == IAC => Some(ClassifierEvent::Data(IAC)),
            (InterpretingCommand, Data) if octet == SE => {
                Some(ClassifierEvent::Violation("subnegotiation end outside subnegotiation"))
            }
            (InterpretingCommand, Data) => Some(ClassifierEvent::Command(octet)),
            (InterpretingCommand, SubnegotiationBegin) => {
                self.capture = Some(Vec::new());
                None
            }
            (InterpretingCommand, _) => None,

            (OfferPositive(_) | OfferNegative(_), InterpretingCommand) => {
                Some(ClassifierEvent::Violation("option offer interrupted by command"))
            }
            (OfferPositive(side), _) => Some(ClassifierEvent::Offer {
                side,
                positive: true,
                code: octet,
            }),
            (OfferNegative(side), _) => Some(ClassifierEvent::Offer {
                side,
                positive: false,
                code: octet,
            }),

            (SubnegotiationBegin, SubnegotiationBegin) => {
                self.capture.get_or_insert_with(Vec::new).push(octet);
                None
            }
            (SubnegotiationBegin, _) => None,

            (SubnegotiationEnd, Data) => self.finish_capture(),
            (SubnegotiationEnd, _) => {
                let capture = self.capture.get_or_insert_with(Vec::new);
                if octet == IAC {
                    capture.push(IAC);
                    None
                } else {
                    // Not an escape and not the end marker: keep both octets
                    capture.push(IAC);
                    capture.push(octet);
                    Some(ClassifierEvent::Violation("unescaped command inside subnegotiation"))
                }
            }
        }
    }

    fn finish_capture(&mut self) -> Option<ClassifierEvent> {
        let capture = self.capture.take().unwrap_or_default();
        match capture.split_first() {
            Some((&code, payload)) => Some(ClassifierEvent::Subnegotiation {
                code,
                payload: payload.to_vec(),
            }),
            None => Some(ClassifierEvent::Violation("subnegotiation without option code")),
        }
    }
}
