//! # Telnet Wire Vocabulary
//!
//! Octet-level constants and helpers shared by the classifier, the option
//! automatons and the session, following:
//! - **RFC 854**: Telnet Protocol Specification
//! - **RFC 855**: Telnet Option Specifications
//!
//! ## Command Introducer
//! `IAC` (255) marks the start of a command. A literal 255 inside data or a
//! subnegotiation payload travels doubled as `IAC IAC`.
//!
//! ## Shapes on the wire
//! - One-octet command: `IAC <command>`
//! - Negotiation: `IAC WILL|WONT|DO|DONT <option>`
//! - Subnegotiation: `IAC SB <option> <payload...> IAC SE`

use serde::{Deserialize, Serialize};
use std::fmt;

/// IAC - Interpret As Command (RFC 854)
pub const IAC: u8 = 255;

/// Telnet commands that may follow `IAC` (RFC 854, Section 4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TelnetCommand {
    /// End of subnegotiation parameters
    SE = 240,
    /// No operation
    NOP = 241,
    /// Data Mark, the data-stream half of a Synch
    DM = 242,
    /// Break
    BRK = 243,
    /// Interrupt Process
    IP = 244,
    /// Abort Output
    AO = 245,
    /// Are You There
    AYT = 246,
    /// Erase Character
    EC = 247,
    /// Erase Line
    EL = 248,
    /// Go Ahead, half-duplex turn signal
    GA = 249,
    /// Subnegotiation Begin
    SB = 250,
    /// Sender will (or already does) perform the option
    WILL = 251,
    /// Sender refuses to perform, or stops performing, the option
    WONT = 252,
    /// Sender asks the receiver to perform the option
    DO = 253,
    /// Sender asks the receiver to stop performing the option
    DONT = 254,
}

impl TelnetCommand {
    /// Convert a byte to a TelnetCommand if it names one
    ///
    /// # Example
    /// ```
    /// use telnet_automata::protocol::TelnetCommand;
    ///
    /// assert_eq!(TelnetCommand::from_byte(253), Some(TelnetCommand::DO));
    /// assert_eq!(TelnetCommand::from_byte(0x41), None);
    /// ```
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            240 => Some(TelnetCommand::SE),
            241 => Some(TelnetCommand::NOP),
            242 => Some(TelnetCommand::DM),
            243 => Some(TelnetCommand::BRK),
            244 => Some(TelnetCommand::IP),
            245 => Some(TelnetCommand::AO),
            246 => Some(TelnetCommand::AYT),
            247 => Some(TelnetCommand::EC),
            248 => Some(TelnetCommand::EL),
            249 => Some(TelnetCommand::GA),
            250 => Some(TelnetCommand::SB),
            251 => Some(TelnetCommand::WILL),
            252 => Some(TelnetCommand::WONT),
            253 => Some(TelnetCommand::DO),
            254 => Some(TelnetCommand::DONT),
            _ => None,
        }
    }

    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// True for WILL, WONT, DO and DONT
    pub fn is_negotiation_command(self) -> bool {
        matches!(
            self,
            TelnetCommand::WILL | TelnetCommand::WONT | TelnetCommand::DO | TelnetCommand::DONT
        )
    }
}

/// Which party's capability an option automaton tracks
///
/// RFC 1143 calls these "him" and "us"; here they are `Remote` (their side,
/// announced with WILL/WONT and asked for with DO/DONT) and `Local` (our
/// side, asked for with DO/DONT and announced with WILL/WONT).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// The peer's capability
    Remote,
    /// Our own capability
    Local,
}

impl Side {
    /// The side an inbound negotiation command is about
    ///
    /// WILL/WONT describe the sender (our remote), DO/DONT describe the
    /// receiver (us).
    pub fn of_inbound(command: TelnetCommand) -> Option<Self> {
        match command {
            TelnetCommand::WILL | TelnetCommand::WONT => Some(Side::Remote),
            TelnetCommand::DO | TelnetCommand::DONT => Some(Side::Local),
            _ => None,
        }
    }

    /// The command we put on the wire to move this side towards `enabled`
    pub fn outbound_command(self, enabled: bool) -> TelnetCommand {
        match (self, enabled) {
            (Side::Remote, true) => TelnetCommand::DO,
            (Side::Remote, false) => TelnetCommand::DONT,
            (Side::Local, true) => TelnetCommand::WILL,
            (Side::Local, false) => TelnetCommand::WONT,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Remote => write!(f, "remote"),
            Side::Local => write!(f, "local"),
        }
    }
}

/// A negotiable option: its assigned code and a human readable name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OptionIdentity {
    pub code: u8,
    pub name: &'static str,
}

/// Name reported for codes with no known assignment
pub const UNASSIGNED: &str = "unassigned";

macro_rules! known_options {
    ($($ident:ident = $code:literal => $name:literal,)*) => {
        impl OptionIdentity {
            $(pub const $ident: OptionIdentity = OptionIdentity { code: $code, name: $name };)*

            /// Every option code this crate has a name for
            pub const KNOWN: &'static [OptionIdentity] = &[$(OptionIdentity::$ident,)*];
        }
    };
}

known_options! {
    BINARY = 0 => "binary transmission",
    ECHO = 1 => "echo",
    RECONNECTION = 2 => "reconnection",
    SUPPRESS_GO_AHEAD = 3 => "suppress go ahead",
    APPROX_MESSAGE_SIZE = 4 => "approx message size negotiation",
    STATUS = 5 => "status",
    TIMING_MARK = 6 => "timing mark",
    RCTE = 7 => "remote controlled trans and echo",
    OUTPUT_LINE_WIDTH = 8 => "output line width",
    OUTPUT_PAGE_SIZE = 9 => "output page size",
    NAOCRD = 10 => "output carriage-return disposition",
    NAOHTS = 11 => "output horizontal tab stops",
    NAOHTD = 12 => "output horizontal tab disposition",
    NAOFFD = 13 => "output formfeed disposition",
    NAOVTS = 14 => "output vertical tabstops",
    NAOVTD = 15 => "output vertical tab disposition",
    NAOLFD = 16 => "output linefeed disposition",
    EXTEND_ASCII = 17 => "extended ascii",
    LOGOUT = 18 => "logout",
    BYTE_MACRO = 19 => "byte macro",
    DATA_ENTRY_TERMINAL = 20 => "data entry terminal",
    SUPDUP = 21 => "supdup",
    SUPDUP_OUTPUT = 22 => "supdup output",
    SEND_LOCATION = 23 => "send location",
    TERMINAL_TYPE = 24 => "terminal type",
    END_OF_RECORD = 25 => "end of record",
    TACACS_USER_ID = 26 => "tacacs user identification",
    OUTPUT_MARKING = 27 => "output marking",
    TERMINAL_LOCATION = 28 => "terminal location number",
    TELNET_3270 = 29 => "telnet 3270 regime",
    X3_PAD = 30 => "x.3 pad",
    NAWS = 31 => "negotiate about window size",
    TERMINAL_SPEED = 32 => "terminal speed",
    TOGGLE_FLOW_CONTROL = 33 => "remote flow control",
    LINEMODE = 34 => "linemode",
    X_DISPLAY_LOCATION = 35 => "x display location",
    OLD_ENVIRON = 36 => "environment option",
    AUTHENTICATION = 37 => "authentication option",
    ENCRYPT = 38 => "encryption option",
    NEW_ENVIRON = 39 => "new environment option",
    MSDP = 69 => "mud server data protocol",
    MSSP = 70 => "mud server status protocol",
    MCCP1 = 85 => "mud client compression v1",
    MCCP2 = 86 => "mud client compression v2",
    MXP = 91 => "mud extension protocol",
    ATCP = 200 => "achaea telnet client protocol",
    GMCP = 201 => "generic mud communication protocol",
}

impl OptionIdentity {
    /// Look up the identity for a code; never fails
    ///
    /// ```
    /// use telnet_automata::protocol::OptionIdentity;
    ///
    /// assert_eq!(OptionIdentity::from_code(0), OptionIdentity::BINARY);
    /// assert_eq!(OptionIdentity::from_code(150).name, "unassigned");
    /// ```
    pub fn from_code(code: u8) -> Self {
        Self::KNOWN
            .iter()
            .copied()
            .find(|identity| identity.code == code)
            .unwrap_or(OptionIdentity {
                code,
                name: UNASSIGNED,
            })
    }

    pub fn is_assigned(self) -> bool {
        self.name != UNASSIGNED
    }
}

impl fmt::Display for OptionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.code)
    }
}

/// `IAC <command> <option>`
pub fn negotiation_bytes(command: TelnetCommand, code: u8) -> [u8; 3] {
    [IAC, command.to_byte(), code]
}

/// `IAC SB <option> <payload> IAC SE`, doubling any IAC inside the payload
pub fn subnegotiation_bytes(code: u8, payload: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(payload.len() + 6);
    bytes.push(IAC);
    bytes.push(TelnetCommand::SB.to_byte());
    bytes.push(code);
    if code == IAC {
        bytes.push(IAC);
    }
    bytes.extend(escape_data(payload));
    bytes.push(IAC);
    bytes.push(TelnetCommand::SE.to_byte());
    bytes
}

/// Double every IAC so literal data survives the trip through a peer's
/// classifier
pub fn escape_data(data: &[u8]) -> Vec<u8> {
    let extra = data.iter().filter(|&&byte| byte == IAC).count();
    let mut escaped = Vec::with_capacity(data.len() + extra);
    for &byte in data {
        escaped.push(byte);
        if byte == IAC {
            escaped.push(IAC);
        }
    }
    escaped
}
