//! # Telnet Option Negotiation (RFC 1143 Q Method)
//!
//! One [`OptionAutomaton`] tracks one side of one option. Running the two
//! sides of an option as separate machines, each fed only by its own
//! symbol source, is what keeps two autonomous peers from bouncing
//! WILL/DO offers at each other forever.
//!
//! ## States
//! - **No** / **Yes**: settled, option disabled / enabled
//! - **WantYes** / **WantNo**: we asked for enable / disable and wait for
//!   the answer
//! - **WantYesOpposite** / **WantNoOpposite**: as above, but the user has
//!   since asked for the opposite, to be started once the answer arrives
//!
//! ## Symbols
//! - `OfferPositive` / `OfferNegative`: the peer said WILL/DO or WONT/DONT
//! - `RequestPositive` / `RequestNegative`: we want to enable or disable
//!
//! ## Example
//! ```text
//! No      + RequestPositive -> WantYes, send DO/WILL
//! WantYes + OfferPositive   -> Yes
//! Yes     + RequestNegative -> WantNo,  send DONT/WONT
//! WantNo  + OfferNegative   -> No
//! ```
//!
//! The next state lives in [`OptionTable`]; the reply to send and any
//! protocol violation come from [`reply_for`] and [`violation_for`].

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::automaton::{Automaton, TransitionTable};
use crate::protocol::{OptionIdentity, Side, TelnetCommand, negotiation_bytes};

/// Negotiation state of one side of one option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionState {
    No,
    WantNo,
    WantNoOpposite,
    WantYes,
    WantYesOpposite,
    Yes,
}

impl OptionState {
    pub const ALL: [OptionState; 6] = [
        OptionState::No,
        OptionState::WantNo,
        OptionState::WantNoOpposite,
        OptionState::WantYes,
        OptionState::WantYesOpposite,
        OptionState::Yes,
    ];
}

/// Input to an option automaton
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NegotiationSymbol {
    /// Peer sent WONT (remote side) or DONT (local side)
    OfferNegative,
    /// Peer sent WILL (remote side) or DO (local side)
    OfferPositive,
    /// We want the option disabled
    RequestNegative,
    /// We want the option enabled
    RequestPositive,
}

impl NegotiationSymbol {
    pub const ALL: [NegotiationSymbol; 4] = [
        NegotiationSymbol::OfferNegative,
        NegotiationSymbol::OfferPositive,
        NegotiationSymbol::RequestNegative,
        NegotiationSymbol::RequestPositive,
    ];

    pub fn offer(positive: bool) -> Self {
        if positive {
            NegotiationSymbol::OfferPositive
        } else {
            NegotiationSymbol::OfferNegative
        }
    }

    pub fn request(positive: bool) -> Self {
        if positive {
            NegotiationSymbol::RequestPositive
        } else {
            NegotiationSymbol::RequestNegative
        }
    }

    pub fn is_request(self) -> bool {
        matches!(
            self,
            NegotiationSymbol::RequestNegative | NegotiationSymbol::RequestPositive
        )
    }
}

/// How an unsolicited offer is answered while the option is off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Accept,
    #[default]
    Refuse,
}

impl Decision {
    pub fn from_accept(accept: bool) -> Self {
        if accept {
            Decision::Accept
        } else {
            Decision::Refuse
        }
    }

    pub fn accepts(self) -> bool {
        self == Decision::Accept
    }
}

/// Command the caller must send after a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NegotiationReply {
    /// Agree to an unsolicited offer (DO / WILL)
    Accept,
    /// Turn down an offer (DONT / WONT)
    Refuse,
    /// Ask for the option to be enabled (DO / WILL)
    Request,
    /// Confirm the peer disabled the option (DONT / WONT)
    AcknowledgeDisable,
    /// Ask for the option to be disabled (DONT / WONT)
    Disable,
}

impl NegotiationReply {
    pub fn is_positive(self) -> bool {
        matches!(self, NegotiationReply::Accept | NegotiationReply::Request)
    }

    /// Wire command carrying this reply for the given side
    pub fn command(self, side: Side) -> TelnetCommand {
        side.outbound_command(self.is_positive())
    }

    /// `IAC <command> <option>` for this reply
    pub fn to_bytes(self, side: Side, code: u8) -> [u8; 3] {
        negotiation_bytes(self.command(side), code)
    }
}

/// The Q method transition table, parameterised by the policy for
/// unsolicited offers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OptionTable {
    pub policy: Decision,
}

impl TransitionTable for OptionTable {
    type State = OptionState;
    type Symbol = NegotiationSymbol;

    fn transition(&self, state: OptionState, symbol: NegotiationSymbol) -> Option<OptionState> {
        use NegotiationSymbol::*;
        use OptionState::*;

        let next = match (state, symbol) {
            (No, OfferNegative) => No,
            (No, OfferPositive) => match self.policy {
                Decision::Accept => Yes,
                Decision::Refuse => No,
            },
            (No, RequestNegative) => No,
            (No, RequestPositive) => WantYes,

            (WantNo, OfferNegative) => No,
            (WantNo, OfferPositive) => No,
            (WantNo, RequestNegative) => WantNo,
            (WantNo, RequestPositive) => WantNoOpposite,

            (WantNoOpposite, OfferNegative) => WantYes,
            (WantNoOpposite, OfferPositive) => Yes,
            (WantNoOpposite, RequestNegative) => WantNo,
            (WantNoOpposite, RequestPositive) => WantNoOpposite,

            (WantYes, OfferNegative) => No,
            (WantYes, OfferPositive) => Yes,
            (WantYes, RequestNegative) => WantYesOpposite,
            (WantYes, RequestPositive) => WantYes,

            (WantYesOpposite, OfferNegative) => No,
            (WantYesOpposite, OfferPositive) => WantNo,
            (WantYesOpposite, RequestNegative) => WantYesOpposite,
            (WantYesOpposite, RequestPositive) => WantYes,

            (Yes, OfferNegative) => No,
            (Yes, OfferPositive) => Yes,
            (Yes, RequestNegative) => WantNo,
            (Yes, RequestPositive) => Yes,
        };

        Some(next)
    }
}

/// Reply owed for a fired `(from, symbol, to)` transition
pub fn reply_for(
    from: OptionState,
    symbol: NegotiationSymbol,
    to: OptionState,
) -> Option<NegotiationReply> {
    use NegotiationSymbol::*;
    use OptionState::*;

    match (from, symbol, to) {
        (No, OfferPositive, Yes) => Some(NegotiationReply::Accept),
        (No, OfferPositive, No) => Some(NegotiationReply::Refuse),
        (No, RequestPositive, _) => Some(NegotiationReply::Request),
        (WantNoOpposite, OfferNegative, _) => Some(NegotiationReply::Request),
        (WantYesOpposite, OfferPositive, _) => Some(NegotiationReply::Refuse),
        (Yes, OfferNegative, _) => Some(NegotiationReply::AcknowledgeDisable),
        (Yes, RequestNegative, _) => Some(NegotiationReply::Disable),
        _ => None,
    }
}

/// Why a transition is a protocol error, if it is one
///
/// Offer rows describe a peer answering something we never asked; request
/// rows describe a local request that makes no sense in the current state.
pub fn violation_for(from: OptionState, symbol: NegotiationSymbol) -> Option<&'static str> {
    use NegotiationSymbol::*;
    use OptionState::*;

    match (from, symbol) {
        (No, RequestNegative) => Some("disable requested while already disabled"),
        (WantNo, OfferPositive) => Some("disable request answered with enable"),
        (WantNo, RequestNegative) => Some("already negotiating to disable"),
        (WantNoOpposite, OfferPositive) => Some("disable request answered with enable"),
        (WantNoOpposite, RequestPositive) => Some("enable already queued"),
        (WantYes, RequestPositive) => Some("already negotiating to enable"),
        (WantYesOpposite, RequestNegative) => Some("disable already queued"),
        (Yes, RequestPositive) => Some("enable requested while already enabled"),
        _ => None,
    }
}

/// Result of feeding one symbol to an [`OptionAutomaton`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: OptionState,
    pub state: OptionState,
    pub reply: Option<NegotiationReply>,
    pub violation: Option<&'static str>,
}

/// Q method state machine for one side of one option
#[derive(Debug, Clone)]
pub struct OptionAutomaton {
    machine: Automaton<OptionTable>,
}

impl OptionAutomaton {
    /// New automaton in `No`, answering unsolicited offers per `policy`
    pub fn new(policy: Decision) -> Self {
        Self {
            machine: Automaton::unbounded(OptionTable { policy }, OptionState::No),
        }
    }

    /// Apply one symbol and report the reply the caller must send
    ///
    /// # Example
    /// ```
    /// use telnet_automata::negotiation::{
    ///     Decision, NegotiationReply, NegotiationSymbol, OptionAutomaton, OptionState,
    /// };
    ///
    /// let mut automaton = OptionAutomaton::new(Decision::Accept);
    /// let transition = automaton.handle(NegotiationSymbol::OfferPositive);
    /// assert_eq!(transition.state, OptionState::Yes);
    /// assert_eq!(transition.reply, Some(NegotiationReply::Accept));
    /// ```
    pub fn handle(&mut self, symbol: NegotiationSymbol) -> Transition {
        let step = self.machine.step(symbol);
        Transition {
            from: step.from,
            state: step.to,
            reply: reply_for(step.from, symbol, step.to),
            violation: violation_for(step.from, symbol),
        }
    }

    pub fn state(&self) -> OptionState {
        self.machine.current()
    }

    pub fn is_enabled(&self) -> bool {
        self.state() == OptionState::Yes
    }

    pub fn policy(&self) -> Decision {
        self.machine.table().policy
    }

    pub fn reset(&mut self) {
        self.machine.reset();
    }
}

/// The two independent automatons for one option
///
/// `remote` only ever sees the peer's WILL/WONT and our DO/DONT requests;
/// `local` only sees the peer's DO/DONT and our WILL/WONT requests.
#[derive(Debug, Clone)]
pub struct NegotiationPair {
    pub identity: OptionIdentity,
    pub remote: OptionAutomaton,
    pub local: OptionAutomaton,
}

impl NegotiationPair {
    pub fn new(identity: OptionIdentity, remote: Decision, local: Decision) -> Self {
        Self {
            identity,
            remote: OptionAutomaton::new(remote),
            local: OptionAutomaton::new(local),
        }
    }

    pub fn side(&self, side: Side) -> &OptionAutomaton {
        match side {
            Side::Remote => &self.remote,
            Side::Local => &self.local,
        }
    }

    /// Route a symbol to the automaton for `side`, logging violations
    pub fn handle(&mut self, side: Side, symbol: NegotiationSymbol) -> Transition {
        let automaton = match side {
            Side::Remote => &mut self.remote,
            Side::Local => &mut self.local,
        };
        let transition = automaton.handle(symbol);

        if let Some(reason) = transition.violation {
            warn!(
                option = %self.identity,
                %side,
                ?symbol,
                state = ?transition.from,
                "negotiation violation: {}",
                reason
            );
        }
        debug!(
            option = %self.identity,
            %side,
            ?symbol,
            from = ?transition.from,
            to = ?transition.state,
            reply = ?transition.reply,
            "option transition"
        );

        transition
    }

    pub fn reset(&mut self) {
        self.remote.reset();
        self.local.reset();
    }
}
