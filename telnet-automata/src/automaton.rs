//! # Table-Driven Automaton Engine
//!
//! A small, reusable finite-automaton driver. A machine is described by a
//! [`TransitionTable`]: a pure function from `(state, symbol)` to the next
//! state. The engine owns the current state, the initial state `q0` and the
//! set of accepting states `F`, and advances one step per input symbol.
//!
//! ## Rules
//! - Once the current state is accepting, the machine is frozen: further
//!   steps report the same state and change nothing.
//! - A table lookup miss never panics. It resets the machine to `q0`.
//! - The engine performs no I/O. Callers decide what to emit from the
//!   `(from, symbol, to)` triple a [`Step`] reports.
//!
//! Both protocol machines in this crate (the stream classifier and the
//! option automaton) run with an empty `F`, so they never freeze.

use std::collections::VecDeque;
use std::fmt::Debug;

use tracing::debug;

/// Pure transition function of a machine
pub trait TransitionTable {
    /// Comparable token naming a machine condition
    type State: Copy + Eq + Debug;
    /// Input consumed by one step
    type Symbol: Copy + Debug;

    /// Next state for `symbol` in `state`, or `None` when the table has no
    /// entry for that pair
    fn transition(&self, state: Self::State, symbol: Self::Symbol) -> Option<Self::State>;
}

/// What happened during one call to [`Automaton::step`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step<S> {
    /// State before the symbol was applied
    pub from: S,
    /// State after the symbol was applied
    pub to: S,
    /// Whether `to` is an accepting state
    pub accepted: bool,
    /// True when the table had no entry and the machine fell back to `q0`
    pub reset: bool,
}

impl<S: Copy + Eq> Step<S> {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

/// A running instance of a [`TransitionTable`]
#[derive(Debug, Clone)]
pub struct Automaton<T: TransitionTable> {
    table: T,
    initial: T::State,
    current: T::State,
    accepting: Vec<T::State>,
}

impl<T: TransitionTable> Automaton<T> {
    /// Create a machine that starts (and resets) at `initial`
    pub fn new(table: T, initial: T::State, accepting: Vec<T::State>) -> Self {
        Self {
            table,
            initial,
            current: initial,
            accepting,
        }
    }

    /// Machine with no accepting states, which runs forever
    pub fn unbounded(table: T, initial: T::State) -> Self {
        Self::new(table, initial, Vec::new())
    }

    /// Advance by one symbol
    pub fn step(&mut self, symbol: T::Symbol) -> Step<T::State> {
        let from = self.current;

        if self.is_accepting() {
            return Step {
                from,
                to: from,
                accepted: true,
                reset: false,
            };
        }

        let (to, reset) = match self.table.transition(from, symbol) {
            Some(next) => (next, false),
            None => {
                debug!(?from, ?symbol, "no transition entry, resetting to initial state");
                (self.initial, true)
            }
        };

        self.current = to;
        Step {
            from,
            to,
            accepted: self.is_accepting(),
            reset,
        }
    }

    pub fn current(&self) -> T::State {
        self.current
    }

    pub fn initial(&self) -> T::State {
        self.initial
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.contains(&self.current)
    }

    pub fn table(&self) -> &T {
        &self.table
    }

    /// Return to `q0`, unfreezing the machine if it had accepted
    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

/// Every state reachable from `initial` using symbols from `alphabet`
///
/// States are returned in breadth-first discovery order, starting with
/// `initial`. Lookup misses count as a move back to `initial`, matching the
/// engine's recovery rule.
pub fn reachable_states<T: TransitionTable>(
    table: &T,
    initial: T::State,
    alphabet: &[T::Symbol],
) -> Vec<T::State> {
    let mut seen = vec![initial];
    let mut queue = VecDeque::from([initial]);

    while let Some(state) = queue.pop_front() {
        for &symbol in alphabet {
            let next = table.transition(state, symbol).unwrap_or(initial);
            if !seen.contains(&next) {
                seen.push(next);
                queue.push_back(next);
            }
        }
    }

    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Turnstile with a deliberately missing entry: `Broken` has no row
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Gate {
        Locked,
        Open,
        Broken,
        Done,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Input {
        Coin,
        Push,
        Kick,
        Finish,
    }

    struct GateTable;

    impl TransitionTable for GateTable {
        type State = Gate;
        type Symbol = Input;

        fn transition(&self, state: Gate, symbol: Input) -> Option<Gate> {
            match (state, symbol) {
                (Gate::Locked, Input::Coin) => Some(Gate::Open),
                (Gate::Locked, Input::Push) => Some(Gate::Locked),
                (Gate::Open, Input::Push) => Some(Gate::Locked),
                (Gate::Open, Input::Coin) => Some(Gate::Open),
                (_, Input::Kick) => Some(Gate::Broken),
                (Gate::Open, Input::Finish) => Some(Gate::Done),
                _ => None,
            }
        }
    }

    #[test]
    fn test_steps_follow_table() {
        let mut gate = Automaton::unbounded(GateTable, Gate::Locked);

        let step = gate.step(Input::Coin);
        assert_eq!(step.from, Gate::Locked);
        assert_eq!(step.to, Gate::Open);
        assert!(step.changed());
        assert!(!step.accepted);
        assert!(!step.reset);

        let step = gate.step(Input::Coin);
        assert!(!step.changed());
        assert_eq!(gate.current(), Gate::Open);
    }

    #[test]
    fn test_lookup_miss_resets_to_initial() {
        let mut gate = Automaton::unbounded(GateTable, Gate::Locked);
        gate.step(Input::Kick);
        assert_eq!(gate.current(), Gate::Broken);

        let step = gate.step(Input::Coin);
        assert!(step.reset);
        assert_eq!(step.from, Gate::Broken);
        assert_eq!(step.to, Gate::Locked);
        assert_eq!(gate.current(), gate.initial());
    }

    #[test]
    fn test_accepting_state_freezes_machine() {
        let mut gate = Automaton::new(GateTable, Gate::Locked, vec![Gate::Done]);
        gate.step(Input::Coin);

        let step = gate.step(Input::Finish);
        assert!(step.accepted);
        assert!(gate.is_accepting());

        for input in [Input::Coin, Input::Push, Input::Kick] {
            let step = gate.step(input);
            assert_eq!(step.to, Gate::Done);
            assert!(step.accepted);
            assert!(!step.changed());
        }

        gate.reset();
        assert_eq!(gate.current(), Gate::Locked);
        assert!(!gate.is_accepting());
    }

    #[test]
    fn test_initial_accepting_state_is_frozen_from_start() {
        let mut gate = Automaton::new(GateTable, Gate::Locked, vec![Gate::Locked]);
        assert!(gate.is_accepting());
        assert_eq!(gate.step(Input::Coin).to, Gate::Locked);
    }

    #[test]
    fn test_reachable_states() {
        let alphabet = [Input::Coin, Input::Push, Input::Kick, Input::Finish];
        let reachable = reachable_states(&GateTable, Gate::Locked, &alphabet);
        assert_eq!(reachable[0], Gate::Locked);
        assert_eq!(reachable.len(), 4);

        let without_kick = reachable_states(&GateTable, Gate::Locked, &[Input::Coin, Input::Push]);
        assert_eq!(without_kick, vec![Gate::Locked, Gate::Open]);
    }
}
