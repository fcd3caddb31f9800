//! Sequencer that reacts to its own committed transitions.

use crate::core::{
    Event, MachineState, Phase, Reducer, RunId, Sequence, TransitionLog, TransitionRecord,
};
use crate::error::SequenceError;
use crate::shell::options::{EndCallback, RunOptions};
use chrono::Utc;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::{debug, error, info, warn};

/// Side effect requested by a committed transition.
enum Reaction {
    /// Emit `Start` if the machine is still waiting and running.
    AutoStart,
    /// Report the end of `run` to the completion callback.
    NotifyEnd {
        run: RunId,
        callback: Option<EndCallback>,
    },
}

/// One machine instance, bound to one sequence definition.
struct Machine<P: Phase> {
    sequence: Sequence<P>,
    reducer: Reducer,
    state: MachineState,
    options: RunOptions,
    run: RunId,
    history: TransitionLog,
    notified: Option<RunId>,
}

impl<P: Phase> Machine<P> {
    fn fresh(sequence: Sequence<P>, options: RunOptions) -> Self {
        let reducer = sequence.reducer();
        Self {
            state: reducer.initial(options.running),
            sequence,
            reducer,
            options,
            run: RunId::new(),
            history: TransitionLog::new(),
            notified: None,
        }
    }

    /// Reactions owed for the state a fresh machine starts in.
    fn entry_reactions(&mut self) -> Vec<Reaction> {
        let mut reactions = Vec::new();
        if !self.options.running {
            return reactions;
        }
        let state = self.state;
        match state {
            MachineState::Waiting => reactions.push(Reaction::AutoStart),
            MachineState::Ended => reactions.extend(self.notify_end()),
            MachineState::Running { .. } => {}
        }
        reactions
    }

    /// Apply `event`, record it, and return the reactions it triggers.
    fn commit(&mut self, event: Event) -> Result<Vec<Reaction>, SequenceError> {
        let from = self.state;
        let to = match self.reducer.apply(&from, event) {
            Ok(to) => to,
            Err(err) => {
                warn!(run = %self.run, state = %from, event = %event, "rejected sequence event");
                return Err(err);
            }
        };

        if event == Event::Rearm {
            self.run = RunId::new();
            self.history = TransitionLog::new();
        }

        self.history = self.history.record(TransitionRecord {
            run: self.run,
            from,
            to,
            event,
            timestamp: Utc::now(),
        });
        self.state = to;
        debug!(run = %self.run, from = %from, to = %to, event = %event, "sequence transition");

        let mut reactions = Vec::new();
        if self.options.running {
            if to.is_waiting() {
                reactions.push(Reaction::AutoStart);
            }
            if to.is_final() && !from.is_final() {
                reactions.extend(self.notify_end());
            }
        }
        Ok(reactions)
    }

    /// Emit `Start` if still owed. The state may have moved since the
    /// reaction was queued.
    fn auto_start(&mut self) -> Result<Vec<Reaction>, SequenceError> {
        if self.state.is_waiting() && self.options.running {
            self.commit(Event::Start)
        } else {
            Ok(Vec::new())
        }
    }

    /// At most one notification per run.
    fn notify_end(&mut self) -> Option<Reaction> {
        if self.notified == Some(self.run) {
            return None;
        }
        self.notified = Some(self.run);
        Some(Reaction::NotifyEnd {
            run: self.run,
            callback: self.options.on_end.clone(),
        })
    }

    /// Advances only move an active index.
    fn accepts_advance(&self) -> bool {
        self.state.is_running()
    }
}

type Shared<P> = Rc<RefCell<Machine<P>>>;

/// Run queued reactions in order.
///
/// The machine is never borrowed while a callback runs, so callbacks may
/// call back into the sequencer.
fn settle<P: Phase>(shared: &Shared<P>, reactions: Vec<Reaction>) -> Result<(), SequenceError> {
    let mut queue = VecDeque::from(reactions);
    while let Some(reaction) = queue.pop_front() {
        match reaction {
            Reaction::AutoStart => {
                let more = shared.borrow_mut().auto_start()?;
                queue.extend(more);
            }
            Reaction::NotifyEnd { run, callback } => {
                info!(run = %run, "sequence run completed");
                if let Some(callback) = callback {
                    callback();
                }
            }
        }
    }
    Ok(())
}

fn dispatch<P: Phase>(shared: &Shared<P>, event: Event) -> Result<(), SequenceError> {
    let reactions = shared.borrow_mut().commit(event)?;
    settle(shared, reactions)
}

fn advance<P: Phase>(shared: &Shared<P>) {
    let accepted = {
        let machine = shared.borrow();
        if !machine.accepts_advance() {
            debug!(
                run = %machine.run,
                state = %machine.state,
                running = machine.options.running,
                "advance absorbed"
            );
        }
        machine.accepts_advance()
    };
    if accepted {
        dispatch(shared, Event::Advance).unwrap_or_else(|err| fatal(err));
    }
}

/// Protocol violations inside the shell are unrecoverable.
fn fatal(err: SequenceError) -> ! {
    error!(error = %err, "sequencer invariant violated");
    panic!("{err}")
}

/// Reactive wrapper around the pure transition function.
///
/// A `Sequencer` owns one machine per sequence definition. When running it
/// starts on its own, steps through the phases on each advance, and calls
/// the completion callback exactly once when the phases run out.
///
/// The sequencer is single-threaded and is not `Send`.
///
/// # Example
///
/// ```rust
/// use phaseline::shell::{RunOptions, Sequencer};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let ended = Rc::new(Cell::new(0));
/// let counter = Rc::clone(&ended);
/// let sequencer = Sequencer::new(
///     vec!["a", "b", "c"],
///     RunOptions::new().on_end(move || counter.set(counter.get() + 1)),
/// );
///
/// assert_eq!(sequencer.phase(), Some("a"));
/// sequencer.advance();
/// assert_eq!(sequencer.phase(), Some("b"));
/// sequencer.advance();
/// sequencer.advance();
/// assert_eq!(sequencer.phase(), None);
/// assert_eq!(ended.get(), 1);
/// ```
pub struct Sequencer<P: Phase> {
    shared: Shared<P>,
}

impl<P: Phase> Sequencer<P> {
    pub fn new<S>(sequence: S, options: RunOptions) -> Self
    where
        S: Into<Sequence<P>>,
    {
        let mut machine = Machine::fresh(sequence.into(), options);
        let reactions = machine.entry_reactions();
        debug!(
            run = %machine.run,
            phases = machine.sequence.len(),
            state = %machine.state,
            "sequencer created"
        );

        let shared = Rc::new(RefCell::new(machine));
        settle(&shared, reactions).unwrap_or_else(|err| fatal(err));
        Self { shared }
    }

    /// Current machine state.
    pub fn state(&self) -> MachineState {
        self.shared.borrow().state
    }

    /// Visible phase, or `None` while waiting or ended.
    ///
    /// # Panics
    ///
    /// Panics if the active index lies outside the sequence. That cannot
    /// happen through the public API.
    pub fn phase(&self) -> Option<P> {
        self.current_phase().unwrap_or_else(|err| fatal(err))
    }

    /// Visible phase, reporting a broken index instead of panicking.
    pub fn current_phase(&self) -> Result<Option<P>, SequenceError> {
        let machine = self.shared.borrow();
        let phase = machine.sequence.phase_for(&machine.state)?;
        Ok(phase.cloned())
    }

    /// Move to the next phase.
    ///
    /// Ignored while no phase is active: a passive machine still waiting,
    /// or a run that has ended and not been rearmed.
    pub fn advance(&self) {
        advance(&self.shared);
    }

    /// Handle that advances this sequencer.
    ///
    /// Every handle from the same sequencer compares equal, including
    /// handles taken after `replace_sequence` or `set_options`.
    pub fn advance_handle(&self) -> AdvanceHandle<P> {
        AdvanceHandle {
            shared: Rc::downgrade(&self.shared),
        }
    }

    /// Return an ended machine to `Waiting`, starting a new run.
    ///
    /// A running sequencer immediately starts again from the first phase.
    pub fn rearm(&self) -> Result<(), SequenceError> {
        dispatch(&self.shared, Event::Rearm)
    }

    /// Toggle running mode.
    ///
    /// Turning it on while waiting starts the machine. Turning it on
    /// mid-run changes nothing until the run ends.
    pub fn set_running(&self, running: bool) {
        let reactions = {
            let mut machine = self.shared.borrow_mut();
            if machine.options.running == running {
                return;
            }
            machine.options.running = running;
            debug!(run = %machine.run, running, state = %machine.state, "running toggled");
            if running && machine.state.is_waiting() {
                vec![Reaction::AutoStart]
            } else {
                Vec::new()
            }
        };
        settle(&self.shared, reactions).unwrap_or_else(|err| fatal(err));
    }

    /// Replace the options, re-evaluating auto-start as `set_running` does.
    pub fn set_options(&self, options: RunOptions) {
        let running = options.running;
        {
            let mut machine = self.shared.borrow_mut();
            machine.options.on_end = options.on_end;
        }
        self.set_running(running);
    }

    /// Discard the machine and start over with a new definition.
    pub fn replace_sequence<S>(&self, sequence: S)
    where
        S: Into<Sequence<P>>,
    {
        let reactions = {
            let mut machine = self.shared.borrow_mut();
            let options = machine.options.clone();
            *machine = Machine::fresh(sequence.into(), options);
            debug!(
                run = %machine.run,
                phases = machine.sequence.len(),
                state = %machine.state,
                "sequence replaced"
            );
            machine.entry_reactions()
        };
        settle(&self.shared, reactions).unwrap_or_else(|err| fatal(err));
    }

    pub fn is_running(&self) -> bool {
        self.shared.borrow().options.running
    }

    pub fn sequence(&self) -> Sequence<P> {
        self.shared.borrow().sequence.clone()
    }

    pub fn run_id(&self) -> RunId {
        self.shared.borrow().run
    }

    /// Transitions committed during the current run.
    ///
    /// A rearm starts a fresh log whose first record is the rearm itself.
    pub fn history(&self) -> TransitionLog {
        self.shared.borrow().history.clone()
    }
}

impl<P: Phase> fmt::Debug for Sequencer<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let machine = self.shared.borrow();
        f.debug_struct("Sequencer")
            .field("state", &machine.state)
            .field("run", &machine.run)
            .field("phases", &machine.sequence.phases())
            .field("options", &machine.options)
            .finish()
    }
}

/// Cloneable, identity-stable handle that advances a sequencer.
///
/// The handle does not keep the sequencer alive. Calling it after the
/// sequencer is dropped does nothing.
pub struct AdvanceHandle<P: Phase> {
    shared: Weak<RefCell<Machine<P>>>,
}

impl<P: Phase> AdvanceHandle<P> {
    /// Advance the sequencer, if it still exists.
    pub fn call(&self) {
        if let Some(shared) = self.shared.upgrade() {
            advance(&shared);
        } else {
            debug!("advance on dropped sequencer ignored");
        }
    }

    pub fn is_attached(&self) -> bool {
        self.shared.strong_count() > 0
    }
}

impl<P: Phase> Clone for AdvanceHandle<P> {
    fn clone(&self) -> Self {
        Self {
            shared: Weak::clone(&self.shared),
        }
    }
}

impl<P: Phase> PartialEq for AdvanceHandle<P> {
    fn eq(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.shared, &other.shared)
    }
}

impl<P: Phase> Eq for AdvanceHandle<P> {}

impl<P: Phase> fmt::Debug for AdvanceHandle<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdvanceHandle")
            .field("attached", &self.is_attached())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn counter() -> (Rc<Cell<usize>>, RunOptions) {
        let calls = Rc::new(Cell::new(0));
        let inner = Rc::clone(&calls);
        let options = RunOptions::new().on_end(move || inner.set(inner.get() + 1));
        (calls, options)
    }

    #[test]
    fn three_phase_scenario() {
        let (ended, options) = counter();
        let sequencer = Sequencer::new(vec!["a", "b", "c"], options);

        assert_eq!(sequencer.phase(), Some("a"));
        sequencer.advance();
        assert_eq!(sequencer.phase(), Some("b"));
        sequencer.advance();
        assert_eq!(sequencer.phase(), Some("c"));
        assert_eq!(ended.get(), 0);
        sequencer.advance();

        assert_eq!(sequencer.state(), MachineState::Ended);
        assert_eq!(sequencer.phase(), None);
        assert_eq!(ended.get(), 1);
    }

    #[test]
    fn on_end_fires_once_despite_extra_advances() {
        let (ended, options) = counter();
        let sequencer = Sequencer::new(vec![1, 2], options);

        for _ in 0..10 {
            sequencer.advance();
        }

        assert_eq!(sequencer.state(), MachineState::Ended);
        assert_eq!(ended.get(), 1);
    }

    #[test]
    fn empty_sequence_ends_without_advance() {
        let (ended, options) = counter();
        let sequencer = Sequencer::new(Vec::<&str>::new(), options);

        assert_eq!(sequencer.state(), MachineState::Ended);
        assert_eq!(sequencer.phase(), None);
        assert_eq!(ended.get(), 1);
    }

    #[test]
    fn passive_sequencer_never_moves_or_notifies() {
        let (ended, options) = counter();
        let sequencer = Sequencer::new(vec!["a", "b"], options.running(false));

        for _ in 0..5 {
            sequencer.advance();
            assert_eq!(sequencer.phase(), None);
        }

        assert_eq!(sequencer.state(), MachineState::Waiting);
        assert_eq!(ended.get(), 0);
        assert!(sequencer.history().transitions().is_empty());
    }

    #[test]
    fn passive_empty_sequence_stays_waiting() {
        let (ended, options) = counter();
        let sequencer = Sequencer::new(Vec::<u8>::new(), options.running(false));

        assert_eq!(sequencer.state(), MachineState::Waiting);
        assert_eq!(ended.get(), 0);
    }

    #[test]
    fn enabling_running_while_waiting_auto_starts() {
        let sequencer = Sequencer::new(vec!["x", "y"], RunOptions::passive());
        assert_eq!(sequencer.state(), MachineState::Waiting);

        sequencer.set_running(true);

        assert_eq!(sequencer.state(), MachineState::Running { index: 0 });
        assert_eq!(sequencer.phase(), Some("x"));
    }

    #[test]
    fn enabling_running_mid_run_only_affects_future_end() {
        let (ended, options) = counter();
        let sequencer = Sequencer::new(vec!["x", "y"], options);
        sequencer.set_running(false);
        sequencer.set_running(true);

        assert_eq!(sequencer.state(), MachineState::Running { index: 0 });
        sequencer.advance();
        sequencer.advance();
        assert_eq!(ended.get(), 1);
    }

    #[test]
    fn enabling_running_after_end_does_not_renotify() {
        let (ended, options) = counter();
        let sequencer = Sequencer::new(vec!["x"], options);
        sequencer.advance();
        assert_eq!(ended.get(), 1);

        sequencer.set_running(false);
        sequencer.set_running(true);

        assert_eq!(sequencer.state(), MachineState::Ended);
        assert_eq!(ended.get(), 1);
    }

    #[test]
    fn rearm_restarts_a_running_sequencer() {
        let (ended, options) = counter();
        let sequencer = Sequencer::new(vec!["a", "b"], options);
        let first_run = sequencer.run_id();
        sequencer.advance();
        sequencer.advance();

        sequencer.rearm().unwrap();

        assert_eq!(sequencer.state(), MachineState::Running { index: 0 });
        assert_ne!(sequencer.run_id(), first_run);
        sequencer.advance();
        sequencer.advance();
        assert_eq!(ended.get(), 2);
    }

    #[test]
    fn rearm_keeps_passive_sequencer_waiting() {
        let sequencer = Sequencer::new(vec!["a"], RunOptions::new());
        sequencer.advance();
        sequencer.set_running(false);

        sequencer.rearm().unwrap();

        assert_eq!(sequencer.state(), MachineState::Waiting);
    }

    #[test]
    fn rearm_before_end_is_rejected() {
        let sequencer = Sequencer::new(vec!["a", "b"], RunOptions::new());

        let err = sequencer.rearm().unwrap_err();

        assert_eq!(
            err,
            SequenceError::InvalidTransition {
                event: Event::Rearm,
                state: MachineState::Running { index: 0 },
            }
        );
        assert_eq!(sequencer.state(), MachineState::Running { index: 0 });
    }

    #[test]
    fn callback_may_rearm_from_inside_on_end() {
        let calls = Rc::new(Cell::new(0));
        let slot: Rc<RefCell<Option<Sequencer<&str>>>> = Rc::new(RefCell::new(None));

        let inner_calls = Rc::clone(&calls);
        let inner_slot = Rc::clone(&slot);
        let options = RunOptions::new().on_end(move || {
            inner_calls.set(inner_calls.get() + 1);
            if inner_calls.get() == 1 {
                if let Some(sequencer) = inner_slot.borrow().as_ref() {
                    sequencer.rearm().unwrap();
                }
            }
        });

        *slot.borrow_mut() = Some(Sequencer::new(vec!["a"], options));
        let borrowed = slot.borrow();
        let sequencer = borrowed.as_ref().unwrap();

        sequencer.advance();
        assert_eq!(calls.get(), 1);
        assert_eq!(sequencer.state(), MachineState::Running { index: 0 });

        sequencer.advance();
        assert_eq!(calls.get(), 2);
        assert_eq!(sequencer.state(), MachineState::Ended);
    }

    #[test]
    fn advance_handles_are_identity_stable() {
        let sequencer = Sequencer::new(vec!["a", "b", "c"], RunOptions::new());
        let first = sequencer.advance_handle();
        sequencer.replace_sequence(vec!["d", "e"]);
        let second = sequencer.advance_handle();

        assert_eq!(first, second);
        first.call();
        assert_eq!(sequencer.phase(), Some("e"));

        let other = Sequencer::new(vec!["a"], RunOptions::new());
        assert_ne!(first, other.advance_handle());
    }

    #[test]
    fn handle_outliving_sequencer_is_a_no_op() {
        let sequencer = Sequencer::new(vec![1, 2, 3], RunOptions::new());
        let handle = sequencer.advance_handle();
        drop(sequencer);

        assert!(!handle.is_attached());
        handle.call();
    }

    #[test]
    fn replace_sequence_starts_a_fresh_machine() {
        let (ended, options) = counter();
        let sequencer = Sequencer::new(vec!["a", "b"], options);
        sequencer.advance();
        let old_run = sequencer.run_id();

        sequencer.replace_sequence(vec!["x", "y", "z"]);

        assert_eq!(sequencer.phase(), Some("x"));
        assert_ne!(sequencer.run_id(), old_run);
        assert!(sequencer.history().transitions().is_empty());
        assert_eq!(sequencer.sequence().len(), 3);
        assert_eq!(ended.get(), 0);
    }

    #[test]
    fn replace_with_empty_sequence_notifies_immediately() {
        let (ended, options) = counter();
        let sequencer = Sequencer::new(vec!["a"], options);

        sequencer.replace_sequence(Vec::<&str>::new());

        assert_eq!(sequencer.state(), MachineState::Ended);
        assert_eq!(ended.get(), 1);
    }

    #[test]
    fn history_records_each_committed_transition() {
        let sequencer = Sequencer::new(vec!["a", "b"], RunOptions::new());
        sequencer.advance();
        sequencer.advance();

        let history = sequencer.history();
        let path: Vec<MachineState> = history.get_path().into_iter().copied().collect();
        assert_eq!(
            path,
            vec![
                MachineState::Running { index: 0 },
                MachineState::Running { index: 1 },
                MachineState::Ended,
            ]
        );
        assert_eq!(history.completed_runs(), 1);
        assert!(history
            .transitions()
            .iter()
            .all(|t| t.run == sequencer.run_id()));
    }

    #[test]
    fn set_options_swaps_callback() {
        let (first, first_options) = counter();
        let (second, second_options) = counter();
        let sequencer = Sequencer::new(vec!["a"], first_options);

        sequencer.set_options(second_options);
        sequencer.advance();

        assert_eq!(first.get(), 0);
        assert_eq!(second.get(), 1);
    }

    #[test]
    fn advance_still_moves_after_running_is_turned_off() {
        let (ended, options) = counter();
        let sequencer = Sequencer::new(vec!["a", "b", "c"], options);

        sequencer.set_running(false);
        sequencer.advance();

        assert_eq!(sequencer.state(), MachineState::Running { index: 1 });
        assert_eq!(sequencer.phase(), Some("b"));

        sequencer.advance();
        sequencer.advance();

        assert_eq!(sequencer.state(), MachineState::Ended);
        assert_eq!(ended.get(), 0);
    }

    #[test]
    fn rearm_starts_a_fresh_log() {
        let sequencer = Sequencer::new(vec![1, 2], RunOptions::new());

        for _ in 0..1000 {
            sequencer.advance();
            sequencer.advance();
            sequencer.rearm().unwrap();
        }

        let history = sequencer.history();
        assert_eq!(history.transitions().len(), 2);
        assert_eq!(history.transitions()[0].event, Event::Rearm);
        assert_eq!(history.transitions()[1].event, Event::Start);
        assert!(history
            .transitions()
            .iter()
            .all(|t| t.run == sequencer.run_id()));
        assert_eq!(history.completed_runs(), 0);

        sequencer.advance();
        sequencer.advance();
        assert_eq!(sequencer.history().transitions().len(), 4);
        assert_eq!(sequencer.history().completed_runs(), 1);
    }
}
