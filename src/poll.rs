//! Read-mutate-write poll loop.
//!
//! A [`Poller`] drives a [`TagRegistry`] through repeated cycles:
//!
//! 1. read every tag, in registration order
//! 2. decode each tag into a [`Snapshot`]
//! 3. ask the [`UpdateRule`] for the next values (pure computation)
//! 4. encode the updates and write the updated tags
//!
//! # States
//!
//! | State | Left when |
//! |-------|-----------|
//! | [`PollState::Running`] | shutdown is requested, the cycle limit is hit, or a tag operation fails |
//! | [`PollState::Stopping`] | every handle has been destroyed |
//! | [`PollState::Stopped`] | terminal |
//!
//! Failed reads and writes are not retried. The first failure stops the run,
//! all handles are released, and the error is returned. A failed read means
//! nothing is written in that cycle.
//!
//! Shutdown is cooperative: the [`ShutdownToken`] is checked at the top of
//! every cycle, so a call already blocked in the engine finishes (or times
//! out) first.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::engine::TagEngine;
use crate::error::{Result, TagError};
use crate::registry::{TagRegistry, TagSpec};
use crate::value::{TagKind, TagValue};

/// Cancellation token shared between the poll loop and whoever stops it.
///
/// # Example
///
/// ```
/// use plctag_client::ShutdownToken;
///
/// let token = ShutdownToken::new();
/// let handle = token.clone();
/// assert!(!token.is_requested());
///
/// handle.request();
/// assert!(token.is_requested());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ShutdownToken(Arc<AtomicBool>);

impl ShutdownToken {
    /// Creates a token with no shutdown requested.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a graceful stop.
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns whether a stop was requested.
    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// The underlying flag, for registration with signal handlers.
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.0)
    }
}

/// Poll loop state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PollState {
    /// Cycles are being executed.
    Running,
    /// Tearing down after a shutdown request or a failure.
    Stopping,
    /// Every handle has been released.
    Stopped,
}

impl std::fmt::Display for PollState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PollState::Running => write!(f, "RUNNING"),
            PollState::Stopping => write!(f, "STOPPING"),
            PollState::Stopped => write!(f, "STOPPED"),
        }
    }
}

/// Decoded values of every tag at one point of a cycle, in registration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    values: Vec<(String, TagValue)>,
}

impl Snapshot {
    /// Decodes the first element of every registered tag.
    pub fn capture<E: TagEngine + ?Sized>(registry: &TagRegistry<'_, E>) -> Self {
        let values = registry
            .entries()
            .map(|entry| {
                let value = entry.kind().decode(registry.engine(), entry.handle(), 0);
                (entry.name().to_string(), value)
            })
            .collect();
        Self { values }
    }

    /// Returns the value of `name`, if it was captured.
    pub fn get(&self, name: &str) -> Option<&TagValue> {
        self.values
            .iter()
            .find(|(tag, _)| tag == name)
            .map(|(_, value)| value)
    }

    /// Iterates over `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TagValue)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Number of captured tags.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns whether nothing was captured.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, TagValue)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (String, TagValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Computes the values to write from the values just read.
///
/// Implementations must not perform I/O; they only see the snapshot.
pub trait UpdateRule {
    /// Returns the `(tag, value)` pairs to write in cycle `cycle`, in write order.
    fn next(&mut self, cycle: u64, snapshot: &Snapshot) -> Vec<(String, TagValue)>;
}

impl<F> UpdateRule for F
where
    F: FnMut(u64, &Snapshot) -> Vec<(String, TagValue)>,
{
    fn next(&mut self, cycle: u64, snapshot: &Snapshot) -> Vec<(String, TagValue)> {
        self(cycle, snapshot)
    }
}

/// Outcome of a run that ended without a tag failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollReport {
    /// Completed cycles.
    pub cycles: u64,
    /// Handles destroyed during teardown.
    pub destroyed: usize,
}

/// Drives a registry through read-mutate-write cycles.
pub struct Poller<'e, E: TagEngine + ?Sized, R: UpdateRule> {
    registry: TagRegistry<'e, E>,
    rule: R,
    token: ShutdownToken,
    state: PollState,
    cycles: u64,
    max_cycles: Option<u64>,
    interval: Duration,
}

impl<'e, E: TagEngine + ?Sized, R: UpdateRule> Poller<'e, E, R> {
    /// Creates a poller that runs until `token` is requested or a tag fails.
    pub fn new(registry: TagRegistry<'e, E>, rule: R, token: ShutdownToken) -> Self {
        Self {
            registry,
            rule,
            token,
            state: PollState::Running,
            cycles: 0,
            max_cycles: None,
            interval: Duration::ZERO,
        }
    }

    /// Stops after `max_cycles` completed cycles.
    pub fn with_max_cycles(mut self, max_cycles: u64) -> Self {
        self.max_cycles = Some(max_cycles);
        self
    }

    /// Sleeps `interval` between cycles (default is no pause).
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Current state.
    pub fn state(&self) -> PollState {
        self.state
    }

    /// Completed cycles so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// The registry being polled.
    pub fn registry(&self) -> &TagRegistry<'e, E> {
        &self.registry
    }

    /// Runs cycles until stopped, then destroys every handle exactly once.
    ///
    /// # Errors
    ///
    /// Returns the first tag failure, after teardown has completed.
    pub fn run(mut self) -> Result<PollReport> {
        log::info!("polling {} tags", self.registry.len());

        let mut failure = None;
        while self.state == PollState::Running {
            if self.token.is_requested() {
                log::info!("shutdown requested after {} cycles", self.cycles);
                self.transition(PollState::Stopping);
                break;
            }
            if self.max_cycles.is_some_and(|max| self.cycles >= max) {
                self.transition(PollState::Stopping);
                break;
            }

            if let Err(err) = self.run_cycle() {
                failure = Some(err);
                break;
            }

            if !self.interval.is_zero() {
                std::thread::sleep(self.interval);
            }
        }

        let cycles = self.cycles;
        let destroyed = self.registry.close_all();
        log::info!("{}: destroyed {} tags after {} cycles", PollState::Stopped, destroyed, cycles);

        match failure {
            Some(err) => Err(err),
            None => Ok(PollReport { cycles, destroyed }),
        }
    }

    /// Executes one read-decode-compute-encode-write cycle.
    ///
    /// On failure the poller moves to [`PollState::Stopping`]; further cycles
    /// are refused with the same kind of error the engine would give.
    pub fn run_cycle(&mut self) -> Result<()> {
        if self.state != PollState::Running {
            return Err(TagError::invalid_parameter(
                "state",
                format!("poller is {}", self.state),
            ));
        }

        let result = self.cycle();
        if result.is_err() {
            self.transition(PollState::Stopping);
        }
        result
    }

    fn cycle(&mut self) -> Result<()> {
        let cycle = self.cycles;
        log::debug!("cycle {}: reading tags", cycle);
        self.registry.read_all()?;

        let snapshot = Snapshot::capture(&self.registry);
        for (name, value) in snapshot.iter() {
            log::debug!("- read tag \"{}\" data: {}", name, value);
        }

        let updates = self.rule.next(cycle, &snapshot);
        log::debug!("cycle {}: writing {} tags", cycle, updates.len());
        for (name, value) in &updates {
            log::debug!("- setting tag {} to {}", name, value);
            self.registry.set_value(name, value)?;
        }
        self.registry
            .write_tags(updates.iter().map(|(name, _)| name.as_str()))?;

        self.cycles += 1;
        Ok(())
    }

    fn transition(&mut self, to: PollState) {
        log::debug!("poller {} -> {}", self.state, to);
        self.state = to;
    }
}

impl<E: TagEngine + ?Sized, R: UpdateRule> std::fmt::Debug for Poller<'_, E, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("registry", &self.registry)
            .field("state", &self.state)
            .field("cycles", &self.cycles)
            .field("max_cycles", &self.max_cycles)
            .field("interval", &self.interval)
            .finish()
    }
}

/// Update rule of the modbot station.
///
/// Every cycle it rotates `Mode` through 0, 1, 2, increments `State`, and
/// formats new `FaultMessage` and `StateName` strings from the cycle number.
/// `SequenceName` and `SequenceRun` are only read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModbotRule {
    mode: u16,
    state: u16,
}

impl ModbotRule {
    /// String tag carrying the fault text.
    pub const FAULT_MESSAGE: &'static str = "FaultMessage";
    /// Mode word, rotated through [`ModbotRule::MODE_COUNT`] values.
    pub const MODE: &'static str = "Mode";
    /// Name of the running sequence.
    pub const SEQUENCE_NAME: &'static str = "SequenceName";
    /// Sequence run flag.
    pub const SEQUENCE_RUN: &'static str = "SequenceRun";
    /// State counter.
    pub const STATE: &'static str = "State";
    /// Name of the current state.
    pub const STATE_NAME: &'static str = "StateName";
    /// Number of distinct modes.
    pub const MODE_COUNT: u16 = 3;

    /// Creates the rule with mode and state at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tags the rule reads and writes.
    pub fn tag_specs() -> Vec<TagSpec> {
        vec![
            TagSpec::new(Self::FAULT_MESSAGE, TagKind::String),
            TagSpec::new(Self::MODE, TagKind::U16),
            TagSpec::new(Self::SEQUENCE_NAME, TagKind::String),
            TagSpec::new(Self::SEQUENCE_RUN, TagKind::U8),
            TagSpec::new(Self::STATE, TagKind::U16),
            TagSpec::new(Self::STATE_NAME, TagKind::String),
        ]
    }
}

impl UpdateRule for ModbotRule {
    fn next(&mut self, cycle: u64, _snapshot: &Snapshot) -> Vec<(String, TagValue)> {
        self.mode = (self.mode + 1) % Self::MODE_COUNT;
        self.state = self.state.wrapping_add(1);

        vec![
            (
                Self::FAULT_MESSAGE.to_string(),
                TagValue::String(format!("this is a fault message ({cycle})")),
            ),
            (Self::MODE.to_string(), TagValue::U16(self.mode)),
            (Self::STATE.to_string(), TagValue::U16(self.state)),
            (
                Self::STATE_NAME.to_string(),
                TagValue::String(format!("State{cycle}")),
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ConnectionConfig;
    use crate::engine::StatusCode;
    use crate::error::Operation;
    use crate::sim::{SimOperation, SimulatedEngine};

    fn counters() -> Vec<TagSpec> {
        ["A", "B", "C"]
            .iter()
            .map(|name| TagSpec::new(*name, TagKind::U16))
            .collect()
    }

    fn increment_all(_cycle: u64, snapshot: &Snapshot) -> Vec<(String, TagValue)> {
        snapshot
            .iter()
            .map(|(name, value)| {
                let next = value.as_u16().unwrap_or(0).wrapping_add(1);
                (name.to_string(), TagValue::U16(next))
            })
            .collect()
    }

    #[test]
    fn test_shutdown_token_shared_flag() {
        let token = ShutdownToken::new();
        let flag = token.flag();
        flag.store(true, Ordering::SeqCst);
        assert!(token.is_requested());
    }

    #[test]
    fn test_runs_until_max_cycles() {
        let mut engine = SimulatedEngine::new();
        let config = ConnectionConfig::default();
        let registry = TagRegistry::open_all(&mut engine, &config, &counters()).unwrap();

        let report = Poller::new(registry, increment_all, ShutdownToken::new())
            .with_max_cycles(5)
            .run()
            .unwrap();

        assert_eq!(report, PollReport { cycles: 5, destroyed: 3 });
        assert_eq!(engine.controller_memory("B"), Some(&5u16.to_le_bytes()[..]));
        assert_eq!(engine.live_handles(), 0);
    }

    #[test]
    fn test_requested_shutdown_stops_before_first_cycle() {
        let mut engine = SimulatedEngine::new();
        let config = ConnectionConfig::default();
        let registry = TagRegistry::open_all(&mut engine, &config, &counters()).unwrap();
        let token = ShutdownToken::new();
        token.request();

        let report = Poller::new(registry, increment_all, token).run().unwrap();

        assert_eq!(report.cycles, 0);
        assert_eq!(report.destroyed, 3);
        assert!(engine.reads().is_empty());
        assert_eq!(engine.destroyed().len(), 3);
    }

    #[test]
    fn test_shutdown_observed_at_cycle_boundary() {
        let mut engine = SimulatedEngine::new();
        let config = ConnectionConfig::default();
        let registry = TagRegistry::open_all(&mut engine, &config, &counters()).unwrap();
        let token = ShutdownToken::new();
        let stopper = token.clone();

        let rule = move |cycle: u64, snapshot: &Snapshot| {
            if cycle == 1 {
                stopper.request();
            }
            increment_all(cycle, snapshot)
        };
        let report = Poller::new(registry, rule, token).run().unwrap();

        // The cycle that saw the request still completes its writes.
        assert_eq!(report.cycles, 2);
        assert_eq!(engine.writes().len(), 6);
    }

    #[test]
    fn test_read_failure_skips_writes_and_tears_down() {
        let mut engine = SimulatedEngine::new();
        engine.fail_read("B", StatusCode::ERR_BAD_CONNECTION);
        let config = ConnectionConfig::default();
        let registry = TagRegistry::open_all(&mut engine, &config, &counters()).unwrap();

        let err = Poller::new(registry, increment_all, ShutdownToken::new())
            .run()
            .unwrap_err();

        assert_eq!(err.tag(), Some("B"));
        assert!(matches!(
            err,
            TagError::Status {
                operation: Operation::Read,
                code: StatusCode::ERR_BAD_CONNECTION,
                ..
            }
        ));
        assert_eq!(engine.reads(), ["A", "B"]);
        assert!(engine.writes().is_empty());
        assert_eq!(engine.destroyed(), ["A", "B", "C"]);
        assert_eq!(engine.live_handles(), 0);
    }

    #[test]
    fn test_write_failure_halts_remaining_writes() {
        let mut engine = SimulatedEngine::new();
        engine.inject_fault_after("B", SimOperation::Write, 1, StatusCode::ERR_TIMEOUT);
        let config = ConnectionConfig::default();
        let registry = TagRegistry::open_all(&mut engine, &config, &counters()).unwrap();

        let err = Poller::new(registry, increment_all, ShutdownToken::new())
            .run()
            .unwrap_err();

        assert!(matches!(err, TagError::Timeout { operation: Operation::Write, .. }));
        assert_eq!(engine.writes(), ["A", "B", "C", "A", "B"]);
        assert_eq!(engine.destroyed().len(), 3);
    }

    #[test]
    fn test_run_cycle_refused_after_failure() {
        let mut engine = SimulatedEngine::new();
        engine.fail_read("A", StatusCode::ERR_READ);
        let config = ConnectionConfig::default();
        let registry = TagRegistry::open_all(&mut engine, &config, &counters()).unwrap();
        let mut poller = Poller::new(registry, increment_all, ShutdownToken::new());

        assert_eq!(poller.state(), PollState::Running);
        assert!(poller.run_cycle().is_err());
        assert_eq!(poller.state(), PollState::Stopping);
        assert!(matches!(
            poller.run_cycle(),
            Err(TagError::InvalidParameter { .. })
        ));
        assert_eq!(poller.cycles(), 0);
    }

    #[test]
    fn test_unknown_update_target_is_an_error() {
        let mut engine = SimulatedEngine::new();
        let config = ConnectionConfig::default();
        let registry = TagRegistry::open_all(&mut engine, &config, &counters()).unwrap();
        let rule = |_: u64, _: &Snapshot| vec![("Z".to_string(), TagValue::U16(1))];

        assert!(Poller::new(registry, rule, ShutdownToken::new()).run().is_err());
        assert!(engine.writes().is_empty());
        assert_eq!(engine.live_handles(), 0);
    }

    #[test]
    fn test_modbot_rule_sequence() {
        let mut rule = ModbotRule::new();
        let snapshot = Snapshot::default();

        let modes: Vec<_> = (0..4)
            .map(|cycle| rule.next(cycle, &snapshot)[1].1.clone())
            .collect();
        assert_eq!(modes, [1u16, 2, 0, 1].map(TagValue::U16).to_vec());

        let updates = rule.next(4, &snapshot);
        let names: Vec<_> = updates.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, ["FaultMessage", "Mode", "State", "StateName"]);
        assert_eq!(updates[0].1, TagValue::from("this is a fault message (4)"));
        assert_eq!(updates[2].1, TagValue::U16(5));
        assert_eq!(updates[3].1, TagValue::from("State4"));
    }

    #[test]
    fn test_modbot_rule_state_wraps() {
        let mut rule = ModbotRule {
            mode: 0,
            state: u16::MAX,
        };
        let updates = rule.next(0, &Snapshot::default());
        assert_eq!(updates[2].1, TagValue::U16(0));
    }

    #[test]
    fn test_snapshot_capture() {
        let mut engine = SimulatedEngine::new();
        engine.preload("A", &7u16.to_le_bytes());
        let config = ConnectionConfig::default();
        let mut registry = TagRegistry::open_all(&mut engine, &config, &counters()).unwrap();
        registry.read_all().unwrap();

        let snapshot = Snapshot::capture(&registry);
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.get("A"), Some(&TagValue::U16(7)));
        assert_eq!(snapshot.get("C"), Some(&TagValue::U16(0)));
        assert_eq!(snapshot.get("Z"), None);
    }
}
