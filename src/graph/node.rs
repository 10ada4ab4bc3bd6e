//! Common node state and the node contract.
//!
//! Every graph node - module, type, member, parameter - shares the same small core:
//! an identity key, a monotonic build state machine, a lazily computed inclusion
//! flag and a list of faults raised against the node. [`NodeState`] bundles that
//! core; [`GraphNode`] is the contract batch processing works against.
//!
//! # Build State Machine
//!
//! The build state moves `NotStarted -> Building -> Built`, single-writer-wins.
//! The intermediate `Building` state exists so recursive self-reference during a
//! build observes the same partially-built node instead of deadlocking or looping:
//! a re-entrant [`NodeState::begin`] reports [`BuildClaim::InProgress`] and the
//! caller proceeds with whatever edges are already populated.

use std::sync::{
    atomic::{AtomicU8, Ordering},
    Arc, OnceLock,
};

use strum::{Display, EnumIter};

use crate::graph::{
    diagnostics::{Fault, Faults},
    identity::NodeKey,
    registry::NodeRegistry,
};

/// The kind of entity a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum NodeKind {
    /// A binary module.
    Module,
    /// A type, any flavor.
    Type,
    /// A field.
    Field,
    /// A method.
    Method,
    /// A property.
    Property,
    /// An event.
    Event,
    /// A method parameter.
    Parameter,
}

/// Build progress of a node, monotonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BuildState {
    /// The build step has not run.
    NotStarted = 0,
    /// The build step is running; edges are partially populated.
    Building = 1,
    /// The build step has completed.
    Built = 2,
}

/// Outcome of attempting to claim a node's build step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildClaim {
    /// The caller claimed the build and must run it.
    Claimed,
    /// Another caller (possibly this thread, re-entrantly) is mid-build.
    InProgress,
    /// The build already completed.
    Done,
}

/// The state shared by every node kind: build progress, inclusion and faults.
///
/// Faults raised through a node's state land both in the node-local list and in
/// the session-wide sink, so "what went wrong here" and "what went wrong at all"
/// are both answerable without re-scanning.
pub struct NodeState {
    build: AtomicU8,
    included: OnceLock<bool>,
    faults: boxcar::Vec<Fault>,
    sink: Arc<Faults>,
}

impl NodeState {
    /// Create state for a new node.
    #[must_use]
    pub fn new(sink: Arc<Faults>) -> Self {
        NodeState {
            build: AtomicU8::new(BuildState::NotStarted as u8),
            included: OnceLock::new(),
            faults: boxcar::Vec::new(),
            sink,
        }
    }

    /// Create state for a node that is permanently excluded (the Null sentinel).
    #[must_use]
    pub fn excluded(sink: Arc<Faults>) -> Self {
        let state = NodeState::new(sink);
        state.included.set(false).ok();
        state
    }

    /// Attempt to claim the build step. At most one caller per session observes
    /// [`BuildClaim::Claimed`].
    pub fn begin(&self) -> BuildClaim {
        match self.build.compare_exchange(
            BuildState::NotStarted as u8,
            BuildState::Building as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => BuildClaim::Claimed,
            Err(current) if current == BuildState::Built as u8 => BuildClaim::Done,
            Err(_) => BuildClaim::InProgress,
        }
    }

    /// Re-open the build step outside the idempotence guard, for forced rebuilds.
    pub fn force(&self) {
        self.build
            .store(BuildState::Building as u8, Ordering::Release);
    }

    /// Mark the build step complete.
    pub fn finish(&self) {
        self.build.store(BuildState::Built as u8, Ordering::Release);
    }

    /// Current build state.
    pub fn build_state(&self) -> BuildState {
        match self.build.load(Ordering::Acquire) {
            0 => BuildState::NotStarted,
            1 => BuildState::Building,
            _ => BuildState::Built,
        }
    }

    /// Returns `true` once the build step has completed.
    pub fn is_built(&self) -> bool {
        self.build_state() == BuildState::Built
    }

    /// Compute the inclusion flag once; later calls return the first result.
    /// Once excluded, permanently excluded.
    pub fn included_with(&self, evaluate: impl FnOnce() -> bool) -> bool {
        *self.included.get_or_init(evaluate)
    }

    /// The inclusion flag, if it has been computed.
    pub fn included(&self) -> Option<bool> {
        self.included.get().copied()
    }

    /// Record a fault against this node and in the session sink.
    pub fn raise(&self, fault: Fault) {
        self.faults.push(fault.clone());
        self.sink.raise(fault);
    }

    /// Snapshot of the faults raised against this node.
    pub fn faults(&self) -> Vec<Fault> {
        self.faults.iter().map(|(_, f)| f.clone()).collect()
    }

    /// The session-wide sink this node reports into.
    pub fn sink(&self) -> &Arc<Faults> {
        &self.sink
    }
}

/// The contract every graph node implements.
///
/// Batch processing, back-reference sets and downstream reporting all work against
/// this trait rather than concrete node types.
pub trait GraphNode: Send + Sync {
    /// The node's unique identity key.
    fn node_key(&self) -> &NodeKey;

    /// The kind of entity this node represents.
    fn kind(&self) -> NodeKind;

    /// The node's shared state.
    fn state(&self) -> &NodeState;

    /// Run the node's build step. Idempotent: the resolution work executes at most
    /// once per session, and re-entrant calls return immediately.
    fn build(&self, registry: &NodeRegistry);

    /// Whether the node belongs to a platform/standard-library module.
    fn is_system(&self) -> bool {
        false
    }
}
