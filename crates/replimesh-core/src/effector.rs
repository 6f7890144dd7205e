//! The effector: a tick-keyed queue of pending control actions.
//!
//! Actions are applied by the network at their scheduled tick, FIFO
//! within a tick. Scheduling returns a handle that can cancel the action
//! any time before application; cancelling an applied or unknown handle
//! is a silent no-op.

use std::collections::BTreeMap;

use replimesh_types::ActionId;

use crate::topology::StrategyKind;

/// A control action against the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Grow or shrink the fleet to the given mirror count.
    MirrorChange { target: usize },
    /// Change the target links-per-mirror, restarting the topology.
    TargetLinkChange { links_per_mirror: usize },
    /// Swap the active topology strategy.
    TopologyChange { kind: StrategyKind },
}

/// An action waiting in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledAction {
    pub id: ActionId,
    pub tick: u64,
    pub action: Action,
}

/// Tick-keyed FIFO action queue.
#[derive(Debug, Default)]
pub struct Effector {
    queue: BTreeMap<u64, Vec<ScheduledAction>>,
}

impl Effector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues `action` for `tick` under the given handle.
    pub fn schedule(&mut self, id: ActionId, action: Action, tick: u64) -> ActionId {
        self.queue
            .entry(tick)
            .or_default()
            .push(ScheduledAction { id, tick, action });
        id
    }

    /// Removes a pending action. No-op for applied or unknown handles.
    pub fn cancel(&mut self, id: ActionId) {
        for pending in self.queue.values_mut() {
            pending.retain(|a| a.id != id);
        }
        self.queue.retain(|_, pending| !pending.is_empty());
    }

    /// Drains everything due at or before `tick`, in (tick, insertion)
    /// order. Draining past-due entries keeps skipped ticks from
    /// stranding actions.
    pub fn drain_due(&mut self, tick: u64) -> Vec<ScheduledAction> {
        let later = self.queue.split_off(&(tick + 1));
        let due = std::mem::replace(&mut self.queue, later);
        due.into_values().flatten().collect()
    }

    /// The pending action with the given handle, if not yet applied.
    pub fn pending(&self, id: ActionId) -> Option<&ScheduledAction> {
        self.queue.values().flatten().find(|a| a.id == id)
    }

    pub fn pending_count(&self) -> usize {
        self.queue.values().map(Vec::len).sum()
    }

    /// Next tick with work queued.
    pub fn next_scheduled_tick(&self) -> Option<u64> {
        self.queue.keys().next().copied()
    }
}
