//! Mirror state machine.
//!
//! A mirror walks `Down → Starting → Up → Ready → HasData` on a timer,
//! with `Stopping → Stopped` reachable from any live state via planned
//! shrink or random crash. Per-state durations are sampled once at
//! creation; the machine itself never consults the RNG.

use std::collections::{BTreeMap, BTreeSet};

use replimesh_types::{DataPackage, LinkId, MirrorId, MirrorState};

/// One node of the overlay.
#[derive(Debug, Clone)]
pub struct Mirror {
    id: MirrorId,
    created_at: u64,
    state: MirrorState,
    /// Tick the current state was entered.
    state_since: u64,
    startup_ticks: u64,
    ready_ticks: u64,
    stop_ticks: u64,
    root: bool,
    data: Option<DataPackage>,
    links: BTreeSet<LinkId>,
    /// Sparse per-tick received-bytes history.
    received_history: BTreeMap<u64, u64>,
}

impl Mirror {
    pub(crate) fn new(
        id: MirrorId,
        tick: u64,
        startup_ticks: u64,
        ready_ticks: u64,
        stop_ticks: u64,
        root: bool,
    ) -> Self {
        Self {
            id,
            created_at: tick,
            state: MirrorState::Down,
            state_since: tick,
            startup_ticks,
            ready_ticks,
            stop_ticks,
            root,
            data: None,
            links: BTreeSet::new(),
            received_history: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> MirrorId {
        self.id
    }

    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    pub fn state(&self) -> MirrorState {
        self.state
    }

    pub fn is_root(&self) -> bool {
        self.root
    }

    pub fn data(&self) -> Option<&DataPackage> {
        self.data.as_ref()
    }

    /// Units received so far; 0 for a mirror without a package.
    pub fn received(&self) -> u64 {
        self.data.as_ref().map_or(0, DataPackage::received)
    }

    pub fn links(&self) -> &BTreeSet<LinkId> {
        &self.links
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn received_history(&self) -> &BTreeMap<u64, u64> {
        &self.received_history
    }

    pub(crate) fn seed_data(&mut self, package: DataPackage) {
        self.data = Some(package);
    }

    pub(crate) fn attach_link(&mut self, link: LinkId) {
        self.links.insert(link);
    }

    pub(crate) fn detach_link(&mut self, link: LinkId) {
        self.links.remove(&link);
    }

    fn enter(&mut self, state: MirrorState, tick: u64) {
        debug_assert!(self.state <= state, "mirror state must be monotone");
        self.state = state;
        self.state_since = tick;
    }

    fn elapsed(&self, tick: u64) -> u64 {
        tick.saturating_sub(self.state_since)
    }

    /// Advances the state machine by one tick.
    pub(crate) fn advance(&mut self, tick: u64) {
        match self.state {
            MirrorState::Down => self.enter(MirrorState::Starting, tick),
            MirrorState::Starting => {
                if self.elapsed(tick) >= self.startup_ticks {
                    self.enter(MirrorState::Up, tick);
                }
            }
            MirrorState::Up => {
                if self.elapsed(tick) >= self.ready_ticks {
                    self.enter(MirrorState::Ready, tick);
                    // The package may have filled up while still `Up`.
                    self.check_data_complete(tick);
                }
            }
            MirrorState::Ready => self.check_data_complete(tick),
            MirrorState::HasData => {}
            MirrorState::Stopping => {
                if self.elapsed(tick) >= self.stop_ticks {
                    self.enter(MirrorState::Stopped, tick);
                }
            }
            MirrorState::Stopped => {}
        }
    }

    fn check_data_complete(&mut self, tick: u64) {
        if self.state == MirrorState::Ready
            && self.data.as_ref().is_some_and(DataPackage::is_complete)
        {
            self.enter(MirrorState::HasData, tick);
        }
    }

    /// Begins shutdown. A no-op once the mirror is already stopping.
    pub(crate) fn begin_shutdown(&mut self, tick: u64) {
        if !self.state.is_stopping_or_stopped() {
            self.enter(MirrorState::Stopping, tick);
        }
    }

    /// Accepts up to `amount` units of payload, installing a package of
    /// `total_size` on first contact. Returns the amount delivered.
    pub(crate) fn deliver(&mut self, tick: u64, amount: u64, total_size: u64) -> u64 {
        let package = self.data.get_or_insert_with(|| DataPackage::new(total_size));
        let delivered = package.deliver(amount);
        if delivered > 0 {
            *self.received_history.entry(tick).or_insert(0) += delivered;
            self.check_data_complete(tick);
        }
        delivered
    }
}
