//! The mirror/link arena.
//!
//! [`Fleet`] owns both entity arenas plus the deterministic RNG and the
//! id allocator. All graph references are id handles into the arenas;
//! nothing holds owning references across entities. Topology strategies
//! mutate the graph exclusively through this type, which is what keeps
//! pair-uniqueness and the link/mirror membership invariants in one
//! place.
//!
//! Iteration over either arena is in ascending id order, which together
//! with the seeded RNG makes every run reproducible.

use std::collections::{BTreeMap, HashMap};

use replimesh_config::TimingConfig;
use replimesh_types::{DataPackage, IdAllocator, LinkId, MirrorId, MirrorState};

use crate::error::{Result, TopologyError};
use crate::link::{Link, LinkKey};
use crate::mirror::Mirror;
use crate::rng::SimRng;

pub struct Fleet {
    mirrors: BTreeMap<MirrorId, Mirror>,
    links: BTreeMap<LinkId, Link>,
    /// Unordered-pair index; enforces one link per endpoint pair.
    by_endpoints: HashMap<LinkKey, LinkId>,
    ids: IdAllocator,
    rng: SimRng,
    timing: TimingConfig,
    /// Size of the replicated payload, seeded complete on the root.
    file_size: u64,
    target_links_per_mirror: usize,
    root: Option<MirrorId>,
}

impl Fleet {
    pub fn new(timing: TimingConfig, seed: u64, file_size: u64, links_per_mirror: usize) -> Self {
        Self {
            mirrors: BTreeMap::new(),
            links: BTreeMap::new(),
            by_endpoints: HashMap::new(),
            ids: IdAllocator::new(),
            rng: SimRng::new(seed),
            timing,
            file_size,
            target_links_per_mirror: links_per_mirror,
            root: None,
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn target_links_per_mirror(&self) -> usize {
        self.target_links_per_mirror
    }

    pub fn set_target_links_per_mirror(&mut self, links_per_mirror: usize) {
        self.target_links_per_mirror = links_per_mirror;
    }

    pub fn root_id(&self) -> Option<MirrorId> {
        self.root
    }

    pub fn mirror(&self, id: MirrorId) -> Option<&Mirror> {
        self.mirrors.get(&id)
    }

    pub fn mirrors(&self) -> impl Iterator<Item = &Mirror> {
        self.mirrors.values()
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(&id)
    }

    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    pub fn link_between(&self, a: MirrorId, b: MirrorId) -> Option<LinkId> {
        self.by_endpoints.get(&LinkKey::new(a, b)).copied()
    }

    /// Mirrors that have not begun shutdown, in ascending id order.
    pub fn live_mirror_ids(&self) -> Vec<MirrorId> {
        self.mirrors
            .values()
            .filter(|m| !m.state().is_stopping_or_stopped())
            .map(Mirror::id)
            .collect()
    }

    /// Count of mirrors that have not begun shutdown.
    pub fn live_mirror_count(&self) -> usize {
        self.mirrors
            .values()
            .filter(|m| !m.state().is_stopping_or_stopped())
            .count()
    }

    /// Count of mirrors still present in the arena (everything not yet
    /// swept, including stopping ones).
    pub fn present_mirror_count(&self) -> usize {
        self.mirrors.len()
    }

    pub fn active_link_count(&self) -> usize {
        self.links.values().filter(|l| l.state().is_active()).count()
    }

    /// Links not yet closed.
    pub fn open_link_count(&self) -> usize {
        self.links.values().filter(|l| !l.state().is_closed()).count()
    }

    pub fn rng_mut(&mut self) -> &mut SimRng {
        &mut self.rng
    }

    pub(crate) fn next_action_id(&mut self) -> replimesh_types::ActionId {
        self.ids.next_action_id()
    }

    // ------------------------------------------------------------------
    // Mirror lifecycle
    // ------------------------------------------------------------------

    /// Creates a mirror with freshly sampled durations.
    ///
    /// The first mirror ever created is the root and carries the seed
    /// copy of the data package.
    pub fn create_mirror(&mut self, tick: u64) -> MirrorId {
        let id = self.ids.next_mirror_id();
        let startup = self.rng.sample_duration(self.timing.startup);
        let ready = self.rng.sample_duration(self.timing.ready);
        let stop = self.rng.sample_duration(self.timing.stop);
        let is_root = self.root.is_none();

        let mut mirror = Mirror::new(id, tick, startup, ready, stop, is_root);
        if is_root {
            mirror.seed_data(DataPackage::complete(self.file_size));
            self.root = Some(id);
        }
        self.mirrors.insert(id, mirror);
        id
    }

    /// Marks a mirror as stopping. No-op for unknown ids.
    pub fn shutdown_mirror(&mut self, id: MirrorId, tick: u64) {
        if let Some(mirror) = self.mirrors.get_mut(&id) {
            mirror.begin_shutdown(tick);
        }
    }

    // ------------------------------------------------------------------
    // Link lifecycle
    // ------------------------------------------------------------------

    /// Creates a link between two live mirrors.
    ///
    /// Rejects self-links, unknown or stopping endpoints, and duplicate
    /// unordered pairs, all before any mutation.
    pub fn create_link(&mut self, a: MirrorId, b: MirrorId, tick: u64) -> Result<LinkId> {
        if a == b {
            return Err(TopologyError::SelfLink(a));
        }
        for end in [a, b] {
            match self.mirrors.get(&end) {
                Some(m) if !m.state().is_stopping_or_stopped() => {}
                _ => return Err(TopologyError::UnknownMirror(end)),
            }
        }
        let key = LinkKey::new(a, b);
        if self.by_endpoints.contains_key(&key) {
            return Err(TopologyError::DuplicateLink { a, b });
        }

        let id = self.ids.next_link_id();
        let activation = self.rng.sample_duration(self.timing.link_activation);
        self.links.insert(id, Link::new(id, a, b, tick, activation));
        self.by_endpoints.insert(key, id);
        if let Some(m) = self.mirrors.get_mut(&a) {
            m.attach_link(id);
        }
        if let Some(m) = self.mirrors.get_mut(&b) {
            m.attach_link(id);
        }
        Ok(id)
    }

    /// Closes a link: marks it closed, detaches it from both endpoints
    /// and frees its endpoint pair. The link object itself lingers until
    /// the next sweep.
    pub fn close_link(&mut self, id: LinkId) {
        let Some(link) = self.links.get_mut(&id) else {
            return;
        };
        if link.state().is_closed() {
            return;
        }
        link.close();
        let (a, b) = link.endpoints();
        self.by_endpoints.remove(&LinkKey::new(a, b));
        if let Some(m) = self.mirrors.get_mut(&a) {
            m.detach_link(id);
        }
        if let Some(m) = self.mirrors.get_mut(&b) {
            m.detach_link(id);
        }
    }

    /// Closes every link (topology restart / strategy swap).
    pub fn close_all_links(&mut self) {
        let ids: Vec<LinkId> = self.links.keys().copied().collect();
        for id in ids {
            self.close_link(id);
        }
    }

    // ------------------------------------------------------------------
    // Tick phases
    // ------------------------------------------------------------------

    /// Removes mirrors that reached `Stopped` on a previous tick,
    /// closing any link still touching them. Returns the removed ids.
    pub(crate) fn sweep_stopped_mirrors(&mut self) -> Vec<MirrorId> {
        let stopped: Vec<MirrorId> = self
            .mirrors
            .values()
            .filter(|m| m.state().is_stopped())
            .map(Mirror::id)
            .collect();
        for &id in &stopped {
            let touching: Vec<LinkId> = self
                .links
                .values()
                .filter(|l| !l.state().is_closed() && l.peer_of(id).is_some())
                .map(Link::id)
                .collect();
            for link in touching {
                self.close_link(link);
            }
            self.mirrors.remove(&id);
        }
        stopped
    }

    /// Drops link objects closed on a previous tick.
    pub(crate) fn sweep_closed_links(&mut self) {
        self.links.retain(|_, l| !l.state().is_closed());
    }

    /// Samples random crashes. The root never crashes; only mirrors past
    /// startup are eligible.
    pub(crate) fn sample_crashes(&mut self, tick: u64) {
        let p = self.timing.fault_probability;
        if p <= 0.0 {
            return;
        }
        for mirror in self.mirrors.values_mut() {
            if mirror.is_root() || !mirror.state().is_up() {
                continue;
            }
            if self.rng.next_bool_with_probability(p) {
                tracing::debug!(mirror = %mirror.id(), tick, "mirror crashed");
                mirror.begin_shutdown(tick);
            }
        }
    }

    /// Advances every mirror state machine, in id order.
    pub(crate) fn advance_mirrors(&mut self, tick: u64) {
        for mirror in self.mirrors.values_mut() {
            mirror.advance(tick);
        }
    }

    /// Advances every link state machine, in id order, then detaches
    /// links that closed this tick.
    pub(crate) fn advance_links(&mut self, tick: u64) {
        let mut newly_closed = Vec::new();
        for link in self.links.values_mut() {
            if link.state().is_closed() {
                continue;
            }
            let (a, b) = link.endpoints();
            // A missing endpoint counts as stopped.
            let a_state = self
                .mirrors
                .get(&a)
                .map_or(MirrorState::Stopped, Mirror::state);
            let b_state = self
                .mirrors
                .get(&b)
                .map_or(MirrorState::Stopped, Mirror::state);
            link.advance(tick, a_state, b_state);
            if link.state().is_closed() {
                newly_closed.push(link.id());
            }
        }
        for id in newly_closed {
            self.close_link(id);
        }
    }

    /// Propagates payload data across active links for one tick.
    ///
    /// For each active link with exactly one `HasData` endpoint and one
    /// receiving endpoint, the receiver gains up to `link_bandwidth`
    /// units. Returns the total units delivered this tick.
    pub(crate) fn propagate_data(&mut self, tick: u64) -> u64 {
        let bandwidth = self.timing.link_bandwidth;
        let mut transfers: Vec<(MirrorId, u64)> = Vec::new();
        for link in self.links.values() {
            if !link.state().is_active() {
                continue;
            }
            let (a, b) = link.endpoints();
            let (Some(ma), Some(mb)) = (self.mirrors.get(&a), self.mirrors.get(&b)) else {
                continue;
            };
            let receiver = match (ma.state(), mb.state()) {
                (MirrorState::HasData, s) if s.is_receiving() => b,
                (s, MirrorState::HasData) if s.is_receiving() => a,
                _ => continue,
            };
            transfers.push((receiver, self.file_size));
        }

        let mut total = 0;
        for (receiver, size) in transfers {
            if let Some(mirror) = self.mirrors.get_mut(&receiver) {
                total += mirror.deliver(tick, bandwidth, size);
            }
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use replimesh_config::DurationRange;

    use super::*;

    fn timing() -> TimingConfig {
        TimingConfig {
            startup: DurationRange::new(0, 0),
            ready: DurationRange::new(0, 0),
            stop: DurationRange::new(0, 0),
            link_activation: DurationRange::new(0, 0),
            link_bandwidth: 4,
            fault_probability: 0.0,
        }
    }

    fn fleet() -> Fleet {
        Fleet::new(timing(), 0, 8, 2)
    }

    fn settle(fleet: &mut Fleet, from: u64, to: u64) {
        for t in from..=to {
            fleet.sweep_stopped_mirrors();
            fleet.sweep_closed_links();
            fleet.advance_mirrors(t);
            fleet.advance_links(t);
            fleet.propagate_data(t);
        }
    }

    #[test]
    fn first_mirror_is_the_seeded_root() {
        let mut f = fleet();
        let root = f.create_mirror(0);
        let other = f.create_mirror(0);

        assert_eq!(f.root_id(), Some(root));
        assert!(f.mirror(root).unwrap().is_root());
        assert!(f.mirror(root).unwrap().data().unwrap().is_complete());
        assert!(f.mirror(other).unwrap().data().is_none());
    }

    #[test]
    fn duplicate_pair_is_rejected_either_order() {
        let mut f = fleet();
        let a = f.create_mirror(0);
        let b = f.create_mirror(0);
        f.create_link(a, b, 0).unwrap();

        assert!(matches!(
            f.create_link(b, a, 0),
            Err(TopologyError::DuplicateLink { .. })
        ));
    }

    #[test]
    fn self_link_is_rejected() {
        let mut f = fleet();
        let a = f.create_mirror(0);
        assert!(matches!(f.create_link(a, a, 0), Err(TopologyError::SelfLink(_))));
    }

    #[test]
    fn closing_detaches_and_frees_the_pair() {
        let mut f = fleet();
        let a = f.create_mirror(0);
        let b = f.create_mirror(0);
        let link = f.create_link(a, b, 0).unwrap();

        f.close_link(link);
        assert!(f.mirror(a).unwrap().links().is_empty());
        assert!(f.mirror(b).unwrap().links().is_empty());
        assert_eq!(f.link_between(a, b), None);
        // The pair is reusable after closure.
        assert!(f.create_link(a, b, 1).is_ok());
    }

    #[test]
    fn data_spreads_from_the_root() {
        let mut f = fleet();
        let root = f.create_mirror(0);
        let peer = f.create_mirror(0);
        f.create_link(root, peer, 0).unwrap();

        settle(&mut f, 1, 6);

        assert_eq!(f.mirror(root).unwrap().state(), MirrorState::HasData);
        let peer = f.mirror(peer).unwrap();
        assert_eq!(peer.state(), MirrorState::HasData);
        assert_eq!(peer.received(), 8);
        // 8 units at 4/tick is two ticks of receipts.
        assert_eq!(peer.received_history().len(), 2);
    }

    #[test]
    fn stopped_mirror_is_swept_with_its_links() {
        let mut f = fleet();
        let a = f.create_mirror(0);
        let b = f.create_mirror(0);
        let c = f.create_mirror(0);
        f.create_link(a, b, 0).unwrap();
        f.create_link(b, c, 0).unwrap();

        settle(&mut f, 1, 3);
        f.shutdown_mirror(b, 4);
        // b reaches Stopped during tick 4 and is swept at tick 5.
        settle(&mut f, 4, 5);

        assert!(f.mirror(b).is_none());
        assert_eq!(f.mirror(a).unwrap().link_count(), 0);
        assert_eq!(f.mirror(c).unwrap().link_count(), 0);
    }

    #[test]
    fn crash_sampling_never_touches_the_root() {
        let mut timing = timing();
        timing.fault_probability = 1.0;
        let mut f = Fleet::new(timing, 3, 8, 2);
        let root = f.create_mirror(0);
        let other = f.create_mirror(0);

        settle(&mut f, 1, 3);
        f.sample_crashes(4);

        assert!(!f.mirror(root).unwrap().state().is_stopping_or_stopped());
        assert!(f.mirror(other).unwrap().state().is_stopping_or_stopped());
    }
}
