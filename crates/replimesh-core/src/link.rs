//! Link state machine.
//!
//! A link is semantically undirected: its identity within the fleet is
//! the unordered endpoint pair ([`LinkKey`]). Activation is gated on
//! both endpoints having completed startup, plus a sampled activation
//! delay counted from the first tick both were up simultaneously.

use replimesh_types::{LinkId, LinkState, MirrorId, MirrorState};

/// Normalized unordered endpoint pair; the fleet-wide identity of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkKey(MirrorId, MirrorId);

impl LinkKey {
    pub fn new(a: MirrorId, b: MirrorId) -> Self {
        if a <= b { Self(a, b) } else { Self(b, a) }
    }

    pub fn lower(&self) -> MirrorId {
        self.0
    }

    pub fn upper(&self) -> MirrorId {
        self.1
    }
}

/// An undirected edge between two mirrors.
#[derive(Debug, Clone)]
pub struct Link {
    id: LinkId,
    a: MirrorId,
    b: MirrorId,
    created_at: u64,
    activation_ticks: u64,
    state: LinkState,
    /// First tick both endpoints were observed up simultaneously.
    both_up_since: Option<u64>,
}

impl Link {
    pub(crate) fn new(
        id: LinkId,
        a: MirrorId,
        b: MirrorId,
        tick: u64,
        activation_ticks: u64,
    ) -> Self {
        Self {
            id,
            a,
            b,
            created_at: tick,
            activation_ticks,
            state: LinkState::Inactive,
            both_up_since: None,
        }
    }

    pub fn id(&self) -> LinkId {
        self.id
    }

    pub fn endpoints(&self) -> (MirrorId, MirrorId) {
        (self.a, self.b)
    }

    pub fn key(&self) -> LinkKey {
        LinkKey::new(self.a, self.b)
    }

    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// The opposite endpoint, or `None` if `mirror` is not an endpoint.
    pub fn peer_of(&self, mirror: MirrorId) -> Option<MirrorId> {
        if mirror == self.a {
            Some(self.b)
        } else if mirror == self.b {
            Some(self.a)
        } else {
            None
        }
    }

    pub(crate) fn close(&mut self) {
        self.state = LinkState::Closed;
    }

    /// Advances the activation machine given the endpoint states.
    pub(crate) fn advance(&mut self, tick: u64, a_state: MirrorState, b_state: MirrorState) {
        if self.state.is_closed() {
            return;
        }
        if a_state.is_stopped() || b_state.is_stopped() {
            self.close();
            return;
        }
        if self.state == LinkState::Inactive {
            if a_state.is_up() && b_state.is_up() {
                let since = *self.both_up_since.get_or_insert(tick);
                if tick.saturating_sub(since) >= self.activation_ticks {
                    self.state = LinkState::Active;
                }
            } else {
                self.both_up_since = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(activation: u64) -> Link {
        Link::new(LinkId::new(0), MirrorId::new(1), MirrorId::new(2), 0, activation)
    }

    #[test]
    fn key_is_unordered() {
        let k1 = LinkKey::new(MirrorId::new(3), MirrorId::new(7));
        let k2 = LinkKey::new(MirrorId::new(7), MirrorId::new(3));
        assert_eq!(k1, k2);
        assert_eq!(k1.lower(), MirrorId::new(3));
    }

    #[test]
    fn activates_after_delay_once_both_up() {
        let mut l = link(2);
        l.advance(1, MirrorState::Starting, MirrorState::Up);
        assert_eq!(l.state(), LinkState::Inactive);

        l.advance(2, MirrorState::Up, MirrorState::Up);
        assert_eq!(l.state(), LinkState::Inactive); // countdown starts here

        l.advance(3, MirrorState::Ready, MirrorState::Up);
        assert_eq!(l.state(), LinkState::Inactive);

        l.advance(4, MirrorState::Ready, MirrorState::Ready);
        assert_eq!(l.state(), LinkState::Active);
    }

    #[test]
    fn zero_delay_activates_immediately() {
        let mut l = link(0);
        l.advance(5, MirrorState::Up, MirrorState::Up);
        assert_eq!(l.state(), LinkState::Active);
    }

    #[test]
    fn stopped_endpoint_closes_before_activation() {
        let mut l = link(3);
        l.advance(1, MirrorState::Up, MirrorState::Up);
        l.advance(2, MirrorState::Up, MirrorState::Stopped);
        assert_eq!(l.state(), LinkState::Closed);
    }

    #[test]
    fn closed_is_absorbing() {
        let mut l = link(0);
        l.close();
        l.advance(1, MirrorState::Up, MirrorState::Up);
        assert_eq!(l.state(), LinkState::Closed);
    }

    #[test]
    fn peer_lookup() {
        let l = link(0);
        assert_eq!(l.peer_of(MirrorId::new(1)), Some(MirrorId::new(2)));
        assert_eq!(l.peer_of(MirrorId::new(2)), Some(MirrorId::new(1)));
        assert_eq!(l.peer_of(MirrorId::new(9)), None);
    }
}
