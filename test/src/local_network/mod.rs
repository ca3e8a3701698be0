/// In-memory network for multi-peer testing
/// Routes channel payloads between peers without any I/O, and plays the
/// membership authority: peers are primary in the order they connected

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use lockstep_shared::{ChannelKind, PeerId, Transport, TransportError};

/// One payload waiting in a peer's inbox
#[derive(Clone, Debug)]
pub struct Delivery {
    pub channel: ChannelKind,
    pub sender: PeerId,
    pub payload: Vec<u8>,
}

#[derive(Default)]
struct Bus {
    /// Connected peers, oldest first
    present: Vec<PeerId>,
    names: HashMap<PeerId, String>,
    inboxes: HashMap<PeerId, VecDeque<Delivery>>,
    /// Number of upcoming sends to reject, per peer
    rejected_sends: HashMap<PeerId, usize>,
    owners: HashMap<ChannelKind, PeerId>,
    sent_payloads: usize,
}

/// Shared handle to the in-memory network
#[derive(Clone, Default)]
pub struct LocalNetwork {
    bus: Arc<Mutex<Bus>>,
}

impl LocalNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connects a peer and returns its transport
    pub fn connect(&self, peer: PeerId, display_name: &str) -> LocalTransport {
        let mut bus = self.bus.lock().unwrap();
        bus.present.push(peer);
        bus.names.insert(peer, display_name.to_string());
        bus.inboxes.insert(peer, VecDeque::new());
        LocalTransport {
            peer,
            bus: self.bus.clone(),
        }
    }

    /// Disconnects a peer. Whatever was still in its inbox is lost.
    pub fn disconnect(&self, peer: PeerId) {
        let mut bus = self.bus.lock().unwrap();
        bus.present.retain(|present| *present != peer);
        bus.inboxes.remove(&peer);
        bus.rejected_sends.remove(&peer);
    }

    pub fn primary(&self) -> Option<PeerId> {
        self.bus.lock().unwrap().present.first().copied()
    }

    pub fn present(&self) -> Vec<PeerId> {
        self.bus.lock().unwrap().present.clone()
    }

    pub fn owner(&self, channel: ChannelKind) -> Option<PeerId> {
        self.bus.lock().unwrap().owners.get(&channel).copied()
    }

    /// Makes the next `count` sends of `peer` fail
    pub fn reject_sends(&self, peer: PeerId, count: usize) {
        self.bus.lock().unwrap().rejected_sends.insert(peer, count);
    }

    /// Takes everything delivered to `peer` so far
    pub fn drain(&self, peer: PeerId) -> Vec<Delivery> {
        let mut bus = self.bus.lock().unwrap();
        match bus.inboxes.get_mut(&peer) {
            Some(inbox) => inbox.drain(..).collect(),
            None => Vec::new(),
        }
    }

    /// Payloads successfully written by any peer so far
    pub fn sent_payloads(&self) -> usize {
        self.bus.lock().unwrap().sent_payloads
    }
}

/// The transport handed to one engine
pub struct LocalTransport {
    peer: PeerId,
    bus: Arc<Mutex<Bus>>,
}

impl Transport for LocalTransport {
    fn local_peer(&self) -> PeerId {
        self.peer
    }

    fn local_display_name(&self) -> String {
        let bus = self.bus.lock().unwrap();
        bus.names
            .get(&self.peer)
            .cloned()
            .unwrap_or_else(|| format!("peer {}", self.peer))
    }

    fn is_primary(&self) -> bool {
        self.bus.lock().unwrap().present.first() == Some(&self.peer)
    }

    fn is_present(&self, peer: PeerId) -> bool {
        self.bus.lock().unwrap().present.contains(&peer)
    }

    fn take_ownership(&mut self, channel: ChannelKind) {
        self.bus.lock().unwrap().owners.insert(channel, self.peer);
    }

    fn send(&mut self, channel: ChannelKind, payload: &[u8]) -> Result<(), TransportError> {
        let mut bus = self.bus.lock().unwrap();
        if !bus.present.contains(&self.peer) {
            return Err(TransportError::SendRejected {
                channel,
                length: payload.len(),
            });
        }
        if channel != ChannelKind::Action && bus.owners.get(&channel) != Some(&self.peer) {
            return Err(TransportError::NotOwner { channel });
        }
        if let Some(rejected) = bus.rejected_sends.get_mut(&self.peer) {
            if *rejected > 0 {
                *rejected -= 1;
                return Err(TransportError::SendRejected {
                    channel,
                    length: payload.len(),
                });
            }
        }

        let receivers: Vec<PeerId> = bus
            .present
            .iter()
            .copied()
            .filter(|peer| *peer != self.peer)
            .collect();
        for receiver in receivers {
            if let Some(inbox) = bus.inboxes.get_mut(&receiver) {
                inbox.push_back(Delivery {
                    channel,
                    sender: self.peer,
                    payload: payload.to_vec(),
                });
            }
        }
        bus.sent_payloads += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payloads_reach_every_other_peer_in_order() {
        let network = LocalNetwork::new();
        let mut first = network.connect(1, "first");
        let _second = network.connect(2, "second");
        let _third = network.connect(3, "third");

        first.send(ChannelKind::Action, &[1]).unwrap();
        first.send(ChannelKind::Action, &[2]).unwrap();

        assert!(network.drain(1).is_empty());
        for peer in [2, 3] {
            let payloads: Vec<Vec<u8>> = network
                .drain(peer)
                .into_iter()
                .map(|delivery| delivery.payload)
                .collect();
            assert_eq!(payloads, vec![vec![1], vec![2]]);
        }
    }

    #[test]
    fn oldest_peer_is_primary() {
        let network = LocalNetwork::new();
        let first = network.connect(1, "first");
        let second = network.connect(2, "second");
        assert!(first.is_primary());
        assert!(!second.is_primary());

        network.disconnect(1);
        assert!(second.is_primary());
        assert!(!second.is_present(1));
    }

    #[test]
    fn master_channels_need_ownership() {
        let network = LocalNetwork::new();
        let mut first = network.connect(1, "first");
        assert_eq!(
            first.send(ChannelKind::Tick, &[0]),
            Err(TransportError::NotOwner {
                channel: ChannelKind::Tick
            })
        );
        first.take_ownership(ChannelKind::Tick);
        assert!(first.send(ChannelKind::Tick, &[0]).is_ok());
    }

    #[test]
    fn rejected_sends_are_counted_down() {
        let network = LocalNetwork::new();
        let mut first = network.connect(1, "first");
        let _second = network.connect(2, "second");
        network.reject_sends(1, 2);

        assert!(first.send(ChannelKind::Action, &[1]).is_err());
        assert!(first.send(ChannelKind::Action, &[1]).is_err());
        assert!(first.send(ChannelKind::Action, &[1]).is_ok());
        assert_eq!(network.drain(2).len(), 1);
    }
}
