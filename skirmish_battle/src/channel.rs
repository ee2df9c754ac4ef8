// ReplicationChannel: the outbound pipe for host envelopes.
//
// The contract is a reliable, ordered, at-least-once stream scoped to one
// battle session. The battle crate only ever calls `send`; receiving is the
// transport's business (the relay client pushes incoming envelopes into the
// guest's replicator).
//
// Implementations here:
// - `LoopbackChannel`: in-process FIFO. The paired `LoopbackReceiver` drains
//   it. Used by tests and by same-process host/guest setups.
// - `NullChannel`: accepts and discards. Guests and offline battles.
//
// The TCP implementation lives in `skirmish_relay::client`.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use skirmish_protocol::UpdateEnvelope;

use crate::error::ChannelError;

pub trait ReplicationChannel {
    fn send(&mut self, envelope: &UpdateEnvelope) -> Result<(), ChannelError>;
}

impl<C: ReplicationChannel + ?Sized> ReplicationChannel for Box<C> {
    fn send(&mut self, envelope: &UpdateEnvelope) -> Result<(), ChannelError> {
        (**self).send(envelope)
    }
}

#[derive(Debug, Default)]
pub struct NullChannel;

impl ReplicationChannel for NullChannel {
    fn send(&mut self, _envelope: &UpdateEnvelope) -> Result<(), ChannelError> {
        Ok(())
    }
}

type Outbox = Rc<RefCell<VecDeque<UpdateEnvelope>>>;

/// Sending half of an in-process channel.
#[derive(Debug)]
pub struct LoopbackChannel {
    outbox: Outbox,
}

/// Receiving half of an in-process channel.
#[derive(Debug)]
pub struct LoopbackReceiver {
    outbox: Outbox,
}

impl LoopbackChannel {
    pub fn pair() -> (LoopbackChannel, LoopbackReceiver) {
        let outbox = Outbox::default();
        (
            LoopbackChannel {
                outbox: Rc::clone(&outbox),
            },
            LoopbackReceiver { outbox },
        )
    }
}

impl ReplicationChannel for LoopbackChannel {
    fn send(&mut self, envelope: &UpdateEnvelope) -> Result<(), ChannelError> {
        // The receiver being dropped means nobody will ever read this.
        if Rc::strong_count(&self.outbox) < 2 {
            return Err(ChannelError::Closed);
        }
        self.outbox.borrow_mut().push_back(envelope.clone());
        Ok(())
    }
}

impl LoopbackReceiver {
    pub fn try_recv(&self) -> Option<UpdateEnvelope> {
        self.outbox.borrow_mut().pop_front()
    }

    /// Take everything queued so far, in send order.
    pub fn drain(&self) -> Vec<UpdateEnvelope> {
        self.outbox.borrow_mut().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.outbox.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.outbox.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use skirmish_protocol::EffectType;

    use super::*;

    fn envelope(name: &'static str) -> UpdateEnvelope {
        UpdateEnvelope::new(
            EffectType::from_static(name),
            None,
            None,
            &serde_json::json!({}),
        )
        .unwrap()
    }

    #[test]
    fn loopback_preserves_order() {
        let (mut tx, rx) = LoopbackChannel::pair();
        tx.send(&envelope("a")).unwrap();
        tx.send(&envelope("b")).unwrap();
        assert_eq!(rx.len(), 2);
        let names: Vec<_> = rx
            .drain()
            .iter()
            .map(|e| e.effect_type().as_str().to_owned())
            .collect();
        assert_eq!(names, ["a", "b"]);
        assert!(rx.is_empty());
    }

    #[test]
    fn loopback_closed_after_receiver_drop() {
        let (mut tx, rx) = LoopbackChannel::pair();
        drop(rx);
        assert!(matches!(tx.send(&envelope("a")), Err(ChannelError::Closed)));
    }

    #[test]
    fn null_channel_accepts_everything() {
        let mut ch = NullChannel;
        assert!(ch.send(&envelope("a")).is_ok());
    }
}
