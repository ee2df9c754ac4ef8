// One side of a replicated battle: state, context and replicator together.
//
// A host peer runs effect computers against `state` with `ctx` and its
// envelopes leave through the context's channel. A guest peer feeds every
// received envelope to `receive`. Both arm start-of-battle setup on
// construction so their initial checksums agree.

use skirmish_protocol::{UpdateEnvelope, UpdateSequence};

use crate::channel::ReplicationChannel;
use crate::config::BattleConfig;
use crate::context::BattleContext;
use crate::error::ReplicationError;
use crate::replicator::{GuestReplicator, ReplicatorStats};
use crate::state::BattleState;

#[derive(Debug)]
pub struct BattlePeer {
    pub state: BattleState,
    pub ctx: BattleContext,
    replicator: GuestReplicator,
}

impl BattlePeer {
    /// `state` is from the host's perspective.
    pub fn host(
        mut state: BattleState,
        config: BattleConfig,
        seed: u64,
        channel: impl ReplicationChannel + 'static,
    ) -> Self {
        state.arm_start_of_battle(&config);
        Self {
            state,
            ctx: BattleContext::host(config, seed, channel),
            replicator: GuestReplicator::new(),
        }
    }

    /// `state` is from the guest's perspective (see `BattleState::mirrored`).
    pub fn guest(mut state: BattleState, config: BattleConfig) -> Self {
        state.arm_start_of_battle(&config);
        Self {
            state,
            ctx: BattleContext::guest(config),
            replicator: GuestReplicator::with_default_effects(),
        }
    }

    pub fn receive(&mut self, envelope: &UpdateEnvelope) -> Result<(), ReplicationError> {
        self.replicator
            .handle(envelope, &mut self.state, &mut self.ctx)
    }

    pub fn replicator_mut(&mut self) -> &mut GuestReplicator {
        &mut self.replicator
    }

    /// Highest sequence the replicator has consumed.
    pub fn last_applied(&self) -> UpdateSequence {
        self.replicator.last_applied()
    }

    pub fn stats(&self) -> ReplicatorStats {
        self.replicator.stats()
    }

    pub fn checksum(&self) -> u64 {
        self.state.checksum(self.ctx.my_side())
    }

    /// End-of-battle sweep.
    pub fn end_battle(&mut self) {
        self.ctx.cleanup();
    }
}
