//! # Integration Fixtures
//!
//! Builds messenger nodes on a shared `InMemoryNetwork`.
//!
//! ```text
//!   alice (channel 1) ──── InMemoryNetwork ──── bob (channel 2)
//!       │                                          │
//!   sink/treasury/bus                        sink/treasury/bus
//! ```

use qc_15_cross_chain_messaging::{
    AppIdentity, ChannelId, EnforcedOptionsStore, Fee, FeeSchedule, InMemoryNetwork,
    InMemoryTreasury, MessagingConfig, RecordingStateSink, Responder, RoundTripMessenger,
};
use shared_bus::{EventFilter, InMemoryEventBus, Subscription};
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Channel alice lives on.
pub const ALICE_CHANNEL: ChannelId = ChannelId(1);
/// Channel bob lives on.
pub const BOB_CHANNEL: ChannelId = ChannelId(2);
/// Opening treasury balance for both nodes.
pub const DEFAULT_TREASURY: u128 = 1_000_000;

/// Alice's application identity.
pub fn alice_identity() -> AppIdentity {
    AppIdentity::new([0xA1; 32])
}

/// Bob's application identity.
pub fn bob_identity() -> AppIdentity {
    AppIdentity::new([0xB0; 32])
}

/// Route test logs through the test writer. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// One application instance and the collaborators tests inspect.
pub struct Node {
    /// Channel the node is registered on.
    pub channel: ChannelId,
    /// The node's identity.
    pub identity: AppIdentity,
    /// The messenger (also the attached receiver).
    pub messenger: Arc<RoundTripMessenger>,
    /// Applied payloads.
    pub sink: Arc<RecordingStateSink>,
    /// Return-leg treasury.
    pub treasury: Arc<InMemoryTreasury>,
    /// Baseline options table.
    pub store: Arc<EnforcedOptionsStore>,
    /// Signal bus.
    pub bus: Arc<InMemoryEventBus>,
}

impl Node {
    /// Register `config.identity` on `config.local_channel`, build its
    /// messenger and attach it as the channel's receiver.
    pub fn spawn(
        network: &Arc<InMemoryNetwork>,
        config: MessagingConfig,
        treasury: Fee,
        responder: Option<Arc<dyn Responder>>,
    ) -> Self {
        let channel = config.local_channel;
        let identity = config.identity;
        let transport = network.register_endpoint(channel, identity);

        let sink = Arc::new(RecordingStateSink::default());
        let treasury = Arc::new(InMemoryTreasury::new(treasury));
        let store = Arc::new(
            EnforcedOptionsStore::from_params(&config.enforced_options)
                .expect("fixture baselines are valid"),
        );
        let bus = Arc::new(InMemoryEventBus::new());

        let mut builder = RoundTripMessenger::builder(config)
            .transport(Arc::new(transport))
            .state_sink(sink.clone())
            .funding(treasury.clone())
            .options_policy(store.clone())
            .publisher(bus.clone());
        if let Some(responder) = responder {
            builder = builder.responder(responder);
        }
        let messenger = Arc::new(builder.build().expect("fixture config is valid"));

        network
            .attach_receiver(channel, &messenger)
            .expect("endpoint was just registered");
        debug!("[qc-15] Test node {} attached to {}", identity, channel);

        Self {
            channel,
            identity,
            messenger,
            sink,
            treasury,
            store,
            bus,
        }
    }

    /// Subscribe to everything this node publishes.
    pub fn events(&self) -> Subscription {
        self.bus.subscribe(EventFilter::all())
    }
}

/// Alice and bob, each trusting the other.
pub struct Pair {
    /// Shared network.
    pub network: Arc<InMemoryNetwork>,
    /// Node on channel 1.
    pub alice: Node,
    /// Node on channel 2.
    pub bob: Node,
}

impl Pair {
    /// Default fee schedule, both treasuries funded.
    pub fn new() -> Self {
        Self::build(FeeSchedule::default(), |config| config, |config| config)
    }

    /// Custom schedule; each config can be adjusted before the node is built.
    pub fn build(
        schedule: FeeSchedule,
        alice: impl FnOnce(MessagingConfig) -> MessagingConfig,
        bob: impl FnOnce(MessagingConfig) -> MessagingConfig,
    ) -> Self {
        Self::build_with(schedule, alice, bob, Fee::native(DEFAULT_TREASURY), None)
    }

    /// Full control over bob's treasury and reply policy.
    pub fn build_with(
        schedule: FeeSchedule,
        alice: impl FnOnce(MessagingConfig) -> MessagingConfig,
        bob: impl FnOnce(MessagingConfig) -> MessagingConfig,
        bob_treasury: Fee,
        bob_responder: Option<Arc<dyn Responder>>,
    ) -> Self {
        init_tracing();
        let network = InMemoryNetwork::new(schedule);

        let alice_config = alice(
            MessagingConfig {
                local_channel: ALICE_CHANNEL,
                identity: alice_identity(),
                ..Default::default()
            }
            .with_peer(BOB_CHANNEL, bob_identity()),
        );
        let bob_config = bob(
            MessagingConfig {
                local_channel: BOB_CHANNEL,
                identity: bob_identity(),
                ..Default::default()
            }
            .with_peer(ALICE_CHANNEL, alice_identity()),
        );

        let alice = Node::spawn(
            &network,
            alice_config,
            Fee::native(DEFAULT_TREASURY),
            None,
        );
        let bob = Node::spawn(&network, bob_config, bob_treasury, bob_responder);

        Self { network, alice, bob }
    }
}

impl Default for Pair {
    fn default() -> Self {
        Self::new()
    }
}
