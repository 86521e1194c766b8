//! In-Memory Transport Adapter
//!
//! Implements `Transport` over a shared in-process network hub.
//!
//! Submissions are queued; nothing is delivered until the test or host
//! drives the network with `deliver_next` or `flush`. That makes delivery
//! order, and receive failures, fully observable.

use crate::domain::{
    DispatchReceipt, MessagingError, Options, Origin, OutboundPacket, ReceiveOutcome,
};
use crate::ports::{MessageReceiver, Transport};
use async_trait::async_trait;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use shared_types::{AppIdentity, ChannelId, Fee, Guid};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

/// Upper bound on deliveries performed by one `flush`.
pub const MAX_FLUSH_DELIVERIES: usize = 10_000;

/// Cost model for the in-memory network.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeeSchedule {
    /// Flat fee per message in the native asset.
    pub base_fee: u128,
    /// Fee per envelope byte.
    pub per_byte_fee: u128,
    /// Native cost per unit of requested receive gas.
    pub gas_price: u128,
    /// Flat fee in the secondary asset (replaces `base_fee` when paying
    /// in the secondary asset).
    pub secondary_base_fee: u128,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            base_fee: 1_000,
            per_byte_fee: 10,
            gas_price: 1,
            secondary_base_fee: 500,
        }
    }
}

impl FeeSchedule {
    /// A schedule that charges nothing.
    pub fn free() -> Self {
        Self {
            base_fee: 0,
            per_byte_fee: 0,
            gas_price: 0,
            secondary_base_fee: 0,
        }
    }

    /// Fee for an envelope of `envelope_len` bytes with `options`.
    pub fn quote(
        &self,
        envelope_len: usize,
        options: &Options,
        pay_in_secondary: bool,
    ) -> Result<Fee, MessagingError> {
        let budget = options.execution_budget()?;
        let execution = budget
            .gas
            .saturating_mul(self.gas_price)
            .saturating_add(budget.total_value());
        let bytes = (envelope_len as u128).saturating_mul(self.per_byte_fee);
        let variable = execution.saturating_add(bytes);

        Ok(if pay_in_secondary {
            Fee {
                primary: variable,
                secondary: self.secondary_base_fee,
            }
        } else {
            Fee::native(variable.saturating_add(self.base_fee))
        })
    }
}

/// An accepted submission awaiting delivery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InFlightPacket {
    /// Transport-assigned id.
    pub guid: Guid,
    /// Source, sender and pathway nonce.
    pub origin: Origin,
    /// Target channel.
    pub destination: ChannelId,
    /// Encoded envelope.
    pub envelope: Vec<u8>,
    /// Effective options.
    pub options: Options,
}

/// Result of one delivery attempt.
#[derive(Debug)]
pub struct DeliveryReport {
    /// Transport-assigned id.
    pub guid: Guid,
    /// Where the packet came from.
    pub origin: Origin,
    /// Where it was delivered.
    pub destination: ChannelId,
    /// Receiver's verdict.
    pub result: Result<ReceiveOutcome, MessagingError>,
}

impl DeliveryReport {
    /// Whether the receiver accepted the delivery.
    pub fn is_delivered(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
struct Pathway {
    source: ChannelId,
    sender: AppIdentity,
    destination: ChannelId,
}

struct Endpoint {
    identity: AppIdentity,
    // Weak: the receiver owns a transport that owns this network
    receiver: Option<Weak<dyn MessageReceiver>>,
}

#[derive(Default)]
struct NetworkState {
    endpoints: HashMap<ChannelId, Endpoint>,
    nonces: HashMap<Pathway, u64>,
    in_flight: VecDeque<InFlightPacket>,
    refunds: HashMap<AppIdentity, Fee>,
    collected: Fee,
}

/// Shared hub connecting in-memory endpoints.
pub struct InMemoryNetwork {
    schedule: FeeSchedule,
    state: Mutex<NetworkState>,
}

impl InMemoryNetwork {
    /// Create an empty network.
    pub fn new(schedule: FeeSchedule) -> Arc<Self> {
        Arc::new(Self {
            schedule,
            state: Mutex::new(NetworkState::default()),
        })
    }

    /// Active cost model.
    pub fn schedule(&self) -> &FeeSchedule {
        &self.schedule
    }

    /// Register an application on `channel` and get its transport handle.
    ///
    /// Re-registering a channel replaces its identity and detaches any
    /// receiver.
    pub fn register_endpoint(
        self: &Arc<Self>,
        channel: ChannelId,
        identity: AppIdentity,
    ) -> InMemoryTransport {
        self.state.lock().endpoints.insert(
            channel,
            Endpoint {
                identity,
                receiver: None,
            },
        );
        debug!("[qc-15] Registered endpoint {} on {}", identity, channel);

        InMemoryTransport {
            network: self.clone(),
            channel,
            identity,
        }
    }

    /// Route deliveries for `channel` to `receiver`.
    pub fn attach_receiver<R>(
        &self,
        channel: ChannelId,
        receiver: &Arc<R>,
    ) -> Result<(), MessagingError>
    where
        R: MessageReceiver + 'static,
    {
        let mut state = self.state.lock();
        let endpoint = state.endpoints.get_mut(&channel).ok_or_else(|| {
            MessagingError::TransportUnavailable(format!("no endpoint on {channel}"))
        })?;
        let receiver: Arc<dyn MessageReceiver> = receiver.clone();
        endpoint.receiver = Some(Arc::downgrade(&receiver));
        Ok(())
    }

    /// Whether `channel` has a registered endpoint.
    pub fn has_endpoint(&self, channel: ChannelId) -> bool {
        self.state.lock().endpoints.contains_key(&channel)
    }

    /// Number of packets awaiting delivery.
    pub fn pending(&self) -> usize {
        self.state.lock().in_flight.len()
    }

    /// Snapshot of packets awaiting delivery, oldest first.
    pub fn in_flight(&self) -> Vec<InFlightPacket> {
        self.state.lock().in_flight.iter().cloned().collect()
    }

    /// Remove every packet awaiting delivery, oldest first.
    ///
    /// Lets a caller deliver them in any order with [`Self::deliver`].
    pub fn take_in_flight(&self) -> Vec<InFlightPacket> {
        self.state.lock().in_flight.drain(..).collect()
    }

    /// Refunds credited to `identity` so far.
    pub fn refunds_for(&self, identity: &AppIdentity) -> Fee {
        self.state
            .lock()
            .refunds
            .get(identity)
            .copied()
            .unwrap_or_default()
    }

    /// Total fees charged so far.
    pub fn collected_fees(&self) -> Fee {
        self.state.lock().collected
    }

    /// Deliver one specific packet to its destination's receiver.
    pub async fn deliver(&self, packet: InFlightPacket) -> DeliveryReport {
        let receiver = self
            .state
            .lock()
            .endpoints
            .get(&packet.destination)
            .and_then(|endpoint| endpoint.receiver.as_ref())
            .and_then(Weak::upgrade);

        let result = match receiver {
            Some(receiver) => receiver.receive(packet.origin, &packet.envelope).await,
            None => Err(MessagingError::TransportUnavailable(format!(
                "no receiver attached on {}",
                packet.destination
            ))),
        };

        match &result {
            Ok(_) => debug!(
                "[qc-15] Delivered {}.. to {} (nonce {})",
                hex::encode(&packet.guid[..8]),
                packet.destination,
                packet.origin.nonce
            ),
            Err(e) => warn!(
                destination = %packet.destination,
                source = %packet.origin.source_channel,
                nonce = packet.origin.nonce,
                error = %e,
                "[qc-15] Delivery failed"
            ),
        }

        DeliveryReport {
            guid: packet.guid,
            origin: packet.origin,
            destination: packet.destination,
            result,
        }
    }

    /// Deliver the oldest pending packet, if any.
    pub async fn deliver_next(&self) -> Option<DeliveryReport> {
        let packet = self.state.lock().in_flight.pop_front()?;
        Some(self.deliver(packet).await)
    }

    /// Deliver until nothing is pending, including packets submitted by
    /// receivers along the way.
    pub async fn flush(&self) -> Vec<DeliveryReport> {
        let mut reports = Vec::new();
        while reports.len() < MAX_FLUSH_DELIVERIES {
            let Some(report) = self.deliver_next().await else {
                break;
            };
            reports.push(report);
        }
        if self.pending() > 0 {
            warn!(
                pending = self.pending(),
                "[qc-15] Flush stopped at delivery limit"
            );
        }
        reports
    }

    fn accept(
        &self,
        source: ChannelId,
        sender: AppIdentity,
        packet: OutboundPacket,
    ) -> Result<DispatchReceipt, MessagingError> {
        let pay_in_secondary = packet.funds.secondary > 0;
        let fee = self
            .schedule
            .quote(packet.envelope.len(), &packet.options, pay_in_secondary)
            .map_err(|e| MessagingError::TransportRejected(e.to_string()))?;
        if !packet.funds.covers(&fee) {
            return Err(MessagingError::TransportRejected(format!(
                "insufficient fee: required {}, provided {}",
                fee, packet.funds
            )));
        }

        let mut state = self.state.lock();
        let receiver = state
            .endpoints
            .get(&packet.destination)
            .map(|endpoint| endpoint.identity)
            .ok_or_else(|| {
                MessagingError::TransportRejected(format!(
                    "unknown destination {}",
                    packet.destination
                ))
            })?;

        let pathway = Pathway {
            source,
            sender,
            destination: packet.destination,
        };
        let nonce = {
            let counter = state.nonces.entry(pathway).or_insert(0);
            *counter += 1;
            *counter
        };
        let guid = compute_guid(nonce, &pathway, &receiver);

        let excess = packet.funds.saturating_sub(&fee);
        if !excess.is_zero() {
            let refund = state.refunds.entry(packet.refund_target).or_default();
            *refund = refund.saturating_add(&excess);
        }
        state.collected = state.collected.saturating_add(&fee);

        state.in_flight.push_back(InFlightPacket {
            guid,
            origin: Origin::new(source, sender, nonce),
            destination: packet.destination,
            envelope: packet.envelope,
            options: packet.options,
        });

        info!(
            "[qc-15] Network accepted {}.. {} -> {} (nonce {}, fee {}, refund {})",
            hex::encode(&guid[..8]),
            source,
            packet.destination,
            nonce,
            fee,
            excess
        );

        Ok(DispatchReceipt { guid, nonce, fee })
    }
}

/// Generate a message id from its pathway position.
fn compute_guid(nonce: u64, pathway: &Pathway, receiver: &AppIdentity) -> Guid {
    let mut hasher = Sha256::new();
    hasher.update(nonce.to_be_bytes());
    hasher.update(pathway.source.value().to_be_bytes());
    hasher.update(pathway.sender.as_bytes());
    hasher.update(pathway.destination.value().to_be_bytes());
    hasher.update(receiver.as_bytes());

    let result = hasher.finalize();
    let mut guid = [0u8; 32];
    guid.copy_from_slice(&result);
    guid
}

/// One endpoint's handle onto an [`InMemoryNetwork`].
#[derive(Clone)]
pub struct InMemoryTransport {
    network: Arc<InMemoryNetwork>,
    channel: ChannelId,
    identity: AppIdentity,
}

impl InMemoryTransport {
    /// Channel this handle submits from.
    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    /// Identity this handle submits as.
    pub fn identity(&self) -> AppIdentity {
        self.identity
    }

    /// The shared network.
    pub fn network(&self) -> &Arc<InMemoryNetwork> {
        &self.network
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn submit(&self, packet: OutboundPacket) -> Result<DispatchReceipt, MessagingError> {
        self.network.accept(self.channel, self.identity, packet)
    }

    async fn estimate_cost(
        &self,
        destination: ChannelId,
        envelope: &[u8],
        options: &Options,
        pay_in_secondary: bool,
    ) -> Result<Fee, MessagingError> {
        if !self.network.has_endpoint(destination) {
            return Err(MessagingError::TransportUnavailable(format!(
                "no route to {destination}"
            )));
        }
        self.network
            .schedule
            .quote(envelope.len(), options, pay_in_secondary)
    }
}
