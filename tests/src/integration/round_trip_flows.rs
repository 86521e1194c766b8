//! # Round-Trip Flows
//!
//! End-to-end send, deliver and reply between two messengers.
//!
//! ```text
//! alice.send(RoundTrip "ping") ──→ network ──→ bob.receive
//!                                                 │ apply "ping"
//!                                                 │ withdraw from bob's treasury
//! alice.receive ←────────── network ←──── bob.send(Plain "pong")
//!     │ apply "pong" (no further reply)
//! ```
//!
//! ## Test Categories
//!
//! 1. **Happy Path**: Plain delivery, ping-pong, refunds
//! 2. **Fees**: Underfunded sends, prequoting, secondary-asset quotes
//! 3. **Enforced Options**: Baselines on both legs
//! 4. **Failure Isolation**: Treasury shortfall, untrusted channels

#[cfg(test)]
mod tests {
    use super::super::fixtures::{
        alice_identity, bob_identity, Node, Pair, ALICE_CHANNEL, BOB_CHANNEL,
    };
    use qc_15_cross_chain_messaging::{
        AppIdentity, ChannelId, Fee, FeeSchedule, MessageKind, MessageRequest, MessageSender,
        MessagingConfig, MessagingError, Options, Origin, OptionsPolicy, Responder, ReturnLeg,
        ReturnLegFunding, RETURN_MESSAGE_LEN,
    };
    use shared_bus::{Leg, MessagingEvent};
    use std::sync::Arc;

    fn return_options(gas: u128) -> Options {
        Options::new_type3().add_executor_receive(gas, 0)
    }

    async fn send_quoted(pair: &Pair, request: &MessageRequest) -> Fee {
        let fee = pair.alice.messenger.quote(request, false).await.unwrap();
        pair.alice
            .messenger
            .send(request, fee, alice_identity())
            .await
            .unwrap();
        fee
    }

    // =========================================================================
    // HAPPY PATH
    // =========================================================================

    #[tokio::test]
    async fn test_plain_message_applied_without_reply() {
        let pair = Pair::new();
        send_quoted(&pair, &MessageRequest::plain(BOB_CHANNEL, "hello")).await;

        let reports = pair.network.flush().await;

        assert_eq!(reports.len(), 1);
        let outcome = reports[0].result.as_ref().unwrap();
        assert_eq!(outcome.applied()[0].return_leg, ReturnLeg::NotRequested);
        assert_eq!(pair.bob.sink.payloads(), vec![b"hello".to_vec()]);
        assert!(pair.alice.sink.payloads().is_empty());
        assert_eq!(pair.network.pending(), 0);
    }

    #[tokio::test]
    async fn test_round_trip_ping_pong() {
        let pair = Pair::new();
        let mut alice_events = pair.alice.events();
        let mut bob_events = pair.bob.events();

        let request =
            MessageRequest::round_trip(BOB_CHANNEL, "ping").return_options(return_options(50_000));
        send_quoted(&pair, &request).await;

        let reports = pair.network.flush().await;
        assert_eq!(reports.len(), 2, "forward leg then return leg");
        assert!(reports.iter().all(|report| report.is_delivered()));

        assert_eq!(pair.bob.sink.payloads(), vec![b"ping".to_vec()]);
        assert_eq!(pair.alice.sink.payloads(), vec![b"pong".to_vec()]);

        let origin = pair.alice.sink.applied()[0].1;
        assert_eq!(origin, Origin::new(BOB_CHANNEL, bob_identity(), 1));

        // Bob paid exactly the return-leg fee; no excess, no refund
        let bob_outcome = reports[0].result.as_ref().unwrap();
        let ReturnLeg::Dispatched(receipt) = &bob_outcome.applied()[0].return_leg else {
            panic!("return leg not dispatched");
        };
        assert_eq!(receipt.fee, Fee::native(1_000 + 10 * RETURN_MESSAGE_LEN as u128 + 50_000));
        assert_eq!(
            pair.bob.treasury.available(),
            Fee::native(1_000_000).saturating_sub(&receipt.fee)
        );
        assert_eq!(pair.network.refunds_for(&bob_identity()), Fee::ZERO);

        let alice_log = alice_events.drain();
        assert!(matches!(
            alice_log.as_slice(),
            [
                MessagingEvent::MessageSent {
                    leg: Leg::Forward,
                    kind: MessageKind::RoundTrip,
                    ..
                },
                MessagingEvent::MessageReceived { .. },
            ]
        ));
        let bob_log = bob_events.drain();
        assert!(matches!(
            bob_log.as_slice(),
            [
                MessagingEvent::MessageSent {
                    leg: Leg::Return,
                    kind: MessageKind::Plain,
                    ..
                },
                MessagingEvent::MessageReceived { .. },
            ]
        ));
    }

    #[tokio::test]
    async fn test_reply_is_not_answered() {
        let pair = Pair::new();
        let request =
            MessageRequest::round_trip(BOB_CHANNEL, "ping").return_options(return_options(10));
        send_quoted(&pair, &request).await;

        pair.network.flush().await;

        let alice_applied = pair.alice.sink.applied();
        assert_eq!(alice_applied.len(), 1);
        assert_eq!(pair.bob.sink.applied().len(), 1, "no pong-pong");
        assert_eq!(pair.alice.treasury.available(), Fee::native(1_000_000));
    }

    #[tokio::test]
    async fn test_forward_excess_refunded_to_chosen_target() {
        let pair = Pair::new();
        let wallet = AppIdentity::new([0x77; 32]);
        let request = MessageRequest::plain(BOB_CHANNEL, "tip");

        let fee = pair.alice.messenger.quote(&request, false).await.unwrap();
        let funds = fee.saturating_add(&Fee::native(500));
        let receipt = pair
            .alice
            .messenger
            .send(&request, funds, wallet)
            .await
            .unwrap();

        assert_eq!(receipt.fee, fee);
        assert_eq!(receipt.nonce, 1);
        assert_eq!(pair.network.refunds_for(&wallet), Fee::native(500));
        assert_eq!(pair.network.refunds_for(&alice_identity()), Fee::ZERO);
    }

    #[tokio::test]
    async fn test_custom_responder_reply() {
        let responder: Arc<dyn Responder> =
            Arc::new(|_: &Origin, payload: &[u8]| -> Option<Vec<u8>> {
                let mut reply = b"ack:".to_vec();
                reply.extend_from_slice(payload);
                Some(reply)
            });
        let pair = Pair::build_with(
            FeeSchedule::default(),
            |config| config,
            |config| config,
            Fee::native(1_000_000),
            Some(responder),
        );

        let request = MessageRequest::round_trip(BOB_CHANNEL, "42");
        send_quoted(&pair, &request).await;
        pair.network.flush().await;

        assert_eq!(pair.alice.sink.payloads(), vec![b"ack:42".to_vec()]);
    }

    #[tokio::test]
    async fn test_configured_acknowledgment() {
        let pair = Pair::build(
            FeeSchedule::default(),
            |config| config,
            |config| config.with_acknowledgment(b"got it".to_vec()),
        );

        send_quoted(&pair, &MessageRequest::round_trip(BOB_CHANNEL, "ping")).await;
        pair.network.flush().await;

        assert_eq!(pair.alice.sink.payloads(), vec![b"got it".to_vec()]);
    }

    // =========================================================================
    // FEES
    // =========================================================================

    #[tokio::test]
    async fn test_underfunded_send_rejected_by_network() {
        let pair = Pair::new();
        let request = MessageRequest::plain(BOB_CHANNEL, "cheap");
        let fee = pair.alice.messenger.quote(&request, false).await.unwrap();

        let result = pair
            .alice
            .messenger
            .send(&request, fee.saturating_sub(&Fee::native(1)), alice_identity())
            .await;

        assert!(matches!(result, Err(MessagingError::TransportRejected(_))));
        assert_eq!(pair.network.pending(), 0);
        assert_eq!(pair.network.collected_fees(), Fee::ZERO);
    }

    #[tokio::test]
    async fn test_prequote_rejects_locally() {
        let pair = Pair::build(
            FeeSchedule::default(),
            |config| config.with_prequote_fees(true),
            |config| config,
        );
        let request = MessageRequest::plain(BOB_CHANNEL, "cheap");
        let fee = pair.alice.messenger.quote(&request, false).await.unwrap();

        let result = pair
            .alice
            .messenger
            .send(&request, Fee::native(1), alice_identity())
            .await;

        assert_eq!(
            result,
            Err(MessagingError::InsufficientFee {
                required: fee,
                provided: Fee::native(1),
            })
        );
        assert_eq!(pair.network.pending(), 0);
    }

    #[tokio::test]
    async fn test_secondary_asset_quote() {
        let pair = Pair::new();
        let request = MessageRequest::plain(BOB_CHANNEL, "x");

        let native = pair.alice.messenger.quote(&request, false).await.unwrap();
        let secondary = pair.alice.messenger.quote(&request, true).await.unwrap();

        assert_eq!(native.secondary, 0);
        assert_eq!(secondary.secondary, 500);
        assert_eq!(secondary.primary + 1_000, native.primary);
    }

    #[tokio::test]
    async fn test_quote_matches_charged_fee() {
        let pair = Pair::new();
        let request = MessageRequest::round_trip(BOB_CHANNEL, "ping")
            .send_options(return_options(7_000))
            .return_options(return_options(50_000));

        let quoted = send_quoted(&pair, &request).await;
        assert_eq!(pair.network.collected_fees(), quoted);
    }

    #[tokio::test]
    async fn test_quote_unreachable_destination() {
        let pair = Pair::build(
            FeeSchedule::default(),
            |config| config.with_peer(ChannelId(9), AppIdentity::new([0x09; 32])),
            |config| config,
        );

        let result = pair
            .alice
            .messenger
            .quote(&MessageRequest::plain(ChannelId(9), "x"), false)
            .await;
        assert!(matches!(result, Err(MessagingError::TransportUnavailable(_))));
    }

    // =========================================================================
    // ENFORCED OPTIONS
    // =========================================================================

    #[tokio::test]
    async fn test_forward_baseline_applied() {
        let pair = Pair::new();
        pair.alice
            .store
            .set(BOB_CHANNEL, MessageKind::RoundTrip, return_options(200_000))
            .unwrap();

        send_quoted(&pair, &MessageRequest::round_trip(BOB_CHANNEL, "ping")).await;

        let in_flight = pair.network.in_flight();
        assert_eq!(in_flight[0].options, return_options(200_000));
        assert_eq!(
            pair.alice
                .messenger
                .enforced_options(BOB_CHANNEL, MessageKind::RoundTrip),
            Some(return_options(200_000))
        );
    }

    #[tokio::test]
    async fn test_return_baseline_combined_with_embedded_options() {
        let pair = Pair::new();
        pair.bob
            .store
            .set(ALICE_CHANNEL, MessageKind::Plain, return_options(100_000))
            .unwrap();

        let request =
            MessageRequest::round_trip(BOB_CHANNEL, "ping").return_options(return_options(50_000));
        send_quoted(&pair, &request).await;

        let forward = pair.network.deliver_next().await.unwrap();
        assert!(forward.is_delivered());

        let in_flight = pair.network.in_flight();
        assert_eq!(in_flight.len(), 1);
        assert_eq!(in_flight[0].destination, ALICE_CHANNEL);
        assert_eq!(in_flight[0].options.execution_budget().unwrap().gas, 150_000);

        pair.network.deliver_next().await.unwrap();
        assert_eq!(pair.alice.sink.payloads(), vec![b"pong".to_vec()]);
    }

    #[tokio::test]
    async fn test_baselines_from_config() {
        let pair = Pair::build(
            FeeSchedule::default(),
            |config| {
                config.with_enforced_options(BOB_CHANNEL, MessageKind::Plain, return_options(5))
            },
            |config| config,
        );

        send_quoted(&pair, &MessageRequest::plain(BOB_CHANNEL, "x")).await;
        assert_eq!(pair.network.in_flight()[0].options, return_options(5));
    }

    // =========================================================================
    // FAILURE ISOLATION
    // =========================================================================

    #[tokio::test]
    async fn test_treasury_shortfall_keeps_delivery() {
        let pair = Pair::build_with(
            FeeSchedule::default(),
            |config| config,
            |config| config,
            Fee::ZERO,
            None,
        );
        let mut bob_events = pair.bob.events();

        send_quoted(&pair, &MessageRequest::round_trip(BOB_CHANNEL, "ping")).await;
        let reports = pair.network.flush().await;

        assert_eq!(reports.len(), 1, "no return leg on the wire");
        let outcome = reports[0].result.as_ref().unwrap();
        assert!(matches!(
            outcome.applied()[0].return_leg,
            ReturnLeg::Failed(MessagingError::InsufficientReturnFunds { .. })
        ));
        assert_eq!(pair.bob.sink.payloads(), vec![b"ping".to_vec()]);
        assert!(pair.alice.sink.payloads().is_empty());

        let log = bob_events.drain();
        assert!(matches!(
            log.as_slice(),
            [
                MessagingEvent::ReturnDispatchFailed { .. },
                MessagingEvent::MessageReceived { .. },
            ]
        ));
    }

    #[tokio::test]
    async fn test_untrusted_channel_rejected() {
        let pair = Pair::new();
        let mallory_identity = AppIdentity::new([0x66; 32]);
        let mallory_config = MessagingConfig {
            local_channel: ChannelId(3),
            identity: mallory_identity,
            ..Default::default()
        }
        .with_peer(BOB_CHANNEL, bob_identity());
        let mallory = Node::spawn(&pair.network, mallory_config, Fee::ZERO, None);

        let request = MessageRequest::round_trip(BOB_CHANNEL, "gimme");
        let fee = mallory.messenger.quote(&request, false).await.unwrap();
        mallory
            .messenger
            .send(&request, fee, mallory_identity)
            .await
            .unwrap();

        let reports = pair.network.flush().await;
        assert_eq!(reports.len(), 1);
        assert!(matches!(
            reports[0].result,
            Err(MessagingError::UnauthorizedPeer { .. })
        ));
        assert!(pair.bob.sink.payloads().is_empty());
        assert_eq!(pair.bob.treasury.available(), Fee::native(1_000_000));
    }
}
