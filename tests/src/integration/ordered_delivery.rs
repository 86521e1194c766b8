//! # Ordered Delivery
//!
//! Bob's messenger behind an `OrderedReceiver`, with the network's queue
//! delivered out of order by hand.

#[cfg(test)]
mod tests {
    use super::super::fixtures::{alice_identity, Pair, BOB_CHANNEL};
    use qc_15_cross_chain_messaging::{
        encode_envelope, AppIdentity, ChannelId, MessageKind, MessageReceiver, MessageRequest,
        MessageSender, MessagingError, OrderedReceiver, Origin, ReceiveOutcome,
        RoundTripMessenger, DEFAULT_REORDER_WINDOW,
    };
    use std::sync::Arc;

    type Ordered = OrderedReceiver<Arc<RoundTripMessenger>>;

    /// Put bob's messenger behind an ordering decorator.
    fn order_bob(pair: &Pair) -> Arc<Ordered> {
        let ordered = Arc::new(OrderedReceiver::new(pair.bob.messenger.clone()));
        pair.network
            .attach_receiver(BOB_CHANNEL, &ordered)
            .unwrap();
        ordered
    }

    async fn send_all(pair: &Pair, requests: &[MessageRequest]) {
        for request in requests {
            let fee = pair.alice.messenger.quote(request, false).await.unwrap();
            pair.alice
                .messenger
                .send(request, fee, alice_identity())
                .await
                .unwrap();
        }
    }

    fn plain(payloads: &[&str]) -> Vec<MessageRequest> {
        payloads
            .iter()
            .map(|payload| MessageRequest::plain(BOB_CHANNEL, *payload))
            .collect()
    }

    #[tokio::test]
    async fn test_reversed_delivery_applied_in_nonce_order() {
        let pair = Pair::new();
        let ordered = order_bob(&pair);
        send_all(&pair, &plain(&["m1", "m2", "m3"])).await;

        let mut packets = pair.network.take_in_flight();
        packets.reverse();

        let third = pair.network.deliver(packets[0].clone()).await;
        assert!(matches!(
            third.result,
            Ok(ReceiveOutcome::Buffered {
                expected_nonce: 1,
                ..
            })
        ));
        let second = pair.network.deliver(packets[1].clone()).await;
        assert!(second.result.as_ref().unwrap().is_buffered());
        assert!(pair.bob.sink.payloads().is_empty());
        assert_eq!(ordered.buffered_count().await, 2);

        let first = pair.network.deliver(packets[2].clone()).await;
        let applied = first.result.unwrap();
        let nonces: Vec<u64> = applied.applied().iter().map(|m| m.origin.nonce).collect();
        assert_eq!(nonces, vec![1, 2, 3]);

        assert_eq!(
            pair.bob.sink.payloads(),
            vec![b"m1".to_vec(), b"m2".to_vec(), b"m3".to_vec()]
        );
        assert_eq!(ordered.buffered_count().await, 0);
        assert_eq!(
            ordered
                .next_expected(pair.alice.channel, pair.alice.identity)
                .await,
            4
        );
    }

    #[tokio::test]
    async fn test_replayed_delivery_rejected() {
        let pair = Pair::new();
        let _ordered = order_bob(&pair);
        send_all(&pair, &plain(&["once"])).await;

        let packet = pair.network.take_in_flight().remove(0);
        assert!(pair.network.deliver(packet.clone()).await.is_delivered());

        let replay = pair.network.deliver(packet).await;
        assert_eq!(
            replay.result,
            Err(MessagingError::DuplicateDelivery {
                expected: 2,
                received: 1
            })
        );
        assert_eq!(pair.bob.sink.payloads().len(), 1);
    }

    #[tokio::test]
    async fn test_unordered_receiver_applies_arrival_order() {
        let pair = Pair::new();
        send_all(&pair, &plain(&["m1", "m2"])).await;

        let mut packets = pair.network.take_in_flight();
        packets.reverse();
        for packet in packets {
            pair.network.deliver(packet).await;
        }

        assert_eq!(
            pair.bob.sink.payloads(),
            vec![b"m2".to_vec(), b"m1".to_vec()]
        );
    }

    #[tokio::test]
    async fn test_out_of_order_round_trips_each_answered() {
        let pair = Pair::new();
        let _ordered = order_bob(&pair);
        let requests: Vec<MessageRequest> = ["a", "b", "c"]
            .iter()
            .map(|payload| MessageRequest::round_trip(BOB_CHANNEL, *payload))
            .collect();
        send_all(&pair, &requests).await;

        let mut packets = pair.network.take_in_flight();
        packets.reverse();
        for packet in packets {
            assert!(pair.network.deliver(packet).await.is_delivered());
        }

        assert_eq!(pair.network.pending(), 3, "one reply per round trip");
        let replies = pair.network.flush().await;
        assert!(replies.iter().all(|report| report.is_delivered()));

        let origins: Vec<u64> = pair
            .alice
            .sink
            .applied()
            .iter()
            .map(|(_, origin)| origin.nonce)
            .collect();
        assert_eq!(origins, vec![1, 2, 3]);
        assert_eq!(pair.alice.sink.payloads().len(), 3);
    }

    #[tokio::test]
    async fn test_direct_receive_through_decorator() {
        let pair = Pair::new();
        let ordered = order_bob(&pair);
        send_all(&pair, &plain(&["direct"])).await;

        let packet = pair.network.take_in_flight().remove(0);
        let outcome = ordered
            .receive(packet.origin, &packet.envelope)
            .await
            .unwrap();

        assert_eq!(outcome.applied()[0].payload, b"direct");
        assert_eq!(outcome.applied()[0].origin.source_channel, ChannelId(1));
    }

    #[tokio::test]
    async fn test_untrusted_delivery_fails_instead_of_buffering() {
        let pair = Pair::new();
        let ordered = order_bob(&pair);
        let stranger = AppIdentity::new([0x66; 32]);

        let result = ordered
            .receive(Origin::new(ChannelId(77), stranger, 2), b"garbage")
            .await;
        assert!(matches!(result, Err(MessagingError::UnauthorizedPeer { .. })));

        for nonce in 2..=500u64 {
            let mut id = [0u8; 32];
            id[..8].copy_from_slice(&nonce.to_be_bytes());
            let origin = Origin::new(ChannelId(77), AppIdentity::new(id), nonce);
            assert!(ordered.receive(origin, &[0xEE; 1024]).await.is_err());
        }
        assert_eq!(ordered.buffered_count().await, 0);
        assert!(pair.bob.sink.payloads().is_empty());
    }

    #[tokio::test]
    async fn test_trusted_garbage_ahead_is_rejected() {
        let pair = Pair::new();
        let ordered = order_bob(&pair);

        let origin = Origin::new(pair.alice.channel, pair.alice.identity, 2);
        let result = ordered.receive(origin, b"garbage").await;
        assert!(matches!(result, Err(MessagingError::MalformedEnvelope(_))));
        assert_eq!(ordered.buffered_count().await, 0);
    }

    #[tokio::test]
    async fn test_nonce_beyond_window_rejected() {
        let pair = Pair::new();
        let ordered = order_bob(&pair);
        let envelope = encode_envelope(b"far", MessageKind::Plain, &[]).unwrap();

        let from_alice = |nonce| Origin::new(pair.alice.channel, pair.alice.identity, nonce);

        let edge = from_alice(1 + DEFAULT_REORDER_WINDOW);
        assert!(ordered.receive(edge, &envelope).await.unwrap().is_buffered());

        assert_eq!(
            ordered
                .receive(from_alice(2 + DEFAULT_REORDER_WINDOW), &envelope)
                .await,
            Err(MessagingError::ReorderWindowExceeded {
                expected: 1,
                received: 2 + DEFAULT_REORDER_WINDOW,
                window: DEFAULT_REORDER_WINDOW,
            })
        );
        assert_eq!(ordered.buffered_count().await, 1);
    }
}
