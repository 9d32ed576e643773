#[cfg(test)]
mod tests {
    use crate::error::DhtError;
    use crate::node::service::RingNode;
    use crate::node::types::{Address, Key};
    use crate::ring::id::{between, Id};
    use crate::routing::lookup;
    use crate::routing::maintenance::MaintenanceConfig;
    use crate::rpc::client::RpcClient;
    use std::time::{Duration, Instant};

    async fn reserve_address() -> Address {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let port = listener.local_addr().expect("local addr").port();
        Address(format!("127.0.0.1:{port}"))
    }

    fn fast_config() -> MaintenanceConfig {
        MaintenanceConfig {
            stabilize: Duration::from_millis(100),
            fix_fingers: Duration::from_millis(100),
            check_predecessor: Duration::from_millis(100),
        }
    }

    async fn links_of(node: &RingNode) -> (Option<Address>, Vec<Address>) {
        node.actor
            .with(|n| (n.predecessor.clone(), n.successors.clone()))
            .await
            .expect("actor alive")
    }

    /// Poll until the two nodes agree they are each other's successor and
    /// predecessor.
    async fn wait_for_pair(a: &RingNode, b: &RingNode) {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            let (a_pred, a_succ) = links_of(a).await;
            let (b_pred, b_succ) = links_of(b).await;
            if a_succ[0] == b.address
                && b_succ[0] == a.address
                && a_pred.as_ref() == Some(&b.address)
                && b_pred.as_ref() == Some(&a.address)
            {
                return;
            }
            assert!(
                Instant::now() < deadline,
                "two-node ring did not converge: {a_pred:?}/{a_succ:?} {b_pred:?}/{b_succ:?}"
            );
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Poll until every node's immediate successor is the next node in ring
    /// order. Expects `nodes` sorted by id.
    async fn wait_for_ring(nodes: &[RingNode]) {
        let deadline = Instant::now() + Duration::from_secs(15);
        loop {
            let mut consistent = true;
            for (i, node) in nodes.iter().enumerate() {
                let (_, successors) = links_of(node).await;
                if successors[0] != nodes[(i + 1) % nodes.len()].address {
                    consistent = false;
                    break;
                }
            }
            if consistent {
                return;
            }
            assert!(Instant::now() < deadline, "ring did not converge");
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    // ============================================================
    // TWO-NODE RING
    // ============================================================

    #[tokio::test]
    async fn test_two_node_ring_converges() {
        let a_addr = reserve_address().await;
        let b_addr = reserve_address().await;
        let a = RingNode::create_with(a_addr.clone(), fast_config())
            .await
            .expect("create");
        let b = RingNode::join_with(b_addr, a_addr, fast_config())
            .await
            .expect("join");

        wait_for_pair(&a, &b).await;

        a.shutdown().await;
        b.shutdown().await;
    }

    #[tokio::test]
    async fn test_lookup_is_start_independent() {
        let a_addr = reserve_address().await;
        let b_addr = reserve_address().await;
        let a = RingNode::create_with(a_addr.clone(), fast_config())
            .await
            .expect("create");
        let b = RingNode::join_with(b_addr, a_addr, fast_config())
            .await
            .expect("join");
        wait_for_pair(&a, &b).await;

        for sample in ["alpha", "beta", "gamma", "delta"] {
            let id = Id::hash(sample.as_bytes());
            let from_a = a.locate(&id).await.expect("locate from a");
            let from_b = b.locate(&id).await.expect("locate from b");
            assert_eq!(from_a, from_b, "owner of {sample} depends on start");
        }

        // A value stored through one node is readable through the other.
        a.put(Key("alpha".to_string()), "1".to_string())
            .await
            .expect("put");
        assert_eq!(b.get(Key("alpha".to_string())).await.expect("get"), "1");

        a.shutdown().await;
        b.shutdown().await;
    }

    // ============================================================
    // KEY MIGRATION
    // ============================================================

    #[tokio::test]
    async fn test_keys_migrate_on_join() {
        let a_addr = reserve_address().await;
        let b_addr = reserve_address().await;
        let a = RingNode::create_with(a_addr.clone(), fast_config())
            .await
            .expect("create");

        for i in 0..12 {
            a.put(Key(format!("key-{i}")), format!("value-{i}"))
                .await
                .expect("put");
        }

        let b = RingNode::join_with(b_addr, a_addr, fast_config())
            .await
            .expect("join");

        // The join handover has already run; ownership decides placement.
        let held_by_a = a.actor.with(|n| n.data.clone()).await.expect("actor");
        let held_by_b = b.actor.with(|n| n.data.clone()).await.expect("actor");
        assert_eq!(held_by_a.len() + held_by_b.len(), 12);

        for i in 0..12 {
            let key = Key(format!("key-{i}"));
            let owned_by_b = between(&a.id, &key.id(), &b.id, true);
            assert_eq!(
                held_by_b.contains_key(&key),
                owned_by_b,
                "key-{i} is on the wrong node"
            );
            assert_ne!(held_by_a.contains_key(&key), held_by_b.contains_key(&key));
        }

        a.shutdown().await;
        b.shutdown().await;
    }

    // ============================================================
    // FAILURE RECOVERY
    // ============================================================

    #[tokio::test]
    async fn test_ring_heals_after_successor_crash() {
        let a_addr = reserve_address().await;
        let b_addr = reserve_address().await;
        let c_addr = reserve_address().await;
        let a = RingNode::create_with(a_addr.clone(), fast_config())
            .await
            .expect("create");
        let b = RingNode::join_with(b_addr, a_addr.clone(), fast_config())
            .await
            .expect("join b");
        let c = RingNode::join_with(c_addr, a_addr, fast_config())
            .await
            .expect("join c");

        let mut ring = vec![a, b, c];
        ring.sort_by(|x, y| x.id.cmp(&y.id));
        wait_for_ring(&ring).await;

        // Crash the successor of the first node.
        let victim = ring.remove(1);
        let victim_addr = victim.address.clone();
        victim.shutdown().await;

        let [first, other] = &ring[..] else {
            panic!("two survivors expected");
        };

        // The survivor drops the dead successor and reaches around it.
        let deadline = Instant::now() + Duration::from_secs(15);
        loop {
            let (_, successors) = links_of(first).await;
            if successors[0] == other.address && !successors.contains(&victim_addr) {
                break;
            }
            assert!(Instant::now() < deadline, "successor list kept the dead node");
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        // Lookups complete again once routing state has healed.
        let samples = ["red", "green", "blue", "cyan"];
        let deadline = Instant::now() + Duration::from_secs(15);
        'healing: loop {
            for sample in samples {
                match first.locate(&Id::hash(sample.as_bytes())).await {
                    Ok(owner) if owner != victim_addr => {}
                    _ => {
                        assert!(Instant::now() < deadline, "lookups still failing");
                        tokio::time::sleep(Duration::from_millis(200)).await;
                        continue 'healing;
                    }
                }
            }
            break;
        }

        for node in ring {
            node.shutdown().await;
        }
    }

    // ============================================================
    // GRACEFUL LEAVE
    // ============================================================

    #[tokio::test]
    async fn test_graceful_leave_offloads_keys() {
        let a_addr = reserve_address().await;
        let b_addr = reserve_address().await;
        let a = RingNode::create_with(a_addr.clone(), fast_config())
            .await
            .expect("create");
        let b = RingNode::join_with(b_addr, a_addr, fast_config())
            .await
            .expect("join");
        wait_for_pair(&a, &b).await;

        for i in 0..20 {
            a.put(Key(format!("key-{i}")), format!("value-{i}"))
                .await
                .expect("put");
        }

        let outcome = b.leave().await.expect("leave");
        match outcome {
            crate::node::service::LeaveOutcome::Offloaded { to, .. } => {
                assert_eq!(to, a.address);
            }
            other => panic!("expected offload, got {other:?}"),
        }

        // Every key survives on the remaining node; reads work again once
        // the survivor has dropped the departed successor.
        let held = a.actor.with(|n| n.data.clone()).await.expect("actor");
        assert_eq!(held.len(), 20);

        let deadline = Instant::now() + Duration::from_secs(15);
        'reads: loop {
            for i in 0..20 {
                match a.get(Key(format!("key-{i}"))).await {
                    Ok(value) => assert_eq!(value, format!("value-{i}")),
                    Err(_) => {
                        assert!(Instant::now() < deadline, "reads did not recover");
                        tokio::time::sleep(Duration::from_millis(200)).await;
                        continue 'reads;
                    }
                }
            }
            break;
        }

        a.shutdown().await;
    }

    #[tokio::test]
    async fn test_last_node_leave_is_reported_not_executed() {
        let a_addr = reserve_address().await;
        let a = RingNode::create_with(a_addr, fast_config())
            .await
            .expect("create");
        a.put(Key("k".to_string()), "v".to_string())
            .await
            .expect("put");

        match a.leave().await.expect("leave") {
            crate::node::service::LeaveOutcome::LastNode { keys } => assert_eq!(keys, 1),
            other => panic!("expected last-node outcome, got {other:?}"),
        }
        // Still serving: the decision to drop data belongs to the operator.
        assert_eq!(a.get(Key("k".to_string())).await.expect("get"), "v");

        a.shutdown().await;
    }

    // ============================================================
    // FINGER REPAIR
    // ============================================================

    #[tokio::test]
    async fn test_fix_fingers_fills_table_on_single_node() {
        let address = reserve_address().await;
        let node = RingNode::create_with(address.clone(), fast_config())
            .await
            .expect("create");

        // Alone on the ring every finger target resolves to ourselves, and
        // run compression writes the whole table in a handful of ticks.
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            let filled = node
                .actor
                .with(|n| n.fingers.iter().flatten().count())
                .await
                .expect("actor");
            if filled >= 150 {
                break;
            }
            assert!(Instant::now() < deadline, "finger table stayed sparse");
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        let all_self = node
            .actor
            .with(move |n| {
                n.fingers
                    .iter()
                    .flatten()
                    .all(|entry| *entry == n.address)
            })
            .await
            .expect("actor");
        assert!(all_self);

        node.shutdown().await;
    }

    // ============================================================
    // LOOKUP CEILING
    // ============================================================

    #[tokio::test]
    async fn test_lookup_gives_up_after_hop_ceiling() {
        use crate::rpc::protocol::{AddressResult, FindSuccessorRequest, ENDPOINT_FIND_SUCCESSOR};
        use axum::{routing::post, Json, Router};

        // A malicious little peer that always points back at itself.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let address = Address(format!(
            "127.0.0.1:{}",
            listener.local_addr().expect("local addr").port()
        ));
        let loop_target = address.clone();
        let app = Router::new().route(
            ENDPOINT_FIND_SUCCESSOR,
            post(move |Json(_req): Json<FindSuccessorRequest>| {
                let address = loop_target.clone();
                async move {
                    Json(AddressResult {
                        found: false,
                        address,
                    })
                }
            }),
        );
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let client = RpcClient::new().expect("client");
        let err = lookup::find(&client, &Id::hash(b"anything"), address)
            .await
            .expect_err("lookup can never resolve");
        assert!(matches!(
            err.downcast_ref::<DhtError>(),
            Some(DhtError::LookupExhausted(_))
        ));

        server.abort();
    }
}
