use super::lookup;
use crate::node::service::RingNode;
use crate::ring::id::{between, KEY_BITS};
use anyhow::Result;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Tick periods for the three maintenance tasks. Tuning parameters, not
/// correctness parameters: shorter periods converge faster at the cost of
/// background traffic.
#[derive(Debug, Clone, Copy)]
pub struct MaintenanceConfig {
    pub stabilize: Duration,
    pub fix_fingers: Duration,
    pub check_predecessor: Duration,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        MaintenanceConfig {
            stabilize: Duration::from_secs(2),
            fix_fingers: Duration::from_secs(2),
            check_predecessor: Duration::from_secs(2),
        }
    }
}

impl MaintenanceConfig {
    pub fn from_env() -> Self {
        let secs = |var: &str, default: u64| {
            Duration::from_secs(
                std::env::var(var)
                    .ok()
                    .and_then(|value| value.parse::<u64>().ok())
                    .unwrap_or(default),
            )
        };
        MaintenanceConfig {
            stabilize: secs("CHORD_STABILIZE_SECS", 2),
            fix_fingers: secs("CHORD_FIX_FINGERS_SECS", 2),
            check_predecessor: secs("CHORD_CHECK_PREDECESSOR_SECS", 2),
        }
    }
}

/// Spawn the three maintenance loops. Each runs independently until
/// aborted; a failing iteration is logged and the loop keeps ticking,
/// because tolerating transient failure is the whole point of the loops.
pub fn start(node: RingNode, config: MaintenanceConfig) -> Vec<JoinHandle<()>> {
    vec![
        tokio::spawn(stabilize_loop(node.clone(), config.stabilize)),
        tokio::spawn(fix_fingers_loop(node.clone(), config.fix_fingers)),
        tokio::spawn(check_predecessor_loop(node, config.check_predecessor)),
    ]
}

async fn stabilize_loop(node: RingNode, period: Duration) {
    let mut interval = tokio::time::interval(period);
    loop {
        interval.tick().await;
        if let Err(e) = stabilize(&node).await {
            tracing::warn!("stabilize: {}", e);
        }
    }
}

/// One stabilize round: refresh the successor list from what the immediate
/// successor reports, replacing it when it is unreachable or when a newer
/// node has inserted itself between us, then notify the (possibly new)
/// successor that we believe we precede it.
async fn stabilize(node: &RingNode) -> Result<()> {
    let successor = node.actor.with(|n| n.successor().clone()).await?;
    match node.client.node_links(&successor).await {
        Ok(links) => {
            node.actor.with(move |n| n.merge_successor_links(links)).await?;
        }
        Err(e) => {
            let replacement = node
                .actor
                .with(|n| {
                    n.drop_failed_successor();
                    n.successor().clone()
                })
                .await?;
            tracing::warn!(
                "stabilize: successor {} unreachable, next is {}: {}",
                successor.0,
                replacement.0,
                e
            );
        }
    }

    let successor = node.actor.with(|n| n.successor().clone()).await?;
    node.client.notify(&successor, &node.address).await?;
    Ok(())
}

async fn fix_fingers_loop(node: RingNode, period: Duration) {
    let mut interval = tokio::time::interval(period);
    let mut next = 0usize;
    loop {
        interval.tick().await;
        next += 1;
        if next > KEY_BITS {
            next = 1;
        }
        match fix_finger(&node, next).await {
            Ok(reached) => next = reached,
            Err(e) => tracing::warn!("fix fingers: {}", e),
        }
    }
}

/// Refresh finger `entry`, then extend the same address over the run of
/// consecutive entries whose targets still fall short of it. Sparse rings
/// collapse most of the table this way. Returns the last entry written so
/// the cursor can continue past the run.
async fn fix_finger(node: &RingNode, entry: usize) -> Result<usize> {
    let target = node.actor.with(move |n| n.id.jump(entry)).await?;
    let address = lookup::find(&node.client, &target, node.address.clone()).await?;
    node.actor
        .with(move |n| {
            let address_id = address.id();
            let mut last = entry;
            n.fingers[entry] = Some(address.clone());
            while last < KEY_BITS && between(&n.id, &n.id.jump(last + 1), &address_id, false) {
                last += 1;
                n.fingers[last] = Some(address.clone());
            }
            last
        })
        .await
}

async fn check_predecessor_loop(node: RingNode, period: Duration) {
    let mut interval = tokio::time::interval(period);
    loop {
        interval.tick().await;
        if let Err(e) = check_predecessor(&node).await {
            tracing::warn!("check predecessor: {}", e);
        }
    }
}

/// Probe the predecessor and clear it when it stops answering. The node on
/// the far side re-notifies us once its own stabilize round comes around.
async fn check_predecessor(node: &RingNode) -> Result<()> {
    let Some(predecessor) = node.actor.with(|n| n.predecessor.clone()).await? else {
        return Ok(());
    };
    let alive = matches!(node.client.ping(&predecessor).await, Ok(true));
    if !alive {
        tracing::warn!("check predecessor: {} unreachable, clearing", predecessor.0);
        node.actor
            .with(move |n| {
                if n.predecessor.as_ref() == Some(&predecessor) {
                    n.predecessor = None;
                }
            })
            .await?;
    }
    Ok(())
}
