use crate::error::DhtError;
use crate::node::types::Address;
use crate::ring::id::Id;
use crate::rpc::client::RpcClient;
use crate::rpc::protocol::AddressResult;
use anyhow::Result;

/// Ceiling on routing hops for a single lookup. A well-formed ring resolves
/// in O(log N) hops; the ceiling is the only guard against cycles while the
/// ring is mid-heal.
pub const MAX_REQUESTS: usize = 32;

/// Walk the ring from `start` to the node responsible for `id`.
///
/// Runs entirely on the caller's side: each hop asks one node for one
/// routing step and follows the returned address. Never call this while
/// holding the node actor.
pub async fn find(client: &RpcClient, id: &Id, start: Address) -> Result<Address> {
    let mut step = AddressResult {
        found: false,
        address: start,
    };
    for _ in 0..MAX_REQUESTS {
        if step.found {
            return Ok(step.address);
        }
        step = client.find_successor(&step.address, id).await?;
    }
    if step.found {
        Ok(step.address)
    } else {
        Err(DhtError::LookupExhausted(MAX_REQUESTS).into())
    }
}
