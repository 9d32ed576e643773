use super::protocol::{
    AddressResult, DumpResponse, FindSuccessorRequest, GetAllRequest, GetAllResponse, GetResponse,
    KeyRequest, NotifyRequest, PingResponse, PutAllRequest, PutRequest, ENDPOINT_DELETE,
    ENDPOINT_DUMP, ENDPOINT_FIND_SUCCESSOR, ENDPOINT_GET, ENDPOINT_GET_ALL, ENDPOINT_NODE_LINKS,
    ENDPOINT_NOTIFY, ENDPOINT_PING, ENDPOINT_PUT, ENDPOINT_PUT_ALL,
};
use crate::error::DhtError;
use crate::node::types::{Address, Key, NodeLinks};
use crate::ring::id::Id;

use anyhow::{anyhow, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;

const CALL_TIMEOUT: Duration = Duration::from_millis(800);
const CALL_ATTEMPTS: usize = 2;

/// Request/reply adapter to a remote node.
///
/// Every call dials the target address afresh (idle connections are not
/// pooled), sends one method payload and reads one reply. A transport
/// failure after the retries is the caller's signal that the peer is gone;
/// the maintenance loops are built around exactly that signal.
#[derive(Clone)]
pub struct RpcClient {
    http: reqwest::Client,
}

impl RpcClient {
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(0)
            .timeout(CALL_TIMEOUT)
            .build()?;
        Ok(RpcClient { http })
    }

    async fn post_with_retry<T: Serialize>(
        &self,
        address: &Address,
        endpoint: &str,
        payload: &T,
    ) -> Result<reqwest::Response> {
        let url = format!("http://{}{}", address.0, endpoint);
        let mut delay_ms = 150u64;

        for attempt in 0..CALL_ATTEMPTS {
            match self.http.post(&url).json(payload).send().await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    if attempt + 1 == CALL_ATTEMPTS {
                        return Err(anyhow!(e).context(format!("calling {}", url)));
                    }
                    let jitter = rand::random::<u64>() % 50;
                    tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                    delay_ms = (delay_ms * 2).min(1200);
                }
            }
        }

        Err(anyhow!("retry attempts exhausted"))
    }

    async fn get_with_retry(&self, address: &Address, endpoint: &str) -> Result<reqwest::Response> {
        let url = format!("http://{}{}", address.0, endpoint);
        let mut delay_ms = 150u64;

        for attempt in 0..CALL_ATTEMPTS {
            match self.http.get(&url).send().await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    if attempt + 1 == CALL_ATTEMPTS {
                        return Err(anyhow!(e).context(format!("calling {}", url)));
                    }
                    let jitter = rand::random::<u64>() % 50;
                    tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                    delay_ms = (delay_ms * 2).min(1200);
                }
            }
        }

        Err(anyhow!("retry attempts exhausted"))
    }

    async fn expect_json<T: DeserializeOwned>(
        method: &str,
        response: reqwest::Response,
    ) -> Result<T> {
        if !response.status().is_success() {
            return Err(anyhow!("{} failed: {}", method, response.status()));
        }
        Ok(response.json().await?)
    }

    /// Liveness probe.
    pub async fn ping(&self, address: &Address) -> Result<bool> {
        let response = self.get_with_retry(address, ENDPOINT_PING).await?;
        let reply: PingResponse = Self::expect_json("ping", response).await?;
        Ok(reply.alive)
    }

    /// One routing step on the remote node.
    pub async fn find_successor(&self, address: &Address, id: &Id) -> Result<AddressResult> {
        let response = self
            .post_with_retry(address, ENDPOINT_FIND_SUCCESSOR, &FindSuccessorRequest { id: *id })
            .await?;
        Self::expect_json("find_successor", response).await
    }

    /// Offer ourselves to `address` as its predecessor.
    pub async fn notify(&self, address: &Address, candidate: &Address) -> Result<()> {
        let response = self
            .post_with_retry(
                address,
                ENDPOINT_NOTIFY,
                &NotifyRequest {
                    candidate: candidate.clone(),
                },
            )
            .await?;
        if !response.status().is_success() {
            return Err(anyhow!("notify failed: {}", response.status()));
        }
        Ok(())
    }

    /// The remote node's predecessor and successor list.
    pub async fn node_links(&self, address: &Address) -> Result<NodeLinks> {
        let response = self.get_with_retry(address, ENDPOINT_NODE_LINKS).await?;
        Self::expect_json("node_links", response).await
    }

    pub async fn put(&self, address: &Address, key: Key, value: String) -> Result<()> {
        let response = self
            .post_with_retry(address, ENDPOINT_PUT, &PutRequest { key, value })
            .await?;
        if !response.status().is_success() {
            return Err(anyhow!("put failed: {}", response.status()));
        }
        Ok(())
    }

    pub async fn get(&self, address: &Address, key: Key) -> Result<String> {
        let response = self
            .post_with_retry(address, ENDPOINT_GET, &KeyRequest { key })
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(DhtError::NoSuchKey.into());
        }
        let reply: GetResponse = Self::expect_json("get", response).await?;
        match reply.value {
            Some(value) => Ok(value),
            None => Err(DhtError::NoSuchKey.into()),
        }
    }

    /// Remove the key remotely, returning the value it had.
    pub async fn delete(&self, address: &Address, key: Key) -> Result<String> {
        let response = self
            .post_with_retry(address, ENDPOINT_DELETE, &KeyRequest { key })
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(DhtError::NoSuchKey.into());
        }
        let reply: GetResponse = Self::expect_json("delete", response).await?;
        match reply.value {
            Some(value) => Ok(value),
            None => Err(DhtError::NoSuchKey.into()),
        }
    }

    /// Bulk merge into the remote node's store.
    pub async fn put_all(&self, address: &Address, entries: HashMap<Key, String>) -> Result<()> {
        let response = self
            .post_with_retry(address, ENDPOINT_PUT_ALL, &PutAllRequest { entries })
            .await?;
        if !response.status().is_success() {
            return Err(anyhow!("put_all failed: {}", response.status()));
        }
        Ok(())
    }

    /// Pull the keys `new_address` now owns out of the remote node.
    pub async fn get_all(
        &self,
        address: &Address,
        new_address: &Address,
    ) -> Result<HashMap<Key, String>> {
        let response = self
            .post_with_retry(
                address,
                ENDPOINT_GET_ALL,
                &GetAllRequest {
                    address: new_address.clone(),
                },
            )
            .await?;
        let reply: GetAllResponse = Self::expect_json("get_all", response).await?;
        Ok(reply.entries)
    }

    pub async fn dump(&self, address: &Address) -> Result<DumpResponse> {
        let response = self.get_with_retry(address, ENDPOINT_DUMP).await?;
        Self::expect_json("dump", response).await
    }
}
