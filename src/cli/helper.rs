use crate::error::DhtError;
use crate::node::types::Address;
use anyhow::Result;
use rand::Rng;

/// Validate operator-supplied `host:port` input.
pub fn validate_address(input: &str) -> Result<Address> {
    let candidate = input.trim();
    if let Some((host, port)) = candidate.rsplit_once(':') {
        if !host.is_empty() {
            if let Ok(port) = port.parse::<u16>() {
                if port > 0 {
                    return Ok(Address(candidate.to_string()));
                }
            }
        }
    }
    Err(DhtError::InvalidAddress(candidate.to_string()).into())
}

/// Outward-facing IP of this host, discovered by opening a throwaway UDP
/// socket. Nothing is actually sent. Falls back to loopback when the host
/// has no route out.
pub fn local_ip() -> String {
    std::net::UdpSocket::bind("0.0.0.0:0")
        .and_then(|socket| {
            socket.connect("8.8.8.8:80")?;
            socket.local_addr()
        })
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|_| "127.0.0.1".to_string())
}

/// Random alphanumeric string for synthetic load.
pub fn random_string(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| rng.sample(rand::distributions::Alphanumeric) as char)
        .collect()
}
