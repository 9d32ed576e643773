use super::helper::{local_ip, random_string, validate_address};
use crate::error::DhtError;
use crate::node::service::{LeaveOutcome, RingNode};
use crate::node::types::{Address, Key};
use crate::rpc::client::RpcClient;

use anyhow::{bail, Context, Result};
use std::io::Write as _;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

pub const DEFAULT_PORT: u16 = 3400;

type Input = Lines<BufReader<Stdin>>;

pub(crate) struct CommandSpec {
    pub(crate) name: &'static str,
    pub(crate) usage: &'static str,
    pub(crate) description: &'static str,
    pub(crate) join_required: bool,
}

pub(crate) const COMMANDS: &[CommandSpec] = &[
    CommandSpec { name: "help", usage: "help", description: "List all commands", join_required: false },
    CommandSpec { name: "port", usage: "port <number>", description: "Change the listening port (before joining)", join_required: false },
    CommandSpec { name: "create", usage: "create", description: "Create a new chord ring", join_required: false },
    CommandSpec { name: "join", usage: "join <host>:<port>", description: "Join a ring through a known node", join_required: false },
    CommandSpec { name: "getaddr", usage: "getaddr", description: "Print this node's address", join_required: true },
    CommandSpec { name: "ping", usage: "ping <host>:<port>", description: "Probe a node for liveness", join_required: false },
    CommandSpec { name: "put", usage: "put <key> <value>", description: "Store a key/value pair on the ring", join_required: true },
    CommandSpec { name: "get", usage: "get <key>", description: "Fetch the value of a key", join_required: true },
    CommandSpec { name: "delete", usage: "delete <key>", description: "Remove a key and print its old value", join_required: true },
    CommandSpec { name: "putrandom", usage: "putrandom <count>", description: "Store random key/value pairs", join_required: true },
    CommandSpec { name: "dump", usage: "dump", description: "Print this node's state", join_required: true },
    CommandSpec { name: "dumpkey", usage: "dumpkey <key>", description: "Print the state of the node owning a key", join_required: true },
    CommandSpec { name: "dumpaddr", usage: "dumpaddr <host>:<port>", description: "Print the state of the node at an address", join_required: false },
    CommandSpec { name: "dumpall", usage: "dumpall", description: "Print the state of every node on the ring", join_required: true },
    CommandSpec { name: "quit", usage: "quit", description: "Offload data and leave the ring", join_required: false },
];

enum Flow {
    Continue,
    Quit,
}

/// The interactive operator shell. Owns the lifecycle of the process-wide
/// node: before `create` or `join` there is none, afterwards exactly one.
pub struct Shell {
    host: String,
    port: u16,
    node: Option<RingNode>,
}

impl Shell {
    pub fn new(port: u16) -> Self {
        Shell {
            host: local_ip(),
            port,
            node: None,
        }
    }

    fn local_address(&self) -> Address {
        Address(format!("{}:{}", self.host, self.port))
    }

    fn joined(&self) -> Result<&RingNode> {
        self.node.as_ref().ok_or_else(|| {
            DhtError::InvalidState("not part of a ring yet; use create or join").into()
        })
    }

    /// A client for commands that work without ring membership.
    fn any_client(&self) -> Result<RpcClient> {
        match &self.node {
            Some(node) => Ok(node.client.clone()),
            None => RpcClient::new(),
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        println!("Chord distributed hash table");
        println!("current address: {}:{}", self.host, self.port);
        println!("type 'help' for the command list");
        println!();

        let mut input = BufReader::new(tokio::io::stdin()).lines();
        prompt();
        while let Some(line) = input.next_line().await? {
            match self.dispatch(line.trim(), &mut input).await {
                Ok(Flow::Quit) => return Ok(()),
                Ok(Flow::Continue) => {}
                Err(e) => println!("error: {e:#}"),
            }
            prompt();
        }
        Ok(())
    }

    async fn dispatch(&mut self, line: &str, input: &mut Input) -> Result<Flow> {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            return Ok(Flow::Continue);
        };
        let args: Vec<&str> = words.collect();

        match command.to_lowercase().as_str() {
            "help" => self.help(),
            "port" => self.change_port(&args)?,
            "create" => self.create().await?,
            "join" => self.join(&args).await?,
            "getaddr" => println!("{}", self.joined()?.address.0),
            "ping" => self.ping(&args).await?,
            "put" => self.put(&args).await?,
            "get" => self.get(&args).await?,
            "delete" => self.delete(&args).await?,
            "putrandom" => self.put_random(&args).await?,
            "dump" => println!("{}", self.joined()?.dump_self().await?),
            "dumpkey" => self.dump_key(&args).await?,
            "dumpaddr" => self.dump_address(&args).await?,
            "dumpall" => self.dump_all().await?,
            "quit" => return self.quit(input).await,
            _ => println!("unrecognized command; type 'help' for the list"),
        }
        Ok(Flow::Continue)
    }

    fn help(&self) {
        let name_width = COMMANDS.iter().map(|c| c.name.len()).max().unwrap_or(0);
        let usage_width = COMMANDS.iter().map(|c| c.usage.len()).max().unwrap_or(0);
        println!("commands (* requires ring membership):");
        for spec in COMMANDS {
            let marker = if spec.join_required { "*" } else { " " };
            println!(
                "  {} {:<name_width$}  {:<usage_width$}  {}",
                marker, spec.name, spec.usage, spec.description
            );
        }
    }

    fn change_port(&mut self, args: &[&str]) -> Result<()> {
        if self.node.is_some() {
            return Err(DhtError::InvalidState("can't change port while part of a ring").into());
        }
        let [port] = args else { bail!("usage: port <number>") };
        let port: u16 = port.parse().context("bad port number")?;
        if port == 0 {
            bail!("bad port number: 0");
        }
        println!("listening port changed from {} to {}", self.port, port);
        self.port = port;
        Ok(())
    }

    async fn create(&mut self) -> Result<()> {
        if self.node.is_some() {
            return Err(DhtError::InvalidState("already part of a ring").into());
        }
        let node = RingNode::create(self.local_address()).await?;
        println!("local address: {}", node.address);
        self.node = Some(node);
        Ok(())
    }

    async fn join(&mut self, args: &[&str]) -> Result<()> {
        if self.node.is_some() {
            return Err(DhtError::InvalidState("already part of a ring").into());
        }
        let [bootstrap] = args else { bail!("usage: join <host>:<port>") };
        let bootstrap = validate_address(bootstrap)?;
        let node = RingNode::join(self.local_address(), bootstrap).await?;
        println!("local address: {}", node.address);
        self.node = Some(node);
        Ok(())
    }

    async fn ping(&self, args: &[&str]) -> Result<()> {
        let [target] = args else { bail!("usage: ping <host>:<port>") };
        let target = validate_address(target)?;
        if self.any_client()?.ping(&target).await? {
            println!("{} is alive", target.0);
        }
        Ok(())
    }

    async fn put(&self, args: &[&str]) -> Result<()> {
        let node = self.joined()?;
        let [key, value] = args else { bail!("usage: put <key> <value>") };
        node.put(Key(key.to_string()), value.to_string()).await?;
        println!("put {} => {}", key, value);
        Ok(())
    }

    async fn get(&self, args: &[&str]) -> Result<()> {
        let node = self.joined()?;
        let [key] = args else { bail!("usage: get <key>") };
        let value = node.get(Key(key.to_string())).await?;
        println!("{} => {}", key, value);
        Ok(())
    }

    async fn delete(&self, args: &[&str]) -> Result<()> {
        let node = self.joined()?;
        let [key] = args else { bail!("usage: delete <key>") };
        let previous = node.delete(Key(key.to_string())).await?;
        println!("deleted {} (was {})", key, previous);
        Ok(())
    }

    async fn put_random(&self, args: &[&str]) -> Result<()> {
        let node = self.joined()?;
        let [count] = args else { bail!("usage: putrandom <count>") };
        let count: usize = count.parse().context("bad count")?;
        for _ in 0..count {
            let key = Key(random_string(5));
            let value = random_string(5);
            println!("put {} => {}", key.0, value);
            node.put(key, value).await?;
        }
        Ok(())
    }

    async fn dump_key(&self, args: &[&str]) -> Result<()> {
        let node = self.joined()?;
        let [key] = args else { bail!("usage: dumpkey <key>") };
        println!("{}", node.dump_key(&Key(key.to_string())).await?);
        Ok(())
    }

    async fn dump_address(&self, args: &[&str]) -> Result<()> {
        let [target] = args else { bail!("usage: dumpaddr <host>:<port>") };
        let target = validate_address(target)?;
        println!("{}", self.any_client()?.dump(&target).await?.dump);
        Ok(())
    }

    async fn dump_all(&self) -> Result<()> {
        let node = self.joined()?;
        for (i, dump) in node.dump_all().await?.iter().enumerate() {
            if i > 0 {
                println!("{}", "=".repeat(50));
            }
            println!("{dump}");
        }
        Ok(())
    }

    /// Graceful exit. A failed offload keeps the session alive so the
    /// operator can retry once the ring heals; the last node must confirm
    /// before its data is dropped.
    async fn quit(&mut self, input: &mut Input) -> Result<Flow> {
        if let Some(node) = &self.node {
            match node.leave().await? {
                LeaveOutcome::Offloaded { to, keys } => {
                    println!("offloaded {} keys to {}", keys, to.0);
                }
                LeaveOutcome::LastNode { keys } => {
                    println!("last node in the ring; {} stored keys will be lost", keys);
                    print!("quit anyway? (y/n) ");
                    let _ = std::io::stdout().flush();
                    let answer = input.next_line().await?.unwrap_or_default();
                    if answer.trim() != "y" {
                        println!("quit aborted");
                        return Ok(Flow::Continue);
                    }
                    node.shutdown().await;
                    println!("ring terminated");
                }
            }
        }
        println!("goodbye");
        Ok(Flow::Quit)
    }
}

fn prompt() {
    print!(">>> ");
    let _ = std::io::stdout().flush();
}
