use anyhow::{Context, bail};
use clap::Parser;
use std::net::SocketAddr;

/// Runtime configuration for the `randstream-server` binary.
///
/// All values are parsed from CLI arguments or environment variables (a
/// `.env` file is loaded first), with defaults suitable for running behind a
/// reverse proxy that sets `X-Real-Ip` or `X-Forwarded-For`.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "randstream-server",
    version,
    about = "A WebSocket service streaming unique 256-bit random numbers"
)]
pub struct CliArgs {
    /// Address to listen on.
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("0.0.0.0:8080"))]
    pub server_addr: String,

    /// The single path that accepts WebSocket upgrades. Every other path
    /// answers 404.
    ///
    /// Environment variable: `WS_PATH`
    #[arg(long, env = "WS_PATH", default_value_t = String::from("/ws"))]
    pub ws_path: String,

    /// Size in bytes of each connection's read buffer.
    ///
    /// Environment variable: `READ_BUFFER_SIZE`
    #[arg(long, env = "READ_BUFFER_SIZE", default_value_t = 1024)]
    pub read_buffer_size: usize,

    /// Size in bytes of each connection's write buffer. Frames are flushed
    /// once this many bytes are pending.
    ///
    /// Environment variable: `WRITE_BUFFER_SIZE`
    #[arg(long, env = "WRITE_BUFFER_SIZE", default_value_t = 1024)]
    pub write_buffer_size: usize,

    /// Largest inbound message accepted, in bytes. Inbound payloads are
    /// ignored, so there is no reason to accept large ones.
    ///
    /// Environment variable: `MAX_MESSAGE_SIZE`
    #[arg(long, env = "MAX_MESSAGE_SIZE", default_value_t = 64 << 10)]
    pub max_message_size: usize,

    /// Initial capacity of the set of already-emitted numbers. The set grows
    /// as needed; this only avoids early rehashing.
    ///
    /// Environment variable: `SEEN_CAPACITY`
    #[arg(long, env = "SEEN_CAPACITY", default_value_t = 1024)]
    pub seen_capacity: usize,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub server_addr: SocketAddr,
    pub ws_path: String,
    pub read_buffer_size: usize,
    pub write_buffer_size: usize,
    pub max_message_size: usize,
    pub seen_capacity: usize,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let server_addr = args
            .server_addr
            .parse::<SocketAddr>()
            .with_context(|| format!("SERVER_ADDR ({}) is not a socket address", args.server_addr))?;

        if !args.ws_path.starts_with('/') {
            bail!("WS_PATH ({}) must start with '/'", args.ws_path);
        }

        if args.read_buffer_size == 0 {
            bail!("READ_BUFFER_SIZE must be greater than 0");
        }

        if args.write_buffer_size == 0 {
            bail!("WRITE_BUFFER_SIZE must be greater than 0");
        }

        if args.max_message_size == 0 {
            bail!("MAX_MESSAGE_SIZE must be greater than 0");
        }

        Ok(Self {
            server_addr,
            ws_path: args.ws_path,
            read_buffer_size: args.read_buffer_size,
            write_buffer_size: args.write_buffer_size,
            max_message_size: args.max_message_size,
            seen_capacity: args.seen_capacity,
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            ws_path: String::from("/ws"),
            read_buffer_size: 1024,
            write_buffer_size: 1024,
            max_message_size: 64 << 10,
            seen_capacity: 1024,
        }
    }
}
