use crate::cli::{globals::GlobalArgs, telemetry};
use crate::magiclink;
use anyhow::Result;
use std::net::{IpAddr, SocketAddr};

#[derive(Debug)]
pub struct Args {
    pub bind: IpAddr,
    pub port: u16,
    pub globals: GlobalArgs,
}

/// Run the HTTP server until it is asked to stop.
/// # Errors
/// Returns an error if the server cannot start.
pub async fn execute(args: Args) -> Result<()> {
    let addr = SocketAddr::new(args.bind, args.port);

    let result = magiclink::new(addr, &args.globals).await;

    telemetry::shutdown_tracer();

    result
}
