use crate::cli::{
    actions::{server::Args, Action},
    globals::GlobalArgs,
};
use anyhow::{anyhow, Context, Result};
use secrecy::SecretString;
use std::{net::IpAddr, time::Duration};
use url::Url;

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let bind = matches
        .get_one::<IpAddr>("bind")
        .copied()
        .context("missing required argument: --bind")?;

    let mideye_url = matches
        .get_one::<String>("mideye-url")
        .context("missing required argument: --mideye-url")?;
    let mideye_url = parse_mideye_url(mideye_url).context("invalid MIDEYE_URL")?;

    let mut globals = GlobalArgs::new(mideye_url);

    if let Some(api_key) = matches.get_one::<String>("api-key") {
        globals.set_api_key(SecretString::from(api_key.clone()));
    }

    if let Some(timeout) = matches.get_one::<u64>("timeout") {
        globals.timeout = Duration::from_secs(*timeout);
    }

    if let Some(timeout) = matches.get_one::<u64>("connect-timeout") {
        globals.connect_timeout = Duration::from_secs(*timeout);
    }

    globals.skip_tls_verify = matches.get_flag("skip-tls-verify");

    if let Some(size) = matches.get_one::<usize>("event-log-max-size") {
        globals.event_log_max_size = *size;
    }

    if let Some(hours) = matches.get_one::<u64>("event-ttl-hours") {
        globals.event_ttl = Duration::from_secs(hours.saturating_mul(3600));
    }

    globals.admin_token = matches
        .get_one::<String>("admin-token")
        .filter(|token| !token.trim().is_empty())
        .map(|token| SecretString::from(token.clone()));

    Ok(Action::Server(Args {
        bind,
        port,
        globals,
    }))
}

/// Only absolute http(s) URLs with a host make sense as a Mideye Server base.
///
/// # Errors
/// Returns an error if the URL cannot be parsed, has no host or an unsupported scheme.
pub fn parse_mideye_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(anyhow!("unsupported scheme {scheme}")),
    }

    if url.host().is_none() {
        return Err(anyhow!("no host specified"));
    }

    Ok(url)
}
