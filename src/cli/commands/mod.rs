use crate::cli::globals::{DEFAULT_API_KEY, DEFAULT_MIDEYE_URL};
use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        BoolishValueParser, ValueParser,
    },
    Arg, ArgAction, ColorChoice, Command,
};
use std::net::IpAddr;

pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            // Successfully parsed as a number
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("magiclink")
        .about("Passwordless phone authentication with Mideye")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("MIDEYE_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("bind")
                .long("bind")
                .help("Address to listen on")
                .default_value("0.0.0.0")
                .env("MIDEYE_BIND")
                .value_parser(clap::value_parser!(IpAddr)),
        )
        .arg(
            Arg::new("mideye-url")
                .long("mideye-url")
                .help("Base URL of the Mideye Server, example: https://mideye.tld:8443")
                .default_value(DEFAULT_MIDEYE_URL)
                .env("MIDEYE_URL"),
        )
        .arg(
            Arg::new("api-key")
                .long("api-key")
                .help("API key for the Magic Link endpoint")
                .default_value(DEFAULT_API_KEY)
                .env("MIDEYE_API_KEY")
                .hide_env_values(true)
                .hide_default_value(true),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .help("Seconds to wait for the user to answer on their phone")
                .default_value("120")
                .env("MIDEYE_TIMEOUT_SECONDS")
                .value_parser(clap::value_parser!(u64).range(1..=600)),
        )
        .arg(
            Arg::new("connect-timeout")
                .long("connect-timeout")
                .help("Seconds to wait for the TCP/TLS connection to the Mideye Server")
                .default_value("10")
                .env("MIDEYE_CONNECT_TIMEOUT_SECONDS")
                .value_parser(clap::value_parser!(u64).range(1..=120)),
        )
        .arg(
            Arg::new("skip-tls-verify")
                .long("skip-tls-verify")
                .help("Do not verify the Mideye Server certificate (testing only)")
                .env("MIDEYE_SKIP_TLS_VERIFY")
                .action(ArgAction::SetTrue)
                .value_parser(BoolishValueParser::new()),
        )
        .arg(
            Arg::new("event-log-max-size")
                .long("event-log-max-size")
                .help("Maximum number of authentication events kept in memory (100-50000)")
                .default_value("1000")
                .env("MIDEYE_EVENT_LOG_MAX_SIZE")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("event-ttl-hours")
                .long("event-ttl-hours")
                .help("Hours an authentication event is kept in memory")
                .default_value("1")
                .env("MIDEYE_EVENT_TTL_HOURS")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new("admin-token")
                .long("admin-token")
                .help("Bearer token for the /api admin endpoints, the admin API is disabled when unset")
                .env("MIDEYE_ADMIN_TOKEN")
                .hide_env_values(true),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("MIDEYE_LOG_LEVEL")
                .global(true)
                .action(ArgAction::Count)
                .value_parser(validator_log_level()),
        )
}
