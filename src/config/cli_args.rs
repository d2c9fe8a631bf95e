use crate::config::system::VERSION_STR;
use clap::{
    Arg,
    ArgAction,
    Command,
};

// Generic CLI args. A config file takes precedence over these if present.
pub fn create_match() -> Command {
    Command::new("ethmux")
        .version(VERSION_STR)
        .author("ethmux contributors")
        .about("Fault tolerant multiplexing and caching for Ethereum JSON-RPC providers.")
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .default_value("config.toml")
                .help("TOML config file for ethmux"),
        )
        .arg(
            Arg::new("rpc_list")
                .long("rpc-list")
                .short('r')
                .default_value("")
                .help("Comma separated list of backend RPC endpoint URLs"),
        )
        .arg(
            Arg::new("address")
                .long("address")
                .short('a')
                .default_value("127.0.0.1:3000")
                .help("Address to listen to"),
        )
        .arg(
            Arg::new("port")
                .long("port")
                .short('p')
                .default_value("3000")
                .help("Port to listen to"),
        )
        .arg(
            Arg::new("selection")
                .long("selection")
                .default_value("round-robin")
                .help("Provider selection strategy: round-robin or weighted-lru"),
        )
        .arg(
            Arg::new("ttl")
                .long("ttl")
                .default_value("3000")
                .help("Time in ms for a provider to respond before we try the next one"),
        )
        .arg(
            Arg::new("cache_ttl")
                .long("cache-ttl")
                .default_value("5000")
                .help("Time in ms a cached balance response stays fresh. 0 disables caching"),
        )
        .arg(
            Arg::new("cooldown_threshold")
                .long("cooldown-threshold")
                .default_value("3")
                .help("Consecutive failures before a provider is put in cooldown"),
        )
        .arg(
            Arg::new("cooldown")
                .long("cooldown")
                .default_value("30000")
                .help("Time in ms a provider in cooldown is excluded from selection"),
        )
        .arg(
            Arg::new("health_check")
                .long("health-check")
                .action(ArgAction::SetTrue)
                .help("Enable the background provider health check"),
        )
        .arg(
            Arg::new("health_check_ttl")
                .long("health-check-ttl")
                .default_value("12000")
                .help("How often to probe providers, in ms"),
        )
}
