use crate::{
    config::error::ConfigError,
    log_info,
    log_wrn,
    mux::{
        registry::ProviderRecord,
        selection::Strategy,
    },
    rpc::{
        adapter::{
            AlchemyAdapter,
            InfuraAdapter,
            InjectedAdapter,
            ProviderAdapter,
            UrlAdapter,
        },
        client::sanitize_url,
    },
};

use clap::{
    ArgMatches,
    Command,
};

use std::{
    fs,
    net::SocketAddr,
    path::PathBuf,
    sync::Arc,
    time::Duration,
};

use toml::Value;

pub struct Settings {
    pub records: Vec<ProviderRecord>,
    pub address: SocketAddr,
    pub strategy: Strategy,
    pub ttl: Duration,       // per attempt upstream budget
    pub cache_ttl: Duration, // freshness window for cached balances
    pub cooldown_threshold: u32,
    pub cooldown: Duration,
    pub health_check: bool,
    pub health_check_ttl: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            address: "127.0.0.1:3000".parse::<SocketAddr>().unwrap(),
            strategy: Strategy::RoundRobin,
            ttl: Duration::from_millis(3000),
            cache_ttl: Duration::from_millis(5000),
            cooldown_threshold: 3,
            cooldown: Duration::from_millis(30000),
            health_check: false,
            health_check_ttl: Duration::from_millis(12000),
        }
    }
}

impl Settings {
    pub fn new(matches: Command) -> Result<Settings, ConfigError> {
        let matches = matches.get_matches();

        // Try to open the file at the path specified in the args. An
        // explicitly passed path that can't be read is an error, only the
        // default falls back to plain command line arguments.
        let path = matches.get_one::<String>("config").unwrap().clone();
        let explicit =
            matches.value_source("config") == Some(clap::parser::ValueSource::CommandLine);
        match fs::read_to_string(&path) {
            Ok(file) => {
                log_info!("Using config file at {}", path);
                Settings::create_from_file(PathBuf::from(path), file)
            }
            Err(err) if explicit => Err(ConfigError::ReadError {
                config: PathBuf::from(path),
                err,
            }),
            Err(_) => {
                log_info!("Using command line arguments for settings...");
                Ok(Settings::create_from_matches(matches))
            }
        }
    }

    fn create_from_file(path: PathBuf, conf_file: String) -> Result<Settings, ConfigError> {
        let parsed_toml =
            conf_file
                .parse::<Value>()
                .map_err(|err| ConfigError::FailedDeserialization {
                    config: path,
                    err,
                })?;
        let defaults = Settings::default();

        let table_names: Vec<&String> = parsed_toml.as_table().unwrap().keys().collect::<Vec<_>>();

        // Parse the `ethmux` table, any missing key keeps its default
        let ethmux_table = parsed_toml.get("ethmux").and_then(Value::as_table);
        let get_str = |key: &str| ethmux_table.and_then(|table| table.get(key)).and_then(Value::as_str);
        let get_int = |key: &str| {
            ethmux_table
                .and_then(|table| table.get(key))
                .and_then(Value::as_integer)
        };
        let get_bool = |key: &str| {
            ethmux_table
                .and_then(|table| table.get(key))
                .and_then(Value::as_bool)
        };

        let address = match get_str("address") {
            Some(address) => parse_address(address)?,
            None => defaults.address,
        };

        let strategy = get_str("selection")
            .map(Strategy::parse)
            .unwrap_or(defaults.strategy);
        let ttl = get_int("ttl")
            .map(|ms| Duration::from_millis(ms as u64))
            .unwrap_or(defaults.ttl);
        let cache_ttl = get_int("cache_ttl")
            .map(|ms| Duration::from_millis(ms as u64))
            .unwrap_or(defaults.cache_ttl);
        let cooldown_threshold = get_int("cooldown_threshold")
            .map(|threshold| (threshold as u32).max(1))
            .unwrap_or(defaults.cooldown_threshold);
        let cooldown = get_int("cooldown")
            .map(|ms| Duration::from_millis(ms as u64))
            .unwrap_or(defaults.cooldown);
        let health_check = get_bool("health_check").unwrap_or(defaults.health_check);
        let health_check_ttl = get_int("health_check_ttl")
            .map(|ms| Duration::from_millis(ms as u64))
            .unwrap_or(defaults.health_check_ttl);

        // Parse all the other tables as providers. Ones we can't fully
        // configure are skipped here instead of failing at request time.
        let mut records: Vec<ProviderRecord> = Vec::new();
        for table_name in table_names {
            if table_name == "ethmux" {
                continue;
            }

            let provider_table = parsed_toml.get(table_name).unwrap().as_table().unwrap();
            match provider_from_table(table_name, provider_table) {
                Some(record) => records.push(record),
                None => {
                    log_wrn!("Skipping provider {}, missing usable configuration", table_name);
                }
            }
        }

        Ok(Settings {
            records,
            address,
            strategy,
            ttl,
            cache_ttl,
            cooldown_threshold,
            cooldown,
            health_check,
            health_check_ttl,
        })
    }

    fn create_from_matches(matches: ArgMatches) -> Settings {
        // Build the provider list from a csv of endpoint URLs
        let rpc_list: String = matches
            .get_one::<String>("rpc_list")
            .expect("Invalid rpc_list")
            .to_string();
        let records: Vec<ProviderRecord> = rpc_list
            .split(',')
            .filter(|url| !url.is_empty())
            .map(|url| {
                let name = sanitize_url(url).unwrap_or_else(|_| url.to_string());
                ProviderRecord::new(Arc::new(UrlAdapter::new(&name, url)), 1)
            })
            .collect();

        // Build the SocketAddr
        let address = matches
            .get_one::<String>("address")
            .expect("Invalid address");
        let port = matches.get_one::<String>("port").expect("Invalid port");
        // If the address contains `:` dont concatanate the port and just pass the address
        let address = if address.contains(':') {
            address.to_string()
        } else {
            format!("{}:{}", address, port)
        };
        let address = address
            .parse::<SocketAddr>()
            .expect("Invalid address or port!");

        let strategy = Strategy::parse(
            matches
                .get_one::<String>("selection")
                .expect("Invalid selection"),
        );

        let ttl = matches
            .get_one::<String>("ttl")
            .expect("Invalid ttl")
            .parse::<u64>()
            .map(Duration::from_millis)
            .expect("Invalid ttl");
        let cache_ttl = matches
            .get_one::<String>("cache_ttl")
            .expect("Invalid cache_ttl")
            .parse::<u64>()
            .map(Duration::from_millis)
            .expect("Invalid cache_ttl");
        let cooldown_threshold = matches
            .get_one::<String>("cooldown_threshold")
            .expect("Invalid cooldown_threshold")
            .parse::<u32>()
            .expect("Invalid cooldown_threshold")
            .max(1);
        let cooldown = matches
            .get_one::<String>("cooldown")
            .expect("Invalid cooldown")
            .parse::<u64>()
            .map(Duration::from_millis)
            .expect("Invalid cooldown");

        let health_check = matches.get_flag("health_check");
        let health_check_ttl = matches
            .get_one::<String>("health_check_ttl")
            .expect("Invalid health_check_ttl")
            .parse::<u64>()
            .map(Duration::from_millis)
            .expect("Invalid health_check_ttl");

        Settings {
            records,
            address,
            strategy,
            ttl,
            cache_ttl,
            cooldown_threshold,
            cooldown,
            health_check,
            health_check_ttl,
        }
    }
}

fn parse_address(address: &str) -> Result<SocketAddr, ConfigError> {
    // Replace `localhost` if it exists
    let address = address.replace("localhost", "127.0.0.1");
    // If the address contains `:` dont concatanate the default port
    let address = if address.contains(':') {
        address
    } else {
        format!("{}:3000", address)
    };

    address
        .parse::<SocketAddr>()
        .map_err(|_| ConfigError::InvalidAddress(address))
}

// One provider per table. `kind` picks the adapter, credentials come either
// inline or via `*_env` indirection into the process environment.
fn provider_from_table(name: &str, table: &toml::value::Table) -> Option<ProviderRecord> {
    let kind = table.get("kind").and_then(Value::as_str).unwrap_or("url");
    let weight = table
        .get("weight")
        .and_then(Value::as_integer)
        .unwrap_or(1)
        .max(1) as u32;

    let adapter: Arc<dyn ProviderAdapter> = match kind {
        "infura" => {
            let project_id = resolve_secret(table, "project_id")?;
            let chain = table.get("chain").and_then(Value::as_str).unwrap_or("mainnet");
            Arc::new(InfuraAdapter::new(name, chain, &project_id))
        }
        "alchemy" => {
            let api_key = resolve_secret(table, "api_key")?;
            let chain = table.get("chain").and_then(Value::as_str).unwrap_or("mainnet");
            Arc::new(AlchemyAdapter::new(name, chain, &api_key))
        }
        "injected" => {
            let var = table
                .get("env")
                .and_then(Value::as_str)
                .unwrap_or("ETHMUX_INJECTED_URL");
            Arc::new(InjectedAdapter::from_env(name, var))
        }
        "url" => {
            let url = resolve_secret(table, "url")?;
            Arc::new(UrlAdapter::new(name, &url))
        }
        other => {
            log_wrn!("Skipping provider {}, unknown kind {:?}", name, other);
            return None;
        }
    };

    Some(ProviderRecord::new(adapter, weight))
}

// Look up `key` inline first, then follow `<key>_env` into the environment
fn resolve_secret(table: &toml::value::Table, key: &str) -> Option<String> {
    if let Some(value) = table.get(key).and_then(Value::as_str) {
        return Some(value.to_string());
    }

    let var = table.get(&format!("{}_env", key)).and_then(Value::as_str)?;
    match std::env::var(var) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => {
            log_wrn!("Environment variable {} is not set", var);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address() {
        assert_eq!(
            parse_address("localhost:4000").unwrap(),
            "127.0.0.1:4000".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            parse_address("0.0.0.0").unwrap(),
            "0.0.0.0:3000".parse::<SocketAddr>().unwrap()
        );
        assert!(parse_address("not an address").is_err());
    }

    #[test]
    fn test_create_from_file() {
        let conf = r#"
            [ethmux]
            address = "localhost:3000"
            selection = "weighted-lru"
            ttl = 1000
            cache_ttl = 2000
            cooldown_threshold = 5
            cooldown = 10000
            health_check = true
            health_check_ttl = 6000

            [local]
            kind = "url"
            url = "http://localhost:8545"
            weight = 2

            [half-configured]
            kind = "infura"
            project_id_env = "ETHMUX_TEST_MISSING_PROJECT"
        "#;

        let settings =
            Settings::create_from_file(PathBuf::from("config.toml"), conf.to_string()).unwrap();

        assert_eq!(settings.strategy, Strategy::WeightedLru);
        assert_eq!(settings.ttl, Duration::from_millis(1000));
        assert_eq!(settings.cache_ttl, Duration::from_millis(2000));
        assert_eq!(settings.cooldown_threshold, 5);
        assert_eq!(settings.cooldown, Duration::from_millis(10000));
        assert!(settings.health_check);

        // The provider with unresolvable credentials was dropped at startup
        assert_eq!(settings.records.len(), 1);
        assert_eq!(settings.records[0].adapter.name(), "local");
        assert_eq!(settings.records[0].weight, 2);
    }

    #[test]
    fn test_defaults_when_table_is_missing() {
        let conf = r#"
            [local]
            kind = "url"
            url = "http://localhost:8545"
        "#;

        let settings =
            Settings::create_from_file(PathBuf::from("config.toml"), conf.to_string()).unwrap();

        assert_eq!(settings.address, Settings::default().address);
        assert_eq!(settings.strategy, Strategy::RoundRobin);
        assert_eq!(settings.records.len(), 1);
    }

    #[test]
    fn test_garbage_config_is_rejected() {
        let result =
            Settings::create_from_file(PathBuf::from("config.toml"), "not toml at all".to_string());
        assert!(result.is_err());
    }
}
