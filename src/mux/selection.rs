use crate::{
    log_wrn,
    mux::{
        error::{
            AttemptError,
            FailedAttempt,
        },
        registry::Registry,
    },
};

use std::sync::Arc;

/// Selection policies, chosen at multiplexer construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Scan forward from the cursor, wrapping, for the first provider that is
    /// out of cooldown and answers its availability probe.
    RoundRobin,
    /// Pick the eligible provider with the smallest `last_used / weight`,
    /// ties broken by registry order. No probing, failed acquisition is what
    /// drives retry here.
    WeightedLru,
    #[cfg(feature = "selection-random")]
    Random,
}

impl Strategy {
    pub fn parse(name: &str) -> Strategy {
        match name {
            "round-robin" => Strategy::RoundRobin,
            "weighted-lru" => Strategy::WeightedLru,
            #[cfg(feature = "selection-random")]
            "random" => Strategy::Random,
            other => {
                log_wrn!("Unknown selection strategy {:?}, using round-robin", other);
                Strategy::RoundRobin
            }
        }
    }

    // Pick the next provider and return its position. Updates `last_used`
    // (and the cursor, for round robin) at selection time rather than on
    // completion so concurrent callers spread out. On exhaustion, returns
    // one reason per record that was considered and rejected.
    pub async fn pick(&self, registry: &Registry) -> Result<usize, Vec<FailedAttempt>> {
        match self {
            Strategy::RoundRobin => round_robin(registry).await,
            Strategy::WeightedLru => weighted_lru(registry),
            #[cfg(feature = "selection-random")]
            Strategy::Random => random(registry),
        }
    }
}

fn skipped(provider: &str, reason: &str) -> FailedAttempt {
    FailedAttempt {
        provider: provider.to_string(),
        error: AttemptError::ProviderUnavailable(reason.to_string()),
    }
}

async fn round_robin(registry: &Registry) -> Result<usize, Vec<FailedAttempt>> {
    let len = registry.len();
    if len == 0 {
        return Err(Vec::new());
    }

    let now = registry.now_micros();
    let start = (registry.read().cursor + 1) % len;
    let mut rejected = Vec::new();

    for offset in 0..len {
        let position = (start + offset) % len;

        // The probe suspends, so the eligibility check and the probe can't
        // share one lock acquisition
        let (adapter, cooling) = {
            let inner = registry.read();
            let record = &inner.records[position];
            (Arc::clone(&record.adapter), record.is_cooling(now))
        };

        if cooling {
            rejected.push(skipped(adapter.name(), "in cooldown"));
            continue;
        }

        if adapter.check_availability().await {
            let mut inner = registry.write();
            inner.cursor = position;
            inner.records[position].last_used = registry.now_micros();
            return Ok(position);
        }

        rejected.push(skipped(adapter.name(), "availability probe failed"));
    }

    Err(rejected)
}

fn weighted_lru(registry: &Registry) -> Result<usize, Vec<FailedAttempt>> {
    let now = registry.now_micros();
    let mut inner = registry.write();

    let mut best: Option<usize> = None;
    let mut rejected = Vec::new();

    for (position, record) in inner.records.iter().enumerate() {
        if record.is_cooling(now) {
            rejected.push(skipped(record.adapter.name(), "in cooldown"));
            continue;
        }

        best = match best {
            None => Some(position),
            Some(current) => {
                let incumbent = &inner.records[current];
                // Cross multiplied compare of last_used / weight, exact and
                // float free. Strict less-than keeps the earlier record on ties.
                if record.last_used * incumbent.weight < incumbent.last_used * record.weight {
                    Some(position)
                } else {
                    Some(current)
                }
            }
        };
    }

    match best {
        Some(position) => {
            inner.records[position].last_used = now;
            Ok(position)
        }
        None => Err(rejected),
    }
}

#[cfg(feature = "selection-random")]
fn random(registry: &Registry) -> Result<usize, Vec<FailedAttempt>> {
    use rand::Rng;

    let now = registry.now_micros();
    let mut inner = registry.write();

    let mut eligible = Vec::new();
    let mut rejected = Vec::new();
    for (position, record) in inner.records.iter().enumerate() {
        if record.is_cooling(now) {
            rejected.push(skipped(record.adapter.name(), "in cooldown"));
        } else {
            eligible.push(position);
        }
    }

    if eligible.is_empty() {
        return Err(rejected);
    }

    let position = eligible[rand::thread_rng().gen_range(0..eligible.len())];
    inner.records[position].last_used = now;
    Ok(position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        mux::registry::ProviderRecord,
        rpc::adapter::UrlAdapter,
    };
    use std::time::Duration;

    fn test_registry(weights: &[u32]) -> Registry {
        let records = weights
            .iter()
            .enumerate()
            .map(|(position, weight)| {
                let name = format!("rpc{}", position);
                ProviderRecord::new(
                    Arc::new(UrlAdapter::new(&name, &format!("http://{}.invalid", name))),
                    *weight,
                )
            })
            .collect();

        Registry::new(records, 3, Duration::from_millis(100))
    }

    #[test]
    fn test_parse() {
        assert_eq!(Strategy::parse("round-robin"), Strategy::RoundRobin);
        assert_eq!(Strategy::parse("weighted-lru"), Strategy::WeightedLru);
        assert_eq!(Strategy::parse("???"), Strategy::RoundRobin);
    }

    #[test]
    fn test_weighted_lru_prefers_least_recently_used() {
        let registry = test_registry(&[1, 1, 1]);
        {
            let mut inner = registry.write();
            inner.records[0].last_used = 300;
            inner.records[1].last_used = 100;
            inner.records[2].last_used = 200;
        }

        assert_eq!(weighted_lru(&registry).unwrap(), 1);
        // Selection refreshed rpc1's timestamp, so rpc2 is up next
        assert_eq!(weighted_lru(&registry).unwrap(), 2);
    }

    #[test]
    fn test_weighted_lru_scales_by_weight() {
        let registry = test_registry(&[1, 4]);
        {
            let mut inner = registry.write();
            inner.records[0].last_used = 100;
            // Three times as stale in wall time, but at weight 4 its scaled
            // usage 400/4 is still younger than 100/1
            inner.records[1].last_used = 400;
        }

        assert_eq!(weighted_lru(&registry).unwrap(), 1);
    }

    #[test]
    fn test_weighted_lru_ties_break_by_registry_order() {
        let registry = test_registry(&[1, 1, 1]);
        assert_eq!(weighted_lru(&registry).unwrap(), 0);
    }

    #[test]
    fn test_weighted_lru_skips_cooling_records() {
        let registry = test_registry(&[1, 1]);
        {
            let mut inner = registry.write();
            inner.records[0].cooldown_until = u128::MAX;
        }

        assert_eq!(weighted_lru(&registry).unwrap(), 1);
    }

    #[test]
    fn test_weighted_lru_exhaustion_reports_every_record() {
        let registry = test_registry(&[1, 1, 1]);
        {
            let mut inner = registry.write();
            for record in inner.records.iter_mut() {
                record.cooldown_until = u128::MAX;
            }
        }

        let rejected = weighted_lru(&registry).unwrap_err();
        assert_eq!(rejected.len(), 3);
        assert_eq!(rejected[0].provider, "rpc0");
        assert_eq!(rejected[2].provider, "rpc2");
    }
}
