// Periodically check that every provider is still responding
use crate::{
    log_info,
    log_wrn,
    mux::multiplexer::Multiplexer,
};

use std::{
    sync::Arc,
    time::Duration,
};

use tokio::time::{
    sleep,
    timeout,
};

pub async fn health_monitor(multiplexer: Arc<Multiplexer>, interval: Duration, probe_ttl: Duration) {
    let registry = multiplexer.registry();
    // Last known state per provider so we only log transitions
    let mut responsive = vec![true; registry.len()];

    loop {
        sleep(interval).await;

        for position in 0..registry.len() {
            let adapter = registry.adapter(position);

            let alive = if probe_ttl.is_zero() {
                adapter.check_availability().await
            } else {
                timeout(probe_ttl, adapter.check_availability())
                    .await
                    .unwrap_or(false)
            };

            if !alive {
                // Same counter as a failed use, repeat offenders end up in cooldown
                registry.record_failure(position);
            }

            if alive != responsive[position] {
                if alive {
                    log_info!("{} is responding again", adapter.name());
                } else {
                    log_wrn!("{} is unresponsive", adapter.name());
                }
                responsive[position] = alive;
            }
        }
    }
}
