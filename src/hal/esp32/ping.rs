//! ICMP reachability probe.

use std::net::Ipv4Addr;
use std::time::Duration;

use esp_idf_svc::ping::{Configuration, EspPing};
use log::{debug, warn};

use crate::config::NetworkConfig;
use crate::traits::HealthProbe;

/// Sends one echo request to a fixed host.
pub struct Esp32Ping {
    ping: EspPing,
    target: Option<Ipv4Addr>,
    timeout: Duration,
}

impl Esp32Ping {
    /// Creates a probe for `config.ping_host`. A host that is not an IPv4
    /// literal makes every check fail.
    pub fn new(config: &NetworkConfig) -> Self {
        let target = config.ping_host.parse().ok();
        if target.is_none() {
            warn!("ping: '{}' is not an IPv4 address", config.ping_host);
        }
        Self {
            ping: EspPing::default(),
            target,
            timeout: Duration::from_millis(u64::from(config.ping_timeout_ms)),
        }
    }
}

impl HealthProbe for Esp32Ping {
    fn check(&mut self) -> bool {
        let Some(ip) = self.target else {
            return false;
        };
        let conf = Configuration {
            count: 1,
            timeout: self.timeout,
            ..Default::default()
        };
        match self.ping.ping(ip, &conf) {
            Ok(summary) => {
                debug!("ping {}: {}/{} replies", ip, summary.received, summary.transmitted);
                summary.received > 0
            }
            Err(e) => {
                debug!("ping {} failed: {:?}", ip, e);
                false
            }
        }
    }
}
