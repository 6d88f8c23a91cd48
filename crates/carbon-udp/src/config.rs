// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::errors::ReceiverError;
use std::env;
use std::time::Duration;

/// Configuration for the UDP receiver.
#[derive(Debug, Clone)]
pub struct UdpConfig {
    /// Local address to bind to (e.g., "0.0.0.0")
    pub host: String,
    /// Local port to bind to; 0 picks an ephemeral port
    pub port: u16,
    /// How long an unclaimed incomplete fragment stays reclaimable
    pub incomplete_expires: Duration,
    /// Fragment-store size at which expired entries become eligible for purging
    pub incomplete_max_size: usize,
    /// Upper bound on a single fragment's byte length; None leaves fragment
    /// growth bounded only by the expiry policy
    pub max_fragment_len: Option<usize>,
    /// Interval between checkpoint emissions of the ingestion counters
    pub stats_interval: Duration,
    /// Log a diagnostic preview whenever a datagram ends mid-record
    pub log_incomplete: bool,
    /// Name prefix for emitted checkpoint points (e.g., "carbon.")
    pub graph_prefix: String,
}

impl Default for UdpConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 2003,
            incomplete_expires: Duration::from_secs(5),
            incomplete_max_size: 10_000,
            max_fragment_len: None,
            stats_interval: Duration::from_secs(60),
            log_incomplete: false,
            graph_prefix: "carbon.".to_string(),
        }
    }
}

impl UdpConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, ReceiverError> {
        let defaults = Self::default();

        let host = env::var("CARBON_UDP_HOST").unwrap_or(defaults.host);
        let port = env::var("CARBON_UDP_PORT")
            .ok()
            .and_then(|port| port.parse::<u16>().ok())
            .unwrap_or(defaults.port);
        let incomplete_expires = env::var("CARBON_UDP_INCOMPLETE_EXPIRES")
            .ok()
            .and_then(|secs| secs.parse::<u64>().ok())
            .map_or(defaults.incomplete_expires, Duration::from_secs);
        let incomplete_max_size = env::var("CARBON_UDP_INCOMPLETE_MAX_SIZE")
            .ok()
            .and_then(|size| size.parse::<usize>().ok())
            .unwrap_or(defaults.incomplete_max_size);
        let max_fragment_len = env::var("CARBON_UDP_MAX_FRAGMENT_LEN")
            .ok()
            .and_then(|len| len.parse::<usize>().ok());
        let stats_interval = env::var("CARBON_UDP_STATS_INTERVAL")
            .ok()
            .and_then(|secs| secs.parse::<u64>().ok())
            .map_or(defaults.stats_interval, Duration::from_secs);
        let log_incomplete = env::var("CARBON_UDP_LOG_INCOMPLETE")
            .map(|val| val.to_lowercase() == "true")
            .unwrap_or(defaults.log_incomplete);
        let graph_prefix = env::var("CARBON_GRAPH_PREFIX").unwrap_or(defaults.graph_prefix);

        let config = Self {
            host,
            port,
            incomplete_expires,
            incomplete_max_size,
            max_fragment_len,
            stats_interval,
            log_incomplete,
            graph_prefix,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ReceiverError> {
        if self.host.trim().is_empty() {
            return Err(ReceiverError::InvalidConfig(
                "bind host cannot be empty".to_string(),
            ));
        }

        if self.incomplete_expires.is_zero() {
            return Err(ReceiverError::InvalidConfig(
                "incomplete fragment expiry must be non-zero".to_string(),
            ));
        }

        if self.incomplete_max_size == 0 {
            return Err(ReceiverError::InvalidConfig(
                "incomplete store size threshold must be greater than 0".to_string(),
            ));
        }

        if self.max_fragment_len == Some(0) {
            return Err(ReceiverError::InvalidConfig(
                "maximum fragment length must be greater than 0 when set".to_string(),
            ));
        }

        if self.stats_interval.is_zero() {
            return Err(ReceiverError::InvalidConfig(
                "stats interval must be non-zero".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = UdpConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.port, 2003);
        assert_eq!(config.incomplete_expires, Duration::from_secs(5));
        assert_eq!(config.incomplete_max_size, 10_000);
        assert_eq!(config.max_fragment_len, None);
        assert_eq!(config.stats_interval, Duration::from_secs(60));
        assert!(!config.log_incomplete);
        assert_eq!(config.graph_prefix, "carbon.");
    }

    #[test]
    fn test_validate_rejects_empty_host() {
        let config = UdpConfig {
            host: "  ".to_string(),
            ..UdpConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ReceiverError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_expiry() {
        let config = UdpConfig {
            incomplete_expires: Duration::ZERO,
            ..UdpConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ReceiverError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_max_size() {
        let config = UdpConfig {
            incomplete_max_size: 0,
            ..UdpConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ReceiverError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_fragment_cap() {
        let config = UdpConfig {
            max_fragment_len: Some(0),
            ..UdpConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ReceiverError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate_allows_port_zero() {
        // port 0 binds an ephemeral port, which tests rely on
        let config = UdpConfig {
            port: 0,
            ..UdpConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_env_reads_overrides() {
        env::set_var("CARBON_UDP_PORT", "12003");
        env::set_var("CARBON_UDP_INCOMPLETE_EXPIRES", "7");
        env::set_var("CARBON_UDP_MAX_FRAGMENT_LEN", "4096");
        env::set_var("CARBON_UDP_LOG_INCOMPLETE", "TRUE");

        let config = UdpConfig::from_env().unwrap();
        assert_eq!(config.port, 12003);
        assert_eq!(config.incomplete_expires, Duration::from_secs(7));
        assert_eq!(config.max_fragment_len, Some(4096));
        assert!(config.log_incomplete);

        env::remove_var("CARBON_UDP_PORT");
        env::remove_var("CARBON_UDP_INCOMPLETE_EXPIRES");
        env::remove_var("CARBON_UDP_MAX_FRAGMENT_LEN");
        env::remove_var("CARBON_UDP_LOG_INCOMPLETE");
    }
}
