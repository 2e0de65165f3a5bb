//! Endpoint strings of the form `host` or `host:port`.

use std::fmt;
use std::str::FromStr;

use crate::error::CacheError;

/// Port used when the endpoint names only a host.
pub const DEFAULT_PORT: u16 = 6379;

/// A parsed store endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    /// `host:port`, suitable for socket address resolution.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl FromStr for Endpoint {
    type Err = CacheError;

    /// IPv6 literals are not accepted; use a hostname instead.
    fn from_str(endpoint: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| CacheError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason,
        };

        let (host, port) = match endpoint.split_once(':') {
            Some((host, port)) => {
                if port.is_empty() {
                    return Err(invalid("missing port"));
                }
                let port = port
                    .parse::<u16>()
                    .map_err(|_| invalid("port is not a number in 1-65535"))?;
                if port == 0 {
                    return Err(invalid("port is not a number in 1-65535"));
                }
                (host, port)
            }
            None => (endpoint, DEFAULT_PORT),
        };

        if host.is_empty() {
            return Err(invalid("missing host"));
        }
        if host.chars().any(char::is_whitespace) {
            return Err(invalid("host contains whitespace"));
        }

        Ok(Endpoint {
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
