use super::*;

fn default_port() -> u16 {
    DEFAULT_STRATUM_PORT
}

fn default_password() -> String {
    "x".into()
}

/// Static identity of one pool. `priority` is higher-is-preferred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PoolConfig {
    pub name: String,
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub username: String,
    #[serde(default = "default_password")]
    pub password: String,
    #[serde(default)]
    pub priority: i32,
}

impl PoolConfig {
    /// Builds a pool from a `host[:port]` endpoint, with or without a
    /// `stratum+tcp://` scheme. The endpoint doubles as the pool name.
    pub fn from_endpoint(
        endpoint: &str,
        username: impl Into<String>,
        password: impl Into<String>,
        priority: i32,
    ) -> Result<Self> {
        let endpoint = normalize_endpoint(endpoint);

        let (host, port) = match endpoint.strip_prefix('[') {
            Some(bracketed) => bracketed
                .split_once("]:")
                .with_context(|| format!("invalid pool endpoint `{endpoint}`"))?,
            None => {
                let (host, port) = endpoint
                    .rsplit_once(':')
                    .with_context(|| format!("invalid pool endpoint `{endpoint}`"))?;

                ensure!(
                    !host.contains(':'),
                    "IPv6 host in pool endpoint `{endpoint}` must be written as `[host]:port`"
                );

                (host, port)
            }
        };

        ensure!(!host.is_empty(), "pool endpoint `{endpoint}` has no host");

        let port = port
            .parse::<u16>()
            .with_context(|| format!("invalid port in pool endpoint `{endpoint}`"))?;

        Ok(Self {
            name: endpoint.clone(),
            host: host.into(),
            port,
            username: username.into(),
            password: password.into(),
            priority,
        })
    }

    /// `host:port`, with IPv6 hosts in brackets.
    pub fn address(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

#[cfg(test)]
mod tests {
    use {super::*, pretty_assertions::assert_eq};

    #[test]
    fn from_endpoint() {
        let pool = PoolConfig::from_endpoint("stratum+tcp://pool.example.com", "w", "p", 3).unwrap();

        assert_eq!(
            pool,
            PoolConfig {
                name: "pool.example.com:3333".into(),
                host: "pool.example.com".into(),
                port: 3333,
                username: "w".into(),
                password: "p".into(),
                priority: 3,
            }
        );
        assert_eq!(pool.address(), "pool.example.com:3333");
    }

    #[test]
    fn from_endpoint_rejects_bad_port() {
        assert!(PoolConfig::from_endpoint("pool.example.com:http", "w", "x", 0).is_err());
        assert!(PoolConfig::from_endpoint(":3333", "w", "x", 0).is_err());
    }

    #[test]
    fn ipv6_endpoints() {
        let pool =
            PoolConfig::from_endpoint("stratum+tcp://[2001:db8::7]:4444", "w", "x", 0).unwrap();
        assert_eq!(pool.name, "[2001:db8::7]:4444");
        assert_eq!(pool.host, "2001:db8::7");
        assert_eq!(pool.port, 4444);
        assert_eq!(pool.address(), "[2001:db8::7]:4444");

        let pool = PoolConfig::from_endpoint("[::1]", "w", "x", 0).unwrap();
        assert_eq!(pool.host, "::1");
        assert_eq!(pool.port, 3333);
        assert_eq!(pool.address(), "[::1]:3333");

        assert!(PoolConfig::from_endpoint("2001:db8::7", "w", "x", 0).is_err());
        assert!(PoolConfig::from_endpoint("[::1]x", "w", "x", 0).is_err());
        assert!(PoolConfig::from_endpoint("[]:3333", "w", "x", 0).is_err());
    }

    #[test]
    fn toml_defaults() {
        let pool = toml::from_str::<PoolConfig>(
            r#"
            name = "backup"
            host = "127.0.0.1"
            username = "worker"
            "#,
        )
        .unwrap();

        assert_eq!(pool.port, 3333);
        assert_eq!(pool.password, "x");
        assert_eq!(pool.priority, 0);
    }
}
