// Broker endpoint

/// Where the broker lives. No credentials: the broker's default account is used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmqpEndpoint {
    pub host: String,
    pub port: u16,
    pub vhost: String,
}

impl Default for AmqpEndpoint {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5672,
            vhost: "/".to_string(),
        }
    }
}

impl AmqpEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// `amqp://host:port/<vhost>` with the vhost percent-encoded
    pub fn uri(&self) -> String {
        format!(
            "amqp://{}:{}/{}",
            self.host,
            self.port,
            self.vhost.replace('%', "%25").replace('/', "%2f")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_endpoint_is_local() {
        assert_eq!(AmqpEndpoint::default().uri(), "amqp://localhost:5672/%2f");
    }

    #[test]
    fn test_custom_host_and_vhost() {
        let endpoint = AmqpEndpoint {
            vhost: "stats".to_string(),
            ..AmqpEndpoint::new("rabbit.internal", 5673)
        };
        assert_eq!(endpoint.uri(), "amqp://rabbit.internal:5673/stats");
    }
}
