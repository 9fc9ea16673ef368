//! Server Configuration
//!
//! Read from the environment (and `.env`, loaded in `main`).

/// Server settings
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Listen address
    pub bind_addr: String,

    /// Public origin of the site, used for default redirect URLs
    pub public_base_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".into(),
            public_base_url: "http://localhost:3000".into(),
        }
    }
}

impl ServerConfig {
    /// Create from `BIND_ADDR` and `PUBLIC_BASE_URL`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            public_base_url: std::env::var("PUBLIC_BASE_URL").unwrap_or(defaults.public_base_url),
        }
    }

    /// Where Stripe sends the user after paying
    pub fn success_url(&self) -> String {
        format!("{}/?checkout=success", self.public_base_url.trim_end_matches('/'))
    }

    /// Where Stripe sends the user after backing out
    pub fn cancel_url(&self) -> String {
        format!("{}/?checkout=cancelled", self.public_base_url.trim_end_matches('/'))
    }
}
