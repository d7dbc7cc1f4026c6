//! Configuration for distmap
//!
//! Centralized configuration with sensible defaults. One `Config` serves both
//! sides: the client reads the server address, dispatch and scan settings; the
//! server binary reads the listen address and connection limits.

/// Main configuration for a distmap client or server
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Client Configuration
    // -------------------------------------------------------------------------
    /// Address of the store the TCP transport connects to
    pub server_addr: String,

    /// Number of dispatch lanes. Requests on one map always share a lane,
    /// which keeps them in issuance order.
    pub dispatch_threads: usize,

    /// Element count hint sent with every scan request
    pub scan_count: usize,

    // -------------------------------------------------------------------------
    // Server Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Close a client connection after this long without a request
    /// (milliseconds, 0 keeps idle connections open)
    pub idle_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Socket Configuration (both sides)
    // -------------------------------------------------------------------------
    /// Read timeout for a reply (milliseconds, 0 disables)
    pub read_timeout_ms: u64,

    /// Write timeout (milliseconds, 0 disables)
    pub write_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:7379".to_string(),
            dispatch_threads: 4,
            scan_count: 10,
            listen_addr: "127.0.0.1:7379".to_string(),
            max_connections: 1024,
            idle_timeout_ms: 0,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the address the client connects to
    pub fn server_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.server_addr = addr.into();
        self
    }

    /// Set the number of dispatch lanes (clamped to at least one)
    pub fn dispatch_threads(mut self, count: usize) -> Self {
        self.config.dispatch_threads = count.max(1);
        self
    }

    /// Set the scan batch size hint (clamped to at least one)
    pub fn scan_count(mut self, count: usize) -> Self {
        self.config.scan_count = count.max(1);
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the idle timeout for server connections (in milliseconds)
    pub fn idle_timeout_ms(mut self, ms: u64) -> Self {
        self.config.idle_timeout_ms = ms;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
