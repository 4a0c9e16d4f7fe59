// Server module - Pingora HTTP server setup and configuration

use pingora::server::configuration::{Opt as ServerOpt, ServerConf};
use pingora::server::Server;
use std::sync::Arc;

use crate::config::Config;
use crate::engine::{ImageEngine, PixelEngine};
use crate::gateway::ImageGateway;

/// Process-level switches from the command line
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub daemon: bool,
}

/// Imgway HTTP server wrapper around Pingora
pub struct GatewayServer {
    listen_addr: String,
    server_opt: ServerOpt,
    server_conf: ServerConf,
}

impl GatewayServer {
    /// Create a new GatewayServer from application Config
    pub fn new(config: &Config, options: RunOptions) -> Self {
        let server_opt = ServerOpt {
            daemon: options.daemon,
            test: false,
            upgrade: false,
            ..Default::default()
        };

        let server_conf = ServerConf {
            threads: config.server.threads,
            ..Default::default()
        };

        Self {
            listen_addr: config.server.listen_addr(),
            server_opt,
            server_conf,
        }
    }

    pub fn listen_addr(&self) -> &str {
        &self.listen_addr
    }

    /// Get the Pingora server options
    pub fn server_opt(&self) -> &ServerOpt {
        &self.server_opt
    }

    pub fn threads(&self) -> usize {
        self.server_conf.threads
    }

    /// Build the Pingora server with the gateway service registered.
    ///
    /// The returned server is bootstrapped; call `run_forever` on it.
    pub fn build(self, config: &Config) -> Result<Server, String> {
        let engine = PixelEngine::new(&config.engine)
            .map_err(|e| format!("Failed to create image engine: {}", e))?;
        let engine: Arc<dyn ImageEngine> = Arc::new(engine);

        let mut server = Server::new_with_opt_and_conf(self.server_opt, self.server_conf);
        server.bootstrap();

        let gateway = ImageGateway::new(config, engine);
        let mut service = pingora_proxy::http_proxy_service(&server.configuration, gateway);
        service.add_tcp(&self.listen_addr);
        server.add_service(service);

        Ok(server)
    }
}
