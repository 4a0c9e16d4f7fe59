use clap::Parser;
use std::path::PathBuf;
use imgway::config::Config;
use imgway::server::{GatewayServer, RunOptions};

/// Imgway - URL-driven image transformation gateway built with Cloudflare's Pingora
#[derive(Parser, Debug)]
#[command(name = "imgway")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Daemon mode
    #[arg(short = 'd', long)]
    daemon: bool,

    /// Test configuration and exit
    #[arg(long)]
    test: bool,
}

fn main() {
    let args = Args::parse();

    // Load and validate configuration before anything else
    let config = Config::from_file(&args.config)
        .and_then(|config| config.validate().map(|_| config))
        .unwrap_or_else(|e| {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        });

    if args.test {
        println!(
            "Configuration OK: {} (listen {}, route prefix {}, storage root {})",
            args.config.display(),
            config.server.listen_addr(),
            config.server.normalized_route_prefix(),
            config.engine.storage_root.display()
        );
        return;
    }

    if let Err(e) = imgway::logging::init_subscriber(&config.logging) {
        eprintln!("Failed to initialize logging subsystem: {}", e);
        std::process::exit(1);
    }

    tracing::info!(
        config_file = %args.config.display(),
        server_address = %config.server.address,
        server_port = config.server.port,
        route_prefix = %config.server.normalized_route_prefix(),
        storage_root = %config.engine.storage_root.display(),
        allowed_hosts = config.engine.allowed_hosts.len(),
        "Configuration loaded successfully"
    );

    let gateway_server = GatewayServer::new(
        &config,
        RunOptions {
            daemon: args.daemon,
        },
    );
    let listen_addr = gateway_server.listen_addr().to_string();

    let server = gateway_server.build(&config).unwrap_or_else(|e| {
        eprintln!("Failed to start server: {}", e);
        std::process::exit(1);
    });

    tracing::info!(
        address = %listen_addr,
        "Starting Imgway image gateway"
    );

    // Run server forever (blocks until shutdown)
    server.run_forever();
}
