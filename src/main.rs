//! connup - opportunistic TLS upgrade for HTTP services

use std::path::PathBuf;

use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use connup::config::{Config, PeerConfig, DEFAULT_PLAINTEXT_PORT, DEFAULT_SECURED_PORT};
use connup::error::{Error, Result};
use connup::{tls, Dispatcher, Server};

fn main() -> Result<()> {
    let args = Args::parse();

    if args.version {
        print_version();
        return Ok(());
    }

    if let Some(kind) = args.gen_config {
        let config = match kind.as_str() {
            "client" => Config::default_client(),
            "server" => Config::default_server(),
            "plain-server" => Config::default_plain_server(),
            _ => {
                eprintln!(
                    "Unknown config type: {}. Use 'client', 'server' or 'plain-server'",
                    kind
                );
                std::process::exit(1);
            }
        };
        println!("{}", serde_json::to_string_pretty(&config).unwrap());
        return Ok(());
    }

    let mut config = if let Some(path) = &args.config {
        Config::load(path)?
    } else {
        Config::default_client()
    };
    args.apply(&mut config);

    // Initialize logging
    let level = config.log.level.parse().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    info!("connup v{} starting...", env!("CARGO_PKG_VERSION"));

    tls::install_crypto_provider();

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        if config.listen.is_some() {
            let server = Server::from_config(&config)?;
            server.run().await
        } else {
            run_client(&config).await
        }
    })?;

    Ok(())
}

/// Client demo flow: two pings to the configured peer. The first negotiates
/// the protocol, the second rides the cache.
async fn run_client(config: &Config) -> Result<()> {
    let peer = config
        .peer
        .as_ref()
        .ok_or_else(|| Error::Config("client mode requires a peer".into()))?;

    let http = tls::http_client(config.tls.as_ref())?;
    let dispatcher = Dispatcher::new(http, peer.port, peer.tls_port);

    for label in ["ping one", "ping two"] {
        println!("{}", label);
        let response = dispatcher.request(&peer.host, "/ping", None).await?;
        let body = response.text().await.map_err(Error::Transport)?;
        println!("{}", body);
        println!();
    }

    Ok(())
}

#[derive(Default)]
struct Args {
    config: Option<PathBuf>,
    gen_config: Option<String>,
    peer: Option<String>,
    port: Option<u16>,
    tls_port: Option<u16>,
    cert: Option<PathBuf>,
    key: Option<PathBuf>,
    version: bool,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = std::env::args().collect();
        let mut parsed = Args::default();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "-c" | "--config" => {
                    if i + 1 < args.len() {
                        parsed.config = Some(PathBuf::from(&args[i + 1]));
                        i += 1;
                    }
                }
                "--gen-config" => {
                    if i + 1 < args.len() {
                        parsed.gen_config = Some(args[i + 1].clone());
                        i += 1;
                    }
                }
                "--peer" => {
                    if i + 1 < args.len() {
                        parsed.peer = Some(args[i + 1].clone());
                        i += 1;
                    }
                }
                "--port" => {
                    if i + 1 < args.len() {
                        parsed.port = args[i + 1].parse().ok();
                        i += 1;
                    }
                }
                "--tls-port" => {
                    if i + 1 < args.len() {
                        parsed.tls_port = args[i + 1].parse().ok();
                        i += 1;
                    }
                }
                "--cert" => {
                    if i + 1 < args.len() {
                        parsed.cert = Some(PathBuf::from(&args[i + 1]));
                        i += 1;
                    }
                }
                "--key" => {
                    if i + 1 < args.len() {
                        parsed.key = Some(PathBuf::from(&args[i + 1]));
                        i += 1;
                    }
                }
                "-v" | "--version" => parsed.version = true,
                "-h" | "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                arg if !arg.starts_with('-') && parsed.config.is_none() => {
                    // Positional argument: treat as config file
                    parsed.config = Some(PathBuf::from(arg));
                }
                _ => {}
            }
            i += 1;
        }

        parsed
    }

    /// Apply flag overrides on top of the loaded configuration
    fn apply(&self, config: &mut Config) {
        if let Some(host) = &self.peer {
            match &mut config.peer {
                Some(peer) => peer.host = host.clone(),
                None => {
                    config.peer = Some(PeerConfig {
                        host: host.clone(),
                        port: DEFAULT_PLAINTEXT_PORT,
                        tls_port: DEFAULT_SECURED_PORT,
                    })
                }
            }
        }
        if let Some(port) = self.port {
            if let Some(peer) = &mut config.peer {
                peer.port = port;
            }
            if let Some(listen) = &mut config.listen {
                listen.port = port;
            }
        }
        if let Some(tls_port) = self.tls_port {
            if let Some(peer) = &mut config.peer {
                peer.tls_port = tls_port;
            }
            if let Some(listen) = &mut config.listen {
                listen.tls_port = tls_port;
            }
        }
        if let Some(tls) = &mut config.tls {
            if let Some(cert) = &self.cert {
                tls.certificate_file = cert.clone();
            }
            if let Some(key) = &self.key {
                tls.key_file = key.clone();
            }
        }
    }
}

fn print_help() {
    println!(
        r#"connup - opportunistic TLS upgrade for HTTP services

USAGE:
    connup [OPTIONS] [CONFIG]

OPTIONS:
    -c, --config <FILE>     Path to configuration file
    --gen-config <TYPE>     Generate example config (client/server/plain-server)
    --peer <HOST>           Peer host to dispatch to (client mode)
    --port <PORT>           Plaintext port (default: 8080)
    --tls-port <PORT>       Secured port (default: 443)
    --cert <FILE>           Path to the PEM certificate
    --key <FILE>            Path to the PEM private key
    -v, --version           Print version information
    -h, --help              Print help information

Mode is taken from the config: a "listen" block runs the server side (with a
"tls" block, the dual-listener secured variant; without, plaintext only), a
"peer" block runs the client demo.

EXAMPLES:
    connup --gen-config server > server.json
    connup -c server.json --cert ssl/server.crt --key ssl/server.key
    connup --gen-config client > client.json
    connup -c client.json --peer example.com
"#
    );
}

fn print_version() {
    println!("connup v{}", env!("CARGO_PKG_VERSION"));
}
