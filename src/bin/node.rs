use anyhow::Context;
use clap::{Parser, ValueEnum};
use floodmesh::api::{create_api_server, MessageFeed};
use floodmesh::engine::{MeshConfig, MeshRelay};
use floodmesh::mesh::{HISTORY_LIMIT, MAX_TTL};
use floodmesh::metrics::{install_recorder, MetricsConfig};
use floodmesh::store::{FileStore, LocalStore, MemoryStore, SqliteStore};
use floodmesh::transport::{UdpBroadcastTransport, UdpConfig, DEFAULT_UDP_PORT};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StoreKind {
    Sqlite,
    File,
    Memory,
}

/// FloodMesh relay node: LAN broadcast mesh with an HTTP/WebSocket gateway
#[derive(Debug, Parser)]
#[command(name = "floodmesh-node", version)]
struct Args {
    /// Directory holding the node's identity and message history
    #[arg(long, env = "FLOODMESH_DATA_DIR", default_value = "./floodmesh-data")]
    data_dir: PathBuf,

    #[arg(long, env = "FLOODMESH_STORE", value_enum, default_value = "sqlite")]
    store: StoreKind,

    /// UDP port shared by every node on the LAN
    #[arg(long, env = "FLOODMESH_UDP_PORT", default_value_t = DEFAULT_UDP_PORT)]
    udp_port: u16,

    #[arg(long, env = "FLOODMESH_BROADCAST_IP", default_value_t = IpAddr::V4(Ipv4Addr::BROADCAST))]
    broadcast_ip: IpAddr,

    /// Gateway listen address
    #[arg(long, env = "FLOODMESH_API_ADDR", default_value = "0.0.0.0:3000")]
    api_addr: SocketAddr,

    /// Rename the node on start
    #[arg(long, env = "FLOODMESH_NICKNAME")]
    nickname: Option<String>,

    #[arg(long, env = "FLOODMESH_MAX_TTL", default_value_t = MAX_TTL)]
    max_ttl: u8,

    /// Messages kept per channel
    #[arg(long, env = "FLOODMESH_HISTORY_LIMIT", default_value_t = HISTORY_LIMIT)]
    history_limit: usize,

    /// Do not announce presence to neighbours on start
    #[arg(long)]
    quiet: bool,

    /// Disable the Prometheus recorder
    #[arg(long)]
    no_metrics: bool,

    /// Gateway path serving Prometheus metrics
    #[arg(long, env = "FLOODMESH_METRICS_PATH", default_value = "/metrics")]
    metrics_path: String,
}

async fn open_store(args: &Args) -> anyhow::Result<Arc<dyn LocalStore>> {
    let store: Arc<dyn LocalStore> = match args.store {
        StoreKind::Sqlite => {
            tokio::fs::create_dir_all(&args.data_dir)
                .await
                .with_context(|| format!("creating {}", args.data_dir.display()))?;
            let url = format!("sqlite://{}?mode=rwc", args.data_dir.join("floodmesh.db").display());
            Arc::new(
                SqliteStore::new(&url)
                    .await
                    .context("opening SQLite store")?
                    .with_limit(args.history_limit),
            )
        }
        StoreKind::File => Arc::new(
            FileStore::open(&args.data_dir)
                .await
                .context("opening file store")?
                .with_limit(args.history_limit),
        ),
        StoreKind::Memory => Arc::new(MemoryStore::with_limit(args.history_limit)),
    };
    Ok(store)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("floodmesh=info,tower_http=warn")),
        )
        .init();

    let args = Args::parse();

    println!("\n╔══════════════════════════════════════════════════════════════════╗");
    println!("║              FloodMesh - Offline Emergency Mesh Relay            ║");
    println!("╚══════════════════════════════════════════════════════════════════╝\n");

    let metrics = MetricsConfig {
        enabled: !args.no_metrics,
        endpoint: args.metrics_path.clone(),
    };
    install_recorder(&metrics).context("installing metrics recorder")?;

    let store = open_store(&args).await?;
    println!("💾 Store: {:?} in {}", args.store, args.data_dir.display());

    let udp = UdpConfig {
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), args.udp_port),
        broadcast_addr: SocketAddr::new(args.broadcast_ip, args.udp_port),
    };
    let transport = Arc::new(UdpBroadcastTransport::bind(udp.clone()).context("binding UDP transport")?);
    println!("📡 Transport: UDP broadcast {} -> {}", udp.bind_addr, udp.broadcast_addr);

    let config = MeshConfig {
        max_ttl: args.max_ttl,
        history_limit: args.history_limit,
        announce_presence: !args.quiet,
        ..Default::default()
    };
    let relay = Arc::new(
        MeshRelay::builder()
            .config(config)
            .store(store)
            .transport(transport)
            .build()?,
    );

    // Renamed before start so the join announcement carries the new name
    if let Some(name) = args.nickname.as_deref() {
        relay.set_nickname(name).await?;
    }

    let feed = MessageFeed::default();
    let status = relay.start(feed.callback()).await?;

    let app = create_api_server(relay.clone(), feed, &metrics);
    let listener = tokio::net::TcpListener::bind(args.api_addr)
        .await
        .with_context(|| format!("binding gateway to {}", args.api_addr))?;

    println!("\n✅ Node {} ({}) is relaying\n", status.node_id, status.nickname);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("🏥 Health Check:    http://{}/health", args.api_addr);
    println!("📨 Messages:        http://{}/api/v1/messages", args.api_addr);
    println!("🆘 SOS:             POST http://{}/api/v1/sos", args.api_addr);
    println!("🔌 WebSocket:       ws://{}/ws", args.api_addr);
    if metrics.enabled {
        println!("📊 Metrics:         http://{}{}", args.api_addr, metrics.endpoint);
    }
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("gateway failed")?;

    relay.stop().await;
    tracing::info!("{}", relay.stats());
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Cannot listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
