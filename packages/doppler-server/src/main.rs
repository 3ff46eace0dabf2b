use clap::Parser;
use doppler_server::{
    cli::{Cli, Commands},
    components::ComponentStatus,
    config::ServerConfig,
    router::{create_router, ROUTES},
    state::ServerState,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_routes() {
    println!("{:<6} {:<26} {}", "Method", "Path", "Description");
    println!("{}", "-".repeat(90));
    for route in ROUTES {
        println!(
            "{:<6} {:<26} {}",
            route.method, route.path, route.description
        );
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "doppler_server=info,doppler_rs=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Routes) => {
            print_routes();
            return Ok(());
        }
        Some(Commands::Serve) | None => {
            // Continue to run server
        }
    }

    // Load configuration
    let config = ServerConfig::from_env()?;

    info!("🚀 Starting Doppler Server v{}", VERSION);
    info!("📋 Configuration loaded:");
    info!("   Port: {}", config.port);
    info!("   Bind address: {}", config.bind_addr);
    info!("   CORS origins: {:?}", config.cors_origins);
    info!("   Upload directory: {:?}", config.upload_directory);
    info!("   Max upload size: {} bytes", config.max_upload_size);
    info!(
        "   Pass geometry: {} m closest approach, {} s",
        config.closest_approach, config.pass_duration
    );
    info!(
        "   Limits: velocity <= {} m/s, frequency {}-{} Hz",
        config.max_car_speed, config.min_frequency, config.max_frequency
    );

    // Create server state and build the signal components up front
    let state = Arc::new(ServerState::new(config.clone()));
    state.initialize();
    for (name, status) in state.component_statuses() {
        match status {
            ComponentStatus::Loaded => info!("✅ {} ready", name),
            other => warn!("⚠️  {} not available: {:?}", name, other),
        }
    }

    let app = create_router(state);

    // Start server
    let addr: SocketAddr = config.bind_address().parse()?;
    info!("🎧 Listening on http://{}", addr);
    for route in ROUTES {
        info!("   {} {}", route.method, route.path);
    }

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}
