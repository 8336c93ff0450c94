use clap::Parser;
use log::info;
use server::network::Server;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to bind the server socket to
    #[arg(short = 'b', long, default_value = "127.0.0.1:8080")]
    bind: String,

    /// Maximum number of concurrent connections
    #[arg(short = 'm', long, default_value = "32")]
    max_clients: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Starting social-room server on {}", args.bind);

    let mut server = Server::new(&args.bind, args.max_clients).await?;
    server.run().await?;

    Ok(())
}
