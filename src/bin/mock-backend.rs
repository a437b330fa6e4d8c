//! Trivial backend for trying the gateway by hand.
//!
//! Answers every request with `Hello from backend <port>` and a newline.

use axum::{extract::State, routing::any, Router};
use clap::Parser;
use tokio::net::TcpListener;

#[derive(Parser)]
#[command(name = "mock-backend")]
#[command(about = "Echo backend for local gateway testing", long_about = None)]
struct Cli {
    /// Port to listen on
    port: u16,
}

fn greeting(port: u16) -> String {
    format!("Hello from backend {port}\n")
}

async fn hello(State(port): State<u16>) -> String {
    greeting(port)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let app = Router::new()
        .route("/", any(hello))
        .route("/{*path}", any(hello))
        .with_state(cli.port);

    let listener = TcpListener::bind(("0.0.0.0", cli.port)).await?;
    println!("mock backend listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
