use std::net::SocketAddr;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "jobbroker")]
#[command(about = "Two-sided job brokerage for worker fleets", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the user-facing submit API
    SubmitApi(ApiArgs),

    /// Run the worker-facing API: queue, lease protocol, file brokerage
    WorkerApi(ApiArgs),
}

#[derive(clap::Args, Debug)]
pub struct ApiArgs {
    /// Address to bind the HTTP server to
    #[arg(long, default_value = "0.0.0.0:8080")]
    pub address: SocketAddr,
}
