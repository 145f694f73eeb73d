use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "tenant-config-api")]
#[command(about = "Tenant-scoped credential and exporter configuration API")]
#[command(version)]
pub struct Cli {
    #[arg(long, help = "Address to listen on, e.g. 0.0.0.0:8080")]
    pub listen: String,

    #[arg(long, default_value = "info", help = "Log filter (RUST_LOG syntax), overridden by RUST_LOG")]
    pub loglevel: String,
}
