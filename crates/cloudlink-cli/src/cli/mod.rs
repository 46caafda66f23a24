//! CLI for exercising cloudlink connections by hand.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use cloudlink_core::config;

use commands::{run_config, run_proxy, run_request, RequestArgs};

/// Top-level CLI for cloudlink.
#[derive(Debug, Parser)]
#[command(name = "cloudlink")]
#[command(about = "cloudlink: provider API transport diagnostics", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Send one request through a connection (retries, proxy and cache busting apply).
    Request {
        /// Full endpoint URL, e.g. https://api.example.com/v1/nodes?zone=eu
        url: String,

        /// HTTP method.
        #[arg(short = 'X', long, default_value = "GET")]
        method: String,

        /// Extra header, "Name: value". Repeatable.
        #[arg(short = 'H', long = "header", value_name = "HEADER")]
        headers: Vec<String>,

        /// Query parameter, "key=value". Repeatable; appended after any in the URL.
        #[arg(short = 'p', long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,

        /// Request body.
        #[arg(short = 'd', long)]
        data: Option<String>,

        /// Proxy URL (http://[user:pass@]host:port); overrides config and environment.
        #[arg(long)]
        proxy: Option<String>,

        /// Permit a plain http:// endpoint.
        #[arg(long)]
        allow_insecure: bool,

        /// Add a unique cache-busting parameter to GET requests.
        #[arg(long)]
        cache_busting: bool,

        /// Print status line and response headers before the body.
        #[arg(short = 'i', long)]
        include: bool,
    },

    /// Validate a proxy URL, or show the one the environment would supply.
    Proxy {
        /// Proxy URL to check. Defaults to http_proxy / HTTP_PROXY.
        url: Option<String>,
    },

    /// Print the config file location and the effective configuration.
    Config,
}

impl CliCommand {
    pub fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Request {
                url,
                method,
                headers,
                params,
                data,
                proxy,
                allow_insecure,
                cache_busting,
                include,
            } => {
                let args = RequestArgs {
                    url,
                    method,
                    headers,
                    params,
                    data,
                    proxy,
                    allow_insecure,
                    cache_busting,
                    include,
                };
                run_request(&cfg, &args)?;
            }
            CliCommand::Proxy { url } => run_proxy(url.as_deref())?,
            CliCommand::Config => run_config(&cfg)?,
        }

        Ok(())
    }
}
