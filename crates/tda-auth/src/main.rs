/*
[INPUT]:  CLI arguments, optional YAML configuration file, browser redirect
[OUTPUT]: Authorization grant or token set printed to stdout
[POS]:    Binary entry point
[UPDATE]: When changing CLI flags or subcommands
*/

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tda_auth::{AuthOverrides, CliConfig};
use tda_client::{AuthorizationFlow, ManualLogin, TokenSet};

#[derive(Parser, Debug)]
#[command(name = "tda-auth", version, about = "TD Ameritrade OAuth helper")]
struct Cli {
    #[arg(long = "config", value_name = "PATH")]
    config_path: Option<PathBuf>,
    #[arg(long = "consumer-key", env = "CONSUMER_KEY", hide_env_values = true)]
    consumer_key: Option<String>,
    #[arg(long = "port", value_name = "PORT")]
    port: Option<u16>,
    #[arg(long = "key", value_name = "PATH", requires = "cert")]
    key: Option<PathBuf>,
    #[arg(long = "cert", value_name = "PATH", requires = "key")]
    cert: Option<PathBuf>,
    /// Seconds to wait for the redirect; 0 waits forever
    #[arg(long = "timeout-secs", value_name = "SECS")]
    timeout_secs: Option<u64>,
    /// Print the consent URL instead of opening a browser
    #[arg(long = "manual")]
    manual: bool,
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Capture an authorization grant through the browser
    Authorize {
        /// Exchange the grant and print the token set
        #[arg(long = "exchange")]
        exchange: bool,
    },
    /// Exchange a refresh token for a new access token
    Refresh {
        #[arg(long = "refresh-token", value_name = "TOKEN")]
        refresh_token: String,
        /// Also request a new refresh token
        #[arg(long = "offline")]
        offline: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(&args.log_level)?;

    let file = args
        .config_path
        .as_ref()
        .map(load_config)
        .transpose()?;
    let config = CliConfig::resolve(
        file,
        AuthOverrides {
            consumer_key: args.consumer_key,
            redirect_port: args.port,
            tls_key_path: args.key,
            tls_cert_path: args.cert,
            redirect_timeout_secs: args.timeout_secs,
        },
    );

    let client = config.client().context("build http client")?;
    let mut flow = AuthorizationFlow::new(client, config.auth).context("invalid auth settings")?;
    if args.manual {
        flow = flow.with_login(ManualLogin);
    }

    match args.command {
        Command::Authorize { exchange } => {
            info!(redirect_uri = %flow.config().redirect_uri(), "starting authorization");
            let grant = flow.authenticate().await.context("authorization failed")?;
            if exchange {
                let tokens = flow
                    .generate_tokens(&grant)
                    .await
                    .context("token exchange failed")?;
                print_tokens(&tokens)?;
            } else {
                println!("{grant}");
            }
        }
        Command::Refresh {
            refresh_token,
            offline,
        } => {
            let tokens = if offline {
                flow.refresh_token_offline(&refresh_token).await
            } else {
                flow.refresh_token(&refresh_token).await
            }
            .context("token refresh failed")?;
            print_tokens(&tokens)?;
        }
    }

    Ok(())
}

fn init_tracing(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(log_level).context("invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!(err))
        .context("initialize tracing subscriber")?;
    Ok(())
}

fn load_config(path: &PathBuf) -> Result<CliConfig> {
    let path_str = path
        .to_str()
        .context("config path must be valid utf-8")?;
    CliConfig::from_file(path_str).context("load config")
}

fn print_tokens(tokens: &TokenSet) -> Result<()> {
    let rendered = serde_json::to_string_pretty(tokens).context("render token set")?;
    println!("{rendered}");
    Ok(())
}
