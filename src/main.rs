use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use relayprobe::config::{ProbeConfig, resolve_config};
use relayprobe::consts::VERSION;
use relayprobe::engine::Engine;
use relayprobe::engine::interpreter::Interpreter;
use relayprobe::handlers::{HandlerRegistry, InboundRequest};
use relayprobe::logging;
use relayprobe::server::{self, AppState};

#[derive(Parser)]
#[command(
    name = "relayprobe",
    version,
    about = "Scripted network probe that forwards the rest of the script to the next hop."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Config file (TOML). Defaults to <config dir>/relayprobe/config.toml if present
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the probe over HTTP (default)
    Serve {
        /// Address to bind
        #[arg(long)]
        bind: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Run a script locally and print its transcript
    Run {
        /// Script file, or `-` for stdin
        script: PathBuf,
    },
    /// List the verbs a script can use
    Verbs,
}

fn build_engine(config: &ProbeConfig) -> anyhow::Result<Interpreter> {
    let registry = HandlerRegistry::builtin(&config.handler_settings())
        .context("failed to set up handlers")?;
    Ok(Interpreter::new(Arc::new(registry), config.step_timeout()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = resolve_config(cli.config.as_deref())?;

    match cli.command.unwrap_or(Command::Serve {
        bind: None,
        port: None,
    }) {
        Command::Serve { bind, port } => {
            logging::init("relayprobe=info,tower_http=info");
            if let Some(bind) = bind {
                config.bind = bind;
            }
            if let Some(port) = port {
                config.port = port;
            }
            config.validate()?;

            info!(version = VERSION, "starting relayprobe");
            let state = AppState {
                engine: Arc::new(build_engine(&config)?),
                max_body_bytes: config.max_body_bytes,
            };
            let app = server::router(state, config.static_dir.clone());
            server::serve(&config.listen_addr(), app).await
        }
        Command::Run { script } => {
            logging::init("warn");
            let body = if script.as_os_str() == "-" {
                let mut body = String::new();
                std::io::stdin()
                    .read_to_string(&mut body)
                    .context("failed to read script from stdin")?;
                body
            } else {
                std::fs::read_to_string(&script)
                    .with_context(|| format!("failed to read {}", script.display()))?
            };

            let engine = build_engine(&config)?;
            println!("{}", engine.run(&body, &InboundRequest::default()).await);
            Ok(())
        }
        Command::Verbs => {
            let registry = HandlerRegistry::builtin(&config.handler_settings())?;
            for (verb, usage) in registry.usages() {
                println!("{:<11} {}", verb.to_string(), usage);
            }
            Ok(())
        }
    }
}
