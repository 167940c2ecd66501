use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use trainer::channels::InboundMessage;
use trainer::handler::MessageHandler;
use trainer::llm::OpenAiCompatClient;

#[derive(Parser)]
#[command(name = "trainer")]
#[command(about = "Engineer Trainer: ask Mechatronics, Avionics, and Electrical Engineering specialists", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and a default config file.
    Init {
        /// Config file path (default: TRAINER_CONFIG_PATH or ~/.trainer/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Ask one question and print the reply.
    Ask {
        /// The question.
        text: String,

        /// Config file path (default: TRAINER_CONFIG_PATH or ~/.trainer/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Chat interactively on stdin (each line is answered on its own; /exit to quit).
    Chat {
        /// Config file path (default: TRAINER_CONFIG_PATH or ~/.trainer/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// List the models the configured backend offers.
    Models {
        /// Config file path (default: TRAINER_CONFIG_PATH or ~/.trainer/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Run the HTTP gateway and configured channels (e.g. Telegram).
    Serve {
        /// Config file path (default: TRAINER_CONFIG_PATH or ~/.trainer/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// HTTP port (default from config or 15152)
        #[arg(long, short)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Version) => {
            println!("trainer {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Some(Commands::Init { config }) => run_init(config),
        Some(Commands::Ask { text, config }) => run_ask(config, text).await,
        Some(Commands::Chat { config }) => run_chat(config).await,
        Some(Commands::Models { config }) => run_models(config).await,
        Some(Commands::Serve { config, port }) => run_serve(config, port).await,
        None => {
            println!("Run with --help for usage");
            Ok(())
        }
    };
    if let Err(e) = result {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run_init(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(trainer::config::default_config_path);
    let dir = trainer::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

fn load_handler(config_path: Option<PathBuf>) -> anyhow::Result<MessageHandler> {
    let (config, path) = trainer::config::load_config(config_path)?;
    log::debug!("using config {}", path.display());
    MessageHandler::from_config(&config)
}

async fn run_ask(config_path: Option<PathBuf>, text: String) -> anyhow::Result<()> {
    let handler = load_handler(config_path)?;
    let reply = handler.handle(&InboundMessage::new("cli", "ask", text)).await;
    println!("{}", reply.text.trim());
    if reply.kind.is_failure() {
        anyhow::bail!("backend failure (see log for details)");
    }
    Ok(())
}

async fn run_chat(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    use std::io::{self, Write};

    let handler = load_handler(config_path)?;
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;
        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("/exit") || input.eq_ignore_ascii_case("/quit") {
            break;
        }

        let reply = handler.handle(&InboundMessage::new("cli", "chat", input)).await;
        println!("< {}", reply.text.trim());
    }

    Ok(())
}

async fn run_models(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let (config, _) = trainer::config::load_config(config_path)?;
    let client = OpenAiCompatClient::from_config(&config)?;
    let current = trainer::config::resolve_model(&config);
    let models = client.list_models().await?;
    if models.is_empty() {
        println!("no models reported by {}", client.base_url());
    }
    for m in models {
        let marker = if m.name == current || m.name.ends_with(&format!("/{}", current)) {
            "*"
        } else {
            " "
        };
        println!("{} {}", marker, m.name);
    }
    Ok(())
}

async fn run_serve(config_path: Option<PathBuf>, port: Option<u16>) -> anyhow::Result<()> {
    let (mut config, _) = trainer::config::load_config(config_path)?;
    if let Some(p) = port {
        config.gateway.port = p;
    }
    let handler = Arc::new(MessageHandler::from_config(&config)?);
    log::info!("starting gateway on {}:{}", config.gateway.bind, config.gateway.port);
    trainer::gateway::serve(config, handler).await
}
