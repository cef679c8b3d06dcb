use anyhow::Result;
use clap::{Parser, Subcommand};
use terrabot::config::Settings;
use terrabot::server::{self, AppState};

#[derive(Parser, Debug)]
#[command(name = "terrabot")]
#[command(about = "Land and property assistant (HTTP chat server)", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP server.
    Serve(ServeCmd),
    /// Answer a single message through the full pipeline and exit.
    Ask(AskCmd),
    /// Report which collaborators are configured (json; no secrets).
    Doctor(DoctorCmd),
    /// Print version info.
    Version(VersionCmd),
}

#[derive(clap::Args, Debug)]
struct ServeCmd {
    #[arg(long, env = "TERRABOT_BIND", default_value = "127.0.0.1:8080")]
    bind: String,
    #[command(flatten)]
    settings: Settings,
}

#[derive(clap::Args, Debug)]
struct AskCmd {
    /// The user message.
    message: String,
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "text")]
    output: String,
    #[command(flatten)]
    settings: Settings,
}

#[derive(clap::Args, Debug)]
struct DoctorCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
    #[command(flatten)]
    settings: Settings,
}

#[derive(clap::Args, Debug)]
struct VersionCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

/// Opt-in `KEY=VALUE` file (TERRABOT_ENV_FILE). Never overrides variables already set.
fn load_env_file() {
    let Ok(p) = std::env::var("TERRABOT_ENV_FILE") else {
        return;
    };
    let p = p.trim();
    if p.is_empty() {
        return;
    }
    let Ok(txt) = std::fs::read_to_string(p) else {
        return;
    };
    for raw in txt.lines() {
        let s = raw.trim();
        if s.is_empty() || s.starts_with('#') {
            continue;
        }
        let Some((k, v)) = s.split_once('=') else {
            continue;
        };
        let k = k.trim();
        if k.is_empty() {
            continue;
        }
        if std::env::var_os(k).is_none() {
            std::env::set_var(k, v.trim());
        }
    }
}

fn configure_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env_file();
    let cli = Cli::parse();
    configure_tracing();

    match cli.command {
        Commands::Serve(args) => {
            let pipeline = args.settings.pipeline().await?;
            let listener = tokio::net::TcpListener::bind(&args.bind).await?;
            server::serve(listener, AppState::new(pipeline)).await?;
        }
        Commands::Ask(args) => {
            let pipeline = args.settings.pipeline().await?;
            let reply = pipeline.respond(&args.message).await?;
            match args.output.to_ascii_lowercase().as_str() {
                "json" => println!(
                    "{}",
                    serde_json::json!({
                        "text": reply.text,
                        "kind": format!("{:?}", reply.kind),
                        "rejected": reply.is_rejected(),
                    })
                ),
                _ => println!("{}", reply.text),
            }
        }
        Commands::Doctor(args) => {
            let report = args.settings.doctor_report();
            match args.output.to_ascii_lowercase().as_str() {
                "text" => {
                    for (k, v) in report["configured"].as_object().into_iter().flatten() {
                        println!("{k}: {v}");
                    }
                }
                _ => println!("{report}"),
            }
        }
        Commands::Version(args) => {
            let v = serde_json::json!({
                "schema_version": 1,
                "kind": "version",
                "ok": true,
                "name": "terrabot",
                "version": env!("CARGO_PKG_VERSION"),
            });
            match args.output.to_ascii_lowercase().as_str() {
                "text" => println!("terrabot {}", env!("CARGO_PKG_VERSION")),
                _ => println!("{v}"),
            }
        }
    }
    Ok(())
}
