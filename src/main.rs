use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use device_topics::config::AppConfig;
use device_topics::mqtt::{
    default_templates, generate_resolved_topics, is_valid_device_id, placeholder_count, resolve,
    resolve_checked, validate, Direction, QoS,
};
use device_topics::persistence::{load_templates, save_templates};
use std::path::PathBuf;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "device-topics")]
#[command(
    about = "Validate and preview MQTT topic templates for device profiles",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ~/.config/device-topics/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a topic pattern
    Validate {
        pattern: String,
    },

    /// Substitute a device id into a topic pattern
    Resolve {
        pattern: String,
        device_id: String,

        /// Validate the pattern and the resulting topic
        #[arg(long)]
        strict: bool,
    },

    /// Check whether a device id can be embedded into topics
    CheckDevice {
        device_id: String,
    },

    /// Show every template resolved for a device
    Preview {
        /// Device id to preview with (defaults to the configured one)
        #[arg(short, long)]
        device_id: Option<String>,

        /// Template file (defaults to the configured one)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Print the direction and QoS labels
    Labels,

    /// Write the default templates to a file
    InitTemplates {
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup()?;
    let config = AppConfig::load(cli.config.as_deref()).await?;

    let configured = config.level();
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        configured.unwrap_or(Level::INFO)
    };
    // The subscriber has to exist before anything about the config is logged.
    setup_logging(level);
    if configured.is_none() {
        warn!("Unknown log level {:?}, using info", config.log_level);
    }
    debug!("Using config {:?}", config);

    match cli.command {
        Commands::Validate { pattern } => {
            let result = validate(&pattern);
            match result.reason {
                None => println!("valid: {}", pattern),
                Some(reason) => {
                    return Err(match reason.position() {
                        Some(at) => eyre!("invalid ({:?} at {}): {}", reason.kind(), at, reason),
                        None => eyre!("invalid ({:?}): {}", reason.kind(), reason),
                    });
                }
            }
        }
        Commands::Resolve {
            pattern,
            device_id,
            strict,
        } => {
            let topic = if strict {
                resolve_checked(&pattern, &device_id)?
            } else {
                resolve(Some(&pattern), &device_id)
            };
            println!("{}", topic);
        }
        Commands::CheckDevice { device_id } => {
            if is_valid_device_id(&device_id) {
                println!("valid: {}", device_id);
            } else {
                return Err(eyre!(
                    "Device ID can only contain letters, numbers, hyphens, and underscores: {:?}",
                    device_id
                ));
            }
        }
        Commands::Preview { device_id, file } => {
            let device_id = device_id.unwrap_or_else(|| config.preview_device_id.clone());
            let path = file.unwrap_or_else(|| config.templates_path());
            let templates = load_templates(&path).await?;

            if templates.is_empty() {
                println!("No MQTT topics configured");
                return Ok(());
            }

            info!("Previewing {} topics for {}", templates.len(), device_id);
            for entry in generate_resolved_topics(&templates, &device_id) {
                let topic = &entry.topic;
                println!("{}", topic.name);
                if let Some(description) = &topic.description {
                    println!("    {}", description);
                }
                println!("    pattern:   {}", topic.topic_pattern);
                println!("    topic:     {}", entry.resolved_topic);
                if placeholder_count(&topic.topic_pattern) == 0 {
                    println!("    note:      no {{deviceId}}, shared by every device");
                }
                println!("    direction: {}", topic.direction);
                println!(
                    "    qos:       {}  retain: {}",
                    topic.qos.short_label(),
                    if topic.retain { "Yes" } else { "No" }
                );
            }
        }
        Commands::Labels => {
            for direction in Direction::ALL {
                println!("{:<10} {}", direction.as_str(), direction.label());
                println!("{:<10} {}", "", direction.description());
            }
            for qos in QoS::ALL {
                println!("{:<10} {}", qos.level(), qos.label());
            }
        }
        Commands::InitTemplates { file, force } => {
            let path = file.unwrap_or_else(|| config.templates_path());
            if path.exists() && !force {
                return Err(eyre!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                ));
            }
            save_templates(&path, &default_templates()).await?;
            println!("Wrote default templates to {}", path.display());
        }
    }

    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    Ok(())
}

fn setup_logging(level: Level) {
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .init();
}
