//! CLI entry point for xmlapi — a client for the remote XML file service.
//!
//! Resolves configuration (flags and env vars over an optional TOML file),
//! then runs exactly one operation per invocation.
//!
//! Exit codes:
//! - 0: success
//! - 1: runtime error (authorization failure, API error, domain error, etc.)
//! - 2: argument validation error (clap handles this automatically)

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use xmlapi::client::XmlClient;
use xmlapi::config::ClientConfig;
use xmlapi::error::XmlApiError;
use xmlapi::nodes::Node;
use xmlapi::{files, nodes};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Service address, e.g. `https://xml.example.net`.
    #[arg(long, env = "XMLAPI_BASE_URL")]
    base_url: Option<String>,

    /// API key used to obtain session tokens. Prefer setting via the
    /// XMLAPI_API_KEY environment variable to keep it out of shell history.
    #[arg(long, env = "XMLAPI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// TOML file with base_url, api_key and timeout settings.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Exchange the API key for a token and report success.
    Authorize,

    /// Copy one file, or every file, from a device to another device.
    CopyDevice {
        #[arg(long)]
        device_id: String,
        #[arg(long)]
        new_device_id: String,
        /// Copy only this file. Omit to copy every file of the device.
        #[arg(long)]
        filename: Option<String>,
        /// Replace files that already exist on the target device.
        #[arg(long)]
        overwrite: bool,
    },

    /// Create an empty XML file with the given root element.
    CreateFile {
        #[arg(long)]
        device_id: String,
        #[arg(long)]
        filename: String,
        #[arg(long)]
        root_name: String,
    },

    /// Add an element under an existing node.
    CreateNode {
        #[arg(long)]
        device_id: String,
        #[arg(long)]
        filename: String,
        #[arg(long)]
        parent_path: String,
        #[arg(long)]
        tag: String,
        #[arg(long, allow_hyphen_values = true)]
        value: String,
    },

    /// Remove a node and its subtree.
    DeleteNode {
        #[arg(long)]
        device_id: String,
        #[arg(long)]
        filename: String,
        #[arg(long)]
        path: String,
    },

    /// Delete an XML file.
    DeleteFile {
        #[arg(long)]
        device_id: String,
        #[arg(long)]
        filename: String,
    },

    /// List the XML files of a device.
    ListFiles {
        #[arg(long)]
        device_id: String,
    },

    /// Print a node and its subtree as JSON.
    ReadNode {
        #[arg(long)]
        device_id: String,
        #[arg(long)]
        filename: String,
        #[arg(long)]
        path: String,
    },

    /// Replace the value of a node.
    UpdateNode {
        #[arg(long)]
        device_id: String,
        #[arg(long)]
        filename: String,
        #[arg(long)]
        path: String,
        #[arg(long, allow_hyphen_values = true)]
        value: String,
    },
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Layers flags and env vars over the config file (or the defaults).
fn resolve_config(cli: &Cli) -> xmlapi::error::Result<ClientConfig> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::default(),
    };
    config.apply_overrides(cli.base_url.clone(), cli.api_key.clone());
    Ok(config)
}

async fn run(cli: Cli) -> xmlapi::error::Result<()> {
    let config = resolve_config(&cli)?;
    let client = XmlClient::from_config(&config)?;

    match cli.command {
        Command::Authorize => {
            client.authorize().await?;
            println!("authorized");
        }
        Command::CopyDevice {
            device_id,
            new_device_id,
            filename,
            overwrite,
        } => {
            let status = files::copy_device(
                &client,
                &device_id,
                &new_device_id,
                filename.as_deref(),
                overwrite,
            )
            .await?;
            println!("{status}");
        }
        Command::CreateFile {
            device_id,
            filename,
            root_name,
        } => {
            let status = files::create_file(&client, &device_id, &filename, &root_name).await?;
            println!("{status}");
        }
        Command::CreateNode {
            device_id,
            filename,
            parent_path,
            tag,
            value,
        } => {
            let status =
                nodes::create_node(&client, &device_id, &filename, &parent_path, &tag, &value)
                    .await?;
            println!("{status}");
        }
        Command::DeleteNode {
            device_id,
            filename,
            path,
        } => {
            let status = nodes::delete_node(&client, &device_id, &filename, &path).await?;
            println!("{status}");
        }
        Command::DeleteFile {
            device_id,
            filename,
        } => {
            let status = files::delete_file(&client, &device_id, &filename).await?;
            println!("{status}");
        }
        Command::ListFiles { device_id } => {
            for name in files::list_files(&client, &device_id).await? {
                println!("{name}");
            }
        }
        Command::ReadNode {
            device_id,
            filename,
            path,
        } => {
            let node = nodes::read_node(&client, &device_id, &filename, &path).await?;
            println!("{}", render_node(&node)?);
        }
        Command::UpdateNode {
            device_id,
            filename,
            path,
            value,
        } => {
            let status = nodes::update_node(&client, &device_id, &filename, &path, &value).await?;
            println!("{status}");
        }
    }
    Ok(())
}

/// Pretty JSON for the `read-node` output.
fn render_node(node: &Node) -> xmlapi::error::Result<String> {
    serde_json::to_string_pretty(node).map_err(XmlApiError::Encode)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Global arguments that satisfy the client configuration.
    /// Tests append a subcommand to this baseline.
    fn base_args() -> Vec<&'static str> {
        vec!["xmlapi", "--base-url", "http://xml.test", "--api-key", "k-1"]
    }

    #[test]
    fn render_node_prints_tree_as_pretty_json() {
        let node: Node = serde_json::from_value(serde_json::json!({
            "name": "config",
            "value": "",
            "nodes": [{"name": "hostname", "value": "edge-01"}]
        }))
        .unwrap();
        let out = render_node(&node).unwrap();
        assert!(out.contains("\n"), "expected multi-line output: {out}");
        let back: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(back["nodes"][0]["value"], "edge-01");
    }

    #[test]
    fn missing_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(base_args()).is_err());
    }

    #[test]
    fn copy_device_parses_with_overwrite() {
        let mut args = base_args();
        args.extend_from_slice(&[
            "copy-device",
            "--device-id",
            "d1",
            "--new-device-id",
            "d2",
            "--filename",
            "f.xml",
            "--overwrite",
        ]);
        let cli = Cli::try_parse_from(args).expect("should parse copy-device");
        match cli.command {
            Command::CopyDevice {
                device_id,
                new_device_id,
                filename,
                overwrite,
            } => {
                assert_eq!(device_id, "d1");
                assert_eq!(new_device_id, "d2");
                assert_eq!(filename.as_deref(), Some("f.xml"));
                assert!(overwrite);
            }
            _ => panic!("expected copy-device"),
        }
    }

    #[test]
    fn copy_device_filename_and_overwrite_are_optional() {
        let mut args = base_args();
        args.extend_from_slice(&["copy-device", "--device-id", "d1", "--new-device-id", "d2"]);
        let cli = Cli::try_parse_from(args).expect("should parse without --filename");
        match cli.command {
            Command::CopyDevice {
                filename,
                overwrite,
                ..
            } => {
                assert!(filename.is_none());
                assert!(!overwrite);
            }
            _ => panic!("expected copy-device"),
        }
    }

    #[test]
    fn read_node_requires_path() {
        let mut args = base_args();
        args.extend_from_slice(&["read-node", "--device-id", "d1", "--filename", "f.xml"]);
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn update_node_accepts_hyphen_value() {
        let mut args = base_args();
        args.extend_from_slice(&[
            "update-node",
            "--device-id",
            "d1",
            "--filename",
            "f.xml",
            "--path",
            "/cfg/offset",
            "--value",
            "-42",
        ]);
        let cli = Cli::try_parse_from(args).expect("should parse a negative value");
        match cli.command {
            Command::UpdateNode { value, .. } => assert_eq!(value, "-42"),
            _ => panic!("expected update-node"),
        }
    }

    #[test]
    fn verbosity_counts_repeated_flags() {
        let mut args = base_args();
        args.extend_from_slice(&["-vv", "authorize"]);
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn flags_override_config_defaults() {
        let mut args = base_args();
        args.push("authorize");
        let cli = Cli::try_parse_from(args).unwrap();
        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.base_url, "http://xml.test");
        assert_eq!(config.api_key.as_deref(), Some("k-1"));
    }
}
