use anyhow::Context;
use chatgpt_relay::{serve_lines, ChatPlugin, ConsoleSession, PluginConfig};
use clap::{Arg, ArgAction, Command};
use std::sync::Arc;
use tokio::io::BufReader;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = Command::new("chatgpt-relay")
        .version("0.1.0")
        .about("Relay chat commands typed on stdin to an OpenAI-compatible completion API")
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .help("JSON file with the plugin configuration")
                .required(true)
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("image-dir")
                .long("image-dir")
                .value_name("DIR")
                .help("Directory receiving rendered replies in picture mode")
                .default_value(".")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .help("Log at debug level when RUST_LOG is unset")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    if matches.get_flag("verbose") && std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", "chatgpt_relay=debug");
    }
    chatgpt_relay::init_logging();

    let config_path: &String = matches.get_one("config").context("--config is required")?;
    let raw = std::fs::read_to_string(config_path).with_context(|| format!("reading {config_path}"))?;
    let mut value: serde_json::Value = serde_json::from_str(&raw).with_context(|| format!("parsing {config_path}"))?;

    // Environment key only fills a gap in the file.
    if value.get("apiKey").and_then(|v| v.as_str()).map_or(true, str::is_empty) {
        if let (Ok(key), Some(obj)) = (std::env::var("OPENAI_API_KEY"), value.as_object_mut()) {
            obj.insert("apiKey".to_string(), serde_json::Value::String(key));
        }
    }
    let config: PluginConfig = serde_json::from_value(value)?;
    let plugin = Arc::new(ChatPlugin::apply(config)?);

    let image_dir: &String = matches.get_one("image-dir").context("missing --image-dir")?;
    let session = Arc::new(ConsoleSession::new("console", image_dir.as_str()));

    let handled = serve_lines(plugin, session, BufReader::new(tokio::io::stdin())).await?;
    tracing::info!(handled, "stdin closed");
    Ok(())
}
