mod console;
mod shell;

use anyhow::Context;
use dbnav_core::{ClientConfigStore, Navigator};
use log::info;
use std::path::PathBuf;

const USAGE: &str = "Usage: dbnav [--config <file>] [--api-url <url>] [--schema-dir <dir>]";

struct Args {
    config: Option<PathBuf>,
    api_url: Option<String>,
    schema_dir: Option<PathBuf>,
}

fn parse_args(args: &[String]) -> Result<Args, String> {
    let mut parsed = Args {
        config: None,
        api_url: None,
        schema_dir: None,
    };

    let mut iter = args.iter().skip(1);
    while let Some(flag) = iter.next() {
        let mut value = || {
            iter.next()
                .cloned()
                .ok_or_else(|| format!("{} needs a value", flag))
        };

        match flag.as_str() {
            "--config" => parsed.config = Some(PathBuf::from(value()?)),
            "--api-url" => parsed.api_url = Some(value()?),
            "--schema-dir" => parsed.schema_dir = Some(PathBuf::from(value()?)),
            "-h" | "--help" => return Err(USAGE.to_string()),
            other => return Err(format!("Unknown argument {}\n{}", other, USAGE)),
        }
    }

    Ok(parsed)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp_millis()
        .init();

    let args: Vec<String> = std::env::args().collect();
    let args = match parse_args(&args) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{}", message);
            std::process::exit(2);
        }
    };

    if let Err(e) = run(args) {
        eprintln!("dbnav: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let store = match args.config {
        Some(path) => ClientConfigStore::at(path),
        None => ClientConfigStore::new().context("Failed to locate config directory")?,
    };

    let mut config = store
        .load_effective()
        .with_context(|| format!("Failed to read {}", store.path().display()))?
        .with_api_url_override(args.api_url);
    if args.schema_dir.is_some() {
        config.schema_dir = args.schema_dir;
    }
    info!("Using backend {}", config.api_base_url);

    let navigator = Navigator::from_config(&config).context("Failed to set up HTTP client")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start runtime")?;

    runtime.block_on(shell::run(&navigator))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("dbnav")
            .chain(list.iter().copied())
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn parses_overrides() {
        let parsed = parse_args(&args(&["--api-url", "http://db:9000", "--schema-dir", "/etc/dbnav"]))
            .expect("valid arguments");

        assert_eq!(parsed.api_url.as_deref(), Some("http://db:9000"));
        assert_eq!(parsed.schema_dir, Some(PathBuf::from("/etc/dbnav")));
        assert!(parsed.config.is_none());
    }

    #[test]
    fn rejects_missing_values_and_unknown_flags() {
        assert!(parse_args(&args(&["--config"])).is_err());
        assert!(parse_args(&args(&["--verbose"])).is_err());
    }
}
