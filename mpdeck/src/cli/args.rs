//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "mpdeck",
    version,
    about = "Terminal front-end for a fleet of Multipass VMs",
    after_help = "\
EXAMPLES:
    mpdeck                                   Use the multipass client on PATH
    mpdeck --backend /snap/bin/multipass     Explicit backend executable
    mpdeck --refresh-ms 3000                 Poll the backend every 3 seconds
    RUST_LOG=debug mpdeck --log-file /tmp/mpdeck.log"
)]
pub struct Args {
    /// Config file (default: platform config dir, e.g. ~/.config/mpdeck/config)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Backend command-line client, by name or path
    #[arg(long, default_value = "multipass", value_name = "PROGRAM")]
    pub backend: String,

    /// Background refresh interval in milliseconds
    #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u64).range(250..))]
    pub refresh_ms: u64,

    /// Directory of local cloud-init templates
    /// (default: platform config dir, e.g. ~/.config/mpdeck/templates)
    #[arg(long, value_name = "DIR")]
    pub templates_dir: Option<PathBuf>,

    /// Skip cloning/pulling the template repository from the config file
    #[arg(long)]
    pub no_remote_templates: bool,

    /// Log file (the terminal belongs to the UI; default: platform data dir)
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["mpdeck"]);
        assert_eq!(args.backend, "multipass");
        assert_eq!(args.refresh_ms, 1000);
        assert!(args.config.is_none());
        assert!(!args.no_remote_templates);
    }

    #[test]
    fn test_help_names_default_locations() {
        let command = Args::command();
        let help = |id: &str| {
            let arg = command.get_arguments().find(|a| a.get_id() == id).unwrap();
            arg.get_help().unwrap().to_string()
        };
        assert!(help("templates_dir").contains("config dir"));
        assert!(help("log_file").contains("data dir"));
    }

    #[test]
    fn test_refresh_interval_has_a_floor() {
        assert!(Args::try_parse_from(["mpdeck", "--refresh-ms", "100"]).is_err());
        let args = Args::try_parse_from(["mpdeck", "--refresh-ms", "250"]).unwrap();
        assert_eq!(args.refresh_ms, 250);
    }
}
