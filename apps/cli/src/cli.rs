use std::path::PathBuf;

use clap::Parser;

/// datadrop - upload datasets to a datadrop server
#[derive(Parser, Debug)]
#[command(name = "datadrop")]
#[command(about = "Upload files and directories as a dataset", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Files or directories to upload
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Server base URL (overrides the config file)
    #[arg(long)]
    pub server: Option<String>,

    /// Dataset label
    #[arg(long, default_value = "")]
    pub label: String,

    /// Retention time in hours (1-720)
    #[arg(long)]
    pub retention: Option<u32>,

    /// List the dataset publicly
    #[arg(long)]
    pub public: bool,

    /// Hide the dataset from listings
    #[arg(long)]
    pub hidden: bool,

    /// Chunk size in bytes instead of the server's
    #[arg(long)]
    pub chunk_size: Option<u64>,

    /// Status poll interval in milliseconds
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,

    /// Do not keep the machine awake during the upload
    #[arg(long)]
    pub no_wake_lock: bool,

    /// Config file to read instead of the default location
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_paths_and_flags() {
        let cli = Cli::try_parse_from([
            "datadrop",
            "--server",
            "https://drop.example",
            "--label",
            "survey",
            "--retention",
            "72",
            "--public",
            "data/",
            "notes.txt",
        ])
        .unwrap();

        assert_eq!(cli.paths, vec![PathBuf::from("data/"), PathBuf::from("notes.txt")]);
        assert_eq!(cli.server.as_deref(), Some("https://drop.example"));
        assert_eq!(cli.label, "survey");
        assert_eq!(cli.retention, Some(72));
        assert!(cli.public);
        assert!(!cli.hidden);
        assert!(!cli.no_wake_lock);
    }

    #[test]
    fn requires_a_path() {
        assert!(Cli::try_parse_from(["datadrop", "--public"]).is_err());
    }
}
