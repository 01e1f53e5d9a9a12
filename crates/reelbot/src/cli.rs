use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "reelbot")]
#[command(author, version, about = "Discord bot that fetches short videos and delivers them privately as MP4", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the Discord bot (default)
    Run,

    /// Run the pipeline once for a URL and save the result locally
    Fetch {
        /// Video link (TikTok, Instagram, X, YouTube Shorts, ...)
        url: String,

        /// Directory to save the video into
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check external tools and cookie configuration
    Doctor,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_no_subcommand_means_run() {
        let cli = Cli::try_parse_from(["reelbot"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_fetch_arguments() {
        let cli = Cli::try_parse_from(["reelbot", "fetch", "https://example.com/v/1", "-o", "out"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::Fetch {
                url: "https://example.com/v/1".into(),
                output: Some(PathBuf::from("out")),
            })
        );
    }

    #[test]
    fn test_fetch_requires_url() {
        assert!(Cli::try_parse_from(["reelbot", "fetch"]).is_err());
    }

    #[test]
    fn test_doctor() {
        let cli = Cli::try_parse_from(["reelbot", "doctor"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Doctor));
    }
}
