use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "ehon-finder")]
#[command(about = "絵本をさがして、近くの図書館の蔵書状況を確認します")]
pub struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, global = true, default_value = "ehon.toml")]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Recommend picture books matching two keywords
    Recommend {
        /// Character or theme keyword (e.g. どうぶつ)
        character: String,
        /// Feeling keyword (e.g. わくわく)
        feeling: String,
        /// Fetch a short introduction for each book
        #[arg(long)]
        describe: bool,
    },
    /// Check library availability of one book in a prefecture
    Locate {
        /// Prefecture, with or without the 都/道/府/県 suffix
        #[arg(short, long)]
        region: String,
        /// Catalog ISBN of the book
        #[arg(long)]
        isbn: String,
        /// Title, for books outside the catalog
        #[arg(long, requires = "author")]
        title: Option<String>,
        #[arg(long, requires = "title")]
        author: Option<String>,
        /// Also ask for representative libraries of the region
        #[arg(long)]
        guide: bool,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Pick keywords, choose a book and search regions interactively
    Interactive,
    /// List the 47 prefectures accepted as regions
    Regions,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_locate_with_isbn() {
        let cli = Cli::try_parse_from([
            "ehon-finder",
            "locate",
            "--region",
            "東京",
            "--isbn",
            "9784834000825",
            "-v",
        ])
        .unwrap();

        assert!(cli.verbose);
        assert_eq!(cli.config, PathBuf::from("ehon.toml"));
        match cli.command {
            Command::Locate { region, isbn, title, .. } => {
                assert_eq!(region, "東京");
                assert_eq!(isbn, "9784834000825");
                assert!(title.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_locate_arguments() {
        assert!(Cli::try_parse_from(["ehon-finder", "locate", "--region", "大阪"]).is_err());
        assert!(Cli::try_parse_from([
            "ehon-finder", "locate", "--region", "大阪", "--isbn", "9784834000825", "--title", "ぐりとぐら",
        ])
        .is_err());
    }

    #[test]
    fn test_parse_recommend() {
        let cli = Cli::try_parse_from(["ehon-finder", "--config", "custom.toml", "recommend", "どうぶつ", "わくわく"])
            .unwrap();
        assert_eq!(cli.config, PathBuf::from("custom.toml"));
        assert!(matches!(cli.command, Command::Recommend { describe: false, .. }));
    }
}
