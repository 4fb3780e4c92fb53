use anyhow::Result;
use clap::Parser;
use log::debug;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use v2feed::commands::{
    self, OutputFormat,
    config::{Config, SourceOptions},
};
use v2feed::{DownloadSettings, SearchFilter};

/// v2feed - NuGet v2 feed client
///
/// Query OData/Atom (v2) package feeds and download packages.
///
/// Credentials may be given with --username/--password. Without them, a
/// feed that answers 401 is retried with V2FEED_USERNAME/V2FEED_PASSWORD.
///
/// Examples:
///   v2feed --source https://www.nuget.org/api/v2 find Newtonsoft.Json
///   v2feed --source https://www.nuget.org/api/v2 search json --take 5
#[derive(Parser, Debug)]
#[command(author, version = env!("V2FEED_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Feed URL (also via V2FEED_SOURCE)
    #[arg(long, short = 's', env = "V2FEED_SOURCE", value_name = "URL", global = true)]
    pub source: Option<String>,

    /// Username for the feed
    #[arg(long, env = "V2FEED_USERNAME", global = true)]
    pub username: Option<String>,

    /// Password for the feed
    #[arg(long, env = "V2FEED_PASSWORD", hide_env_values = true, global = true)]
    pub password: Option<String>,

    /// Proxy URL for all requests
    #[arg(long, env = "V2FEED_PROXY", value_name = "URL", global = true)]
    pub proxy: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECONDS", default_value_t = 100, global = true)]
    pub timeout: u64,

    /// Print records as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// List all versions of a package
    Find(FindArgs),

    /// Show one package version
    Get(GetArgs),

    /// Search the feed
    Search(SearchArgs),

    /// Download a package
    Download(DownloadArgs),
}

#[derive(clap::Args, Debug)]
pub struct FindArgs {
    /// Package id
    pub id: String,

    /// Only versions in this range, e.g. "[1.0, 2.0)"
    #[arg(long, value_name = "RANGE")]
    pub range: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct GetArgs {
    /// Package id
    pub id: String,

    /// Package version
    pub version: String,
}

#[derive(clap::Args, Debug)]
pub struct SearchArgs {
    /// Search term
    pub term: String,

    /// Include pre-release versions
    #[arg(long)]
    pub prerelease: bool,

    /// Supported target framework (repeatable)
    #[arg(long = "framework", value_name = "FRAMEWORK")]
    pub frameworks: Vec<String>,

    /// Number of results to skip
    #[arg(long, default_value_t = 0)]
    pub skip: usize,

    /// Maximum number of results
    #[arg(long, default_value_t = 30)]
    pub take: usize,
}

#[derive(clap::Args, Debug)]
pub struct DownloadArgs {
    /// Package id
    pub id: String,

    /// Package version
    pub version: String,

    /// Output file (defaults to <id>.<version>.nupkg)
    #[arg(long, short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Refuse packages larger than this many bytes
    #[arg(long, value_name = "BYTES")]
    pub max_size: Option<u64>,
}

impl Cli {
    fn source_options(&self) -> Result<SourceOptions> {
        let source = self
            .source
            .clone()
            .ok_or_else(|| anyhow::anyhow!("No feed given; use --source or set V2FEED_SOURCE"))?;
        Ok(SourceOptions {
            source,
            username: self.username.clone(),
            password: self.password.clone(),
            proxy: self.proxy.clone(),
            timeout: Some(Duration::from_secs(self.timeout)),
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Interrupted, cancelling");
            on_interrupt.cancel();
        }
    });

    let config = Config::new(&cli.source_options()?, cancel)?;
    let format = OutputFormat::from_json_flag(cli.json);

    match cli.command {
        Commands::Find(args) => {
            commands::find(&config, &args.id, args.range.as_deref(), format).await?
        }
        Commands::Get(args) => commands::get(&config, &args.id, &args.version, format).await?,
        Commands::Search(args) => {
            let filter = SearchFilter {
                supported_frameworks: args.frameworks,
                include_prerelease: args.prerelease,
            };
            commands::search(&config, &args.term, &filter, args.skip, args.take, format).await?
        }
        Commands::Download(args) => {
            let settings = DownloadSettings {
                max_size: args.max_size,
            };
            commands::download(&config, &args.id, &args.version, args.output, &settings).await?
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_find_parsing() {
        let cli = Cli::try_parse_from(&[
            "v2feed",
            "--source",
            "http://testsource/v2",
            "find",
            "xunit",
            "--range",
            "[2.0, )",
        ])
        .unwrap();
        match cli.command {
            Commands::Find(args) => {
                assert_eq!(args.id, "xunit");
                assert_eq!(args.range.as_deref(), Some("[2.0, )"));
            }
            _ => panic!("Expected Find command"),
        }
        assert_eq!(cli.source.as_deref(), Some("http://testsource/v2"));
        assert_eq!(cli.timeout, 100);
        assert!(!cli.json);
    }

    #[test]
    fn test_cli_search_parsing() {
        let cli = Cli::try_parse_from(&[
            "v2feed",
            "search",
            "json",
            "--prerelease",
            "--framework",
            "net45",
            "--framework",
            "netcore50",
            "--skip",
            "10",
            "--source",
            "http://testsource/v2",
        ])
        .unwrap();
        match cli.command {
            Commands::Search(args) => {
                assert_eq!(args.term, "json");
                assert!(args.prerelease);
                assert_eq!(args.frameworks, vec!["net45", "netcore50"]);
                assert_eq!(args.skip, 10);
                assert_eq!(args.take, 30);
            }
            _ => panic!("Expected Search command"),
        }
    }

    #[test]
    fn test_cli_download_parsing() {
        let cli = Cli::try_parse_from(&[
            "v2feed", "download", "Foo", "1.0.0", "-o", "/tmp/foo.nupkg", "--json",
        ])
        .unwrap();
        match cli.command {
            Commands::Download(args) => {
                assert_eq!(args.id, "Foo");
                assert_eq!(args.version, "1.0.0");
                assert_eq!(args.output, Some(PathBuf::from("/tmp/foo.nupkg")));
                assert_eq!(args.max_size, None);
            }
            _ => panic!("Expected Download command"),
        }
        assert!(cli.json);
    }

    #[test]
    fn test_cli_get_requires_version() {
        let result = Cli::try_parse_from(&["v2feed", "get", "Foo"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_no_subcommand_fails() {
        let result = Cli::try_parse_from(&["v2feed", "--source", "http://testsource/v2"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_source_options_with_credentials() {
        let cli = Cli::try_parse_from(&[
            "v2feed",
            "--source",
            "http://testsource/v2",
            "--username",
            "alice",
            "--password",
            "secret",
            "--timeout",
            "5",
            "get",
            "Foo",
            "1.0",
        ])
        .unwrap();
        let options = cli.source_options().unwrap();
        assert_eq!(options.username.as_deref(), Some("alice"));
        assert_eq!(options.password.as_deref(), Some("secret"));
        assert_eq!(options.timeout, Some(Duration::from_secs(5)));
    }
}
