use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::config::parse_duration;

const ENV_HELP: &str = "\
Environment:
  GITHUB_TOKEN           GitHub token, required for starring
  TWILIO_ACCOUNT_SID     Twilio account SID
  TWILIO_AUTH_TOKEN      Twilio auth token
  TWILIO_PHONE_NUMBER    Twilio number SMS is sent from
  STARGAZER_LISTEN_ADDR  Status server address
  ENV=prod               Log as JSON
  RUST_LOG               Log filter (default: info)";

/// Watch a GitHub repository until it reaches a number of stargazers.
#[derive(Debug, Default, Parser)]
#[command(name = "github-stargazer", version, about, after_help = ENV_HELP)]
pub struct Cli {
    /// Config file (default: ./stargazer.toml if present)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Repository to watch, in owner/repo format
    #[arg(long, value_name = "OWNER/REPO")]
    pub repo: Option<String>,

    /// Stargazer count to watch for
    #[arg(long)]
    pub target: Option<u64>,

    /// Poll interval, e.g. 30s, 1m, 1h (minimum 1s)
    #[arg(long, value_parser = parse_duration)]
    pub interval: Option<Duration>,

    /// Phone number to text when the target is reached
    #[arg(long)]
    pub phone: Option<String>,

    /// Twilio number to send the text from
    #[arg(long)]
    pub sender: Option<String>,

    /// Star the repository when the target is reached (default)
    #[arg(long, overrides_with = "no_star")]
    pub star: bool,

    /// Do not star the repository
    #[arg(long = "no-star", overrides_with = "star")]
    pub no_star: bool,

    /// Exit once the target is reached
    #[arg(long = "exit")]
    pub exit_after: bool,

    /// Count at which to switch to the approach interval
    #[arg(long, value_name = "COUNT")]
    pub approach: Option<u64>,

    /// Poll interval once the approach count is reached
    #[arg(long, value_parser = parse_duration)]
    pub approach_interval: Option<Duration>,

    /// Status server listen address, e.g. 127.0.0.1:4040, localhost:4040, or :4040
    #[arg(long, value_name = "HOST:PORT")]
    pub addr: Option<String>,
}
