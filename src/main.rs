use clap::{
    CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};

use tunescrape::{cli, config, error};

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Scrape the attributes of a track
    Scrape(ScrapeOptions),

    /// Look a Spotify track up, then scrape it
    Lookup(LookupOptions),

    /// Print the page URL for a track without scraping it
    Url(UrlOptions),

    /// Serve scrapes over HTTP
    Serve(ServeOptions),

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct ScrapeOptions {
    /// Artist name
    artist: String,

    /// Song title
    song: String,

    /// Spotify track id, URI or URL
    track_id: String,

    /// Print the result as JSON
    #[clap(long)]
    json: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct LookupOptions {
    /// Spotify track id, URI or URL
    track: String,

    /// Print the result as JSON
    #[clap(long)]
    json: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct UrlOptions {
    artist: String,
    song: String,
    track_id: String,
}

#[derive(Parser, Debug, Clone)]
pub struct ServeOptions {
    /// Address to bind, overrides SERVER_ADDRESS
    #[clap(long)]
    addr: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

#[tokio::main]
async fn main() {
    if let Err(e) = config::load_env().await {
        error!("Cannot load environment. Err: {}", e);
    }

    let cli = Cli::parse();

    match cli.command {
        Command::Scrape(opt) => cli::scrape(opt.artist, opt.song, opt.track_id, opt.json).await,
        Command::Lookup(opt) => cli::lookup(opt.track, opt.json).await,
        Command::Url(opt) => cli::url(opt.artist, opt.song, opt.track_id),
        Command::Serve(opt) => cli::serve(opt.addr).await,
        Command::Completions(opt) => {
            let mut cmd = Cli::command_for_update();
            let name = cmd.get_name().to_string();
            generate(opt.shell, &mut cmd, name, &mut std::io::stdout())
        }
    }
}
