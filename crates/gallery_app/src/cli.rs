//! Command-line flags.

use std::path::PathBuf;

use clap::Parser;
use gallery_logging::LogDestination;
use gallery_scan::ScannerType;
use log::LevelFilter;

/// Download every picture of an HTML gallery page.
///
/// The page is scanned with the configured detection profiles and the
/// built-in scanners; the pictures found are saved into the output folder.
#[derive(Parser, Debug)]
#[command(name = "gallery-downloader")]
#[command(author, version, about)]
pub struct Args {
    /// Configuration file (browser headers and detection profiles)
    #[arg(long, default_value = "config.json")]
    pub config: PathBuf,

    /// Source HTML gallery: a local file or an http(s) URL
    #[arg(long)]
    pub source: String,

    /// Base URL for relative pictures of a local source file
    #[arg(long)]
    pub base: Option<String>,

    /// Type of gallery (AutoDetect, ConfigProfiles, AnchorHREF, ListItem)
    #[arg(long = "type", default_value_t = ScannerType::AutoDetect)]
    pub scanner: ScannerType,

    /// Output folder to store pictures
    #[arg(long)]
    pub output: PathBuf,

    /// Referer header for the HTML file, or for pictures of a local source file
    #[arg(long)]
    pub referer: Option<String>,

    /// User, if the server needs basic authentication
    #[arg(long, default_value = "")]
    pub user: String,

    /// Password, if the server needs basic authentication
    #[arg(long, default_value = "")]
    pub password: String,

    /// Minimum wait in milliseconds before the next picture (0 to disable)
    #[arg(long = "min-wait")]
    pub min_wait: Option<u64>,

    /// Maximum wait in milliseconds before the next picture (0 to disable)
    #[arg(long = "max-wait")]
    pub max_wait: Option<u64>,

    /// Number of pictures downloaded at the same time
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..=256))]
    pub parallel: Option<u16>,

    /// Skip TLS certificate verification; only for testing locally
    #[arg(long = "insecure-tls")]
    pub insecure_tls: bool,

    /// Also write the log to this file
    #[arg(long = "log-file")]
    pub log_file: Option<PathBuf>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only print warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Args {
    pub fn log_destination(&self) -> LogDestination {
        match &self.log_file {
            Some(path) => LogDestination::Both(path.clone()),
            None => LogDestination::Terminal,
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::Warn;
        }
        match self.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Result<Args, clap::Error> {
        let mut argv = vec!["gallery-downloader", "--source", "page.html", "--output", "out"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv)
    }

    #[test]
    fn defaults() {
        let args = parse(&[]).unwrap();
        assert_eq!(args.config, PathBuf::from("config.json"));
        assert_eq!(args.scanner, ScannerType::AutoDetect);
        assert_eq!(args.min_wait, None);
        assert_eq!(args.max_wait, None);
        assert_eq!(args.parallel, None);
        assert!(!args.insecure_tls);
        assert_eq!(args.user, "");
        assert_eq!(args.log_level(), LevelFilter::Info);
    }

    #[test]
    fn source_and_output_are_required() {
        let err = Args::try_parse_from(["gallery-downloader", "--output", "out"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
        let err = Args::try_parse_from(["gallery-downloader", "--source", "x"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn gallery_type_is_parsed_case_insensitively() {
        assert_eq!(parse(&["--type", "AnchorHREF"]).unwrap().scanner, ScannerType::AnchorHref);
        assert_eq!(parse(&["--type", "listitem"]).unwrap().scanner, ScannerType::ListItem);
        let err = parse(&["--type", "Flickr"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn pacing_flags() {
        let args = parse(&["--min-wait", "0", "--max-wait", "500", "--parallel", "4"]).unwrap();
        assert_eq!(args.min_wait, Some(0));
        assert_eq!(args.max_wait, Some(500));
        assert_eq!(args.parallel, Some(4));
        assert!(parse(&["--parallel", "0"]).is_err());
    }

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(parse(&["-v"]).unwrap().log_level(), LevelFilter::Debug);
        assert_eq!(parse(&["-vv"]).unwrap().log_level(), LevelFilter::Trace);
        assert_eq!(parse(&["-q"]).unwrap().log_level(), LevelFilter::Warn);
        assert!(parse(&["-q", "-v"]).is_err());
    }

    #[test]
    fn log_file_adds_file_destination() {
        assert_eq!(parse(&[]).unwrap().log_destination(), LogDestination::Terminal);
        assert_eq!(
            parse(&["--log-file", "run.log"]).unwrap().log_destination(),
            LogDestination::Both(PathBuf::from("run.log"))
        );
    }
}
