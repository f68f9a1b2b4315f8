//! One download run: load configuration, obtain the gallery page, detect its
//! pictures and download them.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use gallery_engine::{
    ensure_output_dir, save_document, Coordinator, FetchSettings, Fetcher, ProgressSink,
    RequestHeaders, ReqwestFetcher, RetrievalContext, RetrievalSummary,
};
use gallery_logging::{gallery_info, gallery_warn};
use gallery_scan::{detect, Pacing};
use url::Url;

use crate::cli::Args;
use crate::config::Configuration;
use crate::progress::ConsoleProgress;

/// File name used to keep a remote page in which no picture was found.
pub const SAVED_PAGE_NAME: &str = "index.html";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunReport {
    Downloaded(RetrievalSummary),
    /// Nothing detected; a remote page is kept for inspection.
    NoPictures { saved_page: Option<PathBuf> },
}

enum Source {
    Remote(Url),
    Local(PathBuf),
}

impl Source {
    fn parse(source: &str) -> Source {
        match Url::parse(source) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Source::Remote(url),
            _ => Source::Local(PathBuf::from(source)),
        }
    }
}

pub fn run(args: &Args) -> Result<RunReport> {
    let fetcher = ReqwestFetcher::new(&FetchSettings {
        accept_invalid_certs: args.insecure_tls,
        ..FetchSettings::default()
    })
    .context("cannot create HTTP client")?;
    let runtime = tokio::runtime::Runtime::new().context("cannot start async runtime")?;
    runtime.block_on(execute(args, &fetcher, Arc::new(ConsoleProgress::new(args.quiet))))
}

pub async fn execute(
    args: &Args,
    fetcher: &dyn Fetcher,
    progress: Arc<dyn ProgressSink>,
) -> Result<RunReport> {
    let config = Configuration::load(&args.config)?;
    let configured = config
        .compile_profiles()
        .context("cannot load detection profiles")?;
    let profiles = args
        .scanner
        .profiles(&configured)
        .context("cannot build built-in scanners")?;
    let base = args.base.as_deref().map(parse_base).transpose()?;
    check_pacing_flags(args)?;
    ensure_output_dir(&args.output)?;

    gallery_info!("using gallery scanner: {}", args.scanner);
    let source = Source::parse(&args.source);
    let remote = matches!(source, Source::Remote(_));
    let (document, base, referer) = match source {
        Source::Remote(page) => {
            let context = retrieval_context(
                args,
                &config,
                None,
                args.referer.as_deref(),
                Pacing::parallel(1),
                progress.clone(),
            )?;
            let document = Coordinator::new(fetcher, &context)
                .html(&page)
                .await
                .with_context(|| format!("cannot download HTML source {page}"))?;
            let referer = page.to_string();
            (document, Some(page), Some(referer))
        }
        Source::Local(path) => {
            let document = fs::read(&path)
                .with_context(|| format!("cannot read HTML source file {}", path.display()))?;
            (document, base, args.referer.clone())
        }
    };

    let detection = detect(&document, &profiles)?;
    let Some(detection) = detection else {
        return no_pictures(args, &document, remote);
    };
    if let Some(generator) = &detection.generator {
        gallery_info!("detected gallery generator: '{generator}'");
    }
    gallery_info!(
        "profile {:?} found {} pictures",
        detection.profile.name,
        detection.images.len()
    );

    let pacing = effective_pacing(args, detection.profile.pacing);
    let context = retrieval_context(args, &config, base, referer.as_deref(), pacing, progress)?;
    context.validate()?;
    let summary = Coordinator::new(fetcher, &context)
        .retrieve(&detection.images)
        .await;
    Ok(RunReport::Downloaded(summary))
}

fn no_pictures(args: &Args, document: &[u8], remote: bool) -> Result<RunReport> {
    if !remote {
        gallery_warn!("No picture found in the HTML source!");
        return Ok(RunReport::NoPictures { saved_page: None });
    }
    let saved = save_document(&args.output, SAVED_PAGE_NAME, document)?;
    gallery_warn!(
        "No picture found in the HTML source. HTML file saved as {}",
        saved.display()
    );
    Ok(RunReport::NoPictures {
        saved_page: Some(saved),
    })
}

fn retrieval_context(
    args: &Args,
    config: &Configuration,
    base_url: Option<Url>,
    referer: Option<&str>,
    pacing: Pacing,
    progress: Arc<dyn ProgressSink>,
) -> Result<RetrievalContext> {
    let headers = RequestHeaders::new(&config.browser, referer, &args.user, &args.password)
        .context("invalid browser headers in configuration")?;
    Ok(RetrievalContext {
        base_url,
        output_dir: args.output.clone(),
        headers,
        min_wait_ms: pacing.min_wait_ms,
        max_wait_ms: pacing.max_wait_ms,
        parallelism: pacing.parallelism,
        progress,
    })
}

fn parse_base(base: &str) -> Result<Url> {
    match Url::parse(base) {
        Ok(url) if !url.cannot_be_a_base() => Ok(url),
        Ok(_) | Err(url::ParseError::RelativeUrlWithoutBase) => {
            bail!("--base value {base:?} is not an absolute URL")
        }
        Err(err) => Err(err).with_context(|| format!("--base value {base:?} is not a parsable URL")),
    }
}

fn check_pacing_flags(args: &Args) -> Result<()> {
    let parallel = args.parallel.is_some_and(|workers| workers > 1);
    let waits = args.min_wait.is_some_and(|ms| ms > 0) || args.max_wait.is_some_and(|ms| ms > 0);
    if parallel && waits {
        bail!("cannot use parallel download with --min-wait and/or --max-wait at the same time");
    }
    if let (Some(min), Some(max)) = (args.min_wait, args.max_wait) {
        if min > max {
            bail!("--min-wait ({min}) is larger than --max-wait ({max})");
        }
    }
    Ok(())
}

/// Flags win over the detected profile's hints: explicit waits keep a
/// profile from turning on parallel downloads, and a parallel run never waits.
fn effective_pacing(args: &Args, hints: Pacing) -> Pacing {
    let waits = wait_flags(args);
    let wants_waits = waits.is_some_and(|(min, max)| min > 0 || max > 0);
    let parallelism = args
        .parallel
        .map(usize::from)
        .unwrap_or(if wants_waits { 1 } else { hints.parallelism })
        .max(1);
    let (min_wait_ms, max_wait_ms) = if parallelism > 1 {
        (0, 0)
    } else {
        waits.unwrap_or((hints.min_wait_ms, hints.max_wait_ms))
    };
    Pacing {
        min_wait_ms,
        max_wait_ms,
        parallelism,
    }
}

/// Both wait bounds come from the flags as soon as one of them is given. The
/// missing bound is clamped to the given one, which turns pacing off when the
/// default would invert the range.
fn wait_flags(args: &Args) -> Option<(u64, u64)> {
    match (args.min_wait, args.max_wait) {
        (None, None) => None,
        (Some(min), Some(max)) => Some((min, max)),
        (Some(min), None) => Some((min, Pacing::POLITE.max_wait_ms.max(min))),
        (None, Some(max)) => Some((Pacing::POLITE.min_wait_ms.min(max), max)),
    }
}
