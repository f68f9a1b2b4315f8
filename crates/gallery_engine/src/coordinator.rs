use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use futures_util::future::{join, join_all};
use gallery_logging::{gallery_debug, gallery_info, gallery_warn};
use rand::Rng;
use tokio::sync::{mpsc, Mutex};
use url::Url;

use crate::filename::{picture_file_name, unique_name_with};
use crate::headers::{RequestHeaders, Role};
use crate::resolve::resolve;
use crate::{
    EventKind, FetchError, FetchRequest, Fetcher, ProgressEvent, ProgressSink, RetrievalJob,
};

/// Everything a download run needs besides the HTTP client.
pub struct RetrievalContext {
    /// Base for relative picture references.
    pub base_url: Option<Url>,
    pub output_dir: PathBuf,
    pub headers: RequestHeaders,
    pub min_wait_ms: u64,
    pub max_wait_ms: u64,
    pub parallelism: usize,
    pub progress: Arc<dyn ProgressSink>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("parallelism must be at least 1")]
    NoWorkers,
    #[error("wait times cannot be combined with {parallelism} parallel downloads")]
    WaitWithParallel { parallelism: usize },
    #[error("minimum wait {min_ms} ms exceeds maximum wait {max_ms} ms")]
    WaitRange { min_ms: u64, max_ms: u64 },
}

impl RetrievalContext {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.parallelism == 0 {
            return Err(SettingsError::NoWorkers);
        }
        if self.parallelism > 1 && (self.min_wait_ms > 0 || self.max_wait_ms > 0) {
            return Err(SettingsError::WaitWithParallel {
                parallelism: self.parallelism,
            });
        }
        if self.min_wait_ms > self.max_wait_ms {
            return Err(SettingsError::WaitRange {
                min_ms: self.min_wait_ms,
                max_ms: self.max_wait_ms,
            });
        }
        Ok(())
    }

    /// Random pause in `[min, max)`; none unless `max > min`.
    fn pick_wait(&self) -> Duration {
        if self.max_wait_ms == 0 || self.max_wait_ms <= self.min_wait_ms {
            return Duration::ZERO;
        }
        let ms = rand::thread_rng().gen_range(self.min_wait_ms..self.max_wait_ms);
        Duration::from_millis(ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Saved,
    NotSaved,
    Failed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetrievalSummary {
    pub saved: usize,
    pub not_saved: usize,
    pub failed: usize,
}

impl RetrievalSummary {
    pub fn total(&self) -> usize {
        self.saved + self.not_saved + self.failed
    }

    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Saved => self.saved += 1,
            Outcome::NotSaved => self.not_saved += 1,
            Outcome::Failed => self.failed += 1,
        }
    }
}

/// Downloads pictures for one run. Output names handed out during the run
/// are remembered so concurrent workers never pick the same file.
pub struct Coordinator<'a> {
    fetcher: &'a dyn Fetcher,
    context: &'a RetrievalContext,
    claimed: StdMutex<HashSet<PathBuf>>,
}

impl<'a> Coordinator<'a> {
    pub fn new(fetcher: &'a dyn Fetcher, context: &'a RetrievalContext) -> Self {
        Self {
            fetcher,
            context,
            claimed: StdMutex::new(HashSet::new()),
        }
    }

    /// Fetch an HTML page with the html header role.
    pub async fn html(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let request = FetchRequest {
            url: url.clone(),
            headers: self.context.headers.for_request(url, Role::Html),
        };
        self.fetcher.fetch_document(&request).await
    }

    /// Download every reference into the output directory. Returns once each
    /// one has produced its final progress event.
    pub async fn retrieve(&self, references: &[String]) -> RetrievalSummary {
        let total = references.len();
        if total == 0 {
            return RetrievalSummary::default();
        }
        let jobs: Vec<RetrievalJob> = references
            .iter()
            .enumerate()
            .map(|(i, reference)| RetrievalJob {
                index: i + 1,
                total,
                reference: reference.clone(),
            })
            .collect();

        let workers = self.context.parallelism.clamp(1, total);
        gallery_info!("downloading {total} pictures with {workers} worker(s)");
        let summary = if workers == 1 {
            self.sequential(jobs, self.context.parallelism < 2).await
        } else {
            self.parallel(jobs, workers).await
        };
        gallery_info!(
            "downloads done: {} saved, {} empty, {} failed",
            summary.saved,
            summary.not_saved,
            summary.failed
        );
        summary
    }

    /// One job at a time; `paced` allows the random pause after each saved picture.
    async fn sequential(&self, jobs: Vec<RetrievalJob>, paced: bool) -> RetrievalSummary {
        let mut summary = RetrievalSummary::default();
        for job in &jobs {
            summary.record(self.picture(job, paced).await);
        }
        summary
    }

    async fn parallel(&self, jobs: Vec<RetrievalJob>, workers: usize) -> RetrievalSummary {
        let total = jobs.len();
        let (job_tx, job_rx) = mpsc::channel(total);
        for job in jobs {
            if job_tx.send(job).await.is_err() {
                break;
            }
        }
        drop(job_tx);
        let queue = Mutex::new(job_rx);

        let (done_tx, mut done_rx) = mpsc::channel(total);
        let pool: Vec<_> = (1..=workers)
            .map(|id| self.worker(id, &queue, done_tx.clone()))
            .collect();
        drop(done_tx);

        let drain = async move {
            let mut summary = RetrievalSummary::default();
            while summary.total() < total {
                match done_rx.recv().await {
                    Some(outcome) => summary.record(outcome),
                    None => break,
                }
            }
            summary
        };
        let (_, summary) = join(join_all(pool), drain).await;
        summary
    }

    async fn worker(
        &self,
        id: usize,
        queue: &Mutex<mpsc::Receiver<RetrievalJob>>,
        done: mpsc::Sender<Outcome>,
    ) {
        gallery_debug!("worker {id} started");
        loop {
            let next = queue.lock().await.recv().await;
            let Some(job) = next else { break };
            let outcome = self.picture(&job, false).await;
            if done.send(outcome).await.is_err() {
                break;
            }
        }
        gallery_debug!("worker {id} finished");
    }

    async fn picture(&self, job: &RetrievalJob, paced: bool) -> Outcome {
        let context = self.context;
        let url = match resolve(context.base_url.as_ref(), &job.reference) {
            Ok(url) => url,
            Err(err) => {
                gallery_warn!("skipping {:?}: {err}", job.reference);
                self.emit(ProgressEvent::failed(job, job.reference.as_str(), err.into()));
                return Outcome::Failed;
            }
        };
        let name = match picture_file_name(&url) {
            Ok(name) => name,
            Err(err) => {
                gallery_warn!("skipping {url}: {err}");
                self.emit(ProgressEvent::failed(job, url.as_str(), err.into()));
                return Outcome::Failed;
            }
        };

        self.emit(ProgressEvent::new(job, url.as_str(), EventKind::Start));
        let output = self.claim(&context.output_dir.join(name));
        let request = FetchRequest {
            headers: context.headers.for_request(&url, Role::Picture),
            url,
        };

        match self.fetcher.fetch_to_file(&request, &output).await {
            Err(err) => {
                gallery_warn!("download of {} failed: {err}", request.url);
                remove_leftover(&output).await;
                self.emit(ProgressEvent::failed(job, request.url.as_str(), err.into()));
                Outcome::Failed
            }
            Ok(0) => {
                gallery_debug!("{} returned an empty body", request.url);
                remove_leftover(&output).await;
                self.emit(ProgressEvent::new(job, request.url.as_str(), EventKind::NotSaved));
                Outcome::NotSaved
            }
            Ok(bytes) => {
                let wait = if paced { context.pick_wait() } else { Duration::ZERO };
                let mut event = ProgressEvent::new(job, request.url.as_str(), EventKind::Finished);
                event.bytes_written = bytes;
                event.wait_ms = wait.as_millis() as u64;
                self.emit(event);
                if !wait.is_zero() {
                    tokio::time::sleep(wait).await;
                }
                Outcome::Saved
            }
        }
    }

    fn claim(&self, path: &Path) -> PathBuf {
        let mut claimed = self.claimed.lock().unwrap_or_else(PoisonError::into_inner);
        let name = unique_name_with(path, |candidate| {
            claimed.contains(candidate) || candidate.exists()
        });
        claimed.insert(name.clone());
        name
    }

    fn emit(&self, event: ProgressEvent) {
        self.context.progress.emit(event);
    }
}

async fn remove_leftover(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => gallery_warn!("cannot remove {}: {err}", path.display()),
    }
}
