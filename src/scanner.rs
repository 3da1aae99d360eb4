//! The fetch-and-extract engine.
//!
//! A scan takes a set of [`SiteDescriptor`]s, primes one [`QueryTask`] per
//! (site, phrase), and runs each site's tasks through the throttled limiter.
//! Sites run concurrently with each other; each site is throttled on its own.
//!
//! For every task:
//! 1. fetch the query URL (with a per-request timeout)
//! 2. read the count, or the explicit zero, or give up with `"-1"`
//! 3. extract result records, drop ignored ones, then drop known not-typos
//!
//! A failing query never fails the scan. Completed scans are cached by
//! request until the cache is flushed.

use crate::cache::ScanCache;
use crate::error::{FetchError, ScanError};
use crate::extract::{CountMatch, RegexExtractor, ResultExtractor, enrich};
use crate::fetch::{FetchedPage, PageFetcher};
use crate::limiter::{TaskError, Throttle, run_throttled};
use crate::models::{
    FAILED_SEARCH, NO_RESULTS, QueryOutcome, QueryResult, QueryTask, ScanReport, SiteDescriptor,
    SiteScan,
};
use crate::not_typo::{IgnoreFilter, NotTypoFilter};
use crate::query::prime_site;
use crate::utils::truncate_for_log;
use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Engine tunables that do not change what a scan means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSettings {
    pub throttle: Throttle,
    pub request_timeout: Duration,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            throttle: Throttle::new(2, Duration::from_millis(500)),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Everything that determines a scan's output. Serialized, it is the cache key.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScanRequest {
    pub sites: Vec<SiteDescriptor>,
    /// Address used to build per-result notification links.
    pub notify: Option<String>,
}

/// A site with its patterns compiled and its tasks primed.
struct PreparedSite {
    descriptor: SiteDescriptor,
    extractor: Box<dyn ResultExtractor + Send + Sync>,
    not_typos: NotTypoFilter,
    ignore: IgnoreFilter,
    tasks: Vec<QueryTask>,
}

impl PreparedSite {
    fn new(site: &SiteDescriptor) -> Result<Self, ScanError> {
        let extractor = RegexExtractor::from_site(site)?;
        let not_typos = NotTypoFilter::compile(&site.not_typos).map_err(|source| ScanError::Pattern {
            site: site.name.clone(),
            field: "not_typos",
            source,
        })?;
        let ignore = IgnoreFilter::compile(&site.name, &site.ignore)?;
        Ok(Self {
            descriptor: site.clone(),
            extractor: Box::new(extractor),
            not_typos,
            ignore,
            tasks: prime_site(site),
        })
    }
}

/// Runs scans against a [`PageFetcher`].
pub struct Scanner<F> {
    fetcher: F,
    settings: ScanSettings,
    cache: ScanCache,
    cancel: CancellationToken,
}

impl<F: PageFetcher> Scanner<F> {
    pub fn new(fetcher: F, settings: ScanSettings) -> Self {
        Self {
            fetcher,
            settings,
            cache: ScanCache::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Token that cancels in-flight scans when fired.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cache(&self) -> &ScanCache {
        &self.cache
    }

    /// Scan every site in the request, or return the cached scan for an
    /// identical earlier request.
    ///
    /// Only pattern compilation can fail this call. Cancelled scans are
    /// returned but not cached.
    #[instrument(level = "info", skip_all, fields(sites = request.sites.len()))]
    pub async fn scan(&self, request: &ScanRequest) -> Result<Arc<ScanReport>, ScanError> {
        let key = ScanCache::key_for(request)?;
        if let Some(hit) = self.cache.get(&key).await {
            info!("Returning cached scan");
            return Ok(hit);
        }

        let prepared = request
            .sites
            .iter()
            .map(PreparedSite::new)
            .collect::<Result<Vec<_>, _>>()?;

        let scanned_at = Utc::now().to_rfc3339();
        let t0 = Instant::now();
        let notify = request.notify.as_deref();
        let sites = join_all(prepared.iter().map(|site| self.scan_site(site, notify))).await;
        let duration_millis = t0.elapsed().as_millis() as u64;

        let report = ScanReport {
            scanned_at,
            duration_millis,
            sites,
        };
        info!(duration_millis, "Scan complete");

        if self.cancel.is_cancelled() {
            warn!("Scan was cancelled; not caching partial results");
            return Ok(Arc::new(report));
        }
        Ok(self.cache.insert(key, report).await)
    }

    #[instrument(level = "info", skip_all, fields(site = %site.descriptor.name, phrases = site.tasks.len()))]
    async fn scan_site(&self, site: &PreparedSite, notify: Option<&str>) -> SiteScan {
        let t0 = Instant::now();
        let jobs: Vec<_> = site
            .tasks
            .iter()
            .map(|task| move || self.run_query(site, task, notify))
            .collect();

        let outcomes = run_throttled(jobs, self.settings.throttle, &self.cancel).await;

        let results: Vec<QueryResult> = site
            .tasks
            .iter()
            .zip(outcomes)
            .map(|(task, outcome)| match outcome {
                Ok(result) => result,
                Err(TaskError::Failed(FetchError::TimedOut(_))) => {
                    QueryResult::failed(task, QueryOutcome::TimedOut)
                }
                Err(TaskError::Failed(FetchError::Request(e))) if e.is_timeout() => {
                    QueryResult::failed(task, QueryOutcome::TimedOut)
                }
                Err(TaskError::Failed(FetchError::Request(_))) => {
                    QueryResult::failed(task, QueryOutcome::FetchFailed)
                }
                Err(TaskError::Cancelled) => QueryResult::failed(task, QueryOutcome::Cancelled),
            })
            .collect();

        let search_duration_millis = t0.elapsed().as_millis() as u64;
        let failed = results.iter().filter(|r| r.result == FAILED_SEARCH).count();
        info!(search_duration_millis, queries = results.len(), failed, "Site scan complete");

        SiteScan {
            name: site.descriptor.name.clone(),
            border_color: site.descriptor.border_color.clone(),
            search_duration_millis,
            results,
        }
    }

    async fn run_query(
        &self,
        site: &PreparedSite,
        task: &QueryTask,
        notify: Option<&str>,
    ) -> Result<QueryResult, FetchError> {
        let timeout = self.settings.request_timeout;
        let page = match tokio::time::timeout(timeout, self.fetcher.fetch(&task.query)).await {
            Ok(res) => res?,
            Err(_) => return Err(FetchError::TimedOut(timeout)),
        };
        Ok(read_page(site, task, page, notify))
    }
}

/// Turn a fetched page into a [`QueryResult`].
fn read_page(
    site: &PreparedSite,
    task: &QueryTask,
    page: FetchedPage,
    notify: Option<&str>,
) -> QueryResult {
    let extraction = site.extractor.extract(&page.body);

    let (result, outcome) = match extraction.count {
        CountMatch::Count(n) => (n, QueryOutcome::Counted),
        CountMatch::NoResults => (NO_RESULTS.to_string(), QueryOutcome::NoResults),
        CountMatch::Unparsed => {
            warn!(
                site = %task.site,
                phrase = %task.phrase,
                status = page.status,
                preview = %truncate_for_log(&page.body, 200),
                "Neither count nor no-results pattern matched"
            );
            (FAILED_SEARCH.to_string(), QueryOutcome::Unparsed)
        }
    };

    let base_url = site.descriptor.base_url.as_deref();
    let records = extraction
        .records
        .into_iter()
        .map(|raw| enrich(raw, base_url, &task.phrase, notify))
        .collect();
    let (records, ignored_count) = site.ignore.apply(records);
    let (records, not_typo_count) = site.not_typos.apply(&task.phrase, records);

    debug!(
        phrase = %task.phrase,
        status = page.status,
        %result,
        records = records.len(),
        ignored_count,
        not_typo_count,
        "Query read"
    );

    QueryResult {
        phrase: task.phrase.clone(),
        query: task.query.clone(),
        status: Some(page.status),
        duration_millis: Some(page.elapsed.as_millis() as u64),
        result,
        outcome,
        results: records,
        ignored_count,
        not_typo_count,
    }
}
