//! Metalink (meta4) manifest fetching and parsing
//!
//! Every region links to a meta4 manifest listing its LIDAR tiles. Manifests
//! are downloaded with a bounded number of requests in flight but consumed
//! strictly in region order, so the first manifest listing a file name is the
//! one whose entry is kept.

use std::collections::HashSet;

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, info, warn};

use crate::app::client::Fetch;
use crate::app::models::{Region, TileFile};
use crate::app::xml::{parse_document, XmlElement};
use crate::constants::{limits, METALINK_NAMESPACE};
use crate::errors::{ManifestError, ManifestResult};

/// Hash algorithm recorded when a manifest omits it
pub const UNKNOWN_HASH_TYPE: &str = "unknown";

/// Options for the manifest stage
#[derive(Debug, Clone)]
pub struct Meta4Options {
    /// Log per-region progress at info level
    pub debug: bool,
    /// Manifest requests kept in flight
    pub concurrency: usize,
}

impl Default for Meta4Options {
    fn default() -> Self {
        Self {
            debug: false,
            concurrency: limits::DEFAULT_FETCH_CONCURRENCY,
        }
    }
}

impl Meta4Options {
    fn effective_concurrency(&self) -> usize {
        self.concurrency.clamp(1, limits::MAX_FETCH_CONCURRENCY)
    }
}

/// Counters for one manifest run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Meta4Stats {
    /// Regions whose manifest was parsed
    pub regions_processed: usize,
    /// Regions without a manifest link
    pub regions_skipped: usize,
    /// `file` entries encountered
    pub entries_seen: usize,
    /// Entries without a name attribute
    pub unnamed_entries: usize,
    /// Entries whose name was already seen
    pub duplicates_skipped: usize,
    /// Entries missing size, URL or hash
    pub incomplete_dropped: usize,
    /// Tile files emitted
    pub files_emitted: usize,
}

/// One `file` entry as it appears in a manifest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Meta4Entry {
    /// `name` attribute
    pub name: Option<String>,
    /// Text of the first `size` child
    pub size: Option<String>,
    /// Text of the first `url` child
    pub url: Option<String>,
    /// Text of the first `hash` child
    pub hash_value: Option<String>,
    /// `type` attribute of the first `hash` child
    pub hash_type: Option<String>,
}

impl Meta4Entry {
    fn from_element(file: &XmlElement) -> Self {
        let hash = file.child("hash");
        Self {
            name: file.attribute("name").map(str::to_string),
            size: file.child_text("size").map(|s| s.trim().to_string()),
            url: file.child_text("url").map(|s| s.trim().to_string()),
            hash_value: hash.map(|h| h.text.trim().to_string()),
            hash_type: hash.and_then(|h| h.attribute("type")).map(str::to_string),
        }
    }
}

/// Parse the `file` entries of a meta4 document, in document order
///
/// # Errors
///
/// Returns `ManifestError` for malformed XML or an empty document
pub fn parse_meta4(content: &[u8], source: &str) -> ManifestResult<Vec<Meta4Entry>> {
    let root = parse_document::<ManifestError>(content, METALINK_NAMESPACE)?.ok_or_else(|| {
        ManifestError::EmptyDocument {
            url: source.to_string(),
        }
    })?;
    Ok(root
        .children_named("file")
        .map(Meta4Entry::from_element)
        .collect())
}

/// Accumulates tile files across manifests, first file name wins
#[derive(Debug, Default)]
pub struct TileCollector {
    seen: HashSet<String>,
    files: Vec<TileFile>,
    stats: Meta4Stats,
}

impl TileCollector {
    /// Create an empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse one manifest and add its new, complete entries
    ///
    /// Returns the number of files added.
    ///
    /// # Errors
    ///
    /// Returns `ManifestError` for malformed XML or a non-numeric size
    pub fn ingest(&mut self, region: &Region, content: &[u8]) -> ManifestResult<usize> {
        let source = region.metalink().unwrap_or(region.name.as_str());
        let entries = parse_meta4(content, source)?;
        let before = self.files.len();

        for entry in entries {
            self.add_entry(region, entry)?;
        }

        self.stats.regions_processed += 1;
        Ok(self.files.len() - before)
    }

    fn add_entry(&mut self, region: &Region, entry: Meta4Entry) -> ManifestResult<()> {
        self.stats.entries_seen += 1;

        let Some(file_name) = entry.name.filter(|name| !name.is_empty()) else {
            self.stats.unnamed_entries += 1;
            return Ok(());
        };
        // The name counts as seen even if the entry turns out incomplete
        if !self.seen.insert(file_name.clone()) {
            self.stats.duplicates_skipped += 1;
            return Ok(());
        }

        let file_size = match entry.size.as_deref().filter(|s| !s.is_empty()) {
            Some(size) => size.parse::<u64>().map_err(|_| ManifestError::InvalidValue {
                file_name: file_name.clone(),
                field: "size".to_string(),
                value: size.to_string(),
            })?,
            None => 0,
        };
        let download_url = entry.url.unwrap_or_default();
        let hash_value = entry.hash_value.unwrap_or_default();

        if file_size == 0 || download_url.is_empty() || hash_value.is_empty() {
            warn!(
                "Skipping file {} from region {}: missing size, URL or hash",
                file_name, region.name
            );
            self.stats.incomplete_dropped += 1;
            return Ok(());
        }

        let hash_type = entry
            .hash_type
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| UNKNOWN_HASH_TYPE.to_string());

        self.files.push(TileFile {
            file_name,
            file_size,
            hash_type,
            hash_value,
            download_url,
        });
        self.stats.files_emitted += 1;
        Ok(())
    }

    fn skip_region(&mut self) {
        self.stats.regions_skipped += 1;
    }

    /// Statistics so far
    pub fn stats(&self) -> &Meta4Stats {
        &self.stats
    }

    /// Consume the collector, returning files and statistics
    pub fn finish(self) -> (Vec<TileFile>, Meta4Stats) {
        (self.files, self.stats)
    }
}

/// Fetch and parse the manifest of every region
///
/// Regions without a manifest link are skipped. The first failed request, in
/// region order, aborts the run.
///
/// # Errors
///
/// Returns `ManifestError::Fetch` wrapping the transport failure, or a parse
/// error from a malformed manifest
pub async fn collect_tile_files<F: Fetch>(
    regions: &[Region],
    fetcher: &F,
    options: &Meta4Options,
) -> ManifestResult<(Vec<TileFile>, Meta4Stats)> {
    let total = regions.len();
    let concurrency = options.effective_concurrency();
    info!(
        "Fetching manifests for {} regions ({} in flight)",
        total, concurrency
    );

    let mut manifests = stream::iter(regions.iter().enumerate())
        .map(move |(index, region)| async move {
            let body = match region.metalink() {
                Some(url) => Some(fetcher.fetch(url).await.map_err(|source| {
                    ManifestError::Fetch {
                        url: url.to_string(),
                        source,
                    }
                })?),
                None => None,
            };
            Ok::<_, ManifestError>((index, region, body))
        })
        .buffered(concurrency);

    let mut collector = TileCollector::new();
    while let Some((index, region, body)) = manifests.try_next().await? {
        let position = index + 1;
        match body {
            None => {
                report(
                    options.debug,
                    format_args!(
                        "Skipping region {} of {} ({}), because no metalink was found",
                        position, total, region.name
                    ),
                );
                collector.skip_region();
            }
            Some(body) => {
                report(
                    options.debug,
                    format_args!("Parsing region {} of {} ({})", position, total, region.name),
                );
                let added = collector.ingest(region, &body)?;
                debug!("Region {} contributed {} files", region.name, added);
            }
        }
    }

    let (files, stats) = collector.finish();
    info!(
        "Collected {} tile files from {} manifests ({} duplicates, {} incomplete)",
        files.len(),
        stats.regions_processed,
        stats.duplicates_skipped,
        stats.incomplete_dropped
    );
    Ok((files, stats))
}

fn report(verbose: bool, message: std::fmt::Arguments<'_>) {
    if verbose {
        info!("{}", message);
    } else {
        debug!("{}", message);
    }
}
