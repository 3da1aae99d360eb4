//! Writing scan results to disk.
//!
//! # Submodules
//!
//! - [`json`]: scan reports and chart data as JSON
//! - [`markdown`]: typo digests and idiom tables for reading
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! └── 2026-10-19/
//!     ├── 070509_typos.json
//!     ├── 070509_typos.csv
//!     ├── 070509_typos.md
//!     ├── 071200_idioms.json
//!     ├── 071200_idioms_chart.json
//!     └── 071200_idioms.md
//! ```

use std::error::Error;
use tokio::fs;
use tracing::{error, info, instrument};

pub mod json;
pub mod markdown;

/// Write `contents` to `{output_dir}/{date}/{file_name}`.
///
/// # Arguments
///
/// * `output_dir` - Base directory for all outputs
/// * `date` - Date directory name, e.g. `2026-10-19`
/// * `file_name` - File name inside the date directory
/// * `contents` - Text to write; an existing file is replaced
///
/// # Returns
///
/// The path written.
///
/// # Errors
///
/// Returns an error if the date directory cannot be created or the file
/// cannot be written.
#[instrument(level = "info", skip(contents))]
pub async fn write_dated(
    output_dir: &str,
    date: &str,
    file_name: &str,
    contents: &str,
) -> Result<String, Box<dyn Error>> {
    let dir = format!("{}/{}", output_dir.trim_end_matches('/'), date);
    if let Err(e) = fs::create_dir_all(&dir).await {
        error!(%dir, error = %e, "Failed to create output dir");
        return Err(e.into());
    }

    let path = format!("{dir}/{file_name}");
    fs::write(&path, contents).await?;
    info!(%path, bytes = contents.len(), "Wrote output file");
    Ok(path)
}
