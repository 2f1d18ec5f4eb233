//! Retention cleanup for rendered digests.
//!
//! A digest's age comes from the timestamp prefix of its file name. Anything
//! that does not parse is left alone.

use anyhow::{anyhow, Context, Result};
use chrono::{Duration, NaiveDateTime};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::digest::{DIGEST_SUFFIX, FILENAME_TIMESTAMP_FORMAT};
use crate::TARGET_ARCHIVE;

const TIMESTAMP_PREFIX_LEN: usize = 13;

/// Parses the creation time embedded in a digest file name, e.g. `20250106_0905_news.html`.
pub fn digest_timestamp(file_name: &str) -> Option<NaiveDateTime> {
    let stem = file_name.strip_suffix(DIGEST_SUFFIX)?;
    let prefix = stem.get(..TIMESTAMP_PREFIX_LEN)?;
    if stem.len() != TIMESTAMP_PREFIX_LEN {
        return None;
    }
    NaiveDateTime::parse_from_str(prefix, FILENAME_TIMESTAMP_FORMAT).ok()
}

/// Deletes digests older than `retention_days` relative to `now`. Returns how many were removed.
///
/// A missing directory means nothing to clean. A directory entry that cannot be
/// read, or a file that cannot be deleted, is logged and skipped. A window that
/// is not positive or does not fit a date is an error and deletes nothing.
pub fn cleanup_old_digests(dir: &Path, retention_days: i64, now: NaiveDateTime) -> Result<usize> {
    if retention_days <= 0 {
        return Err(anyhow!("Retention window must be positive, got {} days", retention_days));
    }
    let cutoff = Duration::try_days(retention_days)
        .and_then(|window| now.checked_sub_signed(window))
        .ok_or_else(|| anyhow!("Retention window of {} days is out of range", retention_days))?;

    if !dir.exists() {
        debug!(target: TARGET_ARCHIVE, "{} does not exist, nothing to archive", dir.display());
        return Ok(0);
    }

    let mut removed = 0;

    for entry in fs::read_dir(dir).with_context(|| format!("Failed to list {}", dir.display()))? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(target: TARGET_ARCHIVE, "Skipping unreadable entry in {}: {}", dir.display(), e);
                continue;
            }
        };
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        if !file_name.ends_with(DIGEST_SUFFIX) {
            continue;
        }

        let Some(created) = digest_timestamp(file_name) else {
            debug!(target: TARGET_ARCHIVE, "Keeping {}: no parseable timestamp", file_name);
            continue;
        };

        if created < cutoff {
            match fs::remove_file(&path) {
                Ok(()) => {
                    info!(target: TARGET_ARCHIVE, "Deleted old digest {}", file_name);
                    removed += 1;
                }
                Err(e) => warn!(target: TARGET_ARCHIVE, "Failed to delete {}: {}", path.display(), e),
            }
        }
    }

    info!(target: TARGET_ARCHIVE, "Archive cleanup removed {} digests older than {} days", removed, retention_days);
    Ok(removed)
}
