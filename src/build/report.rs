// src/build/report.rs

use std::path::{Path, PathBuf};

use crate::build::DependencySet;
use crate::watch::{dedup_paths, normalize_path};

/// Number of header lines the optimizer prints before the file list:
/// a blank line, the output file, and a `----` separator.
const REPORT_HEADER_LINES: usize = 3;

/// Turn an optimizer build report into a dependency set.
///
/// Every non-empty line after the header names one consumed file. Paths are
/// made absolute against `base` and normalised so watch registration can
/// compare them by identity.
pub fn parse_build_report(report: &str, base: &Path) -> DependencySet {
    let files = report
        .split('\n')
        .enumerate()
        .filter(|(index, line)| *index >= REPORT_HEADER_LINES && !line.trim().is_empty())
        .map(|(_, line)| normalize_path(base, &PathBuf::from(line.trim())));

    dedup_paths(files)
}
