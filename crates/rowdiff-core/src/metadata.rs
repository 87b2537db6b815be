//! Rename and stat metadata supplied alongside diff text

use crate::model::{ChangeKind, DiffModel, DiffStat};
use rustc_hash::FxHashMap;

/// Status of a file as reported by `--name-status`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Modified,
    Added,
    Deleted,
    Renamed,
    Copied,
}

/// One `--name-status` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    pub path: String,
    pub status: FileStatus,
    /// For renamed or copied files, the original path
    pub old_path: Option<String>,
}

/// Parse `git diff --name-status` output
pub fn parse_name_status(output: &str) -> Vec<FileMetadata> {
    let mut entries = Vec::new();
    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split('\t').collect();
        let status_char = parts[0].chars().next().unwrap_or(' ');
        let status = match status_char {
            'M' | 'T' => FileStatus::Modified,
            'A' => FileStatus::Added,
            'D' => FileStatus::Deleted,
            'R' => FileStatus::Renamed,
            'C' => FileStatus::Copied,
            _ => continue,
        };

        let Some(path) = parts.last().filter(|_| parts.len() >= 2) else {
            continue;
        };
        let old_path = match status {
            FileStatus::Renamed | FileStatus::Copied if parts.len() >= 3 => {
                Some(parts[1].to_string())
            }
            _ => None,
        };

        entries.push(FileMetadata {
            path: path.to_string(),
            status,
            old_path,
        });
    }
    entries
}

/// Stat for one `--numstat` entry; `None` counts mean a binary file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumstatEntry {
    pub path: String,
    pub old_path: Option<String>,
    pub stat: Option<DiffStat>,
}

/// Parse `git diff --numstat` output
pub fn parse_numstat(output: &str) -> Vec<NumstatEntry> {
    let mut entries = Vec::new();
    for line in output.lines() {
        let mut parts = line.splitn(3, '\t');
        let (Some(adds), Some(dels), Some(path)) = (parts.next(), parts.next(), parts.next())
        else {
            continue;
        };
        let stat = match (adds.trim().parse::<usize>(), dels.trim().parse::<usize>()) {
            (Ok(insertions), Ok(deletions)) => Some(DiffStat {
                insertions,
                deletions,
            }),
            _ if adds.trim() == "-" && dels.trim() == "-" => None,
            _ => continue,
        };
        let (path, old_path) = split_rename_path(path.trim());
        entries.push(NumstatEntry {
            path,
            old_path,
            stat,
        });
    }
    entries
}

/// Expand numstat rename forms `old => new` and `dir/{old => new}/file`
fn split_rename_path(path: &str) -> (String, Option<String>) {
    if let (Some(open), Some(close)) = (path.find('{'), path.find('}')) {
        if open < close {
            if let Some((old, new)) = path[open + 1..close].split_once(" => ") {
                let prefix = &path[..open];
                let suffix = &path[close + 1..];
                let join = |mid: &str| {
                    let joined = format!("{prefix}{mid}{suffix}");
                    joined.replace("//", "/")
                };
                return (join(new), Some(join(old)));
            }
        }
    }
    match path.split_once(" => ") {
        Some((old, new)) => (new.to_string(), Some(old.to_string())),
        None => (path.to_string(), None),
    }
}

impl DiffModel {
    /// Attach rename sources and reported stats that the diff text itself lacks
    pub fn apply_metadata(&mut self, names: &[FileMetadata], stats: &[NumstatEntry]) {
        let sources: FxHashMap<&str, (&str, FileStatus)> = names
            .iter()
            .filter_map(|m| m.old_path.as_deref().map(|old| (m.path.as_str(), (old, m.status))))
            .collect();
        let stats: FxHashMap<&str, &NumstatEntry> =
            stats.iter().map(|e| (e.path.as_str(), e)).collect();

        for file in self.files_mut() {
            let added_or_deleted = matches!(file.change_kind, ChangeKind::New | ChangeKind::Deleted);
            if file.prev_name.is_none() && !added_or_deleted {
                if let Some((old, status)) =
                    sources.get(file.name.as_str()).filter(|(old, _)| *old != file.name)
                {
                    file.prev_name = Some((*old).to_string());
                    // A copy leaves its source in place, so it is not a rename
                    if *status != FileStatus::Copied {
                        file.change_kind = ChangeKind::derive(
                            &file.name,
                            file.prev_name.as_deref(),
                            false,
                            false,
                            !file.hunks.is_empty(),
                        );
                    }
                }
            }
            if let Some(entry) = stats.get(file.name.as_str()) {
                match entry.stat {
                    Some(stat) => file.reported_stat = Some(stat),
                    None => file.binary = true,
                }
            }
        }
    }
}
