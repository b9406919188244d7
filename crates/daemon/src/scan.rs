//! Scanner module for discovering video files already present in the
//! watch directory at startup.
//!
//! Files written while the daemon was not running never produce a
//! filesystem event, so the watcher alone would miss them. One sweep at
//! startup closes that gap; afterwards the watcher is the only source of
//! new paths.

use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Input container extensions accepted by the pipeline (case-insensitive
/// matching). Every path entering the job queue matches this set.
pub const INPUT_EXTENSIONS: &[&str] = &[".mkv", ".avi", ".mov", ".ts", ".m2ts"];

/// Checks if a file has an accepted input extension (case-insensitive).
pub fn is_candidate_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext_lower = format!(".{}", ext.to_lowercase());
            INPUT_EXTENSIONS.contains(&ext_lower.as_str())
        })
        .unwrap_or(false)
}

/// Scans the watch directory for candidate files already present.
///
/// The sweep is deliberately non-recursive (depth 1): the watch
/// subscription itself is non-recursive, and the two discovery paths must
/// agree on which files are eligible. Any I/O error aborts the scan; the
/// caller logs it and continues without the sweep.
pub fn scan_watch_dir(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry?;

        if !entry.file_type().is_file() {
            continue;
        }

        if is_candidate_file(entry.path()) {
            found.push(entry.into_path());
        }
    }

    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::fs::{self, File};
    use tempfile::TempDir;

    #[test]
    fn test_input_extensions_defined() {
        assert!(INPUT_EXTENSIONS.contains(&".mkv"));
        assert!(INPUT_EXTENSIONS.contains(&".avi"));
        assert!(INPUT_EXTENSIONS.contains(&".mov"));
        assert!(INPUT_EXTENSIONS.contains(&".ts"));
        assert!(INPUT_EXTENSIONS.contains(&".m2ts"));
        assert_eq!(INPUT_EXTENSIONS.len(), 5);
    }

    #[test]
    fn test_is_candidate_file() {
        assert!(is_candidate_file(Path::new("/media/movie.mkv")));
        assert!(is_candidate_file(Path::new("/media/movie.MKV"))); // case-insensitive
        assert!(is_candidate_file(Path::new("/media/movie.M2ts")));
        assert!(!is_candidate_file(Path::new("/media/movie.mp4"))); // already the target container
        assert!(!is_candidate_file(Path::new("/media/movie.txt")));
        assert!(!is_candidate_file(Path::new("/media/movie"))); // no extension
        assert!(!is_candidate_file(Path::new("/media/.mkv"))); // hidden file, no stem
    }

    // *For any* file path, the scanner admits it if and only if its
    // extension (case-insensitive) is one of the accepted input containers.
    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_extension_filtering(
            basename in "[a-zA-Z0-9_-]{1,20}",
            ext in prop_oneof![
                // Accepted inputs
                Just("mkv"), Just("MKV"), Just("Mkv"),
                Just("avi"), Just("AVI"),
                Just("mov"), Just("MOV"),
                Just("ts"), Just("TS"),
                Just("m2ts"), Just("M2TS"),
                // Rejected
                Just("mp4"), Just("txt"), Just("jpg"), Just("srt"),
                Just("nfo"), Just("part"), Just("tmp"),
            ],
        ) {
            let path = PathBuf::from(format!("/media/{}.{}", basename, ext));
            let admitted = is_candidate_file(&path);

            let ext_lower = ext.to_lowercase();
            let expected = matches!(
                ext_lower.as_str(),
                "mkv" | "avi" | "mov" | "ts" | "m2ts"
            );

            prop_assert_eq!(
                admitted, expected,
                "Extension '{}' admitted={} but expected {}",
                ext, admitted, expected
            );
        }
    }

    #[test]
    fn test_scan_finds_candidates_only() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        let wanted = root.join("episode.mkv");
        File::create(&wanted).unwrap();
        File::create(root.join("notes.txt")).unwrap();
        File::create(root.join("clip.mp4")).unwrap();

        let found = scan_watch_dir(root).expect("scan should succeed");
        assert_eq!(found, vec![wanted]);
    }

    #[test]
    fn test_scan_is_not_recursive() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        let top = root.join("top.mkv");
        File::create(&top).unwrap();

        let nested_dir = root.join("season1");
        fs::create_dir(&nested_dir).unwrap();
        File::create(nested_dir.join("nested.mkv")).unwrap();

        let found = scan_watch_dir(root).expect("scan should succeed");
        assert_eq!(found, vec![top]);
    }

    #[test]
    fn test_scan_skips_directories_with_video_names() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        // A directory whose name happens to end in .mkv is not a job.
        fs::create_dir(root.join("weird.mkv")).unwrap();

        let found = scan_watch_dir(root).expect("scan should succeed");
        assert!(found.is_empty());
    }

    #[test]
    fn test_scan_missing_dir_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let gone = temp_dir.path().join("does-not-exist");

        assert!(scan_watch_dir(&gone).is_err());
    }
}
