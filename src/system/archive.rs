use crate::models::UpdaterConfig;
use crate::utils::error::{Result, UpdaterError};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

/// Inspection view of one archive entry.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub name: String,
    pub is_dir: bool,
}

/// Decides whether a single common root folder should be stripped during
/// extraction.
///
/// Release archives from common packaging flows wrap everything in one
/// versioned or branded folder that should not become part of the installed
/// layout. Stripping applies only when exactly one distinct top-level name
/// is seen across all file entries AND `looks_like_app_root` accepts it, so
/// intentionally multi-rooted archives are never collapsed.
pub fn detect_root_folder(
    entries: &[ArchiveEntry],
    looks_like_app_root: impl Fn(&str) -> bool,
) -> Option<String> {
    let mut folder_counts: BTreeMap<String, usize> = BTreeMap::new();

    for entry in entries {
        // Folders are counted through the files they contain, not through
        // their own directory entries.
        if entry.is_dir {
            continue;
        }
        let trimmed = entry.name.trim_matches('/');
        let Some(first) = trimmed.split('/').next() else {
            continue;
        };
        if !first.is_empty() {
            *folder_counts.entry(first.to_string()).or_default() += 1;
        }
    }

    debug!(roots = folder_counts.len(), "archive root analysis");

    if folder_counts.len() != 1 {
        return None;
    }
    let root = folder_counts.into_keys().next()?;
    if looks_like_app_root(&root) {
        Some(root)
    } else {
        None
    }
}

/// Default heuristic: the folder name contains the product name or the
/// literal word "app", case-insensitively.
pub fn default_app_root_predicate(product_name: &str) -> impl Fn(&str) -> bool {
    let product = product_name.to_lowercase();
    move |name: &str| {
        let lower = name.to_lowercase();
        (!product.is_empty() && lower.contains(&product)) || lower.contains("app")
    }
}

/// Streams the ZIP archive's entries onto disk under `dest`, applying the
/// root-strip decision computed once per archive.
///
/// The first unrecoverable I/O error fails the extraction, leaving it
/// partially applied; the orchestrator rolls back in that case.
pub fn extract(archive_path: &Path, dest: &Path, config: &UpdaterConfig) -> Result<()> {
    let fail = |reason: String| UpdaterError::ExtractFailed {
        path: archive_path.to_path_buf(),
        reason,
    };

    let file = File::open(archive_path).map_err(|e| fail(e.to_string()))?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| fail(e.to_string()))?;

    let entries: Vec<ArchiveEntry> = archive
        .file_names()
        .map(|name| ArchiveEntry {
            is_dir: name.ends_with('/'),
            name: name.to_string(),
        })
        .collect();
    let root = detect_root_folder(&entries, default_app_root_predicate(&config.product_name));
    match &root {
        Some(root) => info!(%root, "stripping archive root folder"),
        None => debug!("keeping archive structure as-is"),
    }

    for idx in 0..archive.len() {
        let mut entry = archive.by_index(idx).map_err(|e| fail(e.to_string()))?;
        let name = entry.name().to_string();

        let relative = match &root {
            Some(root) => name
                .strip_prefix(root.as_str())
                .and_then(|rest| rest.strip_prefix('/'))
                .unwrap_or(name.as_str()),
            None => name.as_str(),
        };
        if relative.is_empty() {
            // The wrapper directory itself.
            continue;
        }

        let Some(dest_path) = sanitize_extract_path(dest, Path::new(relative)) else {
            return Err(fail(format!("unsafe entry path: {}", name)));
        };
        if dest_path == dest {
            continue;
        }
        if let Some(root) = &root {
            // Leftover of the now-removed wrapper directory.
            let is_wrapper = dest_path
                .file_name()
                .map(|n| n.to_string_lossy() == *root)
                .unwrap_or(false);
            if is_wrapper {
                continue;
            }
        }

        if entry.is_dir() {
            fs::create_dir_all(&dest_path).map_err(|e| fail(e.to_string()))?;
            #[cfg(unix)]
            if let Some(mode) = entry.unix_mode() {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(&dest_path, fs::Permissions::from_mode(mode))
                    .map_err(|e| fail(e.to_string()))?;
            }
            continue;
        }

        if let Some(parent) = dest_path.parent() {
            fs::create_dir_all(parent).map_err(|e| fail(e.to_string()))?;
        }
        let mut out = File::create(&dest_path).map_err(|e| fail(e.to_string()))?;
        io::copy(&mut entry, &mut out).map_err(|e| fail(e.to_string()))?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&dest_path, fs::Permissions::from_mode(mode))
                .map_err(|e| fail(e.to_string()))?;
        }
    }

    Ok(())
}

fn sanitize_extract_path(dest_root: &Path, raw_path: &Path) -> Option<PathBuf> {
    let mut clean = PathBuf::new();
    for comp in raw_path.components() {
        match comp {
            Component::Normal(v) => clean.push(v),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    let out = dest_root.join(clean);
    if out.starts_with(dest_root) {
        Some(out)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;
    use zip::write::SimpleFileOptions;
    use zip::{CompressionMethod, ZipWriter};

    fn entry(name: &str) -> ArchiveEntry {
        ArchiveEntry {
            name: name.to_string(),
            is_dir: name.ends_with('/'),
        }
    }

    fn lumen_predicate() -> impl Fn(&str) -> bool {
        default_app_root_predicate("LumenTV")
    }

    fn write_test_zip(path: &Path, files: &[(&str, &[u8])]) {
        let file = File::create(path).expect("create zip");
        let mut writer = ZipWriter::new(file);
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Stored)
            .unix_permissions(0o644);
        for (name, content) in files {
            if name.ends_with('/') {
                writer.add_directory(*name, options).expect("add dir");
            } else {
                writer.start_file(*name, options).expect("start file");
                writer.write_all(content).expect("write entry");
            }
        }
        writer.finish().expect("finish zip");
    }

    fn read_tree(root: &Path) -> Vec<(String, Vec<u8>)> {
        fn collect(base: &Path, dir: &Path, out: &mut Vec<(String, Vec<u8>)>) {
            for entry in fs::read_dir(dir).expect("read dir") {
                let entry = entry.expect("dir entry");
                let path = entry.path();
                if path.is_dir() {
                    collect(base, &path, out);
                } else {
                    let rel = path
                        .strip_prefix(base)
                        .expect("relative")
                        .to_string_lossy()
                        .to_string();
                    out.push((rel, fs::read(&path).expect("read file")));
                }
            }
        }
        let mut out = Vec::new();
        collect(root, root, &mut out);
        out.sort();
        out
    }

    #[test]
    fn test_detect_root_folder_strips_branded_wrapper() {
        let entries = vec![
            entry("LumenTV-v2/"),
            entry("LumenTV-v2/LumenTV"),
            entry("LumenTV-v2/data/res.bin"),
        ];
        assert_eq!(
            detect_root_folder(&entries, lumen_predicate()),
            Some("LumenTV-v2".to_string())
        );
    }

    #[test]
    fn test_detect_root_folder_keeps_multi_rooted_archives() {
        let entries = vec![entry("a/x"), entry("b/y")];
        assert_eq!(detect_root_folder(&entries, lumen_predicate()), None);
    }

    #[test]
    fn test_detect_root_folder_ignores_non_app_single_root() {
        let entries = vec![entry("docs/readme.md"), entry("docs/guide.md")];
        assert_eq!(detect_root_folder(&entries, lumen_predicate()), None);
    }

    #[test]
    fn test_detect_root_folder_matches_app_substring() {
        let entries = vec![entry("MyApp-1.0/bin/run")];
        assert_eq!(
            detect_root_folder(&entries, lumen_predicate()),
            Some("MyApp-1.0".to_string())
        );
    }

    #[test]
    fn test_detect_root_folder_handles_flat_archives() {
        let entries = vec![entry("LumenTV"), entry("readme.txt")];
        // Two distinct first segments; nothing to strip.
        assert_eq!(detect_root_folder(&entries, lumen_predicate()), None);
    }

    #[test]
    fn test_predicate_is_pluggable() {
        let entries = vec![entry("docs/readme.md")];
        assert_eq!(
            detect_root_folder(&entries, |name| name == "docs"),
            Some("docs".to_string())
        );
    }

    #[test]
    fn test_extract_strips_matching_root() {
        let temp = tempdir().expect("create tempdir");
        let archive = temp.path().join("update.zip");
        write_test_zip(
            &archive,
            &[
                ("LumenTV/", b"" as &[u8]),
                ("LumenTV/app.bin", b"binary"),
                ("LumenTV/data/res.bin", b"resource"),
            ],
        );
        let dest = temp.path().join("install");
        fs::create_dir_all(&dest).expect("create dest");

        extract(&archive, &dest, &UpdaterConfig::default()).expect("extract");

        assert_eq!(fs::read(dest.join("app.bin")).expect("read"), b"binary");
        assert_eq!(
            fs::read(dest.join("data").join("res.bin")).expect("read"),
            b"resource"
        );
        assert!(!dest.join("LumenTV").exists());
    }

    #[test]
    fn test_extract_skips_entries_named_like_the_wrapper() {
        let temp = tempdir().expect("create tempdir");
        let archive = temp.path().join("update.zip");
        write_test_zip(
            &archive,
            &[
                ("LumenTV", b"wrapper remnant" as &[u8]),
                ("LumenTV/app.bin", b"binary"),
            ],
        );
        let dest = temp.path().join("install");
        fs::create_dir_all(&dest).expect("create dest");

        extract(&archive, &dest, &UpdaterConfig::default()).expect("extract");

        assert_eq!(fs::read(dest.join("app.bin")).expect("read"), b"binary");
        assert!(!dest.join("LumenTV").exists());
    }

    #[test]
    fn test_extract_keeps_multi_rooted_layout() {
        let temp = tempdir().expect("create tempdir");
        let archive = temp.path().join("update.zip");
        write_test_zip(&archive, &[("a/x", b"x" as &[u8]), ("b/y", b"y")]);
        let dest = temp.path().join("install");
        fs::create_dir_all(&dest).expect("create dest");

        extract(&archive, &dest, &UpdaterConfig::default()).expect("extract");

        assert!(dest.join("a").join("x").exists());
        assert!(dest.join("b").join("y").exists());
    }

    #[test]
    fn test_extract_is_deterministic_on_clean_destinations() {
        let temp = tempdir().expect("create tempdir");
        let archive = temp.path().join("update.zip");
        write_test_zip(
            &archive,
            &[
                ("LumenTV/app.bin", b"binary" as &[u8]),
                ("LumenTV/data/res.bin", b"resource"),
                ("LumenTV/readme.txt", b"notes"),
            ],
        );
        let first = temp.path().join("first");
        let second = temp.path().join("second");
        fs::create_dir_all(&first).expect("create first");
        fs::create_dir_all(&second).expect("create second");

        extract(&archive, &first, &UpdaterConfig::default()).expect("extract first");
        extract(&archive, &second, &UpdaterConfig::default()).expect("extract second");

        assert_eq!(read_tree(&first), read_tree(&second));
    }

    #[test]
    fn test_extract_rejects_unsafe_entry_paths() {
        let temp = tempdir().expect("create tempdir");
        let archive = temp.path().join("unsafe.zip");
        write_test_zip(&archive, &[("../evil.txt", b"evil" as &[u8])]);
        let dest = temp.path().join("install");
        fs::create_dir_all(&dest).expect("create dest");

        let result = extract(&archive, &dest, &UpdaterConfig::default());
        assert!(matches!(result, Err(UpdaterError::ExtractFailed { .. })));
        assert!(!temp.path().join("evil.txt").exists());
    }

    #[test]
    fn test_extract_fails_on_corrupt_archive() {
        let temp = tempdir().expect("create tempdir");
        let archive = temp.path().join("broken.zip");
        fs::write(&archive, b"this is not a zip file").expect("write junk");
        let dest = temp.path().join("install");
        fs::create_dir_all(&dest).expect("create dest");

        let result = extract(&archive, &dest, &UpdaterConfig::default());
        assert!(matches!(result, Err(UpdaterError::ExtractFailed { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_extract_applies_declared_directory_mode() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempdir().expect("create tempdir");
        let archive = temp.path().join("update.zip");
        let file = File::create(&archive).expect("create zip");
        let mut writer = ZipWriter::new(file);
        let dir_options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Stored)
            .unix_permissions(0o750);
        writer
            .add_directory("LumenTV/plugins/", dir_options)
            .expect("add dir");
        let file_options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Stored)
            .unix_permissions(0o644);
        writer
            .start_file("LumenTV/plugins/core.bin", file_options)
            .expect("start file");
        writer.write_all(b"plugin").expect("write entry");
        writer.finish().expect("finish zip");

        let dest = temp.path().join("install");
        fs::create_dir_all(&dest).expect("create dest");
        extract(&archive, &dest, &UpdaterConfig::default()).expect("extract");

        let mode = fs::metadata(dest.join("plugins"))
            .expect("stat")
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o750);
        assert_eq!(
            fs::read(dest.join("plugins").join("core.bin")).expect("read"),
            b"plugin"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_extract_applies_declared_mode() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempdir().expect("create tempdir");
        let archive = temp.path().join("update.zip");
        let file = File::create(&archive).expect("create zip");
        let mut writer = ZipWriter::new(file);
        let exec_options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Stored)
            .unix_permissions(0o755);
        writer
            .start_file("LumenTV/app", exec_options)
            .expect("start file");
        writer.write_all(b"binary").expect("write entry");
        writer.finish().expect("finish zip");

        let dest = temp.path().join("install");
        fs::create_dir_all(&dest).expect("create dest");
        extract(&archive, &dest, &UpdaterConfig::default()).expect("extract");

        let mode = fs::metadata(dest.join("app"))
            .expect("stat")
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}
