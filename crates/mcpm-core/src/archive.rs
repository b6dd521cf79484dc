//! Package archives
//!
//! A package archive is a zip file (`.zip`, or `.mcpz`) holding
//! `mcp_package.json` at its root, or inside a single top-level directory.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use mcpm_meta::{FallbackHint, MANIFEST_FILENAME, PackageManifest};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::{Error, Result};

/// Directory and file names never packed into an archive.
pub const EXCLUDED_NAMES: &[&str] = &[".git", "__pycache__", ".DS_Store", ".venv", "venv"];

/// File extensions never packed into an archive.
pub const EXCLUDED_EXTENSIONS: &[&str] = &["pyc", "zip", "mcpz"];

/// Summary of a created archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub path: PathBuf,
    pub files: usize,
}

/// Whether `path` looks like a package archive by its extension.
pub fn is_archive(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("zip") || e.eq_ignore_ascii_case("mcpz"))
}

/// The conventional file name for a package archive.
pub fn default_archive_name(manifest: &PackageManifest) -> String {
    format!("{}-{}.zip", manifest.install_name, manifest.version)
}

fn invalid(path: &Path, message: impl Into<String>) -> Error {
    Error::InvalidArchive {
        path: path.to_path_buf(),
        message: message.into(),
    }
}

fn open(archive: &Path) -> Result<ZipArchive<File>> {
    let file = File::open(archive).map_err(|e| mcpm_fs::Error::io(archive, e))?;
    ZipArchive::new(file).map_err(|e| invalid(archive, e.to_string()))
}

/// Strip an entry name down to a relative path that stays inside the
/// extraction directory.
fn sanitize_entry(archive: &Path, raw: &str) -> Result<Option<PathBuf>> {
    let raw = raw.replace('\\', "/");
    let mut cleaned = PathBuf::new();
    for component in Path::new(&raw).components() {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::ParentDir => {
                return Err(invalid(archive, format!("entry escapes destination: {raw}")));
            }
            Component::CurDir => {}
            Component::Normal(part) => cleaned.push(part),
        }
    }
    Ok((!cleaned.as_os_str().is_empty()).then_some(cleaned))
}

/// Name of the manifest entry: at the root, or one directory deep.
fn manifest_entry(archive: &ZipArchive<File>) -> Option<String> {
    archive
        .file_names()
        .filter(|name| {
            let name = name.trim_start_matches("./");
            name == MANIFEST_FILENAME
                || name
                    .split_once('/')
                    .is_some_and(|(_, rest)| rest == MANIFEST_FILENAME)
        })
        .min_by_key(|name| name.len())
        .map(str::to_string)
}

/// Read and parse the manifest without extracting anything.
///
/// Missing `name`/`version` fall back to the archive's file name.
pub fn read_manifest(archive: &Path) -> Result<PackageManifest> {
    let mut zip = open(archive)?;
    let entry_name = manifest_entry(&zip)
        .ok_or_else(|| invalid(archive, format!("no {MANIFEST_FILENAME} found")))?;

    let mut content = String::new();
    zip.by_name(&entry_name)?
        .read_to_string(&mut content)
        .map_err(|e| mcpm_fs::Error::io(archive, e))?;

    Ok(PackageManifest::parse_with_fallback(
        &content,
        &FallbackHint::from_path(archive),
    )?)
}

/// Extract `archive` into `dest` and return the package root.
///
/// The package root is `dest` itself, unless the archive wraps everything in
/// a single directory, in which case that directory is returned.
pub fn extract(archive: &Path, dest: &Path) -> Result<PathBuf> {
    let mut zip = open(archive)?;
    fs::create_dir_all(dest).map_err(|e| mcpm_fs::Error::io(dest, e))?;

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        let Some(rel) = sanitize_entry(archive, entry.name())? else {
            continue;
        };
        let out = dest.join(&rel);

        if entry.is_dir() {
            fs::create_dir_all(&out).map_err(|e| mcpm_fs::Error::io(&out, e))?;
            continue;
        }
        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent).map_err(|e| mcpm_fs::Error::io(parent, e))?;
        }
        let mut out_file = File::create(&out).map_err(|e| mcpm_fs::Error::io(&out, e))?;
        io::copy(&mut entry, &mut out_file).map_err(|e| mcpm_fs::Error::io(&out, e))?;
        restore_mode(&out, entry.unix_mode())?;
    }

    tracing::debug!(archive = %archive.display(), dest = %dest.display(), "extracted archive");
    package_root(dest)
}

#[cfg(unix)]
fn restore_mode(path: &Path, mode: Option<u32>) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    if let Some(mode) = mode {
        fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o777))
            .map_err(|e| mcpm_fs::Error::io(path, e))?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn restore_mode(_path: &Path, _mode: Option<u32>) -> Result<()> {
    Ok(())
}

fn package_root(dest: &Path) -> Result<PathBuf> {
    if dest.join(MANIFEST_FILENAME).is_file() {
        return Ok(dest.to_path_buf());
    }
    let mut children = fs::read_dir(dest)
        .map_err(|e| mcpm_fs::Error::io(dest, e))?
        .filter_map(|e| e.ok())
        .map(|e| e.path());
    match (children.next(), children.next()) {
        (Some(only), None) if only.join(MANIFEST_FILENAME).is_file() => Ok(only),
        _ => Ok(dest.to_path_buf()),
    }
}

fn is_excluded(name: &str) -> bool {
    EXCLUDED_NAMES.contains(&name)
        || Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| EXCLUDED_EXTENSIONS.contains(&e))
}

/// Pack `source` into a zip at `output`.
///
/// `source` must hold a valid manifest. Excluded names, and `output` itself
/// when it lies inside `source`, are skipped. On failure the partial output
/// file is removed.
pub fn create(source: &Path, output: &Path) -> Result<ArchiveSummary> {
    PackageManifest::from_dir(source)?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| mcpm_fs::Error::io(parent, e))?;
    }

    let result = write_zip(source, output);
    if result.is_err() {
        let _ = fs::remove_file(output);
    }
    result
}

fn write_zip(source: &Path, output: &Path) -> Result<ArchiveSummary> {
    let file = File::create(output).map_err(|e| mcpm_fs::Error::io(output, e))?;
    let output_canonical = dunce::canonicalize(output).ok();

    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut files = 0;

    let walker = WalkDir::new(source)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_excluded(&e.file_name().to_string_lossy()));

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(source).to_path_buf();
            mcpm_fs::Error::io(path, io::Error::other(e.to_string()))
        })?;
        let path = entry.path();
        if output_canonical.is_some() && dunce::canonicalize(path).ok() == output_canonical {
            continue;
        }

        let rel = path
            .strip_prefix(source)
            .map_err(|_| invalid(output, format!("{} is outside source", path.display())))?;
        let name = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if entry.file_type().is_dir() {
            zip.add_directory(name, options)?;
        } else if entry.file_type().is_file() {
            #[cfg(unix)]
            let options = {
                use std::os::unix::fs::PermissionsExt;
                let mode = entry
                    .metadata()
                    .map(|m| m.permissions().mode())
                    .unwrap_or(0o644);
                options.unix_permissions(mode)
            };
            zip.start_file(name, options)?;
            let mut input = File::open(path).map_err(|e| mcpm_fs::Error::io(path, e))?;
            io::copy(&mut input, &mut zip).map_err(|e| mcpm_fs::Error::io(path, e))?;
            files += 1;
        }
    }

    zip.finish()?;
    tracing::info!(output = %output.display(), files, "created package archive");
    Ok(ArchiveSummary {
        path: output.to_path_buf(),
        files,
    })
}

/// Recursively copy a package directory, skipping excluded names.
pub fn copy_tree(source: &Path, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest).map_err(|e| mcpm_fs::Error::io(dest, e))?;
    let walker = WalkDir::new(source)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| !is_excluded(&e.file_name().to_string_lossy()));

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(source).to_path_buf();
            mcpm_fs::Error::io(path, io::Error::other(e.to_string()))
        })?;
        let Ok(rel) = entry.path().strip_prefix(source) else {
            continue;
        };
        let target = dest.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| mcpm_fs::Error::io(&target, e))?;
        } else {
            fs::copy(entry.path(), &target).map_err(|e| mcpm_fs::Error::io(&target, e))?;
        }
    }
    Ok(())
}
