//! [`TestPackage`] builder for package fixtures.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value, json};
use tempfile::TempDir;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Builder for a package directory with an `mcp_package.json`.
///
/// # Example
///
/// ```rust,no_run
/// use mcpm_test_utils::TestPackage;
///
/// let pkg = TestPackage::new("My Server", "1.0.0")
///     .secret_input("API_KEY")
///     .install_step("echo ${API_KEY}")
///     .ide("ide1", serde_json::json!({"command": "node", "args": ["server.js"]}))
///     .build();
/// let archive = pkg.archive("my-server-1.0.0.zip");
/// ```
#[derive(Debug, Clone)]
pub struct TestPackage {
    dir_name: String,
    manifest: Map<String, Value>,
    files: Vec<(String, Vec<u8>)>,
    write_manifest: bool,
}

impl TestPackage {
    /// A manifest with only `name` and `version`.
    pub fn new(name: &str, version: &str) -> Self {
        let mut manifest = Map::new();
        manifest.insert("name".into(), json!(name));
        manifest.insert("version".into(), json!(version));
        Self {
            dir_name: "package".to_string(),
            manifest,
            files: Vec::new(),
            write_manifest: true,
        }
    }

    /// Start from a raw manifest document.
    pub fn from_manifest(manifest: Value) -> Self {
        Self {
            dir_name: "package".to_string(),
            manifest: manifest.as_object().cloned().unwrap_or_default(),
            files: Vec::new(),
            write_manifest: true,
        }
    }

    /// Name of the package directory (default `package`).
    pub fn dir_name(mut self, name: &str) -> Self {
        self.dir_name = name.to_string();
        self
    }

    /// Set or replace a top-level manifest field.
    pub fn field(mut self, key: &str, value: Value) -> Self {
        self.manifest.insert(key.to_string(), value);
        self
    }

    /// Drop a top-level manifest field.
    pub fn without(mut self, key: &str) -> Self {
        self.manifest.remove(key);
        self
    }

    /// Do not write `mcp_package.json` at all.
    pub fn no_manifest(mut self) -> Self {
        self.write_manifest = false;
        self
    }

    fn push(mut self, key: &str, item: Value) -> Self {
        let list = self
            .manifest
            .entry(key.to_string())
            .or_insert_with(|| json!([]));
        if let Value::Array(items) = list {
            items.push(item);
        }
        self
    }

    pub fn input(self, name: &str) -> Self {
        self.push("install_inputs", json!({"name": name, "prompt": format!("{name}?")}))
    }

    pub fn secret_input(self, name: &str) -> Self {
        self.push(
            "install_inputs",
            json!({"name": name, "prompt": format!("{name}?"), "secret": true}),
        )
    }

    pub fn install_step(self, command: &str) -> Self {
        self.push("install_steps", json!({"type": "shell", "command": command}))
    }

    pub fn uninstall_step(self, command: &str) -> Self {
        self.push("uninstall_steps", json!({"type": "shell", "command": command}))
    }

    /// Add a config block for `ide`.
    pub fn ide(mut self, ide: &str, block: Value) -> Self {
        let blocks = self
            .manifest
            .entry("ide_config_commands".to_string())
            .or_insert_with(|| json!({}));
        if let Value::Object(map) = blocks {
            map.insert(ide.to_string(), block);
        }
        self
    }

    /// Add a file relative to the package root.
    pub fn file(mut self, path: &str, content: impl AsRef<[u8]>) -> Self {
        self.files.push((path.to_string(), content.as_ref().to_vec()));
        self
    }

    /// The manifest as it will be written.
    pub fn manifest(&self) -> Value {
        Value::Object(self.manifest.clone())
    }

    /// Write the package into a fresh temp directory.
    pub fn build(self) -> BuiltPackage {
        let temp = TempDir::new().expect("TestPackage::build: failed to create temp dir");
        let root = temp.path().join(&self.dir_name);
        fs::create_dir_all(&root).unwrap();

        if self.write_manifest {
            let content = serde_json::to_string_pretty(&Value::Object(self.manifest)).unwrap();
            fs::write(root.join("mcp_package.json"), content).unwrap();
        }
        for (rel, content) in &self.files {
            let path = root.join(rel);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, content).unwrap();
        }

        BuiltPackage { temp, root }
    }
}

/// A package written to disk. The files live as long as this value.
#[derive(Debug)]
pub struct BuiltPackage {
    temp: TempDir,
    root: PathBuf,
}

impl BuiltPackage {
    /// The package directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Zip the package contents (at the archive root) into `file_name`,
    /// next to the package directory.
    pub fn archive(&self, file_name: &str) -> PathBuf {
        let out = self.temp.path().join(file_name);
        zip_dir(&self.root, &out, None);
        out
    }

    /// Zip the package with everything under a single top-level directory.
    pub fn archive_wrapped(&self, file_name: &str, top: &str) -> PathBuf {
        let out = self.temp.path().join(file_name);
        zip_dir(&self.root, &out, Some(top));
        out
    }
}

/// Write a zip with raw entry names, for archives no builder should produce.
pub fn raw_archive(path: &Path, entries: &[(&str, &[u8])]) {
    let file = File::create(path).unwrap();
    let mut zip = ZipWriter::new(file);
    for (name, content) in entries {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(content).unwrap();
    }
    zip.finish().unwrap();
}

fn zip_dir(root: &Path, out: &Path, prefix: Option<&str>) {
    let file = File::create(out).unwrap();
    let mut zip = ZipWriter::new(file);
    add_dir(&mut zip, root, root, prefix);
    zip.finish().unwrap();
}

fn add_dir(zip: &mut ZipWriter<File>, root: &Path, dir: &Path, prefix: Option<&str>) {
    let mut entries: Vec<_> = fs::read_dir(dir).unwrap().map(|e| e.unwrap().path()).collect();
    entries.sort();
    for path in entries {
        if path.is_dir() {
            add_dir(zip, root, &path, prefix);
            continue;
        }
        let rel = path
            .strip_prefix(root)
            .unwrap()
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        let name = match prefix {
            Some(top) => format!("{top}/{rel}"),
            None => rel,
        };
        zip.start_file(name, SimpleFileOptions::default()).unwrap();
        zip.write_all(&fs::read(&path).unwrap()).unwrap();
    }
}
