//! Workspace bundles.
//!
//! A bundle is a zip with a typed `manifest.json`, a `VACUUM INTO` snapshot of
//! the workspace database and a small metadata file. Every non-manifest entry
//! is listed in the manifest with its size and SHA-256; import refuses a
//! bundle whose entries do not match, and never touches the live database
//! until the staged copy has passed SQLite's own integrity check.

use anyhow::{bail, ensure, Context};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const BUNDLE_FORMAT: &str = "campus-workspace-v1";
pub const LEGACY_FORMAT: &str = "legacy-sqlite3";

const DB_FILE: &str = "campus.sqlite3";
const MANIFEST_ENTRY: &str = "manifest.json";
const DB_ENTRY: &str = "db/campus.sqlite3";
const WORKSPACE_ENTRY: &str = "meta/workspace.json";
const ZIP_MAGIC: &[u8; 4] = b"PK\x03\x04";
const SQLITE_MAGIC: &[u8; 16] = b"SQLite format 3\0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub path: String,
    pub size: u64,
    pub sha256: String,
}

impl ManifestEntry {
    fn describe(path: &str, bytes: &[u8]) -> Self {
        Self {
            path: path.to_string(),
            size: bytes.len() as u64,
            sha256: hex::encode(Sha256::digest(bytes)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleManifest {
    pub format: String,
    pub app_version: String,
    pub exported_at: DateTime<Utc>,
    pub entries: Vec<ManifestEntry>,
}

impl BundleManifest {
    fn entry(&self, path: &str) -> Option<&ManifestEntry> {
        self.entries.iter().find(|e| e.path == path)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WorkspaceMeta {
    source_workspace: String,
    sqlite_version: &'static str,
}

#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub bundle_format: String,
    pub entry_count: usize,
    pub db_sha256: String,
}

#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub bundle_format_detected: String,
    pub exported_at: Option<DateTime<Utc>>,
}

/// A file that is removed when dropped, success or not.
struct ScratchFile(PathBuf);

impl Drop for ScratchFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}

fn scratch_path(dir: &Path, suffix: &str) -> PathBuf {
    dir.join(format!("{DB_FILE}.{}.{suffix}", uuid::Uuid::new_v4().simple()))
}

/// Snapshots `conn` and writes a bundle to `out_path`.
pub fn export_workspace_bundle(
    conn: &Connection,
    workspace_path: &Path,
    out_path: &Path,
) -> anyhow::Result<ExportSummary> {
    let out_dir = match out_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("failed to create directory {}", out_dir.display()))?;

    let snapshot = ScratchFile(scratch_path(&out_dir, "snapshot"));
    conn.execute(
        "VACUUM INTO ?1",
        [snapshot.0.to_string_lossy().into_owned()],
    )
    .context("failed to snapshot workspace database")?;
    let db_bytes = std::fs::read(&snapshot.0).context("failed to read database snapshot")?;

    let meta_bytes = serde_json::to_vec_pretty(&WorkspaceMeta {
        source_workspace: workspace_path.to_string_lossy().into_owned(),
        sqlite_version: rusqlite::version(),
    })?;

    let payload: [(&str, &[u8]); 2] = [(DB_ENTRY, &db_bytes), (WORKSPACE_ENTRY, &meta_bytes)];
    let manifest = BundleManifest {
        format: BUNDLE_FORMAT.to_string(),
        app_version: env!("CARGO_PKG_VERSION").to_string(),
        exported_at: Utc::now(),
        entries: payload
            .iter()
            .map(|(path, bytes)| ManifestEntry::describe(path, bytes))
            .collect(),
    };

    let out_file = File::create(out_path)
        .with_context(|| format!("failed to create output file {}", out_path.display()))?;
    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file(MANIFEST_ENTRY, opts)?;
    zip.write_all(&serde_json::to_vec_pretty(&manifest)?)
        .context("failed to write manifest")?;
    for &(path, bytes) in &payload {
        zip.start_file(path, opts)?;
        zip.write_all(bytes)
            .with_context(|| format!("failed to write {path}"))?;
    }
    zip.finish().context("failed to finalize zip bundle")?;

    let db_sha256 = manifest
        .entry(DB_ENTRY)
        .map(|e| e.sha256.clone())
        .unwrap_or_default();
    Ok(ExportSummary {
        bundle_format: BUNDLE_FORMAT.to_string(),
        entry_count: payload.len() + 1,
        db_sha256,
    })
}

/// Restores a bundle, or a bare SQLite file, as the database of
/// `workspace_path`.
pub fn import_workspace_bundle(
    in_path: &Path,
    workspace_path: &Path,
) -> anyhow::Result<ImportSummary> {
    std::fs::create_dir_all(workspace_path)
        .with_context(|| format!("failed to create workspace {}", workspace_path.display()))?;

    let mut head = [0u8; 16];
    let head_len = File::open(in_path)
        .with_context(|| format!("failed to open {}", in_path.display()))?
        .read(&mut head)?;
    let head = &head[..head_len];

    let (db_bytes, summary) = if head.starts_with(ZIP_MAGIC) {
        read_bundle(in_path)?
    } else if head == SQLITE_MAGIC {
        let bytes = std::fs::read(in_path)
            .with_context(|| format!("failed to read {}", in_path.display()))?;
        let summary = ImportSummary {
            bundle_format_detected: LEGACY_FORMAT.to_string(),
            exported_at: None,
        };
        (bytes, summary)
    } else {
        bail!("{} is neither a workspace bundle nor a SQLite database", in_path.display());
    };

    let staged = ScratchFile(scratch_path(workspace_path, "importing"));
    std::fs::write(&staged.0, &db_bytes).context("failed to stage imported database")?;
    check_database(&staged.0)?;

    let dst = workspace_path.join(DB_FILE);
    if dst.exists() {
        std::fs::remove_file(&dst)
            .with_context(|| format!("failed to remove existing database {}", dst.display()))?;
    }
    std::fs::rename(&staged.0, &dst)
        .with_context(|| format!("failed to move imported database to {}", dst.display()))?;
    Ok(summary)
}

fn read_bundle(in_path: &Path) -> anyhow::Result<(Vec<u8>, ImportSummary)> {
    let mut archive = ZipArchive::new(File::open(in_path)?).context("invalid zip archive")?;
    let manifest: BundleManifest = serde_json::from_slice(&read_entry(&mut archive, MANIFEST_ENTRY)?)
        .context("manifest.json is not a bundle manifest")?;
    ensure!(
        manifest.format == BUNDLE_FORMAT,
        "unsupported bundle format: {}",
        manifest.format
    );
    ensure!(
        manifest.entry(DB_ENTRY).is_some(),
        "manifest does not list {DB_ENTRY}"
    );

    let mut db_bytes = Vec::new();
    for entry in &manifest.entries {
        let bytes = read_entry(&mut archive, &entry.path)?;
        let actual = ManifestEntry::describe(&entry.path, &bytes);
        if actual.size != entry.size || !actual.sha256.eq_ignore_ascii_case(&entry.sha256) {
            bail!(
                "checksum mismatch for {}: manifest {}, bundle {}",
                entry.path,
                entry.sha256,
                actual.sha256
            );
        }
        if entry.path == DB_ENTRY {
            db_bytes = bytes;
        }
    }

    Ok((
        db_bytes,
        ImportSummary {
            bundle_format_detected: BUNDLE_FORMAT.to_string(),
            exported_at: Some(manifest.exported_at),
        },
    ))
}

fn read_entry(archive: &mut ZipArchive<File>, path: &str) -> anyhow::Result<Vec<u8>> {
    let mut entry = archive
        .by_name(path)
        .with_context(|| format!("bundle missing {path}"))?;
    let mut bytes = Vec::with_capacity(entry.size() as usize);
    entry
        .read_to_end(&mut bytes)
        .with_context(|| format!("failed to read {path}"))?;
    Ok(bytes)
}

fn check_database(path: &Path) -> anyhow::Result<()> {
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .context("imported file is not a SQLite database")?;
    let verdict: String = conn
        .query_row("PRAGMA integrity_check", [], |r| r.get(0))
        .context("imported file is not a SQLite database")?;
    ensure!(verdict == "ok", "imported database failed integrity check: {verdict}");
    Ok(())
}
