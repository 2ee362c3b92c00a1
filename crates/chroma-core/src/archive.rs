//! Self-contained config archives.
//!
//! Packs a config document plus every file it references into a single
//! zip container and unpacks it elsewhere. Only configs whose referenced
//! paths stay inside the working directory can be archived, so callers
//! should gate on [`is_archivable`] first.
//!
//! Config cache IDs cover each referenced file's size and mtime. The
//! archive records exact mtimes in a manifest entry and restores them on
//! extraction, so an extracted config reproduces the original's cache ID
//! byte for byte.

use std::collections::BTreeMap;
use std::fs;
use std::io::{Read, Seek, Write};
use std::path::{Component, Path};
use std::time::{Duration, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::config::Config;
use crate::context::Context;
use crate::error::{ChromaError, ChromaResult};

/// Entry name of the config document inside an archive.
pub const ARCHIVE_CONFIG_ENTRY: &str = "config.yaml";

/// Entry name of the mtime manifest.
const ARCHIVE_MANIFEST_ENTRY: &str = ".manifest.yaml";

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct FileStamp {
    secs: u64,
    nanos: u32,
}

/// Whether a single path may appear in an archive.
///
/// Archivable paths are relative, do not climb out of the working
/// directory and do not start with a context variable (its value cannot
/// be known at archive time).
fn path_is_portable(path: &str) -> bool {
    if path.is_empty() || path.starts_with('$') {
        return false;
    }
    let p = Path::new(path);
    if p.is_absolute() || path.starts_with('\\') || path.as_bytes().get(1) == Some(&b':') {
        return false;
    }
    !matches!(p.components().next(), Some(Component::ParentDir))
}

/// Whether the config can be archived.
///
/// Checks every search path and every `FileTransform` source string.
pub fn is_archivable(config: &Config) -> bool {
    let sources = config.file_transform_sources();
    for path in config.search_paths().iter().cloned().chain(sources) {
        if !path_is_portable(&path) {
            debug!(path = %path, "config not archivable");
            return false;
        }
    }
    true
}

/// Packs the config and its referenced files into a zip container.
///
/// Sources that do not resolve under the given context are skipped; the
/// config's cache ID treats them as missing on both sides of a round
/// trip, so the IDs still agree.
pub fn archive<W: Write + Seek>(config: &Config, context: &Context, out: W) -> ChromaResult<()> {
    if !is_archivable(config) {
        return Err(ChromaError::NotArchivable {
            reason: "a search path or file source is absolute, escapes the working \
                     directory, or starts with a context variable"
                .to_string(),
        });
    }

    let deflate = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(out);
    zip.start_file(ARCHIVE_CONFIG_ENTRY, deflate)?;
    zip.write_all(config.to_yaml()?.as_bytes())?;

    let resolver = config.file_resolver();
    let mut stamps: BTreeMap<String, FileStamp> = BTreeMap::new();
    for src in config.file_transform_sources() {
        let resolved = match resolver.resolve(&src, context) {
            Ok(path) => path,
            Err(ChromaError::MissingFile { .. }) => {
                debug!(src = %src, "skipping unresolved source");
                continue;
            }
            Err(e) => return Err(e),
        };
        let entry = entry_name(config.working_dir(), &resolved)?;
        if stamps.contains_key(&entry) {
            continue;
        }
        let meta = fs::metadata(&resolved)?;
        if let Ok(d) = meta.modified()?.duration_since(UNIX_EPOCH) {
            stamps.insert(
                entry.clone(),
                FileStamp {
                    secs: d.as_secs(),
                    nanos: d.subsec_nanos(),
                },
            );
        }
        zip.start_file(entry.as_str(), deflate)?;
        let mut file = fs::File::open(&resolved)?;
        std::io::copy(&mut file, &mut zip)?;
    }

    zip.start_file(ARCHIVE_MANIFEST_ENTRY, deflate)?;
    let manifest = serde_yaml::to_string(&stamps)?;
    zip.write_all(manifest.as_bytes())?;
    zip.finish()?;

    info!(config = config.name(), files = stamps.len(), "archived config");
    Ok(())
}

/// Unpacks an archive into `dest` and loads the contained config.
///
/// The config's working directory is set to `dest`, so the returned
/// config resolves its files in place.
pub fn extract<R: Read + Seek>(archive: R, dest: &Path) -> ChromaResult<Config> {
    let mut zip = ZipArchive::new(archive)?;
    let mut stamps: BTreeMap<String, FileStamp> = BTreeMap::new();

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        if entry.name() == ARCHIVE_MANIFEST_ENTRY {
            let mut text = String::new();
            entry.read_to_string(&mut text)?;
            stamps = serde_yaml::from_str(&text)?;
            continue;
        }
        let Some(relative) = entry.enclosed_name() else {
            return Err(ChromaError::NotArchivable {
                reason: format!("archive entry '{}' escapes the destination", entry.name()),
            });
        };
        let target = dest.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = fs::File::create(&target)?;
        std::io::copy(&mut entry, &mut out)?;
    }

    for (name, stamp) in &stamps {
        let target = dest.join(name);
        let mtime = UNIX_EPOCH + Duration::new(stamp.secs, stamp.nanos);
        fs::OpenOptions::new()
            .write(true)
            .open(&target)?
            .set_modified(mtime)?;
    }

    let config = Config::from_file(dest.join(ARCHIVE_CONFIG_ENTRY))?;
    info!(config = config.name(), "extracted config");
    Ok(config)
}

/// Archive entry name for a resolved file, relative to the working
/// directory, with forward slashes.
fn entry_name(working_dir: &Path, resolved: &Path) -> ChromaResult<String> {
    let relative: &Path = resolved.strip_prefix(working_dir).map_err(|_| {
        ChromaError::NotArchivable {
            reason: format!(
                "resolved file '{}' is outside the working directory",
                resolved.display()
            ),
        }
    })?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use crate::colorspace::ColorSpace;
    use crate::transform::Transform;

    fn config_with_paths(paths: &[&str]) -> Config {
        let mut c = Config::new();
        for p in paths {
            c.add_search_path(*p);
        }
        c
    }

    #[test]
    fn archivability_scenarios() {
        assert!(is_archivable(&config_with_paths(&["luts/$SHOT/luts1"])));
        assert!(!is_archivable(&config_with_paths(&["../luts"])));
        assert!(!is_archivable(&config_with_paths(&["/luts"])));
        assert!(!is_archivable(&config_with_paths(&["$SHOT"])));
    }

    #[test]
    fn file_sources_are_checked_too() {
        let mut c = Config::new();
        c.add_colorspace(ColorSpace::new("graded").to_reference(Transform::file("/abs/lut.cube")))
            .unwrap();
        assert!(!is_archivable(&c));
    }

    #[test]
    fn unarchivable_config_is_rejected() {
        let c = config_with_paths(&["../luts"]);
        let err = archive(&c, &Context::new(), Cursor::new(Vec::new()));
        assert!(matches!(err, Err(ChromaError::NotArchivable { .. })));
    }

    fn sample_lut() -> &'static str {
        "Version 1\nFrom 0.0 1.0\nLength 2\nComponents 1\n{\n0.0\n1.0\n}\n"
    }

    fn sample_config(dir: &Path) -> Config {
        fs::create_dir_all(dir.join("luts")).unwrap();
        fs::write(dir.join("luts/ramp.spi1d"), sample_lut()).unwrap();

        let mut c = Config::new();
        c.set_name("show");
        c.set_working_dir(dir);
        c.add_search_path("luts");
        c.add_colorspace(ColorSpace::new("linear")).unwrap();
        c.add_colorspace(ColorSpace::new("graded").to_reference(Transform::file("ramp.spi1d")))
            .unwrap();
        c.roles_mut().define("reference", "linear");
        c
    }

    #[test]
    fn round_trip_restores_files_and_cache_id() {
        let src_dir = tempfile::tempdir().unwrap();
        let dst_dir = tempfile::tempdir().unwrap();
        let config = sample_config(src_dir.path());

        let mut buf = Cursor::new(Vec::new());
        archive(&config, &Context::new(), &mut buf).unwrap();
        buf.set_position(0);
        let extracted = extract(buf, dst_dir.path()).unwrap();

        assert_eq!(extracted.name(), "show");
        assert_eq!(extracted.working_dir(), dst_dir.path());
        let copied = fs::read_to_string(dst_dir.path().join("luts/ramp.spi1d")).unwrap();
        assert_eq!(copied, sample_lut());
        let ctx = Context::new();
        assert_eq!(
            extracted.cache_id(Some(&ctx)).unwrap(),
            config.cache_id(Some(&ctx)).unwrap()
        );
    }

    #[test]
    fn extracted_processor_matches_original() {
        let src_dir = tempfile::tempdir().unwrap();
        let dst_dir = tempfile::tempdir().unwrap();
        let config = sample_config(src_dir.path());

        let mut buf = Cursor::new(Vec::new());
        archive(&config, &Context::new(), &mut buf).unwrap();
        buf.set_position(0);
        let extracted = extract(buf, dst_dir.path()).unwrap();

        let a = config.processor("graded", "linear").unwrap();
        let b = extracted.processor("graded", "linear").unwrap();
        assert_eq!(a.cache_id(), b.cache_id());
    }

    #[test]
    fn missing_source_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = Config::new();
        c.set_working_dir(dir.path());
        c.add_colorspace(ColorSpace::new("graded").to_reference(Transform::file("nope.cube")))
            .unwrap();
        let mut buf = Cursor::new(Vec::new());
        archive(&c, &Context::new(), &mut buf).unwrap();
        buf.set_position(0);
        let dst = tempfile::tempdir().unwrap();
        let extracted = extract(buf, dst.path()).unwrap();
        let ctx = Context::new();
        assert_eq!(
            extracted.cache_id(Some(&ctx)).unwrap(),
            c.cache_id(Some(&ctx)).unwrap()
        );
    }
}
