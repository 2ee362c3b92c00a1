//! Extension-keyed format dispatch.
//!
//! The engine resolves a file path, then hands it here. Each supported
//! extension maps to a reader that produces a [`FileContent`] value; the
//! engine turns that into pipeline ops without knowing format details.

use crate::cube::CubeLut;
use crate::{cdl, cube, spi, CdlCollection, Lut1d, Lut3d, LutError, LutResult};
use std::collections::BTreeMap;
use std::path::Path;

/// Parsed content of a color file, independent of its on-disk format.
#[derive(Debug, Clone)]
pub enum FileContent {
    /// A 1D table.
    Lut1d(Lut1d),
    /// A 3D table.
    Lut3d(Lut3d),
    /// One or more CDL corrections.
    Cdl(CdlCollection),
}

type ReaderFn = fn(&Path) -> LutResult<FileContent>;

/// Maps lowercase file extensions to reader functions.
pub struct FormatRegistry {
    readers: BTreeMap<&'static str, ReaderFn>,
}

impl Default for FormatRegistry {
    fn default() -> Self {
        let mut readers: BTreeMap<&'static str, ReaderFn> = BTreeMap::new();
        readers.insert("cube", read_cube);
        readers.insert("spi1d", read_spi1d);
        readers.insert("cc", read_cdl);
        readers.insert("ccc", read_cdl);
        readers.insert("cdl", read_cdl);
        Self { readers }
    }
}

impl FormatRegistry {
    /// Registry with all built-in formats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lowercase extensions with a registered reader, in sorted order.
    pub fn extensions(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.readers.keys().copied()
    }

    /// True if `ext` (case-insensitive) has a registered reader.
    pub fn supports(&self, ext: &str) -> bool {
        self.readers.contains_key(ext.to_ascii_lowercase().as_str())
    }

    /// Reads `path`, dispatching on its extension.
    pub fn read(&self, path: impl AsRef<Path>) -> LutResult<FileContent> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let reader = self
            .readers
            .get(ext.as_str())
            .ok_or(LutError::UnsupportedFormat { ext })?;
        reader(path)
    }
}

/// Reads a color file with the built-in format set.
pub fn read_file(path: impl AsRef<Path>) -> LutResult<FileContent> {
    FormatRegistry::new().read(path)
}

fn read_cube(path: &Path) -> LutResult<FileContent> {
    Ok(match cube::read(path)? {
        CubeLut::OneD(lut) => FileContent::Lut1d(lut),
        CubeLut::ThreeD(lut) => FileContent::Lut3d(lut),
    })
}

fn read_spi1d(path: &Path) -> LutResult<FileContent> {
    Ok(FileContent::Lut1d(spi::read_spi1d(path)?))
}

fn read_cdl(path: &Path) -> LutResult<FileContent> {
    Ok(FileContent::Cdl(cdl::read(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn extension_dispatch() {
        let reg = FormatRegistry::new();
        assert!(reg.supports("cube"));
        assert!(reg.supports("CUBE"));
        assert!(reg.supports("ccc"));
        assert!(!reg.supports("png"));
    }

    #[test]
    fn unsupported_extension_reported() {
        let err = read_file("grade.xyz").unwrap_err();
        assert!(matches!(err, LutError::UnsupportedFormat { ext } if ext == "xyz"));
    }

    #[test]
    fn reads_cube_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.cube");
        let mut f = std::fs::File::create(&path).unwrap();
        write!(f, "LUT_1D_SIZE 2\n0 0 0\n1 1 1\n").unwrap();
        match read_file(&path).unwrap() {
            FileContent::Lut1d(lut) => assert_eq!(lut.size(), 2),
            other => panic!("unexpected content: {other:?}"),
        }
    }
}
