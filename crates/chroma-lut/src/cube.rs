//! Iridas/Resolve `.cube` format.
//!
//! Text format carrying either a 1D or a 3D table:
//!
//! ```text
//! # comment
//! TITLE "grade"
//! LUT_3D_SIZE 33
//! DOMAIN_MIN 0.0 0.0 0.0
//! DOMAIN_MAX 1.0 1.0 1.0
//! 0.0 0.0 0.0
//! ...
//! ```

use crate::{Lut1d, Lut3d, LutError, LutResult};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// A parsed `.cube` file, which may hold either table kind.
#[derive(Debug, Clone)]
pub enum CubeLut {
    /// 1D table (LUT_1D_SIZE).
    OneD(Lut1d),
    /// 3D table (LUT_3D_SIZE).
    ThreeD(Lut3d),
}

/// Reads a `.cube` file, detecting 1D vs 3D from its header.
pub fn read(path: impl AsRef<Path>) -> LutResult<CubeLut> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    parse(reader, path)
}

fn parse(reader: impl BufRead, path: &Path) -> LutResult<CubeLut> {
    let mut size_1d: Option<usize> = None;
    let mut size_3d: Option<usize> = None;
    let mut domain_min = [0.0f32; 3];
    let mut domain_max = [1.0f32; 3];
    let mut rows: Vec<[f32; 3]> = Vec::new();

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with("TITLE") {
            continue;
        }
        if let Some(rest) = line.strip_prefix("LUT_1D_SIZE") {
            size_1d = Some(parse_usize(rest, path)?);
        } else if let Some(rest) = line.strip_prefix("LUT_3D_SIZE") {
            size_3d = Some(parse_usize(rest, path)?);
        } else if let Some(rest) = line.strip_prefix("DOMAIN_MIN") {
            domain_min = parse_triple(rest, path)?;
        } else if let Some(rest) = line.strip_prefix("DOMAIN_MAX") {
            domain_max = parse_triple(rest, path)?;
        } else {
            rows.push(parse_triple(line, path)?);
        }
    }

    match (size_1d, size_3d) {
        (Some(size), None) => {
            if rows.len() != size {
                return Err(LutError::parse(
                    path,
                    format!("expected {} rows, found {}", size, rows.len()),
                ));
            }
            let samples = rows.into_iter().flatten().collect();
            Ok(CubeLut::OneD(
                Lut1d::from_samples(samples, 3).with_domain(domain_min, domain_max),
            ))
        }
        (None, Some(size)) => {
            if rows.len() != size * size * size {
                return Err(LutError::parse(
                    path,
                    format!("expected {} rows, found {}", size * size * size, rows.len()),
                ));
            }
            let data = rows.into_iter().flatten().collect();
            let mut lut = Lut3d::from_data(data, size);
            lut.domain_min = domain_min;
            lut.domain_max = domain_max;
            Ok(CubeLut::ThreeD(lut))
        }
        (Some(_), Some(_)) => Err(LutError::parse(path, "both 1D and 3D size declared")),
        (None, None) => Err(LutError::parse(path, "missing LUT_1D_SIZE or LUT_3D_SIZE")),
    }
}

fn parse_usize(s: &str, path: &Path) -> LutResult<usize> {
    s.trim()
        .parse()
        .map_err(|_| LutError::parse(path, format!("bad size: {s}")))
}

fn parse_triple(s: &str, path: &Path) -> LutResult<[f32; 3]> {
    let mut it = s.split_whitespace();
    let mut out = [0.0f32; 3];
    for v in &mut out {
        *v = it
            .next()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| LutError::parse(path, format!("bad row: {s}")))?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parse_3d() {
        let text = "\
# test cube
TITLE \"t\"
LUT_3D_SIZE 2
0 0 0
1 0 0
0 1 0
1 1 0
0 0 1
1 0 1
0 1 1
1 1 1
";
        let lut = parse(Cursor::new(text), Path::new("t.cube")).unwrap();
        match lut {
            CubeLut::ThreeD(l) => assert_eq!(l.size(), 2),
            CubeLut::OneD(_) => panic!("expected 3D"),
        }
    }

    #[test]
    fn parse_1d() {
        let text = "LUT_1D_SIZE 2\n0 0 0\n1 1 1\n";
        let lut = parse(Cursor::new(text), Path::new("t.cube")).unwrap();
        match lut {
            CubeLut::OneD(l) => {
                assert_eq!(l.size(), 2);
                assert_eq!(l.channels(), 3);
            }
            CubeLut::ThreeD(_) => panic!("expected 1D"),
        }
    }

    #[test]
    fn row_count_mismatch_rejected() {
        let text = "LUT_1D_SIZE 3\n0 0 0\n1 1 1\n";
        assert!(parse(Cursor::new(text), Path::new("t.cube")).is_err());
    }
}
