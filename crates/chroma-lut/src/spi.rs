//! Sony Pictures Imageworks `.spi1d` format.
//!
//! ```text
//! Version 1
//! From 0.0 1.0
//! Length 1024
//! Components 1
//! {
//!     0.000000
//!     ...
//! }
//! ```

use crate::{Lut1d, LutError, LutResult};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Reads a `.spi1d` 1D LUT.
pub fn read_spi1d(path: impl AsRef<Path>) -> LutResult<Lut1d> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    parse_spi1d(reader, path)
}

fn parse_spi1d(reader: impl BufRead, path: &Path) -> LutResult<Lut1d> {
    let mut from = [0.0f32, 1.0];
    let mut length: Option<usize> = None;
    let mut components = 1usize;
    let mut samples: Vec<f32> = Vec::new();
    let mut in_body = false;

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if in_body {
            if line == "}" {
                in_body = false;
                continue;
            }
            for tok in line.split_whitespace() {
                samples.push(
                    tok.parse()
                        .map_err(|_| LutError::parse(path, format!("bad sample: {tok}")))?,
                );
            }
        } else if line.starts_with("Version") {
            continue;
        } else if let Some(rest) = line.strip_prefix("From") {
            let mut it = rest.split_whitespace();
            for v in &mut from {
                *v = it
                    .next()
                    .and_then(|t| t.parse().ok())
                    .ok_or_else(|| LutError::parse(path, "bad From line"))?;
            }
        } else if let Some(rest) = line.strip_prefix("Length") {
            length = Some(
                rest.trim()
                    .parse()
                    .map_err(|_| LutError::parse(path, "bad Length line"))?,
            );
        } else if let Some(rest) = line.strip_prefix("Components") {
            components = rest
                .trim()
                .parse()
                .map_err(|_| LutError::parse(path, "bad Components line"))?;
        } else if line == "{" {
            in_body = true;
        }
    }

    let length = length.ok_or_else(|| LutError::parse(path, "missing Length"))?;
    if components != 1 && components != 3 {
        return Err(LutError::parse(
            path,
            format!("unsupported component count: {components}"),
        ));
    }
    if samples.len() != length * components {
        return Err(LutError::parse(
            path,
            format!(
                "expected {} samples, found {}",
                length * components,
                samples.len()
            ),
        ));
    }

    Ok(Lut1d::from_samples(samples, components)
        .with_domain([from[0]; 3], [from[1]; 3]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parse_single_component() {
        let text = "Version 1\nFrom 0.0 1.0\nLength 3\nComponents 1\n{\n0.0\n0.5\n1.0\n}\n";
        let lut = parse_spi1d(Cursor::new(text), Path::new("t.spi1d")).unwrap();
        assert_eq!(lut.size(), 3);
        assert_eq!(lut.channels(), 1);
        assert!((lut.sample(0.5, 0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn missing_length_rejected() {
        let text = "Version 1\n{\n0.0\n}\n";
        assert!(parse_spi1d(Cursor::new(text), Path::new("t.spi1d")).is_err());
    }
}
