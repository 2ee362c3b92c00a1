//! ASC CDL XML family: `.cc`, `.ccc`, `.cdl`.
//!
//! A `.cc` file holds a single `<ColorCorrection>`; a `.ccc` file wraps many
//! in a `<ColorCorrectionCollection>`; a `.cdl` file wraps them in
//! `<ColorDecision>` elements. All three reduce to the same 10-parameter
//! slope/offset/power/saturation record here.

use crate::{LutError, LutResult};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::path::Path;

/// A single ASC color correction (SOP + saturation).
#[derive(Debug, Clone, PartialEq)]
pub struct CdlCorrection {
    /// Correction id, addressable from a collection.
    pub id: Option<String>,
    /// Per-channel multiply.
    pub slope: [f64; 3],
    /// Per-channel add.
    pub offset: [f64; 3],
    /// Per-channel power.
    pub power: [f64; 3],
    /// Saturation (1.0 = unchanged).
    pub saturation: f64,
}

impl Default for CdlCorrection {
    fn default() -> Self {
        Self {
            id: None,
            slope: [1.0; 3],
            offset: [0.0; 3],
            power: [1.0; 3],
            saturation: 1.0,
        }
    }
}

/// An ordered collection of corrections from a `.ccc` or `.cdl` file.
#[derive(Debug, Clone, Default)]
pub struct CdlCollection {
    /// Corrections in file order.
    pub corrections: Vec<CdlCorrection>,
}

impl CdlCollection {
    /// Finds a correction by id.
    pub fn by_id(&self, id: &str) -> LutResult<&CdlCorrection> {
        self.corrections
            .iter()
            .find(|c| c.id.as_deref() == Some(id))
            .ok_or_else(|| LutError::CorrectionNotFound { id: id.to_string() })
    }

    /// First correction in the collection, if any.
    pub fn first(&self) -> Option<&CdlCorrection> {
        self.corrections.first()
    }
}

/// Reads any of the three CDL file kinds into a collection.
///
/// A `.cc` file yields a single-entry collection.
pub fn read(path: impl AsRef<Path>) -> LutResult<CdlCollection> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    parse(&text, path)
}

/// Parses CDL XML text.
pub fn parse(text: &str, path: &Path) -> LutResult<CdlCollection> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut collection = CdlCollection::default();
    let mut current: Option<CdlCorrection> = None;
    let mut element: Vec<u8> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.local_name().as_ref().to_vec();
                if name == b"ColorCorrection" {
                    let mut cc = CdlCorrection::default();
                    for attr in e.attributes().flatten() {
                        if attr.key.local_name().as_ref() == b"id" {
                            let v = attr
                                .unescape_value()
                                .map_err(|err| LutError::parse(path, err.to_string()))?;
                            if !v.is_empty() {
                                cc.id = Some(v.into_owned());
                            }
                        }
                    }
                    current = Some(cc);
                }
                element = name;
            }
            Ok(Event::Text(t)) => {
                if let Some(cc) = current.as_mut() {
                    let text = t
                        .unescape()
                        .map_err(|err| LutError::parse(path, err.to_string()))?;
                    match element.as_slice() {
                        b"Slope" => cc.slope = parse_triple(&text, path)?,
                        b"Offset" => cc.offset = parse_triple(&text, path)?,
                        b"Power" => cc.power = parse_triple(&text, path)?,
                        b"Saturation" => {
                            cc.saturation = text
                                .trim()
                                .parse()
                                .map_err(|_| LutError::parse(path, "bad Saturation"))?;
                        }
                        _ => {}
                    }
                }
            }
            Ok(Event::End(e)) => {
                if e.local_name().as_ref() == b"ColorCorrection" {
                    if let Some(cc) = current.take() {
                        collection.corrections.push(cc);
                    }
                }
                element.clear();
            }
            Ok(Event::Eof) => break,
            Err(err) => return Err(LutError::parse(path, err.to_string())),
            _ => {}
        }
    }

    if collection.corrections.is_empty() {
        return Err(LutError::parse(path, "no ColorCorrection elements"));
    }
    Ok(collection)
}

fn parse_triple(s: &str, path: &Path) -> LutResult<[f64; 3]> {
    let mut it = s.split_whitespace();
    let mut out = [0.0f64; 3];
    for v in &mut out {
        *v = it
            .next()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| LutError::parse(path, format!("bad triple: {s}")))?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CCC: &str = r#"<ColorCorrectionCollection xmlns="urn:ASC:CDL:v1.01">
  <ColorCorrection id="shot_010">
    <SOPNode>
      <Slope>1.1 1.0 0.9</Slope>
      <Offset>0.01 0.0 -0.01</Offset>
      <Power>1.0 1.0 1.0</Power>
    </SOPNode>
    <SatNode>
      <Saturation>0.95</Saturation>
    </SatNode>
  </ColorCorrection>
  <ColorCorrection id="shot_020">
    <SOPNode>
      <Slope>1.0 1.0 1.0</Slope>
      <Offset>0.0 0.0 0.0</Offset>
      <Power>1.2 1.2 1.2</Power>
    </SOPNode>
  </ColorCorrection>
</ColorCorrectionCollection>"#;

    #[test]
    fn parse_collection() {
        let ccc = parse(CCC, Path::new("t.ccc")).unwrap();
        assert_eq!(ccc.corrections.len(), 2);
        let cc = ccc.by_id("shot_010").unwrap();
        assert_eq!(cc.slope, [1.1, 1.0, 0.9]);
        assert_eq!(cc.saturation, 0.95);
    }

    #[test]
    fn missing_id_is_error() {
        let ccc = parse(CCC, Path::new("t.ccc")).unwrap();
        assert!(matches!(
            ccc.by_id("nope"),
            Err(LutError::CorrectionNotFound { .. })
        ));
    }

    #[test]
    fn text_content_decodes_character_references() {
        let cc_text = r#"<ColorCorrection id="cc1">
  <SOPNode>
    <Slope>1.5&#32;1.5&#32;1.5</Slope>
    <Offset>0 0 0</Offset>
    <Power>1 1 1</Power>
  </SOPNode>
</ColorCorrection>"#;
        let ccc = parse(cc_text, Path::new("t.cc")).unwrap();
        assert_eq!(ccc.corrections[0].slope, [1.5, 1.5, 1.5]);
    }

    #[test]
    fn parse_single_cc() {
        let cc_text = r#"<ColorCorrection id="cc1">
  <SOPNode>
    <Slope>2 2 2</Slope>
    <Offset>0 0 0</Offset>
    <Power>1 1 1</Power>
  </SOPNode>
</ColorCorrection>"#;
        let ccc = parse(cc_text, Path::new("t.cc")).unwrap();
        assert_eq!(ccc.corrections.len(), 1);
        assert_eq!(ccc.corrections[0].slope, [2.0, 2.0, 2.0]);
        assert_eq!(ccc.corrections[0].saturation, 1.0);
    }
}
