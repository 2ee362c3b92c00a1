//! Process-list XML export.
//!
//! Serializes a compiled processor's op list as a `ProcessList` XML
//! document, one element per op. Indentation is fixed at four spaces and
//! the output is byte-stable for a given processor, which golden-string
//! tests rely on.

use std::fmt::Write;

use crate::dynamic::DynamicValue;
use crate::ops::Op;
use crate::processor::Processor;
use crate::transform::{ExposureContrastStyle, NegativeStyle, TransferStyle};

const IN_OUT: &str = r#"inBitDepth="32f" outBitDepth="32f""#;

/// Renders the processor as a `ProcessList` document.
pub fn write_ctf(processor: &Processor) -> String {
    let mut w = Writer::new();
    w.line(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    w.line(&format!(
        r#"<ProcessList version="2.0" id="{}">"#,
        processor.cache_id()
    ));
    w.indent += 1;
    for op in processor.ops() {
        write_op(&mut w, op);
    }
    w.indent -= 1;
    w.line("</ProcessList>");
    w.out
}

struct Writer {
    out: String,
    indent: usize,
}

impl Writer {
    fn new() -> Self {
        Self {
            out: String::new(),
            indent: 0,
        }
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn open(&mut self, text: &str) {
        self.line(text);
        self.indent += 1;
    }

    fn close(&mut self, text: &str) {
        self.indent -= 1;
        self.line(text);
    }
}

fn num(v: f64) -> String {
    // Shortest round-trip repr; stable for golden comparisons.
    format!("{v}")
}

fn num32(v: f32) -> String {
    format!("{v}")
}

fn triple(v: [f32; 3]) -> String {
    format!("{} {} {}", num32(v[0]), num32(v[1]), num32(v[2]))
}

fn triple64(v: [f64; 3]) -> String {
    format!("{} {} {}", num(v[0]), num(v[1]), num(v[2]))
}

fn zone(v: [f64; 4]) -> String {
    format!("{} {} {} {}", num(v[0]), num(v[1]), num(v[2]), num(v[3]))
}

fn curve(points: &[[f64; 2]]) -> String {
    let mut out = String::new();
    for (i, p) in points.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{} {}", num(p[0]), num(p[1]));
    }
    out
}

fn fwd(forward: bool) -> &'static str {
    if forward {
        "Fwd"
    } else {
        "Rev"
    }
}

fn write_op(w: &mut Writer, op: &Op) {
    match op {
        Op::Matrix { matrix, offset } => write_matrix(w, matrix, offset),
        Op::Lut1d { lut, interp } => {
            w.open(&format!(
                r#"<LUT1D {IN_OUT} interpolation="{interp:?}">"#,
            ));
            w.open(&format!(
                r#"<Array dim="{} {}">"#,
                lut.size(),
                lut.channels()
            ));
            for row in lut.samples().chunks(lut.channels()) {
                let text: Vec<String> = row.iter().map(|v| num32(*v)).collect();
                w.line(&text.join(" "));
            }
            w.close("</Array>");
            w.close("</LUT1D>");
        }
        Op::Lut3d { lut, interp } => {
            w.open(&format!(
                r#"<LUT3D {IN_OUT} interpolation="{interp:?}">"#,
            ));
            let n = lut.size();
            w.open(&format!(r#"<Array dim="{n} {n} {n} 3">"#));
            for row in lut.data().chunks(3) {
                w.line(&format!("{} {} {}", num32(row[0]), num32(row[1]), num32(row[2])));
            }
            w.close("</Array>");
            w.close("</LUT3D>");
        }
        Op::Exponent { value, style } => {
            let style = match style {
                NegativeStyle::Clamp => "basicFwd",
                NegativeStyle::Mirror => "basicMirrorFwd",
                NegativeStyle::PassThru => "basicPassThruFwd",
            };
            w.open(&format!(r#"<Exponent {IN_OUT} style="{style}">"#));
            w.line(&format!(
                r#"<ExponentParams exponent="{}"/>"#,
                triple([value[0], value[1], value[2]])
            ));
            w.close("</Exponent>");
        }
        Op::Log { base, forward } => {
            let style = if *forward { "linToLog" } else { "logToLin" };
            w.open(&format!(r#"<Log {IN_OUT} style="{style}">"#));
            w.line(&format!(r#"<LogParams base="{}"/>"#, num32(*base)));
            w.close("</Log>");
        }
        Op::Cdl {
            slope,
            offset,
            power,
            saturation,
        } => {
            w.open(&format!(r#"<ASC_CDL {IN_OUT} style="Fwd">"#));
            w.open("<SOPNode>");
            w.line(&format!("<Slope>{}</Slope>", triple(*slope)));
            w.line(&format!("<Offset>{}</Offset>", triple(*offset)));
            w.line(&format!("<Power>{}</Power>", triple(*power)));
            w.close("</SOPNode>");
            w.open("<SatNode>");
            w.line(&format!(
                "<Saturation>{}</Saturation>",
                num32(*saturation)
            ));
            w.close("</SatNode>");
            w.close("</ASC_CDL>");
        }
        Op::Range {
            scale,
            offset,
            clamp_min,
            clamp_max,
        } => write_range(w, *scale, *offset, *clamp_min, *clamp_max),
        Op::Transfer { style, forward } => {
            let name = match style {
                TransferStyle::Srgb => "srgb",
                TransferStyle::Rec709 => "rec709",
                TransferStyle::Gamma22 => "gamma22",
                TransferStyle::Gamma24 => "gamma24",
                TransferStyle::Gamma26 => "gamma26",
                TransferStyle::Pq => "pq",
                TransferStyle::AcesCct => "acescct",
            };
            w.line(&format!(
                r#"<FixedFunction {IN_OUT} style="{name}{}"/>"#,
                fwd(*forward)
            ));
        }
        Op::ExposureContrast {
            style,
            pivot,
            exposure,
            contrast,
            gamma,
            dynamic,
            forward,
        } => {
            let style_name = match style {
                ExposureContrastStyle::Linear => "linear",
                ExposureContrastStyle::Video => "video",
                ExposureContrastStyle::Log => "log",
            };
            w.open(&format!(
                r#"<ExposureContrast {IN_OUT} style="{style_name}{}">"#,
                fwd(*forward)
            ));
            let e = exposure.get_scalar().unwrap_or_default();
            let c = contrast.get_scalar().unwrap_or_default();
            let g = gamma.get_scalar().unwrap_or_default();
            w.line(&format!(
                r#"<ECParams exposure="{}" contrast="{}" gamma="{}" pivot="{}"/>"#,
                num(e),
                num(c),
                num(g),
                num32(*pivot)
            ));
            for (flag, name) in dynamic.iter().zip(["EXPOSURE", "CONTRAST", "GAMMA"]) {
                if *flag {
                    w.line(&format!(r#"<DynamicParameter param="{name}"/>"#));
                }
            }
            w.close("</ExposureContrast>");
        }
        Op::GradingPrimary { values, forward, .. } => {
            if let DynamicValue::Primary(v) = values.value() {
                w.open(&format!(
                    r#"<GradingPrimary {IN_OUT} style="{}">"#,
                    fwd(*forward)
                ));
                w.line(&format!(r#"<Lift rgb="{}"/>"#, triple64(v.lift)));
                w.line(&format!(r#"<Gamma rgb="{}"/>"#, triple64(v.gamma)));
                w.line(&format!(r#"<Gain rgb="{}"/>"#, triple64(v.gain)));
                w.line(&format!(
                    r#"<Offset master="{}" exposure="{}"/>"#,
                    num(v.offset),
                    num(v.exposure)
                ));
                w.line(&format!(
                    r#"<Contrast master="{}" pivot="{}"/>"#,
                    num(v.contrast),
                    num(v.pivot)
                ));
                w.line(&format!(r#"<Saturation master="{}"/>"#, num(v.saturation)));
                if let Some(black) = v.clamp_black {
                    w.line(&format!(r#"<Clamp black="{}"/>"#, num(black)));
                }
                if let Some(white) = v.clamp_white {
                    w.line(&format!(r#"<Clamp white="{}"/>"#, num(white)));
                }
                w.close("</GradingPrimary>");
            }
        }
        Op::GradingTone { values, forward, .. } => {
            if let DynamicValue::Tone(v) = values.value() {
                w.open(&format!(
                    r#"<GradingTone {IN_OUT} style="{}">"#,
                    fwd(*forward)
                ));
                w.line(&format!(r#"<Shadows rgbm="{}"/>"#, zone(v.shadows)));
                w.line(&format!(r#"<Midtones rgbm="{}"/>"#, zone(v.midtones)));
                w.line(&format!(r#"<Highlights rgbm="{}"/>"#, zone(v.highlights)));
                w.line(&format!(r#"<Blacks rgbm="{}"/>"#, zone(v.blacks)));
                w.line(&format!(r#"<Whites rgbm="{}"/>"#, zone(v.whites)));
                w.line(&format!(
                    r#"<Zones shadowStart="{}" highlightStart="{}"/>"#,
                    num(v.shadow_start),
                    num(v.highlight_start)
                ));
                w.close("</GradingTone>");
            }
        }
        Op::GradingRgbCurve { values, forward, .. } => {
            if let DynamicValue::RgbCurve(v) = values.value() {
                w.open(&format!(
                    r#"<GradingRGBCurve {IN_OUT} style="{}">"#,
                    fwd(*forward)
                ));
                for (name, points) in [
                    ("Red", &v.red),
                    ("Green", &v.green),
                    ("Blue", &v.blue),
                    ("Master", &v.master),
                ] {
                    w.line(&format!(r#"<{name} points="{}"/>"#, curve(points)));
                }
                w.close("</GradingRGBCurve>");
            }
        }
        Op::GradingHueCurve { values, forward, .. } => {
            if let DynamicValue::HueCurve(v) = values.value() {
                w.open(&format!(
                    r#"<GradingHueCurve {IN_OUT} style="{}">"#,
                    fwd(*forward)
                ));
                w.line(&format!(r#"<HueHue points="{}"/>"#, curve(&v.hue_hue)));
                w.line(&format!(r#"<HueSat points="{}"/>"#, curve(&v.hue_sat)));
                w.close("</GradingHueCurve>");
            }
        }
    }
}

fn write_matrix(w: &mut Writer, matrix: &[f32; 16], offset: &[f32; 4]) {
    let has_offset = offset.iter().any(|v| *v != 0.0);
    let dim = if has_offset { "3 4 3" } else { "3 3 3" };
    w.open(&format!(r#"<Matrix {IN_OUT}>"#));
    w.open(&format!(r#"<Array dim="{dim}">"#));
    for row in 0..3 {
        let mut text = format!(
            "{} {} {}",
            num32(matrix[row * 4]),
            num32(matrix[row * 4 + 1]),
            num32(matrix[row * 4 + 2])
        );
        if has_offset {
            let _ = write!(text, " {}", num32(offset[row]));
        }
        w.line(&text);
    }
    w.close("</Array>");
    w.close("</Matrix>");
}

fn write_range(
    w: &mut Writer,
    scale: f32,
    offset: f32,
    clamp_min: Option<f32>,
    clamp_max: Option<f32>,
) {
    let clamped = clamp_min.is_some() || clamp_max.is_some();
    let style = if clamped { "Clamp" } else { "noClamp" };
    w.open(&format!(r#"<Range {IN_OUT} style="{style}">"#));
    match (clamp_min, clamp_max) {
        (Some(min), Some(max)) => {
            // Recover the input bounds that map onto the clamp window.
            let in_min = if scale != 0.0 { (min - offset) / scale } else { min };
            let in_max = if scale != 0.0 { (max - offset) / scale } else { max };
            w.line(&format!("<minInValue>{}</minInValue>", num32(in_min)));
            w.line(&format!("<maxInValue>{}</maxInValue>", num32(in_max)));
            w.line(&format!("<minOutValue>{}</minOutValue>", num32(min)));
            w.line(&format!("<maxOutValue>{}</maxOutValue>", num32(max)));
        }
        _ => {
            // Express the affine map through its unit-interval images.
            w.line("<minInValue>0</minInValue>");
            w.line("<maxInValue>1</maxInValue>");
            w.line(&format!("<minOutValue>{}</minOutValue>", num32(offset)));
            w.line(&format!(
                "<maxOutValue>{}</maxOutValue>",
                num32(scale + offset)
            ));
        }
    }
    w.close("</Range>");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::Processor;

    #[test]
    fn matrix_golden_string() {
        let p = Processor::from_ops(vec![Op::Matrix {
            matrix: [
                2.0, 0.0, 0.0, 0.0, //
                0.0, 2.0, 0.0, 0.0, //
                0.0, 0.0, 2.0, 0.0, //
                0.0, 0.0, 0.0, 1.0,
            ],
            offset: [0.0; 4],
        }]);
        let expected = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <ProcessList version=\"2.0\" id=\"{}\">\n\
             \x20   <Matrix inBitDepth=\"32f\" outBitDepth=\"32f\">\n\
             \x20       <Array dim=\"3 3 3\">\n\
             \x20           2 0 0\n\
             \x20           0 2 0\n\
             \x20           0 0 2\n\
             \x20       </Array>\n\
             \x20   </Matrix>\n\
             </ProcessList>\n",
            p.cache_id()
        );
        assert_eq!(write_ctf(&p), expected);
    }

    #[test]
    fn cdl_includes_sop_and_sat() {
        let p = Processor::from_ops(vec![Op::Cdl {
            slope: [1.1, 1.0, 0.9],
            offset: [0.01, 0.0, -0.01],
            power: [1.0; 3],
            saturation: 0.8,
        }]);
        let text = write_ctf(&p);
        assert!(text.contains("<Slope>1.1 1 0.9</Slope>"));
        assert!(text.contains("<Saturation>0.8</Saturation>"));
    }

    #[test]
    fn output_is_stable() {
        let ops = vec![Op::Range {
            scale: 2.0,
            offset: 0.5,
            clamp_min: None,
            clamp_max: None,
        }];
        let a = write_ctf(&Processor::from_ops(ops.clone()));
        let b = write_ctf(&Processor::from_ops(ops));
        assert_eq!(a, b);
        assert!(a.contains("<maxOutValue>2.5</maxOutValue>"));
    }
}
