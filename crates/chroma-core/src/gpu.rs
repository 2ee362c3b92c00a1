//! GPU shader emission.
//!
//! Builds a self-contained shader function for a compiled pipeline, plus
//! the texture and uniform resources it needs. LUT ops become textures
//! with sequential bindings; dynamic scalar parameters become uniforms
//! read live from their property cells. Structured grading values
//! (tone, curves) are baked into LUT textures at emission time, so the
//! descriptor is a snapshot of those.
//!
//! 1D LUTs wider than the declared limit are laid out as multi-row 2D
//! textures; the emitted lookup helper handles the row arithmetic.

use std::fmt::Write as _;

use sha2::{Digest, Sha256};

use crate::cache::hex_digest;
use crate::dynamic::{DynamicKind, DynamicProperty};
use crate::error::ChromaResult;
use crate::ops::Op;
use crate::transform::{ExposureContrastStyle, NegativeStyle, TransferStyle};

/// Default width limit before a 1D LUT is widened to 2D rows.
pub const DEFAULT_MAX_LUT1D_WIDTH: usize = 4096;

/// Resolution used when baking grading curves to textures.
const BAKED_LUT1D_SIZE: usize = 1024;
const BAKED_LUT3D_SIZE: usize = 33;

/// Shader languages the emitter targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ShaderLanguage {
    /// OpenGL GLSL 1.20.
    Glsl120,
    /// OpenGL GLSL 3.30.
    #[default]
    Glsl330,
    /// OpenGL GLSL 4.00.
    Glsl400,
    /// OpenGL ES GLSL 3.00.
    GlslEs300,
    /// Vulkan-flavored GLSL (explicit set/binding layout).
    GlslVulkan,
    /// HLSL shader model 5.0.
    Hlsl50,
    /// Metal shading language.
    Msl,
}

impl ShaderLanguage {
    fn is_glsl(self) -> bool {
        !matches!(self, ShaderLanguage::Hlsl50 | ShaderLanguage::Msl)
    }
}

/// Texture dimensionality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureDims {
    /// 2D (also used for widened 1D LUTs).
    Two,
    /// 3D.
    Three,
}

/// Emission settings.
#[derive(Debug, Clone)]
pub struct GpuShaderSettings {
    /// Target language.
    pub language: ShaderLanguage,
    /// Name of the emitted pipeline function (also prefixes resources).
    pub function_name: String,
    /// First texture binding index; subsequent textures count up.
    pub texture_binding_start: u32,
    /// Descriptor set index, used by the Vulkan target only.
    pub descriptor_set: u32,
    /// 1D LUT width limit before widening to 2D.
    pub max_lut1d_width: usize,
}

impl Default for GpuShaderSettings {
    fn default() -> Self {
        Self {
            language: ShaderLanguage::default(),
            function_name: "chroma_apply".to_string(),
            texture_binding_start: 0,
            descriptor_set: 0,
            max_lut1d_width: DEFAULT_MAX_LUT1D_WIDTH,
        }
    }
}

/// A texture resource the host must upload.
#[derive(Debug, Clone)]
pub struct GpuTexture {
    /// Texture variable name in the shader.
    pub name: String,
    /// Sampler name (separate-sampler targets).
    pub sampler_name: String,
    /// Dimensionality.
    pub dims: TextureDims,
    /// Width in texels.
    pub width: usize,
    /// Height in texels (1 for single-row 1D LUTs).
    pub height: usize,
    /// Depth in texels (3D only, otherwise 1).
    pub depth: usize,
    /// RGB float texel data, row-major.
    pub data: Vec<f32>,
    /// Binding index.
    pub binding: u32,
}

/// A uniform bound to a live dynamic property.
#[derive(Debug, Clone)]
pub struct GpuUniform {
    /// Uniform variable name in the shader.
    pub name: String,
    property: DynamicProperty,
}

impl GpuUniform {
    /// The kind of dynamic property backing this uniform.
    pub fn kind(&self) -> DynamicKind {
        self.property.kind()
    }

    /// Reads the current value to upload. Reflects mutations made after
    /// shader extraction.
    pub fn value(&self) -> ChromaResult<f64> {
        self.property.get_scalar()
    }

    /// The backing property handle.
    pub fn property(&self) -> &DynamicProperty {
        &self.property
    }
}

/// A complete shader description for one pipeline.
#[derive(Debug, Clone)]
pub struct GpuShaderDesc {
    /// Target language.
    pub language: ShaderLanguage,
    /// Pipeline function name.
    pub function_name: String,
    /// Full shader text (declarations, helpers, pipeline function).
    pub shader_text: String,
    /// Texture resources, binding order.
    pub textures: Vec<GpuTexture>,
    /// Live uniforms.
    pub uniforms: Vec<GpuUniform>,
    cache_id: String,
}

impl GpuShaderDesc {
    /// Cache ID of the emitted shader.
    ///
    /// Derived from the text and baked resources; uploading new uniform
    /// values does not change it.
    pub fn cache_id(&self) -> &str {
        &self.cache_id
    }

    pub(crate) fn build(ops: Vec<Op>, settings: GpuShaderSettings) -> ChromaResult<Self> {
        let mut w = ShaderWriter::new(&settings);
        for op in &ops {
            w.emit_op(op)?;
        }
        let shader_text = w.finish();

        let mut h = Sha256::new();
        h.update(format!("{:?}:{}", settings.language, settings.function_name).as_bytes());
        h.update(shader_text.as_bytes());
        for tex in &w.textures {
            for v in &tex.data {
                h.update(v.to_bits().to_le_bytes());
            }
        }
        for u in &w.uniforms {
            h.update(u.name.as_bytes());
        }
        let cache_id = hex_digest(h);

        Ok(Self {
            language: settings.language,
            function_name: settings.function_name,
            shader_text,
            textures: w.textures,
            uniforms: w.uniforms,
            cache_id,
        })
    }
}

// ----------------------------------------------------------------------
// Emission

struct ShaderWriter {
    lang: ShaderLanguage,
    fn_name: String,
    set: u32,
    next_binding: u32,
    max_width: usize,
    decls: String,
    helpers: String,
    body: String,
    textures: Vec<GpuTexture>,
    uniforms: Vec<GpuUniform>,
    transfer_helpers: Vec<(TransferStyle, bool)>,
}

impl ShaderWriter {
    fn new(settings: &GpuShaderSettings) -> Self {
        Self {
            lang: settings.language,
            fn_name: settings.function_name.clone(),
            set: settings.descriptor_set,
            next_binding: settings.texture_binding_start,
            max_width: settings.max_lut1d_width.max(2),
            decls: String::new(),
            helpers: String::new(),
            body: String::new(),
            textures: Vec::new(),
            uniforms: Vec::new(),
            transfer_helpers: Vec::new(),
        }
    }

    // Type and intrinsic spellings per language family.
    fn v3(&self) -> &'static str {
        if self.lang.is_glsl() { "vec3" } else { "float3" }
    }
    fn v4(&self) -> &'static str {
        if self.lang.is_glsl() { "vec4" } else { "float4" }
    }
    fn mix(&self) -> &'static str {
        if self.lang == ShaderLanguage::Hlsl50 { "lerp" } else { "mix" }
    }

    fn line(&mut self, s: &str) {
        let _ = writeln!(self.body, "    {s}");
    }

    fn f(v: f32) -> String {
        // Round-trippable float literal with a decimal point.
        let s = format!("{v:?}");
        if s.contains('.') || s.contains('e') || s.contains("inf") || s.contains("NaN") {
            s
        } else {
            format!("{s}.0")
        }
    }

    fn splat3(&self, v: [f32; 3]) -> String {
        format!(
            "{}({}, {}, {})",
            self.v3(),
            Self::f(v[0]),
            Self::f(v[1]),
            Self::f(v[2])
        )
    }

    // ------------------------------------------------------------------
    // Resources

    fn declare_uniform(&mut self, name: &str, property: DynamicProperty) {
        match self.lang {
            ShaderLanguage::Hlsl50 => {
                let _ = writeln!(self.decls, "float {name};");
            }
            ShaderLanguage::Msl => {
                // Declared as function parameters at finish time.
            }
            _ => {
                let _ = writeln!(self.decls, "uniform float {name};");
            }
        }
        self.uniforms.push(GpuUniform {
            name: name.to_string(),
            property,
        });
    }

    fn declare_texture(&mut self, name: &str, dims: TextureDims) -> u32 {
        let binding = self.next_binding;
        self.next_binding += 1;
        let (glsl_ty, hlsl_ty) = match dims {
            TextureDims::Two => ("sampler2D", "Texture2D"),
            TextureDims::Three => ("sampler3D", "Texture3D"),
        };
        match self.lang {
            ShaderLanguage::GlslVulkan => {
                let _ = writeln!(
                    self.decls,
                    "layout(set = {}, binding = {binding}) uniform {glsl_ty} {name};",
                    self.set
                );
            }
            ShaderLanguage::Hlsl50 => {
                let _ = writeln!(self.decls, "{hlsl_ty} {name} : register(t{binding});");
                let _ = writeln!(
                    self.decls,
                    "SamplerState {name}_smp : register(s{binding});"
                );
            }
            ShaderLanguage::Msl => {
                // Declared as function parameters at finish time.
            }
            _ => {
                let _ = writeln!(self.decls, "uniform {glsl_ty} {name};");
            }
        }
        binding
    }

    /// `tex(uv)` sampling expression.
    fn sample2(&self, name: &str, uv: &str) -> String {
        match self.lang {
            ShaderLanguage::Glsl120 => format!("texture2D({name}, {uv})"),
            ShaderLanguage::Hlsl50 => format!("{name}.SampleLevel({name}_smp, {uv}, 0)"),
            ShaderLanguage::Msl => format!("{name}.sample({name}_smp, {uv})"),
            _ => format!("texture({name}, {uv})"),
        }
    }

    fn sample3(&self, name: &str, uvw: &str) -> String {
        match self.lang {
            ShaderLanguage::Glsl120 => format!("texture3D({name}, {uvw})"),
            ShaderLanguage::Hlsl50 => format!("{name}.SampleLevel({name}_smp, {uvw}, 0)"),
            ShaderLanguage::Msl => format!("{name}.sample({name}_smp, {uvw})"),
            _ => format!("texture({name}, {uvw})"),
        }
    }

    /// Extra parameters a helper needs to receive the texture in MSL.
    fn tex_params(&self, name: &str, dims: TextureDims) -> (String, String) {
        if self.lang != ShaderLanguage::Msl {
            return (String::new(), String::new());
        }
        let ty = match dims {
            TextureDims::Two => "texture2d<float>",
            TextureDims::Three => "texture3d<float>",
        };
        (
            format!(", {ty} {name}, sampler {name}_smp"),
            format!(", {name}, {name}_smp"),
        )
    }

    // ------------------------------------------------------------------
    // Op emission

    fn emit_op(&mut self, op: &Op) -> ChromaResult<()> {
        let v3 = self.v3();
        match op {
            Op::Matrix { matrix, offset } => {
                self.line(&format!("{{ {v3} v = px;"));
                for (row, o) in [(0usize, offset[0]), (1, offset[1]), (2, offset[2])] {
                    let m = &matrix[row * 4..row * 4 + 4];
                    let component = ["x", "y", "z"][row];
                    self.line(&format!(
                        "px.{component} = dot(v, {}) + {};",
                        self.splat3([m[0], m[1], m[2]]),
                        Self::f(m[3] + o)
                    ));
                }
                self.line("}");
            }
            Op::Lut1d { lut, .. } => self.emit_lut1d(lut),
            Op::Lut3d { lut, .. } => self.emit_lut3d(lut),
            Op::Exponent { value, style } => {
                let e = self.splat3([value[0], value[1], value[2]]);
                match style {
                    NegativeStyle::Clamp => {
                        self.line(&format!("px = pow(max(px, {v3}(0.0)), {e});"));
                    }
                    NegativeStyle::Mirror => {
                        self.line(&format!("px = sign(px) * pow(abs(px), {e});"));
                    }
                    NegativeStyle::PassThru => {
                        self.line(&format!("{{ {v3} e = {e};"));
                        for c in ["x", "y", "z"] {
                            self.line(&format!(
                                "px.{c} = px.{c} < 0.0 ? px.{c} : pow(px.{c}, e.{c});"
                            ));
                        }
                        self.line("}");
                    }
                }
            }
            Op::Log { base, forward } => {
                if *forward {
                    self.line(&format!(
                        "px = log(max(px, {v3}(1e-10))) / {};",
                        Self::f(base.ln())
                    ));
                } else {
                    self.line(&format!("px = pow({v3}({}), px);", Self::f(*base)));
                }
            }
            Op::Cdl {
                slope,
                offset,
                power,
                saturation,
            } => {
                self.line(&format!(
                    "px = pow(max(px * {} + {}, {v3}(0.0)), {});",
                    self.splat3(*slope),
                    self.splat3(*offset),
                    self.splat3(*power)
                ));
                if (*saturation - 1.0).abs() > 1e-6 {
                    self.emit_saturation(*saturation);
                }
            }
            Op::Range {
                scale,
                offset,
                clamp_min,
                clamp_max,
            } => {
                self.line(&format!(
                    "px = px * {} + {};",
                    Self::f(*scale),
                    Self::f(*offset)
                ));
                if let Some(lo) = clamp_min {
                    self.line(&format!("px = max(px, {v3}({}));", Self::f(*lo)));
                }
                if let Some(hi) = clamp_max {
                    self.line(&format!("px = min(px, {v3}({}));", Self::f(*hi)));
                }
            }
            Op::Transfer { style, forward } => {
                let helper = self.transfer_helper(*style, *forward);
                for c in ["x", "y", "z"] {
                    self.line(&format!("px.{c} = {helper}(px.{c});"));
                }
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
                self.emit_exposure_contrast(
                    *style, *pivot, exposure, contrast, gamma, *dynamic, *forward,
                )?;
            }
            Op::GradingPrimary { .. } => self.emit_baked_lut1d(op),
            Op::GradingTone { .. } => self.emit_baked_lut1d(op),
            Op::GradingRgbCurve { .. } => self.emit_baked_lut1d(op),
            Op::GradingHueCurve { .. } => self.emit_baked_lut3d(op),
        }
        Ok(())
    }

    fn emit_saturation(&mut self, saturation: f32) {
        let v3 = self.v3();
        let mix = self.mix();
        self.line(&format!(
            "px = {mix}({v3}(dot(px, {v3}(0.2126, 0.7152, 0.0722))), px, {});",
            Self::f(saturation)
        ));
    }

    /// Grading primaries mix channels; baking them per-channel would be
    /// wrong, so a primary op gets inline math instead of a LUT when it
    /// has crosstalk, and falls back to a 1D bake otherwise. Tone and RGB
    /// curves are strictly per-channel and always bake.
    fn emit_baked_lut1d(&mut self, op: &Op) {
        if let Op::GradingPrimary { .. } = op {
            if op.has_crosstalk() {
                self.emit_baked_primary(op);
                return;
            }
        }
        let size = BAKED_LUT1D_SIZE;
        let mut data = Vec::with_capacity(size * 3);
        for i in 0..size {
            let v = i as f32 / (size - 1) as f32;
            let mut px = [v, v, v];
            op.apply(&mut px);
            data.extend_from_slice(&px);
        }
        let lut = chroma_lut::Lut1d::from_samples(data, 3);
        self.emit_lut1d(&lut);
    }

    /// Inline per-pixel math for a saturating grading primary, baked at
    /// the current cell values.
    fn emit_baked_primary(&mut self, op: &Op) {
        // Evaluate the channel-independent part via a 1D bake with
        // saturation disabled, then apply saturation inline.
        if let Op::GradingPrimary {
            values,
            dynamic,
            forward,
        } = op
        {
            if let Ok(mut v) = values.get_primary() {
                let saturation = v.saturation;
                v.saturation = 1.0;
                let desaturated = Op::GradingPrimary {
                    values: DynamicProperty::new(
                        DynamicKind::GradingPrimary,
                        crate::dynamic::DynamicValue::Primary(v),
                    ),
                    dynamic: *dynamic,
                    forward: *forward,
                };
                if *forward {
                    self.emit_baked_lut1d(&desaturated);
                    self.emit_saturation(saturation as f32);
                } else {
                    self.emit_saturation(1.0 / saturation.max(1e-9) as f32);
                    self.emit_baked_lut1d(&desaturated);
                }
            }
        }
    }

    fn emit_baked_lut3d(&mut self, op: &Op) {
        let size = BAKED_LUT3D_SIZE;
        let mut data = Vec::with_capacity(size * size * size * 3);
        for b in 0..size {
            for g in 0..size {
                for r in 0..size {
                    let mut px = [
                        r as f32 / (size - 1) as f32,
                        g as f32 / (size - 1) as f32,
                        b as f32 / (size - 1) as f32,
                    ];
                    op.apply(&mut px);
                    data.extend_from_slice(&px);
                }
            }
        }
        let lut = chroma_lut::Lut3d::from_data(data, size);
        self.emit_lut3d(&lut);
    }

    fn emit_lut1d(&mut self, lut: &chroma_lut::Lut1d) {
        let size = lut.size();
        let width = size.min(self.max_width);
        let height = size.div_ceil(width);
        let index = self.textures.len();
        let name = format!("{}_lut1d_{index}", self.fn_name);
        let binding = self.declare_texture(&name, TextureDims::Two);

        // Texel i holds the RGB samples for index i; single-channel
        // tables replicate. The tail row is padded with the last entry.
        let mut data = Vec::with_capacity(width * height * 3);
        for i in 0..width * height {
            let i = i.min(size - 1);
            for c in 0..3 {
                let ch = if lut.channels() == 1 { 0 } else { c };
                data.push(lut.samples()[i * lut.channels() + ch]);
            }
        }
        self.textures.push(GpuTexture {
            name: name.clone(),
            sampler_name: format!("{name}_smp"),
            dims: TextureDims::Two,
            width,
            height,
            depth: 1,
            data,
            binding,
        });

        let v3 = self.v3();
        let mix = self.mix();
        let (params, args) = self.tex_params(&name, TextureDims::Two);
        let texel = self.sample2(
            &name,
            &format!(
                "{}((col + 0.5) / {}.0, (row + 0.5) / {}.0)",
                if self.lang.is_glsl() { "vec2" } else { "float2" },
                width,
                height
            ),
        );
        let dmin = self.splat3(lut.domain_min);
        let dmax = self.splat3(lut.domain_max);
        let _ = write!(
            self.helpers,
            "{v3} {name}_texel(float i{params}) {{\n    \
             float row = floor(i / {width}.0);\n    \
             float col = i - row * {width}.0;\n    \
             return {texel}.xyz;\n}}\n\
             {v3} {name}_apply({v3} v{params}) {{\n    \
             v = clamp((v - {dmin}) / ({dmax} - {dmin}), 0.0, 1.0);\n    \
             {v3} idx = v * {top}.0;\n    \
             {v3} lo = floor(idx);\n    \
             {v3} hi = min(lo + 1.0, {v3}({top}.0));\n    \
             {v3} a = {v3}({name}_texel(lo.x{args}).x, {name}_texel(lo.y{args}).y, {name}_texel(lo.z{args}).z);\n    \
             {v3} b = {v3}({name}_texel(hi.x{args}).x, {name}_texel(hi.y{args}).y, {name}_texel(hi.z{args}).z);\n    \
             return {mix}(a, b, idx - lo);\n}}\n",
            top = size - 1,
        );
        self.line(&format!("px = {name}_apply(px{args});"));
    }

    fn emit_lut3d(&mut self, lut: &chroma_lut::Lut3d) {
        let size = lut.size();
        let index = self.textures.len();
        let name = format!("{}_lut3d_{index}", self.fn_name);
        let binding = self.declare_texture(&name, TextureDims::Three);
        self.textures.push(GpuTexture {
            name: name.clone(),
            sampler_name: format!("{name}_smp"),
            dims: TextureDims::Three,
            width: size,
            height: size,
            depth: size,
            data: lut.data().to_vec(),
            binding,
        });
        let v3 = self.v3();
        // Hardware trilinear; coordinates centered on texels. Sampled
        // inline, no helper needed.
        let uvw = format!(
            "(clamp(px, 0.0, 1.0) * {top}.0 + 0.5) / {size}.0",
            top = size - 1
        );
        let sample = self.sample3(&name, &uvw);
        self.line(&format!("px = {v3}({sample}.xyz);"));
    }

    fn transfer_helper(&mut self, style: TransferStyle, forward: bool) -> String {
        let tag = format!(
            "{}_{}_{}",
            self.fn_name,
            format!("{style:?}").to_lowercase(),
            if forward { "enc" } else { "dec" }
        );
        if self.transfer_helpers.contains(&(style, forward)) {
            return tag;
        }
        self.transfer_helpers.push((style, forward));
        let body = match (style, forward) {
            (TransferStyle::Srgb, true) => {
                "return v <= 0.0031308 ? 12.92 * v : 1.055 * pow(max(v, 0.0), 1.0 / 2.4) - 0.055;"
                    .to_string()
            }
            (TransferStyle::Srgb, false) => {
                "return v <= 0.04045 ? v / 12.92 : pow(max((v + 0.055) / 1.055, 0.0), 2.4);"
                    .to_string()
            }
            (TransferStyle::Rec709, true) => {
                "return v < 0.018 ? 4.5 * v : 1.099 * pow(max(v, 0.0), 0.45) - 0.099;".to_string()
            }
            (TransferStyle::Rec709, false) => {
                "return v < 0.081 ? v / 4.5 : pow(max((v + 0.099) / 1.099, 0.0), 1.0 / 0.45);"
                    .to_string()
            }
            (TransferStyle::Gamma22, fwd) => gamma_body(2.2, fwd),
            (TransferStyle::Gamma24, fwd) => gamma_body(2.4, fwd),
            (TransferStyle::Gamma26, fwd) => gamma_body(2.6, fwd),
            (TransferStyle::Pq, true) => "float y = pow(max(v, 0.0), 0.1593017578125);\n    \
                 return pow((0.8359375 + 18.8515625 * y) / (1.0 + 18.6875 * y), 78.84375);"
                .to_string(),
            (TransferStyle::Pq, false) => {
                "float e = pow(max(v, 0.0), 1.0 / 78.84375);\n    \
                 return pow(max(e - 0.8359375, 0.0) / (18.8515625 - 18.6875 * e), 1.0 / 0.1593017578125);"
                    .to_string()
            }
            (TransferStyle::AcesCct, true) => {
                "return v <= 0.0078125 ? 10.5402377416545 * v + 0.0729055341958355 : (log2(max(v, 1e-10)) + 9.72) / 17.52;"
                    .to_string()
            }
            (TransferStyle::AcesCct, false) => {
                "return v <= 0.155251141552511 ? (v - 0.0729055341958355) / 10.5402377416545 : exp2(v * 17.52 - 9.72);"
                    .to_string()
            }
        };
        let _ = write!(self.helpers, "float {tag}(float v) {{\n    {body}\n}}\n");
        tag
    }

    #[allow(clippy::too_many_arguments)]
    fn emit_exposure_contrast(
        &mut self,
        style: ExposureContrastStyle,
        pivot: f32,
        exposure: &DynamicProperty,
        contrast: &DynamicProperty,
        gamma: &DynamicProperty,
        dynamic: [bool; 3],
        forward: bool,
    ) -> ChromaResult<()> {
        let v3 = self.v3();
        let index = self.uniforms.len();
        let scalar = |dyn_flag: bool,
                          w: &mut Self,
                          name: &str,
                          prop: &DynamicProperty,
                          default: f64|
         -> ChromaResult<String> {
            if dyn_flag {
                let uniform = format!("{}_{name}_{index}", w.fn_name);
                w.declare_uniform(&uniform, prop.clone());
                Ok(uniform)
            } else {
                Ok(Self::f(prop.get_scalar().unwrap_or(default) as f32))
            }
        };
        let e = scalar(dynamic[0], self, "exposure", exposure, 0.0)?;
        let c = scalar(dynamic[1], self, "contrast", contrast, 1.0)?;
        let g = scalar(dynamic[2], self, "gamma", gamma, 1.0)?;

        let (e, c, g) = if forward {
            (e, c, g)
        } else {
            (
                format!("(-{e})"),
                format!("(1.0 / max({c}, 1e-6))"),
                format!("(1.0 / max({g}, 1e-6))"),
            )
        };
        self.line("{");
        match style {
            ExposureContrastStyle::Linear => {
                self.line(&format!("px = px * exp2({e});"));
                self.line(&format!(
                    "px = {p} * pow(max(px / {p}, {v3}(0.0)), {v3}({c}));",
                    p = Self::f(pivot)
                ));
            }
            ExposureContrastStyle::Video => {
                let p = Self::f(pivot.max(1e-6).powf(1.0 / 2.4));
                self.line(&format!("px = px * pow(exp2({e}), 1.0 / 2.4);"));
                self.line(&format!(
                    "px = {p} * pow(max(px / {p}, {v3}(0.0)), {v3}({c}));"
                ));
            }
            ExposureContrastStyle::Log => {
                self.line(&format!("px = px + {e} * 0.088;"));
                self.line(&format!("px = (px - 0.435) * {c} + 0.435;"));
            }
        }
        self.line(&format!(
            "px = pow(max(px, {v3}(0.0)), {v3}(1.0 / max({g}, 1e-6)));"
        ));
        self.line("}");
        Ok(())
    }

    fn finish(&self) -> String {
        let v3 = self.v3();
        let v4 = self.v4();
        let mut out = String::new();
        let _ = writeln!(out, "// Generated color pipeline: {}", self.fn_name);
        if !self.decls.is_empty() {
            out.push_str(&self.decls);
            out.push('\n');
        }
        if !self.helpers.is_empty() {
            out.push_str(&self.helpers);
            out.push('\n');
        }
        let mut signature = format!("{v4} {}({v4} inPixel", self.fn_name);
        if self.lang == ShaderLanguage::Msl {
            for tex in &self.textures {
                let ty = match tex.dims {
                    TextureDims::Two => "texture2d<float>",
                    TextureDims::Three => "texture3d<float>",
                };
                let _ = write!(
                    signature,
                    ", {ty} {} [[texture({})]], sampler {} [[sampler({})]]",
                    tex.name, tex.binding, tex.sampler_name, tex.binding
                );
            }
            for (i, u) in self.uniforms.iter().enumerate() {
                let _ = write!(signature, ", constant float& {} [[buffer({i})]]", u.name);
            }
        }
        let _ = writeln!(out, "{signature})\n{{");
        let _ = writeln!(out, "    {v3} px = inPixel.xyz;");
        out.push_str(&self.body);
        let _ = writeln!(out, "    return {v4}(px, inPixel.w);");
        out.push_str("}\n");
        out
    }
}

fn gamma_body(gamma: f32, forward: bool) -> String {
    if forward {
        format!("return pow(max(v, 0.0), 1.0 / {gamma:?});")
    } else {
        format!("return pow(max(v, 0.0), {gamma:?});")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::Op;

    fn scale_op(s: f32) -> Op {
        let mut m = [0.0f32; 16];
        m[0] = s;
        m[5] = s;
        m[10] = s;
        m[15] = 1.0;
        Op::Matrix {
            matrix: m,
            offset: [0.0; 4],
        }
    }

    fn dynamic_ec() -> Op {
        Op::ExposureContrast {
            style: ExposureContrastStyle::Linear,
            pivot: 0.18,
            exposure: DynamicProperty::scalar(DynamicKind::Exposure, 0.5),
            contrast: DynamicProperty::scalar(DynamicKind::Contrast, 1.0),
            gamma: DynamicProperty::scalar(DynamicKind::Gamma, 1.0),
            dynamic: [true, false, false],
            forward: true,
        }
    }

    fn lut_op(size: usize) -> Op {
        Op::Lut1d {
            lut: chroma_lut::Lut1d::gamma(size, 2.2),
            interp: crate::transform::Interpolation::Linear,
        }
    }

    #[test]
    fn matrix_only_shader_has_no_resources() {
        let desc =
            GpuShaderDesc::build(vec![scale_op(2.0)], GpuShaderSettings::default()).unwrap();
        assert!(desc.textures.is_empty());
        assert!(desc.uniforms.is_empty());
        assert!(desc.shader_text.contains("vec4 chroma_apply(vec4 inPixel)"));
        assert!(desc.shader_text.contains("dot(v, vec3(2.0, 0.0, 0.0))"));
    }

    #[test]
    fn lut_textures_bind_sequentially() {
        let settings = GpuShaderSettings {
            texture_binding_start: 3,
            ..Default::default()
        };
        let desc = GpuShaderDesc::build(vec![lut_op(64), lut_op(64)], settings).unwrap();
        assert_eq!(desc.textures.len(), 2);
        assert_eq!(desc.textures[0].binding, 3);
        assert_eq!(desc.textures[1].binding, 4);
    }

    #[test]
    fn wide_lut_wraps_to_rows() {
        let settings = GpuShaderSettings {
            max_lut1d_width: 1024,
            ..Default::default()
        };
        let desc = GpuShaderDesc::build(vec![lut_op(4096)], settings).unwrap();
        let tex = &desc.textures[0];
        assert_eq!(tex.width, 1024);
        assert_eq!(tex.height, 4);
        assert_eq!(tex.data.len(), 1024 * 4 * 3);
    }

    #[test]
    fn text_and_resources_come_from_one_build() {
        let desc =
            GpuShaderDesc::build(vec![lut_op(64), dynamic_ec()], GpuShaderSettings::default())
                .unwrap();
        assert!(desc.shader_text.contains(&desc.textures[0].name));
        assert!(desc.shader_text.contains(&desc.uniforms[0].name));
        assert!(!desc.cache_id().is_empty());
    }

    #[test]
    fn dynamic_scalar_becomes_uniform() {
        let desc = GpuShaderDesc::build(vec![dynamic_ec()], GpuShaderSettings::default()).unwrap();
        assert_eq!(desc.uniforms.len(), 1);
        assert_eq!(desc.uniforms[0].kind(), DynamicKind::Exposure);
        assert_eq!(desc.uniforms[0].value().unwrap(), 0.5);
        assert!(desc
            .shader_text
            .contains("uniform float chroma_apply_exposure_0;"));
    }

    #[test]
    fn uniform_reads_are_live_and_cache_id_is_not() {
        let desc = GpuShaderDesc::build(vec![dynamic_ec()], GpuShaderSettings::default()).unwrap();
        let id = desc.cache_id().to_string();
        desc.uniforms[0].property().set_scalar(2.5).unwrap();
        assert_eq!(desc.uniforms[0].value().unwrap(), 2.5);
        assert_eq!(desc.cache_id(), id);
    }

    #[test]
    fn static_ec_has_no_uniforms() {
        let op = Op::ExposureContrast {
            style: ExposureContrastStyle::Linear,
            pivot: 0.18,
            exposure: DynamicProperty::scalar(DynamicKind::Exposure, 0.5),
            contrast: DynamicProperty::scalar(DynamicKind::Contrast, 1.2),
            gamma: DynamicProperty::scalar(DynamicKind::Gamma, 1.0),
            dynamic: [false, false, false],
            forward: true,
        };
        let desc = GpuShaderDesc::build(vec![op], GpuShaderSettings::default()).unwrap();
        assert!(desc.uniforms.is_empty());
    }

    #[test]
    fn vulkan_layout_includes_set_and_binding() {
        let settings = GpuShaderSettings {
            language: ShaderLanguage::GlslVulkan,
            descriptor_set: 2,
            texture_binding_start: 1,
            ..Default::default()
        };
        let desc = GpuShaderDesc::build(vec![lut_op(16)], settings).unwrap();
        assert!(desc
            .shader_text
            .contains("layout(set = 2, binding = 1) uniform sampler2D"));
    }

    #[test]
    fn hlsl_uses_float_types_and_registers() {
        let settings = GpuShaderSettings {
            language: ShaderLanguage::Hlsl50,
            ..Default::default()
        };
        let desc = GpuShaderDesc::build(vec![scale_op(2.0), lut_op(16)], settings).unwrap();
        assert!(desc.shader_text.contains("float4 chroma_apply(float4 inPixel)"));
        assert!(desc.shader_text.contains(": register(t0)"));
        assert!(desc.shader_text.contains("SampleLevel"));
    }

    #[test]
    fn msl_textures_are_function_parameters() {
        let settings = GpuShaderSettings {
            language: ShaderLanguage::Msl,
            ..Default::default()
        };
        let desc = GpuShaderDesc::build(vec![lut_op(16)], settings).unwrap();
        assert!(desc.shader_text.contains("texture2d<float>"));
        assert!(desc.shader_text.contains("[[texture(0)]]"));
    }

    #[test]
    fn transfer_helper_emitted_once() {
        let ops = vec![
            Op::Transfer {
                style: TransferStyle::Srgb,
                forward: true,
            },
            Op::Transfer {
                style: TransferStyle::Srgb,
                forward: true,
            },
        ];
        let desc = GpuShaderDesc::build(ops, GpuShaderSettings::default()).unwrap();
        assert_eq!(desc.shader_text.matches("float chroma_apply_srgb_enc(").count(), 1);
    }

    #[test]
    fn shader_cache_id_differs_by_language() {
        let a = GpuShaderDesc::build(vec![scale_op(2.0)], GpuShaderSettings::default()).unwrap();
        let b = GpuShaderDesc::build(
            vec![scale_op(2.0)],
            GpuShaderSettings {
                language: ShaderLanguage::Hlsl50,
                ..Default::default()
            },
        )
        .unwrap();
        assert_ne!(a.cache_id(), b.cache_id());
    }
}
