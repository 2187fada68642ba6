//! Indentation-aware shader text builder.
//!
//! Every emitter writes through a [`GpuShaderText`]. Indentation is only
//! changed through guards: [`GpuShaderText::indent`] indents until the guard
//! drops, [`GpuShaderText::scope`] additionally writes the `{` / `}` pair.
//! An emitter that bails out with `?` halfway still leaves the depth balanced.
//!
//! ```
//! use vfx_ocio::{GpuLanguage, GpuShaderText};
//!
//! let mut ss = GpuShaderText::new(GpuLanguage::Glsl330);
//! {
//!     let mut block = ss.scope();
//!     block.line("outColor.rgb = max(outColor.rgb, 0.0);");
//! }
//! assert_eq!(ss.as_str(), "{\n  outColor.rgb = max(outColor.rgb, 0.0);\n}\n");
//! ```

use std::ops::{Deref, DerefMut};

use super::GpuLanguage;

const INDENT: &str = "  ";

/// Line-oriented shader source builder.
#[derive(Debug, Clone)]
pub struct GpuShaderText {
    language: GpuLanguage,
    text: String,
    depth: usize,
}

impl GpuShaderText {
    /// Empty builder for `language`.
    pub fn new(language: GpuLanguage) -> Self {
        Self {
            language,
            text: String::new(),
            depth: 0,
        }
    }

    /// Target language.
    #[inline]
    pub fn language(&self) -> GpuLanguage {
        self.language
    }

    /// Current nesting depth.
    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Appends one line at the current depth.
    pub fn line(&mut self, content: impl AsRef<str>) {
        let content = content.as_ref();
        if !content.is_empty() {
            for _ in 0..self.depth {
                self.text.push_str(INDENT);
            }
            self.text.push_str(content);
        }
        self.text.push('\n');
    }

    /// Indents until the returned guard is dropped.
    pub fn indent(&mut self) -> IndentGuard<'_> {
        self.depth += 1;
        IndentGuard { text: self }
    }

    /// Writes `{`, indents, and writes `}` when the returned guard drops.
    pub fn scope(&mut self) -> ScopeGuard<'_> {
        self.line("{");
        self.depth += 1;
        ScopeGuard { text: self }
    }

    /// Text written so far.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Consumes the builder, returning its text.
    pub fn into_string(self) -> String {
        self.text
    }

    /// `vec2` / `float2`.
    pub fn float2(&self) -> &'static str {
        if self.language.is_glsl() { "vec2" } else { "float2" }
    }

    /// `vec3` / `float3`.
    pub fn float3(&self) -> &'static str {
        if self.language.is_glsl() { "vec3" } else { "float3" }
    }

    /// `vec4` / `float4`.
    pub fn float4(&self) -> &'static str {
        if self.language.is_glsl() { "vec4" } else { "float4" }
    }

    /// Three component vector literal.
    pub fn float3_const(&self, v: [f64; 3]) -> String {
        format!(
            "{}({}, {}, {})",
            self.float3(),
            float_lit(v[0]),
            float_lit(v[1]),
            float_lit(v[2])
        )
    }

    /// Four component vector literal.
    pub fn float4_const(&self, v: [f64; 4]) -> String {
        format!(
            "{}({}, {}, {}, {})",
            self.float4(),
            float_lit(v[0]),
            float_lit(v[1]),
            float_lit(v[2]),
            float_lit(v[3])
        )
    }

    /// Linear blend `a + (b - a) * t`.
    pub fn lerp(&self, a: &str, b: &str, t: &str) -> String {
        if self.language.is_glsl() {
            format!("mix({a}, {b}, {t})")
        } else {
            format!("lerp({a}, {b}, {t})")
        }
    }

    /// Two argument arctangent.
    pub fn atan2(&self, y: &str, x: &str) -> String {
        if self.language.is_glsl() {
            format!("atan({y}, {x})")
        } else {
            format!("atan2({y}, {x})")
        }
    }

    /// Samples a 2D texture declared with [`GpuShaderText::declare_tex2d`].
    pub fn sample_tex2d(&self, name: &str, coords: &str) -> String {
        match self.language {
            GpuLanguage::Glsl120 => format!("texture2D({name}, {coords})"),
            GpuLanguage::Hlsl50 => format!("{name}.Sample({name}Sampler, {coords})"),
            _ => format!("texture({name}, {coords})"),
        }
    }

    /// Samples a 3D texture declared with [`GpuShaderText::declare_tex3d`].
    pub fn sample_tex3d(&self, name: &str, coords: &str) -> String {
        match self.language {
            GpuLanguage::Glsl120 => format!("texture3D({name}, {coords})"),
            GpuLanguage::Hlsl50 => format!("{name}.Sample({name}Sampler, {coords})"),
            _ => format!("texture({name}, {coords})"),
        }
    }

    /// Declares a 2D texture and, where the language needs one, its sampler.
    pub fn declare_tex2d(&mut self, name: &str) {
        match self.language {
            GpuLanguage::Hlsl50 => {
                self.line(format!("Texture2D<float4> {name};"));
                self.line(format!("SamplerState {name}Sampler;"));
            }
            GpuLanguage::GlslEs300 => self.line(format!("uniform highp sampler2D {name};")),
            _ => self.line(format!("uniform sampler2D {name};")),
        }
    }

    /// Declares a 3D texture and, where the language needs one, its sampler.
    pub fn declare_tex3d(&mut self, name: &str) {
        match self.language {
            GpuLanguage::Hlsl50 => {
                self.line(format!("Texture3D<float4> {name};"));
                self.line(format!("SamplerState {name}Sampler;"));
            }
            GpuLanguage::GlslEs300 => self.line(format!("uniform highp sampler3D {name};")),
            _ => self.line(format!("uniform sampler3D {name};")),
        }
    }
}

/// Formats a float so every shading language parses it as floating point.
///
/// ```
/// use vfx_ocio::gpu::float_lit;
///
/// assert_eq!(float_lit(1.0), "1.0");
/// assert_eq!(float_lit(-0.25), "-0.25");
/// assert_eq!(float_lit(1e-10), "1e-10");
/// ```
pub fn float_lit(v: f64) -> String {
    // Debug always keeps a '.' or an exponent
    format!("{:?}", v + 0.0)
}

/// Guard returned by [`GpuShaderText::indent`].
#[derive(Debug)]
pub struct IndentGuard<'a> {
    text: &'a mut GpuShaderText,
}

impl Deref for IndentGuard<'_> {
    type Target = GpuShaderText;

    fn deref(&self) -> &GpuShaderText {
        self.text
    }
}

impl DerefMut for IndentGuard<'_> {
    fn deref_mut(&mut self) -> &mut GpuShaderText {
        self.text
    }
}

impl Drop for IndentGuard<'_> {
    fn drop(&mut self) {
        self.text.depth -= 1;
    }
}

/// Guard returned by [`GpuShaderText::scope`].
#[derive(Debug)]
pub struct ScopeGuard<'a> {
    text: &'a mut GpuShaderText,
}

impl Deref for ScopeGuard<'_> {
    type Target = GpuShaderText;

    fn deref(&self) -> &GpuShaderText {
        self.text
    }
}

impl DerefMut for ScopeGuard<'_> {
    fn deref_mut(&mut self) -> &mut GpuShaderText {
        self.text
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.text.depth -= 1;
        self.text.line("}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failing_emit(ss: &mut GpuShaderText) -> Result<(), &'static str> {
        let mut block = ss.scope();
        block.line("float a = 1.0;");
        Err("emit failed")
    }

    #[test]
    fn nested_guards() {
        let mut ss = GpuShaderText::new(GpuLanguage::Glsl330);
        {
            let mut outer = ss.indent();
            let mut inner = outer.scope();
            inner.line("x;");
        }
        ss.line("y;");
        assert_eq!(ss.as_str(), "  {\n    x;\n  }\ny;\n");
    }

    #[test]
    fn early_return_rebalances_depth() {
        let mut ss = GpuShaderText::new(GpuLanguage::Glsl330);
        assert!(failing_emit(&mut ss).is_err());
        assert_eq!(ss.depth(), 0);
        assert!(ss.as_str().ends_with("}\n"));
    }

    #[test]
    fn language_keywords() {
        let glsl = GpuShaderText::new(GpuLanguage::Glsl120);
        let hlsl = GpuShaderText::new(GpuLanguage::Hlsl50);
        assert_eq!(glsl.float3_const([1.0, 0.5, 0.0]), "vec3(1.0, 0.5, 0.0)");
        assert_eq!(hlsl.float3_const([1.0, 0.5, 0.0]), "float3(1.0, 0.5, 0.0)");
        assert_eq!(glsl.lerp("a", "b", "t"), "mix(a, b, t)");
        assert_eq!(hlsl.atan2("y", "x"), "atan2(y, x)");
        assert_eq!(glsl.sample_tex3d("lut", "c"), "texture3D(lut, c)");
        assert_eq!(hlsl.sample_tex2d("lut", "c"), "lut.Sample(lutSampler, c)");
    }

    #[test]
    fn negative_zero_prints_as_zero() {
        assert_eq!(float_lit(-0.0), "0.0");
    }
}
