//! GPU shader emission for finalized op pipelines.
//!
//! Ops append their code to a caller-owned [`GpuShaderDesc`]. The descriptor
//! collects three sections (resource declarations, helper functions, and the
//! body of one shader function), plus the list of textures the host must
//! upload and bind before running the compiled shader. Nothing here talks
//! to a GPU API.
//!
//! # Example
//!
//! ```
//! use vfx_ocio::{GpuLanguage, GpuShaderDesc, MatrixTransform, Processor, Transform, TransformDirection};
//!
//! let transform = Transform::Matrix(MatrixTransform::scale([2.0, 2.0, 2.0, 1.0]));
//! let processor = Processor::from_transform(&transform, TransformDirection::Forward).unwrap();
//!
//! let mut desc = GpuShaderDesc::new(GpuLanguage::Glsl330);
//! processor.extract_gpu_shader_info(&mut desc).unwrap();
//! assert!(desc.shader_text().contains("vec4 OCIOMain(vec4 inPixel)"));
//! ```

mod text;

pub use text::{GpuShaderText, IndentGuard, ScopeGuard, float_lit};

use serde::{Deserialize, Serialize};

/// Target shader language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GpuLanguage {
    /// GLSL 1.20 (OpenGL 2.1)
    #[serde(rename = "glsl_120")]
    Glsl120,
    /// GLSL 3.30 (OpenGL 3.3)
    #[default]
    #[serde(rename = "glsl_330")]
    Glsl330,
    /// GLSL 4.00 (OpenGL 4.0)
    #[serde(rename = "glsl_400")]
    Glsl400,
    /// GLSL ES 3.00 (WebGL 2.0)
    #[serde(rename = "glsl_es_300")]
    GlslEs300,
    /// HLSL Shader Model 5.0
    #[serde(rename = "hlsl_50")]
    Hlsl50,
}

impl GpuLanguage {
    /// Returns the version directive for this language.
    ///
    /// Emitted shader text never contains it; hosts prepend it when the
    /// generated function is the whole program.
    pub fn version_directive(&self) -> &'static str {
        match self {
            GpuLanguage::Glsl120 => "#version 120",
            GpuLanguage::Glsl330 => "#version 330 core",
            GpuLanguage::Glsl400 => "#version 400 core",
            GpuLanguage::GlslEs300 => "#version 300 es\nprecision highp float;",
            GpuLanguage::Hlsl50 => "",
        }
    }

    /// Returns true if this is a GLSL variant.
    pub fn is_glsl(&self) -> bool {
        matches!(
            self,
            GpuLanguage::Glsl120
                | GpuLanguage::Glsl330
                | GpuLanguage::Glsl400
                | GpuLanguage::GlslEs300
        )
    }

    /// Stable name, as used in configuration files.
    pub fn name(&self) -> &'static str {
        match self {
            GpuLanguage::Glsl120 => "glsl_120",
            GpuLanguage::Glsl330 => "glsl_330",
            GpuLanguage::Glsl400 => "glsl_400",
            GpuLanguage::GlslEs300 => "glsl_es_300",
            GpuLanguage::Hlsl50 => "hlsl_50",
        }
    }
}

/// GPU texture requirement for LUT sampling.
#[derive(Debug, Clone)]
pub struct GpuTexture {
    /// Name the shader refers to the texture by.
    pub name: String,
    /// Cache ID of the op that registered the texture.
    pub source_id: String,
    /// Texture type.
    pub texture_type: GpuTextureType,
    /// Texture width.
    pub width: u32,
    /// Texture height (1 for a single-row 2D texture).
    pub height: u32,
    /// Texture depth (1 for 2D textures).
    pub depth: u32,
    /// Texel data, RGB f32, x fastest.
    pub data: Vec<f32>,
    /// Filtering the host must configure.
    pub interpolation: GpuInterpolation,
}

/// Texture type for GPU LUTs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpuTextureType {
    /// 2D texture (1D LUTs, wrapped into rows).
    Texture2D,
    /// 3D texture (3D LUTs).
    Texture3D,
}

/// Texture interpolation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpuInterpolation {
    /// Nearest neighbor.
    Nearest,
    /// Linear interpolation.
    #[default]
    Linear,
}

/// Caller-owned accumulator for one generated shader function.
#[derive(Debug, Clone)]
pub struct GpuShaderDesc {
    language: GpuLanguage,
    function_name: String,
    pixel_name: String,
    resource_prefix: String,
    texture_max_width: u32,
    declarations: String,
    helpers: String,
    body: String,
    textures: Vec<GpuTexture>,
    processor_cache_id: String,
}

impl GpuShaderDesc {
    /// Descriptor with default names: function `OCIOMain`, pixel variable
    /// `outColor`, resource prefix `ocio`, 1D LUT rows up to 4096 texels.
    pub fn new(language: GpuLanguage) -> Self {
        Self {
            language,
            function_name: "OCIOMain".into(),
            pixel_name: "outColor".into(),
            resource_prefix: "ocio".into(),
            texture_max_width: 4096,
            declarations: String::new(),
            helpers: String::new(),
            body: String::new(),
            textures: Vec::new(),
            processor_cache_id: String::new(),
        }
    }

    /// Sets the generated function name.
    pub fn with_function_name(mut self, name: impl Into<String>) -> Self {
        self.function_name = name.into();
        self
    }

    /// Sets the name of the color variable ops read and write.
    pub fn with_pixel_name(mut self, name: impl Into<String>) -> Self {
        self.pixel_name = name.into();
        self
    }

    /// Sets the prefix of every generated resource name.
    pub fn with_resource_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.resource_prefix = prefix.into();
        self
    }

    /// Sets the maximum 2D texture width used for 1D LUTs (at least 2).
    pub fn with_texture_max_width(mut self, width: u32) -> Self {
        self.texture_max_width = width.max(2);
        self
    }

    /// Target language.
    pub fn language(&self) -> GpuLanguage {
        self.language
    }

    /// Generated function name.
    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    /// Color variable name.
    pub fn pixel_name(&self) -> &str {
        &self.pixel_name
    }

    /// Resource name prefix.
    pub fn resource_prefix(&self) -> &str {
        &self.resource_prefix
    }

    /// Maximum width of 1D LUT textures.
    pub fn texture_max_width(&self) -> u32 {
        self.texture_max_width
    }

    /// Fresh text builder for this descriptor's language.
    pub fn new_text(&self) -> GpuShaderText {
        GpuShaderText::new(self.language)
    }

    /// Textures the host must bind, in registration order.
    pub fn textures(&self) -> &[GpuTexture] {
        &self.textures
    }

    /// Texture registered by the op with cache ID `source_id`.
    pub fn find_texture(&self, source_id: &str) -> Option<&GpuTexture> {
        self.textures.iter().find(|t| t.source_id == source_id)
    }

    /// Registers a texture and declares it, returning its shader name.
    ///
    /// The name is `{prefix}_{stem}_{index}`. A second registration from an
    /// op with the same cache ID returns the existing name without declaring
    /// anything.
    pub fn add_texture(
        &mut self,
        stem: &str,
        source_id: &str,
        texture_type: GpuTextureType,
        dimensions: [u32; 3],
        data: Vec<f32>,
        interpolation: GpuInterpolation,
    ) -> String {
        if let Some(existing) = self.find_texture(source_id) {
            return existing.name.clone();
        }
        let name = format!("{}_{}_{}", self.resource_prefix, stem, self.textures.len());

        let mut decl = self.new_text();
        match texture_type {
            GpuTextureType::Texture2D => decl.declare_tex2d(&name),
            GpuTextureType::Texture3D => decl.declare_tex3d(&name),
        }
        self.declarations.push_str(decl.as_str());

        self.textures.push(GpuTexture {
            name: name.clone(),
            source_id: source_id.to_string(),
            texture_type,
            width: dimensions[0],
            height: dimensions[1],
            depth: dimensions[2],
            data,
            interpolation,
        });
        name
    }

    /// Appends helper function code.
    pub fn add_to_helper_shader_code(&mut self, code: &str) {
        self.helpers.push_str(code);
    }

    /// Appends code to the function body.
    pub fn add_to_function_shader_code(&mut self, code: &str) {
        self.body.push_str(code);
    }

    /// Resource declarations emitted so far.
    pub fn declarations(&self) -> &str {
        &self.declarations
    }

    /// Helper functions emitted so far.
    pub fn helpers(&self) -> &str {
        &self.helpers
    }

    /// Function body emitted so far.
    pub fn function_body(&self) -> &str {
        &self.body
    }

    pub(crate) fn set_processor_cache_id(&mut self, id: &str) {
        self.processor_cache_id = id.to_string();
    }

    /// Fingerprint of the generated program.
    pub fn cache_id(&self) -> String {
        format!(
            "{} {} {} {} {}",
            self.language.name(),
            self.function_name,
            self.pixel_name,
            self.resource_prefix,
            self.processor_cache_id
        )
    }

    /// Complete shader source: declarations, helpers, and the function.
    pub fn shader_text(&self) -> String {
        let mut ss = self.new_text();
        ss.line("");
        ss.line("// Declaration of all variables");
        ss.line("");
        let mut out = ss.into_string();
        out.push_str(&self.declarations);

        let mut ss = self.new_text();
        ss.line("");
        ss.line("// Declaration of all helper methods");
        ss.line("");
        out.push_str(ss.as_str());
        out.push_str(&self.helpers);

        let float4 = if self.language.is_glsl() { "vec4" } else { "float4" };
        let mut ss = self.new_text();
        ss.line("");
        ss.line(format!("// Declaration of the shader function {}", self.function_name));
        ss.line("");
        if self.language.is_glsl() {
            ss.line(format!("{float4} {}({float4} inPixel)", self.function_name));
        } else {
            ss.line(format!("{float4} {}(in {float4} inPixel)", self.function_name));
        }
        ss.line("{");
        {
            let mut inner = ss.indent();
            inner.line(format!("{float4} {} = inPixel;", self.pixel_name));
        }
        out.push_str(ss.as_str());
        out.push_str(&self.body);

        let mut ss = self.new_text();
        ss.line("");
        {
            let mut inner = ss.indent();
            inner.line(format!("return {};", self.pixel_name));
        }
        ss.line("}");
        out.push_str(ss.as_str());
        out
    }
}
