//! Shared prelude emitted at the top of both shader stages (§4.7).

use crate::builder::{Builder, line};
use crate::error::Error;
use gx_material::Material;

/// Which GLSL dialect to target. Selects the `#version` pragma (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlslTarget {
    /// `#version 300 es`, for WebGL2/mobile GLES contexts.
    WebGl,
    /// `#version 400`, the highest core profile Apple's OpenGL driver
    /// exposes.
    Apple,
    /// `#version 420`, everywhere else.
    Desktop,
}

impl GlslTarget {
    pub fn version_pragma(self) -> &'static str {
        match self {
            Self::WebGl => "#version 300 es",
            Self::Apple => "#version 400",
            Self::Desktop => "#version 420",
        }
    }

    /// `es` shaders need an explicit default float precision; desktop
    /// profiles don't have the concept.
    pub fn precision_pragma(self) -> Option<&'static str> {
        match self {
            Self::WebGl => Some("precision highp float;"),
            Self::Apple | Self::Desktop => None,
        }
    }

    pub fn supports_early_fragment_tests(self) -> bool {
        !matches!(self, Self::WebGl)
    }
}

pub fn write_version(b: &mut Builder, target: GlslTarget) -> Result<(), Error> {
    line!(b, "{}", target.version_pragma())?;
    if let Some(precision) = target.precision_pragma() {
        line!(b, "{precision}")?;
    }
    b.blank();
    Ok(())
}

/// `ub_SceneParams`: projection matrix plus misc scalars (`.x` = LOD bias).
pub fn write_scene_params(b: &mut Builder) -> Result<(), Error> {
    line!(b, "layout(std140) uniform ub_SceneParams {{")?;
    b.push_indent();
    line!(b, "mat4 u_Projection;")?;
    line!(b, "vec4 u_Misc0;")?;
    b.pop_indent();
    line!(b, "}};")?;
    b.blank();
    Ok(())
}

/// `ub_MaterialParams`: every per-material uniform the vertex and
/// fragment stages read. `u_PostTexMtx` and `u_LightParams` are only
/// emitted when the material actually uses post-matrices or lighting, to
/// keep unrelated materials' uniform blocks small.
pub fn write_material_params(b: &mut Builder, material: &Material) -> Result<(), Error> {
    let uses_post_matrix = material
        .tex_gens
        .iter()
        .any(|g| !matches!(g.post_matrix, gx_material::PostMatrixSelect::Identity));
    let uses_lighting = material.chan.iter().any(|c| c.color.enabled || c.alpha.enabled);

    line!(b, "layout(std140) uniform ub_MaterialParams {{")?;
    b.push_indent();
    line!(b, "vec4 u_ColorMatReg[2];")?;
    line!(b, "vec4 u_ColorAmbReg[2];")?;
    line!(b, "vec4 u_KonstColor[4];")?;
    line!(b, "vec4 u_Color[4];")?;
    line!(b, "mat4x3 u_TexMtx[10];")?;
    line!(b, "vec4 u_TextureParams[8];")?;
    line!(b, "mat4x2 u_IndTexMtx[3];")?;
    if uses_post_matrix {
        line!(b, "mat4x3 u_PostTexMtx[20];")?;
    }
    if uses_lighting {
        line!(b, "Light u_LightParams[8];")?;
    }
    b.pop_indent();
    line!(b, "}};")?;
    b.blank();
    Ok(())
}

/// `ub_PacketParams`: the per-draw-packet position matrix palette.
pub fn write_packet_params(b: &mut Builder) -> Result<(), Error> {
    line!(b, "layout(std140) uniform ub_PacketParams {{")?;
    b.push_indent();
    line!(b, "mat4x3 u_PosMtx[10];")?;
    b.pop_indent();
    line!(b, "}};")?;
    b.blank();
    Ok(())
}

pub fn write_light_struct(b: &mut Builder) -> Result<(), Error> {
    line!(b, "struct Light {{")?;
    b.push_indent();
    line!(b, "vec4 Position;")?;
    line!(b, "vec4 Direction;")?;
    line!(b, "vec4 DistAtten;")?;
    line!(b, "vec4 CosAtten;")?;
    line!(b, "vec4 Color;")?;
    b.pop_indent();
    line!(b, "}};")?;
    b.blank();
    Ok(())
}

pub fn write_texture_samplers(b: &mut Builder) -> Result<(), Error> {
    line!(b, "uniform sampler2D u_Texture[8];")?;
    b.blank();
    Ok(())
}
