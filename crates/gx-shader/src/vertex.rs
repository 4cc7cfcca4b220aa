//! Vertex stage generation (§4.7 "Vertex stage").

use gx_material::{AttenuationFn, ChannelControl, DiffuseFn, Material, PostMatrixSelect, TexGenFunc, TexGenSource};

use crate::builder::{Builder, line};
use crate::error::Error;
use crate::prelude::{self, GlslTarget};

/// Matrix-index convention shared by `GetPosTexMatrix`: position/normal
/// matrices occupy raw indices `[0, 30)` (10 matrices, 3 rows each);
/// texture matrices occupy `[64, 94)` with the same row stride. `0xff`
/// is the "use the static default" sentinel. This mirrors the indexing
/// convention real GX titles' vertex streams use (recorded as an Open
/// Question decision in DESIGN.md).
const TEX_MATRIX_INDEX_BASE: u32 = 64;

pub fn generate(b: &mut Builder, material: &Material, target: GlslTarget) -> Result<(), Error> {
    prelude::write_version(b, target)?;
    prelude::write_scene_params(b)?;
    let uses_lighting = material.chan.iter().any(|c| c.color.enabled || c.alpha.enabled);
    if uses_lighting {
        prelude::write_light_struct(b)?;
    }
    prelude::write_material_params(b, material)?;
    prelude::write_packet_params(b)?;
    b.blank();

    write_attributes(b)?;
    write_varyings(b, material)?;
    write_matrix_helper(b)?;
    if uses_lighting {
        write_lighting_helpers(b)?;
    }

    line!(b, "void main() {{")?;
    b.push_indent();
    line!(b, "mat4x3 t_PosMtx = GetPosTexMatrix(uint(a_PosMtxIdx));")?;
    line!(b, "vec3 t_Position = t_PosMtx * vec4(a_Position, 1.0);")?;
    line!(b, "vec3 t_Normal = normalize(mat3(t_PosMtx) * a_Normal);")?;
    line!(b, "gl_Position = u_Projection * vec4(t_Position, 1.0);")?;
    b.blank();

    for channel in 0..2 {
        write_channel(b, material, channel)?;
    }
    b.blank();

    for (index, gen) in material.tex_gens.iter().enumerate() {
        write_texgen(b, index, gen)?;
    }

    line!(b, "v_PrimID = a_PrimID;")?;
    b.pop_indent();
    line!(b, "}}")?;
    Ok(())
}

fn write_attributes(b: &mut Builder) -> Result<(), Error> {
    line!(b, "layout(location = 0) in vec3 a_Position;")?;
    line!(b, "layout(location = 1) in float a_PosMtxIdx;")?;
    line!(b, "layout(location = 2) in vec4 a_TexMtxIdx0123;")?;
    line!(b, "layout(location = 3) in vec4 a_TexMtxIdx4567;")?;
    line!(b, "layout(location = 4) in vec3 a_Normal;")?;
    line!(b, "layout(location = 5) in vec4 a_Color0;")?;
    line!(b, "layout(location = 6) in vec4 a_Color1;")?;
    for i in 0..8 {
        line!(b, "layout(location = {}) in vec2 a_TexCoord{i};", 7 + i)?;
    }
    line!(b, "layout(location = 15) in vec4 a_PrimID;")?;
    b.blank();
    Ok(())
}

fn write_varyings(b: &mut Builder, material: &Material) -> Result<(), Error> {
    line!(b, "out vec4 v_Color0;")?;
    line!(b, "out vec4 v_Color1;")?;
    for i in 0..material.tex_gens.len() {
        line!(b, "out vec3 v_TexCoord{i};")?;
    }
    line!(b, "out vec4 v_PrimID;")?;
    b.blank();
    Ok(())
}

fn write_matrix_helper(b: &mut Builder) -> Result<(), Error> {
    line!(b, "mat4x3 GetPosTexMatrix(uint t_Idx) {{")?;
    b.push_indent();
    line!(b, "if (t_Idx == 0xffu) {{")?;
    b.push_indent();
    line!(b, "return mat4x3(1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0);")?;
    b.pop_indent();
    line!(b, "}} else if (t_Idx < {TEX_MATRIX_INDEX_BASE}u) {{")?;
    b.push_indent();
    line!(b, "return u_PosMtx[t_Idx / 3u];")?;
    b.pop_indent();
    line!(b, "}} else {{")?;
    b.push_indent();
    line!(b, "return u_TexMtx[(t_Idx - {TEX_MATRIX_INDEX_BASE}u) / 3u];")?;
    b.pop_indent();
    line!(b, "}}")?;
    b.pop_indent();
    line!(b, "}}")?;
    b.blank();
    Ok(())
}

/// `ApplyCubic(CosAtten, dot(L, dir))`, the spotlight angle-attenuation
/// polynomial GX evaluates (§4.7).
fn write_lighting_helpers(b: &mut Builder) -> Result<(), Error> {
    line!(b, "float ApplyCubic(vec3 t_Coeff, float t_Value) {{")?;
    b.push_indent();
    line!(b, "return max(0.0, t_Coeff.z * t_Value * t_Value + t_Coeff.y * t_Value + t_Coeff.x);")?;
    b.pop_indent();
    line!(b, "}}")?;
    b.blank();
    Ok(())
}

fn write_channel(b: &mut Builder, material: &Material, channel: usize) -> Result<(), Error> {
    let control = &material.chan[channel];

    write_sub_channel(b, channel, "Color", &control.color)?;
    write_sub_channel(b, channel, "Alpha", &control.alpha)?;

    line!(
        b,
        "v_Color{channel} = vec4(t_Chan{channel}Color.rgb, t_Chan{channel}Alpha.a);"
    )?;
    Ok(())
}

fn write_sub_channel(b: &mut Builder, channel: usize, name: &str, control: &ChannelControl) -> Result<(), Error> {
    let mat_expr = match control.mat_source {
        gx_material::ColorSource::Vertex => format!("a_Color{channel}"),
        gx_material::ColorSource::Register => format!("u_ColorMatReg[{channel}]"),
    };
    let amb_expr = match control.amb_source {
        gx_material::ColorSource::Vertex => format!("a_Color{channel}"),
        gx_material::ColorSource::Register => format!("u_ColorAmbReg[{channel}]"),
    };

    line!(b, "vec4 t_Chan{channel}{name};")?;
    if !control.enabled {
        line!(b, "t_Chan{channel}{name} = {mat_expr};")?;
        return Ok(());
    }

    line!(b, "{{")?;
    b.push_indent();
    line!(b, "vec4 t_Accum = {amb_expr};")?;
    for light in 0..8u32 {
        line!(b, "if (({} & (1u << {light}u)) != 0u) {{", control.light_mask)?;
        b.push_indent();
        line!(b, "vec3 t_LightDelta = u_LightParams[{light}].Position.xyz - t_Position;")?;
        line!(b, "vec3 t_LightDir = normalize(t_LightDelta);")?;
        line!(b, "float t_NDotL = dot(t_Normal, t_LightDir);")?;
        let diffuse = match control.diffuse_fn {
            DiffuseFn::None => "1.0".to_string(),
            DiffuseFn::Sign => "t_NDotL".to_string(),
            DiffuseFn::Clamp => "max(t_NDotL, 0.0)".to_string(),
        };
        line!(b, "float t_Diffuse = {diffuse};")?;
        let atten = match control.attenuation_fn {
            AttenuationFn::None => "1.0".to_string(),
            AttenuationFn::Spec => format!("ApplyCubic(u_LightParams[{light}].DistAtten.xyz, max(t_NDotL, 0.0))"),
            AttenuationFn::Spot => format!(
                "ApplyCubic(u_LightParams[{light}].CosAtten.xyz, dot(t_LightDir, \
                 u_LightParams[{light}].Direction.xyz)) / dot(u_LightParams[{light}].DistAtten.xyz, \
                 vec3(1.0, length(t_LightDelta), dot(t_LightDelta, t_LightDelta)))"
            ),
        };
        line!(b, "float t_Atten = {atten};")?;
        line!(b, "t_Accum += t_Diffuse * t_Atten * u_LightParams[{light}].Color;")?;
        b.pop_indent();
        line!(b, "}}")?;
    }
    line!(b, "t_Chan{channel}{name} = {mat_expr} * clamp(t_Accum, 0.0, 1.0);")?;
    b.pop_indent();
    line!(b, "}}")?;
    Ok(())
}

fn write_texgen(b: &mut Builder, index: usize, gen: &gx_material::TexGen) -> Result<(), Error> {
    let source = texgen_source_expr(gen.source);

    let transformed = match gen.func {
        TexGenFunc::Matrix3x4 => {
            let matrix_idx = texgen_matrix_index(index);
            format!("GetPosTexMatrix({matrix_idx}) * vec4({source}, 1.0)")
        }
        TexGenFunc::Matrix2x4 => {
            let matrix_idx = texgen_matrix_index(index);
            format!("vec3((GetPosTexMatrix({matrix_idx}) * vec4({source}, 1.0)).xy, 1.0)")
        }
        TexGenFunc::Srtg => format!("vec3(({source}).xy, 1.0)"),
        TexGenFunc::Bump0
        | TexGenFunc::Bump1
        | TexGenFunc::Bump2
        | TexGenFunc::Bump3
        | TexGenFunc::Bump4
        | TexGenFunc::Bump5
        | TexGenFunc::Bump6
        | TexGenFunc::Bump7 => format!("vec3(({source}).xy, 1.0)"),
    };

    line!(b, "vec3 t_TexCoord{index} = {transformed};")?;
    if gen.normalize {
        line!(b, "t_TexCoord{index} = normalize(t_TexCoord{index});")?;
    }

    let post_expr = match gen.post_matrix {
        PostMatrixSelect::Identity => format!("t_TexCoord{index}"),
        PostMatrixSelect::Matrix(idx) => format!("u_PostTexMtx[{idx}] * vec4(t_TexCoord{index}, 1.0)"),
    };
    line!(b, "v_TexCoord{index} = {post_expr};")?;
    Ok(())
}

/// Texgen `index`'s dynamic matrix-index attribute component: texgens 0-3
/// pack into `a_TexMtxIdx0123`, texgens 4-7 into `a_TexMtxIdx4567`.
fn texgen_matrix_index(index: usize) -> String {
    let attr = if index < 4 { "a_TexMtxIdx0123" } else { "a_TexMtxIdx4567" };
    let swizzle = ["x", "y", "z", "w"][index % 4];
    format!("uint({attr}.{swizzle})")
}

fn texgen_source_expr(source: TexGenSource) -> String {
    match source {
        TexGenSource::Position => "t_Position".to_string(),
        TexGenSource::Normal => "t_Normal".to_string(),
        TexGenSource::Binormal | TexGenSource::Tangent => "t_Normal".to_string(),
        TexGenSource::Tex0 => "vec3(a_TexCoord0, 1.0)".to_string(),
        TexGenSource::Tex1 => "vec3(a_TexCoord1, 1.0)".to_string(),
        TexGenSource::Tex2 => "vec3(a_TexCoord2, 1.0)".to_string(),
        TexGenSource::Tex3 => "vec3(a_TexCoord3, 1.0)".to_string(),
        TexGenSource::Tex4 => "vec3(a_TexCoord4, 1.0)".to_string(),
        TexGenSource::Tex5 => "vec3(a_TexCoord5, 1.0)".to_string(),
        TexGenSource::Tex6 => "vec3(a_TexCoord6, 1.0)".to_string(),
        TexGenSource::Tex7 => "vec3(a_TexCoord7, 1.0)".to_string(),
        TexGenSource::Color0 => "a_Color0.rgb".to_string(),
        TexGenSource::Color1 => "a_Color1.rgb".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_nonempty_vertex_source_for_default_material() {
        let material = Material::default();
        let mut b = Builder::new();
        generate(&mut b, &material, GlslTarget::Desktop).unwrap();
        let text = b.finish();
        assert!(text.contains("void main()"));
        assert!(text.contains("gl_Position"));
    }

    #[test]
    fn texgen_with_matrix_emits_texgen_matrix_multiply() {
        let mut material = Material::default();
        material.tex_gens.push(gx_material::TexGen {
            func: TexGenFunc::Matrix2x4,
            source: TexGenSource::Tex0,
            ..Default::default()
        });
        material.samplers.push(gx_material::Sampler::default());
        let mut b = Builder::new();
        generate(&mut b, &material, GlslTarget::Desktop).unwrap();
        let text = b.finish();
        assert!(text.contains("t_TexCoord0"));
        assert!(text.contains("v_TexCoord0"));
    }
}
