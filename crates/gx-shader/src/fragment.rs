//! Fragment stage generation (§4.7 "Fragment stage").

use gx_material::tev::{
    AlphaInput, ColorInput, IndirectAlphaSelect, IndirectBias, IndirectMatrixSelect, IndirectWrap, Konst, RasChannel,
    TevFormula,
};
use gx_material::{AlphaLogic, CompareFunction, Material, SwapChannel, SwapTableEntry, TevStage};
use gx_simplify::{Arena, Operand, Simplified};

use crate::builder::{Builder, line};
use crate::error::Error;
use crate::prelude::{self, GlslTarget};

#[derive(Debug, Clone, Copy, Default)]
pub struct GenOptions {
    /// Replaces the final fragment output with `v_PrimID`, for tooling
    /// that visualizes which primitive produced a pixel (§4.7).
    pub visualize_primitive_id: bool,
}

pub fn generate(b: &mut Builder, material: &Material, target: GlslTarget, options: &GenOptions) -> Result<(), Error> {
    if material.tex_gens.len() != material.samplers.len() {
        return Err(Error::TexGenSamplerMismatch {
            tex_gens: material.tex_gens.len(),
            samplers: material.samplers.len(),
        });
    }

    prelude::write_version(b, target)?;
    prelude::write_scene_params(b)?;
    let uses_lighting = material.chan.iter().any(|c| c.color.enabled || c.alpha.enabled);
    if uses_lighting {
        prelude::write_light_struct(b)?;
    }
    prelude::write_material_params(b, material)?;
    prelude::write_texture_samplers(b)?;
    b.blank();

    write_varyings_in(b, material)?;
    line!(b, "out vec4 o_Color;")?;
    b.blank();

    if material.early_z_comparison && target.supports_early_fragment_tests() {
        line!(b, "layout(early_fragment_tests) in;")?;
        b.blank();
    }

    write_helpers(b)?;

    line!(b, "void main() {{")?;
    b.push_indent();

    write_indirect_prestage(b, material)?;

    line!(b, "vec4 t_Reg[4];")?;
    line!(b, "t_Reg[0] = u_Color[0];")?;
    line!(b, "t_Reg[1] = u_Color[1];")?;
    line!(b, "t_Reg[2] = u_Color[2];")?;
    line!(b, "t_Reg[3] = u_Color[3];")?;
    b.blank();

    for (index, stage) in material.stages.iter().enumerate() {
        write_stage(b, material, index, stage)?;
    }
    b.blank();

    let last_stage = material.stages.last().ok_or(Error::NoStages)?;
    let last = output_register_index(last_stage);
    line!(b, "vec4 t_TevOutput = t_Reg[{last}];")?;
    b.blank();

    write_alpha_test(b, material)?;
    write_dst_alpha(b, material)?;

    if options.visualize_primitive_id {
        line!(b, "o_Color = v_PrimID;")?;
    } else {
        line!(b, "o_Color = t_TevOutput;")?;
    }

    b.pop_indent();
    line!(b, "}}")?;
    Ok(())
}

fn output_register_index(stage: &TevStage) -> u8 {
    match stage.color.output {
        gx_material::tev::TevOutput::Prev => 0,
        gx_material::tev::TevOutput::Reg0 => 1,
        gx_material::tev::TevOutput::Reg1 => 2,
        gx_material::tev::TevOutput::Reg2 => 3,
    }
}

fn write_varyings_in(b: &mut Builder, material: &Material) -> Result<(), Error> {
    line!(b, "in vec4 v_Color0;")?;
    line!(b, "in vec4 v_Color1;")?;
    for i in 0..material.tex_gens.len() {
        line!(b, "in vec3 v_TexCoord{i};")?;
    }
    line!(b, "in vec4 v_PrimID;")?;
    b.blank();
    Ok(())
}

fn write_helpers(b: &mut Builder) -> Result<(), Error> {
    line!(b, "vec3 TevOverflow(vec3 x) {{ return mod(x, 1.0); }}")?;
    line!(b, "float TevSaturate(float x) {{ return clamp(x, 0.0, 1.0); }}")?;
    line!(b, "vec3 TevBias(vec3 x, float bias) {{ return x + vec3(bias); }}")?;
    line!(b, "float TevPack16(vec3 x) {{")?;
    b.push_indent();
    line!(b, "return floor(x.g * 255.0 + 0.5) * 256.0 + floor(x.r * 255.0 + 0.5);")?;
    b.pop_indent();
    line!(b, "}}")?;
    line!(b, "float TevPack24(vec3 x) {{")?;
    b.push_indent();
    line!(
        b,
        "return floor(x.b * 255.0 + 0.5) * 65536.0 + floor(x.g * 255.0 + 0.5) * 256.0 + floor(x.r * 255.0 + 0.5);"
    )?;
    b.pop_indent();
    line!(b, "}}")?;
    line!(b, "vec3 TevPerCompGT(vec3 a, vec3 b) {{ return vec3(greaterThan(a, b)); }}")?;
    line!(b, "vec3 TevPerCompEQ(vec3 a, vec3 b) {{ return vec3(equal(a, b)); }}")?;
    line!(b, "vec4 TextureLODBias(sampler2D tex, vec2 coord, float bias) {{")?;
    b.push_indent();
    line!(b, "return texture(tex, coord, bias);")?;
    b.pop_indent();
    line!(b, "}}")?;
    line!(b, "vec2 TextureInvScale(int texIdx) {{ return 1.0 / u_TextureParams[texIdx].xy; }}")?;
    b.blank();
    Ok(())
}

fn write_indirect_prestage(b: &mut Builder, material: &Material) -> Result<(), Error> {
    for (k, stage) in material.indirect_stages.iter().enumerate() {
        let tex_coord_index = stage.ref_coord.min(material.tex_gens.len().saturating_sub(1) as u8);
        line!(
            b,
            "vec3 t_IndTexCoord{k} = 255.0 * texture(u_Texture[{}], v_TexCoord{tex_coord_index}.xy).abg;",
            stage.ref_map
        )?;
        line!(
            b,
            "t_IndTexCoord{k}.xy *= vec2({}, {});",
            indirect_scale_factor(stage.scale_s),
            indirect_scale_factor(stage.scale_t)
        )?;
    }
    b.blank();
    Ok(())
}

fn indirect_scale_factor(scale: gx_material::indirect::IndirectScale) -> f32 {
    use gx_material::indirect::IndirectScale as S;
    match scale {
        S::X1 => 1.0,
        S::X2 => 1.0 / 2.0,
        S::X4 => 1.0 / 4.0,
        S::X8 => 1.0 / 8.0,
        S::X16 => 1.0 / 16.0,
        S::X32 => 1.0 / 32.0,
        S::X64 => 1.0 / 64.0,
        S::X128 => 1.0 / 128.0,
        S::X256 => 1.0 / 256.0,
    }
}

fn write_stage(b: &mut Builder, material: &Material, index: usize, stage: &TevStage) -> Result<(), Error> {
    line!(b, "// stage {index}")?;

    write_stage_tex_coord(b, material, index, stage)?;
    write_stage_samples(b, material, index, stage)?;

    let color_dest = format!("t_Reg[{}]", output_register_index(stage));

    write_color_substage(b, index, stage, &color_dest)?;
    write_alpha_substage(b, index, stage, &color_dest)?;

    b.blank();
    Ok(())
}

fn write_stage_tex_coord(b: &mut Builder, material: &Material, index: usize, stage: &TevStage) -> Result<(), Error> {
    let Some(tex_coord) = stage.tex_coord else {
        line!(b, "vec2 t_Stage{index}TexCoord = vec2(0.0);")?;
        return Ok(());
    };
    let clamped = (tex_coord as usize).min(material.tex_gens.len().saturating_sub(1));
    line!(b, "vec2 t_Stage{index}TexCoord = v_TexCoord{clamped}.xy;")?;

    let wrap = |dim: char, wrap: IndirectWrap| -> Option<String> {
        match wrap {
            IndirectWrap::Off => None,
            IndirectWrap::Zero => Some(format!("t_Stage{index}TexCoord.{dim} = 0.0;")),
            IndirectWrap::W16 => Some(format!("t_Stage{index}TexCoord.{dim} = mod(t_Stage{index}TexCoord.{dim}, 16.0);")),
            IndirectWrap::W32 => Some(format!("t_Stage{index}TexCoord.{dim} = mod(t_Stage{index}TexCoord.{dim}, 32.0);")),
            IndirectWrap::W64 => Some(format!("t_Stage{index}TexCoord.{dim} = mod(t_Stage{index}TexCoord.{dim}, 64.0);")),
            IndirectWrap::W128 => Some(format!("t_Stage{index}TexCoord.{dim} = mod(t_Stage{index}TexCoord.{dim}, 128.0);")),
            IndirectWrap::W256 => Some(format!("t_Stage{index}TexCoord.{dim} = mod(t_Stage{index}TexCoord.{dim}, 256.0);")),
        }
    };
    if let Some(line_text) = wrap('x', stage.indirect.wrap_u) {
        line!(b, "{line_text}")?;
    }
    if let Some(line_text) = wrap('y', stage.indirect.wrap_v) {
        line!(b, "{line_text}")?;
    }

    let matrix_id = match stage.indirect.matrix {
        IndirectMatrixSelect::Off => None,
        IndirectMatrixSelect::Matrix0 => Some(0u8),
        IndirectMatrixSelect::Matrix1 => Some(1),
        IndirectMatrixSelect::Matrix2 => Some(2),
    };
    if let Some(matrix_id) = matrix_id {
        if matrix_id as usize >= material.ind_matrices.len() {
            return Err(Error::UnsupportedIndirectMatrixSelect {
                stage: index,
                selection: stage.indirect.matrix,
            });
        }
        let biased = indirect_bias_expr(stage.indirect.bias, stage.indirect.stage_sel);
        let tex_idx = stage.tex_map.unwrap_or(0);
        line!(
            b,
            "t_Stage{index}TexCoord += (u_IndTexMtx[{matrix_id}] * vec4({biased}, 0.0)) * TextureInvScale({tex_idx});"
        )?;
    }

    if stage.indirect.add_prev {
        match index.checked_sub(1) {
            Some(prev) => line!(b, "t_Stage{index}TexCoord += t_Stage{prev}TexCoord;")?,
            None => tracing::warn!(stage = index, "add_prev set on the first stage, nothing to add"),
        }
    }
    Ok(())
}

fn indirect_bias_expr(bias: IndirectBias, stage_sel: u8) -> String {
    let coord = format!("t_IndTexCoord{stage_sel}");
    match bias {
        IndirectBias::None => format!("{coord}.xy"),
        IndirectBias::S => format!("vec2({coord}.x - 128.0, 0.0)"),
        IndirectBias::T => format!("vec2(0.0, {coord}.y - 128.0)"),
        IndirectBias::U => format!("vec2({coord}.x, {coord}.x) - 128.0"),
        IndirectBias::St => format!("{coord}.xy - 128.0"),
        IndirectBias::Su => format!("vec2({coord}.x - 128.0, {coord}.x - 128.0)"),
        IndirectBias::Tu => format!("vec2({coord}.x, {coord}.y) - 128.0"),
        IndirectBias::Stu => format!("{coord}.xy - 128.0"),
    }
}

fn write_stage_samples(b: &mut Builder, material: &Material, index: usize, stage: &TevStage) -> Result<(), Error> {
    if let Some(tex_map) = stage.tex_map {
        let swap = material.swap_table[stage.tex_swap as usize % 4];
        let lod_bias = material
            .samplers
            .get(tex_map as usize)
            .map(|s| s.lod_bias())
            .unwrap_or(0.0);
        line!(
            b,
            "vec4 t_Stage{index}Tex = {};",
            apply_swap(
                &format!("TextureLODBias(u_Texture[{tex_map}], t_Stage{index}TexCoord, {lod_bias:.6})"),
                swap
            )
        )?;
    } else {
        line!(b, "vec4 t_Stage{index}Tex = vec4(1.0);")?;
    }

    let ras_expr = match stage.ras_order {
        RasChannel::Channel0 => "v_Color0".to_string(),
        RasChannel::Channel1 => "v_Color1".to_string(),
        RasChannel::AlphaBump => format!("vec4(0.0, 0.0, 0.0, {})", bump_alpha_expr(stage, false)),
        RasChannel::AlphaBumpNormalized => format!("vec4(0.0, 0.0, 0.0, {})", bump_alpha_expr(stage, true)),
        RasChannel::Zero => "vec4(0.0)".to_string(),
    };
    let swap = material.swap_table[stage.ras_swap as usize % 4];
    line!(b, "vec4 t_Stage{index}Ras = {};", apply_swap(&ras_expr, swap))?;

    line!(
        b,
        "vec4 t_Stage{index}Konst = {};",
        konst_color_expr(stage.konst_color)
    )?;
    line!(
        b,
        "float t_Stage{index}KonstA = {};",
        konst_alpha_expr(stage.konst_alpha)
    )?;
    Ok(())
}

/// The rasterizer's "bump alpha" channel: one component of the indirect
/// texture lookup the stage's own `IND_CMD` slot produced, read out as an
/// alpha value instead of fed back into the texcoord (§3.2's `RasChannel`).
fn bump_alpha_expr(stage: &TevStage, normalized: bool) -> String {
    let coord = format!("t_IndTexCoord{}", stage.indirect.stage_sel);
    let component = match stage.indirect.alpha {
        IndirectAlphaSelect::Off => return "0.0".to_string(),
        IndirectAlphaSelect::S => format!("{coord}.x"),
        IndirectAlphaSelect::T => format!("{coord}.y"),
        IndirectAlphaSelect::U => format!("{coord}.z"),
    };
    if normalized {
        format!("({component} / 255.0)")
    } else {
        format!("({component} / 256.0)")
    }
}

fn apply_swap(expr: &str, swap: SwapTableEntry) -> String {
    fn ch(c: SwapChannel) -> &'static str {
        match c {
            SwapChannel::R => "r",
            SwapChannel::G => "g",
            SwapChannel::B => "b",
            SwapChannel::A => "a",
        }
    }
    format!("({expr}).{}{}{}{}", ch(swap.r), ch(swap.g), ch(swap.b), ch(swap.a))
}

fn konst_color_expr(konst: Konst) -> String {
    use Konst::*;
    match konst {
        One => "vec4(1.0)".to_string(),
        SevenEighths => "vec4(7.0 / 8.0)".to_string(),
        ThreeQuarters => "vec4(3.0 / 4.0)".to_string(),
        FiveEighths => "vec4(5.0 / 8.0)".to_string(),
        Half => "vec4(0.5)".to_string(),
        ThreeEighths => "vec4(3.0 / 8.0)".to_string(),
        OneQuarter => "vec4(1.0 / 4.0)".to_string(),
        OneEighth => "vec4(1.0 / 8.0)".to_string(),
        Const0Rgb => "u_KonstColor[0]".to_string(),
        Const1Rgb => "u_KonstColor[1]".to_string(),
        Const2Rgb => "u_KonstColor[2]".to_string(),
        Const3Rgb => "u_KonstColor[3]".to_string(),
        Const0R => "u_KonstColor[0].rrrr".to_string(),
        Const1R => "u_KonstColor[1].rrrr".to_string(),
        Const2R => "u_KonstColor[2].rrrr".to_string(),
        Const3R => "u_KonstColor[3].rrrr".to_string(),
        Const0G => "u_KonstColor[0].gggg".to_string(),
        Const1G => "u_KonstColor[1].gggg".to_string(),
        Const2G => "u_KonstColor[2].gggg".to_string(),
        Const3G => "u_KonstColor[3].gggg".to_string(),
        Const0B => "u_KonstColor[0].bbbb".to_string(),
        Const1B => "u_KonstColor[1].bbbb".to_string(),
        Const2B => "u_KonstColor[2].bbbb".to_string(),
        Const3B => "u_KonstColor[3].bbbb".to_string(),
        Const0A => "u_KonstColor[0].aaaa".to_string(),
        Const1A => "u_KonstColor[1].aaaa".to_string(),
        Const2A => "u_KonstColor[2].aaaa".to_string(),
        Const3A => "u_KonstColor[3].aaaa".to_string(),
    }
}

fn konst_alpha_expr(konst: Konst) -> String {
    use Konst::*;
    match konst {
        One => "1.0".to_string(),
        SevenEighths => "(7.0 / 8.0)".to_string(),
        ThreeQuarters => "(3.0 / 4.0)".to_string(),
        FiveEighths => "(5.0 / 8.0)".to_string(),
        Half => "0.5".to_string(),
        ThreeEighths => "(3.0 / 8.0)".to_string(),
        OneQuarter => "(1.0 / 4.0)".to_string(),
        OneEighth => "(1.0 / 8.0)".to_string(),
        Const0Rgb | Const0R | Const0G | Const0B | Const0A => "u_KonstColor[0].a".to_string(),
        Const1Rgb | Const1R | Const1G | Const1B | Const1A => "u_KonstColor[1].a".to_string(),
        Const2Rgb | Const2R | Const2G | Const2B | Const2A => "u_KonstColor[2].a".to_string(),
        Const3Rgb | Const3R | Const3G | Const3B | Const3A => "u_KonstColor[3].a".to_string(),
    }
}

fn color_input_expr(index: usize, input: ColorInput) -> (String, Option<Operand>) {
    let expr = match input {
        ColorInput::PrevColor => "t_Reg[0].rgb".to_string(),
        ColorInput::PrevAlpha => "t_Reg[0].aaa".to_string(),
        ColorInput::Reg0Color => "t_Reg[1].rgb".to_string(),
        ColorInput::Reg0Alpha => "t_Reg[1].aaa".to_string(),
        ColorInput::Reg1Color => "t_Reg[2].rgb".to_string(),
        ColorInput::Reg1Alpha => "t_Reg[2].aaa".to_string(),
        ColorInput::Reg2Color => "t_Reg[3].rgb".to_string(),
        ColorInput::Reg2Alpha => "t_Reg[3].aaa".to_string(),
        ColorInput::TexColor => format!("t_Stage{index}Tex.rgb"),
        ColorInput::TexAlpha => format!("t_Stage{index}Tex.aaa"),
        ColorInput::RasColor => format!("t_Stage{index}Ras.rgb"),
        ColorInput::RasAlpha => format!("t_Stage{index}Ras.aaa"),
        ColorInput::One => "vec3(1.0)".to_string(),
        ColorInput::Half => "vec3(0.5)".to_string(),
        ColorInput::Konst => format!("t_Stage{index}Konst.rgb"),
        ColorInput::Zero => "vec3(0.0)".to_string(),
    };
    let constant = match input {
        ColorInput::One => Some(Operand::One),
        ColorInput::Zero => Some(Operand::Zero),
        _ => None,
    };
    (expr, constant)
}

fn alpha_input_expr(index: usize, input: AlphaInput) -> (String, Option<Operand>) {
    let expr = match input {
        AlphaInput::PrevAlpha => "t_Reg[0].a".to_string(),
        AlphaInput::Reg0Alpha => "t_Reg[1].a".to_string(),
        AlphaInput::Reg1Alpha => "t_Reg[2].a".to_string(),
        AlphaInput::Reg2Alpha => "t_Reg[3].a".to_string(),
        AlphaInput::TexAlpha => format!("t_Stage{index}Tex.a"),
        AlphaInput::RasAlpha => format!("t_Stage{index}Ras.a"),
        AlphaInput::Konst => format!("t_Stage{index}KonstA"),
        AlphaInput::Zero => "0.0".to_string(),
    };
    let constant = match input {
        AlphaInput::Zero => Some(Operand::Zero),
        _ => None,
    };
    (expr, constant)
}

/// Renders a simplified expression tree, substituting the `A`/`B`/`C`/`D`
/// symbolic slots with the real per-stage GLSL expressions computed by
/// [`color_input_expr`]/[`alpha_input_expr`] (§4.6's used-mask convention:
/// slots the simplifier folded away are simply never referenced).
fn render_simplified(expr: &Simplified, a: &str, b: &str, c: &str, d: &str, one: &str, zero: &str) -> String {
    match expr {
        Simplified::Leaf(Operand::A) => a.to_string(),
        Simplified::Leaf(Operand::B) => b.to_string(),
        Simplified::Leaf(Operand::C) => c.to_string(),
        Simplified::Leaf(Operand::D) => d.to_string(),
        Simplified::Leaf(Operand::One) => one.to_string(),
        Simplified::Leaf(Operand::Zero) => zero.to_string(),
        Simplified::Binary(op, l, r) => {
            let l = render_simplified(l, a, b, c, d, one, zero);
            let r = render_simplified(r, a, b, c, d, one, zero);
            let op = match op {
                gx_simplify::Op::Add => "+",
                gx_simplify::Op::Sub => "-",
                gx_simplify::Op::Mul => "*",
            };
            format!("({l} {op} {r})")
        }
    }
}

fn bias_value(bias: gx_material::TevBias) -> f32 {
    match bias {
        gx_material::TevBias::Zero => 0.0,
        gx_material::TevBias::AddHalf => 0.5,
        gx_material::TevBias::SubHalf => -0.5,
    }
}

fn scale_value(scale: gx_material::TevScale) -> f32 {
    match scale {
        gx_material::TevScale::One => 1.0,
        gx_material::TevScale::Two => 2.0,
        gx_material::TevScale::Four => 4.0,
        gx_material::TevScale::Half => 0.5,
    }
}

fn write_color_substage(b: &mut Builder, index: usize, stage: &TevStage, dest: &str) -> Result<(), Error> {
    let c = &stage.color;
    if c.formula.is_comparative() {
        if c.bias != gx_material::TevBias::Zero || c.scale != gx_material::TevScale::One {
            return Err(Error::ComparisonWithBiasScale {
                stage: index,
                sub: "color",
                formula: c.formula,
                bias: c.bias,
                scale: c.scale,
            });
        }
        let (a, _) = color_input_expr(index, c.a);
        let (b_expr, _) = color_input_expr(index, c.b);
        let (c_expr, _) = color_input_expr(index, c.c);
        let (d, _) = color_input_expr(index, c.d);
        let compare = comparative_expr(c.formula, &a, &b_expr);
        line!(b, "{dest}.rgb = {d} + ({compare}) * {c_expr};")?;
        return Ok(());
    }

    let (a, a_const) = color_input_expr(index, c.a);
    let (b_expr, b_const) = color_input_expr(index, c.b);
    let (c_expr, c_const) = color_input_expr(index, c.c);
    let (d, d_const) = color_input_expr(index, c.d);

    let value = match c.formula {
        TevFormula::Add => {
            let mut arena = Arena::new();
            let root = gx_simplify::build_stage_tree(
                &mut arena,
                a_const.unwrap_or(Operand::A),
                b_const.unwrap_or(Operand::B),
                c_const.unwrap_or(Operand::C),
                d_const.unwrap_or(Operand::D),
            );
            let simplified = gx_simplify::simplify(&arena, root);
            render_simplified(&simplified, &a, &b_expr, &c_expr, &d, "vec3(1.0)", "vec3(0.0)")
        }
        TevFormula::Sub => format!("({d} - ((vec3(1.0) - {c_expr}) * {a} + {c_expr} * {b_expr}))"),
        _ => unreachable!("comparative formulas handled above"),
    };

    let scale = scale_value(c.scale);
    let bias = bias_value(c.bias);
    line!(b, "{dest}.rgb = {value} * {scale:.6} + vec3({bias:.6});")?;
    if c.clamp {
        line!(b, "{dest}.rgb = clamp({dest}.rgb, 0.0, 1.0);")?;
    }
    Ok(())
}

fn write_alpha_substage(b: &mut Builder, index: usize, stage: &TevStage, dest: &str) -> Result<(), Error> {
    let c = &stage.alpha;
    if c.formula.is_comparative() {
        if c.bias != gx_material::TevBias::Zero || c.scale != gx_material::TevScale::One {
            return Err(Error::ComparisonWithBiasScale {
                stage: index,
                sub: "alpha",
                formula: c.formula,
                bias: c.bias,
                scale: c.scale,
            });
        }
        let (a, _) = alpha_input_expr(index, c.a);
        let (b_expr, _) = alpha_input_expr(index, c.b);
        let (c_expr, _) = alpha_input_expr(index, c.c);
        let (d, _) = alpha_input_expr(index, c.d);
        let compare = comparative_expr_scalar(c.formula, &a, &b_expr);
        line!(b, "{dest}.a = {d} + ({compare}) * {c_expr};")?;
        return Ok(());
    }

    let (a, a_const) = alpha_input_expr(index, c.a);
    let (b_expr, b_const) = alpha_input_expr(index, c.b);
    let (c_expr, c_const) = alpha_input_expr(index, c.c);
    let (d, d_const) = alpha_input_expr(index, c.d);

    let value = match c.formula {
        TevFormula::Add => {
            let mut arena = Arena::new();
            let root = gx_simplify::build_stage_tree(
                &mut arena,
                a_const.unwrap_or(Operand::A),
                b_const.unwrap_or(Operand::B),
                c_const.unwrap_or(Operand::C),
                d_const.unwrap_or(Operand::D),
            );
            let simplified = gx_simplify::simplify(&arena, root);
            render_simplified(&simplified, &a, &b_expr, &c_expr, &d, "1.0", "0.0")
        }
        TevFormula::Sub => format!("({d} - ((1.0 - {c_expr}) * {a} + {c_expr} * {b_expr}))"),
        _ => unreachable!("comparative formulas handled above"),
    };

    let scale = scale_value(c.scale);
    let bias = bias_value(c.bias);
    line!(b, "{dest}.a = {value} * {scale:.6} + {bias:.6};")?;
    if c.clamp {
        line!(b, "{dest}.a = clamp({dest}.a, 0.0, 1.0);")?;
    }
    Ok(())
}

fn comparative_expr(formula: TevFormula, a: &str, b: &str) -> String {
    match formula {
        TevFormula::CompR8Gt => format!("vec3(greaterThan(vec3(({a}).r), vec3(({b}).r)))"),
        TevFormula::CompR8Eq => format!("vec3(equal(vec3(({a}).r), vec3(({b}).r)))"),
        TevFormula::CompGr16Gt => format!("vec3(TevPack16({a}) > TevPack16({b}))"),
        TevFormula::CompGr16Eq => format!("vec3(TevPack16({a}) == TevPack16({b}))"),
        TevFormula::CompBgr24Gt => format!("vec3(TevPack24({a}) > TevPack24({b}))"),
        TevFormula::CompBgr24Eq => format!("vec3(TevPack24({a}) == TevPack24({b}))"),
        TevFormula::CompRgb8Gt => format!("TevPerCompGT({a}, {b})"),
        TevFormula::CompRgb8Eq => format!("TevPerCompEQ({a}, {b})"),
        TevFormula::CompA8Gt | TevFormula::CompA8Eq | TevFormula::Add | TevFormula::Sub => {
            unreachable!("non-color-comparative formula")
        }
    }
}

fn comparative_expr_scalar(formula: TevFormula, a: &str, b: &str) -> String {
    match formula {
        TevFormula::CompA8Gt => format!("float(({a}) > ({b}))"),
        TevFormula::CompA8Eq => format!("float(({a}) == ({b}))"),
        _ => format!("float(({}) != 0.0)", comparative_expr(formula, a, b)),
    }
}

fn compare_operand(compare: CompareFunction, value: &str, reference: &str) -> String {
    match compare {
        CompareFunction::Never => "false".to_string(),
        CompareFunction::Always => "true".to_string(),
        CompareFunction::Less => format!("{value} < {reference}"),
        CompareFunction::Equal => format!("{value} == {reference}"),
        CompareFunction::LEqual => format!("{value} <= {reference}"),
        CompareFunction::Greater => format!("{value} > {reference}"),
        CompareFunction::NEqual => format!("{value} != {reference}"),
        CompareFunction::GEqual => format!("{value} >= {reference}"),
    }
}

fn write_alpha_test(b: &mut Builder, material: &Material) -> Result<(), Error> {
    let compare = &material.alpha_compare;
    if compare.is_pass_through() {
        return Ok(());
    }
    let left = compare_operand(compare.comp_left, "t_TevOutput.a", &format!("{:.6}", f32::from(compare.ref_left) / 255.0));
    let right = compare_operand(
        compare.comp_right,
        "t_TevOutput.a",
        &format!("{:.6}", f32::from(compare.ref_right) / 255.0),
    );
    let op = match compare.op {
        AlphaLogic::And => "&&",
        AlphaLogic::Or => "||",
        AlphaLogic::Xor => "!=",
        AlphaLogic::Xnor => "==",
    };
    line!(b, "if (!({left} {op} {right})) discard;")?;
    b.blank();
    Ok(())
}

fn write_dst_alpha(b: &mut Builder, material: &Material) -> Result<(), Error> {
    if material.dst_alpha.enabled {
        line!(b, "t_TevOutput.a = {:.6};", f32::from(material.dst_alpha.alpha) / 255.0)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gx_material::tev::{AlphaStage, ColorStage};
    use gx_material::{Sampler, TevOutput};

    fn identity_stage_material() -> Material {
        let mut material = Material::default();
        material.tex_gens.push(gx_material::TexGen::default());
        material.samplers.push(Sampler::default());
        material.stages.push(TevStage {
            color: ColorStage {
                a: ColorInput::TexColor,
                b: ColorInput::Zero,
                c: ColorInput::Zero,
                d: ColorInput::Zero,
                formula: TevFormula::Add,
                clamp: true,
                output: TevOutput::Prev,
                ..Default::default()
            },
            alpha: AlphaStage {
                a: AlphaInput::TexAlpha,
                b: AlphaInput::Zero,
                c: AlphaInput::Zero,
                d: AlphaInput::Zero,
                formula: TevFormula::Add,
                clamp: true,
                output: TevOutput::Prev,
                ..Default::default()
            },
            tex_coord: Some(0),
            tex_map: Some(0),
            ..Default::default()
        });
        material
    }

    #[test]
    fn scenario_a_identity_stage_reads_texture_directly() {
        let material = identity_stage_material();
        let mut b = Builder::new();
        generate(&mut b, &material, GlslTarget::Desktop, &GenOptions::default()).unwrap();
        let text = b.finish();
        assert!(text.contains("t_Stage0Tex"));
        assert!(text.contains("t_Reg[0].rgb ="));
    }

    #[test]
    fn scenario_d_never_or_never_discards_unconditionally() {
        let mut material = identity_stage_material();
        material.alpha_compare = gx_material::AlphaCompare {
            comp_left: CompareFunction::Never,
            ref_left: 0,
            op: AlphaLogic::Or,
            comp_right: CompareFunction::Never,
            ref_right: 0,
        };
        let mut b = Builder::new();
        generate(&mut b, &material, GlslTarget::Desktop, &GenOptions::default()).unwrap();
        let text = b.finish();
        assert!(text.contains("if (!(false || false)) discard;"));
    }

    #[test]
    fn comparison_formula_with_nonzero_bias_errors() {
        let mut material = identity_stage_material();
        material.stages[0].color.formula = TevFormula::CompR8Gt;
        material.stages[0].color.bias = gx_material::TevBias::AddHalf;
        let mut b = Builder::new();
        let err = generate(&mut b, &material, GlslTarget::Desktop, &GenOptions::default()).unwrap_err();
        assert!(matches!(err, Error::ComparisonWithBiasScale { .. }));
    }

    #[test]
    fn totality_over_default_material_with_no_stages_fails_cleanly() {
        let material = Material::default();
        let mut b = Builder::new();
        let err = generate(&mut b, &material, GlslTarget::Desktop, &GenOptions::default()).unwrap_err();
        assert!(matches!(err, Error::NoStages));
    }
}
