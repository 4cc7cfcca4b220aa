//! GLSL shader pair generator (component G, §4.7).
//!
//! [`generate`] is a pure function from a [`gx_material::Material`] to a
//! matching vertex/fragment GLSL source pair that implements the GX
//! fixed-function pipeline exactly: TEV combiner, channel lighting, texgen,
//! indirect transforms, alpha test, destination alpha. It never emits
//! silently-wrong code for an input it doesn't understand; unsupported
//! operands and formulas are a typed [`Error`] instead (§4.7 "the
//! generator is total").

mod builder;
mod error;
mod fragment;
mod prelude;
mod vertex;

pub use error::Error;
pub use fragment::GenOptions;
pub use prelude::GlslTarget;

use gx_material::Material;

/// A generated vertex/fragment source pair sharing one material's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderPair {
    pub vertex: String,
    pub fragment: String,
}

/// Generates the vertex and fragment GLSL sources for `material`.
///
/// `target` selects the `#version` pragma (§4.7); `options` controls
/// tooling-only variants (currently just the primitive-id visualizer).
pub fn generate(material: &Material, target: GlslTarget, options: &GenOptions) -> Result<ShaderPair, Error> {
    let mut vertex_builder = builder::Builder::new();
    vertex::generate(&mut vertex_builder, material, target)?;

    let mut fragment_builder = builder::Builder::new();
    fragment::generate(&mut fragment_builder, material, target, options)?;

    Ok(ShaderPair {
        vertex: vertex_builder.finish(),
        fragment: fragment_builder.finish(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gx_material::tev::{AlphaStage, ColorStage};
    use gx_material::{Sampler, TevOutput};
    use gx_material::tev::{AlphaInput, ColorInput, TevFormula};

    /// §8 property 6: every material that passes `lift` generates `Ok`
    /// shaders. We can't invoke `gx-codec` here without a dependency
    /// cycle, so this exercises the same shape of material `lift` would
    /// hand back: at least one stage, matched texgen/sampler counts.
    #[test]
    fn generates_both_stages_for_a_minimal_valid_material() {
        let mut material = Material::default();
        material.tex_gens.push(gx_material::TexGen::default());
        material.samplers.push(Sampler::default());
        material.stages.push(gx_material::TevStage {
            color: ColorStage {
                a: ColorInput::TexColor,
                formula: TevFormula::Add,
                clamp: true,
                output: TevOutput::Prev,
                ..Default::default()
            },
            alpha: AlphaStage {
                a: AlphaInput::TexAlpha,
                formula: TevFormula::Add,
                clamp: true,
                output: TevOutput::Prev,
                ..Default::default()
            },
            tex_coord: Some(0),
            tex_map: Some(0),
            ..Default::default()
        });

        let shaders = generate(&material, GlslTarget::Desktop, &GenOptions::default()).unwrap();
        assert!(shaders.vertex.contains("#version 420"));
        assert!(shaders.fragment.contains("#version 420"));
        assert!(shaders.fragment.contains("o_Color"));
    }

    #[test]
    fn mismatched_texgen_sampler_counts_error_instead_of_panicking() {
        let mut material = Material::default();
        material.tex_gens.push(gx_material::TexGen::default());
        let err = generate(&material, GlslTarget::WebGl, &GenOptions::default()).unwrap_err();
        assert!(matches!(err, Error::TexGenSamplerMismatch { .. }));
    }

    #[test]
    fn webgl_target_uses_es_pragma_and_skips_early_fragment_tests() {
        let mut material = Material::default();
        material.tex_gens.push(gx_material::TexGen::default());
        material.samplers.push(Sampler::default());
        material.stages.push(gx_material::TevStage::default());
        material.early_z_comparison = true;

        let shaders = generate(&material, GlslTarget::WebGl, &GenOptions::default()).unwrap();
        assert!(shaders.vertex.contains("#version 300 es"));
        assert!(!shaders.fragment.contains("early_fragment_tests"));
    }
}
