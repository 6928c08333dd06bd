use bytemuck::{Pod, Zeroable};
use glam::Vec3;

pub(crate) const SHADER: &str = r#"
struct GlobalUniform {
    view_proj: mat4x4<f32>,
}

struct ObjectConstants {
    model: mat4x4<f32>,
    color: vec4<f32>,
}

@group(0) @binding(0)
var<uniform> globals: GlobalUniform;

@group(1) @binding(0)
var<uniform> draw: ObjectConstants;

@vertex
fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return globals.view_proj * draw.model * vec4<f32>(position, 1.0);
}

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return draw.color;
}
"#;

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub(crate) struct GlobalUniform {
    pub view_proj: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub(crate) struct ObjectConstants {
    pub model: [[f32; 4]; 4],
    pub color: [f32; 4],
}

/// Converts an sRGB-encoded color to linear for sRGB render targets.
pub(crate) fn srgb_to_linear(color: Vec3) -> Vec3 {
    let channel = |c: f32| {
        if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    Vec3::new(channel(color.x), channel(color.y), channel(color.z))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_sizes_match_shader_layout() {
        assert_eq!(std::mem::size_of::<GlobalUniform>(), 64);
        assert_eq!(std::mem::size_of::<ObjectConstants>(), 80);
    }

    #[test]
    fn srgb_endpoints_are_fixed() {
        assert_eq!(srgb_to_linear(Vec3::ZERO), Vec3::ZERO);
        assert!((srgb_to_linear(Vec3::ONE) - Vec3::ONE).length() < 1e-6);
        assert!(srgb_to_linear(Vec3::splat(0.5)).x < 0.5);
    }
}
