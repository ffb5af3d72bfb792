//! Shared GPU types and utilities used by the renderable primitives.

use bytemuck::{Pod, Zeroable};

// ── blend ─────────────────────────────────────────────────────────────────

/// Blend state for straight-alpha sources: `src_alpha, one_minus_src_alpha`.
pub(super) fn straight_alpha_blend() -> wgpu::BlendState {
    wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::SrcAlpha,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::SrcAlpha,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
    }
}

// ── screen uniform ────────────────────────────────────────────────────────

/// Logical screen size as uploaded to shaders.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub(super) struct ScreenUniform {
    pub screen: [f32; 2],
    pub _pad: [f32; 2], // 16-byte alignment
}

/// Returns the `wgpu` minimum binding size for the screen uniform buffer.
///
/// `ScreenUniform` is 16 bytes by construction, so the size is always
/// non-zero. Centralising this avoids `.unwrap()` at each pipeline-creation
/// site.
pub(super) fn screen_ubo_min_binding_size() -> std::num::NonZeroU64 {
    std::num::NonZeroU64::new(std::mem::size_of::<ScreenUniform>() as u64)
        .expect("ScreenUniform has non-zero size by construction")
}
