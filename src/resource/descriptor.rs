//! Resource descriptors (§3 "Resource descriptor").
//!
//! Descriptors are plain data: the compiler and merger compare and mutate
//! them by value, never through a backend handle. Backend-specific format
//! capability ([`PixelFormat`] support, byte size/alignment) is resolved
//! through [`crate::backend::Backend`], not hard-coded here.

use bitflags::bitflags;

bitflags! {
    /// How a texture may be used; mirrors the access-kind surface a texture
    /// can participate in (§4.3 `AccessKind`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        const SHADER_READ        = 1 << 0;
        const SHADER_WRITE       = 1 << 1;
        const RENDER_TARGET      = 1 << 2;
        const DEPTH_STENCIL      = 1 << 3;
        const BLIT_SOURCE        = 1 << 4;
        const BLIT_DESTINATION   = 1 << 5;
        const INPUT_ATTACHMENT   = 1 << 6;
    }
}

/// A backend-agnostic pixel format tag.
///
/// Whether a given backend actually supports a format is a question for
/// [`crate::backend::Backend::supports_pixel_format`] — this enum only names
/// the format, it does not claim universal availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Bgra8Unorm,
    Bgra8UnormSrgb,
    Rgba16Float,
    Rgba32Float,
    R32Float,
    R8Unorm,
    Depth32Float,
    Depth24PlusStencil8,
    Bc1RgbaUnorm,
    Bc7RgbaUnorm,
}

/// Descriptor for a texture resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextureDescriptor {
    pub width: u32,
    pub height: u32,
    pub depth_or_array_layers: u32,
    pub mip_level_count: u32,
    pub sample_count: u32,
    pub format: PixelFormat,
    pub usage: TextureUsage,
}

impl TextureDescriptor {
    #[must_use]
    pub fn new(width: u32, height: u32, format: PixelFormat, usage: TextureUsage) -> Self {
        Self {
            width,
            height,
            depth_or_array_layers: 1,
            mip_level_count: 1,
            sample_count: 1,
            format,
            usage,
        }
    }

    #[must_use]
    pub fn with_mip_levels(mut self, mip_level_count: u32) -> Self {
        self.mip_level_count = mip_level_count;
        self
    }

    #[must_use]
    pub fn with_array_layers(mut self, depth_or_array_layers: u32) -> Self {
        self.depth_or_array_layers = depth_or_array_layers;
        self
    }

    #[must_use]
    pub fn with_sample_count(mut self, sample_count: u32) -> Self {
        self.sample_count = sample_count;
        self
    }

    /// Two textures are mergeable render-target candidates only if their
    /// extent and sample count agree (§4.6 `mergeable`); format is allowed to
    /// differ across colour attachments in the same pass.
    #[must_use]
    pub fn matches_extent(&self, other: &Self) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.depth_or_array_layers == other.depth_or_array_layers
            && self.sample_count == other.sample_count
    }
}

/// Descriptor for a buffer resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BufferDescriptor {
    pub size: u64,
    pub usage: BufferUsage,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        const VERTEX        = 1 << 0;
        const INDEX         = 1 << 1;
        const INDIRECT      = 1 << 2;
        const CONSTANT      = 1 << 3;
        const SHADER_READ   = 1 << 4;
        const SHADER_WRITE  = 1 << 5;
        const CPU_READ      = 1 << 6;
        const CPU_WRITE     = 1 << 7;
    }
}

impl BufferDescriptor {
    #[must_use]
    pub fn new(size: u64, usage: BufferUsage) -> Self {
        Self { size, usage }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn texture_extent_match_ignores_format() {
        let a = TextureDescriptor::new(1920, 1080, PixelFormat::Rgba8Unorm, TextureUsage::RENDER_TARGET);
        let b = TextureDescriptor::new(1920, 1080, PixelFormat::Bgra8Unorm, TextureUsage::RENDER_TARGET);
        assert!(a.matches_extent(&b));
    }

    #[test]
    fn texture_extent_mismatch_on_size() {
        let a = TextureDescriptor::new(1920, 1080, PixelFormat::Rgba8Unorm, TextureUsage::RENDER_TARGET);
        let b = TextureDescriptor::new(1280, 720, PixelFormat::Rgba8Unorm, TextureUsage::RENDER_TARGET);
        assert!(!a.matches_extent(&b));
    }
}
