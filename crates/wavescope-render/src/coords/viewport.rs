/// Logical screen size used for coordinate normalization.
///
/// Renderables treat this as the coordinate basis when converting application
/// positions to NDC in shaders. It is a property of the `Renderer`, not of the
/// physical surface; the two only coincide when the application says so.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
    }
}
