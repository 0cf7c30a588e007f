use glam::{Vec2, Vec3};

/// One eyelid as the renderer should draw it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lid {
    /// Vertical scale: 0.0 = fully retracted, eyelid max scale = fully shut.
    pub scale_y: f32,
    /// Vertical anchor offset from the eye center (positive = up).
    pub offset_y: f32,
}

/// Iris colour and how strongly it is blended over the sprite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tint {
    pub rgb: Vec3,
    pub blend: f32,
}

impl Tint {
    pub const CALM: Tint = Tint {
        rgb: Vec3::new(0.0, 0.0, 1.0),
        blend: 0.6,
    };
    pub const ANGRY: Tint = Tint {
        rgb: Vec3::new(1.0, 0.0, 0.0),
        blend: 1.0,
    };
}

/// Everything the rendering collaborator needs to present one eye.
/// Written by the eye machine, never read back from the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    /// Container position in scene units.
    pub position: Vec2,
    /// Uniform container scale.
    pub scale: f32,
    /// Eyeball sprite scale (x, y) inside the container.
    pub eyeball_scale: Vec2,
    pub iris: Tint,
    /// Iris + pupil offset from the eye center.
    pub gaze_offset: Vec2,
    pub pupil_scale: f32,
    pub upper_lid: Lid,
    pub lower_lid: Lid,
}
