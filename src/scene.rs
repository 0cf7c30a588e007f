use crate::eye::pose::Pose;

/// Opaque handle of one eye, unique per spawn.
pub type EyeId = hecs::Entity;

/// Scene membership changes, in the order they happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneEvent {
    /// A new eye should appear.
    Attached(EyeId),
    /// An eye finished closing and should be taken off screen.
    Detached(EyeId),
}

/// Rendering collaborator. The population pushes poses into it every frame and
/// never reads anything back; whoever owns the surface owns its lifetime.
pub trait Surface {
    fn attach(&mut self, id: EyeId, pose: &Pose);
    fn present(&mut self, id: EyeId, pose: &Pose);
    fn detach(&mut self, id: EyeId);
}

/// Headless surface that only keeps counts and logs membership changes.
#[derive(Debug, Default)]
pub struct LogSurface {
    on_screen: usize,
    presented: u64,
}

impl LogSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_screen(&self) -> usize {
        self.on_screen
    }

    /// Total poses presented since creation.
    pub fn presented(&self) -> u64 {
        self.presented
    }
}

impl Surface for LogSurface {
    fn attach(&mut self, id: EyeId, pose: &Pose) {
        self.on_screen += 1;
        log::debug!(
            "Attach {:?} at ({:.0}, {:.0}) scale {:.2}",
            id,
            pose.position.x,
            pose.position.y,
            pose.scale
        );
    }

    fn present(&mut self, _id: EyeId, _pose: &Pose) {
        self.presented += 1;
    }

    fn detach(&mut self, id: EyeId) {
        self.on_screen = self.on_screen.saturating_sub(1);
        log::debug!("Detach {:?}", id);
    }
}
