pub mod timer;
pub mod tween;
