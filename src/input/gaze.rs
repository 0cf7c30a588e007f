use std::sync::atomic::Ordering;
use std::time::Duration;

use crossbeam_channel::Sender;
use glam::Vec2;

use super::{InputEvent, Source, SourceError, Worker};

/// Face bounding box in normalized image coordinates (`[0, 1]`, y up).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceRect {
    pub min: Vec2,
    pub max: Vec2,
}

impl FaceRect {
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }
}

/// Detections for one camera frame, mapped into gaze space.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FaceReport {
    /// Leftmost face, the one every eye follows.
    pub primary: Option<Vec2>,
    /// All faces, sorted left to right.
    pub faces: Vec<Vec2>,
}

impl FaceReport {
    /// Map box centers into `[-1, 1]²`, mirrored horizontally so the eyes
    /// look back at the viewer.
    pub fn from_rects(rects: &[FaceRect]) -> Self {
        let mut faces: Vec<Vec2> = rects
            .iter()
            .map(|rect| {
                let m = rect.center() * 2.0 - Vec2::ONE;
                Vec2::new(-m.x, m.y)
            })
            .collect();
        faces.sort_by(|a, b| a.x.total_cmp(&b.x));
        Self {
            primary: faces.first().copied(),
            faces,
        }
    }

    /// The single-face update followed by the all-faces passthrough.
    pub fn events(&self) -> [InputEvent; 2] {
        [
            InputEvent::Face {
                position: self.primary.unwrap_or(Vec2::ZERO),
                detected: self.primary.is_some(),
            },
            InputEvent::Faces(self.faces.clone()),
        ]
    }
}

/// Camera frames per second for the synthetic tracker.
const SYNTHETIC_FPS: f32 = 30.0;
/// Seconds a synthetic visitor stays in view, then seconds away.
const VISIT_SECS: f32 = 8.0;
const AWAY_SECS: f32 = 3.0;
const FACE_SIZE: f32 = 0.2;

/// Fakes a visitor drifting across the camera, sometimes with a companion,
/// leaving now and then. Stands in for a camera + face detector.
pub struct SyntheticGaze {
    seed: u64,
    worker: Worker,
}

impl SyntheticGaze {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            worker: Worker::idle(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_running()
    }
}

/// Face boxes the synthetic camera sees at time `t`.
fn synthetic_frame(t: f32, companion: bool) -> Vec<FaceRect> {
    let cycle = t % (VISIT_SECS + AWAY_SECS);
    if cycle >= VISIT_SECS {
        return Vec::new();
    }
    let half = Vec2::splat(FACE_SIZE * 0.5);
    let lead = Vec2::new(0.5 + 0.35 * (t * 0.7).sin(), 0.5 + 0.25 * (t * 1.3).cos());
    let mut rects = vec![FaceRect {
        min: lead - half,
        max: lead + half,
    }];
    if companion {
        let other = Vec2::new(1.0 - lead.x, lead.y);
        rects.push(FaceRect {
            min: other - half,
            max: other + half,
        });
    }
    rects
}

impl Source for SyntheticGaze {
    fn name(&self) -> &'static str {
        "synthetic gaze"
    }

    fn start(&mut self, events: Sender<InputEvent>) -> Result<(), SourceError> {
        let seed = self.seed;
        self.worker.spawn("synthetic-gaze", move |stop| {
            let mut rng = fastrand::Rng::with_seed(seed);
            let frame_secs = 1.0 / SYNTHETIC_FPS;
            let mut t = 0.0f32;
            let mut companion = false;
            while !stop.load(Ordering::Relaxed) {
                // Re-roll the companion once per visit.
                if t % (VISIT_SECS + AWAY_SECS) < frame_secs {
                    companion = rng.f32() < 0.3;
                }
                let report = FaceReport::from_rects(&synthetic_frame(t, companion));
                for event in report.events() {
                    if events.send(event).is_err() {
                        return;
                    }
                }
                t += frame_secs;
                std::thread::sleep(Duration::from_secs_f32(frame_secs));
            }
        })?;
        log::info!("Synthetic gaze started");
        Ok(())
    }

    fn stop(&mut self) {
        if self.worker.is_running() {
            self.worker.stop();
            log::info!("Synthetic gaze stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect_at(x: f32, y: f32) -> FaceRect {
        FaceRect {
            min: Vec2::new(x - 0.05, y - 0.05),
            max: Vec2::new(x + 0.05, y + 0.05),
        }
    }

    #[test]
    fn no_faces_reports_not_detected() {
        let report = FaceReport::from_rects(&[]);
        assert_eq!(report.primary, None);
        let [face, all] = report.events();
        assert_eq!(
            face,
            InputEvent::Face {
                position: Vec2::ZERO,
                detected: false
            }
        );
        assert_eq!(all, InputEvent::Faces(Vec::new()));
    }

    #[test]
    fn centers_are_mirrored_into_unit_square() {
        let report = FaceReport::from_rects(&[rect_at(0.75, 0.75)]);
        let p = report.primary.unwrap();
        assert!((p.x + 0.5).abs() < 1e-6);
        assert!((p.y - 0.5).abs() < 1e-6);
    }

    #[test]
    fn leftmost_face_wins() {
        let report = FaceReport::from_rects(&[rect_at(0.2, 0.5), rect_at(0.9, 0.5), rect_at(0.5, 0.1)]);
        let xs: Vec<f32> = report.faces.iter().map(|f| f.x).collect();
        assert!(xs.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(report.primary, report.faces.first().copied());
        // Image-right becomes gaze-left after mirroring.
        assert!((report.primary.unwrap().x + 0.8).abs() < 1e-5);
    }

    #[test]
    fn synthetic_visitor_leaves_and_returns() {
        assert_eq!(synthetic_frame(1.0, false).len(), 1);
        assert_eq!(synthetic_frame(1.0, true).len(), 2);
        assert!(synthetic_frame(VISIT_SECS + 1.0, true).is_empty());
        assert_eq!(synthetic_frame(VISIT_SECS + AWAY_SECS + 1.0, false).len(), 1);
    }

    #[test]
    fn synthetic_gaze_streams_pairs() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut source = SyntheticGaze::new(3);
        source.start(tx).unwrap();
        let first = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        let second = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        source.stop();
        assert!(matches!(first, InputEvent::Face { detected: true, .. }));
        assert!(matches!(second, InputEvent::Faces(ref f) if !f.is_empty()));
    }
}
