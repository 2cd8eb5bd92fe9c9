//! A detector that replays a fixed list of keypoints per octave.

use sift_match::{DetectorParams, OctaveStatus, RawKeypoint, ScaleSpaceDetector, DESCRIPTOR_SIZE};
use std::cell::RefCell;

#[derive(Debug, Clone)]
pub struct ScriptedKeypoint {
    pub raw: RawKeypoint,
    pub orientations: Vec<f64>,
}

impl ScriptedKeypoint {
    pub fn new(x: f32, y: f32, sigma: f32, level: i32, orientations: &[f64]) -> Self {
        Self {
            raw: RawKeypoint { x, y, sigma, level },
            orientations: orientations.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Script {
    pub octaves: Vec<Vec<ScriptedKeypoint>>,
}

#[derive(Debug, Clone, Default)]
pub struct Observed {
    pub params: Option<DetectorParams>,
    pub num_samples: usize,
    pub orientation_calls: usize,
}

thread_local! {
    static SCRIPT: RefCell<Script> = RefCell::new(Script::default());
    static OBSERVED: RefCell<Observed> = RefCell::new(Observed::default());
}

/// Installs the keypoints the next detector created on this thread will report.
pub fn set_script(octaves: Vec<Vec<ScriptedKeypoint>>) {
    SCRIPT.with(|script| *script.borrow_mut() = Script { octaves });
    OBSERVED.with(|observed| *observed.borrow_mut() = Observed::default());
}

pub fn observed() -> Observed {
    OBSERVED.with(|observed| observed.borrow().clone())
}

/// Descriptor of a keypoint at an angle.
///
/// Every descriptor has the same norm and a spike whose position depends on
/// the keypoint x coordinate, plus one that depends on the angle. Keypoints with
/// `sigma == 0` yield an all-zero descriptor.
pub fn scripted_descriptor(keypoint: &RawKeypoint, angle: f64) -> [f32; DESCRIPTOR_SIZE] {
    if keypoint.sigma == 0.0 {
        return [0.0; DESCRIPTOR_SIZE];
    }
    let mut descriptor = [0.1; DESCRIPTOR_SIZE];
    descriptor[keypoint.x as usize % 64] += 10.0;
    descriptor[64 + (angle * 10.0) as usize % 64] += 5.0;
    descriptor
}

pub struct ScriptedDetector {
    octaves: Vec<Vec<ScriptedKeypoint>>,
    current: usize,
    keypoints: Vec<RawKeypoint>,
}

impl ScriptedDetector {
    fn enter(&mut self, octave: usize) -> OctaveStatus {
        self.current = octave;
        self.keypoints.clear();
        if octave < self.octaves.len() {
            OctaveStatus::Processed
        } else {
            OctaveStatus::Exhausted
        }
    }
}

impl ScaleSpaceDetector for ScriptedDetector {
    fn new(params: &DetectorParams) -> Option<Self> {
        OBSERVED.with(|observed| observed.borrow_mut().params = Some(*params));
        if params.width == 0 || params.height == 0 {
            return None;
        }
        Some(Self {
            octaves: SCRIPT.with(|script| script.borrow().octaves.clone()),
            current: 0,
            keypoints: vec![],
        })
    }

    fn process_first_octave(&mut self, samples: &[f32]) -> OctaveStatus {
        OBSERVED.with(|observed| observed.borrow_mut().num_samples = samples.len());
        self.enter(0)
    }

    fn process_next_octave(&mut self) -> OctaveStatus {
        self.enter(self.current + 1)
    }

    fn detect(&mut self) {
        self.keypoints = self.octaves[self.current]
            .iter()
            .map(|keypoint| keypoint.raw)
            .collect();
    }

    fn keypoints(&self) -> &[RawKeypoint] {
        &self.keypoints
    }

    fn orientations(&mut self, keypoint: &RawKeypoint) -> Vec<f64> {
        OBSERVED.with(|observed| observed.borrow_mut().orientation_calls += 1);
        self.octaves[self.current]
            .iter()
            .find(|scripted| scripted.raw == *keypoint)
            .map(|scripted| scripted.orientations.clone())
            .unwrap_or_default()
    }

    fn descriptor(&mut self, keypoint: &RawKeypoint, angle: f64) -> [f32; DESCRIPTOR_SIZE] {
        scripted_descriptor(keypoint, angle)
    }
}
