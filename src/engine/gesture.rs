// Hand-gesture signal processing.
//
// A LandmarkSource (real camera model or the keyboard/mouse simulator)
// produces 21-point hand frames at its own capture cadence on a dedicated
// thread. The processor reduces each frame to a GestureState and publishes it
// into a single-slot, last-write-wins shared cell that the render loop
// snapshots once per display frame. Dropped intermediate samples are expected;
// there is no queue and no backpressure.

use super::error::TrackerError;
use super::state::GestureState;
use glam::Vec2;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

/// Standard hand landmark layout: wrist + four joints per finger.
pub const LANDMARK_COUNT: usize = 21;

pub const WRIST: usize = 0;
pub const THUMB_TIP: usize = 4;
pub const INDEX_MCP: usize = 5;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_MCP: usize = 9;
pub const MIDDLE_TIP: usize = 12;
pub const RING_MCP: usize = 13;
pub const RING_TIP: usize = 16;
pub const PINKY_MCP: usize = 17;
pub const PINKY_TIP: usize = 20;

/// One detected hand: 21 landmarks in normalized image coordinates [0, 1].
pub type HandFrame = [Vec2; LANDMARK_COUNT];

/// Anything that can deliver hand frames. `next_frame` blocks for the
/// backend's capture cadence; `Ok(None)` means no hand was detected this
/// frame. Dropping the source must release the underlying capture device.
pub trait LandmarkSource: Send {
    fn next_frame(&mut self) -> Result<Option<HandFrame>, TrackerError>;
}

// ============================================================================
// GESTURE PROCESSOR
// ============================================================================

// Single-pole low-pass on the tracked point: suppresses frame-to-frame
// jitter at the cost of a few frames of lag.
const SMOOTHING: f32 = 0.8;
// Mean wrist-to-fingertip distance below this reads as a closed hand.
const PINCH_THRESHOLD: f32 = 0.28;
// Thumb tip farther from the wrist than 1.2x the index knuckle = thumbs up.
const THUMB_RATIO: f32 = 1.2;
// Fingertip farther from the wrist than 1.15x its knuckle = extended.
const EXTENSION_RATIO: f32 = 1.15;
// Thumb-to-pinky span to hand-size multiplier.
const SPAN_SCALE: f32 = 2.8;

/// Reduces raw hand frames to smoothed, discretized gesture states. The
/// smoothing filters persist across frames, including through detection
/// losses, so a reacquired hand continues from the last smoothed value.
pub struct GestureProcessor {
    smooth_pos: Vec2,
    smooth_size: f32,
}

fn smooth(prev: f32, raw: f32) -> f32 {
    prev * SMOOTHING + raw * (1.0 - SMOOTHING)
}

impl GestureProcessor {
    pub fn new() -> Self {
        Self {
            smooth_pos: Vec2::new(0.5, 0.5),
            smooth_size: 1.0,
        }
    }

    /// Process one capture frame. No hand yields the exact neutral state.
    pub fn process(&mut self, frame: Option<&HandFrame>) -> GestureState {
        let Some(hand) = frame else {
            return GestureState::neutral();
        };

        let wrist = hand[WRIST];
        let dist = |i: usize| hand[i].distance(wrist);

        self.smooth_pos.x = smooth(self.smooth_pos.x, hand[INDEX_TIP].x);
        self.smooth_pos.y = smooth(self.smooth_pos.y, hand[INDEX_TIP].y);

        let tips = [INDEX_TIP, MIDDLE_TIP, RING_TIP, PINKY_TIP];
        let avg_tip_dist: f32 = tips.iter().map(|&i| dist(i)).sum::<f32>() / tips.len() as f32;
        let pinching = avg_tip_dist < PINCH_THRESHOLD;

        let thumb_up = dist(THUMB_TIP) > dist(INDEX_MCP) * THUMB_RATIO;

        let fingers = [
            (INDEX_TIP, INDEX_MCP),
            (MIDDLE_TIP, MIDDLE_MCP),
            (RING_TIP, RING_MCP),
            (PINKY_TIP, PINKY_MCP),
        ];
        let finger_count = fingers
            .iter()
            .filter(|&&(tip, mcp)| dist(tip) > dist(mcp) * EXTENSION_RATIO)
            .count() as u8;

        let span = hand[THUMB_TIP].distance(hand[PINKY_TIP]);
        self.smooth_size = smooth(self.smooth_size, span * SPAN_SCALE);

        GestureState {
            active: true,
            x: self.smooth_pos.x,
            y: self.smooth_pos.y,
            pinching,
            thumb_up,
            finger_count,
            hand_size: self.smooth_size,
            hand_rotation: self.smooth_pos.x,
        }
    }
}

// ============================================================================
// SHARED CELL + TRACKER THREAD
// ============================================================================

/// Single-slot last-write-wins cell. The tracker thread replaces the whole
/// snapshot under the lock; readers copy it out. A reader never observes a
/// partially-updated state.
#[derive(Clone)]
pub struct SharedGesture(Arc<Mutex<GestureState>>);

impl SharedGesture {
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(GestureState::neutral())))
    }

    pub fn publish(&self, state: GestureState) {
        *self.0.lock().unwrap() = state;
    }

    pub fn snapshot(&self) -> GestureState {
        *self.0.lock().unwrap()
    }
}

/// Owns the capture-and-process loop. `stop` (and Drop) synchronously halts
/// the loop and joins the thread, which drops the source and with it the
/// capture device, before returning.
pub struct GestureTracker {
    shared: SharedGesture,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl GestureTracker {
    pub fn spawn<S: LandmarkSource + 'static>(mut source: S) -> Self {
        let shared = SharedGesture::new();
        let stop = Arc::new(AtomicBool::new(false));

        let thread_shared = shared.clone();
        let thread_stop = stop.clone();
        let handle = std::thread::spawn(move || {
            let mut processor = GestureProcessor::new();
            while !thread_stop.load(Ordering::Relaxed) {
                match source.next_frame() {
                    Ok(frame) => thread_shared.publish(processor.process(frame.as_ref())),
                    Err(err) => {
                        // Terminal: report once, leave the neutral state
                        // behind, never panic into the render loop.
                        log::warn!("gesture tracking stopped: {err}");
                        thread_shared.publish(GestureState::neutral());
                        break;
                    }
                }
            }
        });

        Self {
            shared,
            stop,
            handle: Some(handle),
        }
    }

    pub fn shared(&self) -> SharedGesture {
        self.shared.clone()
    }

    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for GestureTracker {
    fn drop(&mut self) {
        self.stop();
    }
}

// ============================================================================
// SYNTHETIC SOURCE (keyboard + mouse simulation)
// ============================================================================

/// Simulated hand poses, driven from the window's keyboard state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimPose {
    Absent,
    Open,
    Fist,
    ThumbsUp,
    /// 1..=4 extended non-thumb fingers.
    Fingers(u8),
}

/// Input event from the window loop to the simulated source.
#[derive(Clone, Copy, Debug)]
pub enum SimInput {
    Pose(SimPose),
    /// Normalized cursor position standing in for the tracked fingertip.
    Cursor(f32, f32),
}

/// Landmark source synthesizing plausible hand frames from keyboard and
/// mouse input. Always available; a real camera backend implements the same
/// trait. Runs at a fixed ~30 Hz capture cadence, independent of the display
/// refresh rate.
pub struct SyntheticHandSource {
    rx: Receiver<SimInput>,
    pose: SimPose,
    cursor: Vec2,
    frame_interval: Duration,
}

impl SyntheticHandSource {
    pub fn new(rx: Receiver<SimInput>) -> Self {
        Self {
            rx,
            pose: SimPose::Open,
            cursor: Vec2::new(0.5, 0.5),
            frame_interval: Duration::from_millis(33),
        }
    }
}

impl LandmarkSource for SyntheticHandSource {
    fn next_frame(&mut self) -> Result<Option<HandFrame>, TrackerError> {
        loop {
            match self.rx.try_recv() {
                Ok(SimInput::Pose(pose)) => self.pose = pose,
                Ok(SimInput::Cursor(x, y)) => self.cursor = Vec2::new(x, y),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    return Err(TrackerError::DeviceLost("sim input channel closed".into()));
                }
            }
        }
        std::thread::sleep(self.frame_interval);
        Ok(synthetic_pose(self.pose, self.cursor))
    }
}

// Joint distances from the wrist for the synthetic hand, tuned so the
// processor's thresholds classify each pose unambiguously.
const EXTENDED_LEN: f32 = 0.45;
const CURLED_LEN: f32 = 0.18;
const KNUCKLE_LEN: f32 = 0.22;
const THUMB_CURLED_LEN: f32 = 0.20;

/// Build a 21-landmark frame for a simulated pose with the index fingertip
/// anchored at `cursor`. Returns None for the absent pose.
pub fn synthetic_pose(pose: SimPose, cursor: Vec2) -> Option<HandFrame> {
    let extended: [bool; 4] = match pose {
        SimPose::Absent => return None,
        SimPose::Open => [true; 4],
        SimPose::Fist | SimPose::ThumbsUp => [false; 4],
        SimPose::Fingers(n) => {
            let n = n.min(4) as usize;
            [n >= 1, n >= 2, n >= 3, n >= 4]
        }
    };
    let thumb_len = if pose == SimPose::ThumbsUp { EXTENDED_LEN } else { THUMB_CURLED_LEN };

    // Finger directions fanning out from the wrist, image coordinates
    // (y grows downward, so "up" is negative y).
    let dir = |deg: f32| {
        let rad = deg.to_radians();
        Vec2::new(rad.sin(), -rad.cos())
    };
    let thumb_dir = dir(-55.0);
    let finger_dirs = [dir(-15.0), dir(0.0), dir(15.0), dir(35.0)];

    // Anchor the index fingertip at the cursor.
    let index_len = if extended[0] { EXTENDED_LEN } else { CURLED_LEN };
    let wrist = cursor - finger_dirs[0] * index_len;

    let mut hand = [wrist; LANDMARK_COUNT];

    // Thumb chain: cmc, mcp, ip, tip.
    for (j, frac) in [0.25f32, 0.5, 0.8, 1.0].iter().enumerate() {
        hand[1 + j] = wrist + thumb_dir * (thumb_len * frac);
    }

    // Four fingers: mcp at the knuckle distance, then pip/dip/tip along the
    // finger direction.
    for (f, (&is_ext, finger_dir)) in extended.iter().zip(finger_dirs.iter()).enumerate() {
        let tip_len = if is_ext { EXTENDED_LEN } else { CURLED_LEN };
        let base = 5 + f * 4;
        hand[base] = wrist + *finger_dir * KNUCKLE_LEN;
        hand[base + 1] = wrist + *finger_dir * (KNUCKLE_LEN + (tip_len - KNUCKLE_LEN) * 0.4);
        hand[base + 2] = wrist + *finger_dir * (KNUCKLE_LEN + (tip_len - KNUCKLE_LEN) * 0.75);
        hand[base + 3] = wrist + *finger_dir * tip_len;
    }

    Some(hand)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn process_pose(processor: &mut GestureProcessor, pose: SimPose, cursor: Vec2) -> GestureState {
        processor.process(synthetic_pose(pose, cursor).as_ref())
    }

    #[test]
    fn no_hand_yields_exact_neutral_state() {
        let mut processor = GestureProcessor::new();
        let state = processor.process(None);
        assert_eq!(state, GestureState::neutral());

        // Still exact after intervening activity.
        process_pose(&mut processor, SimPose::Open, Vec2::new(0.8, 0.2));
        let state = processor.process(None);
        assert_eq!(state, GestureState::neutral());
    }

    #[test]
    fn fist_reads_as_pinch() {
        let mut processor = GestureProcessor::new();
        let state = process_pose(&mut processor, SimPose::Fist, Vec2::new(0.5, 0.5));
        assert!(state.pinching);
        assert_eq!(state.finger_count, 0);
        assert!(!state.thumb_up);
    }

    #[test]
    fn open_hand_is_not_a_pinch() {
        let mut processor = GestureProcessor::new();
        let state = process_pose(&mut processor, SimPose::Open, Vec2::new(0.5, 0.5));
        assert!(!state.pinching);
        assert_eq!(state.finger_count, 4);
    }

    #[test]
    fn thumbs_up_is_detected_on_a_closed_hand() {
        let mut processor = GestureProcessor::new();
        let state = process_pose(&mut processor, SimPose::ThumbsUp, Vec2::new(0.5, 0.5));
        assert!(state.thumb_up);
        assert_eq!(state.finger_count, 0);
    }

    #[test]
    fn finger_count_matches_pose_and_stays_in_range() {
        let mut processor = GestureProcessor::new();
        for n in 0..=4u8 {
            let pose = if n == 0 { SimPose::Fist } else { SimPose::Fingers(n) };
            let state = process_pose(&mut processor, pose, Vec2::new(0.5, 0.5));
            assert_eq!(state.finger_count, n);
        }
        // Out-of-range requests clamp.
        let state = process_pose(&mut processor, SimPose::Fingers(9), Vec2::new(0.5, 0.5));
        assert!(state.finger_count <= 4);
    }

    #[test]
    fn smoothing_residual_decays_geometrically() {
        // Step from p0 to p1: after n filter applications the residual is
        // (p0 - p1) * 0.8^n; below 11% of the step after 10 frames.
        let p0 = 0.5f32;
        let p1 = 0.9f32;
        let mut value = p0;
        for n in 1..=10 {
            value = smooth(value, p1);
            let expected = p1 + (p0 - p1) * SMOOTHING.powi(n);
            assert!((value - expected).abs() < 1e-6);
        }
        assert!((value - p1).abs() < (p1 - p0).abs() * 0.11);
    }

    #[test]
    fn cursor_converges_to_the_tracked_fingertip() {
        let mut processor = GestureProcessor::new();
        let cursor = Vec2::new(0.9, 0.2);
        let mut last = process_pose(&mut processor, SimPose::Open, cursor);
        let mut prev_err = (last.x - 0.9).abs();
        for _ in 0..30 {
            last = process_pose(&mut processor, SimPose::Open, cursor);
            let err = (last.x - 0.9).abs();
            assert!(err <= prev_err + 1e-6);
            prev_err = err;
        }
        assert!((last.x - 0.9).abs() < 0.01);
        assert_eq!(last.hand_rotation, last.x);
    }

    #[test]
    fn shared_cell_snapshots_whole_states() {
        let cell = SharedGesture::new();
        assert_eq!(cell.snapshot(), GestureState::neutral());

        let mut published = GestureState::neutral();
        published.active = true;
        published.finger_count = 3;
        published.x = 0.25;
        cell.publish(published);
        assert_eq!(cell.snapshot(), published);
    }

    #[test]
    fn tracker_falls_back_to_neutral_when_the_backend_dies() {
        let (tx, rx) = std::sync::mpsc::channel();
        let mut tracker = GestureTracker::spawn(SyntheticHandSource::new(rx));
        tx.send(SimInput::Pose(SimPose::Open)).unwrap();

        let wait_until = |pred: &dyn Fn(&GestureState) -> bool, what: &str| {
            let deadline = std::time::Instant::now() + Duration::from_secs(2);
            loop {
                if pred(&tracker.shared().snapshot()) {
                    break;
                }
                assert!(std::time::Instant::now() < deadline, "timed out waiting: {what}");
                std::thread::sleep(Duration::from_millis(5));
            }
        };
        wait_until(&|s| s.active, "pose pickup");

        // The source reports the closed channel as a terminal error; the
        // tracker must leave the neutral state behind rather than panic.
        drop(tx);
        wait_until(&|s| *s == GestureState::neutral(), "neutral fallback");

        // stop() joins without hanging after the loop has already exited.
        tracker.stop();
    }
}
