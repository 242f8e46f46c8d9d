//! 公開 API だけでパイプライン全体を動かす

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};

use arm_tracker::arm::{AngleRange, ArmSide, ArmSolver, JointMapping};
use arm_tracker::camera::FrameSource;
use arm_tracker::config::Config;
use arm_tracker::control::{ControlLoop, LoopState, Session, StepOutcome};
use arm_tracker::pose::{Landmark, LandmarkIndex, LandmarkSet, PoseEstimator};
use arm_tracker::render::{FrameReport, Presenter};
use arm_tracker::servo::{firmata, ActuatorSession, ServoChannel};

/// 書き込まれたバイト列を共有バッファに記録するリンク
#[derive(Clone, Default)]
struct RecordingLink {
    written: Arc<Mutex<Vec<u8>>>,
}

impl RecordingLink {
    fn take(&self) -> Vec<u8> {
        std::mem::take(&mut *self.written.lock().unwrap())
    }
}

impl Write for RecordingLink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.written.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// フレームとして「その時点のランドマーク」を流すカメラ
struct ReplayCamera {
    frames: Vec<Option<LandmarkSet>>,
    cursor: usize,
    releases: Arc<Mutex<u32>>,
}

impl FrameSource for ReplayCamera {
    type Frame = Option<LandmarkSet>;

    fn resolution(&self) -> (u32, u32) {
        (1280, 720)
    }

    fn read_frame(&mut self) -> Result<Self::Frame> {
        let frame = self
            .frames
            .get(self.cursor)
            .cloned()
            .ok_or_else(|| anyhow!("end of stream"))?;
        self.cursor += 1;
        Ok(frame)
    }

    fn release(&mut self) {
        *self.releases.lock().unwrap() += 1;
    }
}

/// フレームに埋め込まれたランドマークをそのまま返す
struct PassThrough;

impl PoseEstimator<Option<LandmarkSet>> for PassThrough {
    fn estimate(&mut self, frame: &Option<LandmarkSet>) -> Result<Option<LandmarkSet>> {
        Ok(frame.clone())
    }
}

/// 指定フレーム数で停止を要求する
struct CountingPresenter {
    overlays: Vec<Option<[f64; 3]>>,
    stop_after: usize,
}

impl Presenter<Option<LandmarkSet>> for CountingPresenter {
    fn present(&mut self, _frame: &Option<LandmarkSet>, report: &FrameReport<'_>) -> Result<()> {
        self.overlays.push(
            report
                .solution
                .map(|s| [s.angles.shoulder, s.angles.elbow, s.angles.wrist]),
        );
        Ok(())
    }

    fn stop_requested(&mut self) -> bool {
        self.overlays.len() >= self.stop_after
    }
}

fn px(x: f32, y: f32) -> Landmark {
    Landmark::new(x / 1280.0, y / 720.0, 0.95)
}

/// 上腕は真下、前腕は水平、手は前腕の延長
fn bent_arm() -> LandmarkSet {
    let mut set = LandmarkSet::default();
    set.set(LandmarkIndex::LeftShoulder, px(640.0, 300.0));
    set.set(LandmarkIndex::LeftElbow, px(640.0, 450.0));
    set.set(LandmarkIndex::LeftWrist, px(700.0, 450.0));
    set.set(LandmarkIndex::LeftIndex, px(760.0, 450.0));
    set
}

fn open_session(link: RecordingLink) -> ActuatorSession<RecordingLink> {
    let config = Config::default();
    let channels = config.servo.channel_map().unwrap();
    ActuatorSession::open(link, "recording", channels, config.servo.params()).unwrap()
}

#[test]
fn test_open_configures_every_channel_once() {
    let link = RecordingLink::default();
    let _session = open_session(link.clone());

    let mut expected = Vec::new();
    for pin in [9, 10, 11, 12] {
        expected.extend(firmata::servo_config(pin, 544, 2400));
        expected.extend(firmata::servo_write(pin, 0));
    }
    assert_eq!(link.take(), expected);
}

#[test]
fn test_run_actuates_detected_frames_and_stops_cleanly() {
    let link = RecordingLink::default();
    let session = open_session(link.clone());
    link.take();

    let releases = Arc::new(Mutex::new(0));
    let camera = ReplayCamera {
        frames: vec![Some(bent_arm()), None, Some(bent_arm()), Some(bent_arm())],
        cursor: 0,
        releases: releases.clone(),
    };
    let presenter = CountingPresenter {
        overlays: Vec::new(),
        stop_after: 3,
    };

    let mut control = ControlLoop::new(
        Session::new(camera, session),
        PassThrough,
        presenter,
        ArmSolver::default(),
    );
    assert_eq!(control.run(), LoopState::StoppedClean);
    assert_eq!(*releases.lock().unwrap(), 1);

    // 検出フレーム2回分: 肩180 / 肘90 / 手首180
    let one_frame = [
        firmata::servo_write(9, 180),
        firmata::servo_write(10, 90),
        firmata::servo_write(11, 180),
    ]
    .concat();
    assert_eq!(link.take(), [one_frame.clone(), one_frame].concat());

    let overlays = &control.presenter().overlays;
    assert_eq!(overlays.len(), 3);
    assert!(overlays[1].is_none());
    let [shoulder, elbow, wrist] = overlays[0].unwrap();
    assert!((shoulder - 180.0).abs() < 1e-3);
    assert!((elbow - 90.0).abs() < 1e-3);
    assert!((wrist - 180.0).abs() < 1e-3);
}

#[test]
fn test_stream_end_is_error_stop() {
    let link = RecordingLink::default();
    let session = open_session(link.clone());
    link.take();

    let releases = Arc::new(Mutex::new(0));
    let camera = ReplayCamera {
        frames: vec![None, None],
        cursor: 0,
        releases: releases.clone(),
    };
    let presenter = CountingPresenter {
        overlays: Vec::new(),
        stop_after: usize::MAX,
    };

    let mut control = ControlLoop::new(Session::new(camera, session), PassThrough, presenter, ArmSolver::default());
    assert_eq!(control.step(), StepOutcome::Skipped);
    assert_eq!(control.step(), StepOutcome::Skipped);
    assert_eq!(control.step(), StepOutcome::Stopped(LoopState::StoppedError));
    assert_eq!(control.step(), StepOutcome::Stopped(LoopState::StoppedError));
    assert_eq!(*releases.lock().unwrap(), 1);
    assert!(link.take().is_empty());
}

#[test]
fn test_custom_mapping_and_right_arm() {
    let link = RecordingLink::default();
    let session = open_session(link.clone());
    link.take();

    // 右腕のランドマークに同じ姿勢を置く
    let left = bent_arm();
    let mut set = LandmarkSet::default();
    for (from, to) in [
        (LandmarkIndex::LeftShoulder, LandmarkIndex::RightShoulder),
        (LandmarkIndex::LeftElbow, LandmarkIndex::RightElbow),
        (LandmarkIndex::LeftWrist, LandmarkIndex::RightWrist),
        (LandmarkIndex::LeftIndex, LandmarkIndex::RightIndex),
    ] {
        set.set(to, *left.get(from));
    }

    // 手首だけ 0〜180 → 180〜0 に反転
    let identity = JointMapping::identity();
    let inverted = JointMapping::new(AngleRange::SERVO, AngleRange::new(180.0, 0.0)).unwrap();
    let solver = ArmSolver::new(ArmSide::Right, 100.0, [identity, identity, inverted]);

    let camera = ReplayCamera {
        frames: vec![Some(set)],
        cursor: 0,
        releases: Arc::new(Mutex::new(0)),
    };
    let presenter = CountingPresenter {
        overlays: Vec::new(),
        stop_after: usize::MAX,
    };
    let mut control = ControlLoop::new(Session::new(camera, session), PassThrough, presenter, solver);

    let StepOutcome::Actuated(commands) = control.step() else {
        panic!("right arm not detected");
    };
    assert_eq!(commands[1].channel, ServoChannel::Elbow);
    assert_eq!(commands[1].value, 90);
    assert_eq!(commands[2].channel, ServoChannel::Wrist);
    assert_eq!(commands[2].value, 0);
    assert_eq!(link.take()[6..9], firmata::servo_write(11, 0)[..]);
}
