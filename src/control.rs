//! Per-frame control loop: acquire → estimate → solve → actuate → present → poll.

use std::io::Write;
use std::time::Instant;

use tracing::{debug, error, info, trace, warn};

use crate::arm::ArmSolver;
use crate::camera::FrameSource;
use crate::pose::PoseEstimator;
use crate::render::{FrameReport, Presenter};
use crate::servo::{ActuatorSession, ServoCommand};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    /// オペレータの停止要求
    StoppedClean,
    /// フレーム取得失敗など
    StoppedError,
}

impl LoopState {
    pub fn is_terminal(self) -> bool {
        self != LoopState::Running
    }
}

/// 1イテレーションの結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// 肩・肘・手首の順に送信した指令
    Actuated([ServoCommand; 3]),
    /// 未検出のため送信なし
    Skipped,
    /// ループ終了
    Stopped(LoopState),
}

/// カメラとアクチュエータ接続の所有者（起動時に一度だけ作る）
pub struct Session<C, W: Write> {
    pub camera: C,
    pub actuators: ActuatorSession<W>,
}

impl<C, W: Write> Session<C, W> {
    pub fn new(camera: C, actuators: ActuatorSession<W>) -> Self {
        Self { camera, actuators }
    }
}

#[derive(Debug, Default)]
struct Throughput {
    frames: u32,
    actuated: u32,
    since: Option<Instant>,
}

impl Throughput {
    fn tick(&mut self, actuated: bool) {
        let since = *self.since.get_or_insert_with(Instant::now);
        self.frames += 1;
        if actuated {
            self.actuated += 1;
        }
        let elapsed = since.elapsed().as_secs_f32();
        if elapsed >= 1.0 {
            debug!(
                fps = format_args!("{:.1}", self.frames as f32 / elapsed),
                actuated = self.actuated,
                "loop throughput"
            );
            *self = Self {
                since: Some(Instant::now()),
                ..Self::default()
            };
        }
    }
}

pub struct ControlLoop<C, E, P, W>
where
    C: FrameSource,
    E: PoseEstimator<C::Frame>,
    P: Presenter<C::Frame>,
    W: Write,
{
    session: Session<C, W>,
    estimator: E,
    presenter: P,
    solver: ArmSolver,
    state: LoopState,
    throughput: Throughput,
}

impl<C, E, P, W> ControlLoop<C, E, P, W>
where
    C: FrameSource,
    E: PoseEstimator<C::Frame>,
    P: Presenter<C::Frame>,
    W: Write,
{
    pub fn new(session: Session<C, W>, estimator: E, presenter: P, solver: ArmSolver) -> Self {
        Self {
            session,
            estimator,
            presenter,
            solver,
            state: LoopState::Running,
            throughput: Throughput::default(),
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn session(&self) -> &Session<C, W> {
        &self.session
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    /// 終了状態へ遷移し、カメラを解放する
    fn stop(&mut self, state: LoopState) -> StepOutcome {
        if !self.state.is_terminal() {
            self.state = state;
            self.session.camera.release();
        }
        StepOutcome::Stopped(self.state)
    }

    /// 1フレーム分の処理
    pub fn step(&mut self) -> StepOutcome {
        if self.state.is_terminal() {
            return StepOutcome::Stopped(self.state);
        }

        let frame = match self.session.camera.read_frame() {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Failed to grab frame: {:#}", e);
                return self.stop(LoopState::StoppedError);
            }
        };

        let landmarks = match self.estimator.estimate(&frame) {
            Ok(landmarks) => landmarks,
            Err(e) => {
                error!("Pose estimation failed: {:#}", e);
                return self.stop(LoopState::StoppedError);
            }
        };

        let (frame_w, frame_h) = self.session.camera.resolution();
        let solution = match self.solver.solve(landmarks.as_ref(), frame_w, frame_h) {
            Ok(solution) => solution,
            Err(e) => {
                error!("Angle mapping failed: {}", e);
                return self.stop(LoopState::StoppedError);
            }
        };

        match &solution {
            Some(solution) => {
                for command in solution.commands {
                    self.session.actuators.send(command);
                }
                trace!(
                    shoulder = solution.commands[0].value,
                    elbow = solution.commands[1].value,
                    wrist = solution.commands[2].value,
                    "servo commands sent"
                );
            }
            None => trace!("no arm detected, skipping actuation"),
        }
        self.throughput.tick(solution.is_some());

        let report = FrameReport {
            landmarks: landmarks.as_ref(),
            solution: solution.as_ref(),
        };
        if let Err(e) = self.presenter.present(&frame, &report) {
            error!("Display failed: {:#}", e);
            return self.stop(LoopState::StoppedError);
        }

        if self.presenter.stop_requested() {
            info!("stop requested");
            return self.stop(LoopState::StoppedClean);
        }

        match solution {
            Some(solution) => StepOutcome::Actuated(solution.commands),
            None => StepOutcome::Skipped,
        }
    }

    /// 終了状態になるまでループ
    pub fn run(&mut self) -> LoopState {
        while !self.state.is_terminal() {
            self.step();
        }
        self.state
    }

    /// ループを閉じて所有物を返す
    pub fn into_parts(self) -> (Session<C, W>, E, P) {
        (self.session, self.estimator, self.presenter)
    }
}
