use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use arm_tracker::arm::ArmSolver;
use arm_tracker::camera::{FrameSource, OpenCvCamera};
use arm_tracker::config::Config;
use arm_tracker::control::{ControlLoop, LoopState, Session};
use arm_tracker::pose::LandmarkDetector;
use arm_tracker::render::MinifbRenderer;
use arm_tracker::servo::open_serial;

const CONFIG_PATH: &str = "config.toml";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::load_or_default(CONFIG_PATH)?;

    println!("Arm Tracker ({})", env!("GIT_VERSION"));
    println!("Camera: index={} {}x{}", config.camera.index, config.camera.width, config.camera.height);
    println!("Servo port: {} @ {} baud", config.servo.port, config.servo.baud_rate);
    println!();
    println!("操作: [Q] 終了");
    println!();

    let solver = ArmSolver::from_config(&config.arm).context("invalid angle mapping")?;
    info!(side = ?solver.side(), "tracking arm");

    let camera = OpenCvCamera::from_config(&config.camera).context("failed to open camera")?;
    let (width, height) = camera.resolution();

    // ボードのリセット待ちがあるので、カメラの後に接続する
    let actuators = open_serial(&config.servo)?;
    info!(port = %config.servo.port, "actuator session ready");

    let estimator = LandmarkDetector::new(&config.pose)?;

    let presenter = MinifbRenderer::new(
        &config.display.title,
        width as usize,
        height as usize,
        config.display.overlay,
    )?;

    let mut control = ControlLoop::new(Session::new(camera, actuators), estimator, presenter, solver);
    match control.run() {
        LoopState::StoppedError => warn!("control loop stopped on error"),
        state => info!(?state, "control loop finished"),
    }

    let (session, _, _) = control.into_parts();
    let failed = session.actuators.failed_writes();
    if failed > 0 {
        warn!(failed, "some servo writes failed");
    }

    Ok(())
}
