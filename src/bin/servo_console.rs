use anyhow::{bail, Result};
use std::io::{self, Write};
use std::thread;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use arm_tracker::config::Config;
use arm_tracker::servo::{open_serial, SerialSession, ServoChannel, ServoCommand};

const CONFIG_PATH: &str = "config.toml";
const SWEEP_STEP: i32 = 10;
const SWEEP_INTERVAL: Duration = Duration::from_millis(200);

fn parse_degrees(s: &str) -> Result<i32> {
    let deg: i32 = s.parse()?;
    if !(0..=ServoCommand::MAX_DEGREES).contains(&deg) {
        bail!("角度は 0〜{} で指定してください: {}", ServoCommand::MAX_DEGREES, deg);
    }
    Ok(deg)
}

fn sweep(session: &mut SerialSession, channel: ServoChannel) {
    let up = (0..=ServoCommand::MAX_DEGREES).step_by(SWEEP_STEP as usize);
    let down = (0..ServoCommand::MAX_DEGREES).rev().step_by(SWEEP_STEP as usize);
    for deg in up.chain(down) {
        session.send(ServoCommand::new(channel, deg));
        println!("  {} = {}", channel, deg);
        thread::sleep(SWEEP_INTERVAL);
    }
}

fn execute(session: &mut SerialSession, parts: &[&str]) -> Result<bool> {
    match parts {
        ["s", channel, deg] => {
            let channel: ServoChannel = channel.parse()?;
            let command = ServoCommand::new(channel, parse_degrees(deg)?);
            session.send(command);
            println!("{} (pin {}) = {}", channel, session.pin(channel), command.value);
        }
        ["a", deg] => {
            let deg = parse_degrees(deg)?;
            for channel in ServoChannel::ALL {
                session.send(ServoCommand::new(channel, deg));
            }
            println!("全チャンネル = {}", deg);
        }
        ["sweep", channel] => {
            let channel: ServoChannel = channel.parse()?;
            println!("スイープ中...");
            sweep(session, channel);
        }
        ["q"] => return Ok(false),
        _ => println!("不明なコマンド"),
    }
    Ok(true)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::load_or_default(CONFIG_PATH)?;

    println!("=== Arm Tracker - Servo Console ({}) ===", env!("GIT_VERSION"));
    println!("接続先: {} @ {} baud", config.servo.port, config.servo.baud_rate);
    println!();
    println!("コマンド:");
    println!("  s <channel> <deg> - 1チャンネルに角度を送信 (例: s elbow 90)");
    println!("  a <deg>           - 全チャンネルに同じ角度を送信");
    println!("  sweep <channel>   - 0〜180度を往復");
    println!("  q                 - 終了");
    println!(
        "  channel: {}",
        ServoChannel::ALL.map(|c| c.name()).join(" / ")
    );
    println!();

    let mut session = open_serial(&config.servo)?;
    println!("接続しました");

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let parts: Vec<&str> = input.split_whitespace().collect();
        if parts.is_empty() {
            continue;
        }

        match execute(&mut session, &parts) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => println!("エラー: {}", e),
        }
    }

    if session.failed_writes() > 0 {
        println!("書き込み失敗: {} 回", session.failed_writes());
    }
    println!("終了");
    Ok(())
}
