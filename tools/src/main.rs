//! score-runner: headless front end for the idle score tracker.
//!
//! Usage:
//!   score-runner --seconds 10 --db save.db
//!   score-runner --ipc-mode --data-dir ./data
//!
//! The runner plays the presentation layer: it activates the session,
//! raises the reward dialog whenever idle points are pending, and in
//! headless mode claims the reward straight away.

use anyhow::Result;
use idlescore_core::{
    clock::SystemClock,
    config::TrackerConfig,
    driver::{DriverHandle, Intent, SessionDriver},
    event::SessionEvent,
    session::Session,
    state::{reward_pending, SessionState},
    store::ScoreStore,
};
use std::env;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetState,
    Increment,
    Claim,
    Activate,
    Background,
    Event { event: SessionEvent },
    Quit,
}

#[derive(serde::Serialize)]
struct UiState {
    score:          u64,
    reward_open:    bool,
    idle_time_ms:   u64,
    idle_points:    u64,
    update_time_ms: i64,
}

impl From<&SessionState> for UiState {
    fn from(s: &SessionState) -> Self {
        Self {
            score:          s.score,
            reward_open:    s.is_reward_open,
            idle_time_ms:   s.idle_time_ms,
            idle_points:    s.idle_points,
            update_time_ms: s.update_time_ms,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seconds = parse_arg(&args, "--seconds", 10u64);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let data_dir = flag_value(&args, "--data-dir").unwrap_or("./data");

    let mut config = TrackerConfig::load(data_dir)?;
    if let Some(db) = flag_value(&args, "--db") {
        config.db_path = db.to_string();
    }

    if !ipc_mode {
        println!("Idle Score — score-runner");
        println!("  seconds:   {seconds}");
        println!("  db:        {}", config.db_path);
        println!("  data_dir:  {data_dir}");
        println!();
    }

    let store = ScoreStore::open(&config.db_path)?;
    store.migrate()?;
    let session = Session::restore(store, config.journal_enabled);
    let (driver, handle) = SessionDriver::new(session, SystemClock, &config);
    let driver_task = tokio::spawn(driver.run());
    log::info!(
        "score-runner started: db={} mode={}",
        config.db_path,
        if ipc_mode { "ipc" } else { "headless" }
    );

    if ipc_mode {
        run_ipc_loop(&handle).await?;
    } else {
        run_headless(&handle, seconds).await?;
    }

    handle.shutdown().await?;
    let session = driver_task.await?;
    if !ipc_mode {
        print_summary(session.state(), session.session_id());
    }
    Ok(())
}

async fn run_headless(handle: &DriverHandle, seconds: u64) -> Result<()> {
    let state = handle.activate().await?;
    if state.idle_points > 0 {
        println!(
            "Welcome back! You were away {:.1}s and earned {} idle points.",
            state.idle_time_ms as f64 / 1000.0,
            state.idle_points
        );
    }
    let state = present(handle, state).await?;
    if state.is_reward_open {
        claim(handle).await?;
    }

    tokio::time::sleep(std::time::Duration::from_secs(seconds)).await;
    handle.background().await?;
    Ok(())
}

async fn run_ipc_loop(handle: &DriverHandle) -> Result<()> {
    let mut lines = BufReader::new(io::stdin()).lines();
    let mut stdout = io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let cmd: IpcCommand = match serde_json::from_str(&line) {
            Ok(c) => c,
            Err(e) => {
                log::warn!("Malformed IPC line ignored: {e}");
                let err_json = serde_json::json!({ "error": e.to_string() });
                stdout.write_all(format!("{err_json}\n").as_bytes()).await?;
                stdout.flush().await?;
                continue;
            }
        };

        let state = match cmd {
            IpcCommand::Quit => break,
            IpcCommand::GetState => handle.state(),
            IpcCommand::Increment => handle.intent(Intent::Increment).await?,
            IpcCommand::Claim => claim(handle).await?,
            IpcCommand::Activate => handle.activate().await?,
            IpcCommand::Background => handle.background().await?,
            IpcCommand::Event { event } => handle.dispatch(event).await?,
        };
        let state = present(handle, state).await?;

        let json = serde_json::to_string(&UiState::from(&state))?;
        stdout.write_all(format!("{json}\n").as_bytes()).await?;
        stdout.flush().await?;
    }
    Ok(())
}

/// Raise the reward dialog when idle points are waiting.
async fn present(handle: &DriverHandle, state: SessionState) -> Result<SessionState> {
    if reward_pending(&state) {
        return Ok(handle.intent(Intent::OpenReward).await?);
    }
    Ok(state)
}

/// Collect the reward, then dismiss the dialog. Closing alone never awards.
async fn claim(handle: &DriverHandle) -> Result<SessionState> {
    handle.intent(Intent::ClaimReward).await?;
    Ok(handle.intent(Intent::CloseReward).await?)
}

fn print_summary(state: &SessionState, session_id: Option<&str>) {
    println!("=== SESSION SUMMARY ===");
    if let Some(id) = session_id {
        println!("  session_id:     {id}");
    }
    println!("  score:          {}", state.score);
    println!("  updateTimeMs:   {}", state.update_time_ms);
    println!("  pending idle:   {}", state.idle_points);
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    flag_value(args, flag)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
