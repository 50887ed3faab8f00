//! LockScreen simulator binary.
//!
//! # Usage
//!
//! ```bash
//! # Interactive, no passcode
//! gaia-lockscreen-sim
//!
//! # Passcode 1234, skipped when relocking within 30 seconds
//! gaia-lockscreen-sim --passcode-enabled --passcode 1234 --passcode-timeout 30
//!
//! # Replay a script
//! gaia-lockscreen-sim --passcode-enabled --script unlock.txt
//! ```

use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use gaia_lockscreen_app::{Runtime, RuntimeConfig, SystemEnv};
use gaia_lockscreen_core::{
    MemorySettings, SettingValue, SettingsStore,
    settings::{PASSCODE_CODE, PASSCODE_ENABLED, PASSCODE_TIMEOUT},
};
use gaia_lockscreen_sim::{ConsoleDriver, ConsoleError};
use tokio::io::{AsyncBufRead, BufReader};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Gaia LockScreen simulator
#[derive(Parser, Debug)]
#[command(name = "gaia-lockscreen-sim")]
#[command(about = "Drive the LockScreen state machine from the command line")]
#[command(version)]
struct Args {
    /// Require a passcode to unlock
    #[arg(long)]
    passcode_enabled: bool,

    /// Passcode digits
    #[arg(long, default_value = "0000")]
    passcode: String,

    /// Seconds after which a relock asks for the passcode again
    #[arg(long)]
    passcode_timeout: Option<i64>,

    /// Read commands from this file instead of stdin
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// Answer input pad and unlock requests by hand
    #[arg(long)]
    manual_platform: bool,

    /// Offset of local time from UTC, in minutes
    #[arg(long, default_value = "0", allow_negative_numbers = true)]
    utc_offset: i32,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

impl Args {
    fn settings(&self) -> MemorySettings {
        let mut values = vec![
            (PASSCODE_ENABLED, SettingValue::from(self.passcode_enabled)),
            (PASSCODE_CODE, SettingValue::from(self.passcode.as_str())),
        ];
        if let Some(secs) = self.passcode_timeout {
            values.push((PASSCODE_TIMEOUT, SettingValue::from(secs)));
        }
        MemorySettings::with_values(values)
    }

    fn config(&self) -> RuntimeConfig {
        let mut config = RuntimeConfig::default();
        config.clock.utc_offset_minutes = self.utc_offset;
        if !self.passcode.is_empty() {
            config.lock_screen.passcode_length = self.passcode.len();
        }
        config
    }
}

async fn run<R>(input: R, args: &Args) -> Result<(), ConsoleError>
where
    R: AsyncBufRead + Unpin + Send,
{
    let mut driver = ConsoleDriver::new(input, std::io::stdout());
    if args.manual_platform {
        driver = driver.with_manual_platform();
    }
    let settings: Arc<dyn SettingsStore> = Arc::new(args.settings());

    let mut runtime = Runtime::new(driver, SystemEnv, settings, args.config());
    runtime.run().await
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer().with_writer(std::io::stderr)).with(filter).init();

    tracing::info!(passcode_enabled = args.passcode_enabled, script = ?args.script, "LockScreen simulator starting");

    match &args.script {
        Some(path) => {
            let file = tokio::fs::File::open(path).await?;
            run(BufReader::new(file), &args).await?;
        },
        None => run(BufReader::new(tokio::io::stdin()), &args).await?,
    }

    Ok(())
}
