use std::process::ExitCode;

use engine::run_headless;
use tracing::{error, info};

use super::bootstrap::AppWiring;

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let AppWiring {
        config,
        mut world,
        mut session,
    } = app;

    match run_headless(config, &mut world, &mut session) {
        Ok(summary) => {
            info!(
                ticks_run = summary.ticks_run,
                quit_requested = summary.quit_requested,
                combats_started = summary.combats_started,
                arrivals = summary.arrivals,
                digest = %world.state_digest_hex(),
                "session_finished"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "session_failed");
            ExitCode::FAILURE
        }
    }
}
