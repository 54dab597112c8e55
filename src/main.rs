use log::{error, info};
use timelapse::configuration::Configuration;
use timelapse::data_capture::FfmpegEncoder;
use timelapse::error_handling::types::ControllerError;
use timelapse::storage::DatabaseStorage;
use timelapse::{Controller, RunOutcome};

#[tokio::main]
async fn main() {
    // https://docs.rs/env_logger/latest/env_logger/
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .format_target(false)
        .init();

    match capture().await {
        Ok(RunOutcome::Completed(summary)) if summary.write_failures > 0 => {
            error!(
                "{} captured frames could not be stored",
                summary.write_failures
            );
        }
        Ok(_) => {}
        Err(e) => {
            error!("Capture run aborted: {}", e);
            std::process::exit(1);
        }
    }
}

async fn capture() -> Result<RunOutcome, ControllerError> {
    let config = Configuration::from_args().resolve()?;
    info!(
        "Capturing from {} into table {}",
        config.streams_file.display(),
        config.database.table
    );

    let encoder = FfmpegEncoder::new(config.capture.ffmpeg_bin.clone(), config.capture.avif_speed);
    let controller = Controller::new(config, encoder);
    let outcome = controller
        .run(|| DatabaseStorage::connect_mysql(&controller.config().database))
        .await;
    outcome
}
