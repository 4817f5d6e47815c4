pub mod catalog;
pub mod config;
pub mod editor;
pub mod error;
pub mod geometry;
pub mod ingest;
pub mod interaction;
pub mod logging;
pub mod render;
pub mod session;
pub use error::{AppError, AppResult};

use std::ffi::OsString;
use std::path::PathBuf;

use session::Session;

/// Entrypoint used by the CLI: replays the script named by the first argument.
pub fn run() -> AppResult<()> {
    run_with_args(std::env::args_os().skip(1))
}

pub fn run_with_args<I>(args: I) -> AppResult<()>
where
    I: IntoIterator<Item = OsString>,
{
    logging::init();
    let script = args
        .into_iter()
        .next()
        .map(PathBuf::from)
        .ok_or(AppError::Usage)?;

    let config = config::load_app_config();
    tracing::info!(
        script = %script.display(),
        canvas_width = config.canvas_width,
        canvas_height = config.canvas_height,
        fonts = config.fonts.len(),
        "starting pictor"
    );

    let mut session = Session::new(&config);
    let summary = session.run_script_file(&script)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    tracing::info!(renders = session.renders(), "session finished");
    Ok(())
}
