use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use mail2drive::config::schema::DEFAULT_LOG_FILE;
use mail2drive::config::{load_dotenv, Settings};
use mail2drive::drive::DriveStorage;
use mail2drive::email::ImapMailSource;
use mail2drive::logging;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Must run before anything reads the environment.
    let dotenv = load_dotenv();
    let settings = Settings::from_env();

    let log_file = settings
        .as_ref()
        .map(|settings| settings.log_file.clone())
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_LOG_FILE));
    init_logging(&log_file);

    match dotenv {
        Ok(Some(path)) => info!("Loaded environment from {}", path.display()),
        Ok(None) => {}
        Err(e) => warn!("{}", e),
    }

    let settings = match settings {
        Ok(settings) => settings,
        Err(e) => {
            error!("{}", e);
            return;
        }
    };

    info!("Starting mail2drive v{}", env!("CARGO_PKG_VERSION"));

    let mut mail = ImapMailSource::new(settings.imap.clone());
    let mut storage = match DriveStorage::new() {
        Ok(storage) => storage,
        Err(e) => {
            error!("Could not set up Google Drive client: {}", e);
            return;
        }
    };

    // Failures are already logged by the run; the process still exits cleanly.
    let _ = mail2drive::transfer::run(settings, &mut mail, &mut storage).await;
}

fn init_logging(log_file: &Path) {
    if let Err(e) = logging::init(log_file) {
        eprintln!("Failed to initialize logging: {}", e);
    }
}
