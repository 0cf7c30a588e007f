use noisy_eyes::app;

fn main() {
    env_logger::init();
    log::info!("Noisy Eyes starting up");

    let options = app::RunOptions::from_env();
    if let Err(e) = app::run(options) {
        log::error!("Fatal error: {e}");
        std::process::exit(1);
    }
}
