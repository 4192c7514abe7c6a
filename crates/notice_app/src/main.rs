use notice_app::app::{run, AppConfig};

fn main() {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    let config = AppConfig::from_env().unwrap_or_default();
    if let Err(err) = run(config) {
        eprintln!("Failed to start noticeboard: {err:#}");
        std::process::exit(1);
    }
}
