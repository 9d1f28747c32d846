use log::error;
use natours::config::Config;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("[SERVER] Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    natours::run(config).await
}
