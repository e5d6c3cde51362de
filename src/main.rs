use actix_web::{middleware::Logger, web, App, HttpServer};
use tracing::{error, info};

use trace_auth::logging::init_logging;
use trace_auth::sessions::spawn_sweeper;
use trace_auth::{configure, Config, TokenService};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    init_logging();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "Invalid configuration");
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, err));
        }
    };
    let addr = config.bind_addr();

    let service = web::Data::new(TokenService::new(&config));
    let sweeper = spawn_sweeper(service.sessions(), config.sweep_interval);

    info!(
        %addr,
        token_ttl_secs = config.token_ttl.as_secs(),
        version = env!("CARGO_PKG_VERSION"),
        "Listening"
    );

    let result = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(service.clone())
            .configure(configure)
    })
    .bind(addr)?
    .run()
    .await;

    sweeper.abort();
    result
}
