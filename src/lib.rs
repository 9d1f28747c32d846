pub mod api;
pub mod app;
pub mod auth;
pub mod components;
pub mod config;
pub mod db;
pub mod error;
pub mod forms;
pub mod models;
pub mod pages;
pub mod payments;
pub mod rate_limit;
pub mod server_fns;
pub mod state;

use std::{io, path::Path};

use actix_cors::Cors;
use actix_files::Files;
use actix_web::{middleware, web, App, HttpServer};
use leptos::LeptosOptions;
use leptos_actix::{generate_route_list, LeptosRoutes};
use log::info;

use crate::{config::Config, error::AppError, rate_limit::limit_by_ip, state::AppState};

/// Largest JSON body accepted on the API.
pub const JSON_LIMIT: usize = 10 * 1024;

/// Any origin may call the API, as long as it does not need cookies.
fn api_cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .send_wildcard()
        .allow_any_method()
        .allow_any_header()
        .max_age(3600)
}

/// Rendering options for the pages. The hydration bundle would live under
/// `<static_dir>/pkg`; pages work without it.
pub fn site_options(config: &Config) -> LeptosOptions {
    LeptosOptions::builder()
        .output_name("natours".to_string())
        .site_root(config.static_dir.clone())
        .build()
}

/// Registers the API, webhook and form routes plus the extractor error
/// handlers. The pages themselves are added with `leptos_routes`. Tests mount
/// this on a bare `App` next to an [`AppState`].
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(JSON_LIMIT)
            .error_handler(|err, _req| {
                AppError::bad_request(format!("Invalid input data. {err}")).into()
            }),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| AppError::bad_request(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::bad_request(err.to_string()).into()),
    )
    .configure(api::webhook::configure)
    .configure(forms::configure)
    .route("/api/views/{tail:.*}", leptos_actix::handle_server_fns())
    .service(
        web::scope("/api/v1")
            .wrap(middleware::from_fn(limit_by_ip))
            .wrap(api_cors())
            .configure(api::tours::configure)
            .configure(api::users::configure)
            .configure(api::reviews::configure)
            .configure(api::bookings::configure),
    )
    .default_service(web::to(api::not_found));
}

pub async fn run(config: Config) -> io::Result<()> {
    error::expose_internal_details(!config.is_production());

    let bind_address = config.bind_address();
    let site = site_options(&config);
    let routes = generate_route_list(app::App);
    let static_dir = Path::new(&config.static_dir)
        .is_dir()
        .then(|| config.static_dir.clone());

    let state = AppState::new(config)
        .await
        .map_err(|e| io::Error::other(e.to_string()))?;
    let state = web::Data::new(state);

    match &static_dir {
        Some(dir) => info!("[SERVER] Serving static files from {dir}"),
        None => info!("[SERVER] No static directory, pages render without assets"),
    }
    info!("[SERVER] Listening on http://{bind_address}");

    HttpServer::new(move || {
        let mut app = App::new()
            .app_data(state.clone())
            .wrap(middleware::Compress::default())
            .wrap(middleware::Logger::default())
            .wrap(
                middleware::DefaultHeaders::new()
                    .add(("X-Content-Type-Options", "nosniff"))
                    .add(("X-Frame-Options", "DENY")),
            )
            .configure(configure)
            .leptos_routes(site.clone(), routes.clone(), app::App);
        if let Some(dir) = &static_dir {
            app = app.service(
                Files::new("/", dir)
                    .index_file("index.html")
                    .default_handler(web::to(api::not_found)),
            );
        }
        app
    })
    .bind(&bind_address)?
    .run()
    .await
}
