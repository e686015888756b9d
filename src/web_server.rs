use actix_web::{App, HttpServer, dev::Server, middleware, web};

use crate::config::ServerConfig;
use crate::routes::{AppState, execute_handler, json_error_handler};

pub fn build_server(server_config: ServerConfig, state: AppState) -> std::io::Result<Server> {
    let bind_address = server_config
        .bind_address
        .unwrap_or("127.0.0.1".to_string());
    let bind_port = server_config.bind_port.unwrap_or(8000);
    let state = web::Data::new(state);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .wrap(middleware::Logger::default())
            .service(web::resource("/execute").route(web::post().to(execute_handler)))
    })
    .bind((bind_address.as_str(), bind_port))?
    .run();

    log::info!("Listening on {bind_address}:{bind_port}");
    Ok(server)
}
