use log::info;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use actix_web::{App, HttpServer, web};

use pigpio_sysfs::{AppConfig, AppState, GpioManager, PinTable};

#[cfg(not(feature = "hardware-gpio"))]
use pigpio_sysfs::MockGpioBackend;
#[cfg(feature = "hardware-gpio")]
use pigpio_sysfs::SysfsBackend;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("PIGPIO_CONFIG").ok())
        .unwrap_or_else(|| "config.json".to_string());
    let config = AppConfig::load_from_file(&config_path)
        .unwrap_or_else(|e| panic!("Failed to load config: {e}"));

    let pins = Arc::new(
        PinTable::load(&config.gpio.board_info)
            .unwrap_or_else(|e| panic!("Failed to detect board revision: {e}")),
    );

    let backend = {
        #[cfg(feature = "hardware-gpio")]
        {
            Arc::new(SysfsBackend::new(config.gpio.admin_tool.clone()))
        }
        #[cfg(not(feature = "hardware-gpio"))]
        {
            Arc::new(MockGpioBackend::new(config.gpio.sysfs_path.clone()))
        }
    };

    let manager = Arc::new(GpioManager::new(
        pins,
        backend,
        config.gpio.sysfs_path.clone(),
    ));
    let app_state = AppState { manager };

    let scope_path = config.http.path.clone();
    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .service(app_state.api_scope(&scope_path))
    });

    let bind_addrs: String;
    let http_cfg = config.http;
    let server = match (&http_cfg.unix_socket, &http_cfg.host) {
        (Some(socket_path), Some(host)) => {
            if Path::new(socket_path).exists() {
                fs::remove_file(socket_path)?;
            }
            bind_addrs = format!("{} and {}", socket_path, host);

            server.bind_uds(socket_path)?.bind(host)?
        }
        (Some(socket_path), None) => {
            if Path::new(socket_path).exists() {
                fs::remove_file(socket_path)?;
            }
            bind_addrs = socket_path.clone();

            server.bind_uds(socket_path)?
        }
        (None, Some(host)) => {
            bind_addrs = host.clone();

            server.bind(host)?
        }
        _ => {
            panic!("Config error: either 'unix_socket' or 'host' must be specified")
        }
    };

    info!("Starting server on {}...", bind_addrs);

    server.run().await
}
