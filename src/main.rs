use actix_files::Files;
use actix_server::ServerHandle;
use actix_web::{
    App, HttpServer,
    web::{self, Data},
};
use anyhow::{Context, Result};
use env_logger::{Builder, Env, Target};
use jaqc_ui::{
    api::Api, config::AppConfig, jaqc_device_client::JaqcDeviceClient,
    services::store::FileSettingsStore,
};
use log::{debug, error, info};
use std::io::Write;
use tokio::signal::unix::{SignalKind, signal};

type UiApi = Api<JaqcDeviceClient, FileSettingsStore>;

#[actix_web::main]
async fn main() {
    if let Err(e) = run().await {
        error!("application error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    initialize()?;

    let mut sigterm =
        signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;

    let device_client = JaqcDeviceClient::new().context("failed to create device client")?;
    let store = FileSettingsStore::new(&AppConfig::get().paths.settings_file);

    let (server_handle, server_task) = run_server(device_client, store)?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            debug!("ctrl-c received");
        },
        _ = sigterm.recv() => {
            debug!("SIGTERM received");
        },
        result = server_task => {
            match result {
                Ok(Ok(())) => debug!("server stopped normally"),
                Ok(Err(e)) => error!("server stopped with error: {e}"),
                Err(e) => error!("server task panicked: {e}"),
            }
        },
    }

    server_handle.stop(true).await;
    info!("shutdown complete");

    Ok(())
}

fn initialize() -> Result<()> {
    log_panics::init();

    let mut builder = if cfg!(debug_assertions) {
        Builder::from_env(Env::default().default_filter_or("debug"))
    } else {
        Builder::from_env(Env::default().default_filter_or("info"))
    };

    builder.format(|f, record| match record.level() {
        log::Level::Error => {
            eprintln!("{}", record.args());
            Ok(())
        }
        _ => {
            writeln!(f, "{}", record.args())
        }
    });

    builder.target(Target::Stdout).init();

    info!("module version: {}", env!("CARGO_PKG_VERSION"));

    Ok(())
}

fn run_server(
    device_client: JaqcDeviceClient,
    store: FileSettingsStore,
) -> Result<(
    ServerHandle,
    tokio::task::JoinHandle<Result<(), std::io::Error>>,
)> {
    let config = &AppConfig::get();
    let ui_port = config.ui.port;
    let static_dir = config.paths.static_dir.clone();

    let api = UiApi::new(
        device_client,
        store,
        config.paths.index_html.clone(),
        config.device.submit_on_save,
    )
    .context("failed to create api")?;

    info!("starting server on port {ui_port}");

    let server = HttpServer::new(move || {
        App::new()
            .app_data(Data::new(api.clone()))
            .route("/", web::get().to(UiApi::index))
            .route("/panel", web::get().to(UiApi::panel_view))
            .route("/panel/edit", web::post().to(UiApi::enter_edit))
            .route("/panel/save", web::post().to(UiApi::save))
            .route("/panel/cancel", web::post().to(UiApi::cancel))
            .route("/update-ui", web::post().to(UiApi::update_ui))
            .route("/device-status", web::get().to(UiApi::device_status))
            .route("/version", web::get().to(UiApi::version))
            .service(Files::new("/static", static_dir.clone()))
    })
    .bind(format!("0.0.0.0:{ui_port}"))
    .context("failed to bind server")?
    .disable_signals()
    .run();

    Ok((server.handle(), tokio::spawn(server)))
}
