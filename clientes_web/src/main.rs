mod error;
mod extract;
mod routes;

use std::{error::Error, process::ExitCode, time::Duration};

use axum_server::{tls_rustls::RustlsConfig, Handle};
use clientes::{
    infrastructure::JsonFileCustomerRepository, service::CustomerService, ClientesConfig,
};
use tracing::{error, info, Level};

#[tokio::main]
async fn main() -> ExitCode {
    match ClientesConfig::load() {
        Ok(config) => {
            tracing_subscriber::fmt()
                .with_max_level(Level::from(&config.logger.level))
                .init();
            if let Err(error) = serve(&config).await {
                error!("アプリケーションエラー: {}", error);
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Err(error) => {
            tracing_subscriber::fmt::init();
            error!("設定の読み込みに失敗しました: {}", error);
            ExitCode::FAILURE
        }
    }
}

async fn serve(config: &ClientesConfig) -> Result<(), Box<dyn Error>> {
    let repository = JsonFileCustomerRepository::new(&config.store.path);
    let service = CustomerService::spawn(repository, config.store.id_policy);
    let app = routes::router(service);

    let handle = Handle::new();
    tokio::spawn(shutdown_signal(handle.clone()));

    let addr = config.server.addr;
    match &config.server.tls {
        Some(tls) => {
            let rustls = RustlsConfig::from_pem_file(&tls.cert, &tls.key).await?;
            info!("Servidor rodando em https://localhost:{}", addr.port());
            axum_server::bind_rustls(addr, rustls)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            info!("Servidor rodando em http://localhost:{}", addr.port());
            axum_server::bind(addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
    }
    Ok(())
}

async fn shutdown_signal(handle: Handle) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("シャットダウンします");
            handle.graceful_shutdown(Some(Duration::from_secs(10)));
        }
        Err(e) => error!("シグナルの待ち受けに失敗しました: {}", e),
    }
}
