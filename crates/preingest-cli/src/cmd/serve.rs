use anyhow::Context;
use preingest_server::AppState;
use std::path::Path;

pub fn run(config_path: &Path, port: u16) -> anyhow::Result<()> {
    let settings = super::load_settings(config_path)?;
    for w in settings.ensure_valid()? {
        tracing::warn!("{}", w.message);
    }

    let database = settings.database_path();
    let state = AppState::new(settings)
        .with_context(|| format!("failed to open action store {}", database.display()))?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
        let actual_port = listener.local_addr()?.port();
        println!("preingest service → http://localhost:{actual_port}");

        tokio::select! {
            res = preingest_server::serve_on(state, listener) => res,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                Ok(())
            }
        }
    })
}
