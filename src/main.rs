use anyhow::{Context, Result};
use salarydash::data::{load, source_from_config};
use salarydash::logging::{log, log_startup, obj, v_str, Domain, Level};
use salarydash::server::serve;
use salarydash::state::{AppState, Config};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();
    let source = source_from_config(&cfg)?;
    log_startup(&cfg.bind_addr, &source.origin());

    // The table is fetched exactly once; without it there is nothing to serve.
    let dataset = match load(source.as_ref()).await {
        Ok(ds) => ds,
        Err(err) => {
            log(
                Level::Fatal,
                Domain::Data,
                "load_failed",
                obj(&[("error", v_str(&format!("{:#}", err)))]),
            );
            return Err(err);
        }
    };

    let state = AppState::new(dataset, &cfg);
    let listener = TcpListener::bind(&cfg.bind_addr)
        .await
        .with_context(|| format!("binding {}", cfg.bind_addr))?;
    println!("Salary dashboard running at http://{}", cfg.bind_addr);
    serve(listener, state).await
}
