//! Run one page through the pipeline and print the result to stdout.
//!
//! ```text
//! extract [--static] <url>
//! ```

use anyhow::{Result, bail};
use pagewash::{app_state::AppState, config::Config, session::RenderMode, telemetry};
use std::io::Write;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let mut config = Config::from_env()?;
    let mut target = None;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--static" => config = config.with_render_mode(RenderMode::Static),
            flag if flag.starts_with("--") => bail!("unknown flag {}", flag),
            _ if target.is_some() => bail!("only one url may be given"),
            _ => target = Some(arg),
        }
    }
    let Some(target) = target else {
        bail!("usage: extract [--static] <url>");
    };
    telemetry::init(config.log_format());

    let state = AppState::from_config(&config).await?;
    let result = state.extract(&target).await;
    state.session.shutdown().await.ok();
    let page = result?;

    info!(
        raw_bytes = page.size.raw_bytes,
        sanitized_bytes = page.size.sanitized_bytes,
        minified_bytes = page.size.minified_bytes,
        "done"
    );
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(page.html.as_bytes())?;
    stdout.write_all(b"\n")?;
    Ok(())
}
