use anyhow::Result;
use tracing::error;
use whatdoing::{cli::run_cli, utils::runtime::single_thread_runtime};

fn main() -> Result<()> {
    single_thread_runtime()?.block_on(async {
        run_cli().await.inspect_err(|e| {
            error!("Error running cli {e:?}");
        })
    })?;
    Ok(())
}
