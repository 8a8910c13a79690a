use anyhow::Result;

/// The session is a single conversational loop plus a sleeping reminder, one thread is plenty.
pub fn single_thread_runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}
