/*
[INPUT]:  Any fallible future from this crate plus a completion callback
[OUTPUT]: The same outcome delivered to the callback
[POS]:    Crate root - callback-style adapter over async operations
[UPDATE]: When callers need another completion convention
*/

use std::future::Future;

use tokio::task::JoinHandle;

use crate::http::Result;

/// Await `operation` and hand its result to `callback`.
///
/// The callback sees exactly what awaiting the future directly would return.
pub async fn with_callback<T, F, C>(operation: F, callback: C)
where
    F: Future<Output = Result<T>>,
    C: FnOnce(Result<T>),
{
    callback(operation.await);
}

/// Run `operation` on the Tokio runtime and report through `callback`
pub fn spawn_with_callback<T, F, C>(operation: F, callback: C) -> JoinHandle<()>
where
    T: Send + 'static,
    F: Future<Output = Result<T>> + Send + 'static,
    C: FnOnce(Result<T>) + Send + 'static,
{
    tokio::spawn(with_callback(operation, callback))
}
