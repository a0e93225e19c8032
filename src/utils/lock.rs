//! Lock utilities for async contexts
//!
//! Helpers for the shared registry: one writer at a time during
//! registration, any number of concurrent readers during resolution.

use tokio::sync::RwLock;

/// Execute a closure with a read lock, automatically releasing it
///
/// # Example
/// ```rust
/// use modlink::utils::with_read_lock;
/// use modlink::Registry;
///
/// # async fn demo() {
/// let shared = Registry::new().into_shared();
/// let names = with_read_lock(&shared, |registry| registry.all_names()).await;
/// # }
/// ```
pub async fn with_read_lock<T, F, R>(rwlock: &RwLock<T>, f: F) -> R
where
    F: FnOnce(&T) -> R,
{
    let guard = rwlock.read().await;
    f(&guard)
}

/// Execute a closure with a write lock, automatically releasing it
///
/// # Example
/// ```rust
/// use modlink::utils::with_write_lock;
/// use modlink::Registry;
///
/// # async fn demo() -> Result<(), modlink::UnitError> {
/// let shared = Registry::new().into_shared();
/// with_write_lock(&shared, |registry| {
///     registry.register("Core", ".", Vec::<String>::new())
/// })
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn with_write_lock<T, F, R>(rwlock: &RwLock<T>, f: F) -> R
where
    F: FnOnce(&mut T) -> R,
{
    let mut guard = rwlock.write().await;
    f(&mut guard)
}
