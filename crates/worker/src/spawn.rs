use std::sync::OnceLock;

use tokio::task::JoinHandle;

use crate::TaskClass;

fn runtime_handle() -> tokio::runtime::Handle {
	if let Ok(handle) = tokio::runtime::Handle::try_current() {
		return handle;
	}

	static GLOBAL_RT: OnceLock<tokio::runtime::Runtime> = OnceLock::new();
	let runtime = GLOBAL_RT.get_or_init(|| {
		tokio::runtime::Builder::new_multi_thread()
			.enable_all()
			.worker_threads(2)
			.thread_name("shade-worker-global")
			.build()
			.expect("failed to build shade-worker global tokio runtime")
	});
	runtime.handle().clone()
}

/// Spawns blocking work tagged with a worker class.
///
/// Used for CPU-bound passes so they never occupy async executor threads.
pub fn spawn_blocking<F, R>(class: TaskClass, f: F) -> JoinHandle<R>
where
	F: FnOnce() -> R + Send + 'static,
	R: Send + 'static,
{
	tracing::trace!(worker_class = class.as_str(), "worker.spawn_blocking");
	runtime_handle().spawn_blocking(f)
}

/// Spawns a dedicated named OS thread tagged with a worker class.
pub fn spawn_named_thread<F, R>(class: TaskClass, name: impl Into<String>, f: F) -> std::io::Result<std::thread::JoinHandle<R>>
where
	F: FnOnce() -> R + Send + 'static,
	R: Send + 'static,
{
	let name = name.into();
	tracing::trace!(worker_class = class.as_str(), thread = %name, "worker.spawn_named_thread");
	std::thread::Builder::new().name(name).spawn(f)
}
