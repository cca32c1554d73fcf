use std::any::Any;

use tokio::task::JoinError;

/// Extracts a readable message from a caught panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(msg) = payload.downcast_ref::<&'static str>() {
		(*msg).to_string()
	} else if let Some(msg) = payload.downcast_ref::<String>() {
		msg.clone()
	} else {
		"non-string panic payload".to_string()
	}
}

/// Returns the panic message of a failed task, or `None` if it was cancelled.
pub fn join_error_panic_message(err: JoinError) -> Option<String> {
	if !err.is_panic() {
		return None;
	}
	let payload = err.into_panic();
	Some(panic_message(payload.as_ref()))
}
