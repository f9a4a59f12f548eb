//! Presentation-facing entry points. Each controller owns its view state in
//! a `watch` channel and hands out one-shot events through an [`EventQueue`].
//!
//! [`EventQueue`]: crate::event::EventQueue

mod channel_list;
mod chat;
mod session;

pub use channel_list::{ChannelListController, ChannelListEvent};
pub use chat::{ChatController, ChatEvent};
pub use session::{SessionController, SessionEvent};

use std::sync::{Mutex, MutexGuard};

use tokio::task::JoinHandle;

/// The one background subscription task a controller runs. Starting a new
/// one aborts the old one, which drops its subscription and releases the
/// listener.
#[derive(Default)]
struct TaskSlot {
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl TaskSlot {
    fn replace(&self, handle: JoinHandle<()>) {
        if let Some(previous) = self.lock().replace(handle) {
            previous.abort();
        }
    }

    fn stop(&self) {
        if let Some(handle) = self.lock().take() {
            handle.abort();
        }
    }

    fn is_running(&self) -> bool {
        self.lock().as_ref().is_some_and(|h| !h.is_finished())
    }

    fn lock(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.handle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for TaskSlot {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
async fn settle() {
    // Let aborted tasks unwind and spawned tasks catch up.
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}
