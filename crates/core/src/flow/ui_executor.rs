use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{JoinHandle, ThreadId};

use crossbeam_channel::Sender;

type Job = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Run(Job),
    Shutdown,
}

/// The single execution context that owns UI-visible state.
///
/// Jobs posted from any thread run one at a time, in posting order, on a
/// dedicated thread. Handles are cheap to clone; the thread exits on
/// [`UiExecutor::shutdown`] or when the last handle is dropped.
#[derive(Clone)]
pub struct UiExecutor {
    inner: Arc<Inner>,
}

struct Inner {
    tx: Sender<Message>,
    thread_id: ThreadId,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl UiExecutor {
    pub fn spawn(name: &str) -> std::io::Result<Self> {
        let (tx, rx) = crossbeam_channel::unbounded::<Message>();
        let handle = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                for message in rx {
                    match message {
                        Message::Run(job) => job(),
                        Message::Shutdown => break,
                    }
                }
            })?;
        let thread_id = handle.thread().id();

        Ok(Self {
            inner: Arc::new(Inner {
                tx,
                thread_id,
                handle: Mutex::new(Some(handle)),
            }),
        })
    }

    /// Queues `job` behind everything posted so far.
    ///
    /// Returns false if the executor has already shut down.
    pub fn post(&self, job: impl FnOnce() + Send + 'static) -> bool {
        self.inner.tx.send(Message::Run(Box::new(job))).is_ok()
    }

    /// True when called from the executor's own thread.
    pub fn is_current(&self) -> bool {
        std::thread::current().id() == self.inner.thread_id
    }

    /// Blocks until every job posted before this call has run.
    ///
    /// Returns immediately on the executor thread itself.
    pub fn flush(&self) {
        if self.is_current() {
            return;
        }
        let (done_tx, done_rx) = crossbeam_channel::bounded::<()>(1);
        if self.post(move || {
            let _ = done_tx.send(());
        }) {
            let _ = done_rx.recv();
        }
    }

    /// Stops the thread after the jobs already queued have run.
    pub fn shutdown(&self) {
        let _ = self.inner.tx.send(Message::Shutdown);
        if self.is_current() {
            return;
        }
        let handle = self
            .inner
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                log::error!("UI thread panicked");
            }
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let _ = self.tx.send(Message::Shutdown);
    }
}
