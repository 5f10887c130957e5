//! Test doubles for the transport layer.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use super::{ConnectionHandler, ConnectionStream};

/// Counts accepted connections and drops them immediately.
///
/// The name of each serving thread is kept so tests can check how sessions
/// show up in logs.
pub(crate) struct CountingHandler {
    count: Arc<AtomicUsize>,
    threads: Mutex<Vec<String>>,
}

impl CountingHandler {
    pub(crate) fn new() -> (Arc<AtomicUsize>, Arc<Self>) {
        let count = Arc::new(AtomicUsize::new(0));
        let handler = Arc::new(Self {
            count: Arc::clone(&count),
            threads: Mutex::new(Vec::new()),
        });
        (count, handler)
    }

    pub(crate) fn thread_names(&self) -> Vec<String> {
        let mut names = self.threads.lock().expect("thread names lock").clone();
        names.sort();
        names
    }
}

impl ConnectionHandler for CountingHandler {
    fn handle(&self, _stream: ConnectionStream) {
        let name = thread::current().name().unwrap_or_default().to_owned();
        self.threads.lock().expect("thread names lock").push(name);
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}
