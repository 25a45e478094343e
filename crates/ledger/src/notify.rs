//! Change notification bus.
//!
//! Listeners are identified by `Arc` pointer: subscribing the same `Arc`
//! twice has no extra effect and unsubscribing removes exactly that
//! listener. Every publish dispatches one job onto the main context that
//! invokes the current listener snapshot in order; a panicking listener is
//! caught and logged so it cannot stop the rest.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex};

use crate::context::Context;

pub type ChangeListener = Arc<dyn Fn() + Send + Sync>;

pub struct ChangeNotifier {
    listeners: Mutex<Vec<ChangeListener>>,
    main: Context,
}

impl ChangeNotifier {
    pub fn new(main: Context) -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
            main,
        }
    }

    pub fn subscribe(&self, listener: ChangeListener) {
        let mut listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
        if !listeners.iter().any(|l| Arc::ptr_eq(l, &listener)) {
            listeners.push(listener);
        }
    }

    pub fn unsubscribe(&self, listener: &ChangeListener) {
        let mut listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
        listeners.retain(|l| !Arc::ptr_eq(l, listener));
    }

    /// Invokes every currently subscribed listener on the main context.
    pub fn publish(&self) {
        let snapshot: Vec<ChangeListener> = {
            let listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
            listeners.clone()
        };
        if snapshot.is_empty() {
            return;
        }
        self.main.submit(async move {
            for listener in snapshot {
                if catch_unwind(AssertUnwindSafe(|| listener())).is_err() {
                    tracing::error!("change listener panicked, continuing with the rest");
                }
            }
        });
    }
}
