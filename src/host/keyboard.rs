//! Keyboard observation shared with the probe aggregator

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Most recent key event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyboardState {
    pub last_key: String,
    pub caps_lock: bool,
}

impl Default for KeyboardState {
    fn default() -> Self {
        Self {
            last_key: "None".to_string(),
            caps_lock: false,
        }
    }
}

/// Observable keyboard state; events are only recorded while a listener is installed
#[derive(Debug, Clone)]
pub struct KeyboardMonitor {
    state: Arc<watch::Sender<KeyboardState>>,
    installed: Arc<AtomicBool>,
}

impl Default for KeyboardMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyboardMonitor {
    pub fn new() -> Self {
        let (state, _) = watch::channel(KeyboardState::default());
        Self {
            state: Arc::new(state),
            installed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start listening; the returned guard tears the listener down when dropped
    pub fn install(&self) -> KeyboardGuard {
        self.installed.store(true, Ordering::SeqCst);
        KeyboardGuard {
            installed: self.installed.clone(),
        }
    }

    pub fn is_installed(&self) -> bool {
        self.installed.load(Ordering::SeqCst)
    }

    /// Feed a key event; ignored when no listener is installed
    pub fn record_key(&self, key: impl Into<String>, caps_lock: bool) -> bool {
        if !self.is_installed() {
            return false;
        }
        self.state.send_replace(KeyboardState {
            last_key: key.into(),
            caps_lock,
        });
        true
    }

    /// Current state
    pub fn snapshot(&self) -> KeyboardState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<KeyboardState> {
        self.state.subscribe()
    }
}

/// Installed keyboard listener
#[derive(Debug)]
pub struct KeyboardGuard {
    installed: Arc<AtomicBool>,
}

impl Drop for KeyboardGuard {
    fn drop(&mut self) {
        self.installed.store(false, Ordering::SeqCst);
    }
}
