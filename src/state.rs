use std::{path::PathBuf, sync::Arc};

use crate::session::SessionGate;

#[derive(Clone)]
pub struct AppState {
    /// Canonical absolute root. Every served path lies below it.
    pub root: PathBuf,
    pub gate: Arc<SessionGate>,
}

impl AppState {
    pub fn new(root: PathBuf, gate: SessionGate) -> Self {
        Self {
            root,
            gate: Arc::new(gate),
        }
    }
}
