#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub id: u64,
    pub title: String,
    pub message: String,
    pub kind: ToastKind,
    pub close_tick: u64,
}

/// Transient toasts, newest last
#[derive(Default)]
pub struct NotificationState {
    pub toasts: Vec<Toast>,
    next_id: u64,
}

impl NotificationState {
    pub fn push(
        &mut self,
        title: impl Into<String>,
        message: impl Into<String>,
        kind: ToastKind,
        duration_ticks: u64,
        tick_count: u64,
    ) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.toasts.push(Toast {
            id,
            title: title.into(),
            message: message.into(),
            kind,
            close_tick: tick_count + duration_ticks,
        });
        id
    }

    pub fn dismiss(&mut self, id: u64) {
        self.toasts.retain(|t| t.id != id);
    }

    pub fn dismiss_latest(&mut self) -> bool {
        self.toasts.pop().is_some()
    }

    /// Drops toasts whose time is up.
    pub fn expire(&mut self, tick_count: u64) {
        self.toasts.retain(|t| tick_count < t.close_tick);
    }

    pub fn latest(&self) -> Option<&Toast> {
        self.toasts.last()
    }
}
