/// Single-slot scheduled task with a minimum spacing between executions.
///
/// `request` fills the slot only when it is empty and the window since the
/// last execution has elapsed; anything else is dropped, never queued. The
/// frame loop drains the slot with `take_due`.
#[derive(Clone, Debug)]
pub struct Debouncer {
    window_ms: f64,
    last_fired_ms: Option<f64>,
    slot: Option<f64>,
}

impl Debouncer {
    pub fn new(window_ms: f64) -> Self {
        Self {
            window_ms,
            last_fired_ms: None,
            slot: None,
        }
    }

    /// Returns whether the request was accepted.
    pub fn request(&mut self, now_ms: f64) -> bool {
        if self.slot.is_some() {
            return false;
        }
        if let Some(last) = self.last_fired_ms {
            if now_ms - last < self.window_ms {
                return false;
            }
        }
        self.slot = Some(now_ms);
        true
    }

    pub fn is_pending(&self) -> bool {
        self.slot.is_some()
    }

    /// Empties the slot; true when the caller should run the task now.
    pub fn take_due(&mut self, now_ms: f64) -> bool {
        if self.slot.take().is_none() {
            return false;
        }
        self.last_fired_ms = Some(now_ms);
        true
    }

    pub fn cancel(&mut self) {
        self.slot = None;
    }
}
