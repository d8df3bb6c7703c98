use crate::models::task::TaskId;

/// Single-holder admission gate: at most one task may be active.
///
/// The gate remembers who holds it, so only the holder can release it.
#[derive(Debug, Default)]
pub struct AdmissionGate {
    holder: Option<TaskId>,
}

impl AdmissionGate {
    pub fn is_held(&self) -> bool {
        self.holder.is_some()
    }

    pub fn holder(&self) -> Option<TaskId> {
        self.holder
    }

    /// Claims the gate for `id`. Re-acquiring by the current holder succeeds.
    pub fn try_acquire(&mut self, id: TaskId) -> bool {
        match self.holder {
            Some(holder) => holder == id,
            None => {
                self.holder = Some(id);
                true
            }
        }
    }

    /// Returns whether `id` actually held the gate.
    pub fn release(&mut self, id: TaskId) -> bool {
        if self.holder == Some(id) {
            self.holder = None;
            true
        } else {
            false
        }
    }
}
