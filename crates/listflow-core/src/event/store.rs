use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use super::{RunEvent, RunEventKind};

/// Almacenamiento de eventos append-only.
pub trait EventStore {
    /// Agrega un evento a partir de su kind y devuelve el evento completo (con seq y ts).
    fn append_kind(&mut self, run_id: Uuid, kind: RunEventKind) -> RunEvent;
    /// Lista eventos de una corrida (orden ascendente por seq).
    fn list(&self, run_id: Uuid) -> Vec<RunEvent>;
}

#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    inner: HashMap<Uuid, Vec<RunEvent>>,
    order: Vec<Uuid>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids de corrida en orden de aparición.
    pub fn run_ids(&self) -> &[Uuid] {
        &self.order
    }
}

impl EventStore for InMemoryEventStore {
    fn append_kind(&mut self, run_id: Uuid, kind: RunEventKind) -> RunEvent {
        if !self.inner.contains_key(&run_id) {
            self.order.push(run_id);
        }
        let events = self.inner.entry(run_id).or_default();
        let ev = RunEvent { seq: events.len() as u64,
                            run_id,
                            kind,
                            ts: Utc::now() };
        events.push(ev.clone());
        ev
    }

    fn list(&self, run_id: Uuid) -> Vec<RunEvent> {
        self.inner.get(&run_id).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seq_is_per_run_and_monotonic() {
        let mut store = InMemoryEventStore::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        store.append_kind(a, RunEventKind::RunHalted { reason: "x".into() });
        store.append_kind(b, RunEventKind::RunHalted { reason: "y".into() });
        let ev = store.append_kind(a, RunEventKind::RunCompleted { run_fingerprint: "f".into() });
        assert_eq!(ev.seq, 1);
        assert_eq!(store.list(a).len(), 2);
        assert_eq!(store.run_ids(), &[a, b]);
        assert!(store.list(Uuid::new_v4()).is_empty());
    }
}
