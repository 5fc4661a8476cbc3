use dashmap::DashMap;
use parking_lot::Mutex;
use serenity::model::id::GuildId;
use std::{collections::VecDeque, sync::Arc};
use tracing::{debug, info};

/// Pista pendiente. Inmutable una vez creada.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackDescriptor {
    pub source_ref: String,
    pub title: String,
}

impl TrackDescriptor {
    pub fn new(source_ref: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            source_ref: source_ref.into(),
            title: title.into(),
        }
    }
}

type GuildQueue = Arc<Mutex<VecDeque<TrackDescriptor>>>;

/// Per-guild FIFO queues.
///
/// Each guild owns its own mutex, so guilds never contend with each
/// other. Queues are created on first touch and never removed; an empty
/// queue is a normal state.
#[derive(Debug, Default)]
pub struct QueueStore {
    queues: DashMap<GuildId, GuildQueue>,
}

impl QueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Agrega un track al final de la cola
    pub fn enqueue(&self, guild_id: GuildId, track: TrackDescriptor) {
        info!("➕ Agregado a la cola de {}: {}", guild_id, track.title);
        self.queue(guild_id).lock().push_back(track);
    }

    /// Obtiene el siguiente track (FIFO - First In, First Out)
    pub fn dequeue_next(&self, guild_id: GuildId) -> Option<TrackDescriptor> {
        let next = self.queue(guild_id).lock().pop_front();
        match &next {
            Some(track) => debug!("➡️ Siguiente en cola de {}: {}", guild_id, track.title),
            None => debug!("📭 Cola vacía en {}", guild_id),
        }
        next
    }

    /// Copia consistente de la cola, en orden de reproducción
    pub fn snapshot(&self, guild_id: GuildId) -> Vec<TrackDescriptor> {
        self.queue(guild_id).lock().iter().cloned().collect()
    }

    pub fn clear(&self, guild_id: GuildId) {
        self.queue(guild_id).lock().clear();
        info!("🗑️ Cola limpiada en {}", guild_id);
    }

    pub fn is_empty(&self, guild_id: GuildId) -> bool {
        self.queue(guild_id).lock().is_empty()
    }

    #[cfg(test)]
    pub fn len(&self, guild_id: GuildId) -> usize {
        self.queue(guild_id).lock().len()
    }

    // El Arc se clona para soltar el shard del DashMap antes de bloquear la cola
    fn queue(&self, guild_id: GuildId) -> GuildQueue {
        self.queues.entry(guild_id).or_default().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::thread;

    fn track(name: &str) -> TrackDescriptor {
        TrackDescriptor::new(format!("https://yt/{}", name), name)
    }

    #[test]
    fn dequeues_in_insertion_order() {
        let store = QueueStore::new();
        let guild = GuildId::new(1);

        for name in ["a", "b", "c", "d"] {
            store.enqueue(guild, track(name));
        }

        let drained: Vec<_> = std::iter::from_fn(|| store.dequeue_next(guild))
            .map(|t| t.title)
            .collect();
        assert_eq!(drained, vec!["a", "b", "c", "d"]);
        assert_eq!(store.dequeue_next(guild), None);
    }

    #[test]
    fn unknown_guild_is_an_empty_queue() {
        let store = QueueStore::new();
        let guild = GuildId::new(42);

        assert!(store.snapshot(guild).is_empty());
        assert!(store.is_empty(guild));
        assert_eq!(store.len(guild), 0);
        assert_eq!(store.dequeue_next(guild), None);
    }

    #[test]
    fn guilds_are_isolated() {
        let store = QueueStore::new();
        let (g1, g2) = (GuildId::new(1), GuildId::new(2));

        store.enqueue(g1, track("a"));
        store.enqueue(g2, track("x"));
        store.enqueue(g1, track("b"));

        assert_eq!(store.dequeue_next(g2), Some(track("x")));
        assert_eq!(store.snapshot(g1), vec![track("a"), track("b")]);

        store.clear(g1);
        assert_eq!(store.len(g1), 0);
        assert_eq!(store.len(g2), 0);
    }

    #[test]
    fn snapshot_does_not_consume() {
        let store = QueueStore::new();
        let guild = GuildId::new(7);
        store.enqueue(guild, track("a"));
        store.enqueue(guild, track("b"));

        assert_eq!(store.snapshot(guild).len(), 2);
        assert_eq!(store.dequeue_next(guild), Some(track("a")));
        assert_eq!(store.snapshot(guild), vec![track("b")]);
    }

    #[test]
    fn concurrent_producers_keep_their_own_order() {
        let store = Arc::new(QueueStore::new());
        let guild = GuildId::new(9);

        let producers: Vec<_> = (0..4)
            .map(|p| {
                let store = store.clone();
                thread::spawn(move || {
                    for i in 0..250 {
                        store.enqueue(guild, TrackDescriptor::new(format!("{}", p), format!("{}", i)));
                    }
                })
            })
            .collect();
        for handle in producers {
            handle.join().unwrap();
        }

        let mut last_seen = [-1i64; 4];
        let mut total = 0;
        while let Some(t) = store.dequeue_next(guild) {
            let producer: usize = t.source_ref.parse().unwrap();
            let seq: i64 = t.title.parse().unwrap();
            assert!(seq > last_seen[producer], "producer {} out of order", producer);
            last_seen[producer] = seq;
            total += 1;
        }
        assert_eq!(total, 1000);
    }

    #[test]
    fn concurrent_consumers_never_duplicate() {
        let store = Arc::new(QueueStore::new());
        let guild = GuildId::new(10);
        for i in 0..500 {
            store.enqueue(guild, track(&i.to_string()));
        }

        let consumers: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                thread::spawn(move || {
                    let mut taken = Vec::new();
                    while let Some(t) = store.dequeue_next(guild) {
                        taken.push(t.title);
                    }
                    taken
                })
            })
            .collect();

        let mut all: Vec<String> = consumers
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), 500);
    }
}
