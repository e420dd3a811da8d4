use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;
use worktrack_core::{Category, SubCategoryOption, TaskCounts};

use crate::client::ClientRegistry;

/// Change notifications pushed to every WebSocket client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum TrackerEvent {
    /// A task was stored, completed, updated or deleted.
    #[serde(rename = "tasks.changed")]
    TasksChanged { counts: TaskCounts, total: usize },
    #[serde(rename = "subcategory.added")]
    SubCategoryAdded {
        category: Category,
        option: SubCategoryOption,
    },
}

impl TrackerEvent {
    pub fn tasks_changed(counts: TaskCounts) -> Self {
        Self::TasksChanged {
            total: counts.total(),
            counts,
        }
    }
}

/// Serialize an event for the wire.
pub fn serialize_event(event: &TrackerEvent) -> Option<String> {
    serde_json::to_string(event).ok()
}

/// Forward broadcast events to every connected client until the channel closes.
pub fn create_bridge(
    registry: Arc<ClientRegistry>,
    mut rx: broadcast::Receiver<TrackerEvent>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Some(json) = serialize_event(&event) {
                        let delivered = registry.broadcast_all(&json);
                        tracing::trace!(delivered, "event forwarded");
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "event bridge lagged, dropped events");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("event bridge channel closed");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn tasks_changed_wire_shape() {
        let event = TrackerEvent::tasks_changed(TaskCounts {
            in_progress: 2,
            completed: 3,
        });
        let json: serde_json::Value =
            serde_json::from_str(&serialize_event(&event).unwrap()).unwrap();
        assert_eq!(json["type"], "tasks.changed");
        assert_eq!(json["total"], 5);
        assert_eq!(json["counts"]["inProgress"], 2);
    }

    #[test]
    fn subcategory_added_wire_shape() {
        let event = TrackerEvent::SubCategoryAdded {
            category: Category::Personal,
            option: SubCategoryOption::new("reading", "Reading"),
        };
        let json: serde_json::Value =
            serde_json::from_str(&serialize_event(&event).unwrap()).unwrap();
        assert_eq!(json["type"], "subcategory.added");
        assert_eq!(json["category"], "Personal");
        assert_eq!(json["option"]["key"], "reading");
    }

    #[tokio::test]
    async fn bridge_forwards_to_all_clients() {
        let registry = Arc::new(ClientRegistry::new(32, Duration::from_secs(30)));
        let (tx, rx) = broadcast::channel(16);
        let (_a, mut rx1) = registry.register();
        let (_b, mut rx2) = registry.register();

        let handle = create_bridge(Arc::clone(&registry), rx);
        let _ = tx.send(TrackerEvent::tasks_changed(TaskCounts::default()));

        let msg = tokio::time::timeout(Duration::from_secs(1), rx1.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(msg.contains("tasks.changed"));
        assert!(rx2.recv().await.unwrap().contains("tasks.changed"));

        handle.abort();
    }

    #[tokio::test]
    async fn bridge_stops_when_sender_dropped() {
        let registry = Arc::new(ClientRegistry::new(32, Duration::from_secs(30)));
        let (tx, rx) = broadcast::channel::<TrackerEvent>(16);
        let handle = create_bridge(registry, rx);
        drop(tx);
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
