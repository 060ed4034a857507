use std::time::{SystemTime, UNIX_EPOCH};

use carecrew_bridge::NewNotification;
use serde_json::{Value, json};

/// Errors produced when writing to the notifications table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The row has an empty title.
    #[error("notification title must not be empty")]
    MissingTitle,
}

/// In-memory `notifications` table.
#[derive(Debug, Clone, Default)]
pub struct NotificationTable {
    rows: Vec<Value>,
    next_id: u64,
}

impl NotificationTable {
    /// Stores a new row and returns it as the platform would report it, with
    /// `id`, `read` and `created_at` filled in.
    pub fn insert(&mut self, notification: NewNotification) -> Result<Value, StoreError> {
        let title = notification.title.trim();
        if title.is_empty() {
            return Err(StoreError::MissingTitle);
        }

        self.next_id += 1;
        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default();

        let row = json!({
            "id": self.next_id,
            "title": title,
            "message": notification.message,
            "type": notification.kind,
            "read": false,
            "created_at": created_at,
        });
        self.rows.push(row.clone());
        Ok(row)
    }

    /// All rows, newest first.
    pub fn list(&self) -> Vec<Value> {
        self.rows.iter().rev().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new(title: &str, kind: Option<&str>) -> NewNotification {
        NewNotification {
            title: title.to_string(),
            message: "28 workers certified".to_string(),
            kind: kind.map(str::to_string),
        }
    }

    #[test]
    fn insert_assigns_ids_and_keeps_type() {
        let mut table = NotificationTable::default();
        let first = table.insert(new("Training Completed", Some("success"))).unwrap();
        let second = table.insert(new("Audit due", None)).unwrap();

        assert_eq!(first["id"], 1);
        assert_eq!(first["type"], "success");
        assert_eq!(first["read"], false);
        assert_eq!(second["id"], 2);
        assert!(second["type"].is_null());

        let listed = table.list();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0]["title"], "Audit due");
    }

    #[test]
    fn blank_titles_are_rejected() {
        let mut table = NotificationTable::default();
        assert_eq!(table.insert(new("   ", None)), Err(StoreError::MissingTitle));
        assert_eq!(table.len(), 0);
    }
}
