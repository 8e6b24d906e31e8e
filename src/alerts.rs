// file: src/alerts.rs
// description: newest-first bounded alert history kept by the dashboard

use crate::types::Alert;
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct AlertLog {
    alerts: VecDeque<Alert>,
    capacity: usize,
}

impl AlertLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            alerts: VecDeque::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
        }
    }

    /// Replaces the contents with a page fetched from the backend (already newest first).
    pub fn seed(&mut self, alerts: impl IntoIterator<Item = Alert>) {
        self.alerts.clear();
        for alert in alerts {
            if self.alerts.len() == self.capacity {
                break;
            }
            if !self.contains(&alert.id) {
                self.alerts.push_back(alert);
            }
        }
    }

    /// Prepends a live alert. Returns false for an id that is already listed.
    pub fn push(&mut self, alert: Alert) -> bool {
        if self.contains(&alert.id) {
            return false;
        }
        self.alerts.push_front(alert);
        self.alerts.truncate(self.capacity);
        true
    }

    pub fn remove(&mut self, id: &str) -> Option<Alert> {
        let index = self.alerts.iter().position(|alert| alert.id == id)?;
        self.alerts.remove(index)
    }

    pub fn clear(&mut self) {
        self.alerts.clear();
    }

    pub fn contains(&self, id: &str) -> bool {
        self.alerts.iter().any(|alert| alert.id == id)
    }

    pub fn latest(&self) -> Option<&Alert> {
        self.alerts.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Alert> {
        self.alerts.iter()
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
