// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Realtime synchronization coordinator.
//!
//! Reconciles three timelines: local optimistic emissions, server pushes
//! and the offline backlog. The coordinator is a `&mut self` state machine;
//! the host (or [`runner`](super::runner)) feeds it socket signals through
//! [`Coordinator::handle_inbound`] and OS connectivity through
//! [`Coordinator::on_network_online`] / [`Coordinator::on_network_offline`].

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use vzsync_core::protocol::{
    self, DeviceStatusUpdate, HealthAlert, PlaylistUpdate, ScheduleExecution, SyncAck,
};
use vzsync_core::{
    resolve_conflict, ClockSource, ListenerId, Listeners, OptimisticStore, SystemClock,
};

use super::queue::{OfflineQueue, OfflineQueueItem, QueueError};
use super::transport::{Frame, Socket, TransportError};

/// Host state the coordinator applies optimistic emissions to.
pub type SharedStore = Arc<Mutex<OptimisticStore<Value>>>;

/// Default bound on the offline queue.
pub const DEFAULT_OFFLINE_QUEUE_SIZE: usize = 50;

/// Default delivery attempts before a queued item becomes conflicted.
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

/// When a drained queue item counts as delivered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delivery {
    /// The socket accepted the frame.
    #[default]
    Emitted,
    /// The server answered with a `sync:ack` frame for the event id.
    Acknowledged,
}

/// Coordinator settings, the `[sync]` table of the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Attach to the socket on [`Coordinator::init`].
    pub enabled: bool,
    pub offline_queue_size: usize,
    /// Delivery attempts per queued item before it needs manual resolution.
    pub retry_attempts: u32,
    pub delivery: Delivery,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            enabled: true,
            offline_queue_size: DEFAULT_OFFLINE_QUEUE_SIZE,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            delivery: Delivery::Emitted,
        }
    }
}

/// Error type for sync operations.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Queue error.
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    /// Not connected.
    #[error("not connected to the realtime server")]
    NotConnected,

    /// Max reconnection attempts exceeded.
    #[error("gave up connecting after {attempts} attempts: {last_error}")]
    MaxRetriesExceeded { attempts: u32, last_error: String },

    /// No conflicted change with this id.
    #[error("no conflicted change with id '{0}'")]
    UnknownConflict(String),
}

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// An optimistic emission not yet confirmed by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingChange {
    pub id: String,
    pub event: String,
    pub data: Value,
}

/// Sync bookkeeping visible to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    /// End of the last queue drain (ms).
    pub last_sync_time: u64,
    /// Unconfirmed optimistic emissions in emission order.
    pub pending_changes: Vec<PendingChange>,
    /// Queue items that ran out of delivery attempts.
    pub conflicted_changes: BTreeMap<String, OfflineQueueItem>,
}

impl SyncState {
    pub fn pending_change(&self, id: &str) -> Option<&PendingChange> {
        self.pending_changes.iter().find(|change| change.id == id)
    }

    /// Removes pending changes matching `predicate`, returning their ids.
    fn prune_pending(&mut self, mut predicate: impl FnMut(&PendingChange) -> bool) -> Vec<String> {
        let mut pruned = Vec::new();
        self.pending_changes.retain(|change| {
            if predicate(change) {
                pruned.push(change.id.clone());
                false
            } else {
                true
            }
        });
        pruned
    }
}

/// Signals delivered by the socket.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Connect,
    Disconnect,
    Event(Frame),
}

/// Options for [`Coordinator::emit_event`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitOptions {
    /// Track the emission in `pending_changes` until the server confirms it.
    pub optimistic: bool,
}

impl EmitOptions {
    pub fn optimistic() -> Self {
        EmitOptions { optimistic: true }
    }
}

/// Outcome of one [`Coordinator::sync_offline_queue`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainReport {
    /// Items handed to the socket.
    pub sent: usize,
    /// Items moved to `conflicted_changes`.
    pub conflicted: usize,
    /// Items whose emit failed and stay queued.
    pub failed: usize,
    /// Queue length after the pass.
    pub remaining: usize,
}

/// Notifications emitted by [`Coordinator`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum SyncEvent {
    DeviceStatusChanged(DeviceStatusUpdate),
    /// Carries the merged payload when it collided with a pending change.
    PlaylistChanged(PlaylistUpdate),
    HealthAlert(HealthAlert),
    ScheduleExecuted(ScheduleExecution),
    ConnectionChanged(bool),
    SyncStateChanged(SyncState),
    /// Pending change ids confirmed by the server and dropped.
    PendingConfirmed(Vec<String>),
}

/// Keeps the optimistic, pushed and offline timelines consistent.
pub struct Coordinator<S: Socket, C: ClockSource = SystemClock> {
    config: SyncConfig,
    socket: S,
    clock: C,
    queue: OfflineQueue,
    state: SyncState,
    connected: bool,
    online: bool,
    attached: bool,
    next_seq: u64,
    store: Option<SharedStore>,
    listeners: Listeners<SyncEvent>,
}

impl<S: Socket> Coordinator<S, SystemClock> {
    pub fn new(config: SyncConfig, socket: S) -> Self {
        Self::with_clock(config, socket, SystemClock)
    }
}

impl<S: Socket, C: ClockSource> Coordinator<S, C> {
    pub fn with_clock(config: SyncConfig, socket: S, clock: C) -> Self {
        let now = clock.now_ms();
        Coordinator {
            queue: OfflineQueue::new(config.offline_queue_size),
            config,
            socket,
            clock,
            state: SyncState {
                last_sync_time: now,
                pending_changes: Vec::new(),
                conflicted_changes: BTreeMap::new(),
            },
            connected: false,
            online: true,
            attached: false,
            next_seq: 0,
            store: None,
            listeners: Listeners::new(),
        }
    }

    /// Replaces the offline queue, e.g. with one loaded from disk.
    ///
    /// The queue keeps its own capacity.
    pub fn with_offline_queue(mut self, queue: OfflineQueue) -> Self {
        self.queue = queue;
        self
    }

    /// Attaches the store that [`emit_with_update`](Self::emit_with_update)
    /// writes to.
    ///
    /// Updates are committed when the server confirms the change and rolled
    /// back when the change is abandoned without ever being confirmed.
    pub fn with_store(mut self, store: SharedStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Subscribes the handled events on the socket.
    ///
    /// Does nothing when sync is disabled. Calling it twice is harmless.
    pub fn init(&mut self) {
        if !self.config.enabled {
            tracing::debug!("realtime sync disabled, not attaching");
            return;
        }
        if self.attached {
            return;
        }
        self.socket.subscribe(&protocol::INBOUND_EVENTS);
        self.attached = true;
        self.connected = self.socket.is_connected();
        tracing::debug!(connected = self.connected, "coordinator attached");
    }

    /// Unsubscribes from the socket and drops every listener.
    pub fn dispose(&mut self) {
        if self.attached {
            self.socket.unsubscribe(&protocol::INBOUND_EVENTS);
            self.attached = false;
            tracing::debug!("coordinator detached");
        }
        self.listeners.clear();
    }

    pub fn subscribe<F>(&self, callback: F) -> ListenerId
    where
        F: Fn(&SyncEvent) + Send + Sync + 'static,
    {
        self.listeners.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    pub fn socket(&self) -> &S {
        &self.socket
    }

    pub fn socket_mut(&mut self) -> &mut S {
        &mut self.socket
    }

    /// Processes one socket signal. Ignored while not attached.
    pub async fn handle_inbound(&mut self, inbound: Inbound) {
        if !self.attached {
            tracing::debug!(?inbound, "coordinator not attached, ignoring signal");
            return;
        }

        match inbound {
            Inbound::Connect => {
                // A live socket proves the network is back.
                self.connected = true;
                self.online = true;
                tracing::info!(queued = self.queue.len(), "connected, syncing offline queue");
                self.listeners.emit(&SyncEvent::ConnectionChanged(true));
                self.drain_logged().await;
            }
            Inbound::Disconnect => {
                self.connected = false;
                tracing::info!("disconnected, offline mode enabled");
                self.listeners.emit(&SyncEvent::ConnectionChanged(false));
            }
            Inbound::Event(frame) => self.handle_frame(frame),
        }
    }

    /// OS reports the network is back.
    pub async fn on_network_online(&mut self) {
        self.online = true;
        tracing::info!("network online");
        if self.connected {
            self.drain_logged().await;
        }
    }

    /// OS reports the network is gone.
    pub fn on_network_offline(&mut self) {
        self.online = false;
        tracing::info!("network offline, queuing events");
    }

    /// Sends `data` under `event`, or queues it while disconnected.
    ///
    /// Returns the generated event id, which is also attached to the payload
    /// as `eventId`.
    pub async fn emit_event(&mut self, event: &str, data: Value, options: EmitOptions) -> String {
        let id = self.next_event_id(event);
        if options.optimistic {
            self.track_pending(&id, event, &data);
        }
        self.deliver(&id, event, data).await;
        id
    }

    /// Optimistic [`emit_event`](Self::emit_event) that also applies
    /// `updater` to the attached store under the event id.
    ///
    /// Without a store only the pending change is recorded.
    pub async fn emit_with_update<U>(&mut self, event: &str, data: Value, updater: U) -> String
    where
        U: FnOnce(&Value) -> Value,
    {
        let id = self.next_event_id(event);
        if let Some(store) = &self.store {
            lock(store).update_optimistic(id.as_str(), updater, Some(json!({ "event": event })));
        }
        self.track_pending(&id, event, &data);
        self.deliver(&id, event, data).await;
        id
    }

    pub async fn emit_device_update(&mut self, update: &DeviceStatusUpdate) -> SyncResult<String> {
        let data = to_value(update)?;
        Ok(self.emit_event(protocol::DEVICE_UPDATE, data, EmitOptions::optimistic()).await)
    }

    pub async fn emit_playlist_update(&mut self, update: &PlaylistUpdate) -> SyncResult<String> {
        let data = to_value(update)?;
        Ok(self.emit_event(protocol::PLAYLIST_UPDATE, data, EmitOptions::optimistic()).await)
    }

    pub async fn emit_schedule_update(&mut self, update: &ScheduleExecution) -> SyncResult<String> {
        let data = to_value(update)?;
        Ok(self.emit_event(protocol::SCHEDULE_UPDATE, data, EmitOptions::optimistic()).await)
    }

    pub async fn emit_custom_event(&mut self, event: &str, data: Value, options: EmitOptions) -> String {
        self.emit_event(event, data, options).await
    }

    /// Replays the offline queue in FIFO order.
    ///
    /// Items that already used `retry_attempts` deliveries move to
    /// `conflicted_changes` and are never sent again automatically. A failed
    /// emit leaves its item queued and the pass continues.
    pub async fn sync_offline_queue(&mut self) -> SyncResult<DrainReport> {
        if !self.connected {
            return Err(SyncError::NotConnected);
        }

        let mut report = DrainReport::default();
        let items = self.queue.to_vec();
        tracing::debug!(items = items.len(), "syncing offline queue");

        for item in items {
            if item.retry_count >= self.config.retry_attempts {
                if let Some(item) = self.queue.remove(&item.id) {
                    tracing::warn!(
                        event = %item.event,
                        id = %item.id,
                        attempts = item.retry_count,
                        "max retries exceeded, moving to conflicted changes"
                    );
                    self.state.conflicted_changes.insert(item.id.clone(), item);
                    report.conflicted += 1;
                }
                continue;
            }

            let payload = protocol::with_event_id(&item.data, &item.id);
            let result = self.socket.emit(&item.event, payload).await;
            self.queue.increment_retry(&item.id);

            match result {
                Ok(()) => {
                    report.sent += 1;
                    if self.config.delivery == Delivery::Emitted {
                        self.queue.remove(&item.id);
                    }
                    tracing::debug!(event = %item.event, id = %item.id, "synced queued event");
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(event = %item.event, id = %item.id, error = %e, "failed to sync queued event");
                }
            }
        }

        self.state.last_sync_time = self.clock.now_ms();
        report.remaining = self.queue.len();
        tracing::info!(
            sent = report.sent,
            conflicted = report.conflicted,
            failed = report.failed,
            remaining = report.remaining,
            "offline queue sync finished"
        );
        self.listeners.emit(&SyncEvent::SyncStateChanged(self.state.clone()));
        Ok(report)
    }

    /// Moves a conflicted change back to the queue with a fresh retry budget.
    pub fn requeue_conflicted(&mut self, id: &str) -> SyncResult<()> {
        let mut item = self
            .state
            .conflicted_changes
            .remove(id)
            .ok_or_else(|| SyncError::UnknownConflict(id.to_string()))?;
        item.retry_count = 0;
        tracing::info!(id, event = %item.event, "requeued conflicted change");
        self.push_item(item);
        self.listeners.emit(&SyncEvent::SyncStateChanged(self.state.clone()));
        Ok(())
    }

    /// Drops a conflicted change for good.
    pub fn discard_conflicted(&mut self, id: &str) -> SyncResult<OfflineQueueItem> {
        let item = self
            .state
            .conflicted_changes
            .remove(id)
            .ok_or_else(|| SyncError::UnknownConflict(id.to_string()))?;
        tracing::info!(id, event = %item.event, "discarded conflicted change");
        self.abandon(id);
        self.listeners.emit(&SyncEvent::SyncStateChanged(self.state.clone()));
        Ok(item)
    }

    /// Empties the offline queue, returning how many items were dropped.
    ///
    /// Items that were never sent are abandoned.
    pub fn clear_offline_queue(&mut self) -> usize {
        let unsent: Vec<String> =
            self.queue.iter().filter(|item| item.retry_count == 0).map(|item| item.id.clone()).collect();
        let count = self.queue.clear();
        for id in &unsent {
            self.abandon(id);
        }
        tracing::info!(count, "cleared offline queue");
        count
    }

    pub fn offline_queue(&self) -> &OfflineQueue {
        &self.queue
    }

    pub fn offline_queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn conflicted_changes(&self) -> &BTreeMap<String, OfflineQueueItem> {
        &self.state.conflicted_changes
    }

    pub fn sync_state(&self) -> &SyncState {
        &self.state
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// True while either the socket or the OS network is down.
    pub fn is_offline(&self) -> bool {
        !self.connected || !self.online
    }

    fn handle_frame(&mut self, frame: Frame) {
        let Frame { event, data } = frame;
        match event.as_str() {
            protocol::DEVICE_STATUS_UPDATE => {
                let Some(update) = parse::<DeviceStatusUpdate>(&event, data) else {
                    return;
                };
                tracing::debug!(device_id = %update.device_id, "device status update");
                let device_id = update.device_id.clone();
                self.listeners.emit(&SyncEvent::DeviceStatusChanged(update));
                let pruned = self
                    .state
                    .prune_pending(|change| field(&change.data, "deviceId") == Some(&device_id));
                self.confirm(pruned);
            }
            protocol::PLAYLIST_UPDATED => self.handle_playlist_update(&event, data),
            protocol::HEALTH_ALERT => {
                if let Some(alert) = parse::<HealthAlert>(&event, data) {
                    tracing::debug!(device_id = %alert.device_id, "health alert");
                    self.listeners.emit(&SyncEvent::HealthAlert(alert));
                }
            }
            protocol::SCHEDULE_EXECUTED => {
                let Some(execution) = parse::<ScheduleExecution>(&event, data) else {
                    return;
                };
                tracing::debug!(schedule_id = %execution.schedule_id, "schedule executed");
                let schedule_id = execution.schedule_id.clone();
                self.listeners.emit(&SyncEvent::ScheduleExecuted(execution));
                let pruned = self
                    .state
                    .prune_pending(|change| field(&change.data, "scheduleId") == Some(&schedule_id));
                self.confirm(pruned);
            }
            protocol::SYNC_ACK => {
                let Some(ack) = parse::<SyncAck>(&event, data) else {
                    return;
                };
                if self.queue.remove(&ack.event_id).is_some() {
                    tracing::debug!(id = %ack.event_id, "queued event acknowledged");
                }
                let pruned = self.state.prune_pending(|change| change.id == ack.event_id);
                self.confirm(pruned);
            }
            other => {
                tracing::debug!(event = other, "ignoring unhandled event");
            }
        }
    }

    /// Remote wins, merged with the first pending change for the same playlist.
    fn handle_playlist_update(&mut self, event: &str, data: Value) {
        let Some(update) = parse::<PlaylistUpdate>(event, data.clone()) else {
            return;
        };
        let playlist_id = update.playlist_id.clone();

        let local = self
            .state
            .pending_changes
            .iter()
            .find(|change| field(&change.data, "playlistId") == Some(&playlist_id))
            .map(|change| change.data.clone());

        let update = match local {
            Some(local) => {
                let merged = resolve_conflict(&local, &data);
                tracing::info!(playlist_id = %playlist_id, "resolved playlist conflict, remote wins");
                match serde_json::from_value::<PlaylistUpdate>(merged) {
                    Ok(merged) => merged,
                    Err(e) => {
                        tracing::warn!(error = %e, "merged playlist payload invalid, using remote");
                        update
                    }
                }
            }
            None => update,
        };

        self.listeners.emit(&SyncEvent::PlaylistChanged(update));
        let pruned = self
            .state
            .prune_pending(|change| field(&change.data, "playlistId") == Some(&playlist_id));
        self.confirm(pruned);
    }

    /// Commits confirmed changes in the store and notifies listeners.
    fn confirm(&self, pruned: Vec<String>) {
        if pruned.is_empty() {
            return;
        }
        tracing::debug!(count = pruned.len(), "pending changes confirmed");
        if let Some(store) = &self.store {
            let mut store = lock(store);
            for id in &pruned {
                store.commit_optimistic(id);
            }
        }
        self.listeners.emit(&SyncEvent::PendingConfirmed(pruned));
        self.listeners.emit(&SyncEvent::SyncStateChanged(self.state.clone()));
    }

    /// Forgets a change that will never be confirmed.
    fn abandon(&mut self, id: &str) {
        self.state.prune_pending(|change| change.id == id);
        if let Some(store) = &self.store {
            lock(store).rollback_optimistic(id, None);
        }
    }

    fn track_pending(&mut self, id: &str, event: &str, data: &Value) {
        self.state.pending_changes.push(PendingChange {
            id: id.to_string(),
            event: event.to_string(),
            data: data.clone(),
        });
    }

    async fn deliver(&mut self, id: &str, event: &str, data: Value) {
        if !self.connected {
            tracing::debug!(event, id, "event queued offline");
            self.enqueue(id, event, data, 0);
            return;
        }

        let payload = protocol::with_event_id(&data, id);
        match self.socket.emit(event, payload).await {
            Ok(()) => {
                tracing::debug!(event, id, "event emitted");
                if self.config.delivery == Delivery::Acknowledged {
                    self.enqueue(id, event, data, 1);
                }
            }
            Err(e) => {
                tracing::warn!(event, id, error = %e, "emit failed, queuing offline");
                self.connected = false;
                self.listeners.emit(&SyncEvent::ConnectionChanged(false));
                self.enqueue(id, event, data, 0);
            }
        }
    }

    fn enqueue(&mut self, id: &str, event: &str, data: Value, retry_count: u32) {
        let item = OfflineQueueItem {
            id: id.to_string(),
            event: event.to_string(),
            data,
            timestamp: self.clock.now_ms(),
            retry_count,
        };
        self.push_item(item);
    }

    /// Queues an item. Sent items awaiting an ack never evict unsent ones.
    fn push_item(&mut self, item: OfflineQueueItem) {
        let sent = item.retry_count > 0;
        let id = item.id.clone();
        let dropped = if sent { self.queue.push_sent(item) } else { self.queue.push(item) };
        let Some(dropped) = dropped else {
            return;
        };

        if sent && dropped.id == id {
            tracing::warn!(id = %id, "offline queue full of unsent events, not tracking acknowledgement");
            return;
        }
        tracing::warn!(id = %dropped.id, event = %dropped.event, "offline queue full, dropped oldest event");
        if dropped.retry_count == 0 {
            self.abandon(&dropped.id);
        }
    }

    async fn drain_logged(&mut self) {
        if let Err(e) = self.sync_offline_queue().await {
            tracing::debug!(error = %e, "offline queue not synced");
        }
    }

    fn next_event_id(&mut self, event: &str) -> String {
        let seq = self.next_seq;
        self.next_seq += 1;
        format!("{}_{}_{}", event, self.clock.now_ms(), seq)
    }
}

fn lock(store: &Mutex<OptimisticStore<Value>>) -> MutexGuard<'_, OptimisticStore<Value>> {
    store.lock().unwrap_or_else(|e| e.into_inner())
}

fn parse<T: serde::de::DeserializeOwned>(event: &str, data: Value) -> Option<T> {
    match serde_json::from_value(data) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(event, error = %e, "dropping malformed event payload");
            None
        }
    }
}

fn field<'a>(data: &'a Value, key: &str) -> Option<&'a String> {
    match data.get(key) {
        Some(Value::String(s)) => Some(s),
        _ => None,
    }
}

fn to_value<T: Serialize>(value: &T) -> SyncResult<Value> {
    serde_json::to_value(value).map_err(|e| SyncError::Transport(TransportError::Encode(e)))
}
