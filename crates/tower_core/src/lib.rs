//! Client for a shared ringing-tower session.
//!
//! A [`RingingTower`] mirrors the state of one remote tower by replaying the
//! event stream the service pushes to every participant, and feeds actions
//! back over the same channel. Consumers observe the session through
//! registered callbacks and synchronous read accessors.

use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use chrono::Utc;
use shared::{
    calls,
    domain::{Bell, BellType, Stroke, TowerId, UserId},
    protocol::{ClientAction, TowerEvent},
};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub mod bootstrap;
pub mod error;
pub mod registry;
pub mod transport;

pub use bootstrap::TowerEndpoint;
pub use error::TowerError;
pub use registry::{CallbackCategory, CallbackHandle};
pub use transport::{Transport, TransportError, WebSocketTransport};

use registry::CallbackRegistry;

const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);
/// Placed in the email field of chat messages sent through this library.
const CHAT_EMAIL_MARKER: &str = "<tower_core>";

/// Where a session is in its life. `Closed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Bootstrapped,
    Connected,
    Joined,
    Ready,
    Closed,
    Failed,
}

struct TowerState {
    phase: SessionPhase,
    bell_type: BellType,
    // Replaced wholesale on every state-changing event, never patched in
    // place, so readers always see a consistent snapshot.
    bell_state: Vec<Stroke>,
    assigned_users: HashMap<Bell, UserId>,
    user_names: HashMap<UserId, String>,
    awaiting_first_snapshot: bool,
}

/// One session against one remote tower.
///
/// Constructed via [`RingingTower::new`] (which resolves the tower id and
/// checks the remote protocol version), then driven with
/// [`connect`](RingingTower::connect) and
/// [`wait_until_ready`](RingingTower::wait_until_ready). Inbound events are
/// processed one at a time in arrival order; callbacks run synchronously on
/// the event-processing task and should hand long work off elsewhere.
pub struct RingingTower {
    tower_id: TowerId,
    endpoint: TowerEndpoint,
    state: Mutex<TowerState>,
    callbacks: CallbackRegistry,
    transport: Mutex<Option<Arc<dyn Transport>>>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl RingingTower {
    /// Resolves `tower_id` against the service at `base_url`, checking the
    /// remote protocol version first. The returned session is not yet
    /// connected.
    pub async fn new(tower_id: TowerId, base_url: &str) -> Result<Arc<Self>, TowerError> {
        let endpoint = bootstrap::resolve(tower_id, base_url).await?;
        bootstrap::check_remote_version(base_url).await?;
        Ok(Self::from_endpoint(tower_id, endpoint))
    }

    /// Like [`RingingTower::new`] but skips the version compatibility check.
    pub async fn new_unchecked(tower_id: TowerId, base_url: &str) -> Result<Arc<Self>, TowerError> {
        let endpoint = bootstrap::resolve(tower_id, base_url).await?;
        Ok(Self::from_endpoint(tower_id, endpoint))
    }

    /// Builds a session around an already-resolved endpoint.
    pub fn from_endpoint(tower_id: TowerId, endpoint: TowerEndpoint) -> Arc<Self> {
        Arc::new(Self {
            tower_id,
            state: Mutex::new(TowerState {
                phase: SessionPhase::Bootstrapped,
                bell_type: endpoint.bell_type,
                bell_state: Vec::new(),
                assigned_users: HashMap::new(),
                user_names: HashMap::new(),
                awaiting_first_snapshot: true,
            }),
            endpoint,
            callbacks: CallbackRegistry::new(),
            transport: Mutex::new(None),
            pump: Mutex::new(None),
        })
    }

    /// Resolves, connects, runs `body`, and guarantees the session is closed
    /// on every exit path.
    pub async fn with_session<F, Fut, T>(
        tower_id: TowerId,
        base_url: &str,
        body: F,
    ) -> Result<T, TowerError>
    where
        F: FnOnce(Arc<RingingTower>) -> Fut,
        Fut: Future<Output = Result<T, TowerError>>,
    {
        let tower = Self::new(tower_id, base_url).await?;
        tower.connect().await?;
        let result = body(Arc::clone(&tower)).await;
        tower.close().await;
        result
    }

    // ===== LIFECYCLE =====

    /// Opens the websocket to the resolved endpoint and joins the tower as
    /// an anonymous participant.
    pub async fn connect(self: &Arc<Self>) -> Result<(), TowerError> {
        let ws_url = transport::websocket_url(&self.endpoint.socket_url).ok_or_else(|| {
            TowerError::Unreachable {
                url: self.endpoint.socket_url.clone(),
            }
        })?;
        let transport = WebSocketTransport::connect(&ws_url).await?;
        self.connect_with_transport(Arc::new(transport)).await
    }

    /// Joins the tower over an already-established transport.
    pub async fn connect_with_transport(
        self: &Arc<Self>,
        transport: Arc<dyn Transport>,
    ) -> Result<(), TowerError> {
        {
            let mut state = self.state();
            match state.phase {
                SessionPhase::Bootstrapped => state.phase = SessionPhase::Connected,
                SessionPhase::Closed | SessionPhase::Failed => {
                    return Err(TowerError::SessionClosed)
                }
                _ => return Err(TowerError::AlreadyConnected),
            }
        }
        {
            let mut guard = self.transport_lock();
            *guard = Some(Arc::clone(&transport));
        }
        // The pump starts before the join is sent so no early message is
        // missed.
        let pump = self.spawn_pump(Arc::clone(&transport));
        self.pump_lock().replace(pump);

        info!(tower = self.tower_id.0, "joining tower");
        let join = ClientAction::Join {
            anonymous_user: true,
            tower_id: self.tower_id,
        };
        if let Err(err) = transport.emit(join).await {
            self.state().phase = SessionPhase::Failed;
            return Err(err.into());
        }
        {
            let mut state = self.state();
            if state.phase == SessionPhase::Connected {
                state.phase = SessionPhase::Joined;
            }
        }

        debug!(tower = self.tower_id.0, "requesting tower state");
        let request = ClientAction::RequestGlobalState {
            tower_id: self.tower_id,
        };
        if let Err(err) = transport.emit(request).await {
            self.state().phase = SessionPhase::Failed;
            return Err(err.into());
        }
        Ok(())
    }

    /// Blocks until the first bell-state snapshot has arrived, polling with
    /// a bounded timeout.
    pub async fn wait_until_ready(&self, timeout: Duration) -> Result<(), TowerError> {
        match self.transport() {
            Some(transport) if transport.is_connected() => {}
            _ => return Err(TowerError::NotConnected),
        }
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.is_ready() {
                return Ok(());
            }
            if self.state().phase == SessionPhase::Closed {
                return Err(TowerError::SessionClosed);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(TowerError::ReadyTimeout);
            }
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
    }

    /// Disconnects and marks the session unusable. Idempotent; a closed
    /// session cannot be reconnected.
    pub async fn close(&self) {
        let transport = self.transport_lock().take();
        self.state().phase = SessionPhase::Closed;
        let pump = self.pump_lock().take();
        if let Some(pump) = pump {
            pump.abort();
        }
        if let Some(transport) = transport {
            info!(tower = self.tower_id.0, "disconnecting");
            transport.close().await;
        }
    }

    fn spawn_pump(self: &Arc<Self>, transport: Arc<dyn Transport>) -> JoinHandle<()> {
        let tower = Arc::downgrade(self);
        tokio::spawn(async move {
            while let Some(event) = transport.next_event().await {
                let Some(tower) = tower.upgrade() else { return };
                tower.handle_event(event);
            }
            if let Some(tower) = tower.upgrade() {
                tower.mark_stream_closed();
            }
        })
    }

    fn mark_stream_closed(&self) {
        let mut state = self.state();
        if state.phase != SessionPhase::Closed {
            warn!(tower = self.tower_id.0, "event stream closed unexpectedly");
            state.phase = SessionPhase::Failed;
        }
    }

    // ===== READ ACCESSORS =====

    pub fn tower_id(&self) -> TowerId {
        self.tower_id
    }

    pub fn tower_name(&self) -> &str {
        &self.endpoint.tower_name
    }

    pub fn bell_type(&self) -> BellType {
        self.state().bell_type
    }

    pub fn number_of_bells(&self) -> usize {
        self.state().bell_state.len()
    }

    /// The current stroke of a bell, or `None` if the bell is not in the
    /// tower.
    pub fn get_stroke(&self, bell: Bell) -> Option<Stroke> {
        self.state().bell_state.get(bell.index()).copied()
    }

    pub fn user_name_from_id(&self, user: UserId) -> Option<String> {
        self.state().user_names.get(&user).cloned()
    }

    /// The user assigned to a bell, or `None` if the bell is unassigned or
    /// does not exist.
    pub fn get_assignment(&self, bell: Bell) -> Option<UserId> {
        self.state().assigned_users.get(&bell).copied()
    }

    pub fn all_users(&self) -> HashMap<UserId, String> {
        self.state().user_names.clone()
    }

    /// True once the transport is connected and at least one bell-state
    /// snapshot has arrived.
    pub fn is_ready(&self) -> bool {
        let connected = self
            .transport()
            .is_some_and(|transport| transport.is_connected());
        connected && self.state().phase == SessionPhase::Ready
    }

    pub fn phase(&self) -> SessionPhase {
        self.state().phase
    }

    /// Logs the entire mirrored state, for debugging.
    pub fn dump_debug_state(&self) {
        let state = self.state();
        let mut strokes = String::new();
        for (index, stroke) in state.bell_state.iter().enumerate() {
            if index % 4 == 0 && index > 0 {
                strokes.push(' ');
            }
            strokes.push(stroke.symbol());
        }
        info!(
            tower = self.tower_id.0,
            name = %self.endpoint.tower_name,
            phase = ?state.phase,
            "tower state dump"
        );
        info!(bells = %strokes, bell_type = %state.bell_type, "bell strokes");
        info!(users = ?state.user_names, "roster");
        if state.assigned_users.is_empty() {
            info!("no bells assigned");
        } else {
            for (bell, user) in &state.assigned_users {
                let name = state.user_names.get(user).cloned().unwrap_or_default();
                info!(bell = bell.number(), user = user.0, name = %name, "assignment");
            }
        }
    }

    // ===== CALLBACK REGISTRATION =====

    /// Registers a callback for a bell being rung. The stroke passed to the
    /// callback is the one the bell was on **before** it rang, so the first
    /// blows after setting at hand are reported as handstrokes.
    pub fn on_bell_rung(
        &self,
        callback: impl Fn(Bell, Stroke) + Send + Sync + 'static,
    ) -> CallbackHandle {
        self.callbacks.add_bell_rung(Arc::new(callback))
    }

    /// Registers a callback for one call label, e.g. `calls::BOB`.
    pub fn on_call(
        &self,
        label: impl Into<String>,
        callback: impl Fn() + Send + Sync + 'static,
    ) -> CallbackHandle {
        self.callbacks.add_call(label.into(), Arc::new(callback))
    }

    pub fn on_size_change(
        &self,
        callback: impl Fn(usize) + Send + Sync + 'static,
    ) -> CallbackHandle {
        self.callbacks.add_size_change(Arc::new(callback))
    }

    pub fn on_bell_type_change(
        &self,
        callback: impl Fn(BellType) + Send + Sync + 'static,
    ) -> CallbackHandle {
        self.callbacks.add_bell_type_change(Arc::new(callback))
    }

    pub fn on_set_at_hand(&self, callback: impl Fn() + Send + Sync + 'static) -> CallbackHandle {
        self.callbacks.add_set_at_hand(Arc::new(callback))
    }

    pub fn on_user_enter(
        &self,
        callback: impl Fn(UserId, &str) + Send + Sync + 'static,
    ) -> CallbackHandle {
        self.callbacks.add_user_enter(Arc::new(callback))
    }

    pub fn on_user_leave(
        &self,
        callback: impl Fn(UserId, &str) + Send + Sync + 'static,
    ) -> CallbackHandle {
        self.callbacks.add_user_leave(Arc::new(callback))
    }

    pub fn on_assign(
        &self,
        callback: impl Fn(UserId, &str, Bell) + Send + Sync + 'static,
    ) -> CallbackHandle {
        self.callbacks.add_assign(Arc::new(callback))
    }

    pub fn on_unassign(&self, callback: impl Fn(Bell) + Send + Sync + 'static) -> CallbackHandle {
        self.callbacks.add_unassign(Arc::new(callback))
    }

    pub fn on_chat(
        &self,
        callback: impl Fn(&str, &str) + Send + Sync + 'static,
    ) -> CallbackHandle {
        self.callbacks.add_chat(Arc::new(callback))
    }

    /// Unregisters a callback. Returns `false` if the handle was already
    /// removed.
    pub fn remove_callback(&self, handle: &CallbackHandle) -> bool {
        self.callbacks.remove(handle)
    }

    // ===== ACTIONS =====

    /// Rings a bell. When `expected_stroke` is given and disagrees with the
    /// mirrored state, nothing is sent and `Ok(false)` is returned.
    pub async fn ring_bell(
        &self,
        bell: Bell,
        expected_stroke: Option<Stroke>,
    ) -> Result<bool, TowerError> {
        let stroke = match self.get_stroke(bell) {
            Some(stroke) => stroke,
            None => {
                warn!(bell = bell.number(), "cannot ring a bell outside the tower");
                return Ok(false);
            }
        };
        if let Some(expected) = expected_stroke {
            if expected != stroke {
                warn!(
                    bell = bell.number(),
                    stroke = %stroke,
                    "bell is on the opposite stroke"
                );
                return Ok(false);
            }
        }
        self.send_action(ClientAction::RingBell {
            bell,
            stroke,
            tower_id: self.tower_id,
        })
        .await?;
        Ok(true)
    }

    /// Sets all the bells at handstroke.
    pub async fn set_at_hand(&self) -> Result<(), TowerError> {
        info!(tower = self.tower_id.0, "setting bells at handstroke");
        self.send_action(ClientAction::SetAtHand {
            tower_id: self.tower_id,
        })
        .await
    }

    /// Sets the number of bells in the tower.
    pub async fn set_size(&self, number: usize) -> Result<(), TowerError> {
        info!(tower = self.tower_id.0, size = number, "setting tower size");
        self.send_action(ClientAction::SetSize {
            new_size: number,
            tower_id: self.tower_id,
        })
        .await
    }

    /// Switches the tower between hand and tower bells.
    pub async fn set_bell_type(&self, bell_type: BellType) -> Result<(), TowerError> {
        info!(tower = self.tower_id.0, bell_type = %bell_type, "setting bell type");
        self.send_action(ClientAction::SetBellType {
            new_audio: bell_type.wire_name().to_string(),
            tower_id: self.tower_id,
        })
        .await
    }

    /// Assigns a user to a bell; `None` clears the assignment. The bell must
    /// be in the tower and the user must be in the roster.
    pub async fn assign(&self, user: Option<UserId>, bell: Bell) -> Result<(), TowerError> {
        let size = self.number_of_bells();
        if bell.number() > size {
            return Err(TowerError::BellOutOfRange { bell, size });
        }
        match user {
            Some(user_id) => {
                let name = self
                    .user_name_from_id(user_id)
                    .ok_or(TowerError::UnknownUser { user: user_id })?;
                info!(
                    user = user_id.0,
                    name = %name,
                    bell = bell.number(),
                    "assigning user"
                );
            }
            None => info!(bell = bell.number(), "unassigning bell"),
        }
        self.send_action(ClientAction::AssignUser {
            bell,
            user,
            tower_id: self.tower_id,
        })
        .await
    }

    /// Clears the assignment for one bell.
    pub async fn unassign(&self, bell: Bell) -> Result<(), TowerError> {
        self.assign(None, bell).await
    }

    /// Clears the assignment for every bell in the tower.
    pub async fn unassign_all(&self) -> Result<(), TowerError> {
        let size = self.number_of_bells();
        for number in 1..=size {
            if let Some(bell) = Bell::from_number(number) {
                self.assign(None, bell).await?;
            }
        }
        Ok(())
    }

    /// Sends a chat message under the given display name (which does not
    /// have to belong to any user in the tower).
    pub async fn chat(&self, user: &str, message: &str) -> Result<(), TowerError> {
        self.chat_with_email(user, message, CHAT_EMAIL_MARKER).await
    }

    pub async fn chat_with_email(
        &self,
        user: &str,
        message: &str,
        email: &str,
    ) -> Result<(), TowerError> {
        info!(tower = self.tower_id.0, user, "sending chat message");
        self.send_action(ClientAction::Chat {
            user: user.to_string(),
            msg: message.to_string(),
            email: email.to_string(),
            time: Utc::now(),
            tower_id: self.tower_id,
        })
        .await
    }

    /// Broadcasts a call to everyone in the tower. Any string is accepted;
    /// the well-known ones live in [`shared::calls`].
    pub async fn make_call(&self, call: &str) -> Result<(), TowerError> {
        info!(tower = self.tower_id.0, call, "making call");
        self.send_action(ClientAction::Call {
            call: call.to_string(),
            tower_id: self.tower_id,
        })
        .await
    }

    pub async fn call_bob(&self) -> Result<(), TowerError> {
        self.make_call(calls::BOB).await
    }

    pub async fn call_single(&self) -> Result<(), TowerError> {
        self.make_call(calls::SINGLE).await
    }

    pub async fn call_look_to(&self) -> Result<(), TowerError> {
        self.make_call(calls::LOOK_TO).await
    }

    pub async fn call_go(&self) -> Result<(), TowerError> {
        self.make_call(calls::GO).await
    }

    pub async fn call_thats_all(&self) -> Result<(), TowerError> {
        self.make_call(calls::THATS_ALL).await
    }

    pub async fn call_stand(&self) -> Result<(), TowerError> {
        self.make_call(calls::STAND).await
    }

    async fn send_action(&self, action: ClientAction) -> Result<(), TowerError> {
        match self.state().phase {
            SessionPhase::Joined | SessionPhase::Ready => {}
            SessionPhase::Closed => return Err(TowerError::SessionClosed),
            _ => return Err(TowerError::NotConnected),
        }
        let transport = self.transport().ok_or(TowerError::NotConnected)?;
        if !transport.is_connected() {
            return Err(TowerError::NotConnected);
        }
        transport.emit(action).await?;
        Ok(())
    }

    // ===== EVENT HANDLERS =====
    //
    // State is fully updated before any callback fires, so a callback
    // reading the session mid-invocation sees the post-event view.

    fn handle_event(&self, event: TowerEvent) {
        match event {
            TowerEvent::BellRung {
                global_bell_state,
                who_rang,
            } => self.handle_bell_rung(global_bell_state, who_rang),
            TowerEvent::Call { call } => self.handle_call(&call),
            TowerEvent::UserEntered { user_id, username } => {
                self.handle_user_entered(user_id, username)
            }
            TowerEvent::UserLeft { user_id, username } => {
                self.handle_user_left(user_id, &username)
            }
            TowerEvent::UserList { user_list } => {
                for entry in user_list {
                    self.handle_user_entered(entry.user_id, entry.username);
                }
            }
            TowerEvent::AssignUser { bell, user } => self.handle_assign(bell, user),
            TowerEvent::GlobalState { global_bell_state } => {
                self.handle_global_state(global_bell_state)
            }
            TowerEvent::SizeChange { size } => self.handle_size_change(size),
            TowerEvent::AudioChange { new_audio } => self.handle_audio_change(&new_audio),
            TowerEvent::Chat { user, msg } => self.handle_chat(&user, &msg),
        }
    }

    fn handle_bell_rung(&self, global_bell_state: Vec<Stroke>, who_rang: Bell) {
        let new_stroke = {
            let mut state = self.state();
            state.bell_state = global_bell_state;
            state.bell_state.get(who_rang.index()).copied()
        };
        match new_stroke {
            None => warn!(
                bell = who_rang.number(),
                size = self.number_of_bells(),
                "bell rang outside the tower"
            ),
            Some(stroke) => {
                // Deliver the stroke the bell was on before it rang.
                let before = stroke.opposite();
                for callback in self.callbacks.bell_rung_snapshot() {
                    callback(who_rang, before);
                }
            }
        }
    }

    fn handle_call(&self, call: &str) {
        info!(call, "received call");
        let listeners = self.callbacks.call_snapshot(call).unwrap_or_default();
        if listeners.is_empty() {
            warn!(call, "no listeners registered for call");
        }
        for listener in listeners {
            listener();
        }
    }

    fn handle_user_entered(&self, user_id: UserId, username: String) {
        self.state().user_names.insert(user_id, username.clone());
        debug!(user = user_id.0, name = %username, "user entered");
        for callback in self.callbacks.user_enter_snapshot() {
            callback(user_id, &username);
        }
    }

    fn handle_user_left(&self, user_id: UserId, username: &str) {
        let freed = {
            let mut state = self.state();
            // The roster entry is removed whether or not the reported name
            // matches the stored one.
            match state.user_names.get(&user_id).cloned() {
                None => warn!(
                    user = user_id.0,
                    name = username,
                    "user left but was not in the roster"
                ),
                Some(stored) => {
                    if stored != username {
                        warn!(
                            user = user_id.0,
                            stored = %stored,
                            reported = username,
                            "user left under a different name"
                        );
                    }
                    state.user_names.remove(&user_id);
                }
            }
            // Collect first, then delete.
            let freed: Vec<Bell> = state
                .assigned_users
                .iter()
                .filter(|(_, holder)| **holder == user_id)
                .map(|(bell, _)| *bell)
                .collect();
            for bell in &freed {
                state.assigned_users.remove(bell);
            }
            freed
        };
        info!(
            user = user_id.0,
            name = username,
            bells = ?freed.iter().map(|bell| bell.number()).collect::<Vec<_>>(),
            "user left"
        );
        for callback in self.callbacks.user_leave_snapshot() {
            callback(user_id, username);
        }
    }

    fn handle_assign(&self, bell: Bell, user: Option<UserId>) {
        match user {
            None => {
                let removed = self.state().assigned_users.remove(&bell).is_some();
                info!(bell = bell.number(), "bell unassigned");
                if removed {
                    for callback in self.callbacks.unassign_snapshot() {
                        callback(bell);
                    }
                }
            }
            Some(user_id) => {
                let name = {
                    let mut state = self.state();
                    state.assigned_users.insert(bell, user_id);
                    state.user_names.get(&user_id).cloned()
                };
                let name = match name {
                    Some(name) => name,
                    None => {
                        warn!(
                            user = user_id.0,
                            bell = bell.number(),
                            "assignment for a user missing from the roster"
                        );
                        String::new()
                    }
                };
                info!(user = user_id.0, name = %name, bell = bell.number(), "bell assigned");
                for callback in self.callbacks.assign_snapshot() {
                    callback(user_id, &name, bell);
                }
            }
        }
    }

    fn handle_global_state(&self, global_bell_state: Vec<Stroke>) {
        let fire_set_at_hand = {
            let mut state = self.state();
            state.bell_state = global_bell_state;
            let first = state.awaiting_first_snapshot;
            state.awaiting_first_snapshot = false;
            if matches!(
                state.phase,
                SessionPhase::Connected | SessionPhase::Joined
            ) {
                state.phase = SessionPhase::Ready;
            }
            // The wire does not distinguish the initial sync from a user
            // setting the bells at hand; only sequence position does. The
            // first snapshot is the sync, every later one is a set-at-hand.
            !first
        };
        debug!(bells = self.number_of_bells(), "received bell state");
        if fire_set_at_hand {
            for callback in self.callbacks.set_at_hand_snapshot() {
                callback();
            }
        }
    }

    fn handle_size_change(&self, size: usize) {
        let changed = {
            let mut state = self.state();
            if state.bell_state.len() == size {
                false
            } else {
                // Assignments above the new size would otherwise survive a
                // return to the old size.
                state.assigned_users.retain(|bell, _| bell.number() <= size);
                state.bell_state = vec![Stroke::Hand; size];
                true
            }
        };
        if changed {
            info!(size, "tower size changed");
            for callback in self.callbacks.size_change_snapshot() {
                callback(size);
            }
        }
    }

    fn handle_audio_change(&self, new_audio: &str) {
        let bell_type = match BellType::from_wire_name(new_audio) {
            Ok(bell_type) => bell_type,
            Err(err) => {
                warn!(%err, "ignoring audio change");
                return;
            }
        };
        let changed = {
            let mut state = self.state();
            if state.bell_type == bell_type {
                false
            } else {
                state.bell_type = bell_type;
                true
            }
        };
        // The service resends this event redundantly.
        if changed {
            info!(bell_type = %bell_type, "bell type changed");
            for callback in self.callbacks.bell_type_change_snapshot() {
                callback(bell_type);
            }
        }
    }

    fn handle_chat(&self, user: &str, msg: &str) {
        for callback in self.callbacks.chat_snapshot() {
            callback(user, msg);
        }
    }

    // ===== LOCK HELPERS =====

    fn state(&self) -> MutexGuard<'_, TowerState> {
        self.state.lock().unwrap_or_else(|err| err.into_inner())
    }

    fn transport(&self) -> Option<Arc<dyn Transport>> {
        self.transport_lock().clone()
    }

    fn transport_lock(&self) -> MutexGuard<'_, Option<Arc<dyn Transport>>> {
        self.transport.lock().unwrap_or_else(|err| err.into_inner())
    }

    fn pump_lock(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.pump.lock().unwrap_or_else(|err| err.into_inner())
    }
}

impl Drop for RingingTower {
    fn drop(&mut self) {
        if let Some(pump) = self.pump_lock().take() {
            pump.abort();
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
