//! Ordered listener lists, one per event category.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard,
    },
};

use shared::domain::{Bell, BellType, Stroke, UserId};

pub type BellRungCallback = dyn Fn(Bell, Stroke) + Send + Sync;
pub type CallCallback = dyn Fn() + Send + Sync;
pub type SizeChangeCallback = dyn Fn(usize) + Send + Sync;
pub type BellTypeCallback = dyn Fn(BellType) + Send + Sync;
pub type SetAtHandCallback = dyn Fn() + Send + Sync;
pub type UserCallback = dyn Fn(UserId, &str) + Send + Sync;
pub type AssignCallback = dyn Fn(UserId, &str, Bell) + Send + Sync;
pub type UnassignCallback = dyn Fn(Bell) + Send + Sync;
pub type ChatCallback = dyn Fn(&str, &str) + Send + Sync;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackCategory {
    BellRung,
    Call,
    SizeChange,
    BellTypeChange,
    SetAtHand,
    UserEnter,
    UserLeave,
    Assign,
    Unassign,
    Chat,
}

/// Returned from every registration; pass it back to
/// [`RingingTower::remove_callback`](crate::RingingTower::remove_callback)
/// to stop receiving the events.
#[derive(Debug, Clone)]
pub struct CallbackHandle {
    pub(crate) category: CallbackCategory,
    pub(crate) label: Option<String>,
    pub(crate) id: u64,
}

impl CallbackHandle {
    pub fn category(&self) -> CallbackCategory {
        self.category
    }
}

struct Listeners<F: ?Sized> {
    entries: Mutex<Vec<(u64, Arc<F>)>>,
}

impl<F: ?Sized> Listeners<F> {
    fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(u64, Arc<F>)>> {
        self.entries.lock().unwrap_or_else(|err| err.into_inner())
    }

    fn add(&self, id: u64, callback: Arc<F>) {
        self.lock().push((id, callback));
    }

    fn remove(&self, id: u64) -> bool {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    // Snapshots are taken so no registry lock is held while callbacks run;
    // a callback may register or remove other callbacks.
    fn snapshot(&self) -> Vec<Arc<F>> {
        self.lock()
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect()
    }
}

macro_rules! listener_category {
    ($add:ident, $snapshot:ident, $field:ident, $category:expr, $ty:ty) => {
        pub(crate) fn $add(&self, callback: Arc<$ty>) -> CallbackHandle {
            let id = self.next_id();
            self.$field.add(id, callback);
            CallbackHandle {
                category: $category,
                label: None,
                id,
            }
        }

        pub(crate) fn $snapshot(&self) -> Vec<Arc<$ty>> {
            self.$field.snapshot()
        }
    };
}

pub(crate) struct CallbackRegistry {
    next_id: AtomicU64,
    bell_rung: Listeners<BellRungCallback>,
    calls: Mutex<HashMap<String, Vec<(u64, Arc<CallCallback>)>>>,
    size_change: Listeners<SizeChangeCallback>,
    bell_type_change: Listeners<BellTypeCallback>,
    set_at_hand: Listeners<SetAtHandCallback>,
    user_enter: Listeners<UserCallback>,
    user_leave: Listeners<UserCallback>,
    assign: Listeners<AssignCallback>,
    unassign: Listeners<UnassignCallback>,
    chat: Listeners<ChatCallback>,
}

impl CallbackRegistry {
    pub(crate) fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            bell_rung: Listeners::new(),
            calls: Mutex::new(HashMap::new()),
            size_change: Listeners::new(),
            bell_type_change: Listeners::new(),
            set_at_hand: Listeners::new(),
            user_enter: Listeners::new(),
            user_leave: Listeners::new(),
            assign: Listeners::new(),
            unassign: Listeners::new(),
            chat: Listeners::new(),
        }
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    listener_category!(
        add_bell_rung,
        bell_rung_snapshot,
        bell_rung,
        CallbackCategory::BellRung,
        BellRungCallback
    );
    listener_category!(
        add_size_change,
        size_change_snapshot,
        size_change,
        CallbackCategory::SizeChange,
        SizeChangeCallback
    );
    listener_category!(
        add_bell_type_change,
        bell_type_change_snapshot,
        bell_type_change,
        CallbackCategory::BellTypeChange,
        BellTypeCallback
    );
    listener_category!(
        add_set_at_hand,
        set_at_hand_snapshot,
        set_at_hand,
        CallbackCategory::SetAtHand,
        SetAtHandCallback
    );
    listener_category!(
        add_user_enter,
        user_enter_snapshot,
        user_enter,
        CallbackCategory::UserEnter,
        UserCallback
    );
    listener_category!(
        add_user_leave,
        user_leave_snapshot,
        user_leave,
        CallbackCategory::UserLeave,
        UserCallback
    );
    listener_category!(
        add_assign,
        assign_snapshot,
        assign,
        CallbackCategory::Assign,
        AssignCallback
    );
    listener_category!(
        add_unassign,
        unassign_snapshot,
        unassign,
        CallbackCategory::Unassign,
        UnassignCallback
    );
    listener_category!(add_chat, chat_snapshot, chat, CallbackCategory::Chat, ChatCallback);

    fn calls_lock(
        &self,
    ) -> MutexGuard<'_, HashMap<String, Vec<(u64, Arc<CallCallback>)>>> {
        self.calls.lock().unwrap_or_else(|err| err.into_inner())
    }

    pub(crate) fn add_call(&self, label: String, callback: Arc<CallCallback>) -> CallbackHandle {
        let id = self.next_id();
        self.calls_lock()
            .entry(label.clone())
            .or_default()
            .push((id, callback));
        CallbackHandle {
            category: CallbackCategory::Call,
            label: Some(label),
            id,
        }
    }

    /// Listeners for one call label; `None` when no listener was ever
    /// registered under it.
    pub(crate) fn call_snapshot(&self, label: &str) -> Option<Vec<Arc<CallCallback>>> {
        self.calls_lock().get(label).map(|entries| {
            entries
                .iter()
                .map(|(_, callback)| Arc::clone(callback))
                .collect()
        })
    }

    pub(crate) fn remove(&self, handle: &CallbackHandle) -> bool {
        match handle.category {
            CallbackCategory::BellRung => self.bell_rung.remove(handle.id),
            CallbackCategory::Call => {
                let Some(label) = handle.label.as_deref() else {
                    return false;
                };
                let mut calls = self.calls_lock();
                let Some(entries) = calls.get_mut(label) else {
                    return false;
                };
                let before = entries.len();
                entries.retain(|(entry_id, _)| *entry_id != handle.id);
                entries.len() != before
            }
            CallbackCategory::SizeChange => self.size_change.remove(handle.id),
            CallbackCategory::BellTypeChange => self.bell_type_change.remove(handle.id),
            CallbackCategory::SetAtHand => self.set_at_hand.remove(handle.id),
            CallbackCategory::UserEnter => self.user_enter.remove(handle.id),
            CallbackCategory::UserLeave => self.user_leave.remove(handle.id),
            CallbackCategory::Assign => self.assign.remove(handle.id),
            CallbackCategory::Unassign => self.unassign.remove(handle.id),
            CallbackCategory::Chat => self.chat.remove(handle.id),
        }
    }
}
