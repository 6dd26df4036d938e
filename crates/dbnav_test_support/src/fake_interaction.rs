use async_trait::async_trait;
use dbnav_core::{ConfirmRequest, Interaction, ModalRequest, Node, Notice, NoticeLevel, ViewIntent};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

/// An `Interaction` whose confirmations are scripted and whose notices,
/// dialogs and views are recorded for assertions.
///
/// Confirmations without a scripted answer are declined.
#[derive(Default)]
pub struct ScriptedInteraction {
    answers: Mutex<VecDeque<bool>>,
    confirms: Mutex<Vec<ConfirmRequest>>,
    notices: Mutex<Vec<Notice>>,
    modals: Mutex<Vec<ModalRequest>>,
    views: Mutex<Vec<(ViewIntent, String)>>,
}

impl ScriptedInteraction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts the next `count` confirmations.
    pub fn accepting(count: usize) -> Self {
        let interaction = Self::new();
        for _ in 0..count {
            interaction.answer(true);
        }
        interaction
    }

    pub fn declining() -> Self {
        let interaction = Self::new();
        interaction.answer(false);
        interaction
    }

    pub fn answer(&self, accept: bool) {
        mutex_lock(&self.answers).push_back(accept);
    }

    pub fn confirms(&self) -> Vec<ConfirmRequest> {
        mutex_lock(&self.confirms).clone()
    }

    pub fn notices(&self) -> Vec<Notice> {
        mutex_lock(&self.notices).clone()
    }

    pub fn notices_at(&self, level: NoticeLevel) -> Vec<String> {
        mutex_lock(&self.notices)
            .iter()
            .filter(|notice| notice.level == level)
            .map(|notice| notice.message.clone())
            .collect()
    }

    pub fn modals(&self) -> Vec<ModalRequest> {
        mutex_lock(&self.modals).clone()
    }

    /// Opened views with the id of the node each was opened for.
    pub fn views(&self) -> Vec<(ViewIntent, String)> {
        mutex_lock(&self.views).clone()
    }
}

#[async_trait]
impl Interaction for ScriptedInteraction {
    async fn confirm(&self, request: ConfirmRequest) -> bool {
        mutex_lock(&self.confirms).push(request);
        mutex_lock(&self.answers).pop_front().unwrap_or(false)
    }

    fn notify(&self, notice: Notice) {
        mutex_lock(&self.notices).push(notice);
    }

    fn open_modal(&self, request: ModalRequest) {
        mutex_lock(&self.modals).push(request);
    }

    fn open_view(&self, intent: ViewIntent, node: &Node) {
        mutex_lock(&self.views).push((intent, node.id.clone()));
    }
}

fn mutex_lock<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
