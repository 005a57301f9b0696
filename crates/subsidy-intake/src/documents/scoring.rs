//! Weighted completion score and its debounced persistence.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use super::domain::{DocumentTypeId, UserId};
use super::slots::{Slot, SlotClassification};
use super::store::ProgressStore;
use crate::config::ProgressConfig;

const FORM_WEIGHT: f64 = 20.0;
const DOCUMENT_WEIGHT: f64 = 30.0;
const BONUS: f64 = 10.0;

/// Completion percentages reported by the external form sections.
///
/// The first three are weighted; the remaining four only unlock the bonus together.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormProgress {
    pub hauptantrag: u8,
    pub einkommenserklaerung: u8,
    pub selbstauskunft: u8,
    pub haushaltsauskunft: u8,
    pub wofiv: u8,
    pub din277: u8,
    pub selbsthilfe: u8,
}

impl FormProgress {
    fn weighted(&self) -> [u8; 3] {
        [self.hauptantrag, self.einkommenserklaerung, self.selbstauskunft]
    }

    fn bonus_sum(&self) -> u16 {
        [self.haushaltsauskunft, self.wofiv, self.din277, self.selbsthilfe]
            .into_iter()
            .map(u16::from)
            .sum()
    }
}

/// What the progress store holds for one user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressSnapshot {
    pub score: Option<u8>,
    pub forms: FormProgress,
}

/// Overall completion in `0..=100`.
///
/// Required slots are grouped by `(document type, applicant uuid)`; a group is complete once
/// any of its slots holds a file. Without required groups the document share is zero.
pub fn score(forms: &FormProgress, slots: &[Slot]) -> u8 {
    let form_points: f64 = forms
        .weighted()
        .into_iter()
        .map(|percent| f64::from(percent.min(100)) / 100.0 * FORM_WEIGHT)
        .sum();

    let mut groups: BTreeSet<(&DocumentTypeId, Option<Uuid>)> = BTreeSet::new();
    let mut complete: BTreeSet<(&DocumentTypeId, Option<Uuid>)> = BTreeSet::new();
    for slot in slots
        .iter()
        .filter(|slot| slot.classification == SlotClassification::Required)
    {
        let Some(document) = slot.document_type_id.as_ref() else {
            continue;
        };
        let group = (document, slot.applicant_key.uuid());
        groups.insert(group);
        if slot.file.is_some() {
            complete.insert(group);
        }
    }
    let document_points = if groups.is_empty() {
        0.0
    } else {
        complete.len() as f64 / groups.len() as f64 * DOCUMENT_WEIGHT
    };

    let bonus = if forms.bonus_sum() == 400 { BONUS } else { 0.0 };

    (form_points + document_points + bonus).round().clamp(0.0, 100.0) as u8
}

#[derive(Default)]
struct WriterState {
    /// Pending write per user, tagged so a finished task only clears its own entry.
    pending: HashMap<UserId, (u64, JoinHandle<()>)>,
    persisted: HashMap<UserId, u8>,
    next_ticket: u64,
}

impl WriterState {
    fn finish(&mut self, user_id: &UserId, ticket: u64) {
        if self
            .pending
            .get(user_id)
            .is_some_and(|(pending, _)| *pending == ticket)
        {
            self.pending.remove(user_id);
        }
    }
}

/// Debounced writer for the completion score.
///
/// Each `schedule` call cancels the pending write for that user. A write only happens when
/// the score moved by at least `min_delta` from the last persisted value.
#[derive(Clone)]
pub struct ProgressWriter {
    store: Arc<dyn ProgressStore>,
    config: ProgressConfig,
    state: Arc<Mutex<WriterState>>,
}

impl ProgressWriter {
    pub fn new(store: Arc<dyn ProgressStore>, config: ProgressConfig) -> Self {
        Self {
            store,
            config,
            state: Arc::new(Mutex::new(WriterState::default())),
        }
    }

    /// Record a score that is already persisted, e.g. after loading it.
    pub fn seed(&self, user_id: &UserId, score: u8) {
        let mut state = lock(&self.state);
        state.persisted.entry(user_id.clone()).or_insert(score);
    }

    pub fn last_persisted(&self, user_id: &UserId) -> Option<u8> {
        lock(&self.state).persisted.get(user_id).copied()
    }

    pub fn pending_writes(&self) -> usize {
        lock(&self.state).pending.len()
    }

    pub fn schedule(&self, user_id: &UserId, score: u8) {
        let store = Arc::clone(&self.store);
        let state = Arc::clone(&self.state);
        let debounce = self.config.debounce;
        let min_delta = self.config.min_delta;
        let user = user_id.clone();

        // Held across the spawn so the task cannot finish before its entry exists.
        let mut guard = lock(&self.state);
        let ticket = guard.next_ticket;
        guard.next_ticket = guard.next_ticket.wrapping_add(1);

        let task = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;

            let previous = lock(&state).persisted.get(&user).copied();
            let below_threshold =
                previous.is_some_and(|previous| previous.abs_diff(score) < min_delta.max(1));
            if below_threshold {
                debug!(user_id = %user, score, previous, "progress change below threshold");
            } else {
                match store.save_score(&user, score).await {
                    Ok(()) => {
                        lock(&state).persisted.insert(user.clone(), score);
                    }
                    Err(err) => {
                        warn!(user_id = %user, score, error = %err, "failed to persist progress")
                    }
                }
            }
            lock(&state).finish(&user, ticket);
        });

        if let Some((_, previous)) = guard.pending.insert(user_id.clone(), (ticket, task)) {
            previous.abort();
        }
    }
}

fn lock(state: &Mutex<WriterState>) -> std::sync::MutexGuard<'_, WriterState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
