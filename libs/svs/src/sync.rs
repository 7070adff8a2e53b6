//! # State Vector Sync Instance
//!
//! ## Purpose
//!
//! Distributed sequence-number convergence over a shared group prefix.
//! Every node periodically announces its view of the group as a state
//! vector carried in one component of a signed sync Interest; no Data
//! answers it. Receiving a newer vector advances the local view and
//! notifies the application; receiving an older one switches the node into
//! suppression, where it aggregates what it hears and only speaks at the
//! deadline if its view still beats the aggregate.
//!
//! One timer task serves a single logical deadline: it sleeps until the
//! deadline, re-reads it on every wake, and is nudged through a reset
//! signal whenever a state change wants an earlier firing.
//!
//! Invariants: `self_seq` never decreases, every tracked sequence is
//! monotone non-decreasing, and `new_data` returns strictly increasing
//! values.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use client::{App, ClientResult};
use codec::{InterestParam, Signer};
use parking_lot::Mutex;
use rand::Rng;
use security::Validator;
use thiserror::Error;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, error, warn};
use types::{Component, Name};

use crate::tlv::{StateVec, StateVecEntry};

/// Called when remote nodes report data this node has not seen
///
/// Must not block: fetch the missing data from a task or signal, never from
/// inside the callback.
pub type OnMissingData = Arc<dyn Fn(&Arc<SvsInst>) + Send + Sync>;

#[derive(Debug, Error)]
pub enum SvsError {
    #[error("sync is already running @[{0}]")]
    AlreadyRunning(Name),
    #[error(transparent)]
    Client(#[from] client::ClientError),
}

/// Synchronization pace and identity of one instance
pub struct SvsConfig {
    pub base_prefix: Name,
    pub node_id: Name,
    /// Steady-state announcement period
    pub sync_interval: Duration,
    /// Aggregation window entered on hearing an outdated vector
    pub suppression_interval: Duration,
    /// Resume after restart from a persisted sequence number
    pub last_used_seq: u64,
}

impl SvsConfig {
    pub fn new(base_prefix: Name, node_id: Name) -> Self {
        Self {
            base_prefix,
            node_id,
            sync_interval: Duration::from_secs(30),
            suppression_interval: Duration::from_millis(200),
            last_used_seq: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SvsMode {
    Steady,
    Suppression,
}

struct SvsState {
    /// Highest observed sequence per node id (encoded name bytes)
    local_sv: HashMap<Vec<u8>, u64>,
    /// Vector aggregate collected while suppressed
    agg_sv: HashMap<Vec<u8>, u64>,
    mode: SvsMode,
    next_deadline: Instant,
    self_seq: u64,
}

/// A running State Vector Sync participant
pub struct SvsInst {
    base_prefix: Name,
    self_node_id: Vec<u8>,
    sync_interval: Duration,
    suppression_interval: Duration,
    state: Mutex<SvsState>,
    timer_reset: Notify,
    running: AtomicBool,
    app: Mutex<Option<App>>,
    signer: Arc<dyn Signer>,
    validator: Arc<dyn Validator>,
    on_missing_data: OnMissingData,
}

impl SvsInst {
    pub fn new(
        config: SvsConfig,
        on_missing_data: OnMissingData,
        sync_interest_signer: Arc<dyn Signer>,
        sync_interest_validator: Arc<dyn Validator>,
    ) -> Arc<Self> {
        Arc::new(Self {
            self_node_id: config.node_id.encode().to_vec(),
            base_prefix: config.base_prefix,
            sync_interval: config.sync_interval,
            suppression_interval: config.suppression_interval,
            state: Mutex::new(SvsState {
                local_sv: HashMap::new(),
                agg_sv: HashMap::new(),
                mode: SvsMode::Steady,
                next_deadline: Instant::now(),
                self_seq: config.last_used_seq,
            }),
            timer_reset: Notify::new(),
            running: AtomicBool::new(false),
            app: Mutex::new(None),
            signer: sync_interest_signer,
            validator: sync_interest_validator,
            on_missing_data,
        })
    }

    pub fn running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// This node's view of the group, keyed by node id
    pub fn local_state_vector(&self) -> Vec<(Name, u64)> {
        let state = self.state.lock();
        let mut ret: Vec<(Name, u64)> = state
            .local_sv
            .iter()
            .filter_map(|(id, seq)| {
                Name::from_wire(&Bytes::from(id.clone()))
                    .ok()
                    .map(|name| (name, *seq))
            })
            .collect();
        ret.sort_by(|a, b| a.0.encode().cmp(&b.0.encode()));
        ret
    }

    fn sample_sync_timer(&self) -> Duration {
        // Uniform perturbation of roughly plus or minus ten percent
        let r: f64 = rand::thread_rng().gen();
        self.sync_interval.mul_f64(0.9 + 0.2 * r)
    }

    fn sample_sup_timer(&self) -> Duration {
        // Uniform perturbation of roughly plus or minus fifty percent
        let r: f64 = rand::thread_rng().gen();
        self.suppression_interval.mul_f64(0.5 + r)
    }

    /// Attach the sync handler and start the timer task
    pub fn start(self: &Arc<Self>, app: App) -> Result<(), SvsError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(SvsError::AlreadyRunning(self.base_prefix.clone()));
        }
        {
            let mut state = self.state.lock();
            let self_seq = state.self_seq;
            state.local_sv.insert(self.self_node_id.clone(), self_seq);
            state.next_deadline = Instant::now();
        }
        let inst = self.clone();
        let attached = app.attach_handler(
            &self.base_prefix,
            Arc::new(move |name, _app_param, _reply, _context| {
                inst.sync_handler(&name);
            }),
            Some(self.validator.clone()),
        );
        if let Err(e) = attached {
            self.running.store(false, Ordering::SeqCst);
            return Err(e.into());
        }
        *self.app.lock() = Some(app);
        let inst = self.clone();
        tokio::spawn(async move { inst.timer_loop().await });
        Ok(())
    }

    /// Stop the timer and detach the handler
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        self.timer_reset.notify_one();
        if let Some(app) = self.app.lock().take() {
            app.detach_handler(&self.base_prefix);
        }
    }

    /// Announce a new publication, returning the strictly increasing
    /// sequence number to publish under
    pub fn new_data(&self) -> u64 {
        let seq = {
            let mut state = self.state.lock();
            state.self_seq += 1;
            let seq = state.self_seq;
            state.local_sv.insert(self.self_node_id.clone(), seq);
            // Speak immediately regardless of suppression
            state.mode = SvsMode::Steady;
            state.next_deadline = Instant::now();
            seq
        };
        self.timer_reset.notify_one();
        seq
    }

    fn sync_handler(self: &Arc<Self>, name: &Name) {
        if name.len() != self.base_prefix.len() + 2 {
            error!(name = %name, "received invalid sync interest");
            return;
        }
        let sv_component = &name[name.len() - 2];
        let remote_sv = match StateVec::parse_wrapped(&sv_component.wire_bytes()) {
            Ok(sv) => sv,
            Err(e) => {
                error!(name = %name, error = %e, "unable to decode state vector");
                return;
            }
        };
        if remote_sv.entries.is_empty() {
            return;
        }

        let mut rsv_dict: HashMap<Vec<u8>, u64> = HashMap::new();
        for entry in &remote_sv.entries {
            if entry.node_id.is_empty() {
                continue;
            }
            rsv_dict.insert(entry.node_id.encode().to_vec(), entry.seq_no);
        }

        let need_fetch = {
            let mut state = self.state.lock();

            // A remote claiming more of our own data than we produced is
            // inconsistent; drop the whole vector
            if let Some(&claimed) = rsv_dict.get(&self.self_node_id) {
                if claimed > state.self_seq {
                    error!("remote side has more local data for the local node");
                    return;
                }
            }

            let mut need_notif = state
                .local_sv
                .keys()
                .any(|id| !rsv_dict.contains_key(id));
            let mut need_fetch = false;
            for (rsv_id, &rsv_seq) in &rsv_dict {
                let lsv_seq = state.local_sv.get(rsv_id).copied().unwrap_or(0);
                if lsv_seq < rsv_seq {
                    need_fetch = true;
                    state.local_sv.insert(rsv_id.clone(), rsv_seq);
                    debug!(seq = rsv_seq, "missing data learned from remote");
                } else if lsv_seq > rsv_seq {
                    need_notif = true;
                    debug!(seq = rsv_seq, "remote is outdated");
                }
            }

            if need_notif || state.mode == SvsMode::Suppression {
                if state.mode == SvsMode::Steady {
                    state.mode = SvsMode::Suppression;
                    state.agg_sv = rsv_dict.clone();
                    state.next_deadline = Instant::now() + self.sample_sup_timer();
                    self.timer_reset.notify_one();
                } else {
                    for (rsv_id, &rsv_seq) in &rsv_dict {
                        let agg = state.agg_sv.get(rsv_id).copied().unwrap_or(0);
                        state.agg_sv.insert(rsv_id.clone(), agg.max(rsv_seq));
                    }
                }
            } else {
                state.next_deadline = Instant::now() + self.sample_sync_timer();
                self.timer_reset.notify_one();
            }
            need_fetch
        };

        if need_fetch {
            (self.on_missing_data)(self);
        }
    }

    async fn timer_loop(self: Arc<Self>) {
        while self.running() {
            let deadline = self.state.lock().next_deadline;
            let reset = self.timer_reset.notified();
            tokio::select! {
                _ = reset => continue,
                _ = tokio::time::sleep_until(deadline) => {}
            }
            if !self.running() {
                return;
            }
            let emit = {
                let mut state = self.state.lock();
                match state.mode {
                    SvsMode::Suppression => {
                        state.mode = SvsMode::Steady;
                        // Speak only if our view beats the aggregate
                        state
                            .local_sv
                            .iter()
                            .any(|(id, &seq)| state.agg_sv.get(id).copied().unwrap_or(0) < seq)
                    }
                    SvsMode::Steady => true,
                }
            };
            if emit {
                if let Err(e) = self.express_sync_interest() {
                    warn!(error = %e, "unable to send sync interest");
                }
            }
            // Re-arm, unless a state change already moved the deadline
            let mut state = self.state.lock();
            if state.next_deadline == deadline {
                state.next_deadline = Instant::now() + self.sample_sync_timer();
            }
        }
    }

    /// Send one sync Interest carrying the local state vector
    fn express_sync_interest(&self) -> ClientResult<()> {
        let app = match self.app.lock().clone() {
            Some(app) => app,
            None => return Ok(()),
        };
        let sv = {
            let state = self.state.lock();
            let mut entries: Vec<(Vec<u8>, u64)> = state
                .local_sv
                .iter()
                .map(|(id, seq)| (id.clone(), *seq))
                .collect();
            entries.sort();
            StateVec {
                entries: entries
                    .into_iter()
                    .filter_map(|(id, seq_no)| {
                        Name::from_wire(&Bytes::from(id)).ok().map(|node_id| {
                            StateVecEntry { node_id, seq_no }
                        })
                    })
                    .collect(),
            }
        };
        // The vector rides as the last name component before the digest
        let sv_component = Component::from_wire(sv.encode_wrapped())
            .map_err(codec::CodecError::from)?;
        let sync_name = self.base_prefix.appending(sv_component);
        let param = InterestParam {
            nonce: Some(client::utils::gen_nonce()),
            ..Default::default()
        };
        app.send_interest_no_response(&sync_name, &param, None, Some(self.signer.as_ref()))
    }
}
