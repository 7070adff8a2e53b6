//! # Application Dispatcher
//!
//! ## Purpose
//!
//! Binds face events to the two client-side tables and provides the
//! express/reply primitives:
//! - Inbound buffers are identified as Interest, Data or link packet;
//!   link packets are unwrapped (fragment, Nack reason, PIT token,
//!   congestion mark) and the fragment re-enters the pipeline.
//! - Interests dispatch through the handler table by longest prefix; a
//!   signed Interest first passes the automatic ParametersSha256 check and
//!   then the handler's validator, both failures dropping the packet.
//! - Data and Nacks resolve entries in the pending-Interest table, with
//!   per-entry match policy, optional implicit-digest pinning, validator
//!   dispatch, deadline timeout and cancellation.
//!
//! Decode failures during intake are logged and drop the offending packet;
//! they never kill the loop. Each pending entry sees exactly one outcome.
//!
//! Handlers run on the dispatcher task and must not block; validators run
//! as spawned tasks.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use codec::{
    lp_type_number, type_number, InterestParam, MetaInfo, PktContext, SignaturePtrs, Signer,
};
use parking_lot::Mutex;
use security::{check_params_sha256, Validator};
use sha2::{Digest, Sha256};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use types::{component, Name};

use crate::error::{ClientError, ClientResult};
use crate::face::{Face, FaceFrame, NullRegisterer, Registerer};
use crate::name_tree::NameTrie;

/// Lifetime applied when an Interest does not carry one, in milliseconds
pub const DEFAULT_LIFETIME: u64 = 4000;

/// Value delivered for a satisfied Interest: final Data name, content and
/// the packet context
pub type DataResult = (Name, Option<Bytes>, PktContext);

/// Interest handler: (name, application parameters, reply, context)
///
/// Handlers run inline on the dispatcher and must hand long work to a task.
pub type IntHandler = Arc<dyn Fn(Name, Option<Bytes>, Reply, PktContext) + Send + Sync>;

/// Continuation replying to one Interest
///
/// Wraps outgoing Data in a link packet bearing the PIT token the Interest
/// arrived with, and refuses to send once the deadline passed.
pub struct Reply {
    face: Arc<dyn Face>,
    name: Name,
    pit_token: Option<Bytes>,
    deadline: Instant,
}

impl Reply {
    pub fn send(&self, data: Bytes) -> ClientResult<()> {
        if Instant::now() > self.deadline {
            warn!(name = %self.name, "deadline passed, unable to reply");
            return Err(ClientError::DeadlinePassed(self.name.clone()));
        }
        match &self.pit_token {
            Some(token) => self.face.send(codec::wrap_with_pit_token(&data, token)),
            None => self.face.send(data),
        }
    }
}

struct PrefixTreeNode {
    handler: IntHandler,
    validator: Option<Arc<dyn Validator>>,
}

struct PendingEntry {
    id: u64,
    tx: oneshot::Sender<ClientResult<DataResult>>,
    deadline: Instant,
    can_be_prefix: bool,
    #[allow(dead_code)]
    must_be_fresh: bool,
    validator: Arc<dyn Validator>,
    implicit_sha256: Option<Vec<u8>>,
}

#[derive(Default)]
struct InterestTreeNode {
    pending: Vec<PendingEntry>,
}

struct AppInner {
    face: Arc<dyn Face>,
    registerer: Arc<dyn Registerer>,
    pit: Mutex<NameTrie<InterestTreeNode>>,
    fib: Mutex<NameTrie<PrefixTreeNode>>,
    intake: Mutex<Option<mpsc::UnboundedReceiver<FaceFrame>>>,
    entry_seq: AtomicU64,
}

/// An NDN application instance
///
/// The tables here are client-side analogues of a forwarder's PIT and FIB:
/// expressed Interests wait in one, attached handlers route from the other.
#[derive(Clone)]
pub struct App {
    inner: Arc<AppInner>,
}

impl App {
    pub fn new(face: Arc<dyn Face>) -> Self {
        Self::with_registerer(face, Arc::new(NullRegisterer))
    }

    pub fn with_registerer(face: Arc<dyn Face>, registerer: Arc<dyn Registerer>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        face.bind(tx);
        Self {
            inner: Arc::new(AppInner {
                face,
                registerer,
                pit: Mutex::new(NameTrie::new()),
                fib: Mutex::new(NameTrie::new()),
                intake: Mutex::new(Some(rx)),
                entry_seq: AtomicU64::new(1),
            }),
        }
    }

    pub fn face(&self) -> &Arc<dyn Face> {
        &self.inner.face
    }

    /// Open the face and process inbound packets until shutdown
    ///
    /// On exit every in-flight Interest is canceled; attached handlers are
    /// retained.
    pub async fn main_loop(&self) -> ClientResult<()> {
        self.inner.face.open().await?;
        debug!("face open, dispatcher running");
        let mut intake = self
            .inner
            .intake
            .lock()
            .take()
            .ok_or_else(|| ClientError::Network("dispatcher already running".into()))?;
        while let Some(frame) = intake.recv().await {
            self.receive(frame.typ, frame.packet).await;
        }
        info!("face closed, canceling pending interests");
        self.cleanup();
        Ok(())
    }

    /// Close the face; the main loop ends and cancels pending Interests
    pub fn shutdown(&self) {
        info!("manual shutdown");
        self.inner.face.shutdown();
    }

    async fn receive(&self, typ: u64, packet: Bytes) {
        let mut nack_reason = None;
        let mut pit_token = None;
        let mut congestion_mark = None;
        let mut packet = packet;
        let mut typ = typ;

        if typ == lp_type_number::LP_PACKET {
            let lp_pkt = match codec::parse_lp_packet(&packet) {
                Ok(lp_pkt) => lp_pkt,
                Err(e) => {
                    warn!(error = %e, "unable to decode received link packet");
                    return;
                }
            };
            nack_reason = lp_pkt.nack_reason;
            pit_token = lp_pkt.pit_token;
            congestion_mark = lp_pkt.congestion_mark;
            packet = match lp_pkt.fragment {
                Some(fragment) => fragment,
                None => {
                    warn!("link packet carries no fragment");
                    return;
                }
            };
            typ = match types::varnum::parse_tl_num(&packet, 0) {
                Ok((typ, _)) => typ,
                Err(e) => {
                    warn!(error = %e, "unable to decode link packet fragment");
                    return;
                }
            };
        }

        if let Some(reason) = nack_reason {
            match codec::parse_interest(packet) {
                Ok(parsed) => {
                    debug!(name = %parsed.name, reason, "network nack received");
                    self.on_nack(&parsed.name, reason);
                }
                Err(e) => warn!(error = %e, "unable to decode nacked interest"),
            }
            return;
        }

        match typ {
            type_number::INTEREST => match codec::parse_interest(packet) {
                Ok(parsed) => {
                    debug!(name = %parsed.name, "interest received");
                    self.on_interest(parsed, pit_token, congestion_mark);
                }
                Err(e) => warn!(error = %e, "unable to decode received interest"),
            },
            type_number::DATA => match codec::parse_data(packet) {
                Ok(parsed) => {
                    debug!(name = %parsed.name, "data received");
                    self.on_data(parsed);
                }
                Err(e) => warn!(error = %e, "unable to decode received data"),
            },
            _ => warn!(typ, "unable to decode received packet"),
        }
    }

    /// Attach an Interest handler at a name prefix
    ///
    /// This only installs the handler; forwarder registration is a separate
    /// [`App::register`] call. Signed Interests reaching a handler without a
    /// validator are dropped.
    pub fn attach_handler(
        &self,
        name: &Name,
        handler: IntHandler,
        validator: Option<Arc<dyn Validator>>,
    ) -> ClientResult<()> {
        let mut fib = self.inner.fib.lock();
        if fib.get(name).is_some() {
            return Err(ClientError::DuplicateHandler(name.clone()));
        }
        fib.get_or_insert_with(name, || PrefixTreeNode { handler, validator });
        Ok(())
    }

    /// Detach the handler attached at exactly `name`
    pub fn detach_handler(&self, name: &Name) {
        self.inner.fib.lock().remove(name);
    }

    /// Register a prefix in the forwarder
    pub async fn register(&self, name: &Name) -> ClientResult<bool> {
        self.inner.registerer.register(name).await
    }

    /// Unregister a prefix in the forwarder
    pub async fn unregister(&self, name: &Name) -> ClientResult<bool> {
        self.inner.registerer.unregister(name).await
    }

    /// Express an Interest and await its resolution
    ///
    /// Returns the Data name, content and context once a matching Data
    /// passes the validator. Application parameters require a signer; the
    /// interest parameters are used exactly as given (pick a nonce with
    /// [`crate::utils::gen_nonce`] when retransmission dedup matters).
    pub async fn express(
        &self,
        name: &Name,
        param: InterestParam,
        app_param: Option<&[u8]>,
        signer: Option<&dyn Signer>,
        validator: Arc<dyn Validator>,
    ) -> ClientResult<DataResult> {
        if !self.inner.face.running() {
            return Err(ClientError::Network(
                "cannot send packet before connected".into(),
            ));
        }
        if app_param.is_some() && signer.is_none() {
            return Err(ClientError::MissingSigner);
        }
        let (wire, final_name) = codec::make_interest(name, &param, app_param, signer)?;
        self.express_raw_interest(final_name, &param, wire, validator)
            .await
    }

    /// Send a pre-encoded Interest and register its pending entry
    pub async fn express_raw_interest(
        &self,
        final_name: Name,
        param: &InterestParam,
        raw_interest: Bytes,
        validator: Arc<dyn Validator>,
    ) -> ClientResult<DataResult> {
        // A trailing implicit digest pins the Data packet but is not part
        // of the table key
        let (node_name, implicit_sha256) = match final_name.last() {
            Some(comp) if comp.typ() == component::TYPE_IMPLICIT_SHA256 => (
                final_name.prefix(final_name.len() - 1),
                Some(comp.value().to_vec()),
            ),
            _ => (final_name.clone(), None),
        };
        let lifetime = param.lifetime.unwrap_or(DEFAULT_LIFETIME);
        let deadline = Instant::now() + Duration::from_millis(lifetime);
        let id = self.inner.entry_seq.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        {
            let mut pit = self.inner.pit.lock();
            let node = pit.get_or_insert_with(&node_name, InterestTreeNode::default);
            node.pending.push(PendingEntry {
                id,
                tx,
                deadline,
                can_be_prefix: param.can_be_prefix,
                must_be_fresh: param.must_be_fresh,
                validator,
                implicit_sha256,
            });
        }
        if let Err(e) = self.inner.face.send(raw_interest) {
            let mut pit = self.inner.pit.lock();
            if let Some(node) = pit.get_mut(&node_name) {
                node.pending.retain(|entry| entry.id != id);
                if node.pending.is_empty() {
                    pit.remove(&node_name);
                }
            }
            return Err(e);
        }
        self.wait_for_data(rx, deadline, id, &node_name).await
    }

    /// Send an Interest expecting no Data back (sync protocols)
    pub fn send_interest_no_response(
        &self,
        name: &Name,
        param: &InterestParam,
        app_param: Option<&[u8]>,
        signer: Option<&dyn Signer>,
    ) -> ClientResult<()> {
        let (wire, _) = codec::make_interest(name, param, app_param, signer)?;
        self.inner.face.send(wire)
    }

    async fn wait_for_data(
        &self,
        rx: oneshot::Receiver<ClientResult<DataResult>>,
        deadline: Instant,
        id: u64,
        node_name: &Name,
    ) -> ClientResult<DataResult> {
        // An already-passed deadline still deserves a short grace period:
        // the caller may have computed between expressing and awaiting
        let remaining = match deadline.checked_duration_since(Instant::now()) {
            Some(remaining) if !remaining.is_zero() => remaining,
            _ => Duration::from_millis(100),
        };
        match tokio::time::timeout(remaining, rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(ClientError::Canceled),
            Err(_) => {
                let mut pit = self.inner.pit.lock();
                if let Some(node) = pit.get_mut(node_name) {
                    node.pending.retain(|entry| entry.id != id);
                    if node.pending.is_empty() {
                        pit.remove(node_name);
                    }
                }
                Err(ClientError::Timeout)
            }
        }
    }

    fn on_data(&self, parsed: codec::ParsedData) {
        let codec::ParsedData {
            name,
            meta_info,
            content,
            sig_ptrs,
        } = parsed;
        let raw_packet = sig_ptrs.raw.clone();
        let mut data_sha256: Option<[u8; 32]> = None;

        let mut pit = self.inner.pit.lock();
        for prefix in pit.prefixes(&name) {
            let is_prefix = prefix != name;
            let now_empty = {
                let Some(node) = pit.get_mut(&prefix) else {
                    continue;
                };
                let mut remaining = Vec::with_capacity(node.pending.len());
                for entry in node.pending.drain(..) {
                    let mut satisfied = !is_prefix || entry.can_be_prefix;
                    if satisfied {
                        if let Some(expected) = &entry.implicit_sha256 {
                            let digest = data_sha256
                                .get_or_insert_with(|| Sha256::digest(&raw_packet).into());
                            satisfied = digest.as_slice() == expected.as_slice();
                        }
                    }
                    if satisfied {
                        dispatch_validation(
                            entry,
                            name.clone(),
                            meta_info.clone(),
                            content.clone(),
                            sig_ptrs.clone(),
                            raw_packet.clone(),
                        );
                    } else {
                        remaining.push(entry);
                    }
                }
                let now_empty = remaining.is_empty();
                node.pending = remaining;
                now_empty
            };
            if now_empty {
                pit.remove(&prefix);
            }
        }
    }

    fn on_nack(&self, name: &Name, reason: u64) {
        let mut pit = self.inner.pit.lock();
        if let Some(node) = pit.get_mut(name) {
            for entry in node.pending.drain(..) {
                let _ = entry.tx.send(Err(ClientError::Nack { reason }));
            }
            pit.remove(name);
        }
    }

    fn on_interest(
        &self,
        parsed: codec::ParsedInterest,
        pit_token: Option<Bytes>,
        congestion_mark: Option<u64>,
    ) {
        let codec::ParsedInterest {
            name,
            param,
            app_param,
            sig_ptrs,
        } = parsed;

        let (handler, validator) = {
            let fib = self.inner.fib.lock();
            let Some(node) = fib.longest_prefix(&name).and_then(|prefix| fib.get(&prefix)) else {
                warn!(name = %name, "no route");
                return;
            };
            (node.handler.clone(), node.validator.clone())
        };

        let sig_required = app_param.is_some() || sig_ptrs.signature_info.is_some();
        if sig_required && !check_params_sha256(&name, &sig_ptrs) {
            warn!(name = %name, "drop malformed interest");
            return;
        }

        let lifetime = param.lifetime.unwrap_or(DEFAULT_LIFETIME);
        let deadline = Instant::now() + Duration::from_millis(lifetime);
        let raw_packet = sig_ptrs.raw.clone();
        let context = PktContext {
            meta_info: None,
            int_param: Some(param),
            sig_ptrs,
            raw_packet,
            pit_token: pit_token.clone(),
            congestion_mark,
            deadline,
        };
        let reply = Reply {
            face: self.inner.face.clone(),
            name: name.clone(),
            pit_token,
            deadline,
        };

        // The validator may suspend; keep the dispatcher responsive
        tokio::spawn(async move {
            if sig_required {
                // Signed Interests without a validator are rejected; a
                // policy that accepts unsigned parameters must say so by
                // returning AllowBypass
                let result = match &validator {
                    Some(validator) => {
                        validator.validate(&name, &context.sig_ptrs, &context).await
                    }
                    None => codec::ValidResult::Fail,
                };
                if !result.is_acceptable() {
                    warn!(name = %name, "drop unvalidated interest");
                    return;
                }
            }
            handler(name, app_param, reply, context);
        });
    }

    fn cleanup(&self) {
        let mut pit = self.inner.pit.lock();
        for key in pit.keys() {
            pit.remove(&key);
        }
    }
}

/// Run the entry's validator as a task and deliver exactly one outcome
fn dispatch_validation(
    entry: PendingEntry,
    name: Name,
    meta_info: Option<MetaInfo>,
    content: Option<Bytes>,
    sig_ptrs: SignaturePtrs,
    raw_packet: Bytes,
) {
    tokio::spawn(async move {
        let context = PktContext {
            meta_info: meta_info.clone(),
            int_param: None,
            sig_ptrs,
            raw_packet,
            pit_token: None,
            congestion_mark: None,
            deadline: entry.deadline,
        };
        let result = entry
            .validator
            .validate(&name, &context.sig_ptrs, &context)
            .await;
        let outcome = if result.is_acceptable() {
            Ok((name, content, context))
        } else {
            Err(ClientError::Validation {
                name,
                meta_info,
                content,
                result,
            })
        };
        let _ = entry.tx.send(outcome);
    });
}
