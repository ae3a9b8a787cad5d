//! Finalization
//!
//! Objects are reference counted; an object is reclaimed when its last
//! strong reference goes away (values inside open handle scopes, properties
//! of live objects, strong references). Reclamation never calls native code
//! directly. Instead every finalizer attached to the object is moved into the
//! environment's [`FinalizerQueue`], and [`Env::run_finalizers`] drains the
//! queue at a point where native code may safely re-enter the bridge.
//!
//! ## Guarantees
//!
//! - A finalizer fires at most once, and never before its object is reclaimed.
//! - It may never fire while the environment lives: objects kept alive by a
//!   reference cycle are not reclaimed until teardown.
//!
//! ## Teardown
//!
//! Dropping an [`Env`] walks every object reachable from the realm's roots
//! (intrinsics, open scopes, strong references) and empties it, which breaks
//! the cycles between them. Their finalizers are queued and, with
//! `finalize_on_drop` enabled, run before the environment is gone. Finalizers
//! still queued with `finalize_on_drop` disabled are discarded.

use crate::runtime::{Env, JsValue, Object, ObjectClass, ObjectRef, PropertySlot};
use crate::wrap::{Finalizer, NativeData};
use rustc_hash::FxHashSet as HashSet;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};
use tracing::{debug, trace, warn};

/// Finalization statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GcStats {
    /// Finalizers queued by reclaimed objects
    pub enqueued: u64,
    /// Finalizers that have run
    pub finalized: u64,
    /// Finalizers waiting for the next `run_finalizers`
    pub pending: usize,
}

/// A finalizer whose object has been reclaimed
pub(crate) struct PendingFinalizer {
    finalizer: Finalizer,
    data: NativeData,
}

#[derive(Default)]
struct QueueInner {
    pending: VecDeque<PendingFinalizer>,
    enqueued: u64,
    finalized: u64,
}

/// Queue of finalizers waiting to run
pub(crate) struct FinalizerQueue {
    inner: Rc<RefCell<QueueInner>>,
}

impl FinalizerQueue {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(QueueInner::default())),
        }
    }

    /// Attach `finalizer` to an object; the returned guard goes into the
    /// object and queues the finalizer when dropped
    pub fn arm(&self, finalizer: Finalizer, data: NativeData) -> ArmedFinalizer {
        ArmedFinalizer {
            pending: Some(PendingFinalizer { finalizer, data }),
            queue: Rc::downgrade(&self.inner),
        }
    }

    fn pop(&self) -> Option<PendingFinalizer> {
        self.inner.borrow_mut().pending.pop_front()
    }

    fn record_finalized(&self) {
        self.inner.borrow_mut().finalized += 1;
    }

    pub fn stats(&self) -> GcStats {
        let inner = self.inner.borrow();
        GcStats {
            enqueued: inner.enqueued,
            finalized: inner.finalized,
            pending: inner.pending.len(),
        }
    }
}

/// A finalizer attached to a live object
pub struct ArmedFinalizer {
    pending: Option<PendingFinalizer>,
    queue: Weak<RefCell<QueueInner>>,
}

impl ArmedFinalizer {
    /// Detach the finalizer without running it, handing the data back
    pub fn disarm(mut self) -> Option<NativeData> {
        self.pending.take().map(|pending| pending.data)
    }

    /// The native data this finalizer will receive
    pub fn data(&self) -> Option<&NativeData> {
        self.pending.as_ref().map(|pending| &pending.data)
    }
}

impl Drop for ArmedFinalizer {
    fn drop(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        let Some(queue) = self.queue.upgrade() else {
            trace!("environment gone, discarding finalizer");
            return;
        };
        match queue.try_borrow_mut() {
            Ok(mut inner) => {
                inner.pending.push_back(pending);
                inner.enqueued += 1;
            }
            Err(_) => warn!("finalizer queue busy, discarding finalizer"),
        };
    }
}

impl Env {
    /// Run every queued finalizer, including ones queued by finalizers that
    /// run during this call. Returns how many ran.
    pub fn run_finalizers(&mut self) -> usize {
        let mut ran = 0;
        while let Some(PendingFinalizer { finalizer, data }) = self.finalizers.pop() {
            trace!("running finalizer");
            match self.open_handle_scope() {
                Ok(scope) => {
                    finalizer(self, data);
                    self.close_handle_scope(scope);
                }
                Err(_) => finalizer(self, data),
            }
            self.finalizers.record_finalized();
            ran += 1;
        }
        if ran > 0 {
            debug!(finalizers = ran, "finalizers ran");
        }
        ran
    }

    pub fn gc_stats(&self) -> GcStats {
        self.finalizers.stats()
    }

    /// Empty every object reachable from the realm's roots, queueing their
    /// finalizers. Returns how many objects were released.
    pub(crate) fn release_realm(&mut self) -> usize {
        let mut stack: Vec<ObjectRef> = self
            .intrinsics
            .objects()
            .chain(self.scopes.objects())
            .chain(self.references.strong_objects())
            .cloned()
            .collect();
        let mut seen: HashSet<*const RefCell<Object>> = HashSet::default();
        let mut reachable = Vec::new();
        while let Some(obj) = stack.pop() {
            if !seen.insert(Rc::as_ptr(&obj)) {
                continue;
            }
            {
                let target = obj.borrow();
                stack.extend(target.prototype.iter().cloned());
                for property in target.properties.values() {
                    match &property.slot {
                        PropertySlot::Data(JsValue::Object(child)) => stack.push(child.clone()),
                        PropertySlot::Data(_) => {}
                        PropertySlot::Accessor { get, set } => stack.extend(get.iter().chain(set.iter()).cloned()),
                    }
                }
            }
            reachable.push(obj);
        }

        for obj in &reachable {
            // dropped outside the borrow: releasing a slot may reclaim other objects
            let released = {
                let mut target = obj.borrow_mut();
                (
                    std::mem::take(&mut target.properties),
                    target.prototype.take(),
                    std::mem::replace(&mut target.class, ObjectClass::Ordinary),
                    target.wrap.take(),
                    std::mem::take(&mut target.finalizers),
                )
            };
            drop(released);
        }
        trace!(objects = reachable.len(), "released realm");
        reachable.len()
    }
}
