//! Promise bridge
//!
//! Promises created from native code are settled through a [`Deferred`],
//! which is consumed by settling it, so a promise cannot be settled twice
//! from the native side. Reactions never run synchronously: settling a
//! promise queues one microtask per reaction, and the queue is drained by
//! [`Env::run_microtasks`], the engine's next turn.

use crate::callable::{function_object, Callable, CallableKind, CallbackInfo};
use crate::error::{Error, ErrorKind, ExpectedType, Result};
use crate::runtime::{Env, JsValue, Object, ObjectClass, ObjectRef, PropertyKey};
use crate::scope::Value;
use std::cell::Cell;
use std::rc::Rc;
use tracing::{debug, trace};

/// Observable state of a promise
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromiseStatus {
    Pending,
    Fulfilled,
    Rejected,
}

#[derive(Clone)]
pub(crate) enum Outcome {
    Fulfilled(JsValue),
    Rejected(JsValue),
}

pub(crate) struct Reaction {
    on_fulfilled: Option<ObjectRef>,
    on_rejected: Option<ObjectRef>,
    /// The promise `then` returned; settled with the handler's outcome
    derived: ObjectRef,
}

/// Internal slots of a promise object
pub struct PromiseInner {
    state: Option<Outcome>,
    reactions: Vec<Reaction>,
}

impl PromiseInner {
    pub fn new() -> Self {
        Self {
            state: None,
            reactions: Vec::new(),
        }
    }

    pub fn status(&self) -> PromiseStatus {
        match self.state {
            None => PromiseStatus::Pending,
            Some(Outcome::Fulfilled(_)) => PromiseStatus::Fulfilled,
            Some(Outcome::Rejected(_)) => PromiseStatus::Rejected,
        }
    }
}

/// A queued unit of work for the engine's next turn
pub(crate) enum Microtask {
    /// Run one reaction of a settled promise
    Reaction {
        handler: Option<ObjectRef>,
        derived: ObjectRef,
        outcome: Outcome,
    },
    /// Adopt the state of a thenable by calling its `then`
    ResolveThenable {
        promise: ObjectRef,
        thenable: JsValue,
        then: ObjectRef,
    },
}

/// The settling half of a promise created by [`Env::create_promise`]
#[must_use = "a deferred promise stays pending unless it is resolved or rejected"]
pub struct Deferred {
    promise: ObjectRef,
}

impl std::fmt::Debug for Deferred {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deferred").finish_non_exhaustive()
    }
}

impl Env {
    /// A new pending promise and the deferred that settles it
    pub fn create_promise(&mut self) -> (Deferred, Value) {
        let promise = self.new_promise_object();
        let value = self.handle(JsValue::Object(promise.clone()));
        (Deferred { promise }, value)
    }

    /// Resolve the promise. A promise or other thenable passed as the
    /// resolution is adopted: the promise follows its eventual state.
    pub fn resolve_deferred(&mut self, deferred: Deferred, resolution: Value) -> Result<()> {
        let resolution = self.datum(resolution)?;
        self.resolve_promise(&deferred.promise, resolution)
    }

    /// Reject the promise with `reason`, which may be any value
    pub fn reject_deferred(&mut self, deferred: Deferred, reason: Value) -> Result<()> {
        let reason = self.datum(reason)?;
        self.settle(&deferred.promise, Outcome::Rejected(reason));
        Ok(())
    }

    pub fn is_promise(&self, value: Value) -> Result<bool> {
        Ok(self.promise_arg(value).is_ok())
    }

    pub fn promise_state(&self, promise: Value) -> Result<PromiseStatus> {
        let promise = self.promise_arg(promise)?;
        let status = match &promise.borrow().class {
            ObjectClass::Promise(inner) => inner.status(),
            _ => PromiseStatus::Pending,
        };
        Ok(status)
    }

    /// The fulfillment value or rejection reason of a settled promise
    pub fn promise_result(&mut self, promise: Value) -> Result<Option<Value>> {
        let promise = self.promise_arg(promise)?;
        let result = match &promise.borrow().class {
            ObjectClass::Promise(PromiseInner {
                state: Some(Outcome::Fulfilled(value) | Outcome::Rejected(value)),
                ..
            }) => Some(value.clone()),
            _ => None,
        };
        Ok(result.map(|value| self.handle(value)))
    }

    /// `promise.then(on_fulfilled, on_rejected)`. Handlers that are not
    /// functions are ignored, as in script.
    pub fn then(&mut self, promise: Value, on_fulfilled: Option<Value>, on_rejected: Option<Value>) -> Result<Value> {
        let promise = self.promise_arg(promise)?;
        let on_fulfilled = self.handler_arg(on_fulfilled)?;
        let on_rejected = self.handler_arg(on_rejected)?;
        let derived = self.promise_then(&promise, on_fulfilled, on_rejected);
        Ok(self.handle(JsValue::Object(derived)))
    }

    /// Run queued microtasks until the queue is empty, including ones queued
    /// along the way. Returns how many ran.
    pub fn run_microtasks(&mut self) -> usize {
        let mut ran = 0;
        while let Some(task) = self.microtasks.pop_front() {
            self.run_microtask(task);
            ran += 1;
        }
        if ran > 0 {
            debug!(microtasks = ran, "microtask queue drained");
        }
        ran
    }

    // === Internals ===

    pub(crate) fn new_promise_object(&self) -> ObjectRef {
        Object::alloc(
            ObjectClass::Promise(PromiseInner::new()),
            Some(self.intrinsics.promise_prototype.clone()),
        )
    }

    pub(crate) fn promise_then(
        &mut self,
        promise: &ObjectRef,
        on_fulfilled: Option<ObjectRef>,
        on_rejected: Option<ObjectRef>,
    ) -> ObjectRef {
        let derived = self.new_promise_object();
        self.add_reaction(
            promise,
            Reaction {
                on_fulfilled,
                on_rejected,
                derived: derived.clone(),
            },
        );
        derived
    }

    /// The promise resolve function: adopt thenables, fulfill with anything
    /// else
    pub(crate) fn resolve_promise(&mut self, promise: &ObjectRef, resolution: JsValue) -> Result<()> {
        let candidate = match &resolution {
            JsValue::Object(candidate) => Some(candidate.clone()),
            _ => None,
        };
        let Some(candidate) = candidate else {
            self.settle(promise, Outcome::Fulfilled(resolution));
            return Ok(());
        };
        let candidate = &candidate;
        if Rc::ptr_eq(candidate, promise) {
            let error = self.new_error_object(
                ErrorKind::TypeError,
                None,
                JsValue::string("Chaining cycle detected for promise"),
            );
            self.settle(promise, Outcome::Rejected(JsValue::Object(error)));
            return Ok(());
        }
        if matches!(candidate.borrow().class, ObjectClass::Promise(_)) {
            self.add_reaction(
                candidate,
                Reaction {
                    on_fulfilled: None,
                    on_rejected: None,
                    derived: promise.clone(),
                },
            );
            return Ok(());
        }
        let then = match self.get_datum(candidate, &PropertyKey::from("then"), &resolution) {
            Ok(then) => then,
            Err(Error::Thrown) => {
                let reason = self.scopes.take_pending_exception().unwrap_or(JsValue::Undefined);
                self.settle(promise, Outcome::Rejected(reason));
                return Ok(());
            }
            Err(err) => return Err(err),
        };
        match then {
            JsValue::Object(then) if then.borrow().callable().is_some() => {
                self.microtasks.push_back(Microtask::ResolveThenable {
                    promise: promise.clone(),
                    thenable: resolution,
                    then,
                });
            }
            _ => self.settle(promise, Outcome::Fulfilled(resolution)),
        }
        Ok(())
    }

    /// Register a reaction, or queue it right away if the promise has
    /// already settled
    fn add_reaction(&mut self, promise: &ObjectRef, reaction: Reaction) {
        let settled = {
            let mut promise = promise.borrow_mut();
            match &mut promise.class {
                ObjectClass::Promise(inner) => match &inner.state {
                    None => {
                        inner.reactions.push(reaction);
                        return;
                    }
                    Some(outcome) => outcome.clone(),
                },
                _ => return,
            }
        };
        self.enqueue_reaction(reaction, settled);
    }

    fn settle(&mut self, promise: &ObjectRef, outcome: Outcome) {
        let reactions = {
            let mut promise = promise.borrow_mut();
            let ObjectClass::Promise(inner) = &mut promise.class else {
                return;
            };
            if inner.state.is_some() {
                return;
            }
            inner.state = Some(outcome.clone());
            std::mem::take(&mut inner.reactions)
        };
        trace!(
            fulfilled = matches!(outcome, Outcome::Fulfilled(_)),
            reactions = reactions.len(),
            "promise settled"
        );
        for reaction in reactions {
            self.enqueue_reaction(reaction, outcome.clone());
        }
    }

    fn enqueue_reaction(&mut self, reaction: Reaction, outcome: Outcome) {
        let handler = match outcome {
            Outcome::Fulfilled(_) => reaction.on_fulfilled,
            Outcome::Rejected(_) => reaction.on_rejected,
        };
        self.microtasks.push_back(Microtask::Reaction {
            handler,
            derived: reaction.derived,
            outcome,
        });
    }

    fn run_microtask(&mut self, task: Microtask) {
        match task {
            Microtask::Reaction {
                handler: None,
                derived,
                outcome,
            } => match outcome {
                Outcome::Fulfilled(value) => self.resolve_or_reject(&derived, Ok(value)),
                rejected => self.settle(&derived, rejected),
            },
            Microtask::Reaction {
                handler: Some(handler),
                derived,
                outcome,
            } => {
                let argument = match outcome {
                    Outcome::Fulfilled(value) | Outcome::Rejected(value) => value,
                };
                let result = self.invoke(&handler, JsValue::Undefined, vec![argument], None);
                self.resolve_or_reject(&derived, result);
            }
            Microtask::ResolveThenable { promise, thenable, then } => {
                let (resolve, reject) = self.resolving_functions(&promise);
                let result = self.invoke(
                    &then,
                    thenable,
                    vec![JsValue::Object(resolve), JsValue::Object(reject)],
                    None,
                );
                if result.is_err() {
                    let reason = self.scopes.take_pending_exception().unwrap_or(JsValue::Undefined);
                    self.settle(&promise, Outcome::Rejected(reason));
                }
            }
        }
    }

    fn resolve_or_reject(&mut self, promise: &ObjectRef, result: Result<JsValue>) {
        let outcome = match result {
            Ok(value) => self.resolve_promise(promise, value),
            Err(err) => Err(err),
        };
        if outcome.is_err() {
            let reason = self.scopes.take_pending_exception().unwrap_or(JsValue::Undefined);
            self.settle(promise, Outcome::Rejected(reason));
        }
    }

    /// A `resolve`/`reject` function pair for `promise`; only the first call
    /// of either has an effect
    pub(crate) fn resolving_functions(&self, promise: &ObjectRef) -> (ObjectRef, ObjectRef) {
        let already_resolved = Rc::new(Cell::new(false));

        let (target, done) = (promise.clone(), already_resolved.clone());
        let resolve = Callable::new(
            CallableKind::Script(crate::ScriptFnKind::Arrow),
            "",
            Rc::new(move |env: &mut Env, info: &CallbackInfo| -> Result<Value> {
                if !done.replace(true) {
                    let resolution = env.datum(info.arg(0))?;
                    env.resolve_promise(&target, resolution)?;
                }
                Ok(env.undefined())
            }),
            None,
        );

        let (target, done) = (promise.clone(), already_resolved);
        let reject = Callable::new(
            CallableKind::Script(crate::ScriptFnKind::Arrow),
            "",
            Rc::new(move |env: &mut Env, info: &CallbackInfo| -> Result<Value> {
                if !done.replace(true) {
                    let reason = env.datum(info.arg(0))?;
                    env.settle(&target, Outcome::Rejected(reason));
                }
                Ok(env.undefined())
            }),
            None,
        );

        let function_prototype = &self.intrinsics.function_prototype;
        (
            function_object(resolve, 1, function_prototype),
            function_object(reject, 1, function_prototype),
        )
    }

    fn promise_arg(&self, value: Value) -> Result<ObjectRef> {
        match self.datum(value)? {
            JsValue::Object(obj) if matches!(obj.borrow().class, ObjectClass::Promise(_)) => Ok(obj),
            _ => Err(Error::wrong_type(ExpectedType::Promise)),
        }
    }

    fn handler_arg(&self, handler: Option<Value>) -> Result<Option<ObjectRef>> {
        Ok(match handler {
            Some(handler) => match self.datum(handler)? {
                JsValue::Object(obj) if obj.borrow().callable().is_some() => Some(obj),
                _ => None,
            },
            None => None,
        })
    }
}

/// `Promise.prototype.then`
pub(crate) fn then_native(env: &mut Env, info: &CallbackInfo) -> Result<Value> {
    let promise = match env.datum(info.this())? {
        JsValue::Object(obj) if matches!(obj.borrow().class, ObjectClass::Promise(_)) => obj,
        _ => {
            return Err(env.raise(
                ErrorKind::TypeError,
                "Method Promise.prototype.then called on incompatible receiver",
            ))
        }
    };
    let on_fulfilled = env.handler_arg(Some(info.arg(0)))?;
    let on_rejected = env.handler_arg(Some(info.arg(1)))?;
    let derived = env.promise_then(&promise, on_fulfilled, on_rejected);
    Ok(env.handle(JsValue::Object(derived)))
}

/// `new Promise(executor)`
pub(crate) fn constructor_native(env: &mut Env, info: &CallbackInfo) -> Result<Value> {
    let executor = match env.datum(info.arg(0))? {
        JsValue::Object(obj) if obj.borrow().callable().is_some() => obj,
        _ => return Err(env.raise(ErrorKind::TypeError, "Promise resolver is not a function")),
    };
    let promise = env.new_promise_object();
    let (resolve, reject) = env.resolving_functions(&promise);
    let outcome = env.invoke(
        &executor,
        JsValue::Undefined,
        vec![JsValue::Object(resolve), JsValue::Object(reject.clone())],
        None,
    );
    if outcome.is_err() {
        let reason = env.scopes.take_pending_exception().unwrap_or(JsValue::Undefined);
        env.invoke(&reject, JsValue::Undefined, vec![reason], None)?;
    }
    Ok(env.handle(JsValue::Object(promise)))
}
