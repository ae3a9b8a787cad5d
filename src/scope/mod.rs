//! Handle scopes
//!
//! Every [`Value`] a bridge call hands to native code is a slot in the
//! innermost open scope. Scopes nest as a stack: closing one releases all of
//! its slots at once, after which any handle into it fails with
//! [`Error::UseAfterScopeClose`] instead of resolving to stale data.
//!
//! An escapable scope may promote exactly one of its values to the parent
//! scope before it closes.
//!
//! The engine tracks the underlying data independently: a slot only keeps its
//! datum alive, it is not the datum's only owner.

use crate::error::{Error, Result};
use crate::runtime::{Env, JsValue, ObjectRef};
use tracing::{trace, warn};

/// Opaque, scope-owned reference to one engine value.
///
/// Handles are `Copy`; equality compares handle slots, not script values (use
/// [`Env::strict_equals`] for that).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Value {
    scope: u64,
    index: u32,
}

/// Token for an open handle scope
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a handle scope must be closed with Env::close_handle_scope"]
pub struct HandleScope {
    id: u64,
}

/// Token for an open escapable handle scope
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a handle scope must be closed with Env::close_escapable_handle_scope"]
pub struct EscapableHandleScope {
    id: u64,
}

pub(crate) struct ScopeFrame {
    id: u64,
    handles: Vec<JsValue>,
    escapable: bool,
    escaped: bool,
    /// Exception raised while this frame was innermost and not yet cleared
    pub(crate) pending_exception: Option<JsValue>,
}

impl ScopeFrame {
    fn new(id: u64, escapable: bool) -> Self {
        Self {
            id,
            handles: Vec::new(),
            escapable,
            escaped: false,
            pending_exception: None,
        }
    }
}

/// The stack of open scopes. Frame 0 is the outermost scope, which is never
/// closed while the environment lives.
pub(crate) struct ScopeStack {
    frames: Vec<ScopeFrame>,
    next_id: u64,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self {
            frames: vec![ScopeFrame::new(0, false)],
            next_id: 1,
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    fn push(&mut self, escapable: bool) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.frames.push(ScopeFrame::new(id, escapable));
        id
    }

    /// Pop the innermost frame, which must be `id`. A pending exception
    /// that was never cleared moves to the parent frame.
    fn pop(&mut self, id: u64) {
        let top = self.frames.last().map(|frame| frame.id);
        if top != Some(id) || self.frames.len() == 1 {
            panic!(
                "handle scopes must close in reverse order of opening: tried to close scope {} while scope {} is innermost",
                id,
                top.unwrap_or(0)
            );
        }
        let Some(frame) = self.frames.pop() else {
            return;
        };
        if let Some(exception) = frame.pending_exception {
            if let Some(parent) = self.frames.last_mut() {
                if parent.pending_exception.is_some() {
                    warn!("replacing pending exception while unwinding scope {}", id);
                }
                parent.pending_exception = Some(exception);
            }
        }
    }

    pub fn current(&self) -> &ScopeFrame {
        // frame 0 is never popped
        &self.frames[self.frames.len() - 1]
    }

    pub fn current_mut(&mut self) -> &mut ScopeFrame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    fn frame_index(&self, id: u64) -> Option<usize> {
        self.frames.binary_search_by_key(&id, |frame| frame.id).ok()
    }

    fn alloc_in(&mut self, frame: usize, value: JsValue) -> Value {
        let frame = &mut self.frames[frame];
        frame.handles.push(value);
        Value {
            scope: frame.id,
            index: (frame.handles.len() - 1) as u32,
        }
    }

    /// Mint a handle in the innermost scope
    pub fn alloc(&mut self, value: JsValue) -> Value {
        let top = self.frames.len() - 1;
        self.alloc_in(top, value)
    }

    /// Resolve a handle to the datum it refers to
    pub fn get(&self, handle: Value) -> Result<&JsValue> {
        self.frame_index(handle.scope)
            .and_then(|frame| self.frames[frame].handles.get(handle.index as usize))
            .ok_or(Error::UseAfterScopeClose)
    }

    fn escape(&mut self, id: u64, handle: Value) -> Result<Value> {
        let frame = self.frame_index(id).ok_or(Error::UseAfterScopeClose)?;
        if !self.frames[frame].escapable {
            return Err(Error::invalid_argument("scope is not escapable"));
        }
        if self.frames[frame].escaped {
            return Err(Error::EscapeAlreadyCalled);
        }
        let value = self.get(handle)?.clone();
        self.frames[frame].escaped = true;
        Ok(self.alloc_in(frame - 1, value))
    }

    /// The innermost pending exception
    pub fn pending_exception(&self) -> Option<&JsValue> {
        self.frames.iter().rev().find_map(|frame| frame.pending_exception.as_ref())
    }

    pub fn take_pending_exception(&mut self) -> Option<JsValue> {
        self.frames
            .iter_mut()
            .rev()
            .find_map(|frame| frame.pending_exception.take())
    }

    /// Every object held by a live slot or a pending exception
    pub fn objects(&self) -> impl Iterator<Item = &ObjectRef> {
        self.frames
            .iter()
            .flat_map(|frame| frame.handles.iter().chain(frame.pending_exception.iter()))
            .filter_map(|value| match value {
                JsValue::Object(obj) => Some(obj),
                _ => None,
            })
    }

    /// Drop every frame but the outermost
    pub fn unwind_all(&mut self) {
        self.frames.truncate(1);
        self.frames[0].handles.clear();
    }
}

impl Env {
    /// Open a handle scope; it becomes the allocation target for new values
    pub fn open_handle_scope(&mut self) -> Result<HandleScope> {
        let id = self.push_scope(false)?;
        Ok(HandleScope { id })
    }

    /// Close a handle scope, releasing every value minted inside it.
    ///
    /// # Panics
    /// Panics if `scope` is not the innermost open scope.
    pub fn close_handle_scope(&mut self, scope: HandleScope) {
        trace!(scope = scope.id, "close handle scope");
        self.scopes.pop(scope.id);
    }

    /// Open an escapable handle scope
    pub fn open_escapable_handle_scope(&mut self) -> Result<EscapableHandleScope> {
        let id = self.push_scope(true)?;
        Ok(EscapableHandleScope { id })
    }

    /// Close an escapable handle scope.
    ///
    /// # Panics
    /// Panics if `scope` is not the innermost open scope.
    pub fn close_escapable_handle_scope(&mut self, scope: EscapableHandleScope) {
        trace!(scope = scope.id, "close escapable handle scope");
        self.scopes.pop(scope.id);
    }

    /// Promote `value` to the parent of `scope`. Allowed once per scope.
    pub fn escape_handle(&mut self, scope: &EscapableHandleScope, value: Value) -> Result<Value> {
        let escaped = self.scopes.escape(scope.id, value)?;
        trace!(scope = scope.id, "escaped handle to parent scope");
        Ok(escaped)
    }

    /// Run `f` inside a fresh handle scope
    pub fn with_scope<T>(&mut self, f: impl FnOnce(&mut Env) -> Result<T>) -> Result<T> {
        let scope = self.open_handle_scope()?;
        let result = f(self);
        self.close_handle_scope(scope);
        result
    }

    /// Run `f` inside a fresh escapable scope, escaping the value it returns
    pub fn with_escapable_scope(
        &mut self,
        f: impl FnOnce(&mut Env, &EscapableHandleScope) -> Result<Value>,
    ) -> Result<Value> {
        let scope = self.open_escapable_handle_scope()?;
        let result = f(self, &scope).and_then(|value| self.escape_handle(&scope, value));
        self.close_escapable_handle_scope(scope);
        result
    }

    /// Number of open scopes, the outermost included
    pub fn scope_depth(&self) -> usize {
        self.scopes.depth()
    }

    fn push_scope(&mut self, escapable: bool) -> Result<u64> {
        let limit = self.config.max_scope_depth;
        if self.scopes.depth() >= limit {
            return Err(Error::EngineLimitExceeded {
                what: "handle scope depth",
                limit: limit as u64,
            });
        }
        let id = self.scopes.push(escapable);
        trace!(scope = id, escapable, "open handle scope");
        Ok(id)
    }

    /// Mint a handle for `value` in the innermost scope
    pub(crate) fn handle(&mut self, value: JsValue) -> Value {
        self.scopes.alloc(value)
    }

    /// Resolve a handle to its datum
    pub(crate) fn datum(&self, value: Value) -> Result<JsValue> {
        self.scopes.get(value).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Env;

    #[test]
    fn test_values_die_with_their_scope() {
        let mut env = Env::new();
        let scope = env.open_handle_scope().unwrap();
        let v = env.double(42.0);
        assert_eq!(env.as_double(v).unwrap(), 42.0);
        env.close_handle_scope(scope);
        assert_eq!(env.as_double(v), Err(Error::UseAfterScopeClose));
    }

    #[test]
    fn test_outer_values_survive_inner_scope() {
        let mut env = Env::new();
        let outer = env.double(1.0);
        env.with_scope(|env| {
            let _inner = env.double(2.0);
            Ok(())
        })
        .unwrap();
        assert_eq!(env.as_double(outer).unwrap(), 1.0);
    }

    #[test]
    fn test_escape_moves_value_to_parent() {
        let mut env = Env::new();
        let scope = env.open_escapable_handle_scope().unwrap();
        let inner = env.string_utf8("kept").unwrap();
        let escaped = env.escape_handle(&scope, inner).unwrap();
        env.close_escapable_handle_scope(scope);
        assert_eq!(env.as_string(inner), Err(Error::UseAfterScopeClose));
        assert_eq!(env.as_string(escaped).unwrap(), "kept");
    }

    #[test]
    fn test_escape_twice_fails() {
        let mut env = Env::new();
        let scope = env.open_escapable_handle_scope().unwrap();
        let a = env.object();
        let b = env.object();
        env.escape_handle(&scope, a).unwrap();
        assert_eq!(env.escape_handle(&scope, b), Err(Error::EscapeAlreadyCalled));
        env.close_escapable_handle_scope(scope);
    }

    #[test]
    fn test_with_escapable_scope() {
        let mut env = Env::new();
        let depth = env.scope_depth();
        let v = env.with_escapable_scope(|env, _| Ok(env.int32(7))).unwrap();
        assert_eq!(env.scope_depth(), depth);
        assert_eq!(env.as_int32(v).unwrap(), 7);
    }

    #[test]
    #[should_panic(expected = "reverse order")]
    fn test_out_of_order_close_panics() {
        let mut env = Env::new();
        let outer = env.open_handle_scope().unwrap();
        let _inner = env.open_handle_scope().unwrap();
        env.close_handle_scope(outer);
    }

    #[test]
    fn test_scope_depth_limit() {
        let config = crate::BridgeConfig {
            max_scope_depth: 3,
            ..Default::default()
        };
        let mut env = Env::with_config(config);
        let a = env.open_handle_scope().unwrap();
        let b = env.open_handle_scope().unwrap();
        assert!(matches!(env.open_handle_scope(), Err(Error::EngineLimitExceeded { .. })));
        env.close_handle_scope(b);
        env.close_handle_scope(a);
    }

    #[test]
    fn test_nested_scopes_are_independent() {
        let mut env = Env::new();
        let s1 = env.open_handle_scope().unwrap();
        let a = env.int32(1);
        let s2 = env.open_handle_scope().unwrap();
        let b = env.int32(2);
        env.close_handle_scope(s2);
        assert_eq!(env.as_int32(a).unwrap(), 1);
        assert_eq!(env.as_int32(b), Err(Error::UseAfterScopeClose));
        env.close_handle_scope(s1);
        assert_eq!(env.as_int32(a), Err(Error::UseAfterScopeClose));
    }
}
