//! Wrap registry
//!
//! Attaches opaque native data to engine objects. Each object has at most one
//! wrap slot; the slot's finalizer is queued when the object is reclaimed
//! (see [`crate::gc`]). Externals, extra finalizers, type tags and the
//! per-environment instance data live here too since they share the same
//! data/finalizer plumbing.

use crate::error::{Error, ExpectedType, Result};
use crate::gc::ArmedFinalizer;
use crate::reference::Reference;
use crate::runtime::{Env, JsValue, Object, ObjectClass};
use crate::scope::Value;
use std::any::Any;
use std::rc::Rc;
use tracing::{debug, trace};

/// Native data attached to an engine object
pub type NativeData = Rc<dyn Any>;

/// Callback run after an object carrying native data has been reclaimed
pub type Finalizer = Box<dyn FnOnce(&mut Env, NativeData)>;

/// Box a closure as a [`Finalizer`]
pub fn finalizer(f: impl FnOnce(&mut Env, NativeData) + 'static) -> Finalizer {
    Box::new(f)
}

/// A 128-bit tag identifying the native type behind an object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeTag {
    pub lower: u64,
    pub upper: u64,
}

impl TypeTag {
    pub const fn new(lower: u64, upper: u64) -> Self {
        Self { lower, upper }
    }
}

/// The native slot of a wrapped object
pub struct WrapSlot {
    data: NativeData,
    finalizer: Option<ArmedFinalizer>,
}

impl WrapSlot {
    fn into_data(self) -> NativeData {
        match self.finalizer {
            Some(armed) => armed.disarm().unwrap_or(self.data),
            None => self.data,
        }
    }
}

impl Env {
    /// Attach `data` to `object`. `finalizer`, if given, receives the data
    /// after the object has been reclaimed.
    pub fn wrap(&mut self, object: Value, data: NativeData, finalizer: Option<Finalizer>) -> Result<()> {
        let obj = self.object_arg(object)?;
        if obj.borrow().wrap.is_some() {
            return Err(Error::AlreadyWrapped);
        }
        let slot = self.wrap_slot(data, finalizer);
        let mut target = obj.borrow_mut();
        target.wrap = Some(slot);
        debug!(class = target.class_name(), "wrapped object");
        Ok(())
    }

    /// [`Env::wrap`], also returning a weak reference to the object
    pub fn wrap_with_reference(
        &mut self,
        object: Value,
        data: NativeData,
        finalizer: Option<Finalizer>,
    ) -> Result<Reference> {
        self.wrap(object, data, finalizer)?;
        self.create_reference(object, 0)
    }

    /// The data attached by [`Env::wrap`]
    pub fn unwrap(&self, object: Value) -> Result<NativeData> {
        let obj = self.object_arg(object)?;
        let target = obj.borrow();
        target
            .wrap
            .as_ref()
            .map(|slot| slot.data.clone())
            .ok_or(Error::NotWrapped)
    }

    /// [`Env::unwrap`], downcast to the concrete native type
    pub fn unwrap_as<T: 'static>(&self, object: Value) -> Result<Rc<T>> {
        self.unwrap(object)?
            .downcast::<T>()
            .map_err(|_| Error::invalid_argument("wrapped data has a different native type"))
    }

    /// Detach the wrap slot without running its finalizer; the data goes
    /// back to the caller. The object may be wrapped again afterwards.
    pub fn remove_wrap(&mut self, object: Value) -> Result<NativeData> {
        let obj = self.object_arg(object)?;
        let slot = obj.borrow_mut().wrap.take().ok_or(Error::NotWrapped)?;
        trace!("removed wrap");
        Ok(slot.into_data())
    }

    /// A new external value carrying `data`
    pub fn create_external(&mut self, data: NativeData, finalizer: Option<Finalizer>) -> Value {
        let mut external = Object::new(ObjectClass::External(data.clone()), None);
        if let Some(finalizer) = finalizer {
            external.finalizers.push(self.finalizers.arm(finalizer, data));
        }
        let external = Rc::new(std::cell::RefCell::new(external));
        self.handle(JsValue::Object(external))
    }

    pub fn get_value_external(&self, value: Value) -> Result<NativeData> {
        match self.datum(value)? {
            JsValue::Object(obj) => match &obj.borrow().class {
                ObjectClass::External(data) => Ok(data.clone()),
                _ => Err(Error::wrong_type(ExpectedType::External)),
            },
            _ => Err(Error::wrong_type(ExpectedType::External)),
        }
    }

    /// Attach an extra finalizer; independent of the wrap slot, any number
    /// per object
    pub fn add_finalizer(&mut self, object: Value, data: NativeData, finalizer: Finalizer) -> Result<()> {
        let obj = self.object_arg(object)?;
        let armed = self.finalizers.arm(finalizer, data);
        obj.borrow_mut().finalizers.push(armed);
        Ok(())
    }

    /// Tag an object with the native type it stands for. An object can be
    /// tagged once.
    pub fn type_tag_object(&mut self, object: Value, tag: TypeTag) -> Result<()> {
        let obj = self.object_arg(object)?;
        let mut target = obj.borrow_mut();
        if target.type_tag.is_some() {
            return Err(Error::invalid_argument("object is already type-tagged"));
        }
        target.type_tag = Some(tag);
        Ok(())
    }

    pub fn check_object_type_tag(&self, object: Value, tag: &TypeTag) -> Result<bool> {
        let obj = self.object_arg(object)?;
        let matches = obj.borrow().type_tag.as_ref() == Some(tag);
        Ok(matches)
    }

    /// Replace the environment's instance data. The previous data, if any,
    /// is finalized.
    pub fn set_instance_data(&mut self, data: NativeData, finalizer: Option<Finalizer>) {
        let slot = self.wrap_slot(data, finalizer);
        self.instance_data = Some(slot);
    }

    pub fn get_instance_data(&self) -> Option<NativeData> {
        self.instance_data.as_ref().map(|slot| slot.data.clone())
    }

    fn wrap_slot(&self, data: NativeData, finalizer: Option<Finalizer>) -> WrapSlot {
        WrapSlot {
            finalizer: finalizer.map(|f| self.finalizers.arm(f, data.clone())),
            data,
        }
    }
}
