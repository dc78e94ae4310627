use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// Identity of a resolved value: the address of its shared allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(usize);

impl InstanceId {
    /// Identity of any shared allocation, sized or not.
    pub fn of<T: ?Sized>(value: &Arc<T>) -> Self {
        InstanceId(Arc::as_ptr(value) as *const () as usize)
    }
}

/// A type-erased value produced by the container.
///
/// Cloning an `Instance` is cheap and keeps the identity: every clone points
/// at the same allocation.
#[derive(Clone)]
pub struct Instance {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
    views: Vec<(TypeId, Arc<dyn Any + Send + Sync>)>,
}

impl Instance {
    /// Wrap an owned value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// Wrap an already shared value without reallocating it.
    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self {
            value,
            type_name: std::any::type_name::<T>(),
            views: Vec::new(),
        }
    }

    /// Attach an additional typed view of this value (typically an
    /// `Arc<dyn Trait>` pointing at the same allocation). A later view of the
    /// same type replaces the earlier one.
    pub fn with_view<V: Any + Send + Sync + Clone>(mut self, view: V) -> Self {
        let type_id = TypeId::of::<V>();
        self.views.retain(|(id, _)| *id != type_id);
        self.views.push((type_id, Arc::new(view)));
        self
    }

    /// Fetch a view previously attached with [`Instance::with_view`].
    pub fn view<V: Any + Send + Sync + Clone>(&self) -> Option<V> {
        let type_id = TypeId::of::<V>();
        self.views
            .iter()
            .find(|(id, _)| *id == type_id)
            .and_then(|(_, view)| view.downcast_ref::<V>())
            .cloned()
    }

    /// Downcast to the concrete type.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::downcast::<T>(self.value.clone()).ok()
    }

    /// Borrow the concrete value.
    pub fn downcast_ref<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    pub fn is<T: Any + Send + Sync>(&self) -> bool {
        self.value.is::<T>()
    }

    /// Name of the concrete type the instance was created from.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn id(&self) -> InstanceId {
        InstanceId::of(&self.value)
    }

    /// Reference identity, not value equality.
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        self.id() == other.id()
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("type_name", &self.type_name)
            .field("id", &self.id())
            .field("views", &self.views.len())
            .finish()
    }
}
