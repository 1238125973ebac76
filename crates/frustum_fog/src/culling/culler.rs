//! Visibility culling over a dynamic registry of candidate objects
//!
//! Objects are owned by their components and shared as `Rc<RefCell<T>>`. The
//! culler only keeps `Weak` references: registry position is the object's
//! identity inside the culler and is mirrored one-to-one by the bounding
//! sphere array handed to the accelerator.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use super::accelerator::{CullingAccelerator, SphereCullingGroup};
use super::bounding_sphere::{BoundingSphere, CullingView};

/// Shared handle owners keep to their culled objects
pub type Shared<T> = Rc<RefCell<T>>;

/// Anything that can be frustum/distance culled
pub trait Cullable {
    /// Current world-space bounding sphere
    fn bounding_sphere(&self) -> BoundingSphere;
}

/// Bounding-sphere culler producing a compacted visible set every frame
///
/// Visible indices are registry positions valid until the next
/// [`update`](Self::update); callers must not retain them across frames.
pub struct VisibilityCuller<T: ?Sized> {
    label: &'static str,
    registry: Vec<Weak<RefCell<T>>>,
    bounding_spheres: Vec<BoundingSphere>,
    accelerator: Box<dyn CullingAccelerator>,
    visible: Vec<usize>,
}

impl<T: ?Sized + Cullable> VisibilityCuller<T> {
    /// Create a culler backed by a [`SphereCullingGroup`]
    pub fn new(label: &'static str) -> Self {
        Self::with_accelerator(label, Box::new(SphereCullingGroup::new()))
    }

    /// Create a culler backed by a custom accelerator
    pub fn with_accelerator(label: &'static str, accelerator: Box<dyn CullingAccelerator>) -> Self {
        Self {
            label,
            registry: Vec::new(),
            bounding_spheres: Vec::new(),
            accelerator,
            visible: Vec::new(),
        }
    }

    fn position_of(&self, object: &Shared<T>) -> Option<usize> {
        self.registry
            .iter()
            .position(|entry| std::ptr::addr_eq(entry.as_ptr(), Rc::as_ptr(object)))
    }

    fn sync_sizes(&mut self) {
        self.bounding_spheres.resize(self.registry.len(), BoundingSphere::culled());
        self.accelerator.resize(self.registry.len());
    }

    /// Add an object; returns `false` (and does nothing) if already registered
    pub fn register(&mut self, object: &Shared<T>) -> bool {
        if self.position_of(object).is_some() {
            return false;
        }
        self.registry.push(Rc::downgrade(object));
        self.sync_sizes();
        log::trace!("{}: registered object, {} total", self.label, self.registry.len());
        true
    }

    /// Remove an object; returns `false` (and does nothing) if absent
    ///
    /// The current visible set stays valid: indices past the removed slot shift down.
    pub fn unregister(&mut self, object: &Shared<T>) -> bool {
        let Some(position) = self.position_of(object) else {
            return false;
        };
        self.registry.remove(position);
        self.bounding_spheres.remove(position);
        self.visible.retain(|&index| index != position);
        for index in &mut self.visible {
            if *index > position {
                *index -= 1;
            }
        }
        self.sync_sizes();
        log::trace!("{}: unregistered object, {} total", self.label, self.registry.len());
        true
    }

    /// Whether an object is registered
    pub fn contains(&self, object: &Shared<T>) -> bool {
        self.position_of(object).is_some()
    }

    /// Number of registered objects
    pub fn registered_count(&self) -> usize {
        self.registry.len()
    }

    /// Registered objects still alive, in registry order
    pub fn registered_objects(&self) -> impl Iterator<Item = Shared<T>> + '_ {
        self.registry.iter().filter_map(Weak::upgrade)
    }

    /// Refresh bounding spheres and recompute the visible set
    ///
    /// Objects dropped without unregistering are pruned first and returned,
    /// so owners of per-object resources can let go of them.
    pub fn update(&mut self, view: &CullingView) -> Vec<Weak<RefCell<T>>> {
        let (alive, dropped): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.registry).into_iter().partition(|entry| entry.strong_count() > 0);
        self.registry = alive;
        if !dropped.is_empty() {
            self.sync_sizes();
            log::warn!("{}: pruned {} object(s) dropped without unregistering", self.label, dropped.len());
        }

        for (entry, sphere) in self.registry.iter().zip(self.bounding_spheres.iter_mut()) {
            *sphere = entry
                .upgrade()
                .map_or_else(BoundingSphere::culled, |object| object.borrow().bounding_sphere());
        }
        self.accelerator.query(&self.bounding_spheres, view, &mut self.visible);
        dropped
    }

    /// Whether the last update found anything visible
    pub fn has_visible_objects(&self) -> bool {
        !self.visible.is_empty()
    }

    /// Number of objects visible after the last update
    pub fn visible_objects_count(&self) -> usize {
        self.visible.len()
    }

    /// Registry positions of the visible objects, ascending
    pub fn visible_indices(&self) -> &[usize] {
        &self.visible
    }

    /// Visible objects in registry order
    pub fn visible_objects(&self) -> impl Iterator<Item = Shared<T>> + '_ {
        self.visible.iter().filter_map(|&index| self.registry[index].upgrade())
    }

    /// Mirrored bounding spheres from the last update
    pub fn bounding_spheres(&self) -> &[BoundingSphere] {
        &self.bounding_spheres
    }

    /// Release the accelerator and forget every registration
    pub fn dispose(&mut self) {
        self.registry.clear();
        self.bounding_spheres.clear();
        self.visible.clear();
        self.accelerator.release();
        log::debug!("{}: disposed", self.label);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;

    struct Item {
        sphere: BoundingSphere,
    }

    impl Cullable for Item {
        fn bounding_sphere(&self) -> BoundingSphere {
            self.sphere
        }
    }

    fn item(z: f32) -> Shared<Item> {
        Rc::new(RefCell::new(Item { sphere: BoundingSphere::new(Vec3::new(0.0, 0.0, z), 1.0) }))
    }

    fn view() -> CullingView {
        CullingView::distance_only(Vec3::zeros(), 20.0)
    }

    #[test]
    fn test_register_twice_is_idempotent() {
        let mut culler = VisibilityCuller::new("TestCuller");
        let object = item(1.0);
        assert!(culler.register(&object));
        assert!(!culler.register(&object));
        assert_eq!(culler.registered_count(), 1);
        assert_eq!(culler.bounding_spheres().len(), 1);
    }

    #[test]
    fn test_unregister_absent_is_noop() {
        let mut culler = VisibilityCuller::new("TestCuller");
        let object = item(1.0);
        assert!(!culler.unregister(&object));
        culler.register(&object);
        assert!(culler.unregister(&object));
        assert!(!culler.unregister(&object));
        assert_eq!(culler.registered_count(), 0);
    }

    #[test]
    fn test_visible_set_empty_before_first_update() {
        let mut culler = VisibilityCuller::new("TestCuller");
        culler.register(&item(1.0));
        assert!(!culler.has_visible_objects());
        assert_eq!(culler.visible_objects().count(), 0);
    }

    #[test]
    fn test_update_preserves_registry_order_and_tracks_movement() {
        let mut culler = VisibilityCuller::new("TestCuller");
        let objects = [item(5.0), item(100.0), item(-3.0)];
        for object in &objects {
            culler.register(object);
        }
        culler.update(&view());
        assert_eq!(culler.visible_indices(), &[0, 2]);

        objects[1].borrow_mut().sphere.position.z = 10.0;
        objects[0].borrow_mut().sphere.position.z = 50.0;
        culler.update(&view());
        assert_eq!(culler.visible_indices(), &[1, 2]);
        let visible: Vec<_> = culler.visible_objects().collect();
        assert!(Rc::ptr_eq(&visible[0], &objects[1]));
    }

    #[test]
    fn test_unregister_remaps_current_visible_set() {
        let mut culler = VisibilityCuller::new("TestCuller");
        let objects = [item(1.0), item(2.0), item(3.0)];
        for object in &objects {
            culler.register(object);
        }
        culler.update(&view());
        culler.unregister(&objects[0]);

        assert_eq!(culler.visible_indices(), &[0, 1]);
        let visible: Vec<_> = culler.visible_objects().collect();
        assert!(Rc::ptr_eq(&visible[0], &objects[1]));
        assert!(Rc::ptr_eq(&visible[1], &objects[2]));
    }

    #[test]
    fn test_dropped_object_is_pruned_once() {
        let mut culler = VisibilityCuller::new("TestCuller");
        let kept = item(1.0);
        culler.register(&item(2.0));
        culler.register(&kept);
        assert_eq!(culler.registered_count(), 2);

        let dropped = culler.update(&view());
        assert_eq!(dropped.len(), 1);
        assert_eq!(dropped[0].strong_count(), 0);
        assert_eq!(culler.registered_count(), 1);
        assert_eq!(culler.bounding_spheres().len(), 1);
        assert_eq!(culler.visible_indices(), &[0]);
        let visible: Vec<_> = culler.visible_objects().collect();
        assert!(Rc::ptr_eq(&visible[0], &kept));

        assert!(culler.update(&view()).is_empty());
        assert_eq!(culler.registered_count(), 1);
    }

    #[test]
    fn test_dispose_clears_registry() {
        let mut culler = VisibilityCuller::new("TestCuller");
        let object = item(1.0);
        culler.register(&object);
        culler.update(&view());
        culler.dispose();
        assert_eq!(culler.registered_count(), 0);
        assert!(!culler.has_visible_objects());
    }
}
