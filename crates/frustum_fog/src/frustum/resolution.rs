//! Grid resolution and thread group snapping

use serde::{Deserialize, Serialize};

/// How a requested resolution is snapped to thread group multiples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SnapPolicy {
    /// Largest multiple not above the request
    #[default]
    Down,
    /// Closest multiple, halfway rounds up
    Nearest,
    /// Smallest multiple not below the request
    Up,
}

/// Cell count of the frustum grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GridResolution {
    /// Cells across
    pub x: u32,
    /// Cells up
    pub y: u32,
    /// Depth slices
    pub z: u32,
}

impl GridResolution {
    /// Create a resolution
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    /// Create a resolution from `[x, y, z]`
    pub const fn from_array(axes: [u32; 3]) -> Self {
        Self::new(axes[0], axes[1], axes[2])
    }

    /// `[x, y, z]`
    pub const fn to_array(self) -> [u32; 3] {
        [self.x, self.y, self.z]
    }

    /// Snap every axis to a multiple of the thread group size
    pub fn snap(self, thread_group_size: [u32; 3], policy: SnapPolicy) -> Self {
        let axes = self.to_array();
        Self::from_array(std::array::from_fn(|i| snap_axis(axes[i], thread_group_size[i], policy)))
    }

    /// Raise empty axes to one thread group so the grid can be allocated
    pub fn clamped_to_groups(self, thread_group_size: [u32; 3]) -> Self {
        let axes = self.to_array();
        Self::from_array(std::array::from_fn(|i| axes[i].max(thread_group_size[i].max(1))))
    }

    /// Thread groups needed to cover the grid
    pub fn thread_groups(self, thread_group_size: [u32; 3]) -> [u32; 3] {
        let axes = self.to_array();
        std::array::from_fn(|i| axes[i].div_ceil(thread_group_size[i].max(1)))
    }

    /// Whether any axis is zero
    pub const fn is_empty(self) -> bool {
        self.x == 0 || self.y == 0 || self.z == 0
    }

    /// Total cell count
    pub const fn cell_count(self) -> u64 {
        self.x as u64 * self.y as u64 * self.z as u64
    }

    /// Kernel resolution vector (x, y, z, 1 / z)
    pub fn as_vec4(self) -> [f32; 4] {
        let z = self.z.max(1) as f32;
        [self.x as f32, self.y as f32, self.z as f32, 1.0 / z]
    }
}

fn snap_axis(value: u32, group: u32, policy: SnapPolicy) -> u32 {
    let group = group.max(1);
    match policy {
        SnapPolicy::Down => value / group * group,
        SnapPolicy::Nearest => value.saturating_add(group / 2) / group * group,
        SnapPolicy::Up => value.div_ceil(group).saturating_mul(group),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const GROUP: [u32; 3] = [8, 8, 8];

    #[test]
    fn test_snap_down_below_one_group_is_zero() {
        let snapped = GridResolution::new(7, 5, 9).snap(GROUP, SnapPolicy::Down);
        assert_eq!(snapped, GridResolution::new(0, 0, 8));
        assert!(snapped.is_empty());
        assert_eq!(snapped.clamped_to_groups(GROUP), GridResolution::new(8, 8, 8));
    }

    #[test]
    fn test_snap_nearest_and_up() {
        let request = GridResolution::new(7, 5, 9);
        assert_eq!(request.snap(GROUP, SnapPolicy::Nearest), GridResolution::new(8, 8, 8));
        assert_eq!(request.snap(GROUP, SnapPolicy::Up), GridResolution::new(8, 8, 16));
        assert_eq!(GridResolution::new(3, 4, 12).snap(GROUP, SnapPolicy::Nearest), GridResolution::new(0, 8, 16));
    }

    #[test]
    fn test_multiples_are_unchanged() {
        let request = GridResolution::new(160, 88, 128);
        for policy in [SnapPolicy::Down, SnapPolicy::Nearest, SnapPolicy::Up] {
            assert_eq!(request.snap(GROUP, policy), request);
        }
    }

    #[test]
    fn test_thread_groups_and_vector() {
        let resolution = GridResolution::new(160, 88, 128);
        assert_eq!(resolution.thread_groups(GROUP), [20, 11, 16]);
        assert_eq!(resolution.cell_count(), 160 * 88 * 128);
        let vector = resolution.as_vec4();
        assert_relative_eq!(vector[3], 1.0 / 128.0);
    }
}
