//! Plain-data host types
//!
//! These mirror the host's single-precision math types field for field, so
//! a raw slot can be read and written by copying bits.

use hostbind_sys as sys;

/// Host scalar for math types (single-precision build)
pub type Real = f32;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vector2 {
    pub x: Real,
    pub y: Real,
}

impl Vector2 {
    pub const fn new(x: Real, y: Real) -> Self {
        Self { x, y }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Vector2i {
    pub x: i32,
    pub y: i32,
}

impl Vector2i {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect2 {
    pub position: Vector2,
    pub size: Vector2,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rect2i {
    pub position: Vector2i,
    pub size: Vector2i,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vector3 {
    pub x: Real,
    pub y: Real,
    pub z: Real,
}

impl Vector3 {
    pub const fn new(x: Real, y: Real, z: Real) -> Self {
        Self { x, y, z }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Vector3i {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

/// 2D affine transform, stored as three columns
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Transform2D {
    pub x: Vector2,
    pub y: Vector2,
    pub origin: Vector2,
}

impl Transform2D {
    pub const IDENTITY: Self = Self {
        x: Vector2::new(1.0, 0.0),
        y: Vector2::new(0.0, 1.0),
        origin: Vector2::new(0.0, 0.0),
    };
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vector4 {
    pub x: Real,
    pub y: Real,
    pub z: Real,
    pub w: Real,
}

impl Vector4 {
    pub const fn new(x: Real, y: Real, z: Real, w: Real) -> Self {
        Self { x, y, z, w }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Vector4i {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub w: i32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Plane {
    pub normal: Vector3,
    pub d: Real,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub x: Real,
    pub y: Real,
    pub z: Real,
    pub w: Real,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 1.0,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Aabb {
    pub position: Vector3,
    pub size: Vector3,
}

/// 3x3 matrix, stored as rows
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Basis {
    pub rows: [Vector3; 3],
}

impl Basis {
    pub const IDENTITY: Self = Self {
        rows: [
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
        ],
    };
}

impl Default for Basis {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Transform3D {
    pub basis: Basis,
    pub origin: Vector3,
}

/// 4x4 matrix, stored as columns
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub columns: [Vector4; 4],
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            columns: [
                Vector4::new(1.0, 0.0, 0.0, 0.0),
                Vector4::new(0.0, 1.0, 0.0, 0.0),
                Vector4::new(0.0, 0.0, 1.0, 0.0),
                Vector4::new(0.0, 0.0, 0.0, 1.0),
            ],
        }
    }
}

/// RGBA color, always single precision
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

/// Host resource id
#[repr(transparent)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rid(pub u64);

/// Non-owning pointer to a host object
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectHandle(sys::GDExtensionObjectPtr);

// A handle is an address; the host owns the object and its synchronization.
unsafe impl Send for ObjectHandle {}
unsafe impl Sync for ObjectHandle {}

impl ObjectHandle {
    #[inline]
    pub const fn null() -> Self {
        Self(std::ptr::null_mut())
    }

    #[inline]
    pub fn from_sys(ptr: sys::GDExtensionObjectPtr) -> Self {
        Self(ptr)
    }

    #[inline]
    pub fn as_sys(self) -> sys::GDExtensionObjectPtr {
        self.0
    }

    #[inline]
    pub fn is_null(self) -> bool {
        self.0.is_null()
    }
}

impl Default for ObjectHandle {
    fn default() -> Self {
        Self::null()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostbind_sys::VariantType;
    use std::mem::size_of;

    #[test]
    fn test_sizes_match_host() {
        assert_eq!(size_of::<Vector2>(), VariantType::Vector2.type_ptr_size());
        assert_eq!(size_of::<Vector2i>(), VariantType::Vector2i.type_ptr_size());
        assert_eq!(size_of::<Rect2>(), VariantType::Rect2.type_ptr_size());
        assert_eq!(size_of::<Rect2i>(), VariantType::Rect2i.type_ptr_size());
        assert_eq!(size_of::<Vector3>(), VariantType::Vector3.type_ptr_size());
        assert_eq!(size_of::<Vector3i>(), VariantType::Vector3i.type_ptr_size());
        assert_eq!(size_of::<Transform2D>(), VariantType::Transform2D.type_ptr_size());
        assert_eq!(size_of::<Vector4>(), VariantType::Vector4.type_ptr_size());
        assert_eq!(size_of::<Vector4i>(), VariantType::Vector4i.type_ptr_size());
        assert_eq!(size_of::<Plane>(), VariantType::Plane.type_ptr_size());
        assert_eq!(size_of::<Quaternion>(), VariantType::Quaternion.type_ptr_size());
        assert_eq!(size_of::<Aabb>(), VariantType::Aabb.type_ptr_size());
        assert_eq!(size_of::<Basis>(), VariantType::Basis.type_ptr_size());
        assert_eq!(size_of::<Transform3D>(), VariantType::Transform3D.type_ptr_size());
        assert_eq!(size_of::<Projection>(), VariantType::Projection.type_ptr_size());
        assert_eq!(size_of::<Color>(), VariantType::Color.type_ptr_size());
        assert_eq!(size_of::<Rid>(), VariantType::Rid.type_ptr_size());
    }

    #[test]
    fn test_object_handle_null() {
        assert!(ObjectHandle::null().is_null());
        assert_eq!(ObjectHandle::default(), ObjectHandle::null());
    }
}
