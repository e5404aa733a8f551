//! Opaque types and enumeration constants of the legacy OpenCV C API.
//!
//! Everything here is generated by the build script from
//! `wrapper/opencv_legacy.h`: structures become zero-sized `#[repr(C)]`
//! handles that can only be used behind a pointer, constants keep their
//! native values under a `Cv` prefix.

#![no_std]

/// The native description the surface was generated from.
pub const NATIVE_DESCRIPTION: &str = include_str!("../wrapper/opencv_legacy.h");

pub mod surface {
    include!(concat!(env!("OUT_DIR"), "/surface.rs"));
}

pub use surface::*;
