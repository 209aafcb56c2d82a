#![no_std]
#![cfg_attr(docs_rs, feature(doc_cfg))]
#![forbid(unsafe_code)]

//! A PNG decoder written from scratch, including its own inflate.
//!
//! The whole crate is built around one operation: give [`png::decode`] the
//! bytes of a PNG file and get back the pixels as RGBA8, row-major, top row
//! first. Everything else (the chunk walker, the header parser, the zlib
//! inflater) is exposed too, mostly for tools that want to poke at files.
//!
//! Only 8-bit RGB and RGBA, non-interlaced images actually decode to pixels.
//! Palettes, interlacing, grayscale, and bit depths other than 8 are reported
//! as [`DecodeError::Unsupported`].

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(target_pointer_width = "16")]
compile_error!("this crate assumes 32-bit or bigger pointers!");

/// Logs through the `log` crate when the `log` feature is on.
macro_rules! trace {
  ($($arg:tt)*) => {
    #[cfg(feature = "log")]
    log::trace!($($arg)*);
  };
}

/// Logs through the `log` crate when the `log` feature is on.
macro_rules! debug {
  ($($arg:tt)*) => {
    #[cfg(feature = "log")]
    log::debug!($($arg)*);
  };
}

mod error;
pub use error::*;

mod cursor;
pub(crate) use cursor::*;

pub mod pixel_formats;
pub use pixel_formats::*;

#[cfg(feature = "alloc")]
mod image;
#[cfg(feature = "alloc")]
pub use image::*;

#[cfg(feature = "alloc")]
pub mod inflate;

pub mod png;
