//! Synthetic infrared emission spectra of isothermal gas slabs.
//!
//! Line lists and partition functions are pulled through the traits in
//! [`providers`], the spectrum is assembled by [`modules::slab`] and written
//! out by [`modules::serialization`].

pub mod common;
pub mod domain;
pub mod modules;
pub mod numerics;
pub mod providers;
