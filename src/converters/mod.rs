//! Format converters
//!
//! This module contains converters from external notation formats into MSR.

pub mod musicxml;
