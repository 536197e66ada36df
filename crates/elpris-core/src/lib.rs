//! Hardware-independent core library for elpris
//!
//! This crate contains all platform-agnostic logic for the elpris spot price
//! display: calendar-day handling, the three-day price window with its
//! reconciliation and flash codec, the remote price source adapter, the chart
//! layout engine, and the greyscale framebuffer the render plan is drawn into.
//!
//! It is `no_std` with `extern crate alloc` so it compiles on both embedded
//! targets and desktop hosts (for the simulator and tests). Hardware is only
//! reached through the [`storage::KeyValueStore`], [`source::HttpClient`] and
//! [`time::Clock`] traits and any `embedded-graphics` draw target.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod chart;
pub mod config;
pub mod cycle;
pub mod framebuffer;
pub mod prices;
pub mod source;
pub mod storage;
pub mod time;
