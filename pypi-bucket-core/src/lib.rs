#![doc = "pypi-bucket-core: core logic library for pypi-bucket."]

//! This crate contains the publishing pipeline for pypi-bucket: building Python
//! distributions, uploading them to an object-storage bucket and regenerating the
//! package's simple index page.
//! Storage clients live outside this crate; see [`contract::ObjectStore`].
//!
//! # Usage
//! Construct a [`config::PublishConfig`], a [`build::CommandBuilder`] and an
//! [`contract::ObjectStore`] implementation, then call [`publish::publish`].

pub mod build;
pub mod checksum;
pub mod config;
pub mod contract;
pub mod error;
pub mod index;
pub mod publish;
pub mod upload;
