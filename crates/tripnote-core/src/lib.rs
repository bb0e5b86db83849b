//! Core library for the tripnote client: authentication, trip and note data, form validation.

pub mod auth;
pub mod config;
pub mod forms;
pub mod i18n;
pub mod rest;
pub mod services;
