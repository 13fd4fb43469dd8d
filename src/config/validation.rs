//! Configuration validation.
//!
//! Serde handles syntax; this module checks values. All problems are
//! collected so a bad file is reported in one pass.

use std::fmt;

use crate::config::schema::GatewayConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.port == 0 {
        errors.push(ValidationError::new("server.port", "must be non-zero"));
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::new("server.request_timeout_secs", "must be non-zero"));
    }

    let service = &config.service;
    if service.name.trim().is_empty() {
        errors.push(ValidationError::new("service.name", "must not be empty"));
    }
    if service.image.trim().is_empty() {
        errors.push(ValidationError::new("service.image", "must not be empty"));
    }
    if service.ssh_port == 0 {
        errors.push(ValidationError::new("service.ssh_port", "must be non-zero"));
    }
    if service.http_port == 0 {
        errors.push(ValidationError::new("service.http_port", "must be non-zero"));
    }
    if service.ssh_port != 0 && service.ssh_port == service.http_port {
        errors.push(ValidationError::new(
            "service.http_port",
            format!("collides with service.ssh_port ({})", service.ssh_port),
        ));
    }

    let timeouts = [
        ("service.timeouts.probe_secs", service.timeouts.probe_secs),
        ("service.timeouts.select_secs", service.timeouts.select_secs),
        ("service.timeouts.status_secs", service.timeouts.status_secs),
        ("service.timeouts.start_secs", service.timeouts.start_secs),
        ("service.timeouts.stop_secs", service.timeouts.stop_secs),
        ("service.timeouts.pull_secs", service.timeouts.pull_secs),
        ("service.progress.interval_secs", service.progress.interval_secs),
    ];
    for (field, value) in timeouts {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be non-zero"));
        }
    }

    if config.session.cookie_name.trim().is_empty() {
        errors.push(ValidationError::new("session.cookie_name", "must not be empty"));
    }
    if config.session.ttl_secs == 0 {
        errors.push(ValidationError::new("session.ttl_secs", "must be non-zero"));
    }
    if config.session.max_sessions == 0 {
        errors.push(ValidationError::new("session.max_sessions", "must be non-zero"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
