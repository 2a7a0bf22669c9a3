//! Services file validation with detailed error reporting.
//!
//! The [`validate`] function checks a list of [`Service`] records for
//! problems that would make the generated HAProxy configuration unusable:
//! missing or duplicate names, identifiers HAProxy cannot parse, services
//! without destinations, and TCP/SNI destinations without a listener port.
//! Returns a list of [`ValidationError`] values with per-field suggestions.
//!
//! Validation runs when a services file is loaded. Registry upserts are
//! total and never validate.

use std::collections::HashSet;

use super::model::{ReqMode, Service};
use crate::error::ValidationError;

/// Validate a name used inside HAProxy ACL and backend identifiers.
pub fn validate_identifier(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("name cannot be empty".into());
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':')))
    {
        return Err(format!(
            "'{name}' contains '{bad}' (allowed: letters, digits, '-', '_', '.', ':')"
        ));
    }
    Ok(())
}

fn sanitized(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':') {
                c
            } else {
                '-'
            }
        })
        .collect()
}

pub fn validate(services: &[Service]) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut seen_names = HashSet::new();

    for (i, service) in services.iter().enumerate() {
        let service_id = if service.service_name.is_empty() {
            format!("services[{i}]")
        } else {
            service.service_name.clone()
        };

        if let Err(msg) = validate_identifier(&service.service_name) {
            errors.push(ValidationError {
                service: service_id.clone(),
                field: "service_name".into(),
                message: msg,
                suggestion: if service.service_name.is_empty() {
                    None
                } else {
                    Some(format!(
                        "did you mean '{}'?",
                        sanitized(&service.service_name)
                    ))
                },
            });
        } else if !seen_names.insert(service.service_name.as_str()) {
            errors.push(ValidationError {
                service: service_id.clone(),
                field: "service_name".into(),
                message: "duplicate service name".into(),
                suggestion: None,
            });
        }

        if !service.acl_name.is_empty() {
            if let Err(msg) = validate_identifier(&service.acl_name) {
                errors.push(ValidationError {
                    service: service_id.clone(),
                    field: "acl_name".into(),
                    message: msg,
                    suggestion: Some(format!("did you mean '{}'?", sanitized(&service.acl_name))),
                });
            }
        }

        if service.service_dest.is_empty() {
            errors.push(ValidationError {
                service: service_id.clone(),
                field: "service_dest".into(),
                message: "at least one destination must be defined".into(),
                suggestion: None,
            });
        }

        let mode = service.mode();

        if mode != ReqMode::Http {
            for (j, dest) in service.service_dest.iter().enumerate() {
                if dest.src_port == 0 {
                    errors.push(ValidationError {
                        service: service_id.clone(),
                        field: format!("service_dest[{j}].src_port"),
                        message: format!("{mode} services need a listener port"),
                        suggestion: Some("set src_port to the port clients connect to".into()),
                    });
                }
            }
        }

        if service.https_port > 0 && mode != ReqMode::Http {
            errors.push(ValidationError {
                service: service_id.clone(),
                field: "https_port".into(),
                message: format!("https_port only applies to http services, not {mode}"),
                suggestion: None,
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
