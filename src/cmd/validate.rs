//! `switchyard validate` - check a services file and show how it routes.
//!
//! The file goes through the same [`FileSource`] pipeline `render` uses, so
//! a file that passes here is exactly what `render` compiles. The report
//! lists services in routing order with their effective ACL names and the
//! listener each destination is reached through.

use serde::Serialize;

use crate::cli::{ValidateArgs, ValidateFormat};
use crate::compiler::routing_order;
use crate::error::SwitchyardError;
use crate::service::model::{ReqMode, Service, ServiceDest};
use crate::service::sources::FileSource;
use crate::service::ServiceSource;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModeCounts {
    pub http: usize,
    pub tcp: usize,
    pub sni: usize,
}

impl ModeCounts {
    #[must_use]
    pub fn tally(services: &[Service]) -> Self {
        let mut counts = Self::default();
        for service in services {
            match service.mode() {
                ReqMode::Http => counts.http += 1,
                ReqMode::Tcp => counts.tcp += 1,
                ReqMode::Sni => counts.sni += 1,
            }
        }
        counts
    }
}

#[derive(Debug, Serialize)]
struct RouteSummary<'a> {
    service: &'a str,
    acl: &'a str,
    mode: &'static str,
    #[serde(skip_serializing_if = "no_domains")]
    domains: &'a [String],
    listeners: Vec<String>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn no_domains(domains: &&[String]) -> bool {
    domains.is_empty()
}

/// How traffic reaches one destination, e.g. `/api -> :8080`.
fn listener(mode: ReqMode, dest: &ServiceDest) -> String {
    let matches = dest.service_path.join(" ");
    match mode {
        ReqMode::Http if matches.is_empty() => format!("* -> :{}", dest.port),
        ReqMode::Http => format!("{matches} -> :{}", dest.port),
        ReqMode::Tcp => format!("*:{} -> :{}", dest.src_port, dest.port),
        ReqMode::Sni => format!("*:{} {matches} -> :{}", dest.src_port, dest.port),
    }
}

fn summaries(services: &[Service]) -> Vec<RouteSummary<'_>> {
    let mut ordered: Vec<&Service> = services.iter().collect();
    ordered.sort_by(|a, b| routing_order(a, b));
    ordered
        .into_iter()
        .map(|s| {
            let mode = s.mode();
            // SNI routes never match on host headers.
            let domains: &[String] = if mode == ReqMode::Sni {
                &[]
            } else {
                &s.service_domain
            };
            RouteSummary {
                service: &s.service_name,
                acl: s.effective_acl_name(),
                mode: mode.as_str(),
                domains,
                listeners: s.service_dest.iter().map(|d| listener(mode, d)).collect(),
            }
        })
        .collect()
}

fn destinations(services: &[Service]) -> usize {
    services.iter().map(|s| s.service_dest.len()).sum()
}

#[must_use]
pub fn text_report(origin: &str, services: &[Service]) -> String {
    let counts = ModeCounts::tally(services);
    let mut lines = vec![format!(
        "{origin} is valid: {} services ({} http, {} tcp, {} sni), {} destinations",
        services.len(),
        counts.http,
        counts.tcp,
        counts.sni,
        destinations(services)
    )];
    for summary in summaries(services) {
        lines.push(format!(
            "  {} ({}, acl {})",
            summary.service, summary.mode, summary.acl
        ));
        if !summary.domains.is_empty() {
            lines.push(format!("    {}", summary.domains.join(", ")));
        }
        for listener in &summary.listeners {
            lines.push(format!("    {listener}"));
        }
    }
    lines.join("\n")
}

#[must_use]
pub fn json_report(services: &[Service]) -> serde_json::Value {
    serde_json::json!({
        "valid": true,
        "services": services.len(),
        "destinations": destinations(services),
        "modes": ModeCounts::tally(services),
        "routes": summaries(services),
    })
}

pub async fn execute(args: &ValidateArgs) -> Result<(), SwitchyardError> {
    let source = FileSource::open(&args.services)?;

    let loaded = match source.load().await {
        Ok(loaded) => loaded,
        Err(SwitchyardError::ServiceValidation { errors }) => {
            match args.format {
                ValidateFormat::Text => {
                    eprintln!("\u{2717} {} has {} errors\n", source.origin(), errors.len());
                    for error in &errors {
                        eprintln!("{error}");
                    }
                }
                ValidateFormat::Json => {
                    println!(
                        "{}",
                        serde_json::json!({ "valid": false, "errors": errors })
                    );
                }
            }
            return Err(SwitchyardError::ServiceValidation { errors });
        }
        Err(e) => return Err(e),
    };

    match args.format {
        ValidateFormat::Text => {
            println!("\u{2713} {}", text_report(&source.origin(), &loaded.services));
        }
        ValidateFormat::Json => println!("{}", json_report(&loaded.services)),
    }
    Ok(())
}
