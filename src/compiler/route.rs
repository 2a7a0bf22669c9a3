//! Per-service routing fragments for the three request modes.
//!
//! - HTTP services become path ACLs plus `use_backend` rules inside the
//!   shared HTTP frontend, optionally gated on a host ACL, the source
//!   port, and an HTTPS redirect.
//! - TCP services get one self-contained `frontend` per destination.
//! - SNI services share one `frontend service_<port>` per listener port;
//!   contributions are buffered per port in service order, then emitted in
//!   ascending port order.

use std::collections::BTreeMap;
use std::fmt::{self, Write};

use crate::service::model::{normalize, ReqMode, Service};

/// The three routing blocks produced by one compilation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteOutput {
    pub http: String,
    pub tcp: String,
    pub sni: String,
}

/// Emit routing text for `services`, which must already be in routing order.
pub fn compile_routes<'a>(
    services: impl IntoIterator<Item = &'a Service>,
) -> Result<RouteOutput, fmt::Error> {
    let mut output = RouteOutput::default();
    let mut sni_ports: BTreeMap<u16, String> = BTreeMap::new();

    for service in services {
        let service = normalize(service);
        match service.mode() {
            ReqMode::Http => write_http(&mut output.http, &service)?,
            ReqMode::Tcp => write_tcp(&mut output.tcp, &service)?,
            ReqMode::Sni => write_sni(&mut sni_ports, &service)?,
        }
    }

    for block in sni_ports.into_values() {
        output.sni.push_str(&block);
    }
    Ok(output)
}

/// Host match function and comparison values for the domain ACL.
fn domain_match(service: &Service) -> Option<(&'static str, Vec<&str>)> {
    if service.service_domain.is_empty() {
        return None;
    }
    let domains = &service.service_domain;
    if service.service_domain_match_all {
        return Some(("hdr_dom", domains.iter().map(String::as_str).collect()));
    }
    if domains.iter().any(|d| d.starts_with('*')) {
        let stripped = domains
            .iter()
            .map(|d| {
                if d.starts_with('*') {
                    d.trim_matches('*')
                } else {
                    d.as_str()
                }
            })
            .collect();
        return Some(("hdr_end", stripped));
    }
    Some(("hdr", domains.iter().map(String::as_str).collect()))
}

fn write_patterns(out: &mut String, path_type: &str, patterns: &[String]) -> fmt::Result {
    for pattern in patterns {
        write!(out, " {path_type} {pattern}")?;
    }
    Ok(())
}

fn write_http(out: &mut String, s: &Service) -> fmt::Result {
    let acl = &s.acl_name;
    let name = &s.service_name;

    for dest in &s.service_dest {
        write!(out, "\n    acl url_{acl}{}", dest.port)?;
        write_patterns(out, &s.path_type, &dest.service_path)?;
        out.push_str(&dest.src_port_acl);
    }

    let mut condition = String::new();
    if let Some((func, domains)) = domain_match(s) {
        write!(out, "\n    acl domain_{acl} {func}(host) -i")?;
        for domain in domains {
            write!(out, " {domain}")?;
        }
        write!(condition, " domain_{acl}")?;
    }

    if s.https_port > 0 {
        write!(
            out,
            "\n    acl http_{name} src_port 80\n    acl https_{name} src_port 443"
        )?;
    }

    if s.redirect_when_http_proto {
        write!(out, "\n    acl is_{acl}_http hdr(X-Forwarded-Proto) http")?;
        for dest in &s.service_dest {
            write!(
                out,
                "\n    redirect scheme https if is_{acl}_http url_{acl}{}{condition}{}",
                dest.port, dest.src_port_acl_name
            )?;
        }
    } else if s.https_only {
        for dest in &s.service_dest {
            write!(
                out,
                "\n    redirect scheme https if !{{ ssl_fc }} url_{acl}{}{condition}{}",
                dest.port, dest.src_port_acl_name
            )?;
        }
    }

    for dest in &s.service_dest {
        let port = dest.port;
        if s.https_port > 0 {
            write!(
                out,
                "\n    use_backend {name}-be{port} if url_{acl}{port}{condition}{} http_{name}",
                dest.src_port_acl_name
            )?;
            write!(
                out,
                "\n    use_backend https-{name}-be{port} if url_{acl}{port}{condition} https_{name}"
            )?;
        } else {
            write!(
                out,
                "\n    use_backend {name}-be{port} if url_{acl}{port}{condition}{}",
                dest.src_port_acl_name
            )?;
        }
    }
    Ok(())
}

fn write_tcp(out: &mut String, s: &Service) -> fmt::Result {
    let name = &s.service_name;
    for dest in &s.service_dest {
        let src_port = dest.src_port;
        write!(
            out,
            "\n\nfrontend {name}_{src_port}\n    bind *:{src_port}\n    mode tcp\n    default_backend {name}-be{src_port}"
        )?;
    }
    Ok(())
}

fn write_sni(ports: &mut BTreeMap<u16, String>, s: &Service) -> fmt::Result {
    let acl = &s.acl_name;
    let name = &s.service_name;

    for dest in &s.service_dest {
        let src_port = dest.src_port;
        let first = !ports.contains_key(&src_port);
        let out = ports.entry(src_port).or_default();
        if first {
            write!(
                out,
                "\n\nfrontend service_{src_port}\n    bind *:{src_port}\n    mode tcp\n    tcp-request inspect-delay 5s\n    tcp-request content accept if {{ req_ssl_hello_type 1 }}"
            )?;
        }
        write!(out, "\n    acl sni_{acl}{}", dest.port)?;
        write_patterns(out, &s.path_type, &dest.service_path)?;
        out.push_str(&dest.src_port_acl);
        write!(
            out,
            "\n    use_backend {name}-be{} if sni_{acl}{}{}",
            dest.port, dest.port, dest.src_port_acl_name
        )?;
    }
    Ok(())
}
