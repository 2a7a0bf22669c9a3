//! Serde data structures for registered services.
//!
//! Contains [`ServicesFile`] (the root of a services file), [`Service`]
//! (one route definition), [`ServiceDest`] (one listener/backend pair
//! inside a service) and [`ReqMode`]. All types derive `Serialize` and
//! `Deserialize` with `deny_unknown_fields` for strict parsing.

use serde::{Deserialize, Serialize};

const DEFAULT_HTTP_PATH_TYPE: &str = "path_beg";
const DEFAULT_SNI_PATH_TYPE: &str = "req_ssl_sni -i";

fn is_false(v: &bool) -> bool {
    !*v
}

fn is_zero(v: &u16) -> bool {
    *v == 0
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServicesFile {
    #[serde(default)]
    pub services: Vec<Service>,
}

/// Routing mode of a service.
///
/// Anything that is neither `http` nor `sni` is routed as raw TCP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReqMode {
    Http,
    Tcp,
    Sni,
}

impl ReqMode {
    /// Case-insensitive parse. An empty mode means HTTP.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        if raw.is_empty() || raw.eq_ignore_ascii_case("http") {
            Self::Http
        } else if raw.eq_ignore_ascii_case("sni") {
            Self::Sni
        } else {
            Self::Tcp
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Tcp => "tcp",
            Self::Sni => "sni",
        }
    }

    #[must_use]
    pub const fn default_path_type(self) -> &'static str {
        match self {
            Self::Http => DEFAULT_HTTP_PATH_TYPE,
            Self::Sni => DEFAULT_SNI_PATH_TYPE,
            Self::Tcp => "",
        }
    }
}

impl std::fmt::Display for ReqMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Service {
    pub service_name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub acl_name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub req_mode: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path_type: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service_domain: Vec<String>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub service_domain_match_all: bool,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub https_port: u16,

    #[serde(default, skip_serializing_if = "is_false")]
    pub https_only: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub redirect_when_http_proto: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service_dest: Vec<ServiceDest>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceDest {
    pub port: u16,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub src_port: u16,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service_path: Vec<String>,

    /// Pre-rendered ACL suffix, injected verbatim after the path patterns.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub src_port_acl: String,

    /// Pre-rendered condition suffix, injected verbatim into rule guards.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub src_port_acl_name: String,
}

impl Service {
    #[must_use]
    pub fn mode(&self) -> ReqMode {
        ReqMode::parse(&self.req_mode)
    }

    /// The name used inside generated ACL identifiers.
    #[must_use]
    pub fn effective_acl_name(&self) -> &str {
        if self.acl_name.is_empty() {
            &self.service_name
        } else {
            &self.acl_name
        }
    }

    pub(crate) fn has_path(&self, predicate: impl Fn(&str) -> bool) -> bool {
        self.service_dest
            .iter()
            .flat_map(|d| d.service_path.iter())
            .any(|p| predicate(p))
    }
}

/// Fill in `acl_name`, `req_mode` and `path_type` defaults on a copy.
///
/// The registry's stored record is never touched; the compiler calls this
/// once per service per compilation.
#[must_use]
pub fn normalize(service: &Service) -> Service {
    let mode = service.mode();
    let mut normalized = service.clone();
    if normalized.acl_name.is_empty() {
        normalized.acl_name.clone_from(&service.service_name);
    }
    normalized.req_mode = mode.as_str().to_string();
    if normalized.path_type.is_empty() {
        normalized.path_type = mode.default_path_type().to_string();
    }
    normalized
}
