//! Compilation of registered services into one HAProxy configuration.
//!
//! [`compile`] is the single entry point: it orders the services, resolves
//! every setting into a fresh [`ConfigData`], runs the
//! [`route`] compiler to fill the three routing blocks, and hands the
//! result to the [`composer`] for placeholder substitution. The whole pass
//! is synchronous and a pure function of its inputs, so identical inputs
//! always produce byte-identical output.

pub mod composer;
pub mod route;

use std::cmp::Ordering;

use crate::certs;
use crate::error::SwitchyardError;
use crate::fragments::Fragments;
use crate::service::model::Service;
use crate::service::registry::ServiceRegistry;
use crate::settings::SettingsSource;
use crate::template::{Fields, Placeholder};

/// Settings keys and their defaults.
pub mod keys {
    pub const CONNECTION_MODE: (&str, &str) = ("CONNECTION_MODE", "http-server-close");
    pub const TIMEOUT_CONNECT: (&str, &str) = ("TIMEOUT_CONNECT", "5");
    pub const TIMEOUT_CLIENT: (&str, &str) = ("TIMEOUT_CLIENT", "20");
    pub const TIMEOUT_SERVER: (&str, &str) = ("TIMEOUT_SERVER", "20");
    pub const TIMEOUT_QUEUE: (&str, &str) = ("TIMEOUT_QUEUE", "30");
    pub const TIMEOUT_TUNNEL: (&str, &str) = ("TIMEOUT_TUNNEL", "3600");
    pub const TIMEOUT_HTTP_REQUEST: (&str, &str) = ("TIMEOUT_HTTP_REQUEST", "5");
    pub const TIMEOUT_HTTP_KEEP_ALIVE: (&str, &str) = ("TIMEOUT_HTTP_KEEP_ALIVE", "15");
    pub const STATS_USER: (&str, &str) = ("STATS_USER", "admin");
    pub const STATS_PASS: (&str, &str) = ("STATS_PASS", "admin");
    pub const USERS: (&str, &str) = ("USERS", "");
    pub const DEBUG: (&str, &str) = ("DEBUG", "");
    pub const DEFAULT_PORTS: (&str, &str) = ("DEFAULT_PORTS", "80,443:ssl");
    pub const EXTRA_FRONTEND: (&str, &str) = ("EXTRA_FRONTEND", "");
    pub const EXTRA_GLOBAL: (&str, &str) = ("EXTRA_GLOBAL", "");
    pub const BIND_PORTS: (&str, &str) = ("BIND_PORTS", "");
}

const SSL_MARKER: &str = ":ssl";

/// Every value the fragments can reference, built fresh per compilation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigData {
    pub certs_string: String,
    pub connection_mode: String,
    pub timeout_connect: String,
    pub timeout_client: String,
    pub timeout_server: String,
    pub timeout_queue: String,
    pub timeout_tunnel: String,
    pub timeout_http_request: String,
    pub timeout_http_keep_alive: String,
    pub stats_user: String,
    pub stats_pass: String,
    pub user_list: String,
    pub extra_global: String,
    pub extra_defaults: String,
    pub default_binds: String,
    pub extra_frontend: String,
    pub content_frontend: String,
    pub content_frontend_tcp: String,
    pub content_frontend_sni: String,
}

impl Fields for ConfigData {
    fn field(&self, placeholder: Placeholder) -> &str {
        match placeholder {
            Placeholder::CertsString => &self.certs_string,
            Placeholder::ConnectionMode => &self.connection_mode,
            Placeholder::TimeoutConnect => &self.timeout_connect,
            Placeholder::TimeoutClient => &self.timeout_client,
            Placeholder::TimeoutServer => &self.timeout_server,
            Placeholder::TimeoutQueue => &self.timeout_queue,
            Placeholder::TimeoutTunnel => &self.timeout_tunnel,
            Placeholder::TimeoutHttpRequest => &self.timeout_http_request,
            Placeholder::TimeoutHttpKeepAlive => &self.timeout_http_keep_alive,
            Placeholder::StatsUser => &self.stats_user,
            Placeholder::StatsPass => &self.stats_pass,
            Placeholder::UserList => &self.user_list,
            Placeholder::ExtraGlobal => &self.extra_global,
            Placeholder::ExtraDefaults => &self.extra_defaults,
            Placeholder::DefaultBinds => &self.default_binds,
            Placeholder::ExtraFrontend => &self.extra_frontend,
            Placeholder::ContentFrontend => &self.content_frontend,
            Placeholder::ContentFrontendTcp => &self.content_frontend_tcp,
            Placeholder::ContentFrontendSni => &self.content_frontend_sni,
        }
    }
}

impl ConfigData {
    /// Resolve every setting and the certificate bind string.
    ///
    /// The three routing blocks are left empty.
    pub fn from_settings(
        settings: &dyn SettingsSource,
        certificates: &[String],
    ) -> Result<Self, SwitchyardError> {
        let get = |(key, default): (&str, &str)| settings.resolve(key, default);

        let mut data = Self {
            certs_string: certs::bind_string(certificates),
            connection_mode: get(keys::CONNECTION_MODE),
            timeout_connect: get(keys::TIMEOUT_CONNECT),
            timeout_client: get(keys::TIMEOUT_CLIENT),
            timeout_server: get(keys::TIMEOUT_SERVER),
            timeout_queue: get(keys::TIMEOUT_QUEUE),
            timeout_tunnel: get(keys::TIMEOUT_TUNNEL),
            timeout_http_request: get(keys::TIMEOUT_HTTP_REQUEST),
            timeout_http_keep_alive: get(keys::TIMEOUT_HTTP_KEEP_ALIVE),
            stats_user: get(keys::STATS_USER),
            stats_pass: get(keys::STATS_PASS),
            ..Self::default()
        };

        data.user_list = user_list(&get(keys::USERS))?;

        if get(keys::DEBUG).eq_ignore_ascii_case("true") {
            data.extra_global.push_str("\n    debug");
        } else {
            data.extra_defaults
                .push_str("\n    option  dontlognull\n    option  dontlog-normal");
        }

        for port in split_list(&get(keys::DEFAULT_PORTS)) {
            let port = port.replace(SSL_MARKER, &data.certs_string);
            data.default_binds.push_str(&format!("\n    bind *:{port}"));
        }

        data.extra_frontend = get(keys::EXTRA_FRONTEND);
        let extra_global = get(keys::EXTRA_GLOBAL);
        if !extra_global.is_empty() {
            data.extra_global.push_str(&format!("\n    {extra_global}"));
        }
        for port in split_list(&get(keys::BIND_PORTS)) {
            data.extra_frontend.push_str(&format!("\n    bind *:{port}"));
        }

        Ok(data)
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

/// Render `user:pass,user:pass` as a `userlist defaultUsers` section.
fn user_list(raw: &str) -> Result<String, SwitchyardError> {
    let mut out = String::new();
    for entry in split_list(raw) {
        let Some((user, pass)) = entry.split_once(':') else {
            return Err(SwitchyardError::InvalidSetting {
                key: keys::USERS.0.to_string(),
                message: format!("'{entry}' is not in user:password form"),
            });
        };
        if out.is_empty() {
            out.push_str("\nuserlist defaultUsers\n");
        }
        out.push_str(&format!("    user {user} insecure-password {pass}\n"));
    }
    Ok(out)
}

/// Total order applied to services before any routing text is generated.
///
/// `/.well-known` services come first and services owning the root path
/// come last, so catch-all ACLs never shadow specific ones. Ties break on
/// the ACL name, then the service name.
#[must_use]
pub fn routing_order(a: &Service, b: &Service) -> Ordering {
    let well_known = |s: &Service| s.has_path(|p| p.starts_with("/.well-known"));
    let root = |s: &Service| s.has_path(|p| p == "/");

    well_known(b)
        .cmp(&well_known(a))
        .then_with(|| root(a).cmp(&root(b)))
        .then_with(|| a.effective_acl_name().cmp(b.effective_acl_name()))
        .then_with(|| a.service_name.cmp(&b.service_name))
}

/// Compile `services` into the final configuration document.
pub fn compile<'a>(
    services: impl IntoIterator<Item = &'a Service>,
    settings: &dyn SettingsSource,
    certificates: &[String],
    fragments: &Fragments,
) -> Result<String, SwitchyardError> {
    let mut ordered: Vec<&Service> = services.into_iter().collect();
    ordered.sort_by(|a, b| routing_order(a, b));

    let mut data = ConfigData::from_settings(settings, certificates)?;
    let routes = route::compile_routes(ordered.iter().copied())?;
    data.content_frontend = routes.http;
    data.content_frontend_tcp = routes.tcp;
    data.content_frontend_sni = routes.sni;

    let document = composer::compose(fragments, &data)?;

    tracing::debug!(
        services = ordered.len(),
        certificates = certificates.len(),
        bytes = document.len(),
        "configuration compiled"
    );
    Ok(document)
}

/// Compile a consistent snapshot of `registry`.
pub fn compile_registry(
    registry: &ServiceRegistry,
    settings: &dyn SettingsSource,
    certificates: &[String],
    fragments: &Fragments,
) -> Result<String, SwitchyardError> {
    let snapshot = registry.snapshot();
    compile(
        snapshot.values().map(|s| &**s),
        settings,
        certificates,
        fragments,
    )
}
