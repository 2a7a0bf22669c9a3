//! End-to-end compilation: services, settings, certificates and fragments
//! in, one HAProxy document out.

use std::collections::HashMap;

use pretty_assertions::assert_eq;
use switchyard::cmd::init::STARTER_SKELETON;
use switchyard::compiler::composer::DUMMY_BACKEND;
use switchyard::compiler::{compile, compile_registry};
use switchyard::error::SwitchyardError;
use switchyard::fragments::{Fragment, Fragments};
use switchyard::service::model::{Service, ServiceDest};
use switchyard::service::registry::ServiceRegistry;
use switchyard::settings::EnvSettings;

const ROUTES_ONLY: &str =
    "{{.ContentFrontend}}|{{.ContentFrontendTcp}}|{{.ContentFrontendSNI}}";

fn no_settings() -> HashMap<String, String> {
    HashMap::new()
}

fn http(name: &str, port: u16, path: &str) -> Service {
    Service {
        service_name: name.into(),
        service_dest: vec![ServiceDest {
            port,
            service_path: vec![path.into()],
            ..ServiceDest::default()
        }],
        ..Service::default()
    }
}

fn sni(name: &str, port: u16, src_port: u16, host: &str) -> Service {
    Service {
        req_mode: "sni".into(),
        service_dest: vec![ServiceDest {
            src_port,
            ..http(name, port, host).service_dest[0].clone()
        }],
        ..http(name, port, host)
    }
}

fn routes_only() -> Fragments {
    Fragments {
        skeleton: Fragment::new("haproxy.tmpl", ROUTES_ONLY),
        frontends: vec![],
        backends: vec![Fragment::new("all-be.cfg", "")],
    }
}

fn render(services: &[Service]) -> String {
    compile(services, &no_settings(), &[], &routes_only()).unwrap()
}

#[test]
fn output_is_independent_of_input_order() {
    let services = vec![
        http("root", 80, "/"),
        http("users", 8080, "/users"),
        http("acme", 80, "/.well-known/acme-challenge"),
        sni("vault", 8200, 443, "vault.example.com"),
        http("api", 8080, "/api"),
    ];
    let mut reversed = services.clone();
    reversed.reverse();

    let first = render(&services);
    assert_eq!(first, render(&reversed));
    assert_eq!(first, render(&services));
}

#[test]
fn well_known_first_and_root_last() {
    let out = render(&[
        http("root", 80, "/"),
        http("users", 8080, "/users"),
        http("acme", 80, "/.well-known/acme-challenge"),
        http("api", 8080, "/api"),
    ]);
    let position = |needle: &str| out.find(needle).unwrap();
    assert!(position("url_acme80") < position("url_api8080"));
    assert!(position("url_api8080") < position("url_users8080"));
    assert!(position("url_users8080") < position("url_root80"));
}

#[test]
fn zero_services_with_skeleton_only_gets_dummy_backend() {
    let fragments = Fragments::skeleton_only("frontend services{{.ContentFrontend}}");
    let out = compile(&[], &no_settings(), &[], &fragments).unwrap();
    assert_eq!(out, format!("frontend services\n\n{DUMMY_BACKEND}"));
}

#[test]
fn wildcard_domain_uses_suffix_match() {
    let service = Service {
        service_domain: vec!["*.example.com".into()],
        ..http("api", 8080, "/api")
    };
    assert_eq!(
        render(&[service]),
        "\n    acl url_api8080 path_beg /api\
         \n    acl domain_api hdr_end(host) -i .example.com\
         \n    use_backend api-be8080 if url_api8080 domain_api||"
    );
}

#[test]
fn sni_services_share_one_frontend_per_port() {
    let out = render(&[
        sni("b", 9000, 443, "b.example.com"),
        sni("c", 9100, 8443, "c.example.com"),
        sni("a", 9200, 443, "a.example.com"),
    ]);
    assert_eq!(out.matches("frontend service_443").count(), 1);
    assert_eq!(out.matches("frontend service_8443").count(), 1);
    assert!(out.find("frontend service_443").unwrap() < out.find("frontend service_8443").unwrap());
    assert!(out.find("sni_a9200").unwrap() < out.find("sni_b9000").unwrap());
}

#[test]
fn https_port_splits_backends_by_listener() {
    let service = Service {
        https_port: 8443,
        ..http("web", 80, "/")
    };
    let out = render(&[service]);
    assert!(out.contains("\n    acl http_web src_port 80\n    acl https_web src_port 443"));
    assert!(out.contains("\n    use_backend web-be80 if url_web80 http_web"));
    assert!(out.contains("\n    use_backend https-web-be80 if url_web80 https_web"));
}

#[test]
fn tcp_service_gets_own_frontend() {
    let service = Service {
        req_mode: "tcp".into(),
        service_dest: vec![ServiceDest {
            port: 5432,
            src_port: 5433,
            ..ServiceDest::default()
        }],
        ..http("db", 0, "")
    };
    assert_eq!(
        render(&[service]),
        "|\n\nfrontend db_5433\n    bind *:5433\n    mode tcp\n    default_backend db-be5433|"
    );
}

#[test]
fn certificates_are_attached_to_ssl_ports() {
    let fragments = Fragments::skeleton_only("frontend services{{.DefaultBinds}}");
    let certs = vec!["/certs/a.pem".to_string(), "/certs/b.pem".to_string()];
    let out = compile(&[], &no_settings(), &certs, &fragments).unwrap();
    assert!(out.starts_with(
        "frontend services\n    bind *:80\n    bind *:443 ssl crt /certs/a.pem crt /certs/b.pem"
    ));
}

#[test]
fn removed_service_disappears_from_next_compilation() {
    let registry = ServiceRegistry::new();
    registry.upsert(http("api", 8080, "/api"));
    registry.upsert(http("users", 8080, "/users"));

    let before = compile_registry(&registry, &no_settings(), &[], &routes_only()).unwrap();
    assert!(before.contains("users-be8080"));

    registry.remove("users");
    let after = compile_registry(&registry, &no_settings(), &[], &routes_only()).unwrap();
    assert!(!after.contains("users"));
    assert!(after.contains("api-be8080"));
}

#[test]
fn unknown_placeholder_yields_no_document() {
    let fragments = Fragments::skeleton_only("global\n    {{.NotAThing}}");
    let err = compile(&[http("api", 8080, "/api")], &no_settings(), &[], &fragments).unwrap_err();
    assert!(matches!(err, SwitchyardError::Template(_)));
    assert!(err.to_string().contains("NotAThing"));
}

#[test]
fn malformed_users_setting_is_rejected() {
    let settings = HashMap::from([("USERS".to_string(), "nopassword".to_string())]);
    let err = compile(&[], &settings, &[], &routes_only()).unwrap_err();
    assert!(matches!(err, SwitchyardError::InvalidSetting { .. }));
}

#[test]
fn starter_skeleton_renders_complete_config() {
    let settings = HashMap::from([
        ("STATS_USER".to_string(), "ops".to_string()),
        ("USERS".to_string(), "alice:secret".to_string()),
    ]);
    let services = [
        http("api", 8080, "/api"),
        Service {
            req_mode: "tcp".into(),
            service_dest: vec![ServiceDest {
                port: 6379,
                src_port: 6379,
                ..ServiceDest::default()
            }],
            ..http("redis", 0, "")
        },
        sni("vault", 8200, 443, "vault.example.com"),
    ];
    let fragments = Fragments::skeleton_only(STARTER_SKELETON);

    let out = compile(&services, &settings, &[], &fragments).unwrap();

    assert!(!out.contains("{{"));
    assert!(out.contains("    option  http-server-close\n"));
    assert!(out.contains("    option  dontlognull\n    option  dontlog-normal\n"));
    assert!(out.contains("    timeout connect 5s\n"));
    assert!(out.contains("    stats auth ops:admin\n"));
    assert!(out.contains(
        "\nuserlist defaultUsers\n    user alice insecure-password secret\n"
    ));
    assert!(out.contains("\n\nfrontend redis_6379\n    bind *:6379\n    mode tcp"));
    assert!(out.contains("\n\nfrontend service_443\n    bind *:443\n    mode tcp"));
    assert!(out.contains(
        "frontend services\n    bind *:80\n    bind *:443\n    mode http\
         \n    acl url_api8080 path_beg /api\n    use_backend api-be8080 if url_api8080"
    ));
    assert!(out.ends_with(DUMMY_BACKEND));
}

#[test]
fn secret_files_lose_every_trailing_newline() {
    let secrets = tempfile::tempdir().unwrap();
    std::fs::write(secrets.path().join("dfp_stats_pass"), "secret\n\n").unwrap();
    std::fs::write(secrets.path().join("dfp_stats_user"), "ops\r\n").unwrap();
    let settings = EnvSettings::new(secrets.path());

    let out = compile(&[], &settings, &[], &Fragments::skeleton_only(STARTER_SKELETON)).unwrap();

    assert!(out.contains("    stats auth ops:secret\n    stats uri /admin?stats\n"));
}
