//! `switchyard init` - write a starter `haproxy.tmpl` skeleton.
//!
//! The skeleton references every placeholder the compiler fills, so it
//! doubles as documentation of what a template can use.

use crate::cli::InitArgs;
use crate::error::SwitchyardError;
use crate::fragments::SKELETON_FILE;

pub fn execute(args: &InitArgs) -> Result<(), SwitchyardError> {
    let output = args.templates.join(SKELETON_FILE);

    if output.exists() && !args.force {
        return Err(SwitchyardError::FileExists { path: output });
    }

    std::fs::create_dir_all(&args.templates)?;
    std::fs::write(&output, STARTER_SKELETON)?;
    println!("Created {}", output.display());
    Ok(())
}

/// TCP and SNI frontends come before `frontend services` so that any
/// `*-fe.cfg` rules appended after the skeleton land in the HTTP frontend.
pub const STARTER_SKELETON: &str = "global
    pidfile /var/run/haproxy.pid
    tune.ssl.default-dh-param 2048{{.ExtraGlobal}}

defaults
    mode    http
    balance roundrobin

    option  {{.ConnectionMode}}
    option  forwardfor{{.ExtraDefaults}}

    timeout connect {{.TimeoutConnect}}s
    timeout client  {{.TimeoutClient}}s
    timeout server  {{.TimeoutServer}}s
    timeout queue   {{.TimeoutQueue}}s
    timeout tunnel  {{.TimeoutTunnel}}s
    timeout http-request {{.TimeoutHttpRequest}}s
    timeout http-keep-alive {{.TimeoutHttpKeepAlive}}s

    stats enable
    stats refresh 30s
    stats realm Strictly\\ Private
    stats auth {{.StatsUser}}:{{.StatsPass}}
    stats uri /admin?stats
{{.UserList}}{{.ContentFrontendTcp}}{{.ContentFrontendSNI}}

frontend services{{.DefaultBinds}}
    mode http{{.ExtraFrontend}}{{.ContentFrontend}}";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{Placeholder, TemplateSet};

    #[test]
    fn skeleton_uses_every_placeholder_but_certs() {
        let mut templates = TemplateSet::new().unwrap();
        templates.add(SKELETON_FILE, STARTER_SKELETON).unwrap();
        let used = templates.placeholders(SKELETON_FILE).unwrap();
        for placeholder in Placeholder::ALL {
            if placeholder == Placeholder::CertsString {
                continue;
            }
            assert!(used.contains(&placeholder), "missing {}", placeholder.name());
        }
    }

    #[test]
    fn refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let args = InitArgs {
            templates: dir.path().to_path_buf(),
            force: false,
        };
        execute(&args).unwrap();
        assert!(matches!(
            execute(&args),
            Err(SwitchyardError::FileExists { .. })
        ));

        let forced = InitArgs {
            templates: dir.path().to_path_buf(),
            force: true,
        };
        execute(&forced).unwrap();
    }

    #[test]
    fn creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("cfg").join("tmpl");
        execute(&InitArgs {
            templates: nested.clone(),
            force: false,
        })
        .unwrap();
        assert!(nested.join(SKELETON_FILE).is_file());
    }
}
