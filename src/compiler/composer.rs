//! Merges the skeleton, frontend and backend fragments into one document.

use crate::fragments::{Fragment, Fragments};
use crate::template::{Fields, TemplateError, TemplateSet};

const SEPARATOR: &str = "\n\n";

/// Appended when no frontend or backend fragment exists, so the document
/// still parses with zero routes.
pub const DUMMY_BACKEND: &str = "    acl url_dummy path_beg /dummy
    use_backend dummy-be if url_dummy

backend dummy-be
    server dummy 1.1.1.1:1111 check";

const DUMMY_NAME: &str = "dummy-be";

fn sorted_by_name(fragments: &[Fragment]) -> Vec<&Fragment> {
    let mut sorted: Vec<&Fragment> = fragments.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));
    sorted
}

/// Join the fragments and substitute every placeholder from `fields`.
///
/// All fragments are parsed before any text is rendered, so a bad
/// placeholder anywhere yields an error and no document.
pub fn compose(fragments: &Fragments, fields: &dyn Fields) -> Result<String, TemplateError> {
    let dummy = fragments
        .is_skeleton_only()
        .then(|| Fragment::new(DUMMY_NAME, DUMMY_BACKEND));

    let mut templates = TemplateSet::new()?;
    let ordered = std::iter::once(&fragments.skeleton)
        .chain(sorted_by_name(&fragments.frontends))
        .chain(sorted_by_name(&fragments.backends))
        .chain(dummy.as_ref());
    for fragment in ordered {
        templates.add(&fragment.name, &fragment.content)?;
    }

    templates.render(fields, SEPARATOR)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::compiler::ConfigData;

    fn data() -> ConfigData {
        ConfigData {
            stats_user: "admin".into(),
            content_frontend: "\n    acl url_a80 path_beg /a".into(),
            ..ConfigData::default()
        }
    }

    #[test]
    fn skeleton_only_gets_dummy_backend() {
        let fragments = Fragments::skeleton_only("frontend services{{.ContentFrontend}}");
        let out = compose(&fragments, &data()).unwrap();
        assert_eq!(
            out,
            format!("frontend services\n    acl url_a80 path_beg /a\n\n{DUMMY_BACKEND}")
        );
    }

    #[test]
    fn fragments_sorted_by_name_regardless_of_input_order() {
        let fragments = Fragments {
            skeleton: Fragment::new("haproxy.tmpl", "global"),
            frontends: vec![
                Fragment::new("b-fe.cfg", "fe-b"),
                Fragment::new("a-fe.cfg", "fe-a {{.StatsUser}}"),
            ],
            backends: vec![
                Fragment::new("z-be.cfg", "be-z"),
                Fragment::new("m-be.cfg", "be-m"),
            ],
        };
        let out = compose(&fragments, &data()).unwrap();
        assert_eq!(out, "global\n\nfe-a admin\n\nfe-b\n\nbe-m\n\nbe-z");
        assert!(!out.contains("dummy"));
    }

    #[test]
    fn backend_only_suppresses_dummy() {
        let fragments = Fragments {
            skeleton: Fragment::new("haproxy.tmpl", "global"),
            frontends: vec![],
            backends: vec![Fragment::new("api-be.cfg", "backend api-be8080")],
        };
        let out = compose(&fragments, &data()).unwrap();
        assert_eq!(out, "global\n\nbackend api-be8080");
    }

    #[test]
    fn unknown_placeholder_in_any_fragment_fails() {
        let fragments = Fragments {
            skeleton: Fragment::new("haproxy.tmpl", "global"),
            frontends: vec![],
            backends: vec![Fragment::new("bad-be.cfg", "backend x\n    {{.Nope}}")],
        };
        let err = compose(&fragments, &data()).unwrap_err();
        assert_eq!(err.to_string(), "bad-be.cfg:2: unknown placeholder 'Nope'");
    }
}
