//! Whole-engine schema tests: compile, serialize, reload, match and check

use std::collections::HashMap;

use trust::{compile_lvs, default_user_fns, Checker, LvsError, LvsModel};
use types::Name;

fn name(uri: &str) -> Name {
    Name::from_str(uri).unwrap()
}

fn checker(text: &str) -> Checker {
    Checker::new(compile_lvs(text).unwrap(), default_user_fns()).unwrap()
}

#[test]
fn test_anonymous_rules_report_generated_names() {
    let c = checker(r#"#_: "a"/"b""#);
    let results = c.match_name(&name("/a/b"));
    assert_eq!(results.len(), 1);
    assert!(results[0].0[0].starts_with("#_"));
}

#[test]
fn test_reloaded_model_matches_identically() {
    let text = r#"
    #KEY: "KEY"/_/_/_
    #site: "demo"
    #article: #site/"article"/author/post/_v & {_v: $eq_type("v=0")} <= #author
    #author: #site/"author"/author/"KEY"/_/admin/_ <= #admin
    #admin: #site/"admin"/admin/#KEY <= #root
    #root: #site/#KEY
    "#;
    let compiled = compile_lvs(text).unwrap();
    let reloaded = LvsModel::decode(&compiled.encode()).unwrap();
    let original = Checker::new(compiled, default_user_fns()).unwrap();
    let restored = Checker::new(reloaded, default_user_fns()).unwrap();

    for uri in [
        "/demo/article/xinyu/hello/v=1",
        "/demo/author/xinyu/KEY/k1/admin/c1",
        "/demo/admin/admin/KEY/k2",
        "/demo/KEY/a/b/c",
        "/elsewhere/article",
    ] {
        let n = name(uri);
        let mut lhs: Vec<Vec<String>> =
            original.match_name(&n).into_iter().map(|(r, _)| r).collect();
        let mut rhs: Vec<Vec<String>> =
            restored.match_name(&n).into_iter().map(|(r, _)| r).collect();
        lhs.sort();
        rhs.sort();
        assert_eq!(lhs, rhs, "mismatch on {uri}");
    }
    assert!(restored.check(
        &name("/demo/article/xinyu/hello/v=1"),
        &name("/demo/author/xinyu/KEY/k1/admin/c1"),
    ));
}

#[test]
fn test_cartesian_expansion_of_disjunctions() {
    // Two constraint sets on the referenced rule times two on the host
    let c = checker(
        r#"
        #inner: x & { x: "a"|"b" } | { x: "c" }
        #outer: #inner/y & { y: "p" } | { y: "q" }
        "#,
    );
    for (first, second, expect) in [
        ("a", "p", 1),
        ("b", "q", 1),
        ("c", "p", 1),
        ("c", "q", 1),
        ("d", "p", 0),
        ("a", "r", 0),
    ] {
        assert_eq!(
            c.match_name(&name(&format!("/{first}/{second}"))).len(),
            expect,
            "/{first}/{second}"
        );
    }
}

#[test]
fn test_multiple_acceptable_signers() {
    let c = checker(
        r#"
        #ka: "keys"/"a"/_
        #kb: "keys"/"b"/_
        #msg: "chat"/room/_ <= #ka | #kb
        "#,
    );
    let pkt = name("/chat/lobby/41");
    assert!(c.check(&pkt, &name("/keys/a/1")));
    assert!(c.check(&pkt, &name("/keys/b/2")));
    assert!(!c.check(&pkt, &name("/keys/c/3")));
}

#[test]
fn test_signing_chain_depth() {
    let c = checker(
        r#"
        #root: "org"/"KEY"/_
        #dept: "org"/dept/"KEY"/_ <= #root
        #user: "org"/dept/user/"KEY"/_ <= #dept
        #file: "org"/dept/user/file <= #user
        "#,
    );
    assert!(c.check(
        &name("/org/sales/alice/report"),
        &name("/org/sales/alice/KEY/1"),
    ));
    // A user key from another department cannot sign
    assert!(!c.check(
        &name("/org/sales/alice/report"),
        &name("/org/eng/alice/KEY/1"),
    ));
    assert!(c.check(&name("/org/sales/alice/KEY/1"), &name("/org/sales/KEY/2")));
    assert!(c.check(&name("/org/sales/KEY/2"), &name("/org/KEY/3")));
    assert!(!c.check(&name("/org/sales/KEY/2"), &name("/org/sales/KEY/9")));
}

#[test]
fn test_environments_expose_named_patterns_only() {
    let c = checker(r#"#r: "a"/named/_temp"#);
    let results = c.match_name(&name("/a/b/c"));
    assert_eq!(results.len(), 1);
    let env = &results[0].1;
    assert_eq!(env.len(), 1);
    assert_eq!(env["named"].as_ref(), b"\x08\x01b");
}

#[test]
fn test_empty_schema_matches_nothing() {
    let c = Checker::new(compile_lvs("").unwrap(), HashMap::new()).unwrap();
    assert!(c.match_name(&name("/a")).is_empty());
}

#[test]
fn test_undefined_fn_detected_inside_referenced_rule() {
    let text = r#"
    #inner: x & { x: $nope("a") }
    #outer: #inner/"y"
    "#;
    let model = compile_lvs(text).unwrap();
    assert!(matches!(
        Checker::new(model, default_user_fns()),
        Err(LvsError::UndefinedUserFn(_))
    ));
}
