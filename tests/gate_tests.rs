use std::sync::Arc;

use record_rules::{
    Action, Caller, CollectionDef, CollectionKind, CollectionRules, CompileError, Decision,
    Denial, EngineConfig, EvalContext, Expr, ListAccess, Record, RegistryError, RequestInfo, Rule,
    RuleGate, RuleRegistry, StaticJoins, parse,
};
use serde_json::json;

fn rule(raw: Option<&str>) -> Rule {
    Rule::from_raw(raw).unwrap()
}

fn superuser() -> RequestInfo {
    RequestInfo::default().with_auth(Record::new("_superusers", "s1"))
}

fn user(id: &str) -> RequestInfo {
    RequestInfo::default().with_auth(Record::new("users", id).with_field("role", "member"))
}

fn check(action: Action, rule: &Rule, record: &Record, request: &RequestInfo) -> Decision {
    let caller = Caller::from_request(request);
    RuleGate::new().check(action, rule, caller, &EvalContext::new(record, request))
}

// ============================================================================
// Rule shapes
// ============================================================================

#[test]
fn test_locked_rule() {
    let locked = rule(None);
    let record = Record::new("posts", "p1");

    for action in [Action::View, Action::Create, Action::Update, Action::Delete] {
        let decision = check(action, &locked, &record, &user("u1"));
        assert_eq!(decision, Decision::Deny { reason: Denial::Forbidden }, "{action}");
        assert_eq!(decision.status_code(), 403);

        let decision = check(action, &locked, &record, &RequestInfo::default());
        assert_eq!(decision.status_code(), 403, "{action}");

        assert!(check(action, &locked, &record, &superuser()).is_allowed(), "{action}");
    }
}

#[test]
fn test_public_rule() {
    let record = Record::new("posts", "p1");
    for raw in ["", "   ", "\n"] {
        let public = rule(Some(raw));
        assert_eq!(public, Rule::Public);
        assert!(check(Action::View, &public, &record, &RequestInfo::default()).is_allowed());
        assert!(check(Action::Create, &public, &record, &user("u1")).is_allowed());
    }
}

#[test]
fn test_conditional_rule_denials() {
    let owner_only = rule(Some("owner = @request.auth.id"));
    let record = Record::new("posts", "p1").with_field("owner", "u1");

    let expected = [
        (Action::View, 404),
        (Action::Update, 404),
        (Action::Delete, 404),
        (Action::Create, 400),
    ];
    for (action, code) in expected {
        assert!(check(action, &owner_only, &record, &user("u1")).is_allowed(), "{action}");
        let denied = check(action, &owner_only, &record, &user("u2"));
        assert!(!denied.is_allowed(), "{action}");
        assert_eq!(denied.status_code(), code, "{action}");
        assert_eq!(check(action, &owner_only, &record, &RequestInfo::default()).status_code(), code);
    }
}

#[test]
fn test_superuser_bypasses_conditions() {
    let impossible = rule(Some("id = 'nothing' && id != 'nothing'"));
    let record = Record::new("posts", "p1");
    for action in Action::ALL {
        assert!(check(action, &impossible, &record, &superuser()).is_allowed(), "{action}");
    }
}

#[test]
fn test_manage_and_auth_denials() {
    let verified = rule(Some("verified = true"));
    let record = Record::new("users", "u9").with_field("verified", false);
    assert_eq!(check(Action::Manage, &verified, &record, &user("u1")).status_code(), 403);
    assert_eq!(check(Action::Auth, &verified, &record, &user("u1")).status_code(), 400);
}

#[test]
fn test_evaluation_error_denies() {
    let bad = rule(Some("tags = 'a'"));
    let record = Record::new("posts", "p1").with_field("tags", vec!["a", "b"]);
    let decision = check(Action::View, &bad, &record, &user("u1"));
    assert_eq!(decision, Decision::Deny { reason: Denial::NotFound });
}

#[test]
fn test_caller_classification() {
    assert_eq!(Caller::from_request(&RequestInfo::default()), Caller::Anonymous);
    assert_eq!(Caller::from_request(&user("u1")), Caller::Authenticated);
    assert_eq!(Caller::from_request(&superuser()), Caller::Superuser);
}

#[test]
fn test_decision_serialization() {
    assert_eq!(serde_json::to_value(Decision::Allow).unwrap(), json!({"decision": "allow"}));
    assert_eq!(
        serde_json::to_value(Decision::Deny { reason: Denial::EmptyList }).unwrap(),
        json!({"decision": "deny", "reason": "emptyList"})
    );
}

// ============================================================================
// List access
// ============================================================================

fn rows() -> Vec<Record> {
    vec![
        Record::new("posts", "p1").with_field("status", "published").with_field("views", 10i64),
        Record::new("posts", "p2").with_field("status", "draft").with_field("views", 500i64),
        Record::new("posts", "p3").with_field("status", "published").with_field("views", 900i64),
    ]
}

fn list_ids(access: &ListAccess, request: &RequestInfo) -> Vec<String> {
    let ListAccess::Rows(predicate) = access else {
        panic!("Expected rows, got {access:?}");
    };
    let rows = rows();
    RuleGate::new()
        .filter_rows(predicate, &rows, request, &StaticJoins::new())
        .into_iter()
        .map(|r| r.id.clone())
        .collect()
}

#[test]
fn test_locked_list() {
    let gate = RuleGate::new();
    assert_eq!(gate.list(&rule(None), Caller::Authenticated, None), ListAccess::Forbidden);
    assert_eq!(gate.list(&rule(None), Caller::Anonymous, None), ListAccess::Forbidden);

    let access = gate.list(&rule(None), Caller::Superuser, None);
    assert_eq!(list_ids(&access, &superuser()), vec!["p1", "p2", "p3"]);
}

#[test]
fn test_list_rule_combines_with_client_filter() {
    let gate = RuleGate::new();
    let list_rule = rule(Some("status = 'published'"));
    let client = parse("views > 100").unwrap();

    let access = gate.list(&list_rule, Caller::Anonymous, None);
    assert_eq!(list_ids(&access, &RequestInfo::default()), vec!["p1", "p3"]);

    let access = gate.list(&list_rule, Caller::Anonymous, Some(&client));
    assert_eq!(list_ids(&access, &RequestInfo::default()), vec!["p3"]);

    let ListAccess::Rows(predicate) = access else {
        panic!("Expected rows");
    };
    assert_eq!(predicate.to_filter_string(), r#"status = "published" && views > 100"#);
}

#[test]
fn test_list_predicate_keeps_or_grouped() {
    let gate = RuleGate::new();
    let list_rule = rule(Some("status = 'published' || views > 800"));
    let client = parse("views < 950 || views > 1000").unwrap();

    let ListAccess::Rows(predicate) = gate.list(&list_rule, Caller::Authenticated, Some(&client)) else {
        panic!("Expected rows");
    };
    assert_eq!(
        predicate.to_filter_string(),
        r#"(status = "published" || views > 800) && (views < 950 || views > 1000)"#
    );
    assert_eq!(list_ids(&ListAccess::Rows(predicate), &user("u1")), vec!["p1", "p3"]);
}

#[test]
fn test_public_list_is_unrestricted() {
    let gate = RuleGate::new();
    let ListAccess::Rows(predicate) = gate.list(&rule(Some("")), Caller::Anonymous, None) else {
        panic!("Expected rows");
    };
    assert!(predicate.is_unrestricted());
    assert_eq!(predicate.expr(), &Expr::AlwaysTrue);
}

#[test]
fn test_superuser_list_ignores_rule_but_not_filter() {
    let gate = RuleGate::new();
    let list_rule = rule(Some("status = 'nothing'"));
    let client = parse("status = 'draft'").unwrap();
    let access = gate.list(&list_rule, Caller::Superuser, Some(&client));
    assert_eq!(list_ids(&access, &superuser()), vec!["p2"]);
}

#[test]
fn test_list_denial_is_empty_list() {
    let list_rule = rule(Some("status = 'archived'"));
    let gate = RuleGate::new();
    let access = gate.list(&list_rule, Caller::Anonymous, None);
    assert!(list_ids(&access, &RequestInfo::default()).is_empty());
    assert_eq!(Action::List.denial(), Denial::EmptyList);
    assert_eq!(Denial::EmptyList.status_code(), 200);
}

// ============================================================================
// Collection definitions
// ============================================================================

#[test]
fn test_collection_def_from_json() {
    let def: CollectionDef = serde_json::from_value(json!({
        "name": "users",
        "type": "auth",
        "listRule": "id = @request.auth.id",
        "viewRule": "",
        "manageRule": "@request.auth.role = 'admin'",
        "authRule": "verified = true"
    }))
    .unwrap();
    assert_eq!(def.kind, CollectionKind::Auth);

    let rules = CollectionRules::compile(&def).unwrap();
    assert!(matches!(rules.rule(Action::List), Rule::Conditional(_)));
    assert_eq!(rules.rule(Action::View), &Rule::Public);
    assert_eq!(rules.rule(Action::Create), &Rule::Locked);
    assert_eq!(rules.rule(Action::Manage).raw(), Some("@request.auth.role = 'admin'"));
    assert_eq!(rules.rule(Action::Auth).raw(), Some("verified = true"));
}

#[test]
fn test_base_collection_ignores_auth_slots() {
    let def = CollectionDef {
        name: "posts".to_string(),
        manage_rule: Some(String::new()),
        auth_rule: Some(String::new()),
        ..Default::default()
    };
    let rules = CollectionRules::compile(&def).unwrap();
    assert_eq!(rules.rule(Action::Manage), &Rule::Locked);
    assert_eq!(rules.rule(Action::Auth), &Rule::Locked);
}

#[test]
fn test_invalid_rule_names_its_slot() {
    let def = CollectionDef {
        name: "posts".to_string(),
        update_rule: Some("owner =".to_string()),
        ..Default::default()
    };
    let err = CollectionRules::compile(&def).unwrap_err();
    assert_eq!(err.action, Action::Update);
    assert!(matches!(err.source, CompileError::Parse(_)));
    assert!(err.to_string().starts_with("invalid update rule"), "{}", err);
}

// ============================================================================
// Registry
// ============================================================================

fn posts_def(view_rule: &str) -> CollectionDef {
    CollectionDef {
        name: "posts".to_string(),
        view_rule: Some(view_rule.to_string()),
        ..Default::default()
    }
}

#[test]
fn test_registry_publishes_and_shares_compiled_rules() {
    let registry = RuleRegistry::new();
    let shared = "@request.auth.id != ''";
    registry.upsert(&posts_def(shared)).unwrap();
    registry
        .upsert(&CollectionDef {
            name: "comments".to_string(),
            list_rule: Some(shared.to_string()),
            ..Default::default()
        })
        .unwrap();

    let (Rule::Conditional(a), Rule::Conditional(b)) = (
        registry.get("posts").unwrap().rule(Action::View).clone(),
        registry.get("comments").unwrap().rule(Action::List).clone(),
    ) else {
        panic!("Expected conditional rules");
    };
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(registry.cache().len(), 1);
    assert_eq!(registry.len(), 2);
    assert_eq!(registry.snapshot().len(), 2);
}

#[test]
fn test_registry_rejects_bad_definitions() {
    let registry = RuleRegistry::new();
    assert_eq!(
        registry.upsert(&CollectionDef::default()).unwrap_err(),
        RegistryError::EmptyName
    );
    assert!(matches!(
        registry.upsert(&posts_def("title ~")),
        Err(RegistryError::InvalidRule { .. })
    ));
    assert!(registry.get("posts").is_none());
    assert!(registry.cache().is_empty());
}

#[test]
fn test_registry_config_limits() {
    let config = EngineConfig::from_json(r#"{"max_relation_depth": 1}"#).unwrap();
    let registry = RuleRegistry::with_config(config);
    assert!(registry.upsert(&posts_def("author.name = 'x'")).is_ok());
    assert!(registry.upsert(&posts_def("author.team.name = 'x'")).is_err());
    assert!(registry.compile_filter("a.b.c = 1").is_err());
    assert!(registry.compile_filter("a.b = 1").is_ok());
}

#[test]
fn test_registry_snapshot_is_stable() {
    let registry = RuleRegistry::new();
    registry.upsert(&posts_def("views > 1")).unwrap();
    let snapshot = registry.snapshot();
    registry.remove("posts");
    assert!(registry.get("posts").is_none());
    assert_eq!(snapshot["posts"].rule(Action::View).raw(), Some("views > 1"));
}

#[test]
fn test_concurrent_checks_share_rules() {
    let registry = Arc::new(RuleRegistry::new());
    registry.upsert(&posts_def("owner = @request.auth.id")).unwrap();
    let gate = Arc::new(RuleGate::new());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let registry = Arc::clone(&registry);
            let gate = Arc::clone(&gate);
            std::thread::spawn(move || {
                let rules = registry.get("posts").unwrap();
                let owner = format!("u{}", i % 2);
                let record = Record::new("posts", "p1").with_field("owner", owner);
                let request = user("u0");
                let caller = Caller::from_request(&request);
                gate.check(Action::View, rules.rule(Action::View), caller, &EvalContext::new(&record, &request))
                    .is_allowed()
            })
        })
        .collect();

    let allowed: Vec<bool> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for (i, ok) in allowed.into_iter().enumerate() {
        assert_eq!(ok, i % 2 == 0, "thread {i}");
    }
}
