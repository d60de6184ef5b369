//! End-to-end flow: assemble a canonical tree, register it with the scope
//! registry, and address it through a scheme front-end.

use std::sync::Arc;

use naming_core::{
    ContextAssembler, Descriptor, Entry, Environment, ModuleId, ModuleIdentity, NamingContext,
    NamingError, Object, ObjectBuilder, SchemeContext, ScopeRegistry, WellKnownKey,
};

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

struct EchoBuilder;

impl ObjectBuilder for EchoBuilder {
    fn build(
        &self,
        descriptor: &Descriptor,
        resolved_path: &str,
        _node: &Arc<NamingContext>,
        _environment: &Environment,
    ) -> anyhow::Result<Object> {
        Ok(Arc::new(format!("{}@{}", descriptor.kind, resolved_path)))
    }
}

#[test]
fn scheme_lookup_through_ambient_scope() {
    init_tracing();
    let registry = Arc::new(ScopeRegistry::new());
    let assembler = ContextAssembler::new(NamingContext::new("global"));
    let root = assembler.assemble("deployable", None, None).expect("assemble");
    root.bind("comp/env/foo", Entry::value("bar")).expect("bind");

    let dispatcher = SchemeContext::new("x", Arc::clone(&registry));
    let _guard = registry.enter(root);

    let got = dispatcher.lookup("x:comp/env/foo").expect("lookup");
    assert_eq!(got.downcast_ref::<&str>(), Some(&"bar"));

    // missing prefix is rejected before any delegation
    assert!(matches!(
        dispatcher.lookup("comp/env/foo").unwrap_err(),
        NamingError::InvalidName(_)
    ));
}

#[test]
fn canonical_fallback_module_and_app_reuse_comp() {
    init_tracing();
    let assembler = ContextAssembler::new(NamingContext::new("global"));
    let root = assembler.assemble("unit", None, None).expect("assemble");

    let comp = root
        .lookup(WellKnownKey::Comp.as_str())
        .expect("comp")
        .into_context()
        .expect("context");
    for key in [WellKnownKey::Module, WellKnownKey::App] {
        let ctx = root
            .lookup(key.as_str())
            .expect("lookup")
            .into_context()
            .expect("context");
        assert!(Arc::ptr_eq(&ctx, &comp), "{key} should reuse comp");
    }

    // a value bound through one alias is visible through the others
    root.bind("comp/setting", Entry::value(42_i64)).expect("bind");
    let via_app = root.lookup("app/setting").expect("lookup");
    assert_eq!(via_app.downcast_ref::<i64>(), Some(&42));
}

#[test]
fn deferred_entries_build_through_the_scheme_front_end() {
    init_tracing();
    let registry = Arc::new(ScopeRegistry::new());
    let assembler =
        ContextAssembler::new(NamingContext::new("global")).with_builder(Arc::new(EchoBuilder));
    let root = assembler.assemble("unit", None, None).expect("assemble");

    let dispatcher = SchemeContext::new("java", Arc::clone(&registry));
    let _guard = registry.enter(root);

    dispatcher
        .bind(
            "java:comp/env/jdbc/main",
            Entry::deferred(Descriptor::new("datasource", serde_json::json!({"max": 4}))),
        )
        .expect("bind");

    let got = dispatcher.lookup("java:comp/env/jdbc/main").expect("lookup");
    assert_eq!(got.downcast_ref::<String>().map(String::as_str), Some("datasource@main"));
}

#[test]
fn links_resolve_against_the_shared_global_root() {
    init_tracing();
    let registry = Arc::new(ScopeRegistry::new());
    let assembler = ContextAssembler::new(NamingContext::new("global"));
    assembler
        .global()
        .bind("services/mailer", Entry::value("smtp-pool"))
        .expect("bind");

    let root = assembler.assemble("unit", None, None).expect("assemble");
    root.bind("comp/env/mail", Entry::link("services/mailer"))
        .expect("bind");

    let dispatcher = SchemeContext::new("java", Arc::clone(&registry));
    let _guard = registry.enter(root);
    let got = dispatcher.lookup("java:comp/env/mail").expect("lookup");
    assert_eq!(got.downcast_ref::<&str>(), Some(&"smtp-pool"));
}

#[test]
fn module_identity_fallback_serves_unbound_strands() {
    init_tracing();
    let registry = Arc::new(ScopeRegistry::new());
    let assembler = ContextAssembler::new(NamingContext::new("global"));
    let root = assembler.assemble("war", None, None).expect("assemble");
    root.bind("comp/name", Entry::value("orders-service")).expect("bind");
    registry.bind_module(ModuleId::new("war"), root);

    // no ambient scope on this strand; the dispatcher's module identity
    // falls back through its declared parent
    let caller = ModuleIdentity::with_parent("servlet", ModuleIdentity::new("war"));
    let dispatcher = SchemeContext::for_module("java", Arc::clone(&registry), caller);

    let got = dispatcher.lookup("java:comp/name").expect("lookup");
    assert_eq!(got.downcast_ref::<&str>(), Some(&"orders-service"));
}

#[test]
fn no_active_scope_without_ambient_or_module_binding() {
    init_tracing();
    let registry = Arc::new(ScopeRegistry::new());
    let caller = ModuleIdentity::with_parent("servlet", ModuleIdentity::new("unregistered"));
    let dispatcher = SchemeContext::for_module("java", registry, caller);
    assert!(matches!(
        dispatcher.lookup("java:comp/name").unwrap_err(),
        NamingError::NoActiveScope
    ));
}

#[test]
fn two_deployables_see_their_own_trees() {
    init_tracing();
    let registry = Arc::new(ScopeRegistry::new());
    let assembler = ContextAssembler::new(NamingContext::new("global"));

    let first = assembler.assemble("first", None, None).expect("assemble");
    first.bind("comp/who", Entry::value("first")).expect("bind");
    let second = assembler.assemble("second", None, None).expect("assemble");
    second.bind("comp/who", Entry::value("second")).expect("bind");

    let dispatcher = SchemeContext::new("java", Arc::clone(&registry));

    {
        let _guard = registry.enter(first);
        let got = dispatcher.lookup("java:comp/who").expect("lookup");
        assert_eq!(got.downcast_ref::<&str>(), Some(&"first"));
    }
    {
        let _guard = registry.enter(second);
        let got = dispatcher.lookup("java:comp/who").expect("lookup");
        assert_eq!(got.downcast_ref::<&str>(), Some(&"second"));
    }
    assert!(dispatcher.lookup("java:comp/who").is_err());
}

#[test]
fn enumeration_is_single_pass_over_the_scheme_front_end() {
    init_tracing();
    let registry = Arc::new(ScopeRegistry::new());
    let assembler = ContextAssembler::new(NamingContext::new("global"));
    let root = assembler.assemble("unit", None, None).expect("assemble");
    for name in ["comp/x", "comp/y", "comp/z"] {
        root.bind(name, Entry::value(name.to_owned())).expect("bind");
    }

    let dispatcher = SchemeContext::new("java", Arc::clone(&registry));
    let _guard = registry.enter(root);

    let mut pairs = dispatcher.list("java:comp").expect("list");
    assert_eq!(pairs.by_ref().count(), 3);
    assert!(pairs.next().is_none());
}
