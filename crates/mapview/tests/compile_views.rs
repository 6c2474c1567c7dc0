use mapview::{Error, ErrorKind, ErrorOrigin, prelude::*};
use std::sync::Arc;

fn member(name: &str) -> MemberPath {
    MemberPath::member(name).expect("valid member")
}

fn extent(container: &str, name: &str) -> ExtentRef {
    ExtentRef::new(container, name).expect("valid extent")
}

fn fragment(name: &str, columns: &[&str]) -> CellTree {
    let mut spec = ExtentSpec::new(extent("Sales", name));
    for column in columns {
        spec = spec.column(ExtentColumn::member(member(column)));
    }

    CellTree::fragment(spec)
}

fn customers() -> ViewDefinition {
    ViewDefinition::resolved(
        extent("Model", "Customers"),
        CellTree::join(
            JoinKind::LeftOuter,
            vec![
                fragment("Customer", &["Id", "Name"]),
                fragment("CustomerInfo", &["CustomerId", "Email"]),
            ],
            vec![OnClause::equals(
                ColumnRef::new(0, "Id"),
                ColumnRef::new(1, "CustomerId"),
            )],
        ),
    )
}

fn active_orders() -> ViewDefinition {
    let spec = ExtentSpec::new(extent("Sales", "Order"))
        .column(ExtentColumn::member(member("Id")))
        .column(ExtentColumn::member(member("Status")))
        .column(ExtentColumn::constant("order", member("Source")))
        .filter(Predicate::equals(member("Status"), 1_i64))
        .distinct();

    ViewDefinition::resolved(extent("Model", "Orders"), CellTree::fragment(spec))
}

#[test]
fn view_set_serves_every_compiled_extent() {
    let compiler = ViewCompiler::new();
    let set = compiler
        .compile_all([&customers(), &active_orders()])
        .map_err(Error::from)
        .expect("views compile");

    assert_eq!(set.len(), 2);

    let customers = set.get("Model.Customers").expect("customers view");
    assert_eq!(customers.columns(), ["Id", "Name", "CustomerId", "Email"]);
    assert!(customers.text().contains("LEFT OUTER JOIN ("));
    assert!(customers.text().contains("FROM Sales.Customer AS T1"));
    assert_eq!(
        customers.expr().output_columns(),
        Some(vec!["Id", "Name", "CustomerId", "Email"])
    );

    let orders = set.get("Model.Orders").expect("orders view");
    assert!(orders.text().starts_with("SELECT DISTINCT"));
    assert!(orders.text().contains("FROM Sales.[Order] AS T1"));
    assert!(orders.text().contains("WHERE"));
    assert_eq!(orders.columns(), ["Id", "Status", "Source"]);
}

#[test]
fn identical_mappings_share_one_compiled_view() {
    let compiler = ViewCompiler::new();

    let first = compiler.compile(&customers()).expect("compiles");
    let renamed = ViewDefinition::resolved(extent("Model", "Customers"), customers().tree);
    let second = compiler.compile(&renamed).expect("compiles");

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.fingerprint(), customers().tree.fingerprint());
    assert_eq!(compiler.cache().stats().hits, 1);
}

#[test]
fn configured_view_store_honours_fill_policy() {
    let config = CacheConfig::from_toml_str(
        "[views]\ncapacity = 1\nfill_policy = \"last_writer_wins\"\n",
    )
    .expect("valid config");
    let compiler = ViewCompiler::from_config(&config, Arc::new(mapview::core::obs::NoopMetricsSink));

    assert_eq!(compiler.cache().policy(), FillPolicy::LastWriterWins);

    compiler.compile(&customers()).expect("compiles");
    compiler.compile(&active_orders()).expect("compiles");

    assert_eq!(compiler.cache().len(), 1);
}

#[test]
fn unresolved_models_surface_as_unsupported() {
    let mut view = customers();
    view.state = ModelState::Normalized;

    let err = Error::from(ViewCompiler::new().compile(&view).expect_err("must fail"));

    assert_eq!(err.kind, ErrorKind::Unsupported);
    assert_eq!(err.origin, ErrorOrigin::View);
    assert!(err.message.contains("normalized"));
}

#[test]
fn tree_defects_surface_as_invalid_views() {
    let view = ViewDefinition::resolved(
        extent("Model", "Parties"),
        CellTree::union(vec![
            fragment("Person", &["Id", "Name"]),
            fragment("Company", &["Id", "Name", "Vat"]),
        ]),
    );

    let err = Error::from(ViewCompiler::new().compile(&view).expect_err("must fail"));

    assert_eq!(err.kind, ErrorKind::InvalidView);
    assert_eq!(err.origin, ErrorOrigin::View);
    assert!(err.message.contains("T3"));
}

#[test]
fn version_is_exported() {
    assert!(!mapview::VERSION.is_empty());
}
