//! View compilation: resolved cell trees into dual-form compiled views.
//!
//! Compiled views are cached per `(extent, mapping fingerprint)`; the cache
//! handle is owned by the compiler and injected by the host.

use crate::{
    cache::{CacheKey, CacheStore, StoreKind},
    config::CacheConfig,
    error::InternalError,
    obs::{MetricsEvent, MetricsSink, NoopMetricsSink},
    view::{
        ViewError,
        escape::{EntitySqlKeywords, ReservedKeywords},
        expr::Expr,
        fingerprint::MappingFingerprint,
        member::ExtentRef,
        model::{ModelState, ViewDefinition},
    },
};
use std::{collections::BTreeMap, sync::Arc};
use tracing::debug;

///
/// CompiledView
///
/// One extent's view in both serializations.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CompiledView {
    extent: ExtentRef,
    text: String,
    expr: Expr,
    columns: Vec<String>,
    fingerprint: MappingFingerprint,
}

impl CompiledView {
    #[must_use]
    pub const fn extent(&self) -> &ExtentRef {
        &self.extent
    }

    /// Query text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Expression tree.
    #[must_use]
    pub const fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Output column aliases, in projection order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub const fn fingerprint(&self) -> MappingFingerprint {
        self.fingerprint
    }
}

///
/// ViewSet
///
/// Compiled views addressable by `<container>.<extent>`.
///

#[derive(Clone, Debug, Default)]
pub struct ViewSet {
    views: BTreeMap<String, Arc<CompiledView>>,
}

impl ViewSet {
    #[must_use]
    pub fn get(&self, qualified_name: &str) -> Option<&Arc<CompiledView>> {
        self.views.get(qualified_name)
    }

    /// Register `view`, replacing any view of the same extent.
    pub fn insert(&mut self, view: Arc<CompiledView>) -> Option<Arc<CompiledView>> {
        self.views.insert(view.extent.qualified_name(), view)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.views.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<CompiledView>)> {
        self.views.iter().map(|(name, view)| (name.as_str(), view))
    }
}

///
/// ViewCompiler
///

pub struct ViewCompiler {
    cache: CacheStore<CompiledView>,
    keywords: Arc<dyn ReservedKeywords>,
    sink: Arc<dyn MetricsSink>,
}

impl ViewCompiler {
    /// Entity SQL keywords, unbounded first-writer-wins cache, no metrics.
    #[must_use]
    pub fn new() -> Self {
        Self::from_config(&CacheConfig::default(), Arc::new(NoopMetricsSink))
    }

    #[must_use]
    pub fn from_config(config: &CacheConfig, sink: Arc<dyn MetricsSink>) -> Self {
        Self {
            cache: CacheStore::from_config(StoreKind::View, &config.views, Arc::clone(&sink)),
            keywords: Arc::new(EntitySqlKeywords),
            sink,
        }
    }

    #[must_use]
    pub fn with_keywords(mut self, keywords: Arc<dyn ReservedKeywords>) -> Self {
        self.keywords = keywords;
        self
    }

    #[must_use]
    pub const fn cache(&self) -> &CacheStore<CompiledView> {
        &self.cache
    }

    /// Compile one view, reusing a cached result for the same mapping shape.
    pub fn compile(&self, view: &ViewDefinition) -> Result<Arc<CompiledView>, InternalError> {
        if view.state != ModelState::Resolved {
            self.sink.record(MetricsEvent::ViewRejected);
            debug!(extent = %view.extent, state = %view.state, "view model not resolved");
            return Err(ViewError::UnresolvedModel { state: view.state }.into());
        }

        let fingerprint = view.tree.fingerprint();
        let key = CacheKey::view(view.extent.qualified_name(), fingerprint)?;

        self.cache
            .get_or_insert_with(key, || self.build(view, fingerprint))
            .map_err(|err| {
                self.sink.record(MetricsEvent::ViewRejected);
                debug!(extent = %view.extent, error = %err, "view rejected");
                InternalError::from(err)
            })
    }

    /// Compile every definition into a set addressable by extent name.
    pub fn compile_all<'a>(
        &self,
        views: impl IntoIterator<Item = &'a ViewDefinition>,
    ) -> Result<ViewSet, InternalError> {
        let mut set = ViewSet::default();
        for view in views {
            set.insert(self.compile(view)?);
        }

        Ok(set)
    }

    fn build(
        &self,
        view: &ViewDefinition,
        fingerprint: MappingFingerprint,
    ) -> Result<CompiledView, ViewError> {
        let tree = view.tree.to_view_tree()?;
        let blocks = tree.block_count();

        let compiled = CompiledView {
            extent: view.extent.clone(),
            text: tree.to_text(self.keywords.as_ref()),
            expr: tree.to_expr(),
            columns: tree.output_columns(),
            fingerprint,
        };

        self.sink.record(MetricsEvent::ViewCompiled {
            blocks: u64::try_from(blocks).unwrap_or(u64::MAX),
        });
        debug!(
            extent = %view.extent,
            %fingerprint,
            blocks,
            fragments = view.tree.fragment_count(),
            "compiled view"
        );

        Ok(compiled)
    }
}

impl Default for ViewCompiler {
    fn default() -> Self {
        Self::new()
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::{ErrorClass, ErrorOrigin},
        obs::sink::tests::CapturingSink,
        view::{
            block::{ColumnRef, ExtentColumn, ExtentSpec, JoinKind, OnClause},
            member::MemberPath,
            model::CellTree,
        },
    };

    fn member(name: &str) -> MemberPath {
        MemberPath::member(name).expect("valid member")
    }

    fn fragment(extent: &str, columns: &[&str]) -> CellTree {
        let mut spec = ExtentSpec::new(ExtentRef::new("Sales", extent).expect("valid extent"));
        for column in columns {
            spec = spec.column(ExtentColumn::member(member(column)));
        }

        CellTree::fragment(spec)
    }

    fn customers() -> ViewDefinition {
        ViewDefinition::resolved(
            ExtentRef::new("Model", "Customers").expect("valid extent"),
            CellTree::join(
                JoinKind::Inner,
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

    #[test]
    fn compile_produces_both_forms() {
        let compiler = ViewCompiler::new();
        let view = compiler.compile(&customers()).expect("compiles");

        assert_eq!(view.columns(), ["Id", "Name", "CustomerId", "Email"]);
        assert!(view.text().contains("INNER JOIN ("));
        assert_eq!(
            view.expr().output_columns(),
            Some(vec!["Id", "Name", "CustomerId", "Email"])
        );
        assert_eq!(view.extent().qualified_name(), "Model.Customers");
    }

    #[test]
    fn compile_reuses_cached_views() {
        let sink = Arc::new(CapturingSink::default());
        let compiler = ViewCompiler::from_config(&CacheConfig::default(), sink.clone());

        let first = compiler.compile(&customers()).expect("compiles");
        let second = compiler.compile(&customers()).expect("compiles");

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(compiler.cache().len(), 1);

        let compiled = sink
            .events()
            .into_iter()
            .filter(|event| matches!(event, MetricsEvent::ViewCompiled { .. }))
            .count();
        assert_eq!(compiled, 1);
        assert!(
            sink.events()
                .contains(&MetricsEvent::ViewCompiled { blocks: 3 })
        );
    }

    #[test]
    fn unresolved_models_fail_fast() {
        let sink = Arc::new(CapturingSink::default());
        let compiler = ViewCompiler::from_config(&CacheConfig::default(), sink.clone());
        let mut view = customers();
        view.state = ModelState::ResolveAttempted;

        let err = compiler.compile(&view).expect_err("must fail");

        assert_eq!(err.class, ErrorClass::Unsupported);
        assert_eq!(err.origin, ErrorOrigin::View);
        assert_eq!(sink.events(), vec![MetricsEvent::ViewRejected]);
        assert!(compiler.cache().is_empty());
    }

    #[test]
    fn tree_defects_propagate_and_are_not_cached() {
        let compiler = ViewCompiler::new();
        let view = ViewDefinition::resolved(
            ExtentRef::new("Model", "Broken").expect("valid extent"),
            CellTree::union(vec![
                fragment("A", &["Id", "Name", "Kind"]),
                fragment("B", &["Id", "Name", "Kind", "Extra"]),
            ]),
        );

        let err = compiler.compile(&view).expect_err("must fail");

        assert!(err.is_view_defect());
        assert!(err.message.contains("T3"));
        assert!(compiler.cache().is_empty());
    }

    #[test]
    fn compile_all_indexes_by_qualified_name() {
        let compiler = ViewCompiler::new();
        let orders = ViewDefinition::resolved(
            ExtentRef::new("Model", "Orders").expect("valid extent"),
            fragment("Order", &["Id", "Total"]),
        );

        let set = compiler
            .compile_all([&customers(), &orders])
            .expect("compiles");

        assert_eq!(set.len(), 2);
        assert!(set.get("Model.Orders").is_some());
        assert!(set.get("Model.Customers").is_some());
        assert!(set.get("Orders").is_none());
        assert_eq!(
            set.iter().map(|(name, _)| name).collect::<Vec<_>>(),
            ["Model.Customers", "Model.Orders"]
        );
    }

    #[test]
    fn injected_keywords_drive_escaping() {
        let view = ViewDefinition::resolved(
            ExtentRef::new("Model", "Orders").expect("valid extent"),
            fragment("Order", &["Id"]),
        );

        let escaped = ViewCompiler::new().compile(&view).expect("compiles");
        assert!(escaped.text().contains("FROM Sales.[Order] AS T1"));

        let bare = ViewCompiler::new()
            .with_keywords(Arc::new(crate::view::escape::NoKeywords))
            .compile(&view)
            .expect("compiles");
        assert!(bare.text().contains("FROM Sales.Order AS T1"));
    }
}
