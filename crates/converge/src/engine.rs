//! Engine entry points
//!
//! [`reconcile`] is the pure core: `(desired, current, mode)` in,
//! `{before, after, commands, changed}` out. [`converge`] wraps it with the
//! provider seams, and [`reconcile_batch`] runs independent reconciliations
//! on a thread pool.

use anyhow::{Context, Result as AnyResult};
use log::{debug, info};
use rayon::prelude::*;
use serde_json::Value;

use crate::context::{ApplyContext, ProgressCallback};
use crate::diff::diff;
use crate::emitter::emit;
use crate::error::{Error, Result};
use crate::normalize::{normalize, normalize_facts};
use crate::planner::resolve;
use crate::report::unified_diff;
use crate::resource::{Resource, ResourceExt};
use crate::types::{Command, ConvergenceMode, ReconcileResult};

/// Reconcile one resource
///
/// Both documents are normalized against the resource schema. Outside of
/// `deleted`, explicit-empty sub-trees of the desired document are treated
/// as absent. Nothing is returned unless every stage succeeds.
pub fn reconcile(
    resource: &dyn Resource,
    desired: &Value,
    current: &Value,
    mode: ConvergenceMode,
) -> Result<ReconcileResult> {
    run(resource, desired, current, mode).map(|(result, _)| result)
}

fn run(
    resource: &dyn Resource,
    desired: &Value,
    current: &Value,
    mode: ConvergenceMode,
) -> Result<(ReconcileResult, Vec<Command>)> {
    if !resource.supports(mode) {
        return Err(Error::UnsupportedMode {
            resource: resource.name().to_string(),
            mode,
        });
    }
    let schema = resource.schema();

    let desired = normalize(desired, schema)?;
    let desired = if mode == ConvergenceMode::Deleted {
        desired
    } else {
        desired.prune_empty()
    };
    let current = normalize_facts(current, schema)?;

    let patch = diff(&desired, &current, schema)?;
    let resolution = resolve(&patch, schema, mode)?;
    let emission = emit(&resolution.operations, &current, schema, resource.template());

    let changed = !resolution.is_empty();
    debug!(
        "{}: {mode} -> {} operation(s), {} command(s)",
        resource.name(),
        resolution.operations.len(),
        emission.commands.len()
    );

    let result = ReconcileResult {
        resource: resource.name().to_string(),
        state: mode,
        before: current.to_json(),
        after: emission.after.to_json(),
        commands: emission.commands.iter().map(ToString::to_string).collect(),
        changed,
        operations: resolution.operations,
        warnings: resolution.notices.iter().map(ToString::to_string).collect(),
        diff: None,
    };
    Ok((result, emission.commands))
}

/// Outcome of [`converge`]
#[derive(Debug, Clone)]
pub struct Convergence {
    pub result: ReconcileResult,
    /// Commands were handed to the sink
    pub pushed: bool,
}

/// Gather facts, reconcile and push the commands to the sink
///
/// In check mode, or when the confirm callback declines, nothing is pushed;
/// the result still reports the generated `after` state.
pub fn converge(
    resource: &dyn Resource,
    desired: &Value,
    mode: ConvergenceMode,
    ctx: &mut ApplyContext<'_>,
) -> AnyResult<Convergence> {
    let name = resource.name();
    let current = ctx
        .facts
        .facts(name)
        .with_context(|| format!("Could not gather facts for {name}"))?;
    let (mut result, commands) = run(resource, desired, &current, mode)
        .with_context(|| format!("Could not reconcile {name}"))?;

    if ctx.diff && result.changed {
        result.diff = Some(unified_diff(&result.before, &result.after));
    }

    if !result.changed {
        return Ok(Convergence {
            result,
            pushed: false,
        });
    }
    if ctx.check_mode {
        info!("{name}: check mode, {} command(s) not sent", result.commands.len());
        return Ok(Convergence {
            result,
            pushed: false,
        });
    }
    if !ctx.confirm(&format!("Apply {} command(s) to {name}?", result.commands.len()))? {
        info!("{name}: declined");
        return Ok(Convergence {
            result,
            pushed: false,
        });
    }

    ctx.sink
        .push(name, &commands)
        .with_context(|| format!("Could not push commands for {name}"))?;
    info!("{name}: pushed {} command(s)", commands.len());
    Ok(Convergence {
        result,
        pushed: true,
    })
}

/// One independent reconciliation
#[derive(Debug, Clone, Copy)]
pub struct Task<'a> {
    pub resource: &'a dyn Resource,
    pub desired: &'a Value,
    pub current: &'a Value,
    pub mode: ConvergenceMode,
}

/// Run independent reconciliations on a pool of `jobs` threads
///
/// Results come back in task order. Each task owns its trees; nothing is
/// shared between them.
pub fn reconcile_batch<P: ProgressCallback>(
    tasks: &[Task],
    jobs: usize,
    progress: &mut P,
) -> AnyResult<Vec<Result<ReconcileResult>>> {
    progress.on_batch_start(tasks.len());

    let results: Vec<Result<ReconcileResult>> = if jobs <= 1 || tasks.len() <= 1 {
        tasks.iter().map(run_task).collect()
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create thread pool: {e}"))?;
        pool.install(|| tasks.par_iter().map(run_task).collect())
    };

    // progress is reported after the pool is done; callbacks are not Sync
    for (task, result) in tasks.iter().zip(&results) {
        progress.on_task_complete(task.resource.name(), result.as_ref().ok());
    }
    progress.on_batch_complete();
    Ok(results)
}

fn run_task(task: &Task) -> Result<ReconcileResult> {
    reconcile(task.resource, task.desired, task.current, task.mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{AutoConfirm, AutoDecline, NoProgress, RecordingSink, StaticFacts};
    use crate::error::SchemaError;
    use crate::resource::DeclaredResource;
    use crate::schema::{ObjectSchema, ResourceSchema, ScalarSpec};
    use crate::template::RestTemplate;
    use crate::types::OpKind;
    use serde_json::json;

    fn resource() -> DeclaredResource {
        DeclaredResource::new(
            ResourceSchema::list(
                "test",
                ObjectSchema::new()
                    .field("id", ScalarSpec::int())
                    .field("vlan", ScalarSpec::int())
                    .field("cost", ScalarSpec::int())
                    .field("priority", ScalarSpec::int())
                    .field("auth_key", ScalarSpec::str())
                    .identity(&["id"])
                    .immutable(&["auth_key"]),
            ),
            RestTemplate::new("data/test:entities/entity"),
            "test entities",
        )
    }

    fn check(desired: Value, current: Value, mode: ConvergenceMode) -> ReconcileResult {
        reconcile(&resource(), &desired, &current, mode).unwrap()
    }

    fn ops(result: &ReconcileResult) -> Vec<String> {
        result.operations.iter().map(ToString::to_string).collect()
    }

    /// Reconciling the same desired document against the produced `after`
    /// changes nothing
    fn assert_idempotent(desired: &Value, result: &ReconcileResult) {
        let again = check(desired.clone(), result.after.clone(), result.state);
        assert!(!again.changed, "not idempotent: {:?}", ops(&again));
        assert!(again.commands.is_empty());
        assert_eq!(again.after, result.after);
    }

    #[test]
    fn test_merged_adds_missing_entity() {
        let desired = json!([{"id": 3, "vlan": 30}]);
        let result = check(
            desired.clone(),
            json!([{"id": 1, "vlan": 10}, {"id": 2, "vlan": 20}]),
            ConvergenceMode::Merged,
        );
        assert_eq!(ops(&result), vec!["ADD test[id=3] {vlan=30}"]);
        assert_eq!(
            result.after,
            json!([{"id": 1, "vlan": 10}, {"id": 2, "vlan": 20}, {"id": 3, "vlan": 30}])
        );
        assert!(result.changed);
        assert_eq!(
            result.commands,
            vec![r#"PATCH data/test:entities/entity=3 {"id":3,"vlan":30}"#]
        );
        assert_idempotent(&desired, &result);
    }

    #[test]
    fn test_replaced_modifies_named_entity_only() {
        let desired = json!([{"id": 1, "cost": 50}]);
        let result = check(
            desired.clone(),
            json!([{"id": 1, "cost": 30}, {"id": 2, "cost": 40}]),
            ConvergenceMode::Replaced,
        );
        assert_eq!(ops(&result), vec!["MODIFY test[id=1] {cost=50}"]);
        assert_eq!(result.after, json!([{"id": 1, "cost": 50}, {"id": 2, "cost": 40}]));
        assert_idempotent(&desired, &result);
    }

    #[test]
    fn test_overridden_removes_everything_else() {
        let desired = json!([{"id": 3, "cost": 60}]);
        let result = check(
            desired.clone(),
            json!([{"id": 1, "cost": 30}, {"id": 2, "cost": 40}]),
            ConvergenceMode::Overridden,
        );
        assert_eq!(
            ops(&result),
            vec!["REMOVE test[id=1]", "REMOVE test[id=2]", "ADD test[id=3] {cost=60}"]
        );
        assert_eq!(result.after, json!([{"id": 3, "cost": 60}]));
        assert_idempotent(&desired, &result);
    }

    #[test]
    fn test_deleted_removes_listed_field_only() {
        let desired = json!([{"id": 1, "priority": 5}]);
        let result = check(
            desired.clone(),
            json!([{"id": 1, "cost": 30, "priority": 5}]),
            ConvergenceMode::Deleted,
        );
        assert_eq!(result.operations.len(), 1);
        assert_eq!(result.operations[0].kind, OpKind::RemoveFields);
        assert_eq!(ops(&result), vec!["REMOVE-FIELDS test[id=1] {priority=5}"]);
        assert_eq!(result.after, json!([{"id": 1, "cost": 30}]));
        assert_eq!(
            result.commands,
            vec!["DELETE data/test:entities/entity=1/priority"]
        );
        assert_idempotent(&desired, &result);
    }

    #[test]
    fn test_immutable_change_recreates_in_order() {
        let desired = json!([{"id": 1, "auth_key": "Y"}]);
        let result = check(
            desired.clone(),
            json!([{"id": 1, "auth_key": "X"}]),
            ConvergenceMode::Merged,
        );
        assert_eq!(
            ops(&result),
            vec!["REMOVE test[id=1]", "ADD test[id=1] {auth_key=Y}"]
        );
        assert!(result.operations.iter().all(|op| op.recreate));
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("auth_key"));
        assert_eq!(result.after, json!([{"id": 1, "auth_key": "Y"}]));
        assert_idempotent(&desired, &result);
    }

    #[test]
    fn test_deleted_with_empty_document_removes_everything() {
        for desired in [Value::Null, json!([])] {
            let result = check(
                desired.clone(),
                json!([{"id": 1, "cost": 30}, {"id": 2, "vlan": 20}]),
                ConvergenceMode::Deleted,
            );
            assert_eq!(ops(&result), vec!["REMOVE test[id=1]", "REMOVE test[id=2]"]);
            assert_eq!(result.after, json!([]));
            assert_idempotent(&desired, &result);
        }
    }

    #[test]
    fn test_unchanged_reports_no_commands() {
        let current = json!([{"id": 1, "cost": 30}]);
        for mode in ConvergenceMode::ALL {
            let desired = if mode == ConvergenceMode::Deleted {
                json!([{"id": 2}])
            } else {
                current.clone()
            };
            let result = check(desired, current.clone(), mode);
            assert!(!result.changed, "{mode}");
            assert!(result.commands.is_empty());
            assert_eq!(result.before, result.after);
        }
    }

    #[test]
    fn test_merged_never_removes_unmentioned_entities() {
        let current = json!([{"id": 1, "cost": 30, "priority": 5}, {"id": 2, "vlan": 20}]);
        let result = check(
            json!([{"id": 1, "cost": 10}, {"id": 4}]),
            current,
            ConvergenceMode::Merged,
        );
        assert!(result.operations.iter().all(|op| !op.kind.is_removal()));
        assert_eq!(
            result.after,
            json!([{"id": 1, "cost": 10, "priority": 5}, {"id": 2, "vlan": 20}, {"id": 4}])
        );
    }

    #[test]
    fn test_unsupported_mode_and_schema_errors() {
        let restricted = resource().with_modes(&[ConvergenceMode::Merged, ConvergenceMode::Deleted]);
        let err = reconcile(&restricted, &json!([]), &json!([]), ConvergenceMode::Overridden)
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedMode { .. }));

        let err = reconcile(&resource(), &json!([{"id": "x"}]), &json!([]), ConvergenceMode::Merged)
            .unwrap_err();
        assert!(matches!(err, Error::Schema(_)));

        let err = reconcile(
            &resource(),
            &json!([{"id": 1}, {"id": 1}]),
            &json!([]),
            ConvergenceMode::Merged,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Differ(_)));

        // repeated identities in the facts make them malformed
        let err = reconcile(
            &resource(),
            &json!([]),
            &json!([{"id": 1, "cost": 1}, {"id": 1, "cost": 2}]),
            ConvergenceMode::Merged,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Schema(SchemaError::DuplicateIdentity { .. })));
    }

    #[test]
    fn test_converge_pushes_unless_check_mode() {
        let resource = resource();
        let facts = StaticFacts::new().with("test", json!([{"id": 1, "cost": 30}]));
        let desired = json!([{"id": 1, "cost": 50}]);

        let mut sink = RecordingSink::default();
        let mut ctx = ApplyContext::new(&facts, &mut sink);
        ctx.check_mode = true;
        ctx.diff = true;
        let outcome = converge(&resource, &desired, ConvergenceMode::Merged, &mut ctx).unwrap();
        assert!(!outcome.pushed);
        assert!(outcome.result.changed);
        assert!(outcome.result.diff.as_deref().is_some_and(|d| d.contains("\"cost\": 50")));
        assert!(sink.pushed.is_empty());

        let mut decline = AutoDecline;
        let mut ctx = ApplyContext::new(&facts, &mut sink).with_confirm(&mut decline);
        let outcome = converge(&resource, &desired, ConvergenceMode::Merged, &mut ctx).unwrap();
        assert!(!outcome.pushed);
        assert!(sink.pushed.is_empty());

        let mut confirm = AutoConfirm;
        let mut ctx = ApplyContext::new(&facts, &mut sink).with_confirm(&mut confirm);
        let outcome = converge(&resource, &desired, ConvergenceMode::Merged, &mut ctx).unwrap();
        assert!(outcome.pushed);
        assert_eq!(sink.pushed.len(), 1);
        assert_eq!(sink.pushed[0].0, "test");
    }

    #[test]
    fn test_reconcile_batch_keeps_task_order() {
        let resource = resource();
        let current = json!([{"id": 1, "cost": 30}]);
        let desired: Vec<Value> = (0..8).map(|i| json!([{"id": i, "cost": 1}])).collect();
        let tasks: Vec<Task> = desired
            .iter()
            .map(|d| Task {
                resource: &resource,
                desired: d,
                current: &current,
                mode: ConvergenceMode::Overridden,
            })
            .collect();

        let results = reconcile_batch(&tasks, 4, &mut NoProgress).unwrap();
        assert_eq!(results.len(), 8);
        for (i, result) in results.iter().enumerate() {
            let result = result.as_ref().unwrap();
            assert_eq!(result.after, json!([{"id": i, "cost": 1}]));
        }
    }

    fn nested() -> DeclaredResource {
        use crate::schema::{Canonical, Schema};
        DeclaredResource::new(
            ResourceSchema::list(
                "ifaces",
                ObjectSchema::new()
                    .field("name", ScalarSpec::str())
                    .field("mtu", ScalarSpec::int().default_value(9100))
                    .field("description", ScalarSpec::str())
                    .field("mode", ScalarSpec::str().choices(["access", "trunk"]))
                    .field("vlans", Schema::set(ScalarSpec::int().range(1, 4094)))
                    .field(
                        "addresses",
                        Schema::list(
                            ObjectSchema::new()
                                .field("address", ScalarSpec::str().canonical(Canonical::Prefix))
                                .field("secondary", ScalarSpec::bool().default_value(false))
                                .identity(&["address"]),
                        ),
                    )
                    .field(
                        "timers",
                        Schema::object(
                            ObjectSchema::new()
                                .field("hello", ScalarSpec::int().default_value(10))
                                .field("dead", ScalarSpec::int()),
                        ),
                    )
                    .identity(&["name"])
                    .undeletable(&["mode"]),
            ),
            RestTemplate::new("data/ifaces/iface"),
            "interfaces",
        )
    }

    fn nested_current() -> Value {
        json!([
            {"name": "Eth1", "mtu": 1500, "description": "uplink", "vlans": [10, 20],
             "addresses": [{"address": "10.0.0.1/24"}, {"address": "10.0.1.1/24", "secondary": true}],
             "timers": {"hello": 5, "dead": 20}},
            {"name": "Eth2", "mode": "trunk", "vlans": [30]},
            {"name": "Eth3", "description": "spare"}
        ])
    }

    fn nested_desired() -> Vec<Value> {
        vec![
            json!([{"name": "Eth1", "mtu": 9000, "addresses": [{"address": "10.0.2.9/24"}]}]),
            json!([{"name": "Eth2", "mode": "access", "vlans": [40]}, {"name": "Eth4", "timers": {"dead": 40}}]),
            json!([{"name": "Eth1", "description": "uplink", "timers": {"hello": 5}}, {"name": "Eth3"}]),
            json!([]),
        ]
    }

    #[test]
    fn test_desired_after_is_fixed_point() {
        let resource = nested();
        for desired in nested_desired() {
            for mode in [
                ConvergenceMode::Merged,
                ConvergenceMode::Replaced,
                ConvergenceMode::Overridden,
            ] {
                let first = reconcile(&resource, &desired, &nested_current(), mode).unwrap();
                let again = reconcile(&resource, &desired, &first.after, mode).unwrap();
                assert!(!again.changed, "{mode} {desired}: {:?}", ops(&again));
                let fixed = reconcile(&resource, &first.after, &first.after, mode).unwrap();
                assert!(!fixed.changed, "{mode} {desired}: {:?}", ops(&fixed));
            }
        }
    }

    #[test]
    fn test_deleted_rerun_is_noop() {
        let resource = nested();
        let selectors = [
            json!([{"name": "Eth1", "description": "uplink", "vlans": [20], "addresses": []}]),
            json!([{"name": "Eth1", "timers": {"dead": 20}}, {"name": "Eth2"}]),
            json!([{"name": "Eth2", "mode": "trunk", "vlans": []}]),
            Value::Null,
        ];
        for desired in selectors {
            let first = reconcile(&resource, &desired, &nested_current(), ConvergenceMode::Deleted).unwrap();
            assert!(first.changed, "{desired}");
            let again = reconcile(&resource, &desired, &first.after, ConvergenceMode::Deleted).unwrap();
            assert!(!again.changed, "{desired}: {:?}", ops(&again));
        }
    }

    #[test]
    fn test_overridden_after_equals_desired() {
        let resource = nested();
        let schema = resource.schema();
        for desired in nested_desired() {
            let result =
                reconcile(&resource, &desired, &nested_current(), ConvergenceMode::Overridden).unwrap();
            let after = normalize(&result.after, schema).unwrap().strip_defaults(schema);
            let expected = normalize(&desired, schema)
                .unwrap()
                .prune_empty()
                .strip_defaults(schema);
            assert_eq!(after, expected, "{desired}");
        }
    }

    #[test]
    fn test_after_survives_normalization() {
        let resource = nested();
        let schema = resource.schema();
        for desired in nested_desired() {
            for mode in ConvergenceMode::ALL {
                let result = reconcile(&resource, &desired, &nested_current(), mode).unwrap();
                let renormalized = normalize(&result.after, schema).unwrap();
                assert_eq!(renormalized.to_json(), result.after, "{mode} {desired}");
            }
        }
    }

    #[test]
    fn test_deleted_field_precision_in_nested_entities() {
        let resource = nested();
        let result = reconcile(
            &resource,
            &json!([{"name": "Eth1", "timers": {"hello": 5}, "vlans": [10]}]),
            &nested_current(),
            ConvergenceMode::Deleted,
        )
        .unwrap();
        let after = &result.after;
        assert_eq!(after[0]["timers"], json!({"hello": 10, "dead": 20}));
        assert_eq!(after[0]["vlans"], json!([20]));
        assert_eq!(after[0]["mtu"], json!(1500));
        assert_eq!(after[0]["description"], json!("uplink"));
        assert_eq!(after[1], nested_current()[1]);
        assert_eq!(after[2], nested_current()[2]);
    }

    #[test]
    fn test_deleted_skips_undeletable_without_error() {
        let result = reconcile(
            &nested(),
            &json!([{"name": "Eth2", "mode": "trunk"}]),
            &nested_current(),
            ConvergenceMode::Deleted,
        )
        .unwrap();
        assert!(!result.changed);
    }

    #[test]
    fn test_replaced_resets_named_entity() {
        let result = reconcile(
            &nested(),
            &json!([{"name": "Eth1", "addresses": [{"address": "10.0.1.7/24", "secondary": true}]}]),
            &nested_current(),
            ConvergenceMode::Replaced,
        )
        .unwrap();
        assert_eq!(
            result.after[0],
            json!({"name": "Eth1", "mtu": 9100,
                "addresses": [{"address": "10.0.1.0/24", "secondary": true}]})
        );
        assert_eq!(result.after[1], nested_current()[1]);
        assert_eq!(result.after[2], nested_current()[2]);
    }

    #[test]
    fn test_replaced_clears_unmentioned_nested_config() {
        let desired = json!([{"name": "Eth1", "description": "core"}]);
        let result = reconcile(&nested(), &desired, &nested_current(), ConvergenceMode::Replaced)
            .unwrap();
        let ops = ops(&result);
        for expected in [
            "REMOVE ifaces[name=Eth1].addresses[address=10.0.0.0/24]",
            "REMOVE ifaces[name=Eth1].addresses[address=10.0.1.0/24]",
            "REMOVE ifaces[name=Eth1].timers",
        ] {
            assert!(ops.iter().any(|op| op == expected), "missing {expected}: {ops:?}");
        }
        assert_eq!(
            result.after[0],
            json!({"name": "Eth1", "mtu": 9100, "description": "core"})
        );
        // Eth2 and Eth3 are not named, so they keep everything
        assert_eq!(result.after[1], nested_current()[1]);
        assert_eq!(result.after[2], nested_current()[2]);

        let again = reconcile(&nested(), &desired, &result.after, ConvergenceMode::Replaced)
            .unwrap();
        assert!(!again.changed, "{:?}", again.operations);
    }

    fn pools() -> DeclaredResource {
        use crate::schema::Schema;
        DeclaredResource::new(
            ResourceSchema::list(
                "pools",
                ObjectSchema::new()
                    .field("id", ScalarSpec::int())
                    .field("members", Schema::set(ScalarSpec::str()))
                    .identity(&["id"])
                    .immutable(&["members"]),
            ),
            RestTemplate::new("data/pools/pool"),
            "member pools",
        )
    }

    #[test]
    fn test_merged_subset_of_immutable_set_is_noop() {
        let current = json!([{"id": 1, "members": ["a", "b"]}]);
        let result = reconcile(
            &pools(),
            &json!([{"id": 1, "members": ["a"]}]),
            &current,
            ConvergenceMode::Merged,
        )
        .unwrap();
        assert!(!result.changed, "{:?}", ops(&result));
        assert!(result.warnings.is_empty());
        assert_eq!(result.after, current);

        // a member the device lacks still needs the pool rebuilt
        let result = reconcile(
            &pools(),
            &json!([{"id": 1, "members": ["c"]}]),
            &current,
            ConvergenceMode::Merged,
        )
        .unwrap();
        assert_eq!(
            ops(&result),
            vec!["REMOVE pools[id=1]", "ADD pools[id=1] {members=[\"a\",\"b\",\"c\"]}"]
        );
        assert_eq!(result.after, json!([{"id": 1, "members": ["a", "b", "c"]}]));
    }
}
