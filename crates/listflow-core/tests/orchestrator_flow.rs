mod common;

use common::{echo, test_registry, workflow};
use listflow_core::constants::ENGINE_VERSION;
use listflow_core::engine::ExecutionPolicy;
use listflow_core::hashing::hash_value;
use listflow_core::step::{Precondition, SkipReason};
use listflow_core::{
    ContractValidator, FailureClass, HaltReason, OnError, OrchestratorPolicy, RuleEngine, RunEventKind, StepDefinition,
    RunOptions, StepOutcome, WorkflowOrchestrator,
};
use serde_json::json;

fn rules() -> RuleEngine {
    RuleEngine::from_document(&json!({
        "rulesets": {
            "high_score": {"logic": {"conditions": {"all": [
                {"fact": "analyze.score", "operator": "greaterThan", "value": 70}
            ]}}}
        }
    })).unwrap()
}

#[test]
fn runs_steps_in_order_and_resolves_refs() {
    let wf = workflow(vec![echo("analyze", json!({"score": 80, "top": ["mug", "cup"]})),
                           echo("title", json!({"from": {"$ref": "context.analyze.top.1"}}))]);
    let orch = WorkflowOrchestrator::builder(wf).registry(test_registry()).build().unwrap();
    let report = orch.run().unwrap();
    assert!(report.is_completed());
    assert_eq!(report.executed(), vec!["analyze", "title"]);
    assert_eq!(report.context["title"], json!({"from": "cup"}));
    assert!(report.run_fingerprint.is_some());
    assert_eq!(orch.last_context().get_path("analyze.score"), Some(&json!(80)));
}

#[test]
fn rule_gate_skips_low_score() {
    for (score, expect_run) in [(80, true), (50, false)] {
        let wf = workflow(vec![echo("analyze", json!({"score": score})),
                               echo("gated", json!({"ok": true})).with_ruleset("high_score")]);
        let orch = WorkflowOrchestrator::builder(wf).registry(test_registry()).rules(rules()).build().unwrap();
        let report = orch.run().unwrap();
        assert!(report.is_completed());
        assert_eq!(report.context.get("gated").is_some(), expect_run, "score {score}");
        if !expect_run {
            assert_eq!(report.outcomes[1],
                       StepOutcome::Skipped { step_id: "gated".into(),
                                              reason:  SkipReason::Ruleset("high_score".into()) });
        }
    }
}

#[test]
fn precondition_skips_when_path_missing() {
    let wf = workflow(vec![echo("needs", json!(1)).with_precondition(Precondition::exists("market.top")),
                           echo("after", json!(2))]);
    let orch = WorkflowOrchestrator::builder(wf).registry(test_registry()).build().unwrap();
    let report = orch.run().unwrap();
    assert_eq!(report.skipped(), vec!["needs"]);
    assert_eq!(report.executed(), vec!["after"]);
}

#[test]
fn stop_policy_halts_and_fail_soft_continues() {
    let wf = workflow(vec![StepDefinition::new("bad", "fail").with_context_key("bad"), echo("next", json!(1))]);
    let orch = WorkflowOrchestrator::builder(wf.clone()).registry(test_registry()).build().unwrap();
    let report = orch.run().unwrap();
    assert!(matches!(report.halt_reason(),
                     Some(HaltReason::StepFailed { step_id, class: FailureClass::HandlerFault, .. }) if step_id == "bad"));
    assert!(report.executed().is_empty());

    let lenient = OrchestratorPolicy { execution: ExecutionPolicy { stop_on_error: false,
                                                                    ..ExecutionPolicy::default() },
                                       ..OrchestratorPolicy::default() };
    let orch = WorkflowOrchestrator::builder(wf).registry(test_registry()).policy(lenient).build().unwrap();
    let report = orch.run().unwrap();
    assert!(report.is_completed());
    assert_eq!(report.failed(), vec!["bad"]);
    assert_eq!(report.executed(), vec!["next"]);
    assert!(report.context.get("bad").is_none());
}

#[test]
fn step_on_error_overrides_global_policy() {
    let wf = workflow(vec![StepDefinition::new("bad", "fail").with_on_error(OnError::FailSoft), echo("next", json!(1))]);
    let orch = WorkflowOrchestrator::builder(wf).registry(test_registry()).build().unwrap();
    assert!(orch.run().unwrap().is_completed());
}

#[test]
fn fallback_routes_to_named_step() {
    let wf = workflow(vec![StepDefinition::new("primary", "fail").with_on_error(OnError::FallbackNext("recover".into())),
                           echo("skipped_over", json!(0)),
                           echo("recover", json!({"recovered": true}))]);
    let orch = WorkflowOrchestrator::builder(wf).registry(test_registry()).build().unwrap();
    let report = orch.run().unwrap();
    assert!(report.is_completed());
    assert_eq!(report.executed(), vec!["recover"]);
    assert!(report.context.get("skipped_over").is_none());

    let events = orch.events(report.run_id);
    assert!(events.iter().any(|e| matches!(&e.kind,
        RunEventKind::FallbackRouted { from_step, to_step } if from_step == "primary" && to_step == "recover")));
}

#[test]
fn fallback_loop_is_bounded() {
    let wf = workflow(vec![StepDefinition::new("loop", "fail").with_on_error(OnError::FallbackNext("loop".into()))]);
    let policy = OrchestratorPolicy { execution: ExecutionPolicy { max_fallback_jumps: 3,
                                                                   ..ExecutionPolicy::default() },
                                      ..OrchestratorPolicy::default() };
    let orch = WorkflowOrchestrator::builder(wf).registry(test_registry()).policy(policy).build().unwrap();
    let report = orch.run().unwrap();
    assert_eq!(report.halt_reason(), Some(&HaltReason::FallbackLimit { limit: 3 }));
    assert_eq!(report.failed().len(), 4);
}

#[test]
fn missing_handler_and_panics_are_step_failures() {
    let wf = workflow(vec![StepDefinition::new("ghost", "not_registered").with_on_error(OnError::FailSoft),
                           StepDefinition::new("boom", "panic").with_on_error(OnError::FailSoft),
                           echo("last", json!(1))]);
    let orch = WorkflowOrchestrator::builder(wf).registry(test_registry()).build().unwrap();
    let report = orch.run().unwrap();
    assert!(report.is_completed());
    match &report.outcomes[0] {
        StepOutcome::Failed { class, .. } => assert_eq!(*class, FailureClass::MissingHandler),
        other => panic!("unexpected outcome {other:?}"),
    }
    match &report.outcomes[1] {
        StepOutcome::Failed { class, error, .. } => {
            assert_eq!(*class, FailureClass::HandlerFault);
            assert!(error.contains("kaboom"));
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(orch.session().run_flag(), listflow_core::RunFlag::Idle);
}

#[test]
fn contract_violation_uses_its_own_policy_flag() {
    let contracts = ContractValidator::from_document(&json!({"contracts": {"Obj": {"type": "object"}}})).unwrap();
    let wf = workflow(vec![StepDefinition::new("draft", "text").with_context_key("draft").with_contract("Obj"),
                           echo("next", json!(1))]);
    let policy = OrchestratorPolicy { execution: ExecutionPolicy { stop_on_error: false,
                                                                   ..ExecutionPolicy::default() },
                                      ..OrchestratorPolicy::default() };
    let orch = WorkflowOrchestrator::builder(wf).registry(test_registry())
                                                .contracts(contracts)
                                                .policy(policy)
                                                .build()
                                                .unwrap();
    let report = orch.run().unwrap();
    match report.halt_reason() {
        Some(HaltReason::StepFailed { class, error, .. }) => {
            assert_eq!(*class, FailureClass::ContractViolation);
            assert!(error.contains("$: expected object, found string"));
        }
        other => panic!("unexpected halt {other:?}"),
    }
    assert!(report.context.get("draft").is_none());
}

#[test]
fn event_log_shape_and_fingerprint_determinism() {
    let wf = workflow(vec![echo("a", json!({"x": 1})), echo("b", json!({"y": 2}))]);
    let orch = WorkflowOrchestrator::builder(wf).registry(test_registry()).build().unwrap();
    let first = orch.run().unwrap();
    // la segunda corrida arranca de cero sobre un run-state más grande
    let second = orch.run_with(RunOptions::fresh_reset()).unwrap();
    assert!(second.is_completed(), "{:?}", second.status);
    assert_ne!(first.run_id, second.run_id);
    assert_eq!(first.run_fingerprint, second.run_fingerprint);

    let outputs: Vec<String> = first.outcomes
                                    .iter()
                                    .filter_map(|o| match o {
                                        StepOutcome::Completed { output_hash, .. } => Some(output_hash.clone()),
                                        _ => None,
                                    })
                                    .collect();
    let expected = hash_value(&json!({"definition_hash": orch.definition_hash(),
                                      "engine_version": ENGINE_VERSION,
                                      "outputs": outputs}));
    assert_eq!(first.run_fingerprint.as_deref(), Some(expected.as_str()));

    let events = orch.events(first.run_id);
    assert!(matches!(events.first().map(|e| &e.kind), Some(RunEventKind::RunStarted { step_count: 2, .. })));
    assert!(matches!(events.last().map(|e| &e.kind), Some(RunEventKind::RunCompleted { .. })));
    let finished = events.iter().filter(|e| matches!(e.kind, RunEventKind::StepFinished { .. })).count();
    assert_eq!(finished, 2);
    assert!(events.windows(2).all(|w| w[0].seq + 1 == w[1].seq));
}
