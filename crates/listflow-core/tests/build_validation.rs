mod common;

use common::{echo, test_registry, workflow};
use listflow_core::{
    ContractValidator, CoreEngineError, OnError, ProfileManager, RuleEngine, StepDefinition, WorkflowOrchestrator,
};
use serde_json::json;

fn build_err(steps: Vec<StepDefinition>) -> CoreEngineError {
    match WorkflowOrchestrator::builder(workflow(steps)).registry(test_registry()).build() {
        Ok(_) => panic!("expected a configuration error"),
        Err(e) => e,
    }
}

#[test]
fn duplicate_and_empty_ids_are_rejected() {
    assert!(matches!(build_err(vec![echo("a", json!(1)), echo("a", json!(2))]), CoreEngineError::Config(m) if m.contains("duplicate")));
    assert!(matches!(build_err(vec![echo(" ", json!(1))]), CoreEngineError::Config(_)));
}

#[test]
fn unknown_references_are_rejected() {
    assert!(matches!(build_err(vec![echo("a", json!(1)).with_ruleset("nope")]), CoreEngineError::Config(m) if m.contains("ruleset")));
    assert!(matches!(build_err(vec![echo("a", json!(1)).with_contract("nope")]), CoreEngineError::Config(m) if m.contains("contract")));
    assert!(matches!(build_err(vec![echo("a", json!({"$profile": "nope"}))]), CoreEngineError::Config(m) if m.contains("profile")));
    assert!(matches!(build_err(vec![echo("a", json!(1)).with_on_error(OnError::FallbackNext("nowhere".into()))]),
                     CoreEngineError::Config(m) if m.contains("nowhere")));
}

#[test]
fn dangling_inherits_is_rejected() {
    let profiles = ProfileManager::from_document(&json!({"profiles": {"p": {"inherits": "missing"}}})).unwrap();
    let res = WorkflowOrchestrator::builder(workflow(vec![echo("a", json!(1))])).profiles(profiles).build();
    assert!(matches!(res, Err(CoreEngineError::Config(_))));
}

#[test]
fn fully_wired_config_builds() {
    let rules = RuleEngine::from_document(&json!({"rulesets": {"r": {"logic": {"conditions": {"all": []}}}}})).unwrap();
    let contracts = ContractValidator::from_document(&json!({"contracts": {"c": {"type": "object"}}})).unwrap();
    let profiles = ProfileManager::from_document(&json!({"profiles": {"base": {"a": 1}, "child": {"inherits": "base"}}})).unwrap();
    let steps = vec![echo("a", json!({"cfg": {"$profile": "child"}})).with_ruleset("r").with_contract("c"),
                     echo("b", json!(1)).with_on_error(OnError::FallbackNext("a".into()))];
    let orch = WorkflowOrchestrator::builder(workflow(steps)).registry(test_registry())
                                                             .rules(rules)
                                                             .contracts(contracts)
                                                             .profiles(profiles)
                                                             .build()
                                                             .unwrap();
    let report = orch.run().unwrap();
    assert_eq!(report.context["a"], json!({"cfg": {"a": 1}}));
}
