//! Scanner behavior against an in-memory catalog and invoker.
//!
//! These tests exercise the orchestration contract without any network:
//! outcome classification flows through unchanged, faults stay contained to
//! their (region, operation) pair, and concurrency is a performance knob
//! with no effect on results.

use std::{
    future::Future,
    sync::{Arc, Mutex},
};

use cloudprivs::{
    catalog::{CatalogSource, DiscoveryError, ServiceDescriptor},
    invoker::{ErrorDetail, InvocationRequest, InvocationResult, OperationInvoker, Outcome},
    rules::{RuleDocument, RuleSet},
    safety::SafetyFilter,
    scanner::{ScanOptions, ScanReport, Scanner},
};

struct StaticCatalog {
    services: Vec<ServiceDescriptor>,
    /// Ids listed by the catalog but failing discovery.
    broken: Vec<String>,
}

impl StaticCatalog {
    fn new(services: Vec<ServiceDescriptor>) -> Self {
        Self { services, broken: Vec::new() }
    }
}

impl CatalogSource for StaticCatalog {
    fn service_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.services.iter().map(|s| s.service.clone()).collect();
        ids.extend(self.broken.iter().cloned());
        ids
    }

    fn describe(&self, service: &str) -> Result<ServiceDescriptor, DiscoveryError> {
        self.services
            .iter()
            .find(|s| s.service == service)
            .cloned()
            .ok_or_else(|| DiscoveryError::UnknownService(service.to_string()))
    }
}

/// Classifies deterministically from the operation name and records every
/// request it sees.
#[derive(Default)]
struct MockInvoker {
    seen: Mutex<Vec<InvocationRequest>>,
}

impl MockInvoker {
    fn seen_operations(&self) -> Vec<String> {
        self.seen.lock().unwrap().iter().map(|r| r.operation.clone()).collect()
    }
}

impl OperationInvoker for MockInvoker {
    fn invoke(&self, request: InvocationRequest) -> impl Future<Output = InvocationResult> + Send {
        self.seen.lock().unwrap().push(request.clone());
        async move {
            if request.operation == "panic_op" {
                panic!("simulated invoker bug");
            }
            if request.operation.starts_with("denied_") {
                InvocationResult::denied(
                    &request.operation,
                    &request.region,
                    ErrorDetail::new(Some("AccessDenied".into()), "not authorized"),
                )
            } else if request.operation.starts_with("fail_") {
                InvocationResult::errored(
                    &request.operation,
                    &request.region,
                    ErrorDetail::message_only("simulated network error"),
                )
            } else {
                InvocationResult::allowed(&request.operation, &request.region, None)
            }
        }
    }
}

fn strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn demo_descriptor() -> ServiceDescriptor {
    ServiceDescriptor::new(
        "demo",
        strings(&["us-east-1", "eu-west-1"]),
        strings(&["list_things", "describe_thing", "open_account"]),
    )
}

fn options(jobs: usize) -> ScanOptions {
    ScanOptions { jobs, ..ScanOptions::default() }
}

fn classification_multiset(reports: &[ScanReport]) -> Vec<(String, String, String, Outcome)> {
    let mut entries: Vec<_> = reports
        .iter()
        .flat_map(|report| {
            report.regions.iter().flat_map(|(region, results)| {
                results.iter().map(|r| {
                    (report.service.clone(), region.clone(), r.operation.clone(), r.outcome)
                })
            })
        })
        .collect();
    entries.sort();
    entries
}

#[tokio::test]
async fn demo_scenario_classifies_and_skips() {
    let invoker = Arc::new(MockInvoker::default());
    let scanner = Scanner::new(
        StaticCatalog::new(vec![demo_descriptor()]),
        Arc::clone(&invoker),
        RuleSet::default(),
        SafetyFilter::default(),
        options(4),
    );

    let reports = scanner.run().await.unwrap();
    assert_eq!(reports.len(), 1);
    let report = &reports[0];
    assert_eq!(report.service, "demo");

    for region in ["us-east-1", "eu-west-1"] {
        let results = &report.regions[region];
        assert_eq!(results.len(), 3);
        for result in results {
            match result.operation.as_str() {
                "open_account" => assert_eq!(result.outcome, Outcome::Skipped),
                _ => assert_eq!(result.outcome, Outcome::Allowed),
            }
        }
    }

    // The deny-listed operation never reached the invoker, and with no rules
    // every call went out with no arguments.
    let seen = invoker.seen.lock().unwrap();
    assert_eq!(seen.len(), 4);
    assert!(seen.iter().all(|r| r.operation != "open_account"));
    assert!(seen.iter().all(|r| r.arguments.is_empty()));
}

#[tokio::test]
async fn region_filter_restricts_results() {
    let scanner = Scanner::new(
        StaticCatalog::new(vec![demo_descriptor()]),
        Arc::new(MockInvoker::default()),
        RuleSet::default(),
        SafetyFilter::default(),
        ScanOptions { region_filters: strings(&["us"]), ..options(4) },
    );

    let reports = scanner.run().await.unwrap();
    let regions: Vec<&str> = reports[0].tested_regions().collect();
    assert_eq!(regions, vec!["us-east-1"]);
}

#[tokio::test]
async fn one_failing_invocation_does_not_abort_siblings() {
    let descriptor = ServiceDescriptor::new(
        "flaky",
        strings(&["us-east-1"]),
        strings(&["list_a", "fail_network", "list_b", "denied_write"]),
    );
    let scanner = Scanner::new(
        StaticCatalog::new(vec![descriptor]),
        Arc::new(MockInvoker::default()),
        RuleSet::default(),
        SafetyFilter::default(),
        options(4),
    );

    let reports = scanner.run().await.unwrap();
    let results = &reports[0].regions["us-east-1"];
    assert_eq!(results.len(), 4);

    let outcome_of = |op: &str| results.iter().find(|r| r.operation == op).unwrap().outcome;
    assert_eq!(outcome_of("fail_network"), Outcome::Errored);
    assert_eq!(outcome_of("denied_write"), Outcome::Denied);
    assert_eq!(outcome_of("list_a"), Outcome::Allowed);
    assert_eq!(outcome_of("list_b"), Outcome::Allowed);
}

#[tokio::test]
async fn panicking_task_is_contained_as_errored() {
    let descriptor = ServiceDescriptor::new(
        "buggy",
        strings(&["us-east-1"]),
        strings(&["list_a", "panic_op"]),
    );
    let scanner = Scanner::new(
        StaticCatalog::new(vec![descriptor]),
        Arc::new(MockInvoker::default()),
        RuleSet::default(),
        SafetyFilter::default(),
        options(2),
    );

    let reports = scanner.run().await.unwrap();
    let results = &reports[0].regions["us-east-1"];
    let outcome_of = |op: &str| results.iter().find(|r| r.operation == op).unwrap();

    let panicked = outcome_of("panic_op");
    assert_eq!(panicked.outcome, Outcome::Errored);
    assert!(panicked.error.as_ref().unwrap().message.contains("invocation task failed"));
    assert_eq!(outcome_of("list_a").outcome, Outcome::Allowed);
}

#[tokio::test]
async fn sequential_and_concurrent_runs_classify_identically() {
    let services = vec![
        demo_descriptor(),
        ServiceDescriptor::new(
            "mixed",
            strings(&["us-east-1", "us-west-2", "eu-west-1"]),
            strings(&["list_a", "denied_b", "fail_c", "purchase_thing", "get_d"]),
        ),
    ];

    let sequential = Scanner::new(
        StaticCatalog::new(services.clone()),
        Arc::new(MockInvoker::default()),
        RuleSet::default(),
        SafetyFilter::default(),
        options(1),
    )
    .run()
    .await
    .unwrap();

    let concurrent = Scanner::new(
        StaticCatalog::new(services),
        Arc::new(MockInvoker::default()),
        RuleSet::default(),
        SafetyFilter::default(),
        options(8),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(classification_multiset(&sequential), classification_multiset(&concurrent));
}

#[tokio::test]
async fn report_operations_come_from_the_descriptor() {
    let descriptor = demo_descriptor();
    let scanner = Scanner::new(
        StaticCatalog::new(vec![descriptor.clone()]),
        Arc::new(MockInvoker::default()),
        RuleSet::default(),
        SafetyFilter::default(),
        options(4),
    );

    let reports = scanner.run().await.unwrap();
    for result in reports[0].regions.values().flatten() {
        assert!(descriptor.has_operation(&result.operation));
    }
}

#[tokio::test]
async fn resolved_rule_arguments_reach_the_invoker() {
    let document: RuleDocument = serde_yaml::from_str(
        "demo:\n  - pattern: describe_\n    kwargs:\n      MaxResults: 5\n",
    )
    .unwrap();
    let mut rules = RuleSet::default();
    rules.merge(document);

    let invoker = Arc::new(MockInvoker::default());
    let scanner = Scanner::new(
        StaticCatalog::new(vec![demo_descriptor()]),
        Arc::clone(&invoker),
        rules,
        SafetyFilter::default(),
        options(4),
    );
    scanner.run().await.unwrap();

    let seen = invoker.seen.lock().unwrap();
    for request in seen.iter() {
        if request.operation == "describe_thing" {
            assert_eq!(request.arguments.named.get("MaxResults"), Some(&serde_json::json!(5)));
        } else {
            assert!(request.arguments.is_empty());
        }
    }
}

#[tokio::test]
async fn broken_service_is_skipped_without_aborting_the_run() {
    let mut catalog = StaticCatalog::new(vec![demo_descriptor()]);
    catalog.broken.push("ghost".to_string());

    let invoker = Arc::new(MockInvoker::default());
    let scanner = Scanner::new(
        catalog,
        Arc::clone(&invoker),
        RuleSet::default(),
        SafetyFilter::default(),
        options(4),
    );

    let reports = scanner.run().await.unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].service, "demo");
    assert!(!invoker.seen_operations().is_empty());
}

#[tokio::test]
async fn cancelled_scan_dispatches_nothing_new() {
    let invoker = Arc::new(MockInvoker::default());
    let scanner = Scanner::new(
        StaticCatalog::new(vec![demo_descriptor()]),
        Arc::clone(&invoker),
        RuleSet::default(),
        SafetyFilter::default(),
        options(4),
    );

    scanner.cancel_flag().store(true, std::sync::atomic::Ordering::Relaxed);
    let reports = scanner.run().await.unwrap();
    assert!(reports.is_empty());
    assert!(invoker.seen_operations().is_empty());
}

#[tokio::test]
async fn service_subset_limits_the_scan() {
    let services = vec![
        demo_descriptor(),
        ServiceDescriptor::new("other", strings(&["us-east-1"]), strings(&["list_x"])),
    ];
    let scanner = Scanner::new(
        StaticCatalog::new(services),
        Arc::new(MockInvoker::default()),
        RuleSet::default(),
        SafetyFilter::default(),
        ScanOptions { service_subset: strings(&["other"]), ..options(4) },
    );

    let reports = scanner.run().await.unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].service, "other");
}
