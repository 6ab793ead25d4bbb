//! Service catalog discovery.
//!
//! A [`CatalogSource`] answers "which services exist, and for each one, which
//! regions and operations" purely from local metadata. Implementations must
//! never touch the network; discovery failures are scoped to the single
//! service that caused them and reported as [`DiscoveryError`].

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Unknown service: `{0}`")]
    UnknownService(String),

    #[error("Malformed catalog metadata for `{service}`: {reason}")]
    MalformedMetadata { service: String, reason: String },
}

/// Immutable description of one service: the regions it is deployable in and
/// the operations it exposes. Created once per scan run and read-only
/// afterwards.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ServiceDescriptor {
    pub service: String,
    pub regions: Vec<String>,
    pub operations: Vec<String>,
}

impl ServiceDescriptor {
    pub fn new<S, R, O>(service: S, regions: R, operations: O) -> Self
    where
        S: Into<String>,
        R: IntoIterator<Item = String>,
        O: IntoIterator<Item = String>,
    {
        let mut regions: Vec<String> = regions.into_iter().collect();
        regions.sort_unstable();
        regions.dedup();
        let mut operations: Vec<String> = operations.into_iter().collect();
        operations.sort_unstable();
        operations.dedup();
        Self { service: service.into(), regions, operations }
    }

    pub fn has_operation(&self, operation: &str) -> bool {
        self.operations.iter().any(|op| op == operation)
    }
}

/// A local, network-free source of service metadata.
pub trait CatalogSource {
    /// Every service identifier known to this catalog.
    fn service_ids(&self) -> Vec<String>;

    /// Regions and operations for one service.
    fn describe(&self, service: &str) -> Result<ServiceDescriptor, DiscoveryError>;
}

/// Retains a region iff it contains any filter entry as a substring, so a
/// coarse filter like "us" matches "us-east-1" and "us-west-2". An empty
/// filter retains everything.
pub fn filter_regions(regions: &[String], filters: &[String]) -> Vec<String> {
    if filters.is_empty() {
        return regions.to_vec();
    }
    regions
        .iter()
        .filter(|region| filters.iter().any(|filter| region.contains(filter.as_str())))
        .cloned()
        .collect()
}

/// Restricts discovered services to an explicit subset; an empty subset
/// retains everything. Matching is by exact identifier.
pub fn filter_services(services: Vec<String>, subset: &[String]) -> Vec<String> {
    if subset.is_empty() {
        return services;
    }
    services.into_iter().filter(|service| subset.iter().any(|s| s == service)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regions(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_filter_retains_all_regions() {
        let all = regions(&["us-east-1", "eu-west-1", "ap-south-1"]);
        assert_eq!(filter_regions(&all, &[]), all);
    }

    #[test]
    fn filter_is_substring_match_not_exact() {
        let all = regions(&["us-east-1", "us-west-2", "eu-west-1", "ap-south-1"]);
        let filtered = filter_regions(&all, &regions(&["us"]));
        assert_eq!(filtered, regions(&["us-east-1", "us-west-2"]));
    }

    #[test]
    fn filter_retains_union_of_matches() {
        let all = regions(&["us-east-1", "eu-west-1", "eu-north-1", "sa-east-1"]);
        let filtered = filter_regions(&all, &regions(&["us", "eu-west"]));
        assert_eq!(filtered, regions(&["us-east-1", "eu-west-1"]));
    }

    #[test]
    fn filter_can_exclude_everything() {
        let all = regions(&["us-east-1", "us-west-2"]);
        assert!(filter_regions(&all, &regions(&["cn-north"])).is_empty());
    }

    #[test]
    fn service_subset_is_exact_match() {
        let all = regions(&["ec2", "iam", "sts"]);
        assert_eq!(filter_services(all.clone(), &regions(&["iam"])), regions(&["iam"]));
        assert_eq!(filter_services(all.clone(), &regions(&["ia"])), Vec::<String>::new());
        assert_eq!(filter_services(all.clone(), &[]), all);
    }

    #[test]
    fn descriptor_sorts_and_dedups() {
        let descriptor = ServiceDescriptor::new(
            "demo",
            regions(&["us-east-1", "eu-west-1", "us-east-1"]),
            regions(&["list_things", "describe_thing"]),
        );
        assert_eq!(descriptor.regions, regions(&["eu-west-1", "us-east-1"]));
        assert_eq!(descriptor.operations, regions(&["describe_thing", "list_things"]));
        assert!(descriptor.has_operation("list_things"));
        assert!(!descriptor.has_operation("open_account"));
    }
}
