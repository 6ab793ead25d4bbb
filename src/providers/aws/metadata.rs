//! Embedded AWS service catalog.
//!
//! The universe of callable operations is data, not code: a JSON document
//! compiled into the binary describes each service's wire protocol, endpoint
//! layout, regions and operations. Parsing happens once at startup and the
//! resulting catalog is immutable; nothing here performs network I/O.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::catalog::{CatalogSource, DiscoveryError, ServiceDescriptor};

static CATALOG_JSON: &str = include_str!("../../../data/aws/services.json");

/// Pseudo-region reported for services with a single partition-wide endpoint.
pub const GLOBAL_PSEUDO_REGION: &str = "aws-global";

/// Region used to sign requests against global endpoints.
pub const GLOBAL_SIGNING_REGION: &str = "us-east-1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireProtocol {
    /// Form-encoded `Action`/`Version` POST, XML responses.
    Query,
    /// `X-Amz-Target` header with a JSON body.
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceMetadata {
    pub endpoint_prefix: String,
    pub signing_name: String,
    pub protocol: WireProtocol,
    pub api_version: String,
    /// Present for region-agnostic services such as IAM.
    #[serde(default)]
    pub global_endpoint: Option<String>,
    /// Target prefix for the json protocol, e.g. `DynamoDB_20120810`.
    #[serde(default)]
    pub target_prefix: Option<String>,
    /// `1.0` or `1.1`, selecting the `application/x-amz-json-*` content type.
    #[serde(default)]
    pub json_version: Option<String>,
    pub operations: Vec<String>,
    /// Wire names that cannot be derived by PascalCasing the operation name,
    /// e.g. `list_mfa_devices` -> `ListMFADevices`.
    #[serde(default)]
    pub wire_names: BTreeMap<String, String>,
    /// Explicit region list; absent means every partition region.
    #[serde(default)]
    pub regions: Option<Vec<String>>,
}

impl ServiceMetadata {
    pub fn is_global(&self) -> bool {
        self.global_endpoint.is_some()
    }

    /// Endpoint URL for one region.
    pub fn endpoint_for(&self, region: &str) -> String {
        match &self.global_endpoint {
            Some(host) => format!("https://{host}/"),
            None => format!("https://{}.{region}.amazonaws.com/", self.endpoint_prefix),
        }
    }

    /// The region name that goes into the signature. Global endpoints always
    /// sign against the partition's primary region.
    pub fn signing_region<'a>(&self, region: &'a str) -> &'a str {
        if self.is_global() || region == GLOBAL_PSEUDO_REGION {
            GLOBAL_SIGNING_REGION
        } else {
            region
        }
    }

    /// The API-level operation name for the wire, e.g. `DescribeInstances`.
    pub fn wire_name(&self, operation: &str) -> String {
        self.wire_names.get(operation).cloned().unwrap_or_else(|| pascal_case(operation))
    }
}

#[derive(Debug, Deserialize)]
struct CatalogData {
    partition_regions: Vec<String>,
    services: BTreeMap<String, ServiceMetadata>,
}

/// The parsed, immutable catalog.
#[derive(Debug)]
pub struct AwsCatalog {
    data: CatalogData,
}

impl AwsCatalog {
    /// Parses the catalog compiled into the binary.
    pub fn embedded() -> Result<Self> {
        let data: CatalogData =
            serde_json::from_str(CATALOG_JSON).context("Failed to parse embedded service catalog")?;
        Ok(Self { data })
    }

    pub fn service(&self, service: &str) -> Result<&ServiceMetadata, DiscoveryError> {
        self.data
            .services
            .get(service)
            .ok_or_else(|| DiscoveryError::UnknownService(service.to_string()))
    }

    fn regions_for(&self, metadata: &ServiceMetadata) -> Vec<String> {
        if metadata.is_global() {
            return vec![GLOBAL_PSEUDO_REGION.to_string()];
        }
        match &metadata.regions {
            Some(regions) => regions.clone(),
            None => self.data.partition_regions.clone(),
        }
    }
}

impl CatalogSource for AwsCatalog {
    fn service_ids(&self) -> Vec<String> {
        self.data.services.keys().cloned().collect()
    }

    fn describe(&self, service: &str) -> Result<ServiceDescriptor, DiscoveryError> {
        let metadata = self.service(service)?;
        if metadata.operations.is_empty() {
            return Err(DiscoveryError::MalformedMetadata {
                service: service.to_string(),
                reason: "no operations listed".to_string(),
            });
        }
        Ok(ServiceDescriptor::new(
            service,
            self.regions_for(metadata),
            metadata.operations.iter().cloned(),
        ))
    }
}

/// `describe_instances` -> `DescribeInstances`.
pub fn pascal_case(snake: &str) -> String {
    snake
        .split('_')
        .filter(|chunk| !chunk.is_empty())
        .map(|chunk| {
            let mut chars = chunk.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}
