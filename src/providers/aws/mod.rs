//! AWS provider: session acquisition, catalog and the live invoker.

pub mod metadata;
pub mod signing;
pub mod wire;

use std::{collections::BTreeMap, future::Future, time::Duration};

use anyhow::{anyhow, Context, Result};
use aws_config::{BehaviorVersion, SdkConfig};
use aws_credential_types::{provider::ProvideCredentials, Credentials};
use chrono::Utc;
use tokio::time::timeout;
use tracing::debug;

use crate::{
    catalog::{CatalogSource, DiscoveryError, ServiceDescriptor},
    invoker::{ErrorDetail, InvocationRequest, InvocationResult, OperationInvoker},
};

use metadata::{AwsCatalog, ServiceMetadata, WireProtocol};

const USER_AGENT: &str = concat!("cloudprivs/", env!("CARGO_PKG_VERSION"));

/// Keep at most this much of a successful response body around for display.
const MAX_PAYLOAD_CHARS: usize = 2048;

const PREFLIGHT_TIMEOUT: Duration = Duration::from_secs(10);

/// Loads AWS configuration from the default chain, or from a named profile.
/// Credential material itself is never inspected here.
pub async fn load_session(profile: Option<&str>) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(name) = profile {
        loader = loader.profile_name(name);
    }
    loader.load().await
}

/// Confirms the session is usable with one `sts:GetCallerIdentity` call and
/// returns the caller ARN. Failure here is the one fatal configuration error
/// of a run: without working credentials there is nothing to scan.
pub async fn validate_credentials(config: &SdkConfig) -> Result<String> {
    let sts = aws_sdk_sts::Client::new(config);
    let identity = timeout(PREFLIGHT_TIMEOUT, sts.get_caller_identity().send())
        .await
        .context("Timed out contacting STS")?
        .context("Unable to contact AWS with these credentials")?;
    Ok(identity.arn().unwrap_or("unknown").to_string())
}

/// Live AWS implementation of both scanner seams: the embedded catalog for
/// discovery and a SigV4-signed HTTP client for invocation.
pub struct AwsProvider {
    catalog: AwsCatalog,
    credentials: Credentials,
    http: reqwest::Client,
}

impl AwsProvider {
    pub async fn new(config: &SdkConfig, call_timeout: Duration) -> Result<Self> {
        let provider = config
            .credentials_provider()
            .ok_or_else(|| anyhow!("No credentials provider in the AWS configuration"))?;
        let credentials =
            provider.provide_credentials().await.context("Failed to resolve AWS credentials")?;

        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(call_timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { catalog: AwsCatalog::embedded()?, credentials, http })
    }

    async fn dispatch(&self, request: &InvocationRequest) -> InvocationResult {
        let metadata = match self.catalog.service(&request.service) {
            Ok(metadata) => metadata,
            Err(err) => {
                return InvocationResult::errored(
                    &request.operation,
                    &request.region,
                    ErrorDetail::message_only(err.to_string()),
                )
            }
        };

        // The wire has no positional notion; refusing locally is an argument
        // validation failure, not an authorization signal.
        if !request.arguments.positional.is_empty() {
            return InvocationResult::errored(
                &request.operation,
                &request.region,
                ErrorDetail::message_only(
                    "positional arguments are not supported for AWS operations; use named arguments",
                ),
            );
        }

        let body = match self.build_request(metadata, request) {
            Ok(body) => body,
            Err(err) => {
                return InvocationResult::errored(
                    &request.operation,
                    &request.region,
                    ErrorDetail::message_only(err.to_string()),
                )
            }
        };
        self.send(metadata, request, body).await
    }

    fn build_request(
        &self,
        metadata: &ServiceMetadata,
        request: &InvocationRequest,
    ) -> Result<RequestBody> {
        let wire_name = metadata.wire_name(&request.operation);
        match metadata.protocol {
            WireProtocol::Query => {
                let params = wire::flatten_query_params(
                    &wire_name,
                    &metadata.api_version,
                    &request.arguments.named,
                );
                Ok(RequestBody {
                    content_type: "application/x-www-form-urlencoded; charset=utf-8".to_string(),
                    target: None,
                    body: wire::form_urlencode(&params),
                })
            }
            WireProtocol::Json => {
                let prefix = metadata.target_prefix.as_deref().ok_or_else(|| {
                    anyhow!("service `{}` is missing a target prefix", request.service)
                })?;
                let version = metadata.json_version.as_deref().unwrap_or("1.1");
                Ok(RequestBody {
                    content_type: format!("application/x-amz-json-{version}"),
                    target: Some(format!("{prefix}.{wire_name}")),
                    body: wire::json_body(&request.arguments.named),
                })
            }
        }
    }

    async fn send(
        &self,
        metadata: &ServiceMetadata,
        request: &InvocationRequest,
        payload: RequestBody,
    ) -> InvocationResult {
        let endpoint = metadata.endpoint_for(&request.region);

        let mut headers = BTreeMap::new();
        headers.insert("host".to_string(), host_of(&endpoint).to_string());
        headers.insert("content-type".to_string(), payload.content_type.clone());
        if let Some(target) = &payload.target {
            headers.insert("x-amz-target".to_string(), target.clone());
        }

        let ctx = signing::SigningContext {
            access_key_id: self.credentials.access_key_id(),
            secret_access_key: self.credentials.secret_access_key(),
            session_token: self.credentials.session_token(),
            region: metadata.signing_region(&request.region),
            service: &metadata.signing_name,
        };
        let signed = signing::sign_request(&ctx, "POST", &endpoint, &headers, &payload.body, Utc::now());

        let mut builder = self.http.post(&endpoint);
        for (name, value) in &signed {
            builder = builder.header(name.as_str(), value.as_str());
        }

        debug!(
            service = %request.service,
            region = %request.region,
            operation = %request.operation,
            "invoking"
        );

        let response = match builder.body(payload.body).send().await {
            Ok(response) => response,
            Err(err) => {
                let kind = if err.is_timeout() { "timeout" } else { "connection error" };
                return InvocationResult::errored(
                    &request.operation,
                    &request.region,
                    ErrorDetail::message_only(format!("{kind}: {err}")),
                );
            }
        };

        let status = response.status().as_u16();
        // JSON-protocol services may only put the code in this header.
        let header_code = response
            .headers()
            .get("x-amzn-errortype")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(':').next())
            .map(str::to_string);

        let text = match response.text().await {
            Ok(text) => text,
            Err(err) => {
                return InvocationResult::errored(
                    &request.operation,
                    &request.region,
                    ErrorDetail::message_only(format!("failed to read response body: {err}")),
                )
            }
        };

        if (200..300).contains(&status) {
            return InvocationResult::allowed(
                &request.operation,
                &request.region,
                Some(truncate_chars(&text, MAX_PAYLOAD_CHARS)),
            );
        }

        let mut error = wire::parse_error_body(status, &text);
        if error.code.is_none() {
            error.code = header_code;
        }
        let (outcome, detail) = wire::classify(error);
        InvocationResult {
            operation: request.operation.clone(),
            region: request.region.clone(),
            outcome,
            error: Some(detail),
            payload: None,
        }
    }
}

struct RequestBody {
    content_type: String,
    target: Option<String>,
    body: String,
}

fn host_of(endpoint: &str) -> &str {
    let without_scheme = endpoint.splitn(2, "://").nth(1).unwrap_or(endpoint);
    without_scheme.split('/').next().unwrap_or(without_scheme)
}

fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

impl CatalogSource for AwsProvider {
    fn service_ids(&self) -> Vec<String> {
        self.catalog.service_ids()
    }

    fn describe(&self, service: &str) -> Result<ServiceDescriptor, DiscoveryError> {
        self.catalog.describe(service)
    }
}

impl OperationInvoker for AwsProvider {
    fn invoke(&self, request: InvocationRequest) -> impl Future<Output = InvocationResult> + Send {
        async move { self.dispatch(&request).await }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_extraction() {
        assert_eq!(host_of("https://iam.amazonaws.com/"), "iam.amazonaws.com");
        assert_eq!(host_of("https://ec2.us-east-1.amazonaws.com/"), "ec2.us-east-1.amazonaws.com");
        assert_eq!(host_of("ec2.us-east-1.amazonaws.com"), "ec2.us-east-1.amazonaws.com");
    }

    #[test]
    fn payload_truncation_is_char_safe() {
        assert_eq!(truncate_chars("héllo", 3), "hél");
        assert_eq!(truncate_chars("ok", 10), "ok");
    }
}
