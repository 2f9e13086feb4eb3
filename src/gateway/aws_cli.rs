//! Gateway implementation backed by the `aws` command line client.
//!
//! Each call runs `aws ec2 <operation> --region <region> --output json` and
//! decodes the JSON document it prints. Credentials, profiles, pagination and
//! request signing are handled by the CLI itself.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::process::Command;

use super::traits::{Gateway, GatewayError, SnapshotFilter, VolumeFilter};
use crate::domain::{BlockDevice, Instance, Snapshot, TagMap, Volume, VolumeState};

/// Default CLI binary name
const DEFAULT_BINARY: &str = "aws";

/// Default per-call timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Prefix of the CLI's provider error line
const ERROR_MARKER: &str = "An error occurred (";

/// Configuration for the CLI-backed gateway
#[derive(Debug, Clone)]
pub struct AwsCliConfig {
    pub binary: String,
    pub region: String,
    pub profile: Option<String>,
    pub timeout: Duration,
}

impl AwsCliConfig {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            binary: DEFAULT_BINARY.to_string(),
            region: region.into(),
            profile: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn profile(mut self, profile: Option<String>) -> Self {
        self.profile = profile;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Gateway that shells out to `aws ec2`.
pub struct AwsCliGateway {
    config: AwsCliConfig,
}

impl AwsCliGateway {
    pub fn new(config: AwsCliConfig) -> Self {
        Self { config }
    }

    pub fn region(&self) -> &str {
        &self.config.region
    }

    /// Full argument list for one operation, binary excluded.
    fn command_args(&self, operation: &str, args: &[String]) -> Vec<String> {
        let mut all = vec![
            "ec2".to_string(),
            operation.to_string(),
            "--region".to_string(),
            self.config.region.clone(),
            "--output".to_string(),
            "json".to_string(),
        ];
        if let Some(profile) = &self.config.profile {
            all.push("--profile".to_string());
            all.push(profile.clone());
        }
        all.extend(args.iter().cloned());
        all
    }

    /// Run one operation and return its stdout.
    async fn run(&self, operation: &str, args: &[String]) -> Result<String, GatewayError> {
        let all = self.command_args(operation, args);
        debug!("Running {} {}", self.config.binary, all.join(" "));

        let mut cmd = Command::new(&self.config.binary);
        cmd.args(&all).stdout(Stdio::piped()).stderr(Stdio::piped()).kill_on_drop(true);

        let child = cmd.spawn()?;
        let output = match tokio::time::timeout(self.config.timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => return Err(GatewayError::Timeout(self.config.timeout)),
        };

        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(parse_cli_error(&stderr).unwrap_or_else(|| {
            GatewayError::Command(format!(
                "{} {} exited with {:?}: {}",
                self.config.binary,
                operation,
                output.status.code(),
                stderr.trim()
            ))
        }))
    }

    async fn run_json<T: DeserializeOwned>(&self, operation: &str, args: &[String]) -> Result<T, GatewayError> {
        let stdout = self.run(operation, args).await?;
        if stdout.trim().is_empty() {
            return Err(GatewayError::InvalidResponse(format!("{} returned no output", operation)));
        }
        Ok(serde_json::from_str(&stdout)?)
    }
}

#[async_trait]
impl Gateway for AwsCliGateway {
    async fn list_instances(&self) -> Result<Vec<Instance>, GatewayError> {
        let response: DescribeInstancesOutput = self.run_json("describe-instances", &[]).await?;
        Ok(response
            .reservations
            .into_iter()
            .flat_map(|r| r.instances)
            .map(Instance::from)
            .collect())
    }

    async fn list_volumes(&self, filter: &VolumeFilter) -> Result<Vec<Volume>, GatewayError> {
        if matches!(filter, VolumeFilter::Ids(ids) if ids.is_empty()) {
            return Ok(Vec::new());
        }
        let response: DescribeVolumesOutput = self.run_json("describe-volumes", &volume_filter_args(filter)).await?;
        Ok(response.volumes.into_iter().map(Volume::from).collect())
    }

    async fn list_snapshots(&self, filter: &SnapshotFilter) -> Result<Vec<Snapshot>, GatewayError> {
        if matches!(filter, SnapshotFilter::VolumeIds(ids) if ids.is_empty()) {
            return Ok(Vec::new());
        }
        let response: DescribeSnapshotsOutput =
            self.run_json("describe-snapshots", &snapshot_filter_args(filter)).await?;
        Ok(response.snapshots.into_iter().map(Snapshot::from).collect())
    }

    async fn create_snapshot(&self, volume_id: &str, description: &str) -> Result<Snapshot, GatewayError> {
        let args = vec![
            "--volume-id".to_string(),
            volume_id.to_string(),
            "--description".to_string(),
            description.to_string(),
        ];
        let response: WireSnapshot = self.run_json("create-snapshot", &args).await?;
        Ok(response.into())
    }

    async fn tag_resource(&self, resource_id: &str, tags: &TagMap) -> Result<(), GatewayError> {
        let args = vec![
            "--resources".to_string(),
            resource_id.to_string(),
            "--tags".to_string(),
            tags_arg(tags)?,
        ];
        self.run("create-tags", &args).await?;
        Ok(())
    }

    async fn delete_snapshot(&self, snapshot_id: &str) -> Result<(), GatewayError> {
        let args = vec!["--snapshot-id".to_string(), snapshot_id.to_string()];
        self.run("delete-snapshot", &args).await?;
        Ok(())
    }
}

fn volume_filter_args(filter: &VolumeFilter) -> Vec<String> {
    match filter {
        VolumeFilter::All => Vec::new(),
        VolumeFilter::Ids(ids) => {
            let mut args = vec!["--volume-ids".to_string()];
            args.extend(ids.iter().cloned());
            args
        }
        VolumeFilter::State(state) => vec![
            "--filters".to_string(),
            filter_arg("status", &[state.as_str().to_string()]),
        ],
    }
}

fn snapshot_filter_args(filter: &SnapshotFilter) -> Vec<String> {
    match filter {
        SnapshotFilter::VolumeIds(ids) => vec!["--filters".to_string(), filter_arg("volume-id", ids)],
        SnapshotFilter::OwnedBySelf => vec!["--owner-ids".to_string(), "self".to_string()],
    }
}

/// JSON form of `--filters`, which survives commas and spaces in values.
fn filter_arg(name: &str, values: &[String]) -> String {
    serde_json::json!([{ "Name": name, "Values": values }]).to_string()
}

fn tags_arg(tags: &TagMap) -> Result<String, GatewayError> {
    let list: Vec<serde_json::Value> = tags
        .iter()
        .map(|(key, value)| serde_json::json!({ "Key": key, "Value": value }))
        .collect();
    Ok(serde_json::to_string(&list)?)
}

/// Recognise `An error occurred (Code) when calling the Op operation: message`.
pub(crate) fn parse_cli_error(stderr: &str) -> Option<GatewayError> {
    let start = stderr.find(ERROR_MARKER)? + ERROR_MARKER.len();
    let rest = &stderr[start..];
    let end = rest.find(')')?;
    let code = rest[..end].to_string();
    let tail = &rest[end + 1..];
    let message = match tail.find("operation: ") {
        Some(i) => tail[i + "operation: ".len()..].trim(),
        None => tail.trim(),
    };
    Some(GatewayError::Api {
        status: status_for_code(&code),
        code,
        message: message.to_string(),
    })
}

/// HTTP status EC2 answers with for `code`.
///
/// The CLI prints only the error code, so the status is recovered from the
/// codes EC2 documents as non-400. Every other client error is a 400.
pub(crate) fn status_for_code(code: &str) -> u16 {
    match code {
        "AuthFailure" => 401,
        "UnauthorizedOperation"
        | "Blocked"
        | "OptInRequired"
        | "SignatureDoesNotMatch"
        | "InvalidClientTokenId"
        | "MissingAuthenticationToken" => 403,
        "DryRunOperation" => 412,
        "InternalError" | "InternalFailure" => 500,
        "ServiceUnavailable" | "Unavailable" | "RequestLimitExceeded" => 503,
        _ => 400,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireTag {
    key: String,
    #[serde(default)]
    value: String,
}

fn tag_map(tags: Vec<WireTag>) -> TagMap {
    TagMap::from_pairs(tags.into_iter().map(|t| (t.key, t.value)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeInstancesOutput {
    #[serde(default)]
    reservations: Vec<WireReservation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireReservation {
    #[serde(default)]
    instances: Vec<WireInstance>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireInstance {
    instance_id: String,
    state: Option<WireInstanceState>,
    #[serde(default)]
    tags: Vec<WireTag>,
    #[serde(default)]
    block_device_mappings: Vec<WireBlockDeviceMapping>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireInstanceState {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireBlockDeviceMapping {
    device_name: String,
    ebs: Option<WireEbs>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireEbs {
    volume_id: String,
}

impl From<WireInstance> for Instance {
    fn from(wire: WireInstance) -> Self {
        Instance {
            id: wire.instance_id,
            state: wire.state.map(|s| s.name).unwrap_or_default(),
            tags: tag_map(wire.tags),
            // instance-store mappings carry no EBS volume
            block_devices: wire
                .block_device_mappings
                .into_iter()
                .filter_map(|m| {
                    m.ebs.map(|ebs| BlockDevice {
                        device_name: m.device_name,
                        volume_id: ebs.volume_id,
                    })
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeVolumesOutput {
    #[serde(default)]
    volumes: Vec<WireVolume>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireVolume {
    volume_id: String,
    state: String,
    #[serde(default)]
    tags: Vec<WireTag>,
}

impl From<WireVolume> for Volume {
    fn from(wire: WireVolume) -> Self {
        Volume {
            id: wire.volume_id,
            state: VolumeState::parse(&wire.state),
            tags: tag_map(wire.tags),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeSnapshotsOutput {
    #[serde(default)]
    snapshots: Vec<WireSnapshot>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireSnapshot {
    snapshot_id: String,
    #[serde(default)]
    volume_id: String,
    start_time: DateTime<Utc>,
    #[serde(default)]
    tags: Vec<WireTag>,
}

impl From<WireSnapshot> for Snapshot {
    fn from(wire: WireSnapshot) -> Self {
        Snapshot {
            id: wire.snapshot_id,
            volume_id: wire.volume_id,
            start_time: wire.start_time,
            tags: tag_map(wire.tags),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const INSTANCES_JSON: &str = r#"{
        "Reservations": [
            {
                "Instances": [
                    {
                        "InstanceId": "i-0abc",
                        "State": { "Code": 16, "Name": "running" },
                        "Tags": [ { "Key": "Name", "Value": "web-1" } ],
                        "BlockDeviceMappings": [
                            { "DeviceName": "/dev/xvda", "Ebs": { "VolumeId": "vol-1", "Status": "attached" } },
                            { "DeviceName": "/dev/sdb", "VirtualName": "ephemeral0" }
                        ]
                    }
                ]
            },
            { "Instances": [ { "InstanceId": "i-0def", "State": { "Name": "stopped" } } ] }
        ]
    }"#;

    fn gateway() -> AwsCliGateway {
        AwsCliGateway::new(AwsCliConfig::new("eu-west-1"))
    }

    #[test]
    fn test_decode_instances() {
        let output: DescribeInstancesOutput = serde_json::from_str(INSTANCES_JSON).unwrap();
        let instances: Vec<Instance> = output
            .reservations
            .into_iter()
            .flat_map(|r| r.instances)
            .map(Instance::from)
            .collect();

        assert_eq!(instances.len(), 2);
        assert_eq!(instances[0].state, "running");
        assert_eq!(instances[0].tags.name(), "web-1");
        assert_eq!(instances[0].block_devices.len(), 1);
        assert_eq!(instances[0].block_devices[0].volume_id, "vol-1");
        assert!(instances[1].block_devices.is_empty());
    }

    #[test]
    fn test_decode_volumes_with_duplicate_tags() {
        let json = r#"{ "Volumes": [ {
            "VolumeId": "vol-1", "State": "available", "Size": 8,
            "Tags": [ { "Key": "Backup", "Value": "false" }, { "Key": "Backup", "Value": "true" } ]
        } ] }"#;
        let output: DescribeVolumesOutput = serde_json::from_str(json).unwrap();
        let volume = Volume::from(output.volumes.into_iter().next().unwrap());

        assert_eq!(volume.state, VolumeState::Available);
        assert!(volume.tags.backup_requested());
    }

    #[test]
    fn test_decode_snapshots() {
        let json = r#"{ "Snapshots": [
            { "SnapshotId": "snap-1", "VolumeId": "vol-1", "StartTime": "2024-03-15T04:00:12.000Z",
              "State": "completed", "Tags": [ { "Key": "CreatedBy", "Value": "AutomatedBackup" } ] },
            { "SnapshotId": "snap-2", "VolumeId": "vol-9", "StartTime": "2024-03-01T00:00:00+00:00" }
        ] }"#;
        let output: DescribeSnapshotsOutput = serde_json::from_str(json).unwrap();
        let snapshots: Vec<Snapshot> = output.snapshots.into_iter().map(Snapshot::from).collect();

        assert_eq!(snapshots[0].start_time, Utc.with_ymd_and_hms(2024, 3, 15, 4, 0, 12).unwrap());
        assert!(snapshots[0].is_automated());
        assert!(!snapshots[1].is_automated());
        assert_eq!(snapshots[1].volume_id, "vol-9");
    }

    #[test]
    fn test_decode_empty_listing() {
        let output: DescribeSnapshotsOutput = serde_json::from_str("{}").unwrap();
        assert!(output.snapshots.is_empty());
    }

    #[test]
    fn test_parse_in_use_error() {
        let stderr = "\nAn error occurred (InvalidSnapshot.InUse) when calling the DeleteSnapshot operation: \
                      The snapshot snap-1 is currently in use by ami-42\n";
        let err = parse_cli_error(stderr).unwrap();

        assert!(err.is_bad_request());
        match err {
            GatewayError::Api { code, message, .. } => {
                assert_eq!(code, "InvalidSnapshot.InUse");
                assert_eq!(message, "The snapshot snap-1 is currently in use by ami-42");
            }
            other => panic!("Expected API error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_server_error() {
        let stderr = "An error occurred (RequestLimitExceeded) when calling the DescribeSnapshots operation \
                      (reached max retries: 2): Request limit exceeded.";
        let err = parse_cli_error(stderr).unwrap();
        assert_eq!(err.status(), Some(503));
        assert!(!err.is_bad_request());
    }

    #[test]
    fn test_parse_unrecognised_stderr() {
        assert!(parse_cli_error("Unable to locate credentials.").is_none());
        assert!(parse_cli_error("").is_none());
    }

    #[test]
    fn test_status_for_code() {
        assert_eq!(status_for_code("InvalidSnapshot.InUse"), 400);
        assert_eq!(status_for_code("InvalidSnapshot.NotFound"), 400);
        assert_eq!(status_for_code("InternalError"), 500);
        assert_eq!(status_for_code("Unavailable"), 503);
    }

    #[test]
    fn test_permission_errors_are_not_bad_requests() {
        assert_eq!(status_for_code("AuthFailure"), 401);
        assert_eq!(status_for_code("UnauthorizedOperation"), 403);
        assert_eq!(status_for_code("Blocked"), 403);
        assert_eq!(status_for_code("OptInRequired"), 403);
        assert_eq!(status_for_code("DryRunOperation"), 412);

        let stderr = "An error occurred (UnauthorizedOperation) when calling the DeleteSnapshot operation: \
                      You are not authorized to perform this operation.";
        let err = parse_cli_error(stderr).unwrap();
        assert_eq!(err.status(), Some(403));
        assert!(!err.is_bad_request());
    }

    #[test]
    fn test_command_args() {
        let gateway = AwsCliGateway::new(AwsCliConfig::new("us-east-1").profile(Some("ops".into())));
        let args = gateway.command_args("delete-snapshot", &["--snapshot-id".into(), "snap-1".into()]);
        assert_eq!(
            args,
            vec![
                "ec2", "delete-snapshot", "--region", "us-east-1", "--output", "json",
                "--profile", "ops", "--snapshot-id", "snap-1"
            ]
        );
    }

    #[test]
    fn test_filter_args() {
        assert!(volume_filter_args(&VolumeFilter::All).is_empty());
        assert_eq!(
            volume_filter_args(&VolumeFilter::Ids(vec!["vol-1".into(), "vol-2".into()])),
            vec!["--volume-ids", "vol-1", "vol-2"]
        );
        assert_eq!(
            volume_filter_args(&VolumeFilter::State(VolumeState::Available)),
            vec!["--filters", r#"[{"Name":"status","Values":["available"]}]"#]
        );
        assert_eq!(
            snapshot_filter_args(&SnapshotFilter::OwnedBySelf),
            vec!["--owner-ids", "self"]
        );
    }

    #[test]
    fn test_tags_arg_escapes_values() {
        let tags = TagMap::from_pairs([("Name", "db, primary"), ("CreatedBy", "AutomatedBackup")]);
        let arg = tags_arg(&tags).unwrap();
        assert_eq!(
            arg,
            r#"[{"Key":"CreatedBy","Value":"AutomatedBackup"},{"Key":"Name","Value":"db, primary"}]"#
        );
    }

    #[tokio::test]
    async fn test_empty_id_filters_skip_the_cli() {
        // binary does not exist, so any real invocation would fail
        let gateway = AwsCliGateway::new(AwsCliConfig::new("eu-west-1").binary("/nonexistent/aws"));
        assert!(gateway.list_volumes(&VolumeFilter::Ids(vec![])).await.unwrap().is_empty());
        assert!(gateway.list_snapshots(&SnapshotFilter::VolumeIds(vec![])).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_binary_is_io_error() {
        let gateway = AwsCliGateway::new(AwsCliConfig::new("eu-west-1").binary("/nonexistent/aws"));
        let err = gateway.list_instances().await.unwrap_err();
        assert!(matches!(err, GatewayError::Io(_)));
        assert!(!err.is_bad_request());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_binary_is_command_error() {
        let gateway = AwsCliGateway::new(AwsCliConfig::new("eu-west-1").binary("false"));
        let err = gateway.delete_snapshot("snap-1").await.unwrap_err();
        assert!(matches!(err, GatewayError::Command(_)));
        assert!(!err.is_bad_request());
    }

    #[test]
    fn test_region_accessor() {
        assert_eq!(gateway().region(), "eu-west-1");
    }
}
