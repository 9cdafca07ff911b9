// Spike executor for the Runtime Configuration demo
//
// Runs the fixed sequence of remote calls: create a config, list configs,
// set its IAM policy, create/read/delete a variable and delete the config.
// Each call's input is built from the paths composed at the start of the run.

use std::io::Write;
use tracing::{debug, info, warn};

use super::types::SpikeReport;
use crate::config::SpikeSettings;
use crate::error::{Error, Operation, Result};
use crate::resource::{teardown, ResourceNaming, ResourceTracker, ResourceType};
use crate::runtimeconfig::{
    Binding, Policy, RuntimeConfig, RuntimeConfigApi, SetIamPolicyRequest, Variable,
};

/// Executes one spike run against an API implementation
pub struct SpikeExecutor<'a> {
    api: &'a dyn RuntimeConfigApi,
    settings: &'a SpikeSettings,
    tracker: ResourceTracker,
}

impl<'a> SpikeExecutor<'a> {
    /// Create a new executor
    pub fn new(api: &'a dyn RuntimeConfigApi, settings: &'a SpikeSettings) -> Self {
        Self {
            api,
            settings,
            tracker: ResourceTracker::new(),
        }
    }

    /// Resources still known to exist remotely
    pub fn tracker(&self) -> &ResourceTracker {
        &self.tracker
    }

    /// Run the sequence with freshly generated resource paths
    pub async fn run<W: Write>(&mut self, project_id: &str, out: &mut W) -> Result<SpikeReport> {
        let naming = ResourceNaming::generate(project_id, &self.settings.variable_name);
        self.run_with(project_id, &naming, out).await
    }

    /// Run the sequence with the given resource paths
    pub async fn run_with<W: Write>(
        &mut self,
        project_id: &str,
        naming: &ResourceNaming,
        out: &mut W,
    ) -> Result<SpikeReport> {
        let outcome = self.execute(project_id, naming, out).await;

        if let Err(err) = &outcome {
            self.handle_failure(err).await;
        }

        outcome
    }

    async fn handle_failure(&mut self, err: &Error) {
        if self.tracker.is_empty() {
            return;
        }

        if !self.settings.cleanup_on_failure {
            for resource in self.tracker.resources() {
                warn!(
                    kind = %resource.resource_type,
                    path = %resource.path,
                    age_secs = resource.age_seconds(),
                    "Leaving resource behind after failure"
                );
            }
            return;
        }

        warn!(
            failed = ?err.operation().map(|op| op.method_name()),
            resources = self.tracker.len(),
            "Run failed, tearing down created resources"
        );
        let result = teardown(self.api, &mut self.tracker).await;
        if result.is_complete() {
            info!(deleted = result.deleted.len(), "Teardown complete");
        } else {
            warn!(
                deleted = result.deleted.len(),
                failed = result.failed.len(),
                "Teardown left resources behind"
            );
        }
    }

    async fn execute<W: Write>(
        &mut self,
        project_id: &str,
        naming: &ResourceNaming,
        out: &mut W,
    ) -> Result<SpikeReport> {
        writeln!(out, "Project ID: {}", project_id)?;

        // Create config
        writeln!(out, "Creating config {}", naming.config_path)?;
        let request = RuntimeConfig::new(&naming.config_path, &self.settings.config_description);
        let config = self
            .api
            .create_config(&naming.project_path, &request)
            .await
            .map_err(|e| Error::remote(Operation::CreateConfig, e))?;
        self.tracker.track(ResourceType::Config, &naming.config_path);
        writeln!(out, "Config: {}", config.name)?;

        // List configs
        writeln!(out, "Listing existing configs for project ID {}:", project_id)?;
        let configs = self
            .api
            .list_configs(&naming.project_path)
            .await
            .map_err(|e| Error::remote(Operation::ListConfigs, e))?;
        for saved in &configs {
            writeln!(out, "Saved config: {}", saved.name)?;
        }
        debug!(count = configs.len(), "Listed configs");

        // Set IAM policy
        let role = &self.settings.role;
        let service_account = self.settings.service_account_email(project_id);
        writeln!(
            out,
            "Setting IAM policy with role \"{}\" for serviceAccount:{}",
            role, service_account
        )?;
        let request = SetIamPolicyRequest {
            policy: Policy::single(Binding::new(
                role.clone(),
                vec![self.settings.service_account_member(project_id)],
            )),
        };
        let policy = self
            .api
            .set_iam_policy(&naming.config_path, &request)
            .await
            .map_err(|e| Error::remote(Operation::SetIamPolicy, e))?;
        let policy_json = serde_json::to_string(&policy)?;
        writeln!(out, "Policy:\n{}", policy_json)?;

        // Create variable
        writeln!(out, "Creating config variable {}", naming.variable_path)?;
        let request = Variable::with_text(&naming.variable_path, &self.settings.variable_text);
        let created = self
            .api
            .create_variable(&naming.config_path, &request)
            .await
            .map_err(|e| Error::remote(Operation::CreateVariable, e))?;
        self.tracker.track(ResourceType::Variable, &naming.variable_path);
        writeln!(out, "Variable name: {}", created.name)?;

        // Get variable
        writeln!(out, "Getting config variable {}", naming.variable_path)?;
        let variable = self
            .api
            .get_variable(&naming.variable_path)
            .await
            .map_err(|e| Error::remote(Operation::GetVariable, e))?;
        writeln!(out, "Variable text: {}", variable.text_value())?;

        // Delete variable
        writeln!(out, "Deleting config variable {}", naming.variable_path)?;
        self.api
            .delete_variable(&naming.variable_path)
            .await
            .map_err(|e| Error::remote(Operation::DeleteVariable, e))?;
        self.tracker.untrack(&naming.variable_path);

        // Delete config
        writeln!(out, "Deleting config {}", naming.config_path)?;
        self.api
            .delete_config(&naming.config_path)
            .await
            .map_err(|e| Error::remote(Operation::DeleteConfig, e))?;
        self.tracker.untrack(&naming.config_path);

        info!(config = %naming.config_path, "Spike run complete");

        Ok(SpikeReport {
            project_id: project_id.to_string(),
            config_path: naming.config_path.clone(),
            variable_path: naming.variable_path.clone(),
            listed_configs: configs.into_iter().map(|c| c.name).collect(),
            policy,
            variable_text: variable.text_value().to_string(),
        })
    }
}

/// Run the spike once against `api`, writing progress lines to `out`
pub async fn run_spike<W: Write>(
    api: &dyn RuntimeConfigApi,
    project_id: &str,
    settings: &SpikeSettings,
    out: &mut W,
) -> Result<SpikeReport> {
    SpikeExecutor::new(api, settings).run(project_id, out).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtimeconfig::ApiError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        CreateConfig(String, RuntimeConfig),
        ListConfigs(String),
        SetIamPolicy(String, SetIamPolicyRequest),
        CreateVariable(String, Variable),
        GetVariable(String),
        DeleteVariable(String),
        DeleteConfig(String),
    }

    /// Records every call; optionally fails one operation
    #[derive(Default)]
    struct RecordingApi {
        calls: Mutex<Vec<Call>>,
        fail_on: Option<Operation>,
        returned_text: Option<String>,
        existing: Vec<String>,
    }

    impl RecordingApi {
        fn failing(operation: Operation) -> Self {
            Self {
                fail_on: Some(operation),
                ..Default::default()
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: Call, operation: Operation) -> std::result::Result<(), ApiError> {
            self.calls.lock().unwrap().push(call);
            if self.fail_on == Some(operation) {
                return Err(ApiError::Service {
                    code: 500,
                    status: Some("INTERNAL".to_string()),
                    message: "backend error".to_string(),
                });
            }
            Ok(())
        }
    }

    #[async_trait]
    impl RuntimeConfigApi for RecordingApi {
        async fn create_config(
            &self,
            parent: &str,
            config: &RuntimeConfig,
        ) -> std::result::Result<RuntimeConfig, ApiError> {
            self.record(
                Call::CreateConfig(parent.to_string(), config.clone()),
                Operation::CreateConfig,
            )?;
            Ok(config.clone())
        }

        async fn list_configs(
            &self,
            parent: &str,
        ) -> std::result::Result<Vec<RuntimeConfig>, ApiError> {
            self.record(Call::ListConfigs(parent.to_string()), Operation::ListConfigs)?;
            Ok(self
                .existing
                .iter()
                .map(|name| RuntimeConfig::new(name.clone(), ""))
                .collect())
        }

        async fn set_iam_policy(
            &self,
            resource: &str,
            request: &SetIamPolicyRequest,
        ) -> std::result::Result<Policy, ApiError> {
            self.record(
                Call::SetIamPolicy(resource.to_string(), request.clone()),
                Operation::SetIamPolicy,
            )?;
            let mut policy = request.policy.clone();
            policy.etag = Some(b"etag".to_vec());
            policy.version = Some(1);
            Ok(policy)
        }

        async fn create_variable(
            &self,
            parent: &str,
            variable: &Variable,
        ) -> std::result::Result<Variable, ApiError> {
            self.record(
                Call::CreateVariable(parent.to_string(), variable.clone()),
                Operation::CreateVariable,
            )?;
            Ok(variable.clone())
        }

        async fn get_variable(&self, name: &str) -> std::result::Result<Variable, ApiError> {
            self.record(Call::GetVariable(name.to_string()), Operation::GetVariable)?;
            let text = self
                .returned_text
                .clone()
                .unwrap_or_else(|| "mysecret1".to_string());
            Ok(Variable::with_text(name, text))
        }

        async fn delete_variable(&self, name: &str) -> std::result::Result<(), ApiError> {
            self.record(Call::DeleteVariable(name.to_string()), Operation::DeleteVariable)
        }

        async fn delete_config(&self, name: &str) -> std::result::Result<(), ApiError> {
            self.record(Call::DeleteConfig(name.to_string()), Operation::DeleteConfig)
        }
    }

    #[tokio::test]
    async fn test_full_sequence() {
        let api = RecordingApi {
            existing: vec!["projects/test-proj/configs/older".to_string()],
            ..Default::default()
        };
        let settings = SpikeSettings::default();
        let mut out = Vec::new();

        let report = run_spike(&api, "test-proj", &settings, &mut out).await.unwrap();

        let config_path = report.config_path.clone();
        let variable_path = format!("{}/variables/myvar1", config_path);
        assert!(config_path.starts_with("projects/test-proj/configs/config-"));

        assert_eq!(
            api.calls(),
            vec![
                Call::CreateConfig(
                    "projects/test-proj".to_string(),
                    RuntimeConfig::new(&config_path, "Configuration created via API"),
                ),
                Call::ListConfigs("projects/test-proj".to_string()),
                Call::SetIamPolicy(
                    config_path.clone(),
                    SetIamPolicyRequest {
                        policy: Policy::single(Binding::new(
                            "roles/viewer",
                            vec![
                                "serviceAccount:runtimeconfig-spike@test-proj.iam.gserviceaccount.com"
                                    .to_string()
                            ],
                        )),
                    },
                ),
                Call::CreateVariable(
                    config_path.clone(),
                    Variable::with_text(&variable_path, "mysecret1"),
                ),
                Call::GetVariable(variable_path.clone()),
                Call::DeleteVariable(variable_path.clone()),
                Call::DeleteConfig(config_path.clone()),
            ]
        );

        assert_eq!(report.listed_configs, vec!["projects/test-proj/configs/older"]);
        assert_eq!(report.variable_text, "mysecret1");

        let output = String::from_utf8(out).unwrap();
        let expected = format!(
            "Project ID: test-proj\n\
             Creating config {cfg}\n\
             Config: {cfg}\n\
             Listing existing configs for project ID test-proj:\n\
             Saved config: projects/test-proj/configs/older\n\
             Setting IAM policy with role \"roles/viewer\" for serviceAccount:runtimeconfig-spike@test-proj.iam.gserviceaccount.com\n\
             Policy:\n\
             {{\"bindings\":[{{\"role\":\"roles/viewer\",\"members\":[\"serviceAccount:runtimeconfig-spike@test-proj.iam.gserviceaccount.com\"]}}],\"etag\":\"ZXRhZw==\",\"version\":1}}\n\
             Creating config variable {var}\n\
             Variable name: {var}\n\
             Getting config variable {var}\n\
             Variable text: mysecret1\n\
             Deleting config variable {var}\n\
             Deleting config {cfg}\n",
            cfg = config_path,
            var = variable_path,
        );
        assert_eq!(output, expected);
    }

    #[tokio::test]
    async fn test_create_failure_stops_run() {
        let api = RecordingApi::failing(Operation::CreateConfig);
        let settings = SpikeSettings::default();
        let mut out = Vec::new();

        let err = run_spike(&api, "test-proj", &settings, &mut out)
            .await
            .unwrap_err();

        assert_eq!(err.operation(), Some(Operation::CreateConfig));
        let calls = api.calls();
        assert_eq!(calls.len(), 1);
        assert!(matches!(calls[0], Call::CreateConfig(..)));
    }

    #[tokio::test]
    async fn test_returned_text_printed_verbatim() {
        let api = RecordingApi {
            returned_text: Some("  changed\tvalue ".to_string()),
            ..Default::default()
        };
        let settings = SpikeSettings::default();
        let mut out = Vec::new();

        let report = run_spike(&api, "test-proj", &settings, &mut out).await.unwrap();

        assert_eq!(report.variable_text, "  changed\tvalue ");
        let output = String::from_utf8(out).unwrap();
        assert!(output.contains("Variable text:   changed\tvalue \n"));
    }

    #[tokio::test]
    async fn test_failure_leaves_resources_by_default() {
        let api = RecordingApi::failing(Operation::GetVariable);
        let settings = SpikeSettings::default();
        let mut executor = SpikeExecutor::new(&api, &settings);
        let mut out = Vec::new();

        let err = executor.run("test-proj", &mut out).await.unwrap_err();

        assert_eq!(err.operation(), Some(Operation::GetVariable));
        assert_eq!(executor.tracker().len(), 2);
        let calls = api.calls();
        assert!(matches!(calls.last(), Some(Call::GetVariable(_))));
        assert!(!calls
            .iter()
            .any(|c| matches!(c, Call::DeleteVariable(_) | Call::DeleteConfig(_))));
    }

    #[tokio::test]
    async fn test_failure_tears_down_when_enabled() {
        let api = RecordingApi::failing(Operation::GetVariable);
        let settings = SpikeSettings {
            cleanup_on_failure: true,
            ..Default::default()
        };
        let naming = ResourceNaming::generate("test-proj", &settings.variable_name);
        let mut executor = SpikeExecutor::new(&api, &settings);
        let mut out = Vec::new();

        let err = executor
            .run_with("test-proj", &naming, &mut out)
            .await
            .unwrap_err();

        assert_eq!(err.operation(), Some(Operation::GetVariable));
        assert!(executor.tracker().is_empty());
        let calls = api.calls();
        assert_eq!(
            &calls[calls.len() - 2..],
            &[
                Call::DeleteVariable(naming.variable_path.clone()),
                Call::DeleteConfig(naming.config_path.clone()),
            ]
        );
    }

    #[tokio::test]
    async fn test_list_failure_with_cleanup_deletes_config_only() {
        let api = RecordingApi::failing(Operation::ListConfigs);
        let settings = SpikeSettings {
            cleanup_on_failure: true,
            ..Default::default()
        };
        let naming = ResourceNaming::generate("test-proj", &settings.variable_name);
        let mut executor = SpikeExecutor::new(&api, &settings);
        let mut out = Vec::new();

        executor
            .run_with("test-proj", &naming, &mut out)
            .await
            .unwrap_err();

        let calls = api.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[2], Call::DeleteConfig(naming.config_path.clone()));
    }

    struct ClosedOutput;

    impl Write for ClosedOutput {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_output_failure_stops_before_any_call() {
        let api = RecordingApi::default();
        let settings = SpikeSettings::default();

        let err = run_spike(&api, "test-proj", &settings, &mut ClosedOutput)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.operation(), None);
        assert!(api.calls().is_empty());
    }
}
