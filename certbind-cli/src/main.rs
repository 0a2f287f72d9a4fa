use std::collections::BTreeMap;
use std::time::Duration;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use log::info;

use certbind_core::differ::{Diff, diff};
use certbind_core::identity::CompositeId;
use certbind_core::provider::Provider;
use certbind_core::resource::{Resource, ResourceId, ResourceTimeouts, State, Value};
use certbind_provider_ibm::alb_cert::RESOURCE_TYPE;
use certbind_provider_ibm::session::{DEFAULT_ENDPOINT, DEFAULT_REGION};
use certbind_provider_ibm::{IbmProvider, SessionConfig};

#[derive(Parser)]
#[command(name = "certbind")]
#[command(about = "Bind certificate-manager certificates to cluster ALB secrets", long_about = None)]
struct Cli {
    #[command(flatten)]
    session: SessionArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SessionArgs {
    /// Default region for API calls
    #[arg(long, global = true, env = "IBMCLOUD_REGION", default_value = DEFAULT_REGION)]
    region: String,

    /// Containers API endpoint
    #[arg(long, global = true, env = "IBMCLOUD_CONTAINERS_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// IAM bearer token
    #[arg(long, global = true, env = "IBMCLOUD_IAM_TOKEN", hide_env_values = true)]
    iam_token: Option<String>,

    /// Deadline for each asynchronous operation, in seconds
    #[arg(long, global = true, default_value_t = 300)]
    timeout: u64,

    /// Delay between status polls, in seconds
    #[arg(long, global = true, default_value_t = 10)]
    poll_interval: u64,
}

/// An existing binding: its identifier and the region it was created in
#[derive(Args)]
struct BindingArgs {
    /// Identifier in the form <cluster_id>/<secret_name>
    id: String,

    /// Region the binding was created in, if not the default region
    #[arg(long)]
    resource_region: Option<String>,
}

impl BindingArgs {
    fn region(&self) -> Option<&str> {
        self.resource_region.as_deref()
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create the binding, or update its certificate if it already exists
    Apply {
        /// Cluster ID
        #[arg(long)]
        cluster_id: String,

        /// ALB secret name
        #[arg(long)]
        secret_name: String,

        /// Certificate CRN
        #[arg(long)]
        cert_crn: String,

        /// Region for this binding only (deprecated)
        #[arg(long)]
        resource_region: Option<String>,

        /// Local name of the resource
        #[arg(long, default_value = "main")]
        name: String,
    },
    /// Show the current state of a binding
    Read {
        #[command(flatten)]
        target: BindingArgs,

        /// Print attributes as JSON
        #[arg(long)]
        json: bool,
    },
    /// Adopt an existing binding by its identifier
    Import {
        #[command(flatten)]
        target: BindingArgs,
    },
    /// Remove a binding and wait until it is gone
    Delete {
        #[command(flatten)]
        target: BindingArgs,

        /// Skip confirmation prompt (auto-approve)
        #[arg(long)]
        auto_approve: bool,
    },
    /// Check whether a binding exists
    Exists {
        #[command(flatten)]
        target: BindingArgs,
    },
    /// Generate shell completions
    Completions {
        shell: Shell,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "certbind", &mut std::io::stdout());
            Ok(())
        }
        command => match build_provider(&cli.session) {
            Ok(provider) => run_command(provider.as_ref(), command).await,
            Err(e) => Err(e),
        },
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn build_provider(args: &SessionArgs) -> Result<Box<dyn Provider>, String> {
    let mut config = SessionConfig::default()
        .with_region(&args.region)
        .with_endpoint(&args.endpoint);
    if let Some(token) = &args.iam_token {
        config = config.with_iam_token(token);
    }

    let provider = IbmProvider::from_config(config)
        .map_err(|e| e.to_string())?
        .with_timeouts(ResourceTimeouts::uniform(Duration::from_secs(args.timeout)))
        .with_poll_interval(Duration::from_secs(args.poll_interval));
    info!(
        "Using region {} at {}",
        provider.session().default_region(),
        args.endpoint
    );

    Ok(Box::new(provider))
}

async fn run_command(provider: &dyn Provider, command: Commands) -> Result<(), String> {
    match command {
        Commands::Apply {
            cluster_id,
            secret_name,
            cert_crn,
            resource_region,
            name,
        } => {
            let resource =
                declared_resource(&name, &cluster_id, &secret_name, &cert_crn, resource_region);
            run_apply(provider, resource).await
        }
        Commands::Read { target, json } => run_read(provider, &target, json).await,
        Commands::Import { target } => run_import(provider, &target).await,
        Commands::Delete {
            target,
            auto_approve,
        } => run_delete(provider, &target, auto_approve).await,
        Commands::Exists { target } => run_exists(provider, &target).await,
        Commands::Completions { .. } => Ok(()),
    }
}

fn declared_resource(
    name: &str,
    cluster_id: &str,
    secret_name: &str,
    cert_crn: &str,
    region: Option<String>,
) -> Resource {
    let mut resource = Resource::new(RESOURCE_TYPE, name)
        .with_attribute("cluster_id", Value::String(cluster_id.to_string()))
        .with_attribute("secret_name", Value::String(secret_name.to_string()))
        .with_attribute("cert_crn", Value::String(cert_crn.to_string()));
    if let Some(region) = region {
        resource = resource.with_attribute("region", Value::String(region));
    }
    resource
}

fn resource_id() -> ResourceId {
    ResourceId::new(RESOURCE_TYPE, "main")
}

async fn run_apply(provider: &dyn Provider, resource: Resource) -> Result<(), String> {
    let identifier = match (
        resource.get_str("cluster_id"),
        resource.get_str("secret_name"),
    ) {
        (Some(cluster), Some(secret)) => CompositeId::new(cluster, secret).to_string(),
        _ => return Err("cluster_id and secret_name are required".to_string()),
    };

    let schema = provider
        .resource_types()
        .into_iter()
        .find(|t| t.name() == resource.id.resource_type)
        .map(|t| t.schema())
        .ok_or_else(|| {
            format!(
                "Provider {} does not support resource type {}",
                provider.name(),
                resource.id.resource_type
            )
        })?;

    let current = provider
        .read(&resource.id, &identifier, resource.get_str("region"))
        .await
        .map_err(|e| format!("Failed to read state: {}", e))?;

    match diff(&resource, &current, &schema) {
        Diff::NoChange(id) => {
            println!(
                "{}",
                format!("No changes needed for {}.{}.", id.resource_type, id.name).green()
            );
            Ok(())
        }
        Diff::Create(resource) => {
            println!(
                "{} {} {}",
                "+".green().bold(),
                format!("Create {}.{}", resource.id.resource_type, resource.id.name).cyan(),
                identifier
            );
            let state = provider
                .create(&resource)
                .await
                .map_err(|e| e.to_string())?;
            println!("{}", "Apply complete! 1 resource created.".green().bold());
            print_state(&state);
            Ok(())
        }
        Diff::Update {
            id,
            from,
            to,
            changed_attributes,
        } => {
            println!(
                "{} {} {} ({})",
                "~".yellow().bold(),
                format!("Update {}.{}", id.resource_type, id.name).cyan(),
                identifier,
                changed_attributes.join(", ")
            );
            let state = provider
                .update(&id, &identifier, &from, &to)
                .await
                .map_err(|e| e.to_string())?;
            println!("{}", "Apply complete! 1 resource updated.".green().bold());
            print_state(&state);
            Ok(())
        }
        Diff::Replace {
            forced_attributes, ..
        } => Err(format!(
            "{} cannot be changed in place; delete {} first",
            forced_attributes.join(", "),
            identifier
        )),
    }
}

async fn run_read(provider: &dyn Provider, target: &BindingArgs, json: bool) -> Result<(), String> {
    let state = provider
        .read(&resource_id(), &target.id, target.region())
        .await
        .map_err(|e| e.to_string())?;

    if !state.exists {
        return Err(format!("ALB certificate {} does not exist", target.id));
    }

    if json {
        let attrs: serde_json::Map<String, serde_json::Value> = sorted_attributes(&state)
            .into_iter()
            .map(|(k, v)| (k.to_string(), serde_json::Value::from(v.as_str())))
            .collect();
        let output = serde_json::to_string_pretty(&attrs).map_err(|e| e.to_string())?;
        println!("{}", output);
    } else {
        print_state(&state);
    }
    Ok(())
}

async fn run_import(provider: &dyn Provider, target: &BindingArgs) -> Result<(), String> {
    let state = provider
        .read(&resource_id(), &target.id, target.region())
        .await
        .map_err(|e| e.to_string())?;

    if !state.exists {
        return Err(format!(
            "Cannot import non-existent remote object {}",
            target.id
        ));
    }

    println!("{}", "Import successful!".green().bold());
    print_state(&state);
    Ok(())
}

async fn run_delete(
    provider: &dyn Provider,
    target: &BindingArgs,
    auto_approve: bool,
) -> Result<(), String> {
    let id = resource_id();
    let exists = provider
        .exists(&id, &target.id, target.region())
        .await
        .map_err(|e| e.to_string())?;

    if !exists {
        println!("{}", "No resources to destroy.".green());
        return Ok(());
    }

    println!("  {} {} {}", "-".red().bold(), RESOURCE_TYPE, target.id);
    println!();

    if !auto_approve {
        println!("{}", "Do you really want to delete this binding?".yellow().bold());
        println!(
            "  {}",
            "This action cannot be undone. Type 'yes' to confirm.".yellow()
        );
        print!("\n  Enter a value: ");
        std::io::Write::flush(&mut std::io::stdout()).map_err(|e| e.to_string())?;

        let mut input = String::new();
        std::io::stdin()
            .read_line(&mut input)
            .map_err(|e| e.to_string())?;

        if input.trim() != "yes" {
            println!();
            println!("{}", "Delete cancelled.".yellow());
            return Ok(());
        }
        println!();
    }

    println!("{}", "Deleting...".red().bold());
    provider
        .delete(&id, &target.id, target.region())
        .await
        .map_err(|e| e.to_string())?;
    println!("  {} Delete {}", "✓".green(), target.id);
    Ok(())
}

async fn run_exists(provider: &dyn Provider, target: &BindingArgs) -> Result<(), String> {
    let exists = provider
        .exists(&resource_id(), &target.id, target.region())
        .await
        .map_err(|e| e.to_string())?;
    println!("{}", exists);
    Ok(())
}

fn sorted_attributes(state: &State) -> BTreeMap<&str, &Value> {
    state
        .attributes
        .iter()
        .map(|(k, v)| (k.as_str(), v))
        .collect()
}

fn print_state(state: &State) {
    if let Some(identifier) = &state.identifier {
        println!("  {} = \"{}\"", "id".bold(), identifier);
    }
    for (key, value) in sorted_attributes(state) {
        println!("  {} = \"{}\"", key.bold(), value.as_str());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use certbind_core::provider::{BoxFuture, ProviderResult, ResourceType};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_apply_with_global_flags() {
        let cli = Cli::try_parse_from([
            "certbind",
            "--region",
            "eu-de",
            "apply",
            "--cluster-id",
            "c1",
            "--secret-name",
            "s1",
            "--cert-crn",
            "crn:v1:x",
            "--timeout",
            "60",
        ])
        .unwrap();

        assert_eq!(cli.session.region, "eu-de");
        assert_eq!(cli.session.timeout, 60);
        assert!(matches!(
            cli.command,
            Commands::Apply { ref cluster_id, .. } if cluster_id == "c1"
        ));
    }

    #[test]
    fn declared_resource_sets_region_only_when_given() {
        let resource = declared_resource("web", "c1", "s1", "crn:v1:x", None);
        assert_eq!(resource.get_str("cluster_id"), Some("c1"));
        assert!(!resource.attributes.contains_key("region"));

        let resource = declared_resource("web", "c1", "s1", "crn:v1:x", Some("jp-tok".into()));
        assert_eq!(resource.get_str("region"), Some("jp-tok"));
    }

    #[test]
    fn binding_args_carry_resource_region() {
        let cli = Cli::try_parse_from([
            "certbind",
            "delete",
            "c1/s1",
            "--resource-region",
            "eu-de",
            "--auto-approve",
        ])
        .unwrap();

        match cli.command {
            Commands::Delete {
                target,
                auto_approve,
            } => {
                assert_eq!(target.id, "c1/s1");
                assert_eq!(target.region(), Some("eu-de"));
                assert!(auto_approve);
            }
            _ => panic!("expected delete"),
        }
    }

    /// Provider that serves a fixed remote state and records every call
    struct StubProvider {
        remote: Option<State>,
        calls: Mutex<Vec<String>>,
    }

    impl StubProvider {
        fn new(remote: Option<State>) -> Self {
            Self {
                remote,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Provider for StubProvider {
        fn name(&self) -> &'static str {
            "stub"
        }

        fn resource_types(&self) -> Vec<Box<dyn ResourceType>> {
            certbind_provider_ibm::resources::resource_types()
        }

        fn read(
            &self,
            id: &ResourceId,
            identifier: &str,
            region: Option<&str>,
        ) -> BoxFuture<'_, ProviderResult<State>> {
            self.record(format!("read {} {}", identifier, region.unwrap_or("-")));
            let state = self
                .remote
                .clone()
                .unwrap_or_else(|| State::not_found(id.clone()));
            Box::pin(async move { Ok(state) })
        }

        fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
            self.record(format!("create {}", resource.id.name));
            let state = State::existing(resource.id.clone(), resource.attributes.clone());
            Box::pin(async move { Ok(state) })
        }

        fn update(
            &self,
            id: &ResourceId,
            identifier: &str,
            _from: &State,
            to: &Resource,
        ) -> BoxFuture<'_, ProviderResult<State>> {
            self.record(format!("update {}", identifier));
            let state = State::existing(id.clone(), to.attributes.clone());
            Box::pin(async move { Ok(state) })
        }

        fn delete(
            &self,
            _id: &ResourceId,
            identifier: &str,
            _region: Option<&str>,
        ) -> BoxFuture<'_, ProviderResult<()>> {
            self.record(format!("delete {}", identifier));
            Box::pin(async { Ok(()) })
        }

        fn exists(
            &self,
            _id: &ResourceId,
            _identifier: &str,
            _region: Option<&str>,
        ) -> BoxFuture<'_, ProviderResult<bool>> {
            let exists = self.remote.is_some();
            Box::pin(async move { Ok(exists) })
        }
    }

    fn remote(cluster_id: &str, cert_crn: &str) -> State {
        let mut attrs = HashMap::new();
        attrs.insert("cluster_id".to_string(), Value::String(cluster_id.to_string()));
        attrs.insert("secret_name".to_string(), Value::String("s1".to_string()));
        attrs.insert("cert_crn".to_string(), Value::String(cert_crn.to_string()));
        attrs.insert("region".to_string(), Value::String("us-south".to_string()));
        State::existing(ResourceId::new(RESOURCE_TYPE, "web"), attrs).with_identifier("c1/s1")
    }

    #[tokio::test]
    async fn apply_creates_missing_binding() {
        let provider = StubProvider::new(None);
        let resource = declared_resource("web", "c1", "s1", "crn:v1:a", Some("eu-de".into()));

        run_apply(&provider, resource).await.unwrap();

        assert_eq!(provider.calls(), vec!["read c1/s1 eu-de", "create web"]);
    }

    #[tokio::test]
    async fn apply_updates_changed_certificate() {
        let provider = StubProvider::new(Some(remote("c1", "crn:v1:old")));
        let resource = declared_resource("web", "c1", "s1", "crn:v1:new", None);

        run_apply(&provider, resource).await.unwrap();

        assert_eq!(provider.calls(), vec!["read c1/s1 -", "update c1/s1"]);
    }

    #[tokio::test]
    async fn apply_without_changes_writes_nothing() {
        let provider = StubProvider::new(Some(remote("c1", "crn:v1:a")));
        let resource = declared_resource("web", "c1", "s1", "crn:v1:a", None);

        run_apply(&provider, resource).await.unwrap();

        assert_eq!(provider.calls(), vec!["read c1/s1 -"]);
    }

    #[tokio::test]
    async fn apply_refuses_force_new_change() {
        let provider = StubProvider::new(Some(remote("c0", "crn:v1:a")));
        let resource = declared_resource("web", "c1", "s1", "crn:v1:a", None);

        let err = run_apply(&provider, resource).await.unwrap_err();

        assert!(err.contains("cluster_id cannot be changed in place"));
        assert_eq!(provider.calls(), vec!["read c1/s1 -"]);
    }
}
