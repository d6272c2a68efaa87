//! Catalog access control CLI
//!
//! Administrative and diagnostic commands over the configured rules and roles.

use anyhow::{Context, bail};
use catalog_acl::{
    access_control::{AccessManager, AccessMode, RuleStore},
    catalog::{
        Catalog, CatalogInfo, LayerGroupInfo, LayerInfo, MemoryCatalog, StyleInfo, WorkspaceInfo,
    },
    config::{AppConfig, LogFormat, load_config},
    roles::{Principal, RoleCalculator},
};
use clap::{Parser, Subcommand, ValueEnum};
use std::collections::BTreeSet;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Catalog access control - rule-based security for catalog resources
#[derive(Parser, Debug)]
#[command(name = "catalog-acl")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "CATALOG_ACL_CONFIG")]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "CATALOG_ACL_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check whether a user may access a resource
    Check {
        /// User to check; anonymous when omitted
        #[arg(short, long)]
        user: Option<String>,

        /// Resource kind
        #[arg(short, long, value_enum, default_value_t = Kind::Layer)]
        kind: Kind,

        /// Resource as `workspace:name`, or a bare name for workspaces and global resources
        resource: String,

        /// Access mode (read, write)
        #[arg(short, long, default_value = "read", value_parser = parse_mode)]
        mode: AccessMode,
    },

    /// Inspect the access rules
    #[command(subcommand)]
    Rules(RulesCommand),

    /// Inspect the role hierarchy
    #[command(subcommand)]
    Roles(RolesCommand),
}

#[derive(Subcommand, Debug)]
enum RulesCommand {
    /// Print every rule in properties format
    List,
    /// Print rules naming a role
    ByRole { role: String },
    /// Check that the rules build a secure tree
    Validate,
    /// Print rules naming resources missing from the configured catalog
    Unresolved,
}

#[derive(Subcommand, Debug)]
enum RolesCommand {
    /// Print the effective roles of a user
    Effective { user: String },
    /// Print the ancestors of a role
    Ancestors { role: String },
    /// Print the descendants of a role
    Descendants { role: String },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Kind {
    Workspace,
    Layer,
    Group,
    Style,
}

fn parse_mode(s: &str) -> Result<AccessMode, String> {
    AccessMode::try_parse(s).ok_or_else(|| format!("unknown access mode '{}'", s))
}

fn init_logging(config: &AppConfig, override_level: Option<&str>) {
    let level = override_level.unwrap_or(config.logging.level.as_str());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);
    match config.logging.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

fn resolve_principal(config: &AppConfig, user: Option<&str>) -> anyhow::Result<Principal> {
    let Some(user) = user else {
        return Ok(Principal::anonymous());
    };

    let (roles, users) = config.roles.snapshots()?;
    let calculator = RoleCalculator::new(&roles, &users).with_admin_roles(
        Some(config.security.admin_role.clone()),
        Some(config.security.group_admin_role.clone()),
    );
    Ok(calculator.principal(user)?)
}

fn split_resource(resource: &str) -> (Option<&str>, &str) {
    match resource.split_once(':') {
        Some((ws, name)) => (Some(ws), name),
        None => (None, resource),
    }
}

fn check(
    access: &AccessManager,
    principal: &Principal,
    kind: Kind,
    resource: &str,
    mode: AccessMode,
) -> anyhow::Result<bool> {
    let (workspace, name) = split_resource(resource);
    let info: Box<dyn CatalogInfo> = match (kind, workspace) {
        (Kind::Workspace, None) => Box::new(WorkspaceInfo::new(name)),
        (Kind::Workspace, Some(_)) => bail!("workspaces take a bare name, got '{}'", resource),
        (Kind::Layer, Some(ws)) => Box::new(LayerInfo::new(ws, name)),
        (Kind::Layer, None) => bail!("layers must be given as 'workspace:name'"),
        (Kind::Group, ws) => Box::new(LayerGroupInfo::new(ws, name)),
        (Kind::Style, ws) => Box::new(StyleInfo::new(ws, name)),
    };
    Ok(access.can_access(principal, info.as_ref(), mode))
}

fn run_rules(config: &AppConfig, command: RulesCommand) -> anyhow::Result<()> {
    let store = RuleStore::from_config(&config.rules).context("Failed to load access rules")?;

    match command {
        RulesCommand::List => print!("{}", store.to_properties_string()),
        RulesCommand::ByRole { role } => {
            for rule in store.rules_associated_with_role(&role) {
                println!("{}", rule);
            }
        }
        RulesCommand::Validate => {
            let access = AccessManager::new(store, &config.security)?;
            println!(
                "{} rules, catalog mode {}",
                access.tree().rule_count(),
                access.catalog_mode()
            );
        }
        RulesCommand::Unresolved => {
            let catalog = MemoryCatalog::from_listing(&config.catalog);
            if catalog.workspaces().is_empty() && catalog.layer_groups().is_empty() {
                bail!("no [catalog] listing configured");
            }
            for rule in store.unresolved_rules(&catalog) {
                println!("{}", rule);
            }
        }
    }
    Ok(())
}

fn run_roles(config: &AppConfig, command: RolesCommand) -> anyhow::Result<()> {
    let (roles, _) = config.roles.snapshots()?;
    let hierarchy = roles.hierarchy();

    let names: BTreeSet<String> = match command {
        RolesCommand::Effective { user } => {
            let principal = resolve_principal(config, Some(&user))?;
            principal.role_names().map(str::to_string).collect()
        }
        RolesCommand::Ancestors { role } => hierarchy.ancestors(&role)?,
        RolesCommand::Descendants { role } => hierarchy.descendants(&role)?,
    };

    for name in names {
        println!("{}", name);
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = load_config(args.config.as_deref());
    let config = match config {
        Ok(config) => {
            init_logging(&config, args.log_level.as_deref());
            config
        }
        Err(e) => {
            init_logging(&AppConfig::default(), args.log_level.as_deref());
            error!(error = %e, "Failed to load configuration");
            return Err(e.into());
        }
    };

    debug!(version = env!("CARGO_PKG_VERSION"), "Starting catalog-acl");

    match args.command {
        Command::Check {
            user,
            kind,
            resource,
            mode,
        } => {
            let access = AccessManager::from_config(&config)
                .inspect_err(|e| error!(error = %e, "Failed to build access manager"))?;
            let principal = resolve_principal(&config, user.as_deref())?;
            let allowed = check(&access, &principal, kind, &resource, mode)?;

            info!(principal = %principal, resource = %resource, mode = %mode, allowed, "Access check");
            println!("{}", if allowed { "allowed" } else { "denied" });
        }
        Command::Rules(command) => run_rules(&config, command)?,
        Command::Roles(command) => run_roles(&config, command)?,
    }

    Ok(())
}
