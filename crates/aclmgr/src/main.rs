//! aclmgr - command line front end for TNSR ACL rules

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tnsr_acl_common::{AclRule, AclRuleList, RULE_TEMPLATE};
use tnsr_aclmgr::{
    AclMgrConfig, AclMgrError, AclMgrResult, HttpTransport, LoggingConfig, RenumberEngine,
    RuleStore, DEFAULT_CONFIG_PATH,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// TNSR ACL rule manager
#[derive(Parser, Debug)]
#[command(name = "aclmgr")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file
    #[arg(short = 'c', long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// RESTCONF host (overrides the configuration file)
    #[arg(long)]
    host: Option<String>,

    /// URL scheme, http or https
    #[arg(long)]
    scheme: Option<String>,

    /// RESTCONF port
    #[arg(long)]
    port: Option<u16>,

    /// YANG module prefix of the ACL model
    #[arg(long)]
    module: Option<String>,

    /// Accept invalid TLS certificates
    #[arg(short = 'k', long)]
    insecure: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long)]
    log_level: Option<String>,

    /// Emit JSON log lines
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the rules of an ACL
    List { acl: String },

    /// Create a rule or replace the rule at its sequence number
    Put {
        acl: String,
        /// Rule field as name=value, repeatable
        #[arg(short = 'f', long = "field", value_parser = parse_field, required = true)]
        fields: Vec<(String, String)>,
    },

    /// Create a rule, failing if its sequence number is taken
    Post {
        acl: String,
        /// Rule field as name=value, repeatable
        #[arg(short = 'f', long = "field", value_parser = parse_field, required = true)]
        fields: Vec<(String, String)>,
    },

    /// Delete the rule at a sequence number
    Delete { acl: String, sequence: u32 },

    /// Open free sequence numbers ahead of a rule
    Shift {
        acl: String,
        sequence: u32,
        /// Number of free sequence numbers to open
        #[arg(short = 'n', long, default_value_t = 1)]
        rows: u32,
    },

    /// Exit 0 if a sequence number is in use, 1 otherwise
    Exists { acl: String, sequence: u32 },
}

fn parse_field(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .map(|(name, value)| (name.trim().to_string(), value.to_string()))
        .ok_or_else(|| format!("expected name=value, got '{}'", raw))
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("aclmgr: {}", e);
            return ExitCode::from(2);
        }
    };
    init_logging(&config.logging);

    match run(args.command, &config).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "aclmgr: command failed");
            eprintln!("aclmgr: {}", e);
            if let AclMgrError::PartialRenumber(failure) = &e {
                for step in &failure.completed {
                    eprintln!("  applied: {}", step);
                }
                eprintln!("  failed:  {}", failure.failed);
            }
            ExitCode::FAILURE
        }
    }
}

fn load_config(args: &Args) -> AclMgrResult<AclMgrConfig> {
    let mut config = AclMgrConfig::load_or_default(&args.config)?;
    let restconf = &mut config.restconf;

    if let Some(host) = &args.host {
        restconf.host = host.clone();
    }
    if let Some(scheme) = &args.scheme {
        restconf.scheme = scheme.clone();
    }
    if let Some(port) = args.port {
        restconf.port = Some(port);
    }
    if let Some(module) = &args.module {
        restconf.module = module.clone();
    }
    if args.insecure {
        restconf.accept_invalid_certs = true;
    }
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    if args.json_logs {
        config.logging.json = true;
    }

    config.validate()?;
    Ok(config)
}

fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    if logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }
}

async fn run(command: Command, config: &AclMgrConfig) -> AclMgrResult<ExitCode> {
    let transport = HttpTransport::from_config(&config.restconf)?;
    let store = Arc::new(RuleStore::new(transport, config.restconf.paths()?));
    info!(base_url = %store.paths().base_url(), "aclmgr: using RESTCONF endpoint");

    match command {
        Command::List { acl } => {
            let listing = store.fetch_rules(&acl).await?;
            print!("{}", render_table(&listing.rules));
        }
        Command::Put { acl, fields } => {
            let rule = AclRule::from_fields(fields)?;
            store.create_or_update_rule(&acl, &rule).await?;
            let listing = store.fetch_rules(&acl).await?;
            print!("{}", render_table(&listing.rules));
        }
        Command::Post { acl, fields } => {
            let rule = AclRule::from_fields(fields)?;
            store.create_rule(&acl, &rule).await?;
            let listing = store.fetch_rules(&acl).await?;
            print!("{}", render_table(&listing.rules));
        }
        Command::Delete { acl, sequence } => {
            let deleted = store.delete_sequence(&acl, sequence).await?;
            println!("deleted {}", deleted);
        }
        Command::Shift {
            acl,
            sequence,
            rows,
        } => {
            let engine = RenumberEngine::new(Arc::clone(&store));
            let outcome = engine.shift_rows_from_sequence(&acl, rows, sequence).await?;
            for (from, to) in &outcome.moves {
                println!("moved {} -> {}", from, to);
            }
            match outcome.selected_sequence {
                Some(selected) => println!("selected {}", selected),
                None => println!("sequence {} not found in ACL '{}'", sequence, acl),
            }
            print!("{}", render_table(&outcome.rules));
        }
        Command::Exists { acl, sequence } => {
            store.fetch_rules(&acl).await?;
            if store.is_known_sequence(&acl, sequence) {
                println!("yes");
            } else {
                println!("no");
                return Ok(ExitCode::from(1));
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Renders rules as a text table, one column per template field.
fn render_table(rules: &AclRuleList) -> String {
    let rows: Vec<Vec<String>> = rules
        .iter()
        .map(|rule| {
            RULE_TEMPLATE
                .iter()
                .map(|field| rule.field_value(field.name).unwrap_or_default())
                .collect()
        })
        .collect();

    let widths: Vec<usize> = RULE_TEMPLATE
        .iter()
        .enumerate()
        .map(|(i, field)| {
            rows.iter()
                .map(|row| row[i].len())
                .chain(std::iter::once(field.name.len()))
                .max()
                .unwrap_or_default()
        })
        .collect();

    let format_row = |cells: Vec<&str>| -> String {
        let line: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = width))
            .collect();
        format!("{}\n", line.join("  ").trim_end())
    };

    let mut out = format_row(RULE_TEMPLATE.iter().map(|f| f.name).collect());
    for row in &rows {
        out.push_str(&format_row(row.iter().map(String::as_str).collect()));
    }
    out
}
