//! `intent-resolve`: resolve intents, validate domains and run suites

use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use intent_rationalization::{SimilarityConfig, SimilarityDetector};
use intent_resolution::{
    load_cases, DomainCatalog, PreparedDomain, RecentAction, Resolution, ResolutionRequest, SuiteRunner, UserContext,
};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("intent-resolve")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Context-aware intent resolution over functional hierarchies")
        .subcommand_required(true)
        .arg(
            Arg::new("domains")
                .long("domains")
                .global(true)
                .default_value("demos/domains")
                .value_parser(value_parser!(PathBuf))
                .help("Directory of domain files (.json, .yaml, .yml)"),
        )
        .arg(
            Arg::new("strict")
                .long("strict")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Reject domains with integrity errors"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Output as JSON"),
        )
        .subcommand(Command::new("list").about("List available domains"))
        .subcommand(
            Command::new("resolve")
                .about("Resolve an entry node or a free-text query")
                .arg(Arg::new("domain").required(true).help("Domain id"))
                .arg(
                    Arg::new("entry")
                        .long("entry")
                        .conflicts_with("query")
                        .required_unless_present("query")
                        .help("Entry node id"),
                )
                .arg(Arg::new("query").long("query").help("Free-text intent"))
                .arg(
                    Arg::new("rationalize")
                        .long("rationalize")
                        .action(ArgAction::SetTrue)
                        .help("Unify duplicate functionality"),
                )
                .arg(
                    Arg::new("workflows")
                        .long("workflows")
                        .action(ArgAction::SetTrue)
                        .help("Enable cross-product workflows"),
                )
                .arg(
                    Arg::new("context")
                        .long("context")
                        .action(ArgAction::SetTrue)
                        .help("Supply a user context"),
                )
                .arg(
                    Arg::new("role")
                        .long("role")
                        .default_value("Analyst")
                        .help("Role of the user context"),
                )
                .arg(
                    Arg::new("recent")
                        .long("recent")
                        .value_delimiter(',')
                        .action(ArgAction::Append)
                        .help("Products of recent successful actions, oldest first"),
                ),
        )
        .subcommand(
            Command::new("validate")
                .about("Check domain integrity")
                .arg(Arg::new("domain").required(true).help("Domain id")),
        )
        .subcommand(
            Command::new("duplicates")
                .about("Show shared nodes and compare with similarity detection")
                .arg(Arg::new("domain").required(true).help("Domain id"))
                .arg(
                    Arg::new("threshold")
                        .long("threshold")
                        .default_value("0.85")
                        .value_parser(value_parser!(f64))
                        .help("Label similarity threshold"),
                ),
        )
        .subcommand(
            Command::new("suite")
                .about("Run declarative resolution test cases")
                .arg(
                    Arg::new("cases")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Case file (.yaml, .yml, .json)"),
                ),
        )
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    match run(&cli().get_matches()) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn run(matches: &ArgMatches) -> Result<ExitCode> {
    let root = matches
        .get_one::<PathBuf>("domains")
        .cloned()
        .unwrap_or_else(|| PathBuf::from("demos/domains"));
    let catalog = DomainCatalog::from_dir(root).strict(matches.get_flag("strict"));
    let json = matches.get_flag("json");

    match matches.subcommand() {
        Some(("list", _)) => {
            let domains = catalog.domains().context("listing domains")?;
            if json {
                print_json(&domains)?;
            } else {
                for domain in domains {
                    println!("{domain}");
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Some(("resolve", args)) => resolve(&catalog, args, json),
        Some(("validate", args)) => {
            let domain = load(&catalog, args)?;
            let report = domain.validate();
            if json {
                print_json(&report)?;
            } else {
                println!("Domain {}: {} nodes", domain.id(), domain.nodes().len());
                for issue in &report.issues {
                    let node = issue.node.as_ref().map(ToString::to_string).unwrap_or_default();
                    println!("  {:?} {:?} {node}: {}", issue.severity, issue.kind, issue.message);
                }
                println!(
                    "{} errors, {} warnings",
                    report.errors().count(),
                    report.warnings().count()
                );
            }
            Ok(exit(report.is_valid()))
        }
        Some(("duplicates", args)) => {
            let domain = load(&catalog, args)?;
            let threshold = args.get_one::<f64>("threshold").copied().unwrap_or(0.85);
            duplicates(&domain, threshold, json)?;
            Ok(ExitCode::SUCCESS)
        }
        Some(("suite", args)) => {
            let Some(path) = args.get_one::<PathBuf>("cases") else {
                bail!("missing case file");
            };
            let cases = load_cases(path).with_context(|| format!("loading cases from {}", path.display()))?;
            let report = SuiteRunner::new(&catalog).run(&cases);
            if json {
                print_json(&report)?;
            } else {
                print!("{report}");
            }
            Ok(exit(report.all_passed()))
        }
        _ => bail!("unknown subcommand"),
    }
}

fn load(catalog: &DomainCatalog, args: &ArgMatches) -> Result<std::sync::Arc<PreparedDomain>> {
    let Some(id) = args.get_one::<String>("domain") else {
        bail!("missing domain");
    };
    catalog.get(id).with_context(|| format!("loading domain '{id}'"))
}

fn resolve(catalog: &DomainCatalog, args: &ArgMatches, json: bool) -> Result<ExitCode> {
    let domain = load(catalog, args)?;
    let rationalize = args.get_flag("rationalize");

    let mut request = ResolutionRequest::new()
        .rationalized(rationalize)
        .workflows(args.get_flag("workflows"));
    if args.get_flag("context") {
        let role = args.get_one::<String>("role").cloned().unwrap_or_default();
        let recent = args
            .get_many::<String>("recent")
            .into_iter()
            .flatten()
            .map(|p| RecentAction::success(p.trim()));
        request = request
            .with_context(UserContext::for_role(role))
            .with_recent_actions(recent);
    }

    let entry = match (args.get_one::<String>("entry"), args.get_one::<String>("query")) {
        (Some(entry), _) => entry.clone(),
        (None, Some(query)) => {
            let matcher = domain.matcher();
            let Some(generated) = matcher.generate_query(query, rationalize, &domain.config().shared_marker) else {
                bail!("no node matches '{query}'");
            };
            tracing::info!(
                query = %query,
                entry = %generated.entry_node,
                score = generated.match_confidence,
                ambiguous = generated.is_ambiguous,
                "matched query"
            );
            generated.entry_node.into_string()
        }
        (None, None) => bail!("either --entry or --query is required"),
    };

    let resolution = domain.resolve(&entry, &request);
    if json {
        print_json(&resolution)?;
    } else {
        print_resolution(&domain, &resolution);
    }
    Ok(exit(resolution.is_resolved()))
}

fn print_resolution(domain: &PreparedDomain, resolution: &Resolution) {
    let label = domain
        .nodes()
        .get(resolution.entry_node.as_str())
        .map(|n| n.label.as_str())
        .unwrap_or("?");
    println!("Entry:      {} ({label})", resolution.entry_node);
    println!("Confidence: {}", resolution.confidence_score);
    println!("Reasoning:");
    for line in &resolution.reasoning {
        println!("  - {line}");
    }
    if !resolution.selected_actions.is_empty() {
        println!("Actions:");
        for action in &resolution.selected_actions {
            println!("  - {action}");
        }
    }
    for activation in &resolution.product_activation {
        let actions: Vec<&str> = activation.actions.iter().map(|a| a.as_str()).collect();
        println!(
            "Product {} ({:?}): {}",
            activation.product,
            activation.priority,
            actions.join(", ")
        );
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DuplicateSummary<'a> {
    shared_nodes: &'a [intent_graph::NodeId],
    duplicate_nodes: &'a [intent_graph::NodeId],
    alternatives: &'a intent_rationalization::RationalizedAlternatives,
    comparison: intent_rationalization::ConfigComparison,
}

fn duplicates(domain: &PreparedDomain, threshold: f64, json: bool) -> Result<()> {
    let detector = SimilarityDetector::new(SimilarityConfig::default().with_threshold(threshold))
        .with_shared_marker(domain.config().shared_marker.clone());
    let summary = DuplicateSummary {
        shared_nodes: domain.shared_nodes(),
        duplicate_nodes: domain.duplicate_nodes(),
        alternatives: domain.alternatives(),
        comparison: detector.compare_with(domain.nodes(), domain.alternatives()),
    };

    if json {
        return print_json(&summary);
    }

    for (shared, products) in summary.alternatives {
        println!("{shared}");
        for (product, duplicate) in products {
            println!("  {product:<12} {duplicate}");
        }
    }
    println!("{} duplicate nodes (including descendants)", summary.duplicate_nodes.len());
    let comparison = &summary.comparison;
    println!(
        "Similarity detection at {threshold}: {} matching, {} missing, {} extra",
        comparison.matches.len(),
        comparison.missing.len(),
        comparison.extra.len()
    );
    for id in &comparison.extra {
        let score = comparison.similarity.get(id).copied().unwrap_or_default();
        println!("  extra {id} (mean similarity {score:.2})");
    }
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).context("serializing output")?);
    Ok(())
}

fn exit(ok: bool) -> ExitCode {
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
