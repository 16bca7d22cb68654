//! FraudGraph CLI: command-line interface for the fraud-chain engine
//!
//! Opens the graph named by the configuration (or `--data`) directly and
//! reads evidence from a JSON file given with `--evidence`.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use comfy_table::{ContentArrangement, Table};
use fraudgraph::evidence::InMemoryEvidenceStore;
use fraudgraph::{ChainId, EngineConfig, ExportFormat, FraudGraph, PropertyMap, Subgraph};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "fraudgraph", version, about = "FraudGraph fraud-chain engine CLI")]
struct Cli {
    /// YAML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// RocksDB data directory, overrides the configuration
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// Evidence JSON file ({"tips": [...], "assessments": [...], "documents": [...]})
    #[arg(long, global = true)]
    evidence: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, clap::ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Place one piece of evidence in the graph
    Upsert {
        /// Node type (tip, assessment, document, advisor)
        node_type: String,
        /// Evidence id
        reference_id: String,
        #[arg(long)]
        label: Option<String>,
        /// Target chain id
        #[arg(long)]
        chain: Option<u64>,
        /// Fail instead of creating a chain
        #[arg(long)]
        no_create: bool,
    },
    /// Cluster assessed tips that are not yet graphed
    AutoLink,
    /// Neighbourhood of a node
    Subgraph {
        node_type: String,
        reference_id: String,
        #[arg(long)]
        depth: Option<usize>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Substring search over nodes
    Search {
        query: String,
        #[arg(long)]
        chain: Option<u64>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// List chains, or show one
    Chains {
        id: Option<u64>,
    },
    /// Export a chain
    Export {
        chain: u64,
        /// json or csv
        #[arg(long = "as", default_value = "json")]
        export_format: String,
    },
    /// Graph counters
    Status,
    /// Delete every chain
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = EngineConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(data) = cli.data {
        config.data_path = Some(data);
    }
    fraudgraph::logging::init(&config.log_level);

    let evidence = match &cli.evidence {
        Some(path) => InMemoryEvidenceStore::from_json_file(path)
            .with_context(|| format!("loading evidence from {}", path.display()))?,
        None => InMemoryEvidenceStore::new(),
    };
    let graph = FraudGraph::open(config, Arc::new(evidence))?;

    match cli.command {
        Commands::Upsert {
            node_type,
            reference_id,
            label,
            chain,
            no_create,
        } => {
            let outcome = graph.upsert_entity(
                &node_type,
                &reference_id,
                label.as_deref(),
                chain.map(ChainId::new),
                !no_create,
            )?;
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
                OutputFormat::Table => {
                    let verb = if outcome.created { "Created" } else { "Found" };
                    println!(
                        "{} node {} in chain {} ({} nodes, {} edges added)",
                        verb,
                        outcome.node_id.as_u64(),
                        outcome.chain_id.as_u64(),
                        outcome.nodes_created,
                        outcome.edges_created
                    );
                }
            }
        }
        Commands::AutoLink => {
            let report = graph.auto_link_unclustered_evidence()?;
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
                OutputFormat::Table => {
                    println!("Chains created: {}", report.chains_created);
                    println!("Links added:    {}", report.links_added);
                    for name in &report.failed_clusters {
                        println!("Failed:         {}", name);
                    }
                }
            }
        }
        Commands::Subgraph {
            node_type,
            reference_id,
            depth,
            limit,
        } => {
            let sub = graph.subgraph(&node_type, &reference_id, depth, limit)?;
            print_subgraph(&sub, &cli.format)?;
        }
        Commands::Search { query, chain, limit } => {
            let groups = graph.search_nodes(&query, chain.map(ChainId::new), limit)?;
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&groups)?),
                OutputFormat::Table => {
                    if groups.is_empty() {
                        println!("(no results)");
                        return Ok(());
                    }
                    let mut table = new_table(&["Chain", "Count", "References"]);
                    for group in &groups {
                        table.add_row(vec![
                            group.chain_id.as_u64().to_string(),
                            group.count.to_string(),
                            group.reference_ids.join(", "),
                        ]);
                    }
                    println!("{}", table);
                }
            }
        }
        Commands::Chains { id: Some(id) } => {
            let detail = graph.get_chain(ChainId::new(id))?;
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&detail)?),
                OutputFormat::Table => {
                    println!("Chain:  {} ({})", detail.chain.display_name(), detail.chain.status);
                    if let Some(description) = &detail.chain.description {
                        println!("        {}", description);
                    }
                    print_subgraph(
                        &Subgraph {
                            nodes: detail.nodes,
                            edges: detail.edges,
                            truncated: false,
                        },
                        &OutputFormat::Table,
                    )?;
                }
            }
        }
        Commands::Chains { id: None } => {
            let chains = graph.list_chains()?;
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&chains)?),
                OutputFormat::Table => {
                    if chains.is_empty() {
                        println!("(no chains)");
                        return Ok(());
                    }
                    let mut table = new_table(&["Id", "Name", "Status", "Nodes", "Edges"]);
                    for summary in &chains {
                        table.add_row(vec![
                            summary.chain.id.as_u64().to_string(),
                            summary.chain.display_name(),
                            summary.chain.status.to_string(),
                            summary.node_count.to_string(),
                            summary.edge_count.to_string(),
                        ]);
                    }
                    println!("{}", table);
                    println!("{} chain(s)", chains.len());
                }
            }
        }
        Commands::Export { chain, export_format } => {
            let format: ExportFormat = export_format.parse().map_err(anyhow::Error::msg)?;
            print!("{}", graph.export_chain(ChainId::new(chain), format)?);
        }
        Commands::Status => {
            let stats = graph.stats()?;
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
                OutputFormat::Table => {
                    println!("Version: {}", fraudgraph::version());
                    println!("Backend: {}", stats.backend);
                    println!("Chains:  {}", stats.chains);
                    println!("Nodes:   {}", stats.nodes);
                    println!("Edges:   {}", stats.edges);
                    for (node_type, count) in &stats.node_types {
                        println!("  {:<12} {}", node_type, count);
                    }
                }
            }
        }
        Commands::Reset { yes } => {
            if !yes {
                bail!("reset deletes every chain; pass --yes to confirm");
            }
            let report = graph.reset()?;
            println!(
                "Removed {} chains, {} nodes, {} edges",
                report.chains_removed, report.nodes_removed, report.edges_removed
            );
        }
    }

    graph.flush()?;
    Ok(())
}

fn new_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header.to_vec());
    table
}

fn format_metadata(metadata: &PropertyMap) -> String {
    metadata
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_subgraph(sub: &Subgraph, format: &OutputFormat) -> anyhow::Result<()> {
    if let OutputFormat::Json = format {
        println!("{}", serde_json::to_string_pretty(sub)?);
        return Ok(());
    }
    if sub.is_empty() {
        println!("(no results)");
        return Ok(());
    }

    let mut nodes = new_table(&["Node", "Type", "Reference", "Label", "Metadata"]);
    for node in &sub.nodes {
        nodes.add_row(vec![
            node.id.as_u64().to_string(),
            node.node_type.to_string(),
            node.reference_id.clone(),
            node.label.clone().unwrap_or_default(),
            format_metadata(&node.metadata),
        ]);
    }
    println!("{}", nodes);

    if !sub.edges.is_empty() {
        let mut edges = new_table(&["Edge", "From", "To", "Relationship", "Confidence"]);
        for edge in &sub.edges {
            edges.add_row(vec![
                edge.id.as_u64().to_string(),
                edge.from_node_id.as_u64().to_string(),
                edge.to_node_id.as_u64().to_string(),
                edge.relationship_type.to_string(),
                edge.confidence.to_string(),
            ]);
        }
        println!("{}", edges);
    }
    println!("{} node(s), {} edge(s)", sub.nodes.len(), sub.edges.len());
    if sub.truncated {
        println!("(truncated at node limit)");
    }
    Ok(())
}
