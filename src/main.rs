use fraudgraph::evidence::{DocumentCheck, InMemoryEvidenceStore, RiskAssessment, RiskLevel, Tip};
use fraudgraph::{EngineConfig, FraudGraph};
use std::sync::Arc;

fn main() -> anyhow::Result<()> {
    let config = EngineConfig::load(None)?;
    fraudgraph::logging::init(&config.log_level);

    println!("FraudGraph v{}", fraudgraph::version());
    println!("==========================================");
    println!();

    let graph = FraudGraph::open(config, Arc::new(sample_evidence()))?;

    demo_upsert(&graph)?;
    demo_auto_link(&graph)?;
    demo_retrieval(&graph)?;

    graph.flush()?;
    Ok(())
}

fn demo_upsert(graph: &FraudGraph) -> anyhow::Result<()> {
    println!("=== Demo 1: Upsert ===");
    let outcome = graph.upsert_entity("tip", "tip-100", None, None, true)?;
    println!(
        "✓ Tip tip-100 in chain {} ({} nodes, {} edges created)",
        outcome.chain_id.as_u64(),
        outcome.nodes_created,
        outcome.edges_created
    );

    let doc = graph.upsert_entity("document", "doc-7", None, Some(outcome.chain_id), false)?;
    graph.link_nodes(outcome.node_id, doc.node_id, "references", Some(70), Default::default())?;
    println!("✓ Document doc-7 linked to tip-100");

    let again = graph.upsert_entity("tip", "tip-100", None, None, true)?;
    println!("✓ Upsert again is a no-op (created = {})", again.created);
    println!();
    Ok(())
}

fn demo_auto_link(graph: &FraudGraph) -> anyhow::Result<()> {
    println!("=== Demo 2: Auto-link ===");
    let report = graph.auto_link_unclustered_evidence()?;
    println!(
        "✓ {} chains created, {} links added",
        report.chains_created, report.links_added
    );
    for summary in graph.list_chains()? {
        println!(
            "  - [{}] {} ({} nodes, {} edges)",
            summary.chain.id.as_u64(),
            summary.chain.display_name(),
            summary.node_count,
            summary.edge_count
        );
    }
    println!();
    Ok(())
}

fn demo_retrieval(graph: &FraudGraph) -> anyhow::Result<()> {
    println!("=== Demo 3: Subgraph & Search ===");
    let sub = graph.subgraph("tip", "tip-1", Some(2), None)?;
    println!("✓ Subgraph around tip-1: {} nodes, {} edges", sub.nodes.len(), sub.edges.len());

    for group in graph.search_nodes("acme", None, None)? {
        println!(
            "✓ Chain {}: {} matches {:?}",
            group.chain_id.as_u64(),
            group.count,
            group.reference_ids
        );
    }
    Ok(())
}

fn tip(id: &str, message: &str, created_at: i64) -> Tip {
    Tip {
        id: id.to_string(),
        message: message.to_string(),
        source: Some("demo".to_string()),
        created_at,
    }
}

fn assessment(id: &str, tip_id: &str, level: RiskLevel, score: f64, symbols: &[&str]) -> RiskAssessment {
    RiskAssessment {
        id: id.to_string(),
        tip_id: tip_id.to_string(),
        level,
        score,
        stock_symbols: symbols.iter().map(|s| s.to_string()).collect(),
        created_at: 0,
    }
}

fn sample_evidence() -> InMemoryEvidenceStore {
    InMemoryEvidenceStore::new()
        .with_tip(tip("tip-1", "ACME merger leaked, buy now", 1))
        .with_tip(tip("tip-2", "Insider says ACME doubles next week", 2))
        .with_tip(tip("tip-3", "ACME short squeeze incoming", 3))
        .with_tip(tip("tip-4", "Guaranteed 30% monthly returns", 4))
        .with_tip(tip("tip-5", "Secret forex bot never loses", 5))
        .with_tip(tip("tip-6", "Crypto presale, 100x guaranteed", 6))
        .with_tip(tip("tip-100", "Advisor promises risk-free IPO access", 7))
        .with_assessment(assessment("risk-1", "tip-1", RiskLevel::High, 91.0, &["ACME"]))
        .with_assessment(assessment("risk-2", "tip-2", RiskLevel::Medium, 65.0, &["acme"]))
        .with_assessment(assessment("risk-3", "tip-3", RiskLevel::High, 84.0, &["ACME"]))
        .with_assessment(assessment("risk-4", "tip-4", RiskLevel::High, 88.0, &[]))
        .with_assessment(assessment("risk-5", "tip-5", RiskLevel::High, 93.0, &[]))
        .with_assessment(assessment("risk-6", "tip-6", RiskLevel::High, 97.0, &[]))
        .with_assessment(assessment("risk-100", "tip-100", RiskLevel::High, 81.0, &[]))
        .with_document(DocumentCheck {
            id: "doc-7".to_string(),
            filename: "ipo_allocation.pdf".to_string(),
            anomalies: vec!["signature pasted".to_string()],
            score: 35.0,
        })
}
