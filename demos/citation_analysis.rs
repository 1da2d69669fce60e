//! Citation network analysis example
//!
//! Demonstrates community detection, core/periphery structure, path queries
//! and ranking evaluation on a synthetic temporal citation network
//!
//! Run with: cargo run --example citation_analysis

use anyhow::{Context, Result};
use bibgraph_core::{
    compare_rankings, core_numbers, core_periphery, detect, evaluate, pagerank, pagerank_ranker,
    run_preset, shortest_path_ranker, temporal_citation_network, CitationNetworkConfig,
    CommunityAlgorithm, CorePeripheryConfig, HierarchicalConfig, InfomapConfig,
    LabelPropagationConfig, LeidenConfig, LouvainConfig, PageRankConfig, PathPreset, PresetConfig,
    SpectralConfig,
};

fn main() -> Result<()> {
    println!("📚 bibgraph-core: Citation Network Analysis\n");

    // 1. Generate a citation network: 4 fields, 40 papers each
    println!("📊 Generating citation network...");
    let (graph, fields) = temporal_citation_network(&CitationNetworkConfig::default())?;
    println!(
        "  ✅ {} papers, {} citations, {} fields\n",
        graph.node_count(),
        graph.edge_count(),
        fields.len()
    );

    // 2. Community detection with every algorithm
    println!("🧩 Community detection:");
    let algorithms = [
        CommunityAlgorithm::Louvain(LouvainConfig::default()),
        CommunityAlgorithm::Leiden(LeidenConfig::default()),
        CommunityAlgorithm::LabelPropagation(LabelPropagationConfig::default()),
        CommunityAlgorithm::Infomap(InfomapConfig::default()),
        CommunityAlgorithm::Spectral(SpectralConfig::default().with_num_clusters(4)),
        CommunityAlgorithm::Hierarchical(HierarchicalConfig::default().with_num_clusters(4)),
    ];
    for algorithm in &algorithms {
        let result = detect(&graph, algorithm)?;
        println!(
            "  {:<18} {:>3} communities, modularity {:.3}, converged: {}",
            result.metadata.algorithm,
            result.num_communities,
            result.modularity,
            result.metadata.converged
        );
    }
    println!();

    // 3. Core structure
    println!("🎯 Core structure:");
    let decomposition = core_numbers(&graph)?;
    println!("  Degeneracy: {}", decomposition.degeneracy);
    if let Some(fit) = core_periphery(&graph, &CorePeripheryConfig::default())? {
        println!(
            "  Core/periphery: {} core, {} periphery, fit {:.3}\n",
            fit.core_nodes.len(),
            fit.periphery_nodes.len(),
            fit.fit_quality
        );
    }

    // 4. Most influential papers
    println!("⭐ PageRank (top 5):");
    let ranks = pagerank(&graph, &PageRankConfig::default())?;
    let mut by_score: Vec<(&String, &f64)> = ranks.scores.iter().collect();
    by_score.sort_by(|a, b| b.1.total_cmp(a.1).then_with(|| a.0.cmp(b.0)));
    for (id, score) in by_score.iter().take(5) {
        println!("  {id:<6} {score:.4}");
    }
    println!();

    // 5. Citation paths from the newest paper to the most cited one
    let newest = format!("W{}", graph.node_count() - 1);
    let (target, _) = by_score.first().context("empty network")?;
    println!("🔗 Citation paths {newest} → {target}:");
    let paths = run_preset(
        &graph,
        &newest,
        Some(target.as_str()),
        PathPreset::AllPaths,
        &PresetConfig::default().with_max_hops(4).with_max_paths(200),
    )?
    .paths;
    println!("  Found {} paths within 4 hops", paths.len());

    if !paths.is_empty() {
        let by_length = shortest_path_ranker(&paths);
        let by_pagerank = pagerank_ranker(&graph, &paths, &PageRankConfig::default())?;

        let key = |nodes: &[String]| nodes.join(">");
        let length_order: Vec<String> = by_length.iter().map(|r| key(&r.path.nodes)).collect();
        let pagerank_order: Vec<String> = by_pagerank.iter().map(|r| key(&r.path.nodes)).collect();

        let agreement = compare_rankings(&length_order, &pagerank_order);
        println!(
            "  Ranker agreement: spearman {:.3}, kendall {:.3}",
            agreement.spearman, agreement.kendall_tau
        );

        let relevant: Vec<String> = length_order.iter().take(3).cloned().collect();
        let report = evaluate(&pagerank_order, &relevant, 5);
        println!(
            "  PageRank ranker vs shortest paths: P@5 {:.3}, nDCG@5 {:.3}, MRR {:.3}",
            report.precision_at_k, report.ndcg_at_k, report.mean_reciprocal_rank
        );
    }

    println!("\n🎉 Analysis complete!");
    Ok(())
}
