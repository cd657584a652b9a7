use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use crate::{
    recommend::{
        engine::{RecommendationEngine, DEFAULT_CLUSTER_COUNT},
        sources::JsonFileSource,
    },
    utils::shutdown::detect_shutdown,
};

use super::format::print_items;

#[derive(Debug, Parser)]
pub struct RecommendCommand {
    #[arg(long, help = "Json array of applications with name and identifier")]
    catalog: PathBuf,
    #[arg(long, help = "Json array of past quest choices with identifier and chosen_at")]
    history: PathBuf,
    #[arg(long, default_value_t = DEFAULT_CLUSTER_COUNT, help = "Number of clusters the catalog is split into")]
    clusters: usize,
    #[arg(long, help = "Seed for reproducible recommendations")]
    seed: Option<u64>,
}

pub async fn process_recommend_command(
    RecommendCommand {
        catalog,
        history,
        clusters,
        seed,
    }: RecommendCommand,
) -> Result<()> {
    let cancel = CancellationToken::new();
    tokio::spawn(detect_shutdown(cancel.clone()));

    let engine = RecommendationEngine::new(clusters, seed);
    let result = engine
        .recommend_in_background(
            JsonFileSource::new(catalog),
            JsonFileSource::new(history),
            cancel.clone(),
        )
        .await;
    cancel.cancel();

    if let Some(items) = result? {
        print_items(&items);
    }
    Ok(())
}
