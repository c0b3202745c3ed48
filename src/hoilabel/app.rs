// SPDX-License-Identifier: GPL-2.0-or-later

use annotations::{
    CategoryPools, GroundTruth, LoadGroundTruthError, LoadSplitsError, Splits, load_ground_truth,
};
use catalog::{Catalog, LoadCatalogError};
use common::{ArcLogger, CandidateTable, ImageId, LabelTable, LogEntry, LogLevel};
use env::{EnvConf, EnvConfigNewError};
use labeldb::{CreateDbError, FinishError, OpenDbError, PutError, Reader, Writer};
use labeler::label_image;
use log::Logger;
use std::{path::PathBuf, sync::Arc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("create env config: {0}")]
    NewEnvConfig(#[from] EnvConfigNewError),

    #[error("serialize config snapshot: {0}")]
    SerializeConfig(serde_json::Error),

    #[error("write config snapshot: {0}")]
    WriteConfig(std::io::Error),

    #[error("load catalog: {0}")]
    LoadCatalog(#[from] LoadCatalogError),

    #[error("load splits: {0}")]
    LoadSplits(#[from] LoadSplitsError),

    #[error("unknown subset: '{0}'")]
    UnknownSubset(String),

    #[error("load ground truth: {0}")]
    LoadGroundTruth(#[from] LoadGroundTruthError),

    #[error("open candidate db: {0}")]
    OpenCandidateDb(#[from] OpenDbError),

    #[error("create label db: {0}")]
    CreateLabelDb(#[from] CreateDbError),

    #[error("write labels: {0}")]
    WriteLabels(#[from] PutError),

    #[error("finish label db: {0}")]
    FinishLabelDb(#[from] FinishError),
}

pub async fn run(config_path: &PathBuf) -> Result<(), RunError> {
    let app = App::new(config_path).await?;
    app.run().await
}

struct App {
    env: EnvConf,
    logger: ArcLogger,
    catalog: Catalog,
    ground_truth: GroundTruth,
    split_ids: Vec<ImageId>,
}

impl App {
    async fn new(config_path: &PathBuf) -> Result<Self, RunError> {
        let env = EnvConf::new(config_path)?;
        let logger: ArcLogger = Arc::new(Logger::new());

        // Snapshot the run configuration next to the outputs.
        let snapshot = serde_json::to_vec_pretty(&env).map_err(RunError::SerializeConfig)?;
        tokio::fs::write(env.exp_dir().join("config.json"), snapshot)
            .await
            .map_err(RunError::WriteConfig)?;

        let catalog = Catalog::load(&env.hoi_list())?;
        let splits = Splits::load(&env.split_ids())?;
        let split_ids = splits
            .get(env.subset())
            .ok_or_else(|| RunError::UnknownSubset(env.subset().to_string()))?
            .to_vec();
        let ground_truth = load_ground_truth(&env.anno_list(), &split_ids)?;

        Ok(Self {
            env,
            logger,
            catalog,
            ground_truth,
            split_ids,
        })
    }

    async fn run(self) -> Result<(), RunError> {
        let mut candidate_db = Reader::open(self.env.hoi_candidates()).await?;

        let labels_path = self
            .env
            .exp_dir()
            .join(format!("hoi_candidate_labels_{}", self.env.subset()));
        let mut label_db = Writer::create(&labels_path).await?;

        self.log(
            LogLevel::Info,
            None,
            format!(
                "labeling subset '{}' with {} images",
                self.env.subset(),
                self.split_ids.len(),
            ),
        );

        let empty_pools = CategoryPools::new();
        let mut candidate_count = 0;
        for image_id in &self.split_ids {
            let labels = match self.label_one(&mut candidate_db, &empty_pools, image_id).await {
                Ok(v) => v,
                Err(e) => {
                    // Log and continue. Other images are unaffected.
                    self.log(
                        LogLevel::Error,
                        Some(image_id.clone()),
                        format!("skipping image: {e}"),
                    );
                    continue;
                }
            };

            candidate_count += labels.len();
            label_db.put(image_id, &labels).await?;
        }

        let image_count = label_db.len();
        label_db.finish().await?;

        self.log(
            LogLevel::Info,
            None,
            format!("done, labeled {candidate_count} candidates in {image_count} images"),
        );
        Ok(())
    }

    async fn label_one(
        &self,
        candidate_db: &mut Reader,
        empty_pools: &CategoryPools,
        image_id: &ImageId,
    ) -> Result<LabelTable, LabelOneError> {
        use LabelOneError::*;
        let candidates: CandidateTable = candidate_db
            .get(image_id)
            .await?
            .ok_or(MissingCandidates)?;

        // Images without any interaction have no pools.
        let pools = self.ground_truth.get(image_id).unwrap_or(empty_pools);

        Ok(label_image(&self.catalog, pools, &candidates)?)
    }

    fn log(&self, level: LogLevel, image_id: Option<ImageId>, msg: String) {
        self.logger.log(LogEntry::new(level, "app", image_id, msg));
    }
}

#[derive(Debug, Error)]
enum LabelOneError {
    #[error("read candidates: {0}")]
    ReadCandidates(#[from] labeldb::GetError),

    #[error("no candidate table")]
    MissingCandidates,

    #[error("label: {0}")]
    Label(#[from] labeler::LabelImageError),
}
