//! Figure loading from the source-document store.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::models::plan::ContentPlan;

use super::types::ReferenceImage;

/// Load every figure in the plan. Paths resolve against `plan.base_path`
/// when it is set. Missing or unreadable files are skipped.
pub fn load_figure_images(plan: &ContentPlan) -> HashMap<String, ReferenceImage> {
    let mut images = HashMap::with_capacity(plan.figures.len());

    for (figure_id, figure) in &plan.figures {
        let path: PathBuf = if plan.base_path.as_os_str().is_empty() {
            figure.image_path.clone()
        } else {
            plan.base_path.join(&figure.image_path)
        };

        let data = match std::fs::read(&path) {
            Ok(data) if !data.is_empty() => data,
            Ok(_) => {
                tracing::debug!(figure_id = %figure_id, path = %path.display(), "Figure file is empty, skipping");
                continue;
            }
            Err(e) => {
                tracing::debug!(figure_id = %figure_id, path = %path.display(), error = %e, "Figure not loadable, skipping");
                continue;
            }
        };

        let mime_type = mime_guess::from_path(&path)
            .first()
            .filter(|m| m.type_() == mime_guess::mime::IMAGE)
            .map(|m| m.essence_str().to_string())
            .unwrap_or_else(|| "image/jpeg".to_string());

        images.insert(
            figure_id.clone(),
            ReferenceImage::new(figure_id, figure.caption.as_deref(), data, &mime_type),
        );
    }

    tracing::debug!(loaded = images.len(), declared = plan.figures.len(), "Figures loaded");
    images
}
