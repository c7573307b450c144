//! Shared request-time services: storage, token issuing and file handling.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Duration;
use tracing::{info, warn};

use stockroom_auth::Hs256Jwt;
use stockroom_core::{GoodsReceiveId, ProductId};
use stockroom_infra::{AppConfig, Store};
use stockroom_invoicing::{InvoiceDocument, render_pdf};
use stockroom_products::ImageKind;

use crate::app::errors::ApiError;

pub struct AppServices {
    pub store: Arc<dyn Store>,
    pub jwt: Hs256Jwt,
    pub config: AppConfig,
}

impl AppServices {
    pub fn new(config: AppConfig, store: Arc<dyn Store>) -> Self {
        let jwt = Hs256Jwt::new(
            config.jwt_secret.as_bytes(),
            Duration::minutes(config.jwt_ttl_minutes),
        );
        Self { store, jwt, config }
    }

    pub fn upload_root(&self) -> &Path {
        &self.config.upload_dir
    }

    fn upload_path(&self, relative: &str) -> PathBuf {
        self.config.upload_dir.join(relative)
    }

    /// Write a product picture and return its path relative to the upload root.
    pub async fn store_product_image(
        &self,
        product_id: ProductId,
        kind: ImageKind,
        bytes: &[u8],
    ) -> Result<String, ApiError> {
        let relative = kind.storage_path(product_id);
        let path = self.upload_path(&relative);
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| ApiError::Internal(format!("create upload dir: {e}")))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| ApiError::Internal(format!("write upload: {e}")))?;
        info!(%product_id, path = %relative, size = bytes.len(), "stored product image");
        Ok(relative)
    }

    /// Best-effort removal of a file that is no longer referenced.
    pub async fn remove_upload(&self, relative: &str) {
        if relative.contains("..") {
            return;
        }
        if let Err(e) = tokio::fs::remove_file(self.upload_path(relative)).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %relative, error = %e, "could not remove old upload");
            }
        }
    }

    /// Render the printable invoice for a goods receive.
    pub async fn goods_receive_invoice(&self, id: GoodsReceiveId) -> Result<(String, Vec<u8>), ApiError> {
        let receive = self.store.get_goods_receive(id).await?;
        let supplier = self.store.get_supplier(receive.supplier_id).await?;

        let mut labels: HashMap<ProductId, String> = HashMap::new();
        for item in &receive.items {
            if labels.contains_key(&item.product_id) {
                continue;
            }
            let label = match self.store.get_product(item.product_id).await {
                Ok(p) => format!("{} ({})", p.name, p.code),
                Err(_) => item.product_id.to_string(),
            };
            labels.insert(item.product_id, label);
        }

        let doc = InvoiceDocument::for_goods_receive(
            &self.config.company_name,
            &receive,
            &supplier,
            |pid| labels.get(&pid).cloned().unwrap_or_else(|| pid.to_string()),
        );
        let bytes = tokio::task::spawn_blocking(move || render_pdf(&doc))
            .await
            .map_err(|e| ApiError::Internal(format!("render task: {e}")))??;
        Ok((receive.reference, bytes))
    }
}
