//! mira-encoder-server: HTTP front end for the face-encoding pipelines.
//!
//! Wires the Supabase object store and the ONNX embedding oracle into the
//! encode and merge use cases and serves them over axum.

pub mod config;
pub mod error;
pub mod http;

use std::net::SocketAddr;
use std::sync::Arc;

use mira_encoder_core::encoding::domain::embedding_oracle::EmbeddingOracle;
use mira_encoder_core::encoding::infrastructure::model_resolver::{self, ProgressFn};
use mira_encoder_core::encoding::infrastructure::onnx_embedding_oracle::OnnxEmbeddingOracle;
use mira_encoder_core::storage::domain::blob_store::BlobStore;
use mira_encoder_core::storage::infrastructure::supabase_blob_store::SupabaseBlobStore;

use crate::config::ServerConfig;
use crate::http::{AppState, OracleHandle};

/// Build the collaborators, then serve until Ctrl-C.
///
/// The blocking HTTP client and the ONNX sessions are created before the
/// async runtime starts, and the store handle outlives the runtime.
pub fn run(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store: Arc<dyn BlobStore> = Arc::new(SupabaseBlobStore::new(
        &config.supabase_url,
        &config.supabase_key,
        &config.bucket,
        config.store_timeout,
    )?);
    log::info!(
        "Object store: {} (bucket {})",
        config.supabase_url,
        config.bucket
    );

    let state = AppState {
        store: store.clone(),
        oracle: load_oracle(&config),
        settings: config.pipeline_settings(),
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(serve(config.bind, state))?;
    drop(runtime);
    drop(store);
    Ok(())
}

/// A failed model load leaves the service up; `/encode` then reports it.
fn load_oracle(config: &ServerConfig) -> OracleHandle {
    let progress: ProgressFn = Box::new(download_progress);
    let loaded = model_resolver::resolve_face_models(config.model_dir.as_deref(), Some(&progress))
        .map_err(|e| e.to_string())
        .and_then(|paths| {
            OnnxEmbeddingOracle::new(&paths.detector, &paths.embedder, config.confidence)
                .map_err(|e| e.to_string())
        });

    match loaded {
        Ok(oracle) => {
            log::info!("Face models loaded");
            Ok(Arc::new(oracle) as Arc<dyn EmbeddingOracle>)
        }
        Err(reason) => {
            log::error!("Face models unavailable, /encode will fail: {reason}");
            Err(reason)
        }
    }
}

async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("mira-encoder listening on {addr}");
    axum::serve(listener, http::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Cannot listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    log::info!("Shutting down");
}

fn download_progress(name: &str, downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading {name}... {pct}%");
        if downloaded >= total {
            eprintln!();
        }
    } else {
        eprint!("\rDownloading {name}... {downloaded} bytes");
    }
}
