//! Clinical terminology normalization and current-medication extraction.
//!
//! Reference tables are loaded once (`ReferenceTables`) and borrowed by every
//! component; nothing here does I/O after startup or holds a lock.
//!
//! ```no_run
//! use clinorm::models::{ConsultationRecord, ConsultationType};
//! use clinorm::pipeline::MedicationExtractor;
//! use clinorm::reference::ReferenceTables;
//!
//! let tables = ReferenceTables::from_env()?;
//! let extractor = MedicationExtractor::new(&tables);
//! let record = ConsultationRecord::with_text(ConsultationType::Normal, "Doliprane 1 g tid");
//! let result = extractor.extract_current_medications(&[record]);
//! println!("{}", serde_json::to_string_pretty(&result).unwrap());
//! # Ok::<(), clinorm::reference::ConfigurationError>(())
//! ```

pub mod config;
pub mod models;
pub mod pipeline;
pub mod reference;
pub mod trace;

use tracing_subscriber::EnvFilter;

/// Install the global `fmt` subscriber. `RUST_LOG` overrides the default filter.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init();

    tracing::info!("{} v{}", config::APP_NAME, config::APP_VERSION);
}
