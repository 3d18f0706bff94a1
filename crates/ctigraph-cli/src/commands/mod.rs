//! Command implementations.

pub mod extract;
pub mod prefilter;
pub mod scan;
pub mod select;
pub mod validate;

pub use self::extract::execute_extract;
pub use self::prefilter::execute_prefilter;
pub use self::scan::execute_scan;
pub use self::select::execute_select;
pub use self::validate::execute_validate;

use crate::cli::OllamaArgs;
use crate::error::Result;
use crate::output::Formatter;
use ctigraph_extractor::ExtractorConfig;
use ctigraph_llm::OllamaProvider;
use std::time::Duration;
use tracing::{debug, warn};

/// Apply `--timeout` to the extractor settings.
fn apply_timeout(args: &OllamaArgs, config: &mut ExtractorConfig) {
    if let Some(secs) = args.timeout {
        config.extraction_timeout_secs = secs;
    }
}

/// Build the Ollama provider and check that the model is installed.
///
/// An unreachable service or a missing model is reported, not fatal:
/// each unit will then fail and be counted as an error.
async fn connect_ollama(
    args: &OllamaArgs,
    config: &ExtractorConfig,
    formatter: &Formatter,
) -> Result<OllamaProvider> {
    let provider = OllamaProvider::with_timeout(
        &args.url,
        &args.model,
        Duration::from_secs(config.extraction_timeout_secs),
    )?;

    match provider.has_model().await {
        Ok(true) => debug!("Model {} available at {}", provider.model(), provider.endpoint()),
        Ok(false) => {
            warn!("Model {} not found at {}", provider.model(), provider.endpoint());
            eprintln!(
                "{}",
                formatter.warning(&format!(
                    "Model '{}' is not installed (try: ollama pull {})",
                    provider.model(),
                    provider.model()
                ))
            );
        }
        Err(e) => {
            warn!("Could not list models at {}: {}", provider.endpoint(), e);
            eprintln!(
                "{}",
                formatter.warning(&format!("Ollama at {} is not reachable: {}", provider.endpoint(), e))
            );
        }
    }

    Ok(provider)
}
