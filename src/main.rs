use std::io::{self, BufWriter};

use tracing::{error, info};

use searchfs::config;
use searchfs::feature::{run_search, JsonLinesSink};
use searchfs::loader::ConfigLoader;
use searchfs::logging;
use searchfs::storage;
use searchfs::types::SearchRequest;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration (embedded defaults -> searchfs.toml -> env/.env)
    let app_cfg = config::load()?;
    let _log_guards = logging::init(&app_cfg.logging)?;

    let managers = storage::default_managers(Some(app_cfg.timezone()?))?;

    let mut request: SearchRequest = ConfigLoader::new(&managers)
        .max_chain_length(app_cfg.max_chain_length())
        .load_from_file(app_cfg.request.location, &app_cfg.request.path, None)?;
    let options = request.options.get_or_insert_with(|| app_cfg.search_options());
    config::validate_search_options(options)?;
    info!("Loaded request '{}' from {}/{}", request.label, app_cfg.request.location, app_cfg.request.path);

    // Filesystem walking blocks; keep it off the async workers.
    let published = tokio::task::spawn_blocking(move || {
        let mut sink = JsonLinesSink::new(BufWriter::new(io::stdout().lock()));
        run_search(&managers, &request, &mut sink)
    })
    .await?
    .map_err(|e| {
        error!("Search failed: {}", e);
        e
    })?;

    info!("Done, {} records published", published);
    Ok(())
}
