use std::path::Path;

use globe_viewer::ViewerConfig;

/// Opens the globe viewer, reading overrides from `globe.ron` in the working directory when it
/// exists.
fn main() -> anyhow::Result<()> {
    let config = ViewerConfig::load(Path::new("globe.ron"))?;
    globe_viewer::run(config)
}
