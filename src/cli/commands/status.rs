//! Status command: show the release in progress.

use crate::cli::{Args, OutputManager};
use crate::error::Result;
use crate::state::create_state_manager;
use path_absolutize::Absolutize;

/// Execute the status command
pub(super) fn execute_status(args: &Args, output: &OutputManager, json: bool) -> Result<i32> {
    let releases_dir = args.releases_dir.absolutize()?.into_owned();
    let store = create_state_manager(&releases_dir);

    let Some(checkpoint) = store.load_if_exists()? else {
        if json {
            println!("{{\"status\": \"no_active_release\"}}");
        } else {
            output.println("No release in progress");
        }
        return Ok(0);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&checkpoint)?);
        return Ok(0);
    }

    output.println(&checkpoint.summary());
    output.verbose(&format!("Status file: {}", store.path().display()));
    if let Some(head) = &checkpoint.head_before_release {
        output.indent(&format!("Started from {}", head));
    }
    if let Some(old) = &checkpoint.old_snapshot_version {
        output.indent(&format!("Previous development version {}", old));
    }
    for record in checkpoint.verified_uploads.iter().flatten() {
        output.indent(&format!("{}: {}", record.name, record.status));
    }
    Ok(0)
}
