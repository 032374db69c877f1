// Backup snapshots of generated clips.
//
// A snapshot is the assembled Clip written as pretty JSON next to the
// rendered output, so a clip can be reloaded and re-rendered without
// regenerating it. Loading runs the same shortfall check as assembly.

use crate::clip::Clip;
use crate::error::Result;
use std::path::Path;
use tracing::info;

/// Write `clip` to `path` as pretty JSON.
pub fn save(clip: &Clip, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(clip)?;
    std::fs::write(path, json)?;
    info!(path = %path.display(), "snapshot saved");
    Ok(())
}

/// Read a clip written by [`save`].
pub fn load(path: &Path) -> Result<Clip> {
    let data = std::fs::read_to_string(path)?;
    let clip: Clip = serde_json::from_str(&data)?;
    clip.check()?;
    Ok(clip)
}
