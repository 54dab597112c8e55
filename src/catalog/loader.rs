use std::path::Path;

use log::{debug, info};

use super::types::{CaptureTarget, ResortRecord};
use crate::error_handling::types::CatalogError;

/// Reads the streams file and flattens it into capture targets, in catalog
/// order.
///
/// Disabled resorts and links without a stream address are dropped.
pub fn load_targets(path: &Path) -> Result<Vec<CaptureTarget>, CatalogError> {
    if !path.exists() {
        return Err(CatalogError::NotFound(path.to_path_buf()));
    }
    let text = std::fs::read_to_string(path)?;
    let resorts: Vec<ResortRecord> =
        serde_json::from_str(&text).map_err(|e| CatalogError::Malformed(e.to_string()))?;
    let targets = flatten(resorts)?;
    info!(
        "Loaded {} capture targets from {}",
        targets.len(),
        path.display()
    );
    Ok(targets)
}

/// Turns resort records into capture targets.
///
/// Links of a disabled resort are never looked at. A link list that cannot
/// be read on an enabled resort makes the whole catalog malformed.
pub fn flatten(resorts: Vec<ResortRecord>) -> Result<Vec<CaptureTarget>, CatalogError> {
    let mut targets = Vec::new();
    for resort in resorts {
        if resort.is_disabled() {
            debug!("Skipping disabled resort {}", resort.id);
            continue;
        }
        let links = resort.camera_links().map_err(|e| {
            CatalogError::Malformed(format!("links of resort {:?}: {}", resort.id, e))
        })?;
        for link in links {
            if link.video.is_empty() {
                debug!("Skipping {} ({}) without stream", resort.name, link.name);
                continue;
            }
            targets.push(CaptureTarget {
                resort_id: resort.id.clone(),
                resort_name: resort.name.clone(),
                slope_name: link.name,
                stream_url: link.video,
            });
        }
    }
    Ok(targets)
}

/// Keeps the first `max` targets. `None` leaves the list untouched.
pub fn truncate_targets(mut targets: Vec<CaptureTarget>, max: Option<usize>) -> Vec<CaptureTarget> {
    if let Some(max) = max.filter(|m| *m > 0) {
        if targets.len() > max {
            info!("Limiting run to the first {} of {} targets", max, targets.len());
            targets.truncate(max);
        }
    }
    targets
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CATALOG: &str = r#"[
        {
            "id": "alpha",
            "name": "Alpha Resort",
            "links": [
                {"name": "Summit", "video": "https://cams.example/alpha/summit.m3u8", "link": "https://alpha.example"},
                {"name": "Base", "video": ""},
                {"name": "Lift 3", "video": "https://cams.example/alpha/lift3.m3u8"}
            ]
        },
        {
            "id": "beta",
            "name": "Beta Valley",
            "fetch": false,
            "links": [
                {"name": "Top", "video": "https://cams.example/beta/top.m3u8"}
            ]
        },
        {
            "name": "Gamma Peak",
            "links": [
                {"name": "North", "video": "https://cams.example/gamma/north.m3u8"},
                {"name": "Parking"}
            ]
        },
        {
            "id": "delta",
            "name": "Delta"
        }
    ]"#;

    fn write_catalog(dir: &TempDir, body: &str) -> std::path::PathBuf {
        let path = dir.path().join("links.json");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn flattens_enabled_links_in_order() {
        let dir = TempDir::new().unwrap();
        let targets = load_targets(&write_catalog(&dir, CATALOG)).unwrap();

        let slopes: Vec<(&str, &str)> = targets
            .iter()
            .map(|t| (t.resort_id.as_str(), t.slope_name.as_str()))
            .collect();
        assert_eq!(
            slopes,
            vec![("alpha", "Summit"), ("alpha", "Lift 3"), ("", "North")]
        );
        assert_eq!(targets[2].resort_name, "Gamma Peak");
        assert_eq!(targets[0].stream_url, "https://cams.example/alpha/summit.m3u8");
    }

    #[test]
    fn disabled_resort_contributes_nothing() {
        let dir = TempDir::new().unwrap();
        let targets = load_targets(&write_catalog(&dir, CATALOG)).unwrap();
        assert!(targets.iter().all(|t| t.resort_id != "beta"));
    }

    #[test]
    fn disabled_resort_links_are_never_read() {
        let dir = TempDir::new().unwrap();
        for links in [r#"{"todo": true}"#, r#"["https://legacy/b.m3u8"]"#, "7"] {
            let body = format!(
                r#"[
                    {{"id": "a", "name": "A", "links": [{{"name": "Top", "video": "https://cams.example/a.m3u8"}}]}},
                    {{"id": "b", "fetch": false, "links": {}}}
                ]"#,
                links
            );
            let targets = load_targets(&write_catalog(&dir, &body))
                .unwrap_or_else(|e| panic!("links {} rejected: {}", links, e));
            assert_eq!(targets.len(), 1);
            assert_eq!(targets[0].resort_id, "a");
        }
    }

    #[test]
    fn unreadable_links_on_enabled_resort_are_malformed() {
        let dir = TempDir::new().unwrap();
        let path = write_catalog(&dir, r#"[{"id": "b", "links": {"todo": true}}]"#);
        assert!(matches!(load_targets(&path), Err(CatalogError::Malformed(m)) if m.contains("\"b\"")));
    }

    #[test]
    fn falsy_video_values_are_not_streams() {
        let dir = TempDir::new().unwrap();
        let path = write_catalog(
            &dir,
            r#"[{"id": "a", "links": [
                {"name": "Off", "video": false},
                {"name": "Zero", "video": 0},
                {"name": "Null", "video": null},
                {"name": "Live", "video": "https://cams.example/live.m3u8"}
            ]}]"#,
        );
        let targets = load_targets(&path).unwrap();
        let urls: Vec<&str> = targets.iter().map(|t| t.stream_url.as_str()).collect();
        assert_eq!(urls, vec!["https://cams.example/live.m3u8"]);
    }

    #[test]
    fn links_without_stream_are_dropped() {
        let dir = TempDir::new().unwrap();
        let targets = load_targets(&write_catalog(&dir, CATALOG)).unwrap();
        assert!(targets.iter().all(|t| !t.stream_url.is_empty()));
        assert!(targets.iter().all(|t| t.slope_name != "Base" && t.slope_name != "Parking"));
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nope.json");
        assert!(matches!(load_targets(&path), Err(CatalogError::NotFound(p)) if p == path));
    }

    #[test]
    fn non_array_catalog_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = write_catalog(&dir, r#"{"id": "alpha"}"#);
        assert!(matches!(load_targets(&path), Err(CatalogError::Malformed(_))));
    }

    #[test]
    fn truncation_keeps_catalog_prefix() {
        let dir = TempDir::new().unwrap();
        let all = load_targets(&write_catalog(&dir, CATALOG)).unwrap();

        let two = truncate_targets(all.clone(), Some(2));
        assert_eq!(two, all[..2].to_vec());

        assert_eq!(truncate_targets(all.clone(), Some(10)), all);
        assert_eq!(truncate_targets(all.clone(), Some(0)), all);
        assert_eq!(truncate_targets(all.clone(), None), all);
    }
}
