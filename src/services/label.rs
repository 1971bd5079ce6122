use std::collections::HashSet;

use crate::clients::{Result, TorrentSource};
use crate::models::StalledSet;

/// Narrow the candidates to torrents carrying one of the allowed labels.
///
/// An empty allow-list returns the candidates untouched without asking the
/// torrent client for anything. Any label lookup failure aborts the whole
/// filter.
pub async fn filter_by_label(
    candidates: StalledSet,
    allow_list: &[String],
    source: &dyn TorrentSource,
) -> Result<StalledSet> {
    if allow_list.is_empty() {
        return Ok(candidates);
    }

    let allowed: HashSet<&str> = allow_list.iter().map(String::as_str).collect();
    let mut filtered = StalledSet::with_capacity(candidates.len());

    for (id, torrent) in candidates {
        let label = source.get_label(&id).await?;
        if allowed.contains(label.as_str()) {
            filtered.insert(id, torrent);
        } else {
            tracing::debug!(torrent = %id, label = %label, "Skipping torrent outside label allow-list");
        }
    }

    Ok(filtered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{ClientError, MockTorrentSource};
    use crate::models::{TorrentSnapshot, TorrentState};

    fn candidates(ids: &[&str]) -> StalledSet {
        ids.iter()
            .map(|id| {
                (
                    id.to_string(),
                    TorrentSnapshot {
                        id: id.to_string(),
                        name: format!("{id}.name"),
                        eta: 0,
                        total_done: 0,
                        completed_time: 0,
                        time_added: 0.0,
                        state: TorrentState::Downloading,
                    },
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn test_empty_allow_list_skips_lookups() {
        let mut source = MockTorrentSource::new();
        source.expect_get_label().times(0);

        let input = candidates(&["a", "b"]);
        let output = filter_by_label(input.clone(), &[], &source).await.unwrap();
        assert_eq!(output, input);
    }

    #[tokio::test]
    async fn test_keeps_only_allowed_labels() {
        let mut source = MockTorrentSource::new();
        source.expect_get_label().returning(|id| {
            Ok(match id {
                "a" => "tv-sonarr".to_string(),
                "b" => "music".to_string(),
                _ => String::new(),
            })
        });

        let allow = vec!["radarr".to_string(), "tv-sonarr".to_string()];
        let output = filter_by_label(candidates(&["a", "b", "c"]), &allow, &source)
            .await
            .unwrap();
        assert_eq!(output.keys().collect::<Vec<_>>(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_lookup_failure_aborts() {
        let mut source = MockTorrentSource::new();
        source.expect_get_label().returning(|id| {
            if id == "b" {
                Err(ClientError::Unexpected("boom".into()))
            } else {
                Ok("tv".to_string())
            }
        });

        let allow = vec!["tv".to_string()];
        let result = filter_by_label(candidates(&["a", "b", "c"]), &allow, &source).await;
        assert!(matches!(result, Err(ClientError::Unexpected(_))));
    }
}
