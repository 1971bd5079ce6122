/// Does a queue record title refer to this torrent?
///
/// True when the names are equal or the torrent name starts with the queue
/// title; torrent names often carry extra quality or group suffixes. An empty
/// title matches nothing.
pub fn matches(queue_title: &str, torrent_name: &str) -> bool {
    !queue_title.is_empty() && torrent_name.starts_with(queue_title)
}
