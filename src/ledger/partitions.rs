/// Key layout and encoding utilities for Fjall partitions
///
/// Partition structure:
/// - `users`: user:{user_id} -> User (JSON)
/// - `usernames`: uname:{username} -> user_id (string)
/// - `jobs`: job:{job_id} -> DownloadJob (JSON)
/// - `user_jobs`: ujob:{user_id}:{job_id} -> empty (ownership index)
/// - `metadata`: meta:{key} -> value (string)
///
/// Job ids are UUIDv7, so `user_jobs` keys under one user prefix sort by
/// creation time; a reverse prefix scan lists jobs newest-first.
use uuid::Uuid;

/// Encode a user key: user:{user_id}
pub fn encode_user_key(user_id: &Uuid) -> Vec<u8> {
    format!("user:{}", user_id).into_bytes()
}

/// Encode a username index key: uname:{username}
pub fn encode_username_key(username: &str) -> Vec<u8> {
    format!("uname:{}", username).into_bytes()
}

/// Encode a job key: job:{job_id}
pub fn encode_job_key(job_id: &Uuid) -> Vec<u8> {
    format!("job:{}", job_id).into_bytes()
}

/// Decode a job key: job:{job_id} -> job_id
pub fn decode_job_key(key: &[u8]) -> Option<Uuid> {
    let key_str = std::str::from_utf8(key).ok()?;
    key_str.strip_prefix("job:")?.parse().ok()
}

/// Encode an ownership index key: ujob:{user_id}:{job_id}
pub fn encode_user_job_key(user_id: &Uuid, job_id: &Uuid) -> Vec<u8> {
    format!("ujob:{}:{}", user_id, job_id).into_bytes()
}

/// Encode an ownership index prefix for range scan: ujob:{user_id}:
pub fn encode_user_job_prefix(user_id: &Uuid) -> Vec<u8> {
    format!("ujob:{}:", user_id).into_bytes()
}

/// Decode an ownership index key: ujob:{user_id}:{job_id} -> (user_id, job_id)
pub fn decode_user_job_key(key: &[u8]) -> Option<(Uuid, Uuid)> {
    let key_str = std::str::from_utf8(key).ok()?;
    let rest = key_str.strip_prefix("ujob:")?;
    let (user_part, job_part) = rest.split_at(rest.find(':')?);
    Some((user_part.parse().ok()?, job_part[1..].parse().ok()?))
}

/// Encode a metadata key: meta:{key}
pub fn encode_meta_key(key: &str) -> Vec<u8> {
    format!("meta:{}", key).into_bytes()
}
