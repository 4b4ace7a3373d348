//! 처리 완료 이벤트 저장소.
//!
//! 알림을 보낸 리밸런싱 이벤트 ID 집합을 JSON 배열 파일로 보관합니다.
//!
//! # 보장
//!
//! - **로드**: 파일이 없거나 손상되었으면 빈 집합 (프로세스는 항상 시작)
//! - **저장**: 임시 파일에 쓴 뒤 rename하므로 디스크에는 항상 완전한 집합만 존재
//! - **단일 작성자**: Poller만 소유/변경

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use cube_core::EventId;
use tracing::{debug, warn};

use crate::Result;

/// 처리 완료 이벤트 저장소
#[derive(Debug)]
pub struct ProcessedEventStore {
    path: PathBuf,
    ids: HashSet<EventId>,
}

impl ProcessedEventStore {
    /// 파일에서 저장소를 로드합니다. 실패해도 빈 집합으로 시작합니다.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let ids = read_ids(&path);
        debug!(path = %path.display(), count = ids.len(), "처리 완료 ID 로드");
        Self { path, ids }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, id: &EventId) -> bool {
        self.ids.contains(id)
    }

    /// 메모리 집합에 추가합니다. 새로 추가되었으면 true.
    pub fn add(&mut self, id: EventId) -> bool {
        self.ids.insert(id)
    }

    /// 추가 후 즉시 저장합니다.
    ///
    /// 저장이 실패해도 메모리 추가는 되돌리지 않습니다.
    pub fn commit(&mut self, id: EventId) -> Result<bool> {
        let inserted = self.add(id);
        self.persist()?;
        Ok(inserted)
    }

    /// 현재 집합 전체로 파일을 덮어씁니다.
    pub fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_vec(&self.sorted_ids())?;

        let tmp_path = self.tmp_path();
        if let Err(e) = write_then_rename(&tmp_path, &self.path, &json) {
            if let Err(cleanup) = fs::remove_file(&tmp_path) {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %tmp_path.display(), error = %cleanup, "임시 파일 삭제 실패");
                }
            }
            return Err(e.into());
        }

        debug!(path = %self.path.display(), count = self.ids.len(), "처리 완료 ID 저장");
        Ok(())
    }

    /// 정렬된 ID 목록 (파일 내용과 동일한 순서).
    pub fn sorted_ids(&self) -> Vec<&EventId> {
        let mut ids: Vec<&EventId> = self.ids.iter().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "processed_ids.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn write_then_rename(tmp_path: &Path, path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(tmp_path)?;
    file.write_all(contents)?;
    file.sync_all()?;
    drop(file);
    fs::rename(tmp_path, path)
}

fn read_ids(path: &Path) -> HashSet<EventId> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return HashSet::new(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "저장 파일을 읽을 수 없어 빈 집합으로 시작합니다");
            return HashSet::new();
        }
    };

    let value: serde_json::Value = match serde_json::from_str(&content) {
        Ok(value) => value,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "저장 파일이 JSON이 아니어서 빈 집합으로 시작합니다");
            return HashSet::new();
        }
    };

    if !value.is_array() {
        warn!(path = %path.display(), "저장 파일 내용이 배열이 아니어서 빈 집합으로 시작합니다");
        return HashSet::new();
    }

    match serde_json::from_value::<Vec<EventId>>(value) {
        Ok(ids) => ids.into_iter().collect(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "저장 파일에 잘못된 ID가 있어 빈 집합으로 시작합니다");
            HashSet::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &tempfile::TempDir) -> ProcessedEventStore {
        ProcessedEventStore::load(dir.path().join("processed_ids.json"))
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert!(store.is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_contains_after_add() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        let id = EventId::from("E1");

        assert!(!store.contains(&id));
        assert!(store.add(id.clone()));
        assert!(store.contains(&id));
    }

    #[test]
    fn test_add_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);

        assert!(store.commit(EventId::from(7i64)).unwrap());
        assert!(!store.commit(EventId::from(7i64)).unwrap());

        let content = fs::read_to_string(store.path()).unwrap();
        assert_eq!(content, "[7]");
        assert_eq!(store_in(&dir).len(), 1);
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store_in(&dir);
        store.add(EventId::from(3i64));
        store.add(EventId::from("E1"));
        store.add(EventId::from(1i64));
        store.persist().unwrap();

        let reloaded = store_in(&dir);
        assert_eq!(reloaded.sorted_ids(), store.sorted_ids());

        // 다시 저장해도 같은 집합
        reloaded.persist().unwrap();
        assert_eq!(store_in(&dir).sorted_ids(), store.sorted_ids());
    }

    #[test]
    fn test_malformed_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed_ids.json");

        for content in ["{not json", "42", r#"{"ids": [1]}"#, "[1, {\"x\": 2}]", ""] {
            fs::write(&path, content).unwrap();
            let store = ProcessedEventStore::load(&path);
            assert!(store.is_empty(), "content {:?} should load as empty", content);
        }
    }

    #[test]
    fn test_accepts_mixed_id_shapes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed_ids.json");
        fs::write(&path, r#"[123, "E1", 123]"#).unwrap();

        let store = ProcessedEventStore::load(&path);
        assert_eq!(store.len(), 2);
        assert!(store.contains(&EventId::from(123i64)));
        assert!(store.contains(&EventId::from("E1")));
    }

    #[test]
    fn test_accepts_numbers_outside_i64() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed_ids.json");
        fs::write(&path, r#"["E1", 123, 18446744073709551615, 1.5]"#).unwrap();

        let store = ProcessedEventStore::load(&path);
        assert_eq!(store.len(), 4);
        assert!(store.contains(&EventId::from("E1")));
        assert!(store.contains(&EventId::from(123i64)));
        assert!(store.contains(&EventId::from(u64::MAX)));
        assert!(store.contains(&"1.5".parse().unwrap()));

        // 다시 저장해도 같은 집합
        store.persist().unwrap();
        assert_eq!(ProcessedEventStore::load(&path).sorted_ids(), store.sorted_ids());
    }

    #[test]
    fn test_persist_creates_parent_and_leaves_no_tmp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("processed_ids.json");
        let mut store = ProcessedEventStore::load(&path);

        store.commit(EventId::from("E1")).unwrap();
        assert!(path.exists());
        assert!(!dir.path().join("state").join("processed_ids.json.tmp").exists());
    }

    #[test]
    fn test_persist_failure_keeps_memory_addition() {
        let dir = tempfile::tempdir().unwrap();
        // 디렉터리 경로에는 파일을 rename할 수 없음
        let path = dir.path().join("occupied");
        fs::create_dir_all(path.join("child")).unwrap();
        let mut store = ProcessedEventStore::load(&path);

        assert!(store.commit(EventId::from("E1")).is_err());
        assert!(store.contains(&EventId::from("E1")));
        // 실패한 쓰기의 임시 파일은 남지 않음
        assert!(!dir.path().join("occupied.tmp").exists());
    }
}
