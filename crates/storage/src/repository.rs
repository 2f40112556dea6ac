use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use vocab_core::model::{Direction, ProgressKey, ValidatedWord, Word, WordId, WordProgress};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Read-modify-write step applied atomically by `ProgressRepository::modify`.
pub type ProgressUpdate<'a> = &'a (dyn Fn(WordProgress) -> WordProgress + Send + Sync);

/// Repository contract for vocabulary words.
#[async_trait]
pub trait WordRepository: Send + Sync {
    /// Insert a new word and assign it an id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the word cannot be stored.
    async fn insert_word(&self, word: &ValidatedWord) -> Result<Word, StorageError>;

    /// Persist or update a word under its existing id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the word cannot be stored.
    async fn upsert_word(&self, word: &Word) -> Result<(), StorageError>;

    /// Fetch a word by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_word(&self, id: WordId) -> Result<Option<Word>, StorageError>;

    /// Fetch words by ids, preserving the order of `ids`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if any are missing, or other storage errors.
    async fn get_words(&self, ids: &[WordId]) -> Result<Vec<Word>, StorageError>;

    /// List words in id order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_words(&self, limit: u32) -> Result<Vec<Word>, StorageError>;

    /// Delete a word together with both of its progress records.
    ///
    /// Returns `false` if the word did not exist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn remove_word(&self, id: WordId) -> Result<bool, StorageError>;
}

/// Repository contract for per-(word, direction) progress records.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// All records for one direction, ordered by word id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn load_all(&self, direction: Direction) -> Result<Vec<WordProgress>, StorageError>;

    /// One record, if the word was ever selected.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn load_one(&self, key: ProgressKey) -> Result<Option<WordProgress>, StorageError>;

    /// Persist or overwrite a record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn save(&self, progress: &WordProgress) -> Result<(), StorageError>;

    /// Create both direction records of a word in one step.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if either record already exists.
    async fn insert_pair(&self, pair: &[WordProgress; 2]) -> Result<(), StorageError>;

    /// Atomically read the record, apply `update`, and persist the result.
    ///
    /// Two concurrent calls for the same key never lose an update.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the record does not exist and
    /// `StorageError::Conflict` if `update` changes the record's key.
    async fn modify(
        &self,
        key: ProgressKey,
        update: ProgressUpdate<'_>,
    ) -> Result<WordProgress, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    words: Arc<Mutex<BTreeMap<WordId, Word>>>,
    progress: Arc<Mutex<BTreeMap<ProgressKey, WordProgress>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StorageError> {
    mutex
        .lock()
        .map_err(|e| StorageError::Connection(e.to_string()))
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WordRepository for InMemoryRepository {
    async fn insert_word(&self, word: &ValidatedWord) -> Result<Word, StorageError> {
        let mut guard = lock(&self.words)?;
        let next = guard.keys().next_back().map_or(1, |id| id.value() + 1);
        let word = word.clone().assign_id(WordId::new(next));
        guard.insert(word.id, word.clone());
        Ok(word)
    }

    async fn upsert_word(&self, word: &Word) -> Result<(), StorageError> {
        lock(&self.words)?.insert(word.id, word.clone());
        Ok(())
    }

    async fn get_word(&self, id: WordId) -> Result<Option<Word>, StorageError> {
        Ok(lock(&self.words)?.get(&id).cloned())
    }

    async fn get_words(&self, ids: &[WordId]) -> Result<Vec<Word>, StorageError> {
        let guard = lock(&self.words)?;
        ids.iter()
            .map(|id| guard.get(id).cloned().ok_or(StorageError::NotFound))
            .collect()
    }

    async fn list_words(&self, limit: u32) -> Result<Vec<Word>, StorageError> {
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(lock(&self.words)?.values().take(limit).cloned().collect())
    }

    async fn remove_word(&self, id: WordId) -> Result<bool, StorageError> {
        let mut words = lock(&self.words)?;
        let mut progress = lock(&self.progress)?;
        let existed = words.remove(&id).is_some();
        progress.retain(|key, _| key.word_id != id);
        Ok(existed)
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn load_all(&self, direction: Direction) -> Result<Vec<WordProgress>, StorageError> {
        Ok(lock(&self.progress)?
            .values()
            .filter(|p| p.direction() == direction)
            .cloned()
            .collect())
    }

    async fn load_one(&self, key: ProgressKey) -> Result<Option<WordProgress>, StorageError> {
        Ok(lock(&self.progress)?.get(&key).cloned())
    }

    async fn save(&self, progress: &WordProgress) -> Result<(), StorageError> {
        lock(&self.progress)?.insert(progress.key, progress.clone());
        Ok(())
    }

    async fn insert_pair(&self, pair: &[WordProgress; 2]) -> Result<(), StorageError> {
        let mut guard = lock(&self.progress)?;
        if pair.iter().any(|p| guard.contains_key(&p.key)) {
            return Err(StorageError::Conflict);
        }
        for p in pair {
            guard.insert(p.key, p.clone());
        }
        Ok(())
    }

    async fn modify(
        &self,
        key: ProgressKey,
        update: ProgressUpdate<'_>,
    ) -> Result<WordProgress, StorageError> {
        let mut guard = lock(&self.progress)?;
        let current = guard.get(&key).cloned().ok_or(StorageError::NotFound)?;
        let next = update(current);
        if next.key != key {
            return Err(StorageError::Conflict);
        }
        guard.insert(key, next.clone());
        Ok(next)
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub words: Arc<dyn WordRepository>,
    pub progress: Arc<dyn ProgressRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let words: Arc<dyn WordRepository> = Arc::new(repo.clone());
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo);
        Self { words, progress }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vocab_core::model::{DEFAULT_EASE, WordDraft};
    use vocab_core::time::fixed_now;

    async fn seeded(repo: &InMemoryRepository, source: &str) -> Word {
        let word = repo
            .insert_word(&WordDraft::new(source, "x").validate(fixed_now()).unwrap())
            .await
            .unwrap();
        repo.insert_pair(&WordProgress::new_pair(word.id, DEFAULT_EASE, fixed_now()))
            .await
            .unwrap();
        word
    }

    #[tokio::test]
    async fn insert_word_assigns_increasing_ids() {
        let repo = InMemoryRepository::new();
        let a = seeded(&repo, "uno").await;
        let b = seeded(&repo, "dos").await;
        assert_eq!(a.id, WordId::new(1));
        assert_eq!(b.id, WordId::new(2));

        let fetched = repo.get_words(&[b.id, a.id]).await.unwrap();
        assert_eq!(fetched[0].source, "dos");
        assert!(matches!(
            repo.get_words(&[WordId::new(9)]).await,
            Err(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn insert_pair_rejects_duplicates() {
        let repo = InMemoryRepository::new();
        let word = seeded(&repo, "uno").await;
        let err = repo
            .insert_pair(&WordProgress::new_pair(word.id, DEFAULT_EASE, fixed_now()))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn load_all_filters_by_direction() {
        let repo = InMemoryRepository::new();
        seeded(&repo, "uno").await;
        seeded(&repo, "dos").await;

        let forward = repo.load_all(Direction::SourceToTarget).await.unwrap();
        assert_eq!(forward.len(), 2);
        assert!(forward.iter().all(|p| p.direction() == Direction::SourceToTarget));
    }

    #[tokio::test]
    async fn modify_touches_only_its_key() {
        let repo = InMemoryRepository::new();
        let word = seeded(&repo, "uno").await;
        let forward = ProgressKey::new(word.id, Direction::SourceToTarget);
        let before = repo.load_one(forward.reversed()).await.unwrap().unwrap();

        let updated = repo
            .modify(forward, &|mut p| {
                p.repetitions = 5;
                p
            })
            .await
            .unwrap();

        assert_eq!(updated.repetitions, 5);
        assert_eq!(repo.load_one(forward).await.unwrap().unwrap().repetitions, 5);
        assert_eq!(repo.load_one(forward.reversed()).await.unwrap().unwrap(), before);
    }

    #[tokio::test]
    async fn modify_missing_record_is_not_found() {
        let repo = InMemoryRepository::new();
        let key = ProgressKey::new(WordId::new(1), Direction::SourceToTarget);
        let err = repo.modify(key, &|p| p).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn concurrent_modifies_do_not_drop_updates() {
        let repo = InMemoryRepository::new();
        let word = seeded(&repo, "uno").await;
        let key = ProgressKey::new(word.id, Direction::SourceToTarget);

        let mut handles = Vec::new();
        for _ in 0..16 {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                repo.modify(key, &|mut p| {
                    p.repetitions += 1;
                    p
                })
                .await
                .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(repo.load_one(key).await.unwrap().unwrap().repetitions, 16);
    }

    #[tokio::test]
    async fn remove_word_cascades_to_progress() {
        let repo = InMemoryRepository::new();
        let word = seeded(&repo, "uno").await;
        let other = seeded(&repo, "dos").await;

        assert!(repo.remove_word(word.id).await.unwrap());
        assert!(!repo.remove_word(word.id).await.unwrap());

        for direction in Direction::ALL {
            let key = ProgressKey::new(word.id, direction);
            assert!(repo.load_one(key).await.unwrap().is_none());
            let kept = ProgressKey::new(other.id, direction);
            assert!(repo.load_one(kept).await.unwrap().is_some());
        }
        assert!(repo.get_word(word.id).await.unwrap().is_none());
    }
}
