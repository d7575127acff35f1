use std::sync::Arc;

use marquee_core::{
    CatalogError, CatalogResult, MovieDetail, MovieId, MovieStore, Operation, Section,
    SectionData, SectionRequest, StorageResult,
};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Builds a [`MovieDetail`] from one base lookup plus one concurrent fetch per
/// requested section.
///
/// The base record is always fetched first. Section fetches run as separate
/// tasks under a child of the caller's cancellation token; the first failure
/// cancels the siblings, and the assembler still waits for every task to
/// report before returning. Any failure fails the whole lookup.
#[derive(Debug)]
pub struct DetailAssembler<S> {
    store: Arc<S>,
}

impl<S> Clone for DetailAssembler<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: MovieStore> DetailAssembler<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub async fn resolve(
        &self,
        cancel: &CancellationToken,
        id: &MovieId,
        lang: &str,
        sections: &SectionRequest,
    ) -> CatalogResult<MovieDetail> {
        trace!(movie_id = %id, lang, sections = %sections, "resolving movie detail");

        let base = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(CatalogError::Cancelled(Operation::Base)),
            base = self.store.get_base(id, lang) => base
                .map_err(|source| CatalogError::store(Operation::Base, source))?,
        };
        let Some(base) = base else {
            debug!(movie_id = %id, "movie not found");
            return Err(CatalogError::NotFound(id.clone()));
        };

        let mut detail = MovieDetail::from_base(base);
        if sections.is_empty() {
            return Ok(detail);
        }

        let fan_out = cancel.child_token();
        let mut units = JoinSet::new();
        for section in sections.iter() {
            let store = Arc::clone(&self.store);
            let id = id.clone();
            let cancel = fan_out.clone();
            units.spawn(async move {
                let fetched = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        Err(CatalogError::Cancelled(Operation::Section(section)))
                    }
                    data = fetch_section(store.as_ref(), &id, section) => data
                        .map_err(|source| CatalogError::store(Operation::Section(section), source)),
                };
                (section, fetched)
            });
        }

        let mut first_error: Option<CatalogError> = None;
        while let Some(joined) = units.join_next().await {
            let outcome = match joined {
                Ok((section, fetched)) => fetched.map(|data| (section, data)),
                Err(join_error) => Err(CatalogError::TaskFailed(join_error.to_string())),
            };

            match outcome {
                Ok((section, data)) => {
                    trace!(movie_id = %id, %section, "section fetched");
                    detail.attach(data);
                }
                Err(err) if first_error.is_none() => {
                    warn!(movie_id = %id, error = %err, "section fetch failed, cancelling siblings");
                    fan_out.cancel();
                    first_error = Some(err);
                }
                Err(err) => {
                    debug!(movie_id = %id, error = %err, "discarding sibling failure");
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(detail),
        }
    }
}

async fn fetch_section<S: MovieStore + ?Sized>(
    store: &S,
    id: &MovieId,
    section: Section,
) -> StorageResult<SectionData> {
    match section {
        Section::Genres => store.fetch_genres(id).await.map(SectionData::Genres),
        Section::Companies => store.fetch_companies(id).await.map(SectionData::Companies),
        Section::Credits => store.fetch_credits(id).await.map(SectionData::Credits),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use marquee_core::{Credit, MovieBase, StorageError};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Barrier;

    enum Reply<T> {
        Data(T),
        Fail(StorageError),
        Hang,
    }

    impl<T> Default for Reply<T> {
        fn default() -> Self {
            Reply::Fail(StorageError::Query("enrichment disabled".to_string()))
        }
    }

    struct SetOnDrop(Arc<AtomicBool>);

    impl Drop for SetOnDrop {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct Calls {
        base: AtomicUsize,
        genres: AtomicUsize,
        companies: AtomicUsize,
        credits: AtomicUsize,
    }

    impl Calls {
        fn enrichment(&self) -> usize {
            self.genres.load(Ordering::SeqCst)
                + self.companies.load(Ordering::SeqCst)
                + self.credits.load(Ordering::SeqCst)
        }
    }

    #[derive(Default)]
    struct StubStore {
        base: Option<MovieBase>,
        base_error: Option<StorageError>,
        genres: Reply<Vec<String>>,
        companies: Reply<Vec<String>>,
        credits: Reply<Vec<Credit>>,
        barrier: Option<Arc<Barrier>>,
        hang_dropped: Arc<AtomicBool>,
        calls: Calls,
    }

    impl StubStore {
        fn with_movie(id: &str, title: &str) -> Self {
            Self {
                base: Some(MovieBase::new(MovieId::new_unchecked(id), title)),
                ..Self::default()
            }
        }

        async fn reply<T: Clone>(&self, reply: &Reply<T>) -> StorageResult<T> {
            if let Some(barrier) = &self.barrier {
                barrier.wait().await;
            }
            match reply {
                Reply::Data(data) => Ok(data.clone()),
                Reply::Fail(err) => Err(err.clone()),
                Reply::Hang => {
                    let _flag = SetOnDrop(Arc::clone(&self.hang_dropped));
                    std::future::pending().await
                }
            }
        }
    }

    #[async_trait]
    impl MovieStore for StubStore {
        async fn get_base(&self, _id: &MovieId, _lang: &str) -> StorageResult<Option<MovieBase>> {
            self.calls.base.fetch_add(1, Ordering::SeqCst);
            match &self.base_error {
                Some(err) => Err(err.clone()),
                None => Ok(self.base.clone()),
            }
        }

        async fn fetch_genres(&self, _id: &MovieId) -> StorageResult<Vec<String>> {
            self.calls.genres.fetch_add(1, Ordering::SeqCst);
            self.reply(&self.genres).await
        }

        async fn fetch_companies(&self, _id: &MovieId) -> StorageResult<Vec<String>> {
            self.calls.companies.fetch_add(1, Ordering::SeqCst);
            self.reply(&self.companies).await
        }

        async fn fetch_credits(&self, _id: &MovieId) -> StorageResult<Vec<Credit>> {
            self.calls.credits.fetch_add(1, Ordering::SeqCst);
            self.reply(&self.credits).await
        }
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn credits() -> Vec<Credit> {
        vec![
            Credit {
                name: "Actor 1".to_string(),
                known_for: "Acting".to_string(),
                credit_type: "cast".to_string(),
            },
            Credit {
                name: "Director 1".to_string(),
                known_for: "Directing".to_string(),
                credit_type: "crew".to_string(),
            },
        ]
    }

    fn all_sections() -> SectionRequest {
        SectionRequest::from_tags(["genres", "companies", "credits"])
    }

    async fn resolve(
        store: &Arc<StubStore>,
        sections: &SectionRequest,
    ) -> CatalogResult<MovieDetail> {
        let assembler = DetailAssembler::new(Arc::clone(store));
        let cancel = CancellationToken::new();
        tokio::time::timeout(
            Duration::from_secs(5),
            assembler.resolve(&cancel, &MovieId::new_unchecked("m1"), "en", sections),
        )
        .await
        .expect("resolve should not hang")
    }

    #[tokio::test]
    async fn empty_sections_return_base_only() {
        let store = Arc::new(StubStore::with_movie("m1", "X"));

        let detail = resolve(&store, &SectionRequest::new()).await.unwrap();

        assert_eq!(detail.base.id, MovieId::new_unchecked("m1"));
        assert_eq!(detail.base.title, "X");
        assert_eq!(detail.genres, None);
        assert_eq!(detail.production_companies, None);
        assert_eq!(detail.credits, None);
        assert_eq!(store.calls.enrichment(), 0);
    }

    #[tokio::test]
    async fn base_failure_skips_fan_out() {
        let store = Arc::new(StubStore {
            base_error: Some(StorageError::Unavailable("pool closed".to_string())),
            ..StubStore::default()
        });

        let err = resolve(&store, &all_sections()).await.unwrap_err();

        assert!(matches!(
            err,
            CatalogError::Store {
                operation: Operation::Base,
                source: StorageError::Unavailable(_),
            }
        ));
        assert_eq!(store.calls.base.load(Ordering::SeqCst), 1);
        assert_eq!(store.calls.enrichment(), 0);
    }

    #[tokio::test]
    async fn missing_movie_is_not_found() {
        let store = Arc::new(StubStore::default());

        let err = resolve(&store, &all_sections()).await.unwrap_err();

        assert!(matches!(err, CatalogError::NotFound(id) if id.as_str() == "m1"));
        assert_eq!(store.calls.enrichment(), 0);
    }

    #[tokio::test]
    async fn all_sections_are_merged() {
        let store = Arc::new(StubStore {
            genres: Reply::Data(strings(&["Action", "Drama"])),
            companies: Reply::Data(strings(&["Warner Bros", "Universal"])),
            credits: Reply::Data(credits()),
            ..StubStore::with_movie("m1", "X")
        });

        let detail = resolve(&store, &all_sections()).await.unwrap();

        assert_eq!(detail.genres, Some(strings(&["Action", "Drama"])));
        assert_eq!(
            detail.production_companies,
            Some(strings(&["Warner Bros", "Universal"]))
        );
        assert_eq!(detail.credits, Some(credits()));
        assert_eq!(store.calls.genres.load(Ordering::SeqCst), 1);
        assert_eq!(store.calls.companies.load(Ordering::SeqCst), 1);
        assert_eq!(store.calls.credits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn genres_only() {
        let store = Arc::new(StubStore {
            genres: Reply::Data(strings(&["Action", "Drama"])),
            ..StubStore::with_movie("m1", "X")
        });

        let detail = resolve(&store, &SectionRequest::from_tags(["genres"]))
            .await
            .unwrap();

        assert_eq!(detail.genres, Some(strings(&["Action", "Drama"])));
        assert_eq!(detail.production_companies, None);
        assert_eq!(detail.credits, None);
    }

    #[tokio::test]
    async fn empty_collection_is_success() {
        let store = Arc::new(StubStore {
            credits: Reply::Data(Vec::new()),
            ..StubStore::with_movie("m1", "X")
        });

        let detail = resolve(&store, &SectionRequest::from_tags(["credits"]))
            .await
            .unwrap();

        assert_eq!(detail.credits, Some(Vec::new()));
    }

    #[tokio::test]
    async fn one_failing_section_fails_the_lookup() {
        let store = Arc::new(StubStore {
            genres: Reply::Data(strings(&["Action"])),
            companies: Reply::Data(strings(&["Universal"])),
            credits: Reply::Fail(StorageError::Query("relation does not exist".to_string())),
            ..StubStore::with_movie("m1", "X")
        });

        let err = resolve(&store, &all_sections()).await.unwrap_err();

        assert_eq!(err.operation(), Some(Operation::Section(Section::Credits)));
        assert!(err.to_string().contains("credits"), "got: {err}");
    }

    #[tokio::test]
    async fn failing_credits_fails_regardless_of_genres() {
        let store = Arc::new(StubStore {
            genres: Reply::Data(strings(&["Action"])),
            credits: Reply::Fail(StorageError::Query("boom".to_string())),
            ..StubStore::with_movie("m1", "X")
        });

        let result = resolve(&store, &SectionRequest::from_tags(["genres", "credits"])).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn failure_cancels_in_flight_siblings() {
        let store = Arc::new(StubStore {
            genres: Reply::Hang,
            companies: Reply::Hang,
            credits: Reply::Fail(StorageError::Timeout("statement timeout".to_string())),
            ..StubStore::with_movie("m1", "X")
        });

        let err = resolve(&store, &all_sections()).await.unwrap_err();

        assert!(matches!(
            err,
            CatalogError::Store {
                operation: Operation::Section(Section::Credits),
                ..
            }
        ));
        assert!(store.hang_dropped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn caller_cancellation_stops_section_fetches() {
        let store = Arc::new(StubStore {
            genres: Reply::Hang,
            credits: Reply::Hang,
            ..StubStore::with_movie("m1", "X")
        });
        let assembler = DetailAssembler::new(Arc::clone(&store));
        let cancel = CancellationToken::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let sections = SectionRequest::from_tags(["genres", "credits"]);
        let err = tokio::time::timeout(
            Duration::from_secs(5),
            assembler.resolve(&cancel, &MovieId::new_unchecked("m1"), "en", &sections),
        )
        .await
        .expect("resolve should observe cancellation")
        .unwrap_err();

        assert!(matches!(
            err,
            CatalogError::Cancelled(Operation::Section(_))
        ));
        assert!(store.hang_dropped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn cancelled_before_start_skips_base() {
        let store = Arc::new(StubStore::with_movie("m1", "X"));
        let assembler = DetailAssembler::new(Arc::clone(&store));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = assembler
            .resolve(
                &cancel,
                &MovieId::new_unchecked("m1"),
                "en",
                &SectionRequest::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CatalogError::Cancelled(Operation::Base)));
    }

    #[tokio::test]
    async fn sections_are_fetched_concurrently() {
        // Every fetch waits until all three are in flight at once.
        let store = Arc::new(StubStore {
            genres: Reply::Data(strings(&["Action"])),
            companies: Reply::Data(strings(&["Universal"])),
            credits: Reply::Data(credits()),
            barrier: Some(Arc::new(Barrier::new(3))),
            ..StubStore::with_movie("m1", "X")
        });

        let detail = resolve(&store, &all_sections()).await.unwrap();

        assert!(detail.genres.is_some());
        assert!(detail.production_companies.is_some());
        assert!(detail.credits.is_some());
    }

    #[tokio::test]
    async fn duplicate_and_unknown_tags_match_plain_request() {
        let store = Arc::new(StubStore {
            genres: Reply::Data(strings(&["Action", "Drama"])),
            ..StubStore::with_movie("m1", "X")
        });

        let plain = resolve(&store, &SectionRequest::from_tags(["genres"]))
            .await
            .unwrap();
        let duplicated = resolve(&store, &SectionRequest::from_tags(["genres", "genres"]))
            .await
            .unwrap();
        let with_unknown = resolve(&store, &SectionRequest::from_tags(["genres", "bogus"]))
            .await
            .unwrap();

        assert_eq!(plain, duplicated);
        assert_eq!(plain, with_unknown);
        assert_eq!(store.calls.genres.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn only_unknown_tags_behave_as_empty_request() {
        let store = Arc::new(StubStore::with_movie("m1", "X"));

        let detail = resolve(&store, &SectionRequest::from_tags(["bogus"]))
            .await
            .unwrap();

        assert_eq!(detail, resolve(&store, &SectionRequest::new()).await.unwrap());
        assert_eq!(store.calls.enrichment(), 0);
    }

    #[tokio::test]
    async fn repeated_resolves_are_identical() {
        let store = Arc::new(StubStore {
            genres: Reply::Data(strings(&["Action"])),
            companies: Reply::Data(strings(&["Universal"])),
            credits: Reply::Data(credits()),
            ..StubStore::with_movie("m1", "X")
        });

        let first = resolve(&store, &all_sections()).await.unwrap();
        let second = resolve(&store, &all_sections()).await.unwrap();

        assert_eq!(first, second);
    }
}
