use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use async_trait::async_trait;
use dashmap::DashMap;
use marquee_core::{
    CatalogIndex, Credit, DiscoverItem, DiscoverParams, GenreMatch, MovieBase, MovieId,
    MovieStore, Pagination, ResultPage, SearchItem, SearchParams, SortField, SortOrder,
    StorageError, StorageResult,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A localised title and overview.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenreRecord {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyRecord {
    pub name: String,
    #[serde(default)]
    pub origin_country: Option<String>,
}

/// Everything the in-memory store knows about one movie.
///
/// This is also the element type of a fixtures file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieRecord {
    #[serde(flatten)]
    pub base: MovieBase,
    #[serde(default)]
    pub adult: bool,
    #[serde(default)]
    pub popularity: Option<f64>,
    /// Keyed by language tag, matched exactly.
    #[serde(default)]
    pub translations: BTreeMap<String, Translation>,
    #[serde(default)]
    pub genres: Vec<GenreRecord>,
    #[serde(default)]
    pub companies: Vec<CompanyRecord>,
    #[serde(default)]
    pub credits: Vec<Credit>,
}

impl MovieRecord {
    pub fn new(base: MovieBase) -> Self {
        Self {
            base,
            adult: false,
            popularity: None,
            translations: BTreeMap::new(),
            genres: Vec::new(),
            companies: Vec::new(),
            credits: Vec::new(),
        }
    }

    fn localized_title(&self, lang: &str) -> &str {
        self.translations
            .get(lang)
            .and_then(|t| t.title.as_deref())
            .unwrap_or(&self.base.title)
    }

    fn localized_overview(&self, lang: &str) -> Option<&str> {
        self.translations
            .get(lang)
            .and_then(|t| t.overview.as_deref())
            .or(self.base.overview.as_deref())
    }

    fn localized_base(&self, lang: &str) -> MovieBase {
        let mut base = self.base.clone();
        base.title = self.localized_title(lang).to_string();
        base.overview = self.localized_overview(lang).map(str::to_string);
        base
    }
}

/// In-memory storage entry. `seq` orders entries by insertion, newest last.
#[derive(Debug, Clone)]
struct Entry {
    seq: u64,
    record: MovieRecord,
}

/// In-memory implementation of [`MovieStore`] and [`CatalogIndex`] using DashMap.
///
/// Lookups behave like the Postgres store: translations fall back to the
/// default-language fields, search and discover apply the same filters and
/// orderings, and the insertion order stands in for the creation time.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    storage: DashMap<MovieId, Entry>,
    next_seq: AtomicU64,
}

impl InMemoryStore {
    /// Creates a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory store with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            storage: DashMap::with_capacity(capacity),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Parses a JSON array of [`MovieRecord`]s.
    pub fn from_json(json: &str) -> StorageResult<Self> {
        let records: Vec<MovieRecord> = serde_json::from_str(json)
            .map_err(|e| StorageError::InvalidData(format!("invalid fixtures: {e}")))?;

        let store = Self::with_capacity(records.len());
        for mut record in records {
            // Fixture ids come from outside the process.
            record.base.id = MovieId::new(record.base.id.as_str())
                .map_err(|e| StorageError::InvalidData(e.to_string()))?;
            for genre in &mut record.genres {
                genre.id = canonical_genre_id(&genre.id)?;
            }
            store.insert(record);
        }
        Ok(store)
    }

    /// Loads a fixtures file written as a JSON array of [`MovieRecord`]s.
    pub async fn load_fixtures(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path).await.map_err(|e| {
            StorageError::Unavailable(format!("cannot read fixtures {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }

    /// Inserts or replaces a movie. A replaced movie counts as newly created.
    pub fn insert(&self, record: MovieRecord) {
        let seq = self.next_seq.fetch_add(1, AtomicOrdering::Relaxed);
        self.storage
            .insert(record.base.id.clone(), Entry { seq, record });
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    fn with_record<T>(&self, id: &MovieId, f: impl FnOnce(&MovieRecord) -> T) -> Option<T> {
        self.storage.get(id).map(|entry| f(&entry.record))
    }

    fn matching(&self, mut keep: impl FnMut(&MovieRecord) -> bool) -> Vec<Entry> {
        self.storage
            .iter()
            .filter(|entry| keep(&entry.record))
            .map(|entry| entry.value().clone())
            .collect()
    }
}

/// Orders two optional values with missing values last in either direction.
fn cmp_nulls_last<T: PartialOrd>(a: Option<T>, b: Option<T>, order: SortOrder) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => {
            let ord = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
            match order {
                SortOrder::Ascending => ord,
                SortOrder::Descending => ord.reverse(),
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn newest_first(a: &Entry, b: &Entry) -> Ordering {
    b.seq.cmp(&a.seq)
}

fn page_of<T>(
    entries: Vec<Entry>,
    pagination: Pagination,
    map: impl FnMut(Entry) -> T,
) -> ResultPage<T> {
    let total = entries.len() as u64;
    let offset = usize::try_from(pagination.offset()).unwrap_or(usize::MAX);
    let limit = usize::try_from(pagination.limit()).unwrap_or(usize::MAX);

    let items = entries
        .into_iter()
        .skip(offset)
        .take(limit)
        .map(map)
        .collect();
    ResultPage { total, items }
}

fn canonical_genre_id(raw: &str) -> StorageResult<String> {
    Uuid::parse_str(raw)
        .map(|uuid| uuid.hyphenated().to_string())
        .map_err(|e| StorageError::InvalidData(format!("invalid genre id '{raw}': {e}")))
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

#[async_trait]
impl MovieStore for InMemoryStore {
    async fn get_base(&self, id: &MovieId, lang: &str) -> StorageResult<Option<MovieBase>> {
        Ok(self.with_record(id, |record| record.localized_base(lang)))
    }

    async fn fetch_genres(&self, id: &MovieId) -> StorageResult<Vec<String>> {
        Ok(self
            .with_record(id, |record| {
                record.genres.iter().map(|g| g.name.clone()).collect()
            })
            .unwrap_or_default())
    }

    async fn fetch_companies(&self, id: &MovieId) -> StorageResult<Vec<String>> {
        Ok(self
            .with_record(id, |record| {
                record.companies.iter().map(|c| c.name.clone()).collect()
            })
            .unwrap_or_default())
    }

    async fn fetch_credits(&self, id: &MovieId) -> StorageResult<Vec<Credit>> {
        Ok(self
            .with_record(id, |record| record.credits.clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl CatalogIndex for InMemoryStore {
    async fn search(&self, params: &SearchParams) -> StorageResult<ResultPage<SearchItem>> {
        let needle = params.query.to_lowercase();
        let lang = params.language.as_str();

        let mut entries = self.matching(|record| {
            let text_matches = contains_ignore_case(record.localized_title(lang), &needle)
                || record
                    .localized_overview(lang)
                    .is_some_and(|overview| contains_ignore_case(overview, &needle));

            text_matches
                && (params.include_adult || !record.adult)
                && params.primary_year.is_none_or(|year| {
                    record
                        .base
                        .release_date
                        .is_some_and(|date| i32::from(date.year()) == year)
                })
                && params.region.as_deref().is_none_or(|region| {
                    record
                        .companies
                        .iter()
                        .any(|c| c.origin_country.as_deref() == Some(region))
                })
        });

        entries.sort_by(|a, b| {
            cmp_nulls_last(a.record.popularity, b.record.popularity, SortOrder::Descending)
                .then_with(|| newest_first(a, b))
        });

        Ok(page_of(entries, params.pagination, |entry| {
            let base = entry.record.localized_base(lang);
            SearchItem {
                id: base.id,
                title: base.title,
                overview: base.overview,
                release_date: base.release_date,
                vote_average: base.vote_average,
                popularity: entry.record.popularity,
            }
        }))
    }

    async fn discover(&self, params: &DiscoverParams) -> StorageResult<ResultPage<DiscoverItem>> {
        let lang = params.language.as_str();
        let wanted: BTreeSet<&str> = params.genres.ids.iter().map(String::as_str).collect();
        let required = match params.genres.mode {
            GenreMatch::All => wanted.len(),
            GenreMatch::Any => 1,
        };

        let mut entries = self.matching(|record| {
            let base = &record.base;
            let genres_match = wanted.is_empty() || {
                let carried: BTreeSet<&str> = record
                    .genres
                    .iter()
                    .map(|g| g.id.as_str())
                    .filter(|id| wanted.contains(id))
                    .collect();
                carried.len() >= required
            };

            genres_match
                && (params.include_adult || !record.adult)
                && params
                    .release_date_gte
                    .is_none_or(|gte| base.release_date.is_some_and(|d| d >= gte))
                && params
                    .release_date_lte
                    .is_none_or(|lte| base.release_date.is_some_and(|d| d <= lte))
                && params
                    .vote_average_gte
                    .is_none_or(|gte| base.vote_average.is_some_and(|v| v >= gte))
                && params
                    .vote_average_lte
                    .is_none_or(|lte| base.vote_average.is_some_and(|v| v <= lte))
        });

        let order = params.sort.order;
        entries.sort_by(|a, b| {
            let by_field = match params.sort.field {
                SortField::Popularity => {
                    cmp_nulls_last(a.record.popularity, b.record.popularity, order)
                }
                SortField::ReleaseDate => cmp_nulls_last(
                    a.record.base.release_date,
                    b.record.base.release_date,
                    order,
                ),
                SortField::VoteAverage => cmp_nulls_last(
                    a.record.base.vote_average,
                    b.record.base.vote_average,
                    order,
                ),
            };
            by_field.then_with(|| newest_first(a, b))
        });

        Ok(page_of(entries, params.pagination, |entry| {
            let base = entry.record.localized_base(lang);
            DiscoverItem {
                id: base.id,
                title: base.title,
                overview: base.overview,
                release_date: base.release_date,
                vote_average: base.vote_average,
                vote_count: base.vote_count,
                poster_path: base.poster_path,
                backdrop_path: base.backdrop_path,
                popularity: entry.record.popularity,
                genre_ids: entry.record.genres.into_iter().map(|g| g.id).collect(),
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::civil::date;
    use marquee_core::{GenreFilter, SortKey};
    use std::sync::Arc;

    const DUNE: &str = "5f0b6c2e-8a44-4a53-9a55-000000000001";
    const ALIEN: &str = "5f0b6c2e-8a44-4a53-9a55-000000000002";
    const SHREK: &str = "5f0b6c2e-8a44-4a53-9a55-000000000003";
    const SCIFI: &str = "5f0b6c2e-8a44-4a53-9a55-0000000000a1";
    const HORROR: &str = "5f0b6c2e-8a44-4a53-9a55-0000000000a2";

    fn id(s: &str) -> MovieId {
        MovieId::new_unchecked(s)
    }

    fn record(movie: &str, title: &str, popularity: Option<f64>) -> MovieRecord {
        let mut record = MovieRecord::new(MovieBase::new(id(movie), title));
        record.popularity = popularity;
        record
    }

    fn genre(id: &str, name: &str) -> GenreRecord {
        GenreRecord {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    fn seeded() -> InMemoryStore {
        let store = InMemoryStore::new();

        let mut dune = record(DUNE, "Dune", Some(80.0));
        dune.base.overview = Some("Desert planet epic".to_string());
        dune.base.release_date = Some(date(2021, 10, 22));
        dune.base.vote_average = Some(7.8);
        dune.genres = vec![genre(SCIFI, "Science Fiction")];
        dune.companies = vec![CompanyRecord {
            name: "Legendary".to_string(),
            origin_country: Some("US".to_string()),
        }];
        dune.translations.insert(
            "de".to_string(),
            Translation {
                title: Some("Der Wüstenplanet".to_string()),
                overview: None,
            },
        );

        let mut alien = record(ALIEN, "Alien", None);
        alien.base.release_date = Some(date(1979, 5, 25));
        alien.base.vote_average = Some(8.1);
        alien.genres = vec![genre(SCIFI, "Science Fiction"), genre(HORROR, "Horror")];
        alien.companies = vec![CompanyRecord {
            name: "Brandywine".to_string(),
            origin_country: Some("GB".to_string()),
        }];

        let mut shrek = record(SHREK, "Shrek", Some(60.0));
        shrek.adult = true;
        shrek.base.release_date = Some(date(2001, 5, 18));

        store.insert(dune);
        store.insert(alien);
        store.insert(shrek);
        store
    }

    #[tokio::test]
    async fn get_base_falls_back_to_default_language() {
        let store = seeded();

        let german = store.get_base(&id(DUNE), "de").await.unwrap().unwrap();
        assert_eq!(german.title, "Der Wüstenplanet");
        assert_eq!(german.overview.as_deref(), Some("Desert planet epic"));

        let english = store.get_base(&id(DUNE), "en").await.unwrap().unwrap();
        assert_eq!(english.title, "Dune");
    }

    #[tokio::test]
    async fn get_base_nonexistent() {
        let store = seeded();

        let result = store.get_base(&id("missing"), "en").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn sections_of_unknown_movie_are_empty() {
        let store = seeded();

        assert!(store.fetch_genres(&id("missing")).await.unwrap().is_empty());
        assert!(store.fetch_credits(&id("missing")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn sections_preserve_stored_order() {
        let store = seeded();

        let genres = store.fetch_genres(&id(ALIEN)).await.unwrap();
        assert_eq!(genres, vec!["Science Fiction", "Horror"]);

        let companies = store.fetch_companies(&id(ALIEN)).await.unwrap();
        assert_eq!(companies, vec!["Brandywine"]);
    }

    #[tokio::test]
    async fn search_matches_overview_case_insensitively() {
        let store = seeded();

        let page = store
            .search(&SearchParams::new("DESERT", "en"))
            .await
            .unwrap();

        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].title, "Dune");
    }

    #[tokio::test]
    async fn search_treats_pattern_characters_literally() {
        let store = seeded();

        for query in ["%", "_", "D_ne"] {
            let page = store.search(&SearchParams::new(query, "en")).await.unwrap();
            assert_eq!(page.total, 0, "{query}");
        }
    }

    #[tokio::test]
    async fn search_matches_localized_title() {
        let store = seeded();

        let page = store
            .search(&SearchParams::new("wüsten", "de"))
            .await
            .unwrap();
        assert_eq!(page.total, 1);

        let page = store
            .search(&SearchParams::new("wüsten", "en"))
            .await
            .unwrap();
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn search_excludes_adult_unless_requested() {
        let store = seeded();

        let page = store.search(&SearchParams::new("shrek", "en")).await.unwrap();
        assert_eq!(page.total, 0);

        let mut params = SearchParams::new("shrek", "en");
        params.include_adult = true;
        let page = store.search(&params).await.unwrap();
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn search_orders_by_popularity_with_nulls_last() {
        let store = seeded();
        let mut params = SearchParams::new("", "en");
        params.include_adult = true;

        let page = store.search(&params).await.unwrap();

        let titles: Vec<_> = page.items.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, vec!["Dune", "Shrek", "Alien"]);
    }

    #[tokio::test]
    async fn search_filters_by_year_and_region() {
        let store = seeded();

        let mut params = SearchParams::new("", "en");
        params.primary_year = Some(1979);
        let page = store.search(&params).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].title, "Alien");

        let mut params = SearchParams::new("", "en");
        params.region = Some("US".to_string());
        let page = store.search(&params).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].title, "Dune");
    }

    #[tokio::test]
    async fn search_paginates_and_keeps_total() {
        let store = seeded();
        let mut params = SearchParams::new("", "en");
        params.include_adult = true;
        params.pagination = Pagination::new(2, 2);

        let page = store.search(&params).await.unwrap();

        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].title, "Alien");
    }

    #[tokio::test]
    async fn discover_any_and_all_genres() {
        let store = seeded();

        let mut params = DiscoverParams::new("en");
        params.genres = GenreFilter::parse(&format!("{SCIFI}|{HORROR}"));
        let page = store.discover(&params).await.unwrap();
        assert_eq!(page.total, 2);

        params.genres = GenreFilter::parse(&format!("{SCIFI},{HORROR}"));
        let page = store.discover(&params).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].title, "Alien");
        assert_eq!(page.items[0].genre_ids, vec![SCIFI, HORROR]);
    }

    #[tokio::test]
    async fn discover_duplicate_genre_ids_count_once() {
        let store = seeded();
        let mut params = DiscoverParams::new("en");
        params.genres = GenreFilter::parse(&format!("{HORROR},{HORROR}"));

        let page = store.discover(&params).await.unwrap();

        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn discover_sorts_by_release_date() {
        let store = seeded();
        let mut params = DiscoverParams::new("en");
        params.include_adult = true;
        params.sort = SortKey::parse_lenient("release_date.asc");

        let page = store.discover(&params).await.unwrap();

        let titles: Vec<_> = page.items.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, vec!["Alien", "Shrek", "Dune"]);
    }

    #[tokio::test]
    async fn discover_vote_bounds_are_inclusive_and_skip_missing() {
        let store = seeded();
        let mut params = DiscoverParams::new("en");
        params.include_adult = true;
        params.vote_average_gte = Some(7.8);
        params.vote_average_lte = Some(8.1);

        let page = store.discover(&params).await.unwrap();

        // Shrek has no vote average.
        assert_eq!(page.total, 2);
    }

    #[test]
    fn fixtures_parse_from_json() {
        let json = format!(
            r#"[{{
                "id": "{DUNE}",
                "title": "Dune",
                "release_date": "2021-10-22",
                "popularity": 80.5,
                "genres": [{{"id": "{SCIFI}", "name": "Science Fiction"}}],
                "credits": [{{"name": "Denis Villeneuve", "known_for": "Directing", "credit_type": "crew"}}]
            }}]"#
        );

        let store = InMemoryStore::from_json(&json).unwrap();

        assert_eq!(store.len(), 1);
        let title = store.with_record(&id(DUNE), |r| r.base.title.clone());
        assert_eq!(title.as_deref(), Some("Dune"));
    }

    #[test]
    fn fixtures_ids_are_canonicalized() {
        let json = format!(
            r#"[{{
                "id": "{}",
                "title": "Dune",
                "genres": [{{"id": "{}", "name": "Science Fiction"}}]
            }}]"#,
            DUNE.to_uppercase(),
            SCIFI.replace('-', "")
        );

        let store = InMemoryStore::from_json(&json).unwrap();

        let genres = store.with_record(&id(DUNE), |r| r.genres.clone()).unwrap();
        assert_eq!(genres[0].id, SCIFI);
    }

    #[test]
    fn fixtures_with_invalid_genre_id_are_rejected() {
        let json = format!(
            r#"[{{"id": "{DUNE}", "title": "Dune", "genres": [{{"id": "scifi", "name": "Science Fiction"}}]}}]"#
        );
        let err = InMemoryStore::from_json(&json).unwrap_err();
        assert!(matches!(err, StorageError::InvalidData(_)));
    }

    #[test]
    fn fixtures_with_invalid_id_are_rejected() {
        let err = InMemoryStore::from_json(r#"[{"id": "not-a-uuid", "title": "X"}]"#).unwrap_err();
        assert!(matches!(err, StorageError::InvalidData(_)));
    }

    #[tokio::test]
    async fn concurrent_access() {
        let store = Arc::new(InMemoryStore::new());
        let mut handles = vec![];

        for i in 0..10u64 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let movie = format!("5f0b6c2e-8a44-4a53-9a55-{i:012}");
                store.insert(record(&movie, &format!("Movie {i}"), Some(i as f64)));
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.len(), 10);
        let page = store.search(&SearchParams::new("movie", "en")).await.unwrap();
        assert_eq!(page.total, 10);
        assert_eq!(page.items[0].title, "Movie 9");
    }
}
