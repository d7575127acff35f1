use std::collections::BTreeSet;

use async_trait::async_trait;
use jiff::civil::Date;
use marquee_core::{
    CatalogIndex, Credit, DiscoverItem, DiscoverParams, GenreMatch, MovieBase, MovieId,
    MovieStore, Pagination, ResultPage, SearchItem, SearchParams, StorageError, StorageResult,
};
use sqlx::migrate::MigrateError;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};

/// Filters shared by the search count and page queries.
///
/// `$1` query text (a literal, case-insensitive substring), `$2` language,
/// `$3` include adult, `$4` release year, `$5` production company origin
/// country.
macro_rules! search_filter {
    () => {
        r#"
        FROM movies m
        LEFT JOIN movie_translations mt ON mt.movie_id = m.id AND mt.language = $2
        LEFT JOIN movie_stats ms ON ms.movie_id = m.id
        WHERE (
            strpos(lower(COALESCE(mt.title, m.title)), lower($1)) > 0
            OR strpos(lower(COALESCE(mt.overview, m.overview)), lower($1)) > 0
        )
          AND ($3 OR m.adult = false)
          AND ($4::int4 IS NULL OR EXTRACT(YEAR FROM m.release_date)::int4 = $4::int4)
          AND (
            $5::text IS NULL OR EXISTS (
              SELECT 1
              FROM movie_companies mc
              JOIN companies c ON c.id = mc.company_id
              WHERE mc.movie_id = m.id
                AND c.origin_country = $5::text
            )
          )
        "#
    };
}

/// Filters shared by the discover count and page queries.
///
/// `$1` language, `$2` include adult, `$3`/`$4` release date bounds,
/// `$5`/`$6` vote average bounds, `$7` genre ids, `$8` require every genre.
macro_rules! discover_filter {
    () => {
        r#"
        FROM movies m
        LEFT JOIN movie_translations mt ON mt.movie_id = m.id AND mt.language = $1
        LEFT JOIN movie_stats ms ON ms.movie_id = m.id
        WHERE ($2 OR m.adult = false)
          AND ($3::date IS NULL OR m.release_date >= $3::date)
          AND ($4::date IS NULL OR m.release_date <= $4::date)
          AND ($5::float8 IS NULL OR ms.vote_average >= $5::float8)
          AND ($6::float8 IS NULL OR ms.vote_average <= $6::float8)
          AND (
            cardinality($7::uuid[]) = 0
            OR (
              SELECT COUNT(DISTINCT mg.genre_id)
              FROM movie_genres mg
              WHERE mg.movie_id = m.id
                AND mg.genre_id = ANY($7::uuid[])
            ) >= CASE WHEN $8 THEN cardinality($7::uuid[]) ELSE 1 END
          )
        "#
    };
}

const SEARCH_COUNT: &str = concat!("SELECT COUNT(*) AS total", search_filter!());

const SEARCH_PAGE: &str = concat!(
    r#"
    SELECT
      m.id::text AS id,
      COALESCE(mt.title, m.title) AS title,
      COALESCE(mt.overview, m.overview) AS overview,
      to_char(m.release_date, 'YYYY-MM-DD') AS release_date,
      ms.vote_average::float8 AS vote_average,
      ms.popularity::float8 AS popularity
    "#,
    search_filter!(),
    r#"
    ORDER BY ms.popularity DESC NULLS LAST, m.created_at DESC, m.id
    LIMIT $6 OFFSET $7
    "#
);

const DISCOVER_COUNT: &str = concat!("SELECT COUNT(*) AS total", discover_filter!());

// `$9` is the sort key as rendered by `SortKey::as_str`; exactly one CASE is
// live per query.
const DISCOVER_PAGE: &str = concat!(
    r#"
    SELECT
      m.id::text AS id,
      COALESCE(mt.title, m.title) AS title,
      COALESCE(mt.overview, m.overview) AS overview,
      to_char(m.release_date, 'YYYY-MM-DD') AS release_date,
      ms.vote_average::float8 AS vote_average,
      ms.vote_count::int8 AS vote_count,
      m.poster_path,
      m.backdrop_path,
      ms.popularity::float8 AS popularity,
      (
        SELECT COALESCE(array_agg(g.id::text ORDER BY g.name), ARRAY[]::text[])
        FROM movie_genres mg
        JOIN genres g ON g.id = mg.genre_id
        WHERE mg.movie_id = m.id
      ) AS genre_ids
    "#,
    discover_filter!(),
    r#"
    ORDER BY
      CASE WHEN $9 = 'popularity.asc' THEN ms.popularity END ASC NULLS LAST,
      CASE WHEN $9 = 'popularity.desc' THEN ms.popularity END DESC NULLS LAST,
      CASE WHEN $9 = 'release_date.asc' THEN m.release_date END ASC NULLS LAST,
      CASE WHEN $9 = 'release_date.desc' THEN m.release_date END DESC NULLS LAST,
      CASE WHEN $9 = 'vote_average.asc' THEN ms.vote_average END ASC NULLS LAST,
      CASE WHEN $9 = 'vote_average.desc' THEN ms.vote_average END DESC NULLS LAST,
      m.created_at DESC,
      m.id
    LIMIT $10 OFFSET $11
    "#
);

/// Postgres implementation of the catalog store.
///
/// Every query is a fixed statement. Optional filters are bound as NULL and
/// short-circuited in SQL, and the discover ordering is picked by binding the
/// sort key.
#[derive(Debug, Clone)]
pub struct PgMovieStore {
    pool: PgPool,
}

impl PgMovieStore {
    /// Creates a store from an existing Postgres connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates a store by opening a new Postgres connection pool.
    pub async fn connect(database_url: &str, max_connections: u32) -> StorageResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Applies the embedded schema migrations.
    pub async fn migrate(&self) -> StorageResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(map_migrate_error)
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

fn map_migrate_error(err: MigrateError) -> StorageError {
    match err {
        MigrateError::Execute(err) => map_sqlx_error(err),
        other => StorageError::Operation(format!("migration failed: {other}")),
    }
}

fn parse_date(raw: Option<String>) -> StorageResult<Option<Date>> {
    raw.map(|value| {
        value
            .parse::<Date>()
            .map_err(|e| StorageError::InvalidData(format!("invalid release_date '{value}': {e}")))
    })
    .transpose()
}

fn to_total(count: i64) -> u64 {
    u64::try_from(count).unwrap_or_default()
}

fn page_bounds(pagination: Pagination) -> (i64, i64) {
    let limit = i64::try_from(pagination.limit()).unwrap_or(i64::MAX);
    let offset = i64::try_from(pagination.offset()).unwrap_or(i64::MAX);
    (limit, offset)
}

fn get<'r, T>(row: &'r PgRow, column: &str) -> StorageResult<T>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(column).map_err(map_sqlx_error)
}

fn search_item(row: &PgRow) -> StorageResult<SearchItem> {
    Ok(SearchItem {
        id: MovieId::new_unchecked(get::<String>(row, "id")?),
        title: get(row, "title")?,
        overview: get(row, "overview")?,
        release_date: parse_date(get(row, "release_date")?)?,
        vote_average: get(row, "vote_average")?,
        popularity: get(row, "popularity")?,
    })
}

fn discover_item(row: &PgRow) -> StorageResult<DiscoverItem> {
    Ok(DiscoverItem {
        id: MovieId::new_unchecked(get::<String>(row, "id")?),
        title: get(row, "title")?,
        overview: get(row, "overview")?,
        release_date: parse_date(get(row, "release_date")?)?,
        vote_average: get(row, "vote_average")?,
        vote_count: get(row, "vote_count")?,
        poster_path: get(row, "poster_path")?,
        backdrop_path: get(row, "backdrop_path")?,
        popularity: get(row, "popularity")?,
        genre_ids: get(row, "genre_ids")?,
    })
}

#[async_trait]
impl MovieStore for PgMovieStore {
    async fn get_base(&self, id: &MovieId, lang: &str) -> StorageResult<Option<MovieBase>> {
        let row = sqlx::query(
            r#"
            SELECT
              m.id::text AS id,
              COALESCE(mt.title, m.title) AS title,
              COALESCE(mt.overview, m.overview) AS overview,
              to_char(m.release_date, 'YYYY-MM-DD') AS release_date,
              ms.vote_average::float8 AS vote_average,
              ms.vote_count::int8 AS vote_count,
              m.poster_path,
              m.backdrop_path,
              m.budget::int8 AS budget,
              m.revenue::int8 AS revenue,
              m.homepage
            FROM movies m
            LEFT JOIN movie_translations mt ON mt.movie_id = m.id AND mt.language = $2
            LEFT JOIN movie_stats ms ON ms.movie_id = m.id
            WHERE m.id = $1::uuid
            "#,
        )
        .bind(id.as_str())
        .bind(lang)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(MovieBase {
            id: MovieId::new_unchecked(get::<String>(&row, "id")?),
            title: get(&row, "title")?,
            overview: get(&row, "overview")?,
            release_date: parse_date(get(&row, "release_date")?)?,
            vote_average: get(&row, "vote_average")?,
            vote_count: get(&row, "vote_count")?,
            poster_path: get(&row, "poster_path")?,
            backdrop_path: get(&row, "backdrop_path")?,
            budget: get(&row, "budget")?,
            revenue: get(&row, "revenue")?,
            homepage: get(&row, "homepage")?,
        }))
    }

    async fn fetch_genres(&self, id: &MovieId) -> StorageResult<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT g.name
            FROM genres g
            JOIN movie_genres mg ON g.id = mg.genre_id
            WHERE mg.movie_id = $1::uuid
            ORDER BY g.name
            "#,
        )
        .bind(id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn fetch_companies(&self, id: &MovieId) -> StorageResult<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT c.name
            FROM companies c
            JOIN movie_companies mc ON c.id = mc.company_id
            WHERE mc.movie_id = $1::uuid
            ORDER BY c.name
            "#,
        )
        .bind(id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn fetch_credits(&self, id: &MovieId) -> StorageResult<Vec<Credit>> {
        let rows = sqlx::query(
            r#"
            SELECT p.name, p.known_for, c.credit_type
            FROM people p
            JOIN credits c ON p.id = c.person_id
            WHERE c.movie_id = $1::uuid
            ORDER BY c.cast_order NULLS LAST, p.name
            "#,
        )
        .bind(id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter()
            .map(|row| -> StorageResult<Credit> {
                Ok(Credit {
                    name: get(row, "name")?,
                    known_for: get(row, "known_for")?,
                    credit_type: get(row, "credit_type")?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl CatalogIndex for PgMovieStore {
    async fn search(&self, params: &SearchParams) -> StorageResult<ResultPage<SearchItem>> {
        let (limit, offset) = page_bounds(params.pagination);

        let count = sqlx::query_scalar::<_, i64>(SEARCH_COUNT)
            .bind(params.query.as_str())
            .bind(params.language.as_str())
            .bind(params.include_adult)
            .bind(params.primary_year)
            .bind(params.region.as_deref())
            .fetch_one(&self.pool);

        let page = sqlx::query(SEARCH_PAGE)
            .bind(params.query.as_str())
            .bind(params.language.as_str())
            .bind(params.include_adult)
            .bind(params.primary_year)
            .bind(params.region.as_deref())
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool);

        let (total, rows) = tokio::try_join!(count, page).map_err(map_sqlx_error)?;

        Ok(ResultPage {
            total: to_total(total),
            items: rows.iter().map(search_item).collect::<StorageResult<_>>()?,
        })
    }

    async fn discover(&self, params: &DiscoverParams) -> StorageResult<ResultPage<DiscoverItem>> {
        let (limit, offset) = page_bounds(params.pagination);
        let genre_ids: Vec<String> = params
            .genres
            .ids
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let match_all = params.genres.mode == GenreMatch::All;
        let gte = params.release_date_gte.map(|d| d.to_string());
        let lte = params.release_date_lte.map(|d| d.to_string());

        let count = sqlx::query_scalar::<_, i64>(DISCOVER_COUNT)
            .bind(params.language.as_str())
            .bind(params.include_adult)
            .bind(gte.as_deref())
            .bind(lte.as_deref())
            .bind(params.vote_average_gte)
            .bind(params.vote_average_lte)
            .bind(&genre_ids)
            .bind(match_all)
            .fetch_one(&self.pool);

        let page = sqlx::query(DISCOVER_PAGE)
            .bind(params.language.as_str())
            .bind(params.include_adult)
            .bind(gte.as_deref())
            .bind(lte.as_deref())
            .bind(params.vote_average_gte)
            .bind(params.vote_average_lte)
            .bind(&genre_ids)
            .bind(match_all)
            .bind(params.sort.as_str())
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool);

        let (total, rows) = tokio::try_join!(count, page).map_err(map_sqlx_error)?;

        Ok(ResultPage {
            total: to_total(total),
            items: rows.iter().map(discover_item).collect::<StorageResult<_>>()?,
        })
    }
}
