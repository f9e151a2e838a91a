//! BlogRepository - Articoli, categorie e contatori di lettura

use super::{Create, Read};
use crate::dtos::{CreateArticleDTO, RecentQuery};
use crate::entities::Article;
use sqlx::{Error, MySqlPool, QueryBuilder};
use tracing::{info, instrument};

const ARTICLE_COLUMNS: &str = "id, titre, slug, extrait, contenu, image_url, auteur_nom, categorie, \
    tags, est_a_la_une, est_publie, date_publication, temps_lecture, nombre_vues, nombre_likes, \
    nombre_partages, meta_description, meta_mots_cles, date_creation";

// un articolo è visibile quando è pubblicato e la data di pubblicazione è passata
const PUBLISHED: &str = "est_publie = TRUE AND (date_publication IS NULL OR date_publication <= NOW())";

pub struct BlogRepository {
    connection_pool: MySqlPool,
}

impl BlogRepository {
    pub fn new(connection_pool: MySqlPool) -> Self {
        Self { connection_pool }
    }

    #[instrument(skip(self))]
    pub async fn featured(&self, limit: i64) -> Result<Vec<Article>, Error> {
        let query = format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles_blog \
             WHERE {PUBLISHED} AND est_a_la_une = TRUE \
             ORDER BY date_publication DESC LIMIT ?"
        );
        sqlx::query_as::<_, Article>(&query)
            .bind(limit)
            .fetch_all(&self.connection_pool)
            .await
    }

    #[instrument(skip(self, filter))]
    pub async fn recent(&self, filter: &RecentQuery, limit: i64) -> Result<Vec<Article>, Error> {
        let mut qb = QueryBuilder::new(format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles_blog WHERE {PUBLISHED}"
        ));
        if let Some(category) = filter.category_filter() {
            qb.push(" AND categorie = ").push_bind(category);
        }
        qb.push(format!(" ORDER BY {} LIMIT ", filter.order_clause()))
            .push_bind(limit);

        qb.build_query_as::<Article>()
            .fetch_all(&self.connection_pool)
            .await
    }

    /// Categorie degli articoli pubblicati, le più usate per prime
    pub async fn categories(&self) -> Result<Vec<String>, Error> {
        let query = format!(
            "SELECT categorie FROM articles_blog WHERE {PUBLISHED} \
             GROUP BY categorie ORDER BY COUNT(*) DESC, categorie ASC"
        );
        sqlx::query_scalar::<_, String>(&query)
            .fetch_all(&self.connection_pool)
            .await
    }

    #[instrument(skip(self))]
    pub async fn find_published_by_slug(&self, slug: &str) -> Result<Option<Article>, Error> {
        let query = format!("SELECT {ARTICLE_COLUMNS} FROM articles_blog WHERE slug = ? AND {PUBLISHED}");
        sqlx::query_as::<_, Article>(&query)
            .bind(slug)
            .fetch_optional(&self.connection_pool)
            .await
    }

    pub async fn increment_views(&self, id: i32) -> Result<(), Error> {
        sqlx::query("UPDATE articles_blog SET nombre_vues = nombre_vues + 1 WHERE id = ?")
            .bind(id)
            .execute(&self.connection_pool)
            .await?;
        Ok(())
    }

    /// Ritorna le righe toccate: 0 se l'articolo non esiste o non è pubblicato
    #[instrument(skip(self))]
    pub async fn like(&self, id: i32) -> Result<u64, Error> {
        let query = format!(
            "UPDATE articles_blog SET nombre_likes = nombre_likes + 1 WHERE id = ? AND {PUBLISHED}"
        );
        let result = sqlx::query(&query)
            .bind(id)
            .execute(&self.connection_pool)
            .await?;
        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    pub async fn share(&self, id: i32) -> Result<u64, Error> {
        let query = format!(
            "UPDATE articles_blog SET nombre_partages = nombre_partages + 1 WHERE id = ? AND {PUBLISHED}"
        );
        let result = sqlx::query(&query)
            .bind(id)
            .execute(&self.connection_pool)
            .await?;
        Ok(result.rows_affected())
    }
}

impl Create<Article, CreateArticleDTO> for BlogRepository {
    #[instrument(skip(self, data), fields(slug = %data.slug))]
    async fn create(&self, data: &CreateArticleDTO) -> Result<Article, Error> {
        let result = sqlx::query(
            "INSERT INTO articles_blog (titre, slug, extrait, contenu, image_url, auteur_nom, \
             categorie, tags, est_a_la_une, est_publie, date_publication, temps_lecture, \
             meta_description, meta_mots_cles) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(data.titre.trim())
        .bind(&data.slug)
        .bind(&data.extrait)
        .bind(&data.contenu)
        .bind(&data.image_url)
        .bind(&data.auteur_nom)
        .bind(data.categorie.as_deref().unwrap_or("General"))
        .bind(&data.tags)
        .bind(data.est_a_la_une)
        .bind(data.est_publie)
        .bind(data.date_publication)
        .bind(data.temps_lecture.unwrap_or(0))
        .bind(&data.meta_description)
        .bind(&data.meta_mots_cles)
        .execute(&self.connection_pool)
        .await?;

        let id = result.last_insert_id() as i32;
        info!("Article created with id {}", id);
        self.read(&id).await?.ok_or(Error::RowNotFound)
    }
}

impl Read<Article, i32> for BlogRepository {
    async fn read(&self, id: &i32) -> Result<Option<Article>, Error> {
        let query = format!("SELECT {ARTICLE_COLUMNS} FROM articles_blog WHERE id = ?");
        sqlx::query_as::<_, Article>(&query)
            .bind(id)
            .fetch_optional(&self.connection_pool)
            .await
    }
}
