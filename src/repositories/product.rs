//! ProductRepository - Repository per il catalogo prodotti

use super::{Read, Update};
use crate::dtos::{
    CreateProductDTO, PageRequest, PopularQuery, ProductListItemDTO, ProductQuery,
    SpecialOfferQuery, UpdateProductDTO,
};
use crate::entities::{Product, ProductImage, ProductStatus, popularity_score};
use sqlx::{Error, MySql, MySqlConnection, MySqlPool, QueryBuilder};
use tracing::{debug, info, instrument};

// le colonne DECIMAL vengono castate a DOUBLE per leggerle come f64
pub(crate) const PRODUCT_COLUMNS: &str = "p.id, p.fournisseur_id, p.categorie_id, p.nom, \
    p.description, CAST(p.prix_unitaire AS DOUBLE) AS prix_unitaire, p.moq, \
    p.stock_disponible, p.unite, p.statut, p.est_vedette, \
    CAST(p.prix_promo AS DOUBLE) AS prix_promo, p.date_debut_promo, p.date_fin_promo, \
    CAST(p.pourcentage_reduction AS DOUBLE) AS pourcentage_reduction, p.est_en_offre, \
    p.type_offre, p.quantite_offre, p.vues_30j, p.ventes_30j, \
    CAST(p.score_popularite AS DOUBLE) AS score_popularite, p.derniere_activite, \
    CAST(p.note_moyenne AS DOUBLE) AS note_moyenne, p.nombre_avis, p.date_creation, \
    p.date_modification";

/// SELECT con i join verso entreprise, categoria e immagine principale
pub(crate) fn list_item_select() -> String {
    format!(
        "SELECT {PRODUCT_COLUMNS}, e.nom_entreprise, c.nom AS categorie_nom, \
         (SELECT i.url FROM images_produits i WHERE i.produit_id = p.id \
            ORDER BY i.est_principale DESC, i.ordre ASC LIMIT 1) AS image_principale \
         FROM produits p \
         LEFT JOIN entreprises e ON e.id = p.fournisseur_id \
         LEFT JOIN categories c ON c.id = p.categorie_id"
    )
}

pub struct ProductRepository {
    connection_pool: MySqlPool,
}

impl ProductRepository {
    pub fn new(connection_pool: MySqlPool) -> Self {
        Self { connection_pool }
    }

    /// Lista filtrata e paginata dei prodotti attivi
    #[instrument(skip(self, filter))]
    pub async fn list(
        &self,
        filter: &ProductQuery,
        page: PageRequest,
    ) -> Result<(Vec<ProductListItemDTO>, i64), Error> {
        fn push_filters<'a>(qb: &mut QueryBuilder<'a, MySql>, filter: &'a ProductQuery) {
            qb.push(" WHERE p.statut = 'actif'");
            if let Some(categorie_id) = filter.categorie_id {
                qb.push(" AND p.categorie_id = ").push_bind(categorie_id);
            }
            if let Some(fournisseur_id) = filter.fournisseur_id {
                qb.push(" AND p.fournisseur_id = ").push_bind(fournisseur_id);
            }
            if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
                let pattern = format!("%{}%", search.trim());
                qb.push(" AND (p.nom LIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR p.description LIKE ")
                    .push_bind(pattern)
                    .push(")");
            }
            if filter.offers_only.unwrap_or(false) {
                qb.push(" AND p.est_en_offre = TRUE AND (p.date_fin_promo IS NULL OR p.date_fin_promo > NOW())");
            }
            if filter.featured_only.unwrap_or(false) {
                qb.push(" AND p.est_vedette = TRUE");
            }
            if let Some(min_rating) = filter.min_rating {
                qb.push(" AND p.note_moyenne >= ").push_bind(min_rating);
            }
        }

        let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM produits p");
        push_filters(&mut count_qb, filter);
        let total = count_qb
            .build_query_scalar::<i64>()
            .fetch_one(&self.connection_pool)
            .await?;

        let mut qb = QueryBuilder::new(list_item_select());
        push_filters(&mut qb, filter);
        // colonna e direzione arrivano da una whitelist, non dall'input grezzo
        qb.push(format!(
            " ORDER BY {} {}, p.id DESC LIMIT ",
            filter.sort_column(),
            filter.sort_direction()
        ))
        .push_bind(page.limit())
        .push(" OFFSET ")
        .push_bind(page.offset());

        let rows = qb
            .build_query_as::<ProductListItemDTO>()
            .fetch_all(&self.connection_pool)
            .await?;
        debug!("Found {} products out of {}", rows.len(), total);
        Ok((rows, total))
    }

    #[instrument(skip(self, filter))]
    pub async fn popular(
        &self,
        filter: &PopularQuery,
        limit: i64,
    ) -> Result<Vec<ProductListItemDTO>, Error> {
        let mut qb = QueryBuilder::new(list_item_select());
        qb.push(" WHERE p.statut = 'actif' AND p.score_popularite > 0");
        if let Some(category) = filter.category {
            qb.push(" AND p.categorie_id = ").push_bind(category);
        }
        qb.push(format!(" ORDER BY {} LIMIT ", filter.order_clause()))
            .push_bind(limit);
        qb.build_query_as::<ProductListItemDTO>()
            .fetch_all(&self.connection_pool)
            .await
    }

    #[instrument(skip(self, filter))]
    pub async fn special_offers(
        &self,
        filter: &SpecialOfferQuery,
        limit: i64,
    ) -> Result<Vec<ProductListItemDTO>, Error> {
        let mut qb = QueryBuilder::new(list_item_select());
        qb.push(
            " WHERE p.statut = 'actif' AND p.est_en_offre = TRUE \
             AND p.date_fin_promo IS NOT NULL AND p.date_fin_promo > NOW()",
        );
        if let Some(category) = filter.category {
            qb.push(" AND p.categorie_id = ").push_bind(category);
        }
        qb.push(format!(" ORDER BY {} LIMIT ", filter.order_clause()))
            .push_bind(limit);
        qb.build_query_as::<ProductListItemDTO>()
            .fetch_all(&self.connection_pool)
            .await
    }

    /// Dettaglio di un prodotto attivo
    #[instrument(skip(self))]
    pub async fn find_active(&self, id: i32) -> Result<Option<ProductListItemDTO>, Error> {
        let query = format!("{} WHERE p.id = ? AND p.statut = 'actif'", list_item_select());
        sqlx::query_as::<_, ProductListItemDTO>(&query)
            .bind(id)
            .fetch_optional(&self.connection_pool)
            .await
    }

    pub async fn images(&self, produit_id: i32) -> Result<Vec<ProductImage>, Error> {
        sqlx::query_as::<_, ProductImage>(
            "SELECT id, produit_id, url, ordre, est_principale FROM images_produits \
             WHERE produit_id = ? ORDER BY est_principale DESC, ordre ASC",
        )
        .bind(produit_id)
        .fetch_all(&self.connection_pool)
        .await
    }

    #[instrument(skip(self))]
    pub async fn list_for_supplier(&self, fournisseur_id: i32) -> Result<Vec<ProductListItemDTO>, Error> {
        let query = format!(
            "{} WHERE p.fournisseur_id = ? ORDER BY p.date_creation DESC",
            list_item_select()
        );
        sqlx::query_as::<_, ProductListItemDTO>(&query)
            .bind(fournisseur_id)
            .fetch_all(&self.connection_pool)
            .await
    }

    /// Prodotto appartenente al fornitore indicato, qualunque sia lo stato
    pub async fn find_owned(&self, id: i32, fournisseur_id: i32) -> Result<Option<Product>, Error> {
        let query = format!(
            "SELECT {PRODUCT_COLUMNS} FROM produits p WHERE p.id = ? AND p.fournisseur_id = ?"
        );
        sqlx::query_as::<_, Product>(&query)
            .bind(id)
            .bind(fournisseur_id)
            .fetch_optional(&self.connection_pool)
            .await
    }

    /// Inserisce prodotto e immagini nella stessa transazione
    #[instrument(skip(self, conn, data), fields(fournisseur_id = %fournisseur_id))]
    pub async fn insert(
        &self,
        conn: &mut MySqlConnection,
        fournisseur_id: i32,
        data: &CreateProductDTO,
    ) -> Result<i32, Error> {
        let result = sqlx::query(
            "INSERT INTO produits (fournisseur_id, categorie_id, nom, description, prix_unitaire, \
             moq, stock_disponible, unite, statut, est_vedette, prix_promo, date_debut_promo, \
             date_fin_promo, pourcentage_reduction, est_en_offre, type_offre, quantite_offre, \
             derniere_activite) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NOW())",
        )
        .bind(fournisseur_id)
        .bind(data.categorie_id)
        .bind(data.nom.trim())
        .bind(&data.description)
        .bind(data.prix_unitaire)
        .bind(data.moq.unwrap_or(1))
        .bind(data.stock_disponible.unwrap_or(0))
        .bind(data.unite.as_deref().unwrap_or("piece"))
        .bind(data.statut.unwrap_or(ProductStatus::Actif))
        .bind(data.est_vedette.unwrap_or(false))
        .bind(data.prix_promo)
        .bind(data.date_debut_promo)
        .bind(data.date_fin_promo)
        .bind(data.pourcentage_reduction)
        .bind(data.est_en_offre.unwrap_or(false))
        .bind(data.type_offre)
        .bind(data.quantite_offre)
        .execute(&mut *conn)
        .await?;

        let produit_id = result.last_insert_id() as i32;

        for (ordre, url) in data.images.iter().enumerate() {
            sqlx::query(
                "INSERT INTO images_produits (produit_id, url, ordre, est_principale) \
                 VALUES (?, ?, ?, ?)",
            )
            .bind(produit_id)
            .bind(url)
            .bind(ordre as i32)
            .bind(ordre == 0)
            .execute(&mut *conn)
            .await?;
        }

        info!("Product created with id {}", produit_id);
        Ok(produit_id)
    }

    #[instrument(skip(self))]
    pub async fn delete_owned(&self, id: i32, fournisseur_id: i32) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM produits WHERE id = ? AND fournisseur_id = ?")
            .bind(id)
            .bind(fournisseur_id)
            .execute(&self.connection_pool)
            .await?;
        info!("Deleted {} product rows", result.rows_affected());
        Ok(result.rows_affected())
    }

    pub async fn is_active(&self, id: i32) -> Result<bool, Error> {
        let found = sqlx::query_scalar::<_, i32>(
            "SELECT id FROM produits WHERE id = ? AND statut = 'actif'",
        )
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await?;
        Ok(found.is_some())
    }

    /// Ricalcola il punteggio di popolarità a partire dai contatori attuali
    pub async fn refresh_score(&self, conn: &mut MySqlConnection, produit_id: i32) -> Result<f64, Error> {
        let counters = sqlx::query_as::<_, (i32, i32, f64, i32)>(
            "SELECT vues_30j, ventes_30j, CAST(note_moyenne AS DOUBLE), nombre_avis \
             FROM produits WHERE id = ?",
        )
        .bind(produit_id)
        .fetch_optional(&mut *conn)
        .await?;

        let Some((vues, ventes, note, avis)) = counters else {
            return Err(Error::RowNotFound);
        };
        let score = popularity_score(vues, ventes, note, avis);

        sqlx::query("UPDATE produits SET score_popularite = ? WHERE id = ?")
            .bind(score)
            .bind(produit_id)
            .execute(&mut *conn)
            .await?;
        debug!("Popularity score for product {} is {}", produit_id, score);
        Ok(score)
    }

    /// Ricalcola media e numero degli avis approvati, poi il punteggio
    #[instrument(skip(self, conn))]
    pub async fn refresh_rating(&self, conn: &mut MySqlConnection, produit_id: i32) -> Result<(), Error> {
        sqlx::query(
            "UPDATE produits p SET \
                p.note_moyenne = COALESCE((SELECT ROUND(AVG(a.note), 2) FROM avis_produits a \
                    WHERE a.produit_id = p.id AND a.statut = 'approuve'), 0), \
                p.nombre_avis = (SELECT COUNT(*) FROM avis_produits a \
                    WHERE a.produit_id = p.id AND a.statut = 'approuve') \
             WHERE p.id = ?",
        )
        .bind(produit_id)
        .execute(&mut *conn)
        .await?;
        self.refresh_score(conn, produit_id).await?;
        Ok(())
    }

    /// Aggiorna vues_30j e derniere_activite dalle statistiche giornaliere, poi il punteggio
    #[instrument(skip(self, conn))]
    pub async fn refresh_activity(&self, conn: &mut MySqlConnection, produit_id: i32) -> Result<(), Error> {
        sqlx::query(
            "UPDATE produits p SET \
                p.vues_30j = COALESCE((SELECT SUM(s.vues) FROM statistiques_produits s \
                    WHERE s.produit_id = p.id AND s.date >= CURDATE() - INTERVAL 30 DAY), 0), \
                p.derniere_activite = NOW() \
             WHERE p.id = ?",
        )
        .bind(produit_id)
        .execute(&mut *conn)
        .await?;
        self.refresh_score(conn, produit_id).await?;
        Ok(())
    }

    pub async fn count_by_status(&self) -> Result<Vec<(ProductStatus, i64)>, Error> {
        sqlx::query_as::<_, (ProductStatus, i64)>(
            "SELECT statut, COUNT(*) FROM produits GROUP BY statut",
        )
        .fetch_all(&self.connection_pool)
        .await
    }
}

impl Read<Product, i32> for ProductRepository {
    #[instrument(skip(self), fields(produit_id = %id))]
    async fn read(&self, id: &i32) -> Result<Option<Product>, Error> {
        let query = format!("SELECT {PRODUCT_COLUMNS} FROM produits p WHERE p.id = ?");
        sqlx::query_as::<_, Product>(&query)
            .bind(id)
            .fetch_optional(&self.connection_pool)
            .await
    }
}

impl Update<Product, UpdateProductDTO, i32> for ProductRepository {
    #[instrument(skip(self, data), fields(produit_id = %id))]
    async fn update(&self, id: &i32, data: &UpdateProductDTO) -> Result<Product, Error> {
        let current = self.read(id).await?.ok_or(Error::RowNotFound)?;
        if data.is_empty() {
            debug!("No fields to update, returning current product");
            return Ok(current);
        }

        let mut query_builder = QueryBuilder::<MySql>::new("UPDATE produits SET ");
        let mut separated = query_builder.separated(", ");
        if let Some(ref nom) = data.nom {
            separated.push("nom = ");
            separated.push_bind_unseparated(nom.trim());
        }
        if let Some(ref description) = data.description {
            separated.push("description = ");
            separated.push_bind_unseparated(description);
        }
        if let Some(prix) = data.prix_unitaire {
            separated.push("prix_unitaire = ");
            separated.push_bind_unseparated(prix);
        }
        if let Some(categorie_id) = data.categorie_id {
            separated.push("categorie_id = ");
            separated.push_bind_unseparated(categorie_id);
        }
        if let Some(moq) = data.moq {
            separated.push("moq = ");
            separated.push_bind_unseparated(moq);
        }
        if let Some(stock) = data.stock_disponible {
            separated.push("stock_disponible = ");
            separated.push_bind_unseparated(stock);
        }
        if let Some(ref unite) = data.unite {
            separated.push("unite = ");
            separated.push_bind_unseparated(unite);
        }
        if let Some(statut) = data.statut {
            separated.push("statut = ");
            separated.push_bind_unseparated(statut);
        }
        if let Some(vedette) = data.est_vedette {
            separated.push("est_vedette = ");
            separated.push_bind_unseparated(vedette);
        }
        if let Some(promo) = data.prix_promo {
            separated.push("prix_promo = ");
            separated.push_bind_unseparated(promo);
        }
        if let Some(debut) = data.date_debut_promo {
            separated.push("date_debut_promo = ");
            separated.push_bind_unseparated(debut);
        }
        if let Some(fin) = data.date_fin_promo {
            separated.push("date_fin_promo = ");
            separated.push_bind_unseparated(fin);
        }
        if let Some(pct) = data.pourcentage_reduction {
            separated.push("pourcentage_reduction = ");
            separated.push_bind_unseparated(pct);
        }
        if let Some(offre) = data.est_en_offre {
            separated.push("est_en_offre = ");
            separated.push_bind_unseparated(offre);
        }
        if let Some(type_offre) = data.type_offre {
            separated.push("type_offre = ");
            separated.push_bind_unseparated(type_offre);
        }
        if let Some(quantite) = data.quantite_offre {
            separated.push("quantite_offre = ");
            separated.push_bind_unseparated(quantite);
        }
        separated.push("derniere_activite = NOW()");

        query_builder.push(" WHERE id = ");
        query_builder.push_bind(id);
        query_builder.build().execute(&self.connection_pool).await?;

        info!("Product updated successfully");
        self.read(id).await?.ok_or(Error::RowNotFound)
    }
}
