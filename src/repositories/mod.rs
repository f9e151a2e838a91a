//! Repositories module - Coordinatore per tutti i repository del progetto
//!
//! Questo modulo organizza i repository in sotto-moduli separati per una migliore manutenibilità.
//! Ogni repository gestisce le operazioni di database per una specifica entità.

// ************************* NOTA IMPORTANTE SU SQLX ************************* //

/*
   hey tu!
   Leggimi :D
   Qui non usiamo le macro query! / query_as!: quelle controllano la query contro il db
   in fase di compilazione, ma pretendono un DATABASE_URL raggiungibile (o la cache offline)
   anche solo per fare cargo build. Usiamo invece la forma a runtime:
   sqlx::query_as::<_, Product>("SELECT ... FROM produits WHERE id = ?")
       .bind(id)
       .fetch_optional(&self.connection_pool)
       .await
   Il tipo in output deve derivare sqlx::FromRow e i nomi delle colonne devono coincidere
   con i campi (usare AS nella SELECT quando non coincidono). Per questo ogni repository ha
   una costante con l'elenco delle colonne, riusata da tutte le SELECT.
   Cosa vogliamo indietro? ecco le opzioni:
   Number of Rows	Method to Call*	Returns	Notes
   None†	        .execute(...).await	        sqlx::Result<DB::QueryResult>	            For INSERT/UPDATE/DELETE without RETURNING.
   Zero or One	    .fetch_optional(...).await	sqlx::Result<Option<T>>	                    Extra rows are ignored.
   Exactly One	    .fetch_one(...).await	    sqlx::Result<T>	                            Errors if no rows were returned. Aggregate queries, use this.
   Multiple	    .fetch_all(...)	            sqlx::Result<Vec<T>>
   Quando i filtri dipendono dalla richiesta si usa QueryBuilder con push_bind: mai concatenare
   valori dell'utente nella stringa. Le sole parti dinamiche ammesse come testo sono ORDER BY
   scelti da una whitelist di &'static str.
   Le scritture che devono stare nella stessa transazione prendono `conn: &mut MySqlConnection`:
   il service apre la transazione (pool.begin()), passa &mut tx e fa commit alla fine.
   Attenzione ai tipi MySQL: COUNT(*) è BIGINT (i64), SUM(...) è DECIMAL quindi lo castiamo
   a SIGNED, le colonne DECIMAL le leggiamo con CAST(... AS DOUBLE) in f64.
*/

// ************************* MODULI REPOSITORY ************************* //

// Dichiarazione dei sotto-moduli
pub mod admin_notification;
pub mod analytics;
pub mod blog;
pub mod category;
pub mod conversation;
pub mod enterprise;
pub mod favorite;
pub mod message;
pub mod notification;
pub mod product;
pub mod review;
pub mod traits;
pub mod user;

// Re-esportazione dei trait per facilitare l'import
pub use traits::{Create, Delete, Read, Update};

// Re-esportazione delle struct dei repository per facilitare l'import
pub use admin_notification::AdminNotificationRepository;
pub use analytics::AnalyticsRepository;
pub use blog::BlogRepository;
pub use category::CategoryRepository;
pub use conversation::ConversationRepository;
pub use enterprise::EnterpriseRepository;
pub use favorite::FavoriteRepository;
pub use message::MessageRepository;
pub use notification::NotificationRepository;
pub use product::ProductRepository;
pub use review::ReviewRepository;
pub use user::UserRepository;
