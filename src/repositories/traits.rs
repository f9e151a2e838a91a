//! Trait CRUD condivisi dai repository
//!
//! Solo le tabelle con una chiave primaria semplice li implementano (utilisateurs,
//! produits, articles_blog, conversations, ...). Le tabelle di collegamento come
//! `favoris` o `conversation_participants` espongono invece metodi dedicati.

use sqlx::Error;

/// Inserimento di una riga a partire dal DTO di creazione; restituisce la riga
/// riletta, con l'id assegnato da AUTO_INCREMENT e i default della tabella.
pub trait Create<Entity, CreateDTO> {
    async fn create(&self, data: &CreateDTO) -> Result<Entity, Error>;
}

/// Lettura per chiave primaria. `Ok(None)` quando la riga non esiste: sarà
/// l'handler a tradurlo in un 404 con il messaggio adatto.
pub trait Read<Entity, Id> {
    async fn read(&self, id: &Id) -> Result<Option<Entity>, Error>;
}

/// Aggiornamento parziale: vengono scritti solo i campi `Some` del DTO.
/// `Error::RowNotFound` se l'id non esiste.
pub trait Update<Entity, UpdateDTO, Id> {
    async fn update(&self, id: &Id, data: &UpdateDTO) -> Result<Entity, Error>;
}

/// Cancellazione per chiave primaria, `Error::RowNotFound` se non c'era nulla da cancellare
pub trait Delete<Id> {
    async fn delete(&self, id: &Id) -> Result<(), Error>;
}
