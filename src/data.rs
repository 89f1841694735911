use crate::error::BursarResult;
use sqlx::{Pool, Sqlite, SqliteConnection, Transaction};

pub mod student;

pub trait DataType: Sized {
    type Id;
    type FormForAdding;
    type FormForUpdating;

    async fn get_from_db_by_id(
        id: Self::Id,
        conn: &mut SqliteConnection,
    ) -> BursarResult<Option<Self>>;
    async fn get_all(pool: &Pool<Sqlite>) -> BursarResult<Vec<Self>>;
    async fn insert_into_database(
        to_be_added: Self::FormForAdding,
        conn: &mut SqliteConnection,
    ) -> BursarResult<Self>;
    ///the transaction is committed by the implementation once the changes have been written
    async fn update_in_database_transaction(
        id: Self::Id,
        changes: Self::FormForUpdating,
        conn: Transaction<'_, Sqlite>,
    ) -> BursarResult<Self>;
    async fn remove_from_database(id: Self::Id, conn: &mut SqliteConnection) -> BursarResult<()>;
}
