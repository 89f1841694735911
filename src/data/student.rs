use crate::{
    data::DataType,
    error::{
        BursarError, BursarResult, CommitTransactionSnafu, CorruptRecordSnafu, EmptyFieldSnafu,
        InvalidDateFormatSnafu, MakeQuerySnafu, MissingFieldSnafu, NoInputSnafu, NotFoundSnafu,
    },
};
use futures::{TryStreamExt, future};
use jiff::civil::Date;
use serde::{Deserialize, Serialize, de::IgnoredAny};
use snafu::{OptionExt, ResultExt, ensure};
use sqlx::{FromRow, Pool, Sqlite, SqliteConnection, Transaction};
use std::{
    collections::HashMap,
    fmt::{Display, Formatter},
};

pub const DOB_FORMAT: &str = "%Y-%m-%d";

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Student {
    pub student_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub dob: Date,
    pub amount_due: f64,
}

impl Display for Student {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Student(first_name='{}', last_name='{}')",
            self.first_name, self.last_name
        )
    }
}

#[derive(FromRow)]
struct StudentRow {
    student_id: i64,
    first_name: String,
    last_name: String,
    dob: String,
    amount_due: f64,
}

impl TryFrom<StudentRow> for Student {
    type Error = BursarError;

    fn try_from(
        StudentRow {
            student_id,
            first_name,
            last_name,
            dob,
            amount_due,
        }: StudentRow,
    ) -> Result<Self, Self::Error> {
        let parsed = Date::strptime(DOB_FORMAT, &dob).context(CorruptRecordSnafu {
            id: student_id,
            original: dob,
        })?;

        Ok(Self {
            student_id,
            first_name,
            last_name,
            dob: parsed,
            amount_due,
        })
    }
}

pub fn parse_dob(original: String) -> BursarResult<Date> {
    Date::strptime(DOB_FORMAT, &original).context(InvalidDateFormatSnafu { original })
}

fn non_empty(field: &'static str, value: String) -> BursarResult<String> {
    ensure!(!value.trim().is_empty(), EmptyFieldSnafu { field });
    Ok(value)
}

///Straight from the request body - every field is optional here so that a missing one can be reported by name.
#[derive(Deserialize, Debug, Default)]
pub struct AddStudentForm {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub dob: Option<String>,
    pub amount_due: Option<f64>,
}

struct NewStudent {
    first_name: String,
    last_name: String,
    dob: Date,
    amount_due: f64,
}

impl TryFrom<AddStudentForm> for NewStudent {
    type Error = BursarError;

    fn try_from(
        AddStudentForm {
            first_name,
            last_name,
            dob,
            amount_due,
        }: AddStudentForm,
    ) -> Result<Self, Self::Error> {
        let first_name = first_name.context(MissingFieldSnafu {
            field: "first_name",
        })?;
        let last_name = last_name.context(MissingFieldSnafu { field: "last_name" })?;
        let dob = dob.context(MissingFieldSnafu { field: "dob" })?;
        let amount_due = amount_due.context(MissingFieldSnafu {
            field: "amount_due",
        })?;

        Ok(Self {
            first_name: non_empty("first_name", first_name)?,
            last_name: non_empty("last_name", last_name)?,
            dob: parse_dob(dob)?,
            amount_due,
        })
    }
}

///A partial update - `None` means "leave it as it is".
#[derive(Deserialize, Debug, Default)]
pub struct UpdateStudentForm {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub dob: Option<String>,
    pub amount_due: Option<f64>,
    ///keys we don't store still make the payload non-empty
    #[serde(flatten)]
    pub other_keys: HashMap<String, IgnoredAny>,
}

impl UpdateStudentForm {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.dob.is_none()
            && self.amount_due.is_none()
            && self.other_keys.is_empty()
    }

    ///validates everything before touching `student`, so a bad field leaves it untouched
    fn apply_to(self, student: &mut Student) -> BursarResult<()> {
        let Self {
            first_name,
            last_name,
            dob,
            amount_due,
            other_keys: _,
        } = self;

        let first_name = first_name
            .map(|name| non_empty("first_name", name))
            .transpose()?;
        let last_name = last_name
            .map(|name| non_empty("last_name", name))
            .transpose()?;
        let dob = dob.map(parse_dob).transpose()?;

        if let Some(first_name) = first_name {
            student.first_name = first_name;
        }
        if let Some(last_name) = last_name {
            student.last_name = last_name;
        }
        if let Some(dob) = dob {
            student.dob = dob;
        }
        if let Some(amount_due) = amount_due {
            student.amount_due = amount_due;
        }

        Ok(())
    }
}

impl DataType for Student {
    type Id = i64;
    type FormForAdding = AddStudentForm;
    type FormForUpdating = UpdateStudentForm;

    async fn get_from_db_by_id(
        id: Self::Id,
        conn: &mut SqliteConnection,
    ) -> BursarResult<Option<Self>> {
        sqlx::query_as::<_, StudentRow>(
            "SELECT student_id, first_name, last_name, dob, amount_due FROM students WHERE student_id = ?",
        )
        .bind(id)
        .fetch_optional(conn)
        .await
        .context(MakeQuerySnafu)?
        .map(Self::try_from)
        .transpose()
    }

    async fn get_all(pool: &Pool<Sqlite>) -> BursarResult<Vec<Self>> {
        sqlx::query_as::<_, StudentRow>(
            "SELECT student_id, first_name, last_name, dob, amount_due FROM students ORDER BY student_id",
        )
        .fetch(pool)
        .map_err(|source| BursarError::MakeQuery { source })
        .and_then(|row| future::ready(Self::try_from(row)))
        .try_collect()
        .await
    }

    async fn insert_into_database(
        to_be_added: Self::FormForAdding,
        conn: &mut SqliteConnection,
    ) -> BursarResult<Self> {
        let NewStudent {
            first_name,
            last_name,
            dob,
            amount_due,
        } = to_be_added.try_into()?;

        let student_id: i64 = sqlx::query_scalar(
            "INSERT INTO students (first_name, last_name, dob, amount_due) VALUES (?, ?, ?, ?) RETURNING student_id",
        )
        .bind(&first_name)
        .bind(&last_name)
        .bind(dob.strftime(DOB_FORMAT).to_string())
        .bind(amount_due)
        .fetch_one(conn)
        .await
        .context(MakeQuerySnafu)?;

        Ok(Self {
            student_id,
            first_name,
            last_name,
            dob,
            amount_due,
        })
    }

    async fn update_in_database_transaction(
        id: Self::Id,
        changes: Self::FormForUpdating,
        mut conn: Transaction<'_, Sqlite>,
    ) -> BursarResult<Self> {
        let mut student = Self::get_from_db_by_id(id, &mut conn)
            .await?
            .context(NotFoundSnafu { id })?;
        ensure!(!changes.is_empty(), NoInputSnafu);

        changes.apply_to(&mut student)?;

        sqlx::query(
            "UPDATE students SET first_name = ?, last_name = ?, dob = ?, amount_due = ? WHERE student_id = ?",
        )
        .bind(&student.first_name)
        .bind(&student.last_name)
        .bind(student.dob.strftime(DOB_FORMAT).to_string())
        .bind(student.amount_due)
        .bind(id)
        .execute(&mut *conn)
        .await
        .context(MakeQuerySnafu)?;

        conn.commit().await.context(CommitTransactionSnafu)?;

        Ok(student)
    }

    async fn remove_from_database(id: Self::Id, conn: &mut SqliteConnection) -> BursarResult<()> {
        let result = sqlx::query("DELETE FROM students WHERE student_id = ?")
            .bind(id)
            .execute(conn)
            .await
            .context(MakeQuerySnafu)?;
        ensure!(result.rows_affected() > 0, NotFoundSnafu { id });
        Ok(())
    }
}
