use crate::{
    data::{
        DataType,
        student::{AddStudentForm, Student, UpdateStudentForm},
    },
    error::{
        BursarError, BursarResult, MalformedBodySnafu, NotFoundSnafu, UnknownStudentPathSnafu,
    },
    state::BursarState,
};
use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
};
use serde::Serialize;
use snafu::{OptionExt, ResultExt};

#[derive(Serialize)]
pub struct StudentWithMessage {
    message: &'static str,
    student: Student,
}

#[derive(Serialize)]
pub struct SingleStudent {
    student: Student,
}

#[derive(Serialize)]
pub struct AllStudents {
    students: Vec<Student>,
}

#[derive(Serialize)]
pub struct JustMessage {
    message: &'static str,
}

pub async fn post_new_student(
    State(state): State<BursarState>,
    form: Result<Json<AddStudentForm>, JsonRejection>,
) -> BursarResult<(StatusCode, Json<StudentWithMessage>)> {
    let Json(form) = form.context(MalformedBodySnafu)?;

    let student = Student::insert_into_database(form, &mut *state.get_connection().await?).await?;
    info!(%student, id = student.student_id, "Created student");

    Ok((
        StatusCode::CREATED,
        Json(StudentWithMessage {
            message: "Student created!",
            student,
        }),
    ))
}

pub async fn get_students(State(state): State<BursarState>) -> BursarResult<Json<AllStudents>> {
    let students = Student::get_all(&state).await?;
    Ok(Json(AllStudents { students }))
}

pub async fn get_student(
    State(state): State<BursarState>,
    id: Result<Path<i64>, PathRejection>,
) -> BursarResult<Json<SingleStudent>> {
    let Path(id) = id.context(UnknownStudentPathSnafu)?;
    let student = Student::get_from_db_by_id(id, &mut *state.get_connection().await?)
        .await?
        .context(NotFoundSnafu { id })?;
    Ok(Json(SingleStudent { student }))
}

pub async fn put_student(
    State(state): State<BursarState>,
    id: Result<Path<i64>, PathRejection>,
    changes: Result<Json<UpdateStudentForm>, JsonRejection>,
) -> BursarResult<Json<StudentWithMessage>> {
    let Path(id) = id.context(UnknownStudentPathSnafu)?;

    //no body at all is just an empty update, so that an unknown id still gets a 404
    let changes = match changes {
        Ok(Json(changes)) => changes,
        Err(JsonRejection::MissingJsonContentType(_)) => UpdateStudentForm::default(),
        Err(source) => return Err(BursarError::MalformedBody { source }),
    };

    let student =
        Student::update_in_database_transaction(id, changes, state.get_transaction().await?)
            .await?;
    info!(%student, id, "Updated student");

    Ok(Json(StudentWithMessage {
        message: "Student updated!",
        student,
    }))
}

pub async fn delete_student(
    State(state): State<BursarState>,
    id: Result<Path<i64>, PathRejection>,
) -> BursarResult<Json<JustMessage>> {
    let Path(id) = id.context(UnknownStudentPathSnafu)?;
    Student::remove_from_database(id, &mut *state.get_connection().await?).await?;
    info!(id, "Deleted student");

    Ok(Json(JustMessage {
        message: "Student deleted!",
    }))
}
